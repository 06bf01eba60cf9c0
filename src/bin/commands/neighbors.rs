use anyhow::{anyhow, Result};
use clap::Args;
use routeglass::display::render_routes;
use routeglass::{paginate, GlassConfig, Neighbor, NeighborsLookupResults, OutputFormat};

/// Arguments for the Neighbors command
#[derive(Args)]
pub struct NeighborsArgs {
    /// Neighbor IDs, e.g. ID163_AS31078
    #[clap(required = true)]
    pub neighbor_ids: Vec<String>,

    /// Only search this source, by default all sources are searched
    #[clap(long)]
    pub source: Option<String>,

    /// Page to show, starting at 0
    #[clap(short, long, default_value_t = 0)]
    pub page: usize,

    /// Number of routes per page (0 shows all routes)
    #[clap(short = 's', long, default_value_t = 50)]
    pub page_size: usize,
}

pub async fn run(
    config: &GlassConfig,
    args: NeighborsArgs,
    output_format: OutputFormat,
) -> Result<()> {
    let NeighborsArgs {
        neighbor_ids,
        source,
        page,
        page_size,
    } = args;

    let store = super::build_store(config)?;

    let source_ids = match source {
        Some(id) if store.source(&id).is_some() => vec![id],
        Some(id) => return Err(anyhow!("Unknown source: {}", id)),
        None => store.source_ids(),
    };

    let neighbors: Vec<Neighbor> = neighbor_ids.into_iter().map(Neighbor::new).collect();
    let query: NeighborsLookupResults = source_ids
        .into_iter()
        .map(|id| (id, neighbors.clone()))
        .collect();

    super::refresh_once(&store).await;

    let routes = store.lookup_prefix_for_neighbors(&query).await?;
    let (routes, pagination) = paginate(&routes, page, page_size);
    println!("{}", render_routes(&routes, &pagination, output_format)?);
    Ok(())
}
