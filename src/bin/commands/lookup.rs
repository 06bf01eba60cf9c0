use anyhow::Result;
use clap::Args;
use routeglass::display::render_routes;
use routeglass::{paginate, GlassConfig, OutputFormat};

/// Arguments for the Lookup command
#[derive(Args)]
pub struct LookupArgs {
    /// Network prefix to search for, matched against the start of each route's network
    pub prefix: String,

    /// Page to show, starting at 0
    #[clap(short, long, default_value_t = 0)]
    pub page: usize,

    /// Number of routes per page (0 shows all routes)
    #[clap(short = 's', long, default_value_t = 50)]
    pub page_size: usize,
}

pub async fn run(config: &GlassConfig, args: LookupArgs, output_format: OutputFormat) -> Result<()> {
    let LookupArgs {
        prefix,
        page,
        page_size,
    } = args;

    let store = super::build_store(config)?;
    super::refresh_once(&store).await;

    let routes = store.lookup_prefix(prefix.as_str()).await?;
    let (routes, pagination) = paginate(&routes, page, page_size);
    println!("{}", render_routes(&routes, &pagination, output_format)?);
    Ok(())
}
