use anyhow::Result;
use routeglass::display::render_stats;
use routeglass::{GlassConfig, OutputFormat};

pub async fn run(config: &GlassConfig, output_format: OutputFormat) -> Result<()> {
    let store = super::build_store(config)?;
    super::refresh_once(&store).await;

    let stats = store.stats().await;
    println!("{}", render_stats(&stats, output_format)?);
    Ok(())
}
