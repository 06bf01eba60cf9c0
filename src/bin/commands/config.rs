use anyhow::Result;
use clap::Args;
use routeglass::{GlassConfig, OutputFormat};
use serde::Serialize;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Only print the path of the configuration file
    #[clap(short, long)]
    pub path: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    refresh_interval: String,
    refresh_parallelism: usize,
    backend: String,
    snapshot_timeout: String,
    sources: Vec<SourceInfo>,
}

#[derive(Debug, Serialize)]
struct SourceInfo {
    id: String,
    name: String,
    refresh_interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    snapshot: Option<String>,
}

pub fn run(config: &GlassConfig, args: ConfigArgs, output_format: OutputFormat) -> Result<()> {
    let config_file = GlassConfig::config_file_path();
    if args.path {
        println!("{}", config_file);
        return Ok(());
    }

    if !output_format.is_json() {
        println!("Config File:         {}", config_file);
        println!("{}", config.summary());
        return Ok(());
    }

    let info = ConfigInfo {
        config_file,
        refresh_interval: humantime::format_duration(config.refresh_interval).to_string(),
        refresh_parallelism: config.refresh_parallelism,
        backend: config.backend.to_string(),
        snapshot_timeout: humantime::format_duration(config.snapshot_timeout).to_string(),
        sources: config
            .sources
            .iter()
            .map(|source| SourceInfo {
                id: source.id.clone(),
                name: source.name.clone(),
                refresh_interval: humantime::format_duration(config.refresh_interval_for(source))
                    .to_string(),
                snapshot: source.snapshot.clone(),
            })
            .collect(),
    };

    let json = match output_format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&info)?,
        _ => serde_json::to_string(&info)?,
    };
    println!("{}", json);
    Ok(())
}
