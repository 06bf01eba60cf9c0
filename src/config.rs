use crate::store::{MemoryRoutesBackend, RoutesBackend};
use anyhow::{anyhow, Result};
use config::Config;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Default interval between two refreshes of a source (5 minutes)
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default number of sources refreshed at the same time by `refresh_all`
pub const DEFAULT_REFRESH_PARALLELISM: usize = 4;

/// Default timeout for loading a route snapshot
pub const DEFAULT_SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(30);

const EMPTY_CONFIG: &str = r#"### routeglass configuration file

### default interval between two refreshes of a source
# refresh_interval = "5m"

### number of sources refreshed at the same time by one-shot commands (0 = unlimited)
# refresh_parallelism = 4

### route backend: "memory"
# backend = "memory"

### timeout for loading a route snapshot
# snapshot_timeout = "30s"

### routing sources, one block per route server
# [[sources]]
# id = "rs1"
# name = "Route Server 1"
# snapshot = "/var/lib/routeglass/rs1.json"
# refresh_interval = "1m"
"#;

/// Route backend implementation used for every source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
}

impl BackendKind {
    /// Create a new, empty backend instance
    pub fn build(&self) -> Arc<dyn RoutesBackend> {
        match self {
            BackendKind::Memory => Arc::new(MemoryRoutesBackend::new()),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            _ => Err(anyhow!("Unknown backend '{}'. Valid backends: memory", s)),
        }
    }
}

/// A configured routing source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    /// Location of the route snapshot (path or URL), used by the snapshot client
    pub snapshot: Option<String>,
    /// Overrides the global refresh interval
    pub refresh_interval: Option<Duration>,
}

impl SourceConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            snapshot: None,
            refresh_interval: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: impl Into<String>) -> Self {
        self.snapshot = Some(snapshot.into());
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = Some(interval);
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawSourceConfig {
    id: String,
    name: Option<String>,
    snapshot: Option<String>,
    refresh_interval: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    refresh_interval: Option<String>,
    refresh_parallelism: Option<usize>,
    backend: Option<String>,
    snapshot_timeout: Option<String>,
    #[serde(default)]
    sources: Vec<RawSourceConfig>,
}

#[derive(Debug, Clone)]
pub struct GlassConfig {
    /// Default interval between two refreshes of a source
    pub refresh_interval: Duration,

    /// Maximum number of concurrent one-shot refreshes (0 = unlimited)
    pub refresh_parallelism: usize,

    pub backend: BackendKind,

    /// Timeout for loading a route snapshot
    pub snapshot_timeout: Duration,

    pub sources: Vec<SourceConfig>,
}

impl Default for GlassConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            refresh_parallelism: DEFAULT_REFRESH_PARALLELISM,
            backend: BackendKind::Memory,
            snapshot_timeout: DEFAULT_SNAPSHOT_TIMEOUT,
            sources: vec![],
        }
    }
}

/// Parse a duration like "90s", "5m" or plain seconds
fn parse_interval(key: &str, value: &str) -> Result<Duration> {
    let duration = match value.trim().parse::<u64>() {
        Ok(secs) => Duration::from_secs(secs),
        Err(_) => humantime::parse_duration(value.trim())
            .map_err(|e| anyhow!("Invalid duration for {}: '{}' ({})", key, value, e))?,
    };
    if duration.is_zero() {
        return Err(anyhow!("{} must be greater than zero", key));
    }
    Ok(duration)
}

impl GlassConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<GlassConfig> {
        let mut builder = Config::builder();

        // Add in toml configuration file
        match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
            }
            None => {
                let home_dir =
                    dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
                let config_dir = home_dir.join(".routeglass");
                std::fs::create_dir_all(&config_dir)
                    .map_err(|e| anyhow!("Unable to create routeglass directory: {}", e))?;
                let p = config_dir.join("routeglass.toml");
                let path_str = p
                    .to_str()
                    .ok_or_else(|| anyhow!("Could not convert config path to string"))?;
                if p.exists() {
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(&p, EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", path_str, e)
                    })?;
                }
            }
        }

        // Add in settings from the environment (with a prefix of ROUTEGLASS)
        // E.g., `ROUTEGLASS_REFRESH_INTERVAL=1m ./routeglass serve` sets the refresh interval
        builder = builder.add_source(config::Environment::with_prefix("ROUTEGLASS"));

        Self::from_builder(builder)
    }

    /// Build the configuration from a TOML document
    pub fn from_toml_str(content: &str) -> Result<GlassConfig> {
        let builder =
            Config::builder().add_source(config::File::from_str(content, config::FileFormat::Toml));
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<GlassConfig> {
        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let raw = settings
            .try_deserialize::<RawConfig>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        let refresh_interval = match &raw.refresh_interval {
            Some(s) => parse_interval("refresh_interval", s)?,
            None => DEFAULT_REFRESH_INTERVAL,
        };

        let snapshot_timeout = match &raw.snapshot_timeout {
            Some(s) => parse_interval("snapshot_timeout", s)?,
            None => DEFAULT_SNAPSHOT_TIMEOUT,
        };

        let backend = match &raw.backend {
            Some(s) => s.parse()?,
            None => BackendKind::default(),
        };

        let mut sources = Vec::with_capacity(raw.sources.len());
        for source in raw.sources {
            let refresh_interval = match &source.refresh_interval {
                Some(s) => Some(parse_interval(
                    &format!("sources.{}.refresh_interval", source.id),
                    s,
                )?),
                None => None,
            };
            sources.push(SourceConfig {
                name: source.name.unwrap_or_else(|| source.id.clone()),
                id: source.id,
                snapshot: source.snapshot,
                refresh_interval,
            });
        }

        let config = GlassConfig {
            refresh_interval,
            refresh_parallelism: raw
                .refresh_parallelism
                .unwrap_or(DEFAULT_REFRESH_PARALLELISM),
            backend,
            snapshot_timeout,
            sources,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that sources are configured and their IDs are unique
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(anyhow!(
                "No sources configured. Add [[sources]] blocks to {}",
                Self::config_file_path()
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(anyhow!("Source ID must not be empty"));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(anyhow!("Duplicate source ID: {}", source.id));
            }
        }

        Ok(())
    }

    /// Refresh interval of a source, falling back to the global interval
    pub fn refresh_interval_for(&self, source: &SourceConfig) -> Duration {
        source.refresh_interval.unwrap_or(self.refresh_interval)
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Refresh Interval:    {}",
                humantime::format_duration(self.refresh_interval)
            ),
            format!("Refresh Parallelism: {}", self.refresh_parallelism),
            format!("Backend:             {}", self.backend),
            format!(
                "Snapshot Timeout:    {}",
                humantime::format_duration(self.snapshot_timeout)
            ),
            format!("Sources:             {}", self.sources.len()),
        ];

        for source in &self.sources {
            lines.push(format!(
                "  {} ({}) every {}{}",
                source.id,
                source.name,
                humantime::format_duration(self.refresh_interval_for(source)),
                source
                    .snapshot
                    .as_ref()
                    .map(|s| format!(" from {}", s))
                    .unwrap_or_default()
            ));
        }

        lines.join("\n")
    }

    /// Get the config file path
    pub fn config_file_path() -> String {
        let home_dir = dirs::home_dir()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|| "~".to_string());
        format!("{}/.routeglass/routeglass.toml", home_dir)
    }
}
