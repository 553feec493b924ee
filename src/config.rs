use color_eyre::eyre::eyre;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::Args;

/// Manages config directory and config file operations
#[derive(Clone)]
pub struct ConfigManager {
    pub(crate) config_dir: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager with a custom config directory (primarily for testing)
    pub fn with_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    /// Create a new ConfigManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| eyre!("Could not determine config directory"))?
            .join(app_name);

        Ok(Self { config_dir })
    }

    /// Get path to a specific config file
    pub fn config_path(&self, path: &str) -> PathBuf {
        self.config_dir.join(path)
    }

    /// Ensure the config directory exists
    pub fn ensure_config_dir(&self) -> Result<()> {
        if !self.config_dir.exists() {
            std::fs::create_dir_all(&self.config_dir)?;
        }
        Ok(())
    }

    /// Generate default configuration template as a string
    pub fn generate_default_config(&self) -> String {
        DEFAULT_CONFIG_TEMPLATE.to_string()
    }

    /// Write default configuration to config file
    pub fn write_default_config(&self, force: bool) -> Result<PathBuf> {
        self.ensure_config_dir()?;
        write_default_config_to(&self.config_path("config.toml"), force)
    }
}

/// Write the default configuration template to an explicit file.
pub fn write_default_config_to(config_path: &Path, force: bool) -> Result<PathBuf> {
    if config_path.exists() && !force {
        return Err(eyre!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        ));
    }

    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(config_path, DEFAULT_CONFIG_TEMPLATE)?;

    Ok(config_path.to_path_buf())
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Configuration format version (for future compatibility)
    pub version: String,
    pub server: ServerConfig,
    pub viewer: ViewerConfig,
    pub chart: ChartConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub open_browser: bool,
    /// Oldest sessions are dropped once this many are open
    pub max_sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Value the path field starts with; treated as "no file"
    pub placeholder_path: String,
    /// Initial state of the "show plot after selecting axes" checkbox
    pub defer_plot: bool,
    /// Number of rows sent to the grid preview
    pub preview_rows: usize,
    /// Reload the table when the path changes even if the key string stays the same
    pub reload_table_on_path_change: bool,
}

/// When the chart legend is drawn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LegendMode {
    /// Only when lines are grouped by a third column
    #[default]
    Auto,
    Always,
    Never,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    pub width: u32,
    pub height: u32,
    pub legend: LegendMode,
    /// Hold the chart back until the grouping column is selected as well
    pub require_group_column: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: "0.1".to_string(),
            server: ServerConfig::default(),
            viewer: ViewerConfig::default(),
            chart: ChartConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: hdfview_cli::DEFAULT_PORT,
            open_browser: true,
            max_sessions: 16,
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            placeholder_path: "path/to/hdf5".to_string(),
            defer_plot: true,
            preview_rows: 200,
            reload_table_on_path_change: false,
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 540,
            legend: LegendMode::Auto,
            require_group_column: false,
        }
    }
}

// Configuration loading and merging
impl AppConfig {
    /// Load configuration from all layers (default → user)
    pub fn load(app_name: &str) -> Result<Self> {
        let config_manager = ConfigManager::new(app_name)?;
        Self::load_from(&config_manager.config_path("config.toml"))
    }

    /// Load configuration with an explicit user config file layered over the defaults.
    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = AppConfig::default();

        if path.exists() {
            config.merge(Self::read_file(path)?);
        }

        config.validate()?;
        Ok(config)
    }

    fn read_file(config_path: &Path) -> Result<AppConfig> {
        let content = std::fs::read_to_string(config_path).map_err(|e| {
            eyre!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            )
        })?;

        toml::from_str(&content).map_err(|e| {
            eyre!(
                "Failed to parse config file at {}: {}",
                config_path.display(),
                e
            )
        })
    }

    /// Merge another config into this one (other takes precedence)
    pub fn merge(&mut self, other: AppConfig) {
        if other.version != AppConfig::default().version {
            self.version = other.version;
        }

        self.server.merge(other.server);
        self.viewer.merge(other.viewer);
        self.chart.merge(other.chart);
    }

    /// Apply command-line overrides (highest precedence layer)
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(port) = args.port {
            self.server.port = port;
        }
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if args.no_browser {
            self.server.open_browser = false;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.version.starts_with("0.1") {
            return Err(eyre!(
                "Unsupported config version: {}. Expected 0.1.x",
                self.version
            ));
        }

        if self.server.host.trim().is_empty() {
            return Err(eyre!("server.host must not be empty"));
        }

        if self.server.max_sessions == 0 {
            return Err(eyre!("max_sessions must be greater than 0"));
        }

        if self.chart.width < 100 || self.chart.height < 100 {
            return Err(eyre!(
                "chart size {}x{} is too small (minimum 100x100)",
                self.chart.width,
                self.chart.height
            ));
        }

        Ok(())
    }
}

// Merge implementations for each config section
impl ServerConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ServerConfig::default();
        if other.host != default.host {
            self.host = other.host;
        }
        if other.port != default.port {
            self.port = other.port;
        }
        if other.open_browser != default.open_browser {
            self.open_browser = other.open_browser;
        }
        if other.max_sessions != default.max_sessions {
            self.max_sessions = other.max_sessions;
        }
    }
}

impl ViewerConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ViewerConfig::default();
        if other.placeholder_path != default.placeholder_path {
            self.placeholder_path = other.placeholder_path;
        }
        if other.defer_plot != default.defer_plot {
            self.defer_plot = other.defer_plot;
        }
        if other.preview_rows != default.preview_rows {
            self.preview_rows = other.preview_rows;
        }
        if other.reload_table_on_path_change != default.reload_table_on_path_change {
            self.reload_table_on_path_change = other.reload_table_on_path_change;
        }
    }
}

impl ChartConfig {
    pub fn merge(&mut self, other: Self) {
        let default = ChartConfig::default();
        if other.width != default.width {
            self.width = other.width;
        }
        if other.height != default.height {
            self.height = other.height;
        }
        if other.legend != default.legend {
            self.legend = other.legend;
        }
        if other.require_group_column != default.require_group_column {
            self.require_group_column = other.require_group_column;
        }
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# hdfview configuration
# Values shown are the defaults. Remove a line to keep the default.

version = "0.1"

[server]
# Address and port of the local HTTP listener
host = "127.0.0.1"
port = 61235
# Open the default browser once the server is listening
open_browser = true
# Oldest browser sessions are dropped beyond this count
max_sessions = 16

[viewer]
# Initial contents of the path field; this value means "no file"
placeholder_path = "path/to/hdf5"
# Wait for explicit x/y/z selection before plotting
defer_plot = true
# Rows shown in the table preview
preview_rows = 200
# Reload the table when the path changes but the key name stays the same
reload_table_on_path_change = false

[chart]
width = 900
height = 540
# "auto" (only when grouped), "always" or "never"
legend = "auto"
# Require the grouping (z) column before drawing the chart
require_group_column = false
"#;
