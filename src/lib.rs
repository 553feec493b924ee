//! hdfview: browse HDF5 tables and plot their columns in a local web page.

pub mod browser;
pub mod chart_data;
pub mod chart_export;
pub mod config;
pub mod controller;
pub mod grid;
pub mod reactive;
pub mod selection;
pub mod server;
pub mod store;

pub use chart_data::{ChartView, LineChart, LineSeries};
pub use config::{AppConfig, ConfigManager};
pub use controller::{Derived, View, ViewController, ViewOptions};
pub use hdfview_cli::Args;
pub use selection::{Field, InputEvent, SelectionState};
pub use server::Server;

/// Application name used for the config directory and other app-specific paths
pub const APP_NAME: &str = "hdfview";
