//! Shared CLI definitions for hdfview.
//!
//! Used by the main application and by the build script (manpage).

use clap::{CommandFactory, Parser};
use std::path::PathBuf;

/// Port the viewer listens on unless overridden by config or `--port`.
pub const DEFAULT_PORT: u16 = 61235;

/// Command-line arguments for hdfview
#[derive(Clone, Parser, Debug, Default)]
#[command(
    name = "hdfview",
    version,
    about = "Browse and plot HDF5 tables in a local web page"
)]
pub struct Args {
    /// HDF5 file to pre-fill in the path field of new sessions
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Port for the local HTTP listener (default: 61235)
    #[arg(long = "port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Address to bind the HTTP listener to (default: 127.0.0.1)
    #[arg(long = "host", value_name = "HOST")]
    pub host: Option<String>,

    /// Do not open the default browser after the server starts
    #[arg(long = "no-browser", action)]
    pub no_browser: bool,

    /// Read configuration from this file instead of the user config directory
    #[arg(long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(long = "debug", action)]
    pub debug: bool,

    /// Write the default configuration file and exit
    #[arg(long = "generate-config", action)]
    pub generate_config: bool,

    /// Overwrite an existing configuration file when used with --generate-config
    #[arg(long = "force", action, requires = "generate_config")]
    pub force: bool,
}

impl Args {
    /// Clap command for this CLI (used by the build script for man page generation)
    pub fn command() -> clap::Command {
        <Self as CommandFactory>::command()
    }
}
