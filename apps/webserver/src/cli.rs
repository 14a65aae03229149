//! Command-line flags.

use webserver_core::config::ServerConfig;

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

/// Development web server: static files, request handlers and message channels on one port.
#[derive(Debug, Clone, Parser)]
#[command(name = "webserver", version, about)]
pub struct Cli {
    /// Directory holding webserver.toml (defaults to the platform config dir)
    #[arg(long, value_name = "DIR")]
    pub config_dir: Option<PathBuf>,

    /// Interface to listen on
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (0 picks a free port)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Document root to serve; repeat for several, consulted in order
    #[arg(short, long = "root", value_name = "DIR")]
    pub roots: Vec<PathBuf>,

    /// Directory for webserver.log; stdout only when unset
    #[arg(long, value_name = "DIR", env = "WEBSERVER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LevelFilter>,
}

impl Cli {
    /// Apply flags on top of file and environment settings. Flags win.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.network.host = host.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        for root in &self.roots {
            if !config.content.document_roots.contains(root) {
                config.content.document_roots.push(root.clone());
            }
        }
    }
}
