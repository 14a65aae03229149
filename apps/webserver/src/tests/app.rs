use crate::app::{build_server, resolve_config, start};
use crate::cli::Cli;
use crate::error::WebserverError;

use webserver_core::config::{CONFIG_FILE_NAME, ServerConfig};

use std::fs;
use std::net::TcpListener;
use std::path::Path;

use clap::Parser;

fn cli_for(config_dir: &Path, extra: &[&str]) -> Cli {
    let mut args = vec![
        "webserver".to_string(),
        "--config-dir".to_string(),
        config_dir.display().to_string(),
    ];
    args.extend(extra.iter().map(|arg| arg.to_string()));
    Cli::try_parse_from(args).expect("valid flags")
}

/// **VALUE**: Verifies precedence: file, then environment, then flags.
///
/// **WHY THIS MATTERS**: Users expect a one-off `--port` to beat whatever is in the
/// file or the shell profile.
///
/// **BUG THIS CATCHES**: Would catch overrides applied in the wrong order.
#[test]
fn given_file_env_and_flags_when_resolved_then_flags_win() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        "[network]\nhost = \"10.0.0.1\"\nport = 7000\n",
    )
    .expect("write config");
    let cli = cli_for(dir.path(), &["--port", "7002"]);

    let config = resolve_config(&cli, |name| {
        (name == "WEBSERVER_PORT" || name == "WEBSERVER_HOST").then(|| match name {
            "WEBSERVER_PORT" => "7001".to_string(),
            _ => "127.0.0.1".to_string(),
        })
    })
    .expect("valid config");

    assert_eq!(config.network.host, "127.0.0.1", "env beats file");
    assert_eq!(config.network.port, 7002, "flag beats env");
}

/// **VALUE**: Verifies an invalid config file surfaces as a Config error.
#[test]
fn given_broken_file_when_resolved_then_config_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    fs::write(dir.path().join(CONFIG_FILE_NAME), "network = [").expect("write config");
    let cli = cli_for(dir.path(), &[]);

    let result = resolve_config(&cli, |_| None);

    assert!(matches!(result, Err(WebserverError::Config { .. })));
}

/// **VALUE**: Verifies a missing file with no overrides gives defaults.
#[test]
fn given_empty_config_dir_when_resolved_then_defaults() {
    let dir = tempfile::tempdir().expect("temp dir");
    let cli = cli_for(dir.path(), &[]);

    let config = resolve_config(&cli, |_| None).expect("defaults");

    assert_eq!(config.network.port, 8090);
    assert!(config.content.document_roots.is_empty());
}

/// **VALUE**: Verifies a port already in use is reported as a start failure.
///
/// **BUG THIS CATCHES**: Would catch bind errors being mislabelled as config errors.
#[tokio::test]
async fn given_port_in_use_when_started_then_start_failed() {
    let occupied = TcpListener::bind("127.0.0.1:0").expect("bind placeholder");
    let mut config = ServerConfig::default();
    config.network.host = "127.0.0.1".to_string();
    config.network.port = occupied.local_addr().expect("local addr").port();

    let result = start(&build_server(config)).await;

    assert!(matches!(result, Err(WebserverError::StartFailed { .. })));
}
