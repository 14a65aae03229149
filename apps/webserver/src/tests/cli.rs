use crate::cli::Cli;

use webserver_core::config::ServerConfig;

use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

/// **VALUE**: Verifies flags parse into the expected fields.
#[test]
fn given_all_flags_when_parsed_then_fields_set() {
    let cli = Cli::try_parse_from([
        "webserver",
        "--config-dir",
        "/etc/webserver",
        "--host",
        "127.0.0.1",
        "-p",
        "9090",
        "--root",
        "/srv/a",
        "-r",
        "/srv/b",
        "--log-dir",
        "/var/log/webserver",
        "--log-level",
        "warn",
    ])
    .expect("valid flags");

    assert_eq!(cli.config_dir, Some(PathBuf::from("/etc/webserver")));
    assert_eq!(cli.host.as_deref(), Some("127.0.0.1"));
    assert_eq!(cli.port, Some(9090));
    assert_eq!(
        cli.roots,
        vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/b")]
    );
    assert_eq!(cli.log_dir, Some(PathBuf::from("/var/log/webserver")));
    assert_eq!(cli.log_level, Some(LevelFilter::Warn));
}

/// **VALUE**: Verifies invalid values are rejected by the parser.
#[test]
fn given_bad_port_when_parsed_then_error() {
    assert!(Cli::try_parse_from(["webserver", "--port", "99999"]).is_err());
    assert!(Cli::try_parse_from(["webserver", "--log-level", "loud"]).is_err());
}

/// **VALUE**: Verifies flags override config values and roots are appended once.
///
/// **BUG THIS CATCHES**: Would catch a root given both in the file and on the command
/// line being registered twice.
#[test]
fn given_flags_when_applied_then_override_config() {
    let mut config = ServerConfig::default();
    config.content.document_roots.push(PathBuf::from("/srv/a"));
    let cli = Cli::try_parse_from(["webserver", "-p", "0", "-r", "/srv/a", "-r", "/srv/c"])
        .expect("valid flags");

    cli.apply(&mut config);

    assert_eq!(config.network.port, 0);
    assert_eq!(config.network.host, "0.0.0.0");
    assert_eq!(
        config.content.document_roots,
        vec![PathBuf::from("/srv/a"), PathBuf::from("/srv/c")]
    );
}
