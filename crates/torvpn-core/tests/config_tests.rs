//! Integration tests for configuration and daemon config rendering

use std::io::Write;
use torvpn_core::config::{Config, DaemonStrategy};
use torvpn_core::{ConfigWriter, Error, ExemptNetworks};

#[test]
fn test_full_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[daemon]
config_path = "/tmp/torrc.test"
binary = "/usr/sbin/tor"
strategy = "direct"
startup_grace_ms = 750

[daemon.torrc]
socks_port = 9050
trans_port = 9040
dns_port = 5300
virtual_address_range = "10.192.0.0/10"
automap_hosts = false

[filter]
program = "/usr/sbin/iptables"
exempt_networks = ["10.0.0.0/8", "127.0.0.1/8"]
daemon_user = "debian-tor"

[privilege]
escalate = false

[probe]
timeout_secs = 20

[logging]
level = "debug"
json_format = true
"#
    )
    .unwrap();

    let config = Config::load(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.daemon.strategy, DaemonStrategy::Direct);
    assert_eq!(config.daemon.startup_grace_ms, 750);
    assert_eq!(config.daemon.torrc.trans_port, 9040);
    assert!(!config.daemon.torrc.automap_hosts);
    assert_eq!(config.filter.daemon_user.as_deref(), Some("debian-tor"));
    assert!(!config.privilege.escalate);
    assert_eq!(config.probe.timeout_secs, Some(20));
    assert_eq!(config.probe_proxy(), "socks5h://127.0.0.1:9050");
    assert!(config.logging.json_format);

    // host bits are dropped on load
    let nets: Vec<String> = config
        .filter
        .exempt_networks
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(nets, ["10.0.0.0/8", "127.0.0.0/8"]);
}

#[test]
fn test_duplicate_ports_rejected() {
    let config = Config::from_toml(
        r#"
[daemon.torrc]
socks_port = 9040
trans_port = 9040
"#,
    )
    .unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("9040"));
}

#[test]
fn test_duplicate_exempt_networks_rejected() {
    let err = Config::from_toml(
        r#"
[filter]
exempt_networks = ["192.168.0.0/16", "192.168.1.1/16"]
"#,
    )
    .unwrap_err();
    assert!(err.to_string().contains("duplicate"));
}

#[test]
fn test_written_torrc_matches_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("torrc");

    let mut config = Config::default();
    config.daemon.torrc.socks_port = 9150;
    ConfigWriter::write(&config.daemon.torrc, &path).unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        written,
        "VirtualAddrNetworkIPv4 10.192.0.0/10\n\
         AutomapHostsOnResolve 1\n\
         SocksPort 9150\n\
         TransPort 9070\n\
         DNSPort 5353\n"
    );
}

#[test]
fn test_write_into_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no-such-dir").join("torrc");

    let err = ConfigWriter::write(&Config::default().daemon.torrc, &path).unwrap_err();
    match err {
        Error::ConfigWrite { path: failed, .. } => assert_eq!(failed, path),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_generated_config_reloads() {
    let mut config = Config::default();
    config.filter.exempt_networks = ExemptNetworks::parse(["172.16.0.0/12"]).unwrap();
    config.daemon.strategy = DaemonStrategy::Direct;

    let text = config.to_toml().unwrap();
    let reloaded = Config::from_toml(&text).unwrap();
    assert_eq!(reloaded.filter.exempt_networks, config.filter.exempt_networks);
    assert_eq!(reloaded.daemon.strategy, DaemonStrategy::Direct);
    assert!(reloaded.validate().is_ok());
}
