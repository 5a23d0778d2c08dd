//! Integration tests for configuration parsing, validation, and derived
//! parameters.

use dramsim::config::{Config, DramProtocol, QueueStructure, RefreshPolicy};

/// Tests that an empty-sections file yields the DDR4 defaults.
#[test]
fn test_defaults() {
    let config: Config = toml::from_str("[dram]\n[timing]\n[system]\n").unwrap();
    assert_eq!(config.dram.protocol, DramProtocol::Ddr4);
    assert_eq!(config.dram.ranks, 2);
    assert_eq!(config.banks(), 16);
    assert_eq!(config.system.queue_structure, QueueStructure::PerBank);
    assert_eq!(config.system.refresh_policy, RefreshPolicy::RankLevelStaggered);
    assert!(config.validate().is_ok());
}

/// Tests derived latencies for the default DDR4 part.
#[test]
fn test_derived_latencies() {
    let config: Config = toml::from_str("[dram]\n[timing]\n[system]\n").unwrap();
    assert_eq!(config.rl(), 14);
    assert_eq!(config.wl(), 10);
    assert_eq!(config.burst_cycle(), 4);
    assert_eq!(config.read_delay(), 18);
    assert_eq!(config.write_delay(), 14);
}

/// Tests the GDDR burst cycle divisor.
#[test]
fn test_gddr_burst_cycle() {
    let config: Config =
        toml::from_str("[dram]\nprotocol = \"GDDR5\"\n[timing]\n[system]\n").unwrap();
    assert!(config.is_gddr());
    assert_eq!(config.burst_cycle(), 2);
}

/// Tests that an unknown protocol is rejected at parse time.
#[test]
fn test_unknown_protocol_rejected() {
    let result: Result<Config, _> =
        toml::from_str("[dram]\nprotocol = \"DDR9\"\n[timing]\n[system]\n");
    assert!(result.is_err());
}

/// Tests that an unknown refresh policy is rejected at parse time.
#[test]
fn test_unknown_policy_rejected() {
    let result: Result<Config, _> =
        toml::from_str("[dram]\n[timing]\n[system]\nrefresh_policy = \"SOMETIMES\"\n");
    assert!(result.is_err());
}

/// Tests validation of non-power-of-two topology.
#[test]
fn test_validate_rejects_bad_topology() {
    let config: Config = toml::from_str("[dram]\nranks = 3\n[timing]\n[system]\n").unwrap();
    assert!(config.validate().is_err());
}

/// Tests validation of malformed address mapping strings.
#[test]
fn test_validate_rejects_bad_mapping() {
    let config: Config =
        toml::from_str("[dram]\n[timing]\n[system]\naddress_mapping = \"rochraba\"\n").unwrap();
    assert!(config.validate().is_err());

    let config: Config =
        toml::from_str("[dram]\n[timing]\n[system]\naddress_mapping = \"rochrababaco\"\n").unwrap();
    assert!(config.validate().is_err());
}

/// Tests the address mapper against the default layout.
#[test]
fn test_address_mapping_fields() {
    let config: Config = toml::from_str("[dram]\n[timing]\n[system]\n").unwrap();
    let map = config.address_map().unwrap();

    // Low six bits are the burst offset; the column field sits just
    // above them.
    let addr = map.map(0x40);
    assert_eq!(addr.column, 1);
    assert_eq!(addr.row, 0);

    let addr = map.map(0);
    assert_eq!((addr.channel, addr.rank, addr.bankgroup, addr.bank), (0, 0, 0, 0));
    assert_eq!((addr.row, addr.column), (0, 0));

    // Same linear address decodes identically every time.
    let a = map.map(0xdead_bee0);
    let b = map.map(0xdead_bee0);
    assert_eq!(a, b);
    assert_eq!(a.hex, 0xdead_bee0);
}
