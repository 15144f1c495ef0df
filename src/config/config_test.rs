use super::NodeConfig;

#[test]
fn test_defaults_validate() {
    let config = NodeConfig::default().validate().expect("defaults must be valid");
    assert_eq!(config.cluster.storage_port, 7000);
    assert_eq!(config.cluster.replication_factor, 1);
    assert_eq!(config.bootstrap.initial_delay_ms, 30_000);
    assert!(config.cluster.initial_token.is_none());
}

#[test]
fn test_zero_port_rejected() {
    let mut config = NodeConfig::default();
    config.cluster.storage_port = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_replication_factor_rejected() {
    let mut config = NodeConfig::default();
    config.cluster.replication_factor = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_tiny_ring_span_rejected() {
    let mut config = NodeConfig::default();
    config.cluster.ring_span = 1;
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_chunk_size_rejected() {
    let mut config = NodeConfig::default();
    config.bootstrap.stream_chunk_bytes = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_data_file_location_is_per_table() {
    let config = NodeConfig::default();
    let location = config.storage.data_file_location("users");
    assert!(location.ends_with("users"));
    assert!(location.starts_with(&config.storage.data_dir));
}
