//! Common test utilities for fetch-syncer integration tests

use fetch_syncer::{Syncer, SyncerConfig};

/// User agent sent by every test client
pub const TEST_USER_AGENT: &str = "fetch-syncer-tests/1.0";

/// Create a client over the real reqwest transport with a fixed user agent
pub fn create_syncer() -> Syncer {
    create_syncer_with(SyncerConfig::default())
}

/// Create a client over the real reqwest transport from `config`
pub fn create_syncer_with(config: SyncerConfig) -> Syncer {
    let config = SyncerConfig {
        user_agent: Some(TEST_USER_AGENT.to_string()),
        ..config
    };
    Syncer::new(config).expect("default reqwest client should build")
}
