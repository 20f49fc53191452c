//! Engine configuration.

use serde::Deserialize;

/// Runtime configuration for the consensus engine.
///
/// Unknown fields in the source document are ignored so the engine tolerates
/// configs written for newer node versions.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct PodConfig {
    /// Whether this node mints blocks at all.
    pub start_mine: bool,

    /// Base58 address credited with block rewards.
    pub coinbase: Option<String>,

    /// Base58 address of the local miner identity.
    pub miner: Option<String>,

    /// Route signing and VRF seeding through a remote sign service instead of
    /// the local keychain.
    pub enable_remote_sign_server: bool,

    /// Endpoint of the remote sign service, e.g. `http://127.0.0.1:51510`.
    pub remote_sign_server: Option<String>,

    /// Height at which governance duties (heartbeat, reports, state triggers,
    /// witness dissemination) activate.
    pub node_update_height: u64,

    /// Height at which blocks must carry a VRF seed and proof.
    pub random_available_height: u64,
}

impl Default for PodConfig {
    fn default() -> Self {
        Self {
            start_mine: false,
            coinbase: None,
            miner: None,
            enable_remote_sign_server: false,
            remote_sign_server: None,
            node_update_height: 1,
            random_available_height: 1,
        }
    }
}

impl PodConfig {
    /// Whether governance duties are active at `height`.
    pub fn node_update_at(&self, height: u64) -> bool {
        height >= self.node_update_height
    }

    /// Whether the VRF seed requirement is active at `height`.
    pub fn random_available_at(&self, height: u64) -> bool {
        height >= self.random_available_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PodConfig::default();
        assert!(!config.start_mine);
        assert!(!config.enable_remote_sign_server);
        assert_eq!(config.node_update_height, 1);
        assert_eq!(config.random_available_height, 1);
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let config: PodConfig = serde_json::from_str(
            r#"{"start_mine": true, "miner": "abc", "gossip_fanout": 8, "nested": {"x": 1}}"#,
        )
        .unwrap();
        assert!(config.start_mine);
        assert_eq!(config.miner.as_deref(), Some("abc"));
    }

    #[test]
    fn test_activation_heights() {
        let config = PodConfig {
            node_update_height: 100,
            random_available_height: 200,
            ..PodConfig::default()
        };
        assert!(!config.node_update_at(99));
        assert!(config.node_update_at(100));
        assert!(!config.random_available_at(199));
        assert!(config.random_available_at(200));
    }
}
