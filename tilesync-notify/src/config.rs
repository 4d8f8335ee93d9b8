//! Channel and registry configuration.

use serde::{Deserialize, Serialize};

/// Per-viewer channel configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Crop tile invalidations to the area the viewer has painted.
    pub paint_gating: bool,
    /// Pending tile slots allowed before collapsing them into one `EMPTY`.
    pub max_region_slots: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            paint_gating: true,
            max_region_slots: 64,
        }
    }
}

/// Registry configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Configuration applied to every attached channel.
    pub channel: ChannelConfig,
    /// Seed a new viewer's painted area from already attached viewers.
    pub seed_from_siblings: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            channel: ChannelConfig::default(),
            seed_from_siblings: true,
        }
    }
}
