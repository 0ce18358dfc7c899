use std::time::Duration;

use crate::common::IdSpace;

/// Default size of the identifier space, in bits.
pub const DEFAULT_ID_BITS: u8 = 5;
/// Default idle time between two stabilization rounds of a node.
pub const DEFAULT_STABILIZE_INTERVAL: Duration = Duration::from_millis(10);
/// Upper bound of the default hop ceiling, for very wide identifier spaces.
pub const MAX_HOPS_CAP: usize = 1 << 24;

#[derive(Debug, Clone)]
/// Network Configurations
pub struct Config {
    /// Size of the identifier space in bits, the ring holds `2^id_bits` ids
    /// and every finger table holds `id_bits` entries.
    ///
    /// Collisions between randomly assigned ids are only avoided by
    /// [crate::Network::create_random_node], so keep the space
    /// comfortably larger than the number of nodes.
    ///
    /// Defaults to [DEFAULT_ID_BITS]
    pub id_bits: u8,
    /// How long each node idles between two rounds of stabilize and fix fingers.
    ///
    /// Defaults to [DEFAULT_STABILIZE_INTERVAL]
    pub stabilize_interval: Duration,
    /// Maximum number of hops a lookup may take before giving up with
    /// [crate::RoutingError::HopLimit].
    ///
    /// A lookup along a well formed ring, even with empty finger tables,
    /// never takes more hops than there are nodes.
    ///
    /// Defaults to the size of the identifier space, at most [MAX_HOPS_CAP].
    pub max_hops: Option<usize>,
}

impl Config {
    /// The hop ceiling of lookups in `space`.
    pub(crate) fn max_hops(&self, space: IdSpace) -> usize {
        self.max_hops.unwrap_or_else(|| {
            usize::try_from(space.size())
                .unwrap_or(usize::MAX)
                .min(MAX_HOPS_CAP)
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id_bits: DEFAULT_ID_BITS,
            stabilize_interval: DEFAULT_STABILIZE_INTERVAL,
            max_hops: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_max_hops_follows_id_space() {
        let config = Config::default();

        assert_eq!(config.max_hops(IdSpace::new(5).unwrap()), 32);
        assert_eq!(config.max_hops(IdSpace::new(16).unwrap()), 65536);
        assert_eq!(config.max_hops(IdSpace::new(32).unwrap()), MAX_HOPS_CAP);
    }

    #[test]
    fn explicit_max_hops() {
        let config = Config {
            max_hops: Some(3),
            ..Default::default()
        };

        assert_eq!(config.max_hops(IdSpace::new(16).unwrap()), 3);
    }
}
