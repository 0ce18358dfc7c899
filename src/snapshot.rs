//! Read-only views of the network, for dumps and persistence.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::common::Id;
use crate::Result;

/// Encoded in place of an absent id.
pub const ABSENT_ID: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// State of a single node at the time it was sampled.
pub struct NodeSnapshot {
    pub id: Id,
    #[serde(with = "sentinel")]
    pub predecessor: Option<Id>,
    #[serde(with = "sentinel")]
    pub successor: Option<Id>,
    /// Finger table entries, lowest order first.
    #[serde(with = "sentinel::list")]
    pub fingers: Vec<Option<Id>>,
    /// Every key/value pair stored on this node.
    pub store: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Every live node, in ascending id order.
pub struct NetworkSnapshot {
    pub nodes: Vec<NodeSnapshot>,
}

impl NetworkSnapshot {
    /// Encode as bencode.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_bencode::to_bytes(self)?)
    }

    /// Decode from bencode.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_bencode::from_bytes(bytes)?)
    }

    pub fn node(&self, id: Id) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|node| node.id == id)
    }

    /// The node storing `key`, if any.
    pub fn owner_of(&self, key: &str) -> Option<Id> {
        self.nodes
            .iter()
            .find(|node| node.store.contains_key(key))
            .map(|node| node.id)
    }

    /// Total number of stored keys.
    pub fn key_count(&self) -> usize {
        self.nodes.iter().map(|node| node.store.len()).sum()
    }

    /// Follow successor references from the lowest id.
    ///
    /// Stops before revisiting a node, or at a successor that is absent from
    /// this snapshot.
    pub fn ring_order(&self) -> Vec<Id> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut visited = HashSet::new();

        let mut current = self.nodes.iter().map(|node| node.id).min();

        while let Some(node) = current.and_then(|id| self.node(id)) {
            if !visited.insert(node.id) {
                break;
            }
            order.push(node.id);
            current = node.successor;
        }

        order
    }

    /// Returns `true` if successor references form a single cycle through
    /// every node in ascending order.
    pub fn is_well_formed(&self) -> bool {
        let order = self.ring_order();

        let closes = match (order.first(), order.last()) {
            (Some(first), Some(last)) => {
                self.node(*last).and_then(|node| node.successor) == Some(*first)
            }
            _ => true,
        };

        closes && order.len() == self.nodes.len() && order.windows(2).all(|pair| pair[0] < pair[1])
    }
}

/// Serde helpers writing absent ids as [ABSENT_ID].
mod sentinel {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use super::ABSENT_ID;
    use crate::common::Id;

    pub fn serialize<S: Serializer>(id: &Option<Id>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(encode(id))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Id>, D::Error> {
        decode(i64::deserialize(deserializer)?)
    }

    pub mod list {
        use serde::{Deserialize, Deserializer, Serializer};

        use super::{decode, encode};
        use crate::common::Id;

        pub fn serialize<S: Serializer>(
            ids: &[Option<Id>],
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(ids.iter().map(encode))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Option<Id>>, D::Error> {
            Vec::<i64>::deserialize(deserializer)?
                .into_iter()
                .map(decode)
                .collect()
        }
    }

    fn encode(id: &Option<Id>) -> i64 {
        id.map_or(ABSENT_ID, |id| id.0 as i64)
    }

    fn decode<E: de::Error>(value: i64) -> Result<Option<Id>, E> {
        match value {
            ABSENT_ID => Ok(None),
            value if value >= 0 => Ok(Some(Id(value as u64))),
            value => Err(E::custom(format!("invalid id: {}", value))),
        }
    }
}
