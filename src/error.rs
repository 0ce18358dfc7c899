//! Main Crate Error

use crate::common::Id;

/// Alias for results returned by this crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
/// Chord crate error enum.
pub enum Error {
    #[error(transparent)]
    /// No node owning the target could be resolved.
    Routing(#[from] RoutingError),

    /// Tried to disconnect a node that is not a live member of the network.
    #[error("Unknown node: {0}")]
    UnknownNode(Id),

    /// The explicit id does not fit in the identifier space.
    #[error("Id {id} is outside the identifier space of {bits} bits")]
    IdOutOfRange { id: Id, bits: u8 },

    #[error("Invalid identifier space size: {0} bits")]
    /// The configured identifier space is empty or too large.
    InvalidIdBits(u8),

    /// Every identifier in the space is already taken by a live node.
    #[error("No free identifier left in the identifier space")]
    IdSpaceExhausted,

    /// The network was stopped and no longer accepts new nodes.
    #[error("Network was stopped")]
    NetworkStopped,

    #[error(transparent)]
    /// Transparent [std::io::Error]
    IO(#[from] std::io::Error),

    #[error("Failed to decode snapshot bytes: {0}")]
    BencodeError(#[from] serde_bencode::Error),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Failure to resolve the owner of an identifier.
///
/// Distinct from a missing key: a [crate::Node::get] that routes fine but
/// finds nothing returns `Ok(None)`.
pub enum RoutingError {
    /// A successor or finger reference points at a node that left the network.
    #[error("Peer {0} is no longer a member of the network")]
    DeadPeer(Id),

    /// The lookup did not converge, most likely because the ring is malformed
    /// while stabilization catches up.
    #[error("Lookup for {target} gave up after {hops} hops")]
    HopLimit { target: Id, hops: usize },

    /// The [crate::Network] this node belonged to was dropped.
    #[error("The network was dropped")]
    NetworkDropped,
}
