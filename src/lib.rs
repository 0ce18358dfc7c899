#![doc = include_str!("../README.md")]

mod common;
mod config;
mod error;
mod network;
mod node;
mod snapshot;

pub use crate::common::{between, FingerTable, Id, IdSpace, MAX_ID_BITS};
pub use config::{Config, DEFAULT_ID_BITS, DEFAULT_STABILIZE_INTERVAL, MAX_HOPS_CAP};
pub use error::{Error, Result, RoutingError};
pub use network::{Network, NetworkBuilder};
pub use node::{Lookup, Node};
pub use snapshot::{NetworkSnapshot, NodeSnapshot, ABSENT_ID};
