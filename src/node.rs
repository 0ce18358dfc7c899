//! Chord node.

mod stabilizer;

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use flume::Sender;
use tracing::{debug, info, trace, warn};

use crate::common::{between, FingerTable, Id, IdSpace};
use crate::config::Config;
use crate::network::NetworkInner;
use crate::snapshot::NodeSnapshot;
use crate::{Result, RoutingError};

/// Mutable ring state of a node, guarded by the node's own lock.
#[derive(Debug)]
struct State {
    predecessor: Option<Id>,
    successor: Id,
    fingers: FingerTable,
    store: HashMap<String, String>,
}

pub(crate) struct Inner {
    id: Id,
    space: IdSpace,
    max_hops: usize,
    state: Mutex<State>,
    network: Weak<NetworkInner>,
    shutdown: Sender<()>,
}

#[derive(Clone)]
/// Handle to a member of a Chord ring.
///
/// Nodes refer to each other by [Id] only, and resolve those ids through the
/// network's membership map on every hop. A reference to a node that left
/// the network stays in place until the next stabilization round repairs it.
///
/// Locking: a node never calls into the network's membership map while
/// holding its own lock, and never holds its own lock while calling another
/// node.
pub struct Node(Arc<Inner>);

/// Outcome of a successful [Node::lookup].
#[derive(Debug, Clone)]
pub struct Lookup {
    /// The node responsible for the target.
    pub owner: Node,
    /// Number of times the lookup was handed to another node.
    pub hops: usize,
}

impl Node {
    /// Create a standalone node, its own successor without predecessor, and
    /// start its stabilizer thread.
    ///
    /// Registration in the network is the caller's job.
    pub(crate) fn new(
        id: Id,
        space: IdSpace,
        config: &Config,
        network: Weak<NetworkInner>,
    ) -> Result<Self> {
        let (shutdown, receiver) = flume::bounded(1);

        let node = Node(Arc::new(Inner {
            id,
            space,
            max_hops: config.max_hops(space),
            state: Mutex::new(State {
                predecessor: None,
                successor: id,
                fingers: FingerTable::new(id, space.bits()),
                store: HashMap::new(),
            }),
            network,
            shutdown,
        }));

        stabilizer::spawn(&node, receiver, config.stabilize_interval)?;

        info!(%id, "New node created");

        Ok(node)
    }

    // === Getters ===

    /// Returns the node's Id
    pub fn id(&self) -> Id {
        self.0.id
    }

    /// Returns the identifier space this node lives in.
    pub fn id_space(&self) -> IdSpace {
        self.0.space
    }

    /// Current successor. Never absent: a lone node is its own successor.
    pub fn successor(&self) -> Id {
        self.state().successor
    }

    /// Current predecessor, if known.
    pub fn predecessor(&self) -> Option<Id> {
        self.state().predecessor
    }

    /// Returns a copy of the finger table.
    pub fn finger_table(&self) -> FingerTable {
        self.state().fingers.clone()
    }

    /// Read a key from this node's own shard, without routing.
    pub fn get_local(&self, key: &str) -> Option<String> {
        self.state().store.get(key).cloned()
    }

    /// Keys stored on this node, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.state().store.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of keys stored on this node.
    pub fn store_len(&self) -> usize {
        self.state().store.len()
    }

    /// Read-only copy of this node's ring state and shard.
    pub fn snapshot(&self) -> NodeSnapshot {
        let state = self.state();

        NodeSnapshot {
            id: self.0.id,
            predecessor: state.predecessor,
            successor: Some(state.successor),
            fingers: state.fingers.entries().to_vec(),
            store: state
                .store
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    // === Routing ===

    /// Returns the node responsible for `id`.
    pub fn find_successor(&self, id: Id) -> Result<Node, RoutingError> {
        self.lookup(id).map(|lookup| lookup.owner)
    }

    /// Route towards the owner of `id`, counting hops on the way.
    ///
    /// Each hop goes to the closest preceding finger of the current node, or
    /// to its successor when the finger table has nothing better.
    pub fn lookup(&self, id: Id) -> Result<Lookup, RoutingError> {
        let mut current = self.clone();

        for hops in 0..=self.0.max_hops {
            let successor = current.successor();

            if between(id, current.id(), successor, false, true) {
                let owner = current.resolve(successor)?;

                trace!(wanted = %id, owner = %owner.id(), hops, "Lookup done");

                return Ok(Lookup { owner, hops });
            }

            let next = current.closest_preceding_node(id);

            trace!(wanted = %id, from = %current.id(), to = %next.id(), "Lookup hop");

            current = if next.id() == current.id() {
                current.resolve(successor)?
            } else {
                next
            };
        }

        Err(RoutingError::HopLimit {
            target: id,
            hops: self.0.max_hops,
        })
    }

    /// The live finger closest before `id`, or this node itself.
    pub fn closest_preceding_node(&self, id: Id) -> Node {
        let fingers = self.finger_table();

        fingers
            .closest_preceding(id, |finger| self.is_live(finger))
            .and_then(|finger| self.resolve(finger).ok())
            .unwrap_or_else(|| self.clone())
    }

    // === Membership ===

    /// Join the ring `existing` belongs to, or start a new ring if None.
    ///
    /// Only this node's successor is set here; predecessors catch up
    /// through stabilization. `existing` is not modified.
    pub fn join(&self, existing: Option<&Node>) -> Result<()> {
        let successor = match existing {
            Some(existing) => existing.find_successor(self.id())?.id(),
            None => self.id(),
        };

        let mut state = self.state();
        state.predecessor = None;
        state.successor = successor;
        drop(state);

        info!(id = %self.id(), %successor, "Joined ring");

        Ok(())
    }

    /// Adopt the successor's predecessor as successor if it sits between us,
    /// then notify the successor about this node.
    pub fn stabilize(&self) {
        self.check_links();

        let successor_id = self.successor();
        let mut successor = match self.resolve(successor_id) {
            Ok(successor) => successor,
            Err(error) => {
                warn!(id = %self.id(), ?error, "Successor unreachable");
                return;
            }
        };

        if let Some(candidate) = successor.predecessor() {
            if between(candidate, self.id(), successor_id, false, false) {
                if let Ok(closer) = self.resolve(candidate) {
                    let mut state = self.state();
                    if state.successor == successor_id {
                        state.successor = candidate;
                        drop(state);

                        debug!(id = %self.id(), successor = %candidate, "Updated successor");

                        successor = closer;
                    }
                }
            }
        }

        if successor.id() != self.id() {
            successor.notify(self.id());
        }
    }

    /// `candidate` thinks it might be our predecessor.
    pub fn notify(&self, candidate: Id) {
        if candidate == self.id() {
            return;
        }

        let observed = self.predecessor();
        let current = observed.filter(|predecessor| self.is_live(predecessor));

        let adopt = match current {
            None => true,
            Some(predecessor) => between(candidate, predecessor, self.id(), false, false),
        };

        if adopt {
            let mut state = self.state();
            if state.predecessor == observed {
                state.predecessor = Some(candidate);
                drop(state);

                debug!(id = %self.id(), predecessor = %candidate, "Updated predecessor");
            }
        }
    }

    /// Recompute every finger entry.
    pub fn fix_fingers(&self) {
        let space = self.0.space;

        let fingers = (0..space.bits())
            .map(|index| {
                let start = space.finger_start(self.id(), index);

                match self.find_successor(start) {
                    Ok(node) => Some(node.id()),
                    Err(error) => {
                        trace!(id = %self.id(), %start, ?error, "Could not fix finger");
                        None
                    }
                }
            })
            .collect();

        self.state().fingers.replace(fingers);
    }

    /// Ask the stabilizer thread to stop. Calling it again is a no-op.
    pub fn stop(&self) {
        if self.0.shutdown.try_send(()).is_ok() {
            debug!(id = %self.id(), "Stopping stabilizer");
        }
    }

    // === DHT ===

    /// Store `value` under `key` on the node owning the key's hash.
    ///
    /// Overwrites any previous value. Stored values never move: if the
    /// owner leaves, or a new node takes over the key's range, the value is
    /// no longer reachable.
    pub fn put(&self, key: &str, value: &str) -> Result<()> {
        let hashed = self.0.space.hash(key);
        let owner = self.find_successor(hashed)?;

        let mut state = owner.state();
        debug!(key, %hashed, owner = %owner.id(), "Storing value");
        state.store.insert(key.to_string(), value.to_string());

        Ok(())
    }

    /// Read the value of `key` from the node owning the key's hash.
    ///
    /// Returns `Ok(None)` if the owner has no such key, and an error if no
    /// owner could be found.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let hashed = self.0.space.hash(key);
        let owner = self.find_successor(hashed)?;

        Ok(owner.get_local(key))
    }

    // === Private Methods ===

    fn state(&self) -> MutexGuard<'_, State> {
        self.0.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Turn a reference into a handle, failing if the node left the network.
    fn resolve(&self, id: Id) -> Result<Node, RoutingError> {
        if id == self.id() {
            return Ok(self.clone());
        }

        let network = self
            .0
            .network
            .upgrade()
            .ok_or(RoutingError::NetworkDropped)?;

        network.get(&id).ok_or(RoutingError::DeadPeer(id))
    }

    fn is_live(&self, id: &Id) -> bool {
        *id == self.id()
            || self
                .0
                .network
                .upgrade()
                .is_some_and(|network| network.contains(id))
    }

    /// Drop references to nodes that left the network.
    ///
    /// A dead successor is replaced by the lowest live finger, then the
    /// predecessor, then this node itself.
    fn check_links(&self) {
        let (predecessor, successor, fingers) = {
            let state = self.state();
            (state.predecessor, state.successor, state.fingers.clone())
        };

        let mut dead_fingers: Vec<Id> = fingers
            .entries()
            .iter()
            .flatten()
            .filter(|finger| !self.is_live(finger))
            .copied()
            .collect();
        dead_fingers.sort();
        dead_fingers.dedup();

        let live_predecessor = predecessor.filter(|predecessor| self.is_live(predecessor));
        let predecessor_dead = predecessor.is_some() && live_predecessor.is_none();

        let replacement = if self.is_live(&successor) {
            None
        } else {
            Some(
                fingers
                    .first(|finger| self.is_live(finger))
                    .or(live_predecessor)
                    .unwrap_or_else(|| self.id()),
            )
        };

        if dead_fingers.is_empty() && !predecessor_dead && replacement.is_none() {
            return;
        }

        let mut state = self.state();

        for finger in &dead_fingers {
            state.fingers.remove(finger);
        }
        if predecessor_dead && state.predecessor == predecessor {
            state.predecessor = None;
        }
        if let Some(replacement) = replacement {
            if state.successor == successor {
                state.successor = replacement;
            }
        }
        drop(state);

        debug!(
            id = %self.id(),
            ?dead_fingers,
            predecessor_dead,
            dead_successor = ?replacement.map(|_| successor),
            ?replacement,
            "Dropped references to departed nodes"
        );
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node").field("id", &self.0.id).finish()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}
