//! Registry of the live members of a Chord ring.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::{info, warn};

use crate::common::{Id, IdSpace};
use crate::config::Config;
use crate::snapshot::NetworkSnapshot;
use crate::{Error, Node, Result};

#[derive(Debug, Clone)]
/// Directory of every node currently part of the network.
///
/// Membership is bookkeeping only: lookups travel from node to node along
/// successor and finger references, and only ask the network whether the
/// node behind a reference is still a member.
pub struct Network(Arc<NetworkInner>);

#[derive(Debug)]
pub(crate) struct NetworkInner {
    config: Config,
    space: IdSpace,
    members: RwLock<HashMap<Id, Node>>,
    stopped: AtomicBool,
}

impl Network {
    /// Returns a builder to edit settings before creating a Network.
    pub fn builder() -> NetworkBuilder {
        NetworkBuilder::default()
    }

    /// Create a new empty Network.
    pub fn new(config: Config) -> Result<Self> {
        let space = IdSpace::new(config.id_bits)?;

        Ok(Network(Arc::new(NetworkInner {
            config,
            space,
            members: RwLock::new(HashMap::new()),
            stopped: AtomicBool::new(false),
        })))
    }

    // === Getters ===

    /// Settings this network was built with.
    pub fn config(&self) -> &Config {
        &self.0.config
    }

    /// The identifier space shared by every node of this network.
    pub fn id_space(&self) -> IdSpace {
        self.0.space
    }

    /// Returns the live node with this `id`, if any.
    pub fn get(&self, id: &Id) -> Option<Node> {
        self.0.get(id)
    }

    /// Returns `true` if a node with this `id` is a live member.
    pub fn contains(&self, id: &Id) -> bool {
        self.0.contains(id)
    }

    /// Number of live members.
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Ids of all live members in ascending order.
    pub fn ids(&self) -> Vec<Id> {
        let mut ids: Vec<Id> = self.0.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// All live members in ascending id order.
    pub fn nodes(&self) -> Vec<Node> {
        let mut nodes: Vec<Node> = self.0.read().values().cloned().collect();
        nodes.sort_by_key(Node::id);
        nodes
    }

    /// Returns `true` once [Self::stop] was called.
    pub fn is_stopped(&self) -> bool {
        self.0.stopped.load(Ordering::Acquire)
    }

    // === Public Methods ===

    /// Create a standalone node with an explicit `id`, register it and start
    /// its stabilizer.
    ///
    /// Ids are not checked for collisions: a node created with the id of a
    /// live member replaces it in the registry. Use [Self::create_random_node]
    /// to get a free id.
    pub fn create_node(&self, id: Id) -> Result<Node> {
        let id = self.0.space.check(id)?;

        let mut members = self.0.write();
        self.check_running()?;

        let node = self.spawn_node(id)?;
        self.add_node(&mut members, node.clone());

        Ok(node)
    }

    /// Create a standalone node with a uniformly random id that no live
    /// member uses yet, register it and start its stabilizer.
    pub fn create_random_node(&self) -> Result<Node> {
        let mut members = self.0.write();
        self.check_running()?;

        if members.len() as u64 >= self.0.space.size() {
            return Err(Error::IdSpaceExhausted);
        }

        let id = loop {
            let id = self.0.space.random();

            if !members.contains_key(&id) {
                break id;
            }
        };

        let node = self.spawn_node(id)?;
        self.add_node(&mut members, node.clone());

        Ok(node)
    }

    /// Remove the node from the registry and stop its stabilizer.
    ///
    /// Its neighbours are not told: their references to it are dropped by
    /// their next stabilization round, and whatever it stored is lost.
    pub fn disconnect_node(&self, id: Id) -> Result<()> {
        let node = self.0.write().remove(&id).ok_or(Error::UnknownNode(id))?;

        node.stop();

        info!(%id, keys = node.store_len(), "Node disconnected");

        Ok(())
    }

    /// Stop the stabilizer of every member. Calling it again is a no-op.
    ///
    /// Members stay registered, so the final state can still be inspected
    /// with [Self::snapshot].
    pub fn stop(&self) {
        let members = self.0.write();

        if self.0.stopped.swap(true, Ordering::AcqRel) {
            return;
        }

        for node in members.values() {
            node.stop();
        }

        info!(nodes = members.len(), "Network stopped");
    }

    /// Run one stabilize and fix fingers round on every member, in id order.
    ///
    /// The same work the stabilizer threads do, for callers that want to
    /// drive convergence deterministically.
    pub fn stabilize_round(&self) {
        for node in self.nodes() {
            node.stabilize();
            node.fix_fingers();
        }
    }

    /// Best effort view of every live member.
    ///
    /// The member list is consistent, but each node is read at a slightly
    /// different moment while their stabilizers keep running.
    pub fn snapshot(&self) -> NetworkSnapshot {
        let members = self.0.read();

        let mut nodes: Vec<_> = members.values().map(Node::snapshot).collect();
        nodes.sort_by_key(|node| node.id);

        NetworkSnapshot { nodes }
    }

    // === Private Methods ===

    fn check_running(&self) -> Result<()> {
        if self.is_stopped() {
            return Err(Error::NetworkStopped);
        }

        Ok(())
    }

    fn spawn_node(&self, id: Id) -> Result<Node> {
        Node::new(id, self.0.space, &self.0.config, Arc::downgrade(&self.0))
    }

    /// Register `node`, last writer wins.
    fn add_node(&self, members: &mut HashMap<Id, Node>, node: Node) {
        let id = node.id();

        if members.insert(id, node).is_some() {
            warn!(%id, "Id collision, replaced the previous node");
        }
    }
}

impl NetworkInner {
    pub(crate) fn get(&self, id: &Id) -> Option<Node> {
        self.read().get(id).cloned()
    }

    pub(crate) fn contains(&self, id: &Id) -> bool {
        self.read().contains_key(id)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<Id, Node>> {
        self.members.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<Id, Node>> {
        self.members.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for NetworkInner {
    fn drop(&mut self) {
        let members = self
            .members
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);

        for node in members.values() {
            node.stop();
        }
    }
}

#[derive(Debug, Default, Clone)]
/// Network builder
pub struct NetworkBuilder(Config);

impl NetworkBuilder {
    /// Set the size of the identifier space in bits.
    pub fn id_bits(&mut self, bits: u8) -> &mut Self {
        self.0.id_bits = bits;

        self
    }

    /// Set how long nodes idle between stabilization rounds.
    pub fn stabilize_interval(&mut self, interval: Duration) -> &mut Self {
        self.0.stabilize_interval = interval;

        self
    }

    /// Set the maximum number of hops of a lookup.
    pub fn max_hops(&mut self, max_hops: usize) -> &mut Self {
        self.0.max_hops = Some(max_hops);

        self
    }

    /// Create a [Network] with these settings.
    pub fn build(&self) -> Result<Network> {
        Network::new(self.0.clone())
    }
}
