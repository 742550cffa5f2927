use std::sync::Arc;

use arc_swap::ArcSwapOption;
use storj_crypto::NodeId;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::client::NodeClient;
use crate::error::{KademliaError, Result};
use crate::lookup::{iterative_find_node, DiscoveryOptions};
use crate::node::NodeRecord;
use crate::routing_table::RoutingTable;

/// Top-level Kademlia node (§4.4): owns the routing table, the node client
/// used to talk to peers, and the bootstrap lifecycle.
pub struct Kademlia {
    routing_table: Arc<RoutingTable>,
    client: Arc<dyn NodeClient>,
    bootstrap_nodes: Vec<NodeRecord>,
    discovery: DiscoveryOptions,
    bootstrap_cancel: ArcSwapOption<CancellationToken>,
}

impl Kademlia {
    pub fn new(
        self_id: NodeId,
        bootstrap_nodes: Vec<NodeRecord>,
        client: Arc<dyn NodeClient>,
        k: usize,
        failure_threshold: u32,
        discovery: DiscoveryOptions,
    ) -> Self {
        Self {
            routing_table: Arc::new(RoutingTable::new(self_id, k, failure_threshold)),
            client,
            bootstrap_nodes,
            discovery,
            bootstrap_cancel: ArcSwapOption::empty(),
        }
    }

    pub fn routing_table(&self) -> &Arc<RoutingTable> {
        &self.routing_table
    }

    /// `FindNode(self_id)` against the configured bootstrap nodes, run in a
    /// cancellable background task (§4.4 "Bootstrap"). Returns once the
    /// lookup has converged; cancellation via [`Self::disconnect`] unblocks
    /// it early.
    pub async fn bootstrap(&self) -> Result<()> {
        if self.bootstrap_nodes.is_empty() {
            return Err(KademliaError::NoBootstrapNodes);
        }

        let cancel = CancellationToken::new();
        self.bootstrap_cancel.store(Some(Arc::new(cancel.clone())));

        let self_id = self.routing_table.self_id();
        let lookup = iterative_find_node(
            &self.routing_table,
            &self.client,
            self_id,
            self.bootstrap_nodes.clone(),
            self.discovery,
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                warn!("bootstrap cancelled before convergence");
                Err(KademliaError::Cancelled)
            }
            _ = lookup => Ok(()),
        }
    }

    /// Look up `target`'s current record, first locally then over the
    /// network if necessary (§4.4, `FindNode`).
    pub async fn find_node(&self, target: NodeId) -> Result<NodeRecord> {
        if let Some(record) = self.routing_table.get(&target) {
            return Ok(record);
        }

        let seeds = self.routing_table.find_near(target, self.routing_table_k());
        let found = iterative_find_node(&self.routing_table, &self.client, target, seeds, self.discovery).await;
        found
            .into_iter()
            .find(|r| r.id == target)
            .ok_or(KademliaError::NodeNotFound(target))
    }

    fn routing_table_k(&self) -> usize {
        // Mirrors the original's `GetNodes`/`FindNear` call sites, which
        // always ask for a full bucket's worth of candidates to seed a
        // lookup (§4.4).
        20
    }

    /// Cancel any in-flight bootstrap. Race-free whether or not bootstrap
    /// has started yet, via the atomically-swappable cancellation handle
    /// (§4.4 "Disconnect cancels it atomically").
    pub fn disconnect(&self) {
        if let Some(cancel) = self.bootstrap_cancel.swap(None) {
            cancel.cancel();
        }
    }
}
