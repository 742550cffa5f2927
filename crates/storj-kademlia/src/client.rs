use async_trait::async_trait;
use storj_crypto::NodeId;

use crate::error::Result;
use crate::node::NodeRecord;

/// The RPC surface a peer exposes to the rest of the Kademlia logic (§4.4).
/// The authenticated transport itself is an external collaborator (§1); this
/// trait is the boundary the routing table and the iterative lookup depend
/// on, so they can run against an in-process simulated network in tests.
#[async_trait]
pub trait NodeClient: Send + Sync {
    /// Liveness check. `Ok(true)` marks the node seen; any `Err`, or
    /// `Ok(false)`, counts as a failure against the routing table.
    async fn ping(&self, node: &NodeRecord) -> Result<bool>;

    /// Ask `node` for the nodes closest to `target` it knows about.
    async fn find_node(&self, node: &NodeRecord, target: NodeId) -> Result<Vec<NodeRecord>>;
}
