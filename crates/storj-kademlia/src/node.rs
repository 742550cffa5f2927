use storj_crypto::NodeId;

/// An entry in the routing table's arena: everything known about a peer,
/// independent of which bucket currently holds its ID (§4.4 redesign note:
/// "the routing table is modeled as an arena").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub id: NodeId,
    pub address: String,
    pub(crate) consecutive_failures: u32,
}

impl NodeRecord {
    pub fn new(id: NodeId, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            consecutive_failures: 0,
        }
    }
}
