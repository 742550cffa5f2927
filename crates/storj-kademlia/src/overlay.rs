use std::collections::HashSet;
use std::sync::Arc;

use storj_crypto::NodeId;

use crate::node::NodeRecord;
use crate::routing_table::RoutingTable;

/// Reputation lookup the overlay consults alongside routing-table freshness
/// (§4.4: "backed by the routing table ... and by the statistics database").
/// The statistics database itself lives in `storj-satellite`; this trait is
/// the seam so `storj-kademlia` does not depend on it.
pub trait Reputation: Send + Sync {
    fn is_suspended(&self, id: &NodeId) -> bool;
}

/// A `Reputation` that never suspends anyone, for tests and for satellites
/// run without reputation tracking configured.
pub struct NoReputation;

impl Reputation for NoReputation {
    fn is_suspended(&self, _id: &NodeId) -> bool {
        false
    }
}

/// A predicate a candidate node must satisfy to be returned by
/// [`Overlay::choose`] (§4.4 "restriction predicates").
pub type Restriction = Arc<dyn Fn(&NodeRecord) -> bool + Send + Sync>;

/// Satellite-side node directory: fresh addresses from the routing table,
/// filtered by reputation (§4.4).
pub struct Overlay {
    routing_table: Arc<RoutingTable>,
    reputation: Arc<dyn Reputation>,
}

impl Overlay {
    pub fn new(routing_table: Arc<RoutingTable>, reputation: Arc<dyn Reputation>) -> Self {
        Self {
            routing_table,
            reputation,
        }
    }

    /// Look up each ID in turn, preserving order; unknown IDs map to `None`
    /// (§4.4 "bulk lookup preserves input order").
    pub fn bulk_lookup(&self, ids: &[NodeId]) -> Vec<Option<NodeRecord>> {
        ids.iter().map(|id| self.routing_table.get(id)).collect()
    }

    /// `amount` distinct records satisfying every restriction and not in
    /// `excluded` (§4.4 "Choose"). Suspended nodes (per [`Reputation`]) are
    /// never selected. Returns fewer than `amount` if the candidate pool is
    /// exhausted.
    pub fn choose(
        &self,
        amount: usize,
        restrictions: &[Restriction],
        excluded: &HashSet<NodeId>,
    ) -> Vec<NodeRecord> {
        self.routing_table
            .all()
            .into_iter()
            .filter(|record| !excluded.contains(&record.id))
            .filter(|record| !self.reputation.is_suspended(&record.id))
            .filter(|record| restrictions.iter().all(|r| r(record)))
            .take(amount)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(byte: u8) -> NodeId {
        NodeId([byte; 32])
    }

    #[test]
    fn bulk_lookup_preserves_order_with_placeholders() {
        let rt = Arc::new(RoutingTable::new(id(0), 20, 3));
        rt.mark_seen(NodeRecord::new(id(5), "5"));
        let overlay = Overlay::new(Arc::clone(&rt), Arc::new(NoReputation));

        let results = overlay.bulk_lookup(&[id(1), id(5), id(9)]);
        assert!(results[0].is_none());
        assert_eq!(results[1].as_ref().unwrap().id, id(5));
        assert!(results[2].is_none());
    }

    #[test]
    fn choose_excludes_and_respects_restrictions() {
        let rt = Arc::new(RoutingTable::new(id(0), 20, 3));
        rt.mark_seen(NodeRecord::new(id(1), "one"));
        rt.mark_seen(NodeRecord::new(id(2), "two"));
        let overlay = Overlay::new(Arc::clone(&rt), Arc::new(NoReputation));

        let mut excluded = HashSet::new();
        excluded.insert(id(1));
        let chosen = overlay.choose(5, &[], &excluded);
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].id, id(2));

        let restriction: Restriction = Arc::new(|r: &NodeRecord| r.address == "one");
        let chosen = overlay.choose(5, &[restriction], &HashSet::new());
        assert_eq!(chosen.len(), 1);
        assert_eq!(chosen[0].id, id(1));
    }
}
