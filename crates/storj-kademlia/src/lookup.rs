use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use storj_crypto::NodeId;

use crate::client::NodeClient;
use crate::node::NodeRecord;
use crate::routing_table::RoutingTable;

/// Parameters for an iterative lookup (§4.4 "Peer discovery").
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryOptions {
    /// `alpha`: how many not-yet-queried nodes to fan out to per round.
    pub concurrency: usize,
    /// Per-node retry budget before a node is marked failed for this lookup.
    pub retries: u32,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            concurrency: 3,
            retries: 3,
        }
    }
}

/// Iterative `FindNode(target)`: starting from `seeds`, repeatedly query the
/// `alpha` closest not-yet-queried candidates, merge their answers into the
/// candidate set, and stop once a round discovers nothing closer than what
/// was already known (§4.4).
///
/// Every node that responds is recorded in `routing_table` via
/// [`RoutingTable::mark_seen`]; every node whose retry budget is exhausted is
/// recorded via [`RoutingTable::mark_failed`]. Returns the known nodes
/// ordered by distance to `target`, closest first.
pub async fn iterative_find_node(
    routing_table: &RoutingTable,
    client: &Arc<dyn NodeClient>,
    target: NodeId,
    seeds: Vec<NodeRecord>,
    opts: DiscoveryOptions,
) -> Vec<NodeRecord> {
    let mut queried: HashSet<NodeId> = HashSet::new();
    let mut candidates: Vec<NodeRecord> = seeds;
    candidates.sort_by_key(|r| target.xor_distance(&r.id));
    candidates.dedup_by_key(|r| r.id);

    loop {
        let round: Vec<NodeRecord> = candidates
            .iter()
            .filter(|r| !queried.contains(&r.id))
            .take(opts.concurrency.max(1))
            .cloned()
            .collect();
        if round.is_empty() {
            break;
        }

        let closest_distance_before = candidates.first().map(|r| target.xor_distance(&r.id));

        let queries = round.iter().map(|node| {
            let client = Arc::clone(client);
            let node = node.clone();
            async move { (node.id, query_with_retries(&client, &node, target, opts.retries).await) }
        });
        let results = join_all(queries).await;

        for (queried_id, outcome) in results {
            queried.insert(queried_id);
            match outcome {
                Some(found) => {
                    if let Some(record) = candidates.iter().find(|r| r.id == queried_id).cloned() {
                        routing_table.mark_seen(record);
                    }
                    for discovered in found {
                        if discovered.id == routing_table.self_id() {
                            continue;
                        }
                        if !candidates.iter().any(|c| c.id == discovered.id) {
                            candidates.push(discovered);
                        }
                    }
                }
                None => {
                    routing_table.mark_failed(queried_id);
                }
            }
        }

        candidates.sort_by_key(|r| target.xor_distance(&r.id));
        candidates.dedup_by_key(|r| r.id);

        let closest_distance_after = candidates.first().map(|r| target.xor_distance(&r.id));
        let improved = match (closest_distance_before, closest_distance_after) {
            (Some(before), Some(after)) => after < before,
            (None, Some(_)) => true,
            _ => false,
        };
        if !improved {
            break;
        }
    }

    candidates
}

async fn query_with_retries(
    client: &Arc<dyn NodeClient>,
    node: &NodeRecord,
    target: NodeId,
    retries: u32,
) -> Option<Vec<NodeRecord>> {
    for _ in 0..retries.max(1) {
        if let Ok(found) = client.find_node(node, target).await {
            return Some(found);
        }
    }
    None
}
