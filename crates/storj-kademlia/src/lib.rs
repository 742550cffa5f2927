//! Kademlia routing table, node client trait, iterative lookup, and the
//! satellite-side overlay cache (§4.4).

mod bucket;
mod client;
mod error;
mod kademlia;
mod lookup;
mod node;
mod overlay;
mod routing_table;

pub use client::NodeClient;
pub use error::{KademliaError, Result};
pub use kademlia::Kademlia;
pub use lookup::{iterative_find_node, DiscoveryOptions};
pub use node::NodeRecord;
pub use overlay::{NoReputation, Overlay, Reputation, Restriction};
pub use routing_table::RoutingTable;
