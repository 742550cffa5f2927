//! Statistics database, irreparable-segment log, repair queue, and the
//! audit/checker/repairer background loops that keep remote segments at
//! their configured redundancy (§4.6, §3.A, §5.A).

mod audit;
mod checker;
mod config;
mod error;
mod irreparable;
mod metrics;
mod repair_queue;
mod repairer;
mod retry;
mod scheduler;
mod statistics;

pub use audit::{AuditConfig, AuditOutcome, Auditor};
pub use checker::{Checker, CheckerSummary};
pub use config::SatelliteConfig;
pub use error::{Result, SatelliteError};
pub use irreparable::{IrreparableLog, IrreparableRecord};
pub use metrics::SatelliteMetrics;
pub use repair_queue::{RepairQueue, RepairQueueEntry};
pub use repairer::{Repairer, RepairerConfig};
pub use scheduler::{run_audit_loop, run_checker_loop, run_repairer_loop};
pub use statistics::{NodeStats, StatUpdate, StatisticsDb};

pub use metrics::serve as serve_metrics;
