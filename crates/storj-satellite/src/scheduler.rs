//! Ties the audit, checker, and repairer loops to independent jittered
//! tickers under one cancellation token (§4.6, §5 "Cancellation & timeouts").

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audit::Auditor;
use crate::checker::Checker;
use crate::config::SatelliteConfig;
use crate::repairer::Repairer;

async fn jittered_wait(base: Duration, jitter: Duration) {
    let extra_ms = if jitter.is_zero() {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter.as_millis() as u64)
    };
    tokio::time::sleep(base + Duration::from_millis(extra_ms)).await;
}

fn now_unix() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs() as i64
}

pub async fn run_audit_loop(auditor: Arc<Auditor>, config: SatelliteConfig, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("audit loop cancelled");
                return;
            }
            _ = jittered_wait(config.audit_interval, config.jitter) => {
                match auditor.run_once().await {
                    Ok(Some(outcome)) => info!(
                        path = ?outcome.path,
                        succeeded = outcome.succeeded.len(),
                        failed = outcome.failed.len(),
                        offline = outcome.offline.len(),
                        "audit tick"
                    ),
                    Ok(None) => {}
                    Err(err) => warn!(error = %err, "audit tick failed"),
                }
            }
        }
    }
}

pub async fn run_checker_loop(checker: Arc<Checker>, config: SatelliteConfig, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("checker loop cancelled");
                return;
            }
            _ = jittered_wait(config.checker_interval, config.jitter) => {
                match checker.run_once(now_unix()).await {
                    Ok(summary) => info!(
                        scanned = summary.scanned,
                        enqueued = summary.enqueued,
                        irreparable = summary.irreparable,
                        "checker tick"
                    ),
                    Err(err) => warn!(error = %err, "checker tick failed"),
                }
            }
        }
    }
}

pub async fn run_repairer_loop(repairer: Arc<Repairer>, config: SatelliteConfig, cancel: CancellationToken) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("repairer loop cancelled");
                return;
            }
            _ = jittered_wait(config.repairer_interval, config.jitter) => {
                repairer.drain().await;
            }
        }
    }
}
