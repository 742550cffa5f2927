//! Prometheus counters/gauges for the three background loops, served over
//! an `actix-web` `/metrics` endpoint (§5.A "Metrics", modeled on the
//! teacher's `subspace-metrics`).

use std::sync::Arc;

use actix_web::{web, App, HttpResponse, HttpServer};
use prometheus_client::encoding::text::encode;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

pub struct SatelliteMetrics {
    pub audits_run: Counter,
    pub audit_failures: Counter,
    pub nodes_offline: Counter,
    pub segments_enqueued_for_repair: Counter,
    pub segments_marked_irreparable: Counter,
    pub repairs_succeeded: Counter,
    pub repairs_failed: Counter,
    pub repair_queue_depth: Gauge,
}

impl SatelliteMetrics {
    pub fn register(registry: &mut Registry) -> Arc<Self> {
        let metrics = Arc::new(Self {
            audits_run: Counter::default(),
            audit_failures: Counter::default(),
            nodes_offline: Counter::default(),
            segments_enqueued_for_repair: Counter::default(),
            segments_marked_irreparable: Counter::default(),
            repairs_succeeded: Counter::default(),
            repairs_failed: Counter::default(),
            repair_queue_depth: Gauge::default(),
        });
        registry.register("audits_run", "Audit ticks performed", metrics.audits_run.clone());
        registry.register("audit_failures", "Nodes flagged failed by an audit", metrics.audit_failures.clone());
        registry.register("nodes_offline", "Nodes flagged offline by an audit", metrics.nodes_offline.clone());
        registry.register(
            "segments_enqueued_for_repair",
            "Segments enqueued for repair by the checker",
            metrics.segments_enqueued_for_repair.clone(),
        );
        registry.register(
            "segments_marked_irreparable",
            "Segments appended to the irreparable log",
            metrics.segments_marked_irreparable.clone(),
        );
        registry.register("repairs_succeeded", "Segment repairs committed", metrics.repairs_succeeded.clone());
        registry.register("repairs_failed", "Segment repairs that exhausted their retries", metrics.repairs_failed.clone());
        registry.register("repair_queue_depth", "Current repair queue length", metrics.repair_queue_depth.clone());
        metrics
    }
}

async fn metrics_handler(registry: web::Data<Registry>) -> HttpResponse {
    let mut body = String::new();
    match encode(&mut body, &registry) {
        Ok(()) => HttpResponse::Ok()
            .content_type("application/openmetrics-text; version=1.0.0; charset=utf-8")
            .body(body),
        Err(_) => HttpResponse::InternalServerError().finish(),
    }
}

/// Serve `/metrics` on `addr` until the process exits.
pub async fn serve(registry: Registry, addr: &str) -> std::io::Result<()> {
    let registry = web::Data::new(registry);
    HttpServer::new(move || App::new().app_data(registry.clone()).route("/metrics", web::get().to(metrics_handler)))
        .bind(addr)?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_metrics_render_as_openmetrics_text() {
        let mut registry = Registry::default();
        let metrics = SatelliteMetrics::register(&mut registry);
        metrics.audits_run.inc();
        metrics.repair_queue_depth.set(4);

        let mut body = String::new();
        encode(&mut body, &registry).unwrap();
        assert!(body.contains("audits_run"));
        assert!(body.contains("repair_queue_depth"));
    }
}
