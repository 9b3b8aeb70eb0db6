use crate::config::AppConfig;
use crate::container::MAGIC;
use crate::state::{AppMetrics, AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let uptime_seconds = state.get_uptime_seconds();

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port,
            "container_format": String::from_utf8_lossy(MAGIC)
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "conversions": metrics.conversions
        },
        "memory": get_memory_info(),
        "limits": upload_limits(&config)
    }))
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats: Vec<_> = metrics
        .endpoint_metrics
        .iter()
        .map(|(endpoint, metric)| {
            json!({
                "endpoint": endpoint,
                "request_count": metric.request_count,
                "error_count": metric.error_count,
                "error_rate": metric.error_rate(),
                "average_duration_ms": metric.average_duration_ms(),
                "total_duration_ms": metric.total_duration_ms
            })
        })
        .collect();
    endpoint_stats.sort_by(|a, b| a["endpoint"].as_str().cmp(&b["endpoint"].as_str()));

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "conversions": conversion_stats(&metrics),
        "endpoints": endpoint_stats,
        "memory": get_memory_info(),
        "limits": upload_limits(&state.get_config())
    }))
}

fn conversion_stats(metrics: &AppMetrics) -> serde_json::Value {
    json!({
        "total": metrics.conversions,
        "samples_packed": metrics.samples_packed,
        "container_bytes_written": metrics.container_bytes_written,
        "average_container_bytes": if metrics.conversions > 0 {
            metrics.container_bytes_written as f64 / metrics.conversions as f64
        } else {
            0.0
        },
        "inspections": metrics.inspections
    })
}

fn upload_limits(config: &AppConfig) -> serde_json::Value {
    json!({
        "max_samples": config.upload.max_samples,
        "max_sample_bytes": config.upload.max_sample_bytes,
        "max_manifest_bytes": config.upload.max_manifest_bytes,
        "max_container_bytes": config.upload.max_container_bytes
    })
}

fn get_memory_info() -> serde_json::Value {
    #[cfg(target_os = "linux")]
    {
        let pid = std::process::id();
        if let Ok(status) = std::fs::read_to_string(format!("/proc/{}/status", pid)) {
            let mut vm_rss = 0;
            let mut vm_size = 0;

            for line in status.lines() {
                let kb = || {
                    line.split_whitespace()
                        .nth(1)
                        .and_then(|kb| kb.parse::<u64>().ok())
                        .unwrap_or(0)
                        * 1024
                };
                if line.starts_with("VmRSS:") {
                    vm_rss = kb();
                } else if line.starts_with("VmSize:") {
                    vm_size = kb();
                }
            }

            return json!({
                "resident_memory_bytes": vm_rss,
                "virtual_memory_bytes": vm_size,
                "available": true
            });
        }
    }

    json!({
        "resident_memory_bytes": 0,
        "virtual_memory_bytes": 0,
        "available": false,
        "note": "Memory info not available on this platform"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_health_reports_format_and_conversions() {
        let state = AppState::new(AppConfig::default());
        state.record_conversion(2, 100);

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/health", web::get().to(health_check)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"]["container_format"], "DWPv1");
        assert_eq!(body["metrics"]["conversions"], 1);
        assert_eq!(body["limits"]["max_samples"], 128);
    }

    #[actix_web::test]
    async fn test_metrics_include_conversion_stats() {
        let state = AppState::new(AppConfig::default());
        state.record_conversion(3, 300);
        state.record_inspection();

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .route("/metrics", web::get().to(detailed_metrics)),
        )
        .await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["conversions"]["total"], 1);
        assert_eq!(body["conversions"]["samples_packed"], 3);
        assert_eq!(body["conversions"]["inspections"], 1);
    }
}
