use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn get_config(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": config_json(&config)
    })))
}

/// Apply a partial configuration update.
///
/// Limits apply to requests that start after the update; uploads already in
/// flight keep the limits they started with. Server address changes are
/// stored but need a restart, which the response reports as
/// `restart_required`.
pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> AppResult<HttpResponse> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let previous_config = state.get_config();
    let mut current_config = previous_config.clone();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    let restart_required = current_config.server != previous_config.server;
    if restart_required {
        tracing::warn!(
            host = %current_config.server.host,
            port = current_config.server.port,
            "Server address changed; takes effect after restart"
        );
    }
    tracing::info!("Configuration updated at runtime");

    let message = if restart_required {
        "Configuration updated; server address changes apply after restart"
    } else {
        "Configuration updated successfully"
    };

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": message,
        "restart_required": restart_required,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": config_json(&current_config)
    })))
}

fn config_json(config: &AppConfig) -> serde_json::Value {
    json!({
        "server": {
            "host": config.server.host,
            "port": config.server.port
        },
        "upload": {
            "max_samples": config.upload.max_samples,
            "max_sample_bytes": config.upload.max_sample_bytes,
            "max_manifest_bytes": config.upload.max_manifest_bytes,
            "max_container_bytes": config.upload.max_container_bytes
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_update_config_applies_partial_changes() {
        let state = AppState::new(AppConfig::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/config", web::get().to(get_config))
                .route("/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({"upload": {"max_samples": 4}}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["updated_config"]["upload"]["max_samples"], 4);
        assert_eq!(body["restart_required"], false);
        assert_eq!(state.get_config().upload.max_samples, 4);

        let req = test::TestRequest::get().uri("/config").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["config"]["upload"]["max_samples"], 4);
    }

    #[actix_web::test]
    async fn test_update_config_flags_server_change_as_restart_only() {
        let state = AppState::new(AppConfig::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({"server": {"port": 9090}}))
            .to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["restart_required"], true);
        assert!(body["message"].as_str().unwrap().contains("restart"));
        assert_eq!(body["updated_config"]["server"]["port"], 9090);
    }

    #[actix_web::test]
    async fn test_update_config_rejects_invalid_values() {
        let state = AppState::new(AppConfig::default());
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/config", web::put().to(update_config)),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/config")
            .set_json(json!({"upload": {"max_sample_bytes": 0}}))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.get_config().upload.max_sample_bytes, 64 * 1024 * 1024);
    }
}
