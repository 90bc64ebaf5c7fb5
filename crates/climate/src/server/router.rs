//! HTTP Router
//!
//! Sets up the axum router for the operator surface.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handler::*;
use super::state::AppState;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status))
        .route("/state", get(actuation_state))
        .route("/control", get(control_signal))
        .route("/set_temperature", post(set_temperature))
        // Health check for monitoring/load balancers
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        // CORS for browser dashboards
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use chrono::NaiveDate;
    use serde_json::Value;
    use tower::ServiceExt;

    use climate_engine::{ClimateInput, EngineConfig, ManualClock, SharedClimate, TopicConfig};

    use crate::bus::{MessageBus, CONTROLLER_SOURCE};
    use crate::publisher::BusCommandPublisher;

    fn setup() -> (Router, SharedClimate, MessageBus) {
        let bus = MessageBus::new(64);
        let topics = TopicConfig::default();
        let clock = ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 7, 15)
                .unwrap()
                .and_hms_opt(14, 0, 0)
                .unwrap(),
        );
        let climate = SharedClimate::new(
            &EngineConfig::default(),
            Arc::new(clock),
            Arc::new(BusCommandPublisher::new(bus.clone(), &topics)),
        );
        let state = AppState::new(climate.clone());
        (create_router(state), climate, bus)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    async fn post_set_point(router: Router, form: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/set_temperature")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (router, _, _) = setup();
        let (status, body) = get_json(router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["cycles"], 0);
    }

    #[tokio::test]
    async fn test_initial_state_all_off() {
        let (router, _, _) = setup();

        let (_, body) = get_json(router.clone(), "/state").await;
        assert_eq!(body["fan"], "OFF");
        assert_eq!(body["cooling"], "OFF");
        assert_eq!(body["heating"], "OFF");

        let (_, body) = get_json(router.clone(), "/control").await;
        assert_eq!(body["control_signal"], 0.0);

        let (_, body) = get_json(router, "/").await;
        assert!(body["current_temperature"].is_null());
        assert!(body["set_temperature"].is_null());
        assert_eq!(body["mode"], "off");
    }

    #[tokio::test]
    async fn test_set_temperature_runs_cycle() {
        let (router, climate, bus) = setup();
        let mut rx = bus.subscribe();
        climate.submit(ClimateInput::Outdoor(80.0));
        climate.submit(ClimateInput::OutdoorAverage(78.0));
        climate.submit(ClimateInput::Indoor(74.0));

        let (status, body) = post_set_point(router.clone(), "set_temperature=70").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Temperature set successfully");
        assert_eq!(body["set_temperature"], 70.0);

        let (_, body) = get_json(router.clone(), "/state").await;
        assert_eq!(body["fan"], "ON");
        assert_eq!(body["cooling"], "ON");
        assert_eq!(body["heating"], "OFF");

        let (_, body) = get_json(router, "/control").await;
        assert!(body["control_signal"].as_f64().unwrap() < 0.0);

        // command first, then the mirrored set-point
        let command = rx.recv().await.unwrap();
        assert_eq!(command.topic, "ac_control");
        let mirror = rx.recv().await.unwrap();
        assert_eq!(mirror.topic, "set_temperature");
        assert_eq!(mirror.source, CONTROLLER_SOURCE);
        assert_eq!(mirror.payload_str(), Some("70"));
    }

    #[tokio::test]
    async fn test_invalid_set_temperature_leaves_state() {
        let (router, climate, bus) = setup();
        climate.set_set_point(70.0);
        let mut rx = bus.subscribe();
        let before = climate.snapshot();

        for form in ["set_temperature=warm", "set_temperature=", "set_temperature=inf", "other=1"] {
            let (status, body) = post_set_point(router.clone(), form).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["message"], "Invalid temperature value");
            assert!(body.get("set_temperature").is_none());
        }

        assert_eq!(climate.snapshot(), before);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_non_form_body_is_a_value_error() {
        let (router, climate, _) = setup();
        climate.set_set_point(70.0);

        let requests = [
            Request::builder()
                .method("POST")
                .uri("/set_temperature")
                .body(Body::from("set_temperature=72"))
                .unwrap(),
            Request::builder()
                .method("POST")
                .uri("/set_temperature")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"set_temperature": 72}"#))
                .unwrap(),
        ];

        for request in requests {
            let response = router.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(body["message"], "Invalid temperature value");
        }

        assert_eq!(climate.set_point(), Some(70.0));
    }

    #[tokio::test]
    async fn test_status_reports_readings() {
        let (router, climate, _) = setup();
        climate.set_set_point(70.0);
        climate.submit(ClimateInput::Outdoor(60.0));
        climate.submit(ClimateInput::Indoor(69.8));

        let (_, body) = get_json(router, "/").await;
        assert_eq!(body["current_temperature"], 69.8);
        assert_eq!(body["set_temperature"], 70.0);
        assert_eq!(body["outdoor_temperature"], 60.0);
        assert_eq!(body["fan_state"], "OFF");
        assert_eq!(body["cooling_state"], "OFF");
        assert_eq!(body["heating_state"], "OFF");
    }
}
