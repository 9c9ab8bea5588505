//! Read-only HTTP view of detector state.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;

use crate::detector::SurgeDetector;

pub fn router(detector: SurgeDetector) -> Router {
    Router::new()
        .route("/alerts", get(alerts))
        .route("/signals", get(signals))
        .route("/history/:theater_id", get(history))
        .route("/status", get(status))
        .with_state(detector)
        .merge(airwatch_core::health_router())
}

async fn alerts(State(det): State<SurgeDetector>) -> Response {
    Json(det.active_alerts()).into_response()
}

async fn signals(State(det): State<SurgeDetector>) -> Response {
    Json(det.active_signals()).into_response()
}

async fn history(State(det): State<SurgeDetector>, Path(theater_id): Path<String>) -> Response {
    if det.registry().theater(&theater_id).is_none() {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "unknown theater", "theater_id": theater_id}))).into_response();
    }
    Json(det.theater_history(&theater_id)).into_response()
}

async fn status(State(det): State<SurgeDetector>) -> Response {
    Json(json!({
        "ready": airwatch_core::is_ready(),
        "theaters_configured": det.registry().theaters().len(),
        "bases_configured": det.registry().bases().len(),
        "state": det.summary(),
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DetectorConfig;
    use crate::model::{AircraftType, Flight};
    use crate::registry::TheaterRegistry;
    use axum::body::to_bytes;

    fn detector() -> SurgeDetector { SurgeDetector::new(TheaterRegistry::builtin(), DetectorConfig::default()).unwrap() }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn alerts_and_signals_reflect_state() {
        let det = detector();
        let flights: Vec<_> = (0..6).map(|i| Flight::new(format!("t{i}"), "RCH1", AircraftType::Transport, 25.2, 51.4)).collect();
        det.analyze(&flights);

        let alerts = body_json(alerts(State(det.clone())).await).await;
        assert_eq!(alerts.as_array().unwrap().len(), 1);
        assert_eq!(alerts[0]["id"], "airlift-persian-gulf");

        let signals = body_json(signals(State(det.clone())).await).await;
        assert_eq!(signals[0]["type"], "military_surge");
        assert_eq!(signals[0]["metadata"]["theater_id"], "persian-gulf");
    }

    #[tokio::test]
    async fn history_unknown_theater_is_404() {
        let det = detector();
        let resp = history(State(det.clone()), Path("atlantis".to_string())).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = history(State(det), Path("baltic".to_string())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!([]));
    }

    #[tokio::test]
    async fn status_reports_catalog_and_state() {
        let det = detector();
        let v = body_json(status(State(det)).await).await;
        assert_eq!(v["theaters_configured"], 6);
        assert_eq!(v["state"]["active_alerts"], 0);
        assert!(v["state"]["last_cycle"].is_null());
    }

    #[test]
    fn router_builds() {
        let _ = router(detector());
    }
}
