// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! HTTP control API.
//!
//! | Route | Action |
//! |---|---|
//! | `GET /` | list devices, sorted by identity |
//! | `GET /{id}` | one device |
//! | `POST /{id}/pause`, `/play`, `/stop` | playback commands |
//! | `POST /{id}/volume?value=N` | volume percentage, clamped to `0..=100` |
//! | `POST /{id}/subscribe?url=U` | register a webhook after a `ping` probe |
//! | `POST /{id}/unsubscribe?url=U` | remove a webhook |
//!
//! Control operations answer with a [`ControlEnvelope`], including when the
//! method is wrong (405) or the query string cannot be decoded (400).

mod envelope;

use std::sync::Arc;

use axum::Router;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use serde::{Deserialize, Serialize};

pub use envelope::{ApiError, ControlEnvelope};

use crate::error::{Error, ValueError};
use crate::event::DeviceId;
use crate::manager::DeviceManager;

type ManagerState = State<Arc<DeviceManager>>;
type ApiResult = Result<ControlEnvelope, ApiError>;
type QueryResult<T> = Result<Query<T>, QueryRejection>;

/// Builds the control API router.
pub fn router(manager: Arc<DeviceManager>) -> Router {
    Router::new()
        .route("/", get(list))
        .route("/{id}", get(get_device))
        .route("/{id}/pause", any(pause))
        .route("/{id}/play", any(play))
        .route("/{id}/stop", any(stop))
        .route("/{id}/volume", any(volume))
        .route("/{id}/subscribe", any(subscribe))
        .route("/{id}/unsubscribe", any(unsubscribe))
        .with_state(manager)
}

#[derive(Debug, Deserialize)]
struct ValueQuery {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UrlQuery {
    url: Option<String>,
}

fn json_body<T: Serialize>(operation: &str, value: &T, failure: &str) -> Response {
    match serde_json::to_vec(value) {
        Ok(body) => ([(header::CONTENT_TYPE, "application/json")], body).into_response(),
        Err(e) => {
            tracing::error!(operation, error = %e, "Failed to serialize response");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, operation, failure).into_response()
        }
    }
}

async fn list(State(manager): ManagerState) -> Response {
    let devices = manager.list().await;
    json_body("list", &devices, "cant serialise current device list")
}

async fn get_device(State(manager): ManagerState, Path(id): Path<String>) -> Response {
    let id = DeviceId::from(id);
    match manager.snapshot(&id).await {
        Some(snapshot) => json_body("Get", &snapshot, "cant serialise device"),
        None => ApiError::unknown_device("Get").into_response(),
    }
}

async fn pause(method: Method, State(manager): ManagerState, Path(id): Path<String>) -> ApiResult {
    require_post(&method, "pause")?;
    manager
        .pause(&DeviceId::from(id))
        .await
        .map_err(|e| ApiError::from_error("pause", &e))?;
    Ok(ControlEnvelope::success("pause"))
}

async fn play(method: Method, State(manager): ManagerState, Path(id): Path<String>) -> ApiResult {
    require_post(&method, "play")?;
    manager
        .play(&DeviceId::from(id))
        .await
        .map_err(|e| ApiError::from_error("play", &e))?;
    Ok(ControlEnvelope::success("play"))
}

async fn stop(method: Method, State(manager): ManagerState, Path(id): Path<String>) -> ApiResult {
    require_post(&method, "stop")?;
    manager
        .stop(&DeviceId::from(id))
        .await
        .map_err(|e| ApiError::from_error("stop", &e))?;
    Ok(ControlEnvelope::success("stop"))
}

async fn volume(
    method: Method,
    State(manager): ManagerState,
    Path(id): Path<String>,
    query: QueryResult<ValueQuery>,
) -> ApiResult {
    const OP: &str = "volume";
    require_post(&method, OP)?;
    let id = DeviceId::from(id);
    ensure_known(&manager, &id, OP).await?;

    let raw = query_params(query, OP)?
        .value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(OP, "missing value parameter"))?;
    let percent = parse_percent(&raw).map_err(|e| ApiError::from_error(OP, &Error::from(e)))?;

    manager
        .set_volume(&id, percent)
        .await
        .map_err(|e| ApiError::from_error(OP, &e))?;
    Ok(ControlEnvelope::success(OP))
}

fn parse_percent(raw: &str) -> Result<i64, ValueError> {
    raw.trim()
        .parse()
        .map_err(|_| ValueError::Invalid("value parameter invalid".to_string()))
}

async fn subscribe(
    method: Method,
    State(manager): ManagerState,
    Path(id): Path<String>,
    query: QueryResult<UrlQuery>,
) -> ApiResult {
    const OP: &str = "subscribe";
    let (id, url) = callback_request(&method, &manager, id, query, OP).await?;

    match manager.subscribe(&id, &url).await {
        Ok(true) => Ok(ControlEnvelope::success(OP)),
        Ok(false) => Err(ApiError::bad_request(
            OP,
            "could not add callback url as it is already present",
        )),
        Err(Error::Protocol(e)) => {
            tracing::warn!(device_id = %id, url = %url, error = %e, "Webhook probe failed");
            Err(ApiError::not_found(
                OP,
                "could not post \"ping\" action to passed URL",
            ))
        }
        Err(e) => Err(ApiError::from_error(OP, &e)),
    }
}

async fn unsubscribe(
    method: Method,
    State(manager): ManagerState,
    Path(id): Path<String>,
    query: QueryResult<UrlQuery>,
) -> ApiResult {
    const OP: &str = "unsubscribe";
    let (id, url) = callback_request(&method, &manager, id, query, OP).await?;

    match manager.unsubscribe(&id, &url).await {
        Ok(true) => Ok(ControlEnvelope::success(OP)),
        Ok(false) => Err(ApiError::not_found(
            OP,
            format!("url: \"{url}\" not registered"),
        )),
        Err(e) => Err(ApiError::from_error(OP, &e)),
    }
}

/// Validates a (un)subscribe request: method, then identity, then url.
async fn callback_request(
    method: &Method,
    manager: &DeviceManager,
    id: String,
    query: QueryResult<UrlQuery>,
    operation: &str,
) -> Result<(DeviceId, String), ApiError> {
    if method != Method::POST {
        return Err(ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            operation,
            "callback registration must be a POST request",
        ));
    }

    let id = DeviceId::from(id);
    ensure_known(manager, &id, operation).await?;

    let url = query_params(query, operation)?
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request(operation, "missing url parameter"))?;
    Ok((id, url))
}

fn require_post(method: &Method, operation: &str) -> Result<(), ApiError> {
    if method == Method::POST {
        Ok(())
    } else {
        Err(ApiError::new(
            StatusCode::METHOD_NOT_ALLOWED,
            operation,
            format!("{operation} must be a POST request"),
        ))
    }
}

fn query_params<T>(query: QueryResult<T>, operation: &str) -> Result<T, ApiError> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| ApiError::bad_request(operation, rejection.body_text()))
}

async fn ensure_known(
    manager: &DeviceManager,
    id: &DeviceId,
    operation: &str,
) -> Result<(), ApiError> {
    if manager.snapshot(id).await.is_some() {
        Ok(())
    } else {
        Err(ApiError::unknown_device(operation))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use super::*;
    use crate::HubConfig;
    use crate::control::testing::{Call, RecordingController};
    use crate::control::{CastController, DiscoveredDevice};
    use crate::push::WebhookTransport;
    use crate::push::testing::RecordingTransport;
    use crate::subscription::SubscriptionStore;

    type Events = tokio::sync::mpsc::Sender<crate::event::CastEvent>;

    async fn setup(controller: &Arc<RecordingController>) -> (Arc<DeviceManager>, Events) {
        let manager = Arc::new(DeviceManager::with_parts(
            HubConfig::new().with_debounce(Duration::from_millis(50)),
            SubscriptionStore::in_memory(),
            Arc::new(RecordingTransport::failing_for(["http://down.test/"]))
                as Arc<dyn WebhookTransport>,
        ));
        let (device, tx) = DiscoveredDevice::channel(
            "Bedroom",
            DeviceId::new("bed-1"),
            "10.0.0.21".parse().unwrap(),
            Arc::clone(controller) as Arc<dyn CastController>,
            4,
        );
        manager.attach(device).await;
        tokio::task::yield_now().await;
        (manager, tx)
    }

    async fn call(
        manager: &Arc<DeviceManager>,
        method: Method,
        uri: &str,
    ) -> (StatusCode, serde_json::Value) {
        let response = router(Arc::clone(manager))
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn list_returns_array() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        let (status, body) = call(&manager, Method::GET, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["uuid"], "bed-1");
        assert_eq!(body[0]["status"], "CONNECTING");
    }

    #[tokio::test]
    async fn get_unknown_device() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        let (status, body) = call(&manager, Method::GET, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            serde_json::json!({"status": "error", "operation": "Get", "error": "UUID not found"})
        );
    }

    #[tokio::test]
    async fn commands_forward_to_controller() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        for op in ["pause", "play", "stop"] {
            let (status, body) = call(&manager, Method::POST, &format!("/bed-1/{op}")).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, serde_json::json!({"status": "success", "operation": op}));
        }
        assert_eq!(
            controller.calls(),
            vec![Call::Connect, Call::Pause, Call::Play, Call::Stop]
        );
    }

    #[tokio::test]
    async fn controller_failure_is_500() {
        let controller = Arc::new(RecordingController::failing());
        let (manager, _events) = setup(&controller).await;

        let (status, body) = call(&manager, Method::POST, "/bed-1/play").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["status"], "error");
        assert_eq!(body["operation"], "play");
    }

    #[tokio::test]
    async fn volume_parameter_errors() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        let (status, body) = call(&manager, Method::POST, "/bed-1/volume").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing value parameter");

        let (status, _) = call(&manager, Method::POST, "/bed-1/volume?value=loud").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&manager, Method::POST, "/ghost/volume?value=10").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn subscribe_requires_post() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        let (status, body) = call(&manager, Method::GET, "/bed-1/subscribe?url=http://a/").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body["operation"], "subscribe");

        let (status, _) = call(&manager, Method::PUT, "/bed-1/unsubscribe?url=http://a/").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn subscribe_checks_identity_before_url() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        let (status, _) = call(&manager, Method::POST, "/ghost/subscribe").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(&manager, Method::POST, "/bed-1/subscribe").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "missing url parameter");
    }

    #[tokio::test]
    async fn subscribe_unreachable_url_is_404() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        let (status, _) = call(
            &manager,
            Method::POST,
            "/bed-1/subscribe?url=http%3A%2F%2Fdown.test%2F",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(
            manager
                .subscriptions()
                .urls_for(&DeviceId::new("bed-1"))
                .is_empty()
        );
    }

    #[tokio::test]
    async fn commands_require_post_with_envelope() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        for op in ["pause", "play", "stop", "volume"] {
            let (status, body) = call(&manager, Method::GET, &format!("/bed-1/{op}?value=5")).await;
            assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
            assert_eq!(
                body,
                serde_json::json!({
                    "status": "error",
                    "operation": op,
                    "error": format!("{op} must be a POST request"),
                })
            );
        }
        assert_eq!(controller.calls(), vec![Call::Connect]);
    }

    #[tokio::test]
    async fn malformed_query_answers_with_envelope() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        let (status, body) =
            call(&manager, Method::POST, "/bed-1/volume?value=1&value=2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_eq!(body["operation"], "volume");

        let (status, body) =
            call(&manager, Method::POST, "/bed-1/subscribe?url=http://a/&url=http://b/").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["operation"], "subscribe");
        assert!(manager.subscriptions().urls_for(&DeviceId::new("bed-1")).is_empty());
    }

    #[tokio::test]
    async fn subscribe_url_with_separator_is_400() {
        let controller = Arc::new(RecordingController::default());
        let (manager, _events) = setup(&controller).await;

        let (status, body) = call(
            &manager,
            Method::POST,
            "/bed-1/subscribe?url=http%3A%2F%2Fhook.test%2Fcb%3Fa%3D1%3Bb%3D2",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["operation"], "subscribe");
        assert_eq!(body["error"], "invalid value: url must not contain ';'");
        assert!(manager.subscriptions().urls_for(&DeviceId::new("bed-1")).is_empty());
    }

    #[test]
    fn percent_parsing() {
        assert_eq!(parse_percent("150"), Ok(150));
        assert_eq!(parse_percent(" 7 "), Ok(7));
        assert!(parse_percent("").is_err());
        assert!(parse_percent("1.5").is_err());
    }
}
