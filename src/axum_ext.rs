//! Axum integration for the monitor's HTTP API.
//!
//! Provides handlers for the firmware's three endpoints and a [`router`]
//! to wire them up. The registry sits behind an `Arc<Mutex<_>>` so every
//! operation runs to completion before the next begins, which is the same
//! serialization the single-core firmware loop gave it.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::{Arc, Mutex};
//! use battreg::{DeviceRegistry, FileBacking};
//! use battreg::axum_ext::router;
//!
//! let registry = DeviceRegistry::open(FileBacking::new("battreg.bin"))?;
//! let app = router(Arc::new(Mutex::new(registry)));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:80").await?;
//! axum::serve(listener, app).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::storage::Backing;
use crate::wire::{DeleteRequest, ErrorResponse, StatusResponse, VoltageReading};
use crate::{DeviceRegistry, Error};

/// Registry shared across handlers.
pub type SharedRegistry<B> = Arc<Mutex<DeviceRegistry<B>>>;

/// Build a router serving the firmware's HTTP surface.
///
/// `/setPercentageOffs` is the name later firmware revisions gave the bulk
/// write endpoint; both names hit the same handler.
pub fn router<B>(registry: SharedRegistry<B>) -> Router
where
    B: Backing + Send + 'static,
{
    Router::new()
        .route("/setVoltages", post(set_voltages::<B>))
        .route("/setPercentageOffs", post(set_voltages::<B>))
        .route("/getVoltageById", get(get_voltage_by_id::<B>))
        .route("/deleteDevice", post(delete_device::<B>))
        .with_state(registry)
}

fn lock<B: Backing>(registry: &SharedRegistry<B>) -> MutexGuard<'_, DeviceRegistry<B>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `POST /setVoltages` - upsert a batch of device values.
///
/// Body is a JSON object mapping device ids to integer values. The body is
/// parsed manually so a malformed payload yields the exact 400 body the
/// firmware sent, not axum's default rejection.
pub async fn set_voltages<B>(
    State(registry): State<SharedRegistry<B>>,
    body: Bytes,
) -> Response
where
    B: Backing + Send + 'static,
{
    let pairs: BTreeMap<String, i32> = match serde_json::from_slice(&body) {
        Ok(pairs) => pairs,
        Err(err) => {
            tracing::warn!(error = %err, "rejected unparseable setVoltages body");
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::invalid_json()))
                .into_response();
        }
    };

    let mut registry = lock(&registry);
    for (device_id, value) in &pairs {
        match registry.upsert(device_id, *value) {
            Ok(slot) => {
                tracing::info!(device = %device_id, value, slot, "stored device value");
            }
            Err(Error::RegistryFull { max }) => {
                tracing::warn!(device = %device_id, max, "device registry full");
                return (
                    StatusCode::INSUFFICIENT_STORAGE,
                    Json(ErrorResponse::registry_full()),
                )
                    .into_response();
            }
            Err(
                err @ (Error::EmptyDeviceId | Error::IdTooLong { .. } | Error::NulInDeviceId),
            ) => {
                return (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(err.to_string())))
                    .into_response();
            }
            Err(err) => {
                tracing::error!(device = %device_id, error = %err, "commit failed");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::storage_failure()),
                )
                    .into_response();
            }
        }
    }

    (StatusCode::OK, Json(StatusResponse::success())).into_response()
}

/// `GET /getVoltageById?deviceId=<id>` - read one device's value.
///
/// An id with no record answers with the unit's threshold percentage, so a
/// relay client always gets a usable cutoff.
pub async fn get_voltage_by_id<B>(
    State(registry): State<SharedRegistry<B>>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response
where
    B: Backing + Send + 'static,
{
    let Some(device_id) = params.get("deviceId") else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::missing_device_id()),
        )
            .into_response();
    };

    let registry = lock(&registry);
    let settings = registry.settings();
    let voltage = registry
        .get(device_id)
        .unwrap_or_else(|| i32::from(settings.threshold_percentage));

    tracing::debug!(device = %device_id, voltage, "answering voltage query");
    Json(VoltageReading {
        device_id: device_id.clone(),
        voltage,
        system_type: settings.system_type,
        percentage: settings.last_percentage,
    })
    .into_response()
}

/// `POST /deleteDevice` - remove one device record.
pub async fn delete_device<B>(
    State(registry): State<SharedRegistry<B>>,
    body: Bytes,
) -> Response
where
    B: Backing + Send + 'static,
{
    let request: DeleteRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "rejected unparseable deleteDevice body");
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse::invalid_json()))
                .into_response();
        }
    };

    match lock(&registry).remove(&request.device_id) {
        Ok(true) => {
            tracing::info!(device = %request.device_id, "deleted device record");
            (StatusCode::OK, Json(StatusResponse::device_deleted())).into_response()
        }
        Ok(false) => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::device_not_found()),
        )
            .into_response(),
        Err(err) => {
            tracing::error!(device = %request.device_id, error = %err, "commit failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::storage_failure()),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryBacking;

    fn shared_registry() -> SharedRegistry<MemoryBacking> {
        Arc::new(Mutex::new(
            DeviceRegistry::open(MemoryBacking::new()).unwrap(),
        ))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn query(device_id: &str) -> Query<BTreeMap<String, String>> {
        let mut params = BTreeMap::new();
        params.insert("deviceId".to_string(), device_id.to_string());
        Query(params)
    }

    #[tokio::test]
    async fn test_set_voltages_then_get() {
        let registry = shared_registry();

        let response = set_voltages(
            State(registry.clone()),
            Bytes::from_static(br#"{"dev1": 77, "dev2": 40}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "success");

        let response = get_voltage_by_id(State(registry), query("dev2")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["deviceId"], "dev2");
        assert_eq!(body["voltage"], 40);
    }

    #[tokio::test]
    async fn test_set_voltages_rejects_malformed_json() {
        let registry = shared_registry();

        for bad in [&b"not json"[..], br#"{"dev1": "not-a-number"}"#, br#"[1,2]"#] {
            let response =
                set_voltages(State(registry.clone()), Bytes::copy_from_slice(bad)).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"], "Invalid JSON format");
        }
    }

    #[tokio::test]
    async fn test_set_voltages_reports_full_registry() {
        let registry = shared_registry();
        for i in 0..crate::MAX_DEVICES {
            lock(&registry).upsert(&format!("dev{i}"), 1).unwrap();
        }

        let response = set_voltages(
            State(registry),
            Bytes::from_static(br#"{"one-more": 5}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::INSUFFICIENT_STORAGE);
        assert_eq!(body_json(response).await["error"], "Device registry full");
    }

    #[tokio::test]
    async fn test_set_voltages_rejects_bad_ids() {
        let registry = shared_registry();

        let response = set_voltages(
            State(registry),
            Bytes::from_static(br#"{"this-id-is-way-past-sixteen-bytes": 5}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_voltage_falls_back_to_threshold() {
        let registry = shared_registry();
        lock(&registry).set_threshold_percentage(55).unwrap();
        lock(&registry)
            .set_system_type(crate::SystemType::V24)
            .unwrap();
        lock(&registry).set_last_percentage(63.0).unwrap();

        let response = get_voltage_by_id(State(registry), query("never-stored")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["voltage"], 55);
        assert_eq!(body["systemType"], 24);
        assert_eq!(body["percentage"], 63);
    }

    #[tokio::test]
    async fn test_get_voltage_requires_device_id() {
        let registry = shared_registry();

        let response = get_voltage_by_id(State(registry), Query(BTreeMap::new())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await["error"],
            "Missing deviceId parameter"
        );
    }

    #[tokio::test]
    async fn test_delete_device() {
        let registry = shared_registry();
        lock(&registry).upsert("doomed", 9).unwrap();

        let response = delete_device(
            State(registry.clone()),
            Bytes::from_static(br#"{"deviceId": "doomed"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["message"], "Device deleted");

        // Second delete misses.
        let response = delete_device(
            State(registry.clone()),
            Bytes::from_static(br#"{"deviceId": "doomed"}"#),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Device not found");

        let response = delete_device(State(registry), Bytes::from_static(b"{}")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid JSON format");
    }
}
