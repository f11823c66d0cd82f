//! Wire types for the monitor's HTTP contract.
//!
//! These bodies match what deployed relay/display clients parse, so field
//! names and error strings are fixed:
//!
//! - `POST /setVoltages` takes a JSON object of device id -> integer value
//! - `GET /getVoltageById?deviceId=..` answers with [`VoltageReading`]
//! - `POST /deleteDevice` takes [`DeleteRequest`]

use serde::{Deserialize, Serialize};

use crate::SystemType;

/// Response for `GET /getVoltageById`.
///
/// `voltage` is the per-device stored value, or the unit's threshold
/// percentage when the id has no record. `system_type` and `percentage`
/// are the unit-wide scalars, not per-device state.
///
/// # Example
///
/// ```
/// use battreg::{SystemType, VoltageReading};
///
/// let reading = VoltageReading {
///     device_id: "relay-7".to_string(),
///     voltage: 40,
///     system_type: SystemType::V24,
///     percentage: 63,
/// };
///
/// let json = serde_json::to_string(&reading).unwrap();
/// assert!(json.contains("\"deviceId\":\"relay-7\""));
/// assert!(json.contains("\"systemType\":24"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltageReading {
    /// Device id echoed from the query
    pub device_id: String,

    /// Stored value for the device, or the fallback threshold
    pub voltage: i32,

    /// Detected battery system of the unit
    pub system_type: SystemType,

    /// Last computed charge percentage of the unit
    pub percentage: u8,
}

/// Request body for `POST /deleteDevice`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    /// Id of the record to remove
    pub device_id: String,
}

/// Success body (`{"status":"success"}`, optionally with a message).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Status string, always `"success"`
    pub status: String,

    /// Optional human-readable detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResponse {
    /// Plain `{"status":"success"}`.
    pub fn success() -> Self {
        Self {
            status: "success".to_string(),
            message: None,
        }
    }

    /// The `deleteDevice` success body.
    pub fn device_deleted() -> Self {
        Self {
            status: "success".to_string(),
            message: Some("Device deleted".to_string()),
        }
    }
}

/// Error body (`{"error":"..."}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

impl ErrorResponse {
    /// Error body with an arbitrary message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }

    /// Body for an unparseable JSON request.
    pub fn invalid_json() -> Self {
        Self::new("Invalid JSON format")
    }

    /// Body for a `getVoltageById` call without the query parameter.
    pub fn missing_device_id() -> Self {
        Self::new("Missing deviceId parameter")
    }

    /// Body for a `deleteDevice` miss.
    pub fn device_not_found() -> Self {
        Self::new("Device not found")
    }

    /// Body for an insert against a full table.
    pub fn registry_full() -> Self {
        Self::new("Device registry full")
    }

    /// Body for a failed durable commit.
    pub fn storage_failure() -> Self {
        Self::new("Storage failure")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voltage_reading_field_names() {
        let reading = VoltageReading {
            device_id: "myDeviceId".to_string(),
            voltage: 50,
            system_type: SystemType::V12,
            percentage: 27,
        };

        let json = serde_json::to_string(&reading).unwrap();
        assert_eq!(
            json,
            r#"{"deviceId":"myDeviceId","voltage":50,"systemType":12,"percentage":27}"#
        );
    }

    #[test]
    fn test_status_bodies_match_firmware_contract() {
        assert_eq!(
            serde_json::to_string(&StatusResponse::success()).unwrap(),
            r#"{"status":"success"}"#
        );
        assert_eq!(
            serde_json::to_string(&StatusResponse::device_deleted()).unwrap(),
            r#"{"status":"success","message":"Device deleted"}"#
        );
    }

    #[test]
    fn test_error_bodies_match_firmware_contract() {
        assert_eq!(
            serde_json::to_string(&ErrorResponse::invalid_json()).unwrap(),
            r#"{"error":"Invalid JSON format"}"#
        );
        assert_eq!(
            serde_json::to_string(&ErrorResponse::missing_device_id()).unwrap(),
            r#"{"error":"Missing deviceId parameter"}"#
        );
        assert_eq!(
            serde_json::to_string(&ErrorResponse::device_not_found()).unwrap(),
            r#"{"error":"Device not found"}"#
        );
    }

    #[test]
    fn test_delete_request_parsing() {
        let request: DeleteRequest =
            serde_json::from_str(r#"{"deviceId": "relay-3"}"#).unwrap();
        assert_eq!(request.device_id, "relay-3");

        assert!(serde_json::from_str::<DeleteRequest>(r#"{"device": 3}"#).is_err());
    }
}
