//! Wire envelopes for the newline-delimited JSON interface.
//!
//! A request is `{"op": "...", "params": {...}}`; a response is
//! `{"status": "...", "message"?: "...", "body"?: {...}}`. The status carries
//! the error channel, the message the human-readable header.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};
use crate::runtime::types::{CycleTimeMonitoring, MemoryArea, OperatingMode, TagListScope};
use crate::session::InstanceSelector;

/// How a request names its target instance. Exactly one of the two fields
/// must be present.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl InstanceRef {
    pub fn selector(&self) -> GatewayResult<InstanceSelector> {
        match (self.id, self.name.as_deref()) {
            (Some(id), None) => Ok(InstanceSelector::Id(id)),
            (None, Some(name)) => Ok(InstanceSelector::Name(name.to_string())),
            (None, None) => Err(GatewayError::invalid_argument(
                "either an instance id or an instance name is required",
            )),
            (Some(_), Some(_)) => Err(GatewayError::invalid_argument(
                "give an instance id or an instance name, not both",
            )),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    rename_all_fields = "camelCase",
    tag = "op",
    content = "params"
)]
pub enum Request {
    // Runtime manager scope.
    GetVersion,
    Shutdown,
    ListInstances,
    RegisterInstance {
        name: String,
    },
    UnregisterInstance {
        #[serde(flatten)]
        instance: InstanceRef,
    },

    // Instance metadata and lifecycle.
    GetInformation {
        #[serde(flatten)]
        instance: InstanceRef,
    },
    PowerOn {
        #[serde(flatten)]
        instance: InstanceRef,
        #[serde(default)]
        timeout_ms: Option<i64>,
    },
    PowerOff {
        #[serde(flatten)]
        instance: InstanceRef,
        #[serde(default)]
        timeout_ms: Option<i64>,
    },
    Run {
        #[serde(flatten)]
        instance: InstanceRef,
        #[serde(default)]
        timeout_ms: Option<i64>,
    },
    Stop {
        #[serde(flatten)]
        instance: InstanceRef,
        #[serde(default)]
        timeout_ms: Option<i64>,
    },
    MemoryReset {
        #[serde(flatten)]
        instance: InstanceRef,
        #[serde(default)]
        timeout_ms: Option<i64>,
    },
    SetOperatingMode {
        #[serde(flatten)]
        instance: InstanceRef,
        mode: OperatingMode,
    },
    SetSystemTime {
        #[serde(flatten)]
        instance: InstanceRef,
        time: chrono::DateTime<chrono::Utc>,
    },
    SetTimeScale {
        #[serde(flatten)]
        instance: InstanceRef,
        scale: f64,
    },
    SetCycleTimeMonitoring {
        #[serde(flatten)]
        instance: InstanceRef,
        policy: CycleTimeMonitoring,
    },

    // Storage and configuration.
    SetStoragePath {
        #[serde(flatten)]
        instance: InstanceRef,
        path: String,
    },
    CreateStorageArchive {
        #[serde(flatten)]
        instance: InstanceRef,
        path: String,
    },
    RetrieveStorageArchive {
        #[serde(flatten)]
        instance: InstanceRef,
        path: String,
    },
    CleanupStorage {
        #[serde(flatten)]
        instance: InstanceRef,
    },
    CreateConfigFile {
        #[serde(flatten)]
        instance: InstanceRef,
        path: String,
        #[serde(default)]
        overwrite: bool,
    },

    // Tag list.
    UpdateTagList {
        #[serde(flatten)]
        instance: InstanceRef,
        #[serde(default)]
        scope: TagListScope,
        #[serde(default)]
        hmi_visible_only: bool,
        #[serde(default)]
        data_blocks: Option<Vec<String>>,
    },
    GetTagListStatus {
        #[serde(flatten)]
        instance: InstanceRef,
    },
    GetTagInfo {
        #[serde(flatten)]
        instance: InstanceRef,
    },

    // Typed tag access, one op per primitive type.
    ReadBool { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadChar8 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadChar16 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadInt8 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadInt16 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadInt32 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadInt64 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadUInt8 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadUInt16 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadUInt32 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadUInt64 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadFloat32 { #[serde(flatten)] instance: InstanceRef, tag: String },
    ReadFloat64 { #[serde(flatten)] instance: InstanceRef, tag: String },
    WriteBool { #[serde(flatten)] instance: InstanceRef, tag: String, value: bool },
    WriteChar8 { #[serde(flatten)] instance: InstanceRef, tag: String, value: i8 },
    WriteChar16 { #[serde(flatten)] instance: InstanceRef, tag: String, value: u16 },
    WriteInt8 { #[serde(flatten)] instance: InstanceRef, tag: String, value: i8 },
    WriteInt16 { #[serde(flatten)] instance: InstanceRef, tag: String, value: i16 },
    WriteInt32 { #[serde(flatten)] instance: InstanceRef, tag: String, value: i32 },
    WriteInt64 { #[serde(flatten)] instance: InstanceRef, tag: String, value: i64 },
    WriteUInt8 { #[serde(flatten)] instance: InstanceRef, tag: String, value: u8 },
    WriteUInt16 { #[serde(flatten)] instance: InstanceRef, tag: String, value: u16 },
    WriteUInt32 { #[serde(flatten)] instance: InstanceRef, tag: String, value: u32 },
    WriteUInt64 { #[serde(flatten)] instance: InstanceRef, tag: String, value: u64 },
    WriteFloat32 { #[serde(flatten)] instance: InstanceRef, tag: String, value: f32 },
    WriteFloat64 { #[serde(flatten)] instance: InstanceRef, tag: String, value: f64 },

    // By-address process-memory access.
    ReadBit {
        #[serde(flatten)]
        instance: InstanceRef,
        area: MemoryArea,
        offset: u32,
        bit: u8,
    },
    WriteBit {
        #[serde(flatten)]
        instance: InstanceRef,
        area: MemoryArea,
        offset: u32,
        bit: u8,
        value: bool,
    },
    ReadBytes {
        #[serde(flatten)]
        instance: InstanceRef,
        area: MemoryArea,
        offset: u32,
        count: u32,
    },
    WriteBytes {
        #[serde(flatten)]
        instance: InstanceRef,
        area: MemoryArea,
        offset: u32,
        bytes: Vec<u8>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WireStatus {
    Ok,
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Internal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status: WireStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

impl Response {
    pub fn ok(body: Value) -> Self {
        Self {
            status: WireStatus::Ok,
            message: None,
            body: Some(body),
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            status: WireStatus::Ok,
            message: None,
            body: None,
        }
    }

    pub fn ok_message(message: impl Into<String>) -> Self {
        Self {
            status: WireStatus::Ok,
            message: Some(message.into()),
            body: None,
        }
    }

    pub fn ok_with_message(message: impl Into<String>, body: Value) -> Self {
        Self {
            status: WireStatus::Ok,
            message: Some(message.into()),
            body: Some(body),
        }
    }

    pub fn error(status: WireStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: Some(message.into()),
            body: None,
        }
    }
}

impl From<GatewayError> for Response {
    fn from(err: GatewayError) -> Self {
        let status = match &err {
            GatewayError::InvalidArgument(_) => WireStatus::InvalidArgument,
            GatewayError::NotFound(_) => WireStatus::NotFound,
            GatewayError::InvalidOperation(_) => WireStatus::FailedPrecondition,
            GatewayError::Runtime(_) => WireStatus::Internal,
        };
        let message = match &err {
            // Vendor code travels in the message header.
            GatewayError::Runtime(e) => format!("runtime error {} ({}): {}", e.code, e.code.code(), e.message),
            other => other.to_string(),
        };
        Response::error(status, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn requests_parse_from_the_documented_envelope() {
        let request: Request = serde_json::from_value(json!({
            "op": "registerInstance",
            "params": {"name": "PLC_A"}
        }))
        .unwrap();
        assert!(matches!(request, Request::RegisterInstance { name } if name == "PLC_A"));

        let request: Request = serde_json::from_value(json!({
            "op": "writeInt16",
            "params": {"name": "PLC_A", "tag": "Counter", "value": -3}
        }))
        .unwrap();
        match request {
            Request::WriteInt16 { instance, tag, value } => {
                assert_eq!(instance.name.as_deref(), Some("PLC_A"));
                assert_eq!(tag, "Counter");
                assert_eq!(value, -3);
            }
            other => panic!("unexpected parse: {other:?}"),
        }

        // Unit ops need no params key at all.
        let request: Request = serde_json::from_value(json!({"op": "getVersion"})).unwrap();
        assert!(matches!(request, Request::GetVersion));
    }

    #[test]
    fn instance_ref_requires_exactly_one_key() {
        let both = InstanceRef {
            id: Some(1),
            name: Some("PLC_A".into()),
        };
        assert!(both.selector().is_err());
        assert!(InstanceRef::default().selector().is_err());

        let by_id = InstanceRef {
            id: Some(7),
            name: None,
        };
        assert_eq!(by_id.selector().unwrap(), InstanceSelector::Id(7));
    }

    #[test]
    fn error_responses_carry_status_and_message() {
        let response = Response::from(GatewayError::InvalidOperation("powered on".into()));
        assert_eq!(response.status, WireStatus::FailedPrecondition);
        assert!(response.message.unwrap().contains("powered on"));
        assert!(response.body.is_none());
    }
}
