//! Vocabulary shared between the runtime traits, the session layer and the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three byte-addressable process-memory regions of a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MemoryArea {
    Input,
    Output,
    Marker,
}

impl std::fmt::Display for MemoryArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryArea::Input => write!(f, "input"),
            MemoryArea::Output => write!(f, "output"),
            MemoryArea::Marker => write!(f, "marker"),
        }
    }
}

/// Lifecycle state reported authoritatively by the runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperatingState {
    Off,
    Booting,
    Stop,
    Startup,
    Run,
    Freeze,
    ShuttingDown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OperatingMode {
    #[default]
    Default,
    SingleStep,
    ExtendedSingleStep,
    TimespanSynchronized,
}

/// Cycle-time monitoring policy for a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum CycleTimeMonitoring {
    Ignored,
    Forced,
    Specified { max_cycle_time_ns: i64 },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CommunicationInterface {
    #[default]
    None,
    Softbus,
    TcpIp,
}

/// Which tag tables a tag-list refresh covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagListScope {
    None,
    Io,
    Marker,
    DataBlocks,
    #[default]
    IoMarker,
    IoMarkerDataBlocks,
}

/// Where a tag lives; broader than [`MemoryArea`] because tags may sit in
/// data blocks or in counter/timer memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TagArea {
    Input,
    Output,
    Marker,
    DataBlock,
    Counter,
    Timer,
}

impl From<MemoryArea> for TagArea {
    fn from(area: MemoryArea) -> Self {
        match area {
            MemoryArea::Input => TagArea::Input,
            MemoryArea::Output => TagArea::Output,
            MemoryArea::Marker => TagArea::Marker,
        }
    }
}

/// Primitive representation of a tag value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrimitiveType {
    Bool,
    Char8,
    Char16,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl PrimitiveType {
    /// Width of the value in process memory, in bytes. Bools occupy a bit but
    /// are addressed through a full byte.
    pub fn byte_size(&self) -> u32 {
        match self {
            PrimitiveType::Bool | PrimitiveType::Char8 | PrimitiveType::Int8 | PrimitiveType::UInt8 => 1,
            PrimitiveType::Char16 | PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float32 => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Float64 => 8,
        }
    }
}

/// A typed tag value crossing the runtime boundary.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "value")]
pub enum DataValue {
    Bool(bool),
    Char8(i8),
    Char16(u16),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl DataValue {
    pub fn primitive_type(&self) -> PrimitiveType {
        match self {
            DataValue::Bool(_) => PrimitiveType::Bool,
            DataValue::Char8(_) => PrimitiveType::Char8,
            DataValue::Char16(_) => PrimitiveType::Char16,
            DataValue::Int8(_) => PrimitiveType::Int8,
            DataValue::Int16(_) => PrimitiveType::Int16,
            DataValue::Int32(_) => PrimitiveType::Int32,
            DataValue::Int64(_) => PrimitiveType::Int64,
            DataValue::UInt8(_) => PrimitiveType::UInt8,
            DataValue::UInt16(_) => PrimitiveType::UInt16,
            DataValue::UInt32(_) => PrimitiveType::UInt32,
            DataValue::UInt64(_) => PrimitiveType::UInt64,
            DataValue::Float32(_) => PrimitiveType::Float32,
            DataValue::Float64(_) => PrimitiveType::Float64,
        }
    }

    /// Big-endian process-memory encoding, as the controller stores it.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        match self {
            DataValue::Bool(v) => vec![u8::from(*v)],
            DataValue::Char8(v) | DataValue::Int8(v) => v.to_be_bytes().to_vec(),
            DataValue::Char16(v) | DataValue::UInt16(v) => v.to_be_bytes().to_vec(),
            DataValue::Int16(v) => v.to_be_bytes().to_vec(),
            DataValue::Int32(v) => v.to_be_bytes().to_vec(),
            DataValue::Int64(v) => v.to_be_bytes().to_vec(),
            DataValue::UInt8(v) => v.to_be_bytes().to_vec(),
            DataValue::UInt32(v) => v.to_be_bytes().to_vec(),
            DataValue::UInt64(v) => v.to_be_bytes().to_vec(),
            DataValue::Float32(v) => v.to_be_bytes().to_vec(),
            DataValue::Float64(v) => v.to_be_bytes().to_vec(),
        }
    }

    /// Decode a value of `ty` from big-endian process memory.
    ///
    /// Returns `None` when `bytes` is shorter than the type's width.
    pub fn from_be_bytes(ty: PrimitiveType, bytes: &[u8]) -> Option<DataValue> {
        let width = ty.byte_size() as usize;
        if bytes.len() < width {
            return None;
        }
        let bytes = &bytes[..width];
        Some(match ty {
            PrimitiveType::Bool => DataValue::Bool(bytes[0] != 0),
            PrimitiveType::Char8 => DataValue::Char8(bytes[0] as i8),
            PrimitiveType::Char16 => {
                DataValue::Char16(u16::from_be_bytes([bytes[0], bytes[1]]))
            }
            PrimitiveType::Int8 => DataValue::Int8(bytes[0] as i8),
            PrimitiveType::Int16 => DataValue::Int16(i16::from_be_bytes([bytes[0], bytes[1]])),
            PrimitiveType::Int32 => {
                DataValue::Int32(i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            PrimitiveType::Int64 => DataValue::Int64(i64::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
            PrimitiveType::UInt8 => DataValue::UInt8(bytes[0]),
            PrimitiveType::UInt16 => DataValue::UInt16(u16::from_be_bytes([bytes[0], bytes[1]])),
            PrimitiveType::UInt32 => {
                DataValue::UInt32(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            PrimitiveType::UInt64 => DataValue::UInt64(u64::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
            PrimitiveType::Float32 => {
                DataValue::Float32(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            PrimitiveType::Float64 => DataValue::Float64(f64::from_be_bytes([
                bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            ])),
        })
    }
}

/// Descriptive record for one symbolically named value.
///
/// Produced by a tag-list refresh; a snapshot that stays stale until the next
/// refresh.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagInfo {
    pub name: String,
    pub area: TagArea,
    pub primitive_type: PrimitiveType,
    pub offset: u32,
    pub bit: u8,
    pub size: u32,
    pub index: u32,
}

/// Identity of an instance as the runtime manager reports it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDescriptor {
    pub id: u32,
    pub name: String,
}

/// Controller metadata exposed through get-information.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerInfo {
    pub controller_name: String,
    pub controller_short_designation: String,
    pub controller_ip: String,
}

/// One entry of a structured by-address signal list.
///
/// On a read the carried `value` is replaced with the fresh one; the checked
/// read variant compares fresh against carried to detect change.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressedValue {
    pub offset: u32,
    pub bit: u8,
    pub value: DataValue,
}

/// Runtime manager version, unpacked from the vendor's single u32
/// (low word major, high word minor).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub major: u16,
    pub minor: u16,
}

impl RuntimeVersion {
    pub fn valid(&self) -> bool {
        self.major != 0
    }
}

impl From<u32> for RuntimeVersion {
    fn from(packed: u32) -> Self {
        Self {
            major: (packed & 0xffff) as u16,
            minor: (packed >> 16) as u16,
        }
    }
}

impl std::fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Current controller clock and scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualClock {
    pub system_time: DateTime<Utc>,
    pub time_scale: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_unpacks_low_word_as_major() {
        let version = RuntimeVersion::from(0x0002_0005);
        assert_eq!(version.major, 5);
        assert_eq!(version.minor, 2);
        assert!(version.valid());
        assert_eq!(version.to_string(), "5.2");
    }

    #[test]
    fn version_with_zero_major_is_invalid() {
        assert!(!RuntimeVersion::from(0x0001_0000).valid());
    }

    #[test]
    fn data_value_round_trips_through_be_bytes() {
        let cases = [
            DataValue::Bool(true),
            DataValue::Int16(-1234),
            DataValue::UInt32(0xdead_beef),
            DataValue::Float64(3.5),
            DataValue::Char16(0x2603),
        ];
        for value in cases {
            let bytes = value.to_be_bytes();
            assert_eq!(bytes.len(), value.primitive_type().byte_size() as usize);
            let decoded = DataValue::from_be_bytes(value.primitive_type(), &bytes).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn data_value_decode_rejects_short_input() {
        assert_eq!(DataValue::from_be_bytes(PrimitiveType::Int32, &[0, 1]), None);
    }
}
