//! In-memory simulation runtime.
//!
//! Construction-time stand-in for the vendor binding: the full
//! [`RuntimeManager`]/[`ControllerInstance`] surface backed by plain byte
//! buffers and a seeded tag catalog. Used for simulated serving and for every
//! test that would otherwise need the vendor SDK.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{RuntimeError, RuntimeErrorCode, RuntimeResult};
use crate::runtime::types::{
    CommunicationInterface, ControllerInfo, CycleTimeMonitoring, DataValue, InstanceDescriptor,
    MemoryArea, OperatingMode, OperatingState, PrimitiveType, RuntimeVersion, TagArea, TagInfo,
    TagListScope,
};
use crate::runtime::{ControllerInstance, RuntimeManager};

const INPUT_AREA_SIZE: u32 = 1024;
const OUTPUT_AREA_SIZE: u32 = 1024;
const MARKER_AREA_SIZE: u32 = 2048;
const DATA_BLOCK_SIZE: u32 = 256;

/// Packed 5.2, matching the vendor's low-word-major layout.
const VERSION: u32 = 0x0002_0005;

/// Where a seeded tag's bytes live.
#[derive(Clone, Copy, Debug)]
enum TagBacking {
    Area(MemoryArea),
    DataBlock,
}

#[derive(Clone, Debug)]
struct TagDef {
    name: &'static str,
    area: TagArea,
    primitive: PrimitiveType,
    offset: u32,
    bit: u8,
    hmi_visible: bool,
    backing: TagBacking,
}

fn seeded_tags() -> Vec<TagDef> {
    vec![
        TagDef {
            name: "Motor_Start",
            area: TagArea::Marker,
            primitive: PrimitiveType::Bool,
            offset: 0,
            bit: 0,
            hmi_visible: true,
            backing: TagBacking::Area(MemoryArea::Marker),
        },
        TagDef {
            name: "Motor_Running",
            area: TagArea::Output,
            primitive: PrimitiveType::Bool,
            offset: 0,
            bit: 1,
            hmi_visible: true,
            backing: TagBacking::Area(MemoryArea::Output),
        },
        TagDef {
            name: "Temperature",
            area: TagArea::Input,
            primitive: PrimitiveType::Float32,
            offset: 10,
            bit: 0,
            hmi_visible: true,
            backing: TagBacking::Area(MemoryArea::Input),
        },
        TagDef {
            name: "Cycle_Counter",
            area: TagArea::Marker,
            primitive: PrimitiveType::UInt16,
            offset: 2,
            bit: 0,
            hmi_visible: false,
            backing: TagBacking::Area(MemoryArea::Marker),
        },
        TagDef {
            name: "Setpoint",
            area: TagArea::Marker,
            primitive: PrimitiveType::Float64,
            offset: 16,
            bit: 0,
            hmi_visible: true,
            backing: TagBacking::Area(MemoryArea::Marker),
        },
        TagDef {
            name: "Data_block_1.Level",
            area: TagArea::DataBlock,
            primitive: PrimitiveType::Int32,
            offset: 0,
            bit: 0,
            hmi_visible: true,
            backing: TagBacking::DataBlock,
        },
        TagDef {
            name: "Data_block_1.Mode",
            area: TagArea::DataBlock,
            primitive: PrimitiveType::UInt8,
            offset: 4,
            bit: 0,
            hmi_visible: false,
            backing: TagBacking::DataBlock,
        },
    ]
}

struct RuntimeShared {
    available: AtomicBool,
    next_id: AtomicU32,
    controllers: Mutex<Vec<Arc<InMemoryController>>>,
}

/// The in-memory [`RuntimeManager`] implementation.
pub struct InMemoryRuntime {
    shared: Arc<RuntimeShared>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(RuntimeShared {
                available: AtomicBool::new(true),
                next_id: AtomicU32::new(1),
                controllers: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl Default for InMemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeShared {
    fn ensure_available(&self) -> RuntimeResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RuntimeError::new(
                RuntimeErrorCode::NotRunning,
                "the runtime manager has been shut down",
            ))
        }
    }
}

impl RuntimeManager for InMemoryRuntime {
    fn version(&self) -> RuntimeVersion {
        RuntimeVersion::from(VERSION)
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn is_available(&self) -> bool {
        self.shared.available.load(Ordering::SeqCst)
    }

    fn registered_instances(&self) -> RuntimeResult<Vec<InstanceDescriptor>> {
        self.shared.ensure_available()?;
        Ok(self
            .shared
            .controllers
            .lock()
            .iter()
            .map(|c| InstanceDescriptor {
                id: c.id,
                name: c.name.clone(),
            })
            .collect())
    }

    fn create_instance(&self, name: &str) -> RuntimeResult<Arc<dyn ControllerInstance>> {
        self.shared.ensure_available()?;

        let mut controllers = self.shared.controllers.lock();
        if controllers.iter().any(|c| c.name == name) {
            return Err(RuntimeError::new(
                RuntimeErrorCode::AlreadyExists,
                format!("an instance named '{name}' is already registered"),
            ));
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let controller = Arc::new(InMemoryController::new(
            id,
            name.to_string(),
            Arc::downgrade(&self.shared),
        ));
        controllers.push(Arc::clone(&controller));
        Ok(controller)
    }

    fn open_instance_by_id(&self, id: u32) -> RuntimeResult<Option<Arc<dyn ControllerInstance>>> {
        self.shared.ensure_available()?;
        Ok(self
            .shared
            .controllers
            .lock()
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .map(|c| c as Arc<dyn ControllerInstance>))
    }

    fn open_instance_by_name(
        &self,
        name: &str,
    ) -> RuntimeResult<Option<Arc<dyn ControllerInstance>>> {
        self.shared.ensure_available()?;
        Ok(self
            .shared
            .controllers
            .lock()
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .map(|c| c as Arc<dyn ControllerInstance>))
    }

    fn shutdown(&self) -> RuntimeResult<()> {
        self.shared.available.store(false, Ordering::SeqCst);
        Ok(())
    }
}

struct ControllerState {
    operating_state: OperatingState,
    operating_mode: OperatingMode,
    storage_path: PathBuf,
    system_time: DateTime<Utc>,
    time_scale: f64,
    cycle_monitoring: CycleTimeMonitoring,
    areas: HashMap<MemoryArea, Vec<u8>>,
    data_block: Vec<u8>,
    tag_snapshot: Vec<TagInfo>,
    tag_list_status: (TagListScope, bool),
    registered: bool,
}

/// One in-memory virtual controller.
pub struct InMemoryController {
    id: u32,
    name: String,
    runtime: Weak<RuntimeShared>,
    tags: Vec<TagDef>,
    state: Mutex<ControllerState>,
}

impl InMemoryController {
    fn new(id: u32, name: String, runtime: Weak<RuntimeShared>) -> Self {
        let mut areas = HashMap::new();
        areas.insert(MemoryArea::Input, vec![0u8; INPUT_AREA_SIZE as usize]);
        areas.insert(MemoryArea::Output, vec![0u8; OUTPUT_AREA_SIZE as usize]);
        areas.insert(MemoryArea::Marker, vec![0u8; MARKER_AREA_SIZE as usize]);

        let storage_path = std::env::temp_dir().join("plcsim").join(&name);

        Self {
            id,
            name,
            runtime,
            tags: seeded_tags(),
            state: Mutex::new(ControllerState {
                operating_state: OperatingState::Off,
                operating_mode: OperatingMode::Default,
                storage_path,
                system_time: Utc::now(),
                time_scale: 1.0,
                cycle_monitoring: CycleTimeMonitoring::Ignored,
                areas,
                data_block: vec![0u8; DATA_BLOCK_SIZE as usize],
                tag_snapshot: Vec::new(),
                tag_list_status: (TagListScope::None, false),
                registered: true,
            }),
        }
    }

    fn ensure_registered(&self, state: &ControllerState) -> RuntimeResult<()> {
        if state.registered {
            Ok(())
        } else {
            Err(RuntimeError::new(
                RuntimeErrorCode::DoesNotExist,
                "the instance is no longer registered",
            ))
        }
    }

    fn ensure_powered(&self, state: &ControllerState) -> RuntimeResult<()> {
        self.ensure_registered(state)?;
        if state.operating_state == OperatingState::Off {
            return Err(RuntimeError::new(
                RuntimeErrorCode::NotRunning,
                "the virtual controller is powered off",
            ));
        }
        Ok(())
    }

    fn find_tag(&self, tag_name: &str) -> RuntimeResult<&TagDef> {
        self.tags.iter().find(|t| t.name == tag_name).ok_or_else(|| {
            RuntimeError::new(
                RuntimeErrorCode::DoesNotExist,
                format!("no tag named '{tag_name}'"),
            )
        })
    }

    fn scope_includes(scope: TagListScope, area: TagArea) -> bool {
        match scope {
            TagListScope::None => false,
            TagListScope::Io => matches!(area, TagArea::Input | TagArea::Output),
            TagListScope::Marker => area == TagArea::Marker,
            TagListScope::DataBlocks => area == TagArea::DataBlock,
            TagListScope::IoMarker => {
                matches!(area, TagArea::Input | TagArea::Output | TagArea::Marker)
            }
            TagListScope::IoMarkerDataBlocks => matches!(
                area,
                TagArea::Input | TagArea::Output | TagArea::Marker | TagArea::DataBlock
            ),
        }
    }

    /// Parse the runtime's `"Name1","Name2",` form back into block names.
    fn filter_matches(filter: &str, tag_name: &str) -> bool {
        filter
            .split(',')
            .map(|part| part.trim().trim_matches('"'))
            .filter(|part| !part.is_empty())
            .any(|block| {
                tag_name
                    .split_once('.')
                    .is_some_and(|(prefix, _)| prefix == block)
            })
    }

    fn io_error(context: &str, err: std::io::Error) -> RuntimeError {
        RuntimeError::new(RuntimeErrorCode::Other(-1), format!("{context}: {err}"))
    }
}

impl ControllerInstance for InMemoryController {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn info(&self) -> ControllerInfo {
        ControllerInfo {
            controller_name: self.name.clone(),
            controller_short_designation: format!("VPLC {}", self.id),
            controller_ip: "192.168.0.1".to_string(),
        }
    }

    fn communication_interface(&self) -> CommunicationInterface {
        CommunicationInterface::Softbus
    }

    fn operating_state(&self) -> OperatingState {
        self.state.lock().operating_state
    }

    fn operating_mode(&self) -> OperatingMode {
        self.state.lock().operating_mode
    }

    fn set_operating_mode(&self, mode: OperatingMode) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_registered(&state)?;
        state.operating_mode = mode;
        Ok(())
    }

    fn storage_path(&self) -> PathBuf {
        self.state.lock().storage_path.clone()
    }

    fn set_storage_path(&self, path: &Path) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_registered(&state)?;
        state.storage_path = path.to_path_buf();
        Ok(())
    }

    fn system_time(&self) -> DateTime<Utc> {
        self.state.lock().system_time
    }

    fn set_system_time(&self, time: DateTime<Utc>) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_registered(&state)?;
        state.system_time = time;
        Ok(())
    }

    fn time_scale(&self) -> f64 {
        self.state.lock().time_scale
    }

    fn set_time_scale(&self, scale: f64) -> RuntimeResult<()> {
        if !(0.01..=100.0).contains(&scale) {
            return Err(RuntimeError::new(
                RuntimeErrorCode::OutOfRange,
                format!("time scale {scale} is outside 0.01..=100"),
            ));
        }
        let mut state = self.state.lock();
        self.ensure_registered(&state)?;
        state.time_scale = scale;
        Ok(())
    }

    fn cycle_time_monitoring(&self) -> CycleTimeMonitoring {
        self.state.lock().cycle_monitoring
    }

    fn set_cycle_time_monitoring(&self, policy: CycleTimeMonitoring) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_registered(&state)?;
        state.cycle_monitoring = policy;
        Ok(())
    }

    fn power_on(&self, _timeout: Duration) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_registered(&state)?;
        if state.operating_state == OperatingState::Off {
            state.operating_state = OperatingState::Stop;
        }
        Ok(())
    }

    fn power_off(&self, _timeout: Duration) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_registered(&state)?;
        state.operating_state = OperatingState::Off;
        Ok(())
    }

    fn run(&self, _timeout: Duration) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_powered(&state)?;
        state.operating_state = OperatingState::Run;
        Ok(())
    }

    fn stop(&self, _timeout: Duration) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_powered(&state)?;
        state.operating_state = OperatingState::Stop;
        Ok(())
    }

    fn memory_reset(&self, _timeout: Duration) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_powered(&state)?;
        for area in state.areas.values_mut() {
            area.fill(0);
        }
        state.data_block.fill(0);
        state.operating_state = OperatingState::Stop;
        Ok(())
    }

    fn archive_storage(&self, file: &Path) -> RuntimeResult<()> {
        let state = self.state.lock();
        self.ensure_registered(&state)?;

        let payload = serde_json::json!({
            "name": self.name,
            "input": state.areas[&MemoryArea::Input],
            "output": state.areas[&MemoryArea::Output],
            "marker": state.areas[&MemoryArea::Marker],
            "dataBlock": state.data_block,
        });
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Self::io_error("creating archive directory", e))?;
        }
        std::fs::write(file, payload.to_string())
            .map_err(|e| Self::io_error("writing storage archive", e))
    }

    fn retrieve_storage(&self, file: &Path) -> RuntimeResult<()> {
        let raw = std::fs::read_to_string(file)
            .map_err(|e| Self::io_error("reading storage archive", e))?;
        let payload: serde_json::Value = serde_json::from_str(&raw).map_err(|e| {
            RuntimeError::new(
                RuntimeErrorCode::Other(-2),
                format!("malformed storage archive: {e}"),
            )
        })?;

        let restore = |value: &serde_json::Value, len: usize| -> Option<Vec<u8>> {
            let bytes: Vec<u8> = value
                .as_array()?
                .iter()
                .map(|v| v.as_u64().map(|n| n as u8))
                .collect::<Option<_>>()?;
            (bytes.len() == len).then_some(bytes)
        };

        let mut state = self.state.lock();
        self.ensure_registered(&state)?;
        for (key, area) in [
            ("input", MemoryArea::Input),
            ("output", MemoryArea::Output),
            ("marker", MemoryArea::Marker),
        ] {
            let len = state.areas[&area].len();
            if let Some(bytes) = restore(&payload[key], len) {
                state.areas.insert(area, bytes);
            }
        }
        let block_len = state.data_block.len();
        if let Some(bytes) = restore(&payload["dataBlock"], block_len) {
            state.data_block = bytes;
        }
        Ok(())
    }

    fn cleanup_storage(&self) -> RuntimeResult<()> {
        let path = {
            let state = self.state.lock();
            self.ensure_registered(&state)?;
            state.storage_path.clone()
        };
        if path.exists() {
            std::fs::remove_dir_all(&path)
                .map_err(|e| Self::io_error("removing storage path", e))?;
        }
        Ok(())
    }

    fn export_configuration(&self, file: &Path) -> RuntimeResult<()> {
        let state = self.state.lock();
        self.ensure_registered(&state)?;

        let mut document = String::from("<configuration>\n");
        for tag in &self.tags {
            document.push_str(&format!(
                "  <tag name=\"{}\" area=\"{:?}\" type=\"{:?}\" offset=\"{}\" bit=\"{}\" />\n",
                tag.name, tag.area, tag.primitive, tag.offset, tag.bit
            ));
        }
        document.push_str("</configuration>\n");
        std::fs::write(file, document)
            .map_err(|e| Self::io_error("writing configuration file", e))
    }

    fn update_tag_list(
        &self,
        scope: TagListScope,
        hmi_visible_only: bool,
        data_block_filter: Option<&str>,
    ) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_registered(&state)?;

        let snapshot = self
            .tags
            .iter()
            .enumerate()
            .filter(|(_, tag)| match data_block_filter {
                Some(filter) => {
                    tag.area == TagArea::DataBlock && Self::filter_matches(filter, tag.name)
                }
                None => Self::scope_includes(scope, tag.area),
            })
            .filter(|(_, tag)| !hmi_visible_only || tag.hmi_visible)
            .map(|(index, tag)| TagInfo {
                name: tag.name.to_string(),
                area: tag.area,
                primitive_type: tag.primitive,
                offset: tag.offset,
                bit: tag.bit,
                size: tag.primitive.byte_size(),
                index: index as u32,
            })
            .collect();

        state.tag_snapshot = snapshot;
        state.tag_list_status = (scope, hmi_visible_only);
        Ok(())
    }

    fn tag_list_status(&self) -> RuntimeResult<(TagListScope, bool)> {
        let state = self.state.lock();
        self.ensure_registered(&state)?;
        Ok(state.tag_list_status)
    }

    fn tag_infos(&self) -> RuntimeResult<Vec<TagInfo>> {
        let state = self.state.lock();
        self.ensure_registered(&state)?;
        Ok(state.tag_snapshot.clone())
    }

    fn area_size(&self, area: MemoryArea) -> u32 {
        match area {
            MemoryArea::Input => INPUT_AREA_SIZE,
            MemoryArea::Output => OUTPUT_AREA_SIZE,
            MemoryArea::Marker => MARKER_AREA_SIZE,
        }
    }

    fn read_bit(&self, area: MemoryArea, offset: u32, bit: u8) -> RuntimeResult<bool> {
        let state = self.state.lock();
        self.ensure_powered(&state)?;
        let byte = *state.areas[&area].get(offset as usize).ok_or_else(|| {
            RuntimeError::new(RuntimeErrorCode::OutOfRange, "offset beyond area size")
        })?;
        Ok(byte & (1 << bit) != 0)
    }

    fn write_bit(&self, area: MemoryArea, offset: u32, bit: u8, value: bool) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_powered(&state)?;
        let byte = state
            .areas
            .get_mut(&area)
            .and_then(|bytes| bytes.get_mut(offset as usize))
            .ok_or_else(|| {
                RuntimeError::new(RuntimeErrorCode::OutOfRange, "offset beyond area size")
            })?;
        if value {
            *byte |= 1 << bit;
        } else {
            *byte &= !(1 << bit);
        }
        Ok(())
    }

    fn read_bytes(&self, area: MemoryArea, offset: u32, count: u32) -> RuntimeResult<Vec<u8>> {
        let state = self.state.lock();
        self.ensure_powered(&state)?;
        let start = offset as usize;
        let end = start + count as usize;
        state.areas[&area]
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| {
                RuntimeError::new(RuntimeErrorCode::OutOfRange, "range beyond area size")
            })
    }

    fn write_bytes(&self, area: MemoryArea, offset: u32, bytes: &[u8]) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_powered(&state)?;
        let start = offset as usize;
        let end = start + bytes.len();
        let target = state
            .areas
            .get_mut(&area)
            .and_then(|area| area.get_mut(start..end))
            .ok_or_else(|| {
                RuntimeError::new(RuntimeErrorCode::OutOfRange, "range beyond area size")
            })?;
        target.copy_from_slice(bytes);
        Ok(())
    }

    fn read_tag(&self, tag_name: &str) -> RuntimeResult<DataValue> {
        let tag = self.find_tag(tag_name)?;
        let state = self.state.lock();
        self.ensure_powered(&state)?;

        let backing = match tag.backing {
            TagBacking::Area(area) => &state.areas[&area],
            TagBacking::DataBlock => &state.data_block,
        };
        let bytes = backing.get(tag.offset as usize..).ok_or_else(|| {
            RuntimeError::new(RuntimeErrorCode::OutOfRange, "tag extends beyond its area")
        })?;
        if tag.primitive == PrimitiveType::Bool {
            return Ok(DataValue::Bool(bytes[0] & (1 << tag.bit) != 0));
        }
        DataValue::from_be_bytes(tag.primitive, bytes).ok_or_else(|| {
            RuntimeError::new(RuntimeErrorCode::OutOfRange, "tag extends beyond its area")
        })
    }

    fn write_tag(&self, tag_name: &str, value: DataValue) -> RuntimeResult<()> {
        let tag = self.find_tag(tag_name)?;
        if value.primitive_type() != tag.primitive {
            return Err(RuntimeError::new(
                RuntimeErrorCode::WrongType,
                format!(
                    "tag '{}' is {:?}, got {:?}",
                    tag.name,
                    tag.primitive,
                    value.primitive_type()
                ),
            ));
        }

        let mut state = self.state.lock();
        self.ensure_powered(&state)?;
        let offset = tag.offset as usize;
        let out_of_range =
            || RuntimeError::new(RuntimeErrorCode::OutOfRange, "tag extends beyond its area");
        let target = match tag.backing {
            TagBacking::Area(area) => state.areas.get_mut(&area).ok_or_else(out_of_range)?,
            TagBacking::DataBlock => &mut state.data_block,
        };
        if let DataValue::Bool(v) = value {
            let byte = target.get_mut(offset).ok_or_else(out_of_range)?;
            if v {
                *byte |= 1 << tag.bit;
            } else {
                *byte &= !(1 << tag.bit);
            }
            return Ok(());
        }
        let encoded = value.to_be_bytes();
        let slot = target
            .get_mut(offset..offset + encoded.len())
            .ok_or_else(out_of_range)?;
        slot.copy_from_slice(&encoded);
        Ok(())
    }

    fn unregister(&self) -> RuntimeResult<()> {
        let mut state = self.state.lock();
        self.ensure_registered(&state)?;
        state.registered = false;
        state.operating_state = OperatingState::Off;
        drop(state);

        if let Some(shared) = self.runtime.upgrade() {
            shared.controllers.lock().retain(|c| c.id != self.id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn powered_controller(runtime: &InMemoryRuntime, name: &str) -> Arc<dyn ControllerInstance> {
        let controller = runtime.create_instance(name).unwrap();
        controller.power_on(Duration::from_secs(1)).unwrap();
        controller
    }

    #[test]
    fn create_rejects_duplicate_names() {
        let runtime = InMemoryRuntime::new();
        runtime.create_instance("plc-a").unwrap();
        let err = runtime.create_instance("plc-a").map(|_| ()).unwrap_err();
        assert_eq!(err.code, RuntimeErrorCode::AlreadyExists);
    }

    #[test]
    fn open_by_id_and_name_find_the_same_instance() {
        let runtime = InMemoryRuntime::new();
        let created = runtime.create_instance("plc-a").unwrap();

        let by_id = runtime.open_instance_by_id(created.id()).unwrap().unwrap();
        let by_name = runtime.open_instance_by_name("plc-a").unwrap().unwrap();
        assert_eq!(by_id.id(), created.id());
        assert_eq!(by_name.id(), created.id());
        assert!(runtime.open_instance_by_id(999).unwrap().is_none());
    }

    #[test]
    fn io_requires_power() {
        let runtime = InMemoryRuntime::new();
        let controller = runtime.create_instance("plc-a").unwrap();
        let err = controller.read_bit(MemoryArea::Marker, 0, 0).unwrap_err();
        assert_eq!(err.code, RuntimeErrorCode::NotRunning);
    }

    #[test]
    fn tag_write_checks_declared_type() {
        let runtime = InMemoryRuntime::new();
        let controller = powered_controller(&runtime, "plc-a");
        let err = controller
            .write_tag("Motor_Start", DataValue::Int32(1))
            .unwrap_err();
        assert_eq!(err.code, RuntimeErrorCode::WrongType);

        controller
            .write_tag("Motor_Start", DataValue::Bool(true))
            .unwrap();
        assert_eq!(
            controller.read_tag("Motor_Start").unwrap(),
            DataValue::Bool(true)
        );
    }

    #[test]
    fn tag_list_refresh_filters_by_scope_and_visibility() {
        let runtime = InMemoryRuntime::new();
        let controller = powered_controller(&runtime, "plc-a");

        controller
            .update_tag_list(TagListScope::IoMarker, true, None)
            .unwrap();
        let infos = controller.tag_infos().unwrap();
        assert!(!infos.is_empty());
        assert!(infos.iter().all(|t| t.area != TagArea::DataBlock));
        assert!(infos.iter().all(|t| t.name != "Cycle_Counter"));

        controller
            .update_tag_list(TagListScope::DataBlocks, false, Some("\"Data_block_1\","))
            .unwrap();
        let infos = controller.tag_infos().unwrap();
        assert_eq!(infos.len(), 2);
        assert!(infos.iter().all(|t| t.area == TagArea::DataBlock));
    }

    #[test]
    fn archive_and_retrieve_round_trip_process_memory() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("plc-a.zip");

        let runtime = InMemoryRuntime::new();
        let controller = powered_controller(&runtime, "plc-a");
        controller
            .write_bytes(MemoryArea::Marker, 4, &[1, 2, 3, 4])
            .unwrap();
        controller.archive_storage(&archive).unwrap();

        controller.memory_reset(Duration::from_secs(1)).unwrap();
        assert_eq!(
            controller.read_bytes(MemoryArea::Marker, 4, 4).unwrap(),
            vec![0, 0, 0, 0]
        );

        controller.retrieve_storage(&archive).unwrap();
        assert_eq!(
            controller.read_bytes(MemoryArea::Marker, 4, 4).unwrap(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn unregister_removes_the_instance_from_the_manager() {
        let runtime = InMemoryRuntime::new();
        let controller = powered_controller(&runtime, "plc-a");
        controller.unregister().unwrap();

        assert!(runtime.open_instance_by_name("plc-a").unwrap().is_none());
        let err = controller.unregister().unwrap_err();
        assert_eq!(err.code, RuntimeErrorCode::DoesNotExist);
    }
}
