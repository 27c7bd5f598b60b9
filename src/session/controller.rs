//! Session facade over one registered virtual controller.
//!
//! All caller input is validated here, synchronously, before the native handle
//! is touched. Native failures pass through with their vendor code attached;
//! nothing below the caller retries.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{
    GatewayError, GatewayResult, RuntimeError, RuntimeErrorCode, EMPTY_COLLECTION_MESSAGE,
    INVALID_STRING_MESSAGE,
};
use crate::runtime::types::{
    CommunicationInterface, ControllerInfo, CycleTimeMonitoring, DataValue, MemoryArea,
    OperatingMode, OperatingState, TagInfo, TagListScope, VirtualClock,
};
use crate::runtime::ControllerInstance;
use crate::session::area::AreaAccessor;

/// Lifecycle timeout applied when the caller does not supply one.
pub const DEFAULT_TIMEOUT_MS: i64 = 60_000;

fn require_text(value: &str) -> GatewayResult<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::invalid_argument(INVALID_STRING_MESSAGE));
    }
    Ok(())
}

fn resolve_timeout(timeout_ms: Option<i64>) -> GatewayResult<Duration> {
    let ms = timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
    if ms <= 0 {
        return Err(GatewayError::invalid_argument(format!(
            "timeout must be positive, got {ms} ms"
        )));
    }
    Ok(Duration::from_millis(ms as u64))
}

/// One live gateway session; identity is captured at registration and never
/// changes afterwards.
pub struct ControllerSession {
    id: u32,
    name: String,
    handle: Arc<dyn ControllerInstance>,
}

impl ControllerSession {
    pub fn new(handle: Arc<dyn ControllerInstance>) -> Self {
        Self {
            id: handle.id(),
            name: handle.name(),
            handle,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn area(&self, area: MemoryArea) -> AreaAccessor<'_> {
        AreaAccessor::new(self.handle.as_ref(), area)
    }

    pub fn info(&self) -> ControllerInfo {
        self.handle.info()
    }

    pub fn communication_interface(&self) -> CommunicationInterface {
        self.handle.communication_interface()
    }

    pub fn operating_state(&self) -> OperatingState {
        self.handle.operating_state()
    }

    pub fn operating_mode(&self) -> OperatingMode {
        self.handle.operating_mode()
    }

    pub fn set_operating_mode(&self, mode: OperatingMode) -> GatewayResult<()> {
        Ok(self.handle.set_operating_mode(mode)?)
    }

    pub fn clock(&self) -> VirtualClock {
        VirtualClock {
            system_time: self.handle.system_time(),
            time_scale: self.handle.time_scale(),
        }
    }

    pub fn set_system_time(&self, time: DateTime<Utc>) -> GatewayResult<()> {
        Ok(self.handle.set_system_time(time)?)
    }

    pub fn set_time_scale(&self, scale: f64) -> GatewayResult<()> {
        Ok(self.handle.set_time_scale(scale)?)
    }

    pub fn cycle_time_monitoring(&self) -> CycleTimeMonitoring {
        self.handle.cycle_time_monitoring()
    }

    pub fn set_cycle_time_monitoring(&self, policy: CycleTimeMonitoring) -> GatewayResult<()> {
        Ok(self.handle.set_cycle_time_monitoring(policy)?)
    }

    // Lifecycle. The runtime owns the state machine; the facade only validates
    // the timeout and skips transitions that are already in effect.

    pub fn power_on(&self, timeout_ms: Option<i64>) -> GatewayResult<()> {
        let timeout = resolve_timeout(timeout_ms)?;
        Ok(self.handle.power_on(timeout)?)
    }

    pub fn power_off(&self, timeout_ms: Option<i64>) -> GatewayResult<()> {
        let timeout = resolve_timeout(timeout_ms)?;
        Ok(self.handle.power_off(timeout)?)
    }

    pub fn run(&self, timeout_ms: Option<i64>) -> GatewayResult<()> {
        let timeout = resolve_timeout(timeout_ms)?;
        if matches!(
            self.handle.operating_state(),
            OperatingState::Run | OperatingState::Startup
        ) {
            return Ok(());
        }
        Ok(self.handle.run(timeout)?)
    }

    pub fn stop(&self, timeout_ms: Option<i64>) -> GatewayResult<()> {
        let timeout = resolve_timeout(timeout_ms)?;
        if self.handle.operating_state() == OperatingState::Stop {
            return Ok(());
        }
        Ok(self.handle.stop(timeout)?)
    }

    pub fn memory_reset(&self, timeout_ms: Option<i64>) -> GatewayResult<()> {
        let timeout = resolve_timeout(timeout_ms)?;
        Ok(self.handle.memory_reset(timeout)?)
    }

    // Storage. Everything here requires the controller to be powered off.

    fn require_powered_off(&self) -> GatewayResult<()> {
        let state = self.handle.operating_state();
        if state != OperatingState::Off {
            return Err(GatewayError::InvalidOperation(format!(
                "the virtual controller must be powered off, current state is {state:?}"
            )));
        }
        Ok(())
    }

    pub fn set_storage_path(&self, path: &str) -> GatewayResult<()> {
        require_text(path)?;
        self.require_powered_off()?;
        Ok(self.handle.set_storage_path(Path::new(path))?)
    }

    pub fn storage_path(&self) -> String {
        self.handle.storage_path().display().to_string()
    }

    pub fn archive_storage(&self, file: &str) -> GatewayResult<()> {
        require_text(file)?;
        self.require_powered_off()?;
        Ok(self.handle.archive_storage(Path::new(file))?)
    }

    pub fn retrieve_storage(&self, file: &str) -> GatewayResult<()> {
        require_text(file)?;
        self.require_powered_off()?;
        let path = Path::new(file);
        if !path.exists() {
            return Err(GatewayError::NotFound(format!(
                "storage archive '{file}' does not exist"
            )));
        }
        Ok(self.handle.retrieve_storage(path)?)
    }

    pub fn cleanup_storage(&self) -> GatewayResult<()> {
        self.require_powered_off()?;
        Ok(self.handle.cleanup_storage()?)
    }

    /// Export the controller configuration to `file`.
    ///
    /// Returns `Ok(false)` without touching anything when the file already
    /// exists and `overwrite` is off; `Ok(true)` once the file was written.
    pub fn create_configuration_file(&self, file: &str, overwrite: bool) -> GatewayResult<bool> {
        require_text(file)?;
        let path = Path::new(file);
        if path.extension().is_none() {
            return Err(GatewayError::invalid_argument(
                "the path must name a file with an extension",
            ));
        }
        if path.exists() {
            if !overwrite {
                return Ok(false);
            }
            std::fs::remove_file(path).map_err(|e| {
                GatewayError::InvalidOperation(format!(
                    "cannot replace existing configuration file '{file}': {e}"
                ))
            })?;
        }
        self.handle.export_configuration(path)?;
        Ok(true)
    }

    // Tag list.

    /// Refresh the cached tag list. A data-block selection narrows the refresh
    /// to the named blocks, serialized in the runtime's quoted form.
    pub fn update_tag_list(
        &self,
        scope: TagListScope,
        hmi_visible_only: bool,
        data_blocks: Option<&[String]>,
    ) -> GatewayResult<()> {
        let filter = match data_blocks {
            Some(blocks) => {
                if blocks.is_empty() {
                    return Err(GatewayError::invalid_argument(EMPTY_COLLECTION_MESSAGE));
                }
                let mut filter = String::new();
                for block in blocks {
                    require_text(block)?;
                    filter.push_str(&format!("\"{block}\","));
                }
                Some(filter)
            }
            None => None,
        };
        Ok(self
            .handle
            .update_tag_list(scope, hmi_visible_only, filter.as_deref())?)
    }

    pub fn tag_list_status(&self) -> GatewayResult<(TagListScope, bool)> {
        Ok(self.handle.tag_list_status()?)
    }

    pub fn tag_infos(&self) -> GatewayResult<Vec<TagInfo>> {
        Ok(self.handle.tag_infos()?)
    }

    // Typed tag access.

    /// Read `tag_name` and insist on `expected`; a value of any other type is
    /// a `WrongType` runtime error.
    pub fn read_tag_as(
        &self,
        tag_name: &str,
        expected: crate::runtime::types::PrimitiveType,
    ) -> GatewayResult<DataValue> {
        require_text(tag_name)?;
        let value = self.handle.read_tag(tag_name)?;
        if value.primitive_type() != expected {
            return Err(RuntimeError::new(
                RuntimeErrorCode::WrongType,
                format!(
                    "tag '{}' is {:?}, requested {:?}",
                    tag_name,
                    value.primitive_type(),
                    expected
                ),
            )
            .into());
        }
        Ok(value)
    }

    pub fn write_tag(&self, tag_name: &str, value: DataValue) -> GatewayResult<()> {
        require_text(tag_name)?;
        Ok(self.handle.write_tag(tag_name, value)?)
    }

    /// Drop the native registration. The session must be discarded afterwards.
    pub fn unregister(&self) -> GatewayResult<()> {
        Ok(self.handle.unregister()?)
    }
}

macro_rules! typed_tag_access {
    ($($read:ident / $write:ident => $variant:ident($ty:ty)),+ $(,)?) => {
        impl ControllerSession {
            $(
                pub fn $read(&self, tag_name: &str) -> GatewayResult<$ty> {
                    match self.read_tag_as(
                        tag_name,
                        crate::runtime::types::PrimitiveType::$variant,
                    )? {
                        DataValue::$variant(v) => Ok(v),
                        _ => unreachable!("read_tag_as checked the type"),
                    }
                }

                pub fn $write(&self, tag_name: &str, value: $ty) -> GatewayResult<()> {
                    self.write_tag(tag_name, DataValue::$variant(value))
                }
            )+
        }
    };
}

typed_tag_access! {
    read_bool / write_bool => Bool(bool),
    read_char8 / write_char8 => Char8(i8),
    read_char16 / write_char16 => Char16(u16),
    read_int8 / write_int8 => Int8(i8),
    read_int16 / write_int16 => Int16(i16),
    read_int32 / write_int32 => Int32(i32),
    read_int64 / write_int64 => Int64(i64),
    read_uint8 / write_uint8 => UInt8(u8),
    read_uint16 / write_uint16 => UInt16(u16),
    read_uint32 / write_uint32 => UInt32(u32),
    read_uint64 / write_uint64 => UInt64(u64),
    read_float32 / write_float32 => Float32(f32),
    read_float64 / write_float64 => Float64(f64),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::InMemoryRuntime;
    use crate::runtime::RuntimeManager;

    fn session(name: &str) -> ControllerSession {
        let runtime = InMemoryRuntime::new();
        ControllerSession::new(runtime.create_instance(name).unwrap())
    }

    fn powered_session(name: &str) -> ControllerSession {
        let session = session(name);
        session.power_on(None).unwrap();
        session
    }

    #[test]
    fn lifecycle_rejects_non_positive_timeouts() {
        let session = session("plc-timeouts");
        for bad in [0, -1, i64::MIN] {
            assert!(matches!(
                session.power_on(Some(bad)),
                Err(GatewayError::InvalidArgument(_))
            ));
        }
        // Absent timeout means the default, not an error.
        session.power_on(None).unwrap();
    }

    #[test]
    fn run_and_stop_are_idempotent_in_target_state() {
        let session = powered_session("plc-idem");
        session.run(None).unwrap();
        session.run(None).unwrap();
        assert_eq!(session.operating_state(), OperatingState::Run);

        session.stop(None).unwrap();
        session.stop(None).unwrap();
        assert_eq!(session.operating_state(), OperatingState::Stop);
    }

    #[test]
    fn storage_operations_require_powered_off() {
        let session = powered_session("plc-storage");
        assert!(matches!(
            session.set_storage_path("/tmp/elsewhere"),
            Err(GatewayError::InvalidOperation(_))
        ));
        assert!(matches!(
            session.cleanup_storage(),
            Err(GatewayError::InvalidOperation(_))
        ));

        session.power_off(None).unwrap();
        session.set_storage_path("/tmp/elsewhere").unwrap();
        assert_eq!(session.storage_path(), "/tmp/elsewhere");
    }

    #[test]
    fn retrieve_requires_an_existing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.zip");
        let session = session("plc-retrieve");
        assert!(matches!(
            session.retrieve_storage(missing.to_str().unwrap()),
            Err(GatewayError::NotFound(_))
        ));
    }

    #[test]
    fn configuration_file_overwrite_semantics() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("config.xml");
        let file = file.to_str().unwrap();
        let session = session("plc-config");

        assert!(matches!(
            session.create_configuration_file("  ", false),
            Err(GatewayError::InvalidArgument(_))
        ));
        assert!(matches!(
            session.create_configuration_file("/tmp/no-extension", false),
            Err(GatewayError::InvalidArgument(_))
        ));

        assert!(session.create_configuration_file(file, false).unwrap());
        // Existing file without overwrite: not performed, not an error.
        assert!(!session.create_configuration_file(file, false).unwrap());
        assert!(session.create_configuration_file(file, true).unwrap());
    }

    #[test]
    fn empty_data_block_selection_is_invalid() {
        let session = powered_session("plc-tags");
        assert!(matches!(
            session.update_tag_list(TagListScope::DataBlocks, false, Some(&[])),
            Err(GatewayError::InvalidArgument(_))
        ));
        session
            .update_tag_list(
                TagListScope::DataBlocks,
                false,
                Some(&["Data_block_1".to_string()]),
            )
            .unwrap();
        assert!(!session.tag_infos().unwrap().is_empty());
    }

    #[test]
    fn typed_access_round_trips_and_rejects_wrong_type() {
        let session = powered_session("plc-typed");
        session.write_float64("Setpoint", 21.5).unwrap();
        assert_eq!(session.read_float64("Setpoint").unwrap(), 21.5);

        let err = session.read_int32("Setpoint").unwrap_err();
        match err {
            GatewayError::Runtime(e) => assert_eq!(e.code, RuntimeErrorCode::WrongType),
            other => panic!("expected runtime error, got {other:?}"),
        }

        assert!(matches!(
            session.read_bool("   "),
            Err(GatewayError::InvalidArgument(_))
        ));
    }
}
