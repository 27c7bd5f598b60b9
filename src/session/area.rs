//! Validated access to one process-memory area.
//!
//! Every entry point checks its address range against the runtime-reported
//! area size before touching the native handle. A rejected call performs zero
//! native calls and never partially applies.

use crate::error::{GatewayError, GatewayResult, RuntimeError, RuntimeErrorCode, EMPTY_COLLECTION_MESSAGE};
use crate::runtime::types::{AddressedValue, DataValue, MemoryArea, PrimitiveType};
use crate::runtime::ControllerInstance;

/// Bit/byte/bulk/signal access against a single [`MemoryArea`].
pub struct AreaAccessor<'a> {
    handle: &'a dyn ControllerInstance,
    area: MemoryArea,
}

impl<'a> AreaAccessor<'a> {
    pub(crate) fn new(handle: &'a dyn ControllerInstance, area: MemoryArea) -> Self {
        Self { handle, area }
    }

    pub fn size(&self) -> u32 {
        self.handle.area_size(self.area)
    }

    fn check_bit_address(&self, offset: u32, bit: u8) -> GatewayResult<()> {
        if bit > 7 {
            return Err(GatewayError::invalid_argument(format!(
                "bit {bit} is outside 0..=7"
            )));
        }
        if offset > self.size() {
            return Err(GatewayError::invalid_argument(format!(
                "offset {offset} exceeds the {} area size of {}",
                self.area,
                self.size()
            )));
        }
        Ok(())
    }

    fn check_range(&self, offset: u32, len: u32) -> GatewayResult<()> {
        let size = self.size();
        if offset > size || u64::from(offset) + u64::from(len) > u64::from(size) {
            return Err(GatewayError::invalid_argument(format!(
                "range {offset}+{len} exceeds the {} area size of {size}",
                self.area
            )));
        }
        Ok(())
    }

    pub fn read_bit(&self, offset: u32, bit: u8) -> GatewayResult<bool> {
        self.check_bit_address(offset, bit)?;
        Ok(self.handle.read_bit(self.area, offset, bit)?)
    }

    pub fn write_bit(&self, offset: u32, bit: u8, value: bool) -> GatewayResult<()> {
        self.check_bit_address(offset, bit)?;
        Ok(self.handle.write_bit(self.area, offset, bit, value)?)
    }

    pub fn read_byte(&self, offset: u32) -> GatewayResult<u8> {
        self.check_range(offset, 1)?;
        let bytes = self.handle.read_bytes(self.area, offset, 1)?;
        Ok(bytes[0])
    }

    pub fn write_byte(&self, offset: u32, value: u8) -> GatewayResult<()> {
        self.check_range(offset, 1)?;
        Ok(self.handle.write_bytes(self.area, offset, &[value])?)
    }

    pub fn read_bytes(&self, offset: u32, count: u32) -> GatewayResult<Vec<u8>> {
        self.check_range(offset, count)?;
        Ok(self.handle.read_bytes(self.area, offset, count)?)
    }

    pub fn write_bytes(&self, offset: u32, bytes: &[u8]) -> GatewayResult<()> {
        self.check_range(offset, bytes.len() as u32)?;
        Ok(self.handle.write_bytes(self.area, offset, bytes)?)
    }

    fn check_entries(&self, entries: &[AddressedValue]) -> GatewayResult<()> {
        if entries.is_empty() {
            return Err(GatewayError::invalid_argument(EMPTY_COLLECTION_MESSAGE));
        }
        for entry in entries {
            match entry.value.primitive_type() {
                PrimitiveType::Bool => self.check_bit_address(entry.offset, entry.bit)?,
                ty => self.check_range(entry.offset, ty.byte_size())?,
            }
        }
        Ok(())
    }

    fn read_entry(&self, entry: &AddressedValue) -> GatewayResult<DataValue> {
        let ty = entry.value.primitive_type();
        if ty == PrimitiveType::Bool {
            let bit = self.handle.read_bit(self.area, entry.offset, entry.bit)?;
            return Ok(DataValue::Bool(bit));
        }
        let bytes = self.handle.read_bytes(self.area, entry.offset, ty.byte_size())?;
        DataValue::from_be_bytes(ty, &bytes).ok_or_else(|| {
            RuntimeError::new(RuntimeErrorCode::OutOfRange, "short read from process memory")
                .into()
        })
    }

    /// Read every entry in place, replacing each carried value with the fresh
    /// one. All addresses are validated before the first native call.
    pub fn read_signals(&self, entries: &mut [AddressedValue]) -> GatewayResult<()> {
        self.check_entries(entries)?;
        for entry in entries.iter_mut() {
            entry.value = self.read_entry(entry)?;
        }
        Ok(())
    }

    /// Like [`read_signals`](Self::read_signals), but reports whether any
    /// fresh value differs from the one the caller carried in.
    pub fn read_signals_checked(&self, entries: &mut [AddressedValue]) -> GatewayResult<bool> {
        self.check_entries(entries)?;
        let mut changed = false;
        for entry in entries.iter_mut() {
            let fresh = self.read_entry(entry)?;
            if fresh != entry.value {
                changed = true;
            }
            entry.value = fresh;
        }
        Ok(changed)
    }

    pub fn write_signals(&self, entries: &[AddressedValue]) -> GatewayResult<()> {
        self.check_entries(entries)?;
        for entry in entries {
            match entry.value {
                DataValue::Bool(v) => {
                    self.handle.write_bit(self.area, entry.offset, entry.bit, v)?;
                }
                other => {
                    self.handle
                        .write_bytes(self.area, entry.offset, &other.to_be_bytes())?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeResult;
    use crate::runtime::memory::InMemoryRuntime;
    use crate::runtime::types::{
        CommunicationInterface, ControllerInfo, CycleTimeMonitoring, OperatingMode,
        OperatingState, TagInfo, TagListScope,
    };
    use crate::runtime::RuntimeManager;
    use chrono::{DateTime, Utc};
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    /// Panics on every native call; proves rejected requests never reach the
    /// runtime.
    struct ValidationProbe;

    impl ControllerInstance for ValidationProbe {
        fn id(&self) -> u32 {
            1
        }
        fn name(&self) -> String {
            "probe".into()
        }
        fn info(&self) -> ControllerInfo {
            unreachable!("native call during validation")
        }
        fn communication_interface(&self) -> CommunicationInterface {
            unreachable!("native call during validation")
        }
        fn operating_state(&self) -> OperatingState {
            unreachable!("native call during validation")
        }
        fn operating_mode(&self) -> OperatingMode {
            unreachable!("native call during validation")
        }
        fn set_operating_mode(&self, _: OperatingMode) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn storage_path(&self) -> PathBuf {
            unreachable!("native call during validation")
        }
        fn set_storage_path(&self, _: &Path) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn system_time(&self) -> DateTime<Utc> {
            unreachable!("native call during validation")
        }
        fn set_system_time(&self, _: DateTime<Utc>) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn time_scale(&self) -> f64 {
            unreachable!("native call during validation")
        }
        fn set_time_scale(&self, _: f64) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn cycle_time_monitoring(&self) -> CycleTimeMonitoring {
            unreachable!("native call during validation")
        }
        fn set_cycle_time_monitoring(&self, _: CycleTimeMonitoring) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn power_on(&self, _: Duration) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn power_off(&self, _: Duration) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn run(&self, _: Duration) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn stop(&self, _: Duration) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn memory_reset(&self, _: Duration) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn archive_storage(&self, _: &Path) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn retrieve_storage(&self, _: &Path) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn cleanup_storage(&self) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn export_configuration(&self, _: &Path) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn update_tag_list(
            &self,
            _: TagListScope,
            _: bool,
            _: Option<&str>,
        ) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn tag_list_status(&self) -> RuntimeResult<(TagListScope, bool)> {
            unreachable!("native call during validation")
        }
        fn tag_infos(&self) -> RuntimeResult<Vec<TagInfo>> {
            unreachable!("native call during validation")
        }
        fn area_size(&self, _: MemoryArea) -> u32 {
            16
        }
        fn read_bit(&self, _: MemoryArea, _: u32, _: u8) -> RuntimeResult<bool> {
            unreachable!("native call during validation")
        }
        fn write_bit(&self, _: MemoryArea, _: u32, _: u8, _: bool) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn read_bytes(&self, _: MemoryArea, _: u32, _: u32) -> RuntimeResult<Vec<u8>> {
            unreachable!("native call during validation")
        }
        fn write_bytes(&self, _: MemoryArea, _: u32, _: &[u8]) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn read_tag(&self, _: &str) -> RuntimeResult<DataValue> {
            unreachable!("native call during validation")
        }
        fn write_tag(&self, _: &str, _: DataValue) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
        fn unregister(&self) -> RuntimeResult<()> {
            unreachable!("native call during validation")
        }
    }

    fn powered(name: &str) -> Arc<dyn ControllerInstance> {
        let runtime = InMemoryRuntime::new();
        let controller = runtime.create_instance(name).unwrap();
        controller.power_on(Duration::from_secs(1)).unwrap();
        controller
    }

    #[test]
    fn bit_round_trip() {
        let controller = powered("area-bits");
        let accessor = AreaAccessor::new(controller.as_ref(), MemoryArea::Marker);

        accessor.write_bit(3, 5, true).unwrap();
        assert!(accessor.read_bit(3, 5).unwrap());
        assert!(!accessor.read_bit(3, 4).unwrap());

        accessor.write_bit(3, 5, false).unwrap();
        assert!(!accessor.read_bit(3, 5).unwrap());
    }

    #[test]
    fn bit_range_rejected_before_any_native_call() {
        let probe = ValidationProbe;
        let accessor = AreaAccessor::new(&probe, MemoryArea::Input);

        assert!(matches!(
            accessor.read_bit(0, 8),
            Err(GatewayError::InvalidArgument(_))
        ));
        assert!(matches!(
            accessor.write_bit(17, 0, true),
            Err(GatewayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn bulk_bounds_rejected_before_any_native_call() {
        let probe = ValidationProbe;
        let accessor = AreaAccessor::new(&probe, MemoryArea::Output);

        assert!(matches!(
            accessor.read_bytes(8, 9),
            Err(GatewayError::InvalidArgument(_))
        ));
        assert!(matches!(
            accessor.write_bytes(17, &[0]),
            Err(GatewayError::InvalidArgument(_))
        ));
        // One bad entry poisons the whole list before anything is applied.
        let entries = [
            AddressedValue {
                offset: 0,
                bit: 0,
                value: DataValue::UInt8(1),
            },
            AddressedValue {
                offset: 15,
                bit: 0,
                value: DataValue::UInt32(2),
            },
        ];
        assert!(matches!(
            accessor.write_signals(&entries),
            Err(GatewayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_signal_list_is_invalid() {
        let probe = ValidationProbe;
        let accessor = AreaAccessor::new(&probe, MemoryArea::Marker);
        let mut entries: Vec<AddressedValue> = Vec::new();
        assert!(matches!(
            accessor.read_signals(&mut entries),
            Err(GatewayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn checked_read_reports_changes_against_carried_values() {
        let controller = powered("area-signals");
        let accessor = AreaAccessor::new(controller.as_ref(), MemoryArea::Marker);

        let mut entries = vec![
            AddressedValue {
                offset: 0,
                bit: 2,
                value: DataValue::Bool(false),
            },
            AddressedValue {
                offset: 8,
                bit: 0,
                value: DataValue::UInt16(0),
            },
        ];
        accessor.write_signals(&entries).unwrap();
        assert!(!accessor.read_signals_checked(&mut entries).unwrap());

        accessor.write_bit(0, 2, true).unwrap();
        assert!(accessor.read_signals_checked(&mut entries).unwrap());
        assert_eq!(entries[0].value, DataValue::Bool(true));
        // Values are refreshed in place, so a second pass sees no change.
        assert!(!accessor.read_signals_checked(&mut entries).unwrap());
    }
}
