//! Capability interface over the native simulation runtime.
//!
//! The gateway never talks to a vendor SDK directly; everything it needs is
//! expressed through [`RuntimeManager`] (process-global registration and
//! discovery) and [`ControllerInstance`] (one live virtual controller). The
//! binding is chosen at construction time: production wires in a vendor
//! binding, tests and simulated serving use [`memory::InMemoryRuntime`].

pub mod memory;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::RuntimeResult;
use crate::runtime::types::{
    CommunicationInterface, ControllerInfo, CycleTimeMonitoring, DataValue, InstanceDescriptor,
    MemoryArea, OperatingMode, OperatingState, RuntimeVersion, TagInfo, TagListScope,
};

/// Process-global runtime operations: registration, discovery, shutdown.
///
/// Lookups return `Ok(None)` for "no such instance" instead of surfacing the
/// vendor's does-not-exist error code; every other failure is a real error.
pub trait RuntimeManager: Send + Sync {
    fn version(&self) -> RuntimeVersion;

    /// Whether the runtime API has been initialized in this process.
    fn is_initialized(&self) -> bool;

    /// Whether a runtime manager is still reachable. Goes false once the
    /// simulation backend has been shut down.
    fn is_available(&self) -> bool;

    /// Every instance the runtime manager currently knows about, registered
    /// by this process or not.
    fn registered_instances(&self) -> RuntimeResult<Vec<InstanceDescriptor>>;

    /// Register a brand-new virtual controller under `name`.
    fn create_instance(&self, name: &str) -> RuntimeResult<Arc<dyn ControllerInstance>>;

    fn open_instance_by_id(&self, id: u32) -> RuntimeResult<Option<Arc<dyn ControllerInstance>>>;

    fn open_instance_by_name(
        &self,
        name: &str,
    ) -> RuntimeResult<Option<Arc<dyn ControllerInstance>>>;

    /// Close the connection to the runtime manager. Only called when no more
    /// communication is needed; instances become unusable afterwards.
    fn shutdown(&self) -> RuntimeResult<()>;
}

/// One live virtual controller session inside the runtime.
///
/// Handles must tolerate concurrent calls; the session layer adds no
/// per-handle lock.
pub trait ControllerInstance: Send + Sync {
    fn id(&self) -> u32;
    fn name(&self) -> String;
    fn info(&self) -> ControllerInfo;
    fn communication_interface(&self) -> CommunicationInterface;

    fn operating_state(&self) -> OperatingState;
    fn operating_mode(&self) -> OperatingMode;
    fn set_operating_mode(&self, mode: OperatingMode) -> RuntimeResult<()>;

    fn storage_path(&self) -> PathBuf;
    fn set_storage_path(&self, path: &Path) -> RuntimeResult<()>;

    fn system_time(&self) -> DateTime<Utc>;
    fn set_system_time(&self, time: DateTime<Utc>) -> RuntimeResult<()>;
    fn time_scale(&self) -> f64;
    fn set_time_scale(&self, scale: f64) -> RuntimeResult<()>;

    fn cycle_time_monitoring(&self) -> CycleTimeMonitoring;
    fn set_cycle_time_monitoring(&self, policy: CycleTimeMonitoring) -> RuntimeResult<()>;

    fn power_on(&self, timeout: Duration) -> RuntimeResult<()>;
    fn power_off(&self, timeout: Duration) -> RuntimeResult<()>;
    fn run(&self, timeout: Duration) -> RuntimeResult<()>;
    fn stop(&self, timeout: Duration) -> RuntimeResult<()>;
    fn memory_reset(&self, timeout: Duration) -> RuntimeResult<()>;

    fn archive_storage(&self, file: &Path) -> RuntimeResult<()>;
    fn retrieve_storage(&self, file: &Path) -> RuntimeResult<()>;
    fn cleanup_storage(&self) -> RuntimeResult<()>;
    fn export_configuration(&self, file: &Path) -> RuntimeResult<()>;

    /// Refresh the cached tag list. `data_block_filter` is the runtime's
    /// quoted comma-separated data-block selector, already serialized.
    fn update_tag_list(
        &self,
        scope: TagListScope,
        hmi_visible_only: bool,
        data_block_filter: Option<&str>,
    ) -> RuntimeResult<()>;

    fn tag_list_status(&self) -> RuntimeResult<(TagListScope, bool)>;
    fn tag_infos(&self) -> RuntimeResult<Vec<TagInfo>>;

    fn area_size(&self, area: MemoryArea) -> u32;
    fn read_bit(&self, area: MemoryArea, offset: u32, bit: u8) -> RuntimeResult<bool>;
    fn write_bit(&self, area: MemoryArea, offset: u32, bit: u8, value: bool) -> RuntimeResult<()>;
    fn read_bytes(&self, area: MemoryArea, offset: u32, count: u32) -> RuntimeResult<Vec<u8>>;
    fn write_bytes(&self, area: MemoryArea, offset: u32, bytes: &[u8]) -> RuntimeResult<()>;

    fn read_tag(&self, tag_name: &str) -> RuntimeResult<DataValue>;
    fn write_tag(&self, tag_name: &str, value: DataValue) -> RuntimeResult<()>;

    /// Remove this instance's registration from the runtime manager. The
    /// handle is unusable afterwards.
    fn unregister(&self) -> RuntimeResult<()>;
}
