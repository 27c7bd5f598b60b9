//! Sole authority over the native runtime manager.
//!
//! Everything process-global (registration, discovery, shutdown, version)
//! funnels through here; handlers never hold the manager directly.

use std::sync::Arc;

use log::info;

use crate::error::{GatewayError, GatewayResult, RuntimeErrorCode, INVALID_STRING_MESSAGE};
use crate::runtime::types::{InstanceDescriptor, RuntimeVersion};
use crate::runtime::RuntimeManager;
use crate::session::ControllerSession;

pub struct RuntimeGateway {
    manager: Arc<dyn RuntimeManager>,
}

impl RuntimeGateway {
    pub fn new(manager: Arc<dyn RuntimeManager>) -> Self {
        Self { manager }
    }

    pub fn version(&self) -> RuntimeVersion {
        self.manager.version()
    }

    pub fn is_available(&self) -> bool {
        self.manager.is_available()
    }

    pub fn is_initialized(&self) -> bool {
        self.manager.is_initialized()
    }

    /// Every instance the runtime manager knows about, whether or not this
    /// gateway registered it.
    pub fn registered_instances(&self) -> GatewayResult<Vec<InstanceDescriptor>> {
        Ok(self.manager.registered_instances()?)
    }

    /// Register a new virtual controller under `name`, or adopt the existing
    /// runtime registration of that name if one is already present.
    pub fn register(&self, name: &str) -> GatewayResult<ControllerSession> {
        if name.trim().is_empty() {
            return Err(GatewayError::invalid_argument(INVALID_STRING_MESSAGE));
        }
        if let Some(existing) = self.open_by_name(name)? {
            info!("adopting runtime-registered instance '{name}'");
            return Ok(existing);
        }
        match self.manager.create_instance(name) {
            Ok(handle) => Ok(ControllerSession::new(handle)),
            // A concurrent registration can land between the lookup and the
            // create; adopt it instead of surfacing the collision.
            Err(err) if err.code == RuntimeErrorCode::AlreadyExists => {
                info!("adopting concurrently registered instance '{name}'");
                Ok(self.open_by_name(name)?.ok_or(err)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn open_by_name(&self, name: &str) -> GatewayResult<Option<ControllerSession>> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        Ok(self
            .manager
            .open_instance_by_name(name)?
            .map(ControllerSession::new))
    }

    /// Disconnect from the runtime manager. Instances become unusable; only
    /// called on gateway shutdown.
    pub fn shutdown(&self) -> GatewayResult<()> {
        info!("shutting down the runtime manager connection");
        Ok(self.manager.shutdown()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::memory::InMemoryRuntime;

    fn gateway() -> RuntimeGateway {
        RuntimeGateway::new(Arc::new(InMemoryRuntime::new()))
    }

    #[test]
    fn register_rejects_blank_names() {
        let gateway = gateway();
        assert!(matches!(
            gateway.register("   "),
            Err(GatewayError::InvalidArgument(_))
        ));
    }

    #[test]
    fn register_adopts_an_existing_runtime_registration() {
        let gateway = gateway();
        let first = gateway.register("plc-a").unwrap();
        let second = gateway.register("plc-a").unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(gateway.registered_instances().unwrap().len(), 1);
    }

    #[test]
    fn open_sentinels_report_not_found_without_error() {
        let gateway = gateway();
        assert!(gateway.open_by_name(" ").unwrap().is_none());
        assert!(gateway.open_by_name("absent").unwrap().is_none());
    }

    /// Manager whose first by-name lookup misses even though the instance
    /// exists, reproducing a registration landing between lookup and create.
    struct RacedLookup {
        inner: InMemoryRuntime,
        first_lookup: std::sync::atomic::AtomicBool,
    }

    impl crate::runtime::RuntimeManager for RacedLookup {
        fn version(&self) -> crate::runtime::types::RuntimeVersion {
            self.inner.version()
        }
        fn is_initialized(&self) -> bool {
            self.inner.is_initialized()
        }
        fn is_available(&self) -> bool {
            self.inner.is_available()
        }
        fn registered_instances(
            &self,
        ) -> crate::error::RuntimeResult<Vec<crate::runtime::types::InstanceDescriptor>> {
            self.inner.registered_instances()
        }
        fn create_instance(
            &self,
            name: &str,
        ) -> crate::error::RuntimeResult<Arc<dyn crate::runtime::ControllerInstance>> {
            self.inner.create_instance(name)
        }
        fn open_instance_by_id(
            &self,
            id: u32,
        ) -> crate::error::RuntimeResult<Option<Arc<dyn crate::runtime::ControllerInstance>>>
        {
            self.inner.open_instance_by_id(id)
        }
        fn open_instance_by_name(
            &self,
            name: &str,
        ) -> crate::error::RuntimeResult<Option<Arc<dyn crate::runtime::ControllerInstance>>>
        {
            if self
                .first_lookup
                .swap(false, std::sync::atomic::Ordering::SeqCst)
            {
                return Ok(None);
            }
            self.inner.open_instance_by_name(name)
        }
        fn shutdown(&self) -> crate::error::RuntimeResult<()> {
            self.inner.shutdown()
        }
    }

    #[test]
    fn register_adopts_a_registration_that_wins_the_race() {
        let inner = InMemoryRuntime::new();
        let winner = inner.create_instance("plc-contested").unwrap();
        let winner_id = winner.id();

        let gateway = RuntimeGateway::new(Arc::new(RacedLookup {
            inner,
            first_lookup: std::sync::atomic::AtomicBool::new(true),
        }));
        // The stale lookup misses, create collides, and the existing
        // registration is adopted instead of surfacing the vendor error.
        let session = gateway.register("plc-contested").unwrap();
        assert_eq!(session.id(), winner_id);
    }

    #[test]
    fn shutdown_makes_the_manager_unavailable() {
        let gateway = gateway();
        assert!(gateway.is_available());
        gateway.shutdown().unwrap();
        assert!(!gateway.is_available());
        assert!(gateway.registered_instances().is_err());
    }
}
