//! Request handlers: wire requests in, registry lookups and facade calls,
//! wire responses out.

use std::sync::Arc;

use log::{debug, info, warn};
use serde_json::{json, Value};
use tokio::sync::watch;

use crate::error::{GatewayError, GatewayResult, RuntimeErrorCode};
use crate::gateway::RuntimeGateway;
use crate::runtime::types::{DataValue, PrimitiveType};
use crate::server::wire::{InstanceRef, Request, Response};
use crate::session::{ControllerSession, InstanceRegistry};

fn to_body<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

/// The gateway service: one per process, shared across connections.
pub struct GatewayService {
    gateway: RuntimeGateway,
    registry: InstanceRegistry,
    shutdown_tx: watch::Sender<bool>,
}

impl GatewayService {
    pub fn new(gateway: RuntimeGateway) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            gateway,
            registry: InstanceRegistry::new(),
            shutdown_tx,
        }
    }

    /// Subscribe to the stop signal raised by the `shutdown` op.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub async fn handle(&self, request: Request) -> Response {
        debug!("handling {request:?}");
        match self.dispatch(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!("request failed: {err}");
                Response::from(err)
            }
        }
    }

    /// Registry lookup with the gateway's unknown-instance convention: an
    /// id/name that matches nothing is a caller mistake, not a missing
    /// resource.
    async fn resolve(&self, instance: &InstanceRef) -> GatewayResult<Arc<ControllerSession>> {
        let selector = instance.selector()?;
        self.registry.resolve(&selector).await.ok_or_else(|| {
            GatewayError::invalid_argument(format!("no instance found for {selector}"))
        })
    }

    async fn register(&self, name: String) -> GatewayResult<Response> {
        if let Some(existing) = self.registry.find_by_name(&name).await {
            return Ok(Response::ok_with_message(
                "instance already registered",
                json!({"id": existing.id(), "name": existing.name(), "alreadyRegistered": true}),
            ));
        }
        let session = Arc::new(self.gateway.register(&name)?);
        let id = session.id();
        if !self.registry.add(Arc::clone(&session)).await {
            // Lost the race against a concurrent registration of the same name.
            return Ok(Response::ok_with_message(
                "instance already registered",
                json!({"id": id, "name": name, "alreadyRegistered": true}),
            ));
        }
        info!("registered instance '{name}' with id {id}");
        Ok(Response::ok(
            json!({"id": id, "name": name, "alreadyRegistered": false}),
        ))
    }

    async fn unregister(&self, instance: InstanceRef) -> GatewayResult<Response> {
        let selector = instance.selector()?;
        let session = self.registry.resolve(&selector).await.ok_or_else(|| {
            GatewayError::invalid_argument(format!("no instance found for {selector}"))
        })?;
        let message = match session.unregister() {
            Ok(()) => "instance unregistered",
            // The native registration can vanish out of band; the registry
            // entry still has to go or the name stays dead forever.
            Err(GatewayError::Runtime(e)) if e.code == RuntimeErrorCode::DoesNotExist => {
                "instance was already unregistered"
            }
            Err(err) => return Err(err),
        };
        self.registry.remove(&selector).await;
        info!("unregistered instance '{}' (id {})", session.name(), session.id());
        Ok(Response::ok_with_message(
            message,
            json!({"id": session.id(), "name": session.name()}),
        ))
    }

    async fn typed_read(
        &self,
        instance: InstanceRef,
        tag: String,
        ty: PrimitiveType,
    ) -> GatewayResult<Response> {
        let session = self.resolve(&instance).await?;
        let value = session.read_tag_as(&tag, ty)?;
        Ok(Response::ok(to_body(&value)))
    }

    async fn typed_write(
        &self,
        instance: InstanceRef,
        tag: String,
        value: DataValue,
    ) -> GatewayResult<Response> {
        let session = self.resolve(&instance).await?;
        session.write_tag(&tag, value)?;
        Ok(Response::ok_empty())
    }

    async fn dispatch(&self, request: Request) -> GatewayResult<Response> {
        use Request::*;

        Ok(match request {
            GetVersion => {
                let version = self.gateway.version();
                Response::ok(json!({
                    "version": version.to_string(),
                    "major": version.major,
                    "minor": version.minor,
                    "valid": version.valid(),
                    "runtimeInitialized": self.gateway.is_initialized(),
                    "runtimeAvailable": self.gateway.is_available(),
                }))
            }
            Shutdown => {
                self.gateway.shutdown()?;
                let _ = self.shutdown_tx.send(true);
                Response::ok_message("gateway shutting down")
            }
            ListInstances => {
                let instances = self.gateway.registered_instances()?;
                Response::ok(json!({"instances": to_body(&instances)}))
            }
            RegisterInstance { name } => self.register(name).await?,
            UnregisterInstance { instance } => self.unregister(instance).await?,

            GetInformation { instance } => {
                let session = self.resolve(&instance).await?;
                let info = session.info();
                let clock = session.clock();
                Response::ok(json!({
                    "id": session.id(),
                    "name": session.name(),
                    "controllerName": info.controller_name,
                    "controllerShortDesignation": info.controller_short_designation,
                    "controllerIp": info.controller_ip,
                    "communicationInterface": to_body(&session.communication_interface()),
                    "operatingState": to_body(&session.operating_state()),
                    "operatingMode": to_body(&session.operating_mode()),
                    "storagePath": session.storage_path(),
                    "systemTime": to_body(&clock.system_time),
                    "timeScale": clock.time_scale,
                }))
            }
            PowerOn { instance, timeout_ms } => {
                self.resolve(&instance).await?.power_on(timeout_ms)?;
                Response::ok_empty()
            }
            PowerOff { instance, timeout_ms } => {
                self.resolve(&instance).await?.power_off(timeout_ms)?;
                Response::ok_empty()
            }
            Run { instance, timeout_ms } => {
                self.resolve(&instance).await?.run(timeout_ms)?;
                Response::ok_empty()
            }
            Stop { instance, timeout_ms } => {
                self.resolve(&instance).await?.stop(timeout_ms)?;
                Response::ok_empty()
            }
            MemoryReset { instance, timeout_ms } => {
                self.resolve(&instance).await?.memory_reset(timeout_ms)?;
                Response::ok_empty()
            }
            SetOperatingMode { instance, mode } => {
                self.resolve(&instance).await?.set_operating_mode(mode)?;
                Response::ok_empty()
            }
            SetSystemTime { instance, time } => {
                self.resolve(&instance).await?.set_system_time(time)?;
                Response::ok_empty()
            }
            SetTimeScale { instance, scale } => {
                self.resolve(&instance).await?.set_time_scale(scale)?;
                Response::ok_empty()
            }
            SetCycleTimeMonitoring { instance, policy } => {
                self.resolve(&instance)
                    .await?
                    .set_cycle_time_monitoring(policy)?;
                Response::ok_empty()
            }

            SetStoragePath { instance, path } => {
                self.resolve(&instance).await?.set_storage_path(&path)?;
                Response::ok_empty()
            }
            CreateStorageArchive { instance, path } => {
                self.resolve(&instance).await?.archive_storage(&path)?;
                Response::ok_empty()
            }
            RetrieveStorageArchive { instance, path } => {
                self.resolve(&instance).await?.retrieve_storage(&path)?;
                Response::ok_empty()
            }
            CleanupStorage { instance } => {
                self.resolve(&instance).await?.cleanup_storage()?;
                Response::ok_empty()
            }
            CreateConfigFile {
                instance,
                path,
                overwrite,
            } => {
                let performed = self
                    .resolve(&instance)
                    .await?
                    .create_configuration_file(&path, overwrite)?;
                let message = if performed {
                    "configuration file created"
                } else {
                    "file already exists, not performed"
                };
                Response::ok_with_message(message, json!({"performed": performed}))
            }

            UpdateTagList {
                instance,
                scope,
                hmi_visible_only,
                data_blocks,
            } => {
                self.resolve(&instance).await?.update_tag_list(
                    scope,
                    hmi_visible_only,
                    data_blocks.as_deref(),
                )?;
                Response::ok_empty()
            }
            GetTagListStatus { instance } => {
                let (scope, hmi_visible_only) =
                    self.resolve(&instance).await?.tag_list_status()?;
                Response::ok(json!({
                    "scope": to_body(&scope),
                    "hmiVisibleOnly": hmi_visible_only,
                }))
            }
            GetTagInfo { instance } => {
                let infos = self.resolve(&instance).await?.tag_infos()?;
                Response::ok(json!({"tags": to_body(&infos)}))
            }

            ReadBool { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::Bool).await?
            }
            ReadChar8 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::Char8).await?
            }
            ReadChar16 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::Char16).await?
            }
            ReadInt8 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::Int8).await?
            }
            ReadInt16 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::Int16).await?
            }
            ReadInt32 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::Int32).await?
            }
            ReadInt64 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::Int64).await?
            }
            ReadUInt8 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::UInt8).await?
            }
            ReadUInt16 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::UInt16).await?
            }
            ReadUInt32 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::UInt32).await?
            }
            ReadUInt64 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::UInt64).await?
            }
            ReadFloat32 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::Float32).await?
            }
            ReadFloat64 { instance, tag } => {
                self.typed_read(instance, tag, PrimitiveType::Float64).await?
            }
            WriteBool { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::Bool(value)).await?
            }
            WriteChar8 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::Char8(value)).await?
            }
            WriteChar16 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::Char16(value)).await?
            }
            WriteInt8 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::Int8(value)).await?
            }
            WriteInt16 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::Int16(value)).await?
            }
            WriteInt32 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::Int32(value)).await?
            }
            WriteInt64 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::Int64(value)).await?
            }
            WriteUInt8 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::UInt8(value)).await?
            }
            WriteUInt16 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::UInt16(value)).await?
            }
            WriteUInt32 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::UInt32(value)).await?
            }
            WriteUInt64 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::UInt64(value)).await?
            }
            WriteFloat32 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::Float32(value)).await?
            }
            WriteFloat64 { instance, tag, value } => {
                self.typed_write(instance, tag, DataValue::Float64(value)).await?
            }

            ReadBit {
                instance,
                area,
                offset,
                bit,
            } => {
                let session = self.resolve(&instance).await?;
                let value = session.area(area).read_bit(offset, bit)?;
                Response::ok(json!({"value": value}))
            }
            WriteBit {
                instance,
                area,
                offset,
                bit,
                value,
            } => {
                let session = self.resolve(&instance).await?;
                session.area(area).write_bit(offset, bit, value)?;
                Response::ok_empty()
            }
            ReadBytes {
                instance,
                area,
                offset,
                count,
            } => {
                let session = self.resolve(&instance).await?;
                let bytes = session.area(area).read_bytes(offset, count)?;
                Response::ok(json!({"bytes": bytes}))
            }
            WriteBytes {
                instance,
                area,
                offset,
                bytes,
            } => {
                let session = self.resolve(&instance).await?;
                session.area(area).write_bytes(offset, &bytes)?;
                Response::ok_empty()
            }
        })
    }
}
