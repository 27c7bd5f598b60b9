//! Gateway server exposing a virtual PLC simulation runtime over a JSON
//! request/response interface.
//!
//! Clients register, configure, power, run and exchange process-memory values
//! with virtual controller instances without linking against the native
//! runtime. The native side sits behind the capability traits in [`runtime`];
//! the [`session`] layer owns validation and the shared instance registry.

pub mod config;
pub mod error;
pub mod gateway;
pub mod runtime;
pub mod server;
pub mod session;
