//! `sensor-hub` library crate.
//!
//! The sensor core (readers, alert policy, per-sensor state, registry,
//! poller) plus the thin http layer on top. The binary entrypoint lives in
//! `main.rs`.

pub mod alert;
pub mod api;
pub mod config;
pub mod domain;
pub mod hal;
pub mod poller;
pub mod registry;
pub mod sensor;
pub mod service;
