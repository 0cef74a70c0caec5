//! # Vitals Relay Core Library
//!
//! This crate is the core library for the `vitals-relay` application: a
//! single-process telemetry relay that ingests periodic snapshots from remote
//! medical sensing devices, serves the latest known reading per device to
//! polling dashboards, and durably records clinical encounters under a
//! monotonically increasing patient number.
//!
//! ## Crate Structure
//!
//! - **`api`**: The HTTP boundary (axum router and handlers) for ingestion,
//!   snapshot queries, patient saves, login, and health.
//! - **`config`**: Strongly-typed configuration loaded from TOML and
//!   environment variables via Figment.
//! - **`counter`**: The durable patient counter, persisted synchronously
//!   before any value is handed out.
//! - **`error`**: The `RelayError` enum used for centralized error handling
//!   across the crate.
//! - **`ledger`**: The record ledger orchestrating counter assignment and the
//!   dual-sink append under one critical section.
//! - **`logging`**: Structured logging setup on `tracing`.
//! - **`mirror`**: The Arrow IPC tabular mirror of the patient ledger.
//! - **`record`**: The immutable patient record and the shared ledger column
//!   order.
//! - **`snapshot`**: Per-device telemetry state and its field-merge rules.
//! - **`store`**: The concurrency-safe latest-state cache keyed by device.

pub mod api;
pub mod config;
pub mod counter;
pub mod error;
pub mod ledger;
pub mod logging;
pub mod mirror;
pub mod record;
pub mod snapshot;
pub mod store;

pub use error::{AppResult, RelayError};
