//! # recsync core
//!
//! Keeps a slave record store consistent with a master store.
//!
//! This crate provides:
//! - Field mapping from master to slave, with derived fields ([`FieldMap`])
//! - Binding configuration and its JSON settings form ([`SyncConfig`], [`SyncSettings`])
//! - Per-record sync and delete gated by scenario triggers ([`SyncController`])
//! - Full reconciliation with orphan cleanup ([`BatchReconciler`])
//! - An engine that follows an observed master store ([`SyncEngine`])
//!
//! Two engines bound in opposite directions do not ping-pong: writes made
//! by a sync carry a marked [`recsync_storage::SyncContext`] and the
//! engine on the other side ignores them.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod controller;
mod engine;
mod error;
mod field_map;
mod reconciler;
mod settings;

pub use config::{
    DeleteFailureHook, FailureReporting, SaveFailureHook, SyncConfig, SyncConfigBuilder,
    TriggerSet, DEFAULT_BATCH_SIZE,
};
pub use controller::{SyncController, SyncOutcome};
pub use engine::SyncEngine;
pub use error::{SyncError, SyncResult};
pub use field_map::{DeriveFn, FieldMap, FieldMapSpec, FieldSource};
pub use reconciler::{BatchReconciler, ReconcileReport};
pub use settings::SyncSettings;
