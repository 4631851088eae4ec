//! nook-core - Core library for Nook
//!
//! This crate contains the record model, the local cache, the cloud sync
//! engine, live subscription monitoring and recurring task generation shared
//! by every Nook interface.

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod observe;
pub mod recurrence;
pub mod remote;
pub mod sanitize;
pub mod subscription;
pub mod sync;
pub mod util;
pub mod visibility;

pub use error::{Error, Result};
pub use models::{Document, FieldValue, Record, SyncResult, Task};
pub use sync::{SyncEngine, SyncSettings};
