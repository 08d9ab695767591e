//! Flowgraph Store
//!
//! This crate persists flows through an externally supplied key-value
//! capability. It has no opinion on where the store lives.
//!
//! - [`KvStore`] is the capability: `get`/`set` of opaque bytes by key
//! - [`serialize`]/[`deserialize`] convert a [`Flow`] to and from its JSON document
//! - [`FlowRepository`] combines the two, keyed by flow name
//!
//! [`Flow`]: flowgraph_model::Flow

mod codec;
mod error;
mod fs;
mod kv;
mod repository;

pub use codec::{deserialize, serialize};
pub use error::{PersistenceError, StoreError};
pub use fs::FsKvStore;
pub use kv::{InMemoryKvStore, KvStore};
pub use repository::FlowRepository;
