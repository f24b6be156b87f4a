//! Shared test utilities for the kvsync workspace.
//!
//! This crate provides standardised test fixtures so crate test suites do not
//! need a running store. It is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`memory`]: [`MemoryStore`], an in-memory [`kvsync_core::Store`] that
//!   records every call
//! - [`documents`]: [`DocumentDir`] builder for on-disk document fixtures

pub mod documents;
pub mod memory;

pub use documents::DocumentDir;
pub use memory::{Call, MemoryStore, MemoryStoreError};
