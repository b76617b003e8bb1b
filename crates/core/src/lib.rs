//! CardVault Core - Shared types library.
//!
//! This crate provides common types used across all CardVault components:
//! - `inventory` - Digital stock store and allocation engine
//! - `cli` - Command-line tools for migrations and stock management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
