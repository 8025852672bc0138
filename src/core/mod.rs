//! core
//!
//! Core domain types, schemas, and navigation for metabind.
//!
//! # Modules
//!
//! - [`types`] - Strong types: StorageType, ParsingRange, SubscriptionId, etc.
//! - [`prop`] - Property paths and tree navigation
//! - [`declaration`] - Validated bind targets and scopes
//! - [`errors`] - Declaration diagnostics and their collection
//! - [`literal`] - Coercions between metadata values and literals
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Diagnostics are values, collected per declaration
//! - Navigation never converts containers

pub mod config;
pub mod declaration;
pub mod errors;
pub mod literal;
pub mod prop;
pub mod types;
