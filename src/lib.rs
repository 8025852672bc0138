//! metabind - reactive bindings between declarations and document metadata
//!
//! Declarations embedded in documents (`frontmatter^notes/a.md#tags[0]`,
//! `INPUT[toggle:done]`, `VIEW[{a} + {b}]`) are parsed into validated bind
//! targets and kept in sync, in both directions, with metadata held by
//! pluggable storage sources.
//!
//! # Architecture
//!
//! - [`core`] - Domain types, property paths, diagnostics, configuration
//! - [`parser`] - Declaration grammars and validation
//! - [`reactive`] - Signals and reference-counted registries
//! - [`metadata`] - Storage sources, subscriptions, and the manager cycle
//! - [`fields`] - Registries shared by mounted fields (buttons)
//! - [`cli`] - The `mb` command-line interface
//!
//! # Correctness Invariants
//!
//! 1. A write is visible to reads on the same source immediately
//! 2. A subscription never receives its own write back
//! 3. Each subscription sees a given value at most once per cycle
//! 4. A removed document force-deletes every subscription bound to it

pub mod cli;
pub mod core;
pub mod fields;
pub mod metadata;
pub mod parser;
pub mod reactive;
