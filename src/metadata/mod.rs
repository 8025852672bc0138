//! metadata
//!
//! Storage sources, subscriptions, and the manager that keeps them in sync.
//!
//! # Modules
//!
//! - [`source`] - The storage source contract and its cache
//! - [`sources`] - Frontmatter, memory, and global sources
//! - [`subscription`] - Plain and computed subscriptions
//! - [`manager`] - Routing, the reconciliation cycle, teardown
//!
//! # Example
//!
//! ```
//! use metabind::core::config::EngineConfig;
//! use metabind::core::declaration::BindTargetDeclaration;
//! use metabind::core::prop::PropPath;
//! use metabind::core::types::StorageType;
//! use metabind::metadata::MetadataManager;
//! use metabind::reactive::Signal;
//! use serde_json::{json, Value};
//!
//! let manager = MetadataManager::with_default_sources(EngineConfig::default());
//! let target = BindTargetDeclaration::new(
//!     StorageType::Memory,
//!     "notes/a.md",
//!     PropPath::from_segments(&["count"]),
//! );
//!
//! let writer = manager
//!     .subscribe("writer".into(), Signal::new(Value::Null), target.clone(), || {})
//!     .unwrap();
//! let reader = Signal::new(Value::Null);
//! let _sub = manager
//!     .subscribe("reader".into(), reader.clone(), target, || {})
//!     .unwrap();
//!
//! writer.write(json!(3)).unwrap();
//! manager.cycle();
//! assert_eq!(reader.get(), json!(3));
//! ```

pub mod manager;
pub mod source;
pub mod sources;
pub mod subscription;

pub use manager::{CycleReport, ManagerError, MetadataManager, WeakManager};
pub use source::{SourceError, StorageSource};
pub use subscription::{ComputedSubscription, MetadataSubscription, Subscription};
