//! metadata::sources
//!
//! The built-in storage sources.
//!
//! | Storage type    | Source                | Backing                         |
//! |-----------------|-----------------------|---------------------------------|
//! | `frontmatter`   | [`FrontmatterSource`] | a [`DocumentBackend`]           |
//! | `memory`        | [`MemorySource`]      | the cache itself, per document  |
//! | `global_memory` | [`GlobalSource`]      | the cache itself, one tree      |

pub mod file_documents;
pub mod frontmatter;
pub mod global;
pub mod memory;

pub use file_documents::{FileDocuments, FrontmatterFormat};
pub use frontmatter::{DocumentBackend, FrontmatterSource, InMemoryDocuments};
pub use global::GlobalSource;
pub use memory::MemorySource;
