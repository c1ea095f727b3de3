//! Hierarchical tags
//!
//! - `Tag`: a validated tag such as `topic/ml/research` (`topic:ml` is the
//!   same as `topic/ml`)
//! - `TagPattern` / `TagSelector`: wildcard matching over tag sets
//! - `TagStore`: explicit tag assignments persisted to a JSON file
//! - `implicit_tags`: tags derived from repository metadata
//!
//! # Examples
//!
//! ```no_run
//! use repotag::tags::{TagStore, TagSelector, MatchMode};
//! use repotag::records::RepoRecord;
//! use std::path::Path;
//!
//! let mut store = TagStore::load("tags.json")?;
//! store.add_tags("/src/api", &["work/client", "topic:rest"])?;
//! store.save()?;
//!
//! let record = RepoRecord::from_path(Path::new("/src/api"));
//! let selector = TagSelector::parse(&["work/*"], MatchMode::Any)?;
//! assert!(selector.matches(&store.list_tags(&record)));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod implicit;
pub mod pattern;
pub mod store;
pub mod types;

pub use error::{InvalidTagError, StorageError, TagStoreError};
pub use implicit::{RESERVED_NAMESPACES, RESERVED_TAGS, check_reserved, implicit_tags};
pub use pattern::{MatchMode, TagPattern, TagSelector, matches};
pub use store::{TagStore, normalize_id};
pub use types::{HIERARCHY_DELIMITER, KEY_VALUE_DELIMITER, Tag};
