//! Repository records and where they come from
//!
//! Records are produced upstream by the metadata collector. This module
//! only reads them: from the metadata store file, from a JSONL stream, or
//! by pairing discovered repository directories with store entries.

pub mod discovery;
pub mod error;
pub mod jsonl;
pub mod record;
pub mod store;

pub use discovery::{canonical_path, discover_repositories, expand_home};
pub use error::RecordError;
pub use jsonl::read_jsonl;
pub use record::{RepoRecord, is_truthy};
pub use store::MetadataStore;
