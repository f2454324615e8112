//! Extensible structure chains.
//!
//! Records carry a tag field and a link field and are threaded into a singly
//! linked sequence handed to an external API through its head. Two builders
//! are provided: [`ReferenceChain`] links the caller's own records in place,
//! [`OwningChain`] copies every record into one buffer it owns and keeps the
//! links inside that buffer valid across reallocation.
pub mod blob;
pub mod chain;
pub mod error;
pub mod record;
pub mod registry;
pub mod types;

#[cfg(test)]
pub(crate) mod test_records;

pub use chain::{ChainReadable, LinkEntry, OwningChain, ReferenceChain};
pub use error::ChainError;
pub use record::{RecordCopy, RecordReadable, RecordView, RecordWritable};
pub use registry::{TagEntry, TagManifest, tag_of};
pub use types::{Extensible, StructureType};
