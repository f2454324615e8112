mod base;
pub mod owning;
pub mod reference;
pub mod walk;

pub use base::{ChainReadable, LinkEntry};
pub use owning::OwningChain;
pub use reference::ReferenceChain;
pub use walk::{BaseOutRecord, ChainWalk, LinkWalk, LinkedRecord, walk_links};
