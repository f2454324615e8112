use super::base::{ChainLayout, ChainReadable, LinkEntry};
use crate::record::RecordView;
use crate::types::*;
use log::{debug, trace};
use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// Non-owning structure chain.
///
/// The head is held by the chain (boxed, so its address survives moves of
/// the chain value). Every other member is the caller's record, borrowed
/// exclusively for `'a`; the chain writes their tag and link fields in place.
pub struct ReferenceChain<'a, H: Extensible> {
    head: NonNull<H>,
    layout: ChainLayout<NonNull<u8>>,
    _marker: PhantomData<(Box<H>, &'a mut [u8])>,
}

impl<'a, H: Extensible> ReferenceChain<'a, H> {
    /// Chain whose head is `H::default()` with its tag stamped.
    pub fn new() -> Self
    where
        H: Default,
    {
        Self::with_head(H::default())
    }

    /// Chain around a caller-supplied head. The tag is re-stamped and the
    /// link cleared.
    pub fn with_head(head: H) -> Self {
        let head = NonNull::from(Box::leak(Box::new(head)));
        let start = head.cast::<u8>();
        // SAFETY: `start` points at a live, exclusively owned `H`.
        unsafe {
            write_tag(start.as_ptr(), H::TAG_OFFSET, H::TAG);
            write_link(start.as_ptr(), H::LINK_OFFSET, ptr::null());
        }
        Self {
            head,
            layout: ChainLayout::with_head(start, LinkEntry::of::<H>()),
            _marker: PhantomData,
        }
    }

    /// Link `record` after the current tail and stamp its tag.
    pub fn append<T: Extensible>(&mut self, record: &'a mut T) {
        let data = NonNull::from(record).cast::<u8>();
        self.append_data_to_chain(data, LinkEntry::of::<T>());
    }

    /// Link a type-erased record after the current tail. The record keeps
    /// the tag its tag field already holds.
    pub fn append_generic(&mut self, record: RecordView<'a>) {
        let entry = LinkEntry::of_record(&record);
        self.append_data_to_chain(record.raw(), entry);
    }

    /// Drop every member but the head and clear the head's link.
    pub fn clear(&mut self) {
        debug!("clearing reference chain of {} records", self.layout.len());
        self.layout.truncate_to_head();
        // SAFETY: the head allocation is owned by the chain.
        unsafe { write_link(self.head.as_ptr().cast(), H::LINK_OFFSET, ptr::null()) };
    }

    fn append_data_to_chain(&mut self, data: NonNull<u8>, entry: LinkEntry) {
        let (prev, prev_entry) = self.layout.tail();
        let index = self.layout.push(data, entry);

        // SAFETY: `data` is borrowed for 'a and spans `entry.size` bytes;
        // `prev` is the head or an earlier record borrowed for 'a.
        unsafe {
            write_tag(data.as_ptr(), entry.tag_offset, entry.tag);
            write_link(prev.as_ptr(), prev_entry.link_offset, data.as_ptr().cast());
        }
        trace!(
            "linked {:?} ({} bytes) at index {} -> {:p}",
            entry.tag,
            entry.size,
            index,
            data
        );
    }
}

impl<H: Extensible + Default> Default for ReferenceChain<'_, H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Extensible> ChainReadable for ReferenceChain<'_, H> {
    type Head = H;

    #[inline]
    fn entries(&self) -> &[LinkEntry] {
        self.layout.entries()
    }

    #[inline]
    fn index_of(&self, tag: StructureType) -> Option<usize> {
        self.layout.index_of(tag)
    }

    #[inline]
    fn record_ptr(&self, index: usize) -> *const u8 {
        self.layout.starts()[index].as_ptr()
    }

    #[inline]
    fn record_mut_ptr(&mut self, index: usize) -> *mut u8 {
        self.layout.starts()[index].as_ptr()
    }
}

impl<H: Extensible> Drop for ReferenceChain<'_, H> {
    fn drop(&mut self) {
        // SAFETY: `head` came from `Box::leak` in `with_head` and is freed once.
        drop(unsafe { Box::from_raw(self.head.as_ptr()) });
    }
}

impl<H: Extensible> fmt::Debug for ReferenceChain<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceChain")
            .field("head", &self.head)
            .field("tags", &self.tags().collect::<Vec<_>>())
            .finish()
    }
}
