use super::base::{ChainLayout, ChainReadable, LinkEntry};
use crate::blob::{AlignedBlob, BLOB_ALIGN};
use crate::error::ChainError;
use crate::record::RecordReadable;
use crate::types::*;
use log::{debug, trace};
use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr;

// ─── Buffer Layout ──────────────────────────────────────────────────────────
//
//  ┌────────────┬──────────────┬───────────┬─────┐
//  │ head       │ record 1     │ record 2  │ ... │   one AlignedBlob
//  └─────┬──────┴──────▲───┬───┴─────▲─────┴─────┘
//        └─── link ────┘   └─ link ──┘              tail link: null or external
//
// Each record starts at the previous end rounded up to its own alignment; the
// gap is zero-filled. Starts are tracked as offsets into the blob; absolute
// addresses only exist inside link fields and are rewritten every time the
// blob is replaced.

/// Owning structure chain: every member is copied into one contiguous buffer.
///
/// Members must be `Copy`, since the chain only ever moves them as bytes and
/// never runs destructors.
pub struct OwningChain<H: Extensible + Copy> {
    blob: AlignedBlob,
    layout: ChainLayout<usize>,
    _marker: PhantomData<H>,
}

impl<H: Extensible + Copy> OwningChain<H> {
    /// Chain whose head is `H::default()` with its tag stamped.
    pub fn new() -> Self
    where
        H: Default,
    {
        Self::with_head(&H::default())
    }

    /// Chain around a copy of `head`. The tag is re-stamped and the link
    /// cleared.
    pub fn with_head(head: &H) -> Self {
        // SAFETY: `head` is valid for `size_of::<H>()` bytes.
        let mut blob = unsafe { AlignedBlob::from_raw(ptr::from_ref(head).cast(), size_of::<H>()) };
        // SAFETY: the head spans the whole blob.
        unsafe {
            write_tag(blob.as_mut_ptr(), H::TAG_OFFSET, H::TAG);
            write_link(blob.as_mut_ptr(), H::LINK_OFFSET, ptr::null());
        }
        Self {
            blob,
            layout: ChainLayout::with_head(0, LinkEntry::of::<H>()),
            _marker: PhantomData,
        }
    }

    /// Copy `record` to the end of the chain. Its own link value becomes the
    /// chain's tail link.
    pub fn append<T: Extensible + Copy>(&mut self, record: &T) {
        let data = ptr::from_ref(record).cast::<u8>();
        // SAFETY: the link field lies inside `record`.
        let link = unsafe { read_link(data, T::LINK_OFFSET) };
        // SAFETY: `record` is valid for `size_of::<T>()` bytes.
        unsafe { self.append_data_to_blob(data, size_of::<T>(), link, LinkEntry::of::<T>()) };
    }

    /// Copy `record` to the end of the chain with an explicit tail link,
    /// null or a caller-owned record outside the chain.
    pub fn append_with_link<T: Extensible + Copy>(&mut self, record: &T, link: *const c_void) {
        let data = ptr::from_ref(record).cast::<u8>();
        // SAFETY: `record` is valid for `size_of::<T>()` bytes.
        unsafe { self.append_data_to_blob(data, size_of::<T>(), link, LinkEntry::of::<T>()) };
    }

    /// Copy a type-erased record to the end of the chain. It keeps the tag
    /// it carries; its link value becomes the chain's tail link.
    pub fn append_generic<R: RecordReadable + ?Sized>(&mut self, record: &R) {
        let entry = LinkEntry::of_record(record);
        let link = record.link();
        let data = record.data();
        // SAFETY: `RecordReadable` guarantees `size()` bytes at `data()`.
        unsafe { self.append_data_to_blob(data, entry.size, link, entry) };
    }

    /// Keep only the head's bytes and clear its link.
    pub fn clear(&mut self) {
        debug!(
            "clearing owning chain of {} records ({} bytes)",
            self.layout.len(),
            self.blob.len()
        );
        let head_size = self.layout.entries()[0].size;
        let mut blob = AlignedBlob::from_slice(&self.blob.as_slice()[..head_size]);
        // SAFETY: the head spans the whole new blob.
        unsafe { write_link(blob.as_mut_ptr(), H::LINK_OFFSET, ptr::null()) };
        self.blob = blob;
        self.layout.truncate_to_head();
    }

    /// The whole chain as one byte buffer.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.blob.as_slice()
    }

    #[inline]
    pub fn byte_len(&self) -> usize {
        self.blob.len()
    }

    /// Offset of record `index` from the start of the buffer.
    #[inline]
    pub fn offset_of_record(&self, index: usize) -> usize {
        self.layout.starts()[index]
    }

    /// Check that every non-tail link lies inside the buffer.
    pub fn verify_links(&self) -> Result<(), ChainError> {
        let base = self.blob.as_ptr();
        let last = self.layout.len() - 1;
        for (index, (&start, entry)) in self
            .layout
            .starts()
            .iter()
            .zip(self.layout.entries())
            .take(last)
            .enumerate()
        {
            // SAFETY: record `index` lies inside the blob.
            let link = unsafe { read_link(base.add(start), entry.link_offset) };
            if !self.blob.contains_addr(link.cast_const().cast()) {
                return Err(ChainError::LinkOutOfBounds { index });
            }
        }
        Ok(())
    }

    /// Append `size` bytes at `data` as a new tail.
    ///
    /// The buffer is replaced by a larger one, so every link field is
    /// rewritten against the new base, not only the previous tail's.
    ///
    /// # Safety
    /// `data` must be valid for reads of `size` bytes, and `entry` must
    /// describe fields that fit inside `size`.
    unsafe fn append_data_to_blob(
        &mut self,
        data: *const u8,
        size: usize,
        external_link: *const c_void,
        entry: LinkEntry,
    ) {
        assert!(
            entry.align <= BLOB_ALIGN,
            "record alignment {} exceeds chain buffer alignment {BLOB_ALIGN}",
            entry.align
        );
        let old_len = self.blob.len();
        let landing = old_len.next_multiple_of(entry.align);

        let mut next = AlignedBlob::zeroed(landing + size);
        // SAFETY: `next` holds `landing + size` bytes and `old_len <= landing`;
        // the caller vouches for `data`. Padding stays zeroed.
        unsafe {
            ptr::copy_nonoverlapping(self.blob.as_ptr(), next.as_mut_ptr(), old_len);
            ptr::copy_nonoverlapping(data, next.as_mut_ptr().add(landing), size);
            write_tag(next.as_mut_ptr().add(landing), entry.tag_offset, entry.tag);
        }

        let index = self.layout.push(landing, entry);
        relink(&mut next, &self.layout, external_link);

        // Moving the blob keeps its heap allocation, so the links stay valid.
        let old_base = self.blob.as_ptr();
        self.blob = next;
        trace!(
            "appended {:?} ({} bytes) at index {} offset {} (+{} padding); blob {:p} -> {:p}, {} bytes",
            entry.tag,
            size,
            index,
            landing,
            landing - old_len,
            old_base,
            self.blob.as_ptr(),
            self.blob.len()
        );

        if let Err(e) = self.verify_links() {
            panic!("chain relocation corrupted links: {e}");
        }
    }
}

/// Point every record's link at its successor inside `blob`, and the tail's
/// at `external_link`.
fn relink(blob: &mut AlignedBlob, layout: &ChainLayout<usize>, external_link: *const c_void) {
    let base = blob.as_mut_ptr();
    let starts = layout.starts();
    let entries = layout.entries();
    let last = starts.len() - 1;
    // SAFETY: every tracked start plus its entry lies inside `blob`.
    unsafe {
        for i in 0..last {
            let successor = base.add(starts[i + 1]);
            write_link(base.add(starts[i]), entries[i].link_offset, successor.cast());
        }
        write_link(base.add(starts[last]), entries[last].link_offset, external_link);
    }
}

/// Byte copy of the buffer with its internal links rewritten for the new
/// allocation. The tail keeps the same external link.
impl<H: Extensible + Copy> Clone for OwningChain<H> {
    fn clone(&self) -> Self {
        let mut blob = self.blob.clone();
        relink(&mut blob, &self.layout, self.tail_link());
        Self {
            blob,
            layout: self.layout.clone(),
            _marker: PhantomData,
        }
    }
}

impl<H: Extensible + Copy + Default> Default for OwningChain<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Extensible + Copy> ChainReadable for OwningChain<H> {
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
        // SAFETY: tracked offsets lie inside the blob.
        unsafe { self.blob.as_ptr().add(self.layout.starts()[index]) }
    }

    #[inline]
    fn record_mut_ptr(&mut self, index: usize) -> *mut u8 {
        let offset = self.layout.starts()[index];
        // SAFETY: tracked offsets lie inside the blob.
        unsafe { self.blob.as_mut_ptr().add(offset) }
    }
}

impl<H: Extensible + Copy> fmt::Debug for OwningChain<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwningChain")
            .field("blob", &self.blob)
            .field("offsets", &self.layout.starts())
            .field("tags", &self.tags().collect::<Vec<_>>())
            .finish()
    }
}
