use super::walk::ChainWalk;
use crate::error::ChainError;
use crate::record::{RecordReadable, RecordView};
use crate::types::*;
use rustc_hash::FxHashMap;
use std::ffi::c_void;
use std::ptr::NonNull;

// ─── LinkEntry ──────────────────────────────────────────────────────────────

/// Layout of one chain member: size, alignment, field offsets and the tag it
/// was appended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkEntry {
    pub size: usize,
    pub align: usize,
    pub tag_offset: usize,
    pub link_offset: usize,
    pub tag: StructureType,
}

impl LinkEntry {
    #[inline]
    pub fn of<T: Extensible>() -> Self {
        Self {
            size: size_of::<T>(),
            align: align_of::<T>(),
            tag_offset: T::TAG_OFFSET,
            link_offset: T::LINK_OFFSET,
            tag: T::TAG,
        }
    }

    /// Entry for a type-erased record, tagged with whatever its tag field
    /// currently holds. Its alignment is unknown, so it is assumed to be that
    /// of the link field. Panics if either field is out of range.
    pub fn of_record<R: RecordReadable + ?Sized>(record: &R) -> Self {
        if let Err(e) = check_field(record.link_offset(), LINK_SIZE, record.size()) {
            panic!("{e}");
        }
        Self {
            size: record.size(),
            align: align_of::<*const c_void>(),
            tag_offset: record.tag_offset(),
            link_offset: record.link_offset(),
            tag: record.tag(),
        }
    }
}

// ─── ChainLayout ────────────────────────────────────────────────────────────

/// Index-aligned bookkeeping shared by both chain variants.
///
/// `L` is how a record's start is remembered: an absolute address for the
/// reference chain, a buffer offset for the owning chain. Index 0 is always
/// the head.
#[derive(Debug, Clone)]
pub(crate) struct ChainLayout<L> {
    starts: Vec<L>,
    entries: Vec<LinkEntry>,
    /// tag → index of the most recent record appended with that tag.
    indices: FxHashMap<StructureType, usize>,
}

impl<L: Copy> ChainLayout<L> {
    pub(crate) fn with_head(start: L, entry: LinkEntry) -> Self {
        let mut indices = FxHashMap::default();
        indices.insert(entry.tag, 0);
        Self {
            starts: vec![start],
            entries: vec![entry],
            indices,
        }
    }

    /// Track a new tail. A repeated tag re-points the lookup at the new
    /// record; the earlier record stays in the sequence.
    pub(crate) fn push(&mut self, start: L, entry: LinkEntry) -> usize {
        self.starts.push(start);
        self.entries.push(entry);
        let index = self.entries.len() - 1;
        self.indices.insert(entry.tag, index);
        index
    }

    /// Drop everything but the head.
    pub(crate) fn truncate_to_head(&mut self) {
        self.starts.truncate(1);
        self.entries.truncate(1);
        self.indices.clear();
        self.indices.insert(self.entries[0].tag, 0);
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub(crate) fn starts(&self) -> &[L] {
        &self.starts
    }

    #[inline]
    pub(crate) fn entries(&self) -> &[LinkEntry] {
        &self.entries
    }

    #[inline]
    pub(crate) fn index_of(&self, tag: StructureType) -> Option<usize> {
        self.indices.get(&tag).copied()
    }

    #[inline]
    pub(crate) fn tail(&self) -> (L, LinkEntry) {
        let last = self.len() - 1;
        (self.starts[last], self.entries[last])
    }
}

// ─── ChainReadable ──────────────────────────────────────────────────────────

/// Read and typed access shared by [`ReferenceChain`](super::ReferenceChain)
/// and [`OwningChain`](super::OwningChain).
pub trait ChainReadable {
    type Head: Extensible;

    fn entries(&self) -> &[LinkEntry];
    fn index_of(&self, tag: StructureType) -> Option<usize>;
    /// Start of record `index` in the chain's current storage.
    fn record_ptr(&self, index: usize) -> *const u8;
    fn record_mut_ptr(&mut self, index: usize) -> *mut u8;

    /// Number of records, head included. Never zero.
    #[inline]
    fn len(&self) -> usize {
        self.entries().len()
    }

    #[inline]
    fn contains<T: Extensible>(&self) -> bool {
        self.index_of(T::TAG).is_some()
    }

    /// Tags in chain order.
    fn tags(&self) -> impl Iterator<Item = StructureType> + '_ {
        self.entries().iter().map(|e| e.tag)
    }

    /// Raw bytes of record `index`.
    fn record_bytes(&self, index: usize) -> &[u8] {
        let size = self.entries()[index].size;
        // SAFETY: record `index` spans `size` bytes of live storage.
        unsafe { std::slice::from_raw_parts(self.record_ptr(index), size) }
    }

    /// Type-erased view of record `index`, borrowed from the chain.
    fn record(&mut self, index: usize) -> RecordView<'_> {
        let entry = self.entries()[index];
        let data = self.record_mut_ptr(index);
        // SAFETY: tracked records are non-null and span `entry.size` bytes;
        // the view holds the chain's exclusive borrow. Offsets were checked
        // when the record was appended.
        unsafe {
            RecordView::from_raw_parts(
                NonNull::new_unchecked(data),
                entry.size,
                entry.tag_offset,
                entry.link_offset,
            )
        }
    }

    fn try_record_as<T: Extensible>(&self, index: usize) -> Result<&T, ChainError> {
        let ptr = checked_record_ptr::<T>(self.entries()[index], self.record_ptr(index))?;
        // SAFETY: size and alignment checked; storage outlives `&self`.
        Ok(unsafe { &*ptr })
    }

    fn try_record_as_mut<T: Extensible>(&mut self, index: usize) -> Result<&mut T, ChainError> {
        let entry = self.entries()[index];
        let ptr = checked_record_ptr::<T>(entry, self.record_mut_ptr(index))?;
        // SAFETY: as above, and access is exclusive through `&mut self`.
        Ok(unsafe { &mut *ptr.cast_mut() })
    }

    // ════════════════════════════════════════════════════════════════════════
    // Head
    // ════════════════════════════════════════════════════════════════════════

    fn head(&self) -> &Self::Head {
        match self.try_record_as(0) {
            Ok(head) => head,
            Err(e) => panic!("{e}"),
        }
    }

    fn head_mut(&mut self) -> &mut Self::Head {
        match self.try_record_as_mut(0) {
            Ok(head) => head,
            Err(e) => panic!("{e}"),
        }
    }

    /// Head pointer for the consuming API.
    #[inline]
    fn as_ptr(&self) -> *const Self::Head {
        self.record_ptr(0).cast()
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut Self::Head {
        self.record_mut_ptr(0).cast()
    }

    // ════════════════════════════════════════════════════════════════════════
    // Lookup by tag
    // ════════════════════════════════════════════════════════════════════════

    fn try_linked_as<T: Extensible>(&self) -> Result<&T, ChainError> {
        let index = self.index_of(T::TAG).ok_or(ChainError::LinkNotFound(T::TAG))?;
        self.try_record_as(index)
    }

    /// The record most recently appended with `T::TAG`. Panics if the chain
    /// holds no such record.
    fn linked_as<T: Extensible>(&self) -> &T {
        match self.try_linked_as::<T>() {
            Ok(record) => record,
            Err(e) => panic!("{e}"),
        }
    }

    fn try_linked_as_mut<T: Extensible>(&mut self) -> Result<&mut T, ChainError> {
        let index = self.index_of(T::TAG).ok_or(ChainError::LinkNotFound(T::TAG))?;
        self.try_record_as_mut(index)
    }

    fn linked_as_mut<T: Extensible>(&mut self) -> &mut T {
        match self.try_linked_as_mut::<T>() {
            Ok(record) => record,
            Err(e) => panic!("{e}"),
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Links
    // ════════════════════════════════════════════════════════════════════════

    /// Link field of the last record: null or an external target.
    fn tail_link(&self) -> *mut c_void {
        let last = self.len() - 1;
        let entry = self.entries()[last];
        // SAFETY: the link field lies inside the tail record.
        unsafe { read_link(self.record_ptr(last), entry.link_offset) }
    }

    /// Check that every non-tail link points at the record after it.
    fn verify(&self) -> Result<(), ChainError> {
        for index in 0..self.len() - 1 {
            let entry = self.entries()[index];
            // SAFETY: the link field lies inside record `index`.
            let link = unsafe { read_link(self.record_ptr(index), entry.link_offset) };
            if link.cast_const().cast::<u8>() != self.record_ptr(index + 1) {
                return Err(ChainError::BrokenLink { index });
            }
        }
        Ok(())
    }

    /// Follow link fields from the head, one step per chain member.
    fn walk(&self) -> ChainWalk<'_> {
        let addrs = (0..self.len()).map(|i| self.record_ptr(i)).collect();
        ChainWalk::new(self.entries(), addrs)
    }
}

fn checked_record_ptr<T: Extensible>(entry: LinkEntry, ptr: *const u8) -> Result<*const T, ChainError> {
    if entry.size != size_of::<T>() {
        return Err(ChainError::SizeMismatch {
            expected: size_of::<T>(),
            actual: entry.size,
        });
    }
    let ptr = ptr.cast::<T>();
    if !ptr.is_aligned() {
        return Err(ChainError::Misaligned {
            addr: ptr as usize,
            align: align_of::<T>(),
        });
    }
    Ok(ptr)
}
