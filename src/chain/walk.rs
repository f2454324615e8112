use super::base::LinkEntry;
use crate::types::*;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::mem::offset_of;
use std::ptr::{self, NonNull};

// ─── Chain walk ─────────────────────────────────────────────────────────────

/// One chain member reached by following link fields.
#[derive(Debug, Clone, Copy)]
pub struct LinkedRecord<'a> {
    pub index: usize,
    pub tag: StructureType,
    pub addr: *const u8,
    pub bytes: &'a [u8],
}

/// Iterator that reads each member's link field to find the next one.
///
/// Every followed link is compared with the address the chain tracks for the
/// next member; a mismatch means a link field was overwritten behind the
/// chain's back and panics rather than dereferencing it.
pub struct ChainWalk<'a> {
    entries: &'a [LinkEntry],
    addrs: Vec<*const u8>,
    next: *const u8,
    pos: usize,
}

impl<'a> ChainWalk<'a> {
    pub(crate) fn new(entries: &'a [LinkEntry], addrs: Vec<*const u8>) -> Self {
        let next = addrs.first().copied().unwrap_or(ptr::null());
        Self {
            entries,
            addrs,
            next,
            pos: 0,
        }
    }
}

impl<'a> Iterator for ChainWalk<'a> {
    type Item = LinkedRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.entries.len() {
            return None;
        }
        let entry = self.entries[self.pos];
        let record = self.next;
        assert_eq!(
            record, self.addrs[self.pos],
            "link of record {} does not point at record {}",
            self.pos.wrapping_sub(1),
            self.pos
        );

        // SAFETY: `record` is a tracked chain member spanning `entry.size`
        // bytes, alive for as long as the chain is borrowed.
        let (tag, bytes, link) = unsafe {
            (
                read_tag(record, entry.tag_offset),
                std::slice::from_raw_parts(record, entry.size),
                read_link(record, entry.link_offset),
            )
        };
        self.next = link.cast_const().cast();
        self.pos += 1;
        Some(LinkedRecord {
            index: self.pos - 1,
            tag,
            addr: record,
            bytes,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.entries.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for ChainWalk<'_> {}

// ─── Raw walk ───────────────────────────────────────────────────────────────

/// The `{ tag, link }` prefix a consuming API reads from every record.
#[repr(C)]
#[derive(Debug)]
pub struct BaseOutRecord {
    pub s_type: StructureType,
    pub p_next: *mut BaseOutRecord,
}

/// Walk a linked sequence the way a consuming API does, assuming every
/// record starts with a [`BaseOutRecord`] prefix.
pub struct LinkWalk<'a> {
    next: *mut BaseOutRecord,
    _marker: PhantomData<&'a mut BaseOutRecord>,
}

/// # Safety
/// Every record reachable from `head` must start with a [`BaseOutRecord`]
/// layout, stay valid for `'a`, and the sequence must end in a null link.
pub unsafe fn walk_links<'a>(head: *mut c_void) -> LinkWalk<'a> {
    LinkWalk {
        next: head.cast(),
        _marker: PhantomData,
    }
}

impl LinkWalk<'_> {
    /// Tag of a record yielded by the walk.
    ///
    /// # Safety
    /// `record` must come from this walk.
    pub unsafe fn tag_of(record: NonNull<BaseOutRecord>) -> StructureType {
        unsafe { read_tag(record.as_ptr().cast(), offset_of!(BaseOutRecord, s_type)) }
    }
}

impl Iterator for LinkWalk<'_> {
    type Item = NonNull<BaseOutRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = NonNull::new(self.next)?;
        // SAFETY: the caller of `walk_links` vouched for every reachable record.
        self.next = unsafe {
            read_link(record.as_ptr().cast(), offset_of!(BaseOutRecord, p_next)).cast()
        };
        Some(record)
    }
}
