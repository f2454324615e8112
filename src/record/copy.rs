use super::read_op::RecordReadable;
use super::view::RecordView;
use super::write_op::RecordWritable;
use crate::blob::AlignedBlob;
use crate::types::*;
use std::fmt;
use std::ptr::{self, NonNull};

/// Owning, type-erased copy of one record.
///
/// The bytes live in a private buffer. The link field of a copy is always
/// null: a copy never inherits whatever its source pointed to.
#[derive(Default)]
pub struct RecordCopy {
    bytes: AlignedBlob,
    tag_offset: usize,
    link_offset: usize,
}

impl RecordCopy {
    /// Copy a typed record, stamp `T::TAG` and clear the link.
    pub fn new<T: Extensible + Copy>(record: &T) -> Self {
        // SAFETY: `record` is valid for `size_of::<T>()` bytes.
        let bytes = unsafe { AlignedBlob::from_raw(ptr::from_ref(record).cast(), size_of::<T>()) };
        let mut copy = Self {
            bytes,
            tag_offset: T::TAG_OFFSET,
            link_offset: T::LINK_OFFSET,
        };
        copy.stamp_tag(T::TAG);
        copy.set_link(ptr::null());
        copy
    }

    /// Copy any type-erased record. The tag is kept, the link is cleared.
    pub fn from_record<R: RecordReadable + ?Sized>(record: &R) -> Self {
        let mut copy = Self {
            bytes: AlignedBlob::from_slice(record.as_bytes()),
            tag_offset: record.tag_offset(),
            link_offset: record.link_offset(),
        };
        if !copy.is_empty() {
            copy.set_link(ptr::null());
        }
        copy
    }

    /// Borrow the copy as a [`RecordView`], e.g. to link it into a
    /// reference chain. Panics on an empty copy.
    pub fn as_view(&mut self) -> RecordView<'_> {
        assert!(!self.is_empty(), "record is empty");
        let (size, tag_offset, link_offset) = (self.size(), self.tag_offset, self.link_offset);
        // SAFETY: a non-empty blob has a real, non-null allocation.
        let data = unsafe { NonNull::new_unchecked(self.data_mut_ptr()) };
        // SAFETY: the copy's buffer is exclusively borrowed for the view's lifetime.
        unsafe { RecordView::from_raw_parts(data, size, tag_offset, link_offset) }
    }
}

impl Clone for RecordCopy {
    fn clone(&self) -> Self {
        Self::from_record(self)
    }
}

impl RecordReadable for RecordCopy {
    #[inline]
    fn data_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    #[inline]
    fn size(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    fn tag_offset(&self) -> usize {
        self.tag_offset
    }

    #[inline]
    fn link_offset(&self) -> usize {
        self.link_offset
    }
}

impl RecordWritable for RecordCopy {
    #[inline]
    fn data_mut_ptr(&mut self) -> *mut u8 {
        self.bytes.as_mut_ptr()
    }
}

impl<T: Extensible + Copy> From<&T> for RecordCopy {
    fn from(record: &T) -> Self {
        Self::new(record)
    }
}

impl fmt::Debug for RecordCopy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordCopy")
            .field("size", &self.size())
            .field("tag", &self.try_tag().ok())
            .field("link", &self.try_link().ok())
            .finish()
    }
}
