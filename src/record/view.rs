use super::read_op::RecordReadable;
use super::write_op::RecordWritable;
use crate::types::*;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

// ─── View (zero-copy) ──────────────────────────────────────────────────────
/// Non-owning, type-erased handle to one record.
///
/// Holds the record's address, size and the offsets of its tag and link
/// fields. The borrow `'a` keeps the referenced record alive and exclusive
/// for as long as the view (or a chain it was appended to) exists.
pub struct RecordView<'a> {
    data: NonNull<u8>,
    size: usize,
    tag_offset: usize,
    link_offset: usize,
    _marker: PhantomData<&'a mut [u8]>,
}

impl<'a> RecordView<'a> {
    /// View a typed record. Nothing is copied and the tag is left as-is.
    #[inline]
    pub fn new<T: Extensible>(record: &'a mut T) -> Self {
        Self {
            data: NonNull::from(record).cast(),
            size: size_of::<T>(),
            tag_offset: T::TAG_OFFSET,
            link_offset: T::LINK_OFFSET,
            _marker: PhantomData,
        }
    }

    /// View a typed record after stamping `T::TAG` into its tag field.
    pub fn stamped<T: Extensible>(record: &'a mut T) -> Self {
        let mut view = Self::new(record);
        view.stamp_tag(T::TAG);
        view
    }

    /// View a mutable byte slice laid out as a record.
    ///
    /// Panics if either field does not fit in `bytes`.
    pub fn from_bytes(bytes: &'a mut [u8], tag_offset: usize, link_offset: usize) -> Self {
        let size = bytes.len();
        let data = NonNull::from(bytes).cast::<u8>();
        // SAFETY: the slice is valid and exclusively borrowed for 'a.
        unsafe { Self::from_raw_parts(data, size, tag_offset, link_offset) }
    }

    /// Late-bound view over caller-described memory.
    ///
    /// Panics if either field does not fit in `size`.
    ///
    /// # Safety
    /// `data` must be valid for reads and writes of `size` bytes for `'a`, and
    /// nothing else may access those bytes while the view is in use.
    pub unsafe fn from_raw_parts(
        data: NonNull<u8>,
        size: usize,
        tag_offset: usize,
        link_offset: usize,
    ) -> Self {
        if let Err(e) = check_field(tag_offset, TAG_SIZE, size)
            .and_then(|_| check_field(link_offset, LINK_SIZE, size))
        {
            panic!("RecordView::from_raw_parts: {e}");
        }
        Self {
            data,
            size,
            tag_offset,
            link_offset,
            _marker: PhantomData,
        }
    }

    /// A second view aliasing the same bytes, usable while `self` is borrowed.
    #[inline]
    pub fn reborrow(&mut self) -> RecordView<'_> {
        RecordView {
            data: self.data,
            size: self.size,
            tag_offset: self.tag_offset,
            link_offset: self.link_offset,
            _marker: PhantomData,
        }
    }

    /// Give the record back as `&'a mut T`. Panics on a size mismatch.
    pub fn into_mut<T: Extensible>(mut self) -> &'a mut T {
        let ptr: *mut T = self.get_as_mut::<T>();
        // SAFETY: the view was the exclusive handle on these bytes for 'a.
        unsafe { &mut *ptr }
    }

    #[inline]
    pub(crate) fn raw(&self) -> NonNull<u8> {
        self.data
    }
}

impl RecordReadable for RecordView<'_> {
    #[inline]
    fn data_ptr(&self) -> *const u8 {
        self.data.as_ptr()
    }

    #[inline]
    fn size(&self) -> usize {
        self.size
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

impl RecordWritable for RecordView<'_> {
    #[inline]
    fn data_mut_ptr(&mut self) -> *mut u8 {
        self.data.as_ptr()
    }
}

impl fmt::Debug for RecordView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordView")
            .field("data", &self.data)
            .field("size", &self.size)
            .field("tag", &self.try_tag().ok())
            .field("link", &self.try_link().ok())
            .finish()
    }
}
