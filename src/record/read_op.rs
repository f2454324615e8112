use crate::error::ChainError;
use crate::types::*;
use std::ffi::c_void;

/// Read access shared by every type-erased record representation.
///
/// Implementors only describe where the bytes are and where the two chain
/// fields sit; everything else is derived from that.
pub trait RecordReadable {
    /// Start of the record bytes. May be dangling when `size() == 0`.
    fn data_ptr(&self) -> *const u8;
    fn size(&self) -> usize;
    fn tag_offset(&self) -> usize;
    fn link_offset(&self) -> usize;

    #[inline]
    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Start of the record bytes. Panics on an empty record.
    #[inline]
    fn data(&self) -> *const u8 {
        assert!(!self.is_empty(), "record is empty");
        self.data_ptr()
    }

    /// The raw record bytes (zero-copy).
    #[inline]
    fn as_bytes(&self) -> &[u8] {
        if self.is_empty() {
            return &[];
        }
        // SAFETY: implementors guarantee `size()` readable bytes at `data_ptr()`.
        unsafe { std::slice::from_raw_parts(self.data_ptr(), self.size()) }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Chain fields
    // ════════════════════════════════════════════════════════════════════════

    fn try_tag(&self) -> Result<StructureType, ChainError> {
        check_field(self.tag_offset(), TAG_SIZE, self.size())?;
        // SAFETY: the tag field lies inside the record, checked above.
        Ok(unsafe { read_tag(self.data_ptr(), self.tag_offset()) })
    }

    /// Current value of the tag field. Panics when the field is out of range.
    #[inline]
    fn tag(&self) -> StructureType {
        match self.try_tag() {
            Ok(tag) => tag,
            Err(e) => panic!("{e}"),
        }
    }

    fn try_link(&self) -> Result<*mut c_void, ChainError> {
        check_field(self.link_offset(), LINK_SIZE, self.size())?;
        // SAFETY: the link field lies inside the record, checked above.
        Ok(unsafe { read_link(self.data_ptr(), self.link_offset()) })
    }

    /// Current value of the link field. Panics when the field is out of range.
    #[inline]
    fn link(&self) -> *mut c_void {
        match self.try_link() {
            Ok(link) => link,
            Err(e) => panic!("{e}"),
        }
    }

    // ════════════════════════════════════════════════════════════════════════
    // Typed access
    // ════════════════════════════════════════════════════════════════════════

    /// Reinterpret the bytes as `T`, failing on a size or alignment mismatch.
    fn try_get_as<T: Extensible>(&self) -> Result<&T, ChainError> {
        if self.size() != size_of::<T>() {
            return Err(ChainError::SizeMismatch {
                expected: size_of::<T>(),
                actual: self.size(),
            });
        }
        let ptr = self.data_ptr().cast::<T>();
        if !ptr.is_aligned() {
            return Err(ChainError::Misaligned {
                addr: ptr as usize,
                align: align_of::<T>(),
            });
        }
        // SAFETY: size and alignment match and `T: Extensible` is plain data.
        Ok(unsafe { &*ptr })
    }

    /// Reinterpret the bytes as `T`. A size mismatch is a caller bug and panics.
    #[inline]
    fn get_as<T: Extensible>(&self) -> &T {
        match self.try_get_as::<T>() {
            Ok(record) => record,
            Err(e) => panic!("{e}"),
        }
    }

    /// Whether the record has `T`'s size and currently carries `T::TAG`.
    #[inline]
    fn is<T: Extensible>(&self) -> bool {
        self.size() == size_of::<T>() && self.try_tag().is_ok_and(|tag| tag == T::TAG)
    }
}
