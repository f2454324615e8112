use super::read_op::RecordReadable;
use crate::error::ChainError;
use crate::types::*;
use std::ffi::c_void;

/// Mutable access for records whose bytes the holder may write.
pub trait RecordWritable: RecordReadable {
    /// Start of the record bytes. May be dangling when `size() == 0`.
    fn data_mut_ptr(&mut self) -> *mut u8;

    fn try_get_as_mut<T: Extensible>(&mut self) -> Result<&mut T, ChainError> {
        // Shared check first, then re-derive the pointer from `&mut self`.
        self.try_get_as::<T>()?;
        // SAFETY: size and alignment validated above, access is exclusive.
        Ok(unsafe { &mut *self.data_mut_ptr().cast::<T>() })
    }

    #[inline]
    fn get_as_mut<T: Extensible>(&mut self) -> &mut T {
        match self.try_get_as_mut::<T>() {
            Ok(record) => record,
            Err(e) => panic!("{e}"),
        }
    }

    /// Overwrite the tag field.
    fn stamp_tag(&mut self, tag: StructureType) {
        if let Err(e) = check_field(self.tag_offset(), TAG_SIZE, self.size()) {
            panic!("{e}");
        }
        let offset = self.tag_offset();
        // SAFETY: field range checked above.
        unsafe { write_tag(self.data_mut_ptr(), offset, tag) };
    }

    /// Overwrite the link field.
    fn set_link(&mut self, link: *const c_void) {
        if let Err(e) = check_field(self.link_offset(), LINK_SIZE, self.size()) {
            panic!("{e}");
        }
        let offset = self.link_offset();
        // SAFETY: field range checked above.
        unsafe { write_link(self.data_mut_ptr(), offset, link) };
    }
}
