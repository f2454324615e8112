use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::ffi::c_void;

// ─── Structure Type ─────────────────────────────────────────────────────────

/// Tag value identifying the concrete type of an extensible record.
///
/// Layout-compatible with a C enum, so it can be read straight out of the
/// record bytes.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructureType(pub i32);

impl StructureType {
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn as_raw(self) -> i32 {
        self.0
    }
}

// ─── Record Layout ──────────────────────────────────────────────────────────
//
//  ┌──────────────────────────────────────────────┐
//  │ any fields                                   │
//  ├──────────────────────────────────────────────┤
//  │ tag:  StructureType (4 bytes)  @ tag_offset  │
//  ├──────────────────────────────────────────────┤
//  │ any fields                                   │
//  ├──────────────────────────────────────────────┤
//  │ link: *const c_void            @ link_offset │
//  ├──────────────────────────────────────────────┤
//  │ any fields                                   │
//  └──────────────────────────────────────────────┘
//
// Both fields are accessed unaligned, so type-erased records may sit at any
// offset inside a byte buffer.

pub const TAG_SIZE: usize = size_of::<StructureType>();
pub const LINK_SIZE: usize = size_of::<*const c_void>();

/// A record type that can take part in a structure chain.
///
/// Usually implemented through the [`extensible!`](crate::extensible) macro,
/// which fills the offsets in with `offset_of!`.
///
/// # Safety
///
/// `TAG_OFFSET` must be the offset of a [`StructureType`] field and
/// `LINK_OFFSET` the offset of a pointer-sized link field, both lying inside
/// `size_of::<Self>()`. `Self` must be plain data: records are read back by
/// reinterpreting raw bytes, so any bit pattern has to be a valid `Self`.
pub unsafe trait Extensible: Sized {
    const TAG: StructureType;
    const TAG_OFFSET: usize;
    const LINK_OFFSET: usize;
}

/// Validate that `offset..offset + width` lies inside a record of `size` bytes.
#[inline]
pub(crate) fn check_field(offset: usize, width: usize, size: usize) -> Result<(), ChainError> {
    match offset.checked_add(width) {
        Some(end) if end <= size => Ok(()),
        _ => Err(ChainError::FieldOutOfRange {
            offset,
            width,
            size,
        }),
    }
}

// ─── Raw field access ───────────────────────────────────────────────────────

/// # Safety
/// `record + tag_offset` must be valid for a 4-byte read.
#[inline]
pub(crate) unsafe fn read_tag(record: *const u8, tag_offset: usize) -> StructureType {
    unsafe { record.add(tag_offset).cast::<StructureType>().read_unaligned() }
}

/// # Safety
/// `record + tag_offset` must be valid for a 4-byte write.
#[inline]
pub(crate) unsafe fn write_tag(record: *mut u8, tag_offset: usize, tag: StructureType) {
    unsafe { record.add(tag_offset).cast::<StructureType>().write_unaligned(tag) }
}

/// # Safety
/// `record + link_offset` must be valid for a pointer-sized read.
#[inline]
pub(crate) unsafe fn read_link(record: *const u8, link_offset: usize) -> *mut c_void {
    unsafe { record.add(link_offset).cast::<*mut c_void>().read_unaligned() }
}

/// # Safety
/// `record + link_offset` must be valid for a pointer-sized write.
#[inline]
pub(crate) unsafe fn write_link(record: *mut u8, link_offset: usize, link: *const c_void) {
    unsafe {
        record
            .add(link_offset)
            .cast::<*mut c_void>()
            .write_unaligned(link.cast_mut())
    }
}
