use std::ptr;

/// Storage unit of [`AlignedBlob`]; gives the buffer base a 16-byte alignment.
#[derive(Clone, Copy)]
#[repr(C, align(16))]
struct Chunk([u8; BLOB_ALIGN]);

pub const BLOB_ALIGN: usize = 16;

/// Heap byte buffer whose base address is aligned to [`BLOB_ALIGN`].
///
/// A `Vec<u8>` only promises byte alignment, which is not enough to hand out
/// `&T` for records stored at offset 0.
#[derive(Clone, Default)]
pub struct AlignedBlob {
    chunks: Vec<Chunk>,
    len: usize,
}

impl AlignedBlob {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-filled blob of exactly `len` logical bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            chunks: vec![Chunk([0u8; BLOB_ALIGN]); len.div_ceil(BLOB_ALIGN)],
            len,
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut blob = Self::zeroed(bytes.len());
        blob.as_mut_slice().copy_from_slice(bytes);
        blob
    }

    /// Copy `len` bytes starting at `src` into a new blob.
    ///
    /// # Safety
    /// `src` must be valid for reads of `len` bytes.
    pub unsafe fn from_raw(src: *const u8, len: usize) -> Self {
        let mut blob = Self::zeroed(len);
        // SAFETY: blob owns `len` writable bytes; caller vouches for `src`.
        unsafe { ptr::copy_nonoverlapping(src, blob.as_mut_ptr(), len) };
        blob
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.chunks.as_ptr().cast()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.chunks.as_mut_ptr().cast()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: chunks cover at least `len` initialized bytes; an empty Vec
        // still yields a non-null, aligned pointer.
        unsafe { std::slice::from_raw_parts(self.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: see `as_slice`.
        unsafe { std::slice::from_raw_parts_mut(self.as_mut_ptr(), self.len) }
    }

    /// Whether `addr` lies in `[base, base + len)`.
    #[inline]
    pub fn contains_addr(&self, addr: *const u8) -> bool {
        let base = self.as_ptr() as usize;
        let addr = addr as usize;
        addr >= base && addr < base + self.len
    }
}

impl std::fmt::Debug for AlignedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlignedBlob")
            .field("base", &self.as_ptr())
            .field("len", &self.len)
            .finish()
    }
}
