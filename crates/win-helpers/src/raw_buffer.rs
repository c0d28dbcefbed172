use core::ptr::NonNull;
use std::alloc::{Layout, LayoutError, alloc_zeroed, dealloc};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("invalid buffer layout")]
    Layout(#[from] LayoutError),
    #[error("zero-sized buffer")]
    ZeroSize,
    #[error("memory allocation failed")]
    OutOfMemory,
}

/// Zero-initialized heap buffer with a size only known at runtime.
///
/// Used for variable-size structures such as `SP_DEVICE_INTERFACE_DETAIL_DATA_W`, where the OS
/// reports the required size and the buffer must still be aligned for the fixed-size header.
pub struct RawBuffer {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl RawBuffer {
    /// Allocates `size` zeroed bytes aligned like `T`.
    ///
    /// `size` may be smaller than `size_of::<T>()`, in which case the buffer cannot be read as a `T`.
    pub fn alloc_zeroed_for<T>(size: usize) -> Result<Self, AllocError> {
        Self::alloc_zeroed(size, align_of::<T>())
    }

    pub fn alloc_zeroed(size: usize, align: usize) -> Result<Self, AllocError> {
        if size == 0 {
            return Err(AllocError::ZeroSize);
        }

        let layout = Layout::from_size_align(size, align)?;

        // SAFETY: The layout has a non-zero size.
        let ptr = unsafe { alloc_zeroed(layout) };

        let ptr = NonNull::new(ptr).ok_or(AllocError::OutOfMemory)?;

        Ok(Self { ptr, layout })
    }

    pub fn len(&self) -> usize {
        self.layout.size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr().cast_const()
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Returns a pointer to the start of the buffer, typed as `T`.
    ///
    /// The pointer is always aligned for `T` when the buffer was created with [`RawBuffer::alloc_zeroed_for`].
    pub fn as_mut_ptr_cast<T>(&mut self) -> *mut T {
        self.as_mut_ptr().cast()
    }

    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: The allocation holds `len` initialized (zeroed at least) bytes and lives as long as `self`.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len()) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        // SAFETY: Same as `as_slice`, and `&mut self` guarantees exclusive access.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len()) }
    }
}

impl Drop for RawBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr` was allocated by the global allocator with `layout`.
        unsafe { dealloc(self.ptr.as_ptr(), self.layout) };
    }
}

impl core::fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawBuffer").field("layout", &self.layout).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    struct Header {
        size: u32,
        first: u16,
    }

    #[test]
    fn buffer_is_zeroed_and_aligned() {
        let mut buffer = RawBuffer::alloc_zeroed_for::<Header>(64).expect("allocation");

        assert_eq!(buffer.len(), 64);
        assert!(buffer.as_slice().iter().all(|&b| b == 0));
        assert!(buffer.as_mut_ptr_cast::<Header>().is_aligned());
    }

    #[test]
    fn writes_through_typed_pointer() {
        let mut buffer = RawBuffer::alloc_zeroed_for::<Header>(16).expect("allocation");

        let header = buffer.as_mut_ptr_cast::<Header>();

        // SAFETY: The buffer is 16 bytes long and aligned for `Header`.
        unsafe { (*header).size = 0x0102_0304 };
        // SAFETY: Same as above.
        unsafe { (*header).first = 0x0506 };

        assert_eq!(&buffer.as_slice()[..4], 0x0102_0304u32.to_ne_bytes());
        assert_eq!(&buffer.as_slice()[4..6], 0x0506u16.to_ne_bytes());

        buffer.as_mut_slice()[8] = 0xFF;
        assert_eq!(buffer.as_slice()[8], 0xFF);
    }

    #[test]
    fn rejects_invalid_layouts() {
        assert!(matches!(RawBuffer::alloc_zeroed(0, 8), Err(AllocError::ZeroSize)));
        assert!(matches!(RawBuffer::alloc_zeroed(16, 3), Err(AllocError::Layout(_))));
    }
}
