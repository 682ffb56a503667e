//! User Virtual Address Type
//!
//! Type-safe wrapper for addresses handed to the kernel by user programs.
//!
//! # Security Properties
//! - A `UserAddr` is only a number; it cannot be dereferenced
//! - Range checks against the user/kernel split live here
//! - Page arithmetic never overflows silently

use core::fmt;

/// Page size (4 KiB)
pub const PAGE_SIZE: usize = 4096;
/// Page size mask
pub const PAGE_MASK: u32 = PAGE_SIZE as u32 - 1;
/// Bits to shift for page number
pub const PAGE_SHIFT: u32 = 12;

/// Base of the kernel half of every address space.
/// User addresses are strictly below this split.
pub const PHYS_BASE: u32 = 0xC000_0000;

/// Lowest valid user address. Everything in page 0 is treated as null.
pub const USER_BOTTOM: u32 = PAGE_SIZE as u32;

/// A user-space virtual address.
///
/// This is a raw value taken from a user register or stack word.
/// Nothing about it is trusted until the validator has checked it
/// against the owning process's address space.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(transparent)]
pub struct UserAddr(u32);

impl UserAddr {
    /// The null address.
    pub const NULL: Self = Self(0);

    /// Create a user address from a raw word.
    #[inline]
    pub const fn new(addr: u32) -> Self {
        Self(addr)
    }

    /// Get the raw address value.
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Check if this is the null pointer.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Check if the address lies in the user half, above page 0.
    #[inline]
    pub const fn is_user(self) -> bool {
        self.0 >= USER_BOTTOM && self.0 < PHYS_BASE
    }

    /// Align the address down to the start of its page.
    #[inline]
    pub const fn page_base(self) -> Self {
        Self(self.0 & !PAGE_MASK)
    }

    /// Offset within the page.
    #[inline]
    pub const fn page_offset(self) -> usize {
        (self.0 & PAGE_MASK) as usize
    }

    /// Virtual page number.
    #[inline]
    pub const fn page_number(self) -> u32 {
        self.0 >> PAGE_SHIFT
    }

    /// Bytes left from this address to the end of its page.
    #[inline]
    pub const fn bytes_to_page_end(self) -> usize {
        PAGE_SIZE - self.page_offset()
    }

    /// Add a byte offset, returning `None` on 32-bit overflow.
    #[inline]
    pub fn checked_add(self, offset: usize) -> Option<Self> {
        let offset = u32::try_from(offset).ok()?;
        self.0.checked_add(offset).map(Self)
    }
}

impl fmt::Debug for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserAddr({:#010x})", self.0)
    }
}

impl fmt::Display for UserAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u32> for UserAddr {
    fn from(addr: u32) -> Self {
        Self(addr)
    }
}
