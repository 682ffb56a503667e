//! User Address Space Mapper
//!
//! The syscall layer never walks page tables itself. It sees a process's
//! memory only through the [`AddressSpace`] trait: "is this page mapped,
//! with which flags" plus copies in and out of ranges the validator has
//! already approved.
//!
//! [`UserPageTable`] is a software page table that implements the trait.
//! The program loader fills one in for every new process.
//!
//! # Security Properties
//! - Only user-half pages can be mapped
//! - Copies fail on unmapped pages instead of touching kernel memory
//! - Frames are zeroed when mapped

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use core::fmt;

use bitflags::bitflags;

use super::address::{UserAddr, PAGE_SIZE};

bitflags! {
    /// Permissions of a mapped user page.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct MapFlags: u8 {
        /// User code may store to the page (and so may the kernel on its behalf).
        const WRITABLE = 1 << 0;
        /// Page holds program text.
        const EXECUTABLE = 1 << 1;
    }
}

/// Error type for mapping operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingError {
    /// The address is outside the user half.
    NotUserAddress(UserAddr),
    /// The page is already mapped.
    AlreadyMapped(UserAddr),
    /// The page is not mapped.
    NotMapped(UserAddr),
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotUserAddress(addr) => write!(f, "{} is not a user address", addr),
            Self::AlreadyMapped(addr) => write!(f, "page at {} already mapped", addr),
            Self::NotMapped(addr) => write!(f, "page at {} not mapped", addr),
        }
    }
}

/// A process's user address space, as seen from the syscall layer.
pub trait AddressSpace: Send {
    /// Flags of the page containing `addr`, or `None` if it is unmapped.
    fn lookup(&self, addr: UserAddr) -> Option<MapFlags>;

    /// Copy `buf.len()` bytes starting at `addr` into `buf`.
    fn read(&self, addr: UserAddr, buf: &mut [u8]) -> Result<(), MappingError>;

    /// Copy `bytes` into user memory starting at `addr`.
    fn write(&mut self, addr: UserAddr, bytes: &[u8]) -> Result<(), MappingError>;
}

/// One mapped page and its backing frame.
struct UserPage {
    flags: MapFlags,
    frame: Box<[u8; PAGE_SIZE]>,
}

/// Software page table for a single user process.
#[derive(Default)]
pub struct UserPageTable {
    pages: BTreeMap<u32, UserPage>,
}

impl UserPageTable {
    /// Create an empty address space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a zeroed page at the page containing `addr`.
    pub fn map(&mut self, addr: UserAddr, flags: MapFlags) -> Result<(), MappingError> {
        if !addr.is_user() {
            return Err(MappingError::NotUserAddress(addr));
        }
        let vpn = addr.page_number();
        if self.pages.contains_key(&vpn) {
            return Err(MappingError::AlreadyMapped(addr.page_base()));
        }
        self.pages.insert(
            vpn,
            UserPage {
                flags,
                frame: Box::new([0; PAGE_SIZE]),
            },
        );
        Ok(())
    }

    /// Unmap the page containing `addr`.
    pub fn unmap(&mut self, addr: UserAddr) -> Result<(), MappingError> {
        self.pages
            .remove(&addr.page_number())
            .map(|_| ())
            .ok_or(MappingError::NotMapped(addr.page_base()))
    }

    /// Number of mapped pages.
    pub fn mapped_pages(&self) -> usize {
        self.pages.len()
    }

    /// Walk `len` bytes from `addr` one page-sized chunk at a time.
    fn for_each_chunk<F>(&self, addr: UserAddr, len: usize, mut f: F) -> Result<(), MappingError>
    where
        F: FnMut(&UserPage, usize, core::ops::Range<usize>),
    {
        let mut done = 0;
        while done < len {
            let cur = addr
                .checked_add(done)
                .ok_or(MappingError::NotUserAddress(addr))?;
            let page = self
                .pages
                .get(&cur.page_number())
                .ok_or(MappingError::NotMapped(cur.page_base()))?;
            let chunk = cur.bytes_to_page_end().min(len - done);
            let start = cur.page_offset();
            f(page, done, start..start + chunk);
            done += chunk;
        }
        Ok(())
    }
}

impl AddressSpace for UserPageTable {
    fn lookup(&self, addr: UserAddr) -> Option<MapFlags> {
        self.pages.get(&addr.page_number()).map(|page| page.flags)
    }

    fn read(&self, addr: UserAddr, buf: &mut [u8]) -> Result<(), MappingError> {
        let len = buf.len();
        self.for_each_chunk(addr, len, |page, done, range| {
            let n = range.len();
            buf[done..done + n].copy_from_slice(&page.frame[range]);
        })
    }

    fn write(&mut self, addr: UserAddr, bytes: &[u8]) -> Result<(), MappingError> {
        // Check the whole range first so a failed copy leaves memory untouched.
        self.for_each_chunk(addr, bytes.len(), |_, _, _| {})?;

        let mut done = 0;
        while done < bytes.len() {
            let cur = addr
                .checked_add(done)
                .ok_or(MappingError::NotUserAddress(addr))?;
            let page = self
                .pages
                .get_mut(&cur.page_number())
                .ok_or(MappingError::NotMapped(cur.page_base()))?;
            let chunk = cur.bytes_to_page_end().min(bytes.len() - done);
            let start = cur.page_offset();
            page.frame[start..start + chunk].copy_from_slice(&bytes[done..done + chunk]);
            done += chunk;
        }
        Ok(())
    }
}

impl fmt::Debug for UserPageTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserPageTable")
            .field("mapped_pages", &self.pages.len())
            .finish()
    }
}
