//! Memory management module for the user-program layer
//!
//! Provides:
//! - User virtual address type and the user/kernel split
//! - The address-space interface the syscall validator consults
//! - A software page table implementing it
//!
//! # Security Principles
//! - User addresses are plain numbers until validated
//! - Copies go through the address space, never raw pointers

pub mod address;
pub mod mapper;

pub use address::{UserAddr, PAGE_SIZE, PHYS_BASE, USER_BOTTOM};
pub use mapper::{AddressSpace, MapFlags, MappingError, UserPageTable};
