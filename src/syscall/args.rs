//! Argument Extraction
//!
//! A user program traps with its stack pointer aimed at the syscall
//! number; the arguments are the words directly above it:
//!
//! ```text
//!   sp + 12  │ arg 2 │
//!   sp +  8  │ arg 1 │
//!   sp +  4  │ arg 0 │
//!   sp       │  nr   │
//! ```
//!
//! Every word is validated before it is read. Extraction is all or
//! nothing: the dispatcher never sees a partial argument list.

use crate::mm::{AddressSpace, UserAddr};

use super::error::Fault;
use super::validate::validate_user_read;

/// A user machine word.
pub type Word = u32;

/// Size of a user machine word in bytes.
pub const WORD_SIZE: usize = core::mem::size_of::<Word>();

/// Largest arity of any system call.
pub const MAX_ARGS: usize = 3;

/// Read one little-endian word from user memory.
pub fn read_word(space: &dyn AddressSpace, addr: UserAddr) -> Result<Word, Fault> {
    let buf = validate_user_read(space, addr, WORD_SIZE)?;
    let mut raw = [0u8; WORD_SIZE];
    space.read(buf.addr(), &mut raw)?;
    Ok(Word::from_le_bytes(raw))
}

/// Read the `count` argument words above the syscall number at `sp`.
///
/// Unused trailing entries are zero.
pub fn extract(
    space: &dyn AddressSpace,
    sp: UserAddr,
    count: usize,
) -> Result<[Word; MAX_ARGS], Fault> {
    debug_assert!(count <= MAX_ARGS);

    let mut args = [0; MAX_ARGS];
    for (i, arg) in args.iter_mut().enumerate().take(count) {
        let addr = sp
            .checked_add((i + 1) * WORD_SIZE)
            .ok_or(Fault::BadAddress(sp))?;
        *arg = read_word(space, addr)?;
    }
    Ok(args)
}
