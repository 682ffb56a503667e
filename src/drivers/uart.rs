//! PL011 UART Driver for QEMU virt machine
//!
//! Serial console for kernel output and for user programs' descriptors 0
//! and 1.
//!
//! # Memory Map (QEMU virt)
//! - Base address: 0x0900_0000
//! - Register size: 0x1000 bytes
//!
//! # Security Considerations
//! - Unsafe code is limited to the two MMIO accessors
//! - Uses spinlock for thread-safe access; a whole buffer is written
//!   under one lock acquisition

use core::fmt::{self, Write};
use spin::Mutex;

use super::Console;

/// QEMU virt machine PL011 UART base address
const UART_BASE: usize = 0x0900_0000;

/// PL011 Register offsets
mod regs {
    /// Data Register - read/write data
    pub const DR: usize = 0x00;
    /// Flag Register - status flags
    pub const FR: usize = 0x18;
}

/// Flag Register bits
mod flags {
    /// Receive FIFO empty
    pub const RXFE: u32 = 1 << 4;
    /// Transmit FIFO full
    pub const TXFF: u32 = 1 << 5;
}

/// PL011 UART driver
pub struct Uart {
    base: usize,
    initialized: bool,
}

impl Uart {
    /// Create a new UART instance (not yet initialized)
    pub const fn new(base: usize) -> Self {
        Self {
            base,
            initialized: false,
        }
    }

    /// Initialize the UART
    ///
    /// # Safety
    /// - Must only be called once
    /// - UART base address must be valid and mapped
    pub unsafe fn init(&mut self) {
        // PL011 is already initialized by QEMU, just mark as ready
        self.initialized = true;
    }

    fn flags(&self) -> u32 {
        // SAFETY: Only reached after init(), which vouches for the base
        // address. FR is a read-only MMIO register.
        unsafe { core::ptr::read_volatile((self.base + regs::FR) as *const u32) }
    }

    /// Write a single byte to the UART
    fn write_byte(&self, byte: u8) {
        if !self.initialized {
            return;
        }

        while self.flags() & flags::TXFF != 0 {
            core::hint::spin_loop();
        }

        // SAFETY: Base address is validated during init(); DR is the
        // transmit register.
        unsafe {
            core::ptr::write_volatile((self.base + regs::DR) as *mut u32, byte as u32);
        }
    }

    /// Read a byte if one is waiting in the receive FIFO
    fn read_byte(&self) -> Option<u8> {
        if !self.initialized || self.flags() & flags::RXFE != 0 {
            return None;
        }
        // SAFETY: Base address is validated during init(); DR is the
        // receive register and the FIFO is non-empty.
        let data = unsafe { core::ptr::read_volatile((self.base + regs::DR) as *const u32) };
        Some((data & 0xff) as u8)
    }

    /// Write raw bytes to the UART
    pub fn write_bytes(&self, bytes: &[u8]) {
        for &byte in bytes {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }

    /// Write a string to the UART
    pub fn write_str(&self, s: &str) {
        self.write_bytes(s.as_bytes());
    }
}

impl Write for Uart {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        Uart::write_str(self, s);
        Ok(())
    }
}

/// Global UART instance protected by spinlock
pub static UART: Mutex<Uart> = Mutex::new(Uart::new(UART_BASE));

/// Console device on the global UART.
pub struct SerialConsole;

impl Console for SerialConsole {
    fn get_char(&self) -> u8 {
        loop {
            // Drop the lock between polls so output is not starved.
            if let Some(byte) = UART.lock().read_byte() {
                return if byte == b'\r' { b'\n' } else { byte };
            }
            crate::sync::yield_now();
        }
    }

    fn put_buffer(&self, bytes: &[u8]) {
        UART.lock().write_bytes(bytes);
    }
}

/// Print macro for kernel output
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {{
        use core::fmt::Write;
        let mut uart = $crate::drivers::uart::UART.lock();
        let _ = write!(uart, $($arg)*);
    }};
}

/// Println macro for kernel output
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {{
        $crate::kprint!($($arg)*);
        $crate::kprint!("\n");
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uninitialized_uart_is_silent() {
        // No MMIO happens before init(); the console must not fault on host.
        let uart = Uart::new(UART_BASE);
        uart.write_str("dropped\n");
        assert_eq!(uart.read_byte(), None);
    }
}
