//! Power-off through PSCI
//!
//! QEMU virt implements PSCI over the HVC conduit. `SYSTEM_OFF` does not
//! return when it succeeds; if firmware ignores it the CPU parks in WFI.

use super::Power;

/// PSCI 0.2 SYSTEM_OFF function id.
const PSCI_SYSTEM_OFF: u64 = 0x8400_0008;

/// PSCI-backed power switch.
pub struct Psci;

impl Power for Psci {
    fn power_off(&self) -> ! {
        crate::kprintln!("[POWER] Powering off...");
        log::logger().flush();

        #[cfg(target_arch = "aarch64")]
        // SAFETY: HVC with a PSCI function id is the documented firmware
        // call on QEMU virt. SYSTEM_OFF does not touch kernel memory.
        unsafe {
            core::arch::asm!(
                "hvc #0",
                inout("x0") PSCI_SYSTEM_OFF => _,
                options(nostack)
            );
        }
        #[cfg(not(target_arch = "aarch64"))]
        let _ = PSCI_SYSTEM_OFF;

        halt();
    }
}

/// Park the CPU forever.
fn halt() -> ! {
    loop {
        #[cfg(target_arch = "aarch64")]
        // SAFETY: WFI is always safe to execute
        unsafe {
            core::arch::asm!("wfi", options(nostack, nomem));
        };
        #[cfg(not(target_arch = "aarch64"))]
        core::hint::spin_loop();
    }
}
