use core::arch::naked_asm;

// PendSV returns with a basic frame only; FPU threads would come back corrupted
#[cfg(target_abi = "eabihf")]
compile_error!("hard-float targets are not supported, build for a soft-float (eabi) target");

use cortex_m::peripheral::scb::SystemHandler;
use cortex_m::peripheral::SCB;

/// Lowest exception priority: a switch only runs after every other handler.
const PENDSV_PRIORITY: u8 = 0xff;

pub fn init() {
    // SAFETY: only touches the PendSV priority, before any thread runs.
    unsafe {
        let mut peripherals = cortex_m::Peripherals::steal();
        peripherals
            .SCB
            .set_priority(SystemHandler::PendSV, PENDSV_PRIORITY);
    }
}

/// Requests a context switch.
pub fn schedule() {
    SCB::set_pendsv();
    cortex_m::asm::isb();
}

/// PendSV handler, performs the switch armed by the scheduler.
///
/// On entry the hardware has stacked r0-r3, r12, lr, pc and xPSR of the
/// interrupted thread on the process stack. r4-r11 still hold the thread's
/// values; both calls below are AAPCS functions and preserve them.
///
/// Threads always run on PSP, so returning with `0xFFFF_FFFD` is right for
/// the very first switch out of `run()` as well. No FPU state is saved, see
/// the `eabihf` check at the top.
#[no_mangle]
#[unsafe(naked)]
unsafe extern "C" fn PendSV() {
    naked_asm!(
        "cpsid   i",
        // r0 = whether there's an outgoing thread
        "bl      {has_current}",
        "cbz     r0, 1f",
        "mrs     r0, psp",
        "stmdb   r0!, {{r4-r11}}",
        "1:",
        // r0 = incoming thread's stack pointer
        "bl      {switch_context}",
        "ldmia   r0!, {{r4-r11}}",
        "msr     psp, r0",
        "mvn     lr, #2",
        "cpsie   i",
        "bx      lr",
        has_current = sym crate::has_current,
        switch_context = sym crate::switch_context,
    );
}
