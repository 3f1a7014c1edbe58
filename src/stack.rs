//! Initial stack frame for threads that have never run.
//!
//! After [`setup_stack`] the stack looks as if the thread had been suspended
//! by PendSV right before its first instruction. The handler pops the
//! software block (`r4-r11`), the exception return pops the hardware frame and
//! starts executing at the entry point.
//!
//! ```text
//!  high  +--------+ <- top (8-byte aligned)
//!        |  xPSR  |
//!        |   PC   |  entry point
//!        |   LR   |
//!        |  R12   |
//!        | R3..R0 |
//!        | R11..R4|
//!        +--------+ <- saved sp
//!        |deadbeef|
//!        |  ...   |
//!  low   +--------+ <- first 8-byte aligned word
//! ```

use crate::fault::{fault, Violation};
use crate::thread::ThreadEntry;

const WORD: usize = core::mem::size_of::<u32>();

/// AAPCS stack alignment at exception entry.
pub const STACK_ALIGN: usize = 8;

/// Registers restored by the PendSV handler itself.
pub const SW_FRAME_WORDS: usize = 8;

/// Registers restored by the exception return.
pub const HW_FRAME_WORDS: usize = 8;

pub const FRAME_WORDS: usize = SW_FRAME_WORDS + HW_FRAME_WORDS;

/// Smallest stack region a thread can be started with.
pub const MIN_STACK_WORDS: usize = 32;

/// Fill pattern for the unused part of a fresh stack, for overflow forensics.
pub const STACK_SENTINEL: u32 = 0xDEAD_BEEF;

/// xPSR with only the Thumb bit set.
pub const INITIAL_XPSR: u32 = 1 << 24;

/// Placeholder in the LR slot. Threads never return, so it is never used.
pub const INITIAL_LR: u32 = 0x0000_000E;

/// Writes the initial frame into `stack` and returns the saved stack pointer.
pub(crate) fn setup_stack(stack: &mut [u32], entry: ThreadEntry) -> usize {
    if stack.len() < MIN_STACK_WORDS {
        fault(Violation::StackTooSmall { words: stack.len() });
    }

    let base = stack.as_ptr() as usize;
    let top = align_down(base + stack.len() * WORD);
    let top_idx = (top - base) / WORD;
    let sp_idx = top_idx - FRAME_WORDS;

    let (sw, hw) = stack[sp_idx..top_idx].split_at_mut(SW_FRAME_WORDS);

    // r4..r11
    for (reg, slot) in (4u32..).zip(sw.iter_mut()) {
        *slot = reg;
    }

    // bit 0 of a thumb function address must not end up in the stacked PC
    let pc = (entry as usize as u32) & !1;
    hw.copy_from_slice(&[
        0x0000_0000, // r0
        0x0000_0001, // r1
        0x0000_0002, // r2
        0x0000_0003, // r3
        0x0000_000C, // r12
        INITIAL_LR,
        pc,
        INITIAL_XPSR,
    ]);

    let limit_idx = (align_up(base) - base) / WORD;
    if limit_idx < sp_idx {
        stack[limit_idx..sp_idx].fill(STACK_SENTINEL);
    }

    base + sp_idx * WORD
}

const fn align_down(addr: usize) -> usize {
    addr & !(STACK_ALIGN - 1)
}

const fn align_up(addr: usize) -> usize {
    align_down(addr + STACK_ALIGN - 1)
}
