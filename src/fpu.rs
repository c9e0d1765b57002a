// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Floating-Point Context Control Register access.
//!
//! The switch tail clears FPCCR.LSPACT when it abandons a deleted
//! thread that owned an extended (FPU) frame, so the hardware does
//! not later push lazy FPU state into memory the collaborator has
//! already freed.

use tock_registers::interfaces::{Readable, Writeable};
use tock_registers::registers::ReadWrite;
use tock_registers::{register_bitfields, register_structs};

register_structs! {
    pub FpuRegisters {
        (0x00 => _reserved0),

        /// Floating-point Context Control Register.
        (0x04 => fpccr: ReadWrite<u32, FPCCR::Register>),

        /// Floating-point Context Address Register.
        (0x08 => fpcar: ReadWrite<u32, FPCAR::Register>),

        /// Floating-point Default Status Control Register.
        (0x0C => fpscr: ReadWrite<u32, FPSCR::Register>),

        (0x10 => @END),
    }
}

register_bitfields![u32,
    pub FPCCR [
        ASPEN   OFFSET(31)  NUMBITS(1),
        LSPEN   OFFSET(30)  NUMBITS(1),
        MONRDY  OFFSET(8)   NUMBITS(1),
        BFRDY   OFFSET(6)   NUMBITS(1),
        MMRDY   OFFSET(5)   NUMBITS(1),
        HFRDY   OFFSET(4)   NUMBITS(1),
        THREAD  OFFSET(3)   NUMBITS(1),
        USER    OFFSET(1)   NUMBITS(1),
        LSPACT  OFFSET(0)   NUMBITS(1),
    ],

    pub FPCAR [
        ADDRESS OFFSET(3)   NUMBITS(29),
    ],

    pub FPSCR [
        AHP     OFFSET(26)  NUMBITS(1),
        DN      OFFSET(25)  NUMBITS(1),
        FZ      OFFSET(24)  NUMBITS(1),
        RMODE   OFFSET(22)  NUMBITS(2),
    ],
];

const FPU_BASE: *const FpuRegisters = crate::layout::FPCCR_ADDR as *const FpuRegisters;

#[inline(always)]
fn fpu() -> &'static FpuRegisters {
    // SAFETY: `FPU_BASE` is the architecturally fixed FPCCR block
    // address on every Cortex-M4F; the reference is never stored past
    // this call.
    unsafe { &*FPU_BASE }
}

/// Clear FPCCR.LSPACT.
///
/// # Safety
/// Must only be called on the deleted-thread path of the switch tail,
/// after confirming the abandoned frame was extended — at that point
/// no thread owns the lazy state being discarded.
#[inline]
pub unsafe fn clear_lspact() {
    fpu().fpccr.modify(FPCCR::LSPACT::CLEAR);
}

/// Read FPCCR.LSPACT. Exposed for diagnostics and for tests of the
/// deleted-thread path's postcondition.
#[inline]
pub fn lspact_is_set() -> bool {
    fpu().fpccr.is_set(FPCCR::LSPACT)
}
