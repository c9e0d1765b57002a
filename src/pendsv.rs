// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! PendSV Trampoline.
//!
//! PendSV is the policy collaborator's deferred-reschedule request
//! (`SCB.ICSR.PENDSVSET`), and must be configured at the lowest
//! exception priority so it tail-chains after every interrupt and
//! never preempts the policy collaborator's own critical sections.
//! Entry calls `os_pend_sv_handler` to let the policy update `next`,
//! then falls into the context-switch tail with R12 = PSP and R1 =
//! the entry `EXC_RETURN` (recovered from LR after the hook call,
//! which may have clobbered it).
//!
//! `R4` is pushed and popped around the call even though AAPCS already
//! treats it as callee-saved; this mirrors the ABI the collaborator
//! was built against rather than trimming a redundant instruction.

use crate::switch::context_switch_tail;

#[cfg(all(target_arch = "arm", target_os = "none"))]
extern "C" {
    fn os_pend_sv_handler();
}

/// The PendSV exception handler. Installed at vector table offset
/// `0x38` (see [`crate::layout::vector_offset::PENDSV`]).
///
/// # Safety
/// Must only be invoked by the processor as the `PendSV` exception
/// handler.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[naked]
pub unsafe extern "C" fn pend_sv_handler() {
    use core::arch::asm;
    asm!(
        "
        push {{r4, lr}}
        bl {hook}
        pop {{r4, lr}}
        mrs r12, psp
        mov r1, lr
        b {tail}
        ",
        hook = sym os_pend_sv_handler,
        tail = sym context_switch_tail,
        options(noreturn),
    );
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub unsafe extern "C" fn pend_sv_handler() {
    unimplemented!()
}
