// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SysTick Trampoline.
//!
//! The periodic tick exception. Entry calls `os_tick_handler` to let
//! the policy advance time and possibly elect a new `next`, then
//! falls into the context-switch tail with R12 = PSP and R1 = the
//! entry `EXC_RETURN` — structurally identical to
//! [`crate::pendsv::pend_sv_handler`], down to the same redundant `R4`
//! push/pop around the hook call.

use crate::switch::context_switch_tail;

#[cfg(all(target_arch = "arm", target_os = "none"))]
extern "C" {
    fn os_tick_handler();
}

/// The SysTick exception handler. Installed at vector table offset
/// `0x3C` (see [`crate::layout::vector_offset::SYSTICK`]).
///
/// # Safety
/// Must only be invoked by the processor as the `SysTick` exception
/// handler.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[naked]
pub unsafe extern "C" fn systick_handler() {
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
        hook = sym os_tick_handler,
        tail = sym context_switch_tail,
        options(noreturn),
    );
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub unsafe extern "C" fn systick_handler() {
    unimplemented!()
}
