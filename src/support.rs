// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Small processor helpers shared by the trampolines.

/// Run `f` with interrupts masked (PRIMASK = 1), when the `sandbox`
/// feature requires it of code outside the naked switch tail. The
/// tail itself masks inline (see `switch.rs`); this is for
/// collaborator-facing helpers that need the same discipline without
/// dropping into assembly.
#[cfg(feature = "sandbox")]
#[inline]
pub fn atomic<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    critical_section::with(|_| f())
}

#[cfg(all(
    not(feature = "sandbox"),
    target_arch = "arm",
    target_os = "none"
))]
#[inline]
pub unsafe fn atomic<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    use core::arch::asm;
    asm!("cpsid i", options(nomem, nostack));
    let res = f();
    asm!("cpsie i", options(nomem, nostack));
    res
}

#[cfg(all(
    not(feature = "sandbox"),
    not(all(target_arch = "arm", target_os = "none"))
))]
#[inline]
pub unsafe fn atomic<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    f()
}

/// NOP instruction.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
pub fn nop() {
    use core::arch::asm;
    unsafe {
        asm!("nop", options(nomem, nostack, preserves_flags));
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline(always)]
pub fn nop() {
    // No-op off target; nothing to synchronize with.
}
