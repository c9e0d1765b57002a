// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SVC Entry & Dispatcher.
//!
//! Two service classes share one exception:
//!
//!   - `SVC #0` — a kernel service call. The naked entry captures just
//!     enough state (PSP, EXC_RETURN) to branch into
//!     [`svc_handler_inner`], which marshals R0..R3/R12 off the
//!     caller's stack, calls the service function, writes the result
//!     back, and falls into the context-switch tail.
//!   - `SVC #n`, `n > 0` — a user SVC table lookup. Out-of-range `n`
//!     is ignored silently; in range, `table[n]` is called and only
//!     R0 is written back. Neither case reschedules.
//!
//! Keeping the register marshaling in ordinary (if `unsafe`) Rust
//! rather than hand-written assembly is deliberate: it is the part of
//! the handler most likely to need a bugfix, and it is the part a
//! type system can actually help with.

use crate::error::CoreError;

/// Both return values of a class-A kernel service call. AAPCS returns
/// a two-word struct like this in R0:R1, so the caller's frame is
/// written back with a plain field access rather than a hand-packed
/// 64-bit value.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceReturn {
    pub r0: u32,
    pub r1: u32,
}

/// Signature of the function a `SVC #0` call invokes. R12 on the
/// caller's saved frame is the function pointer; R0..R3 are its
/// arguments.
pub type KernelService = unsafe extern "C" fn(u32, u32, u32, u32) -> ServiceReturn;

/// Signature of an entry in the user SVC table. Only R0 of the result
/// is observed by the caller.
pub type UserSvcFn = unsafe extern "C" fn(u32, u32, u32, u32) -> u32;

/// A borrowed view over the collaborator's user SVC table: index 0 is
/// the count of valid entries `N`, indices `1..=N` are function
/// addresses.
#[derive(Clone, Copy)]
pub struct UserSvcTable {
    base: *const usize,
}

impl UserSvcTable {
    /// Wrap a raw table pointer.
    ///
    /// # Errors
    /// Rejects a null or unaligned pointer; does not (and cannot)
    /// validate that `base[0]` entries actually exist in memory —
    /// that remains the collaborator's contract.
    pub fn new(base: *const usize) -> Result<UserSvcTable, CoreError> {
        if base.is_null() {
            return Err(CoreError::Null);
        }
        if (base as usize) % core::mem::align_of::<usize>() != 0 {
            return Err(CoreError::Misaligned);
        }
        Ok(UserSvcTable { base })
    }

    /// Look up `table[n]`, honoring the `n > N => ignored` invariant.
    ///
    /// # Safety
    /// `self.base` must address a live table of at least `base[0] +
    /// 1` words.
    #[inline]
    pub unsafe fn lookup(&self, n: u8) -> Option<UserSvcFn> {
        let count = core::ptr::read(self.base);
        lookup_in(count, |i| core::ptr::read(self.base.add(i)), n)
    }
}

/// The pure bounds-check + lookup logic, factored out so it can be
/// exercised without any unsafe memory access.
///
/// `count` is `table[0]`; `entry_at(i)` must return `table[i]` for `i
/// in 1..=count`.
fn lookup_in(count: usize, entry_at: impl Fn(usize) -> usize, n: u8) -> Option<UserSvcFn> {
    let n = n as usize;
    if n == 0 || n > count {
        return None;
    }
    let addr = entry_at(n);
    if addr == 0 {
        return None;
    }
    // SAFETY (of the transmute, not of calling it): a non-null
    // `usize` read from a collaborator-maintained table is assumed to
    // be a valid function address; actually calling it is the
    // caller's responsibility.
    Some(unsafe { core::mem::transmute::<usize, UserSvcFn>(addr) })
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
extern "C" {
    /// The user SVC table: `os_rtx_user_svc[0]` is the entry count,
    /// `os_rtx_user_svc[1..=N]` are function addresses.
    static os_rtx_user_svc: usize;
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
unsafe fn user_svc_table() -> UserSvcTable {
    UserSvcTable {
        base: core::ptr::addr_of!(os_rtx_user_svc),
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline(always)]
unsafe fn user_svc_table() -> UserSvcTable {
    unimplemented!()
}

/// Read the basic hardware frame's R0..R3. The basic frame pushes
/// R0-R3, R12, LR, PC, xPSR in that order.
#[inline(always)]
unsafe fn frame_args(psp: *mut u32) -> (u32, u32, u32, u32) {
    (
        core::ptr::read(psp),
        core::ptr::read(psp.add(1)),
        core::ptr::read(psp.add(2)),
        core::ptr::read(psp.add(3)),
    )
}

/// Decode the immediate of the `SVC` instruction that trapped here:
/// the saved PC (word 6 of the basic frame) points just past the
/// 16-bit `SVC #imm8` instruction, whose low byte in memory is the
/// immediate.
#[inline(always)]
unsafe fn trapping_svc_number(psp: *mut u32) -> u8 {
    let pc = core::ptr::read(psp.add(6)) as *const u8;
    core::ptr::read(pc.sub(2))
}

/// Finish a class-B (`SVC #n`, `n > 0`) call: look up and invoke
/// `table[n]` if in range, write R0 back if so, and leave everything
/// else — including whether to reschedule — alone.
unsafe fn handle_user_svc(psp: *mut u32, n: u8) {
    let table = user_svc_table();
    if let Some(f) = table.lookup(n) {
        let (a0, a1, a2, a3) = frame_args(psp);
        let r0 = f(a0, a1, a2, a3);
        core::ptr::write(psp, r0);
    }
}

/// Finish a class-A (`SVC #0`) call: marshal the service function and
/// its arguments off the caller's frame, invoke it, and write both
/// result words back.
unsafe fn handle_kernel_svc(psp: *mut u32) {
    let (a0, a1, a2, a3) = frame_args(psp);
    let func_ptr = core::ptr::read(psp.add(4)); // R12
    let func: KernelService = core::mem::transmute::<usize, KernelService>(func_ptr as usize);
    let ret = func(a0, a1, a2, a3);
    core::ptr::write(psp, ret.r0);
    core::ptr::write(psp.add(1), ret.r1);
}

/// Non-naked continuation of `svc_handler`. Takes the caller's PSP and
/// `EXC_RETURN` (captured by the naked entry before either could be
/// clobbered), does the Rust-level dispatch, and never returns:
/// class A falls through into the context-switch tail, class B
/// returns directly to the caller.
#[cfg(all(target_arch = "arm", target_os = "none"))]
unsafe extern "C" fn svc_handler_inner(psp: *mut u32, exc_return: u32) -> ! {
    use core::arch::asm;

    let n = trapping_svc_number(psp);
    if n == 0 {
        handle_kernel_svc(psp);
        // `handle_kernel_svc`'s call already clobbered LR, so the
        // entry `EXC_RETURN` captured above must be threaded into the
        // tail explicitly rather than re-read from LR there.
        asm!(
            "mov r12, {psp}",
            "mov r1, {exc}",
            "b {tail}",
            psp = in(reg) psp,
            exc = in(reg) exc_return,
            tail = sym crate::switch::context_switch_tail,
            options(noreturn),
        );
    } else {
        handle_user_svc(psp, n);
        asm!(
            "bx {exc}",
            exc = in(reg) exc_return,
            options(noreturn),
        );
    }
}

/// The SVC exception handler. Installed at vector table offset
/// `0x2C` (see [`crate::layout::vector_offset::SVCALL`]).
///
/// # Safety
/// Must only be invoked by the processor as the `SVCall` exception
/// handler.
#[cfg(all(target_arch = "arm", target_os = "none"))]
#[naked]
pub unsafe extern "C" fn svc_handler() {
    use core::arch::asm;
    asm!(
        "
        mrs r0, psp
        mov r1, lr
        b {inner}
        ",
        inner = sym svc_handler_inner,
        options(noreturn),
    );
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub unsafe extern "C" fn svc_handler() {
    unimplemented!()
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn stub(_: u32, _: u32, _: u32, _: u32) -> u32 {
        0
    }

    #[test]
    fn rejects_svc_number_zero() {
        // SVC #0 is the kernel-service path, not a user-table lookup.
        assert!(lookup_in(3, |_| stub as usize, 0).is_none());
    }

    #[test]
    fn rejects_svc_number_above_count() {
        assert!(lookup_in(3, |_| stub as usize, 4).is_none());
        assert!(lookup_in(0, |_| stub as usize, 1).is_none());
    }

    #[test]
    fn accepts_svc_number_in_range() {
        assert!(lookup_in(3, |_| stub as usize, 1).is_some());
        assert!(lookup_in(3, |_| stub as usize, 3).is_some());
    }

    #[test]
    fn rejects_null_table_entry() {
        assert!(lookup_in(3, |_| 0, 2).is_none());
    }

    #[test]
    fn table_construction_rejects_null_and_unaligned() {
        assert_eq!(
            UserSvcTable::new(core::ptr::null()),
            Err(CoreError::Null)
        );
        assert_eq!(
            UserSvcTable::new(0x2000_0001 as *const usize),
            Err(CoreError::Misaligned)
        );
        assert!(UserSvcTable::new(0x2000_0004 as *const usize).is_ok());
    }
}
