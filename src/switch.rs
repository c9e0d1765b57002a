// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Context Switch Primitive.
//!
//! `context_switch_tail` is the single piece of naked assembly every
//! other exception handler in this crate (`svc.rs`, `pendsv.rs`,
//! `systick.rs`) falls into. It is entered with R12 holding the
//! caller's PSP and R1 holding the entry `EXC_RETURN`, and never
//! returns to its caller — it always exits via `bx` into whichever
//! thread the policy collaborator elected to run.
//!
//! R1, not live LR, carries the entry `EXC_RETURN`: by the time the
//! `SVC #0` path reaches this tail, the kernel service call it just
//! made has already clobbered LR with its own return address, so each
//! caller threads the value it captured at its own entry through in
//! R1 rather than this tail re-reading a register that may no longer
//! hold it.
//!
//! Steps, in order:
//!
//!   1. Load `(current, next)` from the scheduler anchor.
//!   2. If `current == next`, nothing to do — return via the entry
//!      `EXC_RETURN`, unchanged. The running thread's stored TCB tag
//!      is stale by definition (it is only meaningful while the
//!      thread is not running), so the live value is the only correct
//!      one to resume with.
//!   3. If `current` is live, derive the outgoing frame form from the
//!      entry `EXC_RETURN` (not from `current`'s previously stored
//!      tag, which describes its *last* switch-out, not the frame the
//!      hardware just pushed for *this* exception), save its
//!      callee-saved registers (and, lazily, its FPU registers if
//!      that frame was extended) onto its own stack, then record the
//!      adjusted PSP and the entry `EXC_RETURN`'s low byte in its TCB.
//!      If `current` is absent (the thread was deleted) and its
//!      last-known frame was extended, clear FPCCR.LSPACT instead.
//!   4. Call `thread_switch_helper`, then reload `(current, next)` —
//!      the helper may have mutated `next`, and re-fetching is
//!      cheaper than proving it never will.
//!   5. Publish `current <- next`.
//!   6. Restore `next`'s callee-saved (and, if tagged extended, FPU)
//!      registers from its TCB-recorded PSP, rebuild `EXC_RETURN` from
//!      its stored frame tag, and return to it.
//!
//! The register save/restore and the PSP bookkeeping are hand-written
//! assembly because they run with no stack frame of their own to
//! spend; the snapshot comparison, anchor access, and frame-tag math
//! they lean on are the plain Rust in `sched.rs` and `tcb.rs`.

#[cfg(feature = "fpu")]
use crate::fpu;
use crate::sched;
use crate::tcb::{StackFrameTag, ThreadHandle};

#[cfg(all(target_arch = "arm", target_os = "none"))]
extern "C" {
    /// Advisory hook called once per switch, after the outgoing
    /// thread's state is saved and before `current <- next` is
    /// published. May clobber caller-saved registers; must not
    /// itself trigger an exception.
    fn thread_switch_helper();
}

/// Save `current`'s non-volatile state and record its resting PSP and
/// frame tag in its TCB. Skipped entirely when the thread was deleted.
///
/// The frame form is taken from `entry_lr`, the `EXC_RETURN` the
/// processor loaded for *this* exception, not from `current`'s
/// previously stored tag: that tag describes the frame at the
/// thread's *last* switch-out, and the thread may have executed an
/// FPU instruction since then, turning a basic entry into an extended
/// one the hardware has already lazy-reserved space for.
///
/// # Safety
/// `psp` must be the live process stack pointer of the thread that
/// was running when the exception that led here was taken, and
/// `current` must be that same thread's handle.
#[cfg(all(target_arch = "arm", target_os = "none", feature = "fpu"))]
#[inline(always)]
unsafe fn save_outgoing(current: ThreadHandle, psp: *mut u32, entry_lr: u32) {
    use core::arch::asm;

    let tag = StackFrameTag::from_exc_return(entry_lr);
    let extended = tag.is_extended();

    let mut sp = psp;
    if extended {
        asm!(
            "vstmdb {sp}!, {{s16-s31}}",
            sp = inout(reg) sp,
            options(nostack),
        );
    }
    asm!(
        "stmdb {sp}!, {{r4-r11}}",
        sp = inout(reg) sp,
        options(nostack),
    );
    current.set_sp(sp as u32);
    current.set_stack_frame(tag);
}

/// FPU-absent variant: the stack_frame byte always carries the basic-
/// frame bit, and no S-register save ever happens. `entry_lr` is
/// unused — an FPU-absent target can never take an extended-frame
/// exception.
#[cfg(all(target_arch = "arm", target_os = "none", not(feature = "fpu")))]
#[inline(always)]
unsafe fn save_outgoing(current: ThreadHandle, psp: *mut u32, _entry_lr: u32) {
    use core::arch::asm;

    let mut sp = psp;
    asm!(
        "stmdb {sp}!, {{r4-r11}}",
        sp = inout(reg) sp,
        options(nostack),
    );
    current.set_sp(sp as u32);
    current.set_stack_frame(StackFrameTag::from_exc_return(0xFFFF_FFFD));
}

/// Restore `next`'s non-volatile state from its TCB-recorded PSP and
/// return the new PSP and rebuilt `EXC_RETURN` to resume it with.
///
/// # Safety
/// `next` must address a live TCB whose `sp`/`stack_frame` fields were
/// last written by [`save_outgoing`] (or by thread-creation setup
/// using the same convention).
#[cfg(all(target_arch = "arm", target_os = "none", feature = "fpu"))]
#[inline(always)]
unsafe fn restore_incoming(next: ThreadHandle) -> (*mut u32, u32) {
    use core::arch::asm;

    let tag = next.stack_frame();
    let mut sp = next.sp() as *mut u32;
    asm!(
        "ldmia {sp}!, {{r4-r11}}",
        sp = inout(reg) sp,
        options(nostack),
    );
    if tag.is_extended() {
        asm!(
            "vldmia {sp}!, {{s16-s31}}",
            sp = inout(reg) sp,
            options(nostack),
        );
    }
    (sp, tag.to_exc_return())
}

#[cfg(all(target_arch = "arm", target_os = "none", not(feature = "fpu")))]
#[inline(always)]
unsafe fn restore_incoming(next: ThreadHandle) -> (*mut u32, u32) {
    use core::arch::asm;

    let tag = next.stack_frame();
    let mut sp = next.sp() as *mut u32;
    asm!(
        "ldmia {sp}!, {{r4-r11}}",
        sp = inout(reg) sp,
        options(nostack),
    );
    (sp, tag.to_exc_return())
}

/// Run the deleted-thread path: skip the save. `FPCCR.LSPACT` being
/// set is itself the record that the abandoned thread's frame was
/// extended (lazy stacking was pending for it); clear it so the
/// hardware doesn't push state into memory the thread no longer owns.
#[cfg(all(target_arch = "arm", target_os = "none", feature = "fpu"))]
#[inline(always)]
unsafe fn abandon_deleted() {
    if fpu::lspact_is_set() {
        fpu::clear_lspact();
    }
}

/// FPU-absent variant: no lazy-FPU state can ever be pending.
#[cfg(all(target_arch = "arm", target_os = "none", not(feature = "fpu")))]
#[inline(always)]
unsafe fn abandon_deleted() {}

/// Do the full switch for one scheduling opportunity, given the
/// outgoing thread's live PSP and the `EXC_RETURN` the exception was
/// entered with. Returns the PSP and `EXC_RETURN` to resume with.
///
/// # Safety
/// See [`save_outgoing`] and [`restore_incoming`].
#[cfg(all(target_arch = "arm", target_os = "none"))]
unsafe fn switch_context(outgoing_psp: *mut u32, entry_lr: u32) -> (*mut u32, u32) {
    let first = sched::load();

    if first.is_no_op() {
        // Nothing to switch; resume the thread that was already
        // running with the live frame it was actually entered with,
        // not a reconstruction from its (stale) stored tag.
        return (outgoing_psp, entry_lr);
    }

    match first.current {
        Some(current) => save_outgoing(current, outgoing_psp, entry_lr),
        None => abandon_deleted(),
    }

    thread_switch_helper();

    // The helper may have mutated `next`; re-fetch rather than trust
    // the pre-call snapshot.
    let settled = sched::load();
    sched::publish_current(settled.next);

    let next = settled
        .next
        .expect("policy collaborator always elects a next thread");
    restore_incoming(next)
}

/// Entered with R12 = outgoing PSP, R1 = entry `EXC_RETURN`. Both are
/// already in the right place to become `switch_context_trampoline`'s
/// two AAPCS arguments (R0, R1) with only `r0 <- r12` needed. Always
/// exits by returning from exception, never to its Rust caller.
///
/// # Safety
/// Must only be reached by a `b` from `svc_handler_inner`'s class-A
/// path (with R1 already set to the entry `EXC_RETURN`), or from the
/// naked entries in `pendsv.rs`/`systick.rs` (same contract).
#[cfg(all(target_arch = "arm", target_os = "none", feature = "sandbox"))]
#[naked]
pub unsafe extern "C" fn context_switch_tail() {
    use core::arch::asm;
    asm!(
        "
        cpsid i
        mov r0, r12
        bl {switch}
        msr psp, r0
        cpsie i
        bx r1
        ",
        switch = sym switch_context_trampoline,
        options(noreturn),
    );
}

/// As above, but without the interrupt mask: relies on PendSV running
/// at the lowest exception priority to keep the publish+restore
/// window from being preempted by kernel-aware code.
#[cfg(all(target_arch = "arm", target_os = "none", not(feature = "sandbox")))]
#[naked]
pub unsafe extern "C" fn context_switch_tail() {
    use core::arch::asm;
    asm!(
        "
        mov r0, r12
        bl {switch}
        msr psp, r0
        bx r1
        ",
        switch = sym switch_context_trampoline,
        options(noreturn),
    );
}

/// `extern \"C\"` trampoline so `switch_context`'s two-word return
/// (new PSP, `EXC_RETURN`) lands in R0:R1 per AAPCS, instead of being
/// hand-packed into a single register. `lr` is the entry `EXC_RETURN`
/// the naked tail received in R1; it arrives here as the second AAPCS
/// argument with no extra shuffling.
#[cfg(all(target_arch = "arm", target_os = "none"))]
unsafe extern "C" fn switch_context_trampoline(psp: *mut u32, lr: u32) -> SwitchResult {
    let (sp, exc_return) = switch_context(psp, lr);
    SwitchResult { sp, exc_return }
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[repr(C)]
struct SwitchResult {
    sp: *mut u32,
    exc_return: u32,
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub unsafe extern "C" fn context_switch_tail() {
    unimplemented!()
}
