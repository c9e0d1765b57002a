// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scheduler State Anchor.
//!
//! A process-wide record owned by the policy collaborator
//! (`os_rtx_info`) carries two adjacent thread-handle
//! fields at a fixed offset: `current`, the thread whose context is
//! live on PSP, and `next`, the thread the policy has elected to run.
//! This crate's only write to this pair is `publish_current`, which
//! copies `next` into `current` — every other update to either field
//! originates in the policy collaborator.

use crate::layout::SCHED_RUN_OFS;
use crate::tcb::ThreadHandle;

/// A single, consistent snapshot of `(current, next)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RunningPair {
    /// The thread whose context is live on PSP, or `None` if the
    /// previously running thread has been deleted.
    pub current: Option<ThreadHandle>,
    /// The thread the policy has elected to run next.
    pub next: Option<ThreadHandle>,
}

impl RunningPair {
    /// Is the switch tail a no-op for this snapshot? True exactly when
    /// `current == next` and both are live threads.
    #[inline]
    pub fn is_no_op(self) -> bool {
        match (self.current, self.next) {
            (Some(a), Some(b)) => a.addr() == b.addr(),
            _ => false,
        }
    }

    /// Has the outgoing thread been deleted (`current == None`)? Its
    /// save step is skipped.
    #[inline]
    pub fn outgoing_deleted(self) -> bool {
        self.current.is_none()
    }
}

/// Read `(current, next)` with one aligned multi-word volatile read,
/// so the pair observed is always a consistent snapshot.
///
/// # Safety
/// `anchor_base` must point at the live, collaborator-owned scheduler
/// record, and the `(current, next)` pair at `SCHED_RUN_OFS` must be
/// `usize`-aligned.
#[inline]
unsafe fn load_from(anchor_base: *mut u8) -> RunningPair {
    #[repr(C)]
    struct Raw {
        current: Option<ThreadHandle>,
        next: Option<ThreadHandle>,
    }
    let raw = core::ptr::read_volatile(anchor_base.add(SCHED_RUN_OFS) as *const Raw);
    RunningPair {
        current: raw.current,
        next: raw.next,
    }
}

/// Publish `current <- next`. The only mutation this crate ever
/// performs on the scheduler anchor.
///
/// # Safety
/// `anchor_base` must point at the live, collaborator-owned scheduler
/// record.
#[inline]
unsafe fn publish_current_at(anchor_base: *mut u8, next: Option<ThreadHandle>) {
    let slot = anchor_base.add(SCHED_RUN_OFS) as *mut Option<ThreadHandle>;
    core::ptr::write_volatile(slot, next);
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
extern "C" {
    /// The process-wide scheduler record. Only the `(current, next)`
    /// pair at `SCHED_RUN_OFS` belongs to this crate; every other byte
    /// is the policy collaborator's.
    static mut os_rtx_info: u8;
}

#[cfg(all(target_arch = "arm", target_os = "none"))]
#[inline(always)]
unsafe fn anchor_base() -> *mut u8 {
    core::ptr::addr_of_mut!(os_rtx_info)
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
#[inline(always)]
unsafe fn anchor_base() -> *mut u8 {
    unimplemented!()
}

/// Load the current scheduler snapshot from `os_rtx_info`.
///
/// # Safety
/// Must be called from handler mode at a priority no higher than
/// PendSV, with interrupts masked for the duration of the read.
#[inline]
pub unsafe fn load() -> RunningPair {
    load_from(anchor_base())
}

/// Publish `current <- next` into `os_rtx_info`.
///
/// # Safety
/// Same discipline as [`load`].
#[inline]
pub unsafe fn publish_current(next: Option<ThreadHandle>) {
    publish_current_at(anchor_base(), next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle_at(addr: usize) -> ThreadHandle {
        ThreadHandle::new(addr as *mut u8).unwrap()
    }

    #[repr(C, align(8))]
    struct AnchorStorage([u8; SCHED_RUN_OFS + 16]);

    #[test]
    fn no_op_when_current_equals_next() {
        let t = handle_at(0x2000_1000);
        let pair = RunningPair {
            current: Some(t),
            next: Some(t),
        };
        assert!(pair.is_no_op());
        assert!(!pair.outgoing_deleted());
    }

    #[test]
    fn not_no_op_when_threads_differ() {
        let pair = RunningPair {
            current: Some(handle_at(0x2000_1000)),
            next: Some(handle_at(0x2000_2000)),
        };
        assert!(!pair.is_no_op());
    }

    #[test]
    fn outgoing_deleted_when_current_is_none() {
        let pair = RunningPair {
            current: None,
            next: Some(handle_at(0x2000_2000)),
        };
        assert!(pair.outgoing_deleted());
        assert!(!pair.is_no_op());
    }

    #[test]
    fn load_and_publish_round_trip_through_memory() {
        let mut storage = AnchorStorage([0u8; SCHED_RUN_OFS + 16]);
        let base = storage.0.as_mut_ptr();
        let t1 = handle_at(0x2000_1000);
        let t2 = handle_at(0x2000_2000);
        unsafe {
            publish_current_at(base, Some(t1));
            // `next` lives immediately after `current`; write it
            // directly to simulate the policy collaborator's update.
            let next_slot =
                base.add(SCHED_RUN_OFS + core::mem::size_of::<Option<ThreadHandle>>())
                    as *mut Option<ThreadHandle>;
            core::ptr::write_volatile(next_slot, Some(t2));

            let pair = load_from(base);
            assert_eq!(pair.current, Some(t1));
            assert_eq!(pair.next, Some(t2));

            publish_current_at(base, pair.next);
            let pair = load_from(base);
            assert_eq!(pair.current, Some(t2));
        }
    }
}
