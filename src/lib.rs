// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A preemptive real-time kernel core for a 32-bit ARM Cortex-M4F
//! target: the exception-driven context switcher, the supervisor-call
//! dispatcher, and the SysTick scheduler hook, plus the minimal
//! thread-control-block contract they depend on.
//!
//! This crate runs entirely in handler mode. It never creates,
//! schedules, or destroys threads — it only reads and writes the
//! fixed-offset fields described in [`tcb`] and [`sched`] on behalf of
//! a policy collaborator that owns those decisions. The three
//! exception handlers it exports (`svc_handler`, `pend_sv_handler`,
//! `systick_handler`) are the only symbols meant to be wired into a
//! vector table; everything else is plumbing for them.
#![no_std]
#![feature(naked_functions)]

pub mod error;
pub mod fpu;
pub mod layout;
pub mod marker;
pub mod pendsv;
pub mod sched;
pub mod support;
pub mod svc;
pub mod switch;
pub mod systick;
pub mod tcb;

pub use pendsv::pend_sv_handler;
pub use svc::svc_handler;
pub use systick::systick_handler;
