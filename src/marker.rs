// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linker-retention marker.
//!
//! A static archive with no undefined-symbol references into it is
//! fair game for the linker to drop entirely. Startup code takes the
//! address of this symbol (even just to discard it) so the archive
//! that provides `svc_handler`, `pend_sv_handler`, and
//! `systick_handler` is always pulled in.
#[used]
#[no_mangle]
#[link_section = ".rodata.kernel_core_marker"]
pub static KERNEL_CORE_MARKER: u8 = 0;
