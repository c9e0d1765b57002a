// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-side construction errors.
//!
//! The exception-time core never returns an error: an invalid user
//! SVC number is ignored silently, and a corrupt scheduler anchor is
//! out of contract. The handful of setup-time
//! constructors this crate exposes (wrapping a collaborator-supplied
//! raw pointer into a typed view) are the only place a `Result`
//! appears.

/// Why a setup-time constructor rejected a raw pointer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoreError {
    /// The pointer was null.
    Null,
    /// The pointer was not aligned to the field it must address.
    Misaligned,
}
