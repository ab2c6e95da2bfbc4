// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The GC root set.
//!
//! `Heap` knows how to mark-and-sweep its own arena but has no idea what a
//! "live" root looks like outside of it — that knowledge belongs to
//! whatever embeds the heap (the VM while running, the compiler while
//! compiling). `GcRoots` is the seam: the embedder pushes every directly
//! reachable handle onto `gray`, and `Heap::collect` takes it from there.

use super::Handle;

/// Implemented by whatever owns a [`super::Heap`] and needs to keep objects
/// alive across a collection.
///
/// The roots are: the value stack up to the stack top; every call frame's
/// closure; the open-upvalue list; the globals table; the `init` string
/// sentinel; the active compiler chain's in-progress functions. The VM
/// implementation covers all of these (see `vm::Vm::mark_roots`); the
/// `init` string lives on the heap itself and is marked unconditionally by
/// `Heap::collect`.
pub trait GcRoots {
    fn mark_roots(&self, gray: &mut Vec<Handle>);
}
