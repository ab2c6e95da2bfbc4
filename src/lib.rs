// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! # Thistle
//!
//! A tree-walked-to-bytecode interpreter for a small dynamically-typed,
//! class-based scripting language with closures, single inheritance, and
//! built-in dynamic lists.
//!
//! This crate provides:
//! - A hand-written scanner and single-pass Pratt compiler
//! - A stack-based bytecode virtual machine with call frames and upvalues
//! - A mark-and-sweep garbage collector over an arena-indexed heap
//! - A handful of native (host-provided) functions
//! - A line-editing REPL
//!
//! Unlike the realm-hosted, `no_std` VM this crate grew out of, Thistle is
//! a plain hosted binary: one process, one heap, stdin/stdout instead of a
//! UART.

pub mod chunk;
pub mod compiler;
pub mod gc;
pub mod natives;
pub mod repl;
pub mod scanner;
pub mod table;
pub mod value;
pub mod vm;

/// Crate version, embedded at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
