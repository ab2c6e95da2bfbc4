// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Runtime errors.
//!
//! One `thiserror`-derived variant per fault condition the VM can raise,
//! each carrying whatever structured context it needs for its message
//! rather than a pre-formatted string.

use std::fmt;

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeErrorKind {
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("Operands must be two numbers or two strings.")]
    InvalidAddOperands,
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: u8, got: u8 },
    #[error("'{name}' takes the wrong number of arguments.")]
    NativeArity { name: &'static str },
    #[error("Only instances have properties.")]
    PropertyOnNonInstance,
    #[error("Only instances have methods.")]
    InvokeOnNonInstance,
    #[error("Undefined property '{name}'.")]
    UndefinedProperty { name: String },
    #[error("Undefined variable '{name}'.")]
    UndefinedGlobal { name: String },
    #[error("Superclass must be a class.")]
    SuperclassNotClass,
    #[error("Can only index into lists.")]
    NotAList,
    #[error("Index must be a number.")]
    IndexMustBeNumber,
    #[error("List index out of range.")]
    IndexOutOfRange,
    #[error("Invalid opcode byte {0}.")]
    InvalidOpcode(u8),
}

/// One stack-trace line: `[line N] in <function name or "script">`.
#[derive(Debug, Clone)]
pub struct StackTraceFrame {
    pub name: String,
    pub line: u32,
}

/// A runtime error, carrying the frame trace captured at the moment it was
/// raised so the `[line N] in <fn>` stack trace can be printed without
/// re-deriving it from the VM after the fact.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Innermost frame first: walks the frame stack from innermost to
    /// outermost.
    pub trace: Vec<StackTraceFrame>,
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        for (i, frame) in self.trace.iter().enumerate() {
            if i + 1 == self.trace.len() {
                write!(f, "[line {}] in {}", frame.line, frame.name)?;
            } else {
                writeln!(f, "[line {}] in {}", frame.line, frame.name)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
