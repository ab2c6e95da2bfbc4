// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! REPL (Read-Eval-Print Loop) for Thistle.
//!
//! Read-compile-execute-print, one line at a time, using `rustyline` for
//! history, ctrl-r, and line editing against a real terminal.

#[cfg(test)]
mod mod_test;

use crate::vm::{InterpretResult, Vm};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// Run the REPL loop against stdin/stdout until EOF (ctrl-D) or ctrl-C.
///
/// Each line is compiled and executed against the same [`Vm`], so top-level
/// `var`/`fun`/`class` declarations from earlier lines remain visible to
/// later ones: REPL state persists globals across lines.
pub fn run(vm: &mut Vm) {
    let mut editor = DefaultEditor::new().expect("failed to initialize line editor");

    loop {
        match editor.readline("thistle> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                eval_line(vm, &line);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("readline error: {e}");
                break;
            }
        }
    }
}

/// Compile and execute one line against `vm`, printing diagnostics to
/// stderr. Split out of [`run`] so it can be exercised without a terminal.
pub fn eval_line(vm: &mut Vm, line: &str) {
    match vm.interpret(line) {
        InterpretResult::Ok => {}
        InterpretResult::CompileError(errors) => {
            for error in errors {
                eprintln!("{error}");
            }
        }
        InterpretResult::RuntimeError(error) => {
            eprintln!("{error}");
        }
    }
}
