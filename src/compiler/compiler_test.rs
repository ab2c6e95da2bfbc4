// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use crate::vm::{InterpretResult, Vm};

fn expect_compile_error(source: &str, needle: &str) {
    let mut vm = Vm::new();
    match vm.interpret(source) {
        InterpretResult::CompileError(errors) => {
            assert!(
                errors.iter().any(|e| e.message.contains(needle)),
                "expected an error containing {needle:?}, got {errors:?}"
            );
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}

#[test]
fn unterminated_block_is_a_compile_error() {
    expect_compile_error("fun f() { print 1;", "Expect '}'");
}

#[test]
fn return_outside_function_is_a_compile_error() {
    expect_compile_error("return 1;", "Can't return from top-level code.");
}

#[test]
fn this_outside_class_is_a_compile_error() {
    expect_compile_error("fun f() { print this; }", "Can't use 'this' outside of a class.");
}

#[test]
fn self_inheritance_is_a_compile_error() {
    expect_compile_error("class Oops < Oops {}", "A class can't inherit from itself.");
}

#[test]
fn redeclaring_a_local_in_the_same_scope_is_a_compile_error() {
    expect_compile_error(
        "{ var a = 1; var a = 2; }",
        "Already a variable with this name in this scope.",
    );
}

#[test]
fn assigning_to_a_non_lvalue_is_a_compile_error() {
    expect_compile_error("1 + 2 = 3;", "Invalid assignment target.");
}

#[test]
fn multiple_errors_are_all_collected_via_synchronization() {
    let mut vm = Vm::new();
    match vm.interpret("var = 1; var = 2;") {
        InterpretResult::CompileError(errors) => {
            assert!(errors.len() >= 2, "expected both errors to be reported, got {errors:?}");
        }
        other => panic!("expected a compile error, got {other:?}"),
    }
}
