// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::eval_line;
use crate::vm::Vm;
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn new_vm() -> (Vm, SharedBuffer) {
    let buffer = SharedBuffer::default();
    (Vm::with_writer(Box::new(buffer.clone())), buffer)
}

fn output(buffer: &SharedBuffer) -> String {
    String::from_utf8(buffer.0.borrow().clone()).unwrap()
}

#[test]
fn a_bare_expression_prints_nothing_by_itself() {
    let (mut vm, buffer) = new_vm();
    eval_line(&mut vm, "1 + 2;");
    assert_eq!(output(&buffer), "");
}

#[test]
fn print_statement_writes_through_the_vm() {
    let (mut vm, buffer) = new_vm();
    eval_line(&mut vm, "print 1 + 2;");
    assert_eq!(output(&buffer), "3\n");
}

#[test]
fn globals_persist_across_lines() {
    let (mut vm, buffer) = new_vm();
    eval_line(&mut vm, "var greeting = \"hi\";");
    eval_line(&mut vm, "print greeting;");
    assert_eq!(output(&buffer), "hi\n");
}

#[test]
fn functions_persist_across_lines() {
    let (mut vm, buffer) = new_vm();
    eval_line(&mut vm, "fun add(a, b) { return a + b; }");
    eval_line(&mut vm, "print add(3, 4);");
    assert_eq!(output(&buffer), "7\n");
}

#[test]
fn a_compile_error_does_not_poison_later_lines() {
    let (mut vm, buffer) = new_vm();
    eval_line(&mut vm, "var x = ;");
    eval_line(&mut vm, "print 9;");
    assert_eq!(output(&buffer), "9\n");
}

#[test]
fn a_runtime_error_does_not_poison_later_lines() {
    let (mut vm, buffer) = new_vm();
    eval_line(&mut vm, "print 1 + nil;");
    eval_line(&mut vm, "print 9;");
    assert_eq!(output(&buffer), "9\n");
}
