// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Textual formatting of values. Printing needs heap access to resolve
//! compound payloads, so it lives beside the value model rather than on
//! `Value` itself, which doesn't borrow the heap.

use crate::gc::{Handle, Heap};
use crate::value::{Object, Value};
use std::fmt::{self, Write as _};

/// Render `value` to its `print` textual form: writes the value using a
/// type-dispatched formatter.
#[must_use]
pub fn print_value(value: Value, heap: &Heap) -> String {
    let mut out = String::new();
    let _ = write_value(&mut out, value, heap);
    out
}

fn write_value(out: &mut String, value: Value, heap: &Heap) -> fmt::Result {
    match value {
        Value::Nil => write!(out, "nil"),
        Value::Bool(b) => write!(out, "{b}"),
        Value::Number(n) => write_number(out, n),
        Value::Object(h) => write_object(out, h, heap),
    }
}

/// Numbers print without a trailing `.0` for integral values, `%g`-style;
/// reading the printed form back must yield an equal value.
fn write_number(out: &mut String, n: f64) -> fmt::Result {
    if n.is_nan() {
        write!(out, "nan")
    } else if n.is_infinite() {
        write!(out, "{}inf", if n < 0.0 { "-" } else { "" })
    } else if n == n.trunc() && n.abs() < 1e15 {
        write!(out, "{}", n as i64)
    } else {
        write!(out, "{n}")
    }
}

fn write_object(out: &mut String, handle: Handle, heap: &Heap) -> fmt::Result {
    match heap.get(handle) {
        Object::Str(s, _) => write!(out, "{s}"),
        Object::Function(f) => match f.name {
            Some(name) => write!(out, "<fn {}>", heap.str_contents(name)),
            None => write!(out, "<script>"),
        },
        Object::Closure(c) => {
            let f = heap.get_function(c.function);
            match f.name {
                Some(name) => write!(out, "<fn {}>", heap.str_contents(name)),
                None => write!(out, "<script>"),
            }
        }
        Object::Upvalue(_) => write!(out, "<upvalue>"),
        Object::Class(c) => write!(out, "{}", heap.str_contents(c.name)),
        Object::Instance(i) => {
            let class = heap.get_class(i.class);
            write!(out, "{} instance", heap.str_contents(class.name))
        }
        Object::BoundMethod(b) => {
            let closure = heap.get_closure(b.method);
            let f = heap.get_function(closure.function);
            match f.name {
                Some(name) => write!(out, "<fn {}>", heap.str_contents(name)),
                None => write!(out, "<script>"),
            }
        }
        Object::List(list) => {
            write!(out, "[")?;
            for (i, item) in list.items.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                write_value(out, *item, heap)?;
            }
            write!(out, "]")
        }
        Object::Native(n) => write!(out, "<native fn {}>", n.name),
    }
}
