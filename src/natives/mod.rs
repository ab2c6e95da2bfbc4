// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Native (host-provided) functions (`spec.md` §9, SUPPLEMENT-1).
//!
//! Grounded on `original_source/BlazeLang/Blaze/native_fn.c`'s
//! `initNatives`/`clockNative`/`appendListNative`/`removeIndexListNative`/
//! `sliceListNative`. The original silently no-ops on bad arguments
//! ("Handle Error" comments with no actual handling); `spec.md` §9 resolves
//! that open question by requiring these to raise the same structured
//! [`RuntimeError`](crate::vm::RuntimeError) kinds user code would trigger,
//! which is what every native below does.


use crate::value::{List, NativeArity, Object, Value};
use crate::vm::{RuntimeError, RuntimeErrorKind, Vm};
use std::time::{SystemTime, UNIX_EPOCH};

/// Install every native function as a global, matching the teacher's
/// `intrinsics::install`/`realm::Realm::new` pattern of registering the
/// host surface once at VM construction.
pub fn install(vm: &mut Vm) {
    vm.define_native("clock", NativeArity::Exact(0), clock);
    vm.define_native("append", NativeArity::Exact(2), append);
    vm.define_native("remove", NativeArity::Exact(2), remove);
    vm.define_native("slice", NativeArity::Range(3, 4), slice);
}

fn as_list_mut<'a>(vm: &'a mut Vm, value: Value) -> Result<&'a mut List, RuntimeError> {
    let Value::Object(handle) = value else {
        return Err(vm.runtime_error(RuntimeErrorKind::NotAList));
    };
    match vm.heap_mut().get_mut(handle) {
        Object::List(list) => Ok(list),
        _ => Err(vm.runtime_error(RuntimeErrorKind::NotAList)),
    }
}

fn as_index(vm: &Vm, value: Value) -> Result<i64, RuntimeError> {
    value
        .as_number()
        .map(|n| n as i64)
        .ok_or_else(|| vm.runtime_error(RuntimeErrorKind::IndexMustBeNumber))
}

/// `clock()` — seconds since the Unix epoch, standing in for the
/// original's `clock() / CLOCKS_PER_SEC` process-time reading (a `no_std`
/// target has no `clock()`; wall-clock seconds preserves the "returns an
/// ever-increasing `f64` of seconds" contract that scripts rely on for
/// timing loops).
fn clock(_vm: &mut Vm, _args: &[Value]) -> Result<Value, RuntimeError> {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);
    Ok(Value::Number(secs))
}

/// `append(list, value)` — push `value` onto the end of `list`, return
/// `nil`.
fn append(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let value = args[1];
    let list = as_list_mut(vm, args[0])?;
    list.items.push(value);
    Ok(Value::Nil)
}

/// `remove(list, index)` — delete the element at `index`, return `nil`.
fn remove(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let index = as_index(vm, args[1])?;
    let list = as_list_mut(vm, args[0])?;
    if index < 0 || index as usize >= list.items.len() {
        return Err(vm.runtime_error(RuntimeErrorKind::IndexOutOfRange));
    }
    list.items.remove(index as usize);
    Ok(Value::Nil)
}

/// `slice(list, start, end[, step])` — a new list of `list[start..end]`
/// stepping by `step` (default 1), matching the original's `for (i = start;
/// i < end; i += step)` loop including its lack of bounds clamping: an
/// out-of-range `start`/`end` is a `RuntimeErrorKind::IndexOutOfRange`
/// rather than silently truncating.
fn slice(vm: &mut Vm, args: &[Value]) -> Result<Value, RuntimeError> {
    let start = as_index(vm, args[1])?;
    let end = as_index(vm, args[2])?;
    let step = if args.len() == 4 {
        as_index(vm, args[3])?
    } else {
        1
    };
    if step == 0 {
        return Err(vm.runtime_error(RuntimeErrorKind::IndexOutOfRange));
    }

    let len = {
        let list = as_list_mut(vm, args[0])?;
        list.items.len() as i64
    };
    if start < 0 || end < 0 || start > len || end > len {
        return Err(vm.runtime_error(RuntimeErrorKind::IndexOutOfRange));
    }
    // A negative step walks downward from `start`; if the loop runs at all
    // (`start > end`), `start` is the first index dereferenced below and
    // must name a live slot, not just satisfy `start <= len`.
    if step < 0 && start > end && start >= len {
        return Err(vm.runtime_error(RuntimeErrorKind::IndexOutOfRange));
    }

    let mut items = Vec::new();
    let mut i = start;
    while (step > 0 && i < end) || (step < 0 && i > end) {
        let list = as_list_mut(vm, args[0])?;
        items.push(list.items[i as usize]);
        i += step;
    }
    let handle = vm.alloc_object(Object::List(List { items }));
    Ok(Value::Object(handle))
}
