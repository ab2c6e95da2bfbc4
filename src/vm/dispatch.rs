// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The instruction dispatch loop.
//!
//! Split out of `vm/mod.rs` purely for file size; it is still the same
//! `impl Vm` block and freely uses private fields, the same way helpers
//! like `build_tuple`/`call_user_fn` live as free functions operating on
//! `Process` internals rather than one monolithic method.

use super::error::RuntimeErrorKind;
use super::{RuntimeError, Vm};
use crate::chunk::OpCode;
use crate::value::{Class, Closure, List, Object, UpvalueState, Value};
use tracing::trace;

impl Vm {
    fn current_frame_index(&self) -> usize {
        self.frames.len() - 1
    }

    fn read_u8(&mut self) -> u8 {
        let idx = self.current_frame_index();
        let ip = self.frames[idx].ip;
        self.frames[idx].ip += 1;
        let closure = self.frames[idx].closure;
        let function = self.heap.get_closure(closure).function;
        self.heap.get_function(function).chunk.code[ip]
    }

    fn read_u16(&mut self) -> u16 {
        let hi = self.read_u8();
        let lo = self.read_u8();
        u16::from_be_bytes([hi, lo])
    }

    fn read_constant(&mut self) -> Value {
        let index = self.read_u8();
        let idx = self.current_frame_index();
        let closure = self.frames[idx].closure;
        let function = self.heap.get_closure(closure).function;
        self.heap.get_function(function).chunk.constants[index as usize]
    }

    fn read_string(&mut self) -> crate::gc::Handle {
        self.read_constant()
            .as_object()
            .expect("compiler always emits a string constant here")
    }

    fn trace_instruction(&self) {
        let idx = self.current_frame_index();
        let closure = self.frames[idx].closure;
        let function = self.heap.get_closure(closure).function;
        let ip = self.frames[idx].ip;
        let (line, _) =
            crate::chunk::disassemble_instruction(&self.heap.get_function(function).chunk, ip, &self.heap);
        trace!(target: "thistle::vm", "{line}");
    }

    fn numeric_binop(&mut self, op: OpCode) -> Result<(), RuntimeError> {
        let (Some(b), Some(a)) = (self.peek(0).as_number(), self.peek(1).as_number()) else {
            return Err(self.runtime_error(RuntimeErrorKind::OperandsMustBeNumbers));
        };
        self.pop();
        self.pop();
        let result = match op {
            OpCode::Subtract => a - b,
            OpCode::Multiply => a * b,
            OpCode::Divide => a / b,
            OpCode::Greater => return self.push(Value::Bool(a > b)),
            OpCode::Less => return self.push(Value::Bool(a < b)),
            _ => unreachable!(),
        };
        self.push(Value::Number(result))
    }

    /// Run the dispatch loop until the outermost frame returns.
    pub(crate) fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            if self.trace_exec {
                self.trace_instruction();
            }

            let byte = self.read_u8();
            let Some(op) = OpCode::from_u8(byte) else {
                return Err(self.runtime_error(RuntimeErrorKind::InvalidOpcode(byte)));
            };

            match op {
                OpCode::Constant => {
                    let v = self.read_constant();
                    self.push(v)?;
                }
                OpCode::Nil => self.push(Value::Nil)?,
                OpCode::True => self.push(Value::Bool(true))?,
                OpCode::False => self.push(Value::Bool(false))?,
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_u8() as usize;
                    let base = self.frames[self.current_frame_index()].slot_base;
                    self.push(self.stack[base + slot])?;
                }
                OpCode::SetLocal => {
                    let slot = self.read_u8() as usize;
                    let base = self.frames[self.current_frame_index()].slot_base;
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.str_hash(name);
                    match self.globals.get(name, hash) {
                        Some(v) => self.push(v)?,
                        None => {
                            let name = self.heap.str_contents(name).to_string();
                            return Err(
                                self.runtime_error(RuntimeErrorKind::UndefinedGlobal { name })
                            );
                        }
                    }
                }
                OpCode::SetGlobal => {
                    let name = self.read_string();
                    let hash = self.heap.str_hash(name);
                    if !self.globals.contains(name, hash) {
                        let name = self.heap.str_contents(name).to_string();
                        return Err(self.runtime_error(RuntimeErrorKind::UndefinedGlobal { name }));
                    }
                    self.globals.set(name, hash, self.peek(0));
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string();
                    let value = self.peek(0);
                    self.define_global(name, value);
                    self.pop();
                }
                OpCode::GetUpvalue => {
                    let idx = self.read_u8() as usize;
                    let closure = self.frames[self.current_frame_index()].closure;
                    let upvalue = self.heap.get_closure(closure).upvalues[idx];
                    let state = match self.heap.get(upvalue) {
                        Object::Upvalue(u) => u.state,
                        _ => unreachable!(),
                    };
                    let value = match state {
                        UpvalueState::Open(slot) => self.stack[slot],
                        UpvalueState::Closed(v) => v,
                    };
                    self.push(value)?;
                }
                OpCode::SetUpvalue => {
                    let idx = self.read_u8() as usize;
                    let closure = self.frames[self.current_frame_index()].closure;
                    let upvalue = self.heap.get_closure(closure).upvalues[idx];
                    let value = self.peek(0);
                    let state = match self.heap.get(upvalue) {
                        Object::Upvalue(u) => u.state,
                        _ => unreachable!(),
                    };
                    match state {
                        UpvalueState::Open(slot) => self.stack[slot] = value,
                        UpvalueState::Closed(_) => {
                            if let Object::Upvalue(u) = self.heap.get_mut(upvalue) {
                                u.state = UpvalueState::Closed(value);
                            }
                        }
                    }
                }
                OpCode::GetProperty => {
                    let Value::Object(handle) = self.peek(0) else {
                        return Err(self.runtime_error(RuntimeErrorKind::PropertyOnNonInstance));
                    };
                    let name = self.read_string();
                    let Object::Instance(instance) = self.heap.get(handle) else {
                        return Err(self.runtime_error(RuntimeErrorKind::PropertyOnNonInstance));
                    };
                    let hash = self.heap.str_hash(name);
                    if let Some(value) = instance.fields.get(name, hash) {
                        self.pop();
                        self.push(value)?;
                    } else {
                        let class = instance.class;
                        self.bind_method(class, name)?;
                    }
                }
                OpCode::SetProperty => {
                    let Value::Object(handle) = self.peek(1) else {
                        return Err(self.runtime_error(RuntimeErrorKind::PropertyOnNonInstance));
                    };
                    let name = self.read_string();
                    if !matches!(self.heap.get(handle), Object::Instance(_)) {
                        return Err(self.runtime_error(RuntimeErrorKind::PropertyOnNonInstance));
                    }
                    let hash = self.heap.str_hash(name);
                    let value = self.peek(0);
                    if let Object::Instance(instance) = self.heap.get_mut(handle) {
                        instance.fields.set(name, hash, value);
                    }
                    let value = self.pop();
                    self.pop();
                    self.push(value)?;
                }
                OpCode::GetSuper => {
                    let name = self.read_string();
                    let Value::Object(superclass) = self.pop() else {
                        return Err(self.runtime_error(RuntimeErrorKind::SuperclassNotClass));
                    };
                    self.bind_method(superclass, name)?;
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b))?;
                }
                OpCode::Greater | OpCode::Less => self.numeric_binop(op)?,
                OpCode::Add => self.add()?,
                OpCode::Subtract | OpCode::Multiply | OpCode::Divide => self.numeric_binop(op)?,
                OpCode::Not => {
                    let v = self.pop();
                    self.push(Value::Bool(v.is_falsey()))?;
                }
                OpCode::Negate => {
                    let Some(n) = self.peek(0).as_number() else {
                        return Err(self.runtime_error(RuntimeErrorKind::OperandMustBeNumber));
                    };
                    self.pop();
                    self.push(Value::Number(-n))?;
                }
                OpCode::Print => {
                    let v = self.pop();
                    let text = crate::value::print_value(v, &self.heap);
                    let _ = self.write_out(&text);
                    let _ = self.write_out("\n");
                }
                OpCode::Jump => {
                    let offset = self.read_u16();
                    self.frames[self.current_frame_index()].ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16();
                    if self.peek(0).is_falsey() {
                        self.frames[self.current_frame_index()].ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16();
                    self.frames[self.current_frame_index()].ip -= offset as usize;
                }
                OpCode::Call => {
                    let argc = self.read_u8();
                    let callee = self.peek(argc as usize);
                    self.call_value(callee, argc)?;
                }
                OpCode::Invoke => {
                    let name = self.read_string();
                    let argc = self.read_u8();
                    self.invoke(name, argc)?;
                }
                OpCode::SuperInvoke => {
                    let name = self.read_string();
                    let argc = self.read_u8();
                    let Value::Object(superclass) = self.pop() else {
                        return Err(self.runtime_error(RuntimeErrorKind::SuperclassNotClass));
                    };
                    self.invoke_from_class(superclass, name, argc)?;
                }
                OpCode::Closure => self.make_closure()?,
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(top);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().expect("a frame always exists in run()");
                    self.close_upvalues(frame.slot_base);
                    if self.frames.is_empty() {
                        self.pop();
                        return Ok(());
                    }
                    self.stack.truncate(frame.slot_base);
                    self.push(result)?;
                }
                OpCode::Class => {
                    let name = self.read_string();
                    let class = self.alloc_object(Object::Class(Class::new(name)));
                    self.push(Value::Object(class))?;
                }
                OpCode::Inherit => {
                    let Value::Object(superclass) = self.peek(1) else {
                        return Err(self.runtime_error(RuntimeErrorKind::SuperclassNotClass));
                    };
                    if !matches!(self.heap.get(superclass), Object::Class(_)) {
                        return Err(self.runtime_error(RuntimeErrorKind::SuperclassNotClass));
                    }
                    let Value::Object(subclass) = self.peek(0) else {
                        unreachable!("compiler only emits OP_INHERIT with a class on top")
                    };
                    let methods = self.heap.get_class(superclass).methods.clone();
                    if let Object::Class(c) = self.heap.get_mut(subclass) {
                        c.methods.copy_from(&methods);
                    }
                    self.pop();
                }
                OpCode::Method => {
                    let name = self.read_string();
                    let method = self.peek(0);
                    let Value::Object(class) = self.peek(1) else {
                        unreachable!("compiler only emits OP_METHOD inside a class body")
                    };
                    let hash = self.heap.str_hash(name);
                    if let Object::Class(c) = self.heap.get_mut(class) {
                        c.methods.set(name, hash, method);
                    }
                    self.pop();
                }
                OpCode::BuildList => {
                    let count = self.read_u16() as usize;
                    // Allocate the (empty) list and push it before touching
                    // the source items, so it roots them for the rest of
                    // this instruction — the source items stay on the stack
                    // below it the whole time regardless, but this also
                    // keeps the list itself alive while we fill it in.
                    let list = self.alloc_object(Object::List(List { items: Vec::new() }));
                    self.push(Value::Object(list))?;
                    let mut items = Vec::with_capacity(count);
                    for i in (1..=count).rev() {
                        items.push(self.peek(i));
                    }
                    if let Object::List(l) = self.heap.get_mut(list) {
                        l.items = items;
                    }
                    for _ in 0..=count {
                        self.pop();
                    }
                    self.push(Value::Object(list))?;
                }
                OpCode::IndexSubscr => {
                    let Some(index) = self.peek(0).as_number() else {
                        return Err(self.runtime_error(RuntimeErrorKind::IndexMustBeNumber));
                    };
                    let Value::Object(list_handle) = self.peek(1) else {
                        return Err(self.runtime_error(RuntimeErrorKind::NotAList));
                    };
                    let Object::List(list) = self.heap.get(list_handle) else {
                        return Err(self.runtime_error(RuntimeErrorKind::NotAList));
                    };
                    let idx = index as i64;
                    if idx < 0 || idx as usize >= list.items.len() {
                        return Err(self.runtime_error(RuntimeErrorKind::IndexOutOfRange));
                    }
                    let value = list.items[idx as usize];
                    self.pop();
                    self.pop();
                    self.push(value)?;
                }
                OpCode::StoreSubscr => {
                    let value = self.peek(0);
                    let Some(index) = self.peek(1).as_number() else {
                        return Err(self.runtime_error(RuntimeErrorKind::IndexMustBeNumber));
                    };
                    let Value::Object(list_handle) = self.peek(2) else {
                        return Err(self.runtime_error(RuntimeErrorKind::NotAList));
                    };
                    let idx = index as i64;
                    if let Object::List(list) = self.heap.get_mut(list_handle) {
                        if idx < 0 || idx as usize >= list.items.len() {
                            return Err(self.runtime_error(RuntimeErrorKind::IndexOutOfRange));
                        }
                        list.items[idx as usize] = value;
                    }
                    self.pop();
                    self.pop();
                    self.pop();
                    self.push(value)?;
                }
            }
        }
    }

    fn add(&mut self) -> Result<(), RuntimeError> {
        let b = self.peek(0);
        let a = self.peek(1);
        match (a, b) {
            (Value::Number(x), Value::Number(y)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(x + y))
            }
            (Value::Object(ha), Value::Object(hb))
                if matches!(self.heap.get(ha), Object::Str(..))
                    && matches!(self.heap.get(hb), Object::Str(..)) =>
            {
                let mut s = self.heap.str_contents(ha).to_string();
                s.push_str(self.heap.str_contents(hb));
                let handle = self.intern(&s);
                self.pop();
                self.pop();
                self.push(Value::Object(handle))
            }
            _ => Err(self.runtime_error(RuntimeErrorKind::InvalidAddOperands)),
        }
    }

    fn make_closure(&mut self) -> Result<(), RuntimeError> {
        let function_value = self.read_constant();
        let function = function_value
            .as_object()
            .expect("OP_CLOSURE always names a function constant");
        let upvalue_count = self.heap.get_function(function).upvalue_count;
        // Allocate the closure with a placeholder upvalue array and push it
        // immediately so it (and whatever we fill into it below) is a root
        // for the rest of this instruction — otherwise an upvalue captured
        // early in the loop below sits in a plain local `Vec` while later
        // iterations may themselves trigger a collection.
        let closure = self.alloc_object(Object::Closure(Closure {
            function,
            upvalues: vec![function; upvalue_count],
        }));
        self.push(Value::Object(closure))?;
        let frame_idx = self.current_frame_index();
        for i in 0..upvalue_count {
            let is_local = self.read_u8();
            let index = self.read_u8() as usize;
            let upvalue = if is_local != 0 {
                let base = self.frames[frame_idx].slot_base;
                self.capture_upvalue(base + index)
            } else {
                let enclosing = self.frames[frame_idx].closure;
                self.heap.get_closure(enclosing).upvalues[index]
            };
            if let Object::Closure(c) = self.heap.get_mut(closure) {
                c.upvalues[i] = upvalue;
            }
        }
        Ok(())
    }
}
