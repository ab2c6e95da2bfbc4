// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Chunk disassembler: one line per instruction, offset + mnemonic +
//! operands. Used by the `--trace` CLI flag and by tests that assert on
//! compiler output.

use super::{Chunk, OpCode};
use crate::gc::Heap;
use std::fmt::Write as _;

/// Disassemble every instruction in `chunk`, prefixed with `name`.
#[must_use]
pub fn disassemble_chunk(chunk: &Chunk, name: &str, heap: &Heap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {name} ==");
    let mut offset = 0;
    while offset < chunk.len() {
        let (line, next) = disassemble_instruction(chunk, offset, heap);
        out.push_str(&line);
        out.push('\n');
        offset = next;
    }
    out
}

/// Disassemble the instruction at `offset`, returning its text and the
/// offset of the following instruction.
#[must_use]
pub fn disassemble_instruction(chunk: &Chunk, offset: usize, heap: &Heap) -> (String, usize) {
    let mut out = String::new();
    let _ = write!(out, "{offset:04} ");
    if offset > 0 && chunk.line_at(offset) == chunk.line_at(offset - 1) {
        let _ = write!(out, "   | ");
    } else {
        let _ = write!(out, "{:4} ", chunk.line_at(offset));
    }

    let Some(op) = OpCode::from_u8(chunk.code[offset]) else {
        let _ = write!(out, "UNKNOWN {}", chunk.code[offset]);
        return (out, offset + 1);
    };

    let next = match op {
        OpCode::Nil
        | OpCode::True
        | OpCode::False
        | OpCode::Pop
        | OpCode::Equal
        | OpCode::Greater
        | OpCode::Less
        | OpCode::Add
        | OpCode::Subtract
        | OpCode::Multiply
        | OpCode::Divide
        | OpCode::Not
        | OpCode::Negate
        | OpCode::Print
        | OpCode::CloseUpvalue
        | OpCode::Return
        | OpCode::Inherit
        | OpCode::IndexSubscr
        | OpCode::StoreSubscr => simple(&mut out, op, offset),
        OpCode::GetLocal | OpCode::SetLocal | OpCode::Call => {
            byte_operand(&mut out, op, chunk, offset)
        }
        OpCode::GetGlobal
        | OpCode::SetGlobal
        | OpCode::DefineGlobal
        | OpCode::GetProperty
        | OpCode::SetProperty
        | OpCode::GetSuper
        | OpCode::Class
        | OpCode::Method => constant_operand(&mut out, op, chunk, offset, heap),
        OpCode::GetUpvalue | OpCode::SetUpvalue => byte_operand(&mut out, op, chunk, offset),
        OpCode::Jump | OpCode::JumpIfFalse => jump_operand(&mut out, op, chunk, offset, 1),
        OpCode::Loop => jump_operand(&mut out, op, chunk, offset, -1),
        OpCode::Invoke | OpCode::SuperInvoke => invoke_operand(&mut out, op, chunk, offset, heap),
        OpCode::Closure => closure_operand(&mut out, chunk, offset, heap),
        OpCode::BuildList => {
            let count = u16::from_be_bytes([chunk.code[offset + 1], chunk.code[offset + 2]]);
            let _ = write!(out, "{:<16} {count}", "OP_BUILD_LIST");
            offset + 3
        }
        OpCode::Constant => constant_operand(&mut out, op, chunk, offset, heap),
    };
    (out, next)
}

fn mnemonic(op: OpCode) -> &'static str {
    match op {
        OpCode::Constant => "OP_CONSTANT",
        OpCode::Nil => "OP_NIL",
        OpCode::True => "OP_TRUE",
        OpCode::False => "OP_FALSE",
        OpCode::Pop => "OP_POP",
        OpCode::GetLocal => "OP_GET_LOCAL",
        OpCode::SetLocal => "OP_SET_LOCAL",
        OpCode::GetGlobal => "OP_GET_GLOBAL",
        OpCode::SetGlobal => "OP_SET_GLOBAL",
        OpCode::DefineGlobal => "OP_DEFINE_GLOBAL",
        OpCode::GetUpvalue => "OP_GET_UPVALUE",
        OpCode::SetUpvalue => "OP_SET_UPVALUE",
        OpCode::GetProperty => "OP_GET_PROPERTY",
        OpCode::SetProperty => "OP_SET_PROPERTY",
        OpCode::GetSuper => "OP_GET_SUPER",
        OpCode::Equal => "OP_EQUAL",
        OpCode::Greater => "OP_GREATER",
        OpCode::Less => "OP_LESS",
        OpCode::Add => "OP_ADD",
        OpCode::Subtract => "OP_SUBTRACT",
        OpCode::Multiply => "OP_MULTIPLY",
        OpCode::Divide => "OP_DIVIDE",
        OpCode::Not => "OP_NOT",
        OpCode::Negate => "OP_NEGATE",
        OpCode::Print => "OP_PRINT",
        OpCode::Jump => "OP_JUMP",
        OpCode::JumpIfFalse => "OP_JUMP_IF_FALSE",
        OpCode::Loop => "OP_LOOP",
        OpCode::Call => "OP_CALL",
        OpCode::Invoke => "OP_INVOKE",
        OpCode::SuperInvoke => "OP_SUPER_INVOKE",
        OpCode::Closure => "OP_CLOSURE",
        OpCode::CloseUpvalue => "OP_CLOSE_UPVALUE",
        OpCode::Return => "OP_RETURN",
        OpCode::Class => "OP_CLASS",
        OpCode::Inherit => "OP_INHERIT",
        OpCode::Method => "OP_METHOD",
        OpCode::BuildList => "OP_BUILD_LIST",
        OpCode::IndexSubscr => "OP_INDEX_SUBSCR",
        OpCode::StoreSubscr => "OP_STORE_SUBSCR",
    }
}

fn simple(out: &mut String, op: OpCode, offset: usize) -> usize {
    out.push_str(mnemonic(op));
    offset + 1
}

fn byte_operand(out: &mut String, op: OpCode, chunk: &Chunk, offset: usize) -> usize {
    let slot = chunk.code[offset + 1];
    let _ = write!(out, "{:<16} {slot:4}", mnemonic(op));
    offset + 2
}

fn constant_operand(
    out: &mut String,
    op: OpCode,
    chunk: &Chunk,
    offset: usize,
    heap: &Heap,
) -> usize {
    let index = chunk.code[offset + 1];
    let value = chunk.constants[index as usize];
    let _ = write!(
        out,
        "{:<16} {index:4} '{}'",
        mnemonic(op),
        crate::value::print_value(value, heap)
    );
    offset + 2
}

fn jump_operand(
    out: &mut String,
    op: OpCode,
    chunk: &Chunk,
    offset: usize,
    sign: i32,
) -> usize {
    let jump = u16::from_be_bytes([chunk.code[offset + 1], chunk.code[offset + 2]]);
    let target = offset as i64 + 3 + sign as i64 * i64::from(jump);
    let _ = write!(out, "{:<16} {offset:4} -> {target}", mnemonic(op));
    offset + 3
}

fn invoke_operand(
    out: &mut String,
    op: OpCode,
    chunk: &Chunk,
    offset: usize,
    heap: &Heap,
) -> usize {
    let index = chunk.code[offset + 1];
    let argc = chunk.code[offset + 2];
    let value = chunk.constants[index as usize];
    let _ = write!(
        out,
        "{:<16} ({argc} args) {index:4} '{}'",
        mnemonic(op),
        crate::value::print_value(value, heap)
    );
    offset + 3
}

fn closure_operand(out: &mut String, chunk: &Chunk, offset: usize, heap: &Heap) -> usize {
    let index = chunk.code[offset + 1];
    let value = chunk.constants[index as usize];
    let _ = write!(
        out,
        "{:<16} {index:4} '{}'",
        mnemonic(OpCode::Closure),
        crate::value::print_value(value, heap)
    );
    let mut next = offset + 2;
    let Some(handle) = value.as_object() else {
        return next;
    };
    let upvalue_count = heap.get_function(handle).upvalue_count;
    for _ in 0..upvalue_count {
        let is_local = chunk.code[next];
        let idx = chunk.code[next + 1];
        let _ = write!(
            out,
            "\n{next:04}      |                     {} {idx}",
            if is_local != 0 { "local" } else { "upvalue" }
        );
        next += 2;
    }
    next
}
