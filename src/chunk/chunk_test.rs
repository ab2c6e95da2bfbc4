// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::*;
use crate::gc::Heap;
use crate::value::Value;

#[test]
fn write_and_len_track_code_and_lines_together() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Nil, 1);
    chunk.write_op(OpCode::Return, 2);
    assert_eq!(chunk.len(), 2);
    assert_eq!(chunk.line_at(0), 1);
    assert_eq!(chunk.line_at(1), 2);
}

#[test]
fn add_constant_returns_index_and_rejects_overflow() {
    let mut chunk = Chunk::new();
    for i in 0..MAX_CONSTANTS {
        let idx = chunk.add_constant(Value::Number(i as f64));
        assert_eq!(idx, Some(i as u8));
    }
    assert_eq!(chunk.add_constant(Value::Nil), None, "pool should be full");
}

#[test]
fn jump_placeholder_round_trips_through_patch() {
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::JumpIfFalse, 1);
    let placeholder = chunk.write_u16_placeholder(1);
    chunk.write_op(OpCode::Pop, 1);
    let target = chunk.len();
    chunk.patch_u16(placeholder, (target - placeholder - 2) as u16);

    let offset = u16::from_be_bytes([chunk.code[placeholder], chunk.code[placeholder + 1]]);
    assert_eq!(offset as usize, target - placeholder - 2);
}

#[test]
fn opcode_round_trips_through_u8() {
    for op in [
        OpCode::Constant,
        OpCode::Call,
        OpCode::Closure,
        OpCode::Return,
        OpCode::StoreSubscr,
    ] {
        assert_eq!(OpCode::from_u8(op as u8), Some(op));
    }
}

#[test]
fn unknown_opcode_byte_decodes_to_none() {
    assert_eq!(OpCode::from_u8(255), None);
}

#[test]
fn disassemble_labels_constant_and_simple_instructions() {
    let heap = Heap::new();
    let mut chunk = Chunk::new();
    let idx = chunk.add_constant(Value::Number(1.0)).unwrap();
    chunk.write_op(OpCode::Constant, 1);
    chunk.write_u8(idx, 1);
    chunk.write_op(OpCode::Return, 1);

    let text = disassemble_chunk(&chunk, "test", &heap);
    assert!(text.contains("OP_CONSTANT"));
    assert!(text.contains("'1'"));
    assert!(text.contains("OP_RETURN"));
}

#[test]
fn disassemble_repeats_no_line_number_on_same_line() {
    let heap = Heap::new();
    let mut chunk = Chunk::new();
    chunk.write_op(OpCode::Nil, 5);
    chunk.write_op(OpCode::Pop, 5);
    let text = disassemble_chunk(&chunk, "test", &heap);
    let mut lines = text.lines();
    lines.next(); // header
    let first = lines.next().unwrap();
    let second = lines.next().unwrap();
    assert!(first.contains("   5 "));
    assert!(second.contains("   | "));
}
