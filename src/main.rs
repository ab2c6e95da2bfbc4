// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Thistle CLI: run a script file, or drop into the REPL with none given.
//!
//! Grounded on the teacher's own CLI shape (`clap`-derived arguments,
//! `tracing-subscriber` wired to `RUST_LOG`) adapted from a realm-boot
//! binary to a plain hosted interpreter entry point. Exit codes follow
//! clox's convention (`spec.md` §6): 0 success, 65 compile error, 70
//! runtime error, 74 I/O error.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use thistle::vm::{InterpretResult, Vm};

#[derive(Parser)]
#[command(name = "thistle", version, about = "A small class-based scripting language")]
struct Args {
    /// Script to run. Omit to start the REPL.
    script: Option<PathBuf>,

    /// Trace every executed instruction to the log.
    #[arg(long)]
    trace: bool,

    /// Run the garbage collector before every allocation (for testing).
    #[arg(long)]
    stress_gc: bool,

    /// Grow the GC threshold by this factor after each collection.
    #[arg(long)]
    gc_grow_factor: Option<usize>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let stress_gc = args.stress_gc || env_flag("THISTLE_STRESS_GC");
    let gc_grow_factor = args
        .gc_grow_factor
        .or_else(|| std::env::var("THISTLE_GC_GROW_FACTOR").ok()?.parse().ok());

    let mut vm = Vm::new();
    vm.set_trace_exec(args.trace);
    vm.set_stress_gc(stress_gc);
    if let Some(factor) = gc_grow_factor {
        vm.set_gc_grow_factor(factor);
    }

    match args.script {
        Some(path) => run_file(&mut vm, &path),
        None => {
            thistle::repl::run(&mut vm);
            ExitCode::SUCCESS
        }
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name).is_ok_and(|v| v != "0" && !v.is_empty())
}

fn run_file(vm: &mut Vm, path: &PathBuf) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("thistle: couldn't read {}: {e}", path.display());
            return ExitCode::from(74);
        }
    };

    match vm.interpret(&source) {
        InterpretResult::Ok => ExitCode::SUCCESS,
        InterpretResult::CompileError(errors) => {
            for error in errors {
                eprintln!("{error}");
            }
            ExitCode::from(65)
        }
        InterpretResult::RuntimeError(error) => {
            eprintln!("{error}");
            ExitCode::from(70)
        }
    }
}
