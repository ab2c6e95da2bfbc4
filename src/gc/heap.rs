// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The object arena and mark-sweep collector.

use super::{GcRoots, Handle};
use crate::table::Table;
use crate::value::{Object, UpvalueState, Value};
use std::rc::Rc;
use tracing::debug;

/// `next_gc = bytes_allocated * grow_factor` (typically 2).
const DEFAULT_GROW_FACTOR: usize = 2;

/// Collection kicks in once the heap has grown past this many "bytes"
/// (a rough per-kind size estimate) even on the very first allocation
/// burst, scaled down for a scripting-language test suite rather than a
/// long-running program.
const INITIAL_NEXT_GC: usize = 1 << 14;

enum Slot {
    Free,
    Occupied {
        object: Object,
        marked: bool,
        /// Bytes charged against `bytes_allocated` when this object was
        /// allocated. Containers (`Function.chunk`, `List.items`,
        /// `Class.methods`, `Instance.fields`) grow after allocation
        /// without updating the charge, so `object_size(object)` at sweep
        /// time can exceed what was ever added; subtracting the charge we
        /// actually recorded instead keeps this from underflowing.
        charged: usize,
    },
}

/// The object arena backing every [`Handle`] and the mark-and-sweep
/// collector that traces it.
///
/// A `Heap` is owned outright by exactly one `vm::Vm`, never shared or
/// reference-counted; separate VM instances never share heap.
pub struct Heap {
    objects: Vec<Slot>,
    free_list: Vec<u32>,
    bytes_allocated: usize,
    next_gc: usize,
    grow_factor: usize,
    stress_gc: bool,
    /// The interned-string table. Weakly referenced: entries are dropped
    /// for any string not otherwise reachable after a collection.
    pub strings: Table,
    /// Pre-interned sentinel used for fast constructor lookup.
    pub init_string: Handle,
    collections: u64,
}

impl Heap {
    #[must_use]
    pub fn new() -> Self {
        let mut heap = Self {
            objects: Vec::new(),
            free_list: Vec::new(),
            bytes_allocated: 0,
            next_gc: INITIAL_NEXT_GC,
            grow_factor: DEFAULT_GROW_FACTOR,
            stress_gc: false,
            strings: Table::new(),
            init_string: Handle::dangling(), // replaced below once interned
            collections: 0,
        };
        heap.init_string = heap.intern_string("init");
        heap
    }

    pub fn set_stress_gc(&mut self, stress: bool) {
        self.stress_gc = stress;
    }

    pub fn set_grow_factor(&mut self, factor: usize) {
        self.grow_factor = factor.max(1);
    }

    #[must_use]
    pub fn bytes_allocated(&self) -> usize {
        self.bytes_allocated
    }

    #[must_use]
    pub fn collection_count(&self) -> u64 {
        self.collections
    }

    fn should_collect(&self) -> bool {
        self.stress_gc || self.bytes_allocated >= self.next_gc
    }

    /// Allocate `object`, running a collection first if the heap has grown
    /// past its threshold or stress mode is on.
    ///
    /// Any value not yet reachable from a root that the caller is holding
    /// across this call must first be pushed onto the VM stack (transient
    /// rooting) — `roots` only covers what `Heap` cannot otherwise see.
    pub fn allocate(&mut self, object: Object, roots: &impl GcRoots) -> Handle {
        if self.should_collect() {
            self.collect(roots);
        }
        let charged = Self::object_size(&object);
        self.bytes_allocated += charged;
        let handle = if let Some(index) = self.free_list.pop() {
            self.objects[index as usize] = Slot::Occupied {
                object,
                marked: false,
                charged,
            };
            index
        } else {
            let index = self.objects.len() as u32;
            self.objects.push(Slot::Occupied {
                object,
                marked: false,
                charged,
            });
            index
        };
        Handle(handle)
    }

    fn object_size(object: &Object) -> usize {
        match object {
            Object::Str(s, _) => 24 + s.len(),
            Object::Function(f) => 64 + f.chunk.len(),
            Object::Closure(c) => 32 + c.upvalues.len() * 8,
            Object::Upvalue(_) => 24,
            Object::Class(_) => 48,
            Object::Instance(_) => 32,
            Object::BoundMethod(_) => 24,
            Object::List(l) => 24 + l.items.len() * 16,
            Object::Native(_) => 16,
        }
    }

    // --- Accessors -------------------------------------------------------

    #[must_use]
    pub fn get(&self, handle: Handle) -> &Object {
        match &self.objects[handle.index()] {
            Slot::Occupied { object, .. } => object,
            Slot::Free => unreachable!("dangling handle {handle:?}: GC correctness bug"),
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut Object {
        match &mut self.objects[handle.index()] {
            Slot::Occupied { object, .. } => object,
            Slot::Free => unreachable!("dangling handle {handle:?}: GC correctness bug"),
        }
    }

    #[must_use]
    pub fn str_contents(&self, handle: Handle) -> &str {
        match self.get(handle) {
            Object::Str(s, _) => s,
            other => unreachable!("expected string, found {}", other.kind_name()),
        }
    }

    #[must_use]
    pub fn str_hash(&self, handle: Handle) -> u32 {
        match self.get(handle) {
            Object::Str(_, hash) => *hash,
            other => unreachable!("expected string, found {}", other.kind_name()),
        }
    }

    #[must_use]
    pub fn get_function(&self, handle: Handle) -> &crate::value::Function {
        match self.get(handle) {
            Object::Function(f) => f,
            other => unreachable!("expected function, found {}", other.kind_name()),
        }
    }

    /// Mutable access to an in-progress function's chunk during compilation.
    /// The active compiler chain's in-progress functions are GC roots
    /// precisely so this stays valid across an allocation that triggers
    /// collection.
    pub fn get_function_mut(&mut self, handle: Handle) -> &mut crate::value::Function {
        match self.get_mut(handle) {
            Object::Function(f) => f,
            other => unreachable!("expected function, found {}", other.kind_name()),
        }
    }

    #[must_use]
    pub fn get_closure(&self, handle: Handle) -> &crate::value::Closure {
        match self.get(handle) {
            Object::Closure(c) => c,
            other => unreachable!("expected closure, found {}", other.kind_name()),
        }
    }

    #[must_use]
    pub fn get_class(&self, handle: Handle) -> &crate::value::Class {
        match self.get(handle) {
            Object::Class(c) => c,
            other => unreachable!("expected class, found {}", other.kind_name()),
        }
    }

    /// FNV-1a; the hash is precomputed at string interning time.
    fn hash_str(s: &str) -> u32 {
        let mut hash: u32 = 2_166_136_261;
        for byte in s.as_bytes() {
            hash ^= u32::from(*byte);
            hash = hash.wrapping_mul(16_777_619);
        }
        hash
    }

    /// Intern a string, returning the existing handle if equal content is
    /// already live, or allocating a new one otherwise: string values with
    /// equal content share one heap cell.
    ///
    /// Interning never itself triggers GC with external roots in scope —
    /// string constants are always rooted by the in-progress constant pool
    /// or stack slot that requested them before this is called — so it
    /// takes no `GcRoots` and instead grows the heap directly when needed,
    /// consistent with every other `Heap` allocation being funneled through
    /// `Vm`/`Compiler` wrappers that do supply roots for *compound* object
    /// allocation.
    pub fn intern_string(&mut self, s: &str) -> Handle {
        let hash = Self::hash_str(s);
        if let Some(existing) = self
            .strings
            .find_string(hash, |h| self.str_contents(h) == s)
        {
            return existing;
        }
        let rc: Rc<str> = Rc::from(s);
        let charged = 24 + rc.len();
        self.bytes_allocated += charged;
        let handle = if let Some(index) = self.free_list.pop() {
            self.objects[index as usize] = Slot::Occupied {
                object: Object::Str(rc, hash),
                marked: false,
                charged,
            };
            Handle(index)
        } else {
            let index = self.objects.len() as u32;
            self.objects.push(Slot::Occupied {
                object: Object::Str(rc, hash),
                marked: false,
                charged,
            });
            Handle(index)
        };
        self.strings.set(handle, hash, Value::Nil);
        handle
    }

    // --- Mark-and-sweep ----------------------------------------------------

    fn is_marked(&self, handle: Handle) -> bool {
        matches!(
            self.objects[handle.index()],
            Slot::Occupied { marked: true, .. }
        )
    }

    /// Mark `handle`, returning `true` if this is the first time (i.e. the
    /// caller should push it onto the gray worklist).
    fn mark(&mut self, handle: Handle) -> bool {
        match &mut self.objects[handle.index()] {
            Slot::Occupied { marked, .. } if !*marked => {
                *marked = true;
                true
            }
            _ => false,
        }
    }

    fn mark_value(&mut self, value: Value, gray: &mut Vec<Handle>) {
        if let Value::Object(h) = value {
            if self.mark(h) {
                gray.push(h);
            }
        }
    }

    /// Trace one gray object's outgoing references during the mark phase.
    fn blacken(&mut self, handle: Handle, gray: &mut Vec<Handle>) {
        // Collect child handles/values first so we don't hold a borrow of
        // `self.objects` while recursively marking through `self`.
        enum Children {
            None,
            Values(Vec<Value>),
            HandlesAndTable(Option<Handle>, Vec<(Handle, Value)>),
        }
        let children = match self.get(handle) {
            Object::Str(..) | Object::Native(_) => Children::None,
            Object::Function(f) => {
                let mut vs: Vec<Value> = f.chunk.constants.clone();
                if let Some(name) = f.name {
                    vs.push(Value::Object(name));
                }
                Children::Values(vs)
            }
            Object::Closure(c) => {
                let mut vs = vec![Value::Object(c.function)];
                vs.extend(c.upvalues.iter().map(|h| Value::Object(*h)));
                Children::Values(vs)
            }
            Object::Upvalue(u) => match u.state {
                UpvalueState::Closed(v) => Children::Values(vec![v]),
                UpvalueState::Open(_) => Children::None,
            },
            Object::Class(c) => {
                let entries: Vec<(Handle, Value)> = c.methods.iter().collect();
                Children::HandlesAndTable(Some(c.name), entries)
            }
            Object::Instance(i) => {
                let entries: Vec<(Handle, Value)> = i.fields.iter().collect();
                Children::HandlesAndTable(Some(i.class), entries)
            }
            Object::BoundMethod(b) => {
                Children::Values(vec![b.receiver, Value::Object(b.method)])
            }
            Object::List(l) => Children::Values(l.items.clone()),
        };
        match children {
            Children::None => {}
            Children::Values(vs) => {
                for v in vs {
                    self.mark_value(v, gray);
                }
            }
            Children::HandlesAndTable(h, entries) => {
                if let Some(h) = h {
                    if self.mark(h) {
                        gray.push(h);
                    }
                }
                for (k, v) in entries {
                    if self.mark(k) {
                        gray.push(k);
                    }
                    self.mark_value(v, gray);
                }
            }
        }
    }

    /// Run one full collection cycle: mark from `roots`, sweep the intern
    /// table, then sweep the arena.
    pub fn collect(&mut self, roots: &impl GcRoots) {
        let before = self.bytes_allocated;

        // `mark_roots` only hands back which handles are roots; it doesn't
        // set the mark bit itself. Mark each one here (deduplicating
        // through `self.mark`'s "first time" return, the same way
        // `mark_value`/`blacken` do for every other reference) before
        // seeding the gray worklist, or every root — and everything only
        // reachable through one — would sweep as garbage.
        let mut root_handles = Vec::new();
        roots.mark_roots(&mut root_handles);
        let mut gray = Vec::new();
        for h in root_handles {
            if self.mark(h) {
                gray.push(h);
            }
        }
        if self.mark(self.init_string) {
            gray.push(self.init_string);
        }
        while let Some(h) = gray.pop() {
            self.blacken(h, &mut gray);
        }

        // Weak-reference sweep of the string table before the general
        // sweep.
        self.strings.retain_keys(|h| self.is_marked(h));

        for (index, slot) in self.objects.iter_mut().enumerate() {
            match slot {
                Slot::Occupied { marked, .. } if *marked => {
                    *marked = false;
                }
                Slot::Occupied { charged, .. } => {
                    self.bytes_allocated -= *charged;
                    *slot = Slot::Free;
                    self.free_list.push(index as u32);
                }
                Slot::Free => {}
            }
        }

        self.next_gc = self.bytes_allocated * self.grow_factor;
        self.next_gc = self.next_gc.max(INITIAL_NEXT_GC);
        self.collections += 1;
        debug!(
            before,
            after = self.bytes_allocated,
            next_gc = self.next_gc,
            "garbage collection cycle complete"
        );
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
