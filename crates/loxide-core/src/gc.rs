//! GC heap with arena-based allocation and typed indices.
//!
//! Objects never move. A handle is an index into the arena for its type;
//! freed slots are recycled through a free list. Collection is
//! mark-and-sweep and is only ever triggered from an allocating call, which
//! receives the caller's live roots through [`GcRoots`].

use crate::object::Function;
use crate::string::{hash_str, LoxString};
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// A typed index into an arena in the [`Heap`].
pub struct GcIdx<T>(pub u32, pub PhantomData<T>);

impl<T> Clone for GcIdx<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for GcIdx<T> {}

impl<T> PartialEq for GcIdx<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}
impl<T> Eq for GcIdx<T> {}

impl<T> std::hash::Hash for GcIdx<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl<T> fmt::Debug for GcIdx<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GcIdx({})", self.0)
    }
}

impl<T> GcIdx<T> {
    pub fn index(self) -> u32 {
        self.0
    }
}

/// Handle to an interned string.
pub type StrRef = GcIdx<LoxString>;
/// Handle to a function object.
pub type FnRef = GcIdx<Function>;

/// Supplies the values a collection must treat as live.
///
/// Anything holding handles across an allocating call (the compiler's
/// in-progress functions, an interpreter's stack) implements this and passes
/// itself to [`Heap::intern`] / [`Heap::alloc_function`].
pub trait GcRoots {
    fn visit_roots(&self, visit: &mut dyn FnMut(Value));
}

/// No roots.
impl GcRoots for () {
    fn visit_roots(&self, _visit: &mut dyn FnMut(Value)) {}
}

impl GcRoots for Vec<Value> {
    fn visit_roots(&self, visit: &mut dyn FnMut(Value)) {
        for &value in self {
            visit(value);
        }
    }
}

impl<const N: usize> GcRoots for [Value; N] {
    fn visit_roots(&self, visit: &mut dyn FnMut(Value)) {
        for &value in self {
            visit(value);
        }
    }
}

/// Collection policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeapConfig {
    /// Collect before every allocation.
    pub stress: bool,
    /// Live-object count that triggers the first collection.
    pub initial_threshold: usize,
    /// After a collection the next threshold is `live * growth_factor`.
    pub growth_factor: usize,
}

impl Default for HeapConfig {
    fn default() -> Self {
        HeapConfig {
            stress: false,
            initial_threshold: 1024,
            growth_factor: 2,
        }
    }
}

// ---- Arena ----

struct Arena<T> {
    slots: Vec<Option<T>>,
    marks: Vec<bool>,
    free: Vec<u32>,
}

impl<T> Arena<T> {
    fn new() -> Self {
        Arena {
            slots: Vec::new(),
            marks: Vec::new(),
            free: Vec::new(),
        }
    }

    fn alloc(&mut self, value: T) -> GcIdx<T> {
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(value);
            GcIdx(idx, PhantomData)
        } else {
            let idx = self.slots.len() as u32;
            self.slots.push(Some(value));
            self.marks.push(false);
            GcIdx(idx, PhantomData)
        }
    }

    fn get(&self, idx: GcIdx<T>) -> Option<&T> {
        self.slots.get(idx.0 as usize).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, idx: GcIdx<T>) -> Option<&mut T> {
        self.slots.get_mut(idx.0 as usize).and_then(Option::as_mut)
    }

    /// Sets the mark bit; returns true if it was previously clear.
    fn mark(&mut self, idx: GcIdx<T>) -> bool {
        match self.marks.get_mut(idx.0 as usize) {
            Some(mark) if !*mark => {
                *mark = true;
                true
            }
            _ => false,
        }
    }

    fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Frees every unmarked live slot, handing it to `on_free`, and clears marks.
    fn sweep(&mut self, mut on_free: impl FnMut(u32, T)) -> usize {
        let mut freed = 0;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if std::mem::take(&mut self.marks[idx]) {
                continue;
            }
            if let Some(value) = slot.take() {
                self.free.push(idx as u32);
                on_free(idx as u32, value);
                freed += 1;
            }
        }
        freed
    }
}

// ---- Heap ----

/// Arena-based GC heap holding strings and functions.
pub struct Heap {
    strings: Arena<LoxString>,
    functions: Arena<Function>,
    /// Intern table: hash -> string slots with that hash.
    string_lookup: HashMap<u32, Vec<u32>>,
    config: HeapConfig,
    next_gc: usize,
    collections: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self::with_config(HeapConfig::default())
    }

    pub fn with_config(config: HeapConfig) -> Self {
        Heap {
            strings: Arena::new(),
            functions: Arena::new(),
            string_lookup: HashMap::new(),
            config,
            next_gc: config.initial_threshold,
            collections: 0,
        }
    }

    pub fn config(&self) -> &HeapConfig {
        &self.config
    }

    // ---- Allocation ----

    /// Intern a string, returning the existing handle when the contents are
    /// already present. Only a fresh allocation can trigger a collection.
    pub fn intern(&mut self, chars: &str, roots: &dyn GcRoots) -> StrRef {
        let hash = hash_str(chars);
        if let Some(existing) = self.find_interned(chars, hash) {
            return existing;
        }
        self.maybe_collect(roots);
        let idx = self.strings.alloc(LoxString::new(chars));
        self.string_lookup.entry(hash).or_default().push(idx.0);
        idx
    }

    /// Allocate an empty function object.
    pub fn alloc_function(&mut self, roots: &dyn GcRoots) -> FnRef {
        self.maybe_collect(roots);
        self.functions.alloc(Function::new())
    }

    /// Look up an interned string without allocating.
    pub fn lookup(&self, chars: &str) -> Option<StrRef> {
        self.find_interned(chars, hash_str(chars))
    }

    fn find_interned(&self, chars: &str, hash: u32) -> Option<StrRef> {
        let bucket = self.string_lookup.get(&hash)?;
        bucket
            .iter()
            .map(|&idx| GcIdx(idx, PhantomData))
            .find(|&idx| self.strings.get(idx).is_some_and(|s| s.as_str() == chars))
    }

    // ---- Access ----

    pub fn string(&self, idx: StrRef) -> &LoxString {
        self.strings.get(idx).expect("string was freed")
    }

    pub fn str(&self, idx: StrRef) -> &str {
        self.string(idx).as_str()
    }

    pub fn function(&self, idx: FnRef) -> &Function {
        self.functions.get(idx).expect("function was freed")
    }

    pub fn function_mut(&mut self, idx: FnRef) -> &mut Function {
        self.functions.get_mut(idx).expect("function was freed")
    }

    /// Whether the handle still refers to a live string.
    pub fn contains_string(&self, idx: StrRef) -> bool {
        self.strings.get(idx).is_some()
    }

    /// Whether the handle still refers to a live function.
    pub fn contains_function(&self, idx: FnRef) -> bool {
        self.functions.get(idx).is_some()
    }

    /// Number of live objects across all arenas.
    pub fn live_objects(&self) -> usize {
        self.strings.live() + self.functions.live()
    }

    /// Number of completed collection cycles.
    pub fn collections(&self) -> usize {
        self.collections
    }

    // ---- Collection ----

    fn maybe_collect(&mut self, roots: &dyn GcRoots) {
        if self.config.stress || self.live_objects() >= self.next_gc {
            self.collect(roots);
        }
    }

    /// Run a full mark-and-sweep cycle. Returns the number of objects freed.
    pub fn collect(&mut self, roots: &dyn GcRoots) -> usize {
        let mut gray: Vec<Value> = Vec::new();
        roots.visit_roots(&mut |value| gray.push(value));

        while let Some(value) = gray.pop() {
            match value {
                Value::Str(s) => {
                    self.strings.mark(s);
                }
                Value::Function(f) => {
                    if !self.functions.mark(f) {
                        continue;
                    }
                    if let Some(func) = self.functions.get(f) {
                        if let Some(name) = func.name {
                            gray.push(Value::Str(name));
                        }
                        gray.extend(func.chunk.constants.iter().copied().filter(|v| v.is_object()));
                    }
                }
                Value::Nil | Value::Bool(_) | Value::Number(_) => {}
            }
        }

        let lookup = &mut self.string_lookup;
        let mut freed = self.strings.sweep(|idx, s| {
            if let Some(bucket) = lookup.get_mut(&s.hash()) {
                bucket.retain(|&i| i != idx);
                if bucket.is_empty() {
                    lookup.remove(&s.hash());
                }
            }
        });
        freed += self.functions.sweep(|_, _| {});

        let live = self.live_objects();
        self.next_gc = (live * self.config.growth_factor).max(self.config.initial_threshold);
        self.collections += 1;
        tracing::debug!(freed, live, next_gc = self.next_gc, "gc cycle");
        freed
    }
}
