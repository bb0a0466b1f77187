/// Per-function compilation state: locals, upvalues and lexical scopes.
use arrayvec::ArrayVec;
use loxide_core::chunk::Chunk;
use loxide_core::gc::{FnRef, GcRoots};
use loxide_core::value::Value;
use thiserror::Error;

/// Maximum locals (including the reserved slot 0) and upvalues per function.
pub const MAX_SLOTS: usize = 256;

/// Static errors found while declaring or resolving variables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum ScopeError {
    #[error("Already a variable with this name in this scope.")]
    AlreadyDeclared,
    #[error("Too many local variables in function.")]
    TooManyLocals,
    #[error("Too many closure variables in function.")]
    TooManyUpvalues,
    #[error("Can't read local variable in its own initializer.")]
    OwnInitializer,
}

/// A local variable occupying a stack slot.
#[derive(Clone, Copy, Debug)]
pub struct Local<'src> {
    pub name: &'src str,
    /// Scope depth, or `None` while the initializer is being compiled.
    pub depth: Option<usize>,
    /// Whether a nested function captures this local.
    pub is_captured: bool,
}

/// How a closure obtains one captured variable when it is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Upvalue {
    /// Local slot in the enclosing function if `is_local`, otherwise an index
    /// into the enclosing function's own upvalues.
    pub index: u8,
    pub is_local: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    Script,
    Function,
}

/// State for a single function being compiled.
pub struct FunctionState<'src> {
    /// Heap object receiving the chunk when compilation finishes.
    pub function: FnRef,
    pub kind: FunctionKind,
    pub chunk: Chunk,
    pub arity: usize,
    pub locals: ArrayVec<Local<'src>, MAX_SLOTS>,
    pub upvalues: ArrayVec<Upvalue, MAX_SLOTS>,
    pub scope_depth: usize,
}

impl<'src> FunctionState<'src> {
    pub fn new(function: FnRef, kind: FunctionKind) -> Self {
        let mut locals = ArrayVec::new();
        // Slot 0 holds the callee at runtime; its empty name can't be referenced.
        locals.push(Local {
            name: "",
            depth: Some(0),
            is_captured: false,
        });
        FunctionState {
            function,
            kind,
            chunk: Chunk::new(),
            arity: 0,
            locals,
            upvalues: ArrayVec::new(),
            scope_depth: 0,
        }
    }

    // ---- Scopes ----

    pub fn begin_scope(&mut self) {
        self.scope_depth += 1;
    }

    /// Leave the innermost scope. Returns the captured flags of the locals it
    /// owned, innermost first; each needs a `CloseUpvalue` or `Pop`.
    pub fn end_scope(&mut self) -> Vec<bool> {
        self.scope_depth -= 1;
        let mut popped = Vec::new();
        while let Some(local) = self.locals.last() {
            if local.depth.is_some_and(|depth| depth <= self.scope_depth) {
                break;
            }
            popped.push(local.is_captured);
            self.locals.pop();
        }
        popped
    }

    // ---- Locals ----

    /// Declare a local in the current scope, rejecting a same-scope duplicate.
    pub fn declare_local(&mut self, name: &'src str) -> Result<(), ScopeError> {
        for local in self.locals.iter().rev() {
            if local.depth.is_some_and(|depth| depth < self.scope_depth) {
                break;
            }
            if local.name == name {
                return Err(ScopeError::AlreadyDeclared);
            }
        }
        self.add_local(name)
    }

    pub fn add_local(&mut self, name: &'src str) -> Result<(), ScopeError> {
        self.locals
            .try_push(Local {
                name,
                depth: None,
                is_captured: false,
            })
            .map_err(|_| ScopeError::TooManyLocals)
    }

    /// Make the most recent local readable. No-op for globals.
    pub fn mark_initialized(&mut self) {
        if self.scope_depth == 0 {
            return;
        }
        let depth = self.scope_depth;
        if let Some(local) = self.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    /// Slot of the innermost local named `name`.
    pub fn resolve_local(&self, name: &str) -> Result<Option<u8>, ScopeError> {
        match self.locals.iter().rposition(|local| local.name == name) {
            Some(slot) if self.locals[slot].depth.is_none() => Err(ScopeError::OwnInitializer),
            Some(slot) => Ok(Some(slot as u8)),
            None => Ok(None),
        }
    }

    // ---- Upvalues ----

    /// Record a capture, reusing an identical existing descriptor.
    pub fn add_upvalue(&mut self, index: u8, is_local: bool) -> Result<u8, ScopeError> {
        let upvalue = Upvalue { index, is_local };
        if let Some(existing) = self.upvalues.iter().position(|&u| u == upvalue) {
            return Ok(existing as u8);
        }
        self.upvalues
            .try_push(upvalue)
            .map_err(|_| ScopeError::TooManyUpvalues)?;
        Ok((self.upvalues.len() - 1) as u8)
    }
}

/// The chain of functions being compiled, innermost last.
pub struct FunctionStack<'src> {
    enclosing: Vec<FunctionState<'src>>,
    current: FunctionState<'src>,
}

impl<'src> FunctionStack<'src> {
    pub fn new(script: FunctionState<'src>) -> Self {
        FunctionStack {
            enclosing: Vec::new(),
            current: script,
        }
    }

    pub fn current(&self) -> &FunctionState<'src> {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut FunctionState<'src> {
        &mut self.current
    }

    /// Nesting level of the current function; the script is level 0.
    pub fn level(&self) -> usize {
        self.enclosing.len()
    }

    fn at(&self, level: usize) -> &FunctionState<'src> {
        if level == self.enclosing.len() {
            &self.current
        } else {
            &self.enclosing[level]
        }
    }

    fn at_mut(&mut self, level: usize) -> &mut FunctionState<'src> {
        if level == self.enclosing.len() {
            &mut self.current
        } else {
            &mut self.enclosing[level]
        }
    }

    /// Make `state` the current function, nested in the previous one.
    pub fn push(&mut self, state: FunctionState<'src>) {
        let parent = std::mem::replace(&mut self.current, state);
        self.enclosing.push(parent);
    }

    /// Finish the current function and return to its parent. `None` at the
    /// script level.
    pub fn pop(&mut self) -> Option<FunctionState<'src>> {
        let parent = self.enclosing.pop()?;
        Some(std::mem::replace(&mut self.current, parent))
    }

    /// Consume the stack, yielding the script's state.
    pub fn into_script(mut self) -> FunctionState<'src> {
        while self.pop().is_some() {}
        self.current
    }

    /// Resolve `name` as a variable captured from an enclosing function of
    /// the function at `level`, threading descriptors through every function
    /// in between.
    pub fn resolve_upvalue(&mut self, level: usize, name: &str) -> Result<Option<u8>, ScopeError> {
        if level == 0 {
            return Ok(None);
        }
        let parent = level - 1;
        if let Some(slot) = self.at(parent).resolve_local(name)? {
            self.at_mut(parent).locals[slot as usize].is_captured = true;
            return self.at_mut(level).add_upvalue(slot, true).map(Some);
        }
        if let Some(index) = self.resolve_upvalue(parent, name)? {
            return self.at_mut(level).add_upvalue(index, false).map(Some);
        }
        Ok(None)
    }
}

/// Every in-progress function and the constants already in its chunk.
impl GcRoots for FunctionStack<'_> {
    fn visit_roots(&self, visit: &mut dyn FnMut(Value)) {
        for state in self.enclosing.iter().chain(std::iter::once(&self.current)) {
            visit(Value::Function(state.function));
            for &constant in &state.chunk.constants {
                visit(constant);
            }
        }
    }
}
