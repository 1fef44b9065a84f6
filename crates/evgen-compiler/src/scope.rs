//! Scope & variable manager.
//!
//! [`ScopeStack`] holds the global container at the bottom and one
//! container per executable event above it. Name resolution walks from the
//! innermost scope outwards. Every local binding gets a fresh [`SlotId`], so
//! two bindings with the same name in different scopes never collide in
//! generated code.

use evgen_types::ir::SlotId;
use evgen_types::{Variable, VariablesContainer};

// ══════════════════════════════════════════════════════════════════════════════
// Binding
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Declared in the global container.
    Global,
    /// Declared by an event's local variables.
    Local,
    /// The index variable of a loop event.
    LoopIndex,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// `None` for globals, which are addressed by name.
    pub slot: Option<SlotId>,
    /// Initial value; gives the static type of the variable and its
    /// structure children.
    pub initial: Variable,
}

/// Outcome of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declared {
    pub slot: SlotId,
    /// The declaration hides or overwrites an active loop index.
    pub shadows_loop_index: bool,
}

// ══════════════════════════════════════════════════════════════════════════════
// ScopeStack
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct ScopeStack {
    /// `scopes[0]` is the global scope.
    scopes: Vec<Vec<Binding>>,
    next_slot: u32,
}

impl ScopeStack {
    pub fn new(globals: &VariablesContainer) -> Self {
        let bindings = globals
            .iter()
            .map(|v| Binding {
                name: v.name.clone(),
                kind: BindingKind::Global,
                slot: None,
                initial: v.variable.clone(),
            })
            .collect();
        Self {
            scopes: vec![bindings],
            next_slot: 0,
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the global scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Number of event scopes currently open.
    pub fn depth(&self) -> usize {
        self.scopes.len() - 1
    }

    /// Declare an event-local variable in the innermost scope.
    ///
    /// Redeclaring a name in the same scope overwrites the earlier binding.
    /// Declaring over an active loop index is reported through
    /// [`Declared::shadows_loop_index`].
    pub fn declare_local(&mut self, name: &str, initial: Variable) -> Declared {
        let shadows_loop_index = self
            .resolve_local(name)
            .is_some_and(|b| b.kind == BindingKind::LoopIndex);
        let slot = self.insert(name, BindingKind::Local, initial);
        Declared {
            slot,
            shadows_loop_index,
        }
    }

    /// Declare a loop index in the innermost scope. An inner loop reusing an
    /// outer loop's index name simply shadows it.
    pub fn declare_loop_index(&mut self, name: &str, initial: Variable) -> Declared {
        let slot = self.insert(name, BindingKind::LoopIndex, initial);
        Declared {
            slot,
            shadows_loop_index: false,
        }
    }

    fn insert(&mut self, name: &str, kind: BindingKind, initial: Variable) -> SlotId {
        let slot = SlotId(self.next_slot);
        self.next_slot += 1;
        let binding = Binding {
            name: name.to_string(),
            kind,
            slot: Some(slot),
            initial,
        };
        // Always at least the global scope.
        let top = self.scopes.len() - 1;
        let scope = &mut self.scopes[top];
        match scope.iter_mut().find(|b| b.name == name) {
            Some(existing) => *existing = binding,
            None => scope.push(binding),
        }
        slot
    }

    /// Resolve a name, innermost scope first, globals last.
    pub fn resolve(&self, name: &str) -> Option<&Binding> {
        self.resolve_local(name).or_else(|| self.resolve_global(name))
    }

    /// Resolve among event scopes only.
    pub fn resolve_local(&self, name: &str) -> Option<&Binding> {
        self.scopes[1..]
            .iter()
            .rev()
            .find_map(|scope| scope.iter().find(|b| b.name == name))
    }

    pub fn resolve_global(&self, name: &str) -> Option<&Binding> {
        self.scopes[0].iter().find(|b| b.name == name)
    }
}
