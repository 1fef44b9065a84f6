//! Event tree walker.
//!
//! Depth-first, pre-order, left-to-right lowering of the authored tree into
//! a [`Program`]. Per executable event:
//!
//! ```text
//! Enter → control prelude → PushScope → declare locals
//!       → BindConditions → BindActions → Recurse → PopScope → Exit
//! ```
//!
//! The control prelude (repeat count, for-each object) is bound in the
//! enclosing scope. Locals and the loop index are declared before the
//! event's own conditions, so both are visible to them.

use std::collections::HashSet;

use evgen_types::event::{Event, EventKind, EventList, Instruction};
use evgen_types::ir::{
    ActionEffect, BoundCondition, ConditionTest, Control, LocalSlot, LoweredEvent, Program,
    SlotId, Target, TypedExpr, ValueType,
};
use evgen_types::{Diagnostic, Diagnostics, ErrorCode, EventPath, Location, Site, Variable};
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::checker::Binder;
use crate::options::{CancellationToken, CompileOptions};
use crate::registry::{ObjectRef, ObjectRegistry};
use crate::scope::ScopeStack;

/// Why a walk stopped before reaching the end of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Abort {
    Cancelled,
    MaxDepth,
}

pub(crate) struct WalkOutcome {
    pub(crate) program: Program,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) aborted: Option<Abort>,
}

/// An open loop event, innermost last.
struct LoopFrame {
    event_id: u32,
    /// A stop-loop action targets this loop.
    stopped: bool,
}

/// Loop-specific parts bound before the event's scope is opened.
enum Prelude {
    Plain,
    Repeat(TypedExpr),
    While,
    ForEach(String),
}

pub(crate) struct Walker<'a> {
    catalog: &'a Catalog,
    registry: &'a ObjectRegistry,
    options: &'a CompileOptions,
    cancellation: Option<&'a CancellationToken>,
    scope: ScopeStack,
    diagnostics: Diagnostics,
    loops: Vec<LoopFrame>,
    visited: HashSet<usize>,
    next_id: u32,
}

impl<'a> Walker<'a> {
    pub(crate) fn new(
        catalog: &'a Catalog,
        registry: &'a ObjectRegistry,
        options: &'a CompileOptions,
        scope: ScopeStack,
        cancellation: Option<&'a CancellationToken>,
    ) -> Self {
        Self {
            catalog,
            registry,
            options,
            cancellation,
            scope,
            diagnostics: Diagnostics::empty(),
            loops: Vec::new(),
            visited: HashSet::new(),
            next_id: 0,
        }
    }

    pub(crate) fn walk(mut self, events: &EventList) -> WalkOutcome {
        let root = EventPath::root();
        match self.walk_list(events.as_slice(), &root, 1) {
            Ok(events) => WalkOutcome {
                program: Program { events },
                diagnostics: self.diagnostics,
                aborted: None,
            },
            Err(abort) => WalkOutcome {
                program: Program::default(),
                diagnostics: self.diagnostics,
                aborted: Some(abort),
            },
        }
    }

    fn binder(&mut self) -> Binder<'_> {
        Binder {
            catalog: self.catalog,
            registry: self.registry,
            scope: &self.scope,
            backends: &self.options.backends,
            diagnostics: &mut self.diagnostics,
        }
    }

    fn walk_list(
        &mut self,
        events: &[Event],
        parent: &EventPath,
        depth: usize,
    ) -> Result<Vec<LoweredEvent>, Abort> {
        let mut lowered = Vec::new();
        for (index, event) in events.iter().enumerate() {
            if let Some(event) = self.walk_event(event, parent.child(index), depth)? {
                lowered.push(event);
            }
        }
        Ok(lowered)
    }

    fn walk_event(
        &mut self,
        event: &Event,
        path: EventPath,
        depth: usize,
    ) -> Result<Option<LoweredEvent>, Abort> {
        // ── Enter ──
        if self.cancellation.is_some_and(CancellationToken::is_cancelled) {
            warn!(target: "walker", path = %path, "compilation cancelled");
            return Err(Abort::Cancelled);
        }
        if !event.is_executable() {
            return Ok(None);
        }
        if depth > self.options.max_depth {
            let diagnostic = Diagnostic::new(
                ErrorCode::MAX_DEPTH_EXCEEDED,
                format!(
                    "event nesting exceeds the maximum depth of {}",
                    self.options.max_depth
                ),
                Location::event(path.clone()),
            )
            .with_suggestion("Flatten the sub-events or raise max_depth");
            self.diagnostics.push(diagnostic);
            warn!(
                target: "walker",
                path = %path,
                max_depth = self.options.max_depth,
                "maximum event depth exceeded"
            );
            return Err(Abort::MaxDepth);
        }
        let identity = event as *const Event as usize;
        if !self.visited.insert(identity) {
            warn!(target: "walker", path = %path, "event already lowered, skipping alias");
            return Ok(None);
        }

        let id = self.next_id;
        self.next_id += 1;
        debug!(target: "walker", id, path = %path, kind = event.kind_name(), "enter event");

        let prelude = match &event.kind {
            EventKind::Standard(_) => Prelude::Plain,
            EventKind::Repeat(repeat) => {
                let location = Location::new(path.clone(), Site::RepeatCount);
                let count = self.binder().check_source(
                    &repeat.repeat_expression,
                    ValueType::Number,
                    &location,
                );
                Prelude::Repeat(count)
            }
            EventKind::While(_) => Prelude::While,
            EventKind::ForEach(for_each) => {
                match self.bind_for_each_object(&for_each.object, &path) {
                    Some(object) => Prelude::ForEach(object),
                    None => return Ok(None),
                }
            }
            EventKind::Comment(_) => return Ok(None),
        };

        self.scope.push_scope();
        let (locals, index) = self.declare_locals(event, &path);
        if event.is_loop() {
            self.loops.push(LoopFrame {
                event_id: id,
                stopped: false,
            });
        }

        let mut control = match prelude {
            Prelude::Plain => Control::Plain,
            Prelude::Repeat(count) => Control::Repeat {
                count,
                index,
                stoppable: false,
            },
            Prelude::While => {
                let (conditions, iteration_limit) = match &event.kind {
                    EventKind::While(w) => (
                        self.bind_while_conditions(&w.while_conditions, &path),
                        w.infinite_loop_warning
                            .then_some(self.options.while_iteration_limit),
                    ),
                    _ => (Vec::new(), None),
                };
                Control::While {
                    conditions,
                    index,
                    iteration_limit,
                    stoppable: false,
                }
            }
            Prelude::ForEach(object) => Control::ForEach {
                object,
                index,
                stoppable: false,
            },
        };

        // ── BindConditions ──
        let mut conditions = Vec::new();
        for (i, instruction) in event.conditions().iter().enumerate() {
            let location = Location::condition(path.clone(), i);
            if let Some(bound) = self.binder().bind_condition(instruction, location) {
                conditions.push(bound);
            }
        }

        // ── BindActions ──
        let mut actions = Vec::new();
        for (i, instruction) in event.actions().iter().enumerate() {
            let location = Location::action(path.clone(), i);
            let innermost_loop = self.loops.last().map(|frame| frame.event_id);
            let Some(bound) = self
                .binder()
                .bind_action(instruction, location, innermost_loop)
            else {
                continue;
            };
            if let ActionEffect::StopLoop { loop_event } = bound.effect {
                if let Some(frame) = self.loops.iter_mut().find(|f| f.event_id == loop_event) {
                    frame.stopped = true;
                }
            }
            actions.push(bound);
        }

        // ── Recurse ──
        let children = self.walk_list(event.sub_events(), &path, depth + 1)?;

        // ── Exit ──
        if event.is_loop() {
            let stopped = self.loops.pop().is_some_and(|frame| frame.stopped);
            set_stoppable(&mut control, stopped);
        }
        self.scope.pop_scope();
        debug!(
            target: "walker",
            id,
            conditions = conditions.len(),
            actions = actions.len(),
            children = children.len(),
            "exit event"
        );

        Ok(Some(LoweredEvent {
            id,
            path,
            locals,
            control,
            conditions,
            actions,
            children,
        }))
    }

    /// Declare the loop index and the event's locals in the freshly pushed
    /// scope.
    fn declare_locals(
        &mut self,
        event: &Event,
        path: &EventPath,
    ) -> (Vec<LocalSlot>, Option<SlotId>) {
        let mut locals = Vec::new();
        let index_name = event.loop_index_variable();
        let index = index_name.map(|name| {
            let declared = self.scope.declare_loop_index(name, Variable::Number(0.0));
            locals.push(LocalSlot {
                slot: declared.slot,
                name: name.to_string(),
                initial: Variable::Number(0.0),
                loop_index: true,
            });
            declared.slot
        });

        for variable in event.variables().iter() {
            // A local named like the event's own index is the index itself.
            if index_name == Some(variable.name.as_str()) {
                continue;
            }
            let declared = self
                .scope
                .declare_local(&variable.name, variable.variable.clone());
            if declared.shadows_loop_index {
                let diagnostic = Diagnostic::new(
                    ErrorCode::LOOP_INDEX_SHADOWED,
                    format!(
                        "local variable '{}' shadows the index of an enclosing loop",
                        variable.name
                    ),
                    Location::new(
                        path.clone(),
                        Site::Variable {
                            name: variable.name.clone(),
                        },
                    ),
                )
                .with_suggestion("Rename the variable or the loop index");
                self.diagnostics.push(diagnostic);
            }
            locals.push(LocalSlot {
                slot: declared.slot,
                name: variable.name.clone(),
                initial: variable.variable.clone(),
                loop_index: false,
            });
        }
        (locals, index)
    }

    /// Bind while conditions. One that fails to bind is replaced by a
    /// constant `false`, so the loop body never runs.
    fn bind_while_conditions(
        &mut self,
        instructions: &[Instruction],
        path: &EventPath,
    ) -> Vec<BoundCondition> {
        instructions
            .iter()
            .enumerate()
            .map(|(i, instruction)| {
                let site = Site::WhileCondition { index: i as u32 };
                let location = Location::new(path.clone(), site);
                self.binder()
                    .bind_condition(instruction, location.clone())
                    .unwrap_or_else(|| BoundCondition {
                        name: instruction.name().to_string(),
                        location,
                        inverted: false,
                        target: Target::Free,
                        test: ConditionTest::Constant(false),
                    })
            })
            .collect()
    }

    fn bind_for_each_object(&mut self, raw: &str, path: &EventPath) -> Option<String> {
        let name = raw.trim();
        let location = Location::new(path.clone(), Site::ForEachObject);
        match self.registry.lookup(name) {
            Some(ObjectRef::Object(_)) => Some(name.to_string()),
            Some(ObjectRef::Group(_)) => {
                let diagnostic = Diagnostic::new(
                    ErrorCode::TYPE_MISMATCH,
                    format!("for-each cannot iterate over group '{name}'"),
                    location,
                )
                .with_suggestion("Iterate over one of the group's objects");
                self.diagnostics.push(diagnostic);
                None
            }
            None => {
                self.diagnostics.push(Diagnostic::new(
                    ErrorCode::UNKNOWN_SYMBOL,
                    format!("unknown object '{name}'"),
                    location,
                ));
                None
            }
        }
    }
}

fn set_stoppable(control: &mut Control, stopped: bool) {
    match control {
        Control::Plain => {}
        Control::Repeat { stoppable, .. }
        | Control::While { stoppable, .. }
        | Control::ForEach { stoppable, .. } => *stoppable = stopped,
    }
}
