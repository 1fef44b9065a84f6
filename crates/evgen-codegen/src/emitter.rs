//! Generic event emitter.
//!
//! Emission of one event:
//! 1. declare the event's local variable slots
//! 2. open the control construct (repeat / while / for-each), if any
//! 3. copy the parent's picked lists for every object the subtree uses
//! 4. evaluate the conditions in order into the event flag `c<id>`; each
//!    condition runs only while the flag still holds
//! 5. under the flag: run the actions, then the sub-events
//!
//! Generated names are derived from event ids, which are unique within a
//! program, so nested events never collide:
//!
//! | Name | Meaning |
//! |------|---------|
//! | `o<k>_r` | all instances of object `k` (root lists) |
//! | `o<k>_<id>` | picked instances of object `k` in event `id` |
//! | `c<id>` | condition flag |
//! | `n<id>` / `i<id>` | repeat count / loop counter |
//! | `s<id>` | stop flag of a loop targeted by a stop-loop action |
//! | `w<id>` | while-condition flag |
//! | `e<id>` | for-each snapshot |
//! | `v<n>` | local variable slot |

use std::collections::{BTreeMap, BTreeSet, HashMap};

use evgen_types::ir::{
    ActionEffect, Arg, AssignOp, BoundAction, BoundCondition, ConditionTest, Control,
    ExprTarget, LoweredEvent, Program, SlotId, Target, TypedExpr, TypedExprKind, ValueType,
    VarRef, VarRoot,
};
use evgen_types::BackendSymbols;
use tracing::debug;

use crate::dialect::{Dialect, INSTANCE};
use crate::error::{CodegenError, CodegenResult};
use crate::source_map::SourceMap;
use crate::writer::CodeWriter;

/// Which picked lists are in scope.
#[derive(Debug, Clone, Copy)]
enum Frame {
    Root,
    Event(u32),
}

/// The instance an instruction is currently acting on.
#[derive(Debug, Clone, Copy)]
struct Current<'p> {
    object: &'p str,
    automatism: Option<&'p str>,
}

pub(crate) struct Emitter<'a> {
    program: &'a Program,
    dialect: &'a dyn Dialect,
    writer: CodeWriter,
    source_map: SourceMap,
    /// Objects referenced anywhere in each event's subtree.
    used: HashMap<u32, BTreeSet<String>>,
    /// Stable index of every referenced object, for list names.
    object_ids: BTreeMap<String, usize>,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(program: &'a Program, dialect: &'a dyn Dialect) -> Self {
        Self {
            program,
            dialect,
            writer: CodeWriter::new(),
            source_map: SourceMap::new(),
            used: HashMap::new(),
            object_ids: BTreeMap::new(),
        }
    }

    /// Emit the whole program inside the entry function.
    pub(crate) fn run(mut self, entry_point: &str) -> CodegenResult<(String, SourceMap)> {
        let dialect = self.dialect;
        let program = self.program;

        let mut all_objects = BTreeSet::new();
        for event in &program.events {
            all_objects.extend(self.collect_used(event));
        }
        self.object_ids = all_objects
            .iter()
            .enumerate()
            .map(|(k, name)| (name.clone(), k))
            .collect();

        self.writer.line(dialect.comment("Generated by evgen. Do not edit."));
        let mut prologue = dialect.prologue(entry_point);
        let header = prologue.pop().unwrap_or_default();
        for line in prologue {
            self.writer.line(line);
        }
        self.writer.open(header);

        for object in &all_objects {
            let list = self.list_name(object, Frame::Root)?;
            self.writer
                .line(dialect.comment(&format!("{list}: {object}")));
            self.writer
                .line(dialect.declare_list(&list, &dialect.scene_list(object)));
        }

        for event in &program.events {
            self.emit_event(event, Frame::Root)?;
        }
        self.writer.close_with(dialect.epilogue());

        Ok((self.writer.finish(), self.source_map))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Object usage
    // ══════════════════════════════════════════════════════════════════════

    fn collect_used(&mut self, event: &LoweredEvent) -> BTreeSet<String> {
        let mut set = BTreeSet::new();
        match &event.control {
            Control::Plain => {}
            Control::Repeat { count, .. } => expr_objects(count, &mut set),
            Control::While { conditions, .. } => {
                for condition in conditions {
                    condition_objects(condition, &mut set);
                }
            }
            Control::ForEach { object, .. } => {
                set.insert(object.clone());
            }
        }
        for condition in &event.conditions {
            condition_objects(condition, &mut set);
        }
        for action in &event.actions {
            action_objects(action, &mut set);
        }
        for child in &event.children {
            set.extend(self.collect_used(child));
        }
        self.used.insert(event.id, set.clone());
        set
    }

    fn list_name(&self, object: &str, frame: Frame) -> CodegenResult<String> {
        let k = self
            .object_ids
            .get(object)
            .ok_or_else(|| CodegenError::UnknownObject(object.to_string()))?;
        Ok(match frame {
            Frame::Root => format!("o{k}_r"),
            Frame::Event(id) => format!("o{k}_{id}"),
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Events
    // ══════════════════════════════════════════════════════════════════════

    fn emit_event(&mut self, event: &LoweredEvent, parent: Frame) -> CodegenResult<()> {
        let dialect = self.dialect;
        let id = event.id;
        let start = self.writer.line_count() + 1;

        self.writer
            .line(dialect.comment(&format!("{} (event {id})", event.path)));
        self.writer.open("{");
        for local in &event.locals {
            let json = serde_json::to_string(&local.initial)
                .map_err(|e| CodegenError::Internal(e.to_string()))?;
            self.writer
                .line(dialect.declare_variable(&local.slot.to_string(), &json));
        }

        match &event.control {
            Control::Plain => {
                self.emit_picking(event, parent, None)?;
                self.emit_guarded(event)?;
            }
            Control::Repeat {
                count,
                index,
                stoppable,
            } => {
                let bound = format!("n{id}");
                let counter = format!("i{id}");
                let stop = format!("s{id}");
                let count = self.expr(count, parent, None)?;
                self.writer
                    .line(dialect.const_number(&bound, &dialect.clamp_count(&count)));
                if *stoppable {
                    self.writer.line(dialect.declare_flag(&stop, false));
                }
                let stop = stoppable.then_some(stop.as_str());
                self.writer
                    .open(dialect.counted_loop(&counter, &bound, stop));
                self.assign_index(*index, &counter);
                self.emit_picking(event, parent, None)?;
                self.emit_guarded(event)?;
                self.writer.close();
            }
            Control::While {
                conditions,
                index,
                iteration_limit,
                stoppable,
            } => {
                let counter = format!("i{id}");
                let stop = format!("s{id}");
                let guard = format!("w{id}");
                self.writer.line(dialect.declare_number(&counter, &dialect.number(0.0)));
                if *stoppable {
                    self.writer.line(dialect.declare_flag(&stop, false));
                }
                self.writer.open(dialect.loop_open());
                if let Some(limit) = iteration_limit {
                    let limit = dialect.number(f64::from(*limit));
                    self.emit_break_if(&format!("{counter} >= {limit}"));
                }
                if *stoppable {
                    self.emit_break_if(&stop);
                }
                self.emit_picking(event, parent, None)?;
                self.writer.line(dialect.declare_flag(&guard, true));
                self.emit_conditions(conditions, Frame::Event(id), &guard)?;
                self.emit_break_if(&format!("!{guard}"));
                self.assign_index(*index, &counter);
                self.writer.line(format!("{counter} += {};", dialect.number(1.0)));
                self.emit_guarded(event)?;
                self.writer.close();
            }
            Control::ForEach {
                object,
                index,
                stoppable,
            } => {
                let snapshot = format!("e{id}");
                let counter = format!("i{id}");
                let stop = format!("s{id}");
                let parent_list = self.list_name(object, parent)?;
                self.writer
                    .line(dialect.declare_list(&snapshot, &dialect.copy_list(&parent_list)));
                if *stoppable {
                    self.writer.line(dialect.declare_flag(&stop, false));
                }
                let stop = stoppable.then_some(stop.as_str());
                let bound = dialect.list_len(&snapshot);
                self.writer
                    .open(dialect.counted_loop(&counter, &bound, stop));
                self.assign_index(*index, &counter);
                let instance = dialect.list_at(&snapshot, &counter);
                self.emit_picking(event, parent, Some((object.as_str(), instance.as_str())))?;
                self.emit_guarded(event)?;
                self.writer.close();
            }
        }

        self.writer.close();
        let end = self.writer.line_count();
        self.source_map.push(id, event.path.clone(), start, end);
        debug!(
            target: "codegen",
            backend = dialect.backend().name(),
            id,
            lines = end + 1 - start,
            "emitted event"
        );
        Ok(())
    }

    /// Copy the parent's picked lists. For a for-each body, the iterated
    /// object is narrowed to the current instance.
    fn emit_picking(
        &mut self,
        event: &LoweredEvent,
        parent: Frame,
        narrowed: Option<(&str, &str)>,
    ) -> CodegenResult<()> {
        let dialect = self.dialect;
        let frame = Frame::Event(event.id);
        let used = self.used.get(&event.id).cloned().unwrap_or_default();
        for object in &used {
            let list = self.list_name(object, frame)?;
            let init = match narrowed {
                Some((narrowed_object, instance)) if narrowed_object == object => {
                    dialect.single_list(instance)
                }
                _ => dialect.copy_list(&self.list_name(object, parent)?),
            };
            self.writer.line(dialect.declare_list(&list, &init));
        }
        Ok(())
    }

    /// Conditions, then actions and sub-events under the condition flag.
    fn emit_guarded(&mut self, event: &LoweredEvent) -> CodegenResult<()> {
        let dialect = self.dialect;
        let frame = Frame::Event(event.id);
        let guarded = !event.conditions.is_empty();
        if guarded {
            let flag = format!("c{}", event.id);
            self.writer.line(dialect.declare_flag(&flag, true));
            self.emit_conditions(&event.conditions, frame, &flag)?;
            self.writer.open(dialect.if_open(&flag));
        }
        for action in &event.actions {
            self.emit_action(action, frame)?;
        }
        for child in &event.children {
            self.emit_event(child, frame)?;
        }
        if guarded {
            self.writer.close();
        }
        Ok(())
    }

    fn emit_break_if(&mut self, condition: &str) {
        self.writer.open(self.dialect.if_open(condition));
        self.writer.line("break;");
        self.writer.close();
    }

    fn assign_index(&mut self, index: Option<SlotId>, counter: &str) {
        if let Some(slot) = index {
            let line = self
                .dialect
                .write_variable(&slot.to_string(), ValueType::Number, counter);
            self.writer.line(line);
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Conditions
    // ══════════════════════════════════════════════════════════════════════

    /// Evaluate `conditions` into `flag`; a false condition skips the rest.
    fn emit_conditions(
        &mut self,
        conditions: &[BoundCondition],
        frame: Frame,
        flag: &str,
    ) -> CodegenResult<()> {
        for (i, condition) in conditions.iter().enumerate() {
            let label = format!("{}: {}", condition.location, condition.name);
            self.writer.line(self.dialect.comment(&label));
            if i > 0 {
                self.writer.open(self.dialect.if_open(flag));
            }
            self.emit_condition(condition, frame, flag)?;
            if i > 0 {
                self.writer.close();
            }
        }
        Ok(())
    }

    fn emit_condition(
        &mut self,
        condition: &BoundCondition,
        frame: Frame,
        flag: &str,
    ) -> CodegenResult<()> {
        let dialect = self.dialect;
        let Some(current) = current_of(&condition.target) else {
            let test = self.test(&condition.test, frame, None)?;
            self.writer
                .line(format!("{flag} = {};", negate_if(test, condition.inverted)));
            return Ok(());
        };

        let keep = negate_if(
            self.test(&condition.test, frame, Some(current))?,
            condition.inverted,
        );
        let mut remaining = Vec::new();
        for member in condition.target.members() {
            let list = self.list_name(member, frame)?;
            self.writer.line(dialect.filter_list(&list, &keep));
            remaining.push(dialect.list_not_empty(&list));
        }
        let holds = if remaining.is_empty() {
            dialect.boolean(false)
        } else {
            remaining.join(" || ")
        };
        self.writer.line(format!("{flag} = {holds};"));
        Ok(())
    }

    fn test(
        &self,
        test: &ConditionTest,
        frame: Frame,
        current: Option<Current<'_>>,
    ) -> CodegenResult<String> {
        let dialect = self.dialect;
        Ok(match test {
            ConditionTest::Call(call) => self.invoke(&call.symbols, &call.args, frame, current)?,
            ConditionTest::Compare {
                getter,
                args,
                op,
                operand,
                ..
            } => format!(
                "({} {} {})",
                self.invoke(getter, args, frame, current)?,
                dialect.relational(*op),
                self.expr(operand, frame, current)?
            ),
            ConditionTest::Variable {
                var,
                ty,
                op,
                operand,
            } => format!(
                "({} {} {})",
                dialect.read_variable(&self.var_expr(var), *ty),
                dialect.relational(*op),
                self.expr(operand, frame, current)?
            ),
            ConditionTest::Constant(value) => dialect.boolean(*value),
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Actions
    // ══════════════════════════════════════════════════════════════════════

    fn emit_action(&mut self, action: &BoundAction, frame: Frame) -> CodegenResult<()> {
        let dialect = self.dialect;
        let label = format!("{}: {}", action.location, action.name);
        self.writer.line(dialect.comment(&label));
        let Some(current) = current_of(&action.target) else {
            return self.emit_effect(&action.effect, frame, None);
        };
        for member in action.target.members() {
            let list = self.list_name(member, frame)?;
            self.writer.open(dialect.for_each_instance(&list));
            self.emit_effect(&action.effect, frame, Some(current))?;
            self.writer.close();
        }
        Ok(())
    }

    fn emit_effect(
        &mut self,
        effect: &ActionEffect,
        frame: Frame,
        current: Option<Current<'_>>,
    ) -> CodegenResult<()> {
        let dialect = self.dialect;
        let line = match effect {
            ActionEffect::Call(call) => {
                format!("{};", self.invoke(&call.symbols, &call.args, frame, current)?)
            }
            ActionEffect::Modify {
                getter,
                setter,
                args,
                op,
                operand,
                ..
            } => {
                let current_value = self.invoke(getter, args, frame, current)?;
                let value = combine(&current_value, *op, &self.expr(operand, frame, current)?);
                let mut setter_args = self.args(args, frame, current)?;
                setter_args.push(value);
                let setter = self.symbol(setter)?;
                format!("{};", self.call_on(current, setter, &setter_args))
            }
            ActionEffect::Variable {
                var,
                ty,
                op,
                operand,
            } => {
                let variable = self.var_expr(var);
                let value = combine(
                    &dialect.read_variable(&variable, *ty),
                    *op,
                    &self.expr(operand, frame, current)?,
                );
                dialect.write_variable(&variable, *ty, &value)
            }
            ActionEffect::StopLoop { loop_event } => {
                format!("s{loop_event} = {};", dialect.boolean(true))
            }
        };
        self.writer.line(line);
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls and expressions
    // ══════════════════════════════════════════════════════════════════════

    fn symbol<'s>(&self, symbols: &'s BackendSymbols) -> CodegenResult<&'s str> {
        let backend = self.dialect.backend();
        symbols.get(backend).ok_or_else(|| {
            CodegenError::UnresolvedSymbol(format!(
                "'{}' has no {} implementation",
                symbols.preferred().unwrap_or("<unnamed>"),
                backend.name()
            ))
        })
    }

    /// Call `symbols` on the current instance, or as a free function.
    fn invoke(
        &self,
        symbols: &BackendSymbols,
        args: &[Arg],
        frame: Frame,
        current: Option<Current<'_>>,
    ) -> CodegenResult<String> {
        let symbol = self.symbol(symbols)?;
        let args = self.args(args, frame, current)?;
        Ok(self.call_on(current, symbol, &args))
    }

    fn call_on(&self, current: Option<Current<'_>>, symbol: &str, args: &[String]) -> String {
        match current {
            Some(current) => {
                let receiver = self.receiver(INSTANCE, current.automatism);
                self.dialect.method_call(&receiver, symbol, args)
            }
            None => self.dialect.call(symbol, args),
        }
    }

    fn receiver(&self, instance: &str, automatism: Option<&str>) -> String {
        match automatism {
            Some(name) => self.dialect.automatism(instance, name),
            None => instance.to_string(),
        }
    }

    fn args(
        &self,
        args: &[Arg],
        frame: Frame,
        current: Option<Current<'_>>,
    ) -> CodegenResult<Vec<String>> {
        args.iter()
            .map(|arg| match arg {
                Arg::Context => Ok(self.dialect.context().to_string()),
                Arg::Value(value) => self.expr(value, frame, current),
                Arg::Object { members, .. } => {
                    let entries = members
                        .iter()
                        .map(|m| Ok((m.clone(), self.list_name(m, frame)?)))
                        .collect::<CodegenResult<Vec<_>>>()?;
                    Ok(self.dialect.object_map(&entries))
                }
            })
            .collect()
    }

    fn expr(
        &self,
        expr: &TypedExpr,
        frame: Frame,
        current: Option<Current<'_>>,
    ) -> CodegenResult<String> {
        let dialect = self.dialect;
        Ok(match &expr.kind {
            TypedExprKind::Number(n) => dialect.number(*n),
            TypedExprKind::Text(s) => dialect.string(s),
            TypedExprKind::Bool(b) => dialect.boolean(*b),
            TypedExprKind::Variable(var) => dialect.read_variable(&self.var_expr(var), expr.ty),
            TypedExprKind::Negate(inner) => format!("(-{})", self.expr(inner, frame, current)?),
            TypedExprKind::Arith { op, left, right } => format!(
                "({} {} {})",
                self.expr(left, frame, current)?,
                op.symbol(),
                self.expr(right, frame, current)?
            ),
            TypedExprKind::Concat(left, right) => format!(
                "({} + {})",
                self.expr(left, frame, current)?,
                self.expr(right, frame, current)?
            ),
            TypedExprKind::Call {
                target,
                symbols,
                args,
            } => {
                let symbol = self.symbol(symbols)?;
                let args = self.args(args, frame, current)?;
                let (object, automatism) = match target {
                    ExprTarget::Free => return Ok(dialect.call(symbol, &args)),
                    ExprTarget::Object(object) => (object.as_str(), None),
                    ExprTarget::Automatism { object, automatism } => {
                        (object.as_str(), Some(automatism.as_str()))
                    }
                };
                if current.is_some_and(|c| c.object == object) {
                    let receiver = self.receiver(INSTANCE, automatism);
                    dialect.method_call(&receiver, symbol, &args)
                } else {
                    // First picked instance, or the type's default when none.
                    let list = self.list_name(object, frame)?;
                    let first = dialect.list_at(&list, "0");
                    let receiver = self.receiver(&first, automatism);
                    format!(
                        "({} ? {} : {})",
                        dialect.list_not_empty(&list),
                        dialect.method_call(&receiver, symbol, &args),
                        dialect.default_value(expr.ty)
                    )
                }
            }
        })
    }

    fn var_expr(&self, var: &VarRef) -> String {
        let mut out = match &var.root {
            VarRoot::Local(slot) => slot.to_string(),
            VarRoot::Global(name) => self.dialect.global_variable(name),
        };
        for child in &var.children {
            out = self.dialect.variable_child(&out, child);
        }
        out
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn current_of(target: &Target) -> Option<Current<'_>> {
    match target {
        Target::Free => None,
        Target::Object { object, .. } => Some(Current {
            object,
            automatism: None,
        }),
        Target::Automatism {
            object, automatism, ..
        } => Some(Current {
            object,
            automatism: Some(automatism),
        }),
    }
}

fn negate_if(test: String, inverted: bool) -> String {
    if inverted {
        format!("!({test})")
    } else {
        test
    }
}

/// `current op operand`, or just `operand` for assignment.
fn combine(current: &str, op: AssignOp, operand: &str) -> String {
    match op.arithmetic() {
        Some(bin) => format!("({current} {} {operand})", bin.symbol()),
        None => operand.to_string(),
    }
}

fn condition_objects(condition: &BoundCondition, set: &mut BTreeSet<String>) {
    set.extend(condition.target.members().iter().cloned());
    match &condition.test {
        ConditionTest::Call(call) => args_objects(&call.args, set),
        ConditionTest::Compare { args, operand, .. } => {
            args_objects(args, set);
            expr_objects(operand, set);
        }
        ConditionTest::Variable { operand, .. } => expr_objects(operand, set),
        ConditionTest::Constant(_) => {}
    }
}

fn action_objects(action: &BoundAction, set: &mut BTreeSet<String>) {
    set.extend(action.target.members().iter().cloned());
    match &action.effect {
        ActionEffect::Call(call) => args_objects(&call.args, set),
        ActionEffect::Modify { args, operand, .. } => {
            args_objects(args, set);
            expr_objects(operand, set);
        }
        ActionEffect::Variable { operand, .. } => expr_objects(operand, set),
        ActionEffect::StopLoop { .. } => {}
    }
}

fn args_objects(args: &[Arg], set: &mut BTreeSet<String>) {
    for arg in args {
        match arg {
            Arg::Context => {}
            Arg::Value(value) => expr_objects(value, set),
            Arg::Object { members, .. } => set.extend(members.iter().cloned()),
        }
    }
}

fn expr_objects(expr: &TypedExpr, set: &mut BTreeSet<String>) {
    match &expr.kind {
        TypedExprKind::Number(_)
        | TypedExprKind::Text(_)
        | TypedExprKind::Bool(_)
        | TypedExprKind::Variable(_) => {}
        TypedExprKind::Negate(inner) => expr_objects(inner, set),
        TypedExprKind::Arith { left, right, .. } | TypedExprKind::Concat(left, right) => {
            expr_objects(left, set);
            expr_objects(right, set);
        }
        TypedExprKind::Call { target, args, .. } => {
            match target {
                ExprTarget::Free => {}
                ExprTarget::Object(object) | ExprTarget::Automatism { object, .. } => {
                    set.insert(object.clone());
                }
            }
            args_objects(args, set);
        }
    }
}
