//! Core program evaluator.
//!
//! Runs a resolved [`Program`] one frame at a time with the same semantics
//! the emitters encode: picked lists copied from the parent event, object
//! conditions filtering them, conditions short-circuiting, loops clamping
//! their count and honouring stop-loop.

use std::collections::{HashMap, HashSet};

use evgen_types::ir::{
    ActionEffect, Arg, AssignOp, BoundAction, BoundCondition, ConditionTest, Control,
    ExprTarget, LoweredEvent, Program, RelOp, SlotId, Target, TypedExpr, TypedExprKind, ValueType,
    VarRef, VarRoot,
};
use evgen_types::{BackendSymbols, Variable};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{EvalError, EvalResult};
use crate::host::{Host, Receiver};
use crate::world::{InstanceId, Picking, Value, World};

/// Default step budget for one frame.
pub const DEFAULT_GAS_LIMIT: u64 = 1_000_000;

/// What one frame did.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Event ids whose conditions held, in execution order (once per
    /// iteration for loops).
    pub fired: Vec<u32>,
    pub gas_used: u64,
}

/// The instance an instruction is acting on.
#[derive(Debug, Clone, Copy)]
struct Current<'p> {
    object: &'p str,
    instance: InstanceId,
    automatism: Option<&'p str>,
}

impl<'p> Current<'p> {
    fn receiver(&self) -> Receiver<'p> {
        match self.automatism {
            Some(name) => Receiver::Automatism {
                instance: self.instance,
                name,
            },
            None => Receiver::Instance(self.instance),
        }
    }
}

/// Tree-walking evaluator over a resolved program.
pub struct Evaluator<H: Host> {
    host: H,
    /// Gas counter; limits total steps to stop runaway loops.
    pub gas: u64,
    pub gas_limit: u64,
    locals: HashMap<SlotId, Variable>,
    stopped: HashSet<u32>,
    fired: Vec<u32>,
}

impl<H: Host> Evaluator<H> {
    pub fn new(host: H) -> Self {
        Self::with_gas_limit(host, DEFAULT_GAS_LIMIT)
    }

    pub fn with_gas_limit(host: H, gas_limit: u64) -> Self {
        Self {
            host,
            gas: 0,
            gas_limit,
            locals: HashMap::new(),
            stopped: HashSet::new(),
            fired: Vec::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Run every event once (one frame) and advance the frame counter.
    pub fn run_frame(&mut self, program: &Program, world: &mut World) -> EvalResult<FrameReport> {
        self.gas = 0;
        self.locals.clear();
        self.stopped.clear();
        self.fired.clear();

        let picking = world.scene_picking();
        for event in &program.events {
            self.run_event(event, &picking, world)?;
        }
        world.frame += 1;
        debug!(
            target: "eval",
            frame = world.frame,
            fired = self.fired.len(),
            gas = self.gas,
            "frame complete"
        );
        Ok(FrameReport {
            fired: std::mem::take(&mut self.fired),
            gas_used: self.gas,
        })
    }

    /// Consume one unit of gas. Returns an error if exhausted.
    fn tick(&mut self) -> EvalResult<()> {
        self.gas += 1;
        if self.gas > self.gas_limit {
            Err(EvalError::GasExhausted(self.gas_limit))
        } else {
            Ok(())
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Events
    // ══════════════════════════════════════════════════════════════════════

    fn run_event(
        &mut self,
        event: &LoweredEvent,
        parent: &Picking,
        world: &mut World,
    ) -> EvalResult<()> {
        self.tick()?;
        for local in &event.locals {
            self.locals.insert(local.slot, local.initial.clone());
        }
        self.stopped.remove(&event.id);

        match &event.control {
            Control::Plain => self.run_guarded(event, parent.clone(), world),
            Control::Repeat { count, index, .. } => {
                let count = self.eval(count, parent, None, world)?.as_number();
                let count = if count.is_finite() { count.floor().max(0.0) } else { 0.0 };
                let mut i = 0.0;
                while i < count && !self.stopped.contains(&event.id) {
                    self.tick()?;
                    self.set_index(*index, i);
                    self.run_guarded(event, parent.clone(), world)?;
                    i += 1.0;
                }
                Ok(())
            }
            Control::While {
                conditions,
                index,
                iteration_limit,
                ..
            } => {
                let mut i: u32 = 0;
                loop {
                    self.tick()?;
                    if iteration_limit.is_some_and(|limit| i >= limit)
                        || self.stopped.contains(&event.id)
                    {
                        break;
                    }
                    let mut picking = parent.clone();
                    if !self.conditions_hold(conditions, &mut picking, world)? {
                        break;
                    }
                    self.set_index(*index, f64::from(i));
                    i += 1;
                    self.run_guarded(event, picking, world)?;
                }
                Ok(())
            }
            Control::ForEach { object, index, .. } => {
                let snapshot = parent.get(object).cloned().unwrap_or_default();
                for (k, instance) in snapshot.into_iter().enumerate() {
                    if self.stopped.contains(&event.id) {
                        break;
                    }
                    self.tick()?;
                    self.set_index(*index, k as f64);
                    let mut picking = parent.clone();
                    picking.insert(object.clone(), vec![instance]);
                    self.run_guarded(event, picking, world)?;
                }
                Ok(())
            }
        }
    }

    /// Conditions, then actions and sub-events when they hold.
    fn run_guarded(
        &mut self,
        event: &LoweredEvent,
        mut picking: Picking,
        world: &mut World,
    ) -> EvalResult<()> {
        if !self.conditions_hold(&event.conditions, &mut picking, world)? {
            return Ok(());
        }
        self.fired.push(event.id);
        for action in &event.actions {
            self.run_action(action, &picking, world)?;
        }
        for child in &event.children {
            self.run_event(child, &picking, world)?;
        }
        Ok(())
    }

    fn set_index(&mut self, index: Option<SlotId>, value: f64) {
        if let Some(slot) = index {
            self.locals.insert(slot, Variable::Number(value));
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Conditions
    // ══════════════════════════════════════════════════════════════════════

    /// AND of `conditions`, stopping at the first false one.
    fn conditions_hold(
        &mut self,
        conditions: &[BoundCondition],
        picking: &mut Picking,
        world: &mut World,
    ) -> EvalResult<bool> {
        for condition in conditions {
            if !self.condition_holds(condition, picking, world)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn condition_holds(
        &mut self,
        condition: &BoundCondition,
        picking: &mut Picking,
        world: &mut World,
    ) -> EvalResult<bool> {
        let (object, automatism) = match &condition.target {
            Target::Free => {
                let result = self.test(&condition.test, picking, None, world)?;
                return Ok(result != condition.inverted);
            }
            Target::Object { object, .. } => (object.as_str(), None),
            Target::Automatism {
                object, automatism, ..
            } => (object.as_str(), Some(automatism.as_str())),
        };

        let mut any = false;
        for member in condition.target.members() {
            let list = picking.get(member).cloned().unwrap_or_default();
            let mut kept = Vec::with_capacity(list.len());
            for instance in list {
                let current = Current {
                    object,
                    instance,
                    automatism,
                };
                if self.test(&condition.test, picking, Some(current), world)? != condition.inverted {
                    kept.push(instance);
                }
            }
            any |= !kept.is_empty();
            picking.insert(member.clone(), kept);
        }
        Ok(any)
    }

    fn test(
        &mut self,
        test: &ConditionTest,
        picking: &Picking,
        current: Option<Current<'_>>,
        world: &mut World,
    ) -> EvalResult<bool> {
        Ok(match test {
            ConditionTest::Call(call) => self
                .invoke(&call.symbols, &call.args, picking, current, world)?
                .as_bool(),
            ConditionTest::Compare {
                getter,
                args,
                ty,
                op,
                operand,
            } => {
                let left = self.invoke(getter, args, picking, current, world)?;
                let right = self.eval(operand, picking, current, world)?;
                compare(*ty, *op, &left, &right)
            }
            ConditionTest::Variable {
                var,
                ty,
                op,
                operand,
            } => {
                let left = Value::from_variable(&self.read(var, world), *ty);
                let right = self.eval(operand, picking, current, world)?;
                compare(*ty, *op, &left, &right)
            }
            ConditionTest::Constant(value) => *value,
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Actions
    // ══════════════════════════════════════════════════════════════════════

    fn run_action(
        &mut self,
        action: &BoundAction,
        picking: &Picking,
        world: &mut World,
    ) -> EvalResult<()> {
        self.tick()?;
        let (object, automatism) = match &action.target {
            Target::Free => return self.run_effect(&action.effect, picking, None, world),
            Target::Object { object, .. } => (object.as_str(), None),
            Target::Automatism {
                object, automatism, ..
            } => (object.as_str(), Some(automatism.as_str())),
        };
        for member in action.target.members() {
            let list = picking.get(member).cloned().unwrap_or_default();
            for instance in list {
                let current = Current {
                    object,
                    instance,
                    automatism,
                };
                self.run_effect(&action.effect, picking, Some(current), world)?;
            }
        }
        Ok(())
    }

    fn run_effect(
        &mut self,
        effect: &ActionEffect,
        picking: &Picking,
        current: Option<Current<'_>>,
        world: &mut World,
    ) -> EvalResult<()> {
        match effect {
            ActionEffect::Call(call) => {
                self.invoke(&call.symbols, &call.args, picking, current, world)?;
            }
            ActionEffect::Modify {
                getter,
                setter,
                args,
                ty,
                op,
                operand,
            } => {
                let old = self.invoke(getter, args, picking, current, world)?;
                let operand = self.eval(operand, picking, current, world)?;
                let value = combine(*ty, *op, &old, &operand);
                let mut setter_args = self.args(args, picking, current, world)?;
                setter_args.push(value);
                let symbol = symbol(setter)?;
                let receiver = current.map_or(Receiver::Scene, |c| c.receiver());
                self.host.call(world, symbol, receiver, &setter_args)?;
            }
            ActionEffect::Variable {
                var,
                ty,
                op,
                operand,
            } => {
                let old = Value::from_variable(&self.read(var, world), *ty);
                let operand = self.eval(operand, picking, current, world)?;
                let value = combine(*ty, *op, &old, &operand);
                value.write_to(self.variable_mut(var, world), *ty);
            }
            ActionEffect::StopLoop { loop_event } => {
                self.stopped.insert(*loop_event);
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════
    // Calls, expressions and variables
    // ══════════════════════════════════════════════════════════════════════

    fn invoke(
        &mut self,
        symbols: &BackendSymbols,
        args: &[Arg],
        picking: &Picking,
        current: Option<Current<'_>>,
        world: &mut World,
    ) -> EvalResult<Value> {
        let symbol = symbol(symbols)?;
        let args = self.args(args, picking, current, world)?;
        let receiver = current.map_or(Receiver::Scene, |c| c.receiver());
        self.host.call(world, symbol, receiver, &args)
    }

    fn args(
        &mut self,
        args: &[Arg],
        picking: &Picking,
        current: Option<Current<'_>>,
        world: &mut World,
    ) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Context => {}
                Arg::Value(expr) => values.push(self.eval(expr, picking, current, world)?),
                Arg::Object { members, .. } => {
                    let lists = members
                        .iter()
                        .map(|m| (m.clone(), picking.get(m).cloned().unwrap_or_default()))
                        .collect();
                    values.push(Value::Objects(lists));
                }
            }
        }
        Ok(values)
    }

    fn eval(
        &mut self,
        expr: &TypedExpr,
        picking: &Picking,
        current: Option<Current<'_>>,
        world: &mut World,
    ) -> EvalResult<Value> {
        self.tick()?;
        Ok(match &expr.kind {
            TypedExprKind::Number(n) => Value::Number(*n),
            TypedExprKind::Text(s) => Value::Text(s.clone()),
            TypedExprKind::Bool(b) => Value::Bool(*b),
            TypedExprKind::Variable(var) => Value::from_variable(&self.read(var, world), expr.ty),
            TypedExprKind::Negate(inner) => {
                Value::Number(-self.eval(inner, picking, current, world)?.as_number())
            }
            TypedExprKind::Arith { op, left, right } => {
                let l = self.eval(left, picking, current, world)?.as_number();
                let r = self.eval(right, picking, current, world)?.as_number();
                Value::Number(op.apply(l, r))
            }
            TypedExprKind::Concat(left, right) => {
                let mut text = self.eval(left, picking, current, world)?.as_text();
                text.push_str(&self.eval(right, picking, current, world)?.as_text());
                Value::Text(text)
            }
            TypedExprKind::Call {
                target,
                symbols,
                args,
            } => {
                let (object, automatism) = match target {
                    ExprTarget::Free => {
                        return self.invoke(symbols, args, picking, None, world);
                    }
                    ExprTarget::Object(object) => (object.as_str(), None),
                    ExprTarget::Automatism { object, automatism } => {
                        (object.as_str(), Some(automatism.as_str()))
                    }
                };
                // The instance being acted on, else the first picked one.
                let instance = match current {
                    Some(c) if c.object == object => Some(c.instance),
                    _ => picking.get(object).and_then(|list| list.first().copied()),
                };
                match instance {
                    Some(instance) => {
                        let receiver = Current {
                            object,
                            instance,
                            automatism,
                        };
                        // Arguments still see the instruction's own instance.
                        let symbol = symbol(symbols)?;
                        let args = self.args(args, picking, current, world)?;
                        self.host.call(world, symbol, receiver.receiver(), &args)?
                    }
                    None => Value::default_for(expr.ty),
                }
            }
        })
    }

    fn read(&self, var: &VarRef, world: &World) -> Variable {
        let root = match &var.root {
            VarRoot::Local(slot) => self.locals.get(slot),
            VarRoot::Global(name) => world.global(name),
        };
        let mut current = root;
        for child in &var.children {
            current = current.and_then(|v| v.child(child));
        }
        current.cloned().unwrap_or_default()
    }

    fn variable_mut<'w>(&'w mut self, var: &VarRef, world: &'w mut World) -> &'w mut Variable {
        let mut variable = match &var.root {
            VarRoot::Local(slot) => self.locals.entry(*slot).or_default(),
            VarRoot::Global(name) => world.globals.entry(name),
        };
        for child in &var.children {
            variable = variable.child_mut(child);
        }
        variable
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// The evaluator dispatches on the backend-neutral (native) symbol.
fn symbol(symbols: &BackendSymbols) -> EvalResult<&str> {
    symbols
        .preferred()
        .ok_or_else(|| EvalError::UnknownFunction("<no symbol>".to_string()))
}

fn compare(ty: ValueType, op: RelOp, left: &Value, right: &Value) -> bool {
    match ty {
        ValueType::String => op.compare(left.as_text().as_str(), right.as_text().as_str()),
        ValueType::Boolean => op.compare(&left.as_bool(), &right.as_bool()),
        ValueType::Number | ValueType::Object => op.compare(&left.as_number(), &right.as_number()),
    }
}

/// `old op operand`, or `operand` for assignment.
fn combine(ty: ValueType, op: AssignOp, old: &Value, operand: &Value) -> Value {
    match (ty, op.arithmetic()) {
        (_, None) => operand.clone(),
        (ValueType::String, Some(_)) => {
            let mut text = old.as_text();
            text.push_str(&operand.as_text());
            Value::Text(text)
        }
        (_, Some(bin)) => Value::Number(bin.apply(old.as_number(), operand.as_number())),
    }
}

/// Run one frame of `program` against `world` with the given host.
pub fn run_frame<H: Host>(program: &Program, world: &mut World, host: H) -> EvalResult<FrameReport> {
    Evaluator::new(host).run_frame(program, world)
}
