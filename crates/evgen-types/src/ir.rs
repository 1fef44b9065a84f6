//! Backend-agnostic resolved program.
//!
//! The compiler lowers the authored tree into this form once. Every name is
//! resolved, every expression is typed, and every catalog call carries its
//! per-backend symbol table. Both the code emitters and the reference
//! evaluator consume it, so they agree on semantics by construction.

use crate::backend::BackendSymbols;
use crate::expr::BinaryOp;
use crate::location::{EventPath, Location};
use crate::variable::Variable;
use serde::{Deserialize, Serialize};
use std::fmt;

// ══════════════════════════════════════════════════════════════════════════════
// Types and operators
// ══════════════════════════════════════════════════════════════════════════════

/// Static type of an expression or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Number,
    String,
    Boolean,
    Object,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Boolean => "boolean",
            ValueType::Object => "object",
        };
        f.write_str(name)
    }
}

/// Operator token of a modifier action (`operator` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssignOp {
    Set,
    Add,
    Sub,
    Mul,
    Div,
}

impl AssignOp {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "=" => Some(AssignOp::Set),
            "+" => Some(AssignOp::Add),
            "-" => Some(AssignOp::Sub),
            "*" => Some(AssignOp::Mul),
            "/" => Some(AssignOp::Div),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+",
            AssignOp::Sub => "-",
            AssignOp::Mul => "*",
            AssignOp::Div => "/",
        }
    }

    /// Whether the operator applies to values of `ty`. Strings only support
    /// assignment and appending.
    pub fn supports(self, ty: ValueType) -> bool {
        match ty {
            ValueType::Number => true,
            ValueType::String => matches!(self, AssignOp::Set | AssignOp::Add),
            ValueType::Boolean | ValueType::Object => self == AssignOp::Set,
        }
    }

    /// The arithmetic operator combining the current value with the operand,
    /// or `None` for plain assignment.
    pub fn arithmetic(self) -> Option<BinaryOp> {
        match self {
            AssignOp::Set => None,
            AssignOp::Add => Some(BinaryOp::Add),
            AssignOp::Sub => Some(BinaryOp::Sub),
            AssignOp::Mul => Some(BinaryOp::Mul),
            AssignOp::Div => Some(BinaryOp::Div),
        }
    }
}

/// Operator token of a comparison condition (`relationalOperator` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl RelOp {
    /// Parse an operator token. The unicode forms `≠ ≤ ≥` are accepted.
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim() {
            "=" | "==" => Some(RelOp::Eq),
            "!=" | "≠" => Some(RelOp::Ne),
            "<" => Some(RelOp::Lt),
            "<=" | "≤" => Some(RelOp::Le),
            ">" => Some(RelOp::Gt),
            ">=" | "≥" => Some(RelOp::Ge),
            _ => None,
        }
    }

    /// The operator as written in generated code.
    pub fn symbol(self) -> &'static str {
        match self {
            RelOp::Eq => "==",
            RelOp::Ne => "!=",
            RelOp::Lt => "<",
            RelOp::Le => "<=",
            RelOp::Gt => ">",
            RelOp::Ge => ">=",
        }
    }

    pub fn compare<T: PartialOrd + ?Sized>(self, left: &T, right: &T) -> bool {
        match self {
            RelOp::Eq => left == right,
            RelOp::Ne => left != right,
            RelOp::Lt => left < right,
            RelOp::Le => left <= right,
            RelOp::Gt => left > right,
            RelOp::Ge => left >= right,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Program structure
// ══════════════════════════════════════════════════════════════════════════════

/// Unique id of a local variable binding within one program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A local variable declared by an event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalSlot {
    pub slot: SlotId,
    pub name: String,
    pub initial: Variable,
    /// Reassigned from the loop counter at the start of every iteration.
    pub loop_index: bool,
}

/// The lowered tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub events: Vec<LoweredEvent>,
}

impl Program {
    /// Number of lowered events, nested ones included.
    pub fn event_count(&self) -> usize {
        fn count(events: &[LoweredEvent]) -> usize {
            events.iter().map(|e| 1 + count(&e.children)).sum()
        }
        count(&self.events)
    }
}

/// One executable event after binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoweredEvent {
    /// Pre-order number, unique within the program.
    pub id: u32,
    pub path: EventPath,
    /// Declared at event entry, before the loop starts for loop events.
    pub locals: Vec<LocalSlot>,
    pub control: Control,
    pub conditions: Vec<BoundCondition>,
    pub actions: Vec<BoundAction>,
    pub children: Vec<LoweredEvent>,
}

/// How the body of an event is driven.
///
/// For loops, every iteration tests the conditions, runs the actions and
/// then the children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Control {
    /// Run once.
    Plain,
    /// Run `count` times; `count` is evaluated once per loop entry, floored
    /// and clamped at zero.
    Repeat {
        count: TypedExpr,
        index: Option<SlotId>,
        stoppable: bool,
    },
    /// Run while every condition holds.
    While {
        conditions: Vec<BoundCondition>,
        index: Option<SlotId>,
        /// Stop after this many iterations.
        iteration_limit: Option<u32>,
        stoppable: bool,
    },
    /// Run once per picked instance of `object`, narrowed to that instance.
    ForEach {
        object: String,
        index: Option<SlotId>,
        stoppable: bool,
    },
}

impl Control {
    pub fn is_loop(&self) -> bool {
        !matches!(self, Control::Plain)
    }

    pub fn index(&self) -> Option<SlotId> {
        match self {
            Control::Plain => None,
            Control::Repeat { index, .. }
            | Control::While { index, .. }
            | Control::ForEach { index, .. } => *index,
        }
    }

    pub fn is_stoppable(&self) -> bool {
        match self {
            Control::Plain => false,
            Control::Repeat { stoppable, .. }
            | Control::While { stoppable, .. }
            | Control::ForEach { stoppable, .. } => *stoppable,
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Instructions
// ══════════════════════════════════════════════════════════════════════════════

/// Who an instruction acts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Target {
    /// Scene-level instruction.
    Free,
    /// Every picked instance of `members` (the object itself, or the
    /// members of a group).
    Object { object: String, members: Vec<String> },
    /// An automatism of every picked instance of `members`.
    Automatism {
        object: String,
        members: Vec<String>,
        automatism: String,
    },
}

impl Target {
    /// The objects whose picked lists the instruction reads or filters.
    pub fn members(&self) -> &[String] {
        match self {
            Target::Free => &[],
            Target::Object { members, .. } | Target::Automatism { members, .. } => members,
        }
    }

    /// The authored object (or group) name.
    pub fn object(&self) -> Option<&str> {
        match self {
            Target::Free => None,
            Target::Object { object, .. } | Target::Automatism { object, .. } => Some(object),
        }
    }
}

/// One argument passed to a runtime symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Arg {
    /// The current execution context (injected `codeOnly` parameter).
    Context,
    Value(TypedExpr),
    /// The picked instances of an object (or of every member of a group)
    /// passed as data.
    Object { object: String, members: Vec<String> },
}

/// A call to a catalog symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    pub symbols: BackendSymbols,
    pub args: Vec<Arg>,
}

/// A bound condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundCondition {
    /// Catalog name, for traces and source maps.
    pub name: String,
    pub location: Location,
    pub inverted: bool,
    pub target: Target,
    pub test: ConditionTest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionTest {
    /// A boolean runtime function.
    Call(Call),
    /// `getter(args) op operand`
    Compare {
        getter: BackendSymbols,
        args: Vec<Arg>,
        ty: ValueType,
        op: RelOp,
        operand: TypedExpr,
    },
    /// `variable op operand`
    Variable {
        var: VarRef,
        ty: ValueType,
        op: RelOp,
        operand: TypedExpr,
    },
    /// A fixed outcome, used where a condition could not be bound but the
    /// construct still needs a test.
    Constant(bool),
}

/// A bound action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundAction {
    pub name: String,
    pub location: Location,
    pub target: Target,
    pub effect: ActionEffect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionEffect {
    Call(Call),
    /// `setter(args, getter(args) op operand)`
    Modify {
        getter: BackendSymbols,
        setter: BackendSymbols,
        args: Vec<Arg>,
        ty: ValueType,
        op: AssignOp,
        operand: TypedExpr,
    },
    /// `variable = variable op operand`
    Variable {
        var: VarRef,
        ty: ValueType,
        op: AssignOp,
        operand: TypedExpr,
    },
    /// Stop the loop event `loop_event` after the current iteration.
    StopLoop { loop_event: u32 },
}

// ══════════════════════════════════════════════════════════════════════════════
// Expressions
// ══════════════════════════════════════════════════════════════════════════════

/// Reference to a variable, with optional structure children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarRef {
    pub root: VarRoot,
    pub children: Vec<String>,
}

impl VarRef {
    pub fn local(slot: SlotId) -> Self {
        Self {
            root: VarRoot::Local(slot),
            children: Vec::new(),
        }
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self {
            root: VarRoot::Global(name.into()),
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VarRoot {
    Local(SlotId),
    Global(String),
}

/// Receiver of an expression function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprTarget {
    Free,
    Object(String),
    Automatism { object: String, automatism: String },
}

/// A type-checked expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: ValueType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypedExprKind {
    Number(f64),
    Text(String),
    Bool(bool),
    Variable(VarRef),
    Negate(Box<TypedExpr>),
    /// Numeric arithmetic.
    Arith {
        op: BinaryOp,
        left: Box<TypedExpr>,
        right: Box<TypedExpr>,
    },
    /// String concatenation.
    Concat(Box<TypedExpr>, Box<TypedExpr>),
    Call {
        target: ExprTarget,
        symbols: BackendSymbols,
        args: Vec<Arg>,
    },
}

impl TypedExpr {
    pub fn number(value: f64) -> Self {
        Self {
            kind: TypedExprKind::Number(value),
            ty: ValueType::Number,
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self {
            kind: TypedExprKind::Text(value.into()),
            ty: ValueType::String,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            kind: TypedExprKind::Bool(value),
            ty: ValueType::Boolean,
        }
    }

    /// The value used at a site whose expression failed to bind.
    pub fn default_for(ty: ValueType) -> Self {
        match ty {
            ValueType::String => Self::text(""),
            ValueType::Boolean => Self::boolean(false),
            ValueType::Number | ValueType::Object => Self::number(0.0),
        }
    }

    pub fn variable(var: VarRef, ty: ValueType) -> Self {
        Self {
            kind: TypedExprKind::Variable(var),
            ty,
        }
    }
}
