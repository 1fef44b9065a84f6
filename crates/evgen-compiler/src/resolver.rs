//! Instruction resolver: binds the authored parameters of one condition or
//! action against its catalog entry.
//!
//! A binding failure reports diagnostics and returns `None`; the walker then
//! omits the instruction for that event only.

use evgen_types::event::Instruction;
use evgen_types::ir::{
    ActionEffect, Arg, AssignOp, BoundAction, BoundCondition, Call, ConditionTest, RelOp, Target,
    TypedExpr, ValueType,
};
use evgen_types::{Diagnostic, ErrorCode, Location};

use crate::catalog::{CodegenStyle, InstructionMetadata, ParameterKind};
use crate::checker::{parse_yes_no, Binder, ResolvedVariable, StaticType};
use crate::registry::ObjectRef;
use crate::scope::BindingKind;

/// Parameters of one instruction after binding.
#[derive(Default)]
struct BoundParameters {
    target: Option<Target>,
    /// Arguments passed to the runtime symbol, in declaration order. The
    /// target, the operator and its operand are not included.
    args: Vec<Arg>,
    assign: Option<AssignOp>,
    relation: Option<RelOp>,
    operand: Option<TypedExpr>,
    variable: Option<ResolvedVariable>,
}

impl<'a> Binder<'a> {
    // ══════════════════════════════════════════════════════════════════════
    // Conditions
    // ══════════════════════════════════════════════════════════════════════

    pub(crate) fn bind_condition(
        &mut self,
        instruction: &Instruction,
        location: Location,
    ) -> Option<BoundCondition> {
        let name = instruction.name();
        let Some(meta) = self.catalog.condition(name) else {
            self.unknown_instruction("condition", name, &location);
            return None;
        };

        let params = self.bind_parameters(meta, instruction, &location);
        if meta.codegen == CodegenStyle::Call && !self.check_instruction_backends(meta, &location)
        {
            return None;
        }
        let params = params?;

        let test = match meta.codegen {
            CodegenStyle::VariableComparison => {
                let (variable, op, operand) = self.comparison_parts(
                    meta,
                    params.variable,
                    params.relation,
                    params.operand,
                    &location,
                )?;
                ConditionTest::Variable {
                    var: variable.var,
                    ty: meta.manipulated_type.unwrap_or(operand.ty),
                    op,
                    operand,
                }
            }
            CodegenStyle::Call => match (params.relation, params.operand) {
                (Some(op), Some(operand)) => ConditionTest::Compare {
                    getter: meta.symbols.clone(),
                    args: params.args,
                    ty: meta.manipulated_type.unwrap_or(operand.ty),
                    op,
                    operand,
                },
                _ => ConditionTest::Call(Call {
                    symbols: meta.symbols.clone(),
                    args: params.args,
                }),
            },
            CodegenStyle::VariableModifier | CodegenStyle::StopLoop => {
                self.error(
                    ErrorCode::UNKNOWN_INSTRUCTION,
                    format!("'{name}' is an action and cannot be used as a condition"),
                    &location,
                    None,
                );
                return None;
            }
        };

        Some(BoundCondition {
            name: name.to_string(),
            location,
            inverted: instruction.is_inverted(),
            target: params.target.unwrap_or(Target::Free),
            test,
        })
    }

    fn comparison_parts(
        &mut self,
        meta: &InstructionMetadata,
        variable: Option<ResolvedVariable>,
        relation: Option<RelOp>,
        operand: Option<TypedExpr>,
        location: &Location,
    ) -> Option<(ResolvedVariable, RelOp, TypedExpr)> {
        match (variable, relation, operand) {
            (Some(v), Some(op), Some(operand)) => Some((v, op, operand)),
            _ => {
                self.malformed_entry(meta, "variable, relationalOperator, value", location);
                None
            }
        }
    }

    // ══════════════════════════════════════════════════════════════════════
    // Actions
    // ══════════════════════════════════════════════════════════════════════

    /// Bind an action. `innermost_loop` is the id of the closest enclosing
    /// loop event, the one a stop-loop action terminates.
    pub(crate) fn bind_action(
        &mut self,
        instruction: &Instruction,
        location: Location,
        innermost_loop: Option<u32>,
    ) -> Option<BoundAction> {
        let name = instruction.name();
        let Some(meta) = self.catalog.action(name) else {
            self.unknown_instruction("action", name, &location);
            return None;
        };

        let params = self.bind_parameters(meta, instruction, &location);
        if meta.codegen == CodegenStyle::Call && !self.check_instruction_backends(meta, &location)
        {
            return None;
        }
        let params = params?;

        let effect = match meta.codegen {
            CodegenStyle::StopLoop => match innermost_loop {
                Some(loop_event) => ActionEffect::StopLoop { loop_event },
                None => {
                    let diagnostic = Diagnostic::new(
                        ErrorCode::STOP_OUTSIDE_LOOP,
                        format!("'{name}' used outside of a loop event"),
                        location,
                    )
                    .with_suggestion("Move it into a Repeat, While or ForEach event");
                    self.report(diagnostic);
                    return None;
                }
            },
            CodegenStyle::VariableModifier => {
                let parts = (params.variable, params.assign, params.operand);
                let (variable, op, operand) = match parts {
                    (Some(v), Some(op), Some(operand)) => (v, op, operand),
                    _ => {
                        self.malformed_entry(meta, "variable, operator, value", &location);
                        return None;
                    }
                };
                let ty = meta.manipulated_type.unwrap_or(operand.ty);
                self.check_assign_op(op, ty, &location)?;
                if variable.kind == BindingKind::LoopIndex {
                    let diagnostic = Diagnostic::new(
                        ErrorCode::LOOP_INDEX_ASSIGNED,
                        format!(
                            "loop index '{}' is modified; the loop resets it at the start of every iteration",
                            variable.name
                        ),
                        location.clone(),
                    );
                    self.report(diagnostic);
                }
                ActionEffect::Variable {
                    var: variable.var,
                    ty,
                    op,
                    operand,
                }
            }
            CodegenStyle::Call => match (params.assign, params.operand) {
                (Some(op), Some(operand)) => {
                    let Some(getter) = meta.getter.clone() else {
                        self.malformed_entry(meta, "a getter for the operator", &location);
                        return None;
                    };
                    let ty = meta.manipulated_type.unwrap_or(operand.ty);
                    self.check_assign_op(op, ty, &location)?;
                    ActionEffect::Modify {
                        getter,
                        setter: meta.symbols.clone(),
                        args: params.args,
                        ty,
                        op,
                        operand,
                    }
                }
                _ => ActionEffect::Call(Call {
                    symbols: meta.symbols.clone(),
                    args: params.args,
                }),
            },
            CodegenStyle::VariableComparison => {
                self.error(
                    ErrorCode::UNKNOWN_INSTRUCTION,
                    format!("'{name}' is a condition and cannot be used as an action"),
                    &location,
                    None,
                );
                return None;
            }
        };

        Some(BoundAction {
            name: name.to_string(),
            location,
            target: params.target.unwrap_or(Target::Free),
            effect,
        })
    }

    fn check_assign_op(&mut self, op: AssignOp, ty: ValueType, location: &Location) -> Option<()> {
        if op.supports(ty) {
            return Some(());
        }
        let diagnostic = Diagnostic::new(
            ErrorCode::INVALID_OPERATOR,
            format!("operator '{}' cannot modify a {ty}", op.symbol()),
            location.clone(),
        )
        .with_suggestion("Strings only support '=' and '+'");
        self.report(diagnostic);
        None
    }

    // ══════════════════════════════════════════════════════════════════════
    // Parameters
    // ══════════════════════════════════════════════════════════════════════

    /// Bind every parameter, reporting all problems rather than stopping at
    /// the first.
    ///
    /// Returns `None` when the instruction itself cannot be bound: wrong
    /// arity, or an object, automatism, operator, flag or variable that does
    /// not resolve. Broken value expressions are reported and replaced by a
    /// zero value instead.
    fn bind_parameters(
        &mut self,
        meta: &InstructionMetadata,
        instruction: &Instruction,
        location: &Location,
    ) -> Option<BoundParameters> {
        let (required, total) = (meta.required_arity(), meta.authored_arity());
        let authored = authored_parameters(&instruction.parameters, required);
        if authored.len() < required || authored.len() > total {
            let expected = if required == total {
                total.to_string()
            } else {
                format!("{required} to {total}")
            };
            self.error(
                ErrorCode::WRONG_ARG_COUNT,
                format!(
                    "'{}' expects {expected} parameter(s), got {}",
                    meta.name,
                    authored.len()
                ),
                location,
                None,
            );
            return None;
        }

        let mut bound = BoundParameters::default();
        let mut index = 0;
        let mut awaiting_operand = false;
        let mut failed = false;
        for param in &meta.parameters {
            if param.kind == ParameterKind::CodeOnly {
                bound.args.push(Arg::Context);
                continue;
            }
            let raw = match authored.get(index).map(String::as_str) {
                Some(raw) if !(param.optional && raw.trim().is_empty()) => raw,
                // Omitted or blank optional parameter.
                _ => match param.default_value.as_deref() {
                    Some(default) => default,
                    None => break,
                },
            };
            let at = location.clone().with_parameter(index);
            index += 1;
            match param.kind {
                ParameterKind::Object => {
                    let Some(members) = self.bind_object(raw, &at) else {
                        failed = true;
                        continue;
                    };
                    if bound.target.is_none() {
                        bound.target = Some(Target::Object {
                            object: raw.trim().to_string(),
                            members,
                        });
                    } else {
                        bound.args.push(Arg::Object {
                            object: raw.trim().to_string(),
                            members,
                        });
                    }
                }
                ParameterKind::Automatism => {
                    let target = bound.target.take();
                    bound.target = self.bind_automatism(target, raw, param.extra.as_deref(), &at);
                    failed |= bound.target.is_none();
                }
                ParameterKind::Operator => match AssignOp::parse(raw) {
                    Some(op) => {
                        bound.assign = Some(op);
                        awaiting_operand = true;
                    }
                    None => {
                        self.invalid_operator(raw, "= + - * /", &at);
                        failed = true;
                    }
                },
                ParameterKind::RelationalOperator => match RelOp::parse(raw) {
                    Some(op) => {
                        bound.relation = Some(op);
                        awaiting_operand = true;
                    }
                    None => {
                        self.invalid_operator(raw, "= != < <= > >=", &at);
                        failed = true;
                    }
                },
                ParameterKind::YesOrNo => match parse_yes_no(raw) {
                    Some(value) => bound.args.push(Arg::Value(TypedExpr::boolean(value))),
                    None => {
                        let diagnostic = Diagnostic::new(
                            ErrorCode::TYPE_MISMATCH,
                            format!("expected yes or no, got '{}'", raw.trim()),
                            at,
                        )
                        .with_suggestion("Use one of: yes, no, true, false");
                        self.report(diagnostic);
                        failed = true;
                    }
                },
                ParameterKind::Expression | ParameterKind::String => {
                    let kind_ty = if param.kind == ParameterKind::String {
                        ValueType::String
                    } else {
                        ValueType::Number
                    };
                    let expected = if awaiting_operand {
                        meta.manipulated_type.unwrap_or(kind_ty)
                    } else {
                        kind_ty
                    };
                    let value = self.check_source(raw, expected, &at);
                    if awaiting_operand {
                        bound.operand = Some(value);
                        awaiting_operand = false;
                    } else {
                        bound.args.push(Arg::Value(value));
                    }
                }
                ParameterKind::File => bound.args.push(Arg::Value(TypedExpr::text(raw))),
                ParameterKind::Variable => {
                    let Some(variable) = self.resolve_variable(raw, &at) else {
                        failed = true;
                        continue;
                    };
                    if bound.variable.is_none() {
                        bound.variable = Some(variable);
                    } else {
                        let ty = match variable.ty {
                            StaticType::Known(ty) => ty,
                            StaticType::Dynamic => ValueType::Number,
                        };
                        bound.args.push(Arg::Value(TypedExpr::variable(variable.var, ty)));
                    }
                }
                ParameterKind::CodeOnly => {}
            }
        }
        if failed {
            return None;
        }
        Some(bound)
    }

    fn bind_object(&mut self, raw: &str, location: &Location) -> Option<Vec<String>> {
        let name = raw.trim();
        match self.registry.members(name) {
            Some(members) => Some(members),
            None => {
                self.error(
                    ErrorCode::UNKNOWN_SYMBOL,
                    format!("unknown object or group '{name}'"),
                    location,
                    None,
                );
                None
            }
        }
    }

    /// Narrow an object target to one of its automatisms. Every member of a
    /// group must carry it; a single diagnostic is reported either way.
    fn bind_automatism(
        &mut self,
        target: Option<Target>,
        raw: &str,
        required_type: Option<&str>,
        location: &Location,
    ) -> Option<Target> {
        let automatism = raw.trim();
        let Some(Target::Object { object, members }) = target else {
            // The object failed to bind and was already reported.
            return None;
        };

        let missing: Vec<&str> = members
            .iter()
            .filter(|member| {
                let attached = self
                    .registry
                    .object(member)
                    .and_then(|decl| decl.automatism(automatism));
                match (attached, required_type) {
                    (None, _) => true,
                    (Some(decl), Some(ty)) => decl.automatism_type != ty,
                    (Some(_), None) => false,
                }
            })
            .map(String::as_str)
            .collect();

        if missing.is_empty() && !members.is_empty() {
            return Some(Target::Automatism {
                object,
                members,
                automatism: automatism.to_string(),
            });
        }

        let message = match (self.registry.lookup(&object), required_type) {
            (Some(ObjectRef::Group(_)), _) => format!(
                "automatism '{automatism}' is not attached to every object of group '{object}' (missing on {})",
                if missing.is_empty() {
                    "all of them".to_string()
                } else {
                    missing.join(", ")
                }
            ),
            (_, Some(ty)) => {
                format!("object '{object}' has no automatism '{automatism}' of type {ty}")
            }
            (_, None) => format!("object '{object}' has no automatism '{automatism}'"),
        };
        self.error(ErrorCode::MISSING_AUTOMATISM, message, location, None);
        None
    }

    // ── Reporting ────────────────────────────────────────────────────────

    fn unknown_instruction(&mut self, what: &str, name: &str, location: &Location) {
        let diagnostic = Diagnostic::new(
            ErrorCode::UNKNOWN_INSTRUCTION,
            format!("unknown {what} '{name}'"),
            location.clone(),
        )
        .with_suggestion("Check the extension providing it is loaded in the catalog");
        self.report(diagnostic);
    }

    fn invalid_operator(&mut self, raw: &str, accepted: &str, location: &Location) {
        let diagnostic = Diagnostic::new(
            ErrorCode::INVALID_OPERATOR,
            format!("invalid operator '{}'", raw.trim()),
            location.clone(),
        )
        .with_suggestion(format!("Use one of: {accepted}"));
        self.report(diagnostic);
    }

    fn malformed_entry(&mut self, meta: &InstructionMetadata, expected: &str, location: &Location) {
        self.error(
            ErrorCode::UNKNOWN_INSTRUCTION,
            format!("catalog entry '{}' is malformed: expected {expected}", meta.name),
            location,
            None,
        );
    }

    fn check_instruction_backends(
        &mut self,
        meta: &InstructionMetadata,
        location: &Location,
    ) -> bool {
        let missing: Vec<&str> = self
            .backends
            .iter()
            .filter(|b| !meta.supports(**b))
            .map(|b| b.name())
            .collect();
        if missing.is_empty() {
            return true;
        }
        self.error(
            ErrorCode::MISSING_BACKEND_SYMBOL,
            format!(
                "instruction '{}' has no implementation for the {} backend",
                meta.name,
                missing.join(", ")
            ),
            location,
            None,
        );
        false
    }
}

/// The authored parameter values, with trailing blank values beyond the
/// required arity ignored.
fn authored_parameters(parameters: &[String], arity: usize) -> &[String] {
    let mut end = parameters.len();
    while end > arity && parameters[end - 1].trim().is_empty() {
        end -= 1;
    }
    &parameters[..end]
}
