//! Expression checker: parses expression text and turns it into a typed,
//! backend-agnostic [`TypedExpr`].
//!
//! Name resolution order for a bare identifier or path root:
//! 1. loop-index and event-local variables, innermost first
//! 2. objects and groups
//! 3. global variables
//! 4. zero-argument free functions
//!
//! Error codes emitted:
//! - E1xx: syntax (from the lexer and parser)
//! - E200: unknown identifier, function or missing backend symbol
//! - E202: automatism not attached to the object
//! - E300: type mismatch
//! - E301: wrong argument count

use evgen_parser::parse_expression;
use evgen_types::expr::{BinaryOp, Expr, ExprKind, Ident};
use evgen_types::ir::{Arg, ExprTarget, TypedExpr, TypedExprKind, ValueType, VarRef, VarRoot};
use evgen_types::{
    Backend, BackendSymbols, Diagnostic, Diagnostics, ErrorCode, Location, Span, Variable,
};

use crate::catalog::{Catalog, ExpressionMetadata, ParameterKind};
use crate::registry::{ObjectRef, ObjectRegistry};
use crate::scope::{Binding, BindingKind, ScopeStack};

// ══════════════════════════════════════════════════════════════════════════════
// Binder
// ══════════════════════════════════════════════════════════════════════════════

/// Everything needed to bind expressions and instructions at one point of
/// the walk. Expression checking lives here; instruction binding is in
/// `resolver.rs`.
pub(crate) struct Binder<'a> {
    pub(crate) catalog: &'a Catalog,
    pub(crate) registry: &'a ObjectRegistry,
    pub(crate) scope: &'a ScopeStack,
    pub(crate) backends: &'a [Backend],
    pub(crate) diagnostics: &'a mut Diagnostics,
}

/// Static type of a variable reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StaticType {
    Known(ValueType),
    /// A structure child or array element not present in the initial value.
    Dynamic,
}

/// A `variable` parameter after resolution.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedVariable {
    pub(crate) var: VarRef,
    pub(crate) name: String,
    pub(crate) kind: BindingKind,
    pub(crate) ty: StaticType,
}

impl<'a> Binder<'a> {
    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error(
        &mut self,
        code: ErrorCode,
        message: impl Into<String>,
        location: &Location,
        span: Option<Span>,
    ) {
        let location = match span {
            Some(span) => location.clone().with_span(span),
            None => location.clone(),
        };
        self.diagnostics.push(Diagnostic::new(code, message, location));
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Report a mismatch between `found` and `expected`.
    fn mismatch(&mut self, expected: ValueType, found: ValueType, location: &Location, span: Span) {
        let mut diagnostic = Diagnostic::new(
            ErrorCode::TYPE_MISMATCH,
            format!("expected a {expected} expression, found {found}"),
            location.clone().with_span(span),
        );
        match (expected, found) {
            (ValueType::String, ValueType::Number) => {
                diagnostic = diagnostic.with_suggestion("Convert explicitly with ToString(...)");
            }
            (ValueType::Number, ValueType::String) => {
                diagnostic = diagnostic.with_suggestion("Convert explicitly with ToNumber(...)");
            }
            _ => {}
        }
        self.report(diagnostic);
    }

    /// Every enabled backend must have a symbol for `what`.
    pub(crate) fn check_backends(
        &mut self,
        symbols: &BackendSymbols,
        code: ErrorCode,
        what: &str,
        location: &Location,
        span: Option<Span>,
    ) -> Option<()> {
        let missing: Vec<Backend> = self
            .backends
            .iter()
            .copied()
            .filter(|b| !symbols.supports(*b))
            .collect();
        if missing.is_empty() {
            return Some(());
        }
        let names: Vec<&str> = missing.iter().map(|b| b.name()).collect();
        self.error(
            code,
            format!("{what} has no implementation for the {} backend", names.join(", ")),
            location,
            span,
        );
        None
    }

    // ══════════════════════════════════════════════════════════════════════
    // Entry points
    // ══════════════════════════════════════════════════════════════════════

    /// Parse and check `source` as an expression of type `expected`.
    ///
    /// An expression that fails to parse or check is replaced by the zero
    /// value of `expected` once its diagnostics are reported, so the
    /// instruction holding it is still emitted.
    pub(crate) fn check_source(
        &mut self,
        source: &str,
        expected: ValueType,
        location: &Location,
    ) -> TypedExpr {
        let parsed = parse_expression(source, location);
        self.diagnostics.extend(parsed.diagnostics);
        let Some(expr) = parsed.expr else {
            return fallback(expected);
        };
        match self.check(&expr, expected, location) {
            Some(typed) if typed.ty == expected => typed,
            Some(typed) => {
                self.mismatch(expected, typed.ty, location, expr.span);
                fallback(expected)
            }
            None => fallback(expected),
        }
    }

    /// Resolve a `variable` parameter such as `Score` or `Stats.hp`.
    ///
    /// Objects are not consulted: only locals, loop indices and globals.
    pub(crate) fn resolve_variable(
        &mut self,
        source: &str,
        location: &Location,
    ) -> Option<ResolvedVariable> {
        let parsed = parse_expression(source, location);
        self.diagnostics.extend(parsed.diagnostics);
        let expr = parsed.expr?;
        let (root, children): (&Ident, &[Ident]) = match &expr.kind {
            ExprKind::Name(id) => (id, &[]),
            ExprKind::Path { root, segments } => (root, segments),
            _ => {
                self.error(
                    ErrorCode::UNEXPECTED_TOKEN,
                    format!("expected a variable name, got '{}'", source.trim()),
                    location,
                    Some(expr.span),
                );
                return None;
            }
        };

        let Some(binding) = self.scope.resolve(&root.name) else {
            let diagnostic = Diagnostic::new(
                ErrorCode::UNKNOWN_SYMBOL,
                format!("unknown variable '{}'", root.name),
                location.clone().with_span(root.span),
            )
            .with_suggestion("Declare it in the scene variables or in an enclosing event");
            self.report(diagnostic);
            return None;
        };
        let binding = binding.clone();
        let ty = self.static_type(&binding, children, location)?;
        Some(ResolvedVariable {
            var: var_ref(&binding, children),
            name: root.name.clone(),
            kind: binding.kind,
            ty,
        })
    }

    // ══════════════════════════════════════════════════════════════════════
    // Expressions
    // ══════════════════════════════════════════════════════════════════════

    /// Check one node. `hint` is the type the surrounding context wants and
    /// is only used to type variables whose type is not statically known.
    fn check(&mut self, expr: &Expr, hint: ValueType, location: &Location) -> Option<TypedExpr> {
        match &expr.kind {
            ExprKind::Number(n) => Some(TypedExpr::number(*n)),
            ExprKind::Text(s) => Some(TypedExpr::text(s.clone())),
            ExprKind::Name(id) => self.check_name(id, hint, location),
            ExprKind::Path { root, segments } => {
                self.check_path(root, segments, expr.span, hint, location)
            }
            ExprKind::Call { function, args } => {
                self.check_free_call(function, args, expr.span, location)
            }
            ExprKind::MethodCall {
                object,
                method,
                args,
            } => self.check_object_call(object, method, args, expr.span, location),
            ExprKind::AutomatismCall {
                object,
                automatism,
                method,
                args,
            } => self.check_automatism_call(object, automatism, method, args, expr.span, location),
            ExprKind::Negate(inner) => {
                let operand = self.check(inner, ValueType::Number, location)?;
                if operand.ty != ValueType::Number {
                    self.mismatch(ValueType::Number, operand.ty, location, inner.span);
                    return None;
                }
                Some(TypedExpr {
                    kind: TypedExprKind::Negate(Box::new(operand)),
                    ty: ValueType::Number,
                })
            }
            ExprKind::Binary { op, left, right } => {
                self.check_binary(*op, left, right, expr.span, hint, location)
            }
        }
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        span: Span,
        hint: ValueType,
        location: &Location,
    ) -> Option<TypedExpr> {
        let operand_hint = if op == BinaryOp::Add {
            hint
        } else {
            ValueType::Number
        };
        // Check both sides before bailing out so both get reported.
        let l = self.check(left, operand_hint, location);
        let r = self.check(right, operand_hint, location);
        let (l, r) = (l?, r?);

        match (op, l.ty, r.ty) {
            (BinaryOp::Add, ValueType::String, ValueType::String) => Some(TypedExpr {
                kind: TypedExprKind::Concat(Box::new(l), Box::new(r)),
                ty: ValueType::String,
            }),
            (_, ValueType::Number, ValueType::Number) => Some(TypedExpr {
                kind: TypedExprKind::Arith {
                    op,
                    left: Box::new(l),
                    right: Box::new(r),
                },
                ty: ValueType::Number,
            }),
            (_, lt, rt) => {
                let mut diagnostic = Diagnostic::new(
                    ErrorCode::TYPE_MISMATCH,
                    format!("cannot apply '{op}' to {lt} and {rt}"),
                    location.clone().with_span(span),
                );
                if matches!(
                    (lt, rt),
                    (ValueType::Number, ValueType::String) | (ValueType::String, ValueType::Number)
                ) {
                    diagnostic = diagnostic
                        .with_suggestion("Convert explicitly with ToString(...) or ToNumber(...)");
                }
                self.report(diagnostic);
                None
            }
        }
    }

    fn check_name(&mut self, id: &Ident, hint: ValueType, location: &Location) -> Option<TypedExpr> {
        if let Some(binding) = self.scope.resolve_local(&id.name) {
            let binding = binding.clone();
            return self.variable_expr(&binding, &[], hint, location);
        }
        if self.registry.contains(&id.name) {
            let diagnostic = Diagnostic::new(
                ErrorCode::TYPE_MISMATCH,
                format!("object '{}' cannot be used as a value", id.name),
                location.clone().with_span(id.span),
            )
            .with_suggestion(format!("Use an object expression such as {}.X()", id.name));
            self.report(diagnostic);
            return None;
        }
        if let Some(binding) = self.scope.resolve_global(&id.name) {
            let binding = binding.clone();
            return self.variable_expr(&binding, &[], hint, location);
        }
        if let Some(meta) = self.catalog.free_expression(&id.name) {
            if meta.authored_arity() == 0 {
                return self.finish_free_call(meta, &[], id.span, location);
            }
            let diagnostic = Diagnostic::new(
                ErrorCode::WRONG_ARG_COUNT,
                format!("'{}' expects {} argument(s), got 0", meta.name, meta.authored_arity()),
                location.clone().with_span(id.span),
            )
            .with_suggestion(format!("Call it with arguments: {}(...)", meta.name));
            self.report(diagnostic);
            return None;
        }
        self.error(
            ErrorCode::UNKNOWN_SYMBOL,
            format!("unknown identifier '{}'", id.name),
            location,
            Some(id.span),
        );
        None
    }

    fn check_path(
        &mut self,
        root: &Ident,
        segments: &[Ident],
        span: Span,
        hint: ValueType,
        location: &Location,
    ) -> Option<TypedExpr> {
        if let Some(binding) = self.scope.resolve_local(&root.name) {
            let binding = binding.clone();
            return self.variable_expr(&binding, segments, hint, location);
        }
        if self.registry.contains(&root.name) {
            if let [method] = segments {
                return self.check_object_call(root, method, &[], span, location);
            }
            self.error(
                ErrorCode::UNKNOWN_SYMBOL,
                format!("object '{}' has no nested members", root.name),
                location,
                Some(span),
            );
            return None;
        }
        if let Some(binding) = self.scope.resolve_global(&root.name) {
            let binding = binding.clone();
            return self.variable_expr(&binding, segments, hint, location);
        }
        self.error(
            ErrorCode::UNKNOWN_SYMBOL,
            format!("unknown identifier '{}'", root.name),
            location,
            Some(root.span),
        );
        None
    }

    fn check_free_call(
        &mut self,
        function: &Ident,
        args: &[Expr],
        span: Span,
        location: &Location,
    ) -> Option<TypedExpr> {
        let Some(meta) = self.catalog.free_expression(&function.name) else {
            self.error(
                ErrorCode::UNKNOWN_SYMBOL,
                format!("unknown function '{}'", function.name),
                location,
                Some(function.span),
            );
            return None;
        };
        self.finish_free_call(meta, args, span, location)
    }

    fn finish_free_call(
        &mut self,
        meta: &ExpressionMetadata,
        args: &[Expr],
        span: Span,
        location: &Location,
    ) -> Option<TypedExpr> {
        let args = self.check_args(meta, args, span, location)?;
        self.check_backends(
            &meta.symbols,
            ErrorCode::UNKNOWN_SYMBOL,
            &format!("function '{}'", meta.name),
            location,
            Some(span),
        )?;
        Some(TypedExpr {
            kind: TypedExprKind::Call {
                target: ExprTarget::Free,
                symbols: meta.symbols.clone(),
                args,
            },
            ty: meta.return_type,
        })
    }

    /// Resolve `object` to a single, non-group object for use in an
    /// expression.
    fn expression_object(&mut self, object: &Ident, location: &Location) -> Option<String> {
        match self.registry.lookup(&object.name) {
            Some(ObjectRef::Object(_)) => Some(object.name.clone()),
            Some(ObjectRef::Group(_)) => {
                let diagnostic = Diagnostic::new(
                    ErrorCode::TYPE_MISMATCH,
                    format!("group '{}' cannot be used in an expression", object.name),
                    location.clone().with_span(object.span),
                )
                .with_suggestion("Use one of the group's objects instead");
                self.report(diagnostic);
                None
            }
            None => {
                let message = if self.scope.resolve(&object.name).is_some() {
                    format!("'{}' is a variable, not an object", object.name)
                } else {
                    format!("unknown object '{}'", object.name)
                };
                self.error(ErrorCode::UNKNOWN_SYMBOL, message, location, Some(object.span));
                None
            }
        }
    }

    fn check_object_call(
        &mut self,
        object: &Ident,
        method: &Ident,
        args: &[Expr],
        span: Span,
        location: &Location,
    ) -> Option<TypedExpr> {
        let object_name = self.expression_object(object, location)?;
        let Some(meta) = self.catalog.object_expression(&method.name) else {
            self.error(
                ErrorCode::UNKNOWN_SYMBOL,
                format!("object '{}' has no expression '{}'", object.name, method.name),
                location,
                Some(method.span),
            );
            return None;
        };
        let args = self.check_args(meta, args, span, location)?;
        self.check_backends(
            &meta.symbols,
            ErrorCode::UNKNOWN_SYMBOL,
            &format!("expression '{}.{}'", object.name, method.name),
            location,
            Some(span),
        )?;
        Some(TypedExpr {
            kind: TypedExprKind::Call {
                target: ExprTarget::Object(object_name),
                symbols: meta.symbols.clone(),
                args,
            },
            ty: meta.return_type,
        })
    }

    fn check_automatism_call(
        &mut self,
        object: &Ident,
        automatism: &Ident,
        method: &Ident,
        args: &[Expr],
        span: Span,
        location: &Location,
    ) -> Option<TypedExpr> {
        let object_name = self.expression_object(object, location)?;
        let automatism_type = match self
            .registry
            .object(&object_name)
            .and_then(|decl| decl.automatism(&automatism.name))
        {
            Some(decl) => decl.automatism_type.clone(),
            None => {
                self.error(
                    ErrorCode::MISSING_AUTOMATISM,
                    format!(
                        "object '{}' has no automatism '{}'",
                        object.name, automatism.name
                    ),
                    location,
                    Some(automatism.span),
                );
                return None;
            }
        };
        let Some(meta) = self
            .catalog
            .automatism_expression(&automatism_type, &method.name)
        else {
            self.error(
                ErrorCode::UNKNOWN_SYMBOL,
                format!(
                    "automatism '{}' ({automatism_type}) has no expression '{}'",
                    automatism.name, method.name
                ),
                location,
                Some(method.span),
            );
            return None;
        };
        let args = self.check_args(meta, args, span, location)?;
        self.check_backends(
            &meta.symbols,
            ErrorCode::UNKNOWN_SYMBOL,
            &format!(
                "expression '{}.{}::{}'",
                object.name, automatism.name, method.name
            ),
            location,
            Some(span),
        )?;
        Some(TypedExpr {
            kind: TypedExprKind::Call {
                target: ExprTarget::Automatism {
                    object: object_name,
                    automatism: automatism.name.clone(),
                },
                symbols: meta.symbols.clone(),
                args,
            },
            ty: meta.return_type,
        })
    }

    /// Check call arguments against the declared parameters, injecting the
    /// execution context for `codeOnly` parameters.
    fn check_args(
        &mut self,
        meta: &ExpressionMetadata,
        args: &[Expr],
        span: Span,
        location: &Location,
    ) -> Option<Vec<Arg>> {
        let expected = meta.authored_arity();
        if args.len() != expected {
            self.error(
                ErrorCode::WRONG_ARG_COUNT,
                format!(
                    "'{}' expects {expected} argument(s), got {}",
                    meta.name,
                    args.len()
                ),
                location,
                Some(span),
            );
            return None;
        }

        let mut out = Vec::with_capacity(meta.parameters.len());
        let mut authored = args.iter();
        let mut ok = true;
        for param in &meta.parameters {
            if param.kind == ParameterKind::CodeOnly {
                out.push(Arg::Context);
                continue;
            }
            // Arity was checked above.
            let Some(arg) = authored.next() else { break };
            match self.check_arg(param.kind, arg, location) {
                Some(bound) => out.push(bound),
                None => ok = false,
            }
        }
        ok.then_some(out)
    }

    fn check_arg(&mut self, kind: ParameterKind, arg: &Expr, location: &Location) -> Option<Arg> {
        let expected = match kind {
            ParameterKind::Expression => ValueType::Number,
            ParameterKind::String | ParameterKind::File => ValueType::String,
            ParameterKind::Object => {
                let members = match &arg.kind {
                    ExprKind::Name(id) => self.registry.members(&id.name),
                    _ => None,
                };
                return match (&arg.kind, members) {
                    (ExprKind::Name(id), Some(members)) => Some(Arg::Object {
                        object: id.name.clone(),
                        members,
                    }),
                    _ => {
                        self.error(
                            ErrorCode::TYPE_MISMATCH,
                            "expected an object name",
                            location,
                            Some(arg.span),
                        );
                        None
                    }
                };
            }
            ParameterKind::YesOrNo => {
                return match &arg.kind {
                    ExprKind::Name(id) => match parse_yes_no(&id.name) {
                        Some(value) => Some(Arg::Value(TypedExpr::boolean(value))),
                        None => {
                            self.error(
                                ErrorCode::TYPE_MISMATCH,
                                format!("expected yes or no, got '{}'", id.name),
                                location,
                                Some(arg.span),
                            );
                            None
                        }
                    },
                    _ => {
                        self.error(
                            ErrorCode::TYPE_MISMATCH,
                            "expected yes or no",
                            location,
                            Some(arg.span),
                        );
                        None
                    }
                };
            }
            other => {
                self.error(
                    ErrorCode::TYPE_MISMATCH,
                    format!("parameters of kind '{}' cannot be passed inside an expression", other.name()),
                    location,
                    Some(arg.span),
                );
                return None;
            }
        };
        let typed = self.check(arg, expected, location)?;
        if typed.ty != expected {
            self.mismatch(expected, typed.ty, location, arg.span);
            return None;
        }
        Some(Arg::Value(typed))
    }

    // ══════════════════════════════════════════════════════════════════════
    // Variables
    // ══════════════════════════════════════════════════════════════════════

    fn variable_expr(
        &mut self,
        binding: &Binding,
        children: &[Ident],
        hint: ValueType,
        location: &Location,
    ) -> Option<TypedExpr> {
        let ty = match self.static_type(binding, children, location)? {
            StaticType::Known(ty) => ty,
            StaticType::Dynamic => hint,
        };
        Some(TypedExpr::variable(var_ref(binding, children), ty))
    }

    /// Follow `children` through the binding's initial value.
    fn static_type(
        &mut self,
        binding: &Binding,
        children: &[Ident],
        location: &Location,
    ) -> Option<StaticType> {
        let mut current = Some(&binding.initial);
        for child in children {
            match current {
                Some(Variable::Structure(_)) | Some(Variable::Array(_)) => {
                    current = current.and_then(|v| v.child(&child.name));
                }
                Some(scalar) => {
                    self.error(
                        ErrorCode::TYPE_MISMATCH,
                        format!(
                            "variable '{}' is a {} and has no child '{}'",
                            binding.name,
                            scalar.type_name(),
                            child.name
                        ),
                        location,
                        Some(child.span),
                    );
                    return None;
                }
                None => break,
            }
        }
        Some(match current {
            Some(Variable::Number(_)) => StaticType::Known(ValueType::Number),
            Some(Variable::String(_)) => StaticType::Known(ValueType::String),
            Some(Variable::Boolean(_)) => StaticType::Known(ValueType::Boolean),
            Some(Variable::Structure(_)) | Some(Variable::Array(_)) | None => StaticType::Dynamic,
        })
    }
}

fn var_ref(binding: &Binding, children: &[Ident]) -> VarRef {
    let root = match binding.slot {
        Some(slot) => VarRoot::Local(slot),
        None => VarRoot::Global(binding.name.clone()),
    };
    VarRef {
        root,
        children: children.iter().map(|c| c.name.clone()).collect(),
    }
}

/// Parse a `yesorno` token.
pub(crate) fn parse_yes_no(token: &str) -> Option<bool> {
    match token.trim() {
        "yes" | "true" => Some(true),
        "no" | "false" => Some(false),
        _ => None,
    }
}

/// Zero value standing in for an expression that failed to check.
fn fallback(expected: ValueType) -> TypedExpr {
    match expected {
        ValueType::String => TypedExpr::text(String::new()),
        ValueType::Boolean => TypedExpr::boolean(false),
        ValueType::Number | ValueType::Object => TypedExpr::number(0.0),
    }
}
