//! Integration tests for the evgen code emitter.
//!
//! Tests validate:
//! - Object picking (root lists, per-event copies, condition filters)
//! - Condition chaining and the per-event flag
//! - Loop constructs (repeat, while, for-each) and stop-loop
//! - Variables, modifiers and expression functions
//! - Source maps and byte-stable output
//! - Backend symbol resolution

use evgen_codegen::{emit, CodegenError, EmitOptions, GeneratedCode};
use evgen_types::ir::{
    ActionEffect, Arg, AssignOp, BoundAction, BoundCondition, Call, ConditionTest, Control,
    ExprTarget, LocalSlot, LoweredEvent, Program, RelOp, SlotId, Target, TypedExpr,
    TypedExprKind, ValueType, VarRef,
};
use evgen_types::{Backend, BackendSymbols, EventPath, Location, Variable};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn event(id: u32, path: EventPath) -> LoweredEvent {
    LoweredEvent {
        id,
        path,
        locals: Vec::new(),
        control: Control::Plain,
        conditions: Vec::new(),
        actions: Vec::new(),
        children: Vec::new(),
    }
}

fn root(index: usize) -> EventPath {
    EventPath::root().child(index)
}

fn both(symbol: &str) -> BackendSymbols {
    BackendSymbols::uniform(symbol)
}

fn call(symbol: &str, args: Vec<Arg>) -> Call {
    Call {
        symbols: both(symbol),
        args,
    }
}

fn object(name: &str) -> Target {
    Target::Object {
        object: name.into(),
        members: vec![name.into()],
    }
}

fn condition(
    path: &EventPath,
    index: usize,
    target: Target,
    test: ConditionTest,
) -> BoundCondition {
    BoundCondition {
        name: "Test".into(),
        location: Location::condition(path.clone(), index),
        inverted: false,
        target,
        test,
    }
}

fn action(path: &EventPath, index: usize, target: Target, effect: ActionEffect) -> BoundAction {
    BoundAction {
        name: "Do".into(),
        location: Location::action(path.clone(), index),
        target,
        effect,
    }
}

fn add_to_local(slot: u32, amount: f64) -> ActionEffect {
    ActionEffect::Variable {
        var: VarRef::local(SlotId(slot)),
        ty: ValueType::Number,
        op: AssignOp::Add,
        operand: TypedExpr::number(amount),
    }
}

fn program(events: Vec<LoweredEvent>) -> Program {
    Program { events }
}

fn js(program: &Program) -> GeneratedCode {
    emit(program, Backend::Js, &EmitOptions::default())
        .unwrap_or_else(|e| panic!("emit failed: {e}"))
}

fn native(program: &Program) -> GeneratedCode {
    emit(program, Backend::Native, &EmitOptions::default())
        .unwrap_or_else(|e| panic!("emit failed: {e}"))
}

fn assert_contains(source: &str, needle: &str) {
    assert!(
        source.contains(needle),
        "expected generated code to contain:\n  {needle}\n--- source ---\n{source}"
    );
}

fn line_of(source: &str, needle: &str) -> u32 {
    source
        .lines()
        .position(|l| l.contains(needle))
        .map(|i| i as u32 + 1)
        .unwrap_or_else(|| panic!("'{needle}' not found in:\n{source}"))
}

/// `Hero.IsVisible()` as a condition, `Hero.Hide()` as an action.
fn hero_event() -> LoweredEvent {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.conditions.push(condition(
        &path,
        0,
        object("Hero"),
        ConditionTest::Call(call("isVisible", vec![])),
    ));
    e.actions.push(action(
        &path,
        0,
        object("Hero"),
        ActionEffect::Call(call("hide", vec![])),
    ));
    e
}

// ══════════════════════════════════════════════════════════════════════════════
// Picking
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_root_lists_start_from_scene() {
    let code = js(&program(vec![hero_event()]));
    assert_contains(&code.source, r#"let o0_r = runtimeScene.getObjects("Hero").slice();"#);
    assert_contains(&code.source, "let o0_0 = o0_r.slice();");
}

#[test]
fn test_object_condition_filters_picked_list() {
    let code = js(&program(vec![hero_event()]));
    assert_contains(&code.source, "o0_0 = o0_0.filter((obj) => obj.isVisible());");
    assert_contains(&code.source, "c0 = o0_0.length > 0;");
    assert_contains(&code.source, "if (c0) {");
    assert_contains(&code.source, "for (const obj of o0_0) {");
    assert_contains(&code.source, "obj.hide();");
}

#[test]
fn test_inverted_condition_negates_test() {
    let mut e = hero_event();
    e.conditions[0].inverted = true;
    let code = js(&program(vec![e]));
    assert_contains(&code.source, "o0_0.filter((obj) => !(obj.isVisible()));");
}

#[test]
fn test_group_action_runs_for_every_member() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.actions.push(action(
        &path,
        0,
        Target::Object {
            object: "Enemies".into(),
            members: vec!["Bat".into(), "Slime".into()],
        },
        ActionEffect::Call(call("destroy", vec![])),
    ));
    let code = js(&program(vec![e]));
    // Objects are indexed alphabetically.
    assert_contains(&code.source, "for (const obj of o0_0) {");
    assert_contains(&code.source, "for (const obj of o1_0) {");
    assert_contains(&code.source, r#"runtimeScene.getObjects("Slime")"#);
}

#[test]
fn test_sub_event_copies_parent_picking() {
    let mut parent = hero_event();
    let child_path = root(0).child(0);
    let mut child = event(1, child_path.clone());
    child.actions.push(action(
        &child_path,
        0,
        object("Hero"),
        ActionEffect::Call(call("flash", vec![])),
    ));
    parent.children.push(child);
    let code = js(&program(vec![parent]));
    assert_contains(&code.source, "let o0_1 = o0_0.slice();");
    // The sub-event runs under the parent's condition flag.
    assert!(line_of(&code.source, "if (c0) {") < line_of(&code.source, "let o0_1"));
}

#[test]
fn test_later_conditions_run_only_while_flag_holds() {
    let path = root(0);
    let mut e = hero_event();
    e.conditions.push(condition(
        &path,
        1,
        Target::Free,
        ConditionTest::Call(call(
            "isKeyPressed",
            vec![Arg::Context, Arg::Value(TypedExpr::text("Left"))],
        )),
    ));
    let code = js(&program(vec![e]));
    let guard = line_of(&code.source, "if (c0) {");
    let second = line_of(&code.source, r#"c0 = isKeyPressed(runtimeScene, "Left");"#);
    assert!(guard < second);
}

// ══════════════════════════════════════════════════════════════════════════════
// Loops
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_repeat_with_index() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.locals.push(LocalSlot {
        slot: SlotId(0),
        name: "i".into(),
        initial: Variable::Number(0.0),
        loop_index: true,
    });
    e.control = Control::Repeat {
        count: TypedExpr::number(5.0),
        index: Some(SlotId(0)),
        stoppable: false,
    };
    let code = js(&program(vec![e]));
    assert_contains(
        &code.source,
        r#"const v0 = gdjs.Variable.fromJSON({"type":"number","value":0.0});"#,
    );
    assert_contains(&code.source, "const n0 = Math.max(0, Math.floor(5));");
    assert_contains(&code.source, "for (let i0 = 0; i0 < n0; i0++) {");
    assert_contains(&code.source, "v0.setNumber(i0);");
}

#[test]
fn test_repeat_native_uses_doubles() {
    let mut e = event(0, root(0));
    e.control = Control::Repeat {
        count: TypedExpr::number(3.0),
        index: None,
        stoppable: false,
    };
    let code = native(&program(vec![e]));
    assert_contains(&code.source, "const double n0 = std::max(0.0, std::floor(3.0));");
    assert_contains(&code.source, "for (double i0 = 0.0; i0 < n0; i0 += 1.0) {");
    assert_contains(&code.source, "void EvgenEvents(RuntimeScene & scene) {");
}

#[test]
fn test_stop_loop_sets_flag_checked_by_loop() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.control = Control::Repeat {
        count: TypedExpr::number(10.0),
        index: None,
        stoppable: true,
    };
    e.actions
        .push(action(&path, 0, Target::Free, ActionEffect::StopLoop { loop_event: 0 }));
    let code = js(&program(vec![e]));
    assert_contains(&code.source, "let s0 = false;");
    assert_contains(&code.source, "for (let i0 = 0; i0 < n0 && !s0; i0++) {");
    assert_contains(&code.source, "s0 = true;");
}

#[test]
fn test_while_loop_with_iteration_limit() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.control = Control::While {
        conditions: vec![condition(
            &path,
            0,
            Target::Free,
            ConditionTest::Variable {
                var: VarRef::global("Lives"),
                ty: ValueType::Number,
                op: RelOp::Gt,
                operand: TypedExpr::number(0.0),
            },
        )],
        index: None,
        iteration_limit: Some(100),
        stoppable: false,
    };
    e.actions.push(action(&path, 0, Target::Free, ActionEffect::Variable {
        var: VarRef::global("Lives"),
        ty: ValueType::Number,
        op: AssignOp::Sub,
        operand: TypedExpr::number(1.0),
    }));
    let code = js(&program(vec![e]));
    assert_contains(&code.source, "while (true) {");
    assert_contains(&code.source, "if (i0 >= 100) {");
    assert_contains(
        &code.source,
        r#"w0 = (runtimeScene.getVariables().get("Lives").getAsNumber() > 0);"#,
    );
    assert_contains(&code.source, "if (!w0) {");
    assert_contains(
        &code.source,
        r#"runtimeScene.getVariables().get("Lives").setNumber((runtimeScene.getVariables().get("Lives").getAsNumber() - 1));"#,
    );
}

#[test]
fn test_for_each_narrows_to_one_instance() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.control = Control::ForEach {
        object: "Coin".into(),
        index: None,
        stoppable: false,
    };
    e.actions.push(action(
        &path,
        0,
        object("Coin"),
        ActionEffect::Call(call("spin", vec![])),
    ));
    let code = js(&program(vec![e]));
    assert_contains(&code.source, "let e0 = o0_r.slice();");
    assert_contains(&code.source, "for (let i0 = 0; i0 < e0.length; i0++) {");
    assert_contains(&code.source, "let o0_0 = [e0[i0]];");
}

// ══════════════════════════════════════════════════════════════════════════════
// Variables, modifiers, expressions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_local_variable_accumulates() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.locals.push(LocalSlot {
        slot: SlotId(3),
        name: "Total".into(),
        initial: Variable::Number(1.0),
        loop_index: false,
    });
    e.actions.push(action(&path, 0, Target::Free, add_to_local(3, 2.0)));
    let code = native(&program(vec![e]));
    assert_contains(
        &code.source,
        r#"gd::Variable v3 = gd::Variable::FromJSON("{\"type\":\"number\",\"value\":1.0}");"#,
    );
    assert_contains(&code.source, "v3.SetValue((v3.GetValue() + 2.0));");
}

#[test]
fn test_string_local_initializer_is_escaped() {
    let path = root(0);
    let mut e = event(0, path);
    e.locals.push(LocalSlot {
        slot: SlotId(4),
        name: "Label".into(),
        initial: Variable::String(")evgen\"; exit(1); //".into()),
        loop_index: false,
    });
    let code = native(&program(vec![e]));
    assert_contains(
        &code.source,
        r#"gd::Variable v4 = gd::Variable::FromJSON("{\"type\":\"string\",\"value\":\")evgen\\\"; exit(1); //\"}");"#,
    );
    assert!(!code.source.contains("R\""), "{}", code.source);
}

#[test]
fn test_modifier_reads_getter_then_calls_setter() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.actions.push(action(
        &path,
        0,
        object("Hero"),
        ActionEffect::Modify {
            getter: both("getX"),
            setter: both("setX"),
            args: vec![],
            ty: ValueType::Number,
            op: AssignOp::Mul,
            operand: TypedExpr::number(2.0),
        },
    ));
    let code = js(&program(vec![e]));
    assert_contains(&code.source, "obj.setX((obj.getX() * 2));");
}

#[test]
fn test_object_expression_outside_its_instruction_uses_first_instance() {
    let path = root(0);
    let mut e = event(0, path.clone());
    let hero_x = TypedExpr {
        kind: TypedExprKind::Call {
            target: ExprTarget::Object("Hero".into()),
            symbols: both("getX"),
            args: vec![],
        },
        ty: ValueType::Number,
    };
    e.actions.push(action(&path, 0, Target::Free, ActionEffect::Variable {
        var: VarRef::global("Seen"),
        ty: ValueType::Number,
        op: AssignOp::Set,
        operand: hero_x,
    }));
    let code = js(&program(vec![e]));
    assert_contains(&code.source, "(o0_0.length > 0 ? o0_0[0].getX() : 0)");
}

#[test]
fn test_automatism_action_goes_through_behavior() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.actions.push(action(
        &path,
        0,
        Target::Automatism {
            object: "Hero".into(),
            members: vec!["Hero".into()],
            automatism: "Platformer".into(),
        },
        ActionEffect::Call(call("jump", vec![])),
    ));
    let js_code = js(&program(vec![e.clone()]));
    assert_contains(&js_code.source, r#"obj.getBehavior("Platformer").jump();"#);
    let native_code = native(&program(vec![e]));
    assert_contains(&native_code.source, r#"obj->GetAutomatism("Platformer")->jump();"#);
}

#[test]
fn test_object_argument_passes_picked_lists() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.actions.push(action(
        &path,
        0,
        Target::Free,
        ActionEffect::Call(call(
            "countAll",
            vec![Arg::Object {
                object: "Hero".into(),
                members: vec!["Hero".into()],
            }],
        )),
    ));
    let code = js(&program(vec![e]));
    assert_contains(&code.source, r#"countAll({ "Hero": o0_0 });"#);
}

// ══════════════════════════════════════════════════════════════════════════════
// Source maps, determinism, symbols
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_source_map_points_at_innermost_event() {
    let mut parent = hero_event();
    let child_path = root(0).child(0);
    let mut child = event(1, child_path.clone());
    child.actions.push(action(
        &child_path,
        0,
        object("Hero"),
        ActionEffect::Call(call("flash", vec![])),
    ));
    parent.children.push(child);
    let code = js(&program(vec![parent, event(2, root(1))]));

    let flash = line_of(&code.source, "obj.flash();");
    assert_eq!(code.source_map.find_by_line(flash).unwrap().event_id, 1);
    let hide = line_of(&code.source, "obj.hide();");
    let entry = code.source_map.find_by_line(hide).unwrap();
    assert_eq!(entry.event_id, 0);
    assert_eq!(entry.path.to_string(), "events[0]");
    assert_eq!(code.source_map.entries.len(), 3);
}

#[test]
fn test_output_is_deterministic() {
    let prog = program(vec![hero_event(), event(1, root(1))]);
    let first = js(&prog);
    for i in 0..100 {
        let again = js(&prog);
        assert_eq!(again.source, first.source, "source differs on iteration {i}");
        assert_eq!(again.hash, first.hash);
    }
    assert_ne!(native(&prog).hash, first.hash);
}

#[test]
fn test_missing_backend_symbol_is_an_error() {
    let path = root(0);
    let mut e = event(0, path.clone());
    e.actions.push(action(
        &path,
        0,
        Target::Free,
        ActionEffect::Call(Call {
            symbols: BackendSymbols::new().with(Backend::Native, "NativeOnly"),
            args: vec![],
        }),
    ));
    let prog = program(vec![e]);
    assert!(native(&prog).source.contains("NativeOnly();"));
    match emit(&prog, Backend::Js, &EmitOptions::default()) {
        Err(CodegenError::UnresolvedSymbol(msg)) => assert!(msg.contains("NativeOnly")),
        other => panic!("expected UnresolvedSymbol, got {other:?}"),
    }
}
