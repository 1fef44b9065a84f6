//! End-to-end pipeline tests: authored event tree → diagnostics + code.
//!
//! Covers:
//! - emission order (siblings, conditions before actions)
//! - disabled and comment events
//! - loop index scoping and shadowing
//! - missing automatisms, modifier expansion
//! - zero fallback for broken value expressions
//! - optional parameters, sound channels
//! - cancellation, maximum depth
//! - the JSON request API and options

use evgen_compiler::{
    check_json, compile_json, AbortReason, CancellationToken, Catalog, CompileError,
    CompileOptions, CompileResult, Compiler, ObjectRegistry,
};
use evgen_types::event::{Event, EventList, Instruction};
use evgen_types::{
    Backend, DiagnosticCategory, DiagnosticKind, Diagnostics, ErrorCode, Severity, Variable,
    VariablesContainer,
};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn registry() -> ObjectRegistry {
    ObjectRegistry::new()
        .with_object("Hero", "Sprite")
        .with_automatism("Hero", "Move", "TopDownMovementAutomatism")
        .with_object("Enemy", "Sprite")
        .with_object("Coin", "Sprite")
        .with_group("Actors", ["Hero", "Enemy"])
}

fn globals() -> VariablesContainer {
    VariablesContainer::new()
        .with("Score", Variable::Number(0.0))
        .with("Sum", Variable::Number(0.0))
        .with("Name", Variable::String(String::new()))
}

fn instr(name: &str, params: &[&str]) -> Instruction {
    Instruction::new(name, params.iter().copied())
}

fn compile_with(events: Vec<Event>, options: CompileOptions) -> CompileResult {
    let catalog = Catalog::builtin();
    let registry = registry();
    Compiler::new(&catalog, &registry)
        .with_globals(globals())
        .with_options(options)
        .compile(&EventList(events))
        .unwrap_or_else(|e| panic!("compile failed: {e}"))
}

fn compile(events: Vec<Event>) -> CompileResult {
    compile_with(events, CompileOptions::default())
}

fn js(result: &CompileResult) -> &str {
    &result
        .output(Backend::Js)
        .unwrap_or_else(|| panic!("no js output: {:?}", result.aborted))
        .source
}

fn native(result: &CompileResult) -> &str {
    &result
        .output(Backend::Native)
        .unwrap_or_else(|| panic!("no native output: {:?}", result.aborted))
        .source
}

fn codes(diagnostics: &Diagnostics) -> Vec<ErrorCode> {
    diagnostics.iter().map(|d| d.code).collect()
}

fn assert_contains(source: &str, needle: &str) {
    assert!(
        source.contains(needle),
        "expected generated code to contain:\n  {needle}\n--- source ---\n{source}"
    );
}

fn line_of(source: &str, needle: &str) -> usize {
    source
        .lines()
        .position(|l| l.contains(needle))
        .unwrap_or_else(|| panic!("'{needle}' not found in:\n{source}"))
}

fn set_score(value: &str) -> Instruction {
    instr("ModVarScene", &["Score", "=", value])
}

// ══════════════════════════════════════════════════════════════════════════════
// Ordering
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_siblings_emit_in_order() {
    let result = compile(vec![
        Event::standard().with_action(set_score("1")),
        Event::standard().with_action(set_score("2")),
        Event::standard().with_action(set_score("3")),
    ]);
    assert!(result.success, "{:?}", result.diagnostics);
    let source = js(&result);
    let first = line_of(source, r#"get("Score").setNumber(1);"#);
    let second = line_of(source, r#"get("Score").setNumber(2);"#);
    let third = line_of(source, r#"get("Score").setNumber(3);"#);
    assert!(first < second && second < third);
}

#[test]
fn test_conditions_before_actions_before_sub_events() {
    let result = compile(vec![Event::standard()
        .with_condition(instr("VarScene", &["Score", ">", "10"]))
        .with_action(set_score("0"))
        .with_sub_event(Event::standard().with_action(instr("ModVarScene", &["Sum", "+", "1"])))]);
    let source = js(&result);
    let condition = line_of(source, r#"get("Score").getAsNumber() > 10)"#);
    let action = line_of(source, r#"get("Score").setNumber(0);"#);
    let sub_event = line_of(source, r#"get("Sum").setNumber((runtimeScene"#);
    assert!(condition < action && action < sub_event);
}

#[test]
fn test_event_count_and_program_shape() {
    let catalog = Catalog::builtin();
    let registry = registry();
    let events = EventList(vec![
        Event::standard()
            .with_action(set_score("1"))
            .with_sub_event(Event::standard().with_action(set_score("2"))),
        Event::comment("notes"),
        Event::standard().with_action(set_score("3")),
    ]);
    let lowered = Compiler::new(&catalog, &registry)
        .with_globals(globals())
        .lower(&events);
    let program = lowered.program.unwrap();
    assert_eq!(program.event_count(), 3);
    let ids: Vec<u32> = program.events.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![0, 2]);
    assert_eq!(program.events[0].children[0].id, 1);
    // The comment still occupies its slot in the path.
    assert_eq!(program.events[1].path.to_string(), "events[2]");
}

// ══════════════════════════════════════════════════════════════════════════════
// Disabled and comment events
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_disabled_event_and_subtree_are_skipped() {
    let broken = Event::standard()
        .with_action(instr("Teleport", &["Hero"]))
        .with_sub_event(Event::standard().with_action(set_score("99")));
    let result = compile(vec![
        broken.disabled(),
        Event::standard().with_action(set_score("1")),
    ]);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    assert_eq!(result.event_count, 1);
    assert!(!js(&result).contains("setNumber(99)"));
    assert_contains(js(&result), r#"get("Score").setNumber(1);"#);
}

#[test]
fn test_comment_events_are_transparent() {
    let with_comment = compile(vec![
        Event::comment("Scoring"),
        Event::standard().with_action(set_score("1")),
    ]);
    assert!(with_comment.success);
    assert_eq!(with_comment.event_count, 1);
    assert_contains(js(&with_comment), "// events[1] (event 0)");
}

// ══════════════════════════════════════════════════════════════════════════════
// Loop indexes and scoping
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_loop_index_visible_in_sub_events_not_siblings() {
    let result = compile(vec![
        Event::repeat("3", "i")
            .with_sub_event(Event::standard().with_action(instr("ModVarScene", &["Sum", "+", "i"]))),
        Event::standard().with_action(instr("ModVarScene", &["Sum", "+", "i"])),
    ]);
    let errors: Vec<_> = result.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1, "{:?}", result.diagnostics);
    assert_eq!(errors[0].code, ErrorCode::UNKNOWN_SYMBOL);
    assert_eq!(errors[0].location.path.to_string(), "events[1]");
    assert!(errors[0].message.contains("'i'"));
}

#[test]
fn test_redeclaring_loop_index_warns_without_aborting() {
    let result = compile(vec![Event::repeat("2", "i").with_sub_event(
        Event::standard()
            .with_variable("i", Variable::Number(7.0))
            .with_action(instr("ModVarScene", &["Sum", "+", "i"])),
    )]);
    assert!(result.success, "{:?}", result.diagnostics);
    assert_eq!(result.diagnostics.count(DiagnosticKind::ShadowedLoopIndex), 1);
    assert_eq!(result.diagnostics.total_warnings, 1);
    assert_eq!(result.outputs.len(), 2);
}

#[test]
fn test_assigning_loop_index_warns() {
    let result = compile(vec![
        Event::repeat("2", "i").with_action(instr("ModVarScene", &["i", "=", "5"]))
    ]);
    assert!(result.success);
    assert_eq!(codes(&result.diagnostics), vec![ErrorCode::LOOP_INDEX_ASSIGNED]);
    assert_eq!(result.diagnostics.entries[0].severity, Severity::Warning);
}

#[test]
fn test_local_variables_are_scoped_to_the_event() {
    let result = compile(vec![
        Event::standard()
            .with_variable("Local", Variable::Number(1.0))
            .with_action(instr("ModVarScene", &["Local", "+", "1"])),
        Event::standard().with_action(instr("ModVarScene", &["Local", "+", "1"])),
    ]);
    assert_eq!(codes(&result.diagnostics), vec![ErrorCode::UNKNOWN_SYMBOL]);
    assert_contains(
        js(&result),
        r#"const v0 = gdjs.Variable.fromJSON({"type":"number","value":1.0});"#,
    );
}

#[test]
fn test_repeat_count_is_bound_in_the_enclosing_scope() {
    let result = compile(vec![Event::repeat("i + 1", "i")]);
    assert_eq!(codes(&result.diagnostics), vec![ErrorCode::UNKNOWN_SYMBOL]);
    // The count falls back to zero iterations.
    assert_contains(js(&result), "const n0 = Math.max(0, Math.floor(0));");
}

// ══════════════════════════════════════════════════════════════════════════════
// Automatisms and modifiers
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_missing_automatism_reports_once_and_keeps_event() {
    let result = compile(vec![Event::standard()
        .with_action(instr(
            "TopDownMovementAutomatism::SimulateControl",
            &["Enemy", "Move", "\"Left\""],
        ))
        .with_action(set_score("1"))]);
    assert_eq!(result.diagnostics.count(DiagnosticKind::MissingAutomatismError), 1);
    assert_eq!(result.diagnostics.total_errors, 1);
    assert!(!result.success);
    let source = js(&result);
    assert!(!source.contains("simulateControl"));
    assert_contains(source, r#"get("Score").setNumber(1);"#);
}

#[test]
fn test_group_automatism_names_missing_members() {
    let result = compile(vec![Event::standard().with_action(instr(
        "TopDownMovementAutomatism::SimulateControl",
        &["Actors", "Move", "\"Up\""],
    ))]);
    let errors: Vec<_> = result.diagnostics.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ErrorCode::MISSING_AUTOMATISM);
    assert!(errors[0].message.contains("missing on Enemy"), "{}", errors[0].message);
}

#[test]
fn test_modifier_expands_to_get_op_set() {
    for op in ["+", "-", "*", "/"] {
        let result =
            compile(vec![Event::standard().with_action(instr("MettreX", &["Hero", op, "5"]))]);
        assert!(result.success, "{op}: {:?}", result.diagnostics);
        assert_contains(js(&result), &format!("obj.setX((obj.getX() {op} 5));"));
        assert_contains(native(&result), &format!("obj->SetX((obj->GetX() {op} 5.0));"));
    }
    let assign =
        compile(vec![Event::standard().with_action(instr("MettreX", &["Hero", "=", "5"]))]);
    assert_contains(js(&assign), "obj.setX(5);");
}

#[test]
fn test_automatism_modifier_goes_through_behavior() {
    let result = compile(vec![Event::standard().with_action(instr(
        "TopDownMovementAutomatism::MaxSpeed",
        &["Hero", "Move", "*", "2"],
    ))]);
    assert!(result.success, "{:?}", result.diagnostics);
    assert_contains(
        js(&result),
        r#"obj.getBehavior("Move").setMaxSpeed((obj.getBehavior("Move").getMaxSpeed() * 2));"#,
    );
}

#[test]
fn test_group_action_iterates_every_member() {
    let result =
        compile(vec![Event::standard().with_action(instr("Delete", &["Actors"]))]);
    assert!(result.success, "{:?}", result.diagnostics);
    let source = js(&result);
    assert_contains(source, r#"runtimeScene.getObjects("Enemy")"#);
    assert_contains(source, r#"runtimeScene.getObjects("Hero")"#);
    assert_eq!(source.matches("obj.deleteFromScene(runtimeScene);").count(), 2);
}

// ══════════════════════════════════════════════════════════════════════════════
// Broken value expressions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_broken_operand_falls_back_to_zero() {
    let result = compile(vec![Event::standard()
        .with_condition(instr("VarScene", &["Score", ">", "1 +"]))
        .with_action(set_score("2 *"))]);
    assert!(!result.success);
    assert_eq!(result.diagnostics.total_errors, 2);
    assert!(codes(&result.diagnostics)
        .iter()
        .all(|c| c.category() == DiagnosticCategory::Syntax));

    // The event keeps its guard and its action, with 0 for each operand.
    let source = js(&result);
    assert_contains(source, r#"get("Score").getAsNumber() > 0)"#);
    assert_contains(source, r#"get("Score").setNumber(0);"#);
    assert!(line_of(source, "> 0)") < line_of(source, "setNumber(0);"));
}

#[test]
fn test_broken_string_operand_falls_back_to_empty() {
    let result = compile(vec![Event::standard()
        .with_action(instr("ModVarSceneTxt", &["Name", "=", "\"open"]))
        .with_action(set_score("1"))]);
    assert_eq!(codes(&result.diagnostics), vec![ErrorCode::UNTERMINATED_STRING]);
    let source = js(&result);
    assert_contains(source, r#"get("Name").setString("");"#);
    assert_contains(source, r#"get("Score").setNumber(1);"#);
}

#[test]
fn test_unresolved_instruction_parameters_still_omit_the_instruction() {
    let result = compile(vec![Event::standard()
        .with_action(instr("ModVarScene", &["Score", "%", "1"]))
        .with_action(instr("ModVarScene", &["Lives", "=", "1"]))
        .with_action(set_score("3"))]);
    assert_eq!(
        codes(&result.diagnostics),
        vec![ErrorCode::INVALID_OPERATOR, ErrorCode::UNKNOWN_SYMBOL]
    );
    let source = js(&result);
    assert_eq!(source.matches(".setNumber(").count(), 1);
    assert_contains(source, r#"get("Score").setNumber(3);"#);
}

// ══════════════════════════════════════════════════════════════════════════════
// Optional parameters and sound channels
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_omitted_optional_parameters_take_their_defaults() {
    let result = compile(vec![Event::standard()
        .with_action(instr("PlaySound", &["jump.wav"]))
        .with_action(instr("PlaySound", &["hit.wav", "", "50"]))]);
    assert!(result.success, "{:?}", result.diagnostics);
    let source = js(&result);
    assert_contains(
        source,
        r#"gdjs.evtTools.sound.playSound(runtimeScene, "jump.wav", false, 100, 1);"#,
    );
    assert_contains(
        source,
        r#"gdjs.evtTools.sound.playSound(runtimeScene, "hit.wav", false, 50, 1);"#,
    );
}

#[test]
fn test_optional_parameter_count_is_bounded() {
    let result = compile(vec![Event::standard().with_action(instr(
        "PlaySound",
        &["jump.wav", "yes", "100", "1", "7"],
    ))]);
    assert_eq!(codes(&result.diagnostics), vec![ErrorCode::WRONG_ARG_COUNT]);
    assert_eq!(
        result.diagnostics.entries[0].message,
        "'PlaySound' expects 1 to 4 parameter(s), got 5"
    );

    let missing = compile(vec![Event::standard().with_action(instr("PlaySoundCanal", &["a.wav"]))]);
    assert_eq!(
        missing.diagnostics.entries[0].message,
        "'PlaySoundCanal' expects 2 to 5 parameter(s), got 1"
    );
}

#[test]
fn test_channel_volume_modifier_passes_the_channel_to_getter_and_setter() {
    let result = compile(vec![
        Event::standard().with_action(instr("ModVolumeSoundCanal", &["2", "*", "2"]))
    ]);
    assert!(result.success, "{:?}", result.diagnostics);
    assert_contains(
        js(&result),
        "gdjs.evtTools.sound.setSoundOnChannelVolume(runtimeScene, 2, \
         (gdjs.evtTools.sound.getSoundOnChannelVolume(runtimeScene, 2) * 2));",
    );
    assert_contains(
        native(&result),
        "SetSoundChannelVolume(scene, 2.0, (GetSoundChannelVolume(scene, 2.0) * 2.0));",
    );
}

#[test]
fn test_global_volume_modifier_uses_its_catalog_name() {
    let result = compile(vec![Event::standard()
        .with_action(instr("ModGlobalVolume", &["-", "10"]))
        .with_action(instr("GlobalVolume", &["-", "10"]))]);
    assert_eq!(codes(&result.diagnostics), vec![ErrorCode::UNKNOWN_INSTRUCTION]);
    let location = result.diagnostics.entries[0].location.to_string();
    assert!(location.starts_with("events[0] action 1"), "{location}");
    assert_contains(
        js(&result),
        "gdjs.evtTools.sound.setGlobalVolume(runtimeScene, \
         (gdjs.evtTools.sound.getGlobalVolume(runtimeScene) - 10));",
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// Loops
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_while_with_infinite_loop_warning_is_guarded() {
    let options = CompileOptions {
        while_iteration_limit: 50,
        ..CompileOptions::default()
    };
    let result = compile_with(
        vec![Event::while_loop(vec![instr("VarScene", &["Score", "<", "10"])])
            .with_infinite_loop_warning()
            .with_action(instr("ModVarScene", &["Score", "+", "1"]))],
        options,
    );
    assert!(result.success, "{:?}", result.diagnostics);
    assert_contains(js(&result), "if (i0 >= 50) {");
}

#[test]
fn test_stop_loop_targets_innermost_loop() {
    let catalog = Catalog::builtin();
    let registry = registry();
    let events = EventList(vec![Event::repeat("3", "").with_sub_event(
        Event::repeat("4", "").with_sub_event(
            Event::standard().with_action(instr("BuiltinCommonInstructions::StopLoop", &[])),
        ),
    )]);
    let program = Compiler::new(&catalog, &registry)
        .lower(&events)
        .program
        .unwrap();
    let outer = &program.events[0];
    let inner = &outer.children[0];
    assert!(!outer.control.is_stoppable());
    assert!(inner.control.is_stoppable());
    assert_eq!(
        inner.children[0].actions[0].effect,
        evgen_types::ir::ActionEffect::StopLoop {
            loop_event: inner.id
        }
    );
}

#[test]
fn test_for_each_over_group_is_rejected() {
    let result = compile(vec![
        Event::for_each("Actors").with_action(set_score("1")),
        Event::for_each("Coin").with_action(set_score("2")),
    ]);
    assert_eq!(codes(&result.diagnostics), vec![ErrorCode::TYPE_MISMATCH]);
    assert_eq!(result.event_count, 1);
    // The rejected event keeps its id, so the accepted one is event 1.
    assert_contains(js(&result), "let o0_1 = [e1[i1]];");
}

// ══════════════════════════════════════════════════════════════════════════════
// Cancellation and depth
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_cancelled_run_produces_no_code() {
    let catalog = Catalog::builtin();
    let registry = registry();
    let token = CancellationToken::new();
    token.cancel();
    let result = Compiler::new(&catalog, &registry)
        .with_cancellation(token)
        .compile(&EventList(vec![Event::standard().with_action(set_score("1"))]))
        .unwrap();
    assert_eq!(result.aborted, Some(AbortReason::Cancelled));
    assert!(result.outputs.is_empty());
    assert!(!result.success);
    assert_eq!(codes(&result.diagnostics), vec![ErrorCode::CANCELLED]);
    assert_eq!(result.diagnostics.entries[0].severity, Severity::Info);
}

#[test]
fn test_max_depth_aborts_the_run() {
    let nested = Event::standard().with_sub_event(
        Event::standard().with_sub_event(Event::standard().with_action(set_score("1"))),
    );
    let result = compile_with(vec![nested.clone()], CompileOptions::default().with_max_depth(2));
    assert_eq!(result.aborted, Some(AbortReason::MaxDepthExceeded));
    assert!(result.outputs.is_empty());
    assert_eq!(codes(&result.diagnostics), vec![ErrorCode::MAX_DEPTH_EXCEEDED]);
    assert_eq!(
        result.diagnostics.entries[0].location.path.to_string(),
        "events[0].events[0].events[0]"
    );

    let ok = compile_with(vec![nested], CompileOptions::default().with_max_depth(3));
    assert!(ok.success);
    assert_eq!(ok.event_count, 3);
}

// ══════════════════════════════════════════════════════════════════════════════
// Options
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_backends_option_selects_outputs() {
    let result = compile_with(
        vec![Event::standard().with_action(set_score("1"))],
        CompileOptions::default().with_backends([Backend::Js]),
    );
    assert_eq!(result.outputs.len(), 1);
    assert!(result.output(Backend::Native).is_none());
}

#[test]
fn test_entry_point_option_names_the_function() {
    let result = compile_with(
        vec![Event::standard().with_action(set_score("1"))],
        CompileOptions::default().with_entry_point("Level1"),
    );
    assert_contains(js(&result), "gdjs.evgen.Level1 = function(runtimeScene) {");
    assert_contains(native(&result), "void Level1(RuntimeScene & scene) {");
}

#[test]
fn test_outputs_carry_sha256_of_source() {
    let result = compile(vec![Event::standard().with_action(set_score("1"))]);
    for output in &result.outputs {
        assert_eq!(output.hash, evgen_codegen::sha256_hex(&output.source));
        assert_eq!(output.hash.len(), 64);
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// JSON request API
// ══════════════════════════════════════════════════════════════════════════════

const REQUEST: &str = r#"{
  "events": [{
    "type": "BuiltinCommonInstructions::Repeat",
    "repeatExpression": "5",
    "loopIndexVariable": "i",
    "variables": [{ "name": "Local", "type": "number", "value": 1 }],
    "conditions": [],
    "actions": [{ "type": { "value": "ModVarScene" }, "parameters": ["Sum", "+", "i"] }],
    "events": []
  }],
  "objects": {
    "objects": { "Hero": { "type": "Sprite" } }
  },
  "globals": [{ "name": "Sum", "type": "number", "value": 0 }],
  "options": { "backends": ["js"] }
}"#;

#[test]
fn test_compile_json_request() {
    let result = compile_json(REQUEST).unwrap();
    assert!(result.success, "{:?}", result.diagnostics);
    assert_eq!(result.outputs.len(), 1);
    assert_eq!(result.outputs[0].backend, Backend::Js);
    assert_contains(&result.outputs[0].source, "for (let i0 = 0; i0 < n0; i0++) {");

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["success"], true);
    assert_eq!(json["event_count"], 1);
    assert!(json.get("aborted").is_none());
}

#[test]
fn test_check_json_reports_structured_diagnostics() {
    let request = REQUEST.replace(r#"["Sum", "+", "i"]"#, r#"["Missing", "+", "i"]"#);
    let diagnostics = check_json(&request).unwrap();
    assert_eq!(codes(&diagnostics), vec![ErrorCode::UNKNOWN_SYMBOL]);
    let json = serde_json::to_value(&diagnostics.entries[0]).unwrap();
    assert_eq!(json["severity"], "error");
    assert_eq!(json["kind"], "UnknownSymbolError");
    assert_eq!(json["location"]["site"], "action");
    assert_eq!(json["location"]["parameter"], 0);
}

#[test]
fn test_invalid_json_is_an_input_error() {
    let err = compile_json("{ not json").unwrap_err();
    assert!(matches!(err, CompileError::Input(_)));
    assert!(err.to_string().starts_with("invalid compile request"));
}

#[test]
fn test_request_without_fields_uses_defaults() {
    let result = compile_json("{}").unwrap();
    assert!(result.success);
    assert_eq!(result.event_count, 0);
    assert_eq!(result.outputs.len(), 2);
}
