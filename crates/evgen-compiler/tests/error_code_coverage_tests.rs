//! Error code coverage tests: every defined code (E100–E599) has at least
//! one test that asserts it is emitted, at the expected severity.

use evgen_compiler::{
    CancellationToken, Catalog, CompileOptions, Compiler, InstructionMetadata, ObjectRegistry,
};
use evgen_types::event::{Event, EventList, Instruction};
use evgen_types::{
    Backend, BackendSymbols, DiagnosticCategory, DiagnosticKind, Diagnostics, ErrorCode, Severity,
    Variable, VariablesContainer,
};

fn registry() -> ObjectRegistry {
    ObjectRegistry::new()
        .with_object("Hero", "Sprite")
        .with_automatism("Hero", "Move", "TopDownMovementAutomatism")
        .with_object("Enemy", "Sprite")
        .with_group("Actors", ["Hero", "Enemy"])
}

fn instr(name: &str, params: &[&str]) -> Instruction {
    Instruction::new(name, params.iter().copied())
}

fn check_with(catalog: &Catalog, events: Vec<Event>, options: CompileOptions) -> Diagnostics {
    let registry = registry();
    let globals = VariablesContainer::new()
        .with("Score", Variable::Number(0.0))
        .with("Name", Variable::String(String::new()));
    Compiler::new(catalog, &registry)
        .with_globals(globals)
        .with_options(options)
        .check(&EventList(events))
}

fn check(events: Vec<Event>) -> Diagnostics {
    check_with(&Catalog::builtin(), events, CompileOptions::default())
}

fn action(name: &str, params: &[&str]) -> Diagnostics {
    check(vec![Event::standard().with_action(instr(name, params))])
}

fn assert_code(diagnostics: &Diagnostics, expected: ErrorCode) {
    assert!(
        diagnostics.iter().any(|d| d.code == expected),
        "expected {expected}, got: {:?}",
        diagnostics
            .iter()
            .map(|d| format!("{}: {}", d.code, d.message))
            .collect::<Vec<_>>()
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// E1xx: syntax
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn e100_unexpected_token() {
    assert_code(&action("ModVarScene", &["Score", "=", "1 +"]), ErrorCode::UNEXPECTED_TOKEN);
}

#[test]
fn e101_unterminated_string() {
    assert_code(
        &action("ModVarSceneTxt", &["Name", "=", "\"abc"]),
        ErrorCode::UNTERMINATED_STRING,
    );
}

#[test]
fn e102_unexpected_character() {
    assert_code(&action("ModVarScene", &["Score", "=", "1 # 2"]), ErrorCode::UNEXPECTED_CHARACTER);
}

#[test]
fn e103_empty_expression() {
    assert_code(&action("ModVarScene", &["Score", "=", "   "]), ErrorCode::EMPTY_EXPRESSION);
}

// ══════════════════════════════════════════════════════════════════════════════
// E2xx: symbols
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn e200_unknown_variable() {
    assert_code(&action("ModVarScene", &["Lives", "+", "1"]), ErrorCode::UNKNOWN_SYMBOL);
}

#[test]
fn e200_unknown_object() {
    assert_code(&action("Delete", &["Ghost"]), ErrorCode::UNKNOWN_SYMBOL);
}

#[test]
fn e200_unknown_function() {
    assert_code(&action("ModVarScene", &["Score", "=", "Sqrt(4)"]), ErrorCode::UNKNOWN_SYMBOL);
}

#[test]
fn e201_unknown_instruction() {
    assert_code(&action("Teleport", &["Hero"]), ErrorCode::UNKNOWN_INSTRUCTION);
}

#[test]
fn e201_action_used_as_condition() {
    let diagnostics = check(vec![
        Event::standard().with_condition(instr("ModVarScene", &["Score", "=", "1"]))
    ]);
    assert_code(&diagnostics, ErrorCode::UNKNOWN_INSTRUCTION);
}

#[test]
fn e202_missing_automatism() {
    assert_code(
        &action(
            "TopDownMovementAutomatism::SimulateControl",
            &["Enemy", "Move", "\"Left\""],
        ),
        ErrorCode::MISSING_AUTOMATISM,
    );
}

#[test]
fn e202_missing_automatism_in_expression() {
    assert_code(
        &action("ModVarScene", &["Score", "=", "Enemy.Move::Speed()"]),
        ErrorCode::MISSING_AUTOMATISM,
    );
}

#[test]
fn e203_missing_backend_symbol() {
    let mut catalog = Catalog::new();
    catalog.add_action(
        InstructionMetadata::new("Vibrate", "Vibrate the device")
            .symbols(BackendSymbols::new().with(Backend::Native, "Vibrate")),
    );
    let events = vec![Event::standard().with_action(instr("Vibrate", &[]))];
    let diagnostics = check_with(&catalog, events.clone(), CompileOptions::default());
    assert_code(&diagnostics, ErrorCode::MISSING_BACKEND_SYMBOL);
    assert!(diagnostics.entries[0].message.contains("js"));

    // Fine when only the native backend is requested.
    let native_only = CompileOptions::default().with_backends([Backend::Native]);
    assert!(check_with(&catalog, events, native_only).is_empty());
}

// ══════════════════════════════════════════════════════════════════════════════
// E3xx: types
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn e300_type_mismatch() {
    assert_code(&action("ModVarScene", &["Score", "=", "\"ten\""]), ErrorCode::TYPE_MISMATCH);
}

#[test]
fn e300_bad_yes_no() {
    assert_code(
        &action("PlaySound", &["jump.wav", "maybe", "100"]),
        ErrorCode::TYPE_MISMATCH,
    );
}

#[test]
fn e301_wrong_parameter_count() {
    assert_code(&action("ModVarScene", &["Score", "="]), ErrorCode::WRONG_ARG_COUNT);
}

#[test]
fn e301_wrong_argument_count() {
    assert_code(
        &action("ModVarScene", &["Score", "=", "Abs(1, 2)"]),
        ErrorCode::WRONG_ARG_COUNT,
    );
}

#[test]
fn e301_bare_function_that_takes_arguments() {
    let diagnostics = action("ModVarScene", &["Score", "=", "Abs + 1"]);
    let codes: Vec<ErrorCode> = diagnostics.iter().map(|d| d.code).collect();
    assert_eq!(codes, vec![ErrorCode::WRONG_ARG_COUNT]);
    let diagnostic = diagnostics.iter().next().unwrap();
    assert_eq!(diagnostic.message, "'Abs' expects 1 argument(s), got 0");
    assert_eq!(diagnostic.suggestion.as_deref(), Some("Call it with arguments: Abs(...)"));
}

#[test]
fn e302_invalid_operator_token() {
    assert_code(&action("ModVarScene", &["Score", "%", "1"]), ErrorCode::INVALID_OPERATOR);
}

#[test]
fn e302_operator_not_supported_for_strings() {
    assert_code(
        &action("ModVarSceneTxt", &["Name", "*", "\"x\""]),
        ErrorCode::INVALID_OPERATOR,
    );
}

// ══════════════════════════════════════════════════════════════════════════════
// E4xx: scope
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn e400_loop_index_shadowed() {
    let diagnostics = check(vec![Event::repeat("2", "i")
        .with_sub_event(Event::standard().with_variable("i", Variable::Number(0.0)))]);
    assert_code(&diagnostics, ErrorCode::LOOP_INDEX_SHADOWED);
    assert_eq!(diagnostics.entries[0].severity, Severity::Warning);
}

#[test]
fn e401_loop_index_assigned() {
    let diagnostics = check(vec![
        Event::for_each("Hero").with_loop_index("k").with_action(instr("ModVarScene", &["k", "+", "1"]))
    ]);
    assert_code(&diagnostics, ErrorCode::LOOP_INDEX_ASSIGNED);
    assert!(!diagnostics.has_errors());
}

#[test]
fn e402_stop_loop_outside_loop() {
    let diagnostics = action("BuiltinCommonInstructions::StopLoop", &[]);
    assert_code(&diagnostics, ErrorCode::STOP_OUTSIDE_LOOP);
    assert_eq!(diagnostics.entries[0].kind, DiagnosticKind::InvalidContextError);
}

// ══════════════════════════════════════════════════════════════════════════════
// E5xx: structure
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn e500_max_depth_exceeded() {
    let mut event = Event::standard();
    for _ in 0..5 {
        event = Event::standard().with_sub_event(event);
    }
    let diagnostics = check_with(
        &Catalog::builtin(),
        vec![event],
        CompileOptions::default().with_max_depth(4),
    );
    assert_code(&diagnostics, ErrorCode::MAX_DEPTH_EXCEEDED);
}

#[test]
fn e501_cancelled() {
    let catalog = Catalog::builtin();
    let registry = registry();
    let token = CancellationToken::new();
    let compiler = Compiler::new(&catalog, &registry).with_cancellation(token.clone());
    token.cancel();
    let diagnostics = compiler.check(&EventList(vec![Event::standard()]));
    assert_code(&diagnostics, ErrorCode::CANCELLED);
    assert_eq!(diagnostics.entries[0].severity, Severity::Info);
    assert!(!diagnostics.has_errors());
}

// ══════════════════════════════════════════════════════════════════════════════
// Taxonomy
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn codes_map_to_categories_and_kinds() {
    let table = [
        (ErrorCode::UNEXPECTED_TOKEN, DiagnosticCategory::Syntax, DiagnosticKind::SyntaxError),
        (ErrorCode::UNKNOWN_SYMBOL, DiagnosticCategory::Symbol, DiagnosticKind::UnknownSymbolError),
        (
            ErrorCode::MISSING_BACKEND_SYMBOL,
            DiagnosticCategory::Symbol,
            DiagnosticKind::UnknownInstructionError,
        ),
        (ErrorCode::WRONG_ARG_COUNT, DiagnosticCategory::Type, DiagnosticKind::ArityError),
        (
            ErrorCode::INVALID_OPERATOR,
            DiagnosticCategory::Type,
            DiagnosticKind::InvalidOperatorTokenError,
        ),
        (ErrorCode::LOOP_INDEX_SHADOWED, DiagnosticCategory::Scope, DiagnosticKind::ShadowedLoopIndex),
        (
            ErrorCode::MAX_DEPTH_EXCEEDED,
            DiagnosticCategory::Structure,
            DiagnosticKind::MaxDepthExceededError,
        ),
    ];
    for (code, category, kind) in table {
        assert_eq!(code.category(), category, "{code}");
        assert_eq!(code.kind(), kind, "{code}");
    }
}

#[test]
fn every_diagnostic_is_kept() {
    // Three independent failures in one event: all reported, none capped.
    let diagnostics = check(vec![Event::standard()
        .with_action(instr("Teleport", &[]))
        .with_action(instr("ModVarScene", &["Lives", "+", "1"]))
        .with_action(instr("ModVarScene", &["Score", "=", "\"x\""]))]);
    assert_eq!(diagnostics.total_errors, 3);
    assert_eq!(diagnostics.len(), 3);
    let sites: Vec<String> = diagnostics
        .iter()
        .map(|d| d.location.to_string())
        .collect();
    assert!(sites[0].starts_with("events[0] action 0"));
    assert!(sites[1].starts_with("events[0] action 1"));
    assert!(sites[2].starts_with("events[0] action 2"));
}
