//! Expression checking: value types, conversions, object and automatism
//! expressions, and variable children.

use evgen_compiler::{Catalog, CompileResult, Compiler, ObjectRegistry};
use evgen_types::event::{Event, EventList, Instruction};
use evgen_types::{Backend, Diagnostic, ErrorCode, Variable, VariablesContainer};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn registry() -> ObjectRegistry {
    ObjectRegistry::new()
        .with_object("Hero", "Sprite")
        .with_automatism("Hero", "Move", "TopDownMovementAutomatism")
        .with_object("Enemy", "Sprite")
        .with_group("Actors", ["Hero", "Enemy"])
}

fn globals() -> VariablesContainer {
    let stats = VariablesContainer::new().with("hp", Variable::Number(10.0));
    VariablesContainer::new()
        .with("Score", Variable::Number(0.0))
        .with("Name", Variable::String(String::new()))
        .with("Stats", Variable::Structure(stats))
}

fn instr(name: &str, params: &[&str]) -> Instruction {
    Instruction::new(name, params.iter().copied())
}

fn compile(events: Vec<Event>) -> CompileResult {
    let catalog = Catalog::builtin();
    let registry = registry();
    Compiler::new(&catalog, &registry)
        .with_globals(globals())
        .compile(&EventList(events))
        .unwrap_or_else(|e| panic!("compile failed: {e}"))
}

/// Compile `Score = source` in a single standard event.
fn number(source: &str) -> CompileResult {
    compile(vec![
        Event::standard().with_action(instr("ModVarScene", &["Score", "=", source]))
    ])
}

/// Compile `Name = source` in a single standard event.
fn text(source: &str) -> CompileResult {
    compile(vec![
        Event::standard().with_action(instr("ModVarSceneTxt", &["Name", "=", source]))
    ])
}

fn js(result: &CompileResult) -> &str {
    &result
        .output(Backend::Js)
        .unwrap_or_else(|| panic!("no js output: {:?}", result.aborted))
        .source
}

fn assert_clean(result: &CompileResult) {
    assert!(
        result.success,
        "unexpected diagnostics: {:?}",
        result
            .diagnostics
            .iter()
            .map(|d| format!("{}: {}", d.code, d.message))
            .collect::<Vec<_>>()
    );
}

fn assert_contains(source: &str, needle: &str) {
    assert!(
        source.contains(needle),
        "expected generated code to contain:\n  {needle}\n--- source ---\n{source}"
    );
}

fn only(result: &CompileResult, code: ErrorCode) -> &Diagnostic {
    let matching: Vec<&Diagnostic> = result.diagnostics.iter().filter(|d| d.code == code).collect();
    assert_eq!(
        matching.len(),
        1,
        "expected one {code}, got: {:?}",
        result
            .diagnostics
            .iter()
            .map(|d| format!("{}: {}", d.code, d.message))
            .collect::<Vec<_>>()
    );
    matching[0]
}

// ══════════════════════════════════════════════════════════════════════════════
// Strings and conversions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn string_plus_string_concatenates() {
    let result = text("\"Score: \" + ToString(Score)");
    assert_clean(&result);
    assert_contains(
        js(&result),
        "setString((\"Score: \" + gdjs.evtTools.common.toString(runtimeScene.getVariables().get(\"Score\").getAsNumber())))",
    );
}

#[test]
fn number_plus_string_suggests_conversion() {
    let result = text("\"Score: \" + Score");
    let diagnostic = only(&result, ErrorCode::TYPE_MISMATCH);
    assert!(diagnostic.message.contains("cannot apply '+'"), "{}", diagnostic.message);
    let suggestion = diagnostic.suggestion.as_deref().unwrap_or_default();
    assert!(suggestion.contains("ToString"), "{suggestion}");
}

#[test]
fn to_number_accepts_a_string_variable() {
    let result = number("ToNumber(Name) * 2");
    assert_clean(&result);
    assert_contains(
        js(&result),
        "(gdjs.evtTools.common.toNumber(runtimeScene.getVariables().get(\"Name\").getAsString()) * 2)",
    );
}

#[test]
fn subtracting_strings_is_a_mismatch() {
    let result = text("\"a\" - \"b\"");
    only(&result, ErrorCode::TYPE_MISMATCH);
}

#[test]
fn negating_a_string_is_a_mismatch() {
    let result = number("-Name");
    only(&result, ErrorCode::TYPE_MISMATCH);
}

#[test]
fn both_operands_are_reported() {
    let result = number("Lives + Coins");
    let unknown: Vec<&str> = result
        .diagnostics
        .iter()
        .filter(|d| d.code == ErrorCode::UNKNOWN_SYMBOL)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(unknown, ["unknown identifier 'Lives'", "unknown identifier 'Coins'"]);
}

#[test]
fn zero_arity_function_without_parentheses() {
    let result = number("GlobalVolume / 100");
    assert_clean(&result);
    assert_contains(js(&result), "(gdjs.evtTools.sound.getGlobalVolume(runtimeScene) / 100)");
}

// ══════════════════════════════════════════════════════════════════════════════
// Object expressions
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn object_expression_reads_first_picked_instance() {
    let result = number("Hero.X()");
    assert_clean(&result);
    let source = js(&result);
    assert_contains(source, ".length > 0 ? ");
    assert_contains(source, "[0].getX()");
    assert_contains(source, " : 0)");
}

#[test]
fn object_member_without_parentheses_is_a_call() {
    let with_parens = number("Hero.Y()");
    let without = number("Hero.Y");
    assert_clean(&without);
    assert_eq!(js(&with_parens), js(&without));
}

#[test]
fn automatism_expression_goes_through_the_automatism() {
    let result = number("Hero.Move::Speed()");
    assert_clean(&result);
    assert_contains(js(&result), "[0].getBehavior(\"Move\").getSpeed()");
}

#[test]
fn unknown_object_expression() {
    let result = number("Hero.Z()");
    let diagnostic = only(&result, ErrorCode::UNKNOWN_SYMBOL);
    assert_eq!(diagnostic.message, "object 'Hero' has no expression 'Z'");
}

#[test]
fn unknown_automatism_expression() {
    let result = number("Hero.Move::Jump()");
    let diagnostic = only(&result, ErrorCode::UNKNOWN_SYMBOL);
    assert!(diagnostic.message.contains("has no expression 'Jump'"), "{}", diagnostic.message);
}

#[test]
fn group_in_expression_is_rejected() {
    let result = number("Actors.X()");
    let diagnostic = only(&result, ErrorCode::TYPE_MISMATCH);
    assert_eq!(diagnostic.message, "group 'Actors' cannot be used in an expression");
}

#[test]
fn object_used_as_value_suggests_an_expression() {
    let result = number("Hero + 1");
    let diagnostic = only(&result, ErrorCode::TYPE_MISMATCH);
    assert_eq!(diagnostic.suggestion.as_deref(), Some("Use an object expression such as Hero.X()"));
}

#[test]
fn variable_used_as_object() {
    let result = number("Score.X()");
    let diagnostic = only(&result, ErrorCode::UNKNOWN_SYMBOL);
    assert_eq!(diagnostic.message, "'Score' is a variable, not an object");
}

#[test]
fn local_named_like_an_object_wins() {
    let result = compile(vec![Event::standard()
        .with_variable("Hero", Variable::Number(3.0))
        .with_action(instr("ModVarScene", &["Score", "=", "Hero + 1"]))]);
    assert_clean(&result);
}

// ══════════════════════════════════════════════════════════════════════════════
// Variable children
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn known_child_has_a_static_type() {
    let result = number("Stats.hp * 2");
    assert_clean(&result);
    assert_contains(
        js(&result),
        "runtimeScene.getVariables().get(\"Stats\").getChild(\"hp\").getAsNumber()",
    );

    // A number child cannot become a string.
    only(&text("Stats.hp"), ErrorCode::TYPE_MISMATCH);
}

#[test]
fn unknown_child_takes_the_expected_type() {
    let result = text("Stats.title");
    assert_clean(&result);
    assert_contains(
        js(&result),
        "runtimeScene.getVariables().get(\"Stats\").getChild(\"title\").getAsString()",
    );
}

#[test]
fn scalar_has_no_children() {
    let result = number("Score.bonus.x");
    let diagnostic = only(&result, ErrorCode::TYPE_MISMATCH);
    assert_eq!(diagnostic.message, "variable 'Score' is a number and has no child 'bonus'");
}
