//! Backend dialects.
//!
//! The emitter runs one algorithm for every backend; a [`Dialect`] supplies
//! the control-construct syntax and the runtime access idioms. Instruction
//! symbols do not live here: they come from the per-backend table on each
//! catalog entry.

use evgen_types::ir::{RelOp, ValueType};
use evgen_types::{format_number, Backend};

/// Name of the per-instance loop variable in generated code.
pub const INSTANCE: &str = "obj";

pub trait Dialect {
    fn backend(&self) -> Backend;

    /// Name of the execution-context parameter (`codeOnly` arguments).
    fn context(&self) -> &'static str;

    fn default_entry_point(&self) -> &'static str;

    /// Lines before the events, opening the entry function.
    fn prologue(&self, entry_point: &str) -> Vec<String>;

    /// Closer of the entry function.
    fn epilogue(&self) -> &'static str {
        "}"
    }

    fn comment(&self, text: &str) -> String {
        format!("// {text}")
    }

    // ── Literals ─────────────────────────────────────────────────────────

    fn number(&self, value: f64) -> String;

    fn string(&self, value: &str) -> String;

    fn boolean(&self, value: bool) -> String {
        value.to_string()
    }

    /// Value used when an expression reads from an empty picked list.
    fn default_value(&self, ty: ValueType) -> String {
        match ty {
            ValueType::String => self.string(""),
            ValueType::Boolean => self.boolean(false),
            ValueType::Number | ValueType::Object => self.number(0.0),
        }
    }

    fn relational(&self, op: RelOp) -> &'static str {
        op.symbol()
    }

    // ── Statements ───────────────────────────────────────────────────────

    fn declare_flag(&self, name: &str, value: bool) -> String;

    /// A mutable number, used for loop counters.
    fn declare_number(&self, name: &str, init: &str) -> String;

    /// An immutable number, used for evaluated repeat counts.
    fn const_number(&self, name: &str, init: &str) -> String;

    /// `max(0, floor(value))`.
    fn clamp_count(&self, value: &str) -> String;

    fn if_open(&self, condition: &str) -> String {
        format!("if ({condition}) {{")
    }

    fn loop_open(&self) -> String {
        "while (true) {".to_string()
    }

    /// `for (counter = 0; counter < bound && !stop; counter++) {`
    fn counted_loop(&self, counter: &str, bound: &str, stop: Option<&str>) -> String;

    // ── Picked object lists ──────────────────────────────────────────────

    fn declare_list(&self, name: &str, init: &str) -> String;

    /// All instances of an object in the scene.
    fn scene_list(&self, object: &str) -> String;

    fn copy_list(&self, list: &str) -> String;

    fn single_list(&self, instance: &str) -> String;

    /// Keep only the instances of `list` for which `keep` (written in terms
    /// of [`INSTANCE`]) holds.
    fn filter_list(&self, list: &str, keep: &str) -> String;

    fn list_not_empty(&self, list: &str) -> String;

    fn list_len(&self, list: &str) -> String;

    fn list_at(&self, list: &str, index: &str) -> String {
        format!("{list}[{index}]")
    }

    /// Loop header binding [`INSTANCE`] to every element of `list`.
    fn for_each_instance(&self, list: &str) -> String;

    /// Picked lists passed as an argument, keyed by object name.
    fn object_map(&self, entries: &[(String, String)]) -> String;

    // ── Calls ────────────────────────────────────────────────────────────

    fn call(&self, symbol: &str, args: &[String]) -> String {
        format!("{symbol}({})", args.join(", "))
    }

    fn method_call(&self, receiver: &str, symbol: &str, args: &[String]) -> String;

    fn automatism(&self, receiver: &str, name: &str) -> String;

    // ── Variables ────────────────────────────────────────────────────────

    /// Declare a local variable slot from its JSON initializer.
    fn declare_variable(&self, name: &str, initial_json: &str) -> String;

    fn global_variable(&self, name: &str) -> String;

    fn variable_child(&self, variable: &str, child: &str) -> String;

    fn read_variable(&self, variable: &str, ty: ValueType) -> String;

    fn write_variable(&self, variable: &str, ty: ValueType, value: &str) -> String;
}

// ══════════════════════════════════════════════════════════════════════════════
// JavaScript
// ══════════════════════════════════════════════════════════════════════════════

/// The scripting backend: plain functions over the `gdjs` runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsDialect;

impl Dialect for JsDialect {
    fn backend(&self) -> Backend {
        Backend::Js
    }

    fn context(&self) -> &'static str {
        "runtimeScene"
    }

    fn default_entry_point(&self) -> &'static str {
        "evgenEvents"
    }

    fn prologue(&self, entry_point: &str) -> Vec<String> {
        vec![
            "gdjs.evgen = gdjs.evgen || {};".to_string(),
            String::new(),
            format!("gdjs.evgen.{entry_point} = function(runtimeScene) {{"),
        ]
    }

    fn epilogue(&self) -> &'static str {
        "};"
    }

    fn number(&self, value: f64) -> String {
        format_number(value)
    }

    fn string(&self, value: &str) -> String {
        json_string(value)
    }

    fn relational(&self, op: RelOp) -> &'static str {
        match op {
            RelOp::Eq => "===",
            RelOp::Ne => "!==",
            other => other.symbol(),
        }
    }

    fn declare_flag(&self, name: &str, value: bool) -> String {
        format!("let {name} = {value};")
    }

    fn declare_number(&self, name: &str, init: &str) -> String {
        format!("let {name} = {init};")
    }

    fn const_number(&self, name: &str, init: &str) -> String {
        format!("const {name} = {init};")
    }

    fn clamp_count(&self, value: &str) -> String {
        format!("Math.max(0, Math.floor({value}))")
    }

    fn counted_loop(&self, counter: &str, bound: &str, stop: Option<&str>) -> String {
        match stop {
            Some(stop) => {
                format!("for (let {counter} = 0; {counter} < {bound} && !{stop}; {counter}++) {{")
            }
            None => format!("for (let {counter} = 0; {counter} < {bound}; {counter}++) {{"),
        }
    }

    fn declare_list(&self, name: &str, init: &str) -> String {
        format!("let {name} = {init};")
    }

    fn scene_list(&self, object: &str) -> String {
        format!("runtimeScene.getObjects({}).slice()", json_string(object))
    }

    fn copy_list(&self, list: &str) -> String {
        format!("{list}.slice()")
    }

    fn single_list(&self, instance: &str) -> String {
        format!("[{instance}]")
    }

    fn filter_list(&self, list: &str, keep: &str) -> String {
        format!("{list} = {list}.filter(({INSTANCE}) => {keep});")
    }

    fn list_not_empty(&self, list: &str) -> String {
        format!("{list}.length > 0")
    }

    fn list_len(&self, list: &str) -> String {
        format!("{list}.length")
    }

    fn for_each_instance(&self, list: &str) -> String {
        format!("for (const {INSTANCE} of {list}) {{")
    }

    fn object_map(&self, entries: &[(String, String)]) -> String {
        let fields: Vec<String> = entries
            .iter()
            .map(|(name, list)| format!("{}: {list}", json_string(name)))
            .collect();
        format!("{{ {} }}", fields.join(", "))
    }

    fn method_call(&self, receiver: &str, symbol: &str, args: &[String]) -> String {
        format!("{receiver}.{symbol}({})", args.join(", "))
    }

    fn automatism(&self, receiver: &str, name: &str) -> String {
        format!("{receiver}.getBehavior({})", json_string(name))
    }

    fn declare_variable(&self, name: &str, initial_json: &str) -> String {
        format!("const {name} = gdjs.Variable.fromJSON({initial_json});")
    }

    fn global_variable(&self, name: &str) -> String {
        format!("runtimeScene.getVariables().get({})", json_string(name))
    }

    fn variable_child(&self, variable: &str, child: &str) -> String {
        format!("{variable}.getChild({})", json_string(child))
    }

    fn read_variable(&self, variable: &str, ty: ValueType) -> String {
        match ty {
            ValueType::String => format!("{variable}.getAsString()"),
            ValueType::Boolean => format!("{variable}.getAsBoolean()"),
            ValueType::Number | ValueType::Object => format!("{variable}.getAsNumber()"),
        }
    }

    fn write_variable(&self, variable: &str, ty: ValueType, value: &str) -> String {
        match ty {
            ValueType::String => format!("{variable}.setString({value});"),
            ValueType::Boolean => format!("{variable}.setBoolean({value});"),
            ValueType::Number | ValueType::Object => format!("{variable}.setNumber({value});"),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Native
// ══════════════════════════════════════════════════════════════════════════════

/// The statically compiled backend: C++ over the native runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeDialect;

impl Dialect for NativeDialect {
    fn backend(&self) -> Backend {
        Backend::Native
    }

    fn context(&self) -> &'static str {
        "scene"
    }

    fn default_entry_point(&self) -> &'static str {
        "EvgenEvents"
    }

    fn prologue(&self, entry_point: &str) -> Vec<String> {
        vec![
            "#include <algorithm>".to_string(),
            "#include <cmath>".to_string(),
            "#include <string>".to_string(),
            "#include <vector>".to_string(),
            "#include \"GDCpp/Runtime/RuntimeScene.h\"".to_string(),
            "#include \"GDCpp/Runtime/RuntimeObject.h\"".to_string(),
            "#include \"GDCpp/Runtime/Variable.h\"".to_string(),
            String::new(),
            format!("void {entry_point}(RuntimeScene & scene) {{"),
        ]
    }

    fn number(&self, value: f64) -> String {
        // Always a floating-point literal so `/` never truncates.
        let text = format_number(value);
        if text.contains(['.', 'e', 'E']) || !value.is_finite() {
            text
        } else {
            format!("{text}.0")
        }
    }

    fn string(&self, value: &str) -> String {
        format!("std::string({})", json_string(value))
    }

    fn declare_flag(&self, name: &str, value: bool) -> String {
        format!("bool {name} = {value};")
    }

    fn declare_number(&self, name: &str, init: &str) -> String {
        format!("double {name} = {init};")
    }

    fn const_number(&self, name: &str, init: &str) -> String {
        format!("const double {name} = {init};")
    }

    fn clamp_count(&self, value: &str) -> String {
        format!("std::max(0.0, std::floor({value}))")
    }

    fn counted_loop(&self, counter: &str, bound: &str, stop: Option<&str>) -> String {
        match stop {
            Some(stop) => format!(
                "for (double {counter} = 0.0; {counter} < {bound} && !{stop}; {counter} += 1.0) {{"
            ),
            None => format!("for (double {counter} = 0.0; {counter} < {bound}; {counter} += 1.0) {{"),
        }
    }

    fn declare_list(&self, name: &str, init: &str) -> String {
        format!("std::vector<RuntimeObject *> {name} = {init};")
    }

    fn scene_list(&self, object: &str) -> String {
        format!("scene.GetObjects({})", json_string(object))
    }

    fn copy_list(&self, list: &str) -> String {
        list.to_string()
    }

    fn single_list(&self, instance: &str) -> String {
        format!("std::vector<RuntimeObject *>{{{instance}}}")
    }

    fn filter_list(&self, list: &str, keep: &str) -> String {
        format!(
            "{list}.erase(std::remove_if({list}.begin(), {list}.end(), [&](RuntimeObject * {INSTANCE}) {{ return !({keep}); }}), {list}.end());"
        )
    }

    fn list_not_empty(&self, list: &str) -> String {
        format!("!{list}.empty()")
    }

    fn list_len(&self, list: &str) -> String {
        format!("static_cast<double>({list}.size())")
    }

    fn list_at(&self, list: &str, index: &str) -> String {
        format!("{list}[static_cast<std::size_t>({index})]")
    }

    fn for_each_instance(&self, list: &str) -> String {
        format!("for (RuntimeObject * {INSTANCE} : {list}) {{")
    }

    fn object_map(&self, entries: &[(String, String)]) -> String {
        let fields: Vec<String> = entries
            .iter()
            .map(|(name, list)| format!("{{{}, &{list}}}", json_string(name)))
            .collect();
        format!("PickedObjects{{{}}}", fields.join(", "))
    }

    fn method_call(&self, receiver: &str, symbol: &str, args: &[String]) -> String {
        format!("{receiver}->{symbol}({})", args.join(", "))
    }

    fn automatism(&self, receiver: &str, name: &str) -> String {
        format!("{receiver}->GetAutomatism({})", json_string(name))
    }

    fn declare_variable(&self, name: &str, initial_json: &str) -> String {
        format!(
            "gd::Variable {name} = gd::Variable::FromJSON({});",
            json_string(initial_json)
        )
    }

    fn global_variable(&self, name: &str) -> String {
        format!("scene.GetVariables().Get({})", json_string(name))
    }

    fn variable_child(&self, variable: &str, child: &str) -> String {
        format!("{variable}.GetChild({})", json_string(child))
    }

    fn read_variable(&self, variable: &str, ty: ValueType) -> String {
        match ty {
            ValueType::String => format!("{variable}.GetString()"),
            ValueType::Boolean => format!("{variable}.GetBool()"),
            ValueType::Number | ValueType::Object => format!("{variable}.GetValue()"),
        }
    }

    fn write_variable(&self, variable: &str, ty: ValueType, value: &str) -> String {
        match ty {
            ValueType::String => format!("{variable}.SetString({value});"),
            ValueType::Boolean => format!("{variable}.SetBool({value});"),
            ValueType::Number | ValueType::Object => format!("{variable}.SetValue({value});"),
        }
    }
}

/// Quote and escape a string literal; the JSON form is valid in both
/// backends.
fn json_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}
