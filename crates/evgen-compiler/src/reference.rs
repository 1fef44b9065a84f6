//! Machine-generated catalog reference.
//!
//! Produces two artifacts from a [`Catalog`]:
//! 1. **Text reference** for editor help panels
//! 2. **Structured catalog table** (JSON) for tooling and documentation
//!
//! Both are generated, so they follow the catalog the compiler actually uses.

use std::collections::BTreeMap;

use evgen_types::Backend;
use serde::Serialize;

use crate::catalog::{
    Catalog, ExpressionMetadata, ExpressionOwner, InstructionMetadata, ParameterKind,
};

// ══════════════════════════════════════════════════════════════════════════════
// Text reference
// ══════════════════════════════════════════════════════════════════════════════

/// Generate the text reference: one line per entry, sorted by name within
/// each section.
pub fn generate_reference(catalog: &Catalog) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(REFERENCE_PREAMBLE);

    out.push_str("CONDITIONS:\n");
    for entry in sorted_instructions(&catalog.conditions).values() {
        out.push_str(&format!("  {}{}\n", entry.name, instruction_signature(entry)));
    }
    out.push('\n');

    out.push_str("ACTIONS:\n");
    for entry in sorted_instructions(&catalog.actions).values() {
        out.push_str(&format!("  {}{}\n", entry.name, instruction_signature(entry)));
    }
    out.push('\n');

    out.push_str("EXPRESSIONS:\n");
    for (key, entry) in sorted_expressions(&catalog.expressions) {
        out.push_str(&format!(
            "  {key}{} -> {}\n",
            expression_signature(entry),
            entry.return_type
        ));
    }
    out
}

const REFERENCE_PREAMBLE: &str = r#"EVENTS: conditions (all must hold, evaluated in order) then actions, then sub-events.
LOOPS: Repeat <count> | While <conditions> | For each <object>; optional loop index variable.
EXPRESSIONS: numbers, "strings", + - * / ( ), Variable.child, Object.Function(), Object.Automatism::Function()
  + on two strings concatenates; use ToString / ToNumber to convert.
OPERATORS: modify = + - * /   compare = != < <= > >=

"#;

// ══════════════════════════════════════════════════════════════════════════════
// Catalog table (JSON)
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct CatalogTable<'a> {
    version: &'static str,
    total_conditions: usize,
    total_actions: usize,
    total_expressions: usize,
    conditions: Vec<InstructionRow<'a>>,
    actions: Vec<InstructionRow<'a>>,
    expressions: Vec<ExpressionRow<'a>>,
}

#[derive(Serialize)]
struct InstructionRow<'a> {
    name: &'a str,
    signature: String,
    description: &'a str,
    backends: Vec<&'static str>,
}

#[derive(Serialize)]
struct ExpressionRow<'a> {
    name: String,
    signature: String,
    returns: String,
    description: &'a str,
    backends: Vec<&'static str>,
}

/// Generate a structured JSON catalog table.
///
/// Output format:
/// ```json
/// {
///   "version": "0.1.0",
///   "total_conditions": 12,
///   "total_actions": 14,
///   "total_expressions": 11,
///   "conditions": [
///     { "name": "PosX", "signature": "(object, relationalOperator, expression)",
///       "description": "...", "backends": ["native", "js"] }
///   ],
///   "actions": [...],
///   "expressions": [...]
/// }
/// ```
pub fn generate_catalog_table(catalog: &Catalog) -> String {
    let table = CatalogTable {
        version: crate::EVGEN_VERSION,
        total_conditions: catalog.conditions.len(),
        total_actions: catalog.actions.len(),
        total_expressions: catalog.expressions.len(),
        conditions: instruction_rows(&catalog.conditions),
        actions: instruction_rows(&catalog.actions),
        expressions: sorted_expressions(&catalog.expressions)
            .into_iter()
            .map(|(name, entry)| ExpressionRow {
                name,
                signature: expression_signature(entry),
                returns: entry.return_type.to_string(),
                description: &entry.text,
                backends: supported_backends(|b| entry.symbols.supports(b)),
            })
            .collect(),
    };
    serde_json::to_string_pretty(&table).unwrap_or_default()
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn instruction_rows(entries: &[InstructionMetadata]) -> Vec<InstructionRow<'_>> {
    sorted_instructions(entries)
        .into_values()
        .map(|entry| InstructionRow {
            name: &entry.name,
            signature: instruction_signature(entry),
            description: &entry.text,
            backends: supported_backends(|b| entry.supports(b)),
        })
        .collect()
}

fn sorted_instructions(entries: &[InstructionMetadata]) -> BTreeMap<&str, &InstructionMetadata> {
    entries.iter().map(|e| (e.name.as_str(), e)).collect()
}

/// Expressions keyed by their qualified name (`X`, `Object.X`,
/// `Object.Type::X`).
fn sorted_expressions(entries: &[ExpressionMetadata]) -> BTreeMap<String, &ExpressionMetadata> {
    entries
        .iter()
        .map(|e| {
            let key = match &e.owner {
                ExpressionOwner::Free => e.name.clone(),
                ExpressionOwner::Object => format!("Object.{}", e.name),
                ExpressionOwner::Automatism { automatism_type } => {
                    format!("Object.{automatism_type}::{}", e.name)
                }
            };
            (key, e)
        })
        .collect()
}

/// Authored parameter kinds; optional ones as `[kind = default]`.
fn instruction_signature(entry: &InstructionMetadata) -> String {
    let kinds: Vec<String> = entry
        .parameters
        .iter()
        .filter(|p| p.kind.is_authored())
        .map(|p| match (&p.default_value, p.optional) {
            (Some(default), true) => format!("[{} = {default}]", p.kind.name()),
            (None, true) => format!("[{}]", p.kind.name()),
            (_, false) => p.kind.name().to_string(),
        })
        .collect();
    format!("({})", kinds.join(", "))
}

fn expression_signature(entry: &ExpressionMetadata) -> String {
    let params: Vec<&str> = entry
        .parameters
        .iter()
        .filter(|p| p.kind.is_authored())
        .map(|p| match p.kind {
            ParameterKind::Expression => "number",
            other => other.name(),
        })
        .collect();
    format!("({})", params.join(", "))
}

fn supported_backends(supports: impl Fn(Backend) -> bool) -> Vec<&'static str> {
    Backend::ALL
        .iter()
        .copied()
        .filter(|b| supports(*b))
        .map(Backend::name)
        .collect()
}

// ══════════════════════════════════════════════════════════════════════════════
// Tests
// ══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_lists_every_section() {
        let reference = generate_reference(&Catalog::builtin());
        assert!(reference.contains("CONDITIONS:\n"));
        assert!(reference.contains("  ModVarScene(variable, operator, expression)\n"));
        assert!(reference.contains(
            "  PlaySound(file, [yesorno = no], [expression = 100], [expression = 1])\n"
        ));
        assert!(reference.contains("  ToString(number) -> string\n"));
        assert!(reference.contains("  Object.X() -> number\n"));
    }

    #[test]
    fn table_totals_match_catalog() {
        let catalog = Catalog::builtin();
        let table: serde_json::Value =
            serde_json::from_str(&generate_catalog_table(&catalog)).unwrap();
        assert_eq!(table["version"], crate::EVGEN_VERSION);
        assert_eq!(
            table["total_actions"].as_u64().unwrap() as usize,
            catalog.actions.len()
        );
        assert_eq!(
            table["conditions"].as_array().unwrap().len(),
            catalog.conditions.len()
        );
    }

    #[test]
    fn table_is_sorted_and_stable() {
        let catalog = Catalog::builtin();
        let first = generate_catalog_table(&catalog);
        let table: serde_json::Value = serde_json::from_str(&first).unwrap();
        let names: Vec<&str> = table["actions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|row| row["name"].as_str().unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(generate_catalog_table(&catalog), first);
    }

    #[test]
    fn table_reports_backend_coverage() {
        let mut catalog = Catalog::new();
        catalog.add_action(
            InstructionMetadata::new("NativeOnly", "Only native")
                .symbols(evgen_types::BackendSymbols::new().with(Backend::Native, "N")),
        );
        let table: serde_json::Value =
            serde_json::from_str(&generate_catalog_table(&catalog)).unwrap();
        assert_eq!(table["actions"][0]["backends"], serde_json::json!(["native"]));
    }
}
