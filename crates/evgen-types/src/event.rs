//! The authored event tree.
//!
//! Events are read-only to the compiler. Every kind shares the same
//! accessor contract so the walker never needs to know which concrete kind
//! it is looking at, except to pick the loop construct.

use crate::variable::{Variable, VariablesContainer};
use serde::{Deserialize, Serialize};

static NO_VARIABLES: VariablesContainer = VariablesContainer::new();

fn is_false(value: &bool) -> bool {
    !*value
}

// ══════════════════════════════════════════════════════════════════════════════
// Instructions
// ══════════════════════════════════════════════════════════════════════════════

/// A condition or action: a catalog entry by name plus authored parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    #[serde(rename = "type")]
    pub kind: InstructionType,
    #[serde(default)]
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstructionType {
    /// Catalog name of the instruction.
    pub value: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverted: bool,
}

impl Instruction {
    pub fn new<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kind: InstructionType {
                value: name.into(),
                inverted: false,
            },
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }

    /// Builder: negate the condition.
    pub fn inverted(mut self) -> Self {
        self.kind.inverted = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.kind.value
    }

    pub fn is_inverted(&self) -> bool {
        self.kind.inverted
    }

    pub fn parameter(&self, index: usize) -> Option<&str> {
        self.parameters.get(index).map(String::as_str)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Events
// ══════════════════════════════════════════════════════════════════════════════

/// Ordered list of sibling events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventList(pub Vec<Event>);

impl EventList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Parse a serialized event list.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn push(&mut self, event: Event) {
        self.0.push(event);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Event> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Event] {
        &self.0
    }
}

impl From<Vec<Event>> for EventList {
    fn from(events: Vec<Event>) -> Self {
        Self(events)
    }
}

impl<'a> IntoIterator for &'a EventList {
    type Item = &'a Event;
    type IntoIter = std::slice::Iter<'a, Event>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One node of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,
    #[serde(flatten)]
    pub kind: EventKind,
}

/// The closed set of event kinds, tagged by the serialized `type` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EventKind {
    #[serde(rename = "BuiltinCommonInstructions::Standard")]
    Standard(EventBody),
    #[serde(rename = "BuiltinCommonInstructions::Repeat")]
    Repeat(RepeatEvent),
    #[serde(rename = "BuiltinCommonInstructions::While")]
    While(WhileEvent),
    #[serde(rename = "BuiltinCommonInstructions::ForEach")]
    ForEach(ForEachEvent),
    #[serde(rename = "BuiltinCommonInstructions::Comment")]
    Comment(CommentEvent),
}

/// Conditions, actions, sub-events and locals shared by executable kinds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventBody {
    #[serde(default)]
    pub conditions: Vec<Instruction>,
    #[serde(default)]
    pub actions: Vec<Instruction>,
    #[serde(default)]
    pub events: EventList,
    #[serde(default, skip_serializing_if = "VariablesContainer::is_empty")]
    pub variables: VariablesContainer,
}

/// Runs its body a computed number of times.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatEvent {
    #[serde(default)]
    pub repeat_expression: String,
    #[serde(default)]
    pub loop_index_variable: String,
    #[serde(flatten)]
    pub body: EventBody,
}

/// Runs its body while `while_conditions` all hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhileEvent {
    #[serde(default)]
    pub while_conditions: Vec<Instruction>,
    #[serde(default)]
    pub loop_index_variable: String,
    #[serde(default)]
    pub infinite_loop_warning: bool,
    #[serde(flatten)]
    pub body: EventBody,
}

/// Runs its body once per picked instance of `object`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForEachEvent {
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub loop_index_variable: String,
    #[serde(flatten)]
    pub body: EventBody,
}

/// Free text; never executed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentEvent {
    #[serde(default)]
    pub comment: String,
}

impl Event {
    fn new(kind: EventKind) -> Self {
        Self {
            disabled: false,
            kind,
        }
    }

    pub fn standard() -> Self {
        Self::new(EventKind::Standard(EventBody::default()))
    }

    /// A repeat event. An empty `index` means no index variable.
    pub fn repeat(count: impl Into<String>, index: impl Into<String>) -> Self {
        Self::new(EventKind::Repeat(RepeatEvent {
            repeat_expression: count.into(),
            loop_index_variable: index.into(),
            body: EventBody::default(),
        }))
    }

    pub fn while_loop(conditions: Vec<Instruction>) -> Self {
        Self::new(EventKind::While(WhileEvent {
            while_conditions: conditions,
            ..WhileEvent::default()
        }))
    }

    pub fn for_each(object: impl Into<String>) -> Self {
        Self::new(EventKind::ForEach(ForEachEvent {
            object: object.into(),
            ..ForEachEvent::default()
        }))
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Self::new(EventKind::Comment(CommentEvent {
            comment: text.into(),
        }))
    }

    // ── Builders ──────────────────────────────────────────────────────────────
    //
    // Builders that touch the body are no-ops on comment events.

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    pub fn with_condition(mut self, instruction: Instruction) -> Self {
        if let Some(body) = self.body_mut() {
            body.conditions.push(instruction);
        }
        self
    }

    pub fn with_action(mut self, instruction: Instruction) -> Self {
        if let Some(body) = self.body_mut() {
            body.actions.push(instruction);
        }
        self
    }

    pub fn with_sub_event(mut self, event: Event) -> Self {
        if let Some(body) = self.body_mut() {
            body.events.push(event);
        }
        self
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Variable) -> Self {
        if let Some(body) = self.body_mut() {
            body.variables.insert(name, value);
        }
        self
    }

    /// Builder: set the loop index name of a while or for-each event.
    pub fn with_loop_index(mut self, name: impl Into<String>) -> Self {
        match &mut self.kind {
            EventKind::Repeat(e) => e.loop_index_variable = name.into(),
            EventKind::While(e) => e.loop_index_variable = name.into(),
            EventKind::ForEach(e) => e.loop_index_variable = name.into(),
            EventKind::Standard(_) | EventKind::Comment(_) => {}
        }
        self
    }

    /// Builder: enable the iteration guard of a while event.
    pub fn with_infinite_loop_warning(mut self) -> Self {
        if let EventKind::While(e) = &mut self.kind {
            e.infinite_loop_warning = true;
        }
        self
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn body(&self) -> Option<&EventBody> {
        match &self.kind {
            EventKind::Standard(body) => Some(body),
            EventKind::Repeat(e) => Some(&e.body),
            EventKind::While(e) => Some(&e.body),
            EventKind::ForEach(e) => Some(&e.body),
            EventKind::Comment(_) => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut EventBody> {
        match &mut self.kind {
            EventKind::Standard(body) => Some(body),
            EventKind::Repeat(e) => Some(&mut e.body),
            EventKind::While(e) => Some(&mut e.body),
            EventKind::ForEach(e) => Some(&mut e.body),
            EventKind::Comment(_) => None,
        }
    }

    pub fn conditions(&self) -> &[Instruction] {
        self.body().map(|b| b.conditions.as_slice()).unwrap_or(&[])
    }

    pub fn actions(&self) -> &[Instruction] {
        self.body().map(|b| b.actions.as_slice()).unwrap_or(&[])
    }

    pub fn sub_events(&self) -> &[Event] {
        self.body().map(|b| b.events.as_slice()).unwrap_or(&[])
    }

    pub fn variables(&self) -> &VariablesContainer {
        self.body().map(|b| &b.variables).unwrap_or(&NO_VARIABLES)
    }

    /// The loop index name, if this is a loop event that declares one.
    pub fn loop_index_variable(&self) -> Option<&str> {
        let name = match &self.kind {
            EventKind::Repeat(e) => &e.loop_index_variable,
            EventKind::While(e) => &e.loop_index_variable,
            EventKind::ForEach(e) => &e.loop_index_variable,
            EventKind::Standard(_) | EventKind::Comment(_) => return None,
        };
        let name = name.trim();
        (!name.is_empty()).then_some(name)
    }

    pub fn is_loop(&self) -> bool {
        matches!(
            self.kind,
            EventKind::Repeat(_) | EventKind::While(_) | EventKind::ForEach(_)
        )
    }

    /// Whether the walker lowers this event at all.
    pub fn is_executable(&self) -> bool {
        !self.disabled && !matches!(self.kind, EventKind::Comment(_))
    }

    /// Short label for logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            EventKind::Standard(_) => "standard",
            EventKind::Repeat(_) => "repeat",
            EventKind::While(_) => "while",
            EventKind::ForEach(_) => "for_each",
            EventKind::Comment(_) => "comment",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPEAT_JSON: &str = r#"[{
        "type": "BuiltinCommonInstructions::Repeat",
        "repeatExpression": "5",
        "loopIndexVariable": "i",
        "variables": [{ "name": "Local", "type": "number", "value": 1 }],
        "conditions": [],
        "actions": [{ "type": { "value": "ModVarScene" },
                      "parameters": ["Sum", "+", "i"] }],
        "events": [{ "type": "BuiltinCommonInstructions::Comment", "comment": "note" }]
    }]"#;

    #[test]
    fn test_parse_repeat_event() {
        let events = EventList::from_json(REPEAT_JSON).unwrap();
        assert_eq!(events.len(), 1);
        let event = &events.as_slice()[0];
        assert!(!event.disabled);
        assert!(event.is_loop());
        assert_eq!(event.loop_index_variable(), Some("i"));
        assert_eq!(event.actions().len(), 1);
        assert_eq!(event.actions()[0].name(), "ModVarScene");
        assert_eq!(event.actions()[0].parameter(2), Some("i"));
        assert_eq!(event.variables().get("Local"), Some(&Variable::Number(1.0)));
        match &event.kind {
            EventKind::Repeat(r) => assert_eq!(r.repeat_expression, "5"),
            other => panic!("expected repeat, got {other:?}"),
        }
    }

    #[test]
    fn test_comment_is_not_executable() {
        let events = EventList::from_json(REPEAT_JSON).unwrap();
        let comment = &events.as_slice()[0].sub_events()[0];
        assert!(!comment.is_executable());
        assert!(comment.conditions().is_empty());
        assert!(comment.sub_events().is_empty());
        assert!(comment.variables().is_empty());
    }

    #[test]
    fn test_missing_fields_default_to_empty() {
        let json = r#"[{ "type": "BuiltinCommonInstructions::Standard", "disabled": true }]"#;
        let events = EventList::from_json(json).unwrap();
        let event = &events.as_slice()[0];
        assert!(event.disabled);
        assert!(!event.is_executable());
        assert!(event.conditions().is_empty());
        assert!(event.actions().is_empty());
        assert_eq!(event.loop_index_variable(), None);
    }

    #[test]
    fn test_empty_loop_index_means_none() {
        let event = Event::repeat("3", "");
        assert_eq!(event.loop_index_variable(), None);
        let event = Event::for_each("Enemy").with_loop_index("k");
        assert_eq!(event.loop_index_variable(), Some("k"));
    }

    #[test]
    fn test_inverted_instruction_json() {
        let json = r#"{ "type": { "value": "IsMoving", "inverted": true }, "parameters": ["Hero", "Move"] }"#;
        let instruction: Instruction = serde_json::from_str(json).unwrap();
        assert!(instruction.is_inverted());
        assert_eq!(instruction, Instruction::new("IsMoving", ["Hero", "Move"]).inverted());
    }

    #[test]
    fn test_clone_is_deep_and_equal() {
        let tree = Event::standard()
            .with_condition(Instruction::new("VarScene", ["A", "=", "1"]))
            .with_sub_event(Event::repeat("2", "i").with_action(Instruction::new(
                "ModVarScene",
                ["A", "+", "i"],
            )));
        let mut copy = tree.clone();
        assert_eq!(copy, tree);
        copy.body_mut().unwrap().events.0[0].disabled = true;
        assert_ne!(copy, tree);
        assert!(!tree.sub_events()[0].disabled);
    }

    #[test]
    fn test_serialized_form_is_stable() {
        let events = EventList::from_json(REPEAT_JSON).unwrap();
        let json = events.to_json().unwrap();
        assert_eq!(EventList::from_json(&json).unwrap(), events);
        assert!(json.contains("\"loopIndexVariable\":\"i\""));
    }
}
