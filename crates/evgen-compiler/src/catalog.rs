//! Instruction and expression catalog.
//!
//! The catalog is the compiler's only source of truth about what an
//! instruction means: its parameter kinds, the kind of value it manipulates,
//! and one runtime symbol per backend. It is populated before compilation
//! and borrowed immutably for the whole session.
//!
//! Object and automatism ownership is not declared separately: an
//! instruction whose first authored parameter is an `object` acts on that
//! object, and an `automatism` parameter right after it narrows the target
//! to that automatism.

use evgen_types::ir::ValueType;
use evgen_types::{Backend, BackendSymbols};
use serde::{Deserialize, Serialize};

// ══════════════════════════════════════════════════════════════════════════════
// Metadata
// ══════════════════════════════════════════════════════════════════════════════

/// Declared kind of one instruction or expression parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterKind {
    /// An object or group name.
    Object,
    /// An automatism attached to the preceding object.
    Automatism,
    /// `= + - * /`
    Operator,
    /// `= != < <= > >=`
    RelationalOperator,
    #[serde(rename = "yesorno")]
    YesOrNo,
    /// A number expression.
    Expression,
    /// A string expression.
    String,
    /// A raw resource path, passed through untouched.
    File,
    /// A variable visible in scope.
    Variable,
    /// Injected by the compiler (the execution context); never authored.
    CodeOnly,
}

impl ParameterKind {
    /// Whether the author writes a value for this parameter.
    pub fn is_authored(self) -> bool {
        self != ParameterKind::CodeOnly
    }

    pub fn name(self) -> &'static str {
        match self {
            ParameterKind::Object => "object",
            ParameterKind::Automatism => "automatism",
            ParameterKind::Operator => "operator",
            ParameterKind::RelationalOperator => "relationalOperator",
            ParameterKind::YesOrNo => "yesorno",
            ParameterKind::Expression => "expression",
            ParameterKind::String => "string",
            ParameterKind::File => "file",
            ParameterKind::Variable => "variable",
            ParameterKind::CodeOnly => "codeOnly",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Required automatism type for `automatism` parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    /// May be left out, or left blank, by the author. Optional parameters
    /// come after every required one.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    /// Parameter text used when an optional parameter is left out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl ParameterMetadata {
    pub fn new(kind: ParameterKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            extra: None,
            optional: false,
            default_value: None,
        }
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// Mark the parameter optional, standing in `default_value` when omitted.
    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.optional = true;
        self.default_value = Some(default_value.into());
        self
    }
}

/// How the emitter realizes an instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CodegenStyle {
    /// Call the catalog symbol (or expand a modifier / comparison).
    #[default]
    Call,
    /// Modify a `variable` parameter in place.
    VariableModifier,
    /// Compare a `variable` parameter.
    VariableComparison,
    /// Stop the innermost loop after the current iteration.
    StopLoop,
}

/// A condition or action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionMetadata {
    pub name: String,
    /// Human-readable sentence; ignored by the compiler.
    #[serde(default)]
    pub text: String,
    pub parameters: Vec<ParameterMetadata>,
    /// Runtime function (the setter for modifier actions, the getter for
    /// comparison conditions).
    #[serde(default)]
    pub symbols: BackendSymbols,
    /// Getter paired with a modifier action's setter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter: Option<BackendSymbols>,
    /// Type of the value a modifier or comparison manipulates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manipulated_type: Option<ValueType>,
    #[serde(default)]
    pub codegen: CodegenStyle,
}

impl InstructionMetadata {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            parameters: Vec::new(),
            symbols: BackendSymbols::new(),
            getter: None,
            manipulated_type: None,
            codegen: CodegenStyle::Call,
        }
    }

    pub fn param(mut self, kind: ParameterKind, description: &str) -> Self {
        self.parameters.push(ParameterMetadata::new(kind, description));
        self
    }

    /// Add an optional parameter filled with `default_value` when omitted.
    pub fn optional_param(
        mut self,
        kind: ParameterKind,
        description: &str,
        default_value: &str,
    ) -> Self {
        self.parameters
            .push(ParameterMetadata::new(kind, description).with_default(default_value));
        self
    }

    /// Add an `automatism` parameter restricted to `automatism_type`.
    pub fn automatism_param(mut self, automatism_type: &str) -> Self {
        self.parameters.push(
            ParameterMetadata::new(ParameterKind::Automatism, "Automatism")
                .with_extra(automatism_type),
        );
        self
    }

    pub fn symbols(mut self, symbols: BackendSymbols) -> Self {
        self.symbols = symbols;
        self
    }

    pub fn getter(mut self, getter: BackendSymbols) -> Self {
        self.getter = Some(getter);
        self
    }

    pub fn manipulates(mut self, ty: ValueType) -> Self {
        self.manipulated_type = Some(ty);
        self
    }

    pub fn codegen(mut self, style: CodegenStyle) -> Self {
        self.codegen = style;
        self
    }

    /// Number of parameters the author may supply.
    pub fn authored_arity(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.kind.is_authored())
            .count()
    }

    /// Number of parameters the author must supply.
    pub fn required_arity(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.kind.is_authored() && !p.optional)
            .count()
    }

    /// Whether every symbol this entry needs exists for `backend`.
    pub fn supports(&self, backend: Backend) -> bool {
        match self.codegen {
            CodegenStyle::VariableModifier
            | CodegenStyle::VariableComparison
            | CodegenStyle::StopLoop => true,
            CodegenStyle::Call => {
                self.symbols.supports(backend)
                    && self.getter.as_ref().is_none_or(|g| g.supports(backend))
            }
        }
    }
}

/// Receiver of an expression function.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ExpressionOwner {
    #[default]
    Free,
    /// Available on every object.
    Object,
    /// Available on automatisms of the given type.
    #[serde(rename_all = "camelCase")]
    Automatism { automatism_type: String },
}

/// A function usable inside expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressionMetadata {
    pub name: String,
    #[serde(default)]
    pub text: String,
    pub return_type: ValueType,
    #[serde(default)]
    pub owner: ExpressionOwner,
    /// Parameters after the receiver. `codeOnly` entries are injected.
    #[serde(default)]
    pub parameters: Vec<ParameterMetadata>,
    pub symbols: BackendSymbols,
}

impl ExpressionMetadata {
    pub fn new(name: impl Into<String>, return_type: ValueType, symbols: BackendSymbols) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            return_type,
            owner: ExpressionOwner::Free,
            parameters: Vec::new(),
            symbols,
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn owner(mut self, owner: ExpressionOwner) -> Self {
        self.owner = owner;
        self
    }

    pub fn param(mut self, kind: ParameterKind, description: &str) -> Self {
        self.parameters.push(ParameterMetadata::new(kind, description));
        self
    }

    pub fn authored_arity(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| p.kind.is_authored())
            .count()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Catalog
// ══════════════════════════════════════════════════════════════════════════════

/// Every condition, action and expression the compiler knows about.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub conditions: Vec<InstructionMetadata>,
    #[serde(default)]
    pub actions: Vec<InstructionMetadata>,
    #[serde(default)]
    pub expressions: Vec<ExpressionMetadata>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Register a condition, replacing any entry with the same name.
    pub fn add_condition(&mut self, metadata: InstructionMetadata) {
        Self::upsert(&mut self.conditions, metadata);
    }

    /// Register an action, replacing any entry with the same name.
    pub fn add_action(&mut self, metadata: InstructionMetadata) {
        Self::upsert(&mut self.actions, metadata);
    }

    /// Register an expression, replacing any entry with the same name and
    /// owner.
    pub fn add_expression(&mut self, metadata: ExpressionMetadata) {
        match self
            .expressions
            .iter_mut()
            .find(|e| e.name == metadata.name && e.owner == metadata.owner)
        {
            Some(existing) => *existing = metadata,
            None => self.expressions.push(metadata),
        }
    }

    fn upsert(entries: &mut Vec<InstructionMetadata>, metadata: InstructionMetadata) {
        match entries.iter_mut().find(|e| e.name == metadata.name) {
            Some(existing) => *existing = metadata,
            None => entries.push(metadata),
        }
    }

    pub fn condition(&self, name: &str) -> Option<&InstructionMetadata> {
        self.conditions.iter().find(|c| c.name == name)
    }

    pub fn action(&self, name: &str) -> Option<&InstructionMetadata> {
        self.actions.iter().find(|a| a.name == name)
    }

    pub fn free_expression(&self, name: &str) -> Option<&ExpressionMetadata> {
        self.expressions
            .iter()
            .find(|e| e.name == name && e.owner == ExpressionOwner::Free)
    }

    pub fn object_expression(&self, name: &str) -> Option<&ExpressionMetadata> {
        self.expressions
            .iter()
            .find(|e| e.name == name && e.owner == ExpressionOwner::Object)
    }

    pub fn automatism_expression(
        &self,
        automatism_type: &str,
        name: &str,
    ) -> Option<&ExpressionMetadata> {
        self.expressions.iter().find(|e| {
            e.name == name
                && matches!(&e.owner, ExpressionOwner::Automatism { automatism_type: t } if t == automatism_type)
        })
    }

    pub fn len(&self) -> usize {
        self.conditions.len() + self.actions.len() + self.expressions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ══════════════════════════════════════════════════════════════════════
    // Built-in entries
    // ══════════════════════════════════════════════════════════════════════

    /// The standard catalog: variables, conversions, strings, audio, object
    /// position, the top-down movement automatism and early loop exit.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register_variables();
        catalog.register_control();
        catalog.register_conversions();
        catalog.register_audio();
        catalog.register_objects();
        catalog.register_top_down_movement();
        catalog
    }

    fn sym(native: &str, js: &str) -> BackendSymbols {
        BackendSymbols::new()
            .with(Backend::Native, native)
            .with(Backend::Js, js)
    }

    /// Scene variables, number and string flavours, under both the legacy
    /// and current names.
    fn register_variables(&mut self) {
        use ParameterKind::*;
        for (name, ty, value_kind) in [
            ("ModVarScene", ValueType::Number, Expression),
            ("SetNumberVariable", ValueType::Number, Expression),
            ("ModVarSceneTxt", ValueType::String, String),
            ("SetStringVariable", ValueType::String, String),
        ] {
            self.add_action(
                InstructionMetadata::new(name, "Change the variable _PARAM0_: _PARAM1_ _PARAM2_")
                    .param(Variable, "Variable")
                    .param(Operator, "Modification's sign")
                    .param(value_kind, "Value")
                    .manipulates(ty)
                    .codegen(CodegenStyle::VariableModifier),
            );
        }
        for (name, ty, value_kind) in [
            ("VarScene", ValueType::Number, Expression),
            ("NumberVariable", ValueType::Number, Expression),
            ("VarSceneTxt", ValueType::String, String),
            ("StringVariable", ValueType::String, String),
        ] {
            self.add_condition(
                InstructionMetadata::new(name, "The variable _PARAM0_ _PARAM1_ _PARAM2_")
                    .param(Variable, "Variable")
                    .param(RelationalOperator, "Sign of the test")
                    .param(value_kind, "Value to compare")
                    .manipulates(ty)
                    .codegen(CodegenStyle::VariableComparison),
            );
        }
    }

    fn register_control(&mut self) {
        self.add_action(
            InstructionMetadata::new(
                "BuiltinCommonInstructions::StopLoop",
                "Stop the current loop after this iteration",
            )
            .codegen(CodegenStyle::StopLoop),
        );
        self.add_condition(
            InstructionMetadata::new("SceneJustBegins", "At the beginning of the scene")
                .param(ParameterKind::CodeOnly, "")
                .symbols(Self::sym(
                    "SceneJustBegins",
                    "gdjs.evtTools.runtimeScene.sceneJustBegins",
                )),
        );
    }

    fn register_conversions(&mut self) {
        use ParameterKind::*;
        self.add_expression(
            ExpressionMetadata::new(
                "ToString",
                ValueType::String,
                Self::sym("ToString", "gdjs.evtTools.common.toString"),
            )
            .text("Convert a number to a string")
            .param(Expression, "Number"),
        );
        self.add_expression(
            ExpressionMetadata::new(
                "ToNumber",
                ValueType::Number,
                Self::sym("ToNumber", "gdjs.evtTools.common.toNumber"),
            )
            .text("Convert a string to a number")
            .param(String, "Text"),
        );
        self.add_expression(
            ExpressionMetadata::new("Abs", ValueType::Number, Self::sym("Abs", "Math.abs"))
                .text("Absolute value")
                .param(Expression, "Number"),
        );
        self.add_expression(
            ExpressionMetadata::new(
                "StrLength",
                ValueType::Number,
                Self::sym("StrLength", "gdjs.evtTools.string.strLen"),
            )
            .text("Length of a string")
            .param(String, "Text"),
        );
    }

    fn register_audio(&mut self) {
        use ParameterKind::*;
        let get_volume = Self::sym("GetGlobalVolume", "gdjs.evtTools.sound.getGlobalVolume");
        self.add_action(
            InstructionMetadata::new(
                "ModGlobalVolume",
                "Do _PARAM1__PARAM2_ to the global volume",
            )
            .param(CodeOnly, "")
            .param(Operator, "Modification's sign")
            .param(Expression, "Volume (0 to 100)")
            .symbols(Self::sym(
                "SetGlobalVolume",
                "gdjs.evtTools.sound.setGlobalVolume",
            ))
            .getter(get_volume.clone())
            .manipulates(ValueType::Number),
        );
        self.add_condition(
            InstructionMetadata::new("GlobalVolume", "The global volume is _PARAM1_ _PARAM2_")
                .param(CodeOnly, "")
                .param(RelationalOperator, "Sign of the test")
                .param(Expression, "Volume to compare")
                .symbols(get_volume.clone())
                .manipulates(ValueType::Number),
        );
        self.add_expression(
            ExpressionMetadata::new("GlobalVolume", ValueType::Number, get_volume)
                .text("Global volume")
                .param(CodeOnly, ""),
        );
        self.add_action(
            InstructionMetadata::new("PlaySound", "Play the sound _PARAM1_")
                .param(CodeOnly, "")
                .param(File, "Audio file")
                .optional_param(YesOrNo, "Repeat the sound", "no")
                .optional_param(Expression, "Volume (0 to 100)", "100")
                .optional_param(Expression, "Pitch (1 by default)", "1")
                .symbols(Self::sym("PlaySound", "gdjs.evtTools.sound.playSound")),
        );

        // Channels
        self.add_action(
            InstructionMetadata::new(
                "PlaySoundCanal",
                "Play the sound _PARAM1_ on channel _PARAM2_",
            )
            .param(CodeOnly, "")
            .param(File, "Audio file")
            .param(Expression, "Channel (0 to 15)")
            .optional_param(YesOrNo, "Repeat the sound", "no")
            .optional_param(Expression, "Volume (0 to 100)", "100")
            .optional_param(Expression, "Pitch (1 by default)", "1")
            .symbols(Self::sym(
                "PlaySoundOnChannel",
                "gdjs.evtTools.sound.playSoundOnChannel",
            )),
        );
        let get_channel_volume = Self::sym(
            "GetSoundChannelVolume",
            "gdjs.evtTools.sound.getSoundOnChannelVolume",
        );
        self.add_action(
            InstructionMetadata::new(
                "ModVolumeSoundCanal",
                "Do _PARAM2__PARAM3_ to the volume of the sound on channel _PARAM1_",
            )
            .param(CodeOnly, "")
            .param(Expression, "Channel (0 to 15)")
            .param(Operator, "Modification's sign")
            .param(Expression, "Value")
            .symbols(Self::sym(
                "SetSoundChannelVolume",
                "gdjs.evtTools.sound.setSoundOnChannelVolume",
            ))
            .getter(get_channel_volume.clone())
            .manipulates(ValueType::Number),
        );
        self.add_expression(
            ExpressionMetadata::new("SoundChannelVolume", ValueType::Number, get_channel_volume)
                .text("Volume of the sound on a channel")
                .param(CodeOnly, "")
                .param(Expression, "Channel"),
        );
    }

    /// Position and lifetime of any object.
    fn register_objects(&mut self) {
        use ParameterKind::*;
        for (axis, action, condition) in [("X", "MettreX", "PosX"), ("Y", "MettreY", "PosY")] {
            let getter = Self::sym(&format!("Get{axis}"), &format!("get{axis}"));
            self.add_action(
                InstructionMetadata::new(action, "Change the position of _PARAM0_")
                    .param(Object, "Object")
                    .param(Operator, "Modification's sign")
                    .param(Expression, "Value")
                    .symbols(Self::sym(&format!("Set{axis}"), &format!("set{axis}")))
                    .getter(getter.clone())
                    .manipulates(ValueType::Number),
            );
            self.add_condition(
                InstructionMetadata::new(condition, "The position of _PARAM0_ is _PARAM1_ _PARAM2_")
                    .param(Object, "Object")
                    .param(RelationalOperator, "Sign of the test")
                    .param(Expression, "Position")
                    .symbols(getter.clone())
                    .manipulates(ValueType::Number),
            );
            self.add_expression(
                ExpressionMetadata::new(axis, ValueType::Number, getter)
                    .text("Position of the object")
                    .owner(ExpressionOwner::Object),
            );
        }
        self.add_action(
            InstructionMetadata::new("Delete", "Delete _PARAM0_")
                .param(Object, "Object")
                .param(CodeOnly, "")
                .symbols(Self::sym("DeleteFromScene", "deleteFromScene")),
        );
    }

    fn register_top_down_movement(&mut self) {
        use ParameterKind::*;
        const AUTOMATISM: &str = "TopDownMovementAutomatism";
        let owner = ExpressionOwner::Automatism {
            automatism_type: AUTOMATISM.to_string(),
        };
        for property in ["Acceleration", "MaxSpeed"] {
            let getter = Self::sym(&format!("Get{property}"), &format!("get{property}"));
            self.add_action(
                InstructionMetadata::new(
                    format!("{AUTOMATISM}::{property}"),
                    "Do _PARAM2__PARAM3_ to the property of _PARAM0_",
                )
                .param(Object, "Object")
                .automatism_param(AUTOMATISM)
                .param(Operator, "Modification's sign")
                .param(Expression, "Value")
                .symbols(Self::sym(&format!("Set{property}"), &format!("set{property}")))
                .getter(getter.clone())
                .manipulates(ValueType::Number),
            );
            self.add_condition(
                InstructionMetadata::new(
                    format!("{AUTOMATISM}::{property}"),
                    "The property of _PARAM0_ is _PARAM2_ _PARAM3_",
                )
                .param(Object, "Object")
                .automatism_param(AUTOMATISM)
                .param(RelationalOperator, "Sign of the test")
                .param(Expression, "Value to compare")
                .symbols(getter.clone())
                .manipulates(ValueType::Number),
            );
            self.add_expression(
                ExpressionMetadata::new(property, ValueType::Number, getter)
                    .owner(owner.clone()),
            );
        }
        self.add_condition(
            InstructionMetadata::new(format!("{AUTOMATISM}::IsMoving"), "_PARAM0_ is moving")
                .param(Object, "Object")
                .automatism_param(AUTOMATISM)
                .symbols(Self::sym("IsMoving", "isMoving")),
        );
        self.add_action(
            InstructionMetadata::new(
                format!("{AUTOMATISM}::SimulateControl"),
                "Simulate pressing _PARAM2_ for _PARAM0_",
            )
            .param(Object, "Object")
            .automatism_param(AUTOMATISM)
            .param(String, "Key")
            .symbols(Self::sym("SimulateControl", "simulateControl")),
        );
        self.add_expression(
            ExpressionMetadata::new("Speed", ValueType::Number, Self::sym("GetSpeed", "getSpeed"))
                .owner(owner),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_has_variable_instructions() {
        let catalog = Catalog::builtin();
        let action = catalog.action("ModVarScene").unwrap();
        assert_eq!(action.codegen, CodegenStyle::VariableModifier);
        assert_eq!(action.authored_arity(), 3);
        assert!(catalog.condition("VarSceneTxt").is_some());
    }

    #[test]
    fn code_only_parameters_are_not_authored() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.action("ModGlobalVolume").unwrap().authored_arity(), 2);
        assert_eq!(catalog.free_expression("GlobalVolume").unwrap().authored_arity(), 0);
        assert_eq!(catalog.free_expression("SoundChannelVolume").unwrap().authored_arity(), 1);
    }

    #[test]
    fn optional_parameters_carry_their_default() {
        let catalog = Catalog::builtin();
        let play = catalog.action("PlaySound").unwrap();
        assert_eq!(play.authored_arity(), 4);
        assert_eq!(play.required_arity(), 1);
        let pitch = play.parameters.last().unwrap();
        assert!(pitch.optional);
        assert_eq!(pitch.default_value.as_deref(), Some("1"));

        let json = serde_json::to_string(play).unwrap();
        assert!(json.contains(r#""optional":true,"defaultValue":"1""#), "{json}");
    }

    #[test]
    fn modifier_has_getter_and_setter() {
        let catalog = Catalog::builtin();
        let action = catalog.action("TopDownMovementAutomatism::Acceleration").unwrap();
        assert_eq!(action.symbols.get(Backend::Native), Some("SetAcceleration"));
        assert_eq!(
            action.getter.as_ref().and_then(|g| g.get(Backend::Js)),
            Some("getAcceleration")
        );
    }

    #[test]
    fn expression_lookup_respects_owner() {
        let catalog = Catalog::builtin();
        assert!(catalog.object_expression("X").is_some());
        assert!(catalog.free_expression("X").is_none());
        assert!(catalog
            .automatism_expression("TopDownMovementAutomatism", "Speed")
            .is_some());
        assert!(catalog.automatism_expression("Platformer", "Speed").is_none());
    }

    #[test]
    fn add_replaces_same_name() {
        let mut catalog = Catalog::new();
        catalog.add_action(InstructionMetadata::new("A", "first"));
        catalog.add_action(InstructionMetadata::new("A", "second"));
        assert_eq!(catalog.actions.len(), 1);
        assert_eq!(catalog.action("A").unwrap().text, "second");
    }

    #[test]
    fn catalog_json_round_trip() {
        let catalog = Catalog::builtin();
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(json.contains("\"relationalOperator\""));
        assert!(json.contains("\"yesorno\""));
        let back = Catalog::from_json(&json).unwrap();
        assert_eq!(back, catalog);
    }

    #[test]
    fn backend_support() {
        let mut catalog = Catalog::new();
        catalog.add_action(
            InstructionMetadata::new("NativeOnly", "")
                .symbols(BackendSymbols::new().with(Backend::Native, "Native")),
        );
        let action = catalog.action("NativeOnly").unwrap();
        assert!(action.supports(Backend::Native));
        assert!(!action.supports(Backend::Js));
    }
}
