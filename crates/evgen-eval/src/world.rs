//! In-memory scene the evaluator runs against.

use std::collections::BTreeMap;

use evgen_types::ir::ValueType;
use evgen_types::{format_number, Variable, VariablesContainer};
use serde::{Deserialize, Serialize};

pub type InstanceId = u32;

/// Picked instances per object name.
pub type Picking = BTreeMap<String, Vec<InstanceId>>;

// ══════════════════════════════════════════════════════════════════════════════
// Values
// ══════════════════════════════════════════════════════════════════════════════

/// A runtime value passed to and returned from host functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
    /// Picked instance lists passed as an object argument.
    Objects(Picking),
}

impl Value {
    pub fn default_for(ty: ValueType) -> Self {
        match ty {
            ValueType::String => Value::Text(String::new()),
            ValueType::Boolean => Value::Bool(false),
            ValueType::Number | ValueType::Object => Value::Number(0.0),
        }
    }

    pub fn as_number(&self) -> f64 {
        match self {
            Value::Number(n) => *n,
            Value::Text(s) => s.trim().parse().unwrap_or(0.0),
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Objects(_) => 0.0,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Bool(b) => b.to_string(),
            Value::Objects(_) => String::new(),
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::Objects(picking) => picking.values().any(|list| !list.is_empty()),
        }
    }

    /// Read a variable as `ty`.
    pub fn from_variable(variable: &Variable, ty: ValueType) -> Self {
        match ty {
            ValueType::String => Value::Text(variable.as_string()),
            ValueType::Boolean => Value::Bool(match variable {
                Variable::Boolean(b) => *b,
                other => other.as_number() != 0.0,
            }),
            ValueType::Number | ValueType::Object => Value::Number(variable.as_number()),
        }
    }

    /// Store into a variable as `ty`.
    pub fn write_to(&self, variable: &mut Variable, ty: ValueType) {
        match ty {
            ValueType::String => variable.set_string(self.as_text()),
            ValueType::Boolean => *variable = Variable::Boolean(self.as_bool()),
            ValueType::Number | ValueType::Object => variable.set_number(self.as_number()),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Instances
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,
    pub object: String,
    /// Numeric properties (`X`, `Y`, ...).
    pub properties: BTreeMap<String, f64>,
    /// Automatism name → its numeric properties.
    pub automatisms: BTreeMap<String, BTreeMap<String, f64>>,
    pub deleted: bool,
}

impl Instance {
    pub fn property(&self, name: &str) -> f64 {
        self.properties.get(name).copied().unwrap_or(0.0)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// World
// ══════════════════════════════════════════════════════════════════════════════

/// Scene state: instances, scene variables and a few runtime globals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct World {
    instances: Vec<Instance>,
    pub globals: VariablesContainer,
    pub global_volume: f64,
    /// Volume of the sound on each channel that has been played or set.
    pub channel_volumes: BTreeMap<u32, f64>,
    /// Frames run so far; `SceneJustBegins` holds on frame 0.
    pub frame: u64,
    /// Side effects with no state of their own (sounds, simulated keys),
    /// in call order.
    pub log: Vec<String>,
}

impl World {
    pub fn new() -> Self {
        Self {
            global_volume: 100.0,
            ..Self::default()
        }
    }

    pub fn with_globals(mut self, globals: VariablesContainer) -> Self {
        self.globals = globals;
        self
    }

    /// Volume of the sound on `channel`; 100 on a channel never touched.
    pub fn channel_volume(&self, channel: u32) -> f64 {
        self.channel_volumes.get(&channel).copied().unwrap_or(100.0)
    }

    /// Add an instance of `object` at `(x, y)`.
    pub fn spawn(&mut self, object: &str, x: f64, y: f64) -> InstanceId {
        let id = self.instances.len() as InstanceId;
        let properties = BTreeMap::from([("X".to_string(), x), ("Y".to_string(), y)]);
        self.instances.push(Instance {
            id,
            object: object.to_string(),
            properties,
            automatisms: BTreeMap::new(),
            deleted: false,
        });
        id
    }

    /// Attach an automatism (with no properties set) to an instance.
    pub fn attach(&mut self, id: InstanceId, automatism: &str) {
        if let Some(instance) = self.instance_mut(id) {
            instance
                .automatisms
                .entry(automatism.to_string())
                .or_default();
        }
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(id as usize)
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(id as usize)
    }

    /// Live instances of `object`, in creation order.
    pub fn instances_of(&self, object: &str) -> Vec<InstanceId> {
        self.instances
            .iter()
            .filter(|i| i.object == object && !i.deleted)
            .map(|i| i.id)
            .collect()
    }

    /// Picked lists at the start of a frame: every live instance.
    pub fn scene_picking(&self) -> Picking {
        let mut picking = Picking::new();
        for instance in self.instances.iter().filter(|i| !i.deleted) {
            picking
                .entry(instance.object.clone())
                .or_default()
                .push(instance.id);
        }
        picking
    }

    pub fn global(&self, name: &str) -> Option<&Variable> {
        self.globals.get(name)
    }

    pub fn global_number(&self, name: &str) -> f64 {
        self.global(name).map_or(0.0, Variable::as_number)
    }
}
