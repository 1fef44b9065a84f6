use serde::{Deserialize, Serialize};

/// A variable value: scalar or nested collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VariableRepr", into = "VariableRepr")]
pub enum Variable {
    Number(f64),
    String(String),
    Boolean(bool),
    Structure(VariablesContainer),
    Array(Vec<Variable>),
}

impl Default for Variable {
    fn default() -> Self {
        Variable::Number(0.0)
    }
}

impl Variable {
    /// Lowercase type name, as used in the serialized form.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variable::Number(_) => "number",
            Variable::String(_) => "string",
            Variable::Boolean(_) => "boolean",
            Variable::Structure(_) => "structure",
            Variable::Array(_) => "array",
        }
    }

    /// Read as a number. Strings are parsed, booleans map to 0/1,
    /// collections read as 0.
    pub fn as_number(&self) -> f64 {
        match self {
            Variable::Number(n) => *n,
            Variable::String(s) => s.trim().parse().unwrap_or(0.0),
            Variable::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Variable::Structure(_) | Variable::Array(_) => 0.0,
        }
    }

    /// Read as a string. Numbers use their shortest representation.
    pub fn as_string(&self) -> String {
        match self {
            Variable::Number(n) => format_number(*n),
            Variable::String(s) => s.clone(),
            Variable::Boolean(b) => b.to_string(),
            Variable::Structure(_) | Variable::Array(_) => String::new(),
        }
    }

    pub fn set_number(&mut self, value: f64) {
        *self = Variable::Number(value);
    }

    pub fn set_string(&mut self, value: impl Into<String>) {
        *self = Variable::String(value.into());
    }

    /// Child of a structure (by name) or array (by decimal index).
    pub fn child(&self, name: &str) -> Option<&Variable> {
        match self {
            Variable::Structure(children) => children.get(name),
            Variable::Array(items) => name.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Child of a structure, created as `Number(0)` when missing.
    ///
    /// A non-structure variable is converted into an empty structure first.
    pub fn child_mut(&mut self, name: &str) -> &mut Variable {
        match self {
            Variable::Structure(children) => children.entry(name),
            other => {
                *other = Variable::Structure(VariablesContainer::new());
                other.child_mut(name)
            }
        }
    }
}

/// Format a number the way generated code prints it: integers without a
/// fractional part.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// A variable with its name, as stored in a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedVariable {
    pub name: String,
    #[serde(flatten)]
    pub variable: Variable,
}

/// Ordered mapping from variable name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariablesContainer(Vec<NamedVariable>);

impl VariablesContainer {
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Builder form of [`VariablesContainer::insert`].
    pub fn with(mut self, name: impl Into<String>, variable: Variable) -> Self {
        self.insert(name, variable);
        self
    }

    /// Insert or overwrite. An overwritten variable keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, variable: Variable) {
        let name = name.into();
        match self.0.iter_mut().find(|v| v.name == name) {
            Some(existing) => existing.variable = variable,
            None => self.0.push(NamedVariable { name, variable }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Variable> {
        self.0.iter().find(|v| v.name == name).map(|v| &v.variable)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.0
            .iter_mut()
            .find(|v| v.name == name)
            .map(|v| &mut v.variable)
    }

    /// Mutable access, inserting `Number(0)` when the name is missing.
    pub fn entry(&mut self, name: &str) -> &mut Variable {
        let index = match self.0.iter().position(|v| v.name == name) {
            Some(index) => index,
            None => {
                self.0.push(NamedVariable {
                    name: name.to_string(),
                    variable: Variable::default(),
                });
                self.0.len() - 1
            }
        };
        &mut self.0[index].variable
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|v| v.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedVariable> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ── Serialized form ──────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum VariableRepr {
    Number {
        #[serde(default)]
        value: f64,
    },
    String {
        #[serde(default)]
        value: String,
    },
    Boolean {
        #[serde(default)]
        value: bool,
    },
    Structure {
        #[serde(default)]
        children: Vec<NamedVariable>,
    },
    Array {
        #[serde(default)]
        children: Vec<Variable>,
    },
}

impl From<VariableRepr> for Variable {
    fn from(repr: VariableRepr) -> Self {
        match repr {
            VariableRepr::Number { value } => Variable::Number(value),
            VariableRepr::String { value } => Variable::String(value),
            VariableRepr::Boolean { value } => Variable::Boolean(value),
            VariableRepr::Structure { children } => {
                Variable::Structure(VariablesContainer(children))
            }
            VariableRepr::Array { children } => Variable::Array(children),
        }
    }
}

impl From<Variable> for VariableRepr {
    fn from(variable: Variable) -> Self {
        match variable {
            Variable::Number(value) => VariableRepr::Number { value },
            Variable::String(value) => VariableRepr::String { value },
            Variable::Boolean(value) => VariableRepr::Boolean { value },
            Variable::Structure(children) => VariableRepr::Structure {
                children: children.0,
            },
            Variable::Array(children) => VariableRepr::Array { children },
        }
    }
}
