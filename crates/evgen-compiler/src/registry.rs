//! Object and automatism registry.
//!
//! Maps every object name of the scene to its type and attached
//! automatisms, and every group name to its member objects.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An automatism attached to an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomatismDecl {
    pub name: String,
    #[serde(rename = "type")]
    pub automatism_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectDecl {
    #[serde(rename = "type", default)]
    pub object_type: String,
    #[serde(default)]
    pub automatisms: Vec<AutomatismDecl>,
}

impl ObjectDecl {
    pub fn automatism(&self, name: &str) -> Option<&AutomatismDecl> {
        self.automatisms.iter().find(|a| a.name == name)
    }
}

/// What a name in object position refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRef<'a> {
    Object(&'a ObjectDecl),
    Group(&'a [String]),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRegistry {
    #[serde(default)]
    pub objects: BTreeMap<String, ObjectDecl>,
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Builder: declare an object.
    pub fn with_object(mut self, name: impl Into<String>, object_type: impl Into<String>) -> Self {
        self.objects.insert(
            name.into(),
            ObjectDecl {
                object_type: object_type.into(),
                automatisms: Vec::new(),
            },
        );
        self
    }

    /// Builder: attach an automatism to an already declared object.
    pub fn with_automatism(
        mut self,
        object: &str,
        name: impl Into<String>,
        automatism_type: impl Into<String>,
    ) -> Self {
        if let Some(decl) = self.objects.get_mut(object) {
            decl.automatisms.push(AutomatismDecl {
                name: name.into(),
                automatism_type: automatism_type.into(),
            });
        }
        self
    }

    /// Builder: declare a group.
    pub fn with_group<I, S>(mut self, name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .insert(name.into(), members.into_iter().map(Into::into).collect());
        self
    }

    pub fn object(&self, name: &str) -> Option<&ObjectDecl> {
        self.objects.get(name)
    }

    /// Resolve a name used in object position. Objects win over groups of
    /// the same name.
    pub fn lookup(&self, name: &str) -> Option<ObjectRef<'_>> {
        if let Some(decl) = self.objects.get(name) {
            return Some(ObjectRef::Object(decl));
        }
        self.groups.get(name).map(|m| ObjectRef::Group(m))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name) || self.groups.contains_key(name)
    }

    pub fn is_group(&self, name: &str) -> bool {
        matches!(self.lookup(name), Some(ObjectRef::Group(_)))
    }

    /// The concrete objects a name stands for: itself, or the declared
    /// members of a group. Unknown members are dropped.
    pub fn members(&self, name: &str) -> Option<Vec<String>> {
        match self.lookup(name)? {
            ObjectRef::Object(_) => Some(vec![name.to_string()]),
            ObjectRef::Group(members) => Some(
                members
                    .iter()
                    .filter(|m| self.objects.contains_key(m.as_str()))
                    .cloned()
                    .collect(),
            ),
        }
    }
}
