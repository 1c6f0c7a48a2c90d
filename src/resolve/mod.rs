//! Merges the layered configuration into one flat parameter bag per request.
//!
//! Each config entity lists its parameters through [`Layer::entries`] and
//! declares a [`Precedence`]. [`resolve`] applies layers from lowest to
//! highest so that a later layer overwrites any key an earlier one set.

use std::{
    collections::BTreeMap,
    fmt,
};

use serde::{
    Deserialize,
    Serialize,
};

use crate::config::{
    GlobalConfig,
    ProfileConfig,
};

mod value;

pub use value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Precedence {
    Global,
    Profile,
    Action,
}

impl fmt::Display for Precedence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Precedence::Global => "global",
            Precedence::Profile => "profile",
            Precedence::Action => "action",
        };
        f.write_str(name)
    }
}

/// A config entity that contributes parameters to a request.
pub trait Layer {
    fn precedence(&self) -> Precedence;

    /// Scalar parameters of this entity. Collections are never listed.
    fn entries(&self) -> Vec<(&'static str, Value)>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBag {
    values: BTreeMap<String, (Value, Precedence)>,
}

impl ParameterBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies every entry of `layer`, replacing keys set by a lower or equal layer.
    pub fn apply(&mut self, layer: &dyn Layer) {
        let level = layer.precedence();
        for (key, value) in layer.entries() {
            match self.values.get(key) {
                Some((_, existing)) if *existing > level => {}
                _ => {
                    self.values.insert(key.to_string(), (value, level));
                }
            }
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>, level: Precedence) {
        self.values.insert(key.into(), (value.into(), level));
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key).map(|(value, _)| value)
    }

    /// Which layer the current value of `key` came from.
    pub fn source(&self, key: &str) -> Option<Precedence> {
        self.values.get(key).map(|(_, level)| *level)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_f64)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// String form of every value, for the template renderer's named scope.
    pub fn to_strings(&self) -> BTreeMap<String, String> {
        self.values.iter().map(|(key, (value, _))| (key.clone(), value.to_string())).collect()
    }
}

/// Global settings, then the profile, then the action (button or field
/// completion) when there is one.
pub fn resolve(
    global: &GlobalConfig,
    profile: &ProfileConfig,
    action: Option<&dyn Layer>,
) -> ParameterBag {
    let mut layers: Vec<&dyn Layer> = vec![global, profile];
    if let Some(action) = action {
        layers.push(action);
    }
    layers.sort_by_key(|layer| layer.precedence());

    let mut bag = ParameterBag::new();
    for layer in layers {
        bag.apply(layer);
    }
    bag
}
