use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::context::{ChangeEmitter, Transform};
use crate::error::ContextError;
use crate::merge::MergeFn;
use crate::value::{DataSet, Formatter, json_kind};

/// Construction-time configuration for a [`Context`](crate::Context).
///
/// Every recognized option is an explicit named field; there is no way
/// to smuggle arbitrary keys onto the instance. Collections default to
/// empty, scalars to their documented defaults, and `emit` / `merge_fn`
/// to `None` (meaning: no-op emitter, built-in deep merge).
#[derive(Clone)]
pub struct ContextConfig {
    /// State id merged during initialization, if any.
    pub state: Option<String>,
    /// Run `init` from the constructor. Default `true`.
    pub autoinitialize: bool,
    /// Joiner between an event type and a path. Default `"."`.
    pub change_event_glue: String,
    /// Event type emitted by keypath writes. Default `"change"`.
    pub change_event_type: String,
    /// Event type emitted by compositions. Default `"update"`.
    pub update_event_type: String,
    /// Initial data, composed during `init`.
    pub data: DataSet,
    /// Baseline merged ahead of every composition.
    pub defaults: DataSet,
    /// Reserved pre-merge source slot; stored, never read.
    pub source: DataSet,
    /// Named state partials.
    pub states: BTreeMap<String, DataSet>,
    /// Formatters merged into the data on every composition.
    pub formatters: BTreeMap<String, Formatter>,
    /// Named in-place data transforms.
    pub transforms: BTreeMap<String, Transform>,
    /// Change observer; `None` keeps the no-op emitter.
    pub emit: Option<ChangeEmitter>,
    /// Deep-merge override; `None` keeps [`deep_merge`](crate::deep_merge).
    pub merge_fn: Option<MergeFn>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            state: None,
            autoinitialize: true,
            change_event_glue: ".".to_string(),
            change_event_type: "change".to_string(),
            update_event_type: "update".to_string(),
            data: DataSet::new(),
            defaults: DataSet::new(),
            source: DataSet::new(),
            states: BTreeMap::new(),
            formatters: BTreeMap::new(),
            transforms: BTreeMap::new(),
            emit: None,
            merge_fn: None,
        }
    }
}

impl fmt::Debug for ContextConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextConfig")
            .field("state", &self.state)
            .field("autoinitialize", &self.autoinitialize)
            .field("change_event_glue", &self.change_event_glue)
            .field("change_event_type", &self.change_event_type)
            .field("update_event_type", &self.update_event_type)
            .field("data", &self.data)
            .field("defaults", &self.defaults)
            .field("source", &self.source)
            .field("states", &self.states.keys().collect::<Vec<_>>())
            .field("formatters", &self.formatters.keys().collect::<Vec<_>>())
            .field("transforms", &self.transforms.keys().collect::<Vec<_>>())
            .field("emit", &self.emit.as_ref().map(|_| "<emitter>"))
            .field("merge_fn", &self.merge_fn.as_ref().map(|_| "<merge>"))
            .finish()
    }
}

impl ContextConfig {
    /// Parse the serializable subset of the configuration from a JSON
    /// object.
    ///
    /// Unrecognized keys are rejected with
    /// [`ContextError::UnknownOption`] rather than silently dropped.
    /// `formatters`, `transforms`, `emit` and `merge_fn` are code, not
    /// data — they can only be supplied from Rust, and their presence
    /// in a JSON document is an error.
    pub fn from_json(value: Value) -> Result<Self, ContextError> {
        let map = match value {
            Value::Object(map) => map,
            other => return Err(ContextError::NotAnObject(json_kind(&other))),
        };

        let mut config = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "state" => config.state = scalar(&key, value)?,
                "autoinitialize" => config.autoinitialize = scalar(&key, value)?,
                "change_event_glue" => config.change_event_glue = scalar(&key, value)?,
                "change_event_type" => config.change_event_type = scalar(&key, value)?,
                "update_event_type" => config.update_event_type = scalar(&key, value)?,
                "data" => config.data = collection(&key, value)?,
                "defaults" => config.defaults = collection(&key, value)?,
                "source" => config.source = collection(&key, value)?,
                "states" => {
                    let states = match value {
                        Value::Object(map) => map,
                        other => {
                            return Err(ContextError::InvalidOption {
                                key,
                                reason: format!("expected a JSON object, got {}", json_kind(&other)),
                            });
                        }
                    };
                    for (id, partial) in states {
                        let partial = collection(&format!("states.{id}"), partial)?;
                        config.states.insert(id, partial);
                    }
                }
                "formatters" | "transforms" | "emit" | "merge_fn" => {
                    return Err(ContextError::InvalidOption {
                        key,
                        reason: "functions cannot be configured from JSON".to_string(),
                    });
                }
                _ => return Err(ContextError::UnknownOption(key)),
            }
        }
        Ok(config)
    }
}

fn scalar<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, ContextError> {
    serde_json::from_value(value).map_err(|err| ContextError::InvalidOption {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

fn collection(key: &str, value: Value) -> Result<DataSet, ContextError> {
    DataSet::try_from(value).map_err(|err| ContextError::InvalidOption {
        key: key.to_string(),
        reason: err.to_string(),
    })
}
