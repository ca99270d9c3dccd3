use std::collections::BTreeMap;
use std::mem;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ContextConfig;
use crate::error::ContextError;
use crate::keypath;
use crate::merge::{self, MergeFn};
use crate::value::{DataSet, Field, Formatter};

/// Payload carried by keypath change notifications.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangePayload {
    /// Value previously stored at the path, if any.
    pub old: Option<Value>,
    /// Value just written.
    pub value: Value,
    /// The keypath that changed.
    pub property: String,
}

/// The single-slot change observer.
///
/// Called synchronously, during the mutating operation, with an
/// event-type string and an optional payload. The default is a no-op.
/// This is the context's entire observable-output surface — it is not
/// a subscription system.
pub type ChangeEmitter = Arc<dyn Fn(&str, Option<&ChangePayload>) + Send + Sync>;

/// A named transform over the data set.
///
/// Transforms mutate the data in place — add fields, delete fields —
/// rather than returning a replacement. The owning context is passed
/// explicitly as the first argument.
pub type Transform = Arc<dyn Fn(&Context, &mut DataSet) + Send + Sync>;

/// How [`Context::update`] treats the existing data set.
///
/// This is the second argument of `update`; the three variants cover
/// "keep merging", "discard and start fresh", and "merge, then apply a
/// named state".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Merge into the current data set.
    #[default]
    Merge,
    /// Discard the current data set; compose from empty.
    Fresh,
    /// Merge into the current data set, then apply the named state.
    State(String),
}

/// A mutable template context.
///
/// Owns the authoritative data set and composes it from defaults,
/// registered formatters, caller-supplied data and named states. See
/// the crate docs for the composition precedence.
///
/// All mutation goes through `&mut self`, so a context has a single
/// logical owner and emissions can never re-enter an in-flight merge.
pub struct Context {
    data: DataSet,
    defaults: DataSet,
    /// Reserved pre-merge source slot. Present for parity with the
    /// configuration surface; the composition never reads it.
    source: DataSet,
    states: BTreeMap<String, DataSet>,
    formatters: BTreeMap<String, Formatter>,
    transforms: BTreeMap<String, Transform>,
    initialized: bool,
    state: Option<String>,
    change_event_glue: String,
    change_event_type: String,
    update_event_type: String,
    emit: ChangeEmitter,
    merge_fn: MergeFn,
    pending: Option<ContextConfig>,
}

impl Context {
    /// Create a context from a configuration.
    ///
    /// Unless `config.autoinitialize` is `false`, this runs [`init`]
    /// immediately — which performs the first composition and emits an
    /// update event.
    ///
    /// [`init`]: Context::init
    pub fn new(config: ContextConfig) -> Self {
        let autoinitialize = config.autoinitialize;
        let mut ctx = Self {
            data: DataSet::new(),
            defaults: DataSet::new(),
            source: DataSet::new(),
            states: BTreeMap::new(),
            formatters: BTreeMap::new(),
            transforms: BTreeMap::new(),
            initialized: false,
            state: None,
            change_event_glue: ".".to_string(),
            change_event_type: "change".to_string(),
            update_event_type: "update".to_string(),
            emit: Arc::new(|_, _| {}),
            merge_fn: Arc::new(merge::deep_merge),
            pending: Some(config),
        };
        if autoinitialize {
            ctx.init();
        }
        ctx
    }

    /// Create a context from a JSON configuration document.
    ///
    /// Covers the serializable subset of [`ContextConfig`]; see
    /// [`ContextConfig::from_json`].
    pub fn from_json(value: Value) -> Result<Self, ContextError> {
        Ok(Self::new(ContextConfig::from_json(value)?))
    }

    /// Initialize the context: apply the stored configuration and run
    /// the first composition.
    ///
    /// Idempotent — a second call logs a warning and returns without
    /// touching anything. Always emits one update event on the first
    /// call (via [`update`](Context::update)).
    pub fn init(&mut self) -> &mut Self {
        if self.initialized {
            warn!("context already initialized");
            return self;
        }
        self.initialized = true;
        debug!("initializing context");

        let config = self.pending.take().unwrap_or_default();
        self.state = config.state;
        self.change_event_glue = config.change_event_glue;
        self.change_event_type = config.change_event_type;
        self.update_event_type = config.update_event_type;
        self.defaults = config.defaults;
        self.source = config.source;
        self.states = config.states;
        self.formatters = config.formatters;
        self.transforms = config.transforms;
        if let Some(emit) = config.emit {
            self.emit = emit;
        }
        if let Some(merge_fn) = config.merge_fn {
            self.merge_fn = merge_fn;
        }

        let mode = match &self.state {
            Some(id) => UpdateMode::State(id.clone()),
            None => UpdateMode::Merge,
        };
        self.update(config.data, mode);
        self
    }

    // ====================================================================
    // Composition
    // ====================================================================

    /// Merge `data` into the context's data set.
    ///
    /// The new data set is the deep merge of, in order: the base
    /// (empty for [`UpdateMode::Fresh`], the current data otherwise),
    /// the defaults, the registered formatters, and `data` — later
    /// sources win scalar conflicts, nested objects merge recursively.
    ///
    /// For [`UpdateMode::State`], the named state is merged afterwards
    /// via [`merge_state`](Context::merge_state); an unknown state id
    /// is silently ignored. Finally one update event is emitted, with
    /// no payload.
    pub fn update(&mut self, data: DataSet, mode: UpdateMode) -> &DataSet {
        let mut base = match mode {
            UpdateMode::Fresh => DataSet::new(),
            _ => mem::take(&mut self.data),
        };
        (self.merge_fn)(&mut base, &self.defaults);
        (self.merge_fn)(&mut base, &self.formatter_fields());
        (self.merge_fn)(&mut base, &data);
        self.data = base;

        if let UpdateMode::State(id) = &mode {
            self.merge_state(id, false);
        }
        (self.emit)(&self.update_event_type, None);
        &self.data
    }

    /// Merge the named state partial into the data set.
    ///
    /// Returns `false` (no mutation, no emission) when `state_id` is
    /// unknown. Otherwise composes base / defaults / formatters /
    /// state partial exactly like [`update`](Context::update), emits a
    /// state-qualified update event (e.g. `"update.state1"`), and
    /// returns `true`. `fresh` discards the current data first.
    pub fn merge_state(&mut self, state_id: &str, fresh: bool) -> bool {
        let Some(partial) = self.states.get(state_id) else {
            return false;
        };
        let partial = partial.clone();

        let mut base = if fresh {
            DataSet::new()
        } else {
            mem::take(&mut self.data)
        };
        (self.merge_fn)(&mut base, &self.defaults);
        (self.merge_fn)(&mut base, &self.formatter_fields());
        (self.merge_fn)(&mut base, &partial);
        self.data = base;

        let event = self.event_type(&self.update_event_type, Some(state_id));
        (self.emit)(&event, None);
        true
    }

    /// Deprecated alias for [`merge_state`](Context::merge_state).
    #[deprecated(note = "use `merge_state` instead")]
    pub fn merge(&mut self, state_id: &str, fresh: bool) -> bool {
        warn!(state_id, "merge() is deprecated, use merge_state()");
        self.merge_state(state_id, fresh)
    }

    /// The registered formatters as mergeable data fields.
    fn formatter_fields(&self) -> DataSet {
        let mut set = DataSet::new();
        for (id, formatter) in &self.formatters {
            set.insert(id.clone(), Field::Formatter(Arc::clone(formatter)));
        }
        set
    }

    // ====================================================================
    // Keypath access
    // ====================================================================

    /// Read the value at a dot-separated keypath.
    ///
    /// Returns `None` for any missing segment — callers supply their
    /// own fallback with `unwrap_or` / `unwrap_or_else`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        keypath::get(&self.data, path)
    }

    /// Write a value at a dot-separated keypath, creating intermediate
    /// objects as needed.
    ///
    /// Emits exactly two notifications, in order: the bare change
    /// event, then the path-qualified change event, both carrying the
    /// same `{old, value, property}` payload.
    pub fn set(&mut self, path: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        let old = self.get(path).cloned();
        keypath::set(&mut self.data, path, value.clone());

        let payload = ChangePayload {
            old,
            value,
            property: path.to_string(),
        };
        (self.emit)(&self.change_event_type, Some(&payload));
        let scoped = self.event_type(&self.change_event_type, Some(path));
        (self.emit)(&scoped, Some(&payload));
        self
    }

    /// Check whether something exists at a keypath.
    pub fn has(&self, path: &str) -> bool {
        keypath::has(&self.data, path)
    }

    // ====================================================================
    // Formatters & transforms
    // ====================================================================

    /// Register a formatter under `id`.
    ///
    /// The next composition merges it into the data set, making it
    /// addressable as a field for template consumers.
    pub fn register_formatter<F>(&mut self, id: impl Into<String>, formatter: F) -> &mut Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.formatters.insert(id.into(), Arc::new(formatter));
        self
    }

    /// Register a transform under `id`, runnable later with
    /// [`apply_transforms`](Context::apply_transforms).
    pub fn register_transform<F>(&mut self, id: impl Into<String>, transform: F) -> &mut Self
    where
        F: Fn(&Context, &mut DataSet) + Send + Sync + 'static,
    {
        self.transforms.insert(id.into(), Arc::new(transform));
        self
    }

    /// Run the named transform over the data set, in place.
    ///
    /// An unknown id is a silent no-op. The transform's return value is
    /// ignored by construction — it mutates the set it is handed.
    pub fn apply_transforms(&mut self, transform_id: &str) -> &mut Self {
        let Some(transform) = self.transforms.get(transform_id).cloned() else {
            return self;
        };
        let mut data = mem::take(&mut self.data);
        transform(self, &mut data);
        self.data = data;
        self
    }

    // ====================================================================
    // Events
    // ====================================================================

    /// Join an event type with a path using the configured glue.
    ///
    /// `kind` comes back unchanged when `path` is absent or empty.
    /// Every emission site goes through this, so downstream code can
    /// rely on the exact joining behavior.
    pub fn event_type(&self, kind: &str, path: Option<&str>) -> String {
        match path {
            Some(path) if !path.is_empty() => {
                format!("{}{}{}", kind, self.change_event_glue, path)
            }
            _ => kind.to_string(),
        }
    }

    // ====================================================================
    // Accessors
    // ====================================================================

    /// The authoritative data set.
    pub fn data(&self) -> &DataSet {
        &self.data
    }

    /// The defaults baseline. Never mutated by the context.
    pub fn defaults(&self) -> &DataSet {
        &self.defaults
    }

    /// The reserved source slot.
    pub fn source(&self) -> &DataSet {
        &self.source
    }

    /// Look up a registered formatter.
    pub fn formatter(&self, id: &str) -> Option<&Formatter> {
        self.formatters.get(id)
    }

    /// Whether `init` has run.
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// The initial state id from the configuration, if any.
    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(ContextConfig::default())
    }
}
