//! template-context — a mutable data context for feeding templates.
//!
//! A [`Context`] owns a key/value data set and composes it from several
//! layers: caller-supplied data, a `defaults` baseline, registered
//! formatter functions, and named "states" (preset partial objects).
//! Every composition is a deep merge with a fixed precedence:
//! defaults < formatters < supplied data. Mutations are observable
//! through a single synchronous emitter callback.
//!
//! # Primitives
//!
//! - `update(data, mode)` — merge data into the context, optionally
//!   discarding the current set or applying a named state afterwards
//! - `merge_state(id, fresh)` — merge a named state partial on demand
//! - `get(path)` / `set(path, value)` / `has(path)` — dot-separated
//!   keypath access into nested objects; `set` notifies the emitter
//! - `register_formatter(id, f)` — make a function addressable as a
//!   data field on the next composition
//! - `apply_transforms(id)` — run a named in-place mutation over the
//!   data set
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use template_context::{Context, ContextConfig, DataSet, UpdateMode};
//!
//! let mut ctx = Context::new(ContextConfig::default());
//!
//! let data = DataSet::try_from(json!({
//!     "firstname": "Ada",
//!     "address": { "street": "Main St", "zip": "00000" }
//! })).unwrap();
//! ctx.update(data, UpdateMode::Merge);
//!
//! ctx.set("address.street", "Second St");
//! assert_eq!(ctx.get("address.street"), Some(&json!("Second St")));
//! assert!(ctx.has("address.zip"));
//! ```
//!
//! The context never renders anything; it only prepares and tracks the
//! data a template engine reads. It is also not a pub/sub system — the
//! emitter is a single-slot observer supplied at construction.

pub mod config;
pub mod context;
pub mod error;
pub mod keypath;
pub mod merge;
pub mod value;

// Re-export primary types at crate root.
pub use config::ContextConfig;
pub use context::{ChangeEmitter, ChangePayload, Context, Transform, UpdateMode};
pub use error::ContextError;
pub use merge::{MergeFn, deep_merge};
pub use value::{DataSet, Field, Formatter};
