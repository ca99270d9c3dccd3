use thiserror::Error;

/// Errors from the configuration surface.
///
/// The context core itself never fails: unknown states return `false`,
/// unknown transforms are silent no-ops, missing keypaths resolve to
/// `None`. Only parsing a configuration document can go wrong.
#[derive(Error, Debug)]
pub enum ContextError {
    /// A value that must be a JSON object was something else.
    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A config key that is not a recognized option.
    #[error("unknown config option: {0}")]
    UnknownOption(String),

    /// A recognized option carried an unusable value.
    #[error("invalid config option `{key}`: {reason}")]
    InvalidOption { key: String, reason: String },
}
