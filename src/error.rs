//! The AbacError is the Error type used to 'wrap' the handful of failure
//! modes that are allowed to escape the engine as a thrown error rather than
//! being folded into a coded `Decision` (see the module docs on `pdp`).
use failure::Fail;

/// Engine error type to 'wrap' other, underlying error causes.
///
/// Only load-time and caller-misuse failures live here. Everything the
/// engine can resolve safely within its own deny-by-default model
/// (`AttributeNotResolvable`, `TypeMismatch`, `BackendUnavailable`) is
/// converted to a coded `Decision` or to a cache diagnostic instead; see
/// `crate::context::DecisionCode` and `crate::cache::RefreshDiagnostic`.
#[derive(Debug, Fail)]
pub enum AbacError {
    #[fail(display = "{}", message)]
    GeneralError { message: String },

    /// A policy or one of its rule expressions could not be built from its
    /// declarative record. Aborts the load of the whole backend.
    #[fail(
        display = "malformed expression in policy {:?}, rule index {}: {}",
        policy_name, rule_index, reason
    )]
    MalformedPolicy {
        policy_name: String,
        rule_index: usize,
        reason: String,
    },

    /// The caller canceled a decision in progress.
    #[fail(display = "decision canceled")]
    Canceled,

    #[fail(display = "{}", message)]
    EnvVarError {
        message: String,
        #[cause]
        cause: std::env::VarError,
    },

    #[fail(display = "{}", message)]
    IoError {
        message: String,
        #[cause]
        cause: std::io::Error,
    },

    #[fail(display = "{}", message)]
    JsonError {
        message: String,
        #[cause]
        cause: serde_json::Error,
    },

    #[fail(display = "{}", message)]
    YamlError {
        message: String,
        #[cause]
        cause: serde_yaml::Error,
    },

    #[fail(display = "{}", message)]
    RegexError {
        message: String,
        #[cause]
        cause: regex::Error,
    },
}

impl AbacError {
    pub fn general<S: Into<String>>(message: S) -> AbacError {
        AbacError::GeneralError {
            message: message.into(),
        }
    }

    pub fn malformed_policy<S1, S2>(policy_name: S1, rule_index: usize, reason: S2) -> AbacError
    where
        S1: Into<String>,
        S2: Into<String>,
    {
        AbacError::MalformedPolicy {
            policy_name: policy_name.into(),
            rule_index,
            reason: reason.into(),
        }
    }
}

impl From<std::env::VarError> for AbacError {
    fn from(error: std::env::VarError) -> Self {
        AbacError::EnvVarError {
            message: format!("{:?}", error),
            cause: error,
        }
    }
}

impl From<std::io::Error> for AbacError {
    fn from(io_error: std::io::Error) -> Self {
        AbacError::IoError {
            message: format!("{:?}", io_error),
            cause: io_error,
        }
    }
}

impl From<serde_json::Error> for AbacError {
    fn from(json_error: serde_json::Error) -> Self {
        AbacError::JsonError {
            message: format!("{:?}", json_error),
            cause: json_error,
        }
    }
}

impl From<serde_yaml::Error> for AbacError {
    fn from(yaml_error: serde_yaml::Error) -> Self {
        AbacError::YamlError {
            message: format!("{:?}", yaml_error),
            cause: yaml_error,
        }
    }
}

impl From<regex::Error> for AbacError {
    fn from(regex_error: regex::Error) -> Self {
        AbacError::RegexError {
            message: format!("{:?}", regex_error),
            cause: regex_error,
        }
    }
}
