use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a command run ended. Resolver diagnostics and per-wheel download
/// failures do not fail a run; they downgrade it to `Warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandStatus {
    Ok,
    Warning,
    UserError,
    Failure,
}

impl CommandStatus {
    #[must_use]
    pub const fn exit_code(self) -> i32 {
        match self {
            CommandStatus::Ok | CommandStatus::Warning => 0,
            CommandStatus::UserError => 1,
            CommandStatus::Failure => 2,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            CommandStatus::Ok => "ok",
            CommandStatus::Warning => "warning",
            CommandStatus::UserError => "user-error",
            CommandStatus::Failure => "error",
        }
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, CommandStatus::UserError | CommandStatus::Failure)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    /// A finished run; `warnings` counts the packages or wheels that were
    /// skipped along the way.
    pub fn completed(message: impl Into<String>, details: Value, warnings: usize) -> Self {
        let status = if warnings == 0 {
            CommandStatus::Ok
        } else {
            CommandStatus::Warning
        };
        Self {
            status,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }
}

/// Operator mistake such as a bad target or an empty wishlist. `reason` is
/// a stable machine-readable key copied into the details.
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct UserError {
    reason: &'static str,
    message: String,
    details: Value,
}

impl UserError {
    pub fn new(reason: &'static str, message: impl Into<String>, details: Value) -> Self {
        let mut fields = match details {
            Value::Object(fields) => fields,
            Value::Null => Map::new(),
            other => Map::from_iter([("value".to_string(), other)]),
        };
        fields.insert("reason".into(), Value::from(reason));
        Self {
            reason,
            message: message.into(),
            details: Value::Object(fields),
        }
    }

    #[must_use]
    pub fn reason(&self) -> &'static str {
        self.reason
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn details(&self) -> &Value {
        &self.details
    }

    #[must_use]
    pub fn into_outcome(self) -> ExecutionOutcome {
        ExecutionOutcome::user_error(self.message, self.details)
    }
}
