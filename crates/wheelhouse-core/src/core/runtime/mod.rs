use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::context::CommandInfo;
use crate::outcome::ExecutionOutcome;

pub mod effects;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandGroup {
    Resolve,
    Mirror,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Resolve => "resolve",
            CommandGroup::Mirror => "mirror",
        };
        f.write_str(name)
    }
}

#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome) -> Value {
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": outcome.status.label(),
        "code": outcome.status.exit_code(),
        "message": format_status_message(info, &outcome.message),
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let group_name = info.group.to_string();
    let prefix = if group_name == info.name {
        format!("wheelhouse {}", info.name)
    } else {
        format!("wheelhouse {} {}", group_name, info.name)
    };
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIRROR: CommandInfo = CommandInfo::new(CommandGroup::Mirror, "mirror");

    #[test]
    fn status_messages_carry_the_command_prefix() {
        assert_eq!(format_status_message(MIRROR, ""), "wheelhouse mirror");
        assert_eq!(
            format_status_message(MIRROR, "wrote 3 wheels"),
            "wheelhouse mirror: wrote 3 wheels"
        );
        assert_eq!(
            format_status_message(MIRROR, "wheelhouse mirror: done"),
            "wheelhouse mirror: done"
        );
    }

    #[test]
    fn json_envelope_normalizes_details() {
        let outcome = ExecutionOutcome::user_error("bad target", Value::Null);
        let value = to_json_response(MIRROR, &outcome);
        assert_eq!(value["status"], "user-error");
        assert_eq!(value["code"], 1);
        assert_eq!(value["message"], "wheelhouse mirror: bad target");
        assert!(value["details"].as_object().is_some_and(serde_json::Map::is_empty));

        let outcome = ExecutionOutcome::completed("ok", json!(["a"]), 1);
        let value = to_json_response(MIRROR, &outcome);
        assert_eq!(value["status"], "warning");
        assert_eq!(value["code"], 0);
        assert_eq!(value["details"]["value"], json!(["a"]));
    }
}
