use serde_json::{json, Map, Value};

use super::params::{ParamKind, ParamSpec};
use super::{Command, Registry};

/// JSON Schema fragment for one positional param.
fn param_schema(param: &ParamSpec) -> Value {
    let mut schema = match &param.kind {
        ParamKind::String => json!({ "type": "string" }),
        ParamKind::Number => json!({ "type": "number" }),
        ParamKind::Boolean => json!({ "type": "boolean" }),
        ParamKind::Enum { options } => json!({ "type": "string", "enum": options }),
    };
    if let (Some(default), Some(obj)) = (&param.default, schema.as_object_mut()) {
        obj.insert("default".to_string(), json!(default));
    }
    schema
}

/// Object schema of a command's params, in positional order.
pub fn input_schema(command: &Command) -> Value {
    let properties: Map<String, Value> = command
        .required
        .iter()
        .chain(&command.optional)
        .map(|p| (p.name.clone(), param_schema(p)))
        .collect();
    let required: Vec<&str> = command.required.iter().map(|p| p.name.as_str()).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Export the registry for editors and other tooling.
pub fn to_json(registry: &Registry) -> Value {
    Value::Array(
        registry
            .commands()
            .iter()
            .map(|c| {
                json!({
                    "name": c.name,
                    "aliases": c.aliases,
                    "description": c.description,
                    "usage": c.usage(),
                    "inputSchema": input_schema(c),
                })
            })
            .collect(),
    )
}

/// Help text in two tiers: no topic lists every command, a name or alias
/// describes that command's params.
pub fn help_text(registry: &Registry, topic: Option<&str>) -> String {
    match topic {
        None => {
            let mut lines = vec!["Commands:".to_string()];
            for command in registry.commands() {
                let aliases = if command.aliases.is_empty() {
                    String::new()
                } else {
                    format!(" ({})", command.aliases.join(", "))
                };
                lines.push(format!("  {}{aliases}: {}", command.name, command.description));
            }
            lines.push(String::new());
            lines.push("Lines starting with // are comments.".to_string());
            lines.push("Use `help <command>` for parameter details.".to_string());
            lines.join("\n")
        }
        Some(topic) => {
            let Some(command) = registry.lookup(topic) else {
                return format!("Unknown topic: \"{topic}\". Run help without a topic to list commands.");
            };
            let mut lines = vec![
                format!("{}: {}", command.name, command.description),
                format!("Usage: {}", command.usage()),
            ];
            if !command.aliases.is_empty() {
                lines.push(format!("Aliases: {}", command.aliases.join(", ")));
            }
            lines.push(String::new());
            lines.push("Parameters:".to_string());
            for param in &command.required {
                lines.push(format!("  {} ({}, required)", param.name, param.kind.label()));
            }
            for param in &command.optional {
                let default = param
                    .default
                    .as_ref()
                    .map(|d| format!(", default {d}"))
                    .unwrap_or_default();
                lines.push(format!("  {} ({}, optional{default})", param.name, param.kind.label()));
            }
            lines.join("\n")
        }
    }
}
