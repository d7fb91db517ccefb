use serde::Serialize;
use thiserror::Error;

/// Structured error type for the crate. Configuration and I/O failures live here;
/// user-input problems on a script line are [`Diagnostic`]s and never become errors.
#[derive(Debug, Clone, Error, Serialize)]
#[serde(tag = "code", content = "detail")]
pub enum SketchError {
    #[error("invalid command '{name}': {message}")]
    InvalidCommand { name: String, message: String },
    #[error("command name or alias '{name}' is registered twice")]
    DuplicateCommand { name: String },
    #[error("invalid '{param}' param of command '{command}': {message}")]
    InvalidParamSpec {
        command: String,
        param: String,
        message: String,
    },
    #[error("failed to download '{url}': {message}")]
    ReferenceDownloadFailed { url: String, message: String },
    #[error("HTTP client error: {message}")]
    HttpClient { message: String },
    #[error("no async runtime available for reference downloads")]
    NoRuntime,
    #[error("I/O error: {message}")]
    Io { message: String },
    #[error("settings error: {message}")]
    Settings { message: String },
}

impl From<std::io::Error> for SketchError {
    fn from(e: std::io::Error) -> Self {
        SketchError::Io {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for SketchError {
    fn from(e: serde_json::Error) -> Self {
        SketchError::Settings {
            message: e.to_string(),
        }
    }
}

/// A problem with one script line. The `Display` output is the hint shown next to
/// the line, so the wording here is part of the hint contract.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    #[error("argument missing: {name}")]
    MissingArgument { name: String },
    #[error("{name}: '{token}' is not a number")]
    NotANumber { name: String, token: String },
    #[error("{name}: '{token}' is not in {}", .options.join(","))]
    NotInOptions {
        name: String,
        token: String,
        options: Vec<String>,
    },
    #[error("{name}: '{token}' is not a boolean (true/false, 1/0)")]
    NotABoolean { name: String, token: String },
    #[error("{count} too many arguments")]
    SurplusArguments { count: usize },
    #[error("unknown command '{name}'")]
    UnknownCommand { name: String },
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_render_as_hints() {
        let missing = Diagnostic::MissingArgument { name: "x".into() };
        assert_eq!(missing.to_string(), "argument missing: x");

        let options = Diagnostic::NotInOptions {
            name: "mode".into(),
            token: "wave".into(),
            options: vec!["pulse".into(), "sparkle".into()],
        };
        assert_eq!(options.to_string(), "mode: 'wave' is not in pulse,sparkle");

        let surplus = Diagnostic::SurplusArguments { count: 2 };
        assert_eq!(surplus.to_string(), "2 too many arguments");
    }

    #[test]
    fn errors_serialize_with_code() {
        let err = SketchError::DuplicateCommand { name: "l".into() };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "DuplicateCommand");
        assert_eq!(json["detail"]["name"], "l");
    }
}
