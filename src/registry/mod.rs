//! Command registry: names and aliases mapped to handlers with one contract.

pub mod catalog;
pub mod handlers;
pub mod params;
pub mod validation;

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::engine::surface::DrawingSurface;
use crate::engine::viewport::Viewport;
use crate::engine::Cursor;
use crate::error::SketchError;
use crate::reference::{ArrivalNotifier, ReferenceCache};

use params::{ArgValue, ArgValues, ParamKind, ParamSpec};

// ── Handler contract ────────────────────────────────────────────

/// Everything a handler may touch while processing one line.
pub struct LineContext<'a> {
    pub cursor: &'a mut Cursor,
    pub surface: &'a mut dyn DrawingSurface,
    pub viewport: Viewport,
    pub references: &'a ReferenceCache,
    pub notifier: &'a ArrivalNotifier,
}

/// `Ok` carries the line's hint; `Err` carries an error hint that halts the pass.
pub type Handler = fn(&ArgValues, &mut LineContext<'_>) -> Result<String, String>;

// ── Commands ────────────────────────────────────────────────────

#[derive(Clone, Serialize)]
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: String,
    pub required: Vec<ParamSpec>,
    pub optional: Vec<ParamSpec>,
    #[serde(skip)]
    pub handler: Handler,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .finish_non_exhaustive()
    }
}

impl Command {
    pub fn new(name: impl Into<String>, description: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: description.into(),
            required: Vec::new(),
            optional: Vec::new(),
            handler,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn required(mut self, param: ParamSpec) -> Self {
        self.required.push(param);
        self
    }

    pub fn optional(mut self, param: ParamSpec) -> Self {
        self.optional.push(param);
        self
    }

    /// Check `tokens` against the schema, then run the handler on the coerced values.
    pub fn invoke<S: AsRef<str>>(&self, tokens: &[S], ctx: &mut LineContext<'_>) -> Result<String, String> {
        let checked = validation::check(tokens, &self.required, &self.optional);
        if !checked.is_ok() {
            return Err(checked.hint);
        }
        (self.handler)(&checked.values, ctx)
    }

    /// One-line usage, e.g. `arc <x> <y> <radius> [flip=false]`.
    pub fn usage(&self) -> String {
        let mut parts = vec![self.name.clone()];
        parts.extend(self.required.iter().map(|p| format!("<{}>", p.name)));
        parts.extend(self.optional.iter().map(|p| match &p.default {
            Some(default) => format!("[{}={}]", p.name, default),
            None => format!("[{}]", p.name),
        }));
        parts.join(" ")
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    fn validate(&self) -> Result<(), SketchError> {
        for name in self.names() {
            if name.is_empty() || name.chars().any(char::is_whitespace) {
                return Err(SketchError::InvalidCommand {
                    name: self.name.clone(),
                    message: format!("'{name}' is not a usable command name"),
                });
            }
        }

        let invalid = |param: &ParamSpec, message: &str| SketchError::InvalidParamSpec {
            command: self.name.clone(),
            param: param.name.clone(),
            message: message.to_string(),
        };

        let mut seen = HashSet::new();
        for param in &self.required {
            if param.default.is_some() {
                return Err(invalid(param, "required params cannot declare a default"));
            }
        }
        for param in self.required.iter().chain(&self.optional) {
            if param.name.trim().is_empty() {
                return Err(invalid(param, "param name is empty"));
            }
            if !seen.insert(param.name.as_str()) {
                return Err(invalid(param, "param name is used twice"));
            }
            if let ParamKind::Enum { options } = &param.kind {
                if options.is_empty() {
                    return Err(invalid(param, "enum params need at least one option"));
                }
            }
        }
        Ok(())
    }
}

// ── Registry ────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RegistryBuilder {
    commands: Vec<Command>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    /// Validate every command and index names and aliases.
    pub fn build(self) -> Result<Registry, SketchError> {
        let mut index = HashMap::new();
        for (position, command) in self.commands.iter().enumerate() {
            command.validate()?;
            for name in command.names() {
                if index.insert(name.to_string(), position).is_some() {
                    return Err(SketchError::DuplicateCommand {
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(Registry {
            commands: self.commands,
            index,
        })
    }
}

/// Immutable once built. Lookup is case-sensitive.
#[derive(Debug)]
pub struct Registry {
    commands: Vec<Command>,
    index: HashMap<String, usize>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.index.get(name).and_then(|&i| self.commands.get(i))
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// The registry with every built-in drawing command.
pub fn builtin() -> Result<Registry, SketchError> {
    use handlers::{path, reference};

    Registry::builder()
        .command(
            Command::new("horizontal-line", "Move the cursor horizontally, drawing a line", path::horizontal_line)
                .alias("h")
                .alias("x")
                .required(ParamSpec::number("x")),
        )
        .command(
            Command::new("vertical-line", "Move the cursor vertically, drawing a line", path::vertical_line)
                .alias("v")
                .alias("y")
                .required(ParamSpec::number("y")),
        )
        .command(
            Command::new("line", "Move the cursor by (x, y), drawing a line", path::line)
                .alias("l")
                .required(ParamSpec::number("x"))
                .required(ParamSpec::number("y")),
        )
        .command(
            Command::new("arc", "Move the cursor by (x, y) along a curve bulging by radius", path::arc)
                .alias("a")
                .required(ParamSpec::number("x"))
                .required(ParamSpec::number("y"))
                .required(ParamSpec::number("radius"))
                .optional(ParamSpec::boolean("flip").with_default(ArgValue::Bool(false))),
        )
        .command(
            Command::new("reference", "Draw a reference image at (x, y), downloading it first if needed", reference::reference)
                .alias("ref")
                .required(ParamSpec::string("url"))
                .optional(ParamSpec::number("x").with_default(ArgValue::Number(0.0)))
                .optional(ParamSpec::number("y").with_default(ArgValue::Number(0.0))),
        )
        .build()
}
