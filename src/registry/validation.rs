//! Argument checking for script commands.
//!
//! Tokens are matched to parameters by position. Every problem found becomes a
//! [`Diagnostic`]; the joined diagnostics form the line's hint.

use crate::error::Diagnostic;
use crate::util::parse_number;

use super::params::{ArgValue, ArgValues, ParamKind, ParamSpec};

/// Separator between diagnostics of one line.
pub const HINT_SEPARATOR: &str = " | ";

/// Outcome of [`check`]: the joined hint plus whatever values could be coerced.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgCheck {
    /// Empty when every argument was accepted.
    pub hint: String,
    pub diagnostics: Vec<Diagnostic>,
    pub values: ArgValues,
}

impl ArgCheck {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Validate and coerce `tokens` against `required` followed by `optional`.
///
/// A missing required argument stops the scan at its position; a missing optional
/// argument takes its declared default without any type check.
pub fn check<S: AsRef<str>>(tokens: &[S], required: &[ParamSpec], optional: &[ParamSpec]) -> ArgCheck {
    let mut values = ArgValues::new();
    let mut diagnostics = Vec::new();

    let params = required
        .iter()
        .map(|p| (p, true))
        .chain(optional.iter().map(|p| (p, false)));

    for (index, (param, is_required)) in params.enumerate() {
        let Some(token) = tokens.get(index).map(AsRef::as_ref) else {
            if is_required {
                diagnostics.push(Diagnostic::MissingArgument {
                    name: param.name.clone(),
                });
                break;
            }
            if let Some(default) = &param.default {
                values.insert(param.name.clone(), default.clone());
            }
            continue;
        };

        match coerce(param, token) {
            Ok(value) => values.insert(param.name.clone(), value),
            Err(diagnostic) => diagnostics.push(diagnostic),
        }
    }

    let param_count = required.len() + optional.len();
    if tokens.len() > param_count {
        diagnostics.push(Diagnostic::SurplusArguments {
            count: tokens.len() - param_count,
        });
    }

    let hint = diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(HINT_SEPARATOR);

    ArgCheck {
        hint,
        diagnostics,
        values,
    }
}

fn coerce(param: &ParamSpec, token: &str) -> Result<ArgValue, Diagnostic> {
    match &param.kind {
        ParamKind::String => Ok(ArgValue::Text(token.to_string())),
        ParamKind::Number => parse_number(token).map(ArgValue::Number).ok_or_else(|| {
            Diagnostic::NotANumber {
                name: param.name.clone(),
                token: token.to_string(),
            }
        }),
        ParamKind::Enum { options } => {
            if options.iter().any(|o| o == token) {
                Ok(ArgValue::Text(token.to_string()))
            } else {
                Err(Diagnostic::NotInOptions {
                    name: param.name.clone(),
                    token: token.to_string(),
                    options: options.clone(),
                })
            }
        }
        ParamKind::Boolean => match token {
            "true" | "1" => Ok(ArgValue::Bool(true)),
            "false" | "0" => Ok(ArgValue::Bool(false)),
            _ => Err(Diagnostic::NotABoolean {
                name: param.name.clone(),
                token: token.to_string(),
            }),
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn xy() -> Vec<ParamSpec> {
        vec![ParamSpec::number("x"), ParamSpec::number("y")]
    }

    #[test]
    fn exact_arity_has_no_hint() {
        let result = check(&["10", "20"], &xy(), &[]);
        assert!(result.is_ok());
        assert_eq!(result.hint, "");
        assert_eq!(result.values.number("x"), Some(10.0));
        assert_eq!(result.values.number("y"), Some(20.0));
    }

    #[test]
    fn missing_required_stops_scan() {
        let params = vec![
            ParamSpec::number("x"),
            ParamSpec::number("y"),
            ParamSpec::number("radius"),
        ];
        let result = check(&["1"], &params, &[]);
        assert_eq!(result.hint, "argument missing: y");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(!result.values.contains("radius"));
    }

    #[test]
    fn bad_number_leaves_value_unset() {
        let result = check(&["10", "abc"], &xy(), &[]);
        assert_eq!(result.hint, "y: 'abc' is not a number");
        assert_eq!(result.values.number("x"), Some(10.0));
        assert!(!result.values.contains("y"));
    }

    #[test]
    fn surplus_is_appended_after_other_problems() {
        let result = check(&["a", "2", "3", "4"], &xy(), &[]);
        assert_eq!(result.hint, "x: 'a' is not a number | 2 too many arguments");
    }

    #[test]
    fn optional_defaults_are_unchecked() {
        let optional = vec![
            ParamSpec::one_of("mode", ["pulse", "wave"]).with_default(ArgValue::Text("bogus".into())),
            ParamSpec::number("x").with_default(ArgValue::Number(0.0)),
            ParamSpec::boolean("flip"),
        ];
        let result = check::<&str>(&[], &[], &optional);
        assert!(result.is_ok());
        assert_eq!(result.values.text("mode"), Some("bogus"));
        assert_eq!(result.values.number("x"), Some(0.0));
        assert!(!result.values.contains("flip"));
    }

    #[test]
    fn enum_membership() {
        let required = vec![ParamSpec::one_of("mode", ["pulse", "wave"])];
        assert_eq!(check(&["wave"], &required, &[]).values.text("mode"), Some("wave"));
        assert_eq!(
            check(&["spin"], &required, &[]).hint,
            "mode: 'spin' is not in pulse,wave"
        );
    }

    #[test]
    fn boolean_literals() {
        let required = vec![ParamSpec::boolean("flip")];
        for (token, expected) in [("true", true), ("1", true), ("false", false), ("0", false)] {
            assert_eq!(check(&[token], &required, &[]).values.boolean("flip"), Some(expected));
        }
        assert_eq!(
            check(&["yes"], &required, &[]).hint,
            "flip: 'yes' is not a boolean (true/false, 1/0)"
        );
        assert!(!check(&["True"], &required, &[]).is_ok());
    }

    #[test]
    fn strings_pass_through() {
        let required = vec![ParamSpec::string("url")];
        let result = check(&["https://example.com/a.png"], &required, &[]);
        assert_eq!(result.values.text("url"), Some("https://example.com/a.png"));
    }

    #[test]
    fn problems_are_joined() {
        let result = check(&["a", "b"], &xy(), &[]);
        assert_eq!(
            result.hint,
            "x: 'a' is not a number | y: 'b' is not a number"
        );
    }
}
