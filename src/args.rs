//! Declarative argument grammar
//!
//! A command declares one or more [`ArgumentShape`]s; each shape is an
//! ordered list of positional parts plus a set of switches. The dispatcher
//! tries the shapes in declaration order and the first one that matches the
//! supplied tokens wins.

use thiserror::Error;

use crate::lexer::ArgToken;

/// One positional token slot in a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentPart {
    /// Whether the slot must be filled for the shape to match.
    pub required: bool,
    /// Documentation-only name, shown in usage strings.
    pub name: String,
    /// When non-empty, the supplied token must equal one of these literals
    /// (case-sensitive). Used for sub-verb dispatch such as `alias add|rem`.
    pub exact_wording: Vec<String>,
}

impl ArgumentPart {
    pub fn required(name: &str) -> Self {
        ArgumentPart {
            required: true,
            name: name.to_string(),
            exact_wording: Vec::new(),
        }
    }

    pub fn optional(name: &str) -> Self {
        ArgumentPart {
            required: false,
            name: name.to_string(),
            exact_wording: Vec::new(),
        }
    }

    /// A required part that must match one of the given literals.
    pub fn exact(name: &str, wording: &[&str]) -> Self {
        ArgumentPart {
            required: true,
            name: name.to_string(),
            exact_wording: wording.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// A switch a shape accepts.
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchInfo {
    /// Switch name, without the prefix character.
    pub name: String,
    /// Whether the switch takes a value (`-name=value` or a following token).
    pub takes_value: bool,
    /// Whether the switch must be supplied for the shape to match.
    pub required: bool,
}

impl SwitchInfo {
    pub fn flag(name: &str) -> Self {
        SwitchInfo {
            name: name.to_string(),
            takes_value: false,
            required: false,
        }
    }

    pub fn valued(name: &str) -> Self {
        SwitchInfo {
            name: name.to_string(),
            takes_value: true,
            required: false,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ShapeError {
    #[error("required part {0:?} follows an optional part")]
    RequiredAfterOptional(String),
    #[error("minimum argument count {min} exceeds declared parts {parts}")]
    MinimumTooLarge { min: usize, parts: usize },
}

/// Why a shape did not match the supplied tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchFailure {
    TooFewArguments { needed: usize, got: usize },
    WordMismatch { part: String, got: String },
    UnknownSwitch(String),
    SwitchNeedsValue(String),
    MissingSwitch(String),
}

impl std::fmt::Display for MatchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchFailure::TooFewArguments { needed, got } => {
                write!(f, "expected at least {} argument(s), got {}", needed, got)
            }
            MatchFailure::WordMismatch { part, got } => {
                write!(f, "{:?} is not a valid {}", got, part)
            }
            MatchFailure::UnknownSwitch(name) => write!(f, "unknown switch -{}", name),
            MatchFailure::SwitchNeedsValue(name) => {
                write!(f, "switch -{} requires a value", name)
            }
            MatchFailure::MissingSwitch(name) => write!(f, "switch -{} is required", name),
        }
    }
}

/// Tokens bound to a shape after a successful match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedArguments {
    pub positionals: Vec<String>,
    pub switches: Vec<(String, Option<String>)>,
}

/// One accepted combination of positional parts and switches.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentShape {
    parts: Vec<ArgumentPart>,
    minimum_arguments: usize,
    switches: Vec<SwitchInfo>,
}

impl ArgumentShape {
    /// An empty shape: no arguments, no switches.
    pub fn none() -> Self {
        ArgumentShape {
            parts: Vec::new(),
            minimum_arguments: 0,
            switches: Vec::new(),
        }
    }

    /// Build a shape, validating that no required part follows an optional
    /// one and that the minimum count is satisfiable.
    pub fn new(
        parts: Vec<ArgumentPart>,
        minimum_arguments: usize,
        switches: Vec<SwitchInfo>,
    ) -> Result<Self, ShapeError> {
        let mut seen_optional = false;
        for part in &parts {
            if !part.required {
                seen_optional = true;
            } else if seen_optional {
                return Err(ShapeError::RequiredAfterOptional(part.name.clone()));
            }
        }
        if minimum_arguments > parts.len() {
            return Err(ShapeError::MinimumTooLarge {
                min: minimum_arguments,
                parts: parts.len(),
            });
        }
        Ok(ArgumentShape {
            parts,
            minimum_arguments,
            switches,
        })
    }

    /// Shape with the given parts; minimum is the number of required parts.
    pub fn of(parts: Vec<ArgumentPart>) -> Result<Self, ShapeError> {
        let min = parts.iter().filter(|p| p.required).count();
        Self::new(parts, min, Vec::new())
    }

    /// Same as [`ArgumentShape::of`] but with switches.
    pub fn with_switches(
        parts: Vec<ArgumentPart>,
        switches: Vec<SwitchInfo>,
    ) -> Result<Self, ShapeError> {
        let min = parts.iter().filter(|p| p.required).count();
        Self::new(parts, min, switches)
    }

    pub fn parts(&self) -> &[ArgumentPart] {
        &self.parts
    }

    pub fn minimum_arguments(&self) -> usize {
        self.minimum_arguments
    }

    pub fn declared_switches(&self) -> &[SwitchInfo] {
        &self.switches
    }

    /// Render this shape as a usage fragment, e.g.
    /// `<add|rem> <alias> [target] [-quiet]`.
    pub fn usage(&self) -> String {
        let mut pieces = Vec::new();
        for part in &self.parts {
            let label = if part.exact_wording.is_empty() {
                part.name.clone()
            } else {
                part.exact_wording.join("|")
            };
            if part.required {
                pieces.push(format!("<{}>", label));
            } else {
                pieces.push(format!("[{}]", label));
            }
        }
        for sw in &self.switches {
            let body = if sw.takes_value {
                format!("-{}=value", sw.name)
            } else {
                format!("-{}", sw.name)
            };
            if sw.required {
                pieces.push(body);
            } else {
                pieces.push(format!("[{}]", body));
            }
        }
        pieces.join(" ")
    }

    /// Try to bind the ordered argument tokens against this shape.
    ///
    /// A positional token immediately following a value-taking switch that
    /// has no inline value becomes that switch's value. Positional tokens
    /// beyond the last declared part are accepted; the minimum count is the
    /// gate.
    pub fn match_tokens(&self, args: &[ArgToken]) -> Result<MatchedArguments, MatchFailure> {
        let mut positionals: Vec<String> = Vec::new();
        let mut supplied: Vec<(String, Option<String>)> = Vec::new();

        let mut i = 0;
        while i < args.len() {
            match &args[i] {
                ArgToken::Switch { name, value } => {
                    let decl = self
                        .switches
                        .iter()
                        .find(|s| s.name == *name)
                        .ok_or_else(|| MatchFailure::UnknownSwitch(name.clone()))?;
                    let mut value = value.clone();
                    if decl.takes_value && value.is_none() {
                        if let Some(ArgToken::Positional(next)) = args.get(i + 1) {
                            value = Some(next.clone());
                            i += 1;
                        }
                    }
                    if decl.takes_value && value.is_none() {
                        return Err(MatchFailure::SwitchNeedsValue(name.clone()));
                    }
                    supplied.push((name.clone(), value));
                }
                ArgToken::Positional(p) => positionals.push(p.clone()),
            }
            i += 1;
        }

        let required = self.parts.iter().filter(|p| p.required).count();
        let needed = self.minimum_arguments.max(required);
        if positionals.len() < needed {
            return Err(MatchFailure::TooFewArguments {
                needed,
                got: positionals.len(),
            });
        }

        for (part, token) in self.parts.iter().zip(positionals.iter()) {
            if !part.exact_wording.is_empty() && !part.exact_wording.iter().any(|w| w == token) {
                return Err(MatchFailure::WordMismatch {
                    part: part.name.clone(),
                    got: token.clone(),
                });
            }
        }

        for decl in &self.switches {
            if decl.required && !supplied.iter().any(|(n, _)| *n == decl.name) {
                return Err(MatchFailure::MissingSwitch(decl.name.clone()));
            }
        }

        Ok(MatchedArguments {
            positionals,
            switches: supplied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(s: &str) -> ArgToken {
        ArgToken::Positional(s.to_string())
    }

    fn sw(name: &str, value: Option<&str>) -> ArgToken {
        ArgToken::Switch {
            name: name.to_string(),
            value: value.map(String::from),
        }
    }

    #[test]
    fn required_after_optional_rejected() {
        let err = ArgumentShape::of(vec![
            ArgumentPart::optional("a"),
            ArgumentPart::required("b"),
        ])
        .unwrap_err();
        assert_eq!(err, ShapeError::RequiredAfterOptional("b".into()));
    }

    #[test]
    fn required_and_optional_counts() {
        let shape = ArgumentShape::of(vec![
            ArgumentPart::required("a"),
            ArgumentPart::required("b"),
            ArgumentPart::optional("c"),
        ])
        .unwrap();

        assert!(shape.match_tokens(&[pos("1")]).is_err());
        assert!(shape.match_tokens(&[pos("1"), pos("2")]).is_ok());
        assert!(shape.match_tokens(&[pos("1"), pos("2"), pos("3")]).is_ok());
    }

    #[test]
    fn extra_positionals_accepted() {
        let shape = ArgumentShape::of(vec![ArgumentPart::required("a")]).unwrap();
        let m = shape
            .match_tokens(&[pos("1"), pos("2"), pos("3")])
            .unwrap();
        assert_eq!(m.positionals, vec!["1", "2", "3"]);
    }

    #[test]
    fn exact_wording_is_case_sensitive() {
        let shape =
            ArgumentShape::of(vec![ArgumentPart::exact("verb", &["add", "remove"])]).unwrap();
        assert!(shape.match_tokens(&[pos("add")]).is_ok());
        assert!(matches!(
            shape.match_tokens(&[pos("Add")]),
            Err(MatchFailure::WordMismatch { .. })
        ));
    }

    #[test]
    fn unknown_switch_rejected() {
        let shape = ArgumentShape::with_switches(vec![], vec![SwitchInfo::flag("b")]).unwrap();
        assert!(matches!(
            shape.match_tokens(&[sw("x", None)]),
            Err(MatchFailure::UnknownSwitch(_))
        ));
    }

    #[test]
    fn valued_switch_consumes_following_token() {
        let shape =
            ArgumentShape::with_switches(vec![], vec![SwitchInfo::valued("port")]).unwrap();
        let m = shape.match_tokens(&[sw("port", None), pos("21")]).unwrap();
        assert_eq!(m.switches, vec![("port".to_string(), Some("21".to_string()))]);
        assert!(m.positionals.is_empty());
    }

    #[test]
    fn valued_switch_without_value_rejected() {
        let shape =
            ArgumentShape::with_switches(vec![], vec![SwitchInfo::valued("port")]).unwrap();
        assert!(matches!(
            shape.match_tokens(&[sw("port", None)]),
            Err(MatchFailure::SwitchNeedsValue(_))
        ));
    }

    #[test]
    fn required_switch_enforced() {
        let shape =
            ArgumentShape::with_switches(vec![], vec![SwitchInfo::flag("force").required()])
                .unwrap();
        assert!(matches!(
            shape.match_tokens(&[]),
            Err(MatchFailure::MissingSwitch(_))
        ));
        assert!(shape.match_tokens(&[sw("force", None)]).is_ok());
    }

    #[test]
    fn usage_rendering() {
        let shape = ArgumentShape::with_switches(
            vec![
                ArgumentPart::exact("verb", &["add", "rem"]),
                ArgumentPart::required("alias"),
                ArgumentPart::optional("target"),
            ],
            vec![SwitchInfo::flag("quiet")],
        )
        .unwrap();
        assert_eq!(shape.usage(), "<add|rem> <alias> [target] [-quiet]");
    }
}
