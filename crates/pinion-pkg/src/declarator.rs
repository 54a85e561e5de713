//! Dependency declarator parsing and serialization.
//!
//! A declarator is one entry of a manifest's `dependencies` list:
//!
//! ```text
//! [flag] name [operator version]
//! ```
//!
//! where `flag` is `!` (conflict) or `?` (optional) and `operator` is one of
//! `>=`, `<=`, `==`, `=`, `~>`. Whitespace between tokens is optional. A parsed
//! declarator remembers its source text so an untouched entry is written back
//! exactly as it was read.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that can occur when parsing a declarator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclaratorError {
    /// The entry does not match `[flag] name [operator version]`.
    #[error("unrecognized dependency format: {0:?}")]
    Malformed(String),
}

fn declarator_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^\s*(?:([!?])\s*)?([A-Za-z0-9_-]+)(?:\s*(>=|<=|==|=|~>)\s*([0-9]+(?:\.[0-9]+)*))?\s*$",
        )
        .ok()
    })
    .as_ref()
}

/// Leading marker on a declarator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    /// A plain required dependency.
    #[default]
    None,
    /// `!`: the named package must not be installed alongside.
    Conflict,
    /// `?`: optional dependency.
    Optional,
}

impl Flag {
    /// Returns the flag as written in a manifest (empty for [`Flag::None`]).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Conflict => "!",
            Self::Optional => "?",
        }
    }

    fn from_marker(marker: &str) -> Self {
        match marker {
            "!" => Self::Conflict,
            "?" => Self::Optional,
            _ => Self::None,
        }
    }
}

/// Version comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `>=`
    AtLeast,
    /// `<=`
    AtMost,
    /// `==`
    Exact,
    /// `=`
    Equal,
    /// `~>`
    Pessimistic,
}

impl Operator {
    /// Returns the operator as written in a manifest.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AtLeast => ">=",
            Self::AtMost => "<=",
            Self::Exact => "==",
            Self::Equal => "=",
            Self::Pessimistic => "~>",
        }
    }

    /// Whether `--upgrade` may move a constraint using this operator.
    #[must_use]
    pub fn is_upgradable(&self) -> bool {
        matches!(self, Self::AtLeast | Self::Exact | Self::Equal)
    }

    fn from_token(token: &str) -> Option<Self> {
        match token {
            ">=" => Some(Self::AtLeast),
            "<=" => Some(Self::AtMost),
            "==" => Some(Self::Exact),
            "=" => Some(Self::Equal),
            "~>" => Some(Self::Pessimistic),
            _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operator together with the version it compares against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    /// The comparison operator.
    pub op: Operator,
    /// The version text exactly as written.
    pub version: String,
}

impl Constraint {
    /// Create a constraint.
    #[must_use]
    pub fn new(op: Operator, version: impl Into<String>) -> Self {
        Self {
            op,
            version: version.into(),
        }
    }

    /// Number of dot-separated components in the version.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.version.split('.').count()
    }
}

/// A single dependency entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declarator {
    flag: Flag,
    name: String,
    constraint: Option<Constraint>,
    /// Source text, kept until the declarator is rebuilt.
    source: Option<String>,
}

impl Declarator {
    /// Create a declarator without source text; it serializes canonically.
    #[must_use]
    pub fn new(flag: Flag, name: impl Into<String>, constraint: Option<Constraint>) -> Self {
        Self {
            flag,
            name: name.into(),
            constraint,
            source: None,
        }
    }

    /// Parse a dependency entry.
    ///
    /// # Errors
    ///
    /// Returns [`DeclaratorError::Malformed`] if the entry does not match the
    /// declarator grammar.
    pub fn parse(raw: &str) -> Result<Self, DeclaratorError> {
        let malformed = || DeclaratorError::Malformed(raw.to_string());
        let caps = declarator_regex()
            .and_then(|re| re.captures(raw))
            .ok_or_else(malformed)?;

        let flag = caps
            .get(1)
            .map_or(Flag::None, |m| Flag::from_marker(m.as_str()));
        let name = caps.get(2).ok_or_else(malformed)?.as_str().to_string();

        let constraint = match (caps.get(3), caps.get(4)) {
            (Some(op), Some(version)) => {
                let op = Operator::from_token(op.as_str()).ok_or_else(malformed)?;
                Some(Constraint::new(op, version.as_str()))
            }
            _ => None,
        };

        Ok(Self {
            flag,
            name,
            constraint,
            source: Some(raw.to_string()),
        })
    }

    /// The leading flag.
    #[must_use]
    pub fn flag(&self) -> Flag {
        self.flag
    }

    /// The dependency name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The constraint, if any.
    #[must_use]
    pub fn constraint(&self) -> Option<&Constraint> {
        self.constraint.as_ref()
    }

    /// Rebuild this declarator with a new constraint, keeping flag and name.
    #[must_use]
    pub fn with_constraint(&self, constraint: Constraint) -> Self {
        Self::new(self.flag, self.name.clone(), Some(constraint))
    }

    /// Serialize back to manifest text.
    ///
    /// A parsed, unmodified declarator yields its source text; otherwise the
    /// canonical `flag name op version` form with single spaces.
    #[must_use]
    pub fn serialize(&self) -> String {
        if let Some(ref source) = self.source {
            return source.clone();
        }
        self.canonical()
    }

    /// The canonical spelling, regardless of source text.
    #[must_use]
    pub fn canonical(&self) -> String {
        let mut out = String::new();
        if self.flag != Flag::None {
            out.push_str(self.flag.as_str());
            out.push(' ');
        }
        out.push_str(&self.name);
        if let Some(ref c) = self.constraint {
            out.push(' ');
            out.push_str(c.op.as_str());
            out.push(' ');
            out.push_str(&c.version);
        }
        out
    }
}

impl fmt::Display for Declarator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}
