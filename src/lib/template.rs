//! Typed config-template binding.
//!
//! The SpyKING CIRCUS config file is produced by substituting nine values
//! into a fixed textual template. Instead of blind positional formatting,
//! the template is parsed into an ordered list of named placeholders and the
//! bindings are validated for count *and* order before any substitution, so
//! an edited template that drifts out of step with the code fails loudly at
//! render time instead of producing a silently misaligned config.

use std::fmt;

use crate::errors::{Result, SpyrunError};

/// The built-in SpyKING CIRCUS config template shipped with this crate.
pub const DEFAULT_TEMPLATE: &str = include_str!("spyking_circus.params.in");

/// A typed value bound to one named placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingValue {
    /// An integer value
    Int(i64),
    /// A floating-point value
    Float(f64),
    /// A boolean, rendered as `True` / `False` (the tool's config convention)
    Bool(bool),
    /// Literal text, e.g. a file path or a derived token
    Text(String),
}

impl fmt::Display for BindingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingValue::Int(v) => write!(f, "{v}"),
            BindingValue::Float(v) => write!(f, "{v}"),
            BindingValue::Bool(true) => write!(f, "True"),
            BindingValue::Bool(false) => write!(f, "False"),
            BindingValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// A named placeholder paired with the value to substitute for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Placeholder name as it appears in the template
    pub name: &'static str,
    /// The value to substitute
    pub value: BindingValue,
}

impl Binding {
    /// Binds an integer value.
    #[must_use]
    pub fn int(name: &'static str, value: i64) -> Self {
        Self { name, value: BindingValue::Int(value) }
    }

    /// Binds a floating-point value.
    #[must_use]
    pub fn float(name: &'static str, value: f64) -> Self {
        Self { name, value: BindingValue::Float(value) }
    }

    /// Binds a boolean value.
    #[must_use]
    pub fn bool(name: &'static str, value: bool) -> Self {
        Self { name, value: BindingValue::Bool(value) }
    }

    /// Binds literal text.
    #[must_use]
    pub fn text(name: &'static str, value: impl Into<String>) -> Self {
        Self { name, value: BindingValue::Text(value.into()) }
    }
}

/// A parsed config template: the raw text plus its placeholders in order
/// of appearance.
#[derive(Debug, Clone)]
pub struct ConfigTemplate {
    text: String,
    placeholders: Vec<String>,
}

impl ConfigTemplate {
    /// Parses template text, recording every `{name}` placeholder in order.
    ///
    /// # Errors
    ///
    /// Returns [`SpyrunError::Template`] for an unterminated `{` or a
    /// placeholder name that is not `[A-Za-z0-9_]+`.
    pub fn parse(text: &str) -> Result<Self> {
        let mut placeholders = Vec::new();
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| SpyrunError::Template {
                reason: "unterminated '{' in template".to_string(),
            })?;
            let name = &after[..close];
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(SpyrunError::Template {
                    reason: format!("invalid placeholder name '{{{name}}}'"),
                });
            }
            placeholders.push(name.to_string());
            rest = &after[close + 1..];
        }
        Ok(Self { text: text.to_string(), placeholders })
    }

    /// Placeholder names in order of appearance.
    #[must_use]
    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Substitutes the bindings into the template.
    ///
    /// # Errors
    ///
    /// Returns [`SpyrunError::Template`] if the binding count differs from
    /// the template's placeholder count, or if any binding name disagrees
    /// with the placeholder at the same position.
    pub fn render(&self, bindings: &[Binding]) -> Result<String> {
        if bindings.len() != self.placeholders.len() {
            return Err(SpyrunError::Template {
                reason: format!(
                    "template has {} placeholders but {} bindings were supplied",
                    self.placeholders.len(),
                    bindings.len()
                ),
            });
        }
        for (position, (placeholder, binding)) in
            self.placeholders.iter().zip(bindings).enumerate()
        {
            if placeholder != binding.name {
                return Err(SpyrunError::Template {
                    reason: format!(
                        "placeholder {position} is '{{{placeholder}}}' but binding {position} \
                         is '{}'",
                        binding.name
                    ),
                });
            }
        }

        let mut out = String::with_capacity(self.text.len());
        let mut rest = self.text.as_str();
        for binding in bindings {
            // parse() guarantees one well-formed placeholder per binding
            let token = format!("{{{}}}", binding.name);
            let Some(at) = rest.find(&token) else {
                return Err(SpyrunError::Template {
                    reason: format!("placeholder '{{{}}}' vanished from template", binding.name),
                });
            };
            out.push_str(&rest[..at]);
            out.push_str(&binding.value.to_string());
            rest = &rest[at + token.len()..];
        }
        out.push_str(rest);
        Ok(out)
    }
}
