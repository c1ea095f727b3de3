//! The `Tag` type
//!
//! A tag is a path of components, e.g. `topic/ml/research`. The `key:value`
//! form is an alternative spelling of the same hierarchy, so `lang:python`
//! and `lang/python` parse to the same `Tag`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::InvalidTagError;

/// Delimiter between hierarchy levels in the canonical form
pub const HIERARCHY_DELIMITER: char = '/';

/// Accepted on input as an alias for `HIERARCHY_DELIMITER`
pub const KEY_VALUE_DELIMITER: char = ':';

/// Characters reserved for tag patterns
const FORBIDDEN_CHARS: [char; 4] = ['*', '?', '[', ']'];

/// A validated, canonical hierarchical tag
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag {
    components: Vec<String>,
}

impl Tag {
    /// Parse and canonicalize a tag.
    ///
    /// Whitespace around the tag and around each component is trimmed.
    ///
    /// # Errors
    /// Returns `InvalidTagError` for empty input, empty components, or
    /// characters reserved for patterns.
    ///
    /// # Examples
    /// ```
    /// use repotag::tags::Tag;
    ///
    /// let tag = Tag::parse(" lang:python ").unwrap();
    /// assert_eq!(tag.to_string(), "lang/python");
    /// ```
    pub fn parse(input: &str) -> Result<Self, InvalidTagError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(InvalidTagError::Empty);
        }

        let mut components = Vec::new();
        for raw in trimmed.split([HIERARCHY_DELIMITER, KEY_VALUE_DELIMITER]) {
            let component = raw.trim();
            if component.is_empty() {
                return Err(InvalidTagError::EmptyComponent { tag: trimmed.to_string() });
            }
            if let Some(ch) = component
                .chars()
                .find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control())
            {
                return Err(InvalidTagError::ForbiddenChar { tag: trimmed.to_string(), ch });
            }
            components.push(component.to_string());
        }

        Ok(Self { components })
    }

    /// Build a two-level tag from a namespace and a free-form metadata value.
    ///
    /// Used for implicit tags: delimiters and pattern characters inside
    /// `value` are replaced with `-`. Returns `None` when nothing usable is left.
    pub(crate) fn derived(namespace: &str, value: &str) -> Option<Self> {
        let cleaned: String = value
            .trim()
            .chars()
            .map(|c| {
                if c == HIERARCHY_DELIMITER
                    || c == KEY_VALUE_DELIMITER
                    || FORBIDDEN_CHARS.contains(&c)
                    || c.is_control()
                {
                    '-'
                } else {
                    c
                }
            })
            .collect();
        let cleaned = cleaned.trim_matches('-').trim();
        if cleaned.is_empty() {
            return None;
        }
        Some(Self {
            components: vec![namespace.to_string(), cleaned.to_string()],
        })
    }

    /// Single-component tag for a well-known flag such as `github`
    pub(crate) fn flag(name: &str) -> Self {
        Self { components: vec![name.to_string()] }
    }

    /// Tag from fixed, known-valid components such as `["has", "docs"]`
    pub(crate) fn flag_path(components: &[&str]) -> Self {
        Self {
            components: components.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Components from root to leaf
    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// First component (`lang` for `lang/python`)
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.components[0]
    }

    /// Number of hierarchy levels
    #[must_use]
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Whether `self` lies strictly below `ancestor` in the hierarchy
    #[must_use]
    pub fn is_descendant_of(&self, ancestor: &Self) -> bool {
        self.components.len() > ancestor.components.len()
            && self.components.starts_with(&ancestor.components)
    }

    /// Parent tag, `None` for a root tag
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.components.len() < 2 {
            return None;
        }
        Some(Self {
            components: self.components[..self.components.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, component) in self.components.iter().enumerate() {
            if i > 0 {
                write!(f, "{HIERARCHY_DELIMITER}")?;
            }
            f.write_str(component)?;
        }
        Ok(())
    }
}

impl FromStr for Tag {
    type Err = InvalidTagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Tag {
    type Error = InvalidTagError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<String> for Tag {
    type Error = InvalidTagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let tag = Tag::parse("deprecated").unwrap();
        assert_eq!(tag.components(), ["deprecated"]);
        assert_eq!(tag.depth(), 1);
    }

    #[test]
    fn test_key_value_is_hierarchy() {
        assert_eq!(Tag::parse("lang:python").unwrap(), Tag::parse("lang/python").unwrap());
        assert_eq!(
            Tag::parse("topic:ml/research").unwrap().to_string(),
            "topic/ml/research"
        );
    }

    #[test]
    fn test_trims_whitespace() {
        let tag = Tag::parse("  alex / beta ").unwrap();
        assert_eq!(tag.to_string(), "alex/beta");
    }

    #[test]
    fn test_inner_spaces_kept() {
        let tag = Tag::parse("topic/machine learning").unwrap();
        assert_eq!(tag.components()[1], "machine learning");
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(Tag::parse("   "), Err(InvalidTagError::Empty));
    }

    #[test]
    fn test_rejects_empty_components() {
        for bad in ["/lang", "lang/", "lang//rust", "lang:", ":rust", "a/ /b"] {
            assert!(
                matches!(Tag::parse(bad), Err(InvalidTagError::EmptyComponent { .. })),
                "expected EmptyComponent for {bad:?}"
            );
        }
    }

    #[test]
    fn test_rejects_wildcards() {
        assert!(matches!(
            Tag::parse("lang/*"),
            Err(InvalidTagError::ForbiddenChar { ch: '*', .. })
        ));
        assert!(matches!(
            Tag::parse("a[b]"),
            Err(InvalidTagError::ForbiddenChar { ch: '[', .. })
        ));
    }

    #[test]
    fn test_descendant_and_parent() {
        let alex = Tag::parse("alex").unwrap();
        let beta = Tag::parse("alex/beta").unwrap();
        let gamma = Tag::parse("alex/beta/gamma").unwrap();

        assert!(beta.is_descendant_of(&alex));
        assert!(gamma.is_descendant_of(&alex));
        assert!(!alex.is_descendant_of(&alex));
        assert_eq!(gamma.parent(), Some(beta));
        assert_eq!(alex.parent(), None);
    }

    #[test]
    fn test_derived_sanitizes_value() {
        let tag = Tag::derived("lang", "C/C++").unwrap();
        assert_eq!(tag.to_string(), "lang/C-C++");
        assert!(Tag::derived("lang", "  ").is_none());
        assert!(Tag::derived("lang", "//").is_none());
    }

    #[test]
    fn test_serde_as_string() {
        let tag = Tag::parse("lang:rust").unwrap();
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"lang/rust\"");
        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
        assert!(serde_json::from_str::<Tag>("\"a//b\"").is_err());
    }
}
