// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Declarative event patterns and the pure matcher that evaluates them.
//!
//! A pattern is a tree mirroring the envelope. Mappings are AND-composed
//! (every named field must match) and leaves are OR-composed lists of
//! matchers (any one may match):
//!
//! ```yaml
//! source: [storage]
//! detail_type: [ObjectCreated]
//! detail:
//!   bucket: { name: [docs] }
//!   object:
//!     key: [{ prefix: "jdtest/" }]
//! metadata:
//!   feature_types: [{ exists: true }]
//! ```
//!
//! Matching is case-sensitive and strict on types: a string matcher never
//! matches a number, and a missing path fails everything except
//! `exists: false`. Evaluation borrows the envelope and holds no state, so
//! one pattern can be shared across any number of publishers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::events::{DetailType, EventEnvelope};

const ROOT_KEYS: [&str; 5] = ["source", "detail_type", "detail", "metadata", "data"];
const STRING_ROOTS: [&str; 2] = ["source", "detail_type"];

/// Pattern over a whole envelope, keyed by top-level field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventPattern {
    root: BTreeMap<String, PatternNode>,
}

/// One level of a pattern tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PatternNode {
    /// Leaf: the field must satisfy at least one matcher
    Matchers(Vec<Matcher>),
    /// Nested object: every named child must match
    Fields(BTreeMap<String, PatternNode>),
}

/// A single leaf constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Matcher {
    Operator(Operator),
    /// Exact scalar value
    Literal(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    /// `true`: present and non-null. `false`: absent or null.
    Exists(bool),
    Prefix(String),
    Suffix(String),
    /// Glob where `*` stands for any run of characters
    Wildcard(String),
}

impl Matcher {
    pub fn exact(value: impl Into<Value>) -> Self {
        Matcher::Literal(value.into())
    }

    pub fn exists() -> Self {
        Matcher::Operator(Operator::Exists(true))
    }

    pub fn absent() -> Self {
        Matcher::Operator(Operator::Exists(false))
    }

    pub fn prefix(prefix: impl Into<String>) -> Self {
        Matcher::Operator(Operator::Prefix(prefix.into()))
    }

    pub fn suffix(suffix: impl Into<String>) -> Self {
        Matcher::Operator(Operator::Suffix(suffix.into()))
    }

    pub fn wildcard(glob: impl Into<String>) -> Self {
        Matcher::Operator(Operator::Wildcard(glob.into()))
    }

    fn matches(&self, field: Field<'_>) -> bool {
        match self {
            Matcher::Operator(Operator::Exists(expected)) => field.is_present() == *expected,
            Matcher::Operator(Operator::Prefix(prefix)) => {
                field.any_str(|s| s.starts_with(prefix.as_str()))
            }
            Matcher::Operator(Operator::Suffix(suffix)) => {
                field.any_str(|s| s.ends_with(suffix.as_str()))
            }
            Matcher::Operator(Operator::Wildcard(glob)) => {
                field.any_str(|s| wildcard_match(glob, s))
            }
            Matcher::Literal(literal) => match field {
                Field::Str(s) => literal.as_str() == Some(s),
                Field::Value(Value::Array(items)) => items.iter().any(|item| item == literal),
                Field::Value(value) => value == literal,
                Field::Object(_) | Field::Missing => false,
            },
        }
    }

    /// Literal kinds compare as `DetailType`s so aliases such as
    /// `"Object Created"` match their canonical form.
    fn matches_detail_type(&self, kind: &DetailType) -> bool {
        match self {
            Matcher::Literal(Value::String(s)) => DetailType::from(s.as_str()) == *kind,
            _ => self.matches(Field::Str(kind.as_str())),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            Matcher::Literal(Value::Array(_)) | Matcher::Literal(Value::Object(_)) => Err(format!(
                "literal matchers must be scalars, found {}",
                self.describe()
            )),
            Matcher::Operator(Operator::Wildcard(glob)) if !glob.contains('*') => Err(format!(
                "wildcard '{glob}' has no '*'; use an exact value instead"
            )),
            _ => Ok(()),
        }
    }

    fn describe(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Borrowed view of whatever sits at a path in the envelope.
#[derive(Debug, Clone, Copy)]
enum Field<'a> {
    Missing,
    Str(&'a str),
    Value(&'a Value),
    Object(&'a Map<String, Value>),
}

impl<'a> Field<'a> {
    fn root(envelope: &'a EventEnvelope, key: &str) -> Self {
        match key {
            "source" => Field::Str(envelope.source()),
            "detail_type" => Field::Str(envelope.detail_type().as_str()),
            "detail" => Field::Value(envelope.detail()),
            "metadata" => Field::Object(envelope.metadata()),
            "data" => Field::Value(envelope.data()),
            _ => Field::Missing,
        }
    }

    fn child(self, key: &str) -> Self {
        let map = match self {
            Field::Object(map) | Field::Value(Value::Object(map)) => map,
            _ => return Field::Missing,
        };
        map.get(key).map(Field::Value).unwrap_or(Field::Missing)
    }

    fn is_present(self) -> bool {
        match self {
            Field::Missing => false,
            Field::Value(value) => !value.is_null(),
            Field::Str(_) | Field::Object(_) => true,
        }
    }

    fn any_str(self, test: impl Fn(&str) -> bool) -> bool {
        match self {
            Field::Str(s) => test(s),
            Field::Value(Value::String(s)) => test(s),
            Field::Value(Value::Array(items)) => {
                items.iter().filter_map(Value::as_str).any(|s| test(s))
            }
            _ => false,
        }
    }
}

impl PatternNode {
    fn matches(&self, field: Field<'_>) -> bool {
        match self {
            PatternNode::Matchers(matchers) => matchers.iter().any(|m| m.matches(field)),
            PatternNode::Fields(children) => children
                .iter()
                .all(|(key, node)| node.matches(field.child(key))),
        }
    }

    fn validate(&self, path: &str) -> Result<(), String> {
        match self {
            PatternNode::Matchers(matchers) if matchers.is_empty() => {
                Err(format!("'{path}' has an empty matcher list"))
            }
            PatternNode::Matchers(matchers) => matchers
                .iter()
                .try_for_each(|m| m.validate().map_err(|reason| format!("'{path}': {reason}"))),
            PatternNode::Fields(children) if children.is_empty() => {
                Err(format!("'{path}' has an empty nested pattern"))
            }
            PatternNode::Fields(children) => children
                .iter()
                .try_for_each(|(key, node)| node.validate(&format!("{path}.{key}"))),
        }
    }
}

impl EventPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matches envelopes whose `source` is one of `sources`.
    pub fn source<I, S>(self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let matchers = sources
            .into_iter()
            .map(|s| Matcher::exact(s.into()))
            .collect();
        self.with("source", matchers)
    }

    /// Matches envelopes whose `detail_type` is one of `kinds`.
    pub fn detail_type<I>(self, kinds: I) -> Self
    where
        I: IntoIterator<Item = DetailType>,
    {
        let matchers = kinds
            .into_iter()
            .map(|k| Matcher::exact(String::from(k)))
            .collect();
        self.with("detail_type", matchers)
    }

    /// Adds a leaf at a dotted path such as `detail.object.key`, replacing
    /// whatever was there.
    pub fn with(mut self, path: &str, matchers: Vec<Matcher>) -> Self {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            return self;
        };

        let mut level = &mut self.root;
        for segment in parents {
            let node = level
                .entry((*segment).to_string())
                .or_insert_with(|| PatternNode::Fields(BTreeMap::new()));
            if matches!(node, PatternNode::Matchers(_)) {
                *node = PatternNode::Fields(BTreeMap::new());
            }
            level = match node {
                PatternNode::Fields(children) => children,
                PatternNode::Matchers(_) => unreachable!("leaf replaced with a nested pattern above"),
            };
        }
        level.insert((*last).to_string(), PatternNode::Matchers(matchers));
        self
    }

    /// Evaluates the pattern against an envelope.
    pub fn matches(&self, envelope: &EventEnvelope) -> bool {
        self.root.iter().all(|(key, node)| match (key.as_str(), node) {
            ("detail_type", PatternNode::Matchers(matchers)) => matchers
                .iter()
                .any(|m| m.matches_detail_type(envelope.detail_type())),
            _ => node.matches(Field::root(envelope, key)),
        })
    }

    /// Exact `detail_type` values named by this pattern, if it constrains them.
    pub fn exact_detail_types(&self) -> Vec<DetailType> {
        match self.root.get("detail_type") {
            Some(PatternNode::Matchers(matchers)) => matchers
                .iter()
                .filter_map(|m| match m {
                    Matcher::Literal(Value::String(s)) => Some(DetailType::from(s.as_str())),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Structural checks run when a topology is loaded.
    pub fn validate(&self) -> Result<(), String> {
        if self.root.is_empty() {
            return Err("pattern is empty and would match every event".to_string());
        }
        for (key, node) in &self.root {
            if !ROOT_KEYS.contains(&key.as_str()) {
                return Err(format!(
                    "unknown top-level field '{key}' (expected one of {})",
                    ROOT_KEYS.join(", ")
                ));
            }
            if STRING_ROOTS.contains(&key.as_str()) && matches!(node, PatternNode::Fields(_)) {
                return Err(format!("'{key}' is a string and cannot hold a nested pattern"));
            }
            node.validate(key)?;
        }
        Ok(())
    }
}

fn wildcard_match(glob: &str, text: &str) -> bool {
    let pattern: Vec<char> = glob.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut star: Option<usize> = None;
    let mut resume = 0;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            star = Some(p);
            resume = t;
            p += 1;
        } else if p < pattern.len() && pattern[p] == text[t] {
            p += 1;
            t += 1;
        } else if let Some(s) = star {
            // let the last star swallow one more character
            p = s + 1;
            resume += 1;
            t = resume;
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|c| *c == '*')
}
