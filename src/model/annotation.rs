//! Vertex annotations parsed from `[&key=value,...]` comments.
//!
//! Provides the [Annotations] column store, which keeps parsed values per
//! vertex index. Supported values captured by [AnnotationValue] are `f64`,
//! `i64`, `String` and the *BEAST brace list `{1.5,2.0}`.

use crate::model::tree::VertexIndex;
use std::collections::HashMap;
use std::fmt;

// =#========================================================================#=
// ANNOTATIONS
// =#========================================================================#=
/// Vertex annotations for multiple keys.
///
/// Columns grow on demand, so annotations can be added while a tree is being
/// built and its final size is not known yet.
#[derive(Debug, Clone, Default)]
pub struct Annotations {
    annotations: HashMap<String, Vec<Option<AnnotationValue>>>,
}

impl Annotations {
    /// Creates an empty [Annotations].
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the annotation value of `key` for one vertex, if any.
    pub fn get(&self, key: &str, vertex_index: VertexIndex) -> Option<&AnnotationValue> {
        self.annotations
            .get(key)
            .and_then(|column| column.get(vertex_index))
            .and_then(Option::as_ref)
    }

    /// Returns whether any vertex has a value for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.annotations
            .get(key)
            .is_some_and(|column| column.iter().any(Option::is_some))
    }

    /// Adds an annotation value for a vertex, replacing a previous one.
    pub fn add(&mut self, key: String, vertex_index: VertexIndex, value: AnnotationValue) {
        let column = self.annotations.entry(key).or_default();
        if column.len() <= vertex_index {
            column.resize(vertex_index + 1, None);
        }
        column[vertex_index] = Some(value);
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

// =#========================================================================#=
// ANNOTATION VALUE
// =#========================================================================#=
/// A parsed annotation value.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    /// For floating point values
    Float(f64),
    /// For integer values
    Int(i64),
    /// For strings
    String(String),
    /// For brace lists of numbers, e.g. `{0.5,1.25}`
    List(Vec<f64>),
}

impl AnnotationValue {
    /// Parses a raw annotation value as written in a tree file.
    ///
    /// Brace lists become [AnnotationValue::List] (if every element is
    /// numeric), then integers, floats and finally anything else a string.
    /// Quotes around strings are removed.
    ///
    /// # Example
    /// ```
    /// use popsizes::model::AnnotationValue;
    ///
    /// assert_eq!(AnnotationValue::parse("{1,2.5}"), AnnotationValue::List(vec![1.0, 2.5]));
    /// assert_eq!(AnnotationValue::parse("3"), AnnotationValue::Int(3));
    /// assert_eq!(AnnotationValue::parse("0.25"), AnnotationValue::Float(0.25));
    /// assert_eq!(AnnotationValue::parse("\"red\""), AnnotationValue::String("red".into()));
    /// ```
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(inner) = raw.strip_prefix('{').and_then(|r| r.strip_suffix('}')) {
            let values: Result<Vec<f64>, _> =
                inner.split(',').map(|v| v.trim().parse::<f64>()).collect();
            if let Ok(values) = values {
                return AnnotationValue::List(values);
            }
            return AnnotationValue::String(raw.to_string());
        }
        if let Ok(int) = raw.parse::<i64>() {
            return AnnotationValue::Int(int);
        }
        if let Ok(float) = raw.parse::<f64>() {
            return AnnotationValue::Float(float);
        }
        let unquoted = raw
            .strip_prefix('"')
            .and_then(|r| r.strip_suffix('"'))
            .unwrap_or(raw);
        AnnotationValue::String(unquoted.to_string())
    }

    /// Returns the value as a number if it is one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AnnotationValue::Float(v) => Some(*v),
            AnnotationValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Returns the value as a list of numbers; a single number is a
    /// one-element list.
    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            AnnotationValue::List(values) => Some(values.clone()),
            other => other.as_f64().map(|v| vec![v]),
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AnnotationValue::Float(v) => write!(f, "{v}"),
            AnnotationValue::Int(v) => write!(f, "{v}"),
            AnnotationValue::String(s) => write!(f, "{s}"),
            AnnotationValue::List(values) => {
                let joined: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "{{{}}}", joined.join(","))
            }
        }
    }
}

impl From<f64> for AnnotationValue {
    fn from(v: f64) -> Self {
        AnnotationValue::Float(v)
    }
}

impl From<i64> for AnnotationValue {
    fn from(v: i64) -> Self {
        AnnotationValue::Int(v)
    }
}

impl From<&str> for AnnotationValue {
    fn from(v: &str) -> Self {
        AnnotationValue::String(v.to_string())
    }
}

impl From<Vec<f64>> for AnnotationValue {
    fn from(v: Vec<f64>) -> Self {
        AnnotationValue::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_grow_on_demand() {
        let mut annotations = Annotations::new();
        annotations.add("dmv".to_string(), 4, AnnotationValue::Float(2.0));
        assert_eq!(annotations.get("dmv", 4), Some(&AnnotationValue::Float(2.0)));
        assert_eq!(annotations.get("dmv", 2), None);
        assert_eq!(annotations.get("dmv", 17), None);
        assert_eq!(annotations.get("dmt", 4), None);
        assert!(annotations.contains_key("dmv"));
    }

    #[test]
    fn test_brace_list_with_text_stays_string() {
        assert_eq!(
            AnnotationValue::parse("{a,b}"),
            AnnotationValue::String("{a,b}".to_string())
        );
        assert_eq!(AnnotationValue::Int(2).as_f64_list(), Some(vec![2.0]));
    }
}
