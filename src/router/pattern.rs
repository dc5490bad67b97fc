//! Path pattern compilation and matching.
//!
//! A pattern string like `/todos/:id/subtodos/:subtodo_id` compiles to an
//! ordered list of segments, each a literal or a named capture. Matching is
//! purely structural: equal segment counts, literal segments compare exact,
//! `:name` segments accept any non-empty value and capture it.

use std::fmt;

/// One compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Must equal the request segment exactly.
    Literal(String),
    /// Matches any non-empty request segment, captured under this name.
    Param(String),
}

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Compile a pattern string. Segments starting with `:` become named
    /// captures; everything else is literal.
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix(':') {
                Some(name) => Segment::Param(name.to_string()),
                None => Segment::Literal(s.to_string()),
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    /// Match against a split request path.
    ///
    /// Returns the captured parameters (pattern order, so an outer `:id`
    /// precedes a nested capture) on success, `None` on any structural
    /// mismatch. A differing segment count never matches.
    pub fn matches(&self, segments: &[&str]) -> Option<Vec<(String, String)>> {
        if segments.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (pattern, value) in self.segments.iter().zip(segments) {
            match pattern {
                Segment::Literal(literal) => {
                    if literal.as_str() != *value {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    if value.is_empty() {
                        return None;
                    }
                    params.push((name.clone(), (*value).to_string()));
                }
            }
        }

        Some(params)
    }

    /// The compiled segments.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Split a request path into non-empty segments.
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
