//! Route pattern parsing and segment matching.
//!
//! # Responsibilities
//! - Parse route patterns (`/blog/[slug]`, `/[...path]`, `/blog/[slug].json`)
//! - Match decoded path segments against a pattern
//! - Order patterns by specificity
//!
//! # Design Decisions
//! - Literal segments compare case-sensitively against decoded text
//! - A dynamic segment may carry a literal prefix and/or suffix
//! - Catch-all is only valid as the last segment and needs one segment
//! - No regex: matching is a single linear pass over the segments

use std::cmp::Ordering;

use crate::routing::manifest::ManifestError;
use crate::routing::params::{decode_segment, ParamValue};

/// One segment of a route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Exact (decoded) text.
    Literal(String),
    /// `prefix[name]suffix`, capturing one segment.
    Dynamic {
        name: String,
        prefix: String,
        suffix: String,
    },
    /// `[...name]`, capturing all remaining segments.
    Rest(String),
}

impl Segment {
    fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 3,
            Segment::Dynamic { prefix, suffix, .. } if !prefix.is_empty() || !suffix.is_empty() => 2,
            Segment::Dynamic { .. } => 1,
            Segment::Rest(_) => 0,
        }
    }

    fn affix_len(&self) -> usize {
        match self {
            Segment::Dynamic { prefix, suffix, .. } => prefix.len() + suffix.len(),
            _ => 0,
        }
    }

    /// Whether this segment captures a parameter.
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Segment::Literal(_))
    }
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    source: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a pattern such as `/blog/[slug]`.
    pub fn parse(source: &str) -> Result<Self, ManifestError> {
        let raw_segments: Vec<&str> = source.split('/').filter(|s| !s.is_empty()).collect();
        let mut segments = Vec::with_capacity(raw_segments.len());
        let mut names: Vec<String> = Vec::new();

        for (index, raw) in raw_segments.iter().enumerate() {
            let segment = parse_segment(source, raw)?;
            match &segment {
                Segment::Rest(name) | Segment::Dynamic { name, .. } => {
                    if names.contains(name) {
                        return Err(ManifestError::DuplicateParam {
                            pattern: source.to_string(),
                            name: name.clone(),
                        });
                    }
                    names.push(name.clone());
                }
                Segment::Literal(_) => {}
            }
            if matches!(segment, Segment::Rest(_)) && index + 1 != raw_segments.len() {
                return Err(ManifestError::InvalidPattern {
                    pattern: source.to_string(),
                    reason: "catch-all must be the last segment".into(),
                });
            }
            segments.push(segment);
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// True when the pattern has no dynamic segments.
    pub fn is_static(&self) -> bool {
        self.segments.iter().all(|s| !s.is_dynamic())
    }

    /// The concrete path of a static pattern.
    pub fn static_path(&self) -> Option<String> {
        if !self.is_static() {
            return None;
        }
        let parts: Vec<&str> = self
            .segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        Some(format!("/{}", parts.join("/")))
    }

    /// Match already decoded path segments, returning captured parameters
    /// in pattern order.
    pub fn match_segments(&self, path: &[String]) -> Option<Vec<(String, ParamValue)>> {
        let mut captured = Vec::new();

        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    if path.get(index)? != text {
                        return None;
                    }
                }
                Segment::Dynamic { name, prefix, suffix } => {
                    let value = path.get(index)?;
                    let inner = value.strip_prefix(prefix.as_str())?;
                    let inner = inner.strip_suffix(suffix.as_str())?;
                    if inner.is_empty() {
                        return None;
                    }
                    captured.push((name.clone(), ParamValue::One(inner.to_string())));
                }
                Segment::Rest(name) => {
                    let rest = path.get(index..)?;
                    if rest.is_empty() {
                        return None;
                    }
                    captured.push((name.clone(), ParamValue::Many(rest.to_vec())));
                    return Some(captured);
                }
            }
        }

        if path.len() == self.segments.len() {
            Some(captured)
        } else {
            None
        }
    }

    /// Ordering with the most specific pattern first.
    pub fn specificity_cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.segments.iter().zip(other.segments.iter()) {
            let by_rank = b.rank().cmp(&a.rank());
            if by_rank != Ordering::Equal {
                return by_rank;
            }
            let by_affix = b.affix_len().cmp(&a.affix_len());
            if by_affix != Ordering::Equal {
                return by_affix;
            }
        }
        other
            .segments
            .len()
            .cmp(&self.segments.len())
            .then_with(|| self.source.cmp(&other.source))
    }
}

fn parse_segment(pattern: &str, raw: &str) -> Result<Segment, ManifestError> {
    let invalid = |reason: &str| ManifestError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.to_string(),
    };

    let Some(open) = raw.find('[') else {
        if raw.contains(']') {
            return Err(invalid("unbalanced `]`"));
        }
        return Ok(Segment::Literal(decode_segment(raw)));
    };
    let close = raw[open..]
        .find(']')
        .map(|offset| open + offset)
        .ok_or_else(|| invalid("unbalanced `[`"))?;

    let prefix = &raw[..open];
    let name = &raw[open + 1..close];
    let suffix = &raw[close + 1..];

    if suffix.contains('[') || suffix.contains(']') {
        return Err(invalid("one parameter per segment"));
    }

    if let Some(rest_name) = name.strip_prefix("...") {
        if !prefix.is_empty() || !suffix.is_empty() {
            return Err(invalid("catch-all cannot have a prefix or suffix"));
        }
        check_name(pattern, rest_name)?;
        return Ok(Segment::Rest(rest_name.to_string()));
    }

    check_name(pattern, name)?;
    Ok(Segment::Dynamic {
        name: name.to_string(),
        prefix: decode_segment(prefix),
        suffix: decode_segment(suffix),
    })
}

fn check_name(pattern: &str, name: &str) -> Result<(), ManifestError> {
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ManifestError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: format!("invalid parameter name `{}`", name),
        });
    }
    Ok(())
}
