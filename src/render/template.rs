//! Page template shell.
//!
//! # Responsibilities
//! - Parse the shell once, locating every `%router.*%` marker
//! - Substitute markers in a single left-to-right pass
//!
//! # Design Decisions
//! - The template is split into literal chunks and marker slots at load
//!   time; inserted content is appended, never re-scanned, so a page that
//!   prints `%router.html%` shows it literally
//! - `%router.html%` and `%router.scripts%` are required; the others are
//!   optional

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// Shell used when no template file is configured.
pub const DEFAULT_TEMPLATE: &str = "<!doctype html>\n\
<html>\n\
<head>\n\
<meta charset=\"utf-8\">\n\
%router.base%\n\
%router.styles%\n\
%router.head%\n\
</head>\n\
<body>\n\
<div id=\"router\">%router.html%</div>\n\
%router.scripts%\n\
</body>\n\
</html>\n";

const PREFIX: &str = "%router.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Base,
    Head,
    Styles,
    Html,
    Scripts,
}

impl Marker {
    const ALL: [Marker; 5] = [
        Marker::Base,
        Marker::Head,
        Marker::Styles,
        Marker::Html,
        Marker::Scripts,
    ];

    pub fn token(self) -> &'static str {
        match self {
            Marker::Base => "%router.base%",
            Marker::Head => "%router.head%",
            Marker::Styles => "%router.styles%",
            Marker::Html => "%router.html%",
            Marker::Scripts => "%router.scripts%",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("cannot read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("template is missing {0}")]
    MissingMarker(Marker),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Chunk {
    Literal(String),
    Slot(Marker),
}

/// Content for each marker of one page.
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    pub base: String,
    pub head: String,
    pub styles: String,
    pub html: String,
    pub scripts: String,
}

impl Substitutions {
    fn get(&self, marker: Marker) -> &str {
        match marker {
            Marker::Base => &self.base,
            Marker::Head => &self.head,
            Marker::Styles => &self.styles,
            Marker::Html => &self.html,
            Marker::Scripts => &self.scripts,
        }
    }
}

/// A parsed shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    chunks: Vec<Chunk>,
    literal_len: usize,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(at) = rest.find(PREFIX) {
            let (before, candidate) = rest.split_at(at);
            literal.push_str(before);
            match Marker::ALL.iter().find(|m| candidate.starts_with(m.token())) {
                Some(marker) => {
                    if !literal.is_empty() {
                        chunks.push(Chunk::Literal(std::mem::take(&mut literal)));
                    }
                    chunks.push(Chunk::Slot(*marker));
                    rest = &candidate[marker.token().len()..];
                }
                None => {
                    literal.push_str(PREFIX);
                    rest = &candidate[PREFIX.len()..];
                }
            }
        }
        literal.push_str(rest);
        if !literal.is_empty() {
            chunks.push(Chunk::Literal(literal));
        }

        for required in [Marker::Html, Marker::Scripts] {
            if !chunks.contains(&Chunk::Slot(required)) {
                return Err(TemplateError::MissingMarker(required));
            }
        }

        let literal_len = chunks
            .iter()
            .map(|chunk| match chunk {
                Chunk::Literal(text) => text.len(),
                Chunk::Slot(_) => 0,
            })
            .sum();
        Ok(Self { chunks, literal_len })
    }

    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn render(&self, subs: &Substitutions) -> String {
        let mut out = String::with_capacity(self.literal_len + subs.html.len() + subs.scripts.len());
        for chunk in &self.chunks {
            match chunk {
                Chunk::Literal(text) => out.push_str(text),
                Chunk::Slot(marker) => out.push_str(subs.get(*marker)),
            }
        }
        out
    }
}

impl Default for Template {
    fn default() -> Self {
        match Self::parse(DEFAULT_TEMPLATE) {
            Ok(template) => template,
            Err(_) => unreachable!("built-in template carries every required marker"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pass_substitution() {
        let template = Template::parse("<head>%router.head%</head><body>%router.html%%router.scripts%</body>").unwrap();
        let page = template.render(&Substitutions {
            head: "<title>%router.html%</title>".into(),
            html: "<p>%router.scripts%</p>".into(),
            scripts: "<script></script>".into(),
            ..Substitutions::default()
        });

        assert_eq!(
            page,
            "<head><title>%router.html%</title></head><body><p>%router.scripts%</p><script></script></body>"
        );
    }

    #[test]
    fn test_unknown_marker_is_literal() {
        let template = Template::parse("%router.nope% %router.html% %router.scripts%").unwrap();
        assert_eq!(
            template.render(&Substitutions::default()),
            "%router.nope%  "
        );
    }

    #[test]
    fn test_required_markers() {
        let err = Template::parse("<body>%router.html%</body>").unwrap_err();
        assert!(matches!(err, TemplateError::MissingMarker(Marker::Scripts)));
        assert!(Template::parse(DEFAULT_TEMPLATE).is_ok());
    }
}
