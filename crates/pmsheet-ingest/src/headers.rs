//! Header resolution
//!
//! Maps every logical [`Field`] to a concrete source column. Fuzzy rules
//! scan the normalized header row; fixed rules use spreadsheet letters.
//! Both produce a [`ResolvedColumnMap`], and an unresolved field is never an
//! error: it reads as empty for every row.

use std::collections::BTreeMap;

use pmsheet_core::config::column_index;
use pmsheet_core::{
    ConfigError, Diagnostic, DiagnosticCode, DiagnosticEmitter, Field, HeaderMatching,
};
use regex::{Regex, RegexBuilder};

/// A single header pattern
#[derive(Clone, Debug)]
pub enum Pattern {
    /// Matches when the normalized header contains the text
    Contains(String),
    /// `^...$` pattern; must match the whole normalized header
    Anchored(Regex),
}

impl Pattern {
    pub fn parse(field: Field, pattern: &str) -> Result<Self, ConfigError> {
        let trimmed = pattern.trim();
        if trimmed.len() >= 2 && trimmed.starts_with('^') && trimmed.ends_with('$') {
            let regex = RegexBuilder::new(trimmed)
                .case_insensitive(true)
                .build()
                .map_err(|e| ConfigError::InvalidPattern {
                    field: field.label().to_string(),
                    pattern: pattern.to_string(),
                    reason: e.to_string(),
                })?;
            Ok(Pattern::Anchored(regex))
        } else {
            Ok(Pattern::Contains(trimmed.to_lowercase()))
        }
    }

    pub fn matches(&self, normalized: &str) -> bool {
        match self {
            Pattern::Contains(text) => normalized.contains(text.as_str()),
            Pattern::Anchored(regex) => regex.is_match(normalized),
        }
    }
}

/// Trim and lowercase a header cell
pub fn normalize_header(header: &str) -> String {
    header.trim().to_lowercase()
}

/// Field to 0-based source column
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedColumnMap {
    columns: BTreeMap<Field, usize>,
}

impl ResolvedColumnMap {
    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied()
    }

    pub fn insert(&mut self, field: Field, column: usize) {
        self.columns.insert(field, column);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        self.columns.iter().map(|(field, column)| (*field, *column))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Source fields without a column, in declaration order
    pub fn missing(&self) -> Vec<Field> {
        Field::SOURCE
            .into_iter()
            .filter(|field| !self.columns.contains_key(field))
            .collect()
    }
}

#[derive(Clone, Debug)]
enum Rules {
    Fuzzy(Vec<(Field, Vec<Pattern>)>),
    Fixed(Vec<(Field, usize)>),
}

/// Compiled header rules
///
/// Building the resolver validates every pattern and letter, so a bad
/// profile fails before any file is opened.
#[derive(Clone, Debug)]
pub struct HeaderResolver {
    rules: Rules,
}

impl HeaderResolver {
    pub fn new(matching: &HeaderMatching) -> Result<Self, ConfigError> {
        let rules = match matching {
            HeaderMatching::Fuzzy(rules) => Rules::Fuzzy(
                rules
                    .iter()
                    .map(|(field, patterns)| {
                        let compiled = patterns
                            .iter()
                            .map(|p| Pattern::parse(*field, p))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok((*field, compiled))
                    })
                    .collect::<Result<Vec<_>, ConfigError>>()?,
            ),
            HeaderMatching::Fixed(letters) => Rules::Fixed(
                letters
                    .iter()
                    .map(|(field, letter)| Ok((*field, column_index(letter)?)))
                    .collect::<Result<Vec<_>, ConfigError>>()?,
            ),
        };
        Ok(Self { rules })
    }

    /// Resolve against a header row without reporting
    pub fn resolve(&self, headers: &[String]) -> ResolvedColumnMap {
        let mut map = ResolvedColumnMap::default();
        match &self.rules {
            Rules::Fuzzy(rules) => {
                let normalized: Vec<String> =
                    headers.iter().map(|h| normalize_header(h)).collect();
                for (field, patterns) in rules {
                    if map.get(*field).is_some() {
                        continue;
                    }
                    let hit = normalized
                        .iter()
                        .position(|header| patterns.iter().any(|p| p.matches(header)));
                    if let Some(column) = hit {
                        map.insert(*field, column);
                    }
                }
            }
            Rules::Fixed(letters) => {
                for (field, column) in letters {
                    if *column < headers.len() {
                        map.insert(*field, *column);
                    }
                }
            }
        }
        map
    }

    /// Resolve and emit one info diagnostic per unresolved field
    pub fn resolve_reporting(
        &self,
        headers: &[String],
        emitter: &mut dyn DiagnosticEmitter,
    ) -> ResolvedColumnMap {
        let map = self.resolve(headers);
        for field in map.missing() {
            emitter.emit(Diagnostic::new(
                DiagnosticCode::I001FieldNotFound,
                format!("column for '{}' not found; values treated as empty", field),
            ));
        }
        map
    }
}
