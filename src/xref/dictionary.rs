use std::collections::HashMap;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use super::{LineDiagnostic, PageIndex, Parsed, XrefError, content_lines, parse_page_literal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redefinition {
    pub token: String,
    pub previous: PageIndex,
    pub page: PageIndex,
}

#[derive(Debug, Default)]
pub struct TitleDictionary {
    entries: HashMap<String, PageIndex>,
    redefinitions: Vec<Redefinition>,
}

impl TitleDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, token: impl Into<String>, page: PageIndex) -> Option<PageIndex> {
        let token = token.into();
        let previous = self.entries.insert(token.clone(), page);

        if let Some(previous) = previous {
            if previous != page {
                warn!(
                    token = %token,
                    previous_page = previous + 1,
                    page = page + 1,
                    "token redefined, keeping the later page"
                );
            }
            self.redefinitions.push(Redefinition {
                token,
                previous,
                page,
            });
        }

        previous
    }

    pub fn resolve(&self, token: &str) -> Result<PageIndex, XrefError> {
        self.entries
            .get(token)
            .copied()
            .ok_or_else(|| XrefError::UnknownToken(token.to_string()))
    }

    /// Literal one-based page numbers win over tokens that happen to look numeric.
    pub fn resolve_mixed(&self, value: &str) -> Result<PageIndex, XrefError> {
        let value = value.trim();
        if let Some(page) = parse_page_literal(value) {
            return Ok(page);
        }

        self.resolve(value)
            .map_err(|_| XrefError::UnresolvedReference(value.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn redefinitions(&self) -> &[Redefinition] {
        &self.redefinitions
    }
}

pub struct DictionaryParser {
    line_regex: Regex,
}

impl DictionaryParser {
    pub fn new() -> Result<Self> {
        let line_regex = Regex::new(r"^\s*(\S+)\s+(\S+)\s*$")
            .context("failed to compile dictionary line regex")?;
        Ok(Self { line_regex })
    }

    pub fn parse<S: AsRef<str>>(
        &self,
        lines: &[S],
        dictionary: &mut TitleDictionary,
    ) -> Parsed<(String, PageIndex)> {
        let mut parsed = Parsed::default();

        for (line_number, line) in content_lines(lines) {
            let entry = self.line_regex.captures(line).and_then(|captures| {
                let token = captures.get(1)?.as_str();
                let page = parse_page_literal(captures.get(2)?.as_str())?;
                Some((token.to_string(), page))
            });

            let Some((token, page)) = entry else {
                warn!(line_number, line = %line, "skipping malformed dictionary line");
                parsed.diagnostics.push(LineDiagnostic {
                    line_number,
                    line: line.to_string(),
                    error: XrefError::MalformedDictionaryLine {
                        line_number,
                        line: line.to_string(),
                    },
                });
                continue;
            };

            debug!(token = %token, page = page + 1, "dictionary entry");
            dictionary.define(token.clone(), page);
            parsed.entries.push((token, page));
        }

        parsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_overwrites_and_records_redefinition() {
        let mut dictionary = TitleDictionary::new();
        assert_eq!(dictionary.define("January", 13), None);
        assert_eq!(dictionary.define("January", 20), Some(13));

        assert_eq!(dictionary.resolve("January"), Ok(20));
        assert_eq!(dictionary.len(), 1);
        assert_eq!(
            dictionary.redefinitions(),
            &[Redefinition {
                token: "January".to_string(),
                previous: 13,
                page: 20,
            }]
        );
    }

    #[test]
    fn resolve_is_case_sensitive() {
        let mut dictionary = TitleDictionary::new();
        dictionary.define("Intro", 1);

        assert_eq!(
            dictionary.resolve("intro"),
            Err(XrefError::UnknownToken("intro".to_string()))
        );
    }

    #[test]
    fn resolve_mixed_prefers_literal_pages() {
        let mut dictionary = TitleDictionary::new();
        dictionary.define("7", 99);
        dictionary.define("Appendix", 40);

        assert_eq!(dictionary.resolve_mixed("7"), Ok(6));
        assert_eq!(dictionary.resolve_mixed(" Appendix "), Ok(40));
        assert_eq!(
            dictionary.resolve_mixed("Missing"),
            Err(XrefError::UnresolvedReference("Missing".to_string()))
        );
    }

    #[test]
    fn resolve_mixed_treats_zero_as_a_token() {
        let mut dictionary = TitleDictionary::new();
        assert!(dictionary.resolve_mixed("0").is_err());

        dictionary.define("0", 3);
        assert_eq!(dictionary.resolve_mixed("0"), Ok(3));
    }

    #[test]
    fn dictionary_file_collects_malformed_lines() {
        let parser = DictionaryParser::new().expect("regex compiles");
        let mut dictionary = TitleDictionary::new();
        let lines = ["# weekly planner", "jan 14", "feb", "", "mar x", "jan 15"];

        let parsed = parser.parse(&lines, &mut dictionary);

        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(dictionary.resolve("jan"), Ok(14));
        let numbers: Vec<usize> = parsed
            .diagnostics
            .iter()
            .map(|diagnostic| diagnostic.line_number)
            .collect();
        assert_eq!(numbers, vec![3, 5]);
        assert!(matches!(
            parsed.diagnostics[0].error,
            XrefError::MalformedDictionaryLine { line_number: 3, .. }
        ));
    }
}
