use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use super::{LineDiagnostic, PageIndex, Parsed, TitleDictionary, XrefError, content_lines};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetToken {
    Quoted(String),
    Plain(String),
}

impl TargetToken {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Quoted(value) | Self::Plain(value) => value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub name: String,
    pub target: TargetToken,
    pub fit_to_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Page(PageIndex),
    Broken(XrefError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLink {
    pub spec: LinkSpec,
    pub target: LinkTarget,
    pub line_number: usize,
    pub line: String,
}

impl ResolvedLink {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn is_broken(&self) -> bool {
        matches!(self.target, LinkTarget::Broken(_))
    }
}

pub struct LinkSpecParser {
    line_regex: Regex,
}

impl LinkSpecParser {
    pub fn new() -> Result<Self> {
        let line_regex = Regex::new(
            r#"^\s*(?P<name>\S+)\s+(?:"(?P<quoted>[^"]*)"|(?P<plain>[^"\s].*?))(?:\s+(?P<fit>fit))?\s*$"#,
        )
        .context("failed to compile link line regex")?;
        Ok(Self { line_regex })
    }

    pub fn parse<S: AsRef<str>>(
        &self,
        lines: &[S],
        dictionary: &TitleDictionary,
        default_fit: bool,
    ) -> Parsed<ResolvedLink> {
        let mut parsed = Parsed::default();

        for (line_number, line) in content_lines(lines) {
            let Some(spec) = self.parse_line(line, default_fit) else {
                warn!(line_number, line = %line, "skipping malformed link line");
                parsed.diagnostics.push(LineDiagnostic {
                    line_number,
                    line: line.to_string(),
                    error: XrefError::MalformedLinkLine {
                        line_number,
                        line: line.to_string(),
                    },
                });
                continue;
            };

            let target = match resolve_target(&spec.target, dictionary) {
                Ok(page) => {
                    debug!(name = %spec.name, page = page + 1, "resolved link");
                    LinkTarget::Page(page)
                }
                Err(err) => {
                    debug!(name = %spec.name, target = %spec.target.as_str(), error = %err, "broken link");
                    LinkTarget::Broken(err)
                }
            };

            parsed.entries.push(ResolvedLink {
                spec,
                target,
                line_number,
                line: line.to_string(),
            });
        }

        debug!(
            links = parsed.entries.len(),
            broken = parsed.entries.iter().filter(|link| link.is_broken()).count(),
            "parsed link lines"
        );
        parsed
    }

    fn parse_line(&self, line: &str, default_fit: bool) -> Option<LinkSpec> {
        let captures = self.line_regex.captures(line)?;
        let name = captures.name("name")?.as_str().to_string();
        let target = match (captures.name("quoted"), captures.name("plain")) {
            (Some(quoted), _) => TargetToken::Quoted(quoted.as_str().to_string()),
            (None, Some(plain)) => TargetToken::Plain(plain.as_str().to_string()),
            (None, None) => return None,
        };

        Some(LinkSpec {
            name,
            target,
            fit_to_page: default_fit || captures.name("fit").is_some(),
        })
    }
}

fn resolve_target(target: &TargetToken, dictionary: &TitleDictionary) -> Result<PageIndex, XrefError> {
    match target {
        TargetToken::Quoted(token) => dictionary.resolve(token),
        TargetToken::Plain(value) => dictionary.resolve_mixed(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(link: &ResolvedLink) -> Option<PageIndex> {
        match link.target {
            LinkTarget::Page(page) => Some(page),
            LinkTarget::Broken(_) => None,
        }
    }

    fn dictionary() -> TitleDictionary {
        let mut dictionary = TitleDictionary::new();
        dictionary.define("Overview", 2);
        dictionary.define("January", 13);
        dictionary.define("Week 44", 28);
        dictionary.define("12", 50);
        dictionary
    }

    fn parse(lines: &[&str], default_fit: bool) -> Parsed<ResolvedLink> {
        let parser = LinkSpecParser::new().expect("regex compiles");
        parser.parse(lines, &dictionary(), default_fit)
    }

    #[test]
    fn quoted_target_is_a_dictionary_token() {
        let parsed = parse(&[r#"L1 "January""#, r#"L2 "Week 44""#], false);

        assert!(parsed.is_clean());
        assert_eq!(page(&parsed.entries[0]), Some(13));
        assert_eq!(page(&parsed.entries[1]), Some(28));
        assert_eq!(
            parsed.entries[1].spec.target,
            TargetToken::Quoted("Week 44".to_string())
        );
    }

    #[test]
    fn plain_target_tries_literal_before_token() {
        let parsed = parse(&["L1 12", "L2 Overview", r#"L3 "12""#], false);

        assert_eq!(page(&parsed.entries[0]), Some(11));
        assert_eq!(page(&parsed.entries[1]), Some(2));
        // Quoting forces the token reading even for numeric text.
        assert_eq!(page(&parsed.entries[2]), Some(50));
    }

    #[test]
    fn unresolved_targets_are_broken_not_fatal() {
        let parsed = parse(
            &[r#"L1 "Nonexistent""#, "L2 Nowhere", "L3 14", r#"L4 "january""#],
            false,
        );

        assert_eq!(parsed.entries.len(), 4);
        let broken: Vec<&str> = parsed
            .entries
            .iter()
            .filter(|link| link.is_broken())
            .map(ResolvedLink::name)
            .collect();
        assert_eq!(broken, vec!["L1", "L2", "L4"]);
        assert_eq!(
            parsed.entries[0].target,
            LinkTarget::Broken(XrefError::UnknownToken("Nonexistent".to_string()))
        );
        assert_eq!(
            parsed.entries[1].target,
            LinkTarget::Broken(XrefError::UnresolvedReference("Nowhere".to_string()))
        );
    }

    #[test]
    fn fit_suffix_and_default_fit() {
        let parsed = parse(&[r#"L1 "Week 44" fit"#, "L2 3 fit", "L3 3", "L4 fit"], false);

        assert!(parsed.entries[0].spec.fit_to_page);
        assert_eq!(page(&parsed.entries[0]), Some(28));
        assert!(parsed.entries[1].spec.fit_to_page);
        assert_eq!(page(&parsed.entries[1]), Some(2));
        assert!(!parsed.entries[2].spec.fit_to_page);
        // A lone `fit` is the target, not the suffix.
        assert_eq!(
            parsed.entries[3].spec.target,
            TargetToken::Plain("fit".to_string())
        );

        let parsed = parse(&["L3 3"], true);
        assert!(parsed.entries[0].spec.fit_to_page);
    }

    #[test]
    fn malformed_lines_are_reported_and_skipped() {
        let parsed = parse(&["L1", r#"L2 "unterminated"#, "", "# comment", "L3 4"], false);

        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.entries[0].line_number, 5);
        let numbers: Vec<usize> = parsed
            .diagnostics
            .iter()
            .map(|diagnostic| diagnostic.line_number)
            .collect();
        assert_eq!(numbers, vec![1, 2]);
    }
}
