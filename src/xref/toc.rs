use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use super::{
    LineDiagnostic, PageIndex, Parsed, TitleDictionary, XrefError, content_lines,
    parse_page_literal,
};

const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub title: String,
    pub page: PageIndex,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    pub fn new(title: impl Into<String>, page: PageIndex) -> Self {
        Self {
            title: title.into(),
            page,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<OutlineNode>) -> Self {
        self.children = children;
        self
    }
}

pub fn preorder(forest: &[OutlineNode]) -> Vec<(usize, &OutlineNode)> {
    let mut out = Vec::new();
    let mut pending: Vec<(usize, &OutlineNode)> =
        forest.iter().rev().map(|node| (0, node)).collect();

    while let Some((level, node)) = pending.pop() {
        out.push((level, node));
        pending.extend(node.children.iter().rev().map(|child| (level + 1, child)));
    }

    out
}

pub fn count_nodes(forest: &[OutlineNode]) -> usize {
    forest
        .iter()
        .map(|node| 1 + count_nodes(&node.children))
        .sum()
}

pub struct TocParser {
    line_regex: Regex,
}

impl TocParser {
    pub fn new() -> Result<Self> {
        let line_regex = Regex::new(r"^(?P<indent>[ \t]*)(?P<page>\S+)(?:[ \t]+(?P<title>\S.*?))?\s*$")
            .context("failed to compile toc line regex")?;
        Ok(Self { line_regex })
    }

    pub fn parse<S: AsRef<str>>(
        &self,
        lines: &[S],
        dictionary: &mut TitleDictionary,
    ) -> Parsed<OutlineNode> {
        let mut parsed = Parsed::default();
        let mut stack: Vec<(usize, OutlineNode)> = Vec::new();

        for (line_number, line) in content_lines(lines) {
            let Some((depth, page, title)) = self.parse_line(line) else {
                warn!(line_number, line = %line, "skipping malformed toc line");
                parsed.diagnostics.push(LineDiagnostic {
                    line_number,
                    line: line.to_string(),
                    error: XrefError::MalformedTocLine {
                        line_number,
                        line: line.to_string(),
                    },
                });
                continue;
            };

            while stack.last().is_some_and(|(open_depth, _)| *open_depth >= depth) {
                close_innermost(&mut stack, &mut parsed.entries);
            }

            debug!(depth, page = page + 1, title = %title, "toc entry");
            dictionary.define(title.clone(), page);
            stack.push((depth, OutlineNode::new(title, page)));
        }

        while !stack.is_empty() {
            close_innermost(&mut stack, &mut parsed.entries);
        }

        parsed
    }

    fn parse_line(&self, line: &str) -> Option<(usize, PageIndex, String)> {
        let captures = self.line_regex.captures(line)?;
        let depth = indentation_width(captures.name("indent")?.as_str());
        let page = parse_page_literal(captures.name("page")?.as_str())?;
        let title = captures.name("title")?.as_str().trim().to_string();
        Some((depth, page, title))
    }
}

fn close_innermost(stack: &mut Vec<(usize, OutlineNode)>, forest: &mut Vec<OutlineNode>) {
    if let Some((_, node)) = stack.pop() {
        match stack.last_mut() {
            Some((_, parent)) => parent.children.push(node),
            None => forest.push(node),
        }
    }
}

fn indentation_width(indent: &str) -> usize {
    indent
        .chars()
        .map(|ch| if ch == '\t' { TAB_WIDTH } else { 1 })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(lines: &[&str]) -> (Parsed<OutlineNode>, TitleDictionary) {
        let parser = TocParser::new().expect("regex compiles");
        let mut dictionary = TitleDictionary::new();
        let parsed = parser.parse(lines, &mut dictionary);
        (parsed, dictionary)
    }

    #[test]
    fn flat_toc_keeps_source_order_and_feeds_dictionary() {
        let (parsed, dictionary) = parse(&["3 Overview", "14 January", "29 Week 44"]);

        assert!(parsed.is_clean());
        let titles: Vec<&str> = parsed.entries.iter().map(|node| node.title.as_str()).collect();
        assert_eq!(titles, vec!["Overview", "January", "Week 44"]);
        assert_eq!(dictionary.resolve("January"), Ok(13));
        assert_eq!(dictionary.resolve("Week 44"), Ok(28));
    }

    #[test]
    fn indentation_builds_nested_forest() {
        let (parsed, _) = parse(&[
            "1 Year",
            "  2 January",
            "    3 Week 1",
            "    4 Week 2",
            "  10 February",
            "20 Notes",
            "\t21 Ideas",
        ]);

        let expected = vec![
            OutlineNode::new("Year", 0).with_children(vec![
                OutlineNode::new("January", 1).with_children(vec![
                    OutlineNode::new("Week 1", 2),
                    OutlineNode::new("Week 2", 3),
                ]),
                OutlineNode::new("February", 9),
            ]),
            OutlineNode::new("Notes", 19).with_children(vec![OutlineNode::new("Ideas", 20)]),
        ];
        assert_eq!(parsed.entries, expected);
    }

    #[test]
    fn dedent_attaches_to_nearest_shallower_node() {
        let (parsed, _) = parse(&["1 A", "    2 B", "  3 C", "      4 D"]);

        // C is shallower than B but deeper than A, so it becomes A's second child.
        let a = &parsed.entries[0];
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.children[0].title, "B");
        assert_eq!(a.children[1].title, "C");
        assert_eq!(a.children[1].children[0].title, "D");
    }

    #[test]
    fn preorder_matches_valid_input_lines() {
        let lines = ["1 A", "  x broken", "  2 B", "    3 C", "4 D", "  5 E", "6"];
        let (parsed, _) = parse(&lines);

        let order: Vec<&str> = preorder(&parsed.entries)
            .into_iter()
            .map(|(_, node)| node.title.as_str())
            .collect();
        assert_eq!(order, vec!["A", "B", "C", "D", "E"]);
        assert_eq!(count_nodes(&parsed.entries), 5);

        let levels: Vec<usize> = preorder(&parsed.entries)
            .into_iter()
            .map(|(level, _)| level)
            .collect();
        assert_eq!(levels, vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn malformed_lines_are_collected_with_line_numbers() {
        let (parsed, _) = parse(&["3 Overview", "Overview 3", "", "0 Cover", "14 January"]);

        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(parsed.diagnostics.len(), 2);
        assert_eq!(parsed.diagnostics[0].line_number, 2);
        assert_eq!(parsed.diagnostics[0].line, "Overview 3");
        assert_eq!(
            parsed.diagnostics[1].error,
            XrefError::MalformedTocLine {
                line_number: 4,
                line: "0 Cover".to_string(),
            }
        );
    }

    #[test]
    fn repeated_titles_resolve_to_last_definition() {
        let (parsed, dictionary) = parse(&["5 Notes", "9 Notes"]);

        assert_eq!(parsed.entries.len(), 2);
        assert_eq!(dictionary.resolve("Notes"), Ok(8));
        assert_eq!(dictionary.redefinitions().len(), 1);
    }
}
