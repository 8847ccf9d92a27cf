mod dictionary;
mod document;
mod error;
mod links;
mod notes;
mod outline;
mod resolver;
mod toc;

pub use dictionary::{DictionaryParser, TitleDictionary};
pub use document::{FitMode, NamedLink, OutlineSink, RawAnnotation, XrefDocument};
pub use error::{LineDiagnostic, Parsed, XrefError};
pub use links::{LinkSpecParser, LinkTarget, ResolvedLink};
pub use notes::{group_annotations, render_groups};
pub use outline::{PageTitles, install_outline, page_titles, validate_forest};
pub use resolver::{
    LinkProblem, ResolutionSession, ResolveOptions, RewritePlan, RewriteSummary, apply_plan,
};
pub use toc::{OutlineNode, TocParser, count_nodes, preorder};

pub type PageIndex = usize;

pub fn parse_page_literal(value: &str) -> Option<PageIndex> {
    match value.trim().parse::<usize>() {
        Ok(page) if page > 0 => Some(page - 1),
        _ => None,
    }
}

fn content_lines<S: AsRef<str>>(lines: &[S]) -> impl Iterator<Item = (usize, &str)> {
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| (index + 1, line.as_ref().trim_end_matches(['\r', '\n'])))
        .filter(|(_, line)| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
}
