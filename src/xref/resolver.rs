use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{
    DictionaryParser, FitMode, LineDiagnostic, LinkSpecParser, LinkTarget, NamedLink,
    OutlineNode, PageIndex, PageTitles, ResolvedLink, TitleDictionary, TocParser, XrefDocument,
    XrefError, count_nodes, install_outline, page_titles, validate_forest,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    pub fit_to_page: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteInstruction {
    pub name: String,
    pub page: PageIndex,
    pub fit: FitMode,
    pub previous_page: Option<PageIndex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkProblem {
    pub name: String,
    pub line_number: usize,
    pub line: String,
    pub error: XrefError,
}

impl LinkProblem {
    fn new(link: &ResolvedLink, error: XrefError) -> Self {
        Self {
            name: link.name().to_string(),
            line_number: link.line_number,
            line: link.line.clone(),
            error,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RewritePlan {
    pub instructions: Vec<RewriteInstruction>,
    pub outline: Option<Vec<OutlineNode>>,
    pub page_titles: PageTitles,
    pub broken: Vec<LinkProblem>,
    pub unknown_names: Vec<LinkProblem>,
    pub diagnostics: Vec<LineDiagnostic>,
    pub resolved_count: usize,
    pub unchanged_count: usize,
}

impl RewritePlan {
    pub fn broken_count(&self) -> usize {
        self.broken.len()
    }

    pub fn unknown_name_count(&self) -> usize {
        self.unknown_names.len()
    }

    pub fn bookmark_count(&self) -> usize {
        self.outline.as_deref().map(count_nodes).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RewriteSummary {
    pub links_resolved: usize,
    pub links_rewritten: usize,
    pub links_unchanged: usize,
    pub links_broken: usize,
    pub unknown_link_names: usize,
    pub malformed_lines: usize,
    pub bookmarks_installed: usize,
}

pub struct ResolutionSession {
    dictionary: TitleDictionary,
    outline: Option<Vec<OutlineNode>>,
    diagnostics: Vec<LineDiagnostic>,
    options: ResolveOptions,
}

impl ResolutionSession {
    pub fn new(options: ResolveOptions) -> Self {
        Self {
            dictionary: TitleDictionary::new(),
            outline: None,
            diagnostics: Vec::new(),
            options,
        }
    }

    pub fn dictionary(&self) -> &TitleDictionary {
        &self.dictionary
    }

    pub fn diagnostics(&self) -> &[LineDiagnostic] {
        &self.diagnostics
    }

    pub fn load_dictionary<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<usize> {
        let parsed = DictionaryParser::new()?.parse(lines, &mut self.dictionary);
        info!(entries = parsed.entries.len(), "read dictionary entries");
        self.diagnostics.extend(parsed.diagnostics);
        Ok(parsed.entries.len())
    }

    pub fn load_toc<S: AsRef<str>>(&mut self, lines: &[S]) -> Result<usize> {
        let parsed = TocParser::new()?.parse(lines, &mut self.dictionary);
        let count = count_nodes(&parsed.entries);
        info!(bookmarks = count, "read table of contents");
        if !parsed.is_clean() {
            debug!(malformed = parsed.diagnostics.len(), "table of contents partly parsed");
        }
        self.diagnostics.extend(parsed.diagnostics);
        self.outline = Some(parsed.entries);
        Ok(count)
    }

    pub fn plan_for<D: XrefDocument, S: AsRef<str>>(
        self,
        link_lines: &[S],
        document: &D,
    ) -> Result<RewritePlan> {
        let named_links = document.named_links()?;
        self.plan(link_lines, &named_links, document.page_count())
    }

    pub fn plan<S: AsRef<str>>(
        self,
        link_lines: &[S],
        named_links: &[NamedLink],
        page_count: usize,
    ) -> Result<RewritePlan> {
        let fit_to_page = self.options.fit_to_page;
        let parsed =
            LinkSpecParser::new()?.parse(link_lines, &self.dictionary, fit_to_page);
        let listed: HashSet<String> = parsed
            .entries
            .iter()
            .map(|link| link.name().to_string())
            .collect();

        let mut plan = RewritePlan {
            page_titles: self.outline.as_deref().map(page_titles).unwrap_or_default(),
            outline: self.outline,
            diagnostics: self.diagnostics,
            ..RewritePlan::default()
        };
        plan.diagnostics.extend(parsed.diagnostics);

        let existing: HashMap<&str, &NamedLink> = named_links
            .iter()
            .map(|link| (link.name.as_str(), link))
            .collect();

        for link in last_definition_per_name(parsed.entries) {
            let page = match &link.target {
                LinkTarget::Page(page) => *page,
                LinkTarget::Broken(err) => {
                    warn!(name = %link.name(), line_number = link.line_number, error = %err, "broken link");
                    plan.broken.push(LinkProblem::new(&link, err.clone()));
                    continue;
                }
            };

            let Some(current) = existing.get(link.name()) else {
                warn!(name = %link.name(), line_number = link.line_number, "unknown link name");
                plan.unknown_names.push(LinkProblem::new(
                    &link,
                    XrefError::UnknownLinkName(link.name().to_string()),
                ));
                continue;
            };

            if page >= page_count {
                warn!(name = %link.name(), page = page + 1, page_count, "link target outside document");
                plan.broken.push(LinkProblem::new(
                    &link,
                    XrefError::PageOutOfRange {
                        title: link.name().to_string(),
                        page,
                        page_count,
                    },
                ));
                continue;
            }

            plan.resolved_count += 1;
            let fit = if link.spec.fit_to_page {
                FitMode::Fit
            } else {
                current.fit.clone().unwrap_or(FitMode::Exact)
            };

            if current.page == Some(page) && current.fit.as_ref() == Some(&fit) {
                debug!(name = %link.name(), page = page + 1, "link already up to date");
                plan.unchanged_count += 1;
                continue;
            }

            plan.instructions.push(RewriteInstruction {
                name: link.name().to_string(),
                page,
                fit,
                previous_page: current.page,
            });
        }

        if fit_to_page {
            plan.instructions.extend(fit_unlisted_links(named_links, &listed, page_count));
        }

        Ok(plan)
    }
}

fn fit_unlisted_links(
    named_links: &[NamedLink],
    listed: &HashSet<String>,
    page_count: usize,
) -> Vec<RewriteInstruction> {
    let mut seen: HashSet<&str> = HashSet::new();
    named_links
        .iter()
        .filter(|link| !listed.contains(&link.name) && seen.insert(link.name.as_str()))
        .filter(|link| link.fit == Some(FitMode::Exact))
        .filter_map(|link| {
            let page = link.page.filter(|page| *page < page_count)?;
            debug!(name = %link.name, page = page + 1, "switching link to fit");
            Some(RewriteInstruction {
                name: link.name.clone(),
                page,
                fit: FitMode::Fit,
                previous_page: Some(page),
            })
        })
        .collect()
}

/// Keeps each name at its first position with the target of its last line.
fn last_definition_per_name(links: Vec<ResolvedLink>) -> Vec<ResolvedLink> {
    let mut ordered: Vec<ResolvedLink> = Vec::with_capacity(links.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for link in links {
        match positions.get(link.name()) {
            Some(&index) => {
                warn!(
                    name = %link.name(),
                    line_number = link.line_number,
                    previous_line = ordered[index].line_number,
                    "link listed twice, keeping the later line"
                );
                ordered[index] = link;
            }
            None => {
                positions.insert(link.name().to_string(), ordered.len());
                ordered.push(link);
            }
        }
    }

    ordered
}

/// Applies link rewrites and installs the outline. Outline pages are validated
/// before the document is touched; any error leaves the caller with nothing to save.
pub fn apply_plan<D: XrefDocument>(document: &mut D, plan: RewritePlan) -> Result<RewriteSummary> {
    let page_count = document.page_count();
    if let Some(forest) = &plan.outline {
        validate_forest(forest, page_count)?;
    }

    for instruction in &plan.instructions {
        document.set_link_target(&instruction.name, instruction.page, &instruction.fit)?;
        info!(
            name = %instruction.name,
            page = instruction.page + 1,
            previous_page = ?instruction.previous_page.map(|page| page + 1),
            fit = %instruction.fit,
            "rewrote link"
        );
    }

    let bookmarks_installed = match plan.outline {
        Some(forest) => {
            document.clear_outline()?;
            install_outline(document, forest, page_count)?
        }
        None => 0,
    };

    Ok(RewriteSummary {
        links_resolved: plan.resolved_count,
        links_rewritten: plan.instructions.len(),
        links_unchanged: plan.unchanged_count,
        links_broken: plan.broken.len(),
        unknown_link_names: plan.unknown_names.len(),
        malformed_lines: plan.diagnostics.len(),
        bookmarks_installed,
    })
}
