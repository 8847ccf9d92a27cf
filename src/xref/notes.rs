use std::collections::HashMap;
use std::fmt::Write as _;

use super::{PageIndex, PageTitles, RawAnnotation};

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationGroup {
    pub page: PageIndex,
    pub label: String,
    pub titled: bool,
    pub annotations: Vec<RawAnnotation>,
}

pub fn group_annotations(
    annotations: Vec<RawAnnotation>,
    titles: &PageTitles,
) -> Vec<AnnotationGroup> {
    let mut groups: Vec<AnnotationGroup> = Vec::new();
    let mut by_page: HashMap<PageIndex, usize> = HashMap::new();

    for annotation in annotations {
        let index = *by_page.entry(annotation.page).or_insert_with(|| {
            let (label, titled) = match titles.get(&annotation.page) {
                Some(title) => (title.clone(), true),
                None => ((annotation.page + 1).to_string(), false),
            };
            groups.push(AnnotationGroup {
                page: annotation.page,
                label,
                titled,
                annotations: Vec::new(),
            });
            groups.len() - 1
        });
        groups[index].annotations.push(annotation);
    }

    groups.sort_by_key(|group| group.page);
    groups
}

pub fn render_groups(groups: &[AnnotationGroup], detailed: bool) -> String {
    let mut out = String::new();

    for group in groups {
        if !out.is_empty() {
            out.push('\n');
        }
        if group.titled {
            let _ = writeln!(out, "{} (page {})", group.label, group.page + 1);
        } else {
            let _ = writeln!(out, "Page {}", group.label);
        }

        for annotation in &group.annotations {
            match (detailed, annotation.rect) {
                (true, Some([x0, y0, x1, y1])) => {
                    let _ = writeln!(out, "{x0} {y0} {x1} {y1} {}", annotation.content);
                }
                _ => {
                    let _ = writeln!(out, "{}", annotation.content);
                }
            }
        }
    }

    out
}
