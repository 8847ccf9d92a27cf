use std::collections::BTreeMap;

use anyhow::Result;
use tracing::debug;

use super::{OutlineNode, OutlineSink, PageIndex, XrefError, preorder};

/// Page -> bookmark title; when several titles share a page the last one in
/// pre-order wins.
pub type PageTitles = BTreeMap<PageIndex, String>;

pub fn page_titles(forest: &[OutlineNode]) -> PageTitles {
    let mut titles = PageTitles::new();
    for (_, node) in preorder(forest) {
        titles.insert(node.page, node.title.clone());
    }
    titles
}

pub fn validate_forest(forest: &[OutlineNode], page_count: usize) -> Result<(), XrefError> {
    match preorder(forest)
        .into_iter()
        .find(|(_, node)| node.page >= page_count)
    {
        Some((_, node)) => Err(XrefError::PageOutOfRange {
            title: node.title.clone(),
            page: node.page,
            page_count,
        }),
        None => Ok(()),
    }
}

pub fn install_outline<S: OutlineSink>(
    sink: &mut S,
    forest: Vec<OutlineNode>,
    page_count: usize,
) -> Result<usize> {
    let mut installed = 0;
    for node in forest {
        install_node(sink, None, node, page_count, &mut installed)?;
    }
    Ok(installed)
}

fn install_node<S: OutlineSink>(
    sink: &mut S,
    parent: Option<S::Handle>,
    node: OutlineNode,
    page_count: usize,
    installed: &mut usize,
) -> Result<()> {
    if node.page >= page_count {
        return Err(XrefError::PageOutOfRange {
            title: node.title,
            page: node.page,
            page_count,
        }
        .into());
    }

    let handle = sink.create_outline_entry(parent, &node.title, node.page)?;
    *installed += 1;
    debug!(title = %node.title, page = node.page + 1, "installed bookmark");

    for child in node.children {
        install_node(sink, Some(handle), child, page_count, installed)?;
    }

    Ok(())
}
