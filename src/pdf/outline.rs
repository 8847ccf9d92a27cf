use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use lopdf::{Document, Object, ObjectId, dictionary};

use super::dests::describe_dest;
use super::objects::{Location, catalog_id, decode_text, follow, name_of};
use crate::xref::{OutlineNode, PageIndex};

const MAX_OUTLINE_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bookmark {
    pub title: String,
    pub page: Option<PageIndex>,
    pub children: Vec<Bookmark>,
}

impl Bookmark {
    pub fn count(bookmarks: &[Bookmark]) -> usize {
        bookmarks
            .iter()
            .map(|bookmark| 1 + Self::count(&bookmark.children))
            .sum()
    }

    pub fn to_forest(bookmarks: &[Bookmark]) -> Vec<OutlineNode> {
        let mut forest = Vec::new();
        for bookmark in bookmarks {
            let children = Self::to_forest(&bookmark.children);
            match bookmark.page {
                Some(page) => {
                    forest.push(OutlineNode::new(bookmark.title.clone(), page).with_children(children))
                }
                None => forest.extend(children),
            }
        }
        forest
    }
}

pub(crate) struct OutlineReader<'a> {
    doc: &'a Document,
    page_index: &'a HashMap<ObjectId, PageIndex>,
    named_pages: &'a HashMap<String, Option<PageIndex>>,
    visited: HashSet<ObjectId>,
}

impl<'a> OutlineReader<'a> {
    pub fn new(
        doc: &'a Document,
        page_index: &'a HashMap<ObjectId, PageIndex>,
        named_pages: &'a HashMap<String, Option<PageIndex>>,
    ) -> Self {
        Self {
            doc,
            page_index,
            named_pages,
            visited: HashSet::new(),
        }
    }

    pub fn read(mut self) -> Result<Vec<Bookmark>> {
        let doc = self.doc;
        let catalog = doc
            .get_object(catalog_id(doc)?)
            .and_then(Object::as_dict)
            .context("document catalog is not a dictionary")?;

        let Ok(Object::Reference(root_id)) = catalog.get(b"Outlines") else {
            return Ok(Vec::new());
        };
        let root = doc
            .get_object(*root_id)
            .and_then(Object::as_dict)
            .context("/Outlines is not a dictionary")?;

        match root.get(b"First").and_then(Object::as_reference) {
            Ok(first) => self.read_siblings(first, 0),
            Err(_) => Ok(Vec::new()),
        }
    }

    fn read_siblings(&mut self, first: ObjectId, depth: usize) -> Result<Vec<Bookmark>> {
        let mut bookmarks = Vec::new();
        if depth >= MAX_OUTLINE_DEPTH {
            return Ok(bookmarks);
        }

        let doc = self.doc;
        let mut next = Some(first);
        while let Some(id) = next {
            if !self.visited.insert(id) {
                break;
            }
            let item = doc
                .get_object(id)
                .and_then(Object::as_dict)
                .with_context(|| format!("outline item {} {} R is not a dictionary", id.0, id.1))?;

            let title = item
                .get(b"Title")
                .ok()
                .and_then(|title| follow(doc, title, Location::root(id)).ok())
                .and_then(|(title, _)| decode_text(title))
                .unwrap_or_default();
            let page = self.item_page(item, id);
            let children = match item.get(b"First").and_then(Object::as_reference) {
                Ok(child) => self.read_siblings(child, depth + 1)?,
                Err(_) => Vec::new(),
            };

            bookmarks.push(Bookmark {
                title,
                page,
                children,
            });
            next = item.get(b"Next").and_then(Object::as_reference).ok();
        }

        Ok(bookmarks)
    }

    fn item_page(&self, item: &lopdf::Dictionary, id: ObjectId) -> Option<PageIndex> {
        let at = Location::root(id);
        if let Ok(dest) = item.get(b"Dest") {
            return self.dest_page(dest, at.key(b"Dest"));
        }

        let (action, action_at) = follow(self.doc, item.get(b"A").ok()?, at.key(b"A")).ok()?;
        let action = action.as_dict().ok()?;
        if action.get(b"S").ok().and_then(name_of) != Some(b"GoTo".as_slice()) {
            return None;
        }
        self.dest_page(action.get(b"D").ok()?, action_at.key(b"D"))
    }

    fn dest_page(&self, dest: &Object, at: Location) -> Option<PageIndex> {
        resolve_dest_page(self.doc, dest, at, self.page_index, self.named_pages)
    }
}

pub(crate) fn resolve_dest_page(
    doc: &Document,
    dest: &Object,
    at: Location,
    page_index: &HashMap<ObjectId, PageIndex>,
    named_pages: &HashMap<String, Option<PageIndex>>,
) -> Option<PageIndex> {
    let (dest, _) = follow(doc, dest, at).ok()?;
    match dest {
        Object::Array(array) => describe_dest(array, page_index).0,
        Object::String(..) | Object::Name(_) => {
            let name = decode_text(dest)?;
            named_pages.get(&name).copied().flatten()
        }
        _ => None,
    }
}

pub(crate) fn ensure_outline_root(doc: &mut Document) -> Result<ObjectId> {
    let catalog_id = catalog_id(doc)?;
    let existing = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .context("document catalog is not a dictionary")?
        .get(b"Outlines")
        .ok()
        .cloned();

    let root = match existing {
        Some(Object::Reference(id)) => return Ok(id),
        Some(Object::Dictionary(dict)) => doc.add_object(dict),
        _ => doc.add_object(dictionary! {
            "Type" => "Outlines",
            "Count" => 0i64,
        }),
    };

    doc.get_object_mut(catalog_id)
        .and_then(Object::as_dict_mut)
        .context("document catalog is not a dictionary")?
        .set("Outlines", root);
    Ok(root)
}

pub(crate) fn remove_outline(doc: &mut Document) -> Result<bool> {
    let catalog_id = catalog_id(doc)?;
    let removed = doc
        .get_object_mut(catalog_id)
        .and_then(Object::as_dict_mut)
        .context("document catalog is not a dictionary")?
        .remove(b"Outlines");
    Ok(removed.is_some())
}

pub(crate) fn append_outline_item(
    doc: &mut Document,
    root: ObjectId,
    parent: ObjectId,
    title: Object,
    page_id: ObjectId,
) -> Result<ObjectId> {
    let previous = doc
        .get_object(parent)
        .and_then(Object::as_dict)
        .context("outline parent is not a dictionary")?
        .get(b"Last")
        .and_then(Object::as_reference)
        .ok();

    let mut item = dictionary! {
        "Title" => title,
        "Parent" => parent,
        "Dest" => vec![
            Object::Reference(page_id),
            Object::Name(b"XYZ".to_vec()),
            Object::Null,
            Object::Null,
            Object::Null,
        ],
    };
    if let Some(previous) = previous {
        item.set("Prev", previous);
    }
    let item_id = doc.add_object(item);

    if let Some(previous) = previous {
        doc.get_object_mut(previous)
            .and_then(Object::as_dict_mut)
            .context("previous outline item is not a dictionary")?
            .set("Next", item_id);
    }

    let parent_dict = doc
        .get_object_mut(parent)
        .and_then(Object::as_dict_mut)
        .context("outline parent is not a dictionary")?;
    if previous.is_none() {
        parent_dict.set("First", item_id);
    }
    parent_dict.set("Last", item_id);

    // Nested items stay collapsed: the root counts visible items, parents a negative total.
    let count = parent_dict
        .get(b"Count")
        .ok()
        .and_then(|count| count.as_i64().ok())
        .unwrap_or(0);
    let count = if parent == root { count + 1 } else { count - 1 };
    parent_dict.set("Count", count);

    Ok(item_id)
}
