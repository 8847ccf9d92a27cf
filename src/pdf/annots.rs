use std::collections::HashMap;

use anyhow::{Context, Result};
use lopdf::{Document, Object, ObjectId};

use super::objects::{Location, decode_text, follow, name_of, rect_of};
use super::outline::resolve_dest_page;
use crate::xref::{PageIndex, RawAnnotation};

#[derive(Debug, Clone, PartialEq)]
pub enum LinkAction {
    External(String),
    Named {
        name: String,
        page: Option<PageIndex>,
    },
    Internal(Option<PageIndex>),
    Unsupported,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinkAnnotation {
    pub page: PageIndex,
    pub rect: Option<[f64; 4]>,
    pub action: LinkAction,
}

fn for_each_annotation<'a>(
    doc: &'a Document,
    page_id: ObjectId,
    mut visit: impl FnMut(&'a lopdf::Dictionary, Location),
) -> Result<()> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .with_context(|| format!("page {} {} R is not a dictionary", page_id.0, page_id.1))?;
    let Ok(annots) = page.get(b"Annots") else {
        return Ok(());
    };

    let (annots, annots_at) = follow(doc, annots, Location::root(page_id).key(b"Annots"))?;
    let annots = annots
        .as_array()
        .with_context(|| format!("/Annots of page {} {} R is not an array", page_id.0, page_id.1))?;

    for (index, annot) in annots.iter().enumerate() {
        let Ok((annot, at)) = follow(doc, annot, annots_at.index(index)) else {
            continue;
        };
        if let Ok(dict) = annot.as_dict() {
            visit(dict, at);
        }
    }

    Ok(())
}

pub(crate) fn note_annotations(doc: &Document, page_ids: &[ObjectId]) -> Result<Vec<RawAnnotation>> {
    let mut notes = Vec::new();

    for (page, page_id) in page_ids.iter().enumerate() {
        for_each_annotation(doc, *page_id, |annot, at| {
            let subtype = annot.get(b"Subtype").ok().and_then(name_of);
            if !matches!(subtype, Some(b"FreeText" | b"Text")) {
                return;
            }

            let content = annot
                .get(b"Contents")
                .ok()
                .and_then(|contents| follow(doc, contents, at.key(b"Contents")).ok())
                .and_then(|(contents, _)| decode_text(contents))
                .unwrap_or_default();
            let rect = annot
                .get(b"Rect")
                .ok()
                .and_then(|rect| rect_of(doc, rect, at.key(b"Rect")));

            notes.push(RawAnnotation {
                page,
                content,
                rect,
            });
        })?;
    }

    Ok(notes)
}

pub(crate) fn link_annotations(
    doc: &Document,
    page_ids: &[ObjectId],
    page_index: &HashMap<ObjectId, PageIndex>,
    named_pages: &HashMap<String, Option<PageIndex>>,
) -> Result<Vec<LinkAnnotation>> {
    let mut links = Vec::new();

    for (page, page_id) in page_ids.iter().enumerate() {
        for_each_annotation(doc, *page_id, |annot, at| {
            if annot.get(b"Subtype").ok().and_then(name_of) != Some(b"Link".as_slice()) {
                return;
            }

            let rect = annot
                .get(b"Rect")
                .ok()
                .and_then(|rect| rect_of(doc, rect, at.key(b"Rect")));
            let action = link_action(doc, annot, &at, page_index, named_pages);
            links.push(LinkAnnotation { page, rect, action });
        })?;
    }

    Ok(links)
}

fn link_action(
    doc: &Document,
    annot: &lopdf::Dictionary,
    at: &Location,
    page_index: &HashMap<ObjectId, PageIndex>,
    named_pages: &HashMap<String, Option<PageIndex>>,
) -> LinkAction {
    let (dest, dest_at) = if let Ok(dest) = annot.get(b"Dest") {
        (dest, at.key(b"Dest"))
    } else {
        let Some((action, action_at)) = annot
            .get(b"A")
            .ok()
            .and_then(|action| follow(doc, action, at.key(b"A")).ok())
        else {
            return LinkAction::Unsupported;
        };
        let Ok(action) = action.as_dict() else {
            return LinkAction::Unsupported;
        };

        match action.get(b"S").ok().and_then(name_of) {
            Some(b"URI") => {
                return action
                    .get(b"URI")
                    .ok()
                    .and_then(decode_text)
                    .map(LinkAction::External)
                    .unwrap_or(LinkAction::Unsupported);
            }
            Some(b"GoTo") => match action.get(b"D") {
                Ok(dest) => (dest, action_at.key(b"D")),
                Err(_) => return LinkAction::Unsupported,
            },
            _ => return LinkAction::Unsupported,
        }
    };

    let Ok((dest, _)) = follow(doc, dest, dest_at.clone()) else {
        return LinkAction::Unsupported;
    };
    match dest {
        Object::String(..) | Object::Name(_) => {
            let name = decode_text(dest).unwrap_or_default();
            let page = named_pages.get(&name).copied().flatten();
            LinkAction::Named { name, page }
        }
        _ => LinkAction::Internal(resolve_dest_page(doc, dest, dest_at, page_index, named_pages)),
    }
}
