use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use lopdf::{Document, Object, ObjectId};
use tracing::debug;

use super::objects::{Location, catalog_id, decode_text, follow, name_of, object_at_mut};
use crate::xref::{FitMode, PageIndex};

const MAX_TREE_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub(crate) struct NamedDest {
    pub name: String,
    pub page: Option<PageIndex>,
    pub fit: Option<FitMode>,
    pub location: Location,
}

pub(crate) fn collect_named_dests(
    doc: &Document,
    page_index: &HashMap<ObjectId, PageIndex>,
) -> Result<Vec<NamedDest>> {
    let catalog_id = catalog_id(doc)?;
    let catalog = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .context("document catalog is not a dictionary")?;
    let catalog_at = Location::root(catalog_id);
    let mut dests = Vec::new();

    if let Ok(names) = catalog.get(b"Names") {
        let (names, names_at) = follow(doc, names, catalog_at.key(b"Names"))?;
        if let Ok(tree) = names.as_dict().and_then(|dict| dict.get(b"Dests")) {
            let (tree, tree_at) = follow(doc, tree, names_at.key(b"Dests"))?;
            walk_name_tree(doc, tree, tree_at, 0, page_index, &mut dests)?;
        }
    }

    if let Ok(legacy) = catalog.get(b"Dests") {
        let (legacy, legacy_at) = follow(doc, legacy, catalog_at.key(b"Dests"))?;
        if let Ok(dict) = legacy.as_dict() {
            for (key, value) in dict.iter() {
                let name = String::from_utf8_lossy(key).into_owned();
                push_dest(doc, name, value, legacy_at.key(key), page_index, &mut dests)?;
            }
        }
    }

    Ok(dests)
}

fn walk_name_tree(
    doc: &Document,
    node: &Object,
    at: Location,
    depth: usize,
    page_index: &HashMap<ObjectId, PageIndex>,
    dests: &mut Vec<NamedDest>,
) -> Result<()> {
    if depth > MAX_TREE_DEPTH {
        bail!("name tree deeper than {MAX_TREE_DEPTH} levels");
    }
    let Ok(node) = node.as_dict() else {
        return Ok(());
    };

    if let Ok(names) = node.get(b"Names") {
        let (names, names_at) = follow(doc, names, at.key(b"Names"))?;
        let pairs = names.as_array().context("/Names is not an array")?;
        for index in (0..pairs.len().saturating_sub(1)).step_by(2) {
            let (key, _) = follow(doc, &pairs[index], names_at.index(index))?;
            let Some(name) = decode_text(key) else {
                debug!(index, "skipping name tree key that is not a string");
                continue;
            };
            push_dest(
                doc,
                name,
                &pairs[index + 1],
                names_at.index(index + 1),
                page_index,
                dests,
            )?;
        }
    }

    if let Ok(kids) = node.get(b"Kids") {
        let (kids, kids_at) = follow(doc, kids, at.key(b"Kids"))?;
        let kids = kids.as_array().context("/Kids is not an array")?;
        for (index, kid) in kids.iter().enumerate() {
            let (kid, kid_at) = follow(doc, kid, kids_at.index(index))?;
            walk_name_tree(doc, kid, kid_at, depth + 1, page_index, dests)?;
        }
    }

    Ok(())
}

fn push_dest(
    doc: &Document,
    name: String,
    value: &Object,
    at: Location,
    page_index: &HashMap<ObjectId, PageIndex>,
    dests: &mut Vec<NamedDest>,
) -> Result<()> {
    let (value, at) = follow(doc, value, at)?;
    let (array, location) = match value {
        Object::Array(array) => (array, at),
        Object::Dictionary(dict) => match dict.get(b"D") {
            Ok(inner) => {
                let (inner, inner_at) = follow(doc, inner, at.key(b"D"))?;
                match inner.as_array() {
                    Ok(array) => (array, inner_at),
                    Err(_) => return Ok(()),
                }
            }
            Err(_) => return Ok(()),
        },
        _ => {
            debug!(name = %name, "skipping destination that is neither array nor dictionary");
            return Ok(());
        }
    };

    let (page, fit) = describe_dest(array, page_index);
    dests.push(NamedDest {
        name,
        page,
        fit,
        location,
    });
    Ok(())
}

pub(crate) fn describe_dest(
    array: &[Object],
    page_index: &HashMap<ObjectId, PageIndex>,
) -> (Option<PageIndex>, Option<FitMode>) {
    let page = array
        .first()
        .and_then(|first| first.as_reference().ok())
        .and_then(|id| page_index.get(&id).copied());
    let fit = array.get(1).and_then(name_of).map(fit_mode_from_name);
    (page, fit)
}

fn fit_mode_from_name(name: &[u8]) -> FitMode {
    match name {
        b"Fit" => FitMode::Fit,
        b"XYZ" => FitMode::Exact,
        other => FitMode::Other(String::from_utf8_lossy(other).into_owned()),
    }
}

pub(crate) fn retarget_dest(
    doc: &mut Document,
    dest: &NamedDest,
    page_id: ObjectId,
    fit: &FitMode,
) -> Result<()> {
    let array = object_at_mut(doc, &dest.location)?
        .as_array_mut()
        .with_context(|| format!("destination of {} is not an array", dest.name))?;

    if array.is_empty() {
        array.push(Object::Reference(page_id));
    } else {
        array[0] = Object::Reference(page_id);
    }

    if dest.fit.as_ref() == Some(fit) {
        return Ok(());
    }

    array.truncate(1);
    match fit {
        FitMode::Fit => array.push(Object::Name(b"Fit".to_vec())),
        FitMode::Exact => array.extend([
            Object::Name(b"XYZ".to_vec()),
            Object::Null,
            Object::Null,
            Object::Null,
        ]),
        FitMode::Other(name) => array.push(Object::Name(name.as_bytes().to_vec())),
    }

    Ok(())
}
