use anyhow::{Context, Result, bail};
use lopdf::{Document, Object, ObjectId, StringFormat};

const MAX_REFERENCE_HOPS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Step {
    Key(Vec<u8>),
    Index(usize),
}

/// Where a direct object lives: the enclosing indirect object plus the
/// dictionary keys and array indices leading to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Location {
    pub object: ObjectId,
    pub path: Vec<Step>,
}

impl Location {
    pub fn root(object: ObjectId) -> Self {
        Self {
            object,
            path: Vec::new(),
        }
    }

    pub fn key(&self, key: &[u8]) -> Self {
        let mut next = self.clone();
        next.path.push(Step::Key(key.to_vec()));
        next
    }

    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.path.push(Step::Index(index));
        next
    }
}

pub(crate) fn follow<'a>(
    doc: &'a Document,
    object: &'a Object,
    at: Location,
) -> Result<(&'a Object, Location)> {
    let mut current = object;
    let mut location = at;

    for _ in 0..MAX_REFERENCE_HOPS {
        match current {
            Object::Reference(id) => {
                current = doc
                    .get_object(*id)
                    .with_context(|| format!("dangling reference {} {} R", id.0, id.1))?;
                location = Location::root(*id);
            }
            _ => return Ok((current, location)),
        }
    }

    bail!(
        "reference chain longer than {MAX_REFERENCE_HOPS} hops at object {} {} R",
        location.object.0,
        location.object.1
    )
}

pub(crate) fn object_at_mut<'a>(doc: &'a mut Document, location: &Location) -> Result<&'a mut Object> {
    let mut current = doc.get_object_mut(location.object).with_context(|| {
        format!(
            "missing object {} {} R",
            location.object.0, location.object.1
        )
    })?;

    for step in &location.path {
        current = match step {
            Step::Key(key) => current
                .as_dict_mut()
                .context("expected a dictionary")?
                .get_mut(key)
                .with_context(|| format!("missing key /{}", String::from_utf8_lossy(key)))?,
            Step::Index(index) => current
                .as_array_mut()
                .context("expected an array")?
                .get_mut(*index)
                .with_context(|| format!("missing array element {index}"))?,
        };
    }

    Ok(current)
}

pub(crate) fn catalog_id(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .context("document trailer has no /Root reference")
}

pub(crate) fn name_of(object: &Object) -> Option<&[u8]> {
    match object {
        Object::Name(name) => Some(name.as_slice()),
        _ => None,
    }
}

pub(crate) fn number_of(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

pub(crate) fn rect_of(doc: &Document, object: &Object, at: Location) -> Option<[f64; 4]> {
    let (object, _) = follow(doc, object, at).ok()?;
    let values: Vec<f64> = object.as_array().ok()?.iter().filter_map(number_of).collect();
    match values.as_slice() {
        [left, bottom, right, top] => Some([*left, *bottom, *right, *top]),
        _ => None,
    }
}

pub(crate) fn decode_text(object: &Object) -> Option<String> {
    let bytes = match object {
        Object::String(bytes, _) => bytes.as_slice(),
        Object::Name(bytes) => bytes.as_slice(),
        _ => return None,
    };

    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&units));
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Some(text.to_string()),
        Err(_) => Some(bytes.iter().map(|&byte| byte as char).collect()),
    }
}

pub(crate) fn encode_text(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }

    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}
