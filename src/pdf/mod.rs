mod annots;
mod dests;
mod objects;
mod outline;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use lopdf::{Document, ObjectId};
use tracing::{debug, info};

use crate::xref::{FitMode, NamedLink, OutlineSink, PageIndex, RawAnnotation, XrefDocument};

pub use annots::{LinkAction, LinkAnnotation};
pub use outline::Bookmark;

use dests::{NamedDest, collect_named_dests, retarget_dest};
use objects::encode_text;
use outline::{OutlineReader, append_outline_item, ensure_outline_root, remove_outline};

pub struct PdfDocument {
    inner: Document,
    page_ids: Vec<ObjectId>,
    page_index: HashMap<ObjectId, PageIndex>,
    outline_root: Option<ObjectId>,
    outline_removed: bool,
    dest_index: Option<HashMap<String, NamedDest>>,
}

impl PdfDocument {
    pub fn open(path: &Path) -> Result<Self> {
        let inner =
            Document::load(path).with_context(|| format!("failed to open {}", path.display()))?;
        let document = Self::from_document(inner);
        info!(path = %path.display(), pages = document.page_ids.len(), "opened pdf");
        Ok(document)
    }

    pub fn from_document(inner: Document) -> Self {
        let page_ids: Vec<ObjectId> = inner.get_pages().into_values().collect();
        let page_index = page_ids
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, index))
            .collect();

        Self {
            inner,
            page_ids,
            page_index,
            outline_root: None,
            outline_removed: false,
            dest_index: None,
        }
    }

    pub fn save(&mut self, path: &Path) -> Result<()> {
        if self.outline_removed {
            let pruned = self.inner.prune_objects();
            debug!(objects = pruned.len(), "pruned unreachable objects");
        }

        self.inner
            .save(path)
            .with_context(|| format!("failed to save {}", path.display()))?;
        info!(path = %path.display(), "saved pdf");
        Ok(())
    }

    pub fn bookmarks(&self) -> Result<Vec<Bookmark>> {
        let named_pages = self.named_pages()?;
        OutlineReader::new(&self.inner, &self.page_index, &named_pages).read()
    }

    pub fn link_annotations(&self) -> Result<Vec<LinkAnnotation>> {
        let named_pages = self.named_pages()?;
        annots::link_annotations(&self.inner, &self.page_ids, &self.page_index, &named_pages)
    }

    fn named_dests(&self) -> Result<Vec<NamedDest>> {
        collect_named_dests(&self.inner, &self.page_index)
    }

    fn dest_index(&mut self) -> Result<&mut HashMap<String, NamedDest>> {
        if self.dest_index.is_none() {
            let mut index = HashMap::new();
            for dest in self.named_dests()? {
                index.entry(dest.name.clone()).or_insert(dest);
            }
            debug!(dests = index.len(), "indexed named destinations");
            self.dest_index = Some(index);
        }
        self.dest_index
            .as_mut()
            .context("named destination index missing")
    }

    fn named_pages(&self) -> Result<HashMap<String, Option<PageIndex>>> {
        Ok(self
            .named_dests()?
            .into_iter()
            .map(|dest| (dest.name, dest.page))
            .collect())
    }

    fn page_id(&self, page: PageIndex) -> Result<ObjectId> {
        self.page_ids.get(page).copied().with_context(|| {
            format!(
                "page {} is outside a {}-page document",
                page + 1,
                self.page_ids.len()
            )
        })
    }
}

impl OutlineSink for PdfDocument {
    type Handle = ObjectId;

    fn clear_outline(&mut self) -> Result<()> {
        if remove_outline(&mut self.inner)? {
            debug!("removed existing outline");
            self.outline_removed = true;
        }
        self.outline_root = None;
        Ok(())
    }

    fn create_outline_entry(
        &mut self,
        parent: Option<ObjectId>,
        title: &str,
        page: PageIndex,
    ) -> Result<ObjectId> {
        let page_id = self.page_id(page)?;
        let root = match self.outline_root {
            Some(root) => root,
            None => {
                let root = ensure_outline_root(&mut self.inner)?;
                self.outline_root = Some(root);
                root
            }
        };

        append_outline_item(
            &mut self.inner,
            root,
            parent.unwrap_or(root),
            encode_text(title),
            page_id,
        )
    }
}

impl XrefDocument for PdfDocument {
    fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn named_links(&self) -> Result<Vec<NamedLink>> {
        Ok(self
            .named_dests()?
            .into_iter()
            .map(|dest| NamedLink {
                name: dest.name,
                page: dest.page,
                fit: dest.fit,
            })
            .collect())
    }

    fn set_link_target(&mut self, name: &str, page: PageIndex, fit: &FitMode) -> Result<()> {
        let page_id = self.page_id(page)?;
        let mut dest = self
            .dest_index()?
            .remove(name)
            .with_context(|| format!("document has no named destination {name:?}"))?;

        let retargeted = retarget_dest(&mut self.inner, &dest, page_id, fit);
        if retargeted.is_ok() {
            dest.page = Some(page);
            dest.fit = Some(fit.clone());
        }
        self.dest_index()?.insert(name.to_string(), dest);
        retargeted
    }

    fn annotations(&self) -> Result<Vec<RawAnnotation>> {
        annots::note_annotations(&self.inner, &self.page_ids)
    }
}
