use std::fmt;

use anyhow::Result;

use super::PageIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FitMode {
    Fit,
    Exact,
    Other(String),
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fit => f.write_str("fit"),
            Self::Exact => f.write_str("exact"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedLink {
    pub name: String,
    pub page: Option<PageIndex>,
    pub fit: Option<FitMode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnotation {
    pub page: PageIndex,
    pub content: String,
    pub rect: Option<[f64; 4]>,
}

pub trait OutlineSink {
    type Handle: Copy;

    fn clear_outline(&mut self) -> Result<()>;

    fn create_outline_entry(
        &mut self,
        parent: Option<Self::Handle>,
        title: &str,
        page: PageIndex,
    ) -> Result<Self::Handle>;
}

pub trait XrefDocument: OutlineSink {
    fn page_count(&self) -> usize;

    fn named_links(&self) -> Result<Vec<NamedLink>>;

    fn set_link_target(&mut self, name: &str, page: PageIndex, fit: &FitMode) -> Result<()>;

    fn annotations(&self) -> Result<Vec<RawAnnotation>>;
}
