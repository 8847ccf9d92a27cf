use thiserror::Error;

use super::PageIndex;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrefError {
    #[error("line {line_number}: expected `<page> <title>`, got {line:?}")]
    MalformedTocLine { line_number: usize, line: String },

    #[error("line {line_number}: expected `<token> <page>`, got {line:?}")]
    MalformedDictionaryLine { line_number: usize, line: String },

    #[error("line {line_number}: expected `<name> <target>`, got {line:?}")]
    MalformedLinkLine { line_number: usize, line: String },

    #[error("unknown token {0:?}")]
    UnknownToken(String),

    #[error("{0:?} is neither a page number nor a known token")]
    UnresolvedReference(String),

    #[error("document has no named link {0:?}")]
    UnknownLinkName(String),

    #[error("{title:?} points at page {} but the document has {page_count} pages", page + 1)]
    PageOutOfRange {
        title: String,
        page: PageIndex,
        page_count: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiagnostic {
    pub line_number: usize,
    pub line: String,
    pub error: XrefError,
}

#[derive(Debug, Clone)]
pub struct Parsed<T> {
    pub entries: Vec<T>,
    pub diagnostics: Vec<LineDiagnostic>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            diagnostics: Vec::new(),
        }
    }
}

impl<T> Parsed<T> {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
