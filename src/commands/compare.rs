use std::io::{self, Write};
use std::path::Path;

use anyhow::{Result, bail};
use tracing::info;

use crate::cli::CompareArgs;
use crate::pdf::{Bookmark, PdfDocument};
use crate::xref::XrefDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Counts {
    notes: usize,
    bookmarks: usize,
}

fn counts(path: &Path) -> Result<Counts> {
    let document = PdfDocument::open(path)?;
    Ok(Counts {
        notes: document.annotations()?.len(),
        bookmarks: Bookmark::count(&document.bookmarks()?),
    })
}

pub fn run(args: CompareArgs) -> Result<()> {
    let original = counts(&args.original)?;
    let modified = counts(&args.modified)?;

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "notes: {} -> {}", original.notes, modified.notes)?;
    writeln!(
        output,
        "bookmarks: {} -> {}",
        original.bookmarks, modified.bookmarks
    )?;
    output.flush()?;

    if original != modified {
        bail!(
            "{} and {} differ in note or bookmark counts",
            args.original.display(),
            args.modified.display()
        );
    }

    info!("note and bookmark counts match");
    Ok(())
}
