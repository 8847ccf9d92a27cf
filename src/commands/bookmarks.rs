use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::BookmarksArgs;
use crate::pdf::{Bookmark, PdfDocument};
use crate::util::page_option;
use crate::xref::{OutlineNode, XrefDocument, install_outline};

pub fn run(args: BookmarksArgs) -> Result<()> {
    let mut document = PdfDocument::open(&args.infile)?;

    if args.add {
        let title = args.title.context("--add needs --title")?;
        let page = page_option(args.page)?.context("--add needs --page")?;
        let outfile = args.outfile.context("--add needs --outfile")?;

        let page_count = document.page_count();
        install_outline(&mut document, vec![OutlineNode::new(title.clone(), page)], page_count)?;
        document.save(&outfile)?;
        info!(title = %title, page = page + 1, outfile = %outfile.display(), "added bookmark");
        return Ok(());
    }

    let bookmarks = document.bookmarks()?;
    info!(bookmarks = Bookmark::count(&bookmarks), "read outline");

    let mut output = io::BufWriter::new(io::stdout().lock());
    output.write_all(render_bookmarks(&bookmarks).as_bytes())?;
    output.flush()?;
    Ok(())
}

fn render_bookmarks(bookmarks: &[Bookmark]) -> String {
    let mut out = String::new();
    let mut stack: Vec<(usize, &Bookmark)> = bookmarks.iter().rev().map(|b| (0, b)).collect();

    while let Some((level, bookmark)) = stack.pop() {
        let page = bookmark
            .page
            .map(|page| (page + 1).to_string())
            .unwrap_or_else(|| "?".to_string());
        out.push_str(&"  ".repeat(level));
        out.push_str(&format!("{} - {page}\n", bookmark.title));
        stack.extend(bookmark.children.iter().rev().map(|child| (level + 1, child)));
    }

    out
}
