use std::io::{self, Write};

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::NotesArgs;
use crate::pdf::{Bookmark, PdfDocument};
use crate::util::{page_option, read_lines};
use crate::xref::{
    PageTitles, RawAnnotation, ResolutionSession, ResolveOptions, XrefDocument,
    group_annotations, page_titles, render_groups,
};

pub fn run(args: NotesArgs) -> Result<()> {
    let document = PdfDocument::open(&args.infile)?;
    let only_page = page_option(args.page)?;

    let notes: Vec<RawAnnotation> = document
        .annotations()?
        .into_iter()
        .filter(|note| only_page.is_none_or(|page| note.page == page))
        .collect();
    info!(notes = notes.len(), "read note annotations");

    let rendered = if args.headers {
        let titles = match &args.toc {
            Some(path) => toc_titles(&read_lines(path)?, document.page_count())?,
            None => outline_titles(&document)?,
        };
        render_groups(&group_annotations(notes, &titles), args.detailed)
    } else {
        render_flat(&notes, args.detailed)
    };

    let mut output = io::BufWriter::new(io::stdout().lock());
    output.write_all(rendered.as_bytes())?;
    output.flush()?;
    Ok(())
}

fn toc_titles<S: AsRef<str>>(lines: &[S], page_count: usize) -> Result<PageTitles> {
    let mut session = ResolutionSession::new(ResolveOptions::default());
    session.load_toc(lines)?;
    let plan = session.plan(&[] as &[&str], &[], page_count)?;
    if !plan.diagnostics.is_empty() {
        warn!(lines = plan.diagnostics.len(), "table of contents has malformed lines");
    }
    Ok(plan.page_titles)
}

fn outline_titles(document: &PdfDocument) -> Result<PageTitles> {
    Ok(page_titles(&Bookmark::to_forest(&document.bookmarks()?)))
}

fn render_flat(notes: &[RawAnnotation], detailed: bool) -> String {
    let mut out = String::new();
    for note in notes {
        if detailed {
            out.push_str(&format!("{} ", note.page + 1));
        }
        out.push_str(&note.content);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toc_titles_keep_the_last_title_per_page() {
        let titles = toc_titles(&["2 Intro", "  2 Detail", "oops", "5 End"], 10)
            .expect("titles build");

        assert_eq!(titles.len(), 2);
        assert_eq!(titles.get(&1).map(String::as_str), Some("Detail"));
        assert_eq!(titles.get(&4).map(String::as_str), Some("End"));
    }

    #[test]
    fn render_flat_prefixes_pages_when_detailed() {
        let notes = vec![
            RawAnnotation {
                page: 0,
                content: "first".to_string(),
                rect: None,
            },
            RawAnnotation {
                page: 4,
                content: "second".to_string(),
                rect: None,
            },
        ];

        assert_eq!(render_flat(&notes, false), "first\nsecond\n");
        assert_eq!(render_flat(&notes, true), "1 first\n5 second\n");
    }
}
