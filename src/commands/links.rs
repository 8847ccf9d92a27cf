use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::cli::LinksArgs;
use crate::model::LinkListing;
use crate::pdf::PdfDocument;
use crate::xref::{NamedLink, XrefDocument};

pub fn run(args: LinksArgs) -> Result<()> {
    let document = PdfDocument::open(&args.infile)?;
    let mut links = document.named_links()?;
    links.sort_by(|left, right| left.name.cmp(&right.name));
    info!(links = links.len(), "read named links");

    let mut output = io::BufWriter::new(io::stdout().lock());
    if args.json {
        let listing: Vec<LinkListing> = links.iter().map(listing).collect();
        serde_json::to_writer_pretty(&mut output, &listing)?;
        writeln!(output)?;
    } else {
        for link in &links {
            writeln!(output, "{}", render_link(link, args.detailed))?;
        }
    }
    output.flush()?;

    Ok(())
}

fn listing(link: &NamedLink) -> LinkListing {
    LinkListing {
        name: link.name.clone(),
        page: link.page.map(|page| page + 1),
        fit: link.fit.as_ref().map(ToString::to_string),
    }
}

fn render_link(link: &NamedLink, detailed: bool) -> String {
    let page = match link.page {
        Some(page) => (page + 1).to_string(),
        None => "broken".to_string(),
    };
    match (&link.fit, detailed) {
        (Some(fit), true) => format!("{} {page} {fit}", link.name),
        _ => format!("{} {page}", link.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xref::FitMode;

    #[test]
    fn render_link_uses_one_based_pages() {
        let link = NamedLink {
            name: "intro".to_string(),
            page: Some(0),
            fit: Some(FitMode::Fit),
        };

        assert_eq!(render_link(&link, false), "intro 1");
        assert_eq!(render_link(&link, true), "intro 1 fit");
        assert_eq!(listing(&link).page, Some(1));
    }

    #[test]
    fn render_link_marks_unresolved_destinations() {
        let link = NamedLink {
            name: "lost".to_string(),
            page: None,
            fit: None,
        };

        assert_eq!(render_link(&link, true), "lost broken");
    }
}
