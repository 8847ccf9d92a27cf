use std::io::{self, Write};

use anyhow::Result;
use tracing::info;

use crate::cli::PageLinksArgs;
use crate::pdf::{LinkAction, LinkAnnotation, PdfDocument};
use crate::util::page_option;

pub fn run(args: PageLinksArgs) -> Result<()> {
    let document = PdfDocument::open(&args.infile)?;
    let only_page = page_option(args.page)?;

    let links: Vec<LinkAnnotation> = document
        .link_annotations()?
        .into_iter()
        .filter(|link| only_page.is_none_or(|page| link.page == page))
        .collect();
    info!(links = links.len(), "read link annotations");

    let mut output = io::BufWriter::new(io::stdout().lock());
    for link in &links {
        writeln!(output, "{}", render_link(link, args.resolve))?;
    }
    output.flush()?;
    Ok(())
}

fn one_based(page: Option<usize>) -> String {
    page.map(|page| (page + 1).to_string())
        .unwrap_or_else(|| "?".to_string())
}

fn render_link(link: &LinkAnnotation, resolve: bool) -> String {
    let rect = match link.rect {
        Some([x0, y0, x1, y1]) => format!("{x0} {y0} {x1} {y1}"),
        None => "- - - -".to_string(),
    };
    let target = match &link.action {
        LinkAction::External(uri) => format!("external {uri}"),
        LinkAction::Named { name, page } if resolve => {
            format!("internal {name} {}", one_based(*page))
        }
        LinkAction::Named { name, .. } => format!("internal {name}"),
        LinkAction::Internal(page) => format!("internal {}", one_based(*page)),
        LinkAction::Unsupported => "unsupported".to_string(),
    };
    format!("{} {rect} {target}", link.page + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_link_shows_resolved_page_only_on_request() {
        let link = LinkAnnotation {
            page: 1,
            rect: Some([0.0, 0.0, 50.0, 10.0]),
            action: LinkAction::Named {
                name: "index".to_string(),
                page: Some(2),
            },
        };

        assert_eq!(render_link(&link, false), "2 0 0 50 10 internal index");
        assert_eq!(render_link(&link, true), "2 0 0 50 10 internal index 3");
    }

    #[test]
    fn render_link_prints_external_targets() {
        let link = LinkAnnotation {
            page: 0,
            rect: None,
            action: LinkAction::External("https://example.org".to_string()),
        };

        assert_eq!(render_link(&link, true), "1 - - - - external https://example.org");
    }
}
