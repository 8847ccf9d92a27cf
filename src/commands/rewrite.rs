use std::io::{self, Write};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::cli::RewriteArgs;
use crate::model::{ProblemEntry, RewriteReport};
use crate::pdf::PdfDocument;
use crate::util::{now_utc_string, read_lines, sha256_file, write_json_pretty};
use crate::xref::{ResolutionSession, ResolveOptions, RewritePlan, RewriteSummary, apply_plan};

const REPORT_MANIFEST_VERSION: u32 = 1;

pub fn run(args: RewriteArgs) -> Result<()> {
    let link_lines = read_lines(&args.links)?;
    let input_sha256 = sha256_file(&args.infile)?;
    let mut document = PdfDocument::open(&args.infile)?;

    let mut session = ResolutionSession::new(ResolveOptions {
        fit_to_page: args.fit,
    });
    if let Some(path) = &args.dictionary {
        let entries = session
            .load_dictionary(&read_lines(path)?)
            .with_context(|| format!("failed to load dictionary {}", path.display()))?;
        info!(path = %path.display(), entries, "loaded dictionary");
    }
    if let Some(path) = &args.toc {
        let bookmarks = session
            .load_toc(&read_lines(path)?)
            .with_context(|| format!("failed to load table of contents {}", path.display()))?;
        info!(path = %path.display(), bookmarks, "loaded table of contents");
    }

    let dictionary = session.dictionary();
    if dictionary.is_empty() {
        debug!("no dictionary tokens defined, only page literals will resolve");
    }
    info!(
        tokens = dictionary.len(),
        redefined = dictionary.redefinitions().len(),
        malformed = session.diagnostics().len(),
        "title dictionary ready"
    );

    let plan = session.plan_for(&link_lines, &document)?;
    info!(
        rewrites = plan.instructions.len(),
        broken = plan.broken_count(),
        unknown_names = plan.unknown_name_count(),
        bookmarks = plan.bookmark_count(),
        "planned rewrite"
    );
    let problems = problem_entries(&plan);
    for problem in &problems {
        warn!(
            kind = %problem.kind,
            line_number = problem.line_number,
            message = %problem.message,
            "skipped entry"
        );
    }

    let summary = apply_plan(&mut document, plan)
        .with_context(|| format!("failed to rewrite {}", args.infile.display()))?;

    if args.dry_run {
        info!(outfile = %args.outfile.display(), "dry run, nothing written");
    } else {
        document.save(&args.outfile)?;
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    output.write_all(render_summary(&summary).as_bytes())?;
    if args.verbose {
        for problem in &problems {
            writeln!(
                output,
                "line {}: {} ({})\n\t{}",
                problem.line_number, problem.message, problem.kind, problem.line
            )?;
        }
    }
    output.flush()?;

    if let Some(report_path) = &args.report {
        let written = !args.dry_run;
        let report = RewriteReport {
            manifest_version: REPORT_MANIFEST_VERSION,
            generated_at: now_utc_string(),
            input_path: args.infile.display().to_string(),
            input_sha256,
            output_path: written.then(|| args.outfile.display().to_string()),
            output_sha256: if written {
                Some(sha256_file(&args.outfile)?)
            } else {
                None
            },
            dry_run: args.dry_run,
            counts: summary,
            problems,
        };
        write_json_pretty(report_path, &report)?;
        info!(path = %report_path.display(), "wrote rewrite report");
    }

    Ok(())
}

fn problem_entries(plan: &RewritePlan) -> Vec<ProblemEntry> {
    let mut problems: Vec<ProblemEntry> = plan
        .diagnostics
        .iter()
        .map(ProblemEntry::from_diagnostic)
        .collect();
    let mut skipped: Vec<ProblemEntry> = plan
        .broken
        .iter()
        .map(|problem| ProblemEntry::from_link("broken", problem))
        .chain(
            plan.unknown_names
                .iter()
                .map(|problem| ProblemEntry::from_link("unknown-name", problem)),
        )
        .collect();
    skipped.sort_by_key(|problem| problem.line_number);
    problems.extend(skipped);
    problems
}

fn render_summary(summary: &RewriteSummary) -> String {
    format!(
        "links resolved: {}\n\
         links rewritten: {}\n\
         links unchanged: {}\n\
         links broken: {}\n\
         unknown link names: {}\n\
         malformed lines: {}\n\
         bookmarks installed: {}\n",
        summary.links_resolved,
        summary.links_rewritten,
        summary.links_unchanged,
        summary.links_broken,
        summary.unknown_link_names,
        summary.malformed_lines,
        summary.bookmarks_installed,
    )
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::Utc;

    use super::*;
    use crate::pdf::tests::sample_document;
    use crate::util::ensure_directory;
    use crate::xref::NamedLink;

    fn named(name: &str, page: usize) -> NamedLink {
        NamedLink {
            name: name.to_string(),
            page: Some(page),
            fit: None,
        }
    }

    #[test]
    fn problem_entries_list_malformed_then_skipped_links_by_line() {
        let links = [named("a", 0), named("b", 0)];
        let plan = ResolutionSession::new(ResolveOptions::default())
            .plan(
                &[r#"b "Missing""#, "onlyname", "ghost 2", r#"a "Gone""#],
                &links,
                3,
            )
            .expect("plan builds");

        let problems = problem_entries(&plan);
        let summary: Vec<(&str, usize)> = problems
            .iter()
            .map(|problem| (problem.kind.as_str(), problem.line_number))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("malformed", 2),
                ("broken", 1),
                ("unknown-name", 3),
                ("broken", 4),
            ]
        );
        assert_eq!(problems[2].line, "ghost 2");
    }

    #[test]
    fn summary_lists_every_counter() {
        let summary = RewriteSummary {
            links_resolved: 3,
            links_rewritten: 2,
            links_unchanged: 1,
            links_broken: 4,
            unknown_link_names: 0,
            malformed_lines: 5,
            bookmarks_installed: 7,
        };

        let rendered = render_summary(&summary);
        assert!(rendered.contains("links rewritten: 2\n"));
        assert!(rendered.contains("links broken: 4\n"));
        assert!(rendered.ends_with("bookmarks installed: 7\n"));
        assert_eq!(rendered.lines().count(), 7);
    }

    #[test]
    fn report_hashes_the_input_before_it_is_overwritten() {
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let root = std::env::temp_dir().join(format!(
            "pdfxref_rewrite_{}_{}",
            std::process::id(),
            stamp
        ));
        ensure_directory(&root).expect("temp directory");
        let pdf_path = root.join("planner.pdf");
        let links_path = root.join("links.txt");
        let report_path = root.join("report.json");

        sample_document().save(&pdf_path).expect("sample saves");
        fs::write(&links_path, "intro 4\n").expect("links written");
        let original_sha256 = sha256_file(&pdf_path).expect("input hashes");

        run(RewriteArgs {
            infile: pdf_path.clone(),
            outfile: pdf_path.clone(),
            links: links_path,
            dictionary: None,
            toc: None,
            fit: false,
            verbose: false,
            dry_run: false,
            report: Some(report_path.clone()),
        })
        .expect("rewrite runs");

        let raw = fs::read(&report_path).expect("report read");
        let report: serde_json::Value = serde_json::from_slice(&raw).expect("report parses");
        let rewritten_sha256 = sha256_file(&pdf_path).expect("output hashes");

        assert_ne!(original_sha256, rewritten_sha256);
        assert_eq!(report["input_sha256"], original_sha256.as_str());
        assert_eq!(report["output_sha256"], rewritten_sha256.as_str());
        assert_eq!(report["counts"]["links_rewritten"], 1);

        let _ = fs::remove_dir_all(&root);
    }
}
