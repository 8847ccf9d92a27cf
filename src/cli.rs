use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "pdfxref",
    version,
    about = "Keep named links, bookmarks and notes of a PDF pointing at the right pages"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Rewrite(RewriteArgs),
    Links(LinksArgs),
    Bookmarks(BookmarksArgs),
    Notes(NotesArgs),
    PageLinks(PageLinksArgs),
    Compare(CompareArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RewriteArgs {
    pub infile: PathBuf,

    pub outfile: PathBuf,

    #[arg(long)]
    pub links: PathBuf,

    #[arg(long)]
    pub dictionary: Option<PathBuf>,

    #[arg(long)]
    pub toc: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub fit: bool,

    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct LinksArgs {
    pub infile: PathBuf,

    #[arg(long, default_value_t = false)]
    pub detailed: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct BookmarksArgs {
    pub infile: PathBuf,

    #[arg(long, default_value_t = false, requires_all = ["title", "page", "outfile"])]
    pub add: bool,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub page: Option<usize>,

    #[arg(long)]
    pub outfile: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct NotesArgs {
    pub infile: PathBuf,

    #[arg(long)]
    pub page: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub headers: bool,

    #[arg(long, default_value_t = false)]
    pub detailed: bool,

    #[arg(long)]
    pub toc: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct PageLinksArgs {
    pub infile: PathBuf,

    #[arg(long)]
    pub page: Option<usize>,

    #[arg(long, default_value_t = false)]
    pub resolve: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    pub original: PathBuf,

    pub modified: PathBuf,
}
