use serde::Serialize;

use crate::xref::{LineDiagnostic, LinkProblem, RewriteSummary};

#[derive(Debug, Clone, Serialize)]
pub struct ProblemEntry {
    pub kind: String,
    pub line_number: usize,
    pub line: String,
    pub message: String,
}

impl ProblemEntry {
    pub fn from_link(kind: &str, problem: &LinkProblem) -> Self {
        Self {
            kind: kind.to_string(),
            line_number: problem.line_number,
            line: problem.line.clone(),
            message: problem.error.to_string(),
        }
    }

    pub fn from_diagnostic(diagnostic: &LineDiagnostic) -> Self {
        Self {
            kind: "malformed".to_string(),
            line_number: diagnostic.line_number,
            line: diagnostic.line.clone(),
            message: diagnostic.error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RewriteReport {
    pub manifest_version: u32,
    pub generated_at: String,
    pub input_path: String,
    pub input_sha256: String,
    pub output_path: Option<String>,
    pub output_sha256: Option<String>,
    pub dry_run: bool,
    pub counts: RewriteSummary,
    pub problems: Vec<ProblemEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LinkListing {
    pub name: String,
    pub page: Option<usize>,
    pub fit: Option<String>,
}
