use crate::span::Span;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("initialization cycle detected: {}", members.join(" -> "))]
    Cycle { members: Vec<String>, spans: Vec<Span> },

    #[error("Config error: {msg}")]
    Config { msg: String, path: Option<PathBuf> },
}

impl AnalysisError {
    pub fn cycle(members: Vec<String>, spans: Vec<Span>) -> Self {
        Self::Cycle { members, spans }
    }

    pub fn config(msg: impl Into<String>, path: Option<PathBuf>) -> Self {
        Self::Config { msg: msg.into(), path }
    }
}

/// Render an AnalysisError with ariadne for nice terminal output.
///
/// Cycle participants are labeled when their spans fall in `source`;
/// anything else is printed as a plain error line.
pub fn render_error(source: &str, filename: &str, err: &AnalysisError) {
    use ariadne::{Label, Report, ReportKind, Source};

    match err {
        AnalysisError::Cycle { members, spans } if !spans.is_empty() => {
            let mut report = Report::build(ReportKind::Error, (), spans[0].start)
                .with_message(format!("{err} (in {filename})"));
            for (name, span) in members.iter().zip(spans) {
                report = report.with_label(
                    Label::new(span.start..span.end)
                        .with_message(format!("'{name}' is part of the cycle")),
                );
            }
            if let Err(e) = report.finish().eprint(Source::from(source)) {
                eprintln!("error: {err} ({e})");
            }
        }
        AnalysisError::Cycle { .. } => {
            eprintln!("error: {err}");
        }
        AnalysisError::Config { msg, path } => {
            eprintln!("error[config]: {msg}");
            if let Some(path) = path {
                eprintln!("  --> {}", path.display());
            }
        }
    }
}
