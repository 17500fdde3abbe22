//! Result table layout per probe kind

use crate::probe::{Outcome, ProbeFailure, ProbeKind, ProbeReport};

const STATUS_HEADER: &[&str] = &["Original URL", "Status"];
const REDIRECT_HEADER: &[&str] = &["Original URL", "Redirected", "Final URL"];
const SCHEME_HEADER: &[&str] = &["Original URL", "Scheme Status", "Normalized URL"];
const CLASSIFY_HEADER: &[&str] = &["Original URL", "Sector", "Confidence"];
const DUMMY_HEADER: &[&str] = &["Original URL", "Dummy Page", "Matched Keyword"];

/// Header row for a probe kind
pub fn header(kind: ProbeKind) -> &'static [&'static str] {
    match kind {
        ProbeKind::Status => STATUS_HEADER,
        ProbeKind::Redirect => REDIRECT_HEADER,
        ProbeKind::Scheme => SCHEME_HEADER,
        ProbeKind::Classify => CLASSIFY_HEADER,
        ProbeKind::Dummy => DUMMY_HEADER,
    }
}

/// One table row for a report; always as wide as `header(kind)`
pub fn row(kind: ProbeKind, report: &ProbeReport) -> Vec<String> {
    let original = report.task.original().to_string();

    match &report.result {
        Ok(outcome) => {
            let mut cells = vec![original];
            cells.extend(outcome_cells(outcome));
            cells.resize(header(kind).len(), String::new());
            cells
        }
        Err(failure) => failure_row(kind, original, failure),
    }
}

fn outcome_cells(outcome: &Outcome) -> Vec<String> {
    match outcome {
        Outcome::Status { code } => vec![code.to_string()],
        Outcome::Redirect {
            redirected,
            final_url,
            ..
        } => vec![yes_no(*redirected), final_url.clone()],
        Outcome::Scheme {
            had_scheme,
            normalized,
        } => {
            let status = if *had_scheme {
                "with scheme"
            } else {
                "without scheme"
            };
            vec![status.to_string(), normalized.clone()]
        }
        Outcome::Classify { sector, confidence } => {
            vec![sector.clone(), format!("{:.2}", confidence)]
        }
        Outcome::Dummy { is_dummy, matched } => {
            vec![yes_no(*is_dummy), matched.clone().unwrap_or_default()]
        }
    }
}

/// Failed URLs carry their error kind where the value would be
fn failure_row(kind: ProbeKind, original: String, failure: &ProbeFailure) -> Vec<String> {
    if header(kind).len() == 2 {
        vec![
            original,
            format!("error ({}): {}", failure.kind, failure.message),
        ]
    } else {
        vec![
            original,
            format!("error ({})", failure.kind),
            failure.message.clone(),
        ]
    }
}

fn yes_no(flag: bool) -> String {
    if flag { "yes" } else { "no" }.to_string()
}
