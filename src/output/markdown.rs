//! Markdown summary generation

use crate::output::stats::BatchSummary;
use crate::output::traits::SinkResult;
use chrono::Utc;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown summary of a batch to `output_path`
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(SinkError)` - Failed to write summary
pub fn generate_markdown_summary(summary: &BatchSummary, output_path: &Path) -> SinkResult<()> {
    let markdown = format_markdown_summary(summary);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;
    file.sync_all()?;

    Ok(())
}

/// Formats a batch summary as markdown
pub fn format_markdown_summary(summary: &BatchSummary) -> String {
    let mut md = String::new();

    md.push_str("# URL Check Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Check**: {}\n", summary.kind));
    md.push_str(&format!("- **Generated**: {}\n", Utc::now().to_rfc3339()));
    md.push_str(&format!(
        "- **Duration**: {:.2} seconds\n",
        summary.elapsed.as_secs_f64()
    ));
    md.push_str(&format!("- **Final State**: {}\n", summary.state));
    if summary.cancelled {
        md.push_str("- **Cancelled**: yes\n");
    }
    if let Some(hash) = &summary.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    if let Some(output) = &summary.output {
        md.push_str(&format!("- **Output**: {}\n", output));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **URLs**: {}\n", summary.total));
    md.push_str(&format!("- **Completed**: {}\n", summary.completed));
    md.push_str(&format!("- **Abandoned**: {}\n", summary.abandoned));
    md.push_str(&format!("- **Failed**: {}\n", summary.failed_total()));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        summary.success_rate()
    ));

    if !summary.succeeded.is_empty() {
        md.push_str("## Results\n\n");
        md.push_str("| Result | Count |\n");
        md.push_str("|--------|-------|\n");
        for (label, count) in &summary.succeeded {
            md.push_str(&format!("| {} | {} |\n", label, count));
        }
        md.push('\n');
    }

    if !summary.failed.is_empty() {
        md.push_str("## Failures\n\n");
        md.push_str("| Error Kind | Count |\n");
        md.push_str("|------------|-------|\n");
        for (kind, count) in &summary.failed {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    md
}
