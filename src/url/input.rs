use std::path::Path;

/// Reads a URL list file, one URL per line
///
/// Blank lines and lines starting with `#` are skipped; surrounding whitespace
/// is trimmed. Order is preserved.
pub fn read_url_list(path: &Path) -> std::io::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)?;
    Ok(parse_url_list(&content))
}

/// Splits URL list text into entries
pub fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}
