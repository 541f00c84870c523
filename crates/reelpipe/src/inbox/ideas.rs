//! The free-text ideas list.

use std::path::Path;

use crate::error::InboxError;
use crate::storage::filesystem::write_bytes;

pub const IDEAS_HEADER: &str = "\
# One video idea per line.
# Blank lines and lines starting with '#' are ignored.
# Each idea is picked up once, even if it stays in this file.
";

/// Yields the idea lines of `text`, trimmed, skipping blanks and comments.
pub fn idea_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

/// Reads the ideas file. A missing file reads as empty.
pub fn read_ideas_file(path: &Path) -> Result<String, InboxError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(InboxError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Creates the ideas file with its comment header unless it already exists.
pub fn ensure_ideas_file(path: &Path) -> Result<bool, InboxError> {
    if path.exists() {
        return Ok(false);
    }
    write_bytes(path, IDEAS_HEADER.as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idea_lines_skip_comments_and_blanks() {
        let text = "# header\n\n  first idea  \n#another comment\nsecond\n   \n";
        let lines: Vec<_> = idea_lines(text).collect();
        assert_eq!(lines, vec!["first idea", "second"]);
    }

    #[test]
    fn test_header_has_no_ideas() {
        assert_eq!(idea_lines(IDEAS_HEADER).count(), 0);
    }

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_ideas_file(&dir.path().join("none.txt")).unwrap(), "");
    }

    #[test]
    fn test_ensure_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("INBOX").join("ideas.txt");

        assert!(ensure_ideas_file(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), IDEAS_HEADER);

        std::fs::write(&path, "mine\n").unwrap();
        assert!(!ensure_ideas_file(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mine\n");
    }
}
