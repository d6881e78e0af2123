//! Process output emission.
//!
//! When running under GitHub Actions the report text is appended to the
//! file named by `GITHUB_OUTPUT` using the heredoc form with a random
//! delimiter (multiline-safe). Outside Actions the text goes to stdout.

use std::fs::OpenOptions;
use std::io::Write;

/// Emit a named multiline output.
pub fn set_output(name: &str, value: &str) -> std::io::Result<()> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) => {
            let delimiter = format!("covgate_delimiter_{}", uuid::Uuid::new_v4());
            let block = format!("{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter);
            let mut file = OpenOptions::new().create(true).append(true).open(path)?;
            file.write_all(block.as_bytes())
        }
        None => {
            println!("{}", value);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_github_output_heredoc_block_and_append() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("outputs");
        std::env::set_var("GITHUB_OUTPUT", &path);

        set_output("report", "## Coverage\n\nall checks passed").expect("first write");
        set_output("report", "second run").expect("second write");
        std::env::remove_var("GITHUB_OUTPUT");

        let written = std::fs::read_to_string(&path).expect("read outputs file");
        let mut lines = written.lines();

        let header = lines.next().expect("header line");
        let delimiter = header.strip_prefix("report<<").expect("heredoc header");
        assert!(delimiter.starts_with("covgate_delimiter_"));
        assert_eq!(lines.next(), Some("## Coverage"));
        assert_eq!(lines.next(), Some(""));
        assert_eq!(lines.next(), Some("all checks passed"));
        assert_eq!(lines.next(), Some(delimiter));

        // Second call appends a new block, it must not truncate the file.
        let header = lines.next().expect("second header line");
        let second = header.strip_prefix("report<<").expect("second heredoc header");
        assert_ne!(delimiter, second, "each block gets a fresh delimiter");
        assert_eq!(lines.next(), Some("second run"));
        assert_eq!(lines.next(), Some(second));
        assert_eq!(lines.next(), None);
    }
}
