use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Read the pattern file: one pattern per line, trimmed, with blank lines and
/// `#` comments skipped.
pub fn read_patterns(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open pattern file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut patterns = Vec::new();
    for line in reader.lines() {
        let line = line.context("Failed to read line from pattern file")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        patterns.push(trimmed.to_string());
    }

    Ok(patterns)
}

/// Read a wordlist: normalize each entry, deduplicate preserving first-seen
/// order, apply the optional regex filter, and stop after `limit` retained
/// entries when set.
pub fn read_wordlist(
    path: &Path,
    regex_filter: Option<&str>,
    case_insensitive: bool,
    limit: Option<usize>,
) -> Result<Vec<String>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open wordlist file: {}", path.display()))?;
    let reader = BufReader::new(file);

    let regex = if let Some(pattern) = regex_filter {
        let mut builder = regex::RegexBuilder::new(pattern);
        builder.case_insensitive(case_insensitive);
        Some(
            builder
                .build()
                .with_context(|| format!("Failed to compile regex: {}", pattern))?,
        )
    } else {
        None
    };

    let mut word_set = HashSet::new();
    let mut words = Vec::new();

    for line in reader.lines() {
        if limit.is_some_and(|n| words.len() >= n) {
            break;
        }

        let line = line.context("Failed to read line from wordlist")?;
        let normalized = normalize_word(&line);

        if normalized.is_empty() {
            continue;
        }

        if let Some(ref re) = regex {
            if !re.is_match(&normalized) {
                continue;
            }
        }

        if word_set.insert(normalized.clone()) {
            words.push(normalized);
        }
    }

    Ok(words)
}

/// Normalize a word: lowercase, trim leading/trailing dots and whitespace
fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase().trim_matches('.').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("  WORD  "), "word");
        assert_eq!(normalize_word(".word."), "word");
        assert_eq!(normalize_word("..WORD.."), "word");
        assert_eq!(normalize_word("...."), "");
        assert_eq!(normalize_word("   "), "");
    }

    #[test]
    fn test_read_wordlist_basic() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "API")?;
        writeln!(temp_file, "  cdn  ")?;
        writeln!(temp_file, ".img.")?;
        writeln!(temp_file, "api")?; // duplicate
        writeln!(temp_file, "")?; // empty
        writeln!(temp_file, "...")?; // only dots

        let words = read_wordlist(temp_file.path(), None, true, None)?;

        assert_eq!(words, vec!["api", "cdn", "img"]);
        Ok(())
    }

    #[test]
    fn test_read_wordlist_with_regex() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "api")?;
        writeln!(temp_file, "cdn")?;
        writeln!(temp_file, "img")?;
        writeln!(temp_file, "test")?;

        let words = read_wordlist(temp_file.path(), Some("^(api|img)$"), true, None)?;

        assert_eq!(words, vec!["api", "img"]);
        Ok(())
    }

    #[test]
    fn test_read_wordlist_truncates_to_prefix() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        for word in ["one", "two", "three", "four"] {
            writeln!(temp_file, "{word}")?;
        }

        let words = read_wordlist(temp_file.path(), None, true, Some(2))?;

        assert_eq!(words, vec!["one", "two"]);
        Ok(())
    }

    #[test]
    fn test_read_wordlist_missing_file_fails() {
        let err = read_wordlist(Path::new("/nonexistent/wordlist.txt"), None, true, None);
        assert!(err.is_err());
    }

    #[test]
    fn test_read_patterns_skips_comments_and_blanks() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "# cloud hosts")?;
        writeln!(temp_file, "host{{fuzz_number}}.example.com")?;
        writeln!(temp_file, "")?;
        writeln!(temp_file, "  {{fuzz_all}}.example.com  ")?;

        let patterns = read_patterns(temp_file.path())?;

        assert_eq!(
            patterns,
            vec!["host{fuzz_number}.example.com", "{fuzz_all}.example.com"]
        );
        Ok(())
    }
}
