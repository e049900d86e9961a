use anyhow::{Context, Result, bail};
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

/// Public resolver list maintained by Trickest.
pub const DEFAULT_RESOLVERS_URL: &str =
    "https://raw.githubusercontent.com/trickest/resolvers/refs/heads/main/resolvers.txt";

/// Make sure a usable resolver file exists at `path`, downloading and cleaning
/// the public list when it does not. An existing file with at least one usable
/// entry is reused as-is. Returns the number of resolver entries.
pub fn ensure_resolvers(path: &Path, url: &str) -> Result<usize> {
    if path.is_file() {
        let existing = fs::read_to_string(path)
            .with_context(|| format!("Failed to read resolver file: {}", path.display()))?;
        let count = clean_resolvers(&existing).len();
        if count > 0 {
            return Ok(count);
        }
    }

    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")?;
    let body = client
        .get(url)
        .send()
        .and_then(|resp| resp.error_for_status())
        .and_then(|resp| resp.text())
        .with_context(|| format!("Failed to download resolvers from {url}"))?;

    let resolvers = clean_resolvers(&body);
    if resolvers.is_empty() {
        bail!("Resolver list from {url} contained no usable IP addresses");
    }

    fs::write(path, resolvers.join("\n") + "\n")
        .with_context(|| format!("Failed to write resolver file: {}", path.display()))?;
    Ok(resolvers.len())
}

/// Keep only lines that parse as bare IP addresses.
fn clean_resolvers(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter(|line| line.parse::<IpAddr>().is_ok())
        .map(str::to_string)
        .collect()
}
