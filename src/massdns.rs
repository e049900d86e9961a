use anyhow::{Context, Result, bail};
use colored::*;
use std::collections::HashSet;
use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::Builder;

/// Flags forwarded to the external massdns binary. Retry, rate and socket
/// behavior live entirely inside massdns; this side only shells out and
/// parses its output.
pub struct MassdnsConfig {
    pub binary: String,
    pub resolvers: PathBuf,
    pub record_type: String,
    pub processes: usize,
    pub socket_count: usize,
    pub hashmap_size: usize,
    /// Response codes massdns retries on (its `--retry` flag). Empty = omit.
    pub retry_codes: String,
    /// Directory scratch target/result files are created in.
    pub scratch_dir: PathBuf,
}

impl MassdnsConfig {
    /// Probe that the binary can be spawned at all, before any expansion work.
    pub fn check_binary(&self) -> Result<()> {
        match Command::new(&self.binary)
            .arg("--help")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                bail!("massdns binary not found: {}", self.binary)
            }
            Err(err) => Err(err)
                .with_context(|| format!("Failed to probe massdns binary: {}", self.binary)),
        }
    }

    /// Resolve one batch of candidate names. Candidates are written to a
    /// scratch file, massdns runs to completion against it, and its simple
    /// output is parsed into resolved names for the configured record type,
    /// deduplicated in output order. Scratch files are removed on return.
    pub fn resolve_batch(&self, names: &[String]) -> Result<Vec<String>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut targets = Builder::new()
            .prefix("massdns_targets_")
            .suffix(".txt")
            .tempfile_in(&self.scratch_dir)
            .context("Failed to create scratch target file")?;
        for name in names {
            writeln!(targets, "{name}").context("Failed to write scratch target file")?;
        }
        targets.flush().context("Failed to flush scratch target file")?;

        let results = Builder::new()
            .prefix("massdns_out_")
            .suffix(".txt")
            .tempfile_in(&self.scratch_dir)
            .context("Failed to create scratch result file")?;

        let output = Command::new(&self.binary)
            .args(self.build_args(targets.path(), results.path()))
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run massdns binary: {}", self.binary))?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if !stderr.is_empty() {
            eprintln!("{} {}", "[massdns]".bright_black(), stderr.bright_black());
        }

        // massdns exits 1 when some queries fail; its output is still usable.
        if !matches!(output.status.code(), Some(0) | Some(1)) {
            bail!("massdns exited with {}", output.status);
        }

        let raw = fs::read_to_string(results.path()).context("Failed to read massdns output")?;
        Ok(parse_simple_output(&raw, &self.record_type))
    }

    fn build_args(&self, targets: &Path, results: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-r".into(),
            self.resolvers.clone().into(),
            "-t".into(),
            self.record_type.clone().into(),
            "-o".into(),
            "S".into(),
            "-w".into(),
            results.as_os_str().to_os_string(),
            "--processes".into(),
            self.processes.to_string().into(),
            "--socket-count".into(),
            self.socket_count.to_string().into(),
            "-s".into(),
            self.hashmap_size.to_string().into(),
        ];
        if !self.retry_codes.is_empty() {
            args.push("--retry".into());
            args.push(self.retry_codes.clone().into());
        }
        args.push(targets.as_os_str().to_os_string());
        args
    }
}

/// Parse massdns `-o S` output (`name. TYPE rdata` per line), keeping the
/// names of records matching the queried type. Trailing dots are stripped and
/// repeated names collapse to their first occurrence.
fn parse_simple_output(raw: &str, record_type: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();

    for line in raw.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(rtype)) = (parts.next(), parts.next()) else {
            continue;
        };
        if parts.next().is_none() {
            continue;
        }
        if !rtype.eq_ignore_ascii_case(record_type) {
            continue;
        }

        let name = name.trim_end_matches('.').to_string();
        if seen.insert(name.clone()) {
            resolved.push(name);
        }
    }

    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MassdnsConfig {
        MassdnsConfig {
            binary: "massdns".to_string(),
            resolvers: PathBuf::from("resolvers.txt"),
            record_type: "A".to_string(),
            processes: 2,
            socket_count: 3,
            hashmap_size: 10000,
            retry_codes: "REFUSED,SERVFAIL".to_string(),
            scratch_dir: std::env::temp_dir(),
        }
    }

    #[test]
    fn test_build_args_layout() {
        let args = config().build_args(Path::new("targets.txt"), Path::new("out.txt"));
        let args: Vec<String> = args
            .into_iter()
            .map(|a| a.into_string().unwrap())
            .collect();

        assert_eq!(
            args,
            vec![
                "-r",
                "resolvers.txt",
                "-t",
                "A",
                "-o",
                "S",
                "-w",
                "out.txt",
                "--processes",
                "2",
                "--socket-count",
                "3",
                "-s",
                "10000",
                "--retry",
                "REFUSED,SERVFAIL",
                "targets.txt",
            ]
        );
    }

    #[test]
    fn test_build_args_omits_empty_retry() {
        let mut config = config();
        config.retry_codes = String::new();
        let args = config.build_args(Path::new("targets.txt"), Path::new("out.txt"));

        assert!(!args.iter().any(|a| a == "--retry"));
        assert_eq!(args.last().unwrap(), "targets.txt");
    }

    #[test]
    fn test_parse_simple_output_filters_and_strips() {
        let raw = "\
host1.example.com. A 93.184.216.34
host1.example.com. A 93.184.216.35
alias.example.com. CNAME real.example.com.
host2.example.com. a 10.0.0.1

malformed-line
";
        assert_eq!(
            parse_simple_output(raw, "A"),
            vec!["host1.example.com", "host2.example.com"]
        );
    }

    #[test]
    fn test_parse_simple_output_other_record_type() {
        let raw = "mail.example.com. MX 10 mx.example.com.\nwww.example.com. A 1.2.3.4\n";
        assert_eq!(parse_simple_output(raw, "MX"), vec!["mail.example.com"]);
    }

    #[test]
    fn test_resolve_batch_empty_input_skips_spawn() -> Result<()> {
        let mut config = config();
        config.binary = "/nonexistent/massdns".to_string();
        assert!(config.resolve_batch(&[])?.is_empty());
        Ok(())
    }
}
