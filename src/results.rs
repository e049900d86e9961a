use anyhow::{Context, Result};
use colored::*;
use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Spawn the cumulative result writer. Each message is one batch of resolved
/// names; names already present in the result file (including those written
/// by a previous run) are dropped, everything else is appended one per line
/// and flushed. Returns the batch sender and the writer handle.
pub fn spawn_writer(
    path: &Path,
    queue_size: usize,
    shutdown: Arc<AtomicBool>,
) -> Result<(Sender<Vec<String>>, JoinHandle<()>)> {
    let mut seen = load_seen(path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open result file: {}", path.display()))?;

    let (sender, receiver) = bounded::<Vec<String>>(queue_size);

    let handle = thread::spawn(move || {
        let mut writer = BufWriter::new(file);

        loop {
            if shutdown.load(Ordering::Relaxed) {
                break;
            }

            let batch = match receiver.recv_timeout(Duration::from_millis(100)) {
                Ok(batch) => batch,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let found = batch.len();
            let mut fresh = 0usize;
            for name in batch {
                if seen.contains(&name) {
                    continue;
                }
                if let Err(e) = writeln!(writer, "{name}") {
                    eprintln!("{} Result write error: {}", "❌".red(), e);
                    return;
                }
                seen.insert(name);
                fresh += 1;
            }

            if let Err(e) = writer.flush() {
                eprintln!("{} Result flush error: {}", "❌".red(), e);
                return;
            }

            println!(
                "[+] Found {} alive this batch ({} new). Total unique alive so far: {}",
                found,
                fresh,
                seen.len()
            );
        }

        if let Err(e) = writer.flush() {
            eprintln!("{} Final result flush error: {}", "❌".red(), e);
        }
    });

    Ok((sender, handle))
}

/// Load the names already present in the result file so resumed runs never
/// append duplicates.
fn load_seen(path: &Path) -> Result<HashSet<String>> {
    let mut seen = HashSet::new();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(seen),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("Failed to read result file: {}", path.display()));
        }
    };

    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read line from result file")?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            seen.insert(trimmed.to_string());
        }
    }

    Ok(seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn batch(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_writer_appends_unique_names_in_order() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("alive.txt");
        let shutdown = Arc::new(AtomicBool::new(false));

        let (sender, handle) = spawn_writer(&path, 16, shutdown)?;
        sender.send(batch(&["a.example.com", "b.example.com"])).unwrap();
        sender.send(batch(&["b.example.com", "c.example.com"])).unwrap();
        drop(sender);
        handle.join().unwrap();

        let written = fs::read_to_string(&path)?;
        assert_eq!(written, "a.example.com\nb.example.com\nc.example.com\n");
        Ok(())
    }

    #[test]
    fn test_writer_resumes_against_existing_file() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("alive.txt");
        fs::write(&path, "a.example.com\n")?;
        let shutdown = Arc::new(AtomicBool::new(false));

        let (sender, handle) = spawn_writer(&path, 16, shutdown)?;
        sender.send(batch(&["a.example.com", "b.example.com"])).unwrap();
        drop(sender);
        handle.join().unwrap();

        let written = fs::read_to_string(&path)?;
        assert_eq!(written, "a.example.com\nb.example.com\n");
        Ok(())
    }

    #[test]
    fn test_load_seen_missing_file_is_empty() -> Result<()> {
        let dir = TempDir::new()?;
        assert!(load_seen(&dir.path().join("absent.txt"))?.is_empty());
        Ok(())
    }
}
