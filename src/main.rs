mod expand;
mod io_utils;
mod massdns;
mod resolvers;
mod results;
mod validate;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use crossbeam_channel::Sender;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(
    name = "dnsfuzz-rs",
    about = "Expand subdomain patterns against wordlists and resolve the candidates with massdns.",
    long_about = "Expand subdomain patterns against wordlists and resolve the candidates with massdns.\nPatterns may contain the {fuzz_number}, {fuzz_all} and {region} placeholders; each is substituted from its own wordlist, the Cartesian product is resolved in batches, and resolved names accumulate in the result file.",
    version
)]
struct Args {
    /// File containing domain patterns, one per line
    patterns: PathBuf,

    /// Wordlist for the {fuzz_all} placeholder
    #[arg(short, long, default_value = "./wordlists/2m-subdomains.txt")]
    wordlist: PathBuf,

    /// Wordlist for the {fuzz_number} placeholder
    #[arg(long = "number-file", default_value = "number.txt")]
    number_file: PathBuf,

    /// Wordlist for the {region} placeholder
    #[arg(long = "region-file", default_value = "region.txt")]
    region_file: PathBuf,

    /// Optional Rust regex to filter wordlist entries (matched anywhere, case-insensitive by default)
    #[arg(short, long)]
    regex: Option<String>,

    /// Make the wordlist regex case-insensitive. Disable to use exact-case
    #[arg(long = "ci-regex", default_value = "true")]
    ci_regex: bool,

    /// Keep only the first N entries of each wordlist (0 = no truncation)
    #[arg(long = "max-words", default_value = "0")]
    max_words: usize,

    /// Cap on candidates generated per pattern line (0 = unlimited)
    #[arg(long = "max-per-pattern", default_value = "0")]
    max_per_pattern: usize,

    /// Number of candidates to resolve per massdns run
    #[arg(short, long, default_value = "1000")]
    batch_size: usize,

    /// Validate candidates as plausible domain names before resolving
    #[arg(long, default_value = "true")]
    validate: bool,

    /// Directory for the resolver list, scratch files and results
    #[arg(long = "output-dir", default_value = "dns_fuzz_results")]
    output_dir: PathBuf,

    /// Result file name inside the output directory
    #[arg(short, long, default_value = "alive.txt")]
    output: String,

    /// Resolver file to use. Defaults to resolvers.txt inside the output directory, downloaded when missing
    #[arg(long = "resolvers-file")]
    resolvers_file: Option<PathBuf>,

    /// URL the resolver list is downloaded from
    #[arg(long = "resolvers-url", default_value = resolvers::DEFAULT_RESOLVERS_URL)]
    resolvers_url: String,

    /// Path to the massdns binary
    #[arg(long = "massdns-bin", default_value = "massdns")]
    massdns_bin: String,

    /// DNS record type to query
    #[arg(short = 't', long = "record-type", default_value = "A")]
    record_type: String,

    /// massdns --processes value
    #[arg(long, default_value = "1")]
    processes: usize,

    /// massdns --socket-count value
    #[arg(long = "socket-count", default_value = "1")]
    socket_count: usize,

    /// massdns -s (hashmap size) value
    #[arg(long = "hashmap-size", default_value = "10000")]
    hashmap_size: usize,

    /// Response codes massdns retries on (empty to omit the flag)
    #[arg(long, default_value = "REFUSED,SERVFAIL")]
    retry: String,

    /// Generate and batch candidates without downloading resolvers or invoking massdns
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Skip patterns that need the {fuzz_all} wordlist when it is missing, instead of aborting
    #[arg(long = "skip-missing")]
    skip_missing: bool,

    /// Size of the result writer queue
    #[arg(long, default_value = "128")]
    queue: usize,

    /// Disable colored output
    #[arg(long = "no-color", short = 'n')]
    no_color: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize colored output based on args and TTY detection
    if args.no_color || !io::stderr().is_terminal() {
        colored::control::set_override(false);
    } else {
        colored::control::set_override(true);
    }

    // Graceful shutdown with double Ctrl+C handling
    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            if shutdown.load(Ordering::Relaxed) {
                eprintln!(
                    "\n{} {}",
                    "💀".red(),
                    "Force exit! Terminating immediately...".red().bold()
                );
                std::process::exit(130);
            }
            eprintln!(
                "\n{} {} {}",
                "⚡".yellow(),
                "Received interrupt signal, finishing current batch...".yellow(),
                "(Press Ctrl+C again to force exit)".bright_black()
            );
            shutdown.store(true, Ordering::Relaxed);
        })
        .context("Error setting Ctrl-C handler")?;
    }

    run(args, shutdown)
}

fn run(args: Args, shutdown: Arc<AtomicBool>) -> Result<()> {
    let patterns = io_utils::read_patterns(&args.patterns)?;
    if patterns.is_empty() {
        eprintln!(
            "{} No patterns found in {}",
            "Error:".red().bold(),
            args.patterns.display()
        );
        std::process::exit(1);
    }

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            args.output_dir.display()
        )
    })?;

    // Load only the wordlists the pattern file actually demands.
    let limit = (args.max_words > 0).then_some(args.max_words);
    let mut skip_word_patterns = false;
    let mut lists = expand::Wordlists::default();

    if patterns.iter().any(|p| p.contains(expand::NUMBER_TOKEN)) {
        lists.numbers =
            io_utils::read_wordlist(&args.number_file, args.regex.as_deref(), args.ci_regex, limit)?;
    }
    if patterns.iter().any(|p| p.contains(expand::REGION_TOKEN)) {
        lists.regions =
            io_utils::read_wordlist(&args.region_file, args.regex.as_deref(), args.ci_regex, limit)?;
    }
    if patterns.iter().any(|p| p.contains(expand::WORD_TOKEN)) {
        if args.wordlist.is_file() {
            lists.words =
                io_utils::read_wordlist(&args.wordlist, args.regex.as_deref(), args.ci_regex, limit)?;
        } else if args.skip_missing {
            eprintln!(
                "{} Wordlist {} is missing, skipping patterns that use {}",
                "⚠️".yellow(),
                args.wordlist.display().to_string().bright_cyan(),
                expand::WORD_TOKEN
            );
            skip_word_patterns = true;
        } else {
            anyhow::bail!(
                "Wordlist not found: {} (required by {} patterns)",
                args.wordlist.display(),
                expand::WORD_TOKEN
            );
        }
    }

    eprintln!(
        "{} {} {} patterns ({} general / {} number / {} region words)",
        "🚀".bright_blue(),
        "Loaded".bright_green().bold(),
        patterns.len().to_string().bright_cyan().bold(),
        lists.words.len().to_string().bright_cyan(),
        lists.numbers.len().to_string().bright_cyan(),
        lists.regions.len().to_string().bright_cyan()
    );

    // Resolver list and driver setup; both are skipped in dry-run mode.
    let driver = if args.dry_run {
        eprintln!(
            "{} {}",
            "ℹ️".bright_blue(),
            "Dry-run mode: candidates are generated but massdns is not invoked".bright_blue()
        );
        None
    } else {
        let resolvers_path = args
            .resolvers_file
            .clone()
            .unwrap_or_else(|| args.output_dir.join("resolvers.txt"));
        let count = resolvers::ensure_resolvers(&resolvers_path, &args.resolvers_url)?;
        eprintln!(
            "{} {} {} resolvers ready at {}",
            "🌐".bright_blue(),
            "Using".bright_green().bold(),
            count.to_string().bright_cyan().bold(),
            resolvers_path.display().to_string().bright_cyan()
        );

        let config = massdns::MassdnsConfig {
            binary: args.massdns_bin.clone(),
            resolvers: resolvers_path,
            record_type: args.record_type.clone(),
            processes: args.processes,
            socket_count: args.socket_count,
            hashmap_size: args.hashmap_size,
            retry_codes: args.retry.clone(),
            scratch_dir: args.output_dir.clone(),
        };
        config.check_binary()?;
        Some(config)
    };

    let results_path = args.output_dir.join(&args.output);
    let (sender, writer_handle) =
        results::spawn_writer(&results_path, args.queue, shutdown.clone())?;

    let opts = expand::ExpandOptions {
        max_per_pattern: (args.max_per_pattern > 0).then_some(args.max_per_pattern),
        validate: args.validate,
    };
    let batch_size = args.batch_size.max(1);

    for pattern in &patterns {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        if skip_word_patterns && pattern.contains(expand::WORD_TOKEN) {
            println!("[-] Skipping pattern (wordlist missing): {pattern}");
            continue;
        }

        println!("[+] Processing pattern: {pattern}");

        let mut batch: Vec<String> = Vec::with_capacity(batch_size);
        let mut found = 0usize;
        let stats = expand::expand_pattern(pattern, &lists, &opts, &shutdown, |candidate| {
            batch.push(candidate);
            if batch.len() >= batch_size {
                found += flush_batch(&mut batch, driver.as_ref(), &sender, &shutdown);
            }
        });
        found += flush_batch(&mut batch, driver.as_ref(), &sender, &shutdown);

        if stats.valid == 0 {
            println!(
                "[-] No valid candidates for pattern: {pattern} (0/{} generated), skipping",
                stats.generated
            );
            continue;
        }
        println!(
            "[+] Finished pattern: {pattern} ({}/{} valid, {} results found)",
            stats.valid, stats.generated, found
        );
    }

    // Signal completion and wait for the result writer to drain
    drop(sender);
    let _ = io::stdout().flush();
    eprintln!("{} Waiting for result writer to finish...", "⏳".yellow());

    let start = Instant::now();
    while !writer_handle.is_finished() {
        if start.elapsed() > Duration::from_secs(10) {
            eprintln!(
                "{} {}",
                "⏰".red(),
                "Timeout! Result writer did not finish within 10 seconds"
                    .red()
                    .bold()
            );
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    if writer_handle.is_finished() {
        if let Err(e) = writer_handle.join() {
            eprintln!("{} Writer thread error: {:?}", "❌".red(), e);
        }
    }

    eprintln!(
        "{} {} Results in {}",
        "✅".green(),
        "All patterns processed.".bright_green().bold(),
        results_path.display().to_string().bright_cyan()
    );
    Ok(())
}

/// Resolve the accumulated batch and hand resolved names to the result
/// writer. Batch failures are recoverable: they are logged and the run moves
/// on to the next batch.
fn flush_batch(
    batch: &mut Vec<String>,
    driver: Option<&massdns::MassdnsConfig>,
    sender: &Sender<Vec<String>>,
    shutdown: &AtomicBool,
) -> usize {
    if batch.is_empty() {
        return 0;
    }
    let names = std::mem::take(batch);

    let Some(driver) = driver else {
        println!("[i] (dry-run) would resolve {} candidates", names.len());
        return 0;
    };
    if shutdown.load(Ordering::Relaxed) {
        return 0;
    }

    match driver.resolve_batch(&names) {
        Ok(resolved) if resolved.is_empty() => {
            println!(
                "[i] No results from massdns for this batch ({} candidates)",
                names.len()
            );
            0
        }
        Ok(resolved) => {
            let found = resolved.len();
            // Err here means the writer already shut down; results for this
            // batch are dropped with it.
            let _ = sender.send(resolved);
            found
        }
        Err(err) => {
            eprintln!("{} massdns batch failed: {err:#}", "❌".red());
            0
        }
    }
}
