use std::sync::atomic::{AtomicBool, Ordering};

use crate::validate::is_valid_domain;

/// Placeholder substituted from the number wordlist.
pub const NUMBER_TOKEN: &str = "{fuzz_number}";
/// Placeholder substituted from the general subdomain wordlist.
pub const WORD_TOKEN: &str = "{fuzz_all}";
/// Placeholder substituted from the region wordlist.
pub const REGION_TOKEN: &str = "{region}";

/// Wordlists backing the three placeholder tokens. A list whose token never
/// appears in the pattern file may be left empty.
#[derive(Default)]
pub struct Wordlists {
    pub numbers: Vec<String>,
    pub words: Vec<String>,
    pub regions: Vec<String>,
}

#[derive(Clone, Copy)]
pub struct ExpandOptions {
    /// Ceiling on candidates generated for one pattern. `None` = unbounded.
    pub max_per_pattern: Option<usize>,
    /// Run each candidate through the domain validator before emitting.
    pub validate: bool,
}

/// Per-pattern counters, local to one pattern's processing.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ExpandStats {
    /// Candidates produced by substitution, before validation.
    pub generated: usize,
    /// Candidates that survived validation and were emitted.
    pub valid: usize,
}

/// Expand one pattern line against the wordlists its tokens select, calling
/// `emit` for every retained candidate in enumeration order.
///
/// Substitution dimensions nest number -> word -> region; a token that does
/// not occur in the pattern contributes no dimension, and every occurrence of
/// a token is replaced with the same wordlist entry. A pattern with no tokens
/// produces itself as the sole candidate. Generation stops once the ceiling
/// is reached or `stop` is raised.
pub fn expand_pattern<F>(
    pattern: &str,
    lists: &Wordlists,
    opts: &ExpandOptions,
    stop: &AtomicBool,
    mut emit: F,
) -> ExpandStats
where
    F: FnMut(String),
{
    let dims: Vec<(&str, &[String])> = [
        (NUMBER_TOKEN, lists.numbers.as_slice()),
        (WORD_TOKEN, lists.words.as_slice()),
        (REGION_TOKEN, lists.regions.as_slice()),
    ]
    .into_iter()
    .filter(|(token, _)| pattern.contains(token))
    .collect();

    let mut stats = ExpandStats::default();
    expand_dims(pattern, &dims, opts, stop, &mut stats, &mut emit);
    stats
}

/// Recurse over the active dimensions; the fully substituted leaf is offered
/// to the validator and emitted. Returns false to unwind the whole
/// enumeration (cap reached or shutdown requested).
fn expand_dims<F>(
    template: &str,
    dims: &[(&str, &[String])],
    opts: &ExpandOptions,
    stop: &AtomicBool,
    stats: &mut ExpandStats,
    emit: &mut F,
) -> bool
where
    F: FnMut(String),
{
    let Some(((token, words), rest)) = dims.split_first() else {
        if stop.load(Ordering::Relaxed) {
            return false;
        }
        if let Some(cap) = opts.max_per_pattern {
            if stats.generated >= cap {
                return false;
            }
        }
        stats.generated += 1;
        if !opts.validate || is_valid_domain(template) {
            stats.valid += 1;
            emit(template.to_string());
        }
        return true;
    };

    for word in *words {
        if !expand_dims(&template.replace(token, word), rest, opts, stop, stats, emit) {
            return false;
        }
    }
    true
}
