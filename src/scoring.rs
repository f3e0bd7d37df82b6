use std::cmp::Ordering;

const HOUR: i64 = 3600;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;
const FOUR_WEEKS: i64 = 4 * WEEK;

/// Frecency: visit count weighted by how recently the directory was entered.
///
/// `last_visit == 0` means the timestamp is unknown (e.g. imported from a
/// plain bash history), in which case the raw count is returned.
pub fn frecency(visit_count: u64, last_visit: i64, now: i64) -> f64 {
    let count = visit_count as f64;
    if last_visit == 0 {
        return count;
    }
    let elapsed = now - last_visit;
    if elapsed < HOUR {
        count * 4.0
    } else if elapsed < DAY {
        count * 2.0
    } else if elapsed < WEEK {
        count
    } else if elapsed < FOUR_WEEKS {
        count / 2.0
    } else {
        count / 4.0
    }
}

/// Final path component. A single trailing slash is ignored, so
/// `/a/b/` has basename `b`.
pub fn basename(path: &str) -> &str {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    match trimmed.rfind('/') {
        Some(i) => &trimmed[i + 1..],
        None => trimmed,
    }
}

/// Shorter paths are weakly preferred.
fn length_bonus(path: &str) -> i64 {
    let len = path.len().min(200) as i64;
    (20 - len / 10).max(0)
}

fn eq_fold(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| x.to_ascii_lowercase() == y.to_ascii_lowercase())
}

/// In-order subsequence match of `pattern` inside `text`, byte-wise with
/// ASCII case folding. Each matched byte is worth 1 point; a run of
/// consecutive matches earns a growing streak bonus capped at +5 per byte,
/// and a match right after `/`, `_`, `-` or space earns +5. Returns `None`
/// when some pattern byte cannot be found; there is no partial credit.
fn subsequence_score(pattern: &[u8], text: &[u8]) -> Option<i64> {
    let mut score = 0i64;
    let mut streak = 0i64;
    let mut last_match: Option<usize> = None;
    let mut ti = 0usize;

    for &pb in pattern {
        let want = pb.to_ascii_lowercase();
        let mut found = false;
        while ti < text.len() {
            if text[ti].to_ascii_lowercase() == want {
                score += 1;
                if ti > 0 && matches!(text[ti - 1], b'/' | b'_' | b'-' | b' ') {
                    score += 5;
                }
                if ti > 0 && last_match == Some(ti - 1) {
                    streak = (streak + 1).min(5);
                    score += streak;
                } else {
                    streak = 0;
                }
                last_match = Some(ti);
                ti += 1;
                found = true;
                break;
            }
            ti += 1;
        }
        if !found {
            return None;
        }
    }
    Some(score)
}

/// Tiered fuzzy match of `pattern` against `path`.
///
/// Tiers, best first: case-insensitive exact basename match (100), basename
/// prefix (75), subsequence inside the basename (50 + core), subsequence
/// inside the full path (core). Every tier also adds the length bonus.
/// `None` excludes the candidate. An empty pattern matches everything with
/// score 0.
pub fn fuzzy_score(pattern: &str, path: &str) -> Option<i64> {
    if pattern.is_empty() {
        return Some(0);
    }
    let bonus = length_bonus(path);
    let pat = pattern.as_bytes();
    let base = basename(path).as_bytes();

    if eq_fold(pat, base) {
        return Some(100 + bonus);
    }
    if base.len() >= pat.len() && eq_fold(pat, &base[..pat.len()]) {
        return Some(75 + bonus);
    }
    if let Some(core) = subsequence_score(pat, base) {
        return Some(50 + core + bonus);
    }
    subsequence_score(pat, path.as_bytes()).map(|core| core + bonus)
}

/// A candidate with its per-session frecency and per-query fuzzy score.
#[derive(Debug, Clone, Copy)]
pub struct ScoredEntry<'a> {
    pub path: &'a str,
    pub frecency_score: f64,
    pub fuzzy_score: i64,
    pub total_score: f64,
    #[allow(dead_code)]
    pub visit_count: u64,
    #[allow(dead_code)]
    pub last_visit: i64,
}

impl<'a> ScoredEntry<'a> {
    pub fn new(path: &'a str, frecency_score: f64, visit_count: u64, last_visit: i64) -> Self {
        Self {
            path,
            frecency_score,
            fuzzy_score: 0,
            total_score: frecency_score,
            visit_count,
            last_visit,
        }
    }

    /// Updates the fuzzy score and the combined total in one step so a stale
    /// combination can never be observed.
    pub fn set_fuzzy(&mut self, fuzzy: i64) {
        self.fuzzy_score = fuzzy;
        self.total_score = combine(fuzzy, self.frecency_score);
    }
}

/// Fuzzy relevance dominates; frecency only breaks ties among similarly
/// relevant matches.
pub fn combine(fuzzy: i64, frecency: f64) -> f64 {
    fuzzy as f64 * 10.0 + frecency
}

/// Ranking order: descending total score, then ascending path length.
/// Used with a stable sort so equal entries keep their master-list order.
pub fn compare(a: &ScoredEntry, b: &ScoredEntry) -> Ordering {
    match b.total_score.partial_cmp(&a.total_score) {
        Some(Ordering::Equal) | None => a.path.len().cmp(&b.path.len()),
        Some(ord) => ord,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    #[test]
    fn frecency_without_timestamp_is_raw_count() {
        for count in [0u64, 1, 7, 1000] {
            assert_eq!(frecency(count, 0, NOW), count as f64);
        }
    }

    #[test]
    fn frecency_decay_buckets() {
        assert_eq!(frecency(10, NOW - 1800, NOW), 40.0); // < 1 hour
        assert_eq!(frecency(10, NOW - 43200, NOW), 20.0); // < 1 day
        assert_eq!(frecency(10, NOW - 259200, NOW), 10.0); // < 1 week
        assert_eq!(frecency(10, NOW - 1209600, NOW), 5.0); // < 4 weeks
        assert_eq!(frecency(10, NOW - 10_000_000, NOW), 2.5); // older
    }

    #[test]
    fn frecency_bucket_boundaries_are_exclusive() {
        // Exactly one hour falls into the "< 1 day" bucket.
        assert_eq!(frecency(10, NOW - 3600, NOW), 20.0);
        assert_eq!(frecency(10, NOW - 86400, NOW), 10.0);
        assert_eq!(frecency(10, NOW - 604800, NOW), 5.0);
        assert_eq!(frecency(10, NOW - 2419200, NOW), 2.5);
    }

    #[test]
    fn basename_handles_trailing_slash() {
        assert_eq!(basename("/a/b/work"), "work");
        assert_eq!(basename("/a/b/work/"), "work");
        assert_eq!(basename("work"), "work");
        assert_eq!(basename("/"), "");
    }

    #[test]
    fn exact_basename_match_reaches_top_tier() {
        let score = fuzzy_score("work", "/a/b/work").unwrap();
        assert!(score >= 100, "got {score}");
        // Case folding applies to the exact tier too.
        assert_eq!(fuzzy_score("WORK", "/a/b/work"), Some(score));
    }

    #[test]
    fn prefix_match_ranks_below_exact() {
        let score = fuzzy_score("work", "/a/b/workflow").unwrap();
        assert!((75..100).contains(&score), "got {score}");
    }

    #[test]
    fn missing_pattern_byte_is_no_match() {
        assert_eq!(fuzzy_score("xyz", "/a/b/projects"), None);
    }

    #[test]
    fn empty_pattern_matches_everything() {
        assert_eq!(fuzzy_score("", "/any/where"), Some(0));
    }

    #[test]
    fn prefix_tier_beats_basename_subsequence_tier() {
        // "wor" is a prefix of the basename, "wfw" is only a subsequence.
        let prefix = fuzzy_score("wor", "/a/workflow").unwrap();
        let fuzzy = fuzzy_score("wfw", "/a/workflow").unwrap();
        assert!(prefix > fuzzy, "{prefix} vs {fuzzy}");
    }

    #[test]
    fn full_path_fallback_when_pattern_spans_components() {
        // "bw" is not inside the basename "work" but is inside the path.
        let score = fuzzy_score("bw", "/a/b/work").unwrap();
        assert!(score < 50, "got {score}");
    }

    #[test]
    fn boundary_bonus_rewards_component_starts() {
        let after_sep = subsequence_score(b"w", b"a_w").unwrap();
        let plain = subsequence_score(b"w", b"aw").unwrap();
        assert_eq!(after_sep - plain, 5);
    }

    #[test]
    fn streak_bonus_grows_and_caps() {
        // Contiguous run: 1 + (1+1) + (1+2) + ... with the bonus capped at 5.
        let run = subsequence_score(b"abcdefgh", b"abcdefgh").unwrap();
        assert_eq!(run, 8 + (1 + 2 + 3 + 4 + 5 + 5 + 5));
        // A skip in the middle resets the streak.
        let broken = subsequence_score(b"ab", b"axb").unwrap();
        assert_eq!(broken, 2);
    }

    #[test]
    fn shorter_path_wins_on_equal_total() {
        let mut a = ScoredEntry::new("/a/longer/path", 5.0, 1, 0);
        let mut b = ScoredEntry::new("/a/short", 5.0, 1, 0);
        a.set_fuzzy(10);
        b.set_fuzzy(10);
        assert_eq!(compare(&b, &a), Ordering::Less);
        assert_eq!(compare(&a, &b), Ordering::Greater);
    }

    #[test]
    fn total_recomputed_with_fuzzy() {
        let mut e = ScoredEntry::new("/a", 7.0, 3, 0);
        e.set_fuzzy(80);
        assert_eq!(e.total_score, 807.0);
        e.set_fuzzy(0);
        assert_eq!(e.total_score, 7.0);
    }

    #[test]
    fn length_bonus_prefers_short_paths() {
        let short = fuzzy_score("a", "/a").unwrap();
        let long_path = format!("/{}/a", "x".repeat(300));
        let long = fuzzy_score("a", &long_path).unwrap();
        assert!(short > long);
    }
}
