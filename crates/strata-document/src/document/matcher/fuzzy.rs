//! Approximate substring search
//!
//! Edit-distance dynamic programming where the first row is zero, so a match
//! may start anywhere in the text. Each cell also carries the text position
//! its alignment started at, giving the span of every accepted match.

/// Fold a character for case-insensitive comparison
fn fold(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

fn prepare(s: &str, ignore_case: bool) -> Vec<char> {
    if ignore_case {
        s.chars().map(fold).collect()
    } else {
        s.chars().collect()
    }
}

/// Levenshtein distance between two strings
pub fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let s1_chars: Vec<char> = s1.chars().collect();
    let s2_chars: Vec<char> = s2.chars().collect();

    let m = s1_chars.len();
    let n = s2_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];
    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(s1_chars[i - 1] != s2_chars[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[n]
}

/// Similarity in `[0, 100]` derived from the edit distance
pub fn similarity(s1: &str, s2: &str) -> f64 {
    let longest = s1.chars().count().max(s2.chars().count());
    if longest == 0 {
        return 100.0;
    }
    let distance = levenshtein_distance(s1, s2);
    100.0 * (longest - distance) as f64 / longest as f64
}

/// Maximum edit distance allowed for a pattern of `len` characters at a
/// similarity `threshold` in `[0, 100]`
pub fn distance_for_threshold(len: usize, threshold: f64) -> usize {
    let len = len as f64;
    let allowed = (len - len * threshold / 100.0).floor();
    (allowed.max(0.0) as usize).max(1)
}

/// One approximate occurrence, in byte offsets into the text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzyMatch {
    /// Start byte offset
    pub start: usize,
    /// End byte offset (exclusive)
    pub end: usize,
    /// Edit distance of the occurrence
    pub distance: usize,
}

/// Non-overlapping approximate occurrences of `pattern` in `text` within
/// `max_distance` edits, left to right
pub fn find_approximate(
    pattern: &str,
    text: &str,
    max_distance: usize,
    ignore_case: bool,
) -> Vec<FuzzyMatch> {
    let p = prepare(pattern, ignore_case);
    let t = prepare(text, ignore_case);
    let m = p.len();
    let n = t.len();
    if m == 0 {
        return Vec::new();
    }

    // byte offset of every char boundary, including the end
    let mut offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    offsets.push(text.len());

    // dist[i][j]: best distance aligning p[..i] with a text span ending at j
    // start[i][j]: where that span starts
    let mut dist = vec![vec![0usize; n + 1]; m + 1];
    let mut start = vec![vec![0usize; n + 1]; m + 1];
    for j in 0..=n {
        start[0][j] = j;
    }
    for i in 1..=m {
        dist[i][0] = i;
        start[i][0] = 0;
        for j in 1..=n {
            let cost = usize::from(p[i - 1] != t[j - 1]);
            let diagonal = (dist[i - 1][j - 1] + cost, start[i - 1][j - 1]);
            let skip_pattern = (dist[i - 1][j] + 1, start[i - 1][j]);
            let skip_text = (dist[i][j - 1] + 1, start[i][j - 1]);
            let best = [diagonal, skip_pattern, skip_text]
                .into_iter()
                .min_by_key(|(d, _)| *d)
                .unwrap_or(diagonal);
            dist[i][j] = best.0;
            start[i][j] = best.1;
        }
    }

    // Runs of consecutive accepting end positions describe one occurrence;
    // keep the best end of each run.
    let mut matches: Vec<FuzzyMatch> = Vec::new();
    let mut run: Option<(usize, usize)> = None;
    let flush = |run: Option<(usize, usize)>, matches: &mut Vec<FuzzyMatch>| {
        let Some((end, d)) = run else { return };
        let begin = start[m][end];
        if end == begin {
            return;
        }
        let overlaps = matches
            .last()
            .is_some_and(|last| offsets[begin] < last.end);
        if !overlaps {
            matches.push(FuzzyMatch {
                start: offsets[begin],
                end: offsets[end],
                distance: d,
            });
        }
    };
    for j in 1..=n {
        let d = dist[m][j];
        if d <= max_distance {
            run = match run {
                Some((_, best)) if best <= d => run,
                _ => Some((j, d)),
            };
        } else if run.is_some() {
            flush(run.take(), &mut matches);
        }
    }
    flush(run, &mut matches);
    matches
}
