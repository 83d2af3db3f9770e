//! Approximate string scoring for speech-noise-tolerant matching
//!
//! Scores live on a 0–100 scale. The score of a candidate against a query
//! is the maximum of three views: whole-string edit similarity, similarity
//! of the token-sorted strings (word order insensitive), and the mean of
//! the best per-token similarities (tolerates extra words in the
//! candidate, e.g. "chrome" against "Google Chrome").
//!
//! Callers apply their own acceptance thresholds and keep the first
//! candidate seen on ties, so selection is deterministic for a given
//! input order.

/// Acceptance threshold for app and contact matching
pub const DIRECTORY_THRESHOLD: u8 = 25;

/// Acceptance threshold for UI-node matching
pub const NODE_THRESHOLD: u8 = 40;

/// Score `candidate` against `query` on a 0–100 scale
pub fn score(candidate: &str, query: &str) -> u8 {
    let candidate = normalize(candidate);
    let query = normalize(query);
    if candidate.is_empty() || query.is_empty() {
        return 0;
    }
    if candidate == query {
        return 100;
    }

    let whole = similarity(&candidate, &query);
    let sorted = similarity(&sort_tokens(&candidate), &sort_tokens(&query));
    let tokens = token_mean(&candidate, &query);

    whole.max(sorted).max(tokens)
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

fn sort_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// Edit similarity: `100 * (max_len - distance) / max_len`
fn similarity(a: &str, b: &str) -> u8 {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return 0;
    }
    let distance = levenshtein(a, b);
    ((max_len.saturating_sub(distance)) * 100 / max_len) as u8
}

/// Mean over query tokens of the best similarity against any candidate token
fn token_mean(candidate: &str, query: &str) -> u8 {
    let candidate_tokens: Vec<&str> = candidate.split_whitespace().collect();
    let query_tokens: Vec<&str> = query.split_whitespace().collect();
    if candidate_tokens.is_empty() || query_tokens.is_empty() {
        return 0;
    }

    let total: u32 = query_tokens
        .iter()
        .map(|q| {
            candidate_tokens
                .iter()
                .map(|c| similarity(c, q) as u32)
                .max()
                .unwrap_or(0)
        })
        .sum();

    (total / query_tokens.len() as u32) as u8
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0usize; b_chars.len() + 1];
    for (i, a_ch) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, b_ch) in b_chars.iter().enumerate() {
            let substitution = prev[j] + usize::from(a_ch != *b_ch);
            let insertion = curr[j] + 1;
            let deletion = prev[j + 1] + 1;
            curr[j + 1] = substitution.min(insertion).min(deletion);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_scores_100() {
        assert_eq!(score("Camera", "camera"), 100);
        assert_eq!(score("  Camera  ", "camera"), 100);
    }

    #[test]
    fn test_empty_inputs_score_zero() {
        assert_eq!(score("", "camera"), 0);
        assert_eq!(score("Camera", ""), 0);
        assert_eq!(score("   ", "camera"), 0);
    }

    #[test]
    fn test_token_match_beats_whole_string() {
        // "chrome" is one exact token of "Google Chrome"
        assert_eq!(score("Google Chrome", "chrome"), 100);
        assert_eq!(score("Call of Duty", "duty"), 100);
    }

    #[test]
    fn test_word_order_is_irrelevant() {
        assert_eq!(score("Maps Google", "google maps"), 100);
    }

    #[test]
    fn test_close_misspelling_scores_high() {
        // One edit away
        assert!(score("Camera", "camrea") > 60);
        assert!(score("Spotify", "spotifi") > 70);
    }

    #[test]
    fn test_unrelated_strings_score_below_directory_threshold() {
        assert!(score("Alice Johnson", "mom") <= DIRECTORY_THRESHOLD);
        assert!(score("Calculator", "weather") <= DIRECTORY_THRESHOLD);
    }

    #[test]
    fn test_levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
    }

    #[test]
    fn test_score_is_symmetric_enough_for_ranking() {
        // The scale itself is what matters; closer candidates rank higher.
        let query = "messages";
        let close = score("Messages", query);
        let far = score("Settings", query);
        assert!(close > far);
    }
}
