/// Highest score `score` can return.
pub const MAX_SCORE: f64 = 100.0;

/// Score how closely `a` resembles `b`, from 0 (nothing in common) to 100 (equal
/// after normalization).
///
/// Tiered: empty → 0, equal → 100, containment → length ratio, otherwise a blend
/// of positional character agreement and shared bigrams. The bigram half scans
/// the bigrams of `a`, so the score is not symmetric: `score(a, b)` and
/// `score(b, a)` can differ. Thresholds are tuned against this exact formula.
pub fn score(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);

    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return MAX_SCORE;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let shorter = a_chars.len().min(b_chars.len());
    let longer = a_chars.len().max(b_chars.len()) as f64;

    if a.contains(&b) || b.contains(&a) {
        return round2(shorter as f64 / longer * 100.0);
    }

    let positional = positional_matches(&a_chars, &b_chars) as f64 / longer * 50.0;

    let bigram_slots = a_chars.len().saturating_sub(1).max(1) as f64;
    let bigram = shared_bigrams(&a_chars, &b_chars) as f64 / bigram_slots * 50.0;

    round2((positional + bigram).min(MAX_SCORE))
}

/// Lowercase and trim.
fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Count of indices where both strings hold the same character.
fn positional_matches(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b).filter(|(x, y)| x == y).count()
}

/// Count of bigrams of `a` (with repetition) that occur anywhere in `b`.
fn shared_bigrams(a: &[char], b: &[char]) -> usize {
    a.windows(2)
        .filter(|pair| b.windows(2).any(|other| other == *pair))
        .count()
}

/// Round to two decimal places, ties to even (banker's rounding).
fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_strings() {
        assert_eq!(score("Let It Be", "Let It Be"), 100.0);
        assert_eq!(score("x", "x"), 100.0);
    }

    #[test]
    fn test_normalization_ignores_case_and_padding() {
        assert_eq!(score("  THE BEATLES ", "the beatles"), 100.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(score("", "anything"), 0.0);
        assert_eq!(score("anything", ""), 0.0);
        assert_eq!(score("   ", "anything"), 0.0);
        assert_eq!(score("", ""), 0.0);
    }

    #[test]
    fn test_containment_uses_length_ratio() {
        // "beatles" (7) inside "the beatles" (11)
        assert_eq!(score("Beatles", "The Beatles"), 63.64);
        assert_eq!(score("The Beatles", "Beatles"), 63.64);
        assert_eq!(score("ab", "abcd"), 50.0);
    }

    #[test]
    fn test_positional_and_bigram_blend() {
        // positional: "ab" agree → 2/3 * 50 = 33.33
        // bigram: "ab" found, "bc" not → 1/2 * 50 = 25
        assert_eq!(score("abc", "abd"), 58.33);
    }

    #[test]
    fn test_asymmetric_bigram_direction() {
        // Bigrams are taken from the first argument only:
        // "abab" → ab, ba, ab (all in "abba") = 50; "abba" → ab, bb, ba (2 of 3) = 33.33.
        // Positional agreement is 2/4 * 50 = 25 either way.
        let forward = score("abab", "abba");
        let backward = score("abba", "abab");
        assert_eq!(forward, 75.0);
        assert_eq!(backward, 58.33);
    }

    #[test]
    fn test_no_overlap() {
        assert_eq!(score("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_single_char_has_no_bigrams() {
        // bigram denominator clamps to 1
        assert_eq!(score("a", "ba"), 50.0); // containment: 1/2
        assert_eq!(score("q", "z"), 0.0);
    }

    #[test]
    fn test_repeated_bigrams_each_count() {
        // positional 3/4 * 50 = 37.5; "aa" appears three times in "aaaa", each found → 50
        assert_eq!(score("aaaa", "aaab"), 87.5);
    }

    #[test]
    fn test_score_always_in_range() {
        let samples = [
            "", "a", "ab", "Let It Be", "let it bee", "Hey Jude", "The Beatles",
            "Beatles", "ßtraße", "日本語", "zzzz", "  padded  ",
        ];
        for a in samples {
            for b in samples {
                let s = score(a, b);
                assert!((0.0..=MAX_SCORE).contains(&s), "score({a:?}, {b:?}) = {s}");
            }
        }
    }

    #[test]
    fn test_rounding_ties_go_to_even() {
        // 1/32 → 3.125 and 5/32 → 15.625 are exact binary midpoints
        let long = format!("a{}", "b".repeat(31));
        assert_eq!(score("a", &long), 3.12);
        assert_eq!(score("aaaaa", &format!("aaaaa{}", "b".repeat(27))), 15.62);
        // 3/8 → 37.5 has nothing past the second decimal to round
        assert_eq!(score("abc", "abcdefgh"), 37.5);
    }

    #[test]
    fn test_unicode_counts_chars_not_bytes() {
        // Multi-byte chars must not split on byte boundaries
        assert_eq!(score("日本", "日本語"), 66.67);
        assert_eq!(score("é", "éa"), 50.0);
    }
}
