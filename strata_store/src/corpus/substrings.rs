// /////////////////////////////////////////////////////////////////////////////
// Strata Store RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Substring Enumeration
//!
//! Expands an indexed string value into its distinct substrings. Enumeration
//! is depth-first left-to-right: all substrings starting at character 0 (in
//! increasing length), then all starting at character 1, and so on. The
//! brute-force deduplicator's correctness argument depends on exactly this
//! order, so it is a contract of this module, not an implementation detail.
//!
//! Three trims apply before a substring reaches the chunk:
//!
//! - an optional maximum substring length in characters (0 disables the cap),
//! - stopword exclusion: a substring spanning exactly one whole token that
//!   matches a configured stopword is not emitted (the same characters inside
//!   a longer token still are),
//! - per-value deduplication: each distinct substring is emitted at most
//!   once, carrying the character offset of its first occurrence.

use std::collections::HashSet;

use strata_store_domain::{StoreError, Text};

use crate::corpus::dedup::Deduplicator;

/// Enumerates the deduplicated substrings of `value`, invoking `emit` with
/// each admitted substring view and the character offset where it starts.
pub fn enumerate(
    value: &Text,
    max_substring_len: usize,
    stopwords: &HashSet<String>,
    dedup: &mut dyn Deduplicator,
    mut emit: impl FnMut(Text, u32) -> Result<(), StoreError>,
) -> Result<(), StoreError> {
    let content = value.as_str();
    if content.is_empty() {
        return Ok(());
    }

    // boundaries[i] is the byte offset of character i; the final entry is
    // the total byte length, so boundaries[i]..boundaries[j] spans chars i..j.
    let mut boundaries: Vec<usize> = content.char_indices().map(|(offset, _)| offset).collect();
    boundaries.push(content.len());
    let char_count = boundaries.len() - 1;

    let token_spans = token_spans(content);

    for start in 0..char_count {
        let longest = if max_substring_len == 0 {
            char_count
        } else {
            (start + max_substring_len).min(char_count)
        };
        for end in (start + 1)..=longest {
            let start_byte = boundaries[start];
            let end_byte = boundaries[end];
            if token_spans.contains(&(start_byte, end_byte)) && stopwords.contains(&content[start_byte..end_byte]) {
                continue;
            }
            let substring = value.slice(start_byte, end_byte);
            if dedup.add(&substring)? {
                emit(substring, start as u32)?;
            }
        }
    }
    Ok(())
}

/// Byte spans of the whitespace-delimited tokens of `content`.
fn token_spans(content: &str) -> HashSet<(usize, usize)> {
    let mut spans = HashSet::new();
    let mut token_start: Option<usize> = None;
    for (offset, ch) in content.char_indices() {
        if ch.is_whitespace() {
            if let Some(start) = token_start.take() {
                spans.insert((start, offset));
            }
        } else if token_start.is_none() {
            token_start = Some(offset);
        }
    }
    if let Some(start) = token_start {
        spans.insert((start, content.len()));
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::dedup::BruteForceDeduplicator;

    fn collect(value: &str, max_len: usize, stopwords: &[&str]) -> Vec<(String, u32)> {
        let value = Text::new(value);
        let stopwords: HashSet<String> = stopwords.iter().map(|s| s.to_string()).collect();
        let mut dedup = BruteForceDeduplicator::new(value.clone());
        let mut emitted = Vec::new();
        enumerate(&value, max_len, &stopwords, &mut dedup, |sub, offset| {
            emitted.push((sub.as_str().to_string(), offset));
            Ok(())
        })
        .unwrap();
        emitted
    }

    #[test]
    fn test_distinct_substrings_with_cap() {
        // "ab ab" with cap 2: "ab" occurs at 0 and 3 but is emitted once,
        // at the position of its first occurrence.
        let emitted = collect("ab ab", 2, &[]);
        let expected: Vec<(String, u32)> = vec![
            ("a".into(), 0),
            ("ab".into(), 0),
            ("b".into(), 1),
            ("b ".into(), 1),
            (" ".into(), 2),
            (" a".into(), 2),
        ];
        assert_eq!(emitted, expected);
    }

    #[test]
    fn test_zero_cap_means_unbounded() {
        let emitted = collect("abc", 0, &[]);
        let substrings: Vec<&str> = emitted.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(substrings, vec!["a", "ab", "abc", "b", "bc", "c"]);
    }

    #[test]
    fn test_stopword_excludes_whole_token_only() {
        let emitted = collect("the theory", 0, &["the"]);
        let substrings: Vec<&str> = emitted.iter().map(|(s, _)| s.as_str()).collect();
        // The whole token "the" (chars 0..3) is suppressed.
        assert!(!substrings.contains(&"the"));
        // But "the" never re-qualifies: its later occurrence inside
        // "theory" is not a whole token, and dedup keys on content; the
        // prefix "theo" containing those characters is still emitted.
        assert!(substrings.contains(&"theo"));
        assert!(substrings.contains(&"theory"));
    }

    #[test]
    fn test_stopword_inside_longer_token_emitted() {
        let emitted = collect("theory", 0, &["the"]);
        let substrings: Vec<&str> = emitted.iter().map(|(s, _)| s.as_str()).collect();
        // "the" here is a prefix of "theory", not a whole token.
        assert!(substrings.contains(&"the"));
    }

    #[test]
    fn test_first_occurrence_offsets_in_characters() {
        // Multibyte characters: offsets count characters, not bytes.
        let emitted = collect("éé x", 1, &[]);
        assert_eq!(
            emitted,
            vec![("é".into(), 0), (" ".into(), 2), ("x".into(), 3)]
        );
    }

    #[test]
    fn test_empty_value_emits_nothing() {
        assert!(collect("", 0, &[]).is_empty());
    }
}
