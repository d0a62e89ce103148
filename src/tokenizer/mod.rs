//! Whitespace tokenizer
//!
//! Tokens are the lowercase whitespace-split pieces of a string field.
//! Positions are counted in tokens, starting at 0; array fields concatenate
//! element positions with no gap, so positions stay monotone across the
//! whole field value.

use std::collections::HashMap;

/// Split a query or field value into lowercase tokens
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|token| token.to_lowercase())
        .collect()
}

/// Accumulate token positions for one string value
///
/// `base` is the position of the value's first token; returns the position
/// one past the value's last token, so array elements can be chained.
pub fn accumulate_positions(
    text: &str,
    base: u16,
    positions: &mut HashMap<String, Vec<u16>>,
) -> u16 {
    let mut offset = base;
    for token in text.split_whitespace() {
        positions
            .entry(token.to_lowercase())
            .or_default()
            .push(offset);
        offset = offset.saturating_add(1);
    }
    offset
}

/// Token positions for a single string value
pub fn token_positions(text: &str) -> HashMap<String, Vec<u16>> {
    let mut positions = HashMap::new();
    accumulate_positions(text, 0, &mut positions);
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_lowercases() {
        assert_eq!(
            tokenize("The Hunger  Games"),
            vec!["the", "hunger", "games"]
        );
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_token_positions() {
        let positions = token_positions("to be or not to be");
        assert_eq!(positions["to"], vec![0, 4]);
        assert_eq!(positions["be"], vec![1, 5]);
        assert_eq!(positions["or"], vec![2]);
        assert_eq!(positions["not"], vec![3]);
    }

    #[test]
    fn test_accumulate_across_elements() {
        let mut positions = HashMap::new();
        let next = accumulate_positions("red shirt", 0, &mut positions);
        assert_eq!(next, 2);
        let next = accumulate_positions("blue shirt", next, &mut positions);
        assert_eq!(next, 4);

        assert_eq!(positions["shirt"], vec![1, 3]);
        assert_eq!(positions["red"], vec![0]);
        assert_eq!(positions["blue"], vec![2]);
    }
}
