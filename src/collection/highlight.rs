//! Snippet reconstruction for search hits
//!
//! The index never stores field text; highlight re-derives the matched
//! token indices from the posting positions of the leaves the winning query
//! plan touched, then wraps those tokens in the stored field value.

use crate::index::{IndexShard, MatchScore, SearchedQuery, NOT_IN_WINDOW};

/// Tokens of context kept on each side of the matched window
const SNIPPET_CONTEXT: usize = 5;

/// Build the `<mark>`-wrapped snippet for one hit field
///
/// Returns `None` when no plan leaf contains the document (match-all) or no
/// token index survives the window computation.
pub(crate) fn highlight_field(
    field_value: &str,
    seq_id: u32,
    searched: &SearchedQuery,
    shard: &IndexShard,
    snippet_threshold: usize,
) -> Option<String> {
    let mut tokens: Vec<String> = field_value.split_whitespace().map(str::to_string).collect();

    let mut token_positions: Vec<Vec<u16>> = Vec::new();
    for term in &searched.tokens {
        if let Some(positions) = shard.leaf_positions(&searched.field, term, seq_id) {
            token_positions.push(positions);
        }
    }
    if token_positions.is_empty() {
        return None;
    }

    let score = MatchScore::compute(&token_positions);
    let words_present = score.offset_diffs.first().copied().unwrap_or(0) as usize;

    let mut token_indices: Vec<usize> = Vec::new();
    for diff in score.offset_diffs.iter().take(words_present + 1).skip(1) {
        if *diff != NOT_IN_WINDOW {
            token_indices.push(score.start_offset as usize + *diff as usize);
        }
    }
    if token_indices.is_empty() {
        return None;
    }

    let min_index = *token_indices.iter().min()?;
    let max_index = *token_indices.iter().max()?;

    let (start, end) = if tokens.len() <= snippet_threshold {
        (0, tokens.len())
    } else {
        (
            min_index.saturating_sub(SNIPPET_CONTEXT),
            (max_index + SNIPPET_CONTEXT).min(tokens.len()),
        )
    };

    for &index in &token_indices {
        if let Some(token) = tokens.get_mut(index) {
            *token = format!("<mark>{}</mark>", token);
        }
    }

    tokens.get(start..end).map(|snippet| snippet.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, FieldType, Schema};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    fn shard_with(title: &str, seq_id: u32) -> IndexShard {
        let schema = Arc::new(
            Schema::new(vec![Field::new("title", FieldType::String)], None).unwrap(),
        );
        let mut shard = IndexShard::new(schema);
        let document: Map<String, Value> = match json!({"title": title}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        shard.index(&document, seq_id, 0);
        shard
    }

    fn query(tokens: &[&str]) -> SearchedQuery {
        SearchedQuery {
            field: "title".to_string(),
            tokens: tokens.iter().map(|t| t.to_string()).collect(),
        }
    }

    #[test]
    fn test_highlight_marks_matched_token() {
        let shard = shard_with("The Hunger Games", 0);
        let snippet =
            highlight_field("The Hunger Games", 0, &query(&["hunger"]), &shard, 30).unwrap();
        assert_eq!(snippet, "The <mark>Hunger</mark> Games");
    }

    #[test]
    fn test_highlight_marks_adjacent_tokens() {
        let shard = shard_with("The Hunger Games", 0);
        let snippet = highlight_field(
            "The Hunger Games",
            0,
            &query(&["hunger", "games"]),
            &shard,
            30,
        )
        .unwrap();
        assert_eq!(snippet, "The <mark>Hunger</mark> <mark>Games</mark>");
    }

    #[test]
    fn test_highlight_windows_long_fields() {
        let words: Vec<String> = (0..40).map(|i| format!("word{}", i)).collect();
        let text = words.join(" ");
        let shard = shard_with(&text, 0);

        let snippet = highlight_field(&text, 0, &query(&["word20"]), &shard, 30).unwrap();
        let tokens: Vec<&str> = snippet.split(' ').collect();
        // five tokens of context either side of the single match
        assert_eq!(tokens.len(), 10);
        assert_eq!(tokens[0], "word15");
        assert_eq!(tokens[5], "<mark>word20</mark>");
        assert_eq!(tokens[9], "word24");
    }

    #[test]
    fn test_highlight_skips_docs_without_leaves() {
        let shard = shard_with("The Hunger Games", 0);
        assert!(highlight_field("The Hunger Games", 0, &query(&["other"]), &shard, 30).is_none());
        assert!(highlight_field("The Hunger Games", 0, &query(&[]), &shard, 30).is_none());
        // plan leaf exists but for a different document
        assert!(highlight_field("Other Title", 9, &query(&["hunger"]), &shard, 30).is_none());
    }
}
