use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use tracing::warn;

use super::SearchError;
use crate::models::chunk::ChunkRow;

const CHUNK_MARKER: &str = "_chunk_";

/// Reconstructed document: its chunks in order plus their mean similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSummary {
    pub content: String,
    pub similarity_score: f64,
}

/// Position encoded after the last `_chunk_` of a chunk label.
pub fn parse_chunk_position(label: &str) -> Result<u32, SearchError> {
    label
        .rsplit_once(CHUNK_MARKER)
        .map(|(_, suffix)| suffix)
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse::<u32>().ok())
        .ok_or_else(|| SearchError::MalformedChunkLabel {
            label: label.to_string(),
        })
}

/// Group retrieved chunks by file and rebuild each file's text in chunk order.
///
/// Row order does not affect the result. When two rows claim the same
/// position in a file the first one is kept. Any unparseable label fails the
/// whole aggregation.
pub fn aggregate_chunks(
    rows: &[ChunkRow],
) -> Result<BTreeMap<String, DocumentSummary>, SearchError> {
    let mut grouped: BTreeMap<&str, BTreeMap<u32, (&str, f64)>> = BTreeMap::new();

    for row in rows {
        let position = parse_chunk_position(&row.chunk_info)?;
        match grouped
            .entry(row.file_name.as_str())
            .or_default()
            .entry(position)
        {
            Entry::Vacant(slot) => {
                slot.insert((row.content.as_str(), row.similarity));
            }
            Entry::Occupied(_) => {
                warn!(
                    "Duplicate chunk position {position} for {}; keeping the first row",
                    row.file_name
                );
            }
        }
    }

    Ok(grouped
        .into_iter()
        .map(|(file_name, chunks)| {
            let count = chunks.len() as f64;
            let total: f64 = chunks.values().map(|(_, sim)| sim).sum();
            let content = chunks
                .values()
                .map(|(text, _)| *text)
                .collect::<Vec<_>>()
                .join(" ");
            (
                file_name.to_string(),
                DocumentSummary {
                    content,
                    similarity_score: total / count,
                },
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(file: &str, idx: &str, content: &str, similarity: f64) -> ChunkRow {
        ChunkRow {
            document_id: format!("id-{file}"),
            embedding: vec![],
            similarity,
            file_name: file.to_string(),
            content: content.to_string(),
            chunk_info: format!("{file}_chunk_{idx}"),
        }
    }

    #[test]
    fn test_parse_chunk_position() {
        assert_eq!(parse_chunk_position("a.txt_chunk_0").unwrap(), 0);
        assert_eq!(parse_chunk_position("a.txt_chunk_42").unwrap(), 42);
        assert_eq!(parse_chunk_position("my_chunk_notes.txt_chunk_3").unwrap(), 3);
        assert_eq!(parse_chunk_position("_chunk_7").unwrap(), 7);
    }

    #[test]
    fn test_parse_chunk_position_rejects_malformed() {
        for label in ["a.txt", "a.txt_chunk_", "a.txt_chunk_x", "a.txt_chunk_-1", "a.txt_chunk_+2"] {
            let err = parse_chunk_position(label).unwrap_err();
            assert!(
                matches!(err, SearchError::MalformedChunkLabel { label: ref l } if l == label),
                "{label} should be rejected"
            );
        }
    }

    #[test]
    fn test_chunks_ordered_by_position() {
        let rows = vec![row("foo", "2", "row2", 0.8), row("foo", "0", "row0", 0.6)];
        let docs = aggregate_chunks(&rows).unwrap();
        assert_eq!(docs["foo"].content, "row0 row2");
    }

    #[test]
    fn test_position_order_is_numeric() {
        let rows = vec![
            row("foo", "10", "ten", 0.5),
            row("foo", "2", "two", 0.5),
            row("foo", "1", "one", 0.5),
        ];
        let docs = aggregate_chunks(&rows).unwrap();
        assert_eq!(docs["foo"].content, "one two ten");
    }

    #[test]
    fn test_content_independent_of_row_order() {
        let a = row("doc", "0", "alpha", 0.9);
        let b = row("doc", "1", "beta", 0.7);
        let c = row("doc", "2", "gamma", 0.8);
        let orderings = [
            vec![a.clone(), b.clone(), c.clone()],
            vec![c.clone(), b.clone(), a.clone()],
            vec![b.clone(), a.clone(), c.clone()],
            vec![c.clone(), a.clone(), b.clone()],
        ];

        let expected = aggregate_chunks(&orderings[0]).unwrap();
        assert_eq!(expected["doc"].content, "alpha beta gamma");
        for rows in &orderings[1..] {
            let docs = aggregate_chunks(rows).unwrap();
            assert_eq!(docs["doc"].content, expected["doc"].content);
            assert!((docs["doc"].similarity_score - expected["doc"].similarity_score).abs() < 1e-12);
        }
    }

    #[test]
    fn test_similarity_is_unweighted_mean() {
        let rows = vec![
            row("doc", "0", "short", 0.9),
            row("doc", "1", "a much longer chunk of text", 0.6),
            row("doc", "2", "mid", 0.3),
        ];
        let docs = aggregate_chunks(&rows).unwrap();
        assert!((docs["doc"].similarity_score - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_single_chunk_keeps_exact_similarity() {
        let docs = aggregate_chunks(&[row("solo", "4", "only", 0.8125)]).unwrap();
        assert_eq!(docs["solo"].similarity_score, 0.8125);
        assert_eq!(docs["solo"].content, "only");
    }

    #[test]
    fn test_groups_by_file_name() {
        let rows = vec![
            row("b.txt", "0", "b0", 0.5),
            row("a.txt", "1", "a1", 0.7),
            row("a.txt", "0", "a0", 0.9),
        ];
        let docs = aggregate_chunks(&rows).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs.keys().collect::<Vec<_>>(), vec!["a.txt", "b.txt"]);
        assert_eq!(docs["a.txt"].content, "a0 a1");
        assert!((docs["a.txt"].similarity_score - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_position_keeps_first_row() {
        let rows = vec![row("foo", "1", "better", 0.9), row("foo", "1", "worse", 0.4)];
        let docs = aggregate_chunks(&rows).unwrap();
        assert_eq!(docs["foo"].content, "better");
        assert_eq!(docs["foo"].similarity_score, 0.9);
    }

    #[test]
    fn test_malformed_label_aborts() {
        let mut bad = row("foo", "1", "x", 0.5);
        bad.chunk_info = "foo-part-1".to_string();
        let rows = vec![row("foo", "0", "ok", 0.5), bad];
        assert!(matches!(
            aggregate_chunks(&rows),
            Err(SearchError::MalformedChunkLabel { .. })
        ));
    }

    #[test]
    fn test_empty_input() {
        assert!(aggregate_chunks(&[]).unwrap().is_empty());
    }
}
