use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::aggregate::DocumentSummary;
use super::synthesizer::AnswerSynthesizer;
use super::{SearchError, upstream};
use crate::database::Database;
use crate::models::api::{ChunkResult, SearchAnswer};
use crate::models::chunk::ChunkRow;

pub const NO_DOCUMENTS_ANSWER: &str = "No relevant documents found.";
pub const NO_READABLE_CONTENT_ANSWER: &str =
    "Relevant documents found but no readable content available.";

/// The document with the highest score. On ties the first in file-name
/// order wins. A NaN score ranks below every real one.
pub fn select_context(
    documents: &BTreeMap<String, DocumentSummary>,
) -> Option<(&str, &DocumentSummary)> {
    let rank = |summary: &DocumentSummary| {
        if summary.similarity_score.is_nan() {
            f64::NEG_INFINITY
        } else {
            summary.similarity_score
        }
    };

    let mut best: Option<(&str, &DocumentSummary)> = None;
    for (file_name, summary) in documents {
        let better = match best {
            None => true,
            Some((_, current)) => rank(summary) > rank(current),
        };
        if better {
            best = Some((file_name.as_str(), summary));
        }
    }
    best
}

pub fn build_prompt(query: &str, context: &str) -> String {
    format!("Query: {query}; Context: {context}")
}

fn sentinel(answer: &str) -> SearchAnswer {
    SearchAnswer {
        response: vec![],
        answer: answer.to_string(),
        file_name: String::new(),
    }
}

/// Per-chunk summaries with file names taken from the upload records.
/// Each document id is looked up once.
async fn resolve_chunk_results(
    rows: &[ChunkRow],
    database: &dyn Database,
) -> Result<Vec<ChunkResult>, SearchError> {
    let mut names: HashMap<&str, Option<String>> = HashMap::new();
    let mut results = Vec::with_capacity(rows.len());

    for row in rows {
        let file_name = match names.get(row.document_id.as_str()) {
            Some(name) => name.clone(),
            None => {
                let name = database
                    .get_upload(&row.document_id)
                    .await
                    .map_err(upstream("metadata lookup"))?
                    .map(|record| record.file_name);
                names.insert(row.document_id.as_str(), name.clone());
                name
            }
        };
        results.push(ChunkResult {
            similarity: row.similarity,
            chunk_info: row.chunk_info.clone(),
            file_name,
        });
    }

    Ok(results)
}

/// Pick the best document and ask the synthesizer about it.
pub async fn assemble_answer(
    documents: &BTreeMap<String, DocumentSummary>,
    rows: &[ChunkRow],
    query: &str,
    database: &dyn Database,
    synthesizer: &dyn AnswerSynthesizer,
    max_output_length: u32,
) -> Result<SearchAnswer, SearchError> {
    let Some((file_name, summary)) = select_context(documents) else {
        return Ok(sentinel(NO_DOCUMENTS_ANSWER));
    };

    if summary.content.trim().is_empty() {
        return Ok(sentinel(NO_READABLE_CONTENT_ANSWER));
    }

    debug!(
        "Selected {file_name} (score {:.4}) from {} documents",
        summary.similarity_score,
        documents.len()
    );

    let response = resolve_chunk_results(rows, database).await?;
    let answer = synthesizer
        .synthesize(&build_prompt(query, &summary.content), max_output_length)
        .await
        .map_err(upstream("synthesizer"))?;

    Ok(SearchAnswer {
        response,
        answer,
        file_name: file_name.to_string(),
    })
}
