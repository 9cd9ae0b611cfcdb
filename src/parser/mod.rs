use tracing::debug;

use crate::models::chunk::Chunk;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Unsupported file type: {0:?}")]
    UnsupportedFileType(String),
    #[error("File is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
}

/// Extensions decoded as plain UTF-8 text.
const TEXT_EXTENSIONS: &[&str] = &["txt", "csv", "md", "xls", "xlsx"];

/// Extract the text of an uploaded file, chosen by its extension.
pub async fn extract_text(bytes: Vec<u8>, extension: &str) -> Result<String, ParseError> {
    let ext = extension.trim_start_matches('.').to_ascii_lowercase();

    if ext == "pdf" {
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|e| ParseError::Pdf(e.to_string()))?
            .map_err(|e| ParseError::Pdf(e.to_string()))?;
        debug!("Extracted {} chars from PDF", text.len());
        return Ok(text);
    }

    if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return Ok(String::from_utf8(bytes)?);
    }

    Err(ParseError::UnsupportedFileType(ext))
}

/// Label stored with each chunk: `<file_name>_chunk_<index>`.
pub fn chunk_label(file_name: &str, index: usize) -> String {
    format!("{file_name}_chunk_{index}")
}

/// Text after the last `.`, or empty.
pub fn file_extension(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or("")
}

/// Strip any client-supplied directory components from an upload name.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    match base {
        "." | ".." => String::new(),
        _ => base.to_string(),
    }
}

/// Split extracted text and label each non-blank piece in order.
pub fn split_into_chunks(
    file_name: &str,
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<Chunk> {
    split_text(text, chunk_size, chunk_overlap)
        .into_iter()
        .filter(|c| !c.trim().is_empty())
        .enumerate()
        .map(|(i, content)| Chunk {
            chunk_info: chunk_label(file_name, i),
            content,
        })
        .collect()
}

/// Text chunking using recursive character splitting.
/// Splits text into chunks of approximately `chunk_size` characters
/// with `chunk_overlap` character overlap. Never cuts inside a code point.
pub fn split_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return vec![];
    }
    if char_len(text) <= chunk_size {
        return vec![text.to_string()];
    }

    let separators = ["\n\n", "\n", ". ", " ", ""];
    recursive_split(text, &separators, chunk_size, chunk_overlap)
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// The last `n` characters of `s`.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match s.char_indices().rev().nth(n - 1) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}

fn split_chars(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + chunk_size).min(total);
        chunks.push(text[bounds[start]..bounds[end]].to_string());
        if end >= total {
            break;
        }
        start = end.saturating_sub(chunk_overlap).max(start + 1);
    }
    chunks
}

fn recursive_split(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    chunk_overlap: usize,
) -> Vec<String> {
    if char_len(text) <= chunk_size || separators.is_empty() {
        return vec![text.to_string()];
    }

    let separator = separators[0];
    let remaining_separators = &separators[1..];

    if separator.is_empty() {
        return split_chars(text, chunk_size, chunk_overlap);
    }

    let mut chunks = Vec::new();
    let mut current = String::new();

    for part in text.split(separator) {
        let candidate = if current.is_empty() {
            part.to_string()
        } else {
            format!("{current}{separator}{part}")
        };

        if char_len(&candidate) <= chunk_size {
            current = candidate;
            continue;
        }

        if current.is_empty() {
            // Single part bigger than chunk_size.
            chunks.extend(recursive_split(part, remaining_separators, chunk_size, chunk_overlap));
            continue;
        }

        if char_len(&current) > chunk_size {
            chunks.extend(recursive_split(&current, remaining_separators, chunk_size, chunk_overlap));
        } else {
            chunks.push(current.clone());
        }

        let overlap = tail_chars(&current, chunk_overlap);
        current = if overlap.is_empty() {
            part.to_string()
        } else {
            format!("{overlap}{separator}{part}")
        };
    }

    if !current.is_empty() {
        if char_len(&current) > chunk_size {
            chunks.extend(recursive_split(&current, remaining_separators, chunk_size, chunk_overlap));
        } else {
            chunks.push(current);
        }
    }

    chunks
}
