use serde::{Deserialize, Serialize};

/// One row returned by a similarity query against the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRow {
    /// Id of the upload record the chunk was extracted from.
    pub document_id: String,
    /// Dense embedding vector (empty when returned from queries).
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Cosine similarity to the query, in [-1, 1].
    pub similarity: f64,
    pub file_name: String,
    pub content: String,
    /// Position label of the form `<file_name>_chunk_<N>`.
    pub chunk_info: String,
}

/// A chunk ready to be written to the vector store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub document_id: String,
    pub file_name: String,
    pub chunk_info: String,
    pub content: String,
    pub embedding: Vec<f32>,
}

/// A labelled slice of extracted text, before embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub chunk_info: String,
    pub content: String,
}

impl Chunk {
    /// Attach the owning document and its embedding.
    pub fn into_record(
        self,
        document_id: &str,
        file_name: &str,
        embedding: Vec<f32>,
    ) -> ChunkRecord {
        ChunkRecord {
            document_id: document_id.to_string(),
            file_name: file_name.to_string(),
            chunk_info: self.chunk_info,
            content: self.content,
            embedding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_into_record() {
        let chunk = Chunk {
            chunk_info: "report.pdf_chunk_3".to_string(),
            content: "Hello world".to_string(),
        };
        let record = chunk.into_record("doc1", "report.pdf", vec![1.0, 2.0, 3.0]);
        assert_eq!(record.document_id, "doc1");
        assert_eq!(record.file_name, "report.pdf");
        assert_eq!(record.chunk_info, "report.pdf_chunk_3");
        assert_eq!(record.embedding.len(), 3);
    }

    #[test]
    fn test_chunk_row_embedding_defaults_to_empty() {
        let json = r#"{
            "document_id": "doc1",
            "similarity": 0.95,
            "file_name": "a.txt",
            "content": "test content",
            "chunk_info": "a.txt_chunk_0"
        }"#;
        let row: ChunkRow = serde_json::from_str(json).unwrap();
        assert!(row.embedding.is_empty());
        assert_eq!(row.similarity, 0.95);
    }
}
