//! Domain types used by the lexical and vector indexes and the grounding stage.

use serde::{Deserialize, Serialize};

pub type ChunkId = String;
pub type Meta = serde_json::Map<String, serde_json::Value>;

/// The atomic retrieval unit.
///
/// - `id`: content-derived identifier, see [`chunk_id_for`]
/// - `doc_id`: stable document identity (file name)
/// - `page`: 1-based page within the document
/// - `section_path`: human-readable locator such as "Page 3 Table 2"
/// - `text`: chunk body, markdown when the source was tabular
/// - `is_table`: the chunk holds a table verbatim and is never split
/// - `metadata`: free-form provenance (character offsets and the like)
///
/// `(doc_id, page)` is what citations point at; it is not unique across chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: ChunkId,
    pub doc_id: String,
    pub page: u32,
    pub section_path: String,
    pub text: String,
    #[serde(default)]
    pub is_table: bool,
    #[serde(default)]
    pub metadata: Meta,
}

impl Chunk {
    pub fn new(doc_id: impl Into<String>, page: u32, section_path: impl Into<String>, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id: chunk_id_for(&text),
            doc_id: doc_id.into(),
            page,
            section_path: section_path.into(),
            text,
            is_table: false,
            metadata: Meta::new(),
        }
    }

    pub fn table(doc_id: impl Into<String>, page: u32, section_path: impl Into<String>, text: impl Into<String>) -> Self {
        Self { is_table: true, ..Self::new(doc_id, page, section_path, text) }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Identifier used as the fusion key between the two indexes.
///
/// Derived from the text alone, so two chunks share an id exactly when their
/// text is byte-identical. Duplicate passages ingested from different pages
/// therefore collapse into one fused entry.
pub fn chunk_id_for(text: &str) -> ChunkId {
    let hash = blake3::hash(text.as_bytes());
    hash.to_hex().as_str()[..32].to_string()
}

/// Indicates which index produced a result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Lexical,
}

/// A chunk with an index-local score. Higher is better; scores from different
/// indexes are not comparable until normalised.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
    pub source: SourceKind,
}
