//! Text extraction: source file -> page-scoped text and table blocks.
//!
//! [`DocumentExtractor`] routes by extension: `.txt`/`.md` to
//! [`TextExtractor`], `.pdf` to [`PdfExtractor`]. Anything else is reported
//! as unsupported.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::pdf::PdfExtractor;
use crate::types::Chunk;

pub trait Extractor: Send + Sync {
    fn supports(&self, path: &Path) -> bool;
    fn extract(&self, path: &Path) -> Result<Vec<Chunk>>;
}

#[derive(Debug, Default, Clone)]
pub struct TextExtractor;

impl TextExtractor {
    pub fn new() -> Self { Self }

    fn read_file_content(&self, file_path: &Path) -> Result<String> {
        match fs::read_to_string(file_path) {
            Ok(content) => Ok(content),
            Err(_) => Ok(String::from_utf8_lossy(&fs::read(file_path)?).to_string()),
        }
    }
}

impl Extractor for TextExtractor {
    fn supports(&self, path: &Path) -> bool {
        matches!(extension(path).as_deref(), Some("txt") | Some("md"))
    }

    fn extract(&self, path: &Path) -> Result<Vec<Chunk>> {
        let doc_id = doc_id_for(path);
        let content = self.read_file_content(path)?;
        match extension(path).as_deref() {
            Some("txt") => Ok(vec![Chunk::new(doc_id, 1, "Full Content", content)]),
            Some("md") => Ok(split_markdown(&doc_id, &content)),
            other => Err(Error::Operation(format!("unsupported file type: {}", other.unwrap_or("<none>"))).into()),
        }
    }
}

/// Default extractor for ingest.
#[derive(Debug, Default, Clone)]
pub struct DocumentExtractor {
    text: TextExtractor,
    pdf: PdfExtractor,
}

impl DocumentExtractor {
    pub fn new() -> Self { Self::default() }

    fn route(&self, path: &Path) -> Option<&dyn Extractor> {
        if self.text.supports(path) {
            Some(&self.text)
        } else if self.pdf.supports(path) {
            Some(&self.pdf)
        } else {
            None
        }
    }
}

impl Extractor for DocumentExtractor {
    fn supports(&self, path: &Path) -> bool {
        self.route(path).is_some()
    }

    fn extract(&self, path: &Path) -> Result<Vec<Chunk>> {
        match self.route(path) {
            Some(inner) => inner.extract(path),
            None => Err(Error::Operation(format!("unsupported file type: {}", path.display())).into()),
        }
    }
}

/// The document id is the file name, extension included.
pub fn doc_id_for(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| path.to_string_lossy().to_string())
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(|s| s.to_ascii_lowercase())
}

/// Pipe tables become table blocks (emitted first, like page tables); the
/// remaining lines form a single prose block.
fn split_markdown(doc_id: &str, content: &str) -> Vec<Chunk> {
    let lines: Vec<&str> = content.lines().collect();
    let mut tables = Vec::new();
    let mut prose: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let run = lines[i..].iter().take_while(|l| is_table_row(l)).count();
        if run >= 2 && is_separator_row(lines[i + 1]) {
            let mut table = String::new();
            for line in &lines[i..i + run] {
                table.push_str(line.trim());
                table.push('\n');
            }
            tables.push(table);
            i += run;
        } else {
            prose.push(lines[i]);
            i += 1;
        }
    }
    let mut blocks: Vec<Chunk> = tables
        .into_iter()
        .enumerate()
        .map(|(idx, t)| Chunk::table(doc_id, 1, format!("Page 1 Table {}", idx + 1), t))
        .collect();
    let prose = prose.join("\n");
    if !prose.trim().is_empty() {
        blocks.push(Chunk::new(doc_id, 1, "Full Content", prose));
    }
    blocks
}

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|') && t.len() > 1
}

fn is_separator_row(line: &str) -> bool {
    let t = line.trim();
    t.contains('-') && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

/// Every regular file under `root`, sorted for a stable ingest order.
pub fn list_documents(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}
