//! PDF extraction, one text block per page plus table blocks.
//!
//! `pdf-extract` gives plain text per page with no table structure, so tables
//! are recovered from column layout: two or more consecutive lines that each
//! split into at least two cells on runs of two or more spaces (or tabs).

use anyhow::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::Path;

use crate::error::Error;
use crate::extract::{doc_id_for, Extractor};
use crate::types::Chunk;

static CELL_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"\t+| {2,}").expect("cell gap pattern is valid"));

#[derive(Debug, Default, Clone)]
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self { Self }

    fn pages(&self, path: &Path) -> Result<Vec<String>> {
        let bytes = fs::read(path)?;
        // pdf-extract panics on some malformed fonts
        match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(&bytes)) {
            Ok(Ok(pages)) => Ok(pages),
            Ok(Err(e)) => Err(Error::Operation(format!("pdf extraction failed for {}: {}", path.display(), e)).into()),
            Err(_) => Err(Error::Operation(format!("pdf extraction panicked for {}", path.display())).into()),
        }
    }
}

impl Extractor for PdfExtractor {
    fn supports(&self, path: &Path) -> bool {
        path.extension().and_then(|s| s.to_str()).is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    }

    fn extract(&self, path: &Path) -> Result<Vec<Chunk>> {
        let doc_id = doc_id_for(path);
        let mut blocks = Vec::new();
        for (idx, text) in self.pages(path)?.iter().enumerate() {
            let page = idx as u32 + 1;
            for (t, table) in page_tables(text).into_iter().enumerate() {
                blocks.push(Chunk::table(&doc_id, page, format!("Page {} Table {}", page, t + 1), table));
            }
            if !text.trim().is_empty() {
                blocks.push(Chunk::new(&doc_id, page, format!("Page {} Content", page), text.trim()));
            }
        }
        tracing::debug!(doc = %doc_id, blocks = blocks.len(), "PDF extracted");
        Ok(blocks)
    }
}

fn cells(line: &str) -> Vec<&str> {
    CELL_GAP.split(line.trim()).filter(|c| !c.is_empty()).collect()
}

/// Column-aligned runs in `text`, rendered as markdown pipe tables.
pub fn page_tables(text: &str) -> Vec<String> {
    let rows: Vec<Vec<&str>> = text.lines().map(cells).collect();
    let mut tables = Vec::new();
    let mut i = 0;
    while i < rows.len() {
        let run = rows[i..].iter().take_while(|r| r.len() >= 2).count();
        if run >= 2 {
            tables.push(to_markdown(&rows[i..i + run]));
            i += run;
        } else {
            i += 1;
        }
    }
    tables
}

fn to_markdown(rows: &[Vec<&str>]) -> String {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let line = |row: &[&str]| {
        let mut cols: Vec<&str> = row.to_vec();
        cols.resize(width, "");
        format!("| {} |\n", cols.join(" | "))
    };
    let mut out = line(&rows[0]);
    out.push_str(&format!("|{}\n", "---|".repeat(width)));
    for row in &rows[1..] {
        out.push_str(&line(row));
    }
    out
}
