//! Character-window chunker with sentence-boundary snapping.
//!
//! Lengths are counted in `char`s as a cheap token proxy. Tables pass through
//! untouched; prose is cut into `chunk_size` windows that overlap by
//! `chunk_overlap`, with the cut pulled back to the last sentence terminator
//! found in the final [`LOOKBACK_CHARS`] characters of the window.

use crate::error::{Error, Result};
use crate::types::Chunk;

pub const LOOKBACK_CHARS: usize = 50;

/// ASCII and CJK sentence terminators plus newline.
pub const SENTENCE_BREAKS: [char; 7] = ['。', '！', '？', '\n', '.', '!', '?'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 512, chunk_overlap: 50 }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be > 0".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }

    fn step(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }
}

#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    pub fn chunk(&self, blocks: &[Chunk]) -> Vec<Chunk> {
        let mut out = Vec::new();
        for block in blocks {
            if block.is_table {
                out.push(block.clone());
                continue;
            }
            self.split_block(block, &mut out);
        }
        out
    }

    fn split_block(&self, block: &Chunk, out: &mut Vec<Chunk>) {
        let chars: Vec<char> = block.text.chars().collect();
        let len = chars.len();
        let mut start = 0usize;
        while start < len {
            let end = self.cut_point(&chars, start);
            let window: String = chars[start..end].iter().collect();
            let text = window.trim();
            if !text.is_empty() {
                let mut chunk = Chunk::new(block.doc_id.clone(), block.page, block.section_path.clone(), text);
                chunk.metadata = block.metadata.clone();
                out.push(chunk.with_meta("original_start", start).with_meta("original_end", end));
            }
            // A cut pulled back further than the overlap would otherwise skip
            // text, so the next window never starts past this one's end.
            start = (start + self.config.step()).min(end);
        }
    }

    /// End offset (exclusive) of the window starting at `start`; always > `start`.
    fn cut_point(&self, chars: &[char], start: usize) -> usize {
        let end = (start + self.config.chunk_size).min(chars.len());
        if end == chars.len() {
            return end;
        }
        let look_from = end.saturating_sub(LOOKBACK_CHARS).max(start);
        match chars[look_from..end].iter().rposition(|c| SENTENCE_BREAKS.contains(c)) {
            Some(pos) => look_from + pos + 1,
            None => end,
        }
    }
}
