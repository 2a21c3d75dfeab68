//! Word segmentation for mixed Chinese / Latin text.
//!
//! Chinese has no spaces to split on, so runs are cut with jieba in search
//! mode: a long dictionary word is emitted together with the shorter
//! dictionary words inside it ("边坡稳定性" -> "边坡", "稳定", "稳定性", ...).
//! Latin runs come out as words; tokens without a letter or digit are
//! dropped.

use jieba_rs::{Jieba, TokenizeMode};
use once_cell::sync::Lazy;
use tantivy::tokenizer::{Token, TokenStream, Tokenizer};

static JIEBA: Lazy<Jieba> = Lazy::new(Jieba::new);

#[derive(Clone, Default)]
pub struct JiebaTokenizer;

pub struct SegmentedTokenStream {
	tokens: Vec<Token>,
	cursor: usize,
}

impl Tokenizer for JiebaTokenizer {
	type TokenStream<'a> = SegmentedTokenStream;

	fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
		SegmentedTokenStream { tokens: segment(text), cursor: 0 }
	}
}

impl TokenStream for SegmentedTokenStream {
	fn advance(&mut self) -> bool {
		if self.cursor < self.tokens.len() {
			self.cursor += 1;
			true
		} else {
			false
		}
	}

	fn token(&self) -> &Token {
		&self.tokens[self.cursor - 1]
	}

	fn token_mut(&mut self) -> &mut Token {
		&mut self.tokens[self.cursor - 1]
	}
}

/// Split `text` into tokens with byte offsets and sequential positions.
pub fn segment(text: &str) -> Vec<Token> {
	// jieba reports char offsets
	let mut byte_at: Vec<usize> = text.char_indices().map(|(b, _)| b).collect();
	byte_at.push(text.len());

	let mut tokens = Vec::new();
	for word in JIEBA.tokenize(text, TokenizeMode::Search, true) {
		let from = byte_at[word.start];
		// jieba keeps '-', '.' and '_' inside Latin runs; "slope-safety" must index both words
		for (start, end) in alphanumeric_runs(&text[from..byte_at[word.end]]) {
			push(&mut tokens, text, from + start, from + end);
		}
	}
	tokens
}

fn alphanumeric_runs(word: &str) -> Vec<(usize, usize)> {
	let mut runs = Vec::new();
	let mut start = None;
	for (i, c) in word.char_indices() {
		match (c.is_alphanumeric(), start) {
			(true, None) => start = Some(i),
			(false, Some(s)) => {
				runs.push((s, i));
				start = None;
			}
			_ => {}
		}
	}
	if let Some(s) = start {
		runs.push((s, word.len()));
	}
	runs
}

fn push(tokens: &mut Vec<Token>, text: &str, from: usize, to: usize) {
	let position = tokens.len();
	tokens.push(Token {
		offset_from: from,
		offset_to: to,
		position,
		text: text[from..to].to_string(),
		position_length: 1,
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	fn texts(s: &str) -> Vec<String> {
		segment(s).into_iter().map(|t| t.text).collect()
	}

	#[test]
	fn latin_words_split_on_punctuation() {
		assert_eq!(texts("Heavy rainfall, slope-safety!"), vec!["Heavy", "rainfall", "slope", "safety"]);
	}

	#[test]
	fn chinese_is_cut_on_word_boundaries() {
		let t = texts("边坡稳定");
		assert!(t.contains(&"稳定".to_string()), "{t:?}");
		assert!(!t.contains(&"坡稳".to_string()), "{t:?}");
	}

	#[test]
	fn mixed_script_offsets_point_into_the_text() {
		let text = "降雨 rain 50mm";
		let toks = segment(text);
		assert!(toks.iter().any(|t| t.text == "降雨"));
		let rain = toks.iter().find(|t| t.text == "rain").expect("latin word kept");
		assert_eq!(rain.offset_from, "降雨 ".len());
		assert!(toks.iter().all(|t| &text[t.offset_from..t.offset_to] == t.text));
		assert!(toks.iter().enumerate().all(|(i, t)| t.position == i));
	}
}
