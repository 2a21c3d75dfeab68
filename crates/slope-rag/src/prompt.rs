//! Grounding prompt: fixed instructions, enumerated evidence, target schema.

use slope_core::types::Chunk;

pub const SYSTEM_PROMPT: &str = "你是一位资深的边坡工程顾问专家。请基于提供的上下文证据回答用户的问题。
请严格遵守以下规则：
1. 仅根据提供的上下文回答，不要编造信息。
2. 如果上下文不足以回答问题，请明确说明。
3. 输出必须是合法的 JSON 格式，包含 risk_level, rationale, citations, recommendations 字段。
4. citations 中的 doc_id 和 page 必须严格来自上下文。
";

const SCHEMA_HINT: &str = r#"请以 JSON 格式输出回答，格式如下：
{
    "risk_level": "low|medium|high",
    "rationale": "分析理由...",
    "citations": [{"doc_id": "...", "page": 1}],
    "recommendations": ["建议1", "建议2"]
}
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingPrompt {
    pub system: String,
    pub user: String,
}

impl GroundingPrompt {
    /// Qwen-style chat template, ending with an open assistant turn.
    pub fn to_chatml(&self) -> String {
        format!(
            "<|im_start|>system\n{}<|im_end|>\n<|im_start|>user\n{}<|im_end|>\n<|im_start|>assistant\n",
            self.system, self.user
        )
    }
}

/// Build the prompt for `query` over `shortlist`.
///
/// Evidence content shares a budget of `max_ctx_chars` characters in shortlist
/// order; once it is spent, later evidence blocks keep their Doc ID and Page
/// but carry empty content.
pub fn build_prompt(query: &str, shortlist: &[Chunk], max_ctx_chars: usize) -> GroundingPrompt {
    let mut remaining = max_ctx_chars;
    let mut context = String::new();
    for (i, chunk) in shortlist.iter().enumerate() {
        let content: String = chunk.text.chars().take(remaining).collect();
        remaining -= content.chars().count();
        context.push_str(&format!("Evidence {}:\n", i + 1));
        context.push_str(&format!("Doc ID: {}\n", chunk.doc_id));
        context.push_str(&format!("Page: {}\n", chunk.page));
        context.push_str(&format!("Content: {}\n\n", content));
    }
    let user = format!("\nContext:\n{}\n\nQuestion: {}\n\n{}", context, query, SCHEMA_HINT);
    GroundingPrompt { system: SYSTEM_PROMPT.to_string(), user }
}
