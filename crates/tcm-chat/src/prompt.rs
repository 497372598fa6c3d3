//! Prompt assembly: system instructions, retrieved context, history, query

use crate::session::{Role, Turn};

/// Context block delimiter used by the QA template
const RULE: &str = "---------------------";

/// Assembles the final generation prompt. The instruction text constrains
/// the model to answer as a professional TCM physician, strictly from the
/// retrieved context, following syndrome-differentiation logic.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    /// Character budget for the retrieved-context block
    max_context_chars: usize,
}

impl PromptBuilder {
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    /// Join chunk texts in their given (descending score) order, keeping
    /// whole chunks only. The first chunk that would overflow the budget
    /// ends the block; nothing is ever clipped mid-chunk, so the context
    /// is always a rank prefix of the retrieved set.
    pub fn build_context(&self, chunk_texts: &[&str]) -> String {
        let mut context = String::new();
        let mut used = 0;

        for text in chunk_texts {
            let chars = text.chars().count() + if context.is_empty() { 0 } else { 1 };
            if used + chars > self.max_context_chars {
                break;
            }
            if !context.is_empty() {
                context.push('\n');
            }
            context.push_str(text);
            used += chars;
        }
        context
    }

    /// Render the recent conversation, oldest first
    fn render_history(history: &[&Turn]) -> String {
        let mut out = String::new();
        for turn in history {
            let label = match turn.role {
                Role::User => "用户",
                Role::Assistant => "助手",
            };
            out.push_str(label);
            out.push_str("：");
            out.push_str(&turn.text);
            out.push('\n');
        }
        out
    }

    /// Final prompt: system instructions + context + history + new query
    pub fn build(&self, chunk_texts: &[&str], history: &[&Turn], query: &str) -> String {
        let context = self.build_context(chunk_texts);

        let mut prompt = String::new();
        prompt.push_str("上下文信息如下（中医典籍/诊疗指南）：\n");
        prompt.push_str(RULE);
        prompt.push('\n');
        prompt.push_str(&context);
        prompt.push('\n');
        prompt.push_str(RULE);
        prompt.push('\n');

        if !history.is_empty() {
            prompt.push_str("对话历史：\n");
            prompt.push_str(&Self::render_history(history));
        }

        prompt.push_str(
            "请严格根据上下文，以专业中医医师的角度回答以下问题，回答需严谨、简洁，符合中医辨证逻辑：\n",
        );
        prompt.push_str("Query: ");
        prompt.push_str(query);
        prompt.push('\n');
        prompt.push_str("Answer: ");
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_contains_context_history_and_query() {
        let builder = PromptBuilder::new(1000);
        let history = [
            Turn { role: Role::User, text: "什么是气虚".to_string() },
            Turn { role: Role::Assistant, text: "气虚是指...".to_string() },
        ];
        let history_refs: Vec<&Turn> = history.iter().collect();

        let prompt = builder.build(&["气虚的定义是元气不足。"], &history_refs, "如何调理？");

        assert!(prompt.contains("气虚的定义是元气不足。"));
        assert!(prompt.contains("用户：什么是气虚"));
        assert!(prompt.contains("助手：气虚是指..."));
        assert!(prompt.contains("Query: 如何调理？"));
        assert!(prompt.ends_with("Answer: "));
        // Context comes before history, history before the query.
        let ctx = prompt.find("气虚的定义是").unwrap();
        let hist = prompt.find("对话历史").unwrap();
        let query = prompt.find("Query:").unwrap();
        assert!(ctx < hist && hist < query);
    }

    #[test]
    fn empty_history_omits_history_section() {
        let builder = PromptBuilder::new(1000);
        let prompt = builder.build(&["血瘀指血行不畅。"], &[], "什么是血瘀");
        assert!(!prompt.contains("对话历史"));
    }

    #[test]
    fn truncation_drops_whole_chunks_only() {
        let builder = PromptBuilder::new(12);
        // First chunk fits (10 chars); second would overflow and is
        // dropped entirely, not clipped.
        let context = builder.build_context(&["一二三四五六七八九十", "甲乙丙丁戊己庚辛"]);
        assert_eq!(context, "一二三四五六七八九十");
    }

    #[test]
    fn context_preserves_rank_order() {
        let builder = PromptBuilder::new(100);
        let context = builder.build_context(&["最相关", "次相关", "再次"]);
        assert_eq!(context, "最相关\n次相关\n再次");
    }

    #[test]
    fn oversized_first_chunk_yields_empty_context() {
        let builder = PromptBuilder::new(3);
        let context = builder.build_context(&["一二三四五"]);
        assert!(context.is_empty());
    }
}
