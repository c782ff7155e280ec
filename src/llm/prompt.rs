//! Prompt assembly for grounded, language-aware answers.

use super::language::detect_language;

/// Standing instructions sent ahead of every conversation.
pub const SYSTEM_PROMPT: &str = "\
You are a friendly assistant. Respond conversationally and kindly.
Answer only from the provided context and the earlier turns of this conversation. Do not make up facts, and do not mention that the context is missing or insufficient.
Answer entirely in the same language the user writes in.
Put every sentence on its own line.
Never use the characters * or ** in your answer.";

/// Instruction prepended to turns whose question is written in Arabic.
pub const ARABIC_ONLY_PREFIX: &str = "أجب باللغة العربية فقط: ";

/// Join retrieved passages into a single context block.
pub fn build_context<'a, I>(passages: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    passages.into_iter().collect::<Vec<_>>().join("\n\n")
}

/// Combine the question and its context into the user turn stored in history.
pub fn build_user_turn(question: &str, context: &str) -> String {
    let turn = format!("{question}\n\nContext:\n{context}");
    if detect_language(question).is_arabic() {
        format!("{ARABIC_ONLY_PREFIX}{turn}")
    } else {
        turn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_joins_passages_with_blank_lines() {
        assert_eq!(build_context(["one", "two"]), "one\n\ntwo");
        assert_eq!(build_context(Vec::<&str>::new()), "");
    }

    #[test]
    fn user_turn_embeds_question_and_context() {
        assert_eq!(
            build_user_turn("When do you open?", "We open at 9."),
            "When do you open?\n\nContext:\nWe open at 9."
        );
    }

    #[test]
    fn arabic_questions_get_arabic_only_instruction() {
        let turn = build_user_turn("متى تفتحون؟", "");
        assert!(turn.starts_with(ARABIC_ONLY_PREFIX));
        assert!(turn.ends_with("متى تفتحون؟\n\nContext:\n"));
    }

    #[test]
    fn system_prompt_forbids_asterisks() {
        assert!(SYSTEM_PROMPT.contains("* or **"));
        assert!(SYSTEM_PROMPT.contains("own line"));
    }
}
