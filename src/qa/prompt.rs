//! Prompt construction for grounded answers.

/// Reply the chat model is told to give when the context has no answer.
pub const REFUSAL_ANSWER: &str = "answer is not available in the context";

/// Instructions sent to the chat model. `{context}` and `{question}` are
/// substituted by [`render_prompt`].
pub const PROMPT_TEMPLATE: &str = "Answer the question as detailed as possible from the provided context.
If the answer is not in the provided context, just say \"answer is not available in the context.\"

Context:
 {context}

Question:
{question}

Answer:
";

/// Fill the template with ranked context chunks and the question.
///
/// Chunks are joined with a blank line, best match first.
pub fn render_prompt<S: AsRef<str>>(context_chunks: &[S], question: &str) -> String {
    let context = context_chunks
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n\n");

    // Single pass so placeholders inside documents or questions stay literal
    let (head, rest) = PROMPT_TEMPLATE
        .split_once("{context}")
        .unwrap_or((PROMPT_TEMPLATE, ""));
    let (middle, tail) = rest.split_once("{question}").unwrap_or((rest, ""));
    format!("{head}{context}{middle}{question}{tail}")
}

/// Whether a model reply is the refusal answer.
pub fn is_refusal(answer: &str) -> bool {
    answer.to_lowercase().contains(REFUSAL_ANSWER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_prompt_layout() {
        let prompt = render_prompt(&["first chunk", "second chunk"], "What is it?");

        assert!(prompt.starts_with("Answer the question as detailed as possible"));
        assert!(prompt.contains("Context:\n first chunk\n\nsecond chunk\n"));
        assert!(prompt.contains("Question:\nWhat is it?\n"));
        assert!(prompt.ends_with("Answer:\n"));
        assert!(prompt.contains(REFUSAL_ANSWER));
    }

    #[test]
    fn test_render_prompt_without_context() {
        let prompt = render_prompt::<&str>(&[], "Anything?");
        assert!(prompt.contains("Context:\n \n"));
    }

    #[test]
    fn test_question_placeholders_stay_literal() {
        let prompt = render_prompt(&["ctx mentions {question}"], "What does {context} mean?");
        assert!(prompt.contains("Context:\n ctx mentions {question}\n"));
        assert!(prompt.contains("Question:\nWhat does {context} mean?\n"));
    }

    #[test]
    fn test_is_refusal() {
        assert!(is_refusal("answer is not available in the context"));
        assert!(is_refusal("Answer is not available in the context."));
        assert!(is_refusal("  The answer is not available in the context. "));
        assert!(!is_refusal("The capital of France is Paris."));
    }
}
