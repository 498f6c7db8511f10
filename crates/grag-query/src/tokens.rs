//! Approximate token accounting for context budgets
//!
//! The external engine budgets context with a real tokenizer; for context
//! assembly on this side a chars/4 approximation is close enough, since the
//! budgets themselves are coarse (thousands of tokens).

/// Approximate token count of a text (4 chars per token, rounded up)
pub fn approx_tokens(text: &str) -> u64 {
    (text.chars().count() as u64 + 3) / 4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approx_tokens() {
        assert_eq!(approx_tokens(""), 0);
        assert_eq!(approx_tokens("abcd"), 1);
        assert_eq!(approx_tokens("abcde"), 2);
        assert_eq!(approx_tokens("a".repeat(12_000).as_str()), 3_000);
    }
}
