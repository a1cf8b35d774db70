//! FTS5 MATCH expression construction.
//!
//! Grounded in `rlm/db.py::_build_match_expr`/`_build_simple_match`: a
//! user query is turned into an `OR`-joined, quoted list of its word
//! tokens rather than passed to `MATCH` verbatim, since raw user input
//! can contain FTS5 query-syntax characters (`"`, `*`, `-`) that would
//! otherwise raise a syntax error. A stricter fallback expression is
//! available for when even the permissive expression fails to parse
//! (pathological input FTS5's own tokenizer rejects).

/// Build a permissive MATCH expression: every run of `[a-zA-Z_][a-zA-Z0-9_]*`
/// at least 2 chars long, quoted and OR-joined.
#[must_use]
pub fn build_match_expr(query: &str) -> String {
    build_from_tokens(tokenize(query, 2))
}

/// Build a stricter MATCH expression: alphabetic-only runs at least 3
/// chars long. Used when [`build_match_expr`]'s output still fails to
/// parse (the ultimate fallback before giving up on FTS entirely).
#[must_use]
pub fn build_simple_match(query: &str) -> String {
    build_from_tokens(
        query
            .split(|c: char| !c.is_ascii_alphabetic())
            .filter(|t| t.chars().count() >= 3)
            .map(str::to_string)
            .collect(),
    )
}

fn tokenize(query: &str, min_len: usize) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for (i, c) in query.char_indices() {
        let is_word_char = c.is_ascii_alphanumeric() || c == '_';
        let is_valid_start = c.is_ascii_alphabetic() || c == '_';
        if is_word_char {
            if current.is_empty() && !is_valid_start {
                // a token can't start with a digit; skip leading digits
                let _ = i;
                continue;
            }
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens.retain(|t| t.chars().count() >= min_len);
    tokens
}

fn build_from_tokens(tokens: Vec<String>) -> String {
    if tokens.is_empty() {
        return String::new();
    }
    tokens
        .iter()
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_expr_quotes_and_ors_tokens() {
        let expr = build_match_expr("sqlite database");
        assert_eq!(expr, "\"sqlite\" OR \"database\"");
    }

    #[test]
    fn match_expr_drops_short_tokens() {
        let expr = build_match_expr("a sqlite");
        assert_eq!(expr, "\"sqlite\"");
    }

    #[test]
    fn match_expr_strips_query_syntax_characters() {
        let expr = build_match_expr("sqlite* OR \"database\"");
        assert!(!expr.contains('*'));
    }

    #[test]
    fn simple_match_requires_three_alpha_chars() {
        let expr = build_simple_match("db sqlite 42");
        assert_eq!(expr, "\"sqlite\"");
    }

    #[test]
    fn empty_query_yields_empty_expr() {
        assert_eq!(build_match_expr("   "), String::new());
    }
}
