//! Splits filter text into a finite token stream ending in an explicit EOF
//! token, so the parser can always peek without worrying about running off
//! the end of the stream.

use super::error::FilterError;

/// Text of the synthetic end-of-input token.
pub const EOF_TEXT: &str = "\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// Byte offset of the token in the source text.
    pub start: usize,
}

impl Token<'_> {
    pub fn is_eof(&self) -> bool {
        self.text == EOF_TEXT
    }
}

// Treated as individual tokens regardless of what is adjacent.
fn is_single_char_token(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | ',')
}

// These may group together to form a single token (e.g. "<=", "!~").
fn is_punctuation(c: char) -> bool {
    matches!(c, '=' | '<' | '>' | '!' | '~')
}

fn is_word_delimiter(c: char) -> bool {
    c == '"' || is_single_char_token(c) || is_punctuation(c) || c.is_whitespace()
}

/// Tokenizes filter text. The returned sequence always ends with an EOF
/// token. An unterminated quoted literal is a hard failure, distinct from
/// anything the parser reports.
pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>, FilterError> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let offset = |i: usize| chars.get(i).map_or(text.len(), |&(pos, _)| pos);

    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        while i < chars.len() && chars[i].1.is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        let (start, c) = chars[i];
        if c == '"' {
            i += 1;
            let mut terminated = false;
            while i < chars.len() {
                match chars[i].1 {
                    '\\' => i += 2, // skip the escaped character
                    '"' => {
                        i += 1;
                        terminated = true;
                        break;
                    }
                    _ => i += 1,
                }
            }
            if !terminated || i > chars.len() {
                return Err(FilterError::UnterminatedStringLiteral { start });
            }
            tokens.push(Token {
                text: &text[start..offset(i)],
                start,
            });
        } else if is_single_char_token(c) {
            i += 1;
            tokens.push(Token {
                text: &text[start..offset(i)],
                start,
            });
        } else if is_punctuation(c) {
            while i < chars.len() && is_punctuation(chars[i].1) {
                i += 1;
            }
            tokens.push(Token {
                text: &text[start..offset(i)],
                start,
            });
        } else {
            while i < chars.len() && !is_word_delimiter(chars[i].1) {
                i += 1;
            }
            tokens.push(Token {
                text: &text[start..offset(i)],
                start,
            });
        }
    }

    tokens.push(Token {
        text: EOF_TEXT,
        start: text.len(),
    });
    Ok(tokens)
}

/// Wraps text in double quotes, escaping as the tokenizer expects. Useful
/// for building queries programmatically (e.g. "filter to this cell value").
pub fn escape_string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Inverse of `escape_string_literal`, applied to a token including its
/// surrounding quotes. Unknown escapes keep the escaped character as-is.
pub fn unescape_string_literal(token_text: &str) -> String {
    let inner = token_text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(token_text);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str) -> Vec<&str> {
        tokenize(input)
            .expect("tokenize")
            .iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_words_punctuation_and_brackets() {
        assert_eq!(
            texts("@Pid in [1, 2]"),
            vec!["@Pid", "in", "[", "1", ",", "2", "]", EOF_TEXT]
        );
        assert_eq!(
            texts("@Name==\"a\" and(@Level<=error)"),
            vec![
                "@Name", "==", "\"a\"", "and", "(", "@Level", "<=", "error", ")", EOF_TEXT
            ]
        );
    }

    #[test]
    fn test_punctuation_runs_group() {
        assert_eq!(texts("=~ !~ <= >= !="), vec!["=~", "!~", "<=", ">=", "!=", EOF_TEXT]);
    }

    #[test]
    fn test_offsets() {
        let tokens = tokenize("  foo \"b c\"").expect("tokenize");
        assert_eq!(tokens[0], Token { text: "foo", start: 2 });
        assert_eq!(tokens[1], Token { text: "\"b c\"", start: 6 });
        assert_eq!(tokens[2], Token { text: EOF_TEXT, start: 11 });
    }

    #[test]
    fn test_quoted_literal_with_escapes() {
        assert_eq!(
            texts(r#"@Msg == "a \"quoted\" \\ thing""#),
            vec!["@Msg", "==", r#""a \"quoted\" \\ thing""#, EOF_TEXT]
        );
    }

    #[test]
    fn test_unterminated_literal_is_hard_failure() {
        assert_eq!(
            tokenize("@Msg == \"oops"),
            Err(FilterError::UnterminatedStringLiteral { start: 8 })
        );
        // A trailing escape cannot terminate the literal either.
        assert_eq!(
            tokenize("\"oops\\\""),
            Err(FilterError::UnterminatedStringLiteral { start: 0 })
        );
    }

    #[test]
    fn test_empty_input_is_just_eof() {
        assert_eq!(texts(""), vec![EOF_TEXT]);
        assert_eq!(texts("   "), vec![EOF_TEXT]);
    }

    #[test]
    fn test_escape_round_trip() {
        let cases = ["", "foo", "foo bar", "\"foo\"", "\\", "\n", "\t", "\r", "a\\nb"];
        for text in cases {
            let literal = escape_string_literal(text);
            assert_eq!(unescape_string_literal(&literal), text, "literal: {literal}");
        }
        assert_eq!(escape_string_literal("foo"), "\"foo\"");
        assert_eq!(escape_string_literal("\"foo\""), "\"\\\"foo\\\"\"");
    }
}
