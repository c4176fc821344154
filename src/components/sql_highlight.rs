//! Syntax colouring for SQL script templates
//!
//! Understands plain SQL plus Jinja `{{ }}`, `{% %}` and `{# #}` blocks, which
//! are coloured as a unit so a script reads the same before and after rendering.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

const SQL_KEYWORDS: &[&str] = &[
    "SELECT", "FROM", "WHERE", "JOIN", "INNER", "LEFT", "RIGHT", "OUTER", "FULL", "CROSS", "ON",
    "USING", "AS", "AND", "OR", "NOT", "IN", "EXISTS", "BETWEEN", "LIKE", "ILIKE", "IS", "NULL",
    "TRUE", "FALSE", "GROUP", "BY", "HAVING", "ORDER", "ASC", "DESC", "LIMIT", "OFFSET", "INSERT",
    "INTO", "VALUES", "UPDATE", "SET", "DELETE", "CREATE", "TABLE", "ALTER", "DROP", "INDEX",
    "VIEW", "SCHEMA", "WITH", "RECURSIVE", "CASE", "WHEN", "THEN", "ELSE", "END", "DISTINCT",
    "UNION", "ALL", "INTERSECT", "EXCEPT", "COUNT", "SUM", "AVG", "MIN", "MAX", "CAST", "COALESCE",
    "BEGIN", "COMMIT", "ROLLBACK", "RETURNING",
];

#[derive(Debug, PartialEq, Clone)]
enum Token<'a> {
    Keyword(&'a str),
    String(&'a str),
    Number(&'a str),
    Comment(&'a str),
    Template(&'a str),
    Identifier(&'a str),
    Whitespace(&'a str),
    Punctuation(&'a str),
}

/// Byte offset just past `close`, or the end of input when it never appears
fn scan_until(src: &str, from: usize, close: &str) -> usize {
    src[from..]
        .find(close)
        .map(|i| from + i + close.len())
        .unwrap_or(src.len())
}

/// Byte offset just past the closing quote; doubled quotes stay inside
fn scan_quoted(src: &str, from: usize, quote: char) -> usize {
    let mut iter = src[from + quote.len_utf8()..].char_indices().peekable();
    while let Some((i, c)) = iter.next() {
        if c == quote {
            if iter.peek().map(|(_, n)| *n) == Some(quote) {
                iter.next();
                continue;
            }
            return from + quote.len_utf8() + i + c.len_utf8();
        }
    }
    src.len()
}

fn tokenize(src: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < src.len() {
        let rest = &src[pos..];
        let Some(ch) = rest.chars().next() else {
            break;
        };

        let end = if rest.starts_with("{{") {
            let end = scan_until(src, pos + 2, "}}");
            tokens.push(Token::Template(&src[pos..end]));
            end
        } else if rest.starts_with("{%") {
            let end = scan_until(src, pos + 2, "%}");
            tokens.push(Token::Template(&src[pos..end]));
            end
        } else if rest.starts_with("{#") {
            let end = scan_until(src, pos + 2, "#}");
            tokens.push(Token::Comment(&src[pos..end]));
            end
        } else if rest.starts_with("--") {
            let end = rest.find('\n').map(|i| pos + i).unwrap_or(src.len());
            tokens.push(Token::Comment(&src[pos..end]));
            end
        } else if rest.starts_with("/*") {
            let end = scan_until(src, pos + 2, "*/");
            tokens.push(Token::Comment(&src[pos..end]));
            end
        } else if ch == '\'' || ch == '"' {
            let end = scan_quoted(src, pos, ch);
            tokens.push(Token::String(&src[pos..end]));
            end
        } else if ch.is_whitespace() {
            let len: usize = rest
                .chars()
                .take_while(|c| c.is_whitespace())
                .map(char::len_utf8)
                .sum();
            tokens.push(Token::Whitespace(&src[pos..pos + len]));
            pos + len
        } else if ch.is_alphanumeric() || ch == '_' || ch == '$' {
            let len: usize = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$' || *c == '.')
                .map(char::len_utf8)
                .sum();
            tokens.push(classify_word(&src[pos..pos + len]));
            pos + len
        } else {
            let end = pos + ch.len_utf8();
            tokens.push(Token::Punctuation(&src[pos..end]));
            end
        };
        pos = end;
    }

    tokens
}

fn classify_word(word: &str) -> Token<'_> {
    let upper = word.to_uppercase();

    if SQL_KEYWORDS.contains(&upper.as_str()) {
        Token::Keyword(word)
    } else if word.chars().all(|c| c.is_ascii_digit() || c == '.') {
        Token::Number(word)
    } else {
        Token::Identifier(word)
    }
}

/// Colour a script into one ratatui line per source line
pub fn highlight_sql(sql: &str) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();

    for token in tokenize(sql) {
        let (style, text) = match token {
            Token::Keyword(s) => (
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                s,
            ),
            Token::String(s) => (Style::default().fg(Color::Green), s),
            Token::Number(s) => (Style::default().fg(Color::Magenta), s),
            Token::Comment(s) => (Style::default().fg(Color::DarkGray), s),
            Token::Template(s) => (
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                s,
            ),
            Token::Identifier(s) => (Style::default().fg(Color::White), s),
            Token::Whitespace(s) => (Style::default(), s),
            Token::Punctuation(s) => (Style::default().fg(Color::Gray), s),
        };

        for (i, part) in text.split('\n').enumerate() {
            if i > 0 {
                lines.push(Line::from(std::mem::take(&mut current)));
            }
            if !part.is_empty() {
                current.push(Span::styled(part.trim_end_matches('\r').to_string(), style));
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(Line::from(current));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_simple_select() {
        let tokens = tokenize("SELECT * FROM users");
        assert_eq!(
            tokens,
            vec![
                Token::Keyword("SELECT"),
                Token::Whitespace(" "),
                Token::Punctuation("*"),
                Token::Whitespace(" "),
                Token::Keyword("FROM"),
                Token::Whitespace(" "),
                Token::Identifier("users"),
            ]
        );
    }

    #[test]
    fn test_template_blocks_are_single_tokens() {
        let tokens = tokenize("where name = '{{ value }}' {% if value %}and 1=1{% endif %}");
        assert!(tokens.contains(&Token::String("'{{ value }}'")));
        assert!(tokens.contains(&Token::Template("{% if value %}")));
        assert!(tokens.contains(&Token::Template("{% endif %}")));

        let bare = tokenize("select {{ value }}");
        assert_eq!(bare.last(), Some(&Token::Template("{{ value }}")));
    }

    #[test]
    fn test_unterminated_constructs_run_to_end() {
        assert_eq!(tokenize("{{ value"), vec![Token::Template("{{ value")]);
        assert_eq!(tokenize("'open"), vec![Token::String("'open")]);
    }

    #[test]
    fn test_doubled_quote_stays_in_string() {
        let tokens = tokenize("'it''s' x");
        assert_eq!(tokens[0], Token::String("'it''s'"));
    }

    #[test]
    fn test_comments() {
        let tokens = tokenize("select 1 -- note\n/* block */ {# jinja #}");
        let comments = tokens
            .iter()
            .filter(|t| matches!(t, Token::Comment(_)))
            .count();
        assert_eq!(comments, 3);
    }

    #[test]
    fn test_classify() {
        assert!(matches!(classify_word("select"), Token::Keyword(_)));
        assert!(matches!(classify_word("45.67"), Token::Number(_)));
        assert!(matches!(classify_word("dwh.clients"), Token::Identifier(_)));
    }

    #[test]
    fn test_highlight_line_count() {
        assert_eq!(highlight_sql("select id,\n  name\nfrom t").len(), 3);
        assert_eq!(highlight_sql("").len(), 1);
        assert_eq!(highlight_sql("select 'тест'").len(), 1);
    }
}
