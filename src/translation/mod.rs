use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{is_block_comment_end, is_block_comment_start, is_line_comment_start, step_quoted};
use scanner::{State, scan_identifier};

/// Native placeholder style a backend expects after binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// MySQL positional `?`; each occurrence consumes one bound value.
    Positional,
    /// SQL Server `@P1..@Pn`; a repeated name reuses the same ordinal.
    Numbered,
}

/// Result of rewriting `@name` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSql<'a> {
    pub sql: Cow<'a, str>,
    /// Index into the supplied name list for every placeholder rewritten, in
    /// occurrence order. Empty when the SQL carried no matching `@name`.
    pub order: Vec<usize>,
}

impl BoundSql<'_> {
    /// True when at least one `@name` was rewritten.
    #[must_use]
    pub fn matched(&self) -> bool {
        !self.order.is_empty()
    }
}

/// Rewrite `@name` placeholders into the backend's native syntax.
///
/// Only names listed in `names` are touched (case-insensitive, without the `@`).
/// `@@system` variables and unknown `@names` are left alone, as is anything inside
/// quoted strings, quoted identifiers and comments:
/// ```rust
/// use sql_provider::translation::{PlaceholderStyle, bind_named_placeholders};
///
/// let bound = bind_named_placeholders(
///     "SELECT * FROM t WHERE a = @id OR b = @id -- @id",
///     &["id"],
///     PlaceholderStyle::Positional,
/// );
/// assert_eq!(bound.sql, "SELECT * FROM t WHERE a = ? OR b = ? -- @id");
/// assert_eq!(bound.order, vec![0, 0]);
/// ```
/// Returns a borrowed `Cow` when no changes are needed.
#[must_use]
pub fn bind_named_placeholders<'a>(
    sql: &'a str,
    names: &[&str],
    style: PlaceholderStyle,
) -> BoundSql<'a> {
    let mysql_lexing = matches!(style, PlaceholderStyle::Positional);
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut order = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' if mysql_lexing => state = State::Backticked,
                b'[' if !mysql_lexing => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx, mysql_lexing) => {
                    state = State::LineComment;
                }
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'@' if bytes.get(idx + 1) == Some(&b'@') => {
                    // system variable: skip the whole token
                    idx += 2;
                    while idx < bytes.len() && scanner::is_identifier_byte(bytes[idx]) {
                        idx += 1;
                    }
                    continue;
                }
                b'@' => {
                    if let Some((end, name)) = scan_identifier(bytes, idx + 1) {
                        if let Some(pos) = names.iter().position(|n| n.eq_ignore_ascii_case(name)) {
                            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
                            buf.push_str(&sql[copied..idx]);
                            match style {
                                PlaceholderStyle::Positional => buf.push('?'),
                                PlaceholderStyle::Numbered => {
                                    buf.push_str("@P");
                                    buf.push_str(&(pos + 1).to_string());
                                }
                            }
                            copied = end;
                            order.push(pos);
                        }
                        idx = end;
                        continue;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                let (next, closed) = step_quoted(bytes, idx, b'\'', mysql_lexing);
                idx = next;
                if closed {
                    state = State::Normal;
                }
            }
            State::DoubleQuoted => {
                let (next, closed) = step_quoted(bytes, idx, b'"', mysql_lexing);
                idx = next;
                if closed {
                    state = State::Normal;
                }
            }
            State::Backticked => {
                let (next, closed) = step_quoted(bytes, idx, b'`', false);
                idx = next;
                if closed {
                    state = State::Normal;
                }
            }
            State::Bracketed => {
                let (next, closed) = step_quoted(bytes, idx, b']', false);
                idx = next;
                if closed {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }

        idx += 1;
    }

    let sql = match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    };
    BoundSql { sql, order }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_repeated_names_positionally() {
        let sql = "UPDATE t SET a = @a, b = @B WHERE a = @a";
        let res = bind_named_placeholders(sql, &["a", "b"], PlaceholderStyle::Positional);
        assert_eq!(res.sql, "UPDATE t SET a = ?, b = ? WHERE a = ?");
        assert_eq!(res.order, vec![0, 1, 0]);
    }

    #[test]
    fn rewrites_numbered_for_sql_server() {
        let sql = "INSERT INTO t (name, age) VALUES (@name, @age); SELECT @name";
        let res = bind_named_placeholders(sql, &["name", "age"], PlaceholderStyle::Numbered);
        assert_eq!(
            res.sql,
            "INSERT INTO t (name, age) VALUES (@P1, @P2); SELECT @P1"
        );
        assert_eq!(res.order, vec![0, 1, 0]);
    }

    #[test]
    fn leaves_system_and_unknown_variables() {
        let sql = "SELECT @@ROWCOUNT, @other, @id";
        let res = bind_named_placeholders(sql, &["id", "ROWCOUNT"], PlaceholderStyle::Numbered);
        assert_eq!(res.sql, "SELECT @@ROWCOUNT, @other, @P1");
    }

    #[test]
    fn skips_inside_literals_identifiers_and_comments() {
        let sql = "select '@id', [@id], @id -- @id\n/* @id /* @id */ */ from t";
        let res = bind_named_placeholders(sql, &["id"], PlaceholderStyle::Numbered);
        assert_eq!(
            res.sql,
            "select '@id', [@id], @P1 -- @id\n/* @id /* @id */ */ from t"
        );

        let sql = "select `@id`, 'it\\'s @id', @id # @id\nfrom t";
        let res = bind_named_placeholders(sql, &["id"], PlaceholderStyle::Positional);
        assert_eq!(res.sql, "select `@id`, 'it\\'s @id', ? # @id\nfrom t");
    }

    #[test]
    fn prefix_names_do_not_match_longer_identifiers() {
        let sql = "select @id, @identity";
        let res = bind_named_placeholders(sql, &["id"], PlaceholderStyle::Positional);
        assert_eq!(res.sql, "select ?, @identity");
        assert_eq!(res.order, vec![0]);
    }

    #[test]
    fn borrows_when_nothing_matches() {
        let sql = "select * from t where a = ?";
        let res = bind_named_placeholders(sql, &["id"], PlaceholderStyle::Positional);
        assert!(matches!(res.sql, Cow::Borrowed(_)));
        assert!(!res.matched());
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let sql = "select 'héllo', @n, 'ü'";
        let res = bind_named_placeholders(sql, &["n"], PlaceholderStyle::Positional);
        assert_eq!(res.sql, "select 'héllo', ?, 'ü'");
    }
}
