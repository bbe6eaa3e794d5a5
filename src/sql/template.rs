//! Named-parameter SQL templates.
//!
//! A template is plain SQL with `:name` placeholders. Parsing rewrites every
//! placeholder to a positional `?` and records the names in order, so the
//! statement can be bound positionally by sqlx. Comments (`--`, `/* */`),
//! single-quoted literals and the `::` cast operator are copied untouched.

use crate::error::VaultError;
use std::collections::BTreeSet;
use std::io::Read;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplate {
    sql: String,
    keys: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    Literal,
    LineComment,
    BlockComment,
}

fn is_identifier_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

impl SqlTemplate {
    pub fn parse(template: &str) -> Self {
        let chars: Vec<char> = template.chars().collect();
        let mut sql = String::with_capacity(template.len());
        let mut keys = Vec::new();
        let mut state = Scan::Code;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            match state {
                Scan::LineComment => {
                    sql.push(c);
                    if c == '\n' || c == '\r' {
                        state = Scan::Code;
                    }
                    i += 1;
                }
                Scan::BlockComment => {
                    if c == '*' && next == Some('/') {
                        sql.push_str("*/");
                        state = Scan::Code;
                        i += 2;
                    } else {
                        sql.push(c);
                        i += 1;
                    }
                }
                Scan::Literal => {
                    sql.push(c);
                    if c == '\'' {
                        state = Scan::Code;
                    }
                    i += 1;
                }
                Scan::Code => match (c, next) {
                    ('-', Some('-')) => {
                        sql.push_str("--");
                        state = Scan::LineComment;
                        i += 2;
                    }
                    ('/', Some('*')) => {
                        sql.push_str("/*");
                        state = Scan::BlockComment;
                        i += 2;
                    }
                    ('\'', _) => {
                        sql.push(c);
                        state = Scan::Literal;
                        i += 1;
                    }
                    (':', Some(':')) => {
                        sql.push_str("::");
                        i += 2;
                    }
                    (':', Some(n)) if is_identifier_part(n) => {
                        let start = i + 1;
                        let end = chars[start..]
                            .iter()
                            .position(|&ch| !is_identifier_part(ch))
                            .map_or(chars.len(), |offset| start + offset);
                        keys.push(chars[start..end].iter().collect());
                        sql.push('?');
                        i = end;
                    }
                    _ => {
                        sql.push(c);
                        i += 1;
                    }
                },
            }
        }

        Self { sql, keys }
    }

    /// Read a template from a stream. Templates are static application text,
    /// so a read failure is a configuration error.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self, VaultError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(VaultError::Template)?;
        Ok(Self::parse(&text))
    }

    /// SQL with every placeholder rewritten to `?`.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Placeholder names in order of appearance, repeats included.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn distinct_keys(&self) -> BTreeSet<&str> {
        self.keys.iter().map(String::as_str).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholders(sql: &str) -> usize {
        sql.chars().filter(|&c| c == '?').count()
    }

    #[test]
    fn rewrites_named_placeholders() {
        let t = SqlTemplate::parse(
            "select * from services where name = :name and user_id = :user_id",
        );
        assert_eq!(t.sql(), "select * from services where name = ? and user_id = ?");
        assert_eq!(t.keys(), ["name", "user_id"]);
        assert_eq!(placeholders(t.sql()), t.keys().len());
    }

    #[test]
    fn repeated_names_keep_every_occurrence() {
        let t = SqlTemplate::parse("select :a, :b, :a");
        assert_eq!(t.sql(), "select ?, ?, ?");
        assert_eq!(t.keys(), ["a", "b", "a"]);
        assert_eq!(t.distinct_keys().into_iter().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn cast_operator_is_not_a_placeholder() {
        let text = "select 'ab:c'::varchar(16)";
        let t = SqlTemplate::parse(text);
        assert_eq!(t.sql(), text);
        assert!(t.keys().is_empty());

        let t = SqlTemplate::parse("select :value::text");
        assert_eq!(t.sql(), "select ?::text");
        assert_eq!(t.keys(), ["value"]);
    }

    #[test]
    fn colons_inside_literals_are_kept() {
        let t = SqlTemplate::parse("select 'a:b:c' where x = :x and y = 'it''s :y'");
        assert_eq!(t.sql(), "select 'a:b:c' where x = ? and y = 'it''s :y'");
        assert_eq!(t.keys(), ["x"]);
    }

    #[test]
    fn comments_are_copied_verbatim() {
        let text = "select 1 -- filter on :ignored\nwhere a = :a /* and :b: */ and c = :c";
        let t = SqlTemplate::parse(text);
        assert_eq!(
            t.sql(),
            "select 1 -- filter on :ignored\nwhere a = ? /* and :b: */ and c = ?"
        );
        assert_eq!(t.keys(), ["a", "c"]);
    }

    #[test]
    fn line_comment_ends_at_carriage_return() {
        let t = SqlTemplate::parse("-- :skip\r:take");
        assert_eq!(t.sql(), "-- :skip\r?");
        assert_eq!(t.keys(), ["take"]);
    }

    #[test]
    fn lone_colon_and_unterminated_input_are_best_effort() {
        let t = SqlTemplate::parse("select ': ' || x : y");
        assert_eq!(t.sql(), "select ': ' || x : y");
        assert!(t.keys().is_empty());

        let t = SqlTemplate::parse("select :a /* never closed :b");
        assert_eq!(t.sql(), "select ? /* never closed :b");
        assert_eq!(t.keys(), ["a"]);

        let t = SqlTemplate::parse("select 'open :b");
        assert_eq!(t.keys().len(), 0);
    }

    #[test]
    fn identifiers_accept_underscores_digits_and_unicode() {
        let t = SqlTemplate::parse("values (:user_id2, :naïve, :$x)");
        assert_eq!(t.sql(), "values (?, ?, ?)");
        assert_eq!(t.keys(), ["user_id2", "naïve", "$x"]);
    }

    #[test]
    fn reads_template_from_stream() {
        let t = SqlTemplate::from_reader("delete from tags where id = :id".as_bytes())
            .expect("read template");
        assert_eq!(t.sql(), "delete from tags where id = ?");
    }

    #[test]
    fn stream_failure_is_a_template_error() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("disk gone"))
            }
        }
        let err = SqlTemplate::from_reader(Broken).unwrap_err();
        assert!(matches!(err, VaultError::Template(_)));
    }
}
