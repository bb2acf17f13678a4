//! Numbering of positional `?` markers for PostgreSQL.
//!
//! Statements are written with anonymous `?` markers on every backend. PostgreSQL wants `$1..$N`,
//! so the adapter rewrites each bare `?` in order. A doubled `??` stands for a literal `?` (for
//! the JSON operators). Markers inside quoted strings, quoted identifiers, comments and
//! dollar-quoted bodies are left alone.

use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Rewrite `?` markers to `$1..$N`. Returns the input unchanged (borrowed) when it has none.
#[must_use]
pub fn number_placeholders(sql: &str) -> Cow<'_, str> {
    let bytes = sql.as_bytes();
    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut next_param = 1;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match &state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => state = State::LineComment,
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, tag_end)) = dollar_tag(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = tag_end;
                    }
                }
                b'?' => {
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 8));
                    buf.push_str(&sql[copied..idx]);
                    if bytes.get(idx + 1) == Some(&b'?') {
                        buf.push('?');
                        idx += 1;
                    } else {
                        buf.push('$');
                        buf.push_str(&next_param.to_string());
                        next_param += 1;
                    }
                    copied = idx + 1;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                let depth = *depth;
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(tag) => {
                if b == b'$'
                    && let Some((closing, tag_end)) = dollar_tag(bytes, idx)
                    && closing == *tag
                {
                    state = State::Normal;
                    idx = tag_end;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    }
}

/// A `$tag$` opener starting at `start`: the tag and the index of its closing `$`.
/// Tags may be empty but cannot start with a digit, which keeps `$1` a parameter.
fn dollar_tag(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    if bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    while idx < bytes.len() && bytes[idx] != b'$' {
        let b = bytes[idx];
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }
    if idx >= bytes.len() {
        return None;
    }
    let tag = std::str::from_utf8(&bytes[start + 1..idx]).ok()?;
    Some((tag.to_string(), idx))
}
