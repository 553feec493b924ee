//! String extraction from protocol-0 pickles.
//!
//! PyTables stores list-valued attributes (pandas' `values_block_N_kind`,
//! `non_index_axes`) as text pickles. Only the string literals are needed, in
//! the order they appear.

use std::collections::HashMap;

/// String literals of a protocol-0 pickle, in stream order. Memo references to
/// strings are resolved. Returns None if the stream is not a text pickle.
pub fn strings(stream: &[u8]) -> Option<Vec<String>> {
    let mut out = Vec::new();
    let mut memo: HashMap<&[u8], String> = HashMap::new();
    let mut last: Option<String> = None;
    let mut pos = 0;

    while pos < stream.len() {
        let opcode = stream[pos];
        pos += 1;
        match opcode {
            b'(' | b'l' | b'a' | b't' | b'd' | b's' | b')' | b'N' | b'0' | b'e' | b'u' => {}
            b'.' => return Some(out),
            b'V' | b'S' | b'I' | b'L' | b'F' | b'p' | b'g' => {
                let end = stream[pos..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map(|n| pos + n)?;
                let arg = &stream[pos..end];
                pos = end + 1;
                match opcode {
                    b'V' => {
                        let text = raw_unicode_unescape(arg);
                        out.push(text.clone());
                        last = Some(text);
                    }
                    b'S' => {
                        let text = unquote(arg)?;
                        out.push(text.clone());
                        last = Some(text);
                    }
                    b'p' => {
                        if let Some(text) = last.take() {
                            memo.insert(arg, text);
                        }
                    }
                    b'g' => {
                        if let Some(text) = memo.get(arg) {
                            out.push(text.clone());
                        }
                    }
                    _ => last = None,
                }
            }
            b'\n' | b'\r' | 0 => {}
            _ => return None,
        }
    }
    Some(out)
}

/// Decode Python's `raw-unicode-escape`: `\uXXXX` and `\UXXXXXXXX` escapes,
/// every other byte is a Latin-1 code point.
fn raw_unicode_unescape(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let width = match bytes[i + 1] {
                b'u' => 4,
                b'U' => 8,
                _ => 0,
            };
            if width > 0 && i + 2 + width <= bytes.len() {
                let hex = std::str::from_utf8(&bytes[i + 2..i + 2 + width]).ok();
                if let Some(c) = hex
                    .and_then(|h| u32::from_str_radix(h, 16).ok())
                    .and_then(char::from_u32)
                {
                    out.push(c);
                    i += 2 + width;
                    continue;
                }
            }
        }
        out.push(char::from(bytes[i]));
        i += 1;
    }
    out
}

/// Undo `repr()` quoting of a Python 2 byte string (`'abc'` or `"abc"`).
fn unquote(arg: &[u8]) -> Option<String> {
    let quote = *arg.first()?;
    if !(quote == b'\'' || quote == b'"') || arg.len() < 2 || arg[arg.len() - 1] != quote {
        return None;
    }
    let body = &arg[1..arg.len() - 1];
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;
    while i < body.len() {
        if body[i] != b'\\' || i + 1 == body.len() {
            out.push(body[i]);
            i += 1;
            continue;
        }
        let escaped = body[i + 1];
        i += 2;
        match escaped {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'x' if i + 2 <= body.len() => {
                let hex = std::str::from_utf8(&body[i..i + 2]).ok()?;
                out.push(u8::from_str_radix(hex, 16).ok()?);
                i += 2;
            }
            other => out.push(other),
        }
    }
    Some(String::from_utf8_lossy(&out).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_of_unicode_names() {
        let stream = b"(lp0\nVtime\np1\naVa\np2\na.";
        assert_eq!(strings(stream), Some(vec!["time".to_string(), "a".to_string()]));
    }

    #[test]
    fn nested_axes_list() {
        let stream = b"(lp0\n(I1\n(lp1\nVx\np2\naVy\np3\natp4\na.";
        assert_eq!(strings(stream), Some(vec!["x".to_string(), "y".to_string()]));
    }

    #[test]
    fn python2_byte_strings() {
        let stream = b"(lp1\nS'time'\np2\naS\"it's\"\np3\na.";
        assert_eq!(strings(stream), Some(vec!["time".to_string(), "it's".to_string()]));
    }

    #[test]
    fn memo_reference_repeats_string() {
        let stream = b"(lp0\nVa\np1\nag1\na.";
        assert_eq!(strings(stream), Some(vec!["a".to_string(), "a".to_string()]));
    }

    #[test]
    fn escaped_code_points() {
        assert_eq!(raw_unicode_unescape(b"caf\\u00e9"), "café");
        assert_eq!(raw_unicode_unescape(b"\xe9"), "é");
    }

    #[test]
    fn binary_pickle_is_rejected() {
        assert_eq!(strings(b"\x80\x04\x95"), None);
    }
}
