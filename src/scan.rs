//! Balanced-delimiter scanning over SQL text
//!
//! This is not a SQL parser. The helpers here track parenthesis depth and
//! quoted regions so the extractor can find statement boundaries in
//! semi-free-form migration text without tripping over nested expressions
//! such as `CHECK(a IN ('x', 'y'))` or `DEFAULT (datetime('now'))`.
//!
//! All scanning is byte-oriented. Every delimiter of interest is ASCII, so
//! the returned offsets always fall on `char` boundaries.

/// Find the `)` that closes the `(` at byte offset `open`.
///
/// Parentheses inside single-quoted literals or double-quoted identifiers
/// are ignored. Returns `None` if `open` is not a `(` or the text ends
/// before depth returns to zero.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    let mut quote: Option<u8> = None;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if let Some(q) = quote {
            // A doubled quote ('') closes and immediately reopens, which is
            // exactly how SQL escapes it.
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Find the first `;` at or after `from` that is not inside a quoted region.
pub fn find_terminator(text: &str, from: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;

    for (i, &b) in bytes.iter().enumerate().skip(from) {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'\'' | b'"' => quote = Some(b),
                b';' => return Some(i),
                _ => {}
            },
        }
    }

    None
}

/// Split `body` on commas at parenthesis depth zero, outside quotes.
///
/// Each fragment is trimmed; empty fragments (from trailing commas or blank
/// bodies) are dropped.
pub fn split_top_level(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut fragments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                fragments.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    fragments.push(&body[start..]);

    fragments
        .into_iter()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .collect()
}

/// Remove `--` line comments and `/* */` block comments.
///
/// Line comments keep their terminating newline; block comments are replaced
/// by a single space so adjacent tokens stay separated. Comment markers
/// inside quoted regions are left alone.
pub fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut quote: Option<u8> = None;
    let mut copied_to = 0;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => {
                quote = Some(b);
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                out.push_str(&text[copied_to..i]);
                let end = text[i..].find('\n').map_or(bytes.len(), |n| i + n);
                copied_to = end;
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&text[copied_to..i]);
                out.push(' ');
                let end = text[i + 2..].find("*/").map_or(bytes.len(), |n| i + 2 + n + 2);
                copied_to = end;
                i = end;
            }
            _ => i += 1,
        }
    }
    out.push_str(&text[copied_to..]);

    out
}

/// The leading identifier of a column or constraint fragment.
///
/// Identifier quoting (`"name"`, `` `name` ``, `[name]`) is removed. An
/// unquoted identifier ends at whitespace or `(`.
pub fn leading_identifier(fragment: &str) -> Option<&str> {
    let fragment = fragment.trim_start();
    let mut chars = fragment.chars();
    let close = match chars.next()? {
        '"' => Some('"'),
        '`' => Some('`'),
        '[' => Some(']'),
        _ => None,
    };

    let ident = match close {
        Some(close) => {
            let rest = &fragment[1..];
            &rest[..rest.find(close)?]
        }
        None => {
            let end = fragment
                .find(|c: char| c.is_whitespace() || c == '(')
                .unwrap_or(fragment.len());
            &fragment[..end]
        }
    };

    if ident.is_empty() {
        None
    } else {
        Some(ident)
    }
}
