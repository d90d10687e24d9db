pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize, hash_comments: bool) -> bool {
    (bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-'))
        || (hash_comments && bytes.get(idx) == Some(&b'#'))
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Closing delimiter handling shared by quoted strings and quoted identifiers.
///
/// Returns the new index and whether the quoted run ended. A doubled delimiter is an
/// escaped delimiter and keeps the run open.
pub(super) fn step_quoted(bytes: &[u8], idx: usize, close: u8, backslash_escapes: bool) -> (usize, bool) {
    let b = bytes[idx];
    if backslash_escapes && b == b'\\' {
        return (idx + 1, false);
    }
    if b == close {
        if bytes.get(idx + 1) == Some(&close) {
            return (idx + 1, false);
        }
        return (idx, true);
    }
    (idx, false)
}
