//! Entry-name normalization.
//!
//! Names are compared only in normalized form: ASCII letters lowercased,
//! backslashes turned into forward slashes, and the result cut to fit the
//! fixed name field of an entry record (including its NUL terminator).

/// Bytes reserved for a name in an entry record.
pub const NAME_CAPACITY: usize = 260;
/// Longest storable name; one byte of the field is the NUL terminator.
pub const MAX_NAME_LEN: usize = NAME_CAPACITY - 1;

/// Normalize `path` into its entry-key form.
///
/// Truncation never splits a UTF-8 sequence, so the result is always valid
/// and `normalize(normalize(p)) == normalize(p)`.
pub fn normalize(path: &str) -> String {
    let mut end = path.len().min(MAX_NAME_LEN);
    while !path.is_char_boundary(end) {
        end -= 1;
    }
    path[..end]
        .chars()
        .map(|c| match c {
            '\\' => '/',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}
