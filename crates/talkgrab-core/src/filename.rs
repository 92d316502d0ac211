//! Talk-title filename derivation.

/// Derives the base filename for a talk's on-disk artifacts from its title.
///
/// Keeps only ASCII alphanumerics, `_`, `(`, `)`, `-`, and spaces, then
/// replaces each space with `_`. Callers append `.mp4` for the video and
/// `.json` for the metadata file.
pub fn talk_filename(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for c in title.chars() {
        match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '(' | ')' | '-' => out.push(c),
            ' ' => out.push('_'),
            _ => {}
        }
    }
    out
}
