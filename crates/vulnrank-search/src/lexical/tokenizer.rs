//! Query and document tokenization for the lexical layer.
//!
//! Case-insensitive, punctuation-stripping tokenization with one twist:
//! `.`, `-`, and `_` survive *inside* a token so version-like and
//! package-like terms stay whole. "CVE affecting nginx 1.24" must keep
//! `1.24` as one term, and `log4j-core` must not shatter into noise.

/// Split text into lowercase terms.
///
/// Alphanumerics form tokens; `.`, `-`, `_` join a token only when
/// flanked by alphanumerics on both sides; everything else separates.
#[must_use]
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let chars: Vec<char> = lowered.chars().collect();

    let mut tokens = Vec::new();
    let mut current = String::new();

    for (idx, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() {
            current.push(c);
        } else if matches!(c, '.' | '-' | '_')
            && !current.is_empty()
            && chars.get(idx + 1).is_some_and(|next| next.is_alphanumeric())
        {
            current.push(c);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
