//! Text normalization shared by document indexing and query parsing.
//!
//! Normalization steps, in order:
//!
//! 1. Unicode NFKC fold
//! 2. case fold to lowercase
//! 3. strip punctuation, keeping intra-word hyphens, decimal points inside
//!    numbers, and percent signs adjacent to digits
//! 4. collapse whitespace
//! 5. expand a fixed abbreviation dictionary token-by-token

use unicode_normalization::UnicodeNormalization;

/// Fixed abbreviation dictionary applied after punctuation stripping.
///
/// Keys must already be lowercase single tokens.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("amc", "asset management company"),
    ("elss", "tax-saving equity-linked saving scheme"),
    ("mf", "mutual fund"),
    ("yr", "year"),
    ("yrs", "years"),
];

/// Stopwords used to decide whether a lexical query has any content.
const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "for", "i", "in", "is", "me", "my", "of", "or", "show", "the", "to",
    "want", "with",
];

/// Normalize a piece of text.
///
/// The same function runs over fund descriptions at index build time and
/// over user queries at search time.
///
/// # Example
///
/// ```rust
/// use fundrank_query::normalize::normalize;
///
/// assert_eq!(normalize("  Low-Risk ELSS, returns > 12.5%! "),
///            "low-risk tax-saving equity-linked saving scheme returns 12.5%");
/// ```
pub fn normalize(text: &str) -> String {
    let folded: String = text.nfkc().collect::<String>().to_lowercase();
    let chars: Vec<char> = folded.chars().collect();

    let mut stripped = String::with_capacity(folded.len());
    for (i, &c) in chars.iter().enumerate() {
        let keep = if c.is_alphanumeric() || c.is_whitespace() {
            true
        } else if c == '-' || c == '.' {
            // Intra-word only: both neighbors must be alphanumeric.
            let prev = i.checked_sub(1).and_then(|p| chars.get(p));
            let next = chars.get(i + 1);
            matches!((prev, next), (Some(p), Some(n)) if p.is_alphanumeric() && n.is_alphanumeric())
        } else if c == '%' {
            // Percent signs survive only next to a digit.
            let prev = i.checked_sub(1).and_then(|p| chars.get(p));
            matches!(prev, Some(p) if p.is_ascii_digit())
        } else {
            false
        };

        if keep {
            stripped.push(c);
        } else {
            stripped.push(' ');
        }
    }

    let collapsed: Vec<&str> = stripped.split_whitespace().collect();
    let mut out: Vec<&str> = Vec::with_capacity(collapsed.len());
    for token in collapsed {
        match ABBREVIATIONS.iter().find(|(abbr, _)| *abbr == token) {
            Some((_, expansion)) => out.push(expansion),
            None => out.push(token),
        }
    }
    out.join(" ")
}

/// Normalize and split into tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .map(|t| t.to_string())
        .collect()
}

/// Tokens suitable for the lexical index: normalized, stopwords removed.
///
/// Used for both document indexing and BM25 query terms so the two sides
/// stay aligned.
pub fn index_tokens(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .filter(|t| !is_stopword(t))
        .collect()
}

/// True if a normalized token is a stopword.
pub fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(&token)
}
