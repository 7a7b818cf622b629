/// A bang found in a query together with the query text left around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    /// Lower-cased bang without the symbol.
    pub token: String,
    /// Remaining words joined by single spaces.
    pub remainder: String,
}

/// Find a bang in the first or last word of `query`.
///
/// The first word is checked before the last one, so a query such as
/// `!a foo !b` resolves to `a`. A symbol on its own yields an empty token,
/// which no catalog entry matches.
pub fn detect(query: &str, symbol: &str) -> Option<Detection> {
    if symbol.is_empty() {
        return None;
    }
    let words: Vec<&str> = query.split_whitespace().collect();
    let (first, last) = (words.first()?, words.last()?);

    let (token, rest) = if let Some(token) = first.strip_prefix(symbol) {
        (token, &words[1..])
    } else if let Some(token) = last.strip_prefix(symbol) {
        (token, &words[..words.len() - 1])
    } else {
        return None;
    };

    Some(Detection {
        token: token.to_lowercase(),
        remainder: rest.join(" "),
    })
}
