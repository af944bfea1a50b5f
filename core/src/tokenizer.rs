use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref RE: Regex = Regex::new(r"\w+").expect("valid regex");
}

/// Tokenize text into lowercase word tokens. A token is a maximal run of
/// letters, digits, or underscore; everything else is a separator. Tokens
/// are kept verbatim so queries match the data exactly as written.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    RE.find_iter(&lowered)
        .map(|mat| mat.as_str().to_string())
        .collect()
}
