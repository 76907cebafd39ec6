use regex::{Captures, Regex};
use std::sync::LazyLock;

/// Longest body kept, in characters.
pub const MAX_BODY_CHARS: usize = 50_000;
pub const TRUNCATION_MARKER: &str = "\n\n[Content truncated due to length]";

static STYLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").expect("valid style regex"));
static SCRIPT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").expect("valid script regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(nbsp|amp|lt|gt|quot|#39);").expect("valid entity regex")
});
static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Reduces an HTML body to single-spaced plain text.
///
/// Style and script blocks are dropped with their content, remaining tags are
/// stripped, and the six common entities are decoded in a single pass so an
/// escaped entity such as `&amp;lt;` decodes to `&lt;`, not `<`.
pub fn to_plain_text(html: &str) -> String {
    let text = STYLE_BLOCK.replace_all(html, "");
    let text = SCRIPT_BLOCK.replace_all(&text, "");
    let text = TAG.replace_all(&text, "");
    let text = ENTITY.replace_all(&text, |caps: &Captures| {
        match &caps[1] {
            "nbsp" => " ",
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            _ => "'",
        }
        .to_string()
    });
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

/// Drops script blocks and caps the body at `MAX_BODY_CHARS`, appending
/// `TRUNCATION_MARKER` when anything was cut.
pub fn sanitize(text: &str) -> String {
    let clean = SCRIPT_BLOCK.replace_all(text, "");
    match clean.char_indices().nth(MAX_BODY_CHARS) {
        Some((cut, _)) => {
            let mut truncated = clean[..cut].to_string();
            truncated.push_str(TRUNCATION_MARKER);
            truncated
        }
        None => clean.into_owned(),
    }
}
