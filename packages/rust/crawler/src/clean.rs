//! Text cleaning pipeline applied to extracted page HTML.
//!
//! Each pass is a function `&str -> String` applied in a fixed order; the
//! order matters, since entity decoding must follow tag stripping and the
//! whitespace passes must see decoded text.

use std::sync::LazyLock;

use regex::Regex;

/// Run the full cleaning pipeline on extracted HTML.
pub fn clean_text(html: &str) -> String {
    let mut result = strip_tags(html);

    result = decode_entities(&result);
    result = collapse_escaped_whitespace(&result);
    result = collapse_control_whitespace(&result);
    result = normalize_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Strip markup
// ---------------------------------------------------------------------------

fn strip_tags(html: &str) -> String {
    static TAG_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

    TAG_RE.replace_all(html, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Decode HTML/XML entities
// ---------------------------------------------------------------------------

fn decode_entities(text: &str) -> String {
    html_escape::decode_html_entities(text).into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Literal `\n` / `\t` escape sequences
// ---------------------------------------------------------------------------

/// Replace backslash-escaped `n`/`t` left over from JSON-ish sources with a space.
fn collapse_escaped_whitespace(text: &str) -> String {
    static ESCAPED_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\\[nt]").expect("valid regex"));

    ESCAPED_RE.replace_all(text, " ").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Newline, tab, carriage return
// ---------------------------------------------------------------------------

fn collapse_control_whitespace(text: &str) -> String {
    static CONTROL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[\n\t\r]").expect("valid regex"));

    CONTROL_RE.replace_all(text, " ").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 5: Whitespace runs
// ---------------------------------------------------------------------------

fn normalize_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}
