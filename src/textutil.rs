use once_cell::sync::Lazy;
use regex::Regex;

// Zero-width and other invisible code points Word leaves behind in "empty" runs.
static INVISIBLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{200B}\u{200C}\u{200D}\u{2060}\u{FEFF}\u{00AD}]").expect("invisible"));

pub fn strip_invisible(text: &str) -> String {
    INVISIBLE_RE.replace_all(text, "").into_owned()
}

/// True when nothing visible remains after dropping invisible characters and whitespace.
pub fn is_blank_text(text: &str) -> bool {
    if text.is_empty() {
        return true;
    }
    strip_invisible(text).trim().is_empty()
}

/// Splits free text on every line terminator (`\r\n`, `\n`, lone `\r`).
/// Empty lines inside the text are kept; all trailing empty lines are dropped,
/// so `"a\n"` and `"a\n\n"` both yield `["a"]`.
pub fn split_lines(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines: Vec<String> = normalized.split('\n').map(str::to_string).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}
