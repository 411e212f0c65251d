/// Escapes the five XML-reserved characters for use inside text content or
/// attribute values. `&` goes first so the entities introduced afterwards are
/// never escaped again.
pub fn escape_xml_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
