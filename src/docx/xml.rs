use anyhow::{anyhow, Context};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Streams the whole part through quick-xml and fails on the first syntax
/// error, mismatched end tag, bad entity reference, or unclosed element.
pub fn verify_well_formed(name: &str, xml_bytes: &[u8]) -> anyhow::Result<()> {
    let mut reader = Reader::from_reader(xml_bytes);
    reader.config_mut().trim_text(false);
    reader.config_mut().check_end_names = true;

    let mut depth: usize = 0;
    let mut roots: usize = 0;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let ev = reader
            .read_event_into(&mut buf)
            .with_context(|| format!("{name}: malformed xml near byte {}", reader.buffer_position()))?;
        match ev {
            Event::Eof => break,
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::Empty(_) => {
                if depth == 0 {
                    roots += 1;
                }
            }
            Event::End(_) => {
                depth = depth
                    .checked_sub(1)
                    .with_context(|| format!("{name}: unmatched end tag"))?;
            }
            Event::Text(t) => {
                t.unescape()
                    .with_context(|| format!("{name}: bad entity reference in text"))?;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(anyhow!("{name}: {depth} element(s) left open"));
    }
    if roots != 1 {
        return Err(anyhow!("{name}: expected one root element, found {roots}"));
    }
    Ok(())
}
