use std::collections::HashMap;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use anyhow::{anyhow, Context};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const DOCUMENT_PART: &str = "word/document.xml";

/// An opened .docx archive held fully in memory, entries in archive order.
pub struct DocxPackage {
    entries: Vec<DocxEntry>,
}

/// One archive member with the metadata needed to write it back unchanged.
pub struct DocxEntry {
    name: String,
    data: Vec<u8>,
    compression: CompressionMethod,
    last_modified: zip::DateTime,
    unix_mode: Option<u32>,
    is_dir: bool,
}

impl DocxEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl DocxPackage {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let f = File::open(path).with_context(|| format!("open docx: {}", path.display()))?;
        Self::from_reader(f).with_context(|| format!("read docx: {}", path.display()))
    }

    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }

    fn from_reader<R: Read + Seek>(reader: R) -> anyhow::Result<Self> {
        let mut zip = ZipArchive::new(reader).context("read zip")?;
        let mut entries = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let mut file = zip.by_index(i).context("zip entry")?;
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)
                .with_context(|| format!("read zip entry: {}", file.name()))?;
            entries.push(DocxEntry {
                name: file.name().to_string(),
                data,
                compression: file.compression(),
                last_modified: file.last_modified().unwrap_or_default(),
                unix_mode: file.unix_mode(),
                is_dir: file.is_dir(),
            });
        }
        Ok(Self { entries })
    }

    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(DocxEntry::name)
    }

    pub fn entry(&self, name: &str) -> Option<&DocxEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// UTF-8 text of one part, e.g. `word/document.xml`.
    pub fn part_text(&self, name: &str) -> anyhow::Result<String> {
        let ent = self
            .entry(name)
            .ok_or_else(|| anyhow!("part not found in package: {name}"))?;
        String::from_utf8(ent.data.clone()).with_context(|| format!("part is not utf-8: {name}"))
    }

    pub fn write_with_replacements(
        &self,
        output_path: &Path,
        replacements: &HashMap<String, Vec<u8>>,
    ) -> anyhow::Result<()> {
        let f = File::create(output_path)
            .with_context(|| format!("create output docx: {}", output_path.display()))?;
        self.write_into(f, replacements)
    }

    pub fn to_bytes_with_replacements(
        &self,
        replacements: &HashMap<String, Vec<u8>>,
    ) -> anyhow::Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_into(&mut cursor, replacements)?;
        Ok(cursor.into_inner())
    }

    /// Re-emits every entry in archive order, swapping in replaced parts and
    /// keeping each entry's compression and metadata.
    fn write_into<W: Write + Seek>(
        &self,
        sink: W,
        replacements: &HashMap<String, Vec<u8>>,
    ) -> anyhow::Result<()> {
        for name in replacements.keys() {
            if self.entry(name).is_none() {
                return Err(anyhow!("replacement for unknown part: {name}"));
            }
        }
        let mut zout = ZipWriter::new(sink);
        for ent in &self.entries {
            let data = replacements.get(&ent.name).unwrap_or(&ent.data);
            let mut opts = SimpleFileOptions::default()
                .compression_method(ent.compression)
                .last_modified_time(ent.last_modified);
            if let Some(mode) = ent.unix_mode {
                opts = opts.unix_permissions(mode);
            }
            if ent.is_dir || ent.name.ends_with('/') {
                zout.add_directory(&ent.name, opts)
                    .with_context(|| format!("add zip dir: {}", ent.name))?;
            } else {
                zout.start_file(&ent.name, opts)
                    .with_context(|| format!("start zip file: {}", ent.name))?;
                zout.write_all(data)
                    .with_context(|| format!("write zip file: {}", ent.name))?;
            }
        }
        zout.finish().context("finish zip")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::{Cursor, Write};

    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    use super::{DocxPackage, DOCUMENT_PART};

    fn build_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zout = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            zout.start_file(*name, opts).expect("start");
            zout.write_all(body.as_bytes()).expect("write");
        }
        zout.finish().expect("finish").into_inner()
    }

    #[test]
    fn replacement_keeps_other_parts_and_order() {
        let bytes = build_zip(&[
            ("[Content_Types].xml", "<Types/>"),
            (DOCUMENT_PART, "<w:document/>"),
            ("word/styles.xml", "<w:styles/>"),
        ]);
        let pkg = DocxPackage::from_bytes(&bytes).expect("read");
        assert_eq!(pkg.part_text(DOCUMENT_PART).expect("part"), "<w:document/>");

        let mut repl = HashMap::new();
        repl.insert(DOCUMENT_PART.to_string(), b"<w:document><w:body/></w:document>".to_vec());
        let out = pkg.to_bytes_with_replacements(&repl).expect("write");

        let again = DocxPackage::from_bytes(&out).expect("reread");
        let names: Vec<&str> = again.entry_names().collect();
        assert_eq!(names, vec!["[Content_Types].xml", DOCUMENT_PART, "word/styles.xml"]);
        assert_eq!(
            again.part_text(DOCUMENT_PART).expect("part"),
            "<w:document><w:body/></w:document>"
        );
        assert_eq!(again.part_text("word/styles.xml").expect("styles"), "<w:styles/>");
    }

    #[test]
    fn unknown_parts_are_errors() {
        let pkg = DocxPackage::from_bytes(&build_zip(&[(DOCUMENT_PART, "<x/>")])).expect("read");
        assert!(pkg.part_text("word/missing.xml").is_err());
        assert_eq!(pkg.entry(DOCUMENT_PART).map(|e| e.data()), Some(&b"<x/>"[..]));
        let mut repl = HashMap::new();
        repl.insert("word/missing.xml".to_string(), Vec::new());
        assert!(pkg.to_bytes_with_replacements(&repl).is_err());
    }
}
