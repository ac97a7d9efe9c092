//! PowerPoint (.pptx) extraction
//!
//! A presentation is a zip archive with one `ppt/slides/slideN.xml` part per
//! slide. Slides are visited in deck order, which `ppt/presentation.xml`
//! (`<p:sldIdLst>`) gives through the relationship ids in
//! `ppt/_rels/presentation.xml.rels`. Archives without those parts fall back
//! to the numeric order of the part names. Text runs (`<a:t>`) are concatenated per paragraph and paragraphs
//! are joined with a space. Slides whose text repeats an earlier slide are
//! dropped, but every kept unit carries its true 1-based slide number.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::ExtractionError;
use crate::types::TextUnit;

use super::extractor::{ExtractionResult, Extractor};

const SLIDE_PREFIX: &str = "ppt/slides/slide";
const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS_PART: &str = "ppt/_rels/presentation.xml.rels";

/// One unit per distinct, non-empty slide
#[derive(Debug, Clone, Copy, Default)]
pub struct PptxExtractor;

impl Extractor for PptxExtractor {
    fn extract(&self, path: &Path) -> ExtractionResult {
        let file = std::fs::File::open(path).map_err(|e| ExtractionError::corrupt(path, e.to_string()))?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| ExtractionError::corrupt(path, e.to_string()))?;

        let slides = match deck_order(&mut archive)
            .map_err(|reason| ExtractionError::corrupt(path, reason))?
        {
            Some(order) => order,
            None => numeric_order(&archive),
        };

        let mut seen = HashSet::new();
        let mut units = Vec::new();

        for (index, name) in slides.iter().enumerate() {
            let xml = read_part(&mut archive, name)
                .map_err(|reason| ExtractionError::corrupt(path, reason))?
                .ok_or_else(|| ExtractionError::corrupt(path, format!("missing slide part {}", name)))?;

            let text = slide_text(&xml)
                .map_err(|reason| ExtractionError::corrupt(path, format!("{}: {}", name, reason)))?;

            if text.is_empty() {
                continue;
            }
            if !seen.insert(text.clone()) {
                tracing::debug!("Skipping repeated slide {} in {}", index + 1, path.display());
                continue;
            }
            units.push(TextUnit::new(text, index as u32 + 1));
        }

        Ok(units)
    }
}

/// Slide part names in the order the deck presents them, or `None` when the
/// archive has no presentation part or relationships to resolve them
fn deck_order(archive: &mut zip::ZipArchive<File>) -> Result<Option<Vec<String>>, String> {
    let Some(presentation) = read_part(archive, PRESENTATION_PART)? else {
        return Ok(None);
    };
    let Some(rels) = read_part(archive, PRESENTATION_RELS_PART)? else {
        return Ok(None);
    };

    let targets = relationship_targets(&rels)?;
    let mut order = Vec::new();
    for rel_id in slide_rel_ids(&presentation)? {
        let target = targets
            .get(&rel_id)
            .ok_or_else(|| format!("slide relationship {} has no target", rel_id))?;
        order.push(resolve_target(target));
    }
    Ok(Some(order))
}

/// Slide part names sorted by the number in `slideN.xml`
fn numeric_order(archive: &zip::ZipArchive<File>) -> Vec<String> {
    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);
    slides.into_iter().map(|(_, name)| name).collect()
}

fn read_part(archive: &mut zip::ZipArchive<File>, name: &str) -> Result<Option<String>, String> {
    if !archive.file_names().any(|part| part == name) {
        return Ok(None);
    }
    let mut xml = String::new();
    archive
        .by_name(name)
        .map_err(|e| e.to_string())?
        .read_to_string(&mut xml)
        .map_err(|e| e.to_string())?;
    Ok(Some(xml))
}

/// `r:id` of every `<p:sldId>` in document order
fn slide_rel_ids(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut ids = Vec::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sldId" => {
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| e.to_string())?;
                    // the unprefixed `id` is the numeric slide id
                    if attr.key.prefix().is_some() && attr.key.local_name().as_ref() == b"id" {
                        ids.push(attr.unescape_value().map_err(|e| e.to_string())?.into_owned());
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(ids)
}

/// Relationship id -> target from a `.rels` part
fn relationship_targets(xml: &str) -> Result<HashMap<String, String>, String> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| e.to_string())?;
                    let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = Some(value),
                        b"Target" => target = Some(value),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// Targets are relative to `ppt/` unless they start at the archive root
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("ppt/{}", target.trim_start_matches("./")),
    }
}

/// `ppt/slides/slide12.xml` -> 12; other parts (layouts, rels) -> None
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Whitespace-normalized text of one slide
fn slide_text(xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(xml);

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::Text(e) if in_text => {
                let text = e.unescape().map_err(|e| e.to_string())?;
                current.push_str(&text);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"br" => current.push(' '),
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    /// Slide XML with one text box holding `paragraphs`
    fn slide_xml(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", p))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            body
        )
    }

    /// Write a minimal .pptx with the given slide bodies, numbered from 1
    fn write_pptx(path: &Path, slides: &[String]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        zip.start_file("[Content_Types].xml", options).unwrap();
        zip.write_all(b"<Types/>").unwrap();
        zip.start_file("ppt/slideLayouts/slideLayout1.xml", options).unwrap();
        zip.write_all(slide_xml(&["Layout placeholder"]).as_bytes()).unwrap();

        for (i, xml) in slides.iter().enumerate() {
            zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
                .unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    /// Write a .pptx whose presentation part lists `slides` in `order`
    /// (1-based indices into `slides`)
    fn write_ordered_pptx(path: &Path, slides: &[String], order: &[usize]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        let options = zip::write::SimpleFileOptions::default();

        let ids: String = order
            .iter()
            .enumerate()
            .map(|(i, n)| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, n + 10))
            .collect();
        zip.start_file(PRESENTATION_PART, options).unwrap();
        zip.write_all(
            format!(
                r#"<p:presentation xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><p:sldIdLst>{}</p:sldIdLst></p:presentation>"#,
                ids
            )
            .as_bytes(),
        )
        .unwrap();

        let rels: String = (1..=slides.len())
            .map(|n| format!(r#"<Relationship Id="rId{}" Type="slide" Target="slides/slide{}.xml"/>"#, n + 10, n))
            .collect();
        zip.start_file(PRESENTATION_RELS_PART, options).unwrap();
        zip.write_all(format!("<Relationships>{}</Relationships>", rels).as_bytes())
            .unwrap();

        for (i, xml) in slides.iter().enumerate() {
            zip.start_file(format!("ppt/slides/slide{}.xml", i + 1), options)
                .unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_slides_follow_deck_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reordered.pptx");
        write_ordered_pptx(
            &path,
            &[slide_xml(&["Shown second"]), slide_xml(&["Shown first"])],
            &[2, 1],
        );

        let units = PptxExtractor.extract(&path).unwrap();
        assert_eq!(
            units,
            vec![
                TextUnit::new("Shown first", 1),
                TextUnit::new("Shown second", 2),
            ]
        );
    }

    #[test]
    fn test_hidden_from_deck_slides_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.pptx");
        write_ordered_pptx(
            &path,
            &[slide_xml(&["Kept"]), slide_xml(&["Orphan part"])],
            &[1],
        );

        let units = PptxExtractor.extract(&path).unwrap();
        assert_eq!(units, vec![TextUnit::new("Kept", 1)]);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("slides/slide3.xml"), "ppt/slides/slide3.xml");
        assert_eq!(resolve_target("/ppt/slides/slide3.xml"), "ppt/slides/slide3.xml");
    }

    #[test]
    fn test_slide_number() {
        assert_eq!(slide_number("ppt/slides/slide3.xml"), Some(3));
        assert_eq!(slide_number("ppt/slides/_rels/slide3.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn test_slide_text_joins_paragraphs() {
        let xml = slide_xml(&["Edge AI", "runs  on device &amp; offline"]);
        assert_eq!(slide_text(&xml).unwrap(), "Edge AI runs on device & offline");
    }

    #[test]
    fn test_split_runs_are_concatenated() {
        let xml = r#"<p:sld xmlns:a="a" xmlns:p="p"><a:p><a:r><a:t>Quant</a:t></a:r><a:r><a:t>ization</a:t></a:r></a:p></p:sld>"#;
        assert_eq!(slide_text(xml).unwrap(), "Quantization");
    }

    #[test]
    fn test_duplicate_slides_keep_true_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        write_pptx(
            &path,
            &[
                slide_xml(&["Edge AI overview"]),
                slide_xml(&["Edge  AI overview"]),
                slide_xml(&[]),
                slide_xml(&["Model compression"]),
            ],
        );

        let units = PptxExtractor.extract(&path).unwrap();
        assert_eq!(
            units,
            vec![
                TextUnit::new("Edge AI overview", 1),
                TextUnit::new("Model compression", 4),
            ]
        );
    }

    #[test]
    fn test_slides_sorted_numerically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.pptx");
        let slides: Vec<String> = (1..=11)
            .map(|i| slide_xml(&[&format!("Slide body {}", i)]))
            .collect();
        write_pptx(&path, &slides);

        let units = PptxExtractor.extract(&path).unwrap();
        assert_eq!(units.len(), 11);
        assert_eq!(units[9].text, "Slide body 10");
        assert_eq!(units[10].position, 11);
    }

    #[test]
    fn test_not_a_zip_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pptx");
        std::fs::write(&path, "plain text").unwrap();

        let err = PptxExtractor.extract(&path).unwrap_err();
        assert!(matches!(err, ExtractionError::CorruptFile { .. }));
    }
}
