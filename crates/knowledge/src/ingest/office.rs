//! Text extraction from Office Open XML containers (docx, pptx, xlsx).

use super::markup::{attr, decode_entities, tokens, Token};
use docent_core::{AppError, AppResult};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

type Archive = ZipArchive<File>;

fn open_archive(path: &Path) -> AppResult<Archive> {
    let file = File::open(path)?;
    ZipArchive::new(file)
        .map_err(|e| AppError::Document(format!("{:?} is not a valid Office file: {}", path, e)))
}

/// Read one archive member as UTF-8. `None` when the member is absent.
fn read_entry(archive: &mut Archive, name: &str) -> AppResult<Option<String>> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(AppError::Document(format!("Failed to read {}: {}", name, e))),
    };

    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| AppError::Document(format!("Failed to read {}: {}", name, e)))?;
    Ok(Some(content))
}

/// Members matching `{prefix}{n}.xml`, ordered by `n`.
fn numbered_entries(archive: &Archive, prefix: &str) -> Vec<(u32, String)> {
    let mut entries: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name.strip_prefix(prefix)?.strip_suffix(".xml")?;
            Some((number.parse().ok()?, name.to_string()))
        })
        .collect();
    entries.sort();
    entries
}

/// Collect the text of `text_tag` elements, breaking lines at the end of
/// each `paragraph_tag` element.
fn paragraph_text(xml: &str, text_tag: &str, paragraph_tag: &str) -> String {
    let mut out = String::new();
    let mut in_text = false;
    // Tab stop definitions (w:tabs, a:tabLst) also use tab elements.
    let mut tab_stops_depth = 0usize;

    for token in tokens(xml) {
        match token {
            Token::Start {
                name, self_closing, ..
            } => {
                if is_tab_stop_list(name) {
                    if !self_closing {
                        tab_stops_depth += 1;
                    }
                } else if name == text_tag && !self_closing {
                    in_text = true;
                } else if tab_stops_depth > 0 {
                    continue;
                } else if name.ends_with(":tab") {
                    out.push('\t');
                } else if name.ends_with(":br") {
                    out.push('\n');
                }
            }
            Token::End { name } => {
                if is_tab_stop_list(name) {
                    tab_stops_depth = tab_stops_depth.saturating_sub(1);
                } else if name == text_tag {
                    in_text = false;
                } else if name == paragraph_tag {
                    out.push('\n');
                }
            }
            Token::Text(text) if in_text => out.push_str(&decode_entities(text)),
            Token::Text(_) => {}
        }
    }

    out.trim().to_string()
}

fn is_tab_stop_list(name: &str) -> bool {
    name.ends_with(":tabs") || name.ends_with(":tabLst")
}

/// Body text of a Word document.
pub(crate) fn docx_text(path: &Path) -> AppResult<String> {
    let mut archive = open_archive(path)?;
    let xml = read_entry(&mut archive, "word/document.xml")?
        .ok_or_else(|| AppError::Document(format!("{:?} has no word/document.xml", path)))?;
    Ok(paragraph_text(&xml, "w:t", "w:p"))
}

/// Text of each slide, as `(slide number, text)`.
pub(crate) fn pptx_slides(path: &Path) -> AppResult<Vec<(u32, String)>> {
    let mut archive = open_archive(path)?;
    let mut slides = Vec::new();

    for (number, name) in numbered_entries(&archive, "ppt/slides/slide") {
        if let Some(xml) = read_entry(&mut archive, &name)? {
            slides.push((number, paragraph_text(&xml, "a:t", "a:p")));
        }
    }

    Ok(slides)
}

/// Cell text of each worksheet, as `(sheet number, text)`. Cells are
/// tab-separated, rows newline-separated.
pub(crate) fn xlsx_sheets(path: &Path) -> AppResult<Vec<(u32, String)>> {
    let mut archive = open_archive(path)?;
    let shared = match read_entry(&mut archive, "xl/sharedStrings.xml")? {
        Some(xml) => shared_strings(&xml),
        None => Vec::new(),
    };

    let mut sheets = Vec::new();
    for (number, name) in numbered_entries(&archive, "xl/worksheets/sheet") {
        if let Some(xml) = read_entry(&mut archive, &name)? {
            sheets.push((number, sheet_text(&xml, &shared)));
        }
    }

    Ok(sheets)
}

fn shared_strings(xml: &str) -> Vec<String> {
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_item = false;
    let mut in_text = false;

    for token in tokens(xml) {
        match token {
            Token::Start {
                name, self_closing, ..
            } => match name {
                "si" if !self_closing => {
                    in_item = true;
                    current.clear();
                }
                "si" => strings.push(String::new()),
                "t" if in_item && !self_closing => in_text = true,
                _ => {}
            },
            Token::End { name } => match name {
                "si" => {
                    strings.push(std::mem::take(&mut current));
                    in_item = false;
                }
                "t" => in_text = false,
                _ => {}
            },
            Token::Text(text) if in_text => current.push_str(&decode_entities(text)),
            Token::Text(_) => {}
        }
    }

    strings
}

#[derive(Default)]
struct Cell {
    kind: Option<String>,
    value: String,
    capture: bool,
}

fn sheet_text(xml: &str, shared: &[String]) -> String {
    let mut rows: Vec<String> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell: Option<Cell> = None;

    for token in tokens(xml) {
        match token {
            Token::Start {
                name,
                attrs,
                self_closing,
            } => match name {
                "row" => row.clear(),
                "c" if !self_closing => {
                    cell = Some(Cell {
                        kind: attr(attrs, "t").map(str::to_string),
                        ..Cell::default()
                    })
                }
                "v" | "t" => {
                    if let Some(cell) = cell.as_mut() {
                        cell.capture = !self_closing;
                    }
                }
                _ => {}
            },
            Token::End { name } => match name {
                "v" | "t" => {
                    if let Some(cell) = cell.as_mut() {
                        cell.capture = false;
                    }
                }
                "c" => {
                    if let Some(done) = cell.take() {
                        let text = resolve_cell(&done, shared);
                        if !text.is_empty() {
                            row.push(text);
                        }
                    }
                }
                "row" => {
                    if !row.is_empty() {
                        rows.push(row.join("\t"));
                    }
                    row.clear();
                }
                _ => {}
            },
            Token::Text(text) => {
                if let Some(cell) = cell.as_mut().filter(|c| c.capture) {
                    cell.value.push_str(&decode_entities(text));
                }
            }
        }
    }

    rows.join("\n")
}

fn resolve_cell(cell: &Cell, shared: &[String]) -> String {
    let value = cell.value.trim();
    match cell.kind.as_deref() {
        Some("s") => value
            .parse::<usize>()
            .ok()
            .and_then(|i| shared.get(i))
            .cloned()
            .unwrap_or_default(),
        _ => value.to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::write_zip;
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_docx_paragraphs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("policy.docx");
        write_zip(
            &path,
            &[(
                "word/document.xml",
                r#"<?xml version="1.0"?><w:document><w:body>
                <w:p><w:r><w:t>Refund</w:t></w:r><w:r><w:t xml:space="preserve"> policy</w:t></w:r></w:p>
                <w:p><w:r><w:t>Tom &amp; Jerry</w:t></w:r></w:p>
                </w:body></w:document>"#,
            )],
        );

        let text = docx_text(&path).unwrap();
        assert!(text.contains("Refund policy\n"));
        assert!(text.ends_with("Tom & Jerry"));
    }

    #[test]
    fn test_docx_tab_stops_are_not_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tabs.docx");
        write_zip(
            &path,
            &[(
                "word/document.xml",
                r#"<w:document><w:body>
                <w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/><w:tab w:val="right" w:pos="9000"/></w:tabs></w:pPr>
                <w:r><w:t>Name</w:t></w:r><w:r><w:tab/></w:r><w:r><w:t>Value</w:t></w:r></w:p>
                </w:body></w:document>"#,
            )],
        );

        assert_eq!(docx_text(&path).unwrap(), "Name\tValue");
    }

    #[test]
    fn test_docx_without_body_is_document_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.docx");
        write_zip(&path, &[("other.xml", "<a/>")]);
        assert!(matches!(docx_text(&path), Err(AppError::Document(_))));
    }

    #[test]
    fn test_not_a_zip_is_document_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fake.docx");
        std::fs::write(&path, "plain text").unwrap();
        assert!(matches!(docx_text(&path), Err(AppError::Document(_))));
    }

    #[test]
    fn test_pptx_slides_in_numeric_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deck.pptx");
        let slide = |t: &str| format!("<p:sld><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:sld>", t);
        let (s1, s2, s10) = (slide("first"), slide("second"), slide("tenth"));
        write_zip(
            &path,
            &[
                ("ppt/slides/slide10.xml", s10.as_str()),
                ("ppt/slides/slide2.xml", s2.as_str()),
                ("ppt/slides/slide1.xml", s1.as_str()),
                ("ppt/slides/_rels/slide1.xml.rels", "<Relationships/>"),
            ],
        );

        let slides = pptx_slides(&path).unwrap();
        assert_eq!(
            slides,
            vec![
                (1, "first".to_string()),
                (2, "second".to_string()),
                (10, "tenth".to_string())
            ]
        );
    }

    #[test]
    fn test_xlsx_resolves_shared_strings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prices.xlsx");
        write_zip(
            &path,
            &[
                (
                    "xl/sharedStrings.xml",
                    "<sst><si><t>Plan</t></si><si><t>Price</t></si><si><r><t>Pro</t></r><r><t> tier</t></r></si></sst>",
                ),
                (
                    "xl/worksheets/sheet1.xml",
                    r#"<worksheet><sheetData>
                    <row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1" t="s"><v>1</v></c></row>
                    <row r="2"><c r="A2" t="s"><v>2</v></c><c r="B2"><v>49.5</v></c></row>
                    <row r="3"><c r="A3" t="inlineStr"><is><t>Note</t></is></c><c r="B3"/></row>
                    </sheetData></worksheet>"#,
                ),
            ],
        );

        let sheets = xlsx_sheets(&path).unwrap();
        assert_eq!(sheets.len(), 1);
        assert_eq!(sheets[0].0, 1);
        assert_eq!(sheets[0].1, "Plan\tPrice\nPro tier\t49.5\nNote");
    }
}
