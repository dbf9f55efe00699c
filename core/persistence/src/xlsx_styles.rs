//! FILENAME: core/persistence/src/xlsx_styles.rs
//! PURPOSE: Reads the formatting calamine skips: the cell style table,
//! per-cell style indices, column widths and custom row heights.
//! CONTEXT: Parts are read straight from the package with zip + quick-xml.
//! Only attributes the engine's `CellStyle` can hold are kept; theme and
//! indexed colours are ignored.

use crate::PersistenceError;
use engine::{parse_a1, CellCoord, CellStyle, Color, TextAlign};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::result::ZipError;
use zip::ZipArchive;

/// Formatting of one worksheet part.
#[derive(Debug, Default)]
pub(crate) struct SheetFormatting {
    /// 0-based column and width in character units.
    pub column_widths: Vec<(u32, f64)>,
    /// 0-based row and height in points.
    pub row_heights: Vec<(u32, f64)>,
    /// Cell and its index into `PackageFormatting::cell_styles`.
    pub cells: Vec<(CellCoord, usize)>,
}

#[derive(Debug, Default)]
pub(crate) struct PackageFormatting {
    /// `cellXfs` of the styles part, in order.
    pub cell_styles: Vec<CellStyle>,
    /// Keyed by sheet name.
    pub sheets: HashMap<String, SheetFormatting>,
}

impl PackageFormatting {
    pub fn style(&self, index: usize) -> Option<&CellStyle> {
        self.cell_styles.get(index).filter(|s| !s.is_default())
    }
}

pub(crate) fn read_formatting(path: &Path) -> Result<PackageFormatting, PersistenceError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;

    let cell_styles = match read_part(&mut archive, "xl/styles.xml")? {
        Some(xml) => parse_styles(&xml)?,
        None => Vec::new(),
    };

    let targets = match read_part(&mut archive, "xl/_rels/workbook.xml.rels")? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };
    let workbook_xml = read_part(&mut archive, "xl/workbook.xml")?
        .ok_or_else(|| PersistenceError::InvalidFormat("xl/workbook.xml is missing".to_string()))?;

    let mut sheets = HashMap::new();
    for (name, rel_id) in parse_sheet_ids(&workbook_xml)? {
        let Some(target) = targets.get(&rel_id) else {
            continue;
        };
        let part = resolve_target(target);
        if let Some(xml) = read_part(&mut archive, &part)? {
            sheets.insert(name, parse_sheet(&xml)?);
        }
    }

    Ok(PackageFormatting { cell_styles, sheets })
}

fn read_part(archive: &mut ZipArchive<File>, name: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
    match archive.by_name(name) {
        Ok(mut file) => {
            let mut buf = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut buf)?;
            Ok(Some(buf))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// "worksheets/sheet1.xml" and "/xl/worksheets/sheet1.xml" both name
/// "xl/worksheets/sheet1.xml".
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

/// Local attribute names with unescaped values.
fn attributes(e: &BytesStart) -> Result<Vec<(Vec<u8>, String)>, PersistenceError> {
    let mut out = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let raw = std::str::from_utf8(&attr.value).map_err(quick_xml::Error::from)?;
        let value = quick_xml::escape::unescape(raw)
            .map_err(quick_xml::Error::from)?
            .into_owned();
        out.push((attr.key.local_name().as_ref().to_vec(), value));
    }
    Ok(out)
}

fn attr<'a>(attrs: &'a [(Vec<u8>, String)], key: &[u8]) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k.as_slice() == key)
        .map(|(_, v)| v.as_str())
}

fn flag(value: Option<&str>) -> bool {
    matches!(value, Some("1") | Some("true"))
}

/// `<b/>` means on unless `val` says otherwise.
fn toggle(attrs: &[(Vec<u8>, String)]) -> bool {
    !matches!(attr(attrs, b"val"), Some("0") | Some("false"))
}

/// "FFRRGGBB" (ARGB) or "RRGGBB".
fn argb(value: Option<&str>) -> Option<Color> {
    let hex = value?;
    Color::from_hex(&hex[hex.len().saturating_sub(6)..])
}

// ============================================================================
// WORKBOOK PARTS
// ============================================================================

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, PersistenceError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut targets = HashMap::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let attrs = attributes(&e)?;
                if let (Some(id), Some(target)) = (attr(&attrs, b"Id"), attr(&attrs, b"Target")) {
                    targets.insert(id.to_string(), target.to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(targets)
}

/// (sheet name, relationship id) in workbook order.
fn parse_sheet_ids(xml: &[u8]) -> Result<Vec<(String, String)>, PersistenceError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let attrs = attributes(&e)?;
                if let (Some(name), Some(id)) = (attr(&attrs, b"name"), attr(&attrs, b"id")) {
                    sheets.push((name.to_string(), id.to_string()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(sheets)
}

// ============================================================================
// STYLES PART
// ============================================================================

/// Number formats every workbook knows without declaring them.
fn builtin_number_format(id: u32) -> Option<&'static str> {
    Some(match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "m/d/yyyy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yyyy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StyleList {
    Other,
    NumFmts,
    Fonts,
    Fills,
    CellXfs,
}

#[derive(Debug, Clone, Default)]
struct Font {
    bold: bool,
    italic: bool,
    color: Option<Color>,
}

#[derive(Debug, Clone, Default)]
struct Xf {
    num_fmt: u32,
    font: usize,
    fill: usize,
    align: TextAlign,
    wrap: bool,
}

fn xf_from(attrs: &[(Vec<u8>, String)]) -> Xf {
    let index = |key: &[u8]| {
        attr(attrs, key)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0)
    };
    Xf {
        num_fmt: index(b"numFmtId") as u32,
        font: index(b"fontId"),
        fill: index(b"fillId"),
        ..Xf::default()
    }
}

fn parse_styles(xml: &[u8]) -> Result<Vec<CellStyle>, PersistenceError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut list = StyleList::Other;
    let mut num_fmts: HashMap<u32, String> = HashMap::new();
    let mut fonts: Vec<Font> = Vec::new();
    let mut fills: Vec<Option<Color>> = Vec::new();
    let mut xfs: Vec<Xf> = Vec::new();

    let mut font: Option<Font> = None;
    let mut fill: Option<(bool, Option<Color>)> = None;
    let mut xf: Option<Xf> = None;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        let empty = matches!(event, Event::Empty(_));
        match event {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.local_name().as_ref().to_vec();
                let attrs = attributes(&e)?;
                match (list, name.as_slice()) {
                    (_, b"numFmts") if !empty => list = StyleList::NumFmts,
                    (_, b"fonts") if !empty => list = StyleList::Fonts,
                    (_, b"fills") if !empty => list = StyleList::Fills,
                    (_, b"cellXfs") if !empty => list = StyleList::CellXfs,
                    (StyleList::NumFmts, b"numFmt") => {
                        if let (Some(id), Some(code)) = (
                            attr(&attrs, b"numFmtId").and_then(|v| v.parse().ok()),
                            attr(&attrs, b"formatCode"),
                        ) {
                            num_fmts.insert(id, code.to_string());
                        }
                    }
                    (StyleList::Fonts, b"font") => {
                        if empty {
                            fonts.push(Font::default());
                        } else {
                            font = Some(Font::default());
                        }
                    }
                    (StyleList::Fonts, b"b") => {
                        if let Some(font) = font.as_mut() {
                            font.bold = toggle(&attrs);
                        }
                    }
                    (StyleList::Fonts, b"i") => {
                        if let Some(font) = font.as_mut() {
                            font.italic = toggle(&attrs);
                        }
                    }
                    (StyleList::Fonts, b"color") => {
                        if let Some(font) = font.as_mut() {
                            font.color = argb(attr(&attrs, b"rgb"));
                        }
                    }
                    (StyleList::Fills, b"fill") => {
                        if empty {
                            fills.push(None);
                        } else {
                            fill = Some((false, None));
                        }
                    }
                    (StyleList::Fills, b"patternFill") => {
                        if let Some(fill) = fill.as_mut() {
                            fill.0 = attr(&attrs, b"patternType") == Some("solid");
                        }
                    }
                    (StyleList::Fills, b"fgColor") => {
                        if let Some(fill) = fill.as_mut() {
                            fill.1 = argb(attr(&attrs, b"rgb"));
                        }
                    }
                    (StyleList::CellXfs, b"xf") => {
                        if empty {
                            xfs.push(xf_from(&attrs));
                        } else {
                            xf = Some(xf_from(&attrs));
                        }
                    }
                    (StyleList::CellXfs, b"alignment") => {
                        if let Some(xf) = xf.as_mut() {
                            xf.align = match attr(&attrs, b"horizontal") {
                                Some("left") => TextAlign::Left,
                                Some("center") => TextAlign::Center,
                                Some("right") => TextAlign::Right,
                                _ => TextAlign::General,
                            };
                            xf.wrap = flag(attr(&attrs, b"wrapText"));
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"numFmts" | b"fonts" | b"fills" | b"cellXfs" => list = StyleList::Other,
                b"font" => fonts.extend(font.take()),
                b"fill" => {
                    if let Some((solid, color)) = fill.take() {
                        fills.push(color.filter(|_| solid));
                    }
                }
                b"xf" => xfs.extend(xf.take()),
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(xfs
        .into_iter()
        .map(|xf| {
            let font = fonts.get(xf.font).cloned().unwrap_or_default();
            CellStyle {
                bold: font.bold,
                italic: font.italic,
                font_color: font.color,
                background: fills.get(xf.fill).copied().flatten(),
                number_format: match xf.num_fmt {
                    0 => None,
                    id => num_fmts
                        .get(&id)
                        .cloned()
                        .or_else(|| builtin_number_format(id).map(str::to_string)),
                },
                text_align: xf.align,
                wrap_text: xf.wrap,
            }
        })
        .collect())
}

// ============================================================================
// WORKSHEET PARTS
// ============================================================================

/// Stored widths carry the cell padding; this gives back the character
/// width a writer was asked for.
fn character_width(stored: f64) -> f64 {
    let width = if stored > 1.0 {
        (stored * 7.0 - 5.0) / 7.0
    } else {
        stored
    };
    (width * 100.0).round() / 100.0
}

fn parse_sheet(xml: &[u8]) -> Result<SheetFormatting, PersistenceError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut formatting = SheetFormatting::default();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"col" => {
                    let attrs = attributes(&e)?;
                    let number = |key: &[u8]| attr(&attrs, key).and_then(|v| v.parse::<u32>().ok());
                    let width = attr(&attrs, b"width").and_then(|v| v.parse::<f64>().ok());
                    let custom = attr(&attrs, b"customWidth").map_or(true, |v| flag(Some(v)));
                    if let (Some(min), Some(width), true) = (number(b"min"), width, custom) {
                        let max = number(b"max").unwrap_or(min);
                        for col in min.max(1)..=max {
                            formatting.column_widths.push((col - 1, character_width(width)));
                        }
                    }
                }
                b"row" => {
                    let attrs = attributes(&e)?;
                    let row = attr(&attrs, b"r").and_then(|v| v.parse::<u32>().ok());
                    let height = attr(&attrs, b"ht").and_then(|v| v.parse::<f64>().ok());
                    if let (Some(row), Some(height), true) =
                        (row, height, flag(attr(&attrs, b"customHeight")))
                    {
                        if row > 0 {
                            formatting.row_heights.push((row - 1, height));
                        }
                    }
                }
                b"c" => {
                    let attrs = attributes(&e)?;
                    let coord = attr(&attrs, b"r").and_then(parse_a1);
                    let style = attr(&attrs, b"s").and_then(|v| v.parse::<usize>().ok());
                    if let (Some(coord), Some(style)) = (coord, style) {
                        if style > 0 {
                            formatting.cells.push((coord, style));
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(formatting)
}
