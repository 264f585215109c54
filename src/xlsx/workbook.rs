//! In-memory model of an existing xlsx package
//!
//! Only worksheet cell data is parsed into a row/cell model. Every other
//! part of the package (styles, themes, drawings, shared strings) is carried
//! through unchanged, so a template keeps its look after cells are written
//! and rows are inserted.

use super::cell_ref::{shift_anchored_reference, shift_reference_list, CellRange, CellRef};
use crate::error::{ExportError, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CALC_CHAIN_PART: &str = "xl/calcChain.xml";

/// Row attributes that carry formatting and are copied with a row style
const ROW_STYLE_ATTRS: [&str; 4] = ["s", "customFormat", "ht", "customHeight"];

/// Elements after `<sheetData>` whose references move when rows are inserted
const SHIFTED_REFS: [(&[u8], &str); 5] = [
    (b"mergeCell", "ref"),
    (b"autoFilter", "ref"),
    (b"hyperlink", "ref"),
    (b"conditionalFormatting", "sqref"),
    (b"dataValidation", "sqref"),
];

/// A cell's content
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Present only to carry a style
    Blank,
    Number(f64),
    /// Written as an inline string
    Text(String),
    /// Content read from the template, written back verbatim
    Preserved {
        cell_type: Option<String>,
        inner: String,
        text: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub style: Option<u32>,
    pub value: CellValue,
    extra_attrs: Vec<(String, String)>,
}

impl Cell {
    fn blank(style: Option<u32>) -> Self {
        Self {
            style,
            value: CellValue::Blank,
            extra_attrs: Vec::new(),
        }
    }

    /// Display text of the cell, if it holds any value
    pub fn text(&self) -> Option<String> {
        match &self.value {
            CellValue::Blank => None,
            CellValue::Number(n) => Some(format_number(*n)),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Preserved { text, .. } => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Row {
    attrs: Vec<(String, String)>,
    cells: BTreeMap<u16, Cell>,
}

/// Formatting of one row: row-level attributes plus the style id of each cell
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowStyle {
    pub attrs: Vec<(String, String)>,
    pub cells: Vec<(u16, u32)>,
}

impl RowStyle {
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.cells.is_empty()
    }
}

/// One worksheet part
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    head: String,
    tail: String,
    rows: BTreeMap<u32, Row>,
    /// Row insertions in the order they happened, as `(at, count)`
    insertions: Vec<(u32, u32)>,
    modified: bool,
}

impl Worksheet {
    fn parse(name: &str, xml: &str, shared_strings: &[String]) -> Result<Self> {
        let (head, body, tail) = split_sheet_data(xml)?;
        let rows = parse_rows(body, shared_strings)?;

        Ok(Self {
            name: name.to_string(),
            head: head.to_string(),
            tail: tail.to_string(),
            rows,
            insertions: Vec::new(),
            modified: false,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Highest row number that has a `<row>` element, 0 for an empty sheet
    pub fn last_row(&self) -> u32 {
        self.rows.keys().next_back().copied().unwrap_or(0)
    }

    pub fn cell(&self, row: u32, col: u16) -> Option<&Cell> {
        self.rows.get(&row).and_then(|r| r.cells.get(&col))
    }

    pub fn cell_text(&self, row: u32, col: u16) -> Option<String> {
        self.cell(row, col).and_then(Cell::text)
    }

    pub fn cell_text_at(&self, reference: &str) -> Result<Option<String>> {
        let cell = CellRef::parse(reference)?;
        Ok(self.cell_text(cell.row, cell.col))
    }

    pub fn cell_style(&self, row: u32, col: u16) -> Option<u32> {
        self.cell(row, col).and_then(|c| c.style)
    }

    /// True when the row has no cell holding a value
    pub fn row_is_blank(&self, row: u32) -> bool {
        match self.rows.get(&row) {
            Some(r) => r
                .cells
                .values()
                .all(|c| c.text().map_or(true, |t| t.trim().is_empty())),
            None => true,
        }
    }

    fn cell_entry(&mut self, row: u32, col: u16) -> &mut Cell {
        self.modified = true;
        self.rows
            .entry(row)
            .or_default()
            .cells
            .entry(col)
            .or_insert_with(|| Cell::blank(None))
    }

    /// Write a text value, keeping the cell's style.
    ///
    /// Characters XML 1.0 cannot carry are dropped.
    pub fn set_text(&mut self, row: u32, col: u16, text: &str) {
        let cell = self.cell_entry(row, col);
        cell.value = CellValue::Text(xml_safe_text(text).into_owned());
    }

    /// Write a numeric value, keeping the cell's style
    pub fn set_number(&mut self, row: u32, col: u16, value: f64) {
        let cell = self.cell_entry(row, col);
        cell.value = CellValue::Number(value);
    }

    pub fn set_text_at(&mut self, reference: &str, text: &str) -> Result<()> {
        let cell = CellRef::parse(reference)?;
        self.set_text(cell.row, cell.col, text);
        Ok(())
    }

    pub fn set_number_at(&mut self, reference: &str, value: f64) -> Result<()> {
        let cell = CellRef::parse(reference)?;
        self.set_number(cell.row, cell.col, value);
        Ok(())
    }

    pub fn set_cell_style(&mut self, row: u32, col: u16, style: Option<u32>) {
        let cell = self.cell_entry(row, col);
        cell.style = style;
    }

    /// Capture the formatting of a row so it can be stamped onto other rows
    pub fn row_style(&self, row: u32) -> RowStyle {
        let Some(r) = self.rows.get(&row) else {
            return RowStyle::default();
        };

        RowStyle {
            attrs: r
                .attrs
                .iter()
                .filter(|(k, _)| ROW_STYLE_ATTRS.contains(&k.as_str()))
                .cloned()
                .collect(),
            cells: r
                .cells
                .iter()
                .filter_map(|(col, cell)| cell.style.map(|s| (*col, s)))
                .collect(),
        }
    }

    /// Apply a captured row style. Existing cell values are kept.
    pub fn apply_row_style(&mut self, row: u32, style: &RowStyle) {
        self.modified = true;
        let r = self.rows.entry(row).or_default();

        for (key, value) in &style.attrs {
            match r.attrs.iter_mut().find(|(k, _)| k == key) {
                Some(existing) => existing.1 = value.clone(),
                None => r.attrs.push((key.clone(), value.clone())),
            }
        }

        for (col, style_id) in &style.cells {
            r.cells
                .entry(*col)
                .or_insert_with(|| Cell::blank(None))
                .style = Some(*style_id);
        }
    }

    /// Insert `count` empty rows before row `at`; rows from `at` down move by `count`
    pub fn insert_rows(&mut self, at: u32, count: u32) {
        if count == 0 {
            return;
        }
        self.modified = true;

        let moved = self.rows.split_off(&at);
        for (index, row) in moved {
            self.rows.insert(index + count, row);
        }
        self.insertions.push((at, count));
    }

    pub fn has_inserted_rows(&self) -> bool {
        !self.insertions.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    fn dimension(&self) -> String {
        let mut bounds: Option<(CellRef, CellRef)> = None;

        for (row, r) in &self.rows {
            for col in r.cells.keys() {
                bounds = Some(match bounds {
                    None => (CellRef::new(*row, *col), CellRef::new(*row, *col)),
                    Some((min, max)) => (
                        CellRef::new(min.row.min(*row), min.col.min(*col)),
                        CellRef::new(max.row.max(*row), max.col.max(*col)),
                    ),
                });
            }
        }

        match bounds {
            Some((start, end)) => CellRange { start, end }.to_string(),
            None => "A1".to_string(),
        }
    }

    fn shift_list(&self, list: &str) -> String {
        self.insertions
            .iter()
            .fold(list.to_string(), |acc, (at, count)| shift_reference_list(&acc, *at, *count))
    }

    fn shift_anchored(&self, reference: &str) -> String {
        self.insertions
            .iter()
            .fold(reference.to_string(), |acc, (at, count)| shift_anchored_reference(&acc, *at, *count))
    }

    fn to_xml(&self) -> Result<String> {
        let dimension = self.dimension();
        let head = rewrite_elements(&self.head, |e| {
            if e.local_name().as_ref() == b"dimension" {
                Ok(Rewrite::Replace(with_attribute(e, "ref", &dimension)?))
            } else {
                Ok(Rewrite::Keep)
            }
        })?;

        let tail = rewrite_elements(&self.tail, |e| {
            let local = e.local_name();
            for (element, key) in SHIFTED_REFS {
                if local.as_ref() != element {
                    continue;
                }
                if let Some(value) = attribute_value(e, key)? {
                    let shifted = self.shift_list(&value);
                    return Ok(Rewrite::Replace(with_attribute(e, key, &shifted)?));
                }
            }
            Ok(Rewrite::Keep)
        })?;

        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Start(BytesStart::new("sheetData")))?;
        for (index, row) in &self.rows {
            write_row(&mut writer, *index, row)?;
        }
        writer.write_event(Event::End(BytesEnd::new("sheetData")))?;
        let sheet_data = into_string(writer.into_inner())?;

        Ok(format!("{}{}{}", head, sheet_data, tail))
    }
}

fn write_row(writer: &mut Writer<Vec<u8>>, index: u32, row: &Row) -> Result<()> {
    let mut start = BytesStart::new("row");
    start.push_attribute(("r", index.to_string().as_str()));
    for (key, value) in &row.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if row.cells.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    for (col, cell) in &row.cells {
        write_cell(writer, CellRef::new(index, *col), cell)?;
    }
    writer.write_event(Event::End(BytesEnd::new("row")))?;
    Ok(())
}

fn write_cell(writer: &mut Writer<Vec<u8>>, at: CellRef, cell: &Cell) -> Result<()> {
    let mut start = BytesStart::new("c");
    start.push_attribute(("r", at.to_a1().as_str()));
    if let Some(style) = cell.style {
        start.push_attribute(("s", style.to_string().as_str()));
    }

    match &cell.value {
        CellValue::Blank => {
            push_extra_attrs(&mut start, cell);
            writer.write_event(Event::Empty(start))?;
        }
        CellValue::Number(n) => {
            push_extra_attrs(&mut start, cell);
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("v")))?;
            writer.write_event(Event::Text(BytesText::new(&format_number(*n))))?;
            writer.write_event(Event::End(BytesEnd::new("v")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        CellValue::Text(s) => {
            start.push_attribute(("t", "inlineStr"));
            push_extra_attrs(&mut start, cell);
            writer.write_event(Event::Start(start))?;
            writer.write_event(Event::Start(BytesStart::new("is")))?;
            let mut t = BytesStart::new("t");
            t.push_attribute(("xml:space", "preserve"));
            writer.write_event(Event::Start(t))?;
            writer.write_event(Event::Text(BytesText::new(s)))?;
            writer.write_event(Event::End(BytesEnd::new("t")))?;
            writer.write_event(Event::End(BytesEnd::new("is")))?;
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
        CellValue::Preserved {
            cell_type, inner, ..
        } => {
            if let Some(t) = cell_type {
                start.push_attribute(("t", t.as_str()));
            }
            push_extra_attrs(&mut start, cell);
            writer.write_event(Event::Start(start))?;
            writer.get_mut().extend_from_slice(inner.as_bytes());
            writer.write_event(Event::End(BytesEnd::new("c")))?;
        }
    }
    Ok(())
}

fn push_extra_attrs(start: &mut BytesStart, cell: &Cell) {
    for (key, value) in &cell.extra_attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn xml_safe_text(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|c| is_xml_char(*c)).collect())
    }
}

fn into_string(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidWorkbook(e.to_string()))
}

/// Split worksheet XML into the part before `<sheetData>`, the rows, and the part after
fn split_sheet_data(xml: &str) -> Result<(&str, &str, &str)> {
    let start = xml
        .find("<sheetData")
        .ok_or_else(|| ExportError::InvalidWorkbook("worksheet has no sheetData".to_string()))?;
    let open_end = xml[start..]
        .find('>')
        .map(|i| start + i)
        .ok_or_else(|| ExportError::InvalidWorkbook("unterminated sheetData".to_string()))?;

    if xml[..open_end].ends_with('/') {
        return Ok((&xml[..start], "", &xml[open_end + 1..]));
    }

    const CLOSE: &str = "</sheetData>";
    let close = xml[open_end..]
        .find(CLOSE)
        .map(|i| open_end + i)
        .ok_or_else(|| ExportError::InvalidWorkbook("unterminated sheetData".to_string()))?;

    Ok((&xml[..start], &xml[open_end + 1..close], &xml[close + CLOSE.len()..]))
}

fn attribute_value(e: &BytesStart, key: &str) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Copy of `e` with one attribute replaced (or added)
fn with_attribute(e: &BytesStart, key: &str, value: &str) -> Result<BytesStart<'static>> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut out = BytesStart::new(name);
    let mut replaced = false;

    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            out.push_attribute((key, value));
            replaced = true;
        } else {
            out.push_attribute(attr);
        }
    }
    if !replaced {
        out.push_attribute((key, value));
    }
    Ok(out)
}

enum Rewrite {
    Keep,
    Replace(BytesStart<'static>),
    Remove,
}

/// Stream an XML fragment through, editing or dropping selected elements
fn rewrite_elements<F>(xml: &str, mut edit: F) -> Result<String>
where
    F: FnMut(&BytesStart) -> Result<Rewrite>,
{
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;

    let mut writer = Writer::new(Vec::new());
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => match edit(&e)? {
                Rewrite::Keep => writer.write_event(Event::Start(e))?,
                Rewrite::Replace(new) => writer.write_event(Event::Start(new))?,
                Rewrite::Remove => {
                    let end = e.to_end().into_owned();
                    reader.read_to_end(end.name())?;
                }
            },
            Event::Empty(e) => match edit(&e)? {
                Rewrite::Keep => writer.write_event(Event::Empty(e))?,
                Rewrite::Replace(new) => writer.write_event(Event::Empty(new))?,
                Rewrite::Remove => {}
            },
            other => writer.write_event(other)?,
        }
    }
    into_string(writer.into_inner())
}

fn parse_rows(xml: &str, shared_strings: &[String]) -> Result<BTreeMap<u32, Row>> {
    let mut reader = Reader::from_str(xml);
    let mut rows = BTreeMap::new();
    let mut current: Option<(u32, Row)> = None;
    let mut last_row = 0u32;
    let mut next_col = 0u16;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) if e.local_name().as_ref() == b"row" => {
                let (index, row) = parse_row_start(&e, last_row)?;
                last_row = index;
                next_col = 0;
                current = Some((index, row));
            }
            Event::Empty(e) if e.local_name().as_ref() == b"row" => {
                let (index, row) = parse_row_start(&e, last_row)?;
                last_row = index;
                rows.insert(index, row);
            }
            Event::End(e) if e.local_name().as_ref() == b"row" => {
                if let Some((index, row)) = current.take() {
                    rows.insert(index, row);
                }
            }
            Event::Start(e) if e.local_name().as_ref() == b"c" => {
                let header = parse_cell_start(&e, next_col)?;
                let (inner, text) = read_cell_body(&mut reader, shared_strings, header.cell_type.as_deref())?;
                next_col = header.col.saturating_add(1);
                let value = if inner.trim().is_empty() {
                    CellValue::Blank
                } else {
                    CellValue::Preserved {
                        cell_type: header.cell_type,
                        inner,
                        text,
                    }
                };
                push_cell(&mut current, header.col, header.style, value, header.extra_attrs)?;
            }
            Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let header = parse_cell_start(&e, next_col)?;
                next_col = header.col.saturating_add(1);
                push_cell(&mut current, header.col, header.style, CellValue::Blank, header.extra_attrs)?;
            }
            _ => {}
        }
    }

    Ok(rows)
}

fn push_cell(
    current: &mut Option<(u32, Row)>,
    col: u16,
    style: Option<u32>,
    value: CellValue,
    extra_attrs: Vec<(String, String)>,
) -> Result<()> {
    let (_, row) = current
        .as_mut()
        .ok_or_else(|| ExportError::InvalidWorkbook("cell outside of a row".to_string()))?;
    row.cells.insert(
        col,
        Cell {
            style,
            value,
            extra_attrs,
        },
    );
    Ok(())
}

fn parse_row_start(e: &BytesStart, last_row: u32) -> Result<(u32, Row)> {
    let mut index = None;
    let mut row = Row::default();

    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        if attr.key.as_ref() == b"r" {
            index = Some(
                value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| ExportError::InvalidWorkbook(format!("bad row number: {}", value)))?,
            );
        } else {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            row.attrs.push((key, value.into_owned()));
        }
    }

    Ok((index.unwrap_or(last_row + 1), row))
}

struct CellHeader {
    col: u16,
    style: Option<u32>,
    cell_type: Option<String>,
    extra_attrs: Vec<(String, String)>,
}

fn parse_cell_start(e: &BytesStart, next_col: u16) -> Result<CellHeader> {
    let mut header = CellHeader {
        col: next_col,
        style: None,
        cell_type: None,
        extra_attrs: Vec::new(),
    };

    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"r" => header.col = CellRef::parse(&value)?.col,
            b"s" => header.style = value.trim().parse().ok(),
            b"t" => header.cell_type = Some(value.into_owned()),
            key => header
                .extra_attrs
                .push((String::from_utf8_lossy(key).into_owned(), value.into_owned())),
        }
    }
    Ok(header)
}

/// Read a `<c>` element's children up to `</c>`.
///
/// Returns the children as raw XML plus the decoded display text.
fn read_cell_body(
    reader: &mut Reader<&[u8]>,
    shared_strings: &[String],
    cell_type: Option<&str>,
) -> Result<(String, Option<String>)> {
    let mut inner = Writer::new(Vec::new());
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut value: Option<String> = None;
    let mut inline: Option<String> = None;

    loop {
        let event = reader.read_event()?;
        let in_phonetic = path.iter().any(|p| p.as_slice() == b"rPh");
        match &event {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                // An empty `<t></t>` still means an empty string, not a missing value
                if name.as_slice() == b"t" && !in_phonetic {
                    inline.get_or_insert_with(String::new);
                }
                path.push(name);
            }
            Event::Empty(e) if e.local_name().as_ref() == b"t" && !in_phonetic => {
                inline.get_or_insert_with(String::new);
            }
            Event::End(_) if path.is_empty() => break,
            Event::End(_) => {
                path.pop();
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                match path.last().map(Vec::as_slice) {
                    Some(b"v") => value.get_or_insert_with(String::new).push_str(&text),
                    Some(b"t") if !in_phonetic => inline.get_or_insert_with(String::new).push_str(&text),
                    _ => {}
                }
            }
            Event::Eof => {
                return Err(ExportError::InvalidWorkbook("unterminated cell".to_string()));
            }
            _ => {}
        }
        inner.write_event(event)?;
    }

    let text = match cell_type {
        Some("s") => value
            .and_then(|v| v.trim().parse::<usize>().ok())
            .and_then(|i| shared_strings.get(i).cloned()),
        Some("inlineStr") => inline,
        _ => value,
    };

    Ok((into_string(inner.into_inner())?, text))
}

fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => match e.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"t" => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Event::End(e) => match e.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Event::Text(t) if in_text && !in_phonetic => {
                if let Some(s) = current.as_mut() {
                    s.push_str(&t.unescape()?);
                }
            }
            _ => {}
        }
    }
    Ok(strings)
}

/// `(sheet name, relationship id)` in workbook order
fn parse_sheet_list(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut rel_id = None;
                for attr in e.attributes() {
                    let attr = attr?;
                    let key = attr.key.as_ref();
                    if key == b"name" {
                        name = Some(attr.unescape_value()?.into_owned());
                    } else if key.ends_with(b":id") {
                        rel_id = Some(attr.unescape_value()?.into_owned());
                    }
                }
                if let (Some(name), Some(rel_id)) = (name, rel_id) {
                    sheets.push((name, rel_id));
                }
            }
            _ => {}
        }
    }
    Ok(sheets)
}

struct Relationship {
    rel_type: String,
    target: String,
}

fn parse_relationships(xml: &str) -> Result<HashMap<String, Relationship>> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = String::new();
                let mut rel_type = String::new();
                let mut target = String::new();
                for attr in e.attributes() {
                    let attr = attr?;
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value()?.into_owned(),
                        b"Type" => rel_type = attr.unescape_value()?.into_owned(),
                        b"Target" => target = attr.unescape_value()?.into_owned(),
                        _ => {}
                    }
                }
                rels.insert(id, Relationship { rel_type, target });
            }
            _ => {}
        }
    }
    Ok(rels)
}

/// Resolve a relationship target from the workbook part to a package path
fn resolve_target(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

struct PackageEntry {
    name: String,
    data: Vec<u8>,
}

fn part_text<'a>(entries: &'a [PackageEntry], name: &str) -> Option<Cow<'a, str>> {
    entries
        .iter()
        .find(|e| e.name == name)
        .map(|e| String::from_utf8_lossy(&e.data))
}

struct SheetEntry {
    part: String,
    worksheet: Worksheet,
}

/// An xlsx document loaded from bytes
///
/// Each instance owns its data; loading the same bytes twice gives two
/// independent workbooks.
pub struct Workbook {
    entries: Vec<PackageEntry>,
    sheets: Vec<SheetEntry>,
}

impl Workbook {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data)?;
            entries.push(PackageEntry { name, data });
        }

        let workbook_xml = part_text(&entries, WORKBOOK_PART)
            .ok_or_else(|| ExportError::InvalidWorkbook(format!("{} not found", WORKBOOK_PART)))?;
        let rels_xml = part_text(&entries, WORKBOOK_RELS_PART)
            .ok_or_else(|| ExportError::InvalidWorkbook(format!("{} not found", WORKBOOK_RELS_PART)))?;

        let sheet_list = parse_sheet_list(&workbook_xml)?;
        let rels = parse_relationships(&rels_xml)?;

        let shared_strings = match rels
            .values()
            .find(|r| r.rel_type.ends_with("/sharedStrings"))
            .and_then(|r| part_text(&entries, &resolve_target(&r.target)))
        {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let mut sheets = Vec::new();
        for (name, rel_id) in sheet_list {
            let Some(rel) = rels.get(&rel_id) else {
                continue;
            };
            if !rel.rel_type.ends_with("/worksheet") {
                continue;
            }
            let part = resolve_target(&rel.target);
            let xml = part_text(&entries, &part)
                .ok_or_else(|| ExportError::InvalidWorkbook(format!("{} not found", part)))?;
            let worksheet = Worksheet::parse(&name, &xml, &shared_strings)?;
            sheets.push(SheetEntry { part, worksheet });
        }

        Ok(Self { entries, sheets })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.worksheet.name()).collect()
    }

    pub fn worksheet(&self, name: &str) -> Result<&Worksheet> {
        self.sheets
            .iter()
            .find(|s| s.worksheet.name() == name)
            .map(|s| &s.worksheet)
            .ok_or_else(|| ExportError::MissingWorksheet(name.to_string()))
    }

    pub fn worksheet_mut(&mut self, name: &str) -> Result<&mut Worksheet> {
        self.sheets
            .iter_mut()
            .find(|s| s.worksheet.name() == name)
            .map(|s| &mut s.worksheet)
            .ok_or_else(|| ExportError::MissingWorksheet(name.to_string()))
    }

    /// Serialize the package. Untouched parts are copied byte for byte.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        // Inserted rows move defined names and invalidate the formula
        // calculation chain; the chain is dropped so spreadsheet applications
        // rebuild it on open.
        let shifted: Vec<&Worksheet> = self
            .sheets
            .iter()
            .map(|s| &s.worksheet)
            .filter(|w| w.has_inserted_rows())
            .collect();
        let drop_calc_chain = !shifted.is_empty();

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for entry in &self.entries {
            if drop_calc_chain && entry.name == CALC_CHAIN_PART {
                continue;
            }

            let modified_sheet = self
                .sheets
                .iter()
                .find(|s| s.part == entry.name && s.worksheet.is_modified());

            let data: Cow<'_, [u8]> = if let Some(sheet) = modified_sheet {
                Cow::Owned(sheet.worksheet.to_xml()?.into_bytes())
            } else if drop_calc_chain && entry.name == CONTENT_TYPES_PART {
                Cow::Owned(remove_calc_chain_content_type(&String::from_utf8_lossy(&entry.data))?.into_bytes())
            } else if !shifted.is_empty() && entry.name == WORKBOOK_PART {
                Cow::Owned(shift_defined_names(&String::from_utf8_lossy(&entry.data), &shifted)?.into_bytes())
            } else if drop_calc_chain && entry.name == WORKBOOK_RELS_PART {
                Cow::Owned(remove_calc_chain_relationship(&String::from_utf8_lossy(&entry.data))?.into_bytes())
            } else {
                Cow::Borrowed(&entry.data)
            };

            let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            zip.start_file(entry.name.as_str(), options)?;
            zip.write_all(&data)?;
        }

        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }
}

/// Move print areas, print titles and other defined names that point into a
/// sheet with inserted rows
fn shift_defined_names(xml: &str, sheets: &[&Worksheet]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut in_defined_name = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) => {
                in_defined_name = e.local_name().as_ref() == b"definedName";
                writer.write_event(Event::Start(e))?;
            }
            Event::End(e) => {
                in_defined_name = false;
                writer.write_event(Event::End(e))?;
            }
            Event::Text(t) if in_defined_name => {
                let formula = t.unescape()?;
                writer.write_event(Event::Text(BytesText::new(&shift_defined_name(&formula, sheets))))?;
            }
            other => writer.write_event(other)?,
        }
    }
    into_string(writer.into_inner())
}

/// `Results!$A$1:$E$40,'Other sheet'!$A$1` with each area shifted by its own sheet
fn shift_defined_name(formula: &str, sheets: &[&Worksheet]) -> String {
    formula
        .split(',')
        .map(|area| {
            let Some((sheet_part, reference)) = area.rsplit_once('!') else {
                return area.to_string();
            };
            let name = sheet_part.trim();
            let name = match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
                Some(quoted) => quoted.replace("''", "'"),
                None => name.to_string(),
            };
            match sheets.iter().find(|s| s.name() == name) {
                Some(sheet) => format!("{}!{}", sheet_part, sheet.shift_anchored(reference)),
                None => area.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn remove_calc_chain_content_type(xml: &str) -> Result<String> {
    let target = format!("/{}", CALC_CHAIN_PART);
    rewrite_elements(xml, |e| {
        if e.local_name().as_ref() == b"Override" && attribute_value(e, "PartName")?.as_deref() == Some(target.as_str()) {
            Ok(Rewrite::Remove)
        } else {
            Ok(Rewrite::Keep)
        }
    })
}

fn remove_calc_chain_relationship(xml: &str) -> Result<String> {
    rewrite_elements(xml, |e| {
        let is_calc_chain = e.local_name().as_ref() == b"Relationship"
            && attribute_value(e, "Type")?.is_some_and(|t| t.ends_with("/calcChain"));
        Ok(if is_calc_chain { Rewrite::Remove } else { Rewrite::Keep })
    })
}
