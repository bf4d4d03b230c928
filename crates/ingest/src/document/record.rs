//! Wire format of the layout parser's block stream.
//!
//! The parser answers with `{"return_dict": {"result": {"blocks": [...]}}}`.
//! Each block carries a tag, a nesting level, positional metadata and its
//! sentences. Unknown tags are rejected here so nothing downstream has to
//! deal with them.

use docflow_core::DocflowError;
use serde::{Deserialize, Serialize};

/// Value the parser uses for "not set".
pub const UNSET: i32 = -1;

fn unset() -> i32 {
    UNSET
}

fn unset_i64() -> i64 {
    UNSET as i64
}

fn unset_f64() -> f64 {
    UNSET as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockTag {
    Para,
    Header,
    ListItem,
    Table,
}

impl BlockTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockTag::Para => "para",
            BlockTag::Header => "header",
            BlockTag::ListItem => "list_item",
            BlockTag::Table => "table",
        }
    }
}

impl std::fmt::Display for BlockTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One record of the block stream, as emitted by the parser.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockRecord {
    pub tag: BlockTag,
    #[serde(default = "unset")]
    pub level: i32,
    #[serde(default = "unset")]
    pub page_idx: i32,
    #[serde(default = "unset_i64")]
    pub block_idx: i64,
    #[serde(default = "unset_f64")]
    pub top: f64,
    #[serde(default = "unset_f64")]
    pub left: f64,
    #[serde(default)]
    pub bbox: Vec<f64>,
    #[serde(default)]
    pub sentences: Vec<String>,
    /// Table caption, tables only.
    #[serde(default)]
    pub name: Option<String>,
    /// Table rows, tables only.
    #[serde(default)]
    pub table_rows: Vec<TableRowRecord>,
}

impl BlockRecord {
    /// Minimal record with every positional field unset.
    pub fn new(tag: BlockTag, level: i32, sentences: Vec<String>) -> Self {
        Self {
            tag,
            level,
            page_idx: UNSET,
            block_idx: UNSET as i64,
            top: UNSET as f64,
            left: UNSET as f64,
            bbox: Vec::new(),
            sentences,
            name: None,
            table_rows: Vec::new(),
        }
    }

    pub fn with_page(mut self, page_idx: i32) -> Self {
        self.page_idx = page_idx;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    TableHeader,
    /// A single cell spanning the whole row.
    FullRow,
    #[serde(other)]
    DataRow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableRowRecord {
    #[serde(rename = "type")]
    pub kind: RowKind,
    #[serde(default)]
    pub cells: Vec<TableCellRecord>,
    /// Present on `full_row` records, which are their own single cell.
    #[serde(default)]
    pub cell_value: Option<CellValueRecord>,
    #[serde(default)]
    pub col_span: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableCellRecord {
    pub cell_value: CellValueRecord,
    #[serde(default)]
    pub col_span: Option<u32>,
}

/// A cell holds either plain text or an embedded paragraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValueRecord {
    Text(String),
    Paragraph(CellParagraphRecord),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellParagraphRecord {
    #[serde(default)]
    pub sentences: Vec<String>,
}

/// Parse a block stream from JSON.
///
/// Accepts either the parser envelope or a bare array of blocks.
pub fn parse_block_json(json: &str) -> Result<Vec<BlockRecord>, DocflowError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    parse_block_value(value)
}

pub fn parse_block_value(mut value: serde_json::Value) -> Result<Vec<BlockRecord>, DocflowError> {
    if value.is_array() {
        return Ok(serde_json::from_value(value)?);
    }
    let blocks = value
        .pointer_mut("/return_dict/result/blocks")
        .map(serde_json::Value::take)
        .ok_or_else(|| {
            DocflowError::StructuralParse("response has no return_dict.result.blocks".to_string())
        })?;
    Ok(serde_json::from_value(blocks)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unset() {
        let blocks = parse_block_json(r#"[{"tag": "para", "sentences": ["x"]}]"#).unwrap();
        assert_eq!(blocks[0].level, UNSET);
        assert_eq!(blocks[0].page_idx, UNSET);
        assert_eq!(blocks[0].block_idx, -1);
        assert!(blocks[0].bbox.is_empty());
    }

    #[test]
    fn envelope_is_unwrapped() {
        let json = r#"{"return_dict": {"result": {"blocks": [
            {"tag": "header", "level": 0, "page_idx": 2, "sentences": ["Intro"]}
        ]}}}"#;
        let blocks = parse_block_json(json).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].tag, BlockTag::Header);
        assert_eq!(blocks[0].page_idx, 2);
    }

    #[test]
    fn envelope_without_blocks_is_rejected() {
        let err = parse_block_json(r#"{"return_dict": {}}"#).unwrap_err();
        assert!(matches!(err, DocflowError::StructuralParse(_)));
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let err = parse_block_json(r#"[{"tag": "figure"}]"#).unwrap_err();
        assert!(matches!(err, DocflowError::StructuralParse(_)));
    }

    #[test]
    fn table_rows_parse() {
        let json = r#"[{"tag": "table", "name": "Prices", "table_rows": [
            {"type": "table_header", "cells": [{"cell_value": "Item"}, {"cell_value": "Cost", "col_span": 2}]},
            {"type": "table_data_row", "cells": [{"cell_value": {"sentences": ["Tea", "hot"]}}]},
            {"type": "full_row", "cell_value": "Total"}
        ]}]"#;
        let blocks = parse_block_json(json).unwrap();
        let rows = &blocks[0].table_rows;
        assert_eq!(rows[0].kind, RowKind::TableHeader);
        assert_eq!(rows[0].cells[1].col_span, Some(2));
        assert_eq!(rows[1].kind, RowKind::DataRow);
        assert!(matches!(
            &rows[1].cells[0].cell_value,
            CellValueRecord::Paragraph(p) if p.sentences.len() == 2
        ));
        assert_eq!(rows[2].kind, RowKind::FullRow);
        assert!(rows[2].cell_value.is_some());
    }
}
