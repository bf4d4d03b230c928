//! Layout tree builder.
//!
//! Replays the parser's flat, document-ordered block stream and rebuilds the
//! nesting it implies: headers open sections that nest by heading level, list
//! items nest by indent level (or under an introducing paragraph), and every
//! other block attaches to the section currently open.

use docflow_core::DocflowError;
use tracing::debug;

use super::block::{Block, BlockId, BlockKind, CellValue, LayoutTree, Table, TableCell, TableRow};
use super::record::{BlockRecord, BlockTag, CellValueRecord, RowKind, TableRowRecord};

pub struct LayoutReader;

impl LayoutReader {
    /// Build the layout tree for one document.
    ///
    /// Fails only when a record is structurally unusable (e.g. a `full_row`
    /// with no cell value); the tree is never returned half-built.
    pub fn read(records: &[BlockRecord]) -> Result<LayoutTree, DocflowError> {
        let mut tree = LayoutTree::new();
        let mut parent_stack: Vec<BlockId> = vec![tree.root()];
        let mut list_stack: Vec<BlockId> = Vec::new();
        let mut prev = tree.root();

        for (pos, record) in records.iter().enumerate() {
            if record.tag != BlockTag::ListItem {
                list_stack.clear();
            }
            let section = current(&parent_stack);

            let node = match record.tag {
                BlockTag::Para => tree.attach(section, block_from(record, BlockKind::Paragraph)),
                BlockTag::Table => {
                    let table = table_from(record).map_err(|e| {
                        DocflowError::StructuralParse(format!("block {pos}: {e}"))
                    })?;
                    tree.attach(section, block_from(record, BlockKind::Table(table)))
                }
                BlockTag::ListItem => {
                    let level = record.level;
                    let prev_block = tree.block(prev);
                    match prev_block.kind {
                        // "The following apply: 1) ... 2) ..." keeps the items
                        // under the paragraph that introduces them.
                        BlockKind::Paragraph if prev_block.level == level => list_stack.push(prev),
                        BlockKind::ListItem if level > prev_block.level => list_stack.push(prev),
                        BlockKind::ListItem if level < prev_block.level => {
                            while let Some(top) = list_stack.pop() {
                                if tree.block(top).level <= level {
                                    break;
                                }
                            }
                        }
                        _ => {}
                    }
                    let parent = list_stack.last().copied().unwrap_or(section);
                    tree.attach(parent, block_from(record, BlockKind::ListItem))
                }
                BlockTag::Header => {
                    while parent_stack.len() > 1
                        && tree.block(current(&parent_stack)).level >= record.level
                    {
                        parent_stack.pop();
                    }
                    let id =
                        tree.attach(current(&parent_stack), block_from(record, BlockKind::Section));
                    parent_stack.push(id);
                    id
                }
            };
            prev = node;
        }

        debug!(records = records.len(), nodes = tree.len(), "Layout tree built");
        Ok(tree)
    }
}

fn current(stack: &[BlockId]) -> BlockId {
    stack.last().copied().unwrap_or(BlockId::ROOT)
}

fn block_from(record: &BlockRecord, kind: BlockKind) -> Block {
    let mut block = Block::new(kind, record.level, record.sentences.clone());
    block.page_idx = record.page_idx;
    block.block_idx = record.block_idx;
    block.top = record.top;
    block.left = record.left;
    block.bbox = record.bbox.clone();
    block
}

fn table_from(record: &BlockRecord) -> Result<Table, String> {
    let mut table = Table {
        name: record.name.clone().unwrap_or_default(),
        ..Table::default()
    };
    for row in &record.table_rows {
        let parsed = row_from(row)?;
        match row.kind {
            RowKind::TableHeader => table.headers.push(parsed),
            RowKind::DataRow | RowKind::FullRow => table.rows.push(parsed),
        }
    }
    Ok(table)
}

fn row_from(row: &TableRowRecord) -> Result<TableRow, String> {
    if row.kind == RowKind::FullRow {
        let value = row
            .cell_value
            .as_ref()
            .ok_or_else(|| "full_row without cell_value".to_string())?;
        return Ok(TableRow {
            cells: vec![TableCell {
                col_span: row.col_span.unwrap_or(1),
                value: cell_value_from(value),
            }],
        });
    }
    let cells = row
        .cells
        .iter()
        .map(|c| TableCell {
            col_span: c.col_span.unwrap_or(1),
            value: cell_value_from(&c.cell_value),
        })
        .collect();
    Ok(TableRow { cells })
}

fn cell_value_from(value: &CellValueRecord) -> CellValue {
    match value {
        CellValueRecord::Text(s) => CellValue::Text(s.clone()),
        CellValueRecord::Paragraph(p) => CellValue::Paragraph(p.sentences.clone()),
    }
}
