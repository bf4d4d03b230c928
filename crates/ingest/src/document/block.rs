//! Block arena for the layout tree.
//!
//! Blocks live in a single `Vec` owned by [`LayoutTree`] and refer to each
//! other by [`BlockId`]. Each block has exactly one parent, assigned once at
//! attach time, and an ordered list of children in document order.

use super::record::{BlockTag, UNSET};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(usize);

impl BlockId {
    pub const ROOT: BlockId = BlockId(0);

    pub fn index(self) -> usize {
        self.0
    }
}

// ── Tables ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    /// Paragraph embedded in a cell; rendered as its sentences joined by newlines.
    Paragraph(Vec<String>),
}

impl CellValue {
    pub fn text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Paragraph(sentences) => sentences.join("\n"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub col_span: u32,
    pub value: CellValue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub name: String,
    pub headers: Vec<TableRow>,
    pub rows: Vec<TableRow>,
}

// ── Blocks ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    Root,
    Paragraph,
    Section,
    ListItem,
    Table(Table),
}

impl BlockKind {
    /// Source tag, `None` for the synthetic root.
    pub fn tag(&self) -> Option<BlockTag> {
        match self {
            BlockKind::Root => None,
            BlockKind::Paragraph => Some(BlockTag::Para),
            BlockKind::Section => Some(BlockTag::Header),
            BlockKind::ListItem => Some(BlockTag::ListItem),
            BlockKind::Table(_) => Some(BlockTag::Table),
        }
    }

    pub fn name(&self) -> &'static str {
        self.tag().map(|t| t.as_str()).unwrap_or("root")
    }

    /// Paragraphs, list items and tables are collected as whole units:
    /// traversal never descends into them.
    pub fn is_leaf_unit(&self) -> bool {
        matches!(
            self,
            BlockKind::Paragraph | BlockKind::ListItem | BlockKind::Table(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub level: i32,
    pub page_idx: i32,
    pub block_idx: i64,
    pub top: f64,
    pub left: f64,
    pub bbox: Vec<f64>,
    pub sentences: Vec<String>,
    parent: Option<BlockId>,
    children: Vec<BlockId>,
}

impl Block {
    pub fn new(kind: BlockKind, level: i32, sentences: Vec<String>) -> Self {
        Self {
            kind,
            level,
            page_idx: UNSET,
            block_idx: UNSET as i64,
            top: UNSET as f64,
            left: UNSET as f64,
            bbox: Vec::new(),
            sentences,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<BlockId> {
        self.parent
    }

    pub fn children(&self) -> &[BlockId] {
        &self.children
    }

    pub fn is_section(&self) -> bool {
        matches!(self.kind, BlockKind::Section)
    }

    /// Section title: the header's sentences joined by newlines.
    pub fn title(&self) -> String {
        self.sentences.join("\n")
    }
}

// ── Tree ────────────────────────────────────────────────────────────────────

/// Rooted tree of blocks. Index 0 is always the synthetic root.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTree {
    blocks: Vec<Block>,
}

impl LayoutTree {
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::new(BlockKind::Root, UNSET, Vec::new())],
        }
    }

    pub fn root(&self) -> BlockId {
        BlockId::ROOT
    }

    /// Ids are only minted by this tree, so indexing cannot go out of bounds.
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0]
    }

    pub fn get(&self, id: BlockId) -> Option<&Block> {
        self.blocks.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.len() <= 1
    }

    pub fn children(&self, id: BlockId) -> &[BlockId] {
        &self.blocks[id.0].children
    }

    pub fn parent(&self, id: BlockId) -> Option<BlockId> {
        self.blocks[id.0].parent
    }

    /// Add `block` as the last child of `parent`.
    pub fn attach(&mut self, parent: BlockId, mut block: Block) -> BlockId {
        let id = BlockId(self.blocks.len());
        block.parent = Some(parent);
        self.blocks.push(block);
        self.blocks[parent.0].children.push(id);
        id
    }

    /// Parent chain of `id`, nearest first, excluding the root.
    pub fn ancestors(&self, id: BlockId) -> Vec<BlockId> {
        let mut chain = Vec::new();
        let mut cursor = self.parent(id);
        while let Some(p) = cursor {
            if p == BlockId::ROOT {
                break;
            }
            chain.push(p);
            cursor = self.parent(p);
        }
        chain
    }

    /// All block ids in pre-order, root first.
    pub fn ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        PreOrder {
            tree: self,
            stack: vec![BlockId::ROOT],
            descend: |_: &Block| true,
        }
    }

    /// Pre-order walk below `from` that does not descend into leaf units.
    pub(crate) fn structural_walk(&self, from: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        PreOrder {
            tree: self,
            stack: self.children(from).iter().rev().copied().collect(),
            descend: |b: &Block| !b.kind.is_leaf_unit(),
        }
    }

    /// Indented one-line-per-block dump, for debugging parser output.
    pub fn debug_outline(&self) -> String {
        let mut out = String::new();
        self.outline_into(BlockId::ROOT, 0, &mut out);
        out
    }

    fn outline_into(&self, id: BlockId, depth: usize, out: &mut String) {
        let block = self.block(id);
        let first = block
            .sentences
            .first()
            .map(|s| truncate(s, 60))
            .unwrap_or_default();
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!(
            "{} level={} page={}",
            block.kind.name(),
            block.level,
            block.page_idx
        ));
        if !block.children.is_empty() {
            out.push_str(&format!(" children={}", block.children.len()));
        }
        if let BlockKind::Table(table) = &block.kind {
            out.push_str(&format!(" rows={}", table.headers.len() + table.rows.len()));
        }
        if !first.is_empty() {
            out.push_str(&format!(" \"{first}\""));
        }
        out.push('\n');
        for &child in block.children() {
            self.outline_into(child, depth + 1, out);
        }
    }
}

impl Default for LayoutTree {
    fn default() -> Self {
        Self::new()
    }
}

struct PreOrder<'a, F> {
    tree: &'a LayoutTree,
    stack: Vec<BlockId>,
    descend: F,
}

impl<F: Fn(&Block) -> bool> Iterator for PreOrder<'_, F> {
    type Item = BlockId;

    fn next(&mut self) -> Option<BlockId> {
        let id = self.stack.pop()?;
        let block = self.tree.block(id);
        if (self.descend)(block) {
            self.stack.extend(block.children().iter().rev().copied());
        }
        Some(id)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
