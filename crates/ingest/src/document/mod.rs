pub mod block;
pub mod chunker;
pub mod reader;
pub mod record;
mod render;
pub mod tree;
pub mod validate;

use docflow_core::DocflowError;

pub use block::{Block, BlockId, BlockKind, CellValue, LayoutTree, Table, TableCell, TableRow};
pub use reader::LayoutReader;
pub use record::{parse_block_json, BlockRecord, BlockTag};
pub use tree::{DocTree, Node, NodeTag, TreeOptions};
pub use validate::{validate_upload, FileKind, ValidationError};

/// A parsed document: the layout tree plus its cached top-level sections.
#[derive(Debug, Clone)]
pub struct Document {
    tree: LayoutTree,
    top_sections: Vec<BlockId>,
}

impl Document {
    pub fn from_records(records: &[BlockRecord]) -> Result<Self, DocflowError> {
        let tree = LayoutReader::read(records)?;
        Ok(Self::from_tree(tree))
    }

    /// Parse the parser's JSON (envelope or bare block array) and build the tree.
    pub fn from_json(json: &str) -> Result<Self, DocflowError> {
        Self::from_records(&parse_block_json(json)?)
    }

    pub fn from_tree(tree: LayoutTree) -> Self {
        // A section is top-level when no other section contains it. Headers
        // only ever nest under headers, so checking the parent is enough.
        let top_sections = tree
            .structural_walk(tree.root())
            .filter(|&id| {
                tree.block(id).is_section()
                    && tree
                        .parent(id)
                        .map_or(true, |p| !tree.block(p).is_section())
            })
            .collect();
        Self { tree, top_sections }
    }

    pub fn tree(&self) -> &LayoutTree {
        &self.tree
    }

    pub fn block(&self, id: BlockId) -> &Block {
        self.tree.block(id)
    }

    /// Every section in pre-order, nested ones included.
    pub fn sections(&self) -> Vec<BlockId> {
        self.collect(|k| matches!(k, BlockKind::Section))
    }

    pub fn top_sections(&self) -> &[BlockId] {
        &self.top_sections
    }

    /// Paragraphs, list items and tables, each as a whole unit.
    pub fn chunks(&self) -> Vec<BlockId> {
        self.collect(BlockKind::is_leaf_unit)
    }

    pub fn tables(&self) -> Vec<BlockId> {
        self.collect(|k| matches!(k, BlockKind::Table(_)))
    }

    pub fn paragraphs(&self) -> Vec<BlockId> {
        self.collect(|k| matches!(k, BlockKind::Paragraph))
    }

    /// Blocks attached directly to the root, i.e. content before the first header
    /// alongside the top sections themselves.
    pub fn top_level_blocks(&self) -> &[BlockId] {
        self.tree.children(self.tree.root())
    }

    fn collect(&self, pred: impl Fn(&BlockKind) -> bool) -> Vec<BlockId> {
        self.tree
            .structural_walk(self.tree.root())
            .filter(|&id| pred(&self.tree.block(id).kind))
            .collect()
    }

    fn rendered_sections(&self, include_duplicates: bool) -> Vec<BlockId> {
        if include_duplicates {
            self.sections()
        } else {
            self.top_sections.clone()
        }
    }

    /// Whole-document text, one recursively rendered section per line group.
    pub fn to_text(&self, include_duplicates: bool) -> String {
        let mut text = String::new();
        for id in self.rendered_sections(include_duplicates) {
            text.push_str(&self.tree.to_text(id, true, true));
            text.push('\n');
        }
        text
    }

    pub fn to_html(&self, include_duplicates: bool) -> String {
        let mut html = String::from("<html>");
        for id in self.rendered_sections(include_duplicates) {
            html.push_str(&self.tree.to_html(id, true, true));
        }
        html.push_str("</html>");
        html
    }

    /// Block text prefixed with its ancestry: headers joined by `" > "`, then
    /// any enclosing paragraph or list item text.
    pub fn context_text(&self, id: BlockId) -> String {
        let mut ancestors = self.tree.ancestors(id);
        ancestors.reverse();

        let mut headers = Vec::new();
        let mut paras = Vec::new();
        for a in ancestors {
            let block = self.tree.block(a);
            match block.kind {
                BlockKind::Section => headers.push(block.title()),
                BlockKind::Paragraph | BlockKind::ListItem => {
                    paras.push(self.tree.to_text(a, false, false))
                }
                _ => {}
            }
        }

        let mut text = headers.join(" > ");
        if !paras.is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&paras.join("\n"));
        }
        text.push('\n');
        let block = self.tree.block(id);
        if block.kind.is_leaf_unit() {
            text.push_str(&self.tree.to_text(id, true, true));
        } else {
            text.push_str(&self.tree.to_text(id, false, false));
        }
        text
    }

    pub fn debug_outline(&self) -> String {
        self.tree.debug_outline()
    }
}

#[cfg(test)]
mod tests;
