//! Text and HTML rendering of blocks.
//!
//! `include_children` controls whether a block's direct children are
//! rendered; `recurse` is passed down to them as both flags, so
//! `(true, false)` renders one level of children and `(true, true)` the
//! whole subtree.

use super::block::{BlockId, BlockKind, CellValue, LayoutTree, Table, TableCell, TableRow};

impl LayoutTree {
    pub fn to_text(&self, id: BlockId, include_children: bool, recurse: bool) -> String {
        let block = self.block(id);
        match &block.kind {
            BlockKind::Table(table) => table.to_text(),
            BlockKind::Root => {
                if !include_children {
                    return String::new();
                }
                block
                    .children()
                    .iter()
                    .map(|&c| self.to_text(c, recurse, recurse))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            BlockKind::Paragraph | BlockKind::Section | BlockKind::ListItem => {
                let mut text = block.sentences.join("\n");
                if include_children {
                    for &child in block.children() {
                        text.push('\n');
                        text.push_str(&self.to_text(child, recurse, recurse));
                    }
                }
                text
            }
        }
    }

    pub fn to_html(&self, id: BlockId, include_children: bool, recurse: bool) -> String {
        let block = self.block(id);
        let children_html = || -> String {
            block
                .children()
                .iter()
                .map(|&c| self.to_html(c, recurse, recurse))
                .collect()
        };
        let nested = include_children && !block.children().is_empty();

        match &block.kind {
            BlockKind::Table(table) => table.to_html(),
            BlockKind::Root => {
                if include_children {
                    children_html()
                } else {
                    String::new()
                }
            }
            BlockKind::Section => {
                // Parser levels start at 0; HTML headings stop at h6.
                let h = (block.level + 1).clamp(1, 6);
                let mut html = format!("<h{h}>{}</h{h}>", block.title());
                if include_children {
                    html.push_str(&children_html());
                }
                html
            }
            BlockKind::Paragraph | BlockKind::ListItem => {
                let tag = if matches!(block.kind, BlockKind::Paragraph) {
                    "p"
                } else {
                    "li"
                };
                let mut html = format!("<{tag}>{}", block.sentences.join("\n"));
                if nested {
                    html.push_str("<ul>");
                    html.push_str(&children_html());
                    html.push_str("</ul>");
                }
                html.push_str(&format!("</{tag}>"));
                html
            }
        }
    }
}

// ── Tables ──────────────────────────────────────────────────────────────────

impl Table {
    /// Header rows followed by data rows, each terminated by a newline.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for header in &self.headers {
            text.push_str(&header.header_text());
            text.push('\n');
        }
        for row in &self.rows {
            text.push_str(&row.to_text());
            text.push('\n');
        }
        text
    }

    pub fn to_html(&self) -> String {
        let mut html = String::from("<table>");
        for header in &self.headers {
            html.push_str(&format!("<th>{}</th>", header.cells_html()));
        }
        for row in &self.rows {
            html.push_str(&format!("<tr>{}</tr>", row.cells_html()));
        }
        html.push_str("</table>");
        html
    }
}

impl TableRow {
    /// ` | cell` for every cell.
    pub fn to_text(&self) -> String {
        self.cells
            .iter()
            .map(|c| format!(" | {}", c.value.text()))
            .collect()
    }

    /// Row text plus a markdown-style separator line.
    pub fn header_text(&self) -> String {
        let mut text = self.to_text();
        text.push('\n');
        for _ in &self.cells {
            text.push_str(" | ---");
        }
        text
    }

    fn cells_html(&self) -> String {
        self.cells.iter().map(TableCell::to_html).collect()
    }
}

impl TableCell {
    pub fn to_html(&self) -> String {
        let body = match &self.value {
            CellValue::Text(s) => s.clone(),
            CellValue::Paragraph(sentences) => format!("<p>{}</p>", sentences.join("\n")),
        };
        if self.col_span > 1 {
            format!("<td colSpan={}>{body}</td>", self.col_span)
        } else {
            format!("<td>{body}</td>")
        }
    }
}
