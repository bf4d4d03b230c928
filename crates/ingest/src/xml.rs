//! Structural chunking of XML documents.
//!
//! Every element becomes one tab-indented line (`tag [k='v', ...]: text`).
//! Lines are packed into chunks of at most `max_tokens` tokens; when a chunk
//! is flushed mid-document, the next one is re-seeded with the ancestor lines
//! of the element that overflowed so each chunk can be read on its own.

use docflow_core::DocflowError;
use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::tokenizer::Tokenizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XmlChunk {
    pub file_name: String,
    /// 1-based position of this chunk.
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub content: String,
}

fn parse(xml: &str) -> Result<Document<'_>, roxmltree::Error> {
    let opts = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Document::parse_with_options(xml, opts)
}

/// Check that `xml` is well-formed and carries content: the root needs child
/// elements or non-blank text.
pub fn validate_xml(xml: &str) -> Result<(), DocflowError> {
    let doc = parse(xml).map_err(|e| DocflowError::StructuralParse(format!("XML syntax error: {e}")))?;
    let root = doc.root_element();
    let has_children = root.children().any(|n| n.is_element());
    let has_text = element_text(root).is_some();
    if !has_children && !has_text {
        return Err(DocflowError::StructuralParse(
            "XML document is empty or contains no meaningful content".to_string(),
        ));
    }
    Ok(())
}

/// Chunk an XML document. Malformed XML is logged and returned as a
/// [`DocflowError::StructuralParse`].
pub fn chunk_xml<T: Tokenizer>(
    xml: &str,
    file_name: &str,
    tokenizer: &T,
    max_tokens: usize,
) -> Result<Vec<XmlChunk>, DocflowError> {
    if max_tokens == 0 {
        return Err(DocflowError::Configuration(
            "max_tokens must be greater than zero".to_string(),
        ));
    }
    let doc = parse(xml).map_err(|e| {
        error!(file = file_name, error = %e, "Failed to parse XML");
        DocflowError::StructuralParse(format!("{file_name}: {e}"))
    })?;

    let mut walker = Walker {
        tokenizer,
        max_tokens,
        current: Vec::new(),
        path: Vec::new(),
        chunks: Vec::new(),
    };
    walker.visit(doc.root_element(), 0);
    walker.flush();

    let total_chunks = walker.chunks.len();
    debug!(file = file_name, chunks = total_chunks, "XML chunked");
    Ok(walker
        .chunks
        .into_iter()
        .enumerate()
        .map(|(i, content)| XmlChunk {
            file_name: file_name.to_string(),
            chunk_index: i + 1,
            total_chunks,
            content,
        })
        .collect())
}

struct Walker<'t, T: Tokenizer> {
    tokenizer: &'t T,
    max_tokens: usize,
    /// Lines of the chunk being built.
    current: Vec<String>,
    /// Ancestor lines (tag and attributes only) of the element being visited.
    path: Vec<String>,
    chunks: Vec<String>,
}

impl<T: Tokenizer> Walker<'_, T> {
    fn visit(&mut self, node: Node<'_, '_>, depth: usize) {
        let line = render_line(node, depth, true);

        if !self.current.is_empty() && self.overflows(&line) {
            self.flush();
            self.current.extend(self.path.iter().cloned());
        }
        self.current.push(line);

        self.path.push(render_line(node, depth, false));
        for child in node.children().filter(|n| n.is_element()) {
            self.visit(child, depth + 1);
        }
        self.path.pop();
    }

    fn overflows(&self, line: &str) -> bool {
        let mut text = self.current.join("\n");
        text.push('\n');
        text.push_str(line);
        self.tokenizer.count(&text) > self.max_tokens
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            self.chunks.push(self.current.join("\n"));
            self.current.clear();
        }
    }
}

/// Text that precedes the first child element, with comments and
/// processing instructions skipped.
fn element_text(node: Node<'_, '_>) -> Option<String> {
    let text: String = node
        .children()
        .take_while(|c| !c.is_element())
        .filter(|c| c.is_text())
        .filter_map(|c| c.text())
        .collect();
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn render_line(node: Node<'_, '_>, depth: usize, with_text: bool) -> String {
    // Local names drop any namespace.
    let mut line = format!("{}{}", "\t".repeat(depth), node.tag_name().name());

    let attrs: Vec<String> = node
        .attributes()
        .map(|a| format!("{}='{}'", a.name(), a.value()))
        .collect();
    if !attrs.is_empty() {
        line.push_str(&format!(" [{}]", attrs.join(", ")));
    }

    if with_text {
        if let Some(text) = element_text(node) {
            line.push_str(": ");
            line.push_str(&text);
        }
    }
    line
}
