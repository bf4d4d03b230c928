//! Tests for the layout tree builder and document facade.

use docflow_core::DocflowError;

use super::record::{BlockRecord, BlockTag};
use super::{parse_block_json, BlockId, BlockKind, Document};

fn header(level: i32, text: &str) -> BlockRecord {
    BlockRecord::new(BlockTag::Header, level, vec![text.to_string()])
}

fn para(level: i32, text: &str) -> BlockRecord {
    BlockRecord::new(BlockTag::Para, level, vec![text.to_string()])
}

fn item(level: i32, text: &str) -> BlockRecord {
    BlockRecord::new(BlockTag::ListItem, level, vec![text.to_string()])
}

fn first_sentence(doc: &Document, id: BlockId) -> &str {
    doc.block(id).sentences.first().map(String::as_str).unwrap_or("")
}

fn child_texts(doc: &Document, id: BlockId) -> Vec<&str> {
    doc.tree()
        .children(id)
        .iter()
        .map(|&c| first_sentence(doc, c))
        .collect()
}

fn find(doc: &Document, text: &str) -> BlockId {
    doc.tree()
        .ids()
        .find(|&id| first_sentence(doc, id) == text)
        .unwrap()
}

fn nested_doc() -> Document {
    Document::from_records(&[
        header(0, "A"),
        para(0, "p1"),
        header(1, "A.1"),
        para(0, "p2"),
    ])
    .unwrap()
}

// ── Nesting ─────────────────────────────────────────────────────────

#[test]
fn sections_nest_by_level() {
    let doc = nested_doc();
    let root = doc.tree().root();
    assert_eq!(child_texts(&doc, root), vec!["A"]);

    let a = find(&doc, "A");
    assert_eq!(child_texts(&doc, a), vec!["p1", "A.1"]);
    let a1 = find(&doc, "A.1");
    assert_eq!(child_texts(&doc, a1), vec!["p2"]);

    let tops: Vec<&str> = doc
        .top_sections()
        .iter()
        .map(|&id| first_sentence(&doc, id))
        .collect();
    assert_eq!(tops, vec!["A"]);
    assert_eq!(doc.sections().len(), 2);
}

#[test]
fn equal_level_headers_are_siblings() {
    let doc = Document::from_records(&[header(1, "A"), para(0, "x"), header(1, "B")]).unwrap();
    let root = doc.tree().root();
    assert_eq!(child_texts(&doc, root), vec!["A", "B"]);
    assert_eq!(doc.top_sections().len(), 2);
}

#[test]
fn shallower_header_attaches_to_nearest_lower_level() {
    let doc = Document::from_records(&[header(0, "A"), header(2, "B"), header(1, "C")]).unwrap();
    let a = find(&doc, "A");
    assert_eq!(child_texts(&doc, a), vec!["B", "C"]);
    for id in doc.sections() {
        if let Some(p) = doc.tree().parent(id) {
            let parent = doc.block(p);
            if parent.is_section() {
                assert!(parent.level < doc.block(id).level);
            }
        }
    }
}

#[test]
fn every_block_has_one_parent() {
    let doc = nested_doc();
    let non_root: Vec<BlockId> = doc.tree().ids().skip(1).collect();
    assert_eq!(non_root.len(), 4);
    for id in non_root {
        let parent = doc.tree().parent(id).unwrap();
        let occurrences = doc
            .tree()
            .ids()
            .filter(|&p| doc.tree().children(p).contains(&id))
            .count();
        assert_eq!(occurrences, 1);
        assert!(doc.tree().children(parent).contains(&id));
    }
}

// ── Lists ───────────────────────────────────────────────────────────

#[test]
fn list_dedent_returns_to_sibling() {
    let doc = Document::from_records(&[item(0, "a"), item(1, "a.1"), item(0, "b")]).unwrap();
    let root = doc.tree().root();
    assert_eq!(child_texts(&doc, root), vec!["a", "b"]);
    let a = find(&doc, "a");
    assert_eq!(child_texts(&doc, a), vec!["a.1"]);
    assert!(doc.tree().children(find(&doc, "b")).is_empty());
}

#[test]
fn list_items_nest_under_intro_paragraph() {
    let doc = Document::from_records(&[
        header(0, "Terms"),
        para(2, "The following apply:"),
        item(2, "one"),
        item(2, "two"),
    ])
    .unwrap();
    let intro = find(&doc, "The following apply:");
    assert_eq!(child_texts(&doc, intro), vec!["one", "two"]);
}

#[test]
fn paragraph_at_other_level_does_not_adopt_items() {
    let doc = Document::from_records(&[header(0, "S"), para(0, "text"), item(1, "x")]).unwrap();
    let s = find(&doc, "S");
    assert_eq!(child_texts(&doc, s), vec!["text", "x"]);
}

#[test]
fn list_context_resets_after_other_blocks() {
    let doc = Document::from_records(&[
        item(0, "a"),
        item(1, "b"),
        para(0, "break"),
        item(1, "c"),
    ])
    .unwrap();
    let root = doc.tree().root();
    assert_eq!(child_texts(&doc, root), vec!["a", "break", "c"]);
}

// ── Facade ──────────────────────────────────────────────────────────

#[test]
fn collectors_do_not_descend_into_units() {
    let doc = Document::from_records(&[
        header(0, "S"),
        para(1, "intro"),
        item(1, "first"),
        item(1, "second"),
        para(0, "after"),
    ])
    .unwrap();
    let chunk_texts: Vec<&str> = doc
        .chunks()
        .iter()
        .map(|&id| first_sentence(&doc, id))
        .collect();
    assert_eq!(chunk_texts, vec!["intro", "after"]);
    assert_eq!(doc.paragraphs().len(), 2);
    assert!(doc.tables().is_empty());
}

#[test]
fn text_renders_top_sections_once() {
    let doc = nested_doc();
    assert_eq!(doc.to_text(false), "A\np1\nA.1\np2\n");
    assert_eq!(doc.to_text(true), "A\np1\nA.1\np2\nA.1\np2\n");
}

#[test]
fn include_children_without_recurse_renders_one_level() {
    let doc = nested_doc();
    let a = find(&doc, "A");
    assert_eq!(doc.tree().to_text(a, false, false), "A");
    assert_eq!(doc.tree().to_text(a, true, false), "A\np1\nA.1");
    assert_eq!(doc.tree().to_text(a, true, true), "A\np1\nA.1\np2");
}

#[test]
fn html_uses_heading_levels() {
    let doc = nested_doc();
    assert_eq!(
        doc.to_html(false),
        "<html><h1>A</h1><p>p1</p><h2>A.1</h2><p>p2</p></html>"
    );
}

#[test]
fn html_nests_list_items_in_paragraph() {
    let doc = Document::from_records(&[para(0, "Steps:"), item(0, "mix"), item(0, "bake")]).unwrap();
    let intro = find(&doc, "Steps:");
    assert_eq!(
        doc.tree().to_html(intro, true, true),
        "<p>Steps:<ul><li>mix</li><li>bake</li></ul></p>"
    );
    assert_eq!(doc.tree().to_html(intro, false, false), "<p>Steps:</p>");
}

#[test]
fn context_text_carries_breadcrumb() {
    let doc = nested_doc();
    let p2 = find(&doc, "p2");
    assert_eq!(doc.context_text(p2), "A > A.1\np2");
}

#[test]
fn debug_outline_lists_every_block() {
    let doc = nested_doc();
    let outline = doc.debug_outline();
    assert_eq!(outline.lines().count(), 5);
    assert!(outline.starts_with("root"));
    assert!(outline.contains("  header level=0"));
    assert!(outline.lines().next().unwrap().contains("children="));
}

// ── Tables ──────────────────────────────────────────────────────────

const TABLE_JSON: &str = r#"[
    {"tag": "header", "level": 0, "page_idx": 0, "sentences": ["Prices"]},
    {"tag": "table", "level": 0, "page_idx": 1, "name": "Menu", "table_rows": [
        {"type": "table_header", "cells": [{"cell_value": "Item"}, {"cell_value": "Cost", "col_span": 2}]},
        {"type": "table_data_row", "cells": [{"cell_value": "Tea"}, {"cell_value": {"sentences": ["3", "EUR"]}}]},
        {"type": "full_row", "cell_value": "Prices include tax"}
    ]}
]"#;

#[test]
fn table_renders_markdown_rows() {
    let doc = Document::from_json(TABLE_JSON).unwrap();
    let table = doc.tables()[0];
    assert_eq!(
        doc.tree().to_text(table, false, false),
        " | Item | Cost\n | --- | ---\n | Tea | 3\nEUR\n | Prices include tax\n"
    );
}

#[test]
fn table_renders_html() {
    let doc = Document::from_json(TABLE_JSON).unwrap();
    let table = doc.tables()[0];
    assert_eq!(
        doc.tree().to_html(table, true, true),
        "<table><th><td>Item</td><td colSpan=2>Cost</td></th>\
         <tr><td>Tea</td><td><p>3\nEUR</p></td></tr>\
         <tr><td>Prices include tax</td></tr></table>"
    );
    match &doc.block(table).kind {
        BlockKind::Table(t) => {
            assert_eq!(t.name, "Menu");
            assert_eq!(t.headers.len(), 1);
            assert_eq!(t.rows.len(), 2);
        }
        other => panic!("expected table, got {other:?}"),
    }
}

#[test]
fn full_row_without_value_is_a_parse_error() {
    let json = r#"[{"tag": "table", "table_rows": [{"type": "full_row"}]}]"#;
    let records = parse_block_json(json).unwrap();
    let err = Document::from_records(&records).unwrap_err();
    assert!(matches!(err, DocflowError::StructuralParse(_)));
}
