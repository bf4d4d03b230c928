//! Breadcrumbs, token windows and page arithmetic shared by the packer.

use crate::tokenizer::Tokenizer;

/// Turn a newline-separated prefix into a `" > "` breadcrumb, skipping blank lines.
pub(crate) fn refine_section(prefix: &str) -> String {
    prefix
        .split('\n')
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" > ")
}

/// Cut `text` into windows of `size` tokens whose starts are `size - overlap`
/// tokens apart. The caller guarantees `overlap < size`.
pub(crate) fn simple_chunks<T: Tokenizer>(
    tokenizer: &T,
    text: &str,
    size: usize,
    overlap: usize,
) -> Vec<String> {
    let tokens = tokenizer.encode(text);
    let stride = size - overlap;
    let mut windows = Vec::with_capacity(tokens.len() / stride + 1);
    let mut start = 0;
    while start < tokens.len() {
        let end = (start + size).min(tokens.len());
        windows.push(tokenizer.decode(&tokens[start..end]));
        start += stride;
    }
    windows
}

/// `file.pdf` becomes `"file\n"`; other names are kept whole.
pub(crate) fn file_name_prefix(file_name: Option<&str>) -> String {
    match file_name {
        Some(name) => format!("{}\n", name.strip_suffix(".pdf").unwrap_or(name)),
        None => String::new(),
    }
}

/// 0-based (possibly unset) page index to a 1-based page number.
pub(crate) fn page_number(idx: i32) -> u32 {
    idx.max(0) as u32 + 1
}
