//! Tokenizer capability consumed by the token tree, the chunking engine and
//! the XML chunker.
//!
//! Chunk budgets are expressed in tokens of whatever tokenizer the caller
//! injects. `decode(encode(x))` does not have to reproduce `x` byte for byte,
//! but windows cut from `encode(x)` must decode to text whose own token count
//! stays within the window size.

/// Deterministic encode/decode pair.
pub trait Tokenizer: Send + Sync {
    type Token: Clone + Send + Sync;

    fn encode(&self, text: &str) -> Vec<Self::Token>;

    fn decode(&self, tokens: &[Self::Token]) -> String;

    /// Number of tokens in `text`.
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    type Token = T::Token;

    fn encode(&self, text: &str) -> Vec<Self::Token> {
        (**self).encode(text)
    }

    fn decode(&self, tokens: &[Self::Token]) -> String {
        (**self).decode(tokens)
    }

    fn count(&self, text: &str) -> usize {
        (**self).count(text)
    }
}

/// Splits on a fixed delimiter (a single space by default).
///
/// Empty pieces count as tokens, exactly like `str::split`, so `"a  b"` is
/// three tokens. Newlines are not delimiters.
#[derive(Debug, Clone)]
pub struct DelimiterTokenizer {
    delimiter: String,
}

impl DelimiterTokenizer {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
        }
    }
}

impl Default for DelimiterTokenizer {
    fn default() -> Self {
        Self::new(" ")
    }
}

impl Tokenizer for DelimiterTokenizer {
    type Token = String;

    fn encode(&self, text: &str) -> Vec<String> {
        text.split(self.delimiter.as_str()).map(str::to_string).collect()
    }

    fn decode(&self, tokens: &[String]) -> String {
        tokens.join(&self.delimiter)
    }

    fn count(&self, text: &str) -> usize {
        text.split(self.delimiter.as_str()).count()
    }
}

/// BPE tokenizer (`cl100k_base`, the encoding used by OpenAI embedding models).
#[cfg(feature = "tiktoken")]
pub struct TiktokenTokenizer {
    bpe: tiktoken_rs::CoreBPE,
}

#[cfg(feature = "tiktoken")]
impl TiktokenTokenizer {
    pub fn cl100k() -> Result<Self, docflow_core::DocflowError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| docflow_core::DocflowError::Configuration(format!("tiktoken: {e}")))?;
        Ok(Self { bpe })
    }
}

#[cfg(feature = "tiktoken")]
impl Tokenizer for TiktokenTokenizer {
    type Token = tiktoken_rs::Rank;

    fn encode(&self, text: &str) -> Vec<Self::Token> {
        self.bpe.encode_with_special_tokens(text)
    }

    fn decode(&self, tokens: &[Self::Token]) -> String {
        match self.bpe.decode(tokens.to_vec()) {
            Ok(text) => text,
            // A window edge can cut a multi-byte character in half; keep what
            // decodes cleanly token by token.
            Err(_) => tokens
                .iter()
                .filter_map(|t| self.bpe.decode(vec![*t]).ok())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_round_trip() {
        let tok = DelimiterTokenizer::default();
        let tokens = tok.encode("alpha beta gamma");
        assert_eq!(tokens, vec!["alpha", "beta", "gamma"]);
        assert_eq!(tok.decode(&tokens), "alpha beta gamma");
    }

    #[test]
    fn delimiter_counts_like_split() {
        let tok = DelimiterTokenizer::default();
        assert_eq!(tok.count("a  b"), 3);
        assert_eq!(tok.count(""), 1);
        assert_eq!(tok.count("line one\nline two"), 3);
        assert_eq!(tok.count("x y z"), tok.encode("x y z").len());
    }

    #[test]
    fn custom_delimiter() {
        let tok = DelimiterTokenizer::new("\n");
        assert_eq!(tok.count("a b\nc"), 2);
        assert_eq!(tok.decode(&tok.encode("a b\nc")), "a b\nc");
    }

    #[test]
    fn borrowed_tokenizer_delegates() {
        let tok = DelimiterTokenizer::default();
        let by_ref = &tok;
        assert_eq!(Tokenizer::count(&by_ref, "one two"), 2);
    }
}
