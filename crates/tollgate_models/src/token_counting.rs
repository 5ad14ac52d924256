//! Token counting and text segmentation.

use std::sync::Arc;
use tollgate_error::TokenizerError;
use tracing::{debug, instrument};

/// Input limit of the OpenAI embedding models, in tokens.
pub const MAX_SEGMENT_TOKENS: usize = 8191;

/// BPE token counter using the `cl100k_base` encoding shared by the GPT-4
/// and `text-embedding-3` families.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<tiktoken_rs::CoreBPE>,
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("encoding", &"cl100k_base")
            .finish()
    }
}

impl TokenCounter {
    /// Loads the `cl100k_base` encoding.
    ///
    /// # Errors
    ///
    /// Returns error if the encoding tables cannot be loaded.
    pub fn cl100k() -> Result<Self, TokenizerError> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| TokenizerError::new(format!("Failed to load tokenizer: {}", e)))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    /// Number of tokens in `text`.
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    /// Splits `text` into consecutive pieces of at most `max_tokens` tokens.
    ///
    /// Segment `i` covers tokens `i * max_tokens ..`, except that a boundary
    /// falling inside a multi-byte character moves back to the previous
    /// token. Empty text yields no segments.
    ///
    /// # Errors
    ///
    /// Returns error if `max_tokens` is zero or a segment cannot be decoded.
    #[instrument(skip(self, text), fields(text_len = text.len()))]
    pub fn segment(&self, text: &str, max_tokens: usize) -> Result<Vec<String>, TokenizerError> {
        if max_tokens == 0 {
            return Err(TokenizerError::new("Segment size must be at least one token"));
        }

        let tokens = self.bpe.encode_with_special_tokens(text);
        let mut segments = Vec::with_capacity(tokens.len().div_ceil(max_tokens));
        let mut start = 0;
        while start < tokens.len() {
            let mut end = (start + max_tokens).min(tokens.len());
            let segment = loop {
                match self.bpe.decode(tokens[start..end].to_vec()) {
                    Ok(segment) => break segment,
                    Err(_) if end > start + 1 => end -= 1,
                    Err(e) => {
                        return Err(TokenizerError::new(format!(
                            "Failed to decode tokens {}..{}: {}",
                            start, end, e
                        )));
                    }
                }
            };
            segments.push(segment);
            start = end;
        }

        debug!(
            tokens = tokens.len(),
            segments = segments.len(),
            "Segmented text"
        );
        Ok(segments)
    }
}
