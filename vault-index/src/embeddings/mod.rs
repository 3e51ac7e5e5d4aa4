//! Text embedding providers
//!
//! The indexer and the search engine only see [`EmbeddingProvider`]; the
//! Gemini client is the production implementation.

pub mod gemini;

pub use gemini::GeminiEmbeddingClient;

use crate::error::EmbeddingError;

/// Turns text into fixed-width vectors.
pub trait EmbeddingProvider {
    /// Whether a credential is configured. Callers treat `false` as
    /// "lexical only" rather than as an error.
    fn is_available(&self) -> bool;

    /// Embed one text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Embed several texts in one request. Output order matches input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::EmbeddingProvider;
    use crate::error::EmbeddingError;
    use std::cell::RefCell;

    /// Deterministic provider for tests. Texts containing `fail_on` make the
    /// whole request fail.
    pub struct FakeProvider {
        available: bool,
        embed_fn: Box<dyn Fn(&str) -> Vec<f32>>,
        fail_on: Option<String>,
        pub batch_sizes: RefCell<Vec<usize>>,
    }

    impl FakeProvider {
        pub fn new(embed_fn: impl Fn(&str) -> Vec<f32> + 'static) -> Self {
            Self {
                available: true,
                embed_fn: Box::new(embed_fn),
                fail_on: None,
                batch_sizes: RefCell::new(Vec::new()),
            }
        }

        /// A provider with no credential configured
        pub fn unavailable() -> Self {
            Self {
                available: false,
                ..Self::new(|_| Vec::new())
            }
        }

        pub fn failing_on(mut self, needle: &str) -> Self {
            self.fail_on = Some(needle.to_string());
            self
        }

        fn check(&self, text: &str) -> Result<(), EmbeddingError> {
            if !self.available {
                return Err(EmbeddingError::MissingApiKey);
            }
            match &self.fail_on {
                Some(needle) if text.contains(needle.as_str()) => Err(EmbeddingError::Status {
                    status: 500,
                    body: "internal".to_string(),
                }),
                _ => Ok(()),
            }
        }
    }

    impl EmbeddingProvider for FakeProvider {
        fn is_available(&self) -> bool {
            self.available
        }

        fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            self.check(text)?;
            Ok((self.embed_fn)(text))
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.batch_sizes.borrow_mut().push(texts.len());
            for text in texts {
                self.check(text)?;
            }
            Ok(texts.iter().map(|t| (self.embed_fn)(t)).collect())
        }
    }
}
