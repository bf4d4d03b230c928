use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use super::traits::{Embedder, EmbeddingError};

/// Embed every text with at most `concurrency` calls in flight.
///
/// Results come back in input order regardless of completion order. The
/// first failure stops dispatching further texts and is returned as is.
pub async fn embed_in_order<E>(
    embedder: &E,
    texts: &[String],
    concurrency: usize,
) -> Result<Vec<Vec<f32>>, EmbeddingError>
where
    E: Embedder + ?Sized,
{
    let concurrency = concurrency.max(1);
    debug!(texts = texts.len(), concurrency, "Dispatching embeddings");

    stream::iter(texts.iter().enumerate())
        .map(|(index, text)| async move {
            let vector = embedder.embed(text).await?;
            if vector.len() != embedder.dimensions() {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: embedder.dimensions(),
                    actual: vector.len(),
                });
            }
            debug!(index, "Embedded chunk");
            Ok(vector)
        })
        .buffered(concurrency)
        .try_collect()
        .await
}
