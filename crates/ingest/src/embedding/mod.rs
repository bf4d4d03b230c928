pub mod dispatch;
pub mod openai;
pub mod traits;

pub use dispatch::embed_in_order;
pub use openai::OpenAiEmbedder;
pub use traits::{Embedder, EmbeddingError};
