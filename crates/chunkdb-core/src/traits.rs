use crate::error::Result;

/// Turns text into a fixed-size vector.
///
/// Implementations must be deterministic: the same text always yields the same
/// vector. A text that cannot be vectorized is reported as
/// [`Error::EmbeddingFailure`](crate::error::Error::EmbeddingFailure).
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Stable identifier for the embedder and its dimensionality.
    fn id(&self) -> String {
        format!("{}:d{}", std::any::type_name::<Self>(), self.dim())
    }
}

impl<E: Embedder + ?Sized> Embedder for Box<E> {
    fn dim(&self) -> usize { (**self).dim() }
    fn embed(&self, text: &str) -> Result<Vec<f32>> { (**self).embed(text) }
    fn id(&self) -> String { (**self).id() }
}

impl<E: Embedder + ?Sized> Embedder for std::sync::Arc<E> {
    fn dim(&self) -> usize { (**self).dim() }
    fn embed(&self, text: &str) -> Result<Vec<f32>> { (**self).embed(text) }
    fn id(&self) -> String { (**self).id() }
}
