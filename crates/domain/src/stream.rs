use std::pin::Pin;

/// A boxed async stream, used for streaming tool-call results.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;
