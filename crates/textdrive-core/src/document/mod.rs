pub mod model;

pub use model::{Document, DocumentSummary, LOADING_NAME, LocalId, SaveState, UNTITLED_PREFIX};
