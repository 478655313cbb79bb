pub mod file_index;
pub mod params;
pub mod store;

pub use file_index::PersistedFileIndex;
pub use params::SessionParams;
pub use store::{MemorySessionStore, SessionStore};
