//! In-memory stores for users and playlists

mod memory_store;

pub use memory_store::MemoryStore;
