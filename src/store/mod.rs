pub mod backend;
pub mod memory;

pub use backend::{Modify, Store, StoreError};
pub use memory::MemoryStore;
