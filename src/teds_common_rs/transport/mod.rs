pub mod memory_bank;
pub mod writer;

pub use memory_bank::{FileBank, InMemoryBank, MemoryBank};
pub use writer::TedsWriter;
