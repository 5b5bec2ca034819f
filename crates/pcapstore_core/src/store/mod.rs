//! Record and replay facades over segment files and the project index.

mod reader;
mod writer;

pub use reader::StoreReader;
pub use writer::StoreWriter;
