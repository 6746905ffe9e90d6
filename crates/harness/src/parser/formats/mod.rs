mod filesize;
mod memory;
mod performance;

pub use filesize::FilesizeParser;
pub use memory::MemoryParser;
pub use performance::PerformanceParser;
