pub mod csv;
pub mod memory;

pub use self::csv::CsvCache;
pub use memory::MemoryCache;
