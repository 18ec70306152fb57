pub mod reader;
pub mod string;

pub use reader::BitReader;
pub use string::{BitString, CELL_MAX_BITS};
