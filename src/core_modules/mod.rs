pub mod analyzer;
pub mod differ;
pub mod history;
pub mod merge;
pub mod pixel_buffer;
pub mod utils;
