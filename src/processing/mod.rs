pub mod color;
pub mod cpu;
pub mod extents;
pub mod grid;
pub mod pixellation;
pub mod source;
