pub mod cmap;

pub use cmap::CMap;
