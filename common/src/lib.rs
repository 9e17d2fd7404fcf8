pub use map_iter::MapIterator;

#[macro_use]
mod macros;

pub mod io;
pub mod map_iter;
pub mod num;
pub mod str;
