//! Identifier space, ring ordering and finger tables.

mod finger_table;
mod id;
mod ring;

pub use finger_table::*;
pub use id::*;
pub use ring::*;
