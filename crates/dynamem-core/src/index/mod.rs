//! Secondary indexes: pointer-only alternate key views over primary storage.

pub mod index_set;
pub mod secondary;

pub use index_set::IndexSet;
pub use secondary::{IndexSlot, SecondaryIndex};
