mod filter;
mod sequence;

pub use filter::{FilterChoice, FilterController};
pub use sequence::SequenceController;
