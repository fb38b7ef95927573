mod conv_block;
mod up;

pub use conv_block::*;
pub use up::*;
