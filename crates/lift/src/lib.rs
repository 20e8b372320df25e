//! Rebuilds LuaJIT prototypes into block/warp function definitions.
//!
//! The instruction stream is cut into blocks at jump targets and after
//! jumps, each block's tail is classified into a warp, and the remaining
//! instructions become statements over per-function expression arenas.

mod builder;
mod error;
mod partition;

#[cfg(test)]
mod test_util;

pub use builder::build_function;
pub use error::BuildError;
pub use partition::{block_boundaries, block_ranges};
