//! Block and warp AST for LuaJIT functions.
//!
//! A [`func::FunctionDefinition`] holds flat blocks, each ending in exactly
//! one [`block::Warp`]. Structuring passes turn warps into `if`/`while`/`for`
//! syntax later.

pub mod arena;
pub mod block;
pub mod cfg;
pub mod expr;
pub mod func;
pub mod stmt;
pub mod types;
