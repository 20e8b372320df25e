//! ljdec: reconstructs LuaJIT 2.0 bytecode dumps into a block/warp AST.
//!
//! The AST keeps LuaJIT's register model: every value lives in a slot and
//! control flow is described by the warp on each block. Structuring into
//! `if`/`while` statements and local naming are left to later passes.

use log::debug;

pub use ljdec_ast as ast;
pub use ljdec_bytecode as bytecode;
pub use ljdec_lift as lift;

use ljdec_ast::func::FunctionDefinition;
use ljdec_bytecode::dump::Dump;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot read bytecode dump: {0}")]
    Read(#[from] ljdec_bytecode::ReadError),
    #[error("cannot reconstruct function: {0}")]
    Build(#[from] ljdec_lift::BuildError),
}

/// Read a dump and reconstruct its main chunk.
pub fn decompile(bytes: &[u8]) -> Result<FunctionDefinition, Error> {
    let dump = ljdec_bytecode::read_dump(bytes)?;
    decompile_dump(&dump)
}

/// Reconstruct the main chunk of an already parsed dump.
pub fn decompile_dump(dump: &Dump) -> Result<FunctionDefinition, Error> {
    debug!(
        "decompiling {}",
        dump.header.chunk_name.as_deref().unwrap_or("<stripped>")
    );
    Ok(ljdec_lift::build_function(&dump.main)?)
}
