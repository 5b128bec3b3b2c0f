//! VM bytecode: opcodes, assembler tokens, assembly and disassembly.

pub mod assembler;
pub mod disasm;
pub mod opcode;
pub mod token;

pub use assembler::{Assembler, assemble, encode_int, push_data};
pub use disasm::{Decoded, disassemble};
pub use opcode::OpCode;
pub use token::Token;
