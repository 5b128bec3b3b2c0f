//! Disassembler - VM bytecode back to readable instructions.

use std::fmt;

use ivy_core::AssemblerError;

use super::opcode::{OpCode, SMALL_INT_BASE, SMALL_INT_RANGE};

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Op(OpCode),
    Push(Vec<u8>),
    /// `OP_2` .. `OP_16`.
    SmallInt(u8),
    Jump { opcode: OpCode, target: u32 },
    /// A byte with no opcode assigned.
    Unknown(u8),
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decoded::Op(op) => f.write_str(op.mnemonic()),
            Decoded::Push(data) => write!(f, "0x{}", hex::encode(data)),
            Decoded::SmallInt(n) => write!(f, "{n}"),
            Decoded::Jump { opcode, target } => write!(f, "{}:{target}", opcode.mnemonic()),
            Decoded::Unknown(byte) => write!(f, "UNKNOWN(0x{byte:02x})"),
        }
    }
}

/// Decode `bytes` into instructions.
pub fn disassemble(bytes: &[u8]) -> Result<Vec<Decoded>, AssemblerError> {
    let mut reader = Reader { bytes, pos: 0 };
    let mut decoded = Vec::new();

    while let Some(byte) = reader.next_byte() {
        let instruction = match byte {
            0x01..=0x4b => Decoded::Push(reader.take(byte as usize)?.to_vec()),
            b if b == OpCode::PushData1.byte() => {
                let len = reader.take(1)?[0] as usize;
                Decoded::Push(reader.take(len)?.to_vec())
            }
            b if b == OpCode::PushData2.byte() => {
                let len = u16::from_le_bytes(reader.array()?) as usize;
                Decoded::Push(reader.take(len)?.to_vec())
            }
            b if b == OpCode::PushData4.byte() => {
                let len = u32::from_le_bytes(reader.array()?) as usize;
                Decoded::Push(reader.take(len)?.to_vec())
            }
            b if SMALL_INT_RANGE.contains(&b) => Decoded::SmallInt(b - SMALL_INT_BASE),
            b if b == OpCode::Jump.byte() || b == OpCode::JumpIf.byte() => {
                let target = u32::from_le_bytes(reader.array()?);
                let opcode = if b == OpCode::Jump.byte() {
                    OpCode::Jump
                } else {
                    OpCode::JumpIf
                };
                Decoded::Jump { opcode, target }
            }
            b => match OpCode::try_from(b) {
                Ok(op) => Decoded::Op(op),
                Err(_) => Decoded::Unknown(b),
            },
        };
        decoded.push(instruction);
    }

    Ok(decoded)
}

/// Space-separated rendering of decoded bytecode.
pub fn render(bytes: &[u8]) -> Result<String, AssemblerError> {
    Ok(disassemble(bytes)?
        .iter()
        .map(Decoded::to_string)
        .collect::<Vec<_>>()
        .join(" "))
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn next_byte(&mut self) -> Option<u8> {
        let byte = self.bytes.get(self.pos).copied()?;
        self.pos += 1;
        Some(byte)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AssemblerError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(AssemblerError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], AssemblerError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }
}
