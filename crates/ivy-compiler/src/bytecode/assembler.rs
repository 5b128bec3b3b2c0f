//! Assembler - token stream to VM bytecode.
//!
//! Word forms accepted in mnemonic tokens:
//!
//! | Word        | Output                                             |
//! |-------------|----------------------------------------------------|
//! | `$tag`      | nothing; defines label `tag` at the current offset |
//! | `JUMP:tag`  | `JUMP` + 4-byte little-endian offset of `tag`      |
//! | `JUMPIF:tag`| `JUMPIF` + 4-byte little-endian offset of `tag`    |
//! | `0x..`      | the decoded bytes, raw                             |
//! | numeral     | a data push of the number                          |
//! | mnemonic    | the opcode byte                                    |

use ivy_core::AssemblerError;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::opcode::OpCode;
use super::token::Token;

const JUMP_PREFIX: &str = "JUMP:";
const JUMPIF_PREFIX: &str = "JUMPIF:";

/// Largest payload a single push-data opcode can carry directly.
const MAX_DIRECT_PUSH: usize = 75;

/// Assemble a fully instantiated program.
pub fn assemble(tokens: &[Token]) -> Result<Vec<u8>, AssemblerError> {
    Assembler::new().assemble(tokens)
}

/// Assembles token streams. With placeholders enabled, unfilled parameters
/// assemble as `FALSE` so templates can be validated before instantiation.
#[derive(Debug, Default, Clone, Copy)]
pub struct Assembler {
    placeholders: bool,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_placeholders(mut self, placeholders: bool) -> Self {
        self.placeholders = placeholders;
        self
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn assemble(&self, tokens: &[Token]) -> Result<Vec<u8>, AssemblerError> {
        let mut out = Vec::new();
        let mut labels: FxHashMap<&str, usize> = FxHashMap::default();
        let mut relocations: Vec<(usize, &str)> = Vec::new();

        for token in tokens {
            match token {
                Token::Bytes(data) => push_data(&mut out, data)?,
                Token::Integer(n) => push_data(&mut out, &encode_int(*n))?,
                Token::Parameter(name) => {
                    if !self.placeholders {
                        return Err(AssemblerError::UnfilledParameter(name.clone()));
                    }
                    out.push(OpCode::False.byte());
                }
                Token::Mnemonic(word) => {
                    if let Some(label) = word.strip_prefix('$') {
                        if labels.insert(label, out.len()).is_some() {
                            return Err(AssemblerError::DuplicateLabel(label.to_string()));
                        }
                    } else if let Some(label) = word.strip_prefix(JUMPIF_PREFIX) {
                        relocations.push(emit_jump(&mut out, OpCode::JumpIf, label));
                    } else if let Some(label) = word.strip_prefix(JUMP_PREFIX) {
                        relocations.push(emit_jump(&mut out, OpCode::Jump, label));
                    } else if let Some(digits) = word.strip_prefix("0x") {
                        out.extend(decode_hex(word, digits)?);
                    } else if let Ok(n) = word.parse::<i64>() {
                        push_data(&mut out, &encode_int(n))?;
                    } else {
                        let op = OpCode::from_mnemonic(word)
                            .ok_or_else(|| AssemblerError::UnknownMnemonic(word.clone()))?;
                        out.push(op.byte());
                    }
                }
            }
        }

        for (position, label) in &relocations {
            let target = *labels
                .get(label)
                .ok_or_else(|| AssemblerError::UndefinedLabel(label.to_string()))?;
            let target = u32::try_from(target).map_err(|_| AssemblerError::TooLarge(target))?;
            out[*position..*position + 4].copy_from_slice(&target.to_le_bytes());
        }

        debug!(
            target: "ivy::assembler",
            bytes = out.len(),
            labels = labels.len(),
            jumps = relocations.len(),
            "assembled"
        );
        Ok(out)
    }
}

fn emit_jump<'a>(out: &mut Vec<u8>, op: OpCode, label: &'a str) -> (usize, &'a str) {
    out.push(op.byte());
    let position = out.len();
    out.extend_from_slice(&[0; 4]);
    (position, label)
}

fn decode_hex(word: &str, digits: &str) -> Result<Vec<u8>, AssemblerError> {
    hex::decode(digits).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { c, .. } => AssemblerError::InvalidHexDigit {
            literal: word.to_string(),
            ch: c,
        },
        _ => AssemblerError::OddHexLength(word.to_string()),
    })
}

/// Minimal little-endian two's-complement encoding: the eight bytes of `n`
/// with trailing zero bytes removed. Zero encodes as no bytes.
pub fn encode_int(n: i64) -> Vec<u8> {
    let mut bytes = n.to_le_bytes().to_vec();
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    bytes
}

/// Append a data push of `data`, choosing the shortest length prefix.
pub fn push_data(out: &mut Vec<u8>, data: &[u8]) -> Result<(), AssemblerError> {
    let len = data.len();
    match len {
        0 => out.push(OpCode::False.byte()),
        1..=MAX_DIRECT_PUSH => out.push(len as u8),
        _ if len <= u8::MAX as usize => {
            out.push(OpCode::PushData1.byte());
            out.push(len as u8);
        }
        _ if len <= u16::MAX as usize => {
            out.push(OpCode::PushData2.byte());
            out.extend_from_slice(&(len as u16).to_le_bytes());
        }
        _ => {
            let len = u32::try_from(len).map_err(|_| AssemblerError::TooLarge(len))?;
            out.push(OpCode::PushData4.byte());
            out.extend_from_slice(&len.to_le_bytes());
        }
    }
    out.extend_from_slice(data);
    Ok(())
}
