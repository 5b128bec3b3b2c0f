//! Opcode emission - position-addressed operations to assembler tokens.

use ivy_core::Builtin;
use ivy_parser::ast::Literal;
use lazy_static::lazy_static;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::bytecode::Token;
use crate::ir::{FinalOperation, Instruction};

lazy_static! {
    /// Opcode sequence for each builtin.
    static ref EXPANSIONS: FxHashMap<Builtin, &'static [&'static str]> = {
        let table: [(Builtin, &'static [&'static str]); 22] = [
            (Builtin::Add, &["ADD"]),
            (Builtin::Sub, &["SUB"]),
            (Builtin::Mul, &["MUL"]),
            (Builtin::Div, &["DIV"]),
            (Builtin::Mod, &["MOD"]),
            (Builtin::Lt, &["LESSTHAN"]),
            (Builtin::Gt, &["GREATERTHAN"]),
            (Builtin::Le, &["LESSTHANOREQUAL"]),
            (Builtin::Ge, &["GREATERTHANOREQUAL"]),
            (Builtin::Eq, &["EQUAL"]),
            (Builtin::Ne, &["EQUAL", "NOT"]),
            (Builtin::Not, &["NOT"]),
            (Builtin::Negate, &["NEGATE"]),
            (Builtin::Abs, &["ABS"]),
            (Builtin::Sha256, &["SHA256"]),
            (Builtin::Sha3, &["SHA3"]),
            (Builtin::CheckTxSig, &["ROT", "CHECKSIG"]),
            (Builtin::Size, &["SIZE", "SWAP", "DROP"]),
            (Builtin::Before, &["MAXTIME", "GREATERTHAN"]),
            (Builtin::After, &["MINTIME", "LESSTHAN"]),
            (Builtin::CheckMultiSig, &["CHECKMULTISIG"]),
            (Builtin::TxSigHash, &["TXSIGHASH"]),
        ];
        table.into_iter().collect()
    };
}

fn expansion(instruction: Instruction) -> &'static [&'static str] {
    match instruction {
        Instruction::Builtin(builtin) => EXPANSIONS.get(&builtin).copied().unwrap_or(&[]),
        Instruction::Verify => &["VERIFY"],
        Instruction::CheckOutput => &["CHECKOUTPUT"],
        Instruction::Asset => &["ASSET"],
        Instruction::Amount => &["AMOUNT"],
    }
}

/// Map each operation to its assembler tokens.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn emit(ops: &[FinalOperation]) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(ops.len() * 2);
    for op in ops {
        emit_one(op, &mut tokens);
    }
    debug!(target: "ivy::emit", tokens = tokens.len(), "opcodes emitted");
    tokens
}

fn emit_one(op: &FinalOperation, tokens: &mut Vec<Token>) {
    match op {
        FinalOperation::PushParameter(name) => tokens.push(Token::Parameter(name.clone())),
        FinalOperation::Pick(depth) => {
            tokens.push(Token::Integer(*depth as i64));
            tokens.push(Token::mnemonic("PICK"));
        }
        FinalOperation::Roll(depth) => {
            tokens.push(Token::Integer(*depth as i64));
            tokens.push(Token::mnemonic("ROLL"));
        }
        FinalOperation::Push(Literal::Boolean(true)) => tokens.push(Token::mnemonic("TRUE")),
        FinalOperation::Push(Literal::Boolean(false)) => tokens.push(Token::mnemonic("FALSE")),
        FinalOperation::Push(Literal::Integer(n)) => tokens.push(Token::Integer(*n)),
        FinalOperation::Push(Literal::Bytes(bytes)) => tokens.push(Token::Bytes(bytes.clone())),
        FinalOperation::Instruction(instruction) => {
            tokens.extend(expansion(*instruction).iter().map(|m| Token::mnemonic(*m)));
        }
        FinalOperation::BeginIf { else_tag } => {
            tokens.push(Token::mnemonic("NOT"));
            tokens.push(Token::mnemonic(format!("JUMPIF:{else_tag}")));
        }
        FinalOperation::Else { else_tag, end_tag } => {
            tokens.push(Token::mnemonic(format!("JUMP:{end_tag}")));
            tokens.push(Token::mnemonic(format!("${else_tag}")));
        }
        FinalOperation::EndIf { end_tag } => tokens.push(Token::mnemonic(format!("${end_tag}"))),
        FinalOperation::Drop => tokens.push(Token::mnemonic("DROP")),
    }
}
