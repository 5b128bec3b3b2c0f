//! VM opcode table.

use lazy_static::lazy_static;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashMap;

macro_rules! opcodes {
    ($($variant:ident = $value:literal => $mnemonic:literal,)*) => {
        /// A single-byte VM opcode.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
        #[repr(u8)]
        pub enum OpCode {
            $($variant = $value,)*
        }

        impl OpCode {
            /// Every opcode, in byte order.
            pub const ALL: &'static [OpCode] = &[$(OpCode::$variant,)*];

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(OpCode::$variant => $mnemonic,)*
                }
            }
        }
    };
}

opcodes! {
    False = 0x00 => "FALSE",
    PushData1 = 0x4c => "PUSHDATA1",
    PushData2 = 0x4d => "PUSHDATA2",
    PushData4 = 0x4e => "PUSHDATA4",
    OneNegate = 0x4f => "1NEGATE",
    True = 0x51 => "TRUE",
    Nop = 0x61 => "NOP",
    Jump = 0x63 => "JUMP",
    JumpIf = 0x64 => "JUMPIF",
    Verify = 0x69 => "VERIFY",
    Fail = 0x6a => "FAIL",
    ToAltStack = 0x6b => "TOALTSTACK",
    FromAltStack = 0x6c => "FROMALTSTACK",
    TwoDrop = 0x6d => "2DROP",
    TwoDup = 0x6e => "2DUP",
    ThreeDup = 0x6f => "3DUP",
    TwoOver = 0x70 => "2OVER",
    TwoRot = 0x71 => "2ROT",
    TwoSwap = 0x72 => "2SWAP",
    IfDup = 0x73 => "IFDUP",
    Depth = 0x74 => "DEPTH",
    Drop = 0x75 => "DROP",
    Dup = 0x76 => "DUP",
    Nip = 0x77 => "NIP",
    Over = 0x78 => "OVER",
    Pick = 0x79 => "PICK",
    Roll = 0x7a => "ROLL",
    Rot = 0x7b => "ROT",
    Swap = 0x7c => "SWAP",
    Tuck = 0x7d => "TUCK",
    Cat = 0x7e => "CAT",
    Substr = 0x7f => "SUBSTR",
    Left = 0x80 => "LEFT",
    Right = 0x81 => "RIGHT",
    Size = 0x82 => "SIZE",
    Invert = 0x83 => "INVERT",
    And = 0x84 => "AND",
    Or = 0x85 => "OR",
    Xor = 0x86 => "XOR",
    Equal = 0x87 => "EQUAL",
    EqualVerify = 0x88 => "EQUALVERIFY",
    CatPushData = 0x89 => "CATPUSHDATA",
    OneAdd = 0x8b => "1ADD",
    OneSub = 0x8c => "1SUB",
    TwoMul = 0x8d => "2MUL",
    TwoDiv = 0x8e => "2DIV",
    Negate = 0x8f => "NEGATE",
    Abs = 0x90 => "ABS",
    Not = 0x91 => "NOT",
    ZeroNotEqual = 0x92 => "0NOTEQUAL",
    Add = 0x93 => "ADD",
    Sub = 0x94 => "SUB",
    Mul = 0x95 => "MUL",
    Div = 0x96 => "DIV",
    Mod = 0x97 => "MOD",
    LShift = 0x98 => "LSHIFT",
    RShift = 0x99 => "RSHIFT",
    BoolAnd = 0x9a => "BOOLAND",
    BoolOr = 0x9b => "BOOLOR",
    NumEqual = 0x9c => "NUMEQUAL",
    NumEqualVerify = 0x9d => "NUMEQUALVERIFY",
    NumNotEqual = 0x9e => "NUMNOTEQUAL",
    LessThan = 0x9f => "LESSTHAN",
    GreaterThan = 0xa0 => "GREATERTHAN",
    LessThanOrEqual = 0xa1 => "LESSTHANOREQUAL",
    GreaterThanOrEqual = 0xa2 => "GREATERTHANOREQUAL",
    Min = 0xa3 => "MIN",
    Max = 0xa4 => "MAX",
    Within = 0xa5 => "WITHIN",
    Sha256 = 0xa8 => "SHA256",
    Sha3 = 0xaa => "SHA3",
    CheckSig = 0xac => "CHECKSIG",
    CheckMultiSig = 0xad => "CHECKMULTISIG",
    TxSigHash = 0xae => "TXSIGHASH",
    BlockHash = 0xaf => "BLOCKHASH",
    CheckPredicate = 0xc0 => "CHECKPREDICATE",
    CheckOutput = 0xc1 => "CHECKOUTPUT",
    Asset = 0xc2 => "ASSET",
    Amount = 0xc3 => "AMOUNT",
    Program = 0xc4 => "PROGRAM",
    MinTime = 0xc5 => "MINTIME",
    MaxTime = 0xc6 => "MAXTIME",
    TxData = 0xc7 => "TXDATA",
    EntryData = 0xc8 => "ENTRYDATA",
    Index = 0xc9 => "INDEX",
    EntryId = 0xca => "ENTRYID",
    OutputId = 0xcb => "OUTPUTID",
    Nonce = 0xcc => "NONCE",
    NextProgram = 0xcd => "NEXTPROGRAM",
    BlockTime = 0xce => "BLOCKTIME",
}

/// `OP_2` .. `OP_16` push their small integer directly.
pub const SMALL_INT_BASE: u8 = 0x50;
pub const SMALL_INT_RANGE: std::ops::RangeInclusive<u8> = 0x52..=0x60;

lazy_static! {
    static ref BY_MNEMONIC: FxHashMap<&'static str, OpCode> =
        OpCode::ALL.iter().map(|op| (op.mnemonic(), *op)).collect();
}

impl OpCode {
    pub fn from_mnemonic(mnemonic: &str) -> Option<OpCode> {
        BY_MNEMONIC.get(mnemonic).copied()
    }

    pub fn byte(self) -> u8 {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemonic_lookup_round_trips() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_mnemonic(op.mnemonic()), Some(*op));
        }
    }

    #[test]
    fn byte_values() {
        assert_eq!(OpCode::True.byte(), 0x51);
        assert_eq!(OpCode::Tuck.byte(), 0x7d);
        assert_eq!(OpCode::CheckOutput.byte(), 0xc1);
        assert!(matches!(OpCode::try_from(0xae_u8), Ok(OpCode::TxSigHash)));
        assert!(OpCode::try_from(0x55_u8).is_err());
    }

    #[test]
    fn table_is_sorted_and_unique() {
        assert!(OpCode::ALL.windows(2).all(|w| w[0].byte() < w[1].byte()));
    }
}
