//! Builtin operators and functions.

use std::fmt;

/// Every operation a contract expression can call, including operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,

    // Unary
    Not,
    Negate,
    Abs,

    // Functions
    Sha256,
    Sha3,
    CheckTxSig,
    Size,
    Before,
    After,
    CheckMultiSig,

    /// Inserted by desugaring as the implicit last argument of
    /// `checkTxSig`. Not callable from source.
    TxSigHash,
}

impl Builtin {
    /// The name used in source and in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Builtin::Add => "+",
            Builtin::Sub => "-",
            Builtin::Mul => "*",
            Builtin::Div => "/",
            Builtin::Mod => "%",
            Builtin::Lt => "<",
            Builtin::Gt => ">",
            Builtin::Le => "<=",
            Builtin::Ge => ">=",
            Builtin::Eq => "==",
            Builtin::Ne => "!=",
            Builtin::Not => "!",
            Builtin::Negate => "-",
            Builtin::Abs => "abs",
            Builtin::Sha256 => "sha256",
            Builtin::Sha3 => "sha3",
            Builtin::CheckTxSig => "checkTxSig",
            Builtin::Size => "size",
            Builtin::Before => "before",
            Builtin::After => "after",
            Builtin::CheckMultiSig => "checkMultiSig",
            Builtin::TxSigHash => "txSigHash",
        }
    }

    /// Resolve a function-call name written in source.
    pub fn from_function_name(name: &str) -> Option<Builtin> {
        Some(match name {
            "abs" => Builtin::Abs,
            "sha256" => Builtin::Sha256,
            "sha3" => Builtin::Sha3,
            "checkTxSig" => Builtin::CheckTxSig,
            "size" => Builtin::Size,
            "before" => Builtin::Before,
            "after" => Builtin::After,
            "checkMultiSig" => Builtin::CheckMultiSig,
            _ => return None,
        })
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_names_resolve() {
        assert_eq!(Builtin::from_function_name("checkTxSig"), Some(Builtin::CheckTxSig));
        assert_eq!(Builtin::from_function_name("size"), Some(Builtin::Size));
        assert_eq!(Builtin::from_function_name("txSigHash"), None);
        assert_eq!(Builtin::from_function_name("checkTxMultiSig"), None);
    }
}
