//! Builtin type signatures.
//!
//! Signatures use single-letter type variables (`A`) that are renamed to
//! fresh variables at every call site.

use ivy_core::{Builtin, HashFunction, OtherType, Primitive, Type};
use lazy_static::lazy_static;
use rustc_hash::FxHashMap;

const INTEGER: Type = Type::INTEGER;
const BOOLEAN: Type = Type::BOOLEAN;

/// Argument and result types of a builtin.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature {
    pub inputs: Vec<Type>,
    pub output: Type,
}

impl Signature {
    fn new(inputs: impl Into<Vec<Type>>, output: Type) -> Self {
        Self {
            inputs: inputs.into(),
            output,
        }
    }

    /// Names of the signature's own type variables, in first-use order.
    pub fn variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        for ty in self.inputs.iter().chain(std::iter::once(&self.output)) {
            collect_variables(ty, &mut names);
        }
        names
    }
}

fn collect_variables(ty: &Type, names: &mut Vec<String>) {
    match ty {
        Type::Var(name) if !names.contains(name) => names.push(name.clone()),
        Type::Hash { input, .. } => collect_variables(input, names),
        Type::List(element) => collect_variables(element, names),
        _ => {}
    }
}

lazy_static! {
    static ref SIGNATURES: FxHashMap<Builtin, Signature> = {
        let a = || Type::var("A");
        let mut table = FxHashMap::default();

        for op in [Builtin::Add, Builtin::Sub, Builtin::Mul, Builtin::Div, Builtin::Mod] {
            table.insert(op, Signature::new([INTEGER, INTEGER], INTEGER));
        }
        for op in [Builtin::Lt, Builtin::Gt, Builtin::Le, Builtin::Ge] {
            table.insert(op, Signature::new([INTEGER, INTEGER], BOOLEAN));
        }
        for op in [Builtin::Eq, Builtin::Ne] {
            table.insert(op, Signature::new([a(), a()], BOOLEAN));
        }
        table.insert(Builtin::Not, Signature::new([BOOLEAN], BOOLEAN));
        table.insert(Builtin::Negate, Signature::new([INTEGER], INTEGER));
        table.insert(Builtin::Abs, Signature::new([INTEGER], INTEGER));
        table.insert(
            Builtin::Sha256,
            Signature::new([a()], Type::hash(HashFunction::Sha256, a())),
        );
        table.insert(
            Builtin::Sha3,
            Signature::new([a()], Type::hash(HashFunction::Sha3, a())),
        );
        table.insert(
            Builtin::CheckTxSig,
            Signature::new(
                [Primitive::PublicKey.into(), Primitive::Signature.into()],
                BOOLEAN,
            ),
        );
        table.insert(
            Builtin::Size,
            Signature::new([Primitive::String.into()], INTEGER),
        );
        table.insert(Builtin::Before, Signature::new([Primitive::Time.into()], BOOLEAN));
        table.insert(Builtin::After, Signature::new([Primitive::Time.into()], BOOLEAN));
        table.insert(
            Builtin::CheckMultiSig,
            Signature::new(
                [
                    Type::list(Primitive::PublicKey.into()),
                    Type::list(Primitive::Signature.into()),
                ],
                BOOLEAN,
            ),
        );
        table.insert(
            Builtin::TxSigHash,
            Signature::new(Vec::new(), Type::Other(OtherType::SigHash)),
        );
        table
    };
}

/// Look up the signature of `builtin`.
pub fn signature(builtin: Builtin) -> &'static Signature {
    // Every builtin is inserted above.
    &SIGNATURES[&builtin]
}
