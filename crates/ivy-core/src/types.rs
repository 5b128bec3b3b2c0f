//! The Ivy type model.
//!
//! Types are either concrete ([`Primitive`], [`Type::Hash`], [`Type::List`],
//! [`OtherType`]) or type variables introduced by the type checker. The
//! parser produces [`Type::Generic`] for parameters declared with a
//! type-class name; inference replaces those before any other pass runs.

use std::fmt;

use bitflags::bitflags;

/// Primitive types that may appear as contract or clause parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Integer,
    Boolean,
    String,
    PublicKey,
    Signature,
    Time,
    Program,
    Asset,
    Amount,
    AssetAmount,
}

impl Primitive {
    pub const ALL: [Primitive; 10] = [
        Primitive::Integer,
        Primitive::Boolean,
        Primitive::String,
        Primitive::PublicKey,
        Primitive::Signature,
        Primitive::Time,
        Primitive::Program,
        Primitive::Asset,
        Primitive::Amount,
        Primitive::AssetAmount,
    ];

    /// The name of this type as written in contract source.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::Integer => "Integer",
            Primitive::Boolean => "Boolean",
            Primitive::String => "String",
            Primitive::PublicKey => "PublicKey",
            Primitive::Signature => "Signature",
            Primitive::Time => "Time",
            Primitive::Program => "Program",
            Primitive::Asset => "Asset",
            Primitive::Amount => "Amount",
            Primitive::AssetAmount => "AssetAmount",
        }
    }

    /// Look up a primitive by source name.
    pub fn from_name(name: &str) -> Option<Primitive> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Hash functions available to contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HashFunction {
    Sha256,
    Sha3,
}

impl HashFunction {
    pub fn name(self) -> &'static str {
        match self {
            HashFunction::Sha256 => "Sha256",
            HashFunction::Sha3 => "Sha3",
        }
    }

    pub fn from_name(name: &str) -> Option<HashFunction> {
        match name {
            "Sha256" => Some(HashFunction::Sha256),
            "Sha3" => Some(HashFunction::Sha3),
            _ => None,
        }
    }
}

/// Types that exist only during checking and never reach the stack as
/// ordinary parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtherType {
    /// The opaque locked value.
    Value,
    /// The result of an `output` statement.
    Contract,
    /// The implicit transaction signature hash.
    SigHash,
}

impl OtherType {
    pub fn name(self) -> &'static str {
        match self {
            OtherType::Value => "Value",
            OtherType::Contract => "Contract",
            OtherType::SigHash => "SigHash",
        }
    }
}

bitflags! {
    /// A set of type categories, used for type-class constraints.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TypeClass: u8 {
        const PRIMITIVE = 0b0001;
        const HASH = 0b0010;
        const LIST = 0b0100;
        const OTHER = 0b1000;
        /// Anything that can be fed to a hash function.
        const HASHABLE = Self::PRIMITIVE.bits() | Self::HASH.bits();
    }
}

impl TypeClass {
    /// Look up a type class by source name.
    pub fn from_source_name(name: &str) -> Option<TypeClass> {
        match name {
            "Hashable" => Some(TypeClass::HASHABLE),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        if self == TypeClass::HASHABLE {
            "Hashable"
        } else if self == TypeClass::PRIMITIVE {
            "Primitive"
        } else if self == TypeClass::HASH {
            "Hash"
        } else if self == TypeClass::LIST {
            "List"
        } else if self == TypeClass::OTHER {
            "Other"
        } else {
            "TypeClass"
        }
    }
}

/// An Ivy type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(Primitive),
    /// A type variable, named `T1`, `T2`, ... by the type checker or by
    /// a single letter in builtin signatures.
    Var(String),
    Hash {
        function: HashFunction,
        input: Box<Type>,
    },
    List(Box<Type>),
    Other(OtherType),
    /// A parameter declared with a type-class name. Parser output only.
    Generic(TypeClass),
}

impl Type {
    pub const INTEGER: Type = Type::Primitive(Primitive::Integer);
    pub const BOOLEAN: Type = Type::Primitive(Primitive::Boolean);
    pub const VALUE: Type = Type::Other(OtherType::Value);

    pub fn var(name: impl Into<String>) -> Type {
        Type::Var(name.into())
    }

    pub fn hash(function: HashFunction, input: Type) -> Type {
        Type::Hash {
            function,
            input: Box::new(input),
        }
    }

    pub fn list(element: Type) -> Type {
        Type::List(Box::new(element))
    }

    /// Resolve a bare type name from source: a primitive, `Value`, or a
    /// type class.
    pub fn from_name(name: &str) -> Option<Type> {
        if let Some(p) = Primitive::from_name(name) {
            return Some(Type::Primitive(p));
        }
        if name == "Value" {
            return Some(Type::VALUE);
        }
        TypeClass::from_source_name(name).map(Type::Generic)
    }

    /// The category of a concrete type. Variables and generics have none.
    pub fn class(&self) -> Option<TypeClass> {
        match self {
            Type::Primitive(_) => Some(TypeClass::PRIMITIVE),
            Type::Hash { .. } => Some(TypeClass::HASH),
            Type::List(_) => Some(TypeClass::LIST),
            Type::Other(_) => Some(TypeClass::OTHER),
            Type::Var(_) | Type::Generic(_) => None,
        }
    }

    pub fn is_primitive(&self, primitive: Primitive) -> bool {
        matches!(self, Type::Primitive(p) if *p == primitive)
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Type::Other(OtherType::Value))
    }

    pub fn is_asset_amount(&self) -> bool {
        self.is_primitive(Primitive::AssetAmount)
    }

    /// Whether the variable `name` appears anywhere inside this type.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Type::Var(v) => v == name,
            Type::Hash { input, .. } => input.mentions(name),
            Type::List(element) => element.mentions(name),
            Type::Primitive(_) | Type::Other(_) | Type::Generic(_) => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Primitive(p) => write!(f, "{}", p.name()),
            Type::Var(name) => write!(f, "{name}"),
            Type::Hash { function, input } => write!(f, "{}({input})", function.name()),
            Type::List(element) => write!(f, "List<{element}>"),
            Type::Other(other) => write!(f, "{}", other.name()),
            Type::Generic(class) => write!(f, "{}", class.name()),
        }
    }
}

impl From<Primitive> for Type {
    fn from(p: Primitive) -> Self {
        Type::Primitive(p)
    }
}
