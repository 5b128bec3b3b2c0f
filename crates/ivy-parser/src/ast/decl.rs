//! Declaration nodes: contracts, clauses, parameters and statements.

use ivy_core::{Span, Type};
use rustc_hash::FxHashMap;

use super::expr::{Expression, Variable, qualified_name};

/// A contract as parsed, before any semantic pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RawContract {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub clauses: Vec<Clause>,
    /// Contract-level reference counts, filled in by reference checking.
    pub references: Option<ReferenceCounts>,
    pub span: Span,
}

impl RawContract {
    /// The contract's Value parameter, if it declares one.
    pub fn value_parameter(&self) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.ty.is_value())
    }
}

/// A contract or clause parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: Type,
    /// The declaring clause, for clause parameters.
    pub scope: Option<String>,
    pub span: Span,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type, span: Span) -> Self {
        Self {
            name: name.into(),
            ty,
            scope: None,
            span,
        }
    }

    pub fn slot_key(&self) -> String {
        qualified_name(self.scope.as_deref(), &self.name)
    }
}

/// One unlocking path of a contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub assertions: Vec<Assertion>,
    pub outputs: Vec<Output>,
    pub returned: Option<Return>,
    /// Clause-local reference counts, filled in by reference checking.
    pub references: Option<ReferenceCounts>,
    pub span: Span,
}

/// `verify <expression>`
#[derive(Debug, Clone, PartialEq)]
pub struct Assertion {
    pub expression: Expression,
    pub span: Span,
}

/// `output <program>(<value>)`
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub program: Variable,
    pub value: Variable,
    /// The AssetAmount parameter matched against `value`, set by desugaring
    /// for outputs of clause Values.
    pub asset_amount: Option<Variable>,
    /// Position among the clause's outputs, set by desugaring.
    pub index: Option<usize>,
    pub span: Span,
}

/// `return <value>`
#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    pub value: Variable,
    pub span: Span,
}

/// Number of references to each identifier, keyed by slot key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceCounts {
    counts: FxHashMap<String, u32>,
}

impl ReferenceCounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking `key` with a zero count.
    pub fn declare(&mut self, key: impl Into<String>) {
        self.counts.entry(key.into()).or_insert(0);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.counts.contains_key(key)
    }

    pub fn get(&self, key: &str) -> u32 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn set(&mut self, key: impl Into<String>, count: u32) {
        self.counts.insert(key.into(), count);
    }

    pub fn increment(&mut self, key: &str) {
        *self.counts.entry(key.to_string()).or_insert(0) += 1;
    }

    /// Decrement `key`, returning the count before the decrement.
    pub fn decrement(&mut self, key: &str) -> u32 {
        match self.counts.get_mut(key) {
            Some(count) => {
                let before = *count;
                *count = count.saturating_sub(1);
                before
            }
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }
}
