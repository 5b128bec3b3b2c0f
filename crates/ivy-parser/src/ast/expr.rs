//! Expression nodes.

use ivy_core::{Builtin, Span};

/// Suffix that reads the asset/amount pair of a Value.
pub const ASSET_AMOUNT_SUFFIX: &str = ".assetAmount";

/// An Ivy expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A builtin operator or function applied to arguments.
    Call(Call),
    /// A reference to a parameter.
    Variable(Variable),
    /// A constant.
    Literal { value: Literal, span: Span },
    /// A list literal, only valid as a `checkMultiSig` argument.
    List { items: Vec<Expression>, span: Span },
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Call(call) => call.span,
            Expression::Variable(var) => var.span,
            Expression::Literal { span, .. } | Expression::List { span, .. } => *span,
        }
    }

    pub fn integer(value: i64, span: Span) -> Self {
        Expression::Literal {
            value: Literal::Integer(value),
            span,
        }
    }

    pub fn boolean(value: bool, span: Span) -> Self {
        Expression::Literal {
            value: Literal::Boolean(value),
            span,
        }
    }

    /// Visit every variable reference in evaluation order.
    pub fn for_each_variable<'a>(&'a self, f: &mut impl FnMut(&'a Variable)) {
        match self {
            Expression::Call(call) => {
                for arg in &call.args {
                    arg.for_each_variable(f);
                }
            }
            Expression::Variable(var) => f(var),
            Expression::List { items, .. } => {
                for item in items {
                    item.for_each_variable(f);
                }
            }
            Expression::Literal { .. } => {}
        }
    }

    /// Visit every variable reference mutably.
    pub fn for_each_variable_mut(&mut self, f: &mut impl FnMut(&mut Variable)) {
        match self {
            Expression::Call(call) => {
                for arg in &mut call.args {
                    arg.for_each_variable_mut(f);
                }
            }
            Expression::Variable(var) => f(var),
            Expression::List { items, .. } => {
                for item in items {
                    item.for_each_variable_mut(f);
                }
            }
            Expression::Literal { .. } => {}
        }
    }
}

/// A builtin call.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub builtin: Builtin,
    pub args: Vec<Expression>,
    pub span: Span,
}

/// A variable reference.
///
/// `name` is the name as written, including an `.assetAmount` suffix, or
/// after desugaring an `.asset`/`.amount` half of a split parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    /// The clause that declares this variable, for clause parameters.
    pub scope: Option<String>,
    pub span: Span,
}

impl Variable {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            scope: None,
            span,
        }
    }

    /// Whether this reference reads `.assetAmount` from a Value.
    pub fn is_asset_amount(&self) -> bool {
        self.name.ends_with(ASSET_AMOUNT_SUFFIX)
    }

    /// The referenced identifier without an `.assetAmount` suffix.
    pub fn base_name(&self) -> &str {
        self.name
            .strip_suffix(ASSET_AMOUNT_SUFFIX)
            .unwrap_or(&self.name)
    }

    /// Key under which this variable's stack slot and reference count are
    /// tracked.
    pub fn slot_key(&self) -> String {
        qualified_name(self.scope.as_deref(), &self.name)
    }
}

/// A constant value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Integer(i64),
    Boolean(bool),
    Bytes(Vec<u8>),
}

/// `clause::name` for clause-scoped identifiers, `name` otherwise.
pub fn qualified_name(scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(scope) => format!("{scope}::{name}"),
        None => name.to_string(),
    }
}
