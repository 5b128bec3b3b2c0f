//! Compiled templates and instantiation.
//!
//! A [`Template`] is the reusable result of compiling a contract: its
//! parameter and clause descriptions plus the optimized token stream with
//! parameter placeholders at the front. [`instantiate`] fills the
//! placeholders and assembles the final program.

use ivy_core::{BugError, Builtin, CompilationError, InstantiateError, Type};
use ivy_parser::ast::{Clause, Expression, Literal, RawContract};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::bytecode::{Token, assemble, token::render};
use crate::passes::desugar::{match_outputs, parameter_types};

/// A contract parameter and its solved type.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterInfo {
    pub name: String,
    pub ty: Type,
}

impl ParameterInfo {
    /// Number of instantiation arguments this parameter takes.
    pub fn argument_count(&self) -> usize {
        if self.ty.is_value() {
            0
        } else if self.ty.is_asset_amount() {
            2
        } else {
            1
        }
    }
}

/// A Value disposed of by a clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueInfo {
    pub name: String,
    /// Destination program, for outputs. `None` for the returned Value.
    pub program: Option<String>,
    /// The AssetAmount parameter an output of a clause Value is matched to.
    pub asset_amount: Option<String>,
}

/// What a clause needs from its spender.
#[derive(Debug, Clone, PartialEq)]
pub struct ClauseInfo {
    pub name: String,
    pub parameters: Vec<ParameterInfo>,
    pub values: Vec<ValueInfo>,
    /// Arguments of `after(...)`: the spending transaction's minimum time.
    pub mintimes: Vec<String>,
    /// Arguments of `before(...)`: the spending transaction's maximum time.
    pub maxtimes: Vec<String>,
}

/// A compiled contract, ready for instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub source: String,
    pub parameters: Vec<ParameterInfo>,
    pub clauses: Vec<ClauseInfo>,
    pub instructions: Vec<Token>,
}

impl Template {
    pub(crate) fn new(
        source: &str,
        contract: &RawContract,
        instructions: Vec<Token>,
    ) -> Result<Self, CompilationError> {
        Ok(Self {
            name: contract.name.clone(),
            source: source.to_string(),
            parameters: parameter_infos(contract),
            clauses: clause_infos(contract)?,
            instructions,
        })
    }

    /// Number of arguments `instantiate` expects.
    pub fn argument_count(&self) -> usize {
        self.parameters.iter().map(ParameterInfo::argument_count).sum()
    }

    /// The instructions as space-separated assembler text.
    pub fn instructions_text(&self) -> String {
        render(&self.instructions)
    }
}

/// A concrete value for a contract parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Argument {
    Bytes(Vec<u8>),
    Integer(i64),
    Boolean(bool),
}

impl Argument {
    fn to_token(&self) -> Token {
        match self {
            Argument::Bytes(bytes) => Token::Bytes(bytes.clone()),
            Argument::Integer(n) => Token::Integer(*n),
            Argument::Boolean(true) => Token::mnemonic("TRUE"),
            Argument::Boolean(false) => Token::mnemonic("FALSE"),
        }
    }
}

impl From<Vec<u8>> for Argument {
    fn from(bytes: Vec<u8>) -> Self {
        Argument::Bytes(bytes)
    }
}

impl From<i64> for Argument {
    fn from(n: i64) -> Self {
        Argument::Integer(n)
    }
}

impl From<bool> for Argument {
    fn from(b: bool) -> Self {
        Argument::Boolean(b)
    }
}

/// Fill `template`'s parameters with `args`, in declaration order, and
/// assemble the program. AssetAmount parameters take two arguments, asset
/// then amount.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn instantiate(template: &Template, args: &[Argument]) -> Result<Vec<u8>, InstantiateError> {
    let expected = template.argument_count();
    if args.len() != expected {
        return Err(InstantiateError::ArgumentCount {
            template: template.name.clone(),
            expected,
            got: args.len(),
        });
    }

    let placeholders = template
        .instructions
        .iter()
        .take_while(|token| token.is_parameter())
        .count();
    if placeholders != expected {
        return Err(BugError::new(format!(
            "template '{}' has {placeholders} parameter placeholders for {expected} arguments",
            template.name
        ))
        .into());
    }

    let mut tokens: Vec<Token> = args.iter().rev().map(Argument::to_token).collect();
    tokens.extend_from_slice(&template.instructions[placeholders..]);
    let program = assemble(&tokens)?;

    debug!(
        target: "ivy::instantiate",
        template = %template.name,
        arguments = args.len(),
        bytes = program.len(),
        "template instantiated"
    );
    Ok(program)
}

pub(crate) fn parameter_infos(contract: &RawContract) -> Vec<ParameterInfo> {
    contract
        .parameters
        .iter()
        .map(|p| ParameterInfo {
            name: p.name.clone(),
            ty: p.ty.clone(),
        })
        .collect()
}

pub(crate) fn clause_infos(contract: &RawContract) -> Result<Vec<ClauseInfo>, CompilationError> {
    let types = parameter_types(contract);
    contract
        .clauses
        .iter()
        .map(|clause| clause_info(clause, &types))
        .collect()
}

fn clause_info(
    clause: &Clause,
    types: &FxHashMap<String, Type>,
) -> Result<ClauseInfo, CompilationError> {
    let mut matched = clause.clone();
    match_outputs(&mut matched, types)?;

    let mut values: Vec<ValueInfo> = matched
        .outputs
        .iter()
        .map(|output| ValueInfo {
            name: output.value.name.clone(),
            program: Some(output.program.name.clone()),
            asset_amount: output.asset_amount.as_ref().map(|p| p.name.clone()),
        })
        .collect();
    if let Some(returned) = &clause.returned {
        values.push(ValueInfo {
            name: returned.value.name.clone(),
            program: None,
            asset_amount: None,
        });
    }

    let mut mintimes = Vec::new();
    let mut maxtimes = Vec::new();
    for assertion in &clause.assertions {
        collect_times(&assertion.expression, &mut mintimes, &mut maxtimes);
    }

    Ok(ClauseInfo {
        name: clause.name.clone(),
        parameters: clause
            .parameters
            .iter()
            .map(|p| ParameterInfo {
                name: p.name.clone(),
                ty: p.ty.clone(),
            })
            .collect(),
        values,
        mintimes,
        maxtimes,
    })
}

fn collect_times(expr: &Expression, mintimes: &mut Vec<String>, maxtimes: &mut Vec<String>) {
    match expr {
        Expression::Call(call) => {
            let bound = match call.builtin {
                Builtin::After => Some(&mut *mintimes),
                Builtin::Before => Some(&mut *maxtimes),
                _ => None,
            };
            if let Some(list) = bound
                && let Some(arg) = call.args.first()
            {
                list.push(describe(arg));
            }
            for arg in &call.args {
                collect_times(arg, mintimes, maxtimes);
            }
        }
        Expression::List { items, .. } => {
            for item in items {
                collect_times(item, mintimes, maxtimes);
            }
        }
        Expression::Variable(_) | Expression::Literal { .. } => {}
    }
}

fn describe(expr: &Expression) -> String {
    match expr {
        Expression::Variable(var) => var.name.clone(),
        Expression::Literal {
            value: Literal::Integer(n),
            ..
        } => n.to_string(),
        Expression::Literal {
            value: Literal::Boolean(b),
            ..
        } => b.to_string(),
        Expression::Literal {
            value: Literal::Bytes(bytes),
            ..
        } => format!("0x{}", hex::encode(bytes)),
        Expression::Call(call) => call.builtin.to_string(),
        Expression::List { .. } => "[...]".to_string(),
    }
}
