//! Desugaring - rewrite a type-checked contract into a single block over
//! primitive parameters.
//!
//! Four ordered rewrites:
//!
//! 1. **Output matching**: each output of a clause Value is paired with the
//!    `v.assetAmount == p` assertion naming its AssetAmount, and that
//!    assertion is removed. Every output records its index.
//! 2. **AssetAmount splitting**: AssetAmount parameters become `.asset` and
//!    `.amount` halves, and assertions mentioning them are duplicated once
//!    per half. Value parameters leave the parameter lists.
//! 3. **Dispatch**: multiple clauses become a tree of conditionals on the
//!    clause selector.
//! 4. **Builtin expansion**: `checkTxSig` gains the transaction signature
//!    hash argument and `checkMultiSig` is flattened to the VM calling
//!    convention.

mod tags;

pub use tags::JumpTags;

use ivy_core::{BugError, Builtin, CompilationError, IvyError, Primitive, Span, Type};
use ivy_parser::ast::{
    Call, Clause, Expression, Parameter, RawContract, ReferenceCounts, Variable,
};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Stack slot name of the implicit clause selector argument. Not a valid
/// source identifier.
pub const CLAUSE_SELECTOR: &str = "$clauseSelector";

/// A desugared contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Contract {
    pub name: String,
    /// Stack parameters in declaration order, primitive types only.
    pub parameters: Vec<Parameter>,
    pub block: Block,
    /// Contract-level reference counts, including the clause selector.
    pub references: ReferenceCounts,
    pub clause_selector: Option<String>,
}

/// The body of a desugared contract.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Clause(Clause),
    Conditional(Conditional),
}

/// `if condition { if_block } else { else_block }` with its jump tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    pub condition: Expression,
    pub if_block: Box<Block>,
    pub else_block: Box<Block>,
    pub else_tag: String,
    pub end_tag: String,
}

/// Declared types of every contract and clause parameter, by slot key.
pub(crate) fn parameter_types(contract: &RawContract) -> FxHashMap<String, Type> {
    contract
        .parameters
        .iter()
        .chain(contract.clauses.iter().flat_map(|c| c.parameters.iter()))
        .map(|p| (p.slot_key(), p.ty.clone()))
        .collect()
}

/// Run all four rewrites.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn desugar(contract: &RawContract) -> Result<Contract, IvyError> {
    let types = parameter_types(contract);
    let mut references = contract
        .references
        .clone()
        .ok_or_else(|| BugError::new("desugaring a contract without reference counts"))?;

    let mut clauses = contract.clauses.clone();
    for clause in &mut clauses {
        match_outputs(clause, &types)?;
    }
    for clause in &mut clauses {
        split_clause(clause, &types);
        for assertion in &mut clause.assertions {
            let expression = std::mem::replace(
                &mut assertion.expression,
                Expression::boolean(true, assertion.span),
            );
            assertion.expression = expand_builtins(expression)?;
        }
    }

    let mut tags = JumpTags::new();
    let clause_count = clauses.len();
    let (block, clause_selector) = dispatch(clauses, &mut tags, &mut references)?;

    let parameters = split_parameters(&contract.parameters);
    debug!(
        target: "ivy::desugar",
        contract = %contract.name,
        clauses = clause_count,
        parameters = parameters.len(),
        "contract desugared"
    );

    Ok(Contract {
        name: contract.name.clone(),
        parameters,
        block,
        references,
        clause_selector,
    })
}

// ============================================================================
// Output matching
// ============================================================================

/// Pair each output of a clause Value with its `.assetAmount` assertion and
/// number the outputs.
pub fn match_outputs(
    clause: &mut Clause,
    types: &FxHashMap<String, Type>,
) -> Result<(), CompilationError> {
    for index in 0..clause.outputs.len() {
        clause.outputs[index].index = Some(index);

        let value = clause.outputs[index].value.clone();
        if value.scope.is_none() {
            continue;
        }

        let matched = clause.assertions.iter().enumerate().find_map(|(position, a)| {
            matched_asset_amount(&a.expression, &value, types).map(|p| (position, p))
        });
        match matched {
            Some((position, asset_amount)) => {
                clause.assertions.remove(position);
                clause.outputs[index].asset_amount = Some(asset_amount);
            }
            None => {
                return Err(CompilationError::type_error(
                    format!(
                        "output of '{}' in clause '{}' needs a 'verify {}.assetAmount == <AssetAmount>' assertion",
                        value.name, clause.name, value.name
                    ),
                    clause.outputs[index].span,
                ));
            }
        }
    }

    for assertion in &clause.assertions {
        let mut leftover = None;
        assertion.expression.for_each_variable(&mut |var| {
            if leftover.is_none() && var.is_asset_amount() {
                leftover = Some(var.clone());
            }
        });
        if let Some(var) = leftover {
            return Err(CompilationError::type_error(
                format!(
                    "'{}' may only be compared with an AssetAmount parameter of an output",
                    var.name
                ),
                var.span,
            ));
        }
    }

    Ok(())
}

fn matched_asset_amount(
    expr: &Expression,
    value: &Variable,
    types: &FxHashMap<String, Type>,
) -> Option<Variable> {
    let Expression::Call(Call {
        builtin: Builtin::Eq,
        args,
        ..
    }) = expr
    else {
        return None;
    };
    let [Expression::Variable(a), Expression::Variable(b)] = args.as_slice() else {
        return None;
    };

    [(a, b), (b, a)].into_iter().find_map(|(lhs, rhs)| {
        let reads_value = lhs.is_asset_amount()
            && lhs.base_name() == value.name
            && lhs.scope == value.scope;
        let is_amount = !rhs.is_asset_amount()
            && types
                .get(&rhs.slot_key())
                .is_some_and(Type::is_asset_amount);
        (reads_value && is_amount).then(|| rhs.clone())
    })
}

// ============================================================================
// AssetAmount splitting
// ============================================================================

/// Drop Value parameters and split AssetAmount parameters into halves.
pub fn split_parameters(parameters: &[Parameter]) -> Vec<Parameter> {
    parameters
        .iter()
        .flat_map(|param| {
            if param.ty.is_value() {
                Vec::new()
            } else if param.ty.is_asset_amount() {
                [("asset", Primitive::Asset), ("amount", Primitive::Amount)]
                    .into_iter()
                    .map(|(half, ty)| Parameter {
                        name: format!("{}.{half}", param.name),
                        ty: ty.into(),
                        scope: param.scope.clone(),
                        span: param.span,
                    })
                    .collect()
            } else {
                vec![param.clone()]
            }
        })
        .collect()
}

fn split_clause(clause: &mut Clause, types: &FxHashMap<String, Type>) {
    clause.parameters = split_parameters(&clause.parameters);

    let is_split = |var: &Variable| {
        types
            .get(&var.slot_key())
            .is_some_and(Type::is_asset_amount)
    };

    let assertions = std::mem::take(&mut clause.assertions);
    for assertion in assertions {
        let mut mentions_split = false;
        assertion
            .expression
            .for_each_variable(&mut |var| mentions_split |= is_split(var));

        if !mentions_split {
            clause.assertions.push(assertion);
            continue;
        }

        for half in ["asset", "amount"] {
            let mut copy = assertion.clone();
            copy.expression.for_each_variable_mut(&mut |var| {
                if is_split(var) {
                    var.name = format!("{}.{half}", var.name);
                }
            });
            clause.assertions.push(copy);
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

fn selector(span: Span) -> Expression {
    Expression::Variable(Variable::new(CLAUSE_SELECTOR, span))
}

fn dispatch(
    clauses: Vec<Clause>,
    tags: &mut JumpTags,
    references: &mut ReferenceCounts,
) -> Result<(Block, Option<String>), BugError> {
    let count = clauses.len();
    let mut clauses = clauses.into_iter();

    match count {
        0 => Err(BugError::new("contract has no clauses")),
        1 => {
            let clause = clauses
                .next()
                .ok_or_else(|| BugError::new("contract has no clauses"))?;
            Ok((Block::Clause(clause), None))
        }
        2 => {
            let (Some(first), Some(second)) = (clauses.next(), clauses.next()) else {
                return Err(BugError::new("expected two clauses"));
            };
            references.set(CLAUSE_SELECTOR, 1);
            let (else_tag, end_tag) = tags.next_pair();
            let block = Block::Conditional(Conditional {
                condition: selector(second.span),
                if_block: Box::new(Block::Clause(second)),
                else_block: Box::new(Block::Clause(first)),
                else_tag,
                end_tag,
            });
            Ok((block, Some(CLAUSE_SELECTOR.to_string())))
        }
        _ => {
            references.set(CLAUSE_SELECTOR, (count - 1) as u32);
            let block = chain(clauses.collect(), tags);
            Ok((block, Some(CLAUSE_SELECTOR.to_string())))
        }
    }
}

/// `k == selector` tests from the last clause down; the first clause is the
/// final else.
fn chain(mut clauses: Vec<Clause>, tags: &mut JumpTags) -> Block {
    let last = clauses.len() - 1;
    if last == 0 {
        return Block::Clause(clauses.remove(0));
    }

    let (else_tag, end_tag) = tags.next_pair();
    let clause = clauses.remove(last);
    let span = clause.span;
    let condition = Expression::Call(Call {
        builtin: Builtin::Eq,
        args: vec![Expression::integer(last as i64, span), selector(span)],
        span,
    });

    Block::Conditional(Conditional {
        condition,
        if_block: Box::new(Block::Clause(clause)),
        else_block: Box::new(chain(clauses, tags)),
        else_tag,
        end_tag,
    })
}

// ============================================================================
// Builtin expansion
// ============================================================================

fn expand_builtins(expr: Expression) -> Result<Expression, BugError> {
    match expr {
        Expression::Call(mut call) => {
            call.args = call
                .args
                .into_iter()
                .map(expand_builtins)
                .collect::<Result<_, _>>()?;

            match call.builtin {
                Builtin::CheckTxSig => {
                    call.args.push(Expression::Call(Call {
                        builtin: Builtin::TxSigHash,
                        args: Vec::new(),
                        span: call.span,
                    }));
                }
                Builtin::CheckMultiSig => {
                    call.args = flatten_multisig(std::mem::take(&mut call.args), call.span)?;
                }
                _ => {}
            }
            Ok(Expression::Call(call))
        }
        Expression::List { items, span } => Ok(Expression::List {
            items: items
                .into_iter()
                .map(expand_builtins)
                .collect::<Result<_, _>>()?,
            span,
        }),
        other => Ok(other),
    }
}

/// `[n, keys..., m, sigs..., 0]`
fn flatten_multisig(args: Vec<Expression>, span: Span) -> Result<Vec<Expression>, BugError> {
    let mut args = args.into_iter();
    let (
        Some(Expression::List { items: keys, .. }),
        Some(Expression::List { items: sigs, .. }),
        None,
    ) = (args.next(), args.next(), args.next())
    else {
        return Err(BugError::new(
            "checkMultiSig arguments must be two list literals",
        ));
    };

    let mut flat = Vec::with_capacity(keys.len() + sigs.len() + 3);
    flat.push(Expression::integer(keys.len() as i64, span));
    flat.extend(keys);
    flat.push(Expression::integer(sigs.len() as i64, span));
    flat.extend(sigs);
    flat.push(Expression::integer(0, span));
    Ok(flat)
}
