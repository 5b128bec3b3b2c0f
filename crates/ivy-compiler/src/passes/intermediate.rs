//! Intermediate compilation - lower a desugared contract to a linear
//! sequence of symbolic [`Operation`]s.
//!
//! A clause body leaves exactly one value on the stack: the result of its
//! last assertion, or of its last output check. Every earlier result is
//! consumed by `verify`.

use ivy_core::BugError;
use ivy_parser::ast::{Clause, Expression, Literal, Output};
use tracing::debug;

use crate::ir::{Instruction, Operation};
use crate::passes::desugar::{Block, Conditional, Contract};

/// Lower `contract` to symbolic operations.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn compile_to_intermediate(contract: &Contract) -> Result<Vec<Operation>, BugError> {
    let mut ops = vec![Operation::BeginContract {
        parameters: contract.parameters.iter().map(|p| p.slot_key()).collect(),
        clause_selector: contract.clause_selector.clone(),
        references: contract.references.clone(),
    }];

    compile_block(&contract.block, &mut ops)?;

    debug!(
        target: "ivy::intermediate",
        contract = %contract.name,
        operations = ops.len(),
        "contract lowered"
    );
    Ok(ops)
}

fn compile_block(block: &Block, ops: &mut Vec<Operation>) -> Result<(), BugError> {
    match block {
        Block::Clause(clause) => compile_clause(clause, ops),
        Block::Conditional(cond) => compile_conditional(cond, ops),
    }
}

fn compile_conditional(cond: &Conditional, ops: &mut Vec<Operation>) -> Result<(), BugError> {
    compile_expression(&cond.condition, ops)?;
    ops.push(Operation::BeginIf {
        else_tag: cond.else_tag.clone(),
    });
    compile_block(&cond.if_block, ops)?;
    ops.push(Operation::Else {
        else_tag: cond.else_tag.clone(),
        end_tag: cond.end_tag.clone(),
    });
    compile_block(&cond.else_block, ops)?;
    ops.push(Operation::EndIf {
        end_tag: cond.end_tag.clone(),
    });
    Ok(())
}

fn compile_clause(clause: &Clause, ops: &mut Vec<Operation>) -> Result<(), BugError> {
    let references = clause
        .references
        .clone()
        .ok_or_else(|| BugError::new(format!("clause '{}' has no reference counts", clause.name)))?;

    ops.push(Operation::BeginClause {
        name: clause.name.clone(),
        parameters: clause.parameters.iter().map(|p| p.slot_key()).collect(),
        references,
    });

    if clause.outputs.is_empty() {
        let last = clause.assertions.len().saturating_sub(1);
        for (i, assertion) in clause.assertions.iter().enumerate() {
            compile_expression(&assertion.expression, ops)?;
            if i < last {
                push_instruction(ops, Instruction::Verify, 1);
            }
        }
        if clause.assertions.is_empty() {
            ops.push(Operation::Push(Literal::Boolean(true)));
        }
    } else {
        for assertion in &clause.assertions {
            compile_expression(&assertion.expression, ops)?;
            push_instruction(ops, Instruction::Verify, 1);
        }
        let last = clause.outputs.len() - 1;
        for (i, output) in clause.outputs.iter().enumerate() {
            compile_output(output, ops)?;
            if i < last {
                push_instruction(ops, Instruction::Verify, 1);
            }
        }
    }

    ops.push(Operation::EndClause);
    Ok(())
}

/// `index, data, amount, asset, version, program, CHECKOUTPUT`
fn compile_output(output: &Output, ops: &mut Vec<Operation>) -> Result<(), BugError> {
    let index = output
        .index
        .ok_or_else(|| BugError::new("output was not numbered before lowering"))?;

    ops.push(Operation::Push(Literal::Integer(index as i64)));
    ops.push(Operation::Push(Literal::Bytes(Vec::new())));

    match &output.asset_amount {
        Some(param) => {
            let key = param.slot_key();
            ops.push(Operation::Get(format!("{key}.amount")));
            ops.push(Operation::Get(format!("{key}.asset")));
        }
        None => {
            push_instruction(ops, Instruction::Amount, 0);
            push_instruction(ops, Instruction::Asset, 0);
        }
    }

    ops.push(Operation::Push(Literal::Integer(1)));
    ops.push(Operation::Get(output.program.slot_key()));
    push_instruction(ops, Instruction::CheckOutput, 6);
    Ok(())
}

fn compile_expression(expr: &Expression, ops: &mut Vec<Operation>) -> Result<(), BugError> {
    match expr {
        Expression::Call(call) => {
            for arg in &call.args {
                compile_expression(arg, ops)?;
            }
            push_instruction(ops, Instruction::Builtin(call.builtin), call.args.len());
        }
        Expression::Variable(var) => ops.push(Operation::Get(var.slot_key())),
        Expression::Literal { value, .. } => ops.push(Operation::Push(value.clone())),
        Expression::List { .. } => {
            return Err(BugError::new("list literal survived builtin expansion"));
        }
    }
    Ok(())
}

fn push_instruction(ops: &mut Vec<Operation>, instruction: Instruction, args: usize) {
    ops.push(Operation::Instruction { instruction, args });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::{check_references, check_types, desugar};
    use bumpalo::Bump;
    use ivy_core::{Builtin, IvyError};
    use ivy_parser::Parser;

    fn lower(source: &str) -> Result<Vec<Operation>, IvyError> {
        let arena = Bump::new();
        let contract = Parser::parse(source, &arena).unwrap();
        let contract = desugar(&check_types(check_references(contract)?)?)?;
        Ok(compile_to_intermediate(&contract)?)
    }

    fn get(key: &str) -> Operation {
        Operation::Get(key.to_string())
    }

    fn instruction(instruction: Instruction, args: usize) -> Operation {
        Operation::Instruction { instruction, args }
    }

    #[test]
    fn lock_with_public_key() {
        let ops = lower(
            "contract LockWithPublicKey(publicKey: PublicKey, locked: Value) {
                clause spend(sig: Signature) {
                    verify checkTxSig(publicKey, sig)
                    return locked
                }
            }",
        )
        .unwrap();

        assert!(matches!(
            &ops[0],
            Operation::BeginContract { parameters, clause_selector: None, .. }
                if parameters == &["publicKey".to_string()]
        ));
        assert!(matches!(
            &ops[1],
            Operation::BeginClause { name, parameters, .. }
                if name == "spend" && parameters == &["spend::sig".to_string()]
        ));
        assert_eq!(
            ops[2..],
            [
                get("publicKey"),
                get("spend::sig"),
                instruction(Instruction::Builtin(Builtin::TxSigHash), 0),
                instruction(Instruction::Builtin(Builtin::CheckTxSig), 3),
                Operation::EndClause,
            ]
        );
    }

    #[test]
    fn trivial_clause_pushes_true() {
        let ops = lower(
            "contract TrivialLock(locked: Value) {
                clause unlock() { return locked }
            }",
        )
        .unwrap();
        assert_eq!(ops[2], Operation::Push(Literal::Boolean(true)));
        assert_eq!(ops[3], Operation::EndClause);
    }

    #[test]
    fn clause_value_output_reads_asset_amount_halves() {
        let ops = lower(
            "contract TradeOffer(requested: AssetAmount, sellerProgram: Program, offered: Value) {
                clause trade(payment: Value) {
                    verify payment.assetAmount == requested
                    output sellerProgram(payment)
                    return offered
                }
            }",
        )
        .unwrap();
        assert_eq!(
            ops[2..],
            [
                Operation::Push(Literal::Integer(0)),
                Operation::Push(Literal::Bytes(Vec::new())),
                get("requested.amount"),
                get("requested.asset"),
                Operation::Push(Literal::Integer(1)),
                get("sellerProgram"),
                instruction(Instruction::CheckOutput, 6),
                Operation::EndClause,
            ]
        );
    }

    #[test]
    fn contract_value_output_uses_own_asset_and_amount() {
        let ops = lower(
            "contract Transfer(recipient: Program, locked: Value) {
                clause send() { output recipient(locked) }
            }",
        )
        .unwrap();
        assert_eq!(ops[4], instruction(Instruction::Amount, 0));
        assert_eq!(ops[5], instruction(Instruction::Asset, 0));
    }

    #[test]
    fn two_clauses_bracket_with_if_else() {
        let ops = lower(
            "contract X(k: PublicKey, v: Value) {
                clause first(s: Signature) { verify checkTxSig(k, s) return v }
                clause second() { return v }
            }",
        )
        .unwrap();
        assert_eq!(ops[1], get(crate::passes::desugar::CLAUSE_SELECTOR));
        assert!(matches!(&ops[2], Operation::BeginIf { else_tag } if else_tag == "a"));
        assert!(ops.iter().any(|op| matches!(
            op,
            Operation::Else { else_tag, end_tag } if else_tag == "a" && end_tag == "b"
        )));
        assert!(matches!(ops.last(), Some(Operation::EndIf { end_tag }) if end_tag == "b"));
        assert!(ops.contains(&instruction(Instruction::Builtin(Builtin::CheckTxSig), 3)));
    }
}
