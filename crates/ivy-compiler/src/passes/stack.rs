//! Stack allocation - resolve named references to stack positions.
//!
//! The allocator simulates the VM stack as a list of slots, bottom first.
//! Named slots hold parameters; anonymous slots hold intermediate results.
//! A reference with one remaining use moves its slot to the top with
//! `ROLL`; one with more uses copies it with `PICK`.
//!
//! Layout on entry, bottom to top:
//!
//! ```text
//! clause arguments (first deepest), clause selector, last .. first contract parameter
//! ```

use ivy_core::BugError;
use ivy_parser::ast::ReferenceCounts;
use tracing::{debug, trace};

use crate::ir::{FinalOperation, Operation};

type Slot = Option<String>;

/// Resolve every name in `ops` to a stack depth.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn allocate_stack(ops: &[Operation]) -> Result<Vec<FinalOperation>, BugError> {
    let mut allocator = StackAllocator::default();
    for op in ops {
        allocator.step(op)?;
    }
    debug!(
        target: "ivy::stack",
        operations = allocator.output.len(),
        "stack allocated"
    );
    Ok(allocator.output)
}

#[derive(Debug, Default)]
struct StackAllocator {
    stack: Vec<Slot>,
    contract_refs: ReferenceCounts,
    clause_refs: Option<ReferenceCounts>,
    clause_parameters: Vec<String>,
    /// Stack on entry to each open if-branch.
    snapshots: Vec<Vec<Slot>>,
    /// Stack at the end of each closed if-branch.
    branch_results: Vec<Vec<Slot>>,
    output: Vec<FinalOperation>,
}

impl StackAllocator {
    fn step(&mut self, op: &Operation) -> Result<(), BugError> {
        trace!(target: "ivy::stack", ?op, depth = self.stack.len(), "allocating");

        match op {
            Operation::BeginContract {
                parameters,
                clause_selector,
                references,
            } => {
                self.contract_refs = references.clone();
                self.stack.extend(clause_selector.iter().cloned().map(Some));
                for param in parameters.iter().rev() {
                    self.output.push(FinalOperation::PushParameter(param.clone()));
                    self.stack.push(Some(param.clone()));
                }
            }
            Operation::BeginClause {
                parameters,
                references,
                ..
            } => self.begin_clause(parameters, references),
            Operation::EndClause => {
                self.clause_refs = None;
                self.clause_parameters.clear();
                if self.stack.len() != 1 {
                    return Err(BugError::new(format!(
                        "clause left {} stack items, expected 1",
                        self.stack.len()
                    )));
                }
            }
            Operation::Get(name) => self.get(name)?,
            Operation::Push(literal) => {
                self.output.push(FinalOperation::Push(literal.clone()));
                self.stack.push(None);
            }
            Operation::Instruction { instruction, args } => {
                self.pop(*args)?;
                self.stack
                    .extend(std::iter::repeat_n(None, instruction.results()));
                self.output.push(FinalOperation::Instruction(*instruction));
            }
            Operation::BeginIf { else_tag } => {
                self.pop(1)?;
                self.snapshots.push(self.stack.clone());
                self.output.push(FinalOperation::BeginIf {
                    else_tag: else_tag.clone(),
                });
            }
            Operation::Else { else_tag, end_tag } => {
                let entry = self
                    .snapshots
                    .pop()
                    .ok_or_else(|| BugError::new("else without a matching if"))?;
                self.branch_results
                    .push(std::mem::replace(&mut self.stack, entry));
                self.output.push(FinalOperation::Else {
                    else_tag: else_tag.clone(),
                    end_tag: end_tag.clone(),
                });
            }
            Operation::EndIf { end_tag } => {
                let if_result = self
                    .branch_results
                    .pop()
                    .ok_or_else(|| BugError::new("end of if without a matching else"))?;
                if if_result.len() != self.stack.len() {
                    return Err(BugError::new(format!(
                        "branches leave different stack depths ({} and {})",
                        if_result.len(),
                        self.stack.len()
                    )));
                }
                self.output.push(FinalOperation::EndIf {
                    end_tag: end_tag.clone(),
                });
            }
        }
        Ok(())
    }

    fn begin_clause(&mut self, parameters: &[String], references: &ReferenceCounts) {
        self.clause_refs = Some(references.clone());
        self.clause_parameters = parameters.to_vec();

        let base = std::mem::take(&mut self.stack);
        self.stack = parameters.iter().cloned().map(Some).collect();
        self.stack.extend(base);

        let mut index = 0;
        while index < self.stack.len() {
            let unused = match &self.stack[index] {
                Some(name) => !self.clause_parameters.contains(name) && references.get(name) == 0,
                None => false,
            };
            if unused {
                let depth = self.stack.len() - 1 - index;
                self.output.push(FinalOperation::Roll(depth));
                self.output.push(FinalOperation::Drop);
                self.stack.remove(index);
            } else {
                index += 1;
            }
        }
    }

    fn get(&mut self, name: &str) -> Result<(), BugError> {
        let refs = match &mut self.clause_refs {
            Some(refs) => refs,
            None => &mut self.contract_refs,
        };

        let position = self
            .stack
            .iter()
            .rposition(|slot| slot.as_deref() == Some(name))
            .ok_or_else(|| BugError::new(format!("'{name}' is not on the stack")))?;
        let depth = self.stack.len() - 1 - position;

        match refs.decrement(name) {
            0 => {
                return Err(BugError::new(format!(
                    "'{name}' referenced more times than counted"
                )));
            }
            1 => {
                self.stack.remove(position);
                self.output.push(FinalOperation::Roll(depth));
            }
            _ => self.output.push(FinalOperation::Pick(depth)),
        }
        self.stack.push(None);
        Ok(())
    }

    fn pop(&mut self, count: usize) -> Result<(), BugError> {
        let remaining = self.stack.len().checked_sub(count).ok_or_else(|| {
            BugError::new(format!(
                "stack underflow: need {count}, have {}",
                self.stack.len()
            ))
        })?;
        self.stack.truncate(remaining);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Instruction;
    use crate::passes::{check_references, check_types, compile_to_intermediate, desugar};
    use bumpalo::Bump;
    use ivy_core::{Builtin, IvyError};
    use ivy_parser::Parser;
    use ivy_parser::ast::Literal;

    fn allocate(source: &str) -> Result<Vec<FinalOperation>, IvyError> {
        let arena = Bump::new();
        let contract = Parser::parse(source, &arena).unwrap();
        let contract = desugar(&check_types(check_references(contract)?)?)?;
        Ok(allocate_stack(&compile_to_intermediate(&contract)?)?)
    }

    fn counts(entries: &[(&str, u32)]) -> ReferenceCounts {
        let mut refs = ReferenceCounts::new();
        for (key, count) in entries {
            refs.set(*key, *count);
        }
        refs
    }

    #[test]
    fn single_use_rolls() {
        let ops = allocate(
            "contract LockWithPublicKey(publicKey: PublicKey, locked: Value) {
                clause spend(sig: Signature) {
                    verify checkTxSig(publicKey, sig)
                    return locked
                }
            }",
        )
        .unwrap();
        assert_eq!(
            ops,
            [
                FinalOperation::PushParameter("publicKey".into()),
                FinalOperation::Roll(0),
                FinalOperation::Roll(1),
                FinalOperation::Instruction(Instruction::Builtin(Builtin::TxSigHash)),
                FinalOperation::Instruction(Instruction::Builtin(Builtin::CheckTxSig)),
            ]
        );
    }

    #[test]
    fn repeated_use_picks_then_rolls() {
        let ops = allocate_stack(&[
            Operation::BeginContract {
                parameters: vec!["n".into()],
                clause_selector: None,
                references: counts(&[("n", 2)]),
            },
            Operation::BeginClause {
                name: "c".into(),
                parameters: Vec::new(),
                references: counts(&[("n", 2)]),
            },
            Operation::Get("n".into()),
            Operation::Get("n".into()),
            Operation::Instruction {
                instruction: Instruction::Builtin(Builtin::Eq),
                args: 2,
            },
            Operation::EndClause,
        ])
        .unwrap();
        assert_eq!(
            ops,
            [
                FinalOperation::PushParameter("n".into()),
                FinalOperation::Pick(0),
                FinalOperation::Roll(1),
                FinalOperation::Instruction(Instruction::Builtin(Builtin::Eq)),
            ]
        );
    }

    #[test]
    fn three_uses_pick_twice_then_roll() {
        let ops = allocate_stack(&[
            Operation::BeginContract {
                parameters: vec!["n".into()],
                clause_selector: None,
                references: counts(&[("n", 3)]),
            },
            Operation::BeginClause {
                name: "c".into(),
                parameters: Vec::new(),
                references: counts(&[("n", 3)]),
            },
            Operation::Get("n".into()),
            Operation::Get("n".into()),
            Operation::Instruction {
                instruction: Instruction::Builtin(Builtin::Add),
                args: 2,
            },
            Operation::Get("n".into()),
            Operation::Instruction {
                instruction: Instruction::Builtin(Builtin::Eq),
                args: 2,
            },
            Operation::EndClause,
        ])
        .unwrap();
        assert_eq!(
            ops,
            [
                FinalOperation::PushParameter("n".into()),
                FinalOperation::Pick(0),
                FinalOperation::Pick(1),
                FinalOperation::Instruction(Instruction::Builtin(Builtin::Add)),
                FinalOperation::Roll(1),
                FinalOperation::Instruction(Instruction::Builtin(Builtin::Eq)),
            ]
        );
        let picks = ops.iter().filter(|op| matches!(op, FinalOperation::Pick(_))).count();
        let rolls = ops.iter().filter(|op| matches!(op, FinalOperation::Roll(_))).count();
        assert_eq!((picks, rolls), (2, 1));
    }

    #[test]
    fn unused_slots_are_dropped_on_clause_entry() {
        let ops = allocate(
            "contract X(k: PublicKey, v: Value) {
                clause first(s: Signature) { verify checkTxSig(k, s) return v }
                clause second() { return v }
            }",
        )
        .unwrap();

        let second = ops
            .iter()
            .position(|op| matches!(op, FinalOperation::BeginIf { .. }))
            .unwrap();
        // The selector rolls to the top before the branch.
        assert_eq!(ops[1], FinalOperation::Roll(1));
        // `second` never reads `k`.
        assert_eq!(ops[second + 1], FinalOperation::Roll(0));
        assert_eq!(ops[second + 2], FinalOperation::Drop);
        assert_eq!(ops[second + 3], FinalOperation::Push(Literal::Boolean(true)));
    }

    #[test]
    fn selector_is_dropped_by_branches_that_do_not_test_it() {
        let ops = allocate(
            "contract X(v: Value) {
                clause c0() { return v }
                clause c1() { return v }
                clause c2() { return v }
            }",
        )
        .unwrap();
        // 2 == selector: the first test copies the selector.
        assert_eq!(ops[0], FinalOperation::Push(Literal::Integer(2)));
        assert_eq!(ops[1], FinalOperation::Pick(1));
        // Inside c2 the remaining selector copy is discarded.
        assert_eq!(ops[4], FinalOperation::Roll(0));
        assert_eq!(ops[5], FinalOperation::Drop);
        // The final test moves it.
        assert!(ops.contains(&FinalOperation::Roll(1)));
        assert!(matches!(ops.last(), Some(FinalOperation::EndIf { .. })));
    }

    #[test]
    fn missing_name_is_a_bug() {
        let err = allocate_stack(&[
            Operation::BeginContract {
                parameters: Vec::new(),
                clause_selector: None,
                references: ReferenceCounts::new(),
            },
            Operation::Get("ghost".into()),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn underflow_is_a_bug() {
        let err = allocate_stack(&[Operation::Instruction {
            instruction: Instruction::Verify,
            args: 1,
        }])
        .unwrap_err();
        assert!(err.to_string().contains("underflow"));
    }
}
