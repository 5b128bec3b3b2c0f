//! Reference Checking - resolve identifiers and count their uses.
//!
//! Every variable reference is resolved to a contract or clause parameter,
//! tagged with its declaring clause when it is a clause parameter, and
//! counted in both the clause-local and the contract-level maps. The counts
//! drive stack allocation: a parameter referenced N times is copied N-1
//! times and moved once.
//!
//! AssetAmount parameters are counted as a pair of `.asset`/`.amount`
//! counters that always move together, ready for desugaring to split them.

use ivy_core::{CompilationError, Span};
use ivy_parser::ast::{Parameter, RawContract, ReferenceCounts, Variable, qualified_name};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Counter keys for a parameter with the given slot key.
pub(crate) fn counter_keys(key: &str, asset_amount: bool) -> Vec<String> {
    if asset_amount {
        vec![format!("{key}.asset"), format!("{key}.amount")]
    } else {
        vec![key.to_string()]
    }
}

/// Resolve and count every identifier in `contract`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn check_references(mut contract: RawContract) -> Result<RawContract, CompilationError> {
    check_duplicates(&contract.parameters)?;
    check_clause_names(&contract)?;

    let mut contract_refs = ReferenceCounts::new();
    for param in &contract.parameters {
        for key in counter_keys(&param.name, param.ty.is_asset_amount()) {
            contract_refs.declare(key);
        }
    }

    let contract_params = contract.parameters.clone();

    for clause in &mut contract.clauses {
        check_duplicates(&clause.parameters)?;

        let mut clause_refs = ReferenceCounts::new();
        for param in &mut clause.parameters {
            if contract_params.iter().any(|p| p.name == param.name) {
                return Err(CompilationError::name_error(
                    format!(
                        "clause parameter '{}' of clause '{}' shadows a contract parameter",
                        param.name, clause.name
                    ),
                    param.span,
                ));
            }
            param.scope = Some(clause.name.clone());
            for key in counter_keys(&param.slot_key(), param.ty.is_asset_amount()) {
                contract_refs.declare(key.clone());
                clause_refs.declare(key);
            }
        }

        let mut resolver = Resolver {
            clause_name: &clause.name,
            clause_params: &clause.parameters,
            contract_params: &contract_params,
            clause_refs: &mut clause_refs,
            contract_refs: &mut contract_refs,
            error: None,
        };

        for assertion in &mut clause.assertions {
            assertion
                .expression
                .for_each_variable_mut(&mut |var| resolver.resolve(var));
        }
        for output in &mut clause.outputs {
            resolver.resolve(&mut output.program);
            resolver.resolve(&mut output.value);
        }
        if let Some(returned) = &mut clause.returned {
            resolver.resolve(&mut returned.value);
        }

        if let Some(error) = resolver.error {
            return Err(error);
        }

        debug!(
            target: "ivy::references",
            clause = %clause.name,
            identifiers = clause_refs.len(),
            "clause references counted"
        );
        clause.references = Some(clause_refs);
    }

    let declared = contract.parameters.iter().chain(
        contract
            .clauses
            .iter()
            .flat_map(|clause| clause.parameters.iter()),
    );
    for param in declared {
        let key = &counter_keys(&param.slot_key(), param.ty.is_asset_amount())[0];
        if contract_refs.get(key) == 0 {
            return Err(CompilationError::name_error(
                format!("unused parameter '{}'", param.name),
                param.span,
            ));
        }
    }

    debug!(
        target: "ivy::references",
        contract = %contract.name,
        identifiers = contract_refs.len(),
        "contract references counted"
    );
    contract.references = Some(contract_refs);
    Ok(contract)
}

fn check_duplicates(params: &[Parameter]) -> Result<(), CompilationError> {
    let mut seen = FxHashSet::default();
    for param in params {
        if !seen.insert(param.name.as_str()) {
            return Err(CompilationError::name_error(
                format!("duplicate parameter '{}'", param.name),
                param.span,
            ));
        }
    }
    Ok(())
}

fn check_clause_names(contract: &RawContract) -> Result<(), CompilationError> {
    let mut seen = FxHashSet::default();
    for clause in &contract.clauses {
        if !seen.insert(clause.name.as_str()) {
            return Err(CompilationError::name_error(
                format!("duplicate clause '{}'", clause.name),
                clause.span,
            ));
        }
    }
    Ok(())
}

/// Resolves references within one clause. The first failure is kept and
/// later references are ignored.
struct Resolver<'a> {
    clause_name: &'a str,
    clause_params: &'a [Parameter],
    contract_params: &'a [Parameter],
    clause_refs: &'a mut ReferenceCounts,
    contract_refs: &'a mut ReferenceCounts,
    error: Option<CompilationError>,
}

impl Resolver<'_> {
    fn resolve(&mut self, var: &mut Variable) {
        if self.error.is_some() {
            return;
        }

        let base = var.base_name().to_string();
        let (key, asset_amount) =
            if let Some(param) = self.clause_params.iter().find(|p| p.name == base) {
                var.scope = Some(self.clause_name.to_string());
                (
                    qualified_name(Some(self.clause_name), &base),
                    param.ty.is_asset_amount(),
                )
            } else if let Some(param) = self.contract_params.iter().find(|p| p.name == base) {
                (base.clone(), param.ty.is_asset_amount())
            } else {
                self.error = Some(undefined(&base, var.span));
                return;
            };

        for key in counter_keys(&key, asset_amount) {
            self.clause_refs.increment(&key);
            self.contract_refs.increment(&key);
        }
    }
}

fn undefined(name: &str, span: Span) -> CompilationError {
    CompilationError::name_error(format!("undefined identifier '{name}'"), span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use ivy_parser::Parser;

    fn check(source: &str) -> Result<RawContract, CompilationError> {
        let arena = Bump::new();
        check_references(Parser::parse(source, &arena).unwrap())
    }

    #[test]
    fn counts_contract_and_clause_references() {
        let contract = check(
            "contract LockWithPublicKey(publicKey: PublicKey, locked: Value) {
                clause spend(sig: Signature) {
                    verify checkTxSig(publicKey, sig)
                    return locked
                }
            }",
        )
        .unwrap();

        let refs = contract.references.as_ref().unwrap();
        assert_eq!(refs.get("publicKey"), 1);
        assert_eq!(refs.get("locked"), 1);
        assert_eq!(refs.get("spend::sig"), 1);

        let clause = &contract.clauses[0];
        let clause_refs = clause.references.as_ref().unwrap();
        assert_eq!(clause_refs.get("spend::sig"), 1);
        assert_eq!(clause.parameters[0].scope.as_deref(), Some("spend"));
    }

    #[test]
    fn clause_references_are_scoped() {
        let contract = check(
            "contract C(v: Value) {
                clause c(n: Integer) { verify n > 0 verify n < 10 return v }
            }",
        )
        .unwrap();
        let clause = &contract.clauses[0];
        assert_eq!(clause.references.as_ref().unwrap().get("c::n"), 2);
        let mut scopes = Vec::new();
        for assertion in &clause.assertions {
            assertion
                .expression
                .for_each_variable(&mut |v| scopes.push(v.scope.clone()));
        }
        assert_eq!(scopes, [Some("c".to_string()), Some("c".to_string())]);
    }

    #[test]
    fn asset_amount_counts_both_halves() {
        let contract = check(
            "contract TradeOffer(requested: AssetAmount, seller: Program, offered: Value) {
                clause trade(payment: Value) {
                    verify payment.assetAmount == requested
                    output seller(payment)
                    return offered
                }
            }",
        )
        .unwrap();
        let refs = contract.references.as_ref().unwrap();
        assert_eq!(refs.get("requested.asset"), 1);
        assert_eq!(refs.get("requested.amount"), 1);
        assert_eq!(refs.get("trade::payment"), 2);
        assert!(!refs.contains("requested"));
    }

    #[test]
    fn unused_parameter_is_named() {
        let err =
            check("contract X(a: Integer, v: Value) { clause c() { return v } }").unwrap_err();
        assert_eq!(err.kind(), "NameError");
        assert!(err.to_string().contains("'a'"), "{err}");
        assert_eq!(err.span(), Some(Span::new(1, 12, 1)));
    }

    #[test]
    fn unused_clause_parameter() {
        let err =
            check("contract X(v: Value) { clause c(s: Signature) { return v } }").unwrap_err();
        assert_eq!(err.to_string(), "NameError at line 1, column 33: unused parameter 's'");
    }

    #[test]
    fn undefined_identifier() {
        let err =
            check("contract X(v: Value) { clause c() { verify y > 1 return v } }").unwrap_err();
        assert_eq!(err.kind(), "NameError");
        assert!(err.message().contains("undefined identifier 'y'"));
    }

    #[test]
    fn shadowing_contract_parameter() {
        let err = check(
            "contract X(a: Integer, v: Value) { clause c(a: Integer) { verify a > 1 return v } }",
        )
        .unwrap_err();
        assert!(err.message().contains("shadows"));
    }

    #[test]
    fn duplicate_parameter() {
        let err = check(
            "contract X(a, a: Integer, v: Value) { clause c() { verify a > 1 return v } }",
        )
        .unwrap_err();
        assert_eq!(err.message(), "duplicate parameter 'a'");
    }

    #[test]
    fn repeated_clause_name() {
        let err = check(
            "contract D(v: Value) {
                clause c(x: Integer) { return v }
                clause c(x: Integer) { verify x > 0 return v }
            }",
        )
        .unwrap_err();
        assert_eq!(err.kind(), "NameError");
        assert_eq!(err.message(), "duplicate clause 'c'");
        assert_eq!(err.span().map(|s| s.line), Some(3));
    }

    #[test]
    fn repeated_clause_name_with_different_types() {
        let err = check(
            "contract D(v: Value) {
                clause c(x: Integer) { verify x > 0 return v }
                clause c(x: Boolean) { verify x return v }
            }",
        )
        .unwrap_err();
        assert_eq!(err.message(), "duplicate clause 'c'");
    }
}
