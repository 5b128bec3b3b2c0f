//! Type Checking - unification-based inference over a reference-checked
//! contract.
//!
//! ## Process
//!
//! 1. Validate the Value parameter: exactly one, declared last.
//! 2. Seed a [`Scope`] with the contract parameters. Hash-typed and
//!    type-class parameters get a fresh variable plus a class constraint.
//! 3. Walk each clause, collecting equality constraints for assertions
//!    (Boolean), outputs (Program and Value operands) and returns (Value),
//!    and checking that every Value in scope is disposed exactly once.
//! 4. Solve all constraints with one [`Substitution`], check class
//!    constraints, and write the solved types back onto the parameters.

mod scope;
mod signatures;
mod unify;

pub use scope::{ClassConstraint, Constraint, Scope};
pub use signatures::{Signature, signature};
pub use unify::Substitution;

use ivy_core::{
    BugError, Builtin, CompilationError, IvyError, OtherType, Primitive, Span, Type, TypeClass,
};
use ivy_parser::ast::{Clause, Expression, Literal, Parameter, RawContract, qualified_name};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Infer and check the types of every parameter and expression.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn check_types(mut contract: RawContract) -> Result<RawContract, IvyError> {
    check_value_parameter(&contract)?;

    let mut scope = Scope::new();
    for param in &contract.parameters {
        if param.ty.is_primitive(Primitive::Signature) {
            return Err(CompilationError::type_error(
                format!(
                    "contract parameter '{}' cannot have type Signature",
                    param.name
                ),
                param.span,
            )
            .into());
        }
        seed_parameter(&mut scope, param);
    }

    let contract_value = contract
        .value_parameter()
        .map(|p| p.slot_key())
        .unwrap_or_default();

    for clause in &contract.clauses {
        for param in &clause.parameters {
            seed_parameter(&mut scope, param);
        }
        check_disposal(clause, &contract_value)?;
        constrain_clause(&mut scope, clause)?;
    }

    let (constraints, class_constraints) = scope.take_constraints();
    let mut subst = Substitution::new();
    for constraint in &constraints {
        subst.unify(&constraint.actual, &constraint.expected, constraint.span)?;
    }

    for constraint in &class_constraints {
        let ty = subst.apply(&constraint.ty);
        if let Some(class) = ty.class()
            && !constraint.class.contains(class)
        {
            return Err(CompilationError::type_error(
                format!("{ty} is not {}", constraint.class.name()),
                constraint.span,
            )
            .into());
        }
    }

    for param in &mut contract.parameters {
        param.ty = resolve_parameter(&scope, &subst, param)?;
    }
    for clause in &mut contract.clauses {
        for param in &mut clause.parameters {
            param.ty = resolve_parameter(&scope, &subst, param)?;
        }
    }

    debug!(
        target: "ivy::typeck",
        contract = %contract.name,
        constraints = constraints.len(),
        class_constraints = class_constraints.len(),
        "types inferred"
    );
    Ok(contract)
}

fn check_value_parameter(contract: &RawContract) -> Result<(), CompilationError> {
    let values: Vec<(usize, &Parameter)> = contract
        .parameters
        .iter()
        .enumerate()
        .filter(|(_, p)| p.ty.is_value())
        .collect();

    match values.as_slice() {
        [] => Err(CompilationError::type_error(
            format!("contract '{}' has no Value parameter", contract.name),
            contract.span,
        )),
        [(index, param)] if *index + 1 != contract.parameters.len() => {
            Err(CompilationError::type_error(
                format!("Value parameter '{}' must be the last parameter", param.name),
                param.span,
            ))
        }
        [_] => Ok(()),
        [_, (_, second), ..] => Err(CompilationError::type_error(
            format!(
                "contract '{}' has more than one Value parameter",
                contract.name
            ),
            second.span,
        )),
    }
}

fn seed_parameter(scope: &mut Scope, param: &Parameter) {
    let ty = match &param.ty {
        Type::Hash { .. } => {
            let var = scope.fresh();
            let declared = scope.instantiate_generics(&param.ty, param.span);
            scope.constrain(var.clone(), declared, param.span);
            scope.require_class(var.clone(), TypeClass::HASH, param.span);
            var
        }
        Type::Generic(_) => scope.instantiate_generics(&param.ty, param.span),
        other => other.clone(),
    };
    scope.bind(param.slot_key(), ty);
}

/// Every Value in scope must be output or returned exactly once.
fn check_disposal(clause: &Clause, contract_value: &str) -> Result<(), CompilationError> {
    let mut values: Vec<(String, Span)> = vec![(contract_value.to_string(), clause.span)];
    values.extend(
        clause
            .parameters
            .iter()
            .filter(|p| p.ty.is_value())
            .map(|p| (p.slot_key(), p.span)),
    );

    let mut disposals: FxHashMap<String, usize> = FxHashMap::default();
    let disposed = clause
        .outputs
        .iter()
        .map(|o| &o.value)
        .chain(clause.returned.as_ref().map(|r| &r.value));
    for var in disposed {
        *disposals.entry(var.slot_key()).or_insert(0) += 1;
    }

    for (key, span) in values {
        let name = key.rsplit("::").next().unwrap_or(&key);
        match disposals.get(&key).copied().unwrap_or(0) {
            1 => {}
            0 => {
                return Err(CompilationError::type_error(
                    format!(
                        "clause '{}' does not output or return Value '{name}'",
                        clause.name
                    ),
                    span,
                ));
            }
            _ => {
                return Err(CompilationError::type_error(
                    format!(
                        "clause '{}' disposes of Value '{name}' more than once",
                        clause.name
                    ),
                    span,
                ));
            }
        }
    }
    Ok(())
}

fn constrain_clause(scope: &mut Scope, clause: &Clause) -> Result<(), IvyError> {
    for assertion in &clause.assertions {
        let ty = infer(scope, &assertion.expression)?;
        scope.constrain(ty, Type::BOOLEAN, assertion.span);
    }

    for output in &clause.outputs {
        let program = scope.lookup(&output.program.slot_key())?.clone();
        scope.constrain(program, Primitive::Program.into(), output.program.span);
        let value = scope.lookup(&output.value.slot_key())?.clone();
        scope.constrain(value, Type::VALUE, output.value.span);
    }

    if let Some(returned) = &clause.returned {
        let value = scope.lookup(&returned.value.slot_key())?.clone();
        scope.constrain(value, Type::VALUE, returned.span);
    }

    Ok(())
}

fn infer(scope: &mut Scope, expr: &Expression) -> Result<Type, IvyError> {
    match expr {
        Expression::Literal { value, .. } => Ok(match value {
            Literal::Integer(_) => Type::INTEGER,
            Literal::Boolean(_) => Type::BOOLEAN,
            Literal::Bytes(_) => Primitive::String.into(),
        }),

        Expression::Variable(var) if var.is_asset_amount() => {
            let key = qualified_name(var.scope.as_deref(), var.base_name());
            let base = scope.lookup(&key)?.clone();
            scope.constrain(base, Type::VALUE, var.span);
            Ok(Primitive::AssetAmount.into())
        }

        Expression::Variable(var) => Ok(scope.lookup(&var.slot_key())?.clone()),

        Expression::List { items, .. } => {
            let element = scope.fresh();
            for item in items {
                let ty = infer(scope, item)?;
                scope.constrain(ty, element.clone(), item.span());
            }
            Ok(Type::list(element))
        }

        Expression::Call(call) => {
            let sig = signature(call.builtin);
            if call.args.len() != sig.inputs.len() {
                return Err(CompilationError::type_error(
                    format!(
                        "'{}' expects {} argument(s), got {}",
                        call.builtin,
                        sig.inputs.len(),
                        call.args.len()
                    ),
                    call.span,
                )
                .into());
            }

            if call.builtin == Builtin::CheckMultiSig {
                check_multisig_counts(&call.args, call.span)?;
            }

            let mut renamed = scope.rename(
                &sig.variables(),
                sig.inputs.iter().chain(std::iter::once(&sig.output)),
            );
            let output = renamed.pop().ok_or_else(|| {
                BugError::new(format!("signature of '{}' has no result", call.builtin))
            })?;

            for (arg, expected) in call.args.iter().zip(renamed) {
                let actual = infer(scope, arg)?;
                scope.constrain(actual, expected, arg.span());
            }
            Ok(output)
        }
    }
}

/// With literal lists on both sides, there must be no more signatures than
/// public keys.
fn check_multisig_counts(args: &[Expression], span: Span) -> Result<(), CompilationError> {
    if let [
        Expression::List { items: keys, .. },
        Expression::List { items: sigs, .. },
    ] = args
        && sigs.len() > keys.len()
    {
        return Err(CompilationError::type_error(
            format!(
                "checkMultiSig has more signatures ({}) than public keys ({})",
                sigs.len(),
                keys.len()
            ),
            span,
        ));
    }
    Ok(())
}

fn resolve_parameter(
    scope: &Scope,
    subst: &Substitution,
    param: &Parameter,
) -> Result<Type, BugError> {
    let ty = subst.apply(scope.lookup(&param.slot_key())?);
    if has_variables(&ty) {
        return Err(BugError::new(format!(
            "could not infer a type for parameter '{}' (got {ty})",
            param.name
        )));
    }
    match ty {
        Type::List(_) | Type::Other(OtherType::Contract | OtherType::SigHash) => Err(
            BugError::new(format!("parameter '{}' resolved to {ty}", param.name)),
        ),
        ty => Ok(ty),
    }
}

fn has_variables(ty: &Type) -> bool {
    match ty {
        Type::Var(_) | Type::Generic(_) => true,
        Type::Hash { input, .. } => has_variables(input),
        Type::List(element) => has_variables(element),
        Type::Primitive(_) | Type::Other(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::references::check_references;
    use bumpalo::Bump;
    use ivy_core::HashFunction;
    use ivy_parser::Parser;

    fn check(source: &str) -> Result<RawContract, IvyError> {
        let arena = Bump::new();
        let contract = Parser::parse(source, &arena).unwrap();
        check_types(check_references(contract)?)
    }

    fn compilation_error(result: Result<RawContract, IvyError>) -> CompilationError {
        match result {
            Err(IvyError::Compilation(e)) => e,
            other => panic!("expected compilation error, got {other:?}"),
        }
    }

    #[test]
    fn lock_with_public_key() {
        let contract = check(
            "contract LockWithPublicKey(publicKey: PublicKey, locked: Value) {
                clause spend(sig: Signature) {
                    verify checkTxSig(publicKey, sig)
                    return locked
                }
            }",
        )
        .unwrap();
        assert_eq!(contract.parameters[0].ty, Primitive::PublicKey.into());
        assert_eq!(contract.clauses[0].parameters[0].ty, Primitive::Signature.into());
    }

    #[test]
    fn hashable_parameter_is_inferred() {
        let contract = check(
            "contract RevealPreimage(hash: Sha256(Hashable), val: Value) {
                clause reveal(string: String) {
                    verify sha256(string) == hash
                    return val
                }
            }",
        )
        .unwrap();
        assert_eq!(
            contract.parameters[0].ty,
            Type::hash(HashFunction::Sha256, Primitive::String.into())
        );
    }

    #[test]
    fn value_must_be_last() {
        let err = compilation_error(check(
            "contract X(v: Value, a: Integer) { clause c() { verify a > 0 return v } }",
        ));
        assert_eq!(err.kind(), "IvyTypeError");
        assert!(err.message().contains("last"));
    }

    #[test]
    fn value_is_required() {
        let err = compilation_error(check("contract X(a: Integer) { clause c() { verify a > 0 } }"));
        assert!(err.message().contains("no Value parameter"));
    }

    #[test]
    fn value_disposed_exactly_once() {
        let err = compilation_error(check(
            "contract X(p: Program, v: Value) { clause c() { output p(v) return v } }",
        ));
        assert!(err.message().contains("more than once"), "{err}");

        let err = compilation_error(check(
            "contract X(a: Integer, v: Value) { clause c() { verify a > 0 } clause d() { return v } }",
        ));
        assert_eq!(err.kind(), "IvyTypeError");
        assert!(err.message().contains("does not output or return Value 'v'"), "{err}");
    }

    #[test]
    fn clause_values_must_be_disposed() {
        let err = compilation_error(check(
            "contract X(v: Value) { clause c(w: Value) { verify w.assetAmount == w.assetAmount return v } }",
        ));
        assert!(err.message().contains("Value 'w'"), "{err}");
    }

    #[test]
    fn signature_contract_parameter_rejected() {
        let err = compilation_error(check(
            "contract X(s: Signature, v: Value) { clause c(k: PublicKey) { verify checkTxSig(k, s) return v } }",
        ));
        assert!(err.message().contains("Signature"));
    }

    #[test]
    fn assertion_must_be_boolean() {
        let err = compilation_error(check(
            "contract X(a: Integer, v: Value) { clause c() { verify a + 1 return v } }",
        ));
        assert_eq!(err.message(), "got Integer, expected Boolean");
    }

    #[test]
    fn arity_mismatch() {
        let err = compilation_error(check(
            "contract X(t: Time, v: Value) { clause c() { verify after(t, t) return v } }",
        ));
        assert_eq!(err.message(), "'after' expects 1 argument(s), got 2");
    }

    #[test]
    fn multisig_with_too_many_signatures() {
        let err = compilation_error(check(
            "contract X(k1, k2: PublicKey, v: Value) {
                clause c(s1, s2, s3: Signature) {
                    verify checkMultiSig([k1, k2], [s1, s2, s3])
                    return v
                }
            }",
        ));
        assert_eq!(err.kind(), "IvyTypeError");
        assert!(err.message().contains("signatures (3) than public keys (2)"));
    }

    #[test]
    fn multisig_without_signatures() {
        let contract = check(
            "contract X(k1: PublicKey, v: Value) {
                clause c() {
                    verify checkMultiSig([k1], [])
                    return v
                }
            }",
        )
        .unwrap();
        assert_eq!(contract.parameters[0].ty, Type::Primitive(Primitive::PublicKey));
    }

    #[test]
    fn multisig_list_elements_are_checked() {
        let err = compilation_error(check(
            "contract X(k1: PublicKey, n: Integer, v: Value) {
                clause c(s1: Signature) {
                    verify checkMultiSig([k1, n], [s1])
                    return v
                }
            }",
        ));
        assert_eq!(err.kind(), "IvyTypeError");
    }

    #[test]
    fn output_program_must_be_program() {
        let err = compilation_error(check(
            "contract X(k: PublicKey, v: Value) { clause c() { output k(v) } }",
        ));
        assert_eq!(err.message(), "got PublicKey, expected Program");
    }

    #[test]
    fn asset_amount_requires_value() {
        let err = compilation_error(check(
            "contract X(a: AssetAmount, n: Integer, v: Value) {
                clause c() { verify n.assetAmount == a return v }
            }",
        ));
        assert_eq!(err.message(), "got Integer, expected Value");
    }

    #[test]
    fn unresolvable_generic_is_a_bug() {
        let result = check(
            "contract X(a, b: Hashable, v: Value) { clause c() { verify a == b return v } }",
        );
        assert!(matches!(result, Err(IvyError::Bug(_))), "{result:?}");
    }
}
