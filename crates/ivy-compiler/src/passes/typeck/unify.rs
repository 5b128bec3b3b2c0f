//! Unification over a persistent substitution map.

use ivy_core::{CompilationError, Span, Type};
use rustc_hash::FxHashMap;

/// Bindings from type-variable names to types.
#[derive(Debug, Default, Clone)]
pub struct Substitution {
    bindings: FxHashMap<String, Type>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every bound variable in `ty`, following chains.
    pub fn apply(&self, ty: &Type) -> Type {
        match ty {
            Type::Var(name) => match self.bindings.get(name) {
                Some(bound) => self.apply(bound),
                None => ty.clone(),
            },
            Type::Hash { function, input } => Type::hash(*function, self.apply(input)),
            Type::List(element) => Type::list(self.apply(element)),
            Type::Primitive(_) | Type::Other(_) | Type::Generic(_) => ty.clone(),
        }
    }

    /// Make `actual` and `expected` equal, extending the substitution.
    pub fn unify(
        &mut self,
        actual: &Type,
        expected: &Type,
        span: Span,
    ) -> Result<(), CompilationError> {
        let actual = self.apply(actual);
        let expected = self.apply(expected);

        if actual == expected {
            return Ok(());
        }

        match (&actual, &expected) {
            (Type::Var(name), other) | (other, Type::Var(name)) => self.bind(name, other, span),
            (
                Type::Hash { function: f1, input: i1 },
                Type::Hash { function: f2, input: i2 },
            ) if f1 == f2 => self.unify(i1, i2, span),
            (Type::List(e1), Type::List(e2)) => self.unify(e1, e2, span),
            _ => Err(mismatch(&actual, &expected, span)),
        }
    }

    fn bind(&mut self, name: &str, ty: &Type, span: Span) -> Result<(), CompilationError> {
        if matches!(ty, Type::List(_) | Type::Other(_)) {
            return Err(CompilationError::type_error(
                format!("type variable {name} cannot stand for {ty}"),
                span,
            ));
        }
        if ty.mentions(name) {
            return Err(CompilationError::type_error(
                format!("infinite type: {name} = {ty}"),
                span,
            ));
        }
        self.bindings.insert(name.to_string(), ty.clone());
        Ok(())
    }
}

fn mismatch(actual: &Type, expected: &Type, span: Span) -> CompilationError {
    CompilationError::type_error(format!("got {actual}, expected {expected}"), span)
}
