//! Inference scope: bindings, pending constraints and fresh variables.

use ivy_core::{BugError, Span, Type, TypeClass};
use rustc_hash::FxHashMap;

/// A pending equality between an inferred type and the type its context
/// requires.
#[derive(Debug, Clone)]
pub struct Constraint {
    pub actual: Type,
    pub expected: Type,
    pub span: Span,
}

/// A requirement that a type belongs to a type class once solved.
#[derive(Debug, Clone)]
pub struct ClassConstraint {
    pub ty: Type,
    pub class: TypeClass,
    pub span: Span,
}

/// Per-compile inference state. Discarded once types are applied back
/// onto the parameters.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: FxHashMap<String, Type>,
    constraints: Vec<Constraint>,
    class_constraints: Vec<ClassConstraint>,
    next_var: u32,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// A type variable not used anywhere else in this scope.
    pub fn fresh(&mut self) -> Type {
        self.next_var += 1;
        Type::Var(format!("T{}", self.next_var))
    }

    pub fn bind(&mut self, key: impl Into<String>, ty: Type) {
        self.bindings.insert(key.into(), ty);
    }

    pub fn lookup(&self, key: &str) -> Result<&Type, BugError> {
        self.bindings
            .get(key)
            .ok_or_else(|| BugError::new(format!("no type bound for '{key}'")))
    }

    pub fn constrain(&mut self, actual: Type, expected: Type, span: Span) {
        self.constraints.push(Constraint {
            actual,
            expected,
            span,
        });
    }

    pub fn require_class(&mut self, ty: Type, class: TypeClass, span: Span) {
        self.class_constraints.push(ClassConstraint { ty, class, span });
    }

    /// Replace any type-class placeholders inside `ty` with fresh
    /// constrained variables.
    pub fn instantiate_generics(&mut self, ty: &Type, span: Span) -> Type {
        match ty {
            Type::Generic(class) => {
                let var = self.fresh();
                self.require_class(var.clone(), *class, span);
                var
            }
            Type::Hash { function, input } => {
                Type::hash(*function, self.instantiate_generics(input, span))
            }
            Type::List(element) => Type::list(self.instantiate_generics(element, span)),
            Type::Primitive(_) | Type::Var(_) | Type::Other(_) => ty.clone(),
        }
    }

    /// Rename the given signature variables to fresh ones throughout `types`.
    pub fn rename<'a>(
        &mut self,
        variables: &[String],
        types: impl IntoIterator<Item = &'a Type>,
    ) -> Vec<Type> {
        let renaming: FxHashMap<&str, Type> = variables
            .iter()
            .map(|name| (name.as_str(), self.fresh()))
            .collect();
        types
            .into_iter()
            .map(|ty| substitute(ty, &renaming))
            .collect()
    }

    /// Take the accumulated constraints, leaving the scope empty of them.
    pub fn take_constraints(&mut self) -> (Vec<Constraint>, Vec<ClassConstraint>) {
        (
            std::mem::take(&mut self.constraints),
            std::mem::take(&mut self.class_constraints),
        )
    }
}

fn substitute(ty: &Type, renaming: &FxHashMap<&str, Type>) -> Type {
    match ty {
        Type::Var(name) => renaming.get(name.as_str()).cloned().unwrap_or_else(|| ty.clone()),
        Type::Hash { function, input } => Type::hash(*function, substitute(input, renaming)),
        Type::List(element) => Type::list(substitute(element, renaming)),
        Type::Primitive(_) | Type::Other(_) | Type::Generic(_) => ty.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ivy_core::HashFunction;

    #[test]
    fn fresh_variables_are_numbered() {
        let mut scope = Scope::new();
        assert_eq!(scope.fresh(), Type::var("T1"));
        assert_eq!(scope.fresh(), Type::var("T2"));
    }

    #[test]
    fn rename_is_consistent_within_one_call() {
        let mut scope = Scope::new();
        let input = Type::var("A");
        let output = Type::hash(HashFunction::Sha256, Type::var("A"));
        let renamed = scope.rename(&["A".to_string()], [&input, &output]);
        assert_eq!(renamed[0], Type::var("T1"));
        assert_eq!(renamed[1], Type::hash(HashFunction::Sha256, Type::var("T1")));
    }

    #[test]
    fn generics_become_constrained_variables() {
        let mut scope = Scope::new();
        let ty = Type::hash(HashFunction::Sha3, Type::Generic(TypeClass::HASHABLE));
        let instantiated = scope.instantiate_generics(&ty, Span::default());
        assert_eq!(instantiated, Type::hash(HashFunction::Sha3, Type::var("T1")));
        let (_, classes) = scope.take_constraints();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].class, TypeClass::HASHABLE);
    }

    #[test]
    fn missing_binding_is_a_bug() {
        let scope = Scope::new();
        assert!(scope.lookup("nope").is_err());
    }
}
