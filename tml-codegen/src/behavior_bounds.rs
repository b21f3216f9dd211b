// Behavior bounds verification for generic instantiation
// Checks that concrete type arguments satisfy declared bounds

use std::collections::{BTreeSet, HashMap};
use tml_ast::{BehaviorBound, Type, TypeParam, WherePredicate};

use crate::builtin_contracts::has_builtin_contract;

/// Key under which behavior implementations are registered for a type.
/// Named types key by base name, everything else by display form.
pub fn impl_key(ty: &Type) -> String {
    match ty {
        Type::Named { name, .. } => name.clone(),
        other => other.to_string(),
    }
}

/// A recorded where-clause constraint, consulted during bounded-generic
/// method dispatch and checked at instantiation time.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereConstraint {
    pub param: String,
    /// Simple behavior names required on the parameter
    pub behaviors: Vec<String>,
    /// Bounds that carry their own type arguments, e.g. Comparable[T]
    pub parameterized: Vec<BehaviorBound>,
}

/// Collect constraints from generic parameter bounds plus the where clause.
/// Declaration order is preserved so diagnostics are stable.
pub fn build_where_constraints(
    type_params: &[TypeParam],
    where_clause: &[WherePredicate],
) -> Vec<WhereConstraint> {
    let mut constraints: Vec<WhereConstraint> = Vec::new();

    fn push_bounds(param: &str, bounds: &[BehaviorBound], out: &mut Vec<WhereConstraint>) {
        if bounds.is_empty() {
            return;
        }
        let index = match out.iter().position(|c| c.param == param) {
            Some(index) => index,
            None => {
                out.push(WhereConstraint {
                    param: param.to_string(),
                    behaviors: Vec::new(),
                    parameterized: Vec::new(),
                });
                out.len() - 1
            }
        };
        let Some(entry) = out.get_mut(index) else {
            return;
        };
        for bound in bounds {
            if bound.type_args.is_empty() {
                if !entry.behaviors.iter().any(|b| b == &bound.name) {
                    entry.behaviors.push(bound.name.clone());
                }
            } else if !entry.parameterized.contains(bound) {
                entry.parameterized.push(bound.clone());
            }
        }
    }

    for param in type_params {
        push_bounds(&param.name, &param.bounds, &mut constraints);
    }
    for predicate in where_clause {
        push_bounds(&predicate.param, &predicate.bounds, &mut constraints);
    }

    constraints
}

/// Tracks which behaviors each type implements and verifies bounds
/// against that table at instantiation time.
#[derive(Debug, Default)]
pub struct BehaviorBoundsChecker {
    // Maps type keys to their behavior implementations
    // Example: "Point" -> {"Display", "Duplicate"}
    type_impls: HashMap<String, BTreeSet<String>>,
}

impl BehaviorBoundsChecker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `impl <behavior> for <type>`. Re-registration is a no-op.
    pub fn register_impl(&mut self, ty: &Type, behavior: &str) {
        self.type_impls
            .entry(impl_key(ty))
            .or_default()
            .insert(behavior.to_string());
    }

    /// Behaviors implemented by a type, builtin contracts excluded
    pub fn registered_behaviors(&self, ty: &Type) -> BTreeSet<String> {
        self.type_impls
            .get(&impl_key(ty))
            .cloned()
            .unwrap_or_default()
    }

    /// Does `ty` satisfy `behavior`, via builtin contract or registered impl?
    pub fn implements(&self, ty: &Type, behavior: &str) -> bool {
        if has_builtin_contract(ty, behavior) {
            return true;
        }
        self.type_impls
            .get(&impl_key(ty))
            .map(|set| set.contains(behavior))
            .unwrap_or(false)
    }

    /// Verify that a substitution satisfies every recorded constraint.
    /// Returns the first violation as (param, concrete type, behavior).
    pub fn check_constraints(
        &self,
        constraints: &[WhereConstraint],
        substitution: &HashMap<String, Type>,
    ) -> Result<(), (String, Type, String)> {
        for constraint in constraints {
            let Some(concrete) = substitution.get(&constraint.param) else {
                // Unsubstituted parameter is the instantiator's bug and is
                // reported there as UnresolvedGeneric
                continue;
            };
            for behavior in &constraint.behaviors {
                if !self.implements(concrete, behavior) {
                    return Err((constraint.param.clone(), concrete.clone(), behavior.clone()));
                }
            }
            for bound in &constraint.parameterized {
                if !self.implements(concrete, &bound.name) {
                    return Err((
                        constraint.param.clone(),
                        concrete.clone(),
                        bound.name.clone(),
                    ));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn substitution(pairs: &[(&str, Type)]) -> HashMap<String, Type> {
        pairs
            .iter()
            .map(|(name, ty)| (name.to_string(), ty.clone()))
            .collect()
    }

    #[test]
    fn builtin_contracts_satisfy_bounds() {
        let checker = BehaviorBoundsChecker::new();
        let constraints = build_where_constraints(
            &[TypeParam {
                name: "T".into(),
                bounds: vec![BehaviorBound::simple("Display")],
            }],
            &[],
        );
        assert!(checker
            .check_constraints(&constraints, &substitution(&[("T", Type::I64)]))
            .is_ok());
    }

    #[test]
    fn missing_impl_is_reported() {
        let checker = BehaviorBoundsChecker::new();
        let constraints = build_where_constraints(
            &[TypeParam {
                name: "T".into(),
                bounds: vec![BehaviorBound::simple("Display")],
            }],
            &[],
        );
        let err = checker
            .check_constraints(&constraints, &substitution(&[("T", Type::named("Blob"))]))
            .unwrap_err();
        assert_eq!(err.0, "T");
        assert_eq!(err.2, "Display");
    }

    #[test]
    fn registration_is_idempotent() {
        let mut checker = BehaviorBoundsChecker::new();
        let point = Type::named("Point");
        checker.register_impl(&point, "Display");
        checker.register_impl(&point, "Display");
        assert_eq!(checker.registered_behaviors(&point).len(), 1);
        assert!(checker.implements(&point, "Display"));
    }

    #[test]
    fn where_clause_merges_with_param_bounds() {
        let constraints = build_where_constraints(
            &[TypeParam {
                name: "T".into(),
                bounds: vec![BehaviorBound::simple("Eq")],
            }],
            &[WherePredicate {
                param: "T".into(),
                bounds: vec![BehaviorBound::simple("Hash"), BehaviorBound::simple("Eq")],
            }],
        );
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].behaviors, vec!["Eq", "Hash"]);
    }
}
