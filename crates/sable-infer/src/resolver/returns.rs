// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Inference of `?` return types from return statements.

use std::collections::HashSet;

use itertools::Itertools;
use sable_ast::stmt::StmtKind;
use sable_ast::{DeclId, Span};
use sable_types::{is_a_rigid, is_a_under, unifiable, ClassType, Substitution, Type, TypeError, TypeVarId};

use super::Resolver;

impl<'a> Resolver<'a> {
    /// Bind the placeholder return variable of `id` to the type its return
    /// statements agree on.
    pub(super) fn infer_return(&mut self, id: DeclId) -> Result<(), TypeError> {
        let decl = self.decl(id);
        let (name, span) = (decl.name.clone(), decl.span);
        let cannot_determine = || TypeError::CannotDetermine {
            name: name.clone(),
            span,
        };
        let (returns, body_scope) = match decl.as_procedure() {
            Some(p) => (p.returns.clone(), p.body_scope),
            None => return Err(TypeError::internal("return inferred for a non-procedure", span)),
        };
        let Some(placeholder) = self.pending_returns.remove(&id) else {
            return Err(TypeError::internal("procedure has no pending return", span));
        };

        // Candidate types of each return statement.
        let mut branches: Vec<Vec<Type>> = Vec::new();
        for node in returns {
            let Some(stmt) = self.index.stmt(node) else { continue };
            let StmtKind::Return(value) = &stmt.kind else { continue };
            let types = match value {
                Some(value) => self
                    .contexts
                    .get(&value.id)
                    .map(|found| found.iter().map(|c| self.subst.apply(&c.ty)).unique().collect_vec())
                    .unwrap_or_default(),
                None => vec![self.core.void()],
            };
            if types.is_empty() {
                return Err(TypeError::internal("return value was never collected", stmt.span));
            }
            branches.push(types);
        }

        let result = if branches.is_empty() {
            self.core.void()
        } else if branches.iter().flatten().any(|t| !t.free_vars().is_empty()) {
            let rigid = self.rigid_at(body_scope);
            self.unify_branches(&branches, &rigid).ok_or_else(cannot_determine)?
        } else {
            common_ancestor(&branches, span)?.ok_or_else(cannot_determine)?
        };

        if result != Type::Var(placeholder.clone()) {
            self.subst = is_a_under(&result, &Type::Var(placeholder), &self.subst).map_err(|_| cannot_determine())?;
        }
        tracing::debug!(procedure = %name, ret = %self.subst.apply(&result), "return type inferred");
        Ok(())
    }

    /// With variables involved every branch must have a single type, and
    /// they must all unify with each other. Generic parameters of the
    /// procedure stay as they are.
    fn unify_branches(&mut self, branches: &[Vec<Type>], rigid: &HashSet<TypeVarId>) -> Option<Type> {
        if branches.iter().any(|b| b.len() != 1) {
            return None;
        }
        let first = &branches[0][0];
        let mut acc = Substitution::new();
        for branch in &branches[1..] {
            let ty = &branch[0];
            acc = is_a_rigid(ty, first, &acc, rigid)
                .or_else(|_| is_a_rigid(first, ty, &acc, rigid))
                .ok()?;
        }
        self.absorb(&acc);
        Some(self.subst.apply(&acc.apply(first)))
    }
}

/// The most derived class every branch can be viewed as. `None` when two
/// branches are unrelated or the choice is a tie.
fn common_ancestor(branches: &[Vec<Type>], span: Span) -> Result<Option<Type>, TypeError> {
    let related = |a: &[Type], b: &[Type]| a.iter().any(|x| b.iter().any(|y| unifiable(x, y)));
    for (i, a) in branches.iter().enumerate() {
        if branches[i + 1..].iter().any(|b| !related(a.as_slice(), b.as_slice())) {
            return Ok(None);
        }
    }

    let lineage = |branch: &[Type]| -> Vec<Type> {
        branch
            .iter()
            .flat_map(|t| match t {
                Type::Class(c) => c.ancestors().into_iter().map(Type::Class).collect_vec(),
                other => vec![other.clone()],
            })
            .unique()
            .collect()
    };
    let mut common = lineage(branches[0].as_slice());
    for branch in &branches[1..] {
        let theirs = lineage(branch.as_slice());
        common.retain(|t| theirs.contains(t));
    }

    match common.as_slice() {
        [] => Err(TypeError::internal("related return types share no ancestor", span)),
        [only] => Ok(Some(only.clone())),
        _ => {
            let depth = |t: &Type| t.as_class().and_then(ClassType::distance_to_root);
            let deepest = common.iter().filter_map(depth).max();
            let at_max = common.iter().filter(|t| depth(*t) == deepest).collect_vec();
            match at_max.as_slice() {
                [one] => Ok(Some((*one).clone())),
                _ => Ok(None),
            }
        }
    }
}
