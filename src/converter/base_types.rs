use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};

use super::context::ConversionContext;
use super::diagnostics::DiagnosticCode;
use crate::{Identifier, Specifications};

/// Computes base-type closures over the `based_on` graph.
///
/// Results are memoized for the lifetime of the resolver. The graph may be
/// cyclic in malformed input; every walk keeps its own visited set.
pub struct BaseTypeResolver<'a> {
    specs: &'a Specifications,
    memo: RefCell<HashMap<Identifier, BTreeSet<Identifier>>>,
}

impl<'a> BaseTypeResolver<'a> {
    pub fn new(specs: &'a Specifications) -> Self {
        Self {
            specs,
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// The identifier itself plus every transitive ancestor.
    pub fn closure(
        &self,
        identifier: &Identifier,
        context: &mut ConversionContext,
    ) -> BTreeSet<Identifier> {
        if let Some(cached) = self.memo.borrow().get(identifier) {
            return cached.clone();
        }

        let mut visited = BTreeSet::new();
        self.walk(identifier, &mut visited, context);
        self.memo
            .borrow_mut()
            .insert(identifier.clone(), visited.clone());
        visited
    }

    fn walk(
        &self,
        identifier: &Identifier,
        visited: &mut BTreeSet<Identifier>,
        context: &mut ConversionContext,
    ) {
        if !visited.insert(identifier.clone()) || identifier.is_primitive() {
            return;
        }

        let Some(element) = self.specs.find(identifier) else {
            context.report(
                DiagnosticCode::UnresolvedIdentifier,
                format!("Cannot resolve base types of {identifier}: no definition found"),
            );
            return;
        };

        for base in element.base_identifiers() {
            self.walk(base, visited, context);
        }
    }

    pub fn has_base_type(
        &self,
        identifier: &Identifier,
        candidate: &Identifier,
        context: &mut ConversionContext,
    ) -> bool {
        identifier == candidate || self.closure(identifier, context).contains(candidate)
    }

    /// True if the element or one of its ancestors is an entry.
    pub fn has_entry_ancestor(&self, identifier: &Identifier, context: &mut ConversionContext) -> bool {
        self.closure(identifier, context)
            .iter()
            .filter(|ancestor| *ancestor != identifier)
            .filter_map(|ancestor| self.specs.find(ancestor))
            .any(|element| element.is_entry)
    }
}
