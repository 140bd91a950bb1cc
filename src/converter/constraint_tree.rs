use std::cell::Cell;

use indexmap::IndexMap;

use crate::{Constraint, Value};

/// A constraint whose path has been resolved against the type graph.
#[derive(Debug)]
pub struct ResolvedConstraint<'a> {
    pub constraint: &'a Constraint,
    /// Property names leading to the constrained node, each with the value
    /// it resolved to
    pub path: Vec<(String, &'a Value)>,
    /// The value the constraint lands on
    pub target: &'a Value,
    /// False when the constraint applies directly to the decorated value
    pub scoped: bool,
    handled: Cell<bool>,
}

impl<'a> ResolvedConstraint<'a> {
    pub fn unscoped(constraint: &'a Constraint, value: &'a Value) -> Self {
        Self {
            constraint,
            path: Vec::new(),
            target: value,
            scoped: false,
            handled: Cell::new(false),
        }
    }

    pub fn scoped(
        constraint: &'a Constraint,
        path: Vec<(String, &'a Value)>,
        target: &'a Value,
    ) -> Self {
        Self {
            constraint,
            path,
            target,
            scoped: true,
            handled: Cell::new(false),
        }
    }

    /// Mark the constraint as applied or explicitly rejected.
    pub fn mark_handled(&self) {
        self.handled.set(true);
    }

    pub fn is_handled(&self) -> bool {
        self.handled.get()
    }
}

#[derive(Debug, Default)]
pub struct ConstraintNode<'a> {
    /// The value this node's path segment resolved to, or the decorated
    /// value at the root
    pub value: Option<&'a Value>,
    pub constraints: Vec<ResolvedConstraint<'a>>,
    pub children: IndexMap<String, ConstraintNode<'a>>,
}

impl<'a> ConstraintNode<'a> {
    /// Whether this node stands for a list, even when only its descendants
    /// carry constraints.
    pub fn is_list(&self) -> bool {
        self.value.is_some_and(Value::is_or_was_list)
    }

    /// The choice at this node, if constraints here may target its options.
    pub fn choice(&self) -> Option<&'a Value> {
        self.value.filter(|value| value.is_choice())
    }
}

/// Per-node callback for [`ConstraintTree::fold`]. Children are visited
/// before their parent and their outputs handed over in insertion order.
pub trait NodeVisitor<'a> {
    type Output;

    fn visit(
        &mut self,
        path: &[String],
        node: &ConstraintNode<'a>,
        children: Vec<(String, Self::Output)>,
    ) -> Self::Output;
}

/// Constraints of one value indexed by their resolved path.
#[derive(Debug, Default)]
pub struct ConstraintTree<'a> {
    root: ConstraintNode<'a>,
}

impl<'a> ConstraintTree<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A tree whose root stands for `value`.
    pub fn rooted_at(value: &'a Value) -> Self {
        Self {
            root: ConstraintNode {
                value: Some(value),
                ..ConstraintNode::default()
            },
        }
    }

    pub fn insert(&mut self, resolved: ResolvedConstraint<'a>) {
        let mut node = &mut self.root;
        for (segment, value) in &resolved.path {
            node = node.children.entry(segment.clone()).or_default();
            node.value.get_or_insert(*value);
        }
        node.constraints.push(resolved);
    }

    pub fn root(&self) -> &ConstraintNode<'a> {
        &self.root
    }

    pub fn len(&self) -> usize {
        struct Count;
        impl<'a> NodeVisitor<'a> for Count {
            type Output = usize;
            fn visit(
                &mut self,
                _path: &[String],
                node: &ConstraintNode<'a>,
                children: Vec<(String, usize)>,
            ) -> usize {
                node.constraints.len() + children.into_iter().map(|(_, n)| n).sum::<usize>()
            }
        }
        self.fold(&mut Count)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Post-order walk shared by grafting and the unhandled-constraint audit.
    pub fn fold<V: NodeVisitor<'a>>(&self, visitor: &mut V) -> V::Output {
        let mut path = Vec::new();
        fold_node(&self.root, &mut path, visitor)
    }

    /// Constraints no visitor marked as handled.
    pub fn unhandled(&self) -> Vec<&'a Constraint> {
        struct Unhandled<'a> {
            found: Vec<&'a Constraint>,
        }
        impl<'a> NodeVisitor<'a> for Unhandled<'a> {
            type Output = ();
            fn visit(&mut self, _path: &[String], node: &ConstraintNode<'a>, _children: Vec<(String, ())>) {
                self.found.extend(
                    node.constraints
                        .iter()
                        .filter(|resolved| !resolved.is_handled())
                        .map(|resolved| resolved.constraint),
                );
            }
        }
        let mut audit = Unhandled { found: Vec::new() };
        self.fold(&mut audit);
        audit.found
    }
}

fn fold_node<'a, V: NodeVisitor<'a>>(
    node: &ConstraintNode<'a>,
    path: &mut Vec<String>,
    visitor: &mut V,
) -> V::Output {
    let mut children = Vec::with_capacity(node.children.len());
    for (name, child) in &node.children {
        path.push(name.clone());
        let output = fold_node(child, path, visitor);
        path.pop();
        children.push((name.clone(), output));
    }
    visitor.visit(path, node, children)
}
