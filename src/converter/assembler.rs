// Grafts resolved constraints onto converted values

use super::constraint_tree::{ConstraintNode, ConstraintTree, NodeVisitor, ResolvedConstraint};
use super::context::ConversionContext;
use super::diagnostics::DiagnosticCode;
use super::value_converter::{ConvertedValue, ValueConverter};
use crate::{
    Cardinality, Coding, ConstraintKind, Identifier, MemberRequirement, Membership,
    SchemaFragment, Value, ValueSetBinding, tighter_max,
};

/// Final schema of one value with all its constraints applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledValue {
    pub fragment: SchemaFragment,
    pub required: bool,
}

/// What grafting produced for one tree node, before it is placed under its
/// parent.
#[derive(Debug, Default)]
struct GraftedNode {
    is_list: bool,
    replacement: Option<SchemaFragment>,
    /// Constraints on a single occurrence (the items of a list)
    entries: Vec<SchemaFragment>,
    /// Item-count bounds of a list node
    bounds: Option<Cardinality>,
    membership: Option<Membership>,
    required: bool,
}

impl GraftedNode {
    fn item_shape(&mut self, base: SchemaFragment) -> SchemaFragment {
        let base = self.replacement.take().unwrap_or(base);
        base.compose(std::mem::take(&mut self.entries))
    }

    /// Shape of a nested node as a property of its parent.
    fn into_property(mut self) -> SchemaFragment {
        let item = self.item_shape(SchemaFragment::default());
        if !self.is_list {
            return item;
        }
        let mut property = SchemaFragment::default();
        if !item.is_empty() {
            property.items = Some(Box::new(item));
        }
        if let Some(bounds) = self.bounds {
            property.min_items = (bounds.min > 0).then_some(bounds.min);
            property.max_items = bounds.max;
        }
        property.includes = self.membership;
        property
    }
}

struct GraftVisitor<'v, 'c> {
    values: &'v ValueConverter<'v>,
    namespace: &'v str,
    context: &'c mut ConversionContext,
    root: &'v ConvertedValue,
}

impl<'v, 'c> GraftVisitor<'v, 'c> {
    fn reject(&mut self, resolved: &ResolvedConstraint<'_>, code: DiagnosticCode, message: String) {
        resolved.mark_handled();
        self.context.drop_constraint(code, resolved.constraint, message);
    }

    fn applied(&mut self, resolved: &ResolvedConstraint<'_>) {
        resolved.mark_handled();
        self.context.constraint_applied();
    }

    /// Shape admitting `is_a` in place of `target`.
    fn type_shape(&mut self, is_a: &Identifier, target: &Value) -> SchemaFragment {
        let reference_typed = target.is_reference()
            || (target.is_choice() && target.options().iter().all(Value::is_reference));
        if reference_typed {
            self.values.reference_shape(&[is_a], self.context)
        } else {
            self.values.identifier_shape(is_a, self.namespace, self.context)
        }
    }

    /// Apply `constraints` to the node standing for `slot`.
    fn graft(
        &mut self,
        constraints: &[&ResolvedConstraint<'_>],
        slot: Option<&Value>,
        is_root: bool,
        grafted: &mut GraftedNode,
    ) {
        let mut code: Option<&Coding> = None;
        let mut value_set: Option<ValueSetBinding> = None;
        let mut literal: Option<serde_json::Value> = None;
        let mut members: Vec<MemberRequirement> = Vec::new();
        let mut member_card: Option<Cardinality> = None;

        for &resolved in constraints {
            let target = resolved.target;
            match &resolved.constraint.kind {
                ConstraintKind::Cardinality { .. } if !resolved.scoped => {
                    // Already folded into the converted value's cardinality
                    self.applied(resolved);
                }
                ConstraintKind::Cardinality { card } => {
                    if grafted.is_list {
                        let current = grafted.bounds.unwrap_or_else(|| {
                            if is_root {
                                self.root.card
                            } else {
                                slot.unwrap_or(target)
                                    .effective_card()
                                    .unwrap_or_else(Cardinality::exactly_one)
                            }
                        });
                        match current.narrow(card) {
                            Some(narrowed) => {
                                grafted.bounds = Some(narrowed);
                                grafted.required |= narrowed.is_required();
                                self.applied(resolved);
                            }
                            None => self.reject(
                                resolved,
                                DiagnosticCode::CardinalityConflict,
                                format!("cardinality {card} conflicts with {current}"),
                            ),
                        }
                    } else {
                        grafted.required |= card.is_required();
                        self.applied(resolved);
                    }
                }
                ConstraintKind::Type { is_a } => {
                    grafted.replacement = Some(self.type_shape(is_a, target));
                    self.applied(resolved);
                }
                ConstraintKind::Subset { subtypes } => {
                    let shapes = subtypes
                        .iter()
                        .map(|subtype| self.type_shape(subtype, target))
                        .collect();
                    grafted.replacement = Some(SchemaFragment::any_of(shapes));
                    self.applied(resolved);
                }
                ConstraintKind::IncludesType { is_a, card } => {
                    if !grafted.is_list {
                        self.reject(
                            resolved,
                            DiagnosticCode::IncompatibleConstraint,
                            "includes type constraint on a non-list value".to_string(),
                        );
                        continue;
                    }
                    let shape = self.type_shape(is_a, target);
                    members.push(MemberRequirement {
                        items: Box::new(shape),
                        min_items: card.min,
                        max_items: card.max,
                    });
                    member_card = Some(sum_cards(member_card, *card));
                    self.applied(resolved);
                }
                ConstraintKind::IncludesCode { code: included } => {
                    if !grafted.is_list || !target.is_coded() {
                        self.reject(
                            resolved,
                            DiagnosticCode::IncompatibleConstraint,
                            "includes code constraint on a value that is not a coded list"
                                .to_string(),
                        );
                        continue;
                    }
                    let card = Cardinality::unbounded(1);
                    members.push(MemberRequirement {
                        items: Box::new(SchemaFragment {
                            code: Some(included.clone()),
                            ..SchemaFragment::default()
                        }),
                        min_items: card.min,
                        max_items: card.max,
                    });
                    member_card = Some(sum_cards(member_card, card));
                    self.applied(resolved);
                }
                ConstraintKind::Code { code: coding } => {
                    if !target.is_coded() {
                        self.reject(
                            resolved,
                            DiagnosticCode::IncompatibleConstraint,
                            "code constraint on a non-coded value".to_string(),
                        );
                    } else if let Some(existing) = code {
                        self.reject(
                            resolved,
                            DiagnosticCode::DuplicateCode,
                            format!("code already constrained to {existing}"),
                        );
                    } else {
                        code = Some(coding);
                        self.applied(resolved);
                    }
                }
                ConstraintKind::ValueSet {
                    value_set: uri,
                    binding_strength,
                } => {
                    if !target.is_coded() {
                        self.reject(
                            resolved,
                            DiagnosticCode::IncompatibleConstraint,
                            "value set constraint on a non-coded value".to_string(),
                        );
                    } else if let Some(existing) = &value_set {
                        self.reject(
                            resolved,
                            DiagnosticCode::DuplicateValueSet,
                            format!("value set already bound to {}", existing.uri),
                        );
                    } else {
                        value_set = Some(ValueSetBinding {
                            uri: uri.clone(),
                            strength: *binding_strength,
                        });
                        self.applied(resolved);
                    }
                }
                ConstraintKind::Boolean { value } => {
                    let is_boolean = target
                        .effective_identifier()
                        .is_some_and(|id| id.is_primitive() && id.name() == "boolean");
                    if !is_boolean {
                        self.reject(
                            resolved,
                            DiagnosticCode::IncompatibleConstraint,
                            "boolean constraint on a non-boolean value".to_string(),
                        );
                        continue;
                    }
                    self.fix_literal(resolved, &mut literal, serde_json::Value::Bool(*value));
                }
                ConstraintKind::FixedValue { value } => {
                    if !target.is_primitive() {
                        self.reject(
                            resolved,
                            DiagnosticCode::IncompatibleConstraint,
                            "fixed value constraint on a non-primitive value".to_string(),
                        );
                        continue;
                    }
                    self.fix_literal(resolved, &mut literal, value.clone());
                }
            }
        }

        if let Some(coding) = code {
            grafted.entries.push(SchemaFragment {
                code: Some(coding.clone()),
                ..SchemaFragment::default()
            });
        }
        if let Some(binding) = value_set {
            grafted.entries.push(SchemaFragment {
                value_set: Some(binding),
                ..SchemaFragment::default()
            });
        }
        if let Some(literal) = literal {
            grafted.entries.push(SchemaFragment {
                enumeration: vec![literal],
                ..SchemaFragment::default()
            });
        }
        if let Some(card) = member_card {
            grafted.membership = Some(Membership {
                min_items: card.min,
                max_items: card.max,
                members,
            });
        }
    }

    /// Rebuild `choice` with each targeted option narrowed by the constraints
    /// aimed at it. Untargeted options keep their shape.
    fn narrow_choice(
        &mut self,
        choice: &Value,
        by_option: &[&ResolvedConstraint<'_>],
        grafted: &mut GraftedNode,
    ) {
        // Options were already reported on when their own definition was converted
        let mut quiet = self.context.muted();
        let mut narrowed = Vec::new();
        for (index, option) in choice.options().iter().enumerate() {
            let constraints: Vec<&ResolvedConstraint<'_>> = by_option
                .iter()
                .copied()
                .filter(|resolved| std::ptr::eq(resolved.target, option))
                .collect();
            if constraints.is_empty() {
                continue;
            }
            let mut branch = GraftedNode::default();
            self.graft(&constraints, Some(option), false, &mut branch);
            grafted.required |= branch.required;
            let base = self.values.convert(option, self.namespace, &mut quiet).fragment;
            narrowed.push((index, branch.item_shape(base)));
        }
        let shape = self
            .values
            .choice_shape(choice.options(), self.namespace, &mut quiet, narrowed);
        grafted.replacement.get_or_insert(shape);
    }

    fn fix_literal(
        &mut self,
        resolved: &ResolvedConstraint<'_>,
        literal: &mut Option<serde_json::Value>,
        value: serde_json::Value,
    ) {
        match literal {
            Some(existing) if *existing != value => self.reject(
                resolved,
                DiagnosticCode::IncompatibleConstraint,
                format!("value already fixed to {existing}"),
            ),
            _ => {
                *literal = Some(value);
                self.applied(resolved);
            }
        }
    }

    /// Raise the list minimum to the membership minimum, capped at the maximum.
    fn reconcile_bounds(&mut self, min: u32, max: Option<u32>, membership: Option<&Membership>) -> (u32, Option<u32>) {
        let mut min = min;
        if let Some(membership) = membership {
            min = min.max(membership.min_items);
        }
        if let Some(max) = max {
            if min > max {
                self.context.report(
                    DiagnosticCode::CardinalityConflict,
                    format!("list requires at least {min} items but allows at most {max}"),
                );
                min = max;
            }
        }
        (min, max)
    }
}

impl<'a, 'v, 'c> NodeVisitor<'a> for GraftVisitor<'v, 'c> {
    type Output = GraftedNode;

    fn visit(
        &mut self,
        path: &[String],
        node: &ConstraintNode<'a>,
        children: Vec<(String, GraftedNode)>,
    ) -> GraftedNode {
        let is_root = path.is_empty();
        let mut grafted = GraftedNode {
            is_list: if is_root { self.root.is_list } else { node.is_list() },
            ..GraftedNode::default()
        };

        // Constraints that selected a choice option apply to that option only
        let (by_option, own): (Vec<&ResolvedConstraint<'a>>, Vec<&ResolvedConstraint<'a>>) =
            node.constraints.iter().partition(|resolved| {
                node.choice().is_some_and(|choice| {
                    choice.options().iter().any(|option| std::ptr::eq(option, resolved.target))
                })
            });

        self.graft(&own, node.value, is_root, &mut grafted);
        if let Some(choice) = node.choice().filter(|_| !by_option.is_empty()) {
            self.narrow_choice(choice, &by_option, &mut grafted);
        }

        if !is_root && grafted.is_list && (grafted.bounds.is_some() || grafted.membership.is_some()) {
            let current = grafted.bounds.unwrap_or_else(|| {
                node.value
                    .and_then(Value::effective_card)
                    .unwrap_or_else(|| Cardinality::unbounded(0))
            });
            let (min, max) = self.reconcile_bounds(current.min, current.max, grafted.membership.as_ref());
            grafted.bounds = Some(Cardinality::new(min, max));
            grafted.required |= min > 0;
        }

        if !children.is_empty() {
            let mut object = SchemaFragment::default();
            for (name, child) in children {
                if child.required {
                    object.required.push(name.clone());
                }
                object.properties.insert(name, child.into_property());
            }
            grafted.entries.push(object);
        }

        grafted
    }
}

/// Total member requirement; counts saturate at `u32::MAX`.
fn sum_cards(total: Option<Cardinality>, card: Cardinality) -> Cardinality {
    match total {
        None => card,
        Some(total) => Cardinality::new(
            total.min.saturating_add(card.min),
            total.max.zip(card.max).map(|(a, b)| a.saturating_add(b)),
        ),
    }
}

pub struct ConstraintAssembler<'v> {
    values: &'v ValueConverter<'v>,
}

impl<'v> ConstraintAssembler<'v> {
    pub fn new(values: &'v ValueConverter<'v>) -> Self {
        Self { values }
    }

    /// Apply every resolved constraint to the converted value and minimize
    /// the result.
    pub fn assemble<'a>(
        &self,
        converted: &ConvertedValue,
        tree: &ConstraintTree<'a>,
        namespace: &str,
        context: &mut ConversionContext,
    ) -> AssembledValue {
        if tree.is_empty() {
            return AssembledValue {
                fragment: converted.fragment.clone().pruned(),
                required: converted.required,
            };
        }

        let mut visitor = GraftVisitor {
            values: self.values,
            namespace,
            context,
            root: converted,
        };
        let mut root = tree.fold(&mut visitor);
        let mut required = converted.required || root.required;

        let fragment = if converted.is_list {
            let mut array = converted.fragment.clone();
            let base_items = array.items.take().map(|items| *items).unwrap_or_default();
            let item = root.item_shape(base_items);
            if !item.is_empty() {
                array.items = Some(Box::new(item));
            }

            let mut min = array.min_items.unwrap_or(0);
            let mut max = array.max_items;
            if let Some(bounds) = root.bounds {
                min = min.max(bounds.min);
                max = tighter_max(max, bounds.max);
            }
            let (min, max) = visitor.reconcile_bounds(min, max, root.membership.as_ref());
            array.min_items = (min > 0).then_some(min);
            array.max_items = max;
            array.includes = root.membership.take();
            required |= min > 0;
            array
        } else {
            root.item_shape(converted.fragment.clone())
        };

        let fragment = fragment.pruned();
        for constraint in tree.unhandled() {
            visitor.context.report(
                DiagnosticCode::UnconsumedConstraint,
                format!("{constraint} was resolved but never applied"),
            );
        }

        AssembledValue { fragment, required }
    }
}
