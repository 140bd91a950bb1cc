// Resolves constraint paths against the type graph

use super::base_types::BaseTypeResolver;
use super::context::ConversionContext;
use super::diagnostics::DiagnosticCode;
use crate::{
    Constraint, ConstraintKind, DataElement, Identifier, Specifications, VALUE_KEYWORD, Value,
};

/// Where a constraint lands relative to the value it decorates.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// Applies to the decorated value itself
    Unscoped,
    /// Applies to a nested value reached through `path` property names
    /// (`Value` for an element's value slot), each paired with the value it
    /// resolved to. `target` differs from the last of these when a choice
    /// option was selected.
    Scoped {
        path: Vec<(String, &'a Value)>,
        target: &'a Value,
    },
    /// Could not be resolved; already reported
    Dropped,
}

#[derive(Debug)]
struct Walk<'a> {
    path: Vec<(String, &'a Value)>,
    target: &'a Value,
}

impl<'a> Walk<'a> {
    fn descend(mut self, name: &str, value: &'a Value) -> Self {
        self.path.push((name.to_string(), value));
        self.target = value;
        self
    }
}

#[derive(Debug)]
struct PathFailure {
    code: DiagnosticCode,
    message: String,
}

impl PathFailure {
    fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    fn unresolved(message: impl Into<String>) -> Self {
        Self::new(DiagnosticCode::UnresolvedConstraintPath, message)
    }
}

pub struct PathResolver<'a> {
    specs: &'a Specifications,
    base_types: &'a BaseTypeResolver<'a>,
}

impl<'a> PathResolver<'a> {
    pub fn new(specs: &'a Specifications, base_types: &'a BaseTypeResolver<'a>) -> Self {
        Self { specs, base_types }
    }

    pub fn resolve(
        &self,
        constraint: &Constraint,
        value: &'a Value,
        context: &mut ConversionContext,
    ) -> Resolution<'a> {
        if constraint.is_unscoped() {
            return Resolution::Unscoped;
        }

        let unnormalized = constraint.on_value
            || constraint
                .path
                .last()
                .is_some_and(Identifier::is_value_keyword);
        let outcome = if unnormalized {
            self.resolve_unnormalized(constraint, value, context)
        } else {
            self.walk(constraint, &constraint.path, value, context)
        };

        match outcome {
            Ok(walk) if walk.path.is_empty() && std::ptr::eq(walk.target, value) => {
                Resolution::Unscoped
            }
            Ok(walk) => Resolution::Scoped {
                path: walk.path,
                target: walk.target,
            },
            Err(failure) => {
                context.drop_constraint(failure.code, constraint, failure.message);
                Resolution::Dropped
            }
        }
    }

    fn walk(
        &self,
        constraint: &Constraint,
        segments: &[Identifier],
        value: &'a Value,
        context: &mut ConversionContext,
    ) -> Result<Walk<'a>, PathFailure> {
        let mut walk = Walk {
            path: Vec::new(),
            target: value,
        };
        for (index, segment) in segments.iter().enumerate() {
            let last = index + 1 == segments.len();
            walk = self.step(walk, constraint, segment, last, value, context)?;
        }
        Ok(walk)
    }

    fn step(
        &self,
        walk: Walk<'a>,
        constraint: &Constraint,
        segment: &Identifier,
        last: bool,
        decorated: &'a Value,
        context: &mut ConversionContext,
    ) -> Result<Walk<'a>, PathFailure> {
        let element = self.element_of(walk.target, segment)?;

        if segment.is_value_keyword() {
            let value = element.value.as_ref().ok_or_else(|| {
                PathFailure::unresolved(format!("{} has no value", element.identifier))
            })?;
            return Ok(walk.descend(VALUE_KEYWORD, value));
        }

        if last && segment.is_primitive() {
            return match element.value.as_ref() {
                Some(value) if self.value_matches(value, segment, context) => {
                    Ok(walk.descend(VALUE_KEYWORD, value))
                }
                _ => Err(PathFailure::unresolved(format!(
                    "{segment} does not match the value of {}",
                    element.identifier
                ))),
            };
        }

        if let Some(field) = element
            .fields
            .iter()
            .find(|field| identifies(field, segment))
        {
            return Ok(walk.descend(segment.name(), field));
        }

        if let Some(value) = element.value.as_ref().filter(|v| identifies(v, segment)) {
            return Ok(walk.descend(VALUE_KEYWORD, value));
        }

        let from_includes = walk
            .target
            .constraints
            .iter()
            .chain(decorated.constraints.iter())
            .filter(|c| !std::ptr::eq(*c, constraint))
            .any(|c| {
                matches!(&c.kind, ConstraintKind::IncludesType { is_a, .. } if is_a == segment)
            });
        if from_includes {
            return Err(PathFailure::new(
                DiagnosticCode::IncludesTypePath,
                format!(
                    "{segment} is only introduced by an includes constraint; member constraints are not representable"
                ),
            ));
        }

        Err(PathFailure::unresolved(format!(
            "{segment} matches neither the value nor a field of {}",
            element.identifier
        )))
    }

    fn resolve_unnormalized(
        &self,
        constraint: &Constraint,
        value: &'a Value,
        context: &mut ConversionContext,
    ) -> Result<Walk<'a>, PathFailure> {
        let segments = match constraint.path.split_last() {
            Some((last, rest)) if last.is_value_keyword() => rest,
            _ => constraint.path.as_slice(),
        };
        let walk = self.walk(constraint, segments, value, context)?;

        let mut walk = if walk.target.is_choice() {
            walk
        } else {
            let keyword = Identifier::value_keyword();
            let element = self.element_of(walk.target, &keyword)?;
            let value = element.value.as_ref().ok_or_else(|| {
                PathFailure::unresolved(format!("{} has no value", element.identifier))
            })?;
            if !value.is_choice() {
                return Err(PathFailure::unresolved(format!(
                    "the value of {} is not a choice",
                    element.identifier
                )));
            }
            walk.descend(VALUE_KEYWORD, value)
        };

        walk.target = self.select_option(walk.target, constraint, context)?;
        Ok(walk)
    }

    /// Choose the choice option a constraint targets. Exact identifier
    /// matches win over base-type matches.
    fn select_option(
        &self,
        choice: &'a Value,
        constraint: &Constraint,
        context: &mut ConversionContext,
    ) -> Result<&'a Value, PathFailure> {
        let options = choice.options();
        let candidates: Vec<&'a Value> = match constraint.declared_type() {
            Some(is_a) => {
                let exact: Vec<&'a Value> = options.iter().filter(|o| identifies(o, is_a)).collect();
                if exact.is_empty() {
                    let mut derived = Vec::new();
                    for option in options {
                        if let Some(id) = option.effective_identifier() {
                            if self.base_types.has_base_type(is_a, id, context) {
                                derived.push(option);
                            }
                        }
                    }
                    derived.truncate(1);
                    derived
                } else {
                    exact.into_iter().take(1).collect()
                }
            }
            None => {
                let mut accepted = Vec::new();
                for option in options {
                    if self.option_accepts(option, constraint, context) {
                        accepted.push(option);
                    }
                }
                accepted
            }
        };

        match candidates.as_slice() {
            [option] if option.effective_card().is_none_or(|card| card.is_exactly_one()) => {
                Ok(option)
            }
            [option] => Err(PathFailure::new(
                DiagnosticCode::ChoiceOptionCardinality,
                format!(
                    "choice option {} must have cardinality 1..1 to be constrained",
                    option
                        .effective_identifier()
                        .map(Identifier::to_string)
                        .unwrap_or_default()
                ),
            )),
            [] => Err(PathFailure::new(
                DiagnosticCode::ChoiceOptionNotFound,
                "no choice option matches the constraint",
            )),
            _ => Err(PathFailure::new(
                DiagnosticCode::ChoiceOptionNotFound,
                "several choice options match the constraint",
            )),
        }
    }

    fn option_accepts(
        &self,
        option: &Value,
        constraint: &Constraint,
        context: &mut ConversionContext,
    ) -> bool {
        let primitive = option
            .effective_identifier()
            .filter(|id| id.is_primitive())
            .map(Identifier::name);
        match &constraint.kind {
            ConstraintKind::Code { .. }
            | ConstraintKind::IncludesCode { .. }
            | ConstraintKind::ValueSet { .. } => option.is_coded(),
            ConstraintKind::Boolean { .. } => primitive == Some("boolean"),
            ConstraintKind::FixedValue { value } => {
                primitive.is_some_and(|name| literal_fits(name, value))
            }
            ConstraintKind::Subset { subtypes } => match option.effective_identifier() {
                Some(id) if !subtypes.is_empty() => subtypes
                    .iter()
                    .all(|subtype| self.base_types.has_base_type(subtype, id, context)),
                _ => false,
            },
            ConstraintKind::Cardinality { .. }
            | ConstraintKind::Type { .. }
            | ConstraintKind::IncludesType { .. } => false,
        }
    }

    /// A value matches a type segment if it is, or is derived from, that type.
    /// For a choice, an exact option match is tried before base types.
    fn value_matches(
        &self,
        value: &Value,
        segment: &Identifier,
        context: &mut ConversionContext,
    ) -> bool {
        if value.is_choice() {
            if value.options().iter().any(|o| identifies(o, segment)) {
                return true;
            }
            return value.options().iter().any(|option| {
                option
                    .effective_identifier()
                    .is_some_and(|id| self.base_types.has_base_type(segment, id, context))
            });
        }
        identifies(value, segment)
            || value
                .effective_identifier()
                .is_some_and(|id| self.base_types.has_base_type(segment, id, context))
    }

    /// The definition to descend into from `target`.
    fn element_of(
        &self,
        target: &Value,
        segment: &Identifier,
    ) -> Result<&'a DataElement, PathFailure> {
        let identifier = match target.effective_identifier() {
            Some(id) if !target.is_choice() && !target.is_reference() => id,
            _ => {
                return Err(PathFailure::unresolved(format!(
                    "cannot resolve {segment}: the constrained value has no structure to descend into"
                )));
            }
        };
        if identifier.is_primitive() {
            return Err(PathFailure::unresolved(format!(
                "cannot resolve {segment} inside primitive {identifier}"
            )));
        }
        self.specs.find(identifier).ok_or_else(|| {
            PathFailure::new(
                DiagnosticCode::UnresolvedIdentifier,
                format!("no definition found for {identifier}"),
            )
        })
    }
}

fn identifies(value: &Value, segment: &Identifier) -> bool {
    value.identifier.as_ref() == Some(segment) || value.effective_identifier() == Some(segment)
}

fn literal_fits(primitive: &str, literal: &serde_json::Value) -> bool {
    match literal {
        serde_json::Value::Bool(_) => primitive == "boolean",
        serde_json::Value::Number(n) if n.is_f64() => primitive == "decimal",
        serde_json::Value::Number(_) => {
            matches!(primitive, "integer" | "unsignedInt" | "positiveInt" | "decimal")
        }
        serde_json::Value::String(_) => !matches!(
            primitive,
            "boolean" | "integer" | "unsignedInt" | "positiveInt" | "decimal" | "concept"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cardinality, Coding, ExporterConfig};

    fn id(name: &str) -> Identifier {
        Identifier::new("shr.test", name)
    }

    fn specs() -> Specifications {
        Specifications::new()
            .with_element(
                DataElement::new(id("Panel"))
                    .with_value(Value::identifiable(Identifier::primitive("string")))
                    .with_field(
                        Value::identifiable(id("Status")).with_card(Cardinality::exactly_one()),
                    ),
            )
            .with_element(
                DataElement::new(id("Status"))
                    .with_value(Value::identifiable(Identifier::primitive("code"))),
            )
            .with_element(DataElement::new(id("Result")).with_value(Value::choice(vec![
                Value::identifiable(Identifier::primitive("code")).with_card(Cardinality::exactly_one()),
                Value::identifiable(Identifier::primitive("boolean")).with_card(Cardinality::exactly_one()),
                Value::identifiable(id("Quantity")).with_card(Cardinality::unbounded(0)),
            ])))
            .with_element(DataElement::new(id("Quantity")))
            .with_element(DataElement::new(id("SimpleQuantity")).based_on(id("Quantity")))
    }

    #[test]
    fn test_unscoped_constraint() {
        let specs = specs();
        let base_types = BaseTypeResolver::new(&specs);
        let resolver = PathResolver::new(&specs, &base_types);
        let mut context = ConversionContext::new(&ExporterConfig::default());
        let value = Value::identifiable(id("Panel"));

        let resolution = resolver.resolve(
            &Constraint::cardinality(Cardinality::exactly_one()),
            &value,
            &mut context,
        );
        assert_eq!(resolution, Resolution::Unscoped);
    }

    #[test]
    fn test_normalized_path_through_field_to_primitive() {
        let specs = specs();
        let base_types = BaseTypeResolver::new(&specs);
        let resolver = PathResolver::new(&specs, &base_types);
        let mut context = ConversionContext::new(&ExporterConfig::default());
        let value = Value::identifiable(id("Panel"));
        let constraint = Constraint::code(Coding::new("S", "X"))
            .with_path(vec![id("Status"), Identifier::primitive("code")]);

        match resolver.resolve(&constraint, &value, &mut context) {
            Resolution::Scoped { path, target } => {
                let names: Vec<&str> = path.iter().map(|(name, _)| name.as_str()).collect();
                assert_eq!(names, vec!["Status", "Value"]);
                assert_eq!(path[0].1.effective_identifier(), Some(&id("Status")));
                assert!(target.is_coded());
            }
            other => panic!("unexpected resolution {other:?}"),
        }
    }

    #[test]
    fn test_unknown_segment_is_dropped() {
        let specs = specs();
        let base_types = BaseTypeResolver::new(&specs);
        let resolver = PathResolver::new(&specs, &base_types);
        let mut context = ConversionContext::new(&ExporterConfig::default());
        let value = Value::identifiable(id("Panel"));
        let constraint = Constraint::boolean(true).with_path(vec![id("Nope")]);

        assert_eq!(
            resolver.resolve(&constraint, &value, &mut context),
            Resolution::Dropped
        );
        assert_eq!(
            context.diagnostics()[0].code,
            DiagnosticCode::UnresolvedConstraintPath
        );
        assert_eq!(context.stats.constraints_dropped, 1);
    }

    #[test]
    fn test_includes_introduced_segment_degrades_to_warning() {
        let specs = specs();
        let base_types = BaseTypeResolver::new(&specs);
        let resolver = PathResolver::new(&specs, &base_types);
        let mut context = ConversionContext::new(&ExporterConfig::default());
        let value = Value::identifiable(id("Panel"))
            .with_constraint(Constraint::includes_type(id("Extra"), Cardinality::unbounded(1)));
        let constraint = Constraint::boolean(true).with_path(vec![id("Extra")]);

        assert_eq!(
            resolver.resolve(&constraint, &value, &mut context),
            Resolution::Dropped
        );
        let diagnostic = &context.diagnostics()[0];
        assert_eq!(diagnostic.code, DiagnosticCode::IncludesTypePath);
        assert_eq!(diagnostic.severity, crate::Severity::Warning);
    }

    #[test]
    fn test_unnormalized_selects_choice_option() {
        let specs = specs();
        let base_types = BaseTypeResolver::new(&specs);
        let resolver = PathResolver::new(&specs, &base_types);
        let mut context = ConversionContext::new(&ExporterConfig::default());
        let value = Value::identifiable(id("Result"));

        let constraint = Constraint::boolean(true).on_value();
        match resolver.resolve(&constraint, &value, &mut context) {
            Resolution::Scoped { path, target } => {
                assert_eq!(path.len(), 1);
                assert_eq!(path[0].0, "Value");
                assert!(path[0].1.is_choice());
                assert_eq!(target.effective_identifier(), Some(&Identifier::primitive("boolean")));
            }
            other => panic!("unexpected resolution {other:?}"),
        }
    }

    #[test]
    fn test_choice_option_must_be_exactly_one() {
        let specs = specs();
        let base_types = BaseTypeResolver::new(&specs);
        let resolver = PathResolver::new(&specs, &base_types);
        let mut context = ConversionContext::new(&ExporterConfig::default());
        let value = Value::identifiable(id("Result"));

        let constraint = Constraint::type_of(id("SimpleQuantity"))
            .with_path(vec![Identifier::value_keyword()]);
        assert_eq!(
            resolver.resolve(&constraint, &value, &mut context),
            Resolution::Dropped
        );
        assert_eq!(
            context.diagnostics()[0].code,
            DiagnosticCode::ChoiceOptionCardinality
        );
    }

    #[test]
    fn test_unnormalized_requires_choice() {
        let specs = specs();
        let base_types = BaseTypeResolver::new(&specs);
        let resolver = PathResolver::new(&specs, &base_types);
        let mut context = ConversionContext::new(&ExporterConfig::default());
        let value = Value::identifiable(id("Status"));

        let constraint = Constraint::code(Coding::new("S", "X")).on_value();
        assert_eq!(
            resolver.resolve(&constraint, &value, &mut context),
            Resolution::Dropped
        );
    }
}
