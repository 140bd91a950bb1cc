use super::builtin;
use super::context::ConversionContext;
use super::diagnostics::DiagnosticCode;
use super::urls::UrlBuilder;
use super::OutputMode;
use crate::{
    Cardinality, ConstraintKind, Identifier, JsonType, SchemaFragment, Specifications, Value,
    ValueKind,
};

/// A value converted without its scoped constraints.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedValue {
    /// Array-wrapped when `is_list`
    pub fragment: SchemaFragment,
    pub required: bool,
    pub is_list: bool,
    /// Cardinality after unscoped cardinality constraints
    pub card: Cardinality,
    /// Descriptive text standing in for a not-yet-specified value
    pub placeholder: Option<String>,
}

/// Shape of a primitive, or `None` if the name is unknown. `concept` is
/// handled by the converter since its shape depends on the output mode.
pub fn primitive_shape(name: &str) -> Option<SchemaFragment> {
    let shape = match name {
        "boolean" => SchemaFragment::typed(JsonType::Boolean),
        "integer" => SchemaFragment::typed(JsonType::Integer),
        "unsignedInt" => SchemaFragment::typed(JsonType::Integer).with_minimum(0),
        "positiveInt" => SchemaFragment::typed(JsonType::Integer).with_minimum(1),
        "decimal" => SchemaFragment::typed(JsonType::Number),
        "uri" => SchemaFragment::typed(JsonType::String).with_format("uri"),
        "dateTime" => SchemaFragment::typed(JsonType::String).with_format("date-time"),
        "string" | "code" | "base64Binary" | "oid" | "id" | "markdown" | "xhtml" | "instant"
        | "date" | "time" => SchemaFragment::typed(JsonType::String),
        _ => return None,
    };
    Some(shape)
}

pub struct ValueConverter<'a> {
    specs: &'a Specifications,
    urls: &'a UrlBuilder,
    mode: OutputMode,
}

impl<'a> ValueConverter<'a> {
    pub fn new(specs: &'a Specifications, urls: &'a UrlBuilder, mode: OutputMode) -> Self {
        Self { specs, urls, mode }
    }

    pub fn convert(
        &self,
        value: &Value,
        namespace: &str,
        context: &mut ConversionContext,
    ) -> ConvertedValue {
        let card = self.effective_card(value, context);
        let is_list = card.is_list() || value.is_or_was_list();

        let (inner, placeholder) = match &value.kind {
            ValueKind::Placeholder { text } => {
                let text = match text {
                    Some(text) => format!("TBD: {text}"),
                    None => "TBD".to_string(),
                };
                (SchemaFragment::described(text.clone()), Some(text))
            }
            _ => (self.convert_shape(value, namespace, context), None),
        };

        let fragment = if is_list {
            self.wrap_list(inner, card)
        } else {
            inner
        };

        ConvertedValue {
            fragment,
            required: card.is_required(),
            is_list,
            card,
            placeholder,
        }
    }

    /// Effective cardinality narrowed by the value's own cardinality
    /// constraints. A list-valued constraint on a non-list value promotes it.
    fn effective_card(&self, value: &Value, context: &mut ConversionContext) -> Cardinality {
        let mut card = value.effective_card().unwrap_or_else(Cardinality::exactly_one);
        for constraint in value.unscoped_constraints() {
            let ConstraintKind::Cardinality { card: narrowed } = &constraint.kind else {
                continue;
            };
            if !card.is_list() && narrowed.is_list() {
                card = *narrowed;
                continue;
            }
            match card.narrow(narrowed) {
                Some(result) => card = result,
                None => {
                    context.report(
                        DiagnosticCode::CardinalityConflict,
                        format!("cardinality {narrowed} conflicts with {card}"),
                    );
                }
            }
        }
        card
    }

    pub fn wrap_list(&self, items: SchemaFragment, card: Cardinality) -> SchemaFragment {
        let mut array = SchemaFragment::array(items);
        array.min_items = (card.min > 0).then_some(card.min);
        array.max_items = card.max;
        array
    }

    /// Shape of a single occurrence, ignoring cardinality.
    fn convert_shape(
        &self,
        value: &Value,
        namespace: &str,
        context: &mut ConversionContext,
    ) -> SchemaFragment {
        match &value.kind {
            ValueKind::Choice { options } => {
                self.choice_shape(options, namespace, context, Vec::new())
            }
            ValueKind::Reference => {
                let targets: Vec<&Identifier> = value.effective_identifier().into_iter().collect();
                self.reference_shape(&targets, context)
            }
            ValueKind::Identifiable => match value.effective_identifier() {
                Some(identifier) => self.identifier_shape(identifier, namespace, context),
                None => {
                    context.report(
                        DiagnosticCode::UnresolvedIdentifier,
                        "identifiable value without an identifier",
                    );
                    SchemaFragment::default()
                }
            },
            ValueKind::Placeholder { .. } => SchemaFragment::described("TBD"),
            ValueKind::Incomplete => {
                let name = value
                    .effective_identifier()
                    .map(Identifier::to_string)
                    .unwrap_or_else(|| "value".to_string());
                context.report(
                    DiagnosticCode::UnsupportedValue,
                    format!("unsupported incomplete {name}"),
                );
                SchemaFragment::default()
            }
        }
    }

    /// Union of the options' shapes. `narrowed` supplies replacement branches
    /// by option index; a narrowed reference option keeps its own branch
    /// instead of joining the shared one.
    pub fn choice_shape(
        &self,
        options: &[Value],
        namespace: &str,
        context: &mut ConversionContext,
        mut narrowed: Vec<(usize, SchemaFragment)>,
    ) -> SchemaFragment {
        let mut branches = Vec::new();
        let mut reference_slot = None;
        let mut reference_targets: Vec<&Identifier> = Vec::new();

        for (index, option) in options.iter().enumerate() {
            if let Some(position) = narrowed.iter().position(|(i, _)| *i == index) {
                branches.push(narrowed.swap_remove(position).1);
                continue;
            }
            if option.is_reference() {
                reference_slot.get_or_insert(branches.len());
                if let Some(target) = option.effective_identifier() {
                    reference_targets.push(target);
                }
                continue;
            }
            let converted = self.convert(option, namespace, context);
            branches.push(converted.fragment);
        }

        if let Some(slot) = reference_slot {
            let shape = self.reference_shape(&reference_targets, context);
            branches.insert(slot, shape);
        }

        match branches.len() {
            1 => branches.remove(0),
            _ => SchemaFragment::one_of(branches),
        }
    }

    /// Primitive shape, or a reference to the identified definition.
    pub fn identifier_shape(
        &self,
        identifier: &Identifier,
        namespace: &str,
        context: &mut ConversionContext,
    ) -> SchemaFragment {
        if identifier.is_primitive() {
            if identifier.name() == "concept" {
                return self.concept_shape();
            }
            return primitive_shape(identifier.name()).unwrap_or_else(|| {
                context.report(
                    DiagnosticCode::UnknownPrimitive,
                    format!("unknown primitive {}", identifier.name()),
                );
                SchemaFragment::default()
            });
        }

        if self.specs.find(identifier).is_none() {
            context.report(
                DiagnosticCode::UnresolvedIdentifier,
                format!("no definition found for {identifier}"),
            );
            return SchemaFragment::default();
        }
        SchemaFragment::reference_to(self.urls.definition_ref(identifier, namespace))
    }

    /// Shared reference shape allowing any of `targets`.
    pub fn reference_shape(
        &self,
        targets: &[&Identifier],
        context: &mut ConversionContext,
    ) -> SchemaFragment {
        let mut ref_types: Vec<String> = Vec::new();
        for target in targets {
            match self.specs.find(target) {
                Some(element) if !element.is_entry => {
                    context.report(
                        DiagnosticCode::UnresolvedIdentifier,
                        format!("reference target {target} is not an entry"),
                    );
                }
                Some(_) => {}
                None => {
                    context.report(
                        DiagnosticCode::UnresolvedIdentifier,
                        format!("no definition found for reference target {target}"),
                    );
                }
            }
            let url = self.urls.type_url(target);
            if !ref_types.contains(&url) {
                ref_types.push(url);
            }
        }
        builtin::reference_shape(ref_types)
    }

    pub fn concept_shape(&self) -> SchemaFragment {
        match self.mode {
            OutputMode::Hierarchical => SchemaFragment::reference_to(self.urls.builtin_ref("Concept")),
            OutputMode::Flattened => builtin::concept_shape(),
        }
    }
}
