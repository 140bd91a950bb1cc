use std::collections::HashMap;

use tracing::debug;

use super::assembler::{AssembledValue, ConstraintAssembler};
use super::base_types::BaseTypeResolver;
use super::builtin::{self, ENTRY_TYPE};
use super::constraint_tree::{ConstraintTree, ResolvedConstraint};
use super::context::ConversionContext;
use super::diagnostics::DiagnosticCode;
use super::path_resolver::{PathResolver, Resolution};
use super::urls::UrlBuilder;
use super::value_converter::ValueConverter;
use super::OutputMode;
use crate::{
    BaseType, DataElement, Inheritance, Namespace, Result, SchemaDocument, SchemaFragment,
    Specifications, VALUE_KEYWORD, Value, ValueKind,
};

pub struct ElementConverter<'a> {
    urls: &'a UrlBuilder,
    mode: OutputMode,
    base_types: &'a BaseTypeResolver<'a>,
    paths: PathResolver<'a>,
    values: ValueConverter<'a>,
}

impl<'a> ElementConverter<'a> {
    pub fn new(
        specs: &'a Specifications,
        urls: &'a UrlBuilder,
        mode: OutputMode,
        base_types: &'a BaseTypeResolver<'a>,
    ) -> Self {
        Self {
            urls,
            mode,
            base_types,
            paths: PathResolver::new(specs, base_types),
            values: ValueConverter::new(specs, urls, mode),
        }
    }

    /// Build the document of one namespace from its elements, in name order.
    pub fn convert_namespace(
        &self,
        namespace: &Namespace,
        elements: &[&'a DataElement],
        context: &mut ConversionContext,
    ) -> Result<SchemaDocument> {
        context.begin_namespace(&namespace.namespace);

        let mut document =
            SchemaDocument::new(self.urls.schema_id(&namespace.namespace), &namespace.namespace);
        document.description = namespace.description.clone();

        let mut sorted = elements.to_vec();
        sorted.sort_by(|a, b| a.identifier.name().cmp(b.identifier.name()));

        for element in sorted {
            let definition = self.convert_element(element, context)?;
            let name = element.identifier.name().to_string();
            if element.is_entry && !element.is_abstract {
                document
                    .any_of
                    .push(SchemaFragment::reference_to(format!("#/definitions/{name}")));
            }
            document.definitions.insert(name, definition);
        }

        Ok(document)
    }

    pub fn convert_element(
        &self,
        element: &'a DataElement,
        context: &mut ConversionContext,
    ) -> Result<SchemaFragment> {
        context.begin_element(&element.identifier.fqn());
        context.validate_state()?;

        let namespace = element.identifier.namespace();
        let mut local = SchemaFragment::object();
        let mut tbd_fields = Vec::new();

        if self.mode == OutputMode::Flattened {
            self.inline_identity(element, &mut local);
        }

        if let Some(value) = &element.value {
            let inherited = value.inheritance == Inheritance::Inherited;
            if !(inherited && self.mode == OutputMode::Hierarchical) {
                context.set_field(Some(VALUE_KEYWORD));
                let shape = self.convert_value(value, namespace, context);
                self.add_property(&mut local, VALUE_KEYWORD, shape, context);
            }
        }

        let colliding = self.colliding_inherited_names(element);
        for field in &element.fields {
            context.set_field(field.name());

            if let ValueKind::Placeholder { text } = &field.kind {
                let note = match (field.name(), text) {
                    (Some(name), Some(text)) => format!("{name} ({text})"),
                    (Some(name), None) => name.to_string(),
                    (None, Some(text)) => text.clone(),
                    (None, None) => "TBD".to_string(),
                };
                tbd_fields.push(note);
                continue;
            }
            if field.is_choice() {
                context.report(DiagnosticCode::ChoiceField, "ignoring field defined as a choice");
                continue;
            }
            let Some(name) = field.name() else {
                context.report(DiagnosticCode::UnnamedField, "ignoring field without a name");
                continue;
            };
            if name == VALUE_KEYWORD {
                context.report(
                    DiagnosticCode::RestrictedFieldName,
                    format!("ignoring restricted field name: {VALUE_KEYWORD}"),
                );
                continue;
            }
            if colliding.iter().any(|c| c == name) {
                context.report(
                    DiagnosticCode::InheritedFieldCollision,
                    format!("inherited field {name} collides with another field of the same name"),
                );
                continue;
            }
            if field.effective_card().is_some_and(|card| card.is_zeroed_out()) {
                debug!("Skipping zeroed-out field {name}");
                continue;
            }
            if field.inheritance == Inheritance::Inherited && self.mode == OutputMode::Hierarchical {
                continue;
            }

            let shape = self.convert_value(field, namespace, context);
            self.add_property(&mut local, name, shape, context);
        }
        context.set_field(None);

        let mut definition = match self.mode {
            OutputMode::Hierarchical => self.compose_hierarchy(element, local, context),
            OutputMode::Flattened => local,
        };
        definition.description = self.describe(element, &tbd_fields);

        context.end_element();
        Ok(definition.pruned())
    }

    fn convert_value(
        &self,
        value: &'a Value,
        namespace: &str,
        context: &mut ConversionContext,
    ) -> AssembledValue {
        let converted = self.values.convert(value, namespace, context);
        if let Some(text) = &converted.placeholder {
            debug!("Rendering placeholder value as text: {text}");
            return AssembledValue {
                fragment: converted.fragment,
                required: converted.required,
            };
        }

        let mut tree = ConstraintTree::rooted_at(value);
        for constraint in &value.constraints {
            match self.paths.resolve(constraint, value, context) {
                Resolution::Unscoped => tree.insert(ResolvedConstraint::unscoped(constraint, value)),
                Resolution::Scoped { path, target } => {
                    tree.insert(ResolvedConstraint::scoped(constraint, path, target))
                }
                Resolution::Dropped => {}
            }
        }

        ConstraintAssembler::new(&self.values).assemble(&converted, &tree, namespace, context)
    }

    fn add_property(
        &self,
        local: &mut SchemaFragment,
        name: &str,
        shape: AssembledValue,
        context: &mut ConversionContext,
    ) {
        if shape.required && !local.required.iter().any(|r| r == name) {
            local.required.push(name.to_string());
        }
        local
            .properties
            .insert(name.to_string(), shape.fragment);
        context.property_emitted();
    }

    /// Names shared by several fields where at least one of them is inherited.
    fn colliding_inherited_names(&self, element: &DataElement) -> Vec<String> {
        let mut by_name: HashMap<&str, (usize, bool)> = HashMap::new();
        for field in &element.fields {
            if let Some(name) = field.name() {
                let entry = by_name.entry(name).or_default();
                entry.0 += 1;
                entry.1 |= field.inheritance == Inheritance::Inherited;
            }
        }
        by_name
            .into_iter()
            .filter(|(_, (count, inherited))| *count > 1 && *inherited)
            .map(|(name, _)| name.to_string())
            .collect()
    }

    /// Base-type composition for elements with parents or entries; a bare
    /// `EntryType` discriminator otherwise.
    fn compose_hierarchy(
        &self,
        element: &DataElement,
        mut local: SchemaFragment,
        context: &mut ConversionContext,
    ) -> SchemaFragment {
        let bases: Vec<_> = element.base_identifiers().collect();
        if bases.is_empty() && !element.is_entry {
            local.properties.insert(
                ENTRY_TYPE.to_string(),
                SchemaFragment::reference_to(self.urls.builtin_ref(ENTRY_TYPE)),
            );
            local.required.push(ENTRY_TYPE.to_string());
            return local;
        }

        let mut entries = Vec::with_capacity(bases.len() + 2);
        if element.is_entry && !self.base_types.has_entry_ancestor(&element.identifier, context) {
            entries.push(SchemaFragment::reference_to(self.urls.builtin_ref("Entry")));
        }
        for base in bases {
            entries.push(SchemaFragment::reference_to(
                self.urls.definition_ref(base, element.identifier.namespace()),
            ));
        }
        entries.push(local);
        SchemaFragment::all_of(entries)
    }

    /// Flattened entries carry their identity inline, other elements only
    /// their type.
    fn inline_identity(&self, element: &DataElement, local: &mut SchemaFragment) {
        for (name, property) in builtin::identity_properties() {
            if !element.is_entry && name != ENTRY_TYPE {
                continue;
            }
            local.properties.insert(name.to_string(), property);
            local.required.push(name.to_string());
        }
    }

    fn describe(&self, element: &DataElement, tbd_fields: &[String]) -> Option<String> {
        let mut lines = Vec::new();
        if let Some(description) = &element.description {
            lines.push(description.clone());
        }
        if !element.concepts.is_empty() {
            let concepts: Vec<String> = element.concepts.iter().map(ToString::to_string).collect();
            lines.push(format!("Concepts: {}", concepts.join(", ")));
        }
        let tbd_parents: Vec<String> = element
            .based_on
            .iter()
            .filter_map(|base| match base {
                BaseType::Placeholder { tbd } => Some(tbd.clone().unwrap_or_else(|| "TBD".to_string())),
                BaseType::Identifier(_) => None,
            })
            .collect();
        if !tbd_parents.is_empty() {
            lines.push(format!("TBD Parents: {}", tbd_parents.join(", ")));
        }
        if !tbd_fields.is_empty() {
            lines.push(format!("TBD Fields: {}", tbd_fields.join(", ")));
        }
        (!lines.is_empty()).then(|| lines.join("\n"))
    }
}
