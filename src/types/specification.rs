// The expanded model handed to the exporter

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{DataElement, Identifier};
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Namespace {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// On-disk form of [`Specifications`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpecificationsDocument {
    #[serde(default)]
    namespaces: Vec<Namespace>,
    #[serde(default)]
    data_elements: Vec<DataElement>,
}

/// Namespaces and data elements of an expanded specification, indexed by
/// identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SpecificationsDocument", into = "SpecificationsDocument")]
pub struct Specifications {
    namespaces: Vec<Namespace>,
    elements: IndexMap<Identifier, DataElement>,
}

impl From<SpecificationsDocument> for Specifications {
    fn from(document: SpecificationsDocument) -> Self {
        let mut specs = Specifications::new();
        for namespace in document.namespaces {
            specs.add_namespace(namespace);
        }
        for element in document.data_elements {
            specs.add_element(element);
        }
        specs
    }
}

impl From<Specifications> for SpecificationsDocument {
    fn from(specs: Specifications) -> Self {
        Self {
            namespaces: specs.namespaces,
            data_elements: specs.elements.into_values().collect(),
        }
    }
}

impl Specifications {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Register a namespace, replacing the description of an existing one.
    pub fn add_namespace(&mut self, namespace: Namespace) {
        match self
            .namespaces
            .iter_mut()
            .find(|ns| ns.namespace == namespace.namespace)
        {
            Some(existing) => {
                if namespace.description.is_some() {
                    existing.description = namespace.description;
                }
            }
            None => self.namespaces.push(namespace),
        }
    }

    /// Register a data element; its namespace is added when unknown.
    pub fn add_element(&mut self, element: DataElement) {
        let namespace = element.identifier.namespace().to_string();
        if !self.namespaces.iter().any(|ns| ns.namespace == namespace) {
            self.namespaces.push(Namespace::new(namespace));
        }
        self.elements.insert(element.identifier.clone(), element);
    }

    pub fn with_element(mut self, element: DataElement) -> Self {
        self.add_element(element);
        self
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn namespace(&self, name: &str) -> Option<&Namespace> {
        self.namespaces.iter().find(|ns| ns.namespace == name)
    }

    pub fn find(&self, identifier: &Identifier) -> Option<&DataElement> {
        self.elements.get(identifier)
    }

    /// Elements of one namespace, sorted by name.
    pub fn elements_in(&self, namespace: &str) -> Vec<&DataElement> {
        let mut elements: Vec<&DataElement> = self
            .elements
            .values()
            .filter(|el| el.identifier.namespace() == namespace)
            .collect();
        elements.sort_by(|a, b| a.identifier.name().cmp(b.identifier.name()));
        elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
