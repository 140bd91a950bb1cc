use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{BindingStrength, Coding};

pub const DRAFT_04_SCHEMA: &str = "http://json-schema.org/draft-04/schema#";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
}

/// Value set binding annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSetBinding {
    pub uri: String,
    pub strength: BindingStrength,
}

/// One required member of a list: its shape and how many times it must occur.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequirement {
    pub items: Box<SchemaFragment>,
    pub min_items: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u32>,
}

/// Array membership annotation aggregated from includes constraints,
/// independent of the array's own item bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub min_items: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u32>,
    pub members: Vec<MemberRequirement>,
}

/// A draft-04 schema fragment with the exporter's annotation keywords
/// (`refType`, `code`, `valueSet`, `includes`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaFragment {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<JsonType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enumeration: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, SchemaFragment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaFragment>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u32>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<SchemaFragment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaFragment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub one_of: Vec<SchemaFragment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ref_type: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Coding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set: Option<ValueSetBinding>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub includes: Option<Membership>,
}

impl SchemaFragment {
    pub fn typed(schema_type: JsonType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn object() -> Self {
        Self::typed(JsonType::Object)
    }

    pub fn array(items: SchemaFragment) -> Self {
        Self {
            schema_type: Some(JsonType::Array),
            items: Some(Box::new(items)),
            ..Self::default()
        }
    }

    pub fn reference_to(url: impl Into<String>) -> Self {
        Self {
            reference: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    pub fn all_of(entries: Vec<SchemaFragment>) -> Self {
        Self {
            all_of: entries,
            ..Self::default()
        }
    }

    pub fn any_of(entries: Vec<SchemaFragment>) -> Self {
        Self {
            any_of: entries,
            ..Self::default()
        }
    }

    pub fn one_of(entries: Vec<SchemaFragment>) -> Self {
        Self {
            one_of: entries,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_minimum(mut self, minimum: i64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, property: SchemaFragment) -> Self {
        self.properties.insert(name.into(), property);
        self
    }

    pub fn with_required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Names of the keywords set on this fragment.
    pub fn keywords(&self) -> Vec<&'static str> {
        let checks = [
            ("$ref", self.reference.is_some()),
            ("type", self.schema_type.is_some()),
            ("format", self.format.is_some()),
            ("minimum", self.minimum.is_some()),
            ("description", self.description.is_some()),
            ("enum", !self.enumeration.is_empty()),
            ("properties", !self.properties.is_empty()),
            ("required", !self.required.is_empty()),
            ("items", self.items.is_some()),
            ("minItems", self.min_items.is_some()),
            ("maxItems", self.max_items.is_some()),
            ("allOf", !self.all_of.is_empty()),
            ("anyOf", !self.any_of.is_empty()),
            ("oneOf", !self.one_of.is_empty()),
            ("refType", !self.ref_type.is_empty()),
            ("code", self.code.is_some()),
            ("valueSet", self.value_set.is_some()),
            ("includes", self.includes.is_some()),
        ];
        checks
            .into_iter()
            .filter_map(|(name, set)| set.then_some(name))
            .collect()
    }

    /// Merge two fragments that set disjoint keywords. Draft-04 ignores the
    /// siblings of `$ref`, so fragments carrying one never merge.
    ///
    /// On conflict both fragments are handed back unchanged.
    pub fn try_merge(
        self,
        other: SchemaFragment,
    ) -> std::result::Result<SchemaFragment, (SchemaFragment, SchemaFragment)> {
        if self.is_empty() {
            return Ok(other);
        }
        if other.is_empty() {
            return Ok(self);
        }
        let ours = self.keywords();
        let theirs = other.keywords();
        let clash = ours.contains(&"$ref")
            || theirs.contains(&"$ref")
            || ours.iter().any(|keyword| theirs.contains(keyword));
        if clash {
            return Err((self, other));
        }

        Ok(SchemaFragment {
            reference: None,
            schema_type: self.schema_type.or(other.schema_type),
            format: self.format.or(other.format),
            minimum: self.minimum.or(other.minimum),
            description: self.description.or(other.description),
            enumeration: pick(self.enumeration, other.enumeration),
            properties: if self.properties.is_empty() {
                other.properties
            } else {
                self.properties
            },
            required: pick(self.required, other.required),
            items: self.items.or(other.items),
            min_items: self.min_items.or(other.min_items),
            max_items: self.max_items.or(other.max_items),
            all_of: pick(self.all_of, other.all_of),
            any_of: pick(self.any_of, other.any_of),
            one_of: pick(self.one_of, other.one_of),
            ref_type: pick(self.ref_type, other.ref_type),
            code: self.code.or(other.code),
            value_set: self.value_set.or(other.value_set),
            includes: self.includes.or(other.includes),
        })
    }

    /// Fold `entries` into `self` where keywords allow, composing the rest
    /// with `allOf`.
    pub fn compose(self, entries: Vec<SchemaFragment>) -> SchemaFragment {
        let mut base = self;
        let mut rest = Vec::new();
        for entry in entries {
            match base.try_merge(entry) {
                Ok(merged) => base = merged,
                Err((unchanged, entry)) => {
                    base = unchanged;
                    rest.push(entry);
                }
            }
        }
        if rest.is_empty() {
            base
        } else {
            rest.insert(0, base);
            SchemaFragment::all_of(rest)
        }
    }

    /// Recursively minimize the fragment: empty composition lists and empty
    /// nested nodes are removed, one-entry composition lists collapse into
    /// their entry. Pruning a pruned fragment is a no-op.
    pub fn pruned(self) -> SchemaFragment {
        // A collapse can free up keywords for a list that was refused earlier
        let mut current = self;
        loop {
            let next = current.clone().prune_once();
            if next == current {
                return next;
            }
            current = next;
        }
    }

    fn prune_once(self) -> SchemaFragment {
        let mut fragment = self;

        fragment.properties = std::mem::take(&mut fragment.properties)
            .into_iter()
            .map(|(name, property)| (name, property.pruned()))
            .filter(|(_, property)| !property.is_empty())
            .collect();

        fragment.items = fragment
            .items
            .take()
            .map(|items| items.pruned())
            .filter(|items| !items.is_empty())
            .map(Box::new);

        if let Some(membership) = fragment.includes.as_mut() {
            for member in &mut membership.members {
                let items = std::mem::take(&mut *member.items);
                *member.items = items.pruned();
            }
        }

        let all_of: Vec<SchemaFragment> = std::mem::take(&mut fragment.all_of)
            .into_iter()
            .map(SchemaFragment::pruned)
            .filter(|entry| !entry.is_empty())
            .collect();
        fragment = collapse(fragment, all_of, |f, entries| f.all_of = entries);

        let any_of: Vec<SchemaFragment> = std::mem::take(&mut fragment.any_of)
            .into_iter()
            .map(SchemaFragment::pruned)
            .collect();
        fragment = collapse(fragment, any_of, |f, entries| f.any_of = entries);

        let one_of: Vec<SchemaFragment> = std::mem::take(&mut fragment.one_of)
            .into_iter()
            .map(SchemaFragment::pruned)
            .collect();
        collapse(fragment, one_of, |f, entries| f.one_of = entries)
    }
}

fn pick<T>(ours: Vec<T>, theirs: Vec<T>) -> Vec<T> {
    if ours.is_empty() { theirs } else { ours }
}

/// Reattach an already pruned composition list, collapsing a single entry into
/// the owning fragment when their keywords do not clash.
fn collapse(
    fragment: SchemaFragment,
    mut entries: Vec<SchemaFragment>,
    attach: impl Fn(&mut SchemaFragment, Vec<SchemaFragment>),
) -> SchemaFragment {
    if entries.len() != 1 {
        let mut fragment = fragment;
        attach(&mut fragment, entries);
        return fragment;
    }
    let single = entries.remove(0);
    match fragment.try_merge(single) {
        Ok(merged) => merged,
        Err((mut fragment, single)) => {
            attach(&mut fragment, vec![single]);
            fragment
        }
    }
}

/// One JSON-Schema document per namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDocument {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub definitions: IndexMap<String, SchemaFragment>,
    #[serde(rename = "anyOf", default, skip_serializing_if = "Vec::is_empty")]
    pub any_of: Vec<SchemaFragment>,
    /// Source namespace, used to name the file the document is written to
    #[serde(skip)]
    pub namespace: String,
}

impl SchemaDocument {
    pub fn new(id: impl Into<String>, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            schema: DRAFT_04_SCHEMA.to_string(),
            id: id.into(),
            title: namespace.clone(),
            description: None,
            definitions: IndexMap::new(),
            any_of: Vec::new(),
            namespace,
        }
    }

    pub fn with_definition(mut self, name: impl Into<String>, definition: SchemaFragment) -> Self {
        self.definitions.insert(name.into(), definition);
        self
    }

    pub fn to_json(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
