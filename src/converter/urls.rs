use url::Url;

use crate::Identifier;

/// Namespace of the builtin foundational document.
pub const BUILTIN_NAMESPACE: &str = "shr.builtin";

/// Builds document ids, definition references and entry-type URLs.
#[derive(Debug, Clone)]
pub struct UrlBuilder {
    schema_base: String,
    type_base: String,
}

impl UrlBuilder {
    pub fn new(base_schema_url: &Url, base_type_url: &str) -> Self {
        Self {
            schema_base: base_schema_url.as_str().trim_end_matches('/').to_string(),
            type_base: normalize_type_base(base_type_url),
        }
    }

    /// Document id of a namespace: `<base>/shr/core` for `shr.core`.
    pub fn schema_id(&self, namespace: &str) -> String {
        format!("{}/{}", self.schema_base, namespace_path(namespace))
    }

    /// Reference to a definition, local when it lives in `enclosing_namespace`.
    pub fn definition_ref(&self, identifier: &Identifier, enclosing_namespace: &str) -> String {
        if identifier.namespace() == enclosing_namespace {
            format!("#/definitions/{}", identifier.name())
        } else {
            format!(
                "{}#/definitions/{}",
                self.schema_id(identifier.namespace()),
                identifier.name()
            )
        }
    }

    pub fn builtin_ref(&self, name: &str) -> String {
        self.definition_ref(&Identifier::new(BUILTIN_NAMESPACE, name), "")
    }

    /// Entry type URL identifying instances of an element.
    pub fn type_url(&self, identifier: &Identifier) -> String {
        format!(
            "{}{}/{}",
            self.type_base,
            namespace_path(identifier.namespace()),
            identifier.name()
        )
    }
}

fn namespace_path(namespace: &str) -> String {
    namespace.replace('.', "/")
}

/// Keep a trailing `/` or `#`, otherwise append `/`.
pub fn normalize_type_base(url: &str) -> String {
    if url.ends_with('/') || url.ends_with('#') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}
