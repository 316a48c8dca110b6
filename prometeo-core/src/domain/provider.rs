//! Provider (financial institution) domain model

use serde::{Deserialize, Serialize};

/// A financial institution reachable through the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub code: String,
    pub name: String,
    pub country: String,
}

impl Provider {
    pub fn new(code: impl Into<String>, name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            country: country.into(),
        }
    }

    /// All searchable fields of the provider record
    pub fn fields(&self) -> [&str; 3] {
        [&self.code, &self.name, &self.country]
    }

    /// Case-insensitive substring match against any field
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        self.fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

/// Login field required by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub interactive: bool,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub label_es: Option<String>,
    #[serde(default)]
    pub label_en: Option<String>,
}

/// Full provider description, including its login schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDetail {
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub auth_fields: Vec<AuthField>,
}

/// Sort providers by country and keep the ones matching `term`.
///
/// An empty (or whitespace) term keeps every provider. The sort is stable,
/// so providers of the same country stay in upstream order.
pub fn search_providers(mut providers: Vec<Provider>, term: &str) -> Vec<Provider> {
    providers.sort_by(|a, b| a.country.cmp(&b.country));

    if term.trim().is_empty() {
        return providers;
    }

    providers.into_iter().filter(|p| p.matches(term)).collect()
}
