//! Target form definition and validation.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during form definition validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Form URL is empty")]
    EmptyUrl,

    #[error("Form URL must start with http:// or https://: {url}")]
    InvalidUrl { url: String },

    #[error("No fields configured")]
    NoFields,

    #[error("Field at index {index} has an empty entry key")]
    EmptyKey { index: usize },

    #[error("Field at index {index} (key: {key}) has an empty label")]
    EmptyLabel { index: usize, key: String },

    #[error("Duplicate field key found: {key}")]
    DuplicateKey { key: String },

    #[error("Duplicate field label found: {label}")]
    DuplicateLabel { label: String },

    #[error("Failed to read form definition file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse form definition file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// A single field of the target form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormField {
    /// Entry key as posted to the form (e.g. `entry.123456789`).
    pub key: String,

    /// Human-readable name used to refer to the field in chat commands.
    pub label: String,

    /// Whether the form rejects a submission missing this field.
    #[serde(default)]
    pub required: bool,
}

impl FormField {
    /// Creates a new field definition.
    #[must_use]
    pub const fn new(key: String, label: String, required: bool) -> Self {
        Self {
            key,
            label,
            required,
        }
    }
}

/// Definition of the target Google Form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormConfig {
    /// Link to the form. Either the public `…/viewform` share link or the
    /// `…/formResponse` submission endpoint is accepted.
    pub url: String,

    /// Fields of the form, in form order.
    pub fields: Vec<FormField>,
}

impl FormConfig {
    /// Loads a form definition from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ValidationError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Saves the form definition to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ValidationError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validates the form definition.
    ///
    /// # Errors
    ///
    /// Returns the first validation error encountered.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::EmptyUrl);
        }

        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ValidationError::InvalidUrl {
                url: self.url.clone(),
            });
        }

        if self.fields.is_empty() {
            return Err(ValidationError::NoFields);
        }

        let mut seen_keys = std::collections::HashSet::new();
        let mut seen_labels = std::collections::HashSet::new();

        for (index, field) in self.fields.iter().enumerate() {
            if field.key.is_empty() {
                return Err(ValidationError::EmptyKey { index });
            }

            if field.label.is_empty() {
                return Err(ValidationError::EmptyLabel {
                    index,
                    key: field.key.clone(),
                });
            }

            if !seen_keys.insert(&field.key) {
                return Err(ValidationError::DuplicateKey {
                    key: field.key.clone(),
                });
            }

            // Labels are matched case-insensitively in commands.
            if !seen_labels.insert(field.label.to_lowercase()) {
                return Err(ValidationError::DuplicateLabel {
                    label: field.label.clone(),
                });
            }
        }

        Ok(())
    }

    /// Returns detailed validation results for all fields.
    #[must_use]
    pub fn validate_all(&self) -> Vec<Result<(), ValidationError>> {
        let mut results = Vec::new();

        if self.fields.is_empty() {
            results.push(Err(ValidationError::NoFields));
            return results;
        }

        let mut seen_keys = std::collections::HashSet::new();
        let mut seen_labels = std::collections::HashSet::new();

        for (index, field) in self.fields.iter().enumerate() {
            if field.key.is_empty() {
                results.push(Err(ValidationError::EmptyKey { index }));
                continue;
            }

            if field.label.is_empty() {
                results.push(Err(ValidationError::EmptyLabel {
                    index,
                    key: field.key.clone(),
                }));
                continue;
            }

            if !seen_keys.insert(&field.key) {
                results.push(Err(ValidationError::DuplicateKey {
                    key: field.key.clone(),
                }));
                continue;
            }

            if !seen_labels.insert(field.label.to_lowercase()) {
                results.push(Err(ValidationError::DuplicateLabel {
                    label: field.label.clone(),
                }));
                continue;
            }

            results.push(Ok(()));
        }

        results
    }

    /// Returns the URL submissions are posted to.
    ///
    /// Google serves forms at `…/viewform` but accepts responses at
    /// `…/formResponse`; a share link is rewritten accordingly. Any query
    /// string or fragment is dropped.
    #[must_use]
    pub fn response_url(&self) -> String {
        let base = self
            .url
            .split_once(['?', '#'])
            .map_or(self.url.as_str(), |(base, _)| base);
        let base = base.trim_end_matches('/');

        if let Some(prefix) = base.strip_suffix("/viewform") {
            format!("{prefix}/formResponse")
        } else if base.ends_with("/formResponse") {
            base.to_owned()
        } else {
            format!("{base}/formResponse")
        }
    }

    /// Finds a field by entry key or case-insensitive label.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields
            .iter()
            .find(|f| f.key == name)
            .or_else(|| {
                self.fields
                    .iter()
                    .find(|f| f.label.eq_ignore_ascii_case(name))
            })
    }

    /// Iterates over the required fields.
    pub fn required_fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Checks if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Creates an example form definition for users to reference.
    #[must_use]
    pub fn example() -> Self {
        Self {
            url: "https://docs.google.com/forms/d/e/1FAIpQLSe_EXAMPLE/viewform".to_owned(),
            fields: vec![
                FormField::new(
                    "entry.1000001".to_owned(),
                    "name".to_owned(),
                    true,
                ),
                FormField::new(
                    "entry.1000002".to_owned(),
                    "temperature".to_owned(),
                    true,
                ),
                FormField::new(
                    "entry.1000003".to_owned(),
                    "remarks".to_owned(),
                    false,
                ),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FormConfig {
        FormConfig {
            url: "https://docs.google.com/forms/d/e/ABC123/viewform".to_owned(),
            fields: vec![
                FormField::new("entry.1".to_owned(), "temperature".to_owned(), true),
                FormField::new("entry.2".to_owned(), "remarks".to_owned(), false),
            ],
        }
    }

    #[test]
    fn test_validation_ok() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_validation_no_fields() {
        let config = FormConfig {
            url: "https://example.com/form".to_owned(),
            fields: vec![],
        };
        assert!(matches!(config.validate(), Err(ValidationError::NoFields)));
    }

    #[test]
    fn test_validation_bad_url() {
        let mut config = sample();
        config.url = "docs.google.com/forms".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_validation_duplicate_key() {
        let mut config = sample();
        config.fields[1].key = "entry.1".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_validation_duplicate_label_case_insensitive() {
        let mut config = sample();
        config.fields[1].label = "Temperature".to_owned();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DuplicateLabel { .. })
        ));
    }

    #[test]
    fn test_response_url_from_viewform() {
        let config = sample();
        assert_eq!(
            config.response_url(),
            "https://docs.google.com/forms/d/e/ABC123/formResponse"
        );
    }

    #[test]
    fn test_response_url_strips_query() {
        let mut config = sample();
        config.url =
            "https://docs.google.com/forms/d/e/ABC123/viewform?usp=sf_link".to_owned();
        assert_eq!(
            config.response_url(),
            "https://docs.google.com/forms/d/e/ABC123/formResponse"
        );
    }

    #[test]
    fn test_response_url_already_form_response() {
        let mut config = sample();
        config.url = "https://docs.google.com/forms/d/e/ABC123/formResponse".to_owned();
        assert_eq!(
            config.response_url(),
            "https://docs.google.com/forms/d/e/ABC123/formResponse"
        );
    }

    #[test]
    fn test_response_url_bare_form_link() {
        let mut config = sample();
        config.url = "https://docs.google.com/forms/d/e/ABC123/".to_owned();
        assert_eq!(
            config.response_url(),
            "https://docs.google.com/forms/d/e/ABC123/formResponse"
        );
    }

    #[test]
    fn test_field_lookup_by_key_and_label() {
        let config = sample();
        assert_eq!(config.field("entry.1").map(|f| f.label.as_str()), Some("temperature"));
        assert_eq!(config.field("Temperature").map(|f| f.key.as_str()), Some("entry.1"));
        assert!(config.field("missing").is_none());
    }

    #[test]
    fn test_example_is_valid() {
        assert!(FormConfig::example().validate().is_ok());
    }
}
