//! Resource definitions read from configuration files

use super::ResourceKind;
use anyhow::{Context, Result};
use declarative::TokenTable;
use manage::{Format, Payload, xml_element_text};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("unsupported resource file {0}: expected .json or .xml")]
    UnsupportedFormat(PathBuf),

    #[error("no '{field}' found in {kind} definition {origin}")]
    MissingName {
        kind: ResourceKind,
        field: &'static str,
        origin: String,
    },
}

/// One resource definition ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePayload {
    pub kind: ResourceKind,
    pub payload: Payload,
    /// File the definition came from, if any
    pub source: Option<PathBuf>,
}

impl ResourcePayload {
    pub fn new(kind: ResourceKind, payload: Payload) -> Self {
        Self {
            kind,
            payload,
            source: None,
        }
    }

    /// Read a `.json` or `.xml` definition, substituting `${key}` tokens
    pub fn from_file(kind: ResourceKind, path: &Path, tokens: &TokenTable) -> Result<Self> {
        let format = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Format::from_extension);
        if !matches!(format, Some(Format::Json | Format::Xml)) {
            return Err(PayloadError::UnsupportedFormat(path.to_path_buf()).into());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let body = tokens.substitute(&raw);
        let payload = match format {
            Some(Format::Xml) => Payload::xml(body),
            _ => Payload::json(body),
        };

        Ok(Self {
            kind,
            payload,
            source: Some(path.to_path_buf()),
        })
    }

    /// Where the definition came from, for messages
    pub fn origin(&self) -> String {
        self.source
            .as_ref()
            .map_or_else(|| "<inline>".to_string(), |p| p.display().to_string())
    }

    /// Name of the instance this definition describes
    pub fn name(&self) -> Result<String, PayloadError> {
        let name = match self.payload.format {
            Format::Json => json_value(&self.payload.body)
                .and_then(|v| v.pointer(self.kind.name_pointer()).cloned())
                .and_then(|v| v.as_str().map(str::to_string)),
            _ => xml_element_text(&self.payload.body, self.kind.name_element()),
        };

        name.filter(|n| !n.is_empty())
            .ok_or_else(|| PayloadError::MissingName {
                kind: self.kind,
                field: self.kind.name_element(),
                origin: self.origin(),
            })
    }

    /// A top-level string field, e.g. `schema-database` of a database
    pub fn field(&self, name: &str) -> Option<String> {
        match self.payload.format {
            Format::Json => json_value(&self.payload.body)
                .and_then(|v| v.get(name).cloned())
                .and_then(|v| v.as_str().map(str::to_string)),
            _ => xml_element_text(&self.payload.body, name),
        }
    }
}

fn json_value(body: &str) -> Option<serde_json::Value> {
    serde_json::from_str(body).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_name_and_field() {
        let payload = ResourcePayload::new(
            ResourceKind::Database,
            Payload::json(r#"{"database-name": "app-content", "schema-database": "app-schemas"}"#),
        );
        assert_eq!(payload.name().unwrap(), "app-content");
        assert_eq!(payload.field("schema-database").as_deref(), Some("app-schemas"));
        assert_eq!(payload.field("triggers-database"), None);
    }

    #[test]
    fn test_nested_rest_api_name() {
        let payload = ResourcePayload::new(
            ResourceKind::RestApi,
            Payload::json(r#"{"rest-api": {"name": "orders", "port": 8010}}"#),
        );
        assert_eq!(payload.name().unwrap(), "orders");
    }

    #[test]
    fn test_xml_name_with_namespace() {
        let payload = ResourcePayload::new(
            ResourceKind::Role,
            Payload::xml(
                "<role-properties xmlns=\"http://marklogic.com/manage\">\n  \
                 <role-name> app-reader </role-name>\n</role-properties>",
            ),
        );
        assert_eq!(payload.name().unwrap(), "app-reader");

        let prefixed = ResourcePayload::new(
            ResourceKind::Database,
            Payload::xml("<m:database-properties><m:database-name>db1</m:database-name></m:database-properties>"),
        );
        assert_eq!(prefixed.name().unwrap(), "db1");
    }

    #[test]
    fn test_missing_name() {
        let payload = ResourcePayload::new(ResourceKind::User, Payload::json(r#"{"description": "x"}"#));
        let err = payload.name().unwrap_err();
        assert!(err.to_string().contains("user-name"));
        assert!(err.to_string().contains("<inline>"));
    }

    #[test]
    fn test_from_file_substitutes_tokens() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("trigger.json");
        fs::write(&path, r#"{"name": "${app-name}-trigger", "uri": "${unknown}"}"#).unwrap();

        let mut tokens = TokenTable::new();
        tokens.insert("app-name", "orders").unwrap();

        let payload = ResourcePayload::from_file(ResourceKind::Trigger, &path, &tokens).unwrap();
        assert_eq!(payload.name().unwrap(), "orders-trigger");
        assert!(payload.payload.body.contains("${unknown}"));
        assert_eq!(payload.source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_from_file_rejects_other_extensions() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();
        let err = ResourcePayload::from_file(ResourceKind::Role, &path, &TokenTable::new())
            .unwrap_err();
        assert!(err.to_string().contains("notes.txt"));
    }
}
