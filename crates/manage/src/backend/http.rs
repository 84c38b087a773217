//! HTTP backend.
//!
//! [`HttpManageClient`] sends resource requests to the management API and
//! document/eval requests to the app-services server. Error responses are
//! turned into classified [`Error`]s via [`Error::from_response`].

use crate::backend::ManageApi;
use crate::error::{Error, Result};
use crate::types::{ClientConfig, Document, Endpoint, Format, Payload, REST_APIS_COLLECTION};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use std::time::Duration;
use ureq::http::Response;
use ureq::{Agent, Body, RequestBuilder};

/// Blocking client for a real cluster.
pub struct HttpManageClient {
    /// HTTP agent for requests.
    agent: Agent,
    /// Base URL of the management API.
    manage_base: String,
    /// Base URL of the app-services server.
    app_services_base: String,
    /// Precomputed `Authorization` header value.
    authorization: Option<String>,
}

impl HttpManageClient {
    /// Create a client from connection settings.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build();

        let authorization = match (&config.username, &config.password) {
            (Some(user), Some(password)) => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{user}:{password}"))
            )),
            _ => None,
        };

        Self {
            agent: Agent::new_with_config(agent_config),
            manage_base: config.manage_base(),
            app_services_base: config.app_services_base(),
            authorization,
        }
    }

    /// Get the management API base URL.
    #[must_use]
    pub fn manage_base(&self) -> &str {
        &self.manage_base
    }

    /// URL of a path on the management API.
    fn manage_url(&self, path: &str) -> String {
        format!("{}{}", self.manage_base, path)
    }

    /// URL of a path on the app-services server.
    fn app_url(&self, path: &str) -> String {
        format!("{}{}", self.app_services_base, path)
    }

    fn prepare<B>(&self, request: RequestBuilder<B>, query: &[(String, String)]) -> RequestBuilder<B> {
        let mut request = request.header("Accept", "application/json");
        if let Some(auth) = &self.authorization {
            request = request.header("Authorization", auth.as_str());
        }
        for (key, value) in query {
            request = request.query(key, value);
        }
        request
    }

    /// GET a resource path, returning `None` on 404.
    fn get_optional(&self, path: &str, query: &[(String, String)]) -> Result<Option<String>> {
        let request = self
            .prepare(self.agent.get(&self.manage_url(path)), query)
            .query("format", "json");
        let (status, body) = finish(request.call())?;
        match status {
            200..=299 => Ok(Some(body)),
            404 => match Error::from_response(status, &body) {
                Error::NotFound(_) => Ok(None),
                other => Err(other),
            },
            _ => Err(Error::from_response(status, &body)),
        }
    }

    /// Evaluate server-side JavaScript, returning each result item as text.
    fn eval(&self, database: &str, script: &str, vars: &Value) -> Result<Vec<String>> {
        log::debug!("Evaluating script against database {database}");
        let vars = vars.to_string();
        let request = self.prepare(self.agent.post(&self.app_url("/v1/eval")), &[]);
        let form = [("javascript", script), ("database", database), ("vars", vars.as_str())];
        let body = expect_success(finish(request.send_form(form))?)?;
        Ok(parse_multipart(&body))
    }
}

impl ManageApi for HttpManageClient {
    fn list(&self, endpoint: &Endpoint) -> Result<Vec<String>> {
        let body = self
            .get_optional(&endpoint.collection, &endpoint.query)?
            .ok_or_else(|| Error::NotFound(endpoint.collection.clone()))?;
        let value: Value = serde_json::from_str(&body)?;
        Ok(list_names(&endpoint.collection, &value))
    }

    fn exists(&self, endpoint: &Endpoint, name: &str) -> Result<bool> {
        let found = self.get_optional(&endpoint.item_path(name), &endpoint.item_query(name))?;
        Ok(found.is_some())
    }

    fn read(&self, endpoint: &Endpoint, name: &str) -> Result<Option<Payload>> {
        let path = format!("{}/properties", endpoint.item_path(name));
        Ok(self
            .get_optional(&path, &endpoint.item_query(name))?
            .map(Payload::json))
    }

    fn resource_id(&self, endpoint: &Endpoint, name: &str) -> Result<Option<String>> {
        let path = endpoint.item_path(name);
        let Some(body) = self.get_optional(&path, &endpoint.item_query(name))? else {
            return Ok(None);
        };
        let value: Value = serde_json::from_str(&body)?;
        Ok(find_id(&value))
    }

    fn create(&self, endpoint: &Endpoint, name: &str, payload: &Payload) -> Result<()> {
        log::debug!("POST {} ({name})", endpoint.collection);
        let request = self
            .prepare(self.agent.post(&self.manage_url(&endpoint.collection)), &endpoint.query)
            .header("Content-Type", payload.format.content_type());
        expect_success(finish(request.send(payload.body.as_str()))?)?;
        Ok(())
    }

    fn update(&self, endpoint: &Endpoint, name: &str, payload: &Payload) -> Result<()> {
        let path = format!("{}/properties", endpoint.item_path(name));
        log::debug!("PUT {path}");
        let request = self
            .prepare(self.agent.put(&self.manage_url(&path)), &endpoint.item_query(name))
            .header("Content-Type", payload.format.content_type());
        expect_success(finish(request.send(payload.body.as_str()))?)?;
        Ok(())
    }

    fn delete(&self, endpoint: &Endpoint, name: &str) -> Result<()> {
        let path = endpoint.item_path(name);
        log::debug!("DELETE {path}");
        let request = self.prepare(
            self.agent.delete(&self.manage_url(&path)),
            &endpoint.item_query(name),
        );
        let (status, body) = finish(request.call())?;
        match status {
            200..=299 => Ok(()),
            404 => match Error::from_response(status, &body) {
                Error::NotFound(_) => Ok(()),
                other => Err(other),
            },
            _ => Err(Error::from_response(status, &body)),
        }
    }

    fn collections(&self, database: &str) -> Result<Vec<String>> {
        self.eval(database, "cts.collections()", &Value::Object(Default::default()))
    }

    fn write_document(&self, database: &str, document: &Document) -> Result<()> {
        log::debug!("Writing {} into {database}", document.uri);
        let request = self
            .prepare(self.agent.put(&self.app_url("/v1/documents")), &document_query(document))
            .query("database", database)
            .header("Content-Type", document.format.content_type());
        expect_success(finish(request.send(document.content.as_str()))?)?;
        Ok(())
    }

    fn validate_tde(&self, content_database: &str, template: &Document) -> Result<()> {
        let script = "var template, format; \
            tde.validate([fn.head(xdmp.unquote(template, null, format === 'json' ? 'format-json' : []))])";
        let format = if template.format == Format::Json { "json" } else { "xml" };
        let vars = serde_json::json!({ "template": template.content, "format": format });
        let values = self.eval(content_database, script, &vars).map_err(as_validation)?;

        let Some(first) = values.first() else {
            return Err(Error::InvalidResponse(
                "empty TDE validation response".to_string(),
            ));
        };
        let result: Value = serde_json::from_str(first)?;
        if result.get("valid").and_then(Value::as_bool).unwrap_or(false) {
            return Ok(());
        }
        Err(Error::ValidationFailed {
            code: result
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("TDE-INVALID")
                .to_string(),
            message: result
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    }

    fn validate_rulesets(&self, content_database: &str, collections: &[String]) -> Result<()> {
        let script = "var collections; require('/MarkLogic/redaction').ruleValidate(collections.split(','))";
        let vars = serde_json::json!({ "collections": collections.join(",") });
        self.eval(content_database, script, &vars)
            .map_err(as_validation)?;
        Ok(())
    }
}

/// Turn a coded server error raised by a validation script into a validation failure.
fn as_validation(err: Error) -> Error {
    match err {
        Error::Http {
            code: Some(code),
            message,
            ..
        } => Error::ValidationFailed { code, message },
        other => other,
    }
}

fn finish(response: std::result::Result<Response<Body>, ureq::Error>) -> Result<(u16, String)> {
    let mut response = response?;
    let status = response.status().as_u16();
    let body = response.body_mut().read_to_string()?;
    Ok((status, body))
}

fn expect_success((status, body): (u16, String)) -> Result<String> {
    if (200..300).contains(&status) {
        Ok(body)
    } else {
        Err(Error::from_response(status, &body))
    }
}

/// Names in a collection listing.
///
/// Management collections list `nameref`s; the REST API collection lists
/// `rest-apis[].name` instead.
fn list_names(collection: &str, value: &Value) -> Vec<String> {
    let mut names = Vec::new();
    if collection == REST_APIS_COLLECTION {
        let servers = value.get("rest-apis").and_then(Value::as_array);
        names.extend(
            servers
                .into_iter()
                .flatten()
                .filter_map(|server| server.get("name").and_then(Value::as_str))
                .map(str::to_string),
        );
    } else {
        collect_strings(value, "nameref", &mut names);
    }
    names
}

/// `uri`, `collection` and `perm:<role>` parameters of a document write.
fn document_query(document: &Document) -> Vec<(String, String)> {
    let mut query = vec![("uri".to_string(), document.uri.clone())];
    for collection in &document.collections {
        query.push(("collection".to_string(), collection.clone()));
    }
    for (role, capability) in &document.permissions {
        query.push((format!("perm:{role}"), capability.clone()));
    }
    query
}

/// Collect every string value stored under `key`, depth first.
fn collect_strings(value: &Value, key: &str, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                if k == key
                    && let Some(s) = v.as_str()
                {
                    out.push(s.to_string());
                } else {
                    collect_strings(v, key, out);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_strings(item, key, out);
            }
        }
        _ => {}
    }
}

/// First `id` field, string or number, depth first.
fn find_id(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            if let Some(id) = map.get("id") {
                match id {
                    Value::String(s) => return Some(s.clone()),
                    Value::Number(n) => return Some(n.to_string()),
                    _ => {}
                }
            }
            map.values().find_map(find_id)
        }
        Value::Array(items) => items.iter().find_map(find_id),
        _ => None,
    }
}

/// Split a `multipart/mixed` eval response into the body of each part.
fn parse_multipart(body: &str) -> Vec<String> {
    let Some(boundary) = body
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with("--"))
    else {
        return Vec::new();
    };
    let boundary = boundary.trim_end_matches("--").to_string();

    body.split(boundary.as_str())
        .filter_map(|part| {
            let part = part.trim_start_matches("--").trim_start_matches(['\r', '\n']);
            let (_, content) = part
                .split_once("\r\n\r\n")
                .or_else(|| part.split_once("\n\n"))?;
            let content = content.trim_end_matches(['\r', '\n']);
            Some(content.to_string())
        })
        .collect()
}
