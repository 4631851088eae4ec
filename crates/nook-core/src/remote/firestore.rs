//! Firestore REST client implementing [`RemoteStore`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{collection_path, document_path, BatchWrite, RemoteDocument, RemoteStore};
use crate::error::{Error, Result};
use crate::models::{Document, FieldValue};
use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: &str = "300";
const ERROR_EXCERPT_CHARS: usize = 180;

/// Remote store backed by the Firestore REST API.
///
/// Requests are authorized with the signed-in user's ID token.
#[derive(Clone)]
pub struct FirestoreRemote {
    client: Client,
    base_url: String,
    project_id: String,
    id_token: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for FirestoreRemote {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("FirestoreRemote")
            .field("base_url", &self.base_url)
            .field("project_id", &self.project_id)
            .field("id_token", &"[REDACTED]")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl FirestoreRemote {
    pub fn new(project_id: impl Into<String>, id_token: impl Into<String>) -> Result<Self> {
        let project_id = normalize_text_option(Some(project_id.into()))
            .ok_or_else(|| Error::InvalidInput("Firestore project id must not be empty".into()))?;
        let id_token = normalize_text_option(Some(id_token.into()))
            .ok_or_else(|| Error::InvalidInput("Firestore ID token must not be empty".into()))?;

        Ok(Self {
            client: Self::build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            base_url: DEFAULT_BASE_URL.to_string(),
            project_id,
            id_token,
            api_key: None,
        })
    }

    /// Point at another endpoint, e.g. a local emulator
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self> {
        self.base_url = normalize_base_url(base_url.into())?;
        Ok(self)
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = normalize_text_option(api_key);
        self
    }

    /// Per-request timeout; the sync engine itself never times out
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = Self::build_client(timeout)?;
        Ok(self)
    }

    fn build_client(timeout: Duration) -> Result<Client> {
        Ok(Client::builder().timeout(timeout).build()?)
    }

    /// `projects/{project}/databases/(default)/documents`
    fn database_root(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    fn document_name(&self, principal: &str, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.database_root(),
            document_path(principal, collection, id)
        )
    }

    fn url(&self, relative: &str) -> String {
        format!("{}/{}/{relative}", self.base_url, self.database_root())
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request
            .bearer_auth(&self.id_token)
            .header(reqwest::header::ACCEPT, "application/json");
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = self.authorize(request).send().await?;
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::Remote(parse_api_error(status, &body)))
    }
}

#[async_trait]
impl RemoteStore for FirestoreRemote {
    async fn commit(&self, principal: &str, writes: Vec<BatchWrite>) -> Result<()> {
        let encoded = writes
            .iter()
            .map(|write| match write {
                BatchWrite::Set {
                    collection,
                    id,
                    document,
                } => Ok(json!({
                    "update": {
                        "name": self.document_name(principal, collection, id),
                        "fields": encode_document(document)?,
                    }
                })),
                BatchWrite::Delete { collection, id } => Ok(json!({
                    "delete": self.document_name(principal, collection, id),
                })),
            })
            .collect::<Result<Vec<Value>>>()?;

        let url = format!(
            "{}/{}:commit",
            self.base_url,
            self.database_root()
        );
        self.send(self.client.post(url).json(&json!({ "writes": encoded })))
            .await?;
        tracing::debug!(writes = writes.len(), "Firestore batch committed");
        Ok(())
    }

    async fn read_collection(
        &self,
        principal: &str,
        collection: &str,
    ) -> Result<Vec<RemoteDocument>> {
        let url = self.url(&collection_path(principal, collection));
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(&url).query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let page = self.send(request).await?.json::<ListDocumentsResponse>().await?;
            for raw in page.documents {
                documents.push(decode_remote_document(raw)?);
            }

            match normalize_text_option(page.next_page_token) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    async fn get(&self, principal: &str, collection: &str, id: &str) -> Result<Option<Document>> {
        let url = self.url(&document_path(principal, collection, id));
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Remote(parse_api_error(status, &body)));
        }

        let raw = response.json::<RawDocument>().await?;
        Ok(Some(decode_remote_document(raw)?.fields))
    }

    async fn set(
        &self,
        principal: &str,
        collection: &str,
        id: &str,
        document: Document,
    ) -> Result<()> {
        // PATCH without an update mask replaces the whole document
        let url = self.url(&document_path(principal, collection, id));
        let body = json!({ "fields": encode_document(&document)? });
        self.send(self.client.patch(url).json(&body)).await?;
        Ok(())
    }

    async fn delete(&self, principal: &str, collection: &str, id: &str) -> Result<()> {
        let url = self.url(&document_path(principal, collection, id));
        self.send(self.client.delete(url)).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: Option<String>,
    status: Option<String>,
}

fn decode_remote_document(raw: RawDocument) -> Result<RemoteDocument> {
    let id = raw
        .name
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Remote(format!("malformed document name '{}'", raw.name)))?
        .to_string();

    let fields = raw
        .fields
        .into_iter()
        .map(|(key, value)| decode_value(value).map(|value| (key, value)))
        .collect::<Result<Document>>()?;

    Ok(RemoteDocument { id, fields })
}

fn encode_document(document: &Document) -> Result<Value> {
    let fields = document
        .iter()
        .map(|(key, value)| encode_value(value).map(|value| (key.clone(), value)))
        .collect::<Result<Map<String, Value>>>()?;
    Ok(Value::Object(fields))
}

/// Encode into Firestore's typed value representation.
///
/// `Missing` has no encoding; callers must sanitize first.
fn encode_value(value: &FieldValue) -> Result<Value> {
    Ok(match value {
        FieldValue::Missing => {
            return Err(Error::Unrepresentable(
                "unset value reached the Firestore encoder".to_string(),
            ))
        }
        FieldValue::Null => json!({ "nullValue": null }),
        FieldValue::Bool(value) => json!({ "booleanValue": value }),
        FieldValue::Integer(value) => json!({ "integerValue": value.to_string() }),
        FieldValue::Float(value) if value.is_finite() => json!({ "doubleValue": value }),
        FieldValue::Float(value) => json!({ "doubleValue": value.to_string() }),
        FieldValue::String(value) => json!({ "stringValue": value }),
        FieldValue::Array(values) => {
            let values = values.iter().map(encode_value).collect::<Result<Vec<_>>>()?;
            json!({ "arrayValue": { "values": values } })
        }
        FieldValue::Map(entries) => json!({ "mapValue": { "fields": encode_document(entries)? } }),
    })
}

fn decode_value(value: Value) -> Result<FieldValue> {
    let Value::Object(mut object) = value else {
        return Err(Error::Remote("expected a typed Firestore value".to_string()));
    };
    let Some((kind, inner)) = object.iter_mut().next().map(|(k, v)| (k.clone(), v.take())) else {
        return Err(Error::Remote("empty Firestore value".to_string()));
    };

    let decoded = match (kind.as_str(), inner) {
        ("nullValue", _) => FieldValue::Null,
        ("booleanValue", Value::Bool(value)) => FieldValue::Bool(value),
        ("integerValue", Value::String(raw)) => raw
            .parse()
            .map(FieldValue::Integer)
            .map_err(|_| Error::Remote(format!("invalid integerValue '{raw}'")))?,
        ("integerValue", Value::Number(number)) => number
            .as_i64()
            .map(FieldValue::Integer)
            .ok_or_else(|| Error::Remote(format!("invalid integerValue {number}")))?,
        ("doubleValue", Value::Number(number)) => {
            FieldValue::Float(number.as_f64().unwrap_or(f64::NAN))
        }
        ("doubleValue", Value::String(raw)) => {
            FieldValue::Float(raw.parse().unwrap_or(f64::NAN))
        }
        (
            "stringValue" | "timestampValue" | "referenceValue" | "bytesValue",
            Value::String(value),
        ) => FieldValue::String(value),
        ("arrayValue", Value::Object(mut array)) => match array.remove("values") {
            Some(Value::Array(values)) => FieldValue::Array(
                values
                    .into_iter()
                    .map(decode_value)
                    .collect::<Result<Vec<_>>>()?,
            ),
            _ => FieldValue::Array(Vec::new()),
        },
        ("mapValue", Value::Object(mut map)) => match map.remove("fields") {
            Some(Value::Object(fields)) => FieldValue::Map(
                fields
                    .into_iter()
                    .map(|(key, value)| decode_value(value).map(|value| (key, value)))
                    .collect::<Result<Document>>()?,
            ),
            _ => FieldValue::Map(Document::new()),
        },
        ("geoPointValue", Value::Object(point)) => FieldValue::from(Value::Object(point)),
        (kind, inner) => {
            return Err(Error::Remote(format!(
                "unsupported Firestore value {kind}: {}",
                error_excerpt(&inner.to_string())
            )))
        }
    };
    Ok(decoded)
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(detail) = payload.error {
            if let Some(message) = detail.message.or(detail.status) {
                return format!("{} ({})", message.trim(), status.as_u16());
            }
        }
    }

    let trimmed = error_excerpt(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

/// First characters of an error body, enough to identify the failure
fn error_excerpt(body: &str) -> String {
    body.trim().chars().take(ERROR_EXCERPT_CHARS).collect()
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidInput("Firestore base URL must not be empty".into()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidInput(
            "Firestore base URL must include http:// or https://".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_document() -> Document {
        let mut nested = Document::new();
        nested.insert("energy".to_string(), FieldValue::Integer(3));

        let mut document = Document::new();
        document.insert("title".to_string(), FieldValue::from("walk"));
        document.insert("done".to_string(), FieldValue::Bool(true));
        document.insert("score".to_string(), FieldValue::Float(0.5));
        document.insert("cleared".to_string(), FieldValue::Null);
        document.insert(
            "tags".to_string(),
            FieldValue::Array(vec![FieldValue::from("a"), FieldValue::from("b")]),
        );
        document.insert("meta".to_string(), FieldValue::Map(nested));
        document
    }

    #[test]
    fn encoded_values_decode_to_the_same_document() {
        let document = sample_document();
        let Value::Object(fields) = encode_document(&document).unwrap() else {
            panic!("expected object");
        };

        let decoded = decode_remote_document(RawDocument {
            name: "projects/p/databases/(default)/documents/users/u/tasks/t1".to_string(),
            fields,
        })
        .unwrap();

        assert_eq!(decoded.id, "t1");
        assert_eq!(decoded.fields, document);
    }

    #[test]
    fn integers_travel_as_strings() {
        assert_eq!(
            encode_value(&FieldValue::Integer(42)).unwrap(),
            json!({ "integerValue": "42" })
        );
    }

    #[test]
    fn missing_values_are_rejected() {
        let error = encode_value(&FieldValue::Missing).unwrap_err();
        assert!(matches!(error, Error::Unrepresentable(_)));
    }

    #[test]
    fn empty_array_and_map_decode() {
        assert_eq!(
            decode_value(json!({ "arrayValue": {} })).unwrap(),
            FieldValue::Array(Vec::new())
        );
        assert_eq!(
            decode_value(json!({ "mapValue": {} })).unwrap(),
            FieldValue::Map(Document::new())
        );
        assert_eq!(
            decode_value(json!({ "timestampValue": "2024-01-01T00:00:00Z" })).unwrap(),
            FieldValue::from("2024-01-01T00:00:00Z")
        );
    }

    #[test]
    fn document_name_includes_database_root() {
        let remote = FirestoreRemote::new("demo", "token").unwrap();
        assert_eq!(
            remote.document_name("u1", "moods", "m1"),
            "projects/demo/databases/(default)/documents/users/u1/moods/m1"
        );
    }

    #[test]
    fn parse_api_error_prefers_message() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(
            parse_api_error(StatusCode::FORBIDDEN, body),
            "Missing or insufficient permissions. (403)"
        );
        assert_eq!(parse_api_error(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn plain_error_body_is_truncated() {
        let body = format!("  {}  ", "x".repeat(500));
        let message = parse_api_error(StatusCode::INTERNAL_SERVER_ERROR, &body);
        assert_eq!(message, format!("{} (500)", "x".repeat(ERROR_EXCERPT_CHARS)));
    }

    #[test]
    fn debug_redacts_token() {
        let remote = FirestoreRemote::new("demo", "secret-token")
            .unwrap()
            .with_api_key(Some("secret-key".to_string()));
        let debug = format!("{remote:?}");
        assert!(!debug.contains("secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn base_url_requires_scheme() {
        assert!(normalize_base_url("localhost:8080/v1".to_string()).is_err());
        assert_eq!(
            normalize_base_url("http://localhost:8080/v1/".to_string()).unwrap(),
            "http://localhost:8080/v1"
        );
    }
}
