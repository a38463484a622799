//! services/portal/src/adapters/supabase.rs
//!
//! The HTTP client shared by the auth, row and object adapters. It carries
//! the project URL, the anon key, and the access token of the signed-in user.

use std::sync::{Arc, RwLock};

use mentorship_core::ports::{PortError, PortResult};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// The row-store code for "single row requested, zero rows found".
const NO_ROWS_CODE: &str = "PGRST116";
/// Postgres unique violation.
const UNIQUE_VIOLATION_CODE: &str = "23505";

/// A `column=operator.value` row filter.
pub type Filter = (&'static str, String);

pub fn eq(column: &'static str, value: impl ToString) -> Filter {
    (column, format!("eq.{}", value.to_string()))
}

pub fn in_list<T: ToString>(column: &'static str, values: &[T]) -> Filter {
    let joined = values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    (column, format!("in.({})", joined))
}

#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    base: Url,
    anon_key: String,
    access_token: Arc<RwLock<Option<String>>>,
}

impl SupabaseClient {
    pub fn new(base: Url, anon_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            anon_key: anon_key.into(),
            access_token: Arc::new(RwLock::new(None)),
        }
    }

    /// Use a custom HTTP client (for connection pool reuse or timeouts).
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Row and object requests run as this user from now on.
    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut guard) = self.access_token.write() {
            *guard = token;
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().ok().and_then(|t| t.clone())
    }

    /// Joins path segments under the project URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> PortResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected(format!("{} cannot be a base URL", self.base)))?
            .pop_if_empty()
            .extend(segments.iter().flat_map(|s| s.split('/')).filter(|s| !s.is_empty()));
        Ok(url)
    }

    /// A request carrying the project key and the best available bearer.
    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let bearer = self
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    /// A request authorized with an explicit token instead of the stored one.
    pub fn request_as(&self, method: Method, url: Url, token: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    pub async fn send(&self, request: RequestBuilder) -> PortResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> PortResult<T> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| PortError::Unexpected(format!("Malformed response: {}", e)))
    }

    //=====================================================================================
    // Row store
    //=====================================================================================

    fn table(&self, table: &str) -> PortResult<Url> {
        self.endpoint(&["rest", "v1", table])
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&str>,
    ) -> PortResult<Vec<T>> {
        let mut request = self
            .request(Method::GET, self.table(table)?)
            .query(&[("select", "*")])
            .query(filters);
        if let Some(order) = order {
            request = request.query(&[("order", order)]);
        }
        self.send_json(request).await
    }

    /// Exactly one row; zero rows is `NotFound`.
    pub async fn select_single<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
    ) -> PortResult<T> {
        let request = self
            .request(Method::GET, self.table(table)?)
            .header("Accept", "application/vnd.pgrst.object+json")
            .query(&[("select", "*")])
            .query(filters);
        self.send_json(request).await
    }

    pub async fn exists(&self, table: &str, filters: &[Filter]) -> PortResult<bool> {
        let request = self
            .request(Method::GET, self.table(table)?)
            .query(&[("select", "*"), ("limit", "1")])
            .query(filters);
        let rows: Vec<serde_json::Value> = self.send_json(request).await?;
        Ok(!rows.is_empty())
    }

    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        body: &B,
    ) -> PortResult<T> {
        let request = self
            .request(Method::POST, self.table(table)?)
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(body);
        self.send_json(request).await
    }

    pub async fn insert_minimal<B: Serialize + ?Sized>(&self, table: &str, body: &B) -> PortResult<()> {
        let request = self
            .request(Method::POST, self.table(table)?)
            .header("Prefer", "return=minimal")
            .json(body);
        self.send(request).await.map(|_| ())
    }

    pub async fn update<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[Filter],
        body: &B,
    ) -> PortResult<T> {
        let request = self
            .request(Method::PATCH, self.table(table)?)
            .header("Prefer", "return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .query(filters)
            .json(body);
        self.send_json(request).await
    }

    pub async fn delete(&self, table: &str, filters: &[Filter]) -> PortResult<()> {
        let request = self.request(Method::DELETE, self.table(table)?).query(filters);
        self.send(request).await.map(|_| ())
    }
}

//=========================================================================================
// Error Mapping
//=========================================================================================

/// The union of the error bodies the auth, row and object services return.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<String> {
        match &self.code {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    fn text(&self) -> Option<String> {
        self.error_description
            .clone()
            .or_else(|| self.message.clone())
            .or_else(|| self.msg.clone())
            .or_else(|| self.error.clone())
    }
}

async fn error_from_response(response: Response) -> PortError {
    let status = response.status();
    let raw = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
    classify(status, &body, &raw)
}

fn classify(status: StatusCode, body: &ErrorBody, raw: &str) -> PortError {
    let text = body.text().unwrap_or_else(|| {
        if raw.is_empty() {
            status.to_string()
        } else {
            raw.to_string()
        }
    });
    let code = body.code();
    match (status, code.as_deref()) {
        (_, Some(NO_ROWS_CODE)) | (StatusCode::NOT_FOUND, _) => PortError::NotFound(text),
        (_, Some(UNIQUE_VIOLATION_CODE)) | (StatusCode::CONFLICT, _) => PortError::Conflict(text),
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => PortError::Unauthorized,
        // The auth service answers bad credentials with 400.
        (StatusCode::BAD_REQUEST, _) if body.error.as_deref() == Some("invalid_grant") => {
            PortError::Unauthorized
        }
        _ => PortError::Unexpected(format!("{}: {}", status, text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(raw: &str) -> ErrorBody {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn no_rows_code_is_not_found() {
        let raw = r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned"}"#;
        assert!(classify(StatusCode::NOT_ACCEPTABLE, &body(raw), raw).is_not_found());
    }

    #[test]
    fn duplicates_are_conflicts() {
        let raw = r#"{"code":"23505","message":"duplicate key"}"#;
        assert_eq!(
            classify(StatusCode::CONFLICT, &body(raw), raw),
            PortError::Conflict("duplicate key".into())
        );
    }

    #[test]
    fn bad_credentials_are_unauthorized() {
        let raw = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            classify(StatusCode::BAD_REQUEST, &body(raw), raw),
            PortError::Unauthorized
        );
    }

    #[test]
    fn everything_else_is_unexpected() {
        let err = classify(StatusCode::BAD_GATEWAY, &ErrorBody::default(), "");
        assert!(matches!(err, PortError::Unexpected(ref m) if m.contains("502")));
    }

    #[test]
    fn endpoints_are_joined_and_encoded() {
        let client = SupabaseClient::new("https://abcd.supabase.co/".parse().unwrap(), "anon");
        let url = client
            .endpoint(&["storage", "v1", "object", "blog-images", "a b/c.png"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://abcd.supabase.co/storage/v1/object/blog-images/a%20b/c.png"
        );
    }

    #[test]
    fn filters_render_operators() {
        assert_eq!(eq("email", "a@b.c"), ("email", "eq.a@b.c".to_string()));
        assert_eq!(in_list("id", &[1, 2]), ("id", "in.(1,2)".to_string()));
    }

    #[tokio::test]
    async fn requests_fall_back_to_the_project_key() {
        let server = crate::test_support::StubServer::start().await;
        let client = SupabaseClient::new(server.url(), "anon");

        let _: Vec<serde_json::Value> = client
            .select("announcements", &[], Some("created_at.desc"))
            .await
            .unwrap();
        client.set_access_token(Some("user-token".into()));
        let _: Vec<serde_json::Value> = client.select("announcements", &[], None).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests[0].header("authorization"), Some("Bearer anon"));
        assert_eq!(requests[0].param("order").as_deref(), Some("created_at.desc"));
        assert_eq!(requests[1].header("authorization"), Some("Bearer user-token"));
        assert_eq!(requests[1].param("order"), None);
    }
}
