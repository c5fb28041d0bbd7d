// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use smvbr_app::{
    ChangeEmailForm, ChangeNameForm, ChangePasswordForm, FilterCriteria, FormError, LoginForm,
    RegistrationForm, SessionContext, UserId, VehicleId,
};
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const GENERIC_FAILURE_MESSAGE: &str =
    "Something went wrong talking to the server. Check your connection and try again.";

/// Keys that may wrap a list of vehicle records, tried in order.
const LIST_WRAPPERS: [&str; 3] = ["carros", "resultados", "veiculos"];

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid API base URL {url:?}: {reason} -- set api.base_url to an http(s) URL")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("build HTTP client")]
    Setup(#[source] reqwest::Error),
    #[error("cannot reach {base_url} -- check that the API server is running ({source})")]
    Connection {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("server error ({status}){}", detail_suffix(.detail))]
    Status { status: u16, detail: Option<String> },
    #[error("decode {what} response: {reason}")]
    Decode { what: &'static str, reason: String },
    #[error(transparent)]
    Invalid(#[from] FormError),
}

impl ApiError {
    /// Text suitable for a screen-level notice: the server's own detail
    /// when it sent one, otherwise a generic failure line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                detail: Some(detail),
                ..
            } => detail.clone(),
            Self::Invalid(error) => error.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_owned(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn detail_suffix(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|detail| format!(": {detail}"))
        .unwrap_or_default()
}

/// One page of `/carros`: the records plus the server's optional note
/// (for example a fuzzy-match suggestion when nothing matched exactly).
#[derive(Debug, Clone, PartialEq)]
pub struct VehiclePage {
    pub records: Vec<Value>,
    pub message: Option<String>,
    pub total: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(default, alias = "mensagem")]
    pub message: Option<String>,
    #[serde(default, alias = "usuario_id")]
    pub user_id: Option<UserId>,
    #[serde(default, alias = "nome")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisteredUser {
    #[serde(alias = "usuario_id")]
    pub user_id: UserId,
    #[serde(alias = "nome")]
    pub name: String,
    pub email: String,
}

impl RegisteredUser {
    pub fn session(&self) -> SessionContext {
        SessionContext::new(self.user_id)
            .with_name(self.name.clone())
            .with_email(self.email.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base: Url,
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let trimmed = base_url.trim().trim_end_matches('/').to_owned();
        if trimmed.is_empty() {
            return Err(ApiError::InvalidBaseUrl {
                url: base_url.to_owned(),
                reason: "empty".to_owned(),
            });
        }
        let base = Url::parse(&trimmed).map_err(|error| ApiError::InvalidBaseUrl {
            url: trimmed.clone(),
            reason: error.to_string(),
        })?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl {
                url: trimmed,
                reason: format!("unsupported scheme {:?}", base.scheme()),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ApiError::Setup)?;

        Ok(Self {
            base,
            base_url: trimmed,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn list_vehicles(&self, search: Option<&str>) -> Result<VehiclePage, ApiError> {
        let mut url = self.endpoint(&["carros"]);
        if let Some(search) = search.map(str::trim)
            && !search.is_empty()
        {
            url.query_pairs_mut().append_pair("busca", search);
        }
        let body = self.send(Method::GET, url, None, "vehicle list").await?;

        let message = text_field(&body, &["mensagem", "message"]);
        let total = body.get("total").and_then(Value::as_u64);
        let records = unwrap_records(body, "vehicle list")?;
        Ok(VehiclePage {
            records,
            message,
            total,
        })
    }

    pub async fn filter_vehicles(&self, criteria: &FilterCriteria) -> Result<Vec<Value>, ApiError> {
        let mut url = self.endpoint(&["filtro-carros"]);
        let pairs = criteria.query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (name, value) in &pairs {
                query.append_pair(name, value);
            }
        }
        let body = self.send(Method::GET, url, None, "filtered vehicles").await?;
        unwrap_records(body, "filtered vehicles")
    }

    pub async fn vehicle(&self, id: VehicleId) -> Result<Value, ApiError> {
        let url = self.endpoint(&["carros", id.to_string().as_str()]);
        let body = self.send(Method::GET, url, None, "vehicle").await?;
        match body {
            Value::Object(mut object) => match object.remove("carro") {
                Some(inner @ Value::Object(_)) => Ok(inner),
                Some(_) | None => Ok(Value::Object(object)),
            },
            other => Err(ApiError::Decode {
                what: "vehicle",
                reason: format!("expected an object, got {}", kind_of(&other)),
            }),
        }
    }

    /// Flips the favorite status of `code` for the session user and returns
    /// the server's confirmation text.
    pub async fn toggle_favorite(
        &self,
        session: &SessionContext,
        code: &str,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["favoritar", session.user_id.to_string().as_str()]);
        let body = json!({ "codigo": code });
        let reply = self
            .send(Method::POST, url, Some(body), "favorite toggle")
            .await?;
        Ok(text_field(&reply, &["mensagem", "message", "detail"]))
    }

    pub async fn favorites(&self, session: &SessionContext) -> Result<Vec<Value>, ApiError> {
        let url = self.endpoint(&["veiculos_favoritos", session.user_id.to_string().as_str()]);
        let body = self.send(Method::GET, url, None, "favorites").await?;
        unwrap_records(body, "favorites")
    }

    pub async fn compare(&self, left: VehicleId, right: VehicleId) -> Result<Value, ApiError> {
        let mut url = self.endpoint(&["comparar-carros"]);
        url.query_pairs_mut()
            .append_pair("id1", &left.to_string())
            .append_pair("id2", &right.to_string());
        self.send(Method::GET, url, None, "comparison").await
    }

    pub async fn login(&self, form: &LoginForm) -> Result<LoginResponse, ApiError> {
        form.validate()?;
        let url = self.endpoint(&["login"]);
        let body = json!({ "email": form.email.trim(), "senha": form.password });
        let reply = self.send(Method::POST, url, Some(body), "login").await?;
        decode(reply, "login")
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<RegisteredUser, ApiError> {
        form.validate()?;
        let url = self.endpoint(&["cadastro"]);
        let body = json!({
            "nome": form.name.trim(),
            "email": form.email.trim(),
            "senha": form.password,
        });
        let reply = self.send(Method::POST, url, Some(body), "registration").await?;
        decode(reply, "registration")
    }

    pub async fn change_name(
        &self,
        session: &SessionContext,
        form: &ChangeNameForm,
    ) -> Result<Option<String>, ApiError> {
        form.validate()?;
        let body = json!({ "usuario_id": session.user_id, "novo_nome": form.name.trim() });
        self.account_update(Method::PUT, "nome", body).await
    }

    pub async fn change_email(
        &self,
        session: &SessionContext,
        form: &ChangeEmailForm,
    ) -> Result<Option<String>, ApiError> {
        form.validate()?;
        let body = json!({ "usuario_id": session.user_id, "novo_email": form.email.trim() });
        self.account_update(Method::PUT, "email", body).await
    }

    pub async fn change_password(
        &self,
        session: &SessionContext,
        form: &ChangePasswordForm,
    ) -> Result<Option<String>, ApiError> {
        form.validate()?;
        let body = json!({ "usuario_id": session.user_id, "nova_senha": form.new.trim() });
        self.account_update(Method::PUT, "senha", body).await
    }

    pub async fn delete_account(&self, session: &SessionContext) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["usuario"]);
        let body = json!({ "usuario_id": session.user_id });
        let reply = self
            .send(Method::DELETE, url, Some(body), "account deletion")
            .await?;
        Ok(text_field(&reply, &["detail", "mensagem", "message"]))
    }

    async fn account_update(
        &self,
        method: Method,
        field: &str,
        body: Value,
    ) -> Result<Option<String>, ApiError> {
        let url = self.endpoint(&["usuario", field]);
        let reply = self.send(method, url, Some(body), "account update").await?;
        Ok(text_field(&reply, &["detail", "mensagem", "message"]))
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
        what: &'static str,
    ) -> Result<Value, ApiError> {
        tracing::debug!(%method, %url, "api request");
        let mut request: RequestBuilder = self.http.request(method, url);
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|error| connection_error(&self.base_url, error))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|error| connection_error(&self.base_url, error))?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), what, "api request failed");
            return Err(clean_error_response(status, &text));
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|error| ApiError::Decode {
            what,
            reason: error.to_string(),
        })
    }
}

/// Extracts the record list from a bare array or from the first known
/// wrapper key holding an array.
pub fn unwrap_records(body: Value, what: &'static str) -> Result<Vec<Value>, ApiError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut object) => LIST_WRAPPERS
            .iter()
            .find_map(|key| match object.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .ok_or_else(|| ApiError::Decode {
                what,
                reason: format!("no record list under {}", LIST_WRAPPERS.join(", ")),
            }),
        Value::Null => Ok(Vec::new()),
        other => Err(ApiError::Decode {
            what,
            reason: format!("expected a list, got {}", kind_of(&other)),
        }),
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value, what: &'static str) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|error| ApiError::Decode {
        what,
        reason: error.to_string(),
    })
}

fn text_field(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_owned)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn connection_error(base_url: &str, error: reqwest::Error) -> ApiError {
    ApiError::Connection {
        base_url: base_url.to_owned(),
        source: error,
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    detail: Option<Value>,
    #[serde(default)]
    mensagem: Option<String>,
}

fn clean_error_response(status: StatusCode, body: &str) -> ApiError {
    let status = status.as_u16();
    if let Ok(parsed) = serde_json::from_str::<ErrorEnvelope>(body) {
        let detail = match parsed.detail {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text),
            // Validation failures arrive as a list of {msg, ...} objects.
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .next()
                .map(str::to_owned),
            _ => None,
        }
        .or(parsed.mensagem.filter(|text| !text.trim().is_empty()));
        if detail.is_some() {
            return ApiError::Status { status, detail };
        }
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() < 100 && !trimmed.contains('{') {
        return ApiError::Status {
            status,
            detail: Some(trimmed.to_owned()),
        };
    }

    ApiError::Status {
        status,
        detail: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiError, GENERIC_FAILURE_MESSAGE, clean_error_response, unwrap_records};
    use reqwest::StatusCode;
    use serde_json::json;

    #[test]
    fn error_detail_is_extracted() {
        let error = clean_error_response(StatusCode::UNAUTHORIZED, r#"{"detail":"Credenciais inválidas"}"#);
        assert_eq!(error.status(), Some(401));
        assert_eq!(error.user_message(), "Credenciais inválidas");
        assert_eq!(error.to_string(), "server error (401): Credenciais inválidas");
    }

    #[test]
    fn validation_error_list_uses_first_message() {
        let body = r#"{"detail":[{"loc":["body","email"],"msg":"value is not a valid email address"}]}"#;
        let error = clean_error_response(StatusCode::UNPROCESSABLE_ENTITY, body);
        assert_eq!(error.user_message(), "value is not a valid email address");
    }

    #[test]
    fn short_plain_body_is_kept_and_html_is_not() {
        let plain = clean_error_response(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(plain.user_message(), "upstream down");

        let opaque = clean_error_response(StatusCode::INTERNAL_SERVER_ERROR, "{broken");
        assert_eq!(opaque.to_string(), "server error (500)");
        assert_eq!(opaque.user_message(), GENERIC_FAILURE_MESSAGE);
    }

    #[test]
    fn records_unwrap_from_any_wrapper() -> anyhow::Result<()> {
        assert_eq!(unwrap_records(json!([{ "id": 1 }]), "list")?.len(), 1);
        assert_eq!(unwrap_records(json!({ "carros": [{}, {}], "total": 2 }), "list")?.len(), 2);
        assert_eq!(unwrap_records(json!({ "resultados": [{}] }), "list")?.len(), 1);
        assert!(unwrap_records(json!(null), "list")?.is_empty());

        let error = unwrap_records(json!({ "total": 0 }), "list").expect_err("no list present");
        assert!(matches!(error, ApiError::Decode { what: "list", .. }));
        Ok(())
    }
}
