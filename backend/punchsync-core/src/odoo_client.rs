// src/odoo_client.rs

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::directory::{
    format_remote_datetime, EmployeeRef, RecordRef, RemoteDirectory, RemoteError,
};

pub const AUTHENTICATE_PATH: &str = "/web/session/authenticate";
pub const CALL_KW_PATH: &str = "/web/dataset/call_kw";
pub const EMPLOYEE_MODEL: &str = "hr.employee";
pub const ATTENDANCE_MODEL: &str = "hr.attendance";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Longest slice of a non-2xx response body kept in `RemoteError::Http`.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// Connection settings for the Odoo instance, read from the environment
/// (`ODOO_URL`, `ODOO_DB`, `ODOO_USERNAME`, `ODOO_PASSWORD`, `API_KEY`).
#[derive(Debug, Clone, Deserialize)]
pub struct OdooConfig {
    pub odoo_url: String,
    pub odoo_db: String,
    pub odoo_username: String,
    pub odoo_password: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub odoo_timeout_secs: u64,
}

impl OdooConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        envy::from_env::<OdooConfig>().map(OdooConfig::with_usable_timeout)
    }

    /// A zero timeout would fail every request immediately; fall back to the default.
    pub(crate) fn with_usable_timeout(mut self) -> Self {
        if self.odoo_timeout_secs == 0 {
            warn!(
                "ODOO_TIMEOUT_SECS=0 is not usable, using {} seconds",
                DEFAULT_TIMEOUT_SECS
            );
            self.odoo_timeout_secs = DEFAULT_TIMEOUT_SECS;
        }
        self
    }
}

// --- JSON-RPC envelope ---

#[derive(Debug, Serialize)]
struct RpcRequest<P: Serialize> {
    jsonrpc: &'static str,
    method: &'static str,
    params: P,
}

impl<P: Serialize> RpcRequest<P> {
    fn call(params: P) -> Self {
        Self {
            jsonrpc: "2.0",
            method: "call",
            params,
        }
    }
}

#[derive(Debug, Serialize)]
struct AuthenticateParams<'a> {
    db: &'a str,
    login: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CallKwParams<'a> {
    model: &'a str,
    method: &'a str,
    args: Value,
    kwargs: Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcErrorData {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<RpcErrorData>,
}

impl RpcErrorPayload {
    /// `data.message` carries the server-side exception text; the top-level
    /// message is usually a generic "Odoo Server Error".
    pub fn into_message(self) -> String {
        self.data
            .and_then(|d| d.message)
            .or(self.message)
            .unwrap_or_else(|| "Unknown Odoo error".to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorPayload>,
}

impl RpcResponse {
    pub fn into_result(self) -> Result<Value, RemoteError> {
        if let Some(error) = self.error {
            return Err(RemoteError::backend(error.into_message()));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmployeeRecord {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
}

// --- Payload builders ---

pub fn badge_lookup_args(identifier: &str) -> (Value, Value) {
    (
        json!([[["barcode", "=", identifier]]]),
        json!({ "fields": ["id", "name"], "limit": 1 }),
    )
}

pub fn employee_values(identifier: &str, display_name: &str) -> Value {
    json!({
        "name": display_name,
        "barcode": identifier,
        "pin": identifier,
    })
}

pub fn attendance_values(
    employee: EmployeeRef,
    check_in: &NaiveDateTime,
    check_out: Option<&NaiveDateTime>,
) -> Value {
    let mut values = json!({
        "employee_id": employee.0,
        "check_in": format_remote_datetime(check_in),
    });
    if let Some(check_out) = check_out {
        values["check_out"] = Value::String(format_remote_datetime(check_out));
    }
    values
}

/// `create` answers with either a bare id or a list holding one id.
pub fn parse_created_id(value: &Value) -> Result<i64, RemoteError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| RemoteError::UnexpectedPayload(format!("non-integer id {}", n))),
        Value::Array(items) => match items.first() {
            Some(first) => parse_created_id(first),
            None => Err(RemoteError::UnexpectedPayload(
                "create returned an empty id list".to_string(),
            )),
        },
        other => Err(RemoteError::UnexpectedPayload(format!(
            "create returned {}",
            other
        ))),
    }
}

pub fn parse_login_uid(value: &Value) -> Result<i64, RemoteError> {
    value
        .get("uid")
        .and_then(Value::as_i64)
        .ok_or_else(|| RemoteError::LoginFailed("Could not get user ID".to_string()))
}

/// Keeps error bodies (often whole HTML pages) short enough to group and print.
pub fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_ERROR_BODY_CHARS {
        return body.to_string();
    }
    let mut short: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
    short.push('…');
    short
}

fn endpoint(base_url: &str, path: &str) -> Result<String, RemoteError> {
    let url = format!("{}{}", base_url.trim_end_matches('/'), path);
    // Validate the final URL
    Url::parse(&url)?;
    Ok(url)
}

// --- Client ---

/// Authenticated JSON-RPC session against one Odoo database.
pub struct OdooClient {
    config: OdooConfig,
    http_client: Client,
    uid: i64,
}

impl OdooClient {
    /// Builds the HTTP client and logs in. The session cookie returned by the
    /// login is reused for every later call.
    pub async fn connect(config: OdooConfig) -> Result<Self, RemoteError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.odoo_timeout_secs))
            .cookie_store(true)
            .build()?;

        let uid = Self::login(&http_client, &config).await?;
        info!(
            "Logged in to Odoo at {} (db '{}') as uid {}",
            config.odoo_url, config.odoo_db, uid
        );

        Ok(Self {
            config,
            http_client,
            uid,
        })
    }

    pub fn uid(&self) -> i64 {
        self.uid
    }

    async fn login(http_client: &Client, config: &OdooConfig) -> Result<i64, RemoteError> {
        let url = endpoint(&config.odoo_url, AUTHENTICATE_PATH)?;
        let request = RpcRequest::call(AuthenticateParams {
            db: &config.odoo_db,
            login: &config.odoo_username,
            password: &config.odoo_password,
            api_key: config.api_key.as_deref(),
        });

        let result = match Self::post_rpc(http_client, &url, &request, "authenticate").await {
            Ok(result) => result,
            Err(RemoteError::Backend { message }) => return Err(RemoteError::LoginFailed(message)),
            Err(e) => return Err(e),
        };
        parse_login_uid(&result)
    }

    async fn post_rpc<P: Serialize>(
        http_client: &Client,
        url: &str,
        request: &RpcRequest<P>,
        context_msg: &str,
    ) -> Result<Value, RemoteError> {
        debug!("Sending '{}' to {}", context_msg, url);
        let response = http_client
            .post(url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                error!("HTTP request for '{}' failed: {}", context_msg, e);
                RemoteError::Request(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            error!(
                "Odoo error response for '{}': Status={}, Body='{}'",
                context_msg, status, body
            );
            return Err(RemoteError::Http {
                status,
                body: truncate_body(&body),
            });
        }

        let parsed: RpcResponse = serde_json::from_str(&body).map_err(|e| {
            error!("JSON deserialization failed for '{}': {}", context_msg, e);
            RemoteError::Json(e)
        })?;
        parsed.into_result().map_err(|e| {
            warn!("Odoo reported an error for '{}': {}", context_msg, e);
            e
        })
    }

    pub async fn call_kw(
        &self,
        model: &str,
        method: &str,
        args: Value,
        kwargs: Value,
    ) -> Result<Value, RemoteError> {
        let url = endpoint(&self.config.odoo_url, CALL_KW_PATH)?;
        let request = RpcRequest::call(CallKwParams {
            model,
            method,
            args,
            kwargs,
        });
        let context_msg = format!("{}.{}", model, method);
        Self::post_rpc(&self.http_client, &url, &request, &context_msg).await
    }
}

#[async_trait]
impl RemoteDirectory for OdooClient {
    async fn resolve_employee(&self, identifier: &str) -> Result<Option<EmployeeRef>, RemoteError> {
        let (args, kwargs) = badge_lookup_args(identifier);
        let result = self
            .call_kw(EMPLOYEE_MODEL, "search_read", args, kwargs)
            .await?;
        let employees: Vec<EmployeeRecord> = serde_json::from_value(result)?;
        Ok(employees.first().map(|e| EmployeeRef(e.id)))
    }

    async fn create_employee(
        &self,
        identifier: &str,
        display_name: &str,
    ) -> Result<EmployeeRef, RemoteError> {
        let args = json!([employee_values(identifier, display_name)]);
        let result = self
            .call_kw(EMPLOYEE_MODEL, "create", args, json!({}))
            .await?;
        parse_created_id(&result).map(EmployeeRef)
    }

    async fn create_attendance_session(
        &self,
        employee: EmployeeRef,
        check_in: NaiveDateTime,
        check_out: Option<NaiveDateTime>,
    ) -> Result<RecordRef, RemoteError> {
        let args = json!([attendance_values(employee, &check_in, check_out.as_ref())]);
        let result = self
            .call_kw(ATTENDANCE_MODEL, "create", args, json!({}))
            .await?;
        parse_created_id(&result).map(RecordRef)
    }
}
