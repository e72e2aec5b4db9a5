pub(crate) mod graphql;
pub(crate) mod realtime;

use crate::models::{DeleteNoteInput, Note, UpdateNoteInput};
use graphql::{
    CreateNoteData, DeleteNoteData, GraphQlRequest, GraphQlResponse, InputVariables,
    ListNotesData, UpdateNoteData, CREATE_NOTE, DELETE_NOTE, LIST_NOTES, UPDATE_NOTE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
    GraphQl,
}

#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

/// Runtime endpoint configuration, read from `window.ENV`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub realtime_url: String,
}

pub(crate) const DEFAULT_API_URL: &str = "http://localhost:20002/graphql";

impl EnvConfig {
    pub fn new() -> Self {
        let env = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object());

        // Accept both `API_URL` (documented) and `api_url` spellings.
        let read = |upper: &str, lower: &str| -> Option<String> {
            let env = env.as_ref()?;
            [upper, lower].iter().find_map(|k| {
                js_sys::Reflect::get(env, &(*k).into())
                    .ok()
                    .and_then(|v| v.as_string())
                    .filter(|s| !s.trim().is_empty())
            })
        };

        Self::from_parts(
            read("API_URL", "api_url"),
            read("API_KEY", "api_key"),
            read("REALTIME_URL", "realtime_url"),
        )
    }

    pub fn from_parts(
        api_url: Option<String>,
        api_key: Option<String>,
        realtime_url: Option<String>,
    ) -> Self {
        let api_url = api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let realtime_url = realtime_url.unwrap_or_else(|| derive_realtime_url(&api_url));
        Self {
            api_url,
            api_key,
            realtime_url,
        }
    }
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// AppSync serves subscriptions from a sibling `appsync-realtime-api` host
/// over `wss`.
pub(crate) fn derive_realtime_url(api_url: &str) -> String {
    let url = if let Some(rest) = api_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = api_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        api_url.to_string()
    };
    url.replacen("appsync-api", "appsync-realtime-api", 1)
}

#[derive(Clone, Debug)]
pub(crate) struct ApiClient {
    pub(crate) config: EnvConfig,
}

impl ApiClient {
    pub fn new(config: EnvConfig) -> Self {
        Self { config }
    }

    pub fn from_env() -> Self {
        Self::new(EnvConfig::new())
    }

    fn with_auth_headers(
        mut req: reqwest::RequestBuilder,
        api_key: Option<&str>,
    ) -> reqwest::RequestBuilder {
        if let Some(key) = api_key {
            req = req.header("x-api-key", key);
        }
        req
    }

    async fn request_graphql<V: Serialize, T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        variables: V,
    ) -> ApiResult<T> {
        let client = reqwest::Client::new();
        let mut req = client.post(&self.config.api_url);
        req = Self::with_auth_headers(req, self.config.api_key.as_deref());
        req = req.json(&GraphQlRequest { query, variables });

        let res = req.send().await.map_err(ApiError::network)?;

        let status = res.status();
        if status.is_success() {
            let body: GraphQlResponse<T> = res.json().await.map_err(ApiError::parse)?;
            body.into_result()
        } else if status.as_u16() == 401 || status.as_u16() == 403 {
            Err(ApiError::unauthorized())
        } else {
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, "GraphQL request failed"))
        }
    }

    pub async fn list_notes(&self) -> ApiResult<Vec<Note>> {
        let data: ListNotesData = self
            .request_graphql(LIST_NOTES, serde_json::json!({}))
            .await?;
        Ok(data.into_notes())
    }

    pub async fn create_note(&self, note: &Note) -> ApiResult<Note> {
        let data: CreateNoteData = self
            .request_graphql(CREATE_NOTE, InputVariables { input: note })
            .await?;
        Ok(data.create_note)
    }

    pub async fn update_note(&self, input: &UpdateNoteInput) -> ApiResult<Note> {
        let data: UpdateNoteData = self
            .request_graphql(UPDATE_NOTE, InputVariables { input })
            .await?;
        Ok(data.update_note)
    }

    pub async fn delete_note(&self, input: &DeleteNoteInput) -> ApiResult<Note> {
        let data: DeleteNoteData = self
            .request_graphql(DELETE_NOTE, InputVariables { input })
            .await?;
        Ok(data.delete_note)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_url_derived_from_appsync_endpoint() {
        assert_eq!(
            derive_realtime_url("https://abc.appsync-api.us-east-1.amazonaws.com/graphql"),
            "wss://abc.appsync-realtime-api.us-east-1.amazonaws.com/graphql"
        );
    }

    #[test]
    fn test_realtime_url_for_local_mock() {
        assert_eq!(
            derive_realtime_url("http://localhost:20002/graphql"),
            "ws://localhost:20002/graphql"
        );
    }

    #[test]
    fn test_from_parts_defaults() {
        let cfg = EnvConfig::from_parts(None, None, None);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.realtime_url, "ws://localhost:20002/graphql");
    }

    #[test]
    fn test_explicit_realtime_url_wins() {
        let cfg = EnvConfig::from_parts(
            Some("https://abc.appsync-api.eu-west-1.amazonaws.com/graphql".to_string()),
            Some("da2-key".to_string()),
            Some("wss://custom.example.com/graphql/realtime".to_string()),
        );
        assert_eq!(cfg.api_key.as_deref(), Some("da2-key"));
        assert_eq!(cfg.realtime_url, "wss://custom.example.com/graphql/realtime");
    }

    #[test]
    fn test_api_error_display_is_message() {
        let e = ApiError {
            kind: ApiErrorKind::GraphQl,
            message: "boom".to_string(),
        };
        assert_eq!(e.to_string(), "boom");
    }
}
