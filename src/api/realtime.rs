//! AppSync real-time subscriptions over WebSocket (`graphql-ws` sub-protocol).
//!
//! Handshake: `connection_init` -> `connection_ack` -> `start` -> `start_ack`,
//! then one `data` frame per pushed event. `stop` ends the subscription.

use crate::api::graphql::{OnCreateNoteData, ON_CREATE_NOTE};
use crate::api::EnvConfig;
use crate::models::Note;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, MessageEvent, WebSocket};

pub(crate) const SUB_PROTOCOL: &str = "graphql-ws";

#[derive(Debug, Error)]
pub(crate) enum RealtimeError {
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("websocket error: {0}")]
    Socket(String),
}

/// Auth block sent both in the connect URL and with every `start`.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct AuthHeader {
    pub host: String,
    #[serde(rename = "x-api-key", skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl AuthHeader {
    pub fn from_config(config: &EnvConfig) -> Result<Self, RealtimeError> {
        let url = reqwest::Url::parse(&config.api_url)
            .map_err(|e| RealtimeError::Endpoint(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| RealtimeError::Endpoint(config.api_url.clone()))?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self {
            host,
            api_key: config.api_key.clone(),
        })
    }
}

pub(crate) fn connect_url(realtime_url: &str, auth: &AuthHeader) -> Result<String, RealtimeError> {
    let header = serde_json::to_string(auth)?;
    let header = base64::engine::general_purpose::STANDARD.encode(header);
    // `e30=` is base64 for `{}`.
    Ok(format!(
        "{realtime_url}?header={}&payload=e30=",
        urlencoding::encode(&header)
    ))
}

#[derive(Serialize, Clone, Debug)]
pub(crate) struct StartPayload {
    /// JSON-encoded `{query, variables}`.
    pub data: String,
    pub extensions: StartExtensions,
}

#[derive(Serialize, Clone, Debug)]
pub(crate) struct StartExtensions {
    pub authorization: AuthHeader,
}

#[derive(Serialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ClientMessage {
    ConnectionInit,
    Start { id: String, payload: StartPayload },
    Stop { id: String },
}

impl ClientMessage {
    pub fn start(id: &str, query: &str, auth: &AuthHeader) -> Result<Self, RealtimeError> {
        let data = serde_json::to_string(&serde_json::json!({
            "query": query,
            "variables": {},
        }))?;
        Ok(Self::Start {
            id: id.to_string(),
            payload: StartPayload {
                data,
                extensions: StartExtensions {
                    authorization: auth.clone(),
                },
            },
        })
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub(crate) struct AckPayload {
    #[serde(rename = "connectionTimeoutMs", default)]
    pub connection_timeout_ms: Option<u64>,
}

#[derive(Deserialize, Clone, Debug)]
pub(crate) struct DataPayload {
    pub data: Option<OnCreateNoteData>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ServerMessage {
    ConnectionAck {
        #[serde(default)]
        payload: AckPayload,
    },
    Ka,
    StartAck {
        id: String,
    },
    Data {
        id: String,
        payload: DataPayload,
    },
    #[serde(rename = "error")]
    SubscriptionError {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        payload: serde_json::Value,
    },
    Complete {
        id: String,
    },
    ConnectionError {
        #[serde(default)]
        payload: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

/// What the socket owner should do after one server frame.
#[derive(Clone, Debug)]
pub(crate) enum Step {
    Send(ClientMessage),
    Deliver(Note),
    Ignore,
    Finished,
}

/// Protocol state for a single subscription on one socket.
#[derive(Clone, Debug)]
pub(crate) struct SubscriptionProtocol {
    id: String,
    query: &'static str,
    auth: AuthHeader,
    started: bool,
}

impl SubscriptionProtocol {
    pub fn new(id: String, query: &'static str, auth: AuthHeader) -> Self {
        Self {
            id,
            query,
            auth,
            started: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn handle(&mut self, msg: ServerMessage) -> Result<Step, RealtimeError> {
        match msg {
            ServerMessage::ConnectionAck { payload } => {
                tracing::debug!(
                    timeout_ms = ?payload.connection_timeout_ms,
                    "realtime connection acknowledged"
                );
                if self.started {
                    return Ok(Step::Ignore);
                }
                self.started = true;
                Ok(Step::Send(ClientMessage::start(
                    &self.id, self.query, &self.auth,
                )?))
            }
            ServerMessage::Ka => {
                tracing::trace!("realtime keep-alive");
                Ok(Step::Ignore)
            }
            ServerMessage::StartAck { id } => {
                tracing::info!(subscription = %id, "subscription started");
                Ok(Step::Ignore)
            }
            ServerMessage::Data { id, payload } => {
                if id != self.id {
                    return Ok(Step::Ignore);
                }
                if !payload.errors.is_empty() {
                    tracing::warn!(errors = ?payload.errors, "subscription data carried errors");
                }
                match payload.data.and_then(|d| d.on_create_note) {
                    Some(note) => Ok(Step::Deliver(note)),
                    None => Ok(Step::Ignore),
                }
            }
            ServerMessage::SubscriptionError { id, payload } => {
                tracing::error!(subscription = ?id, %payload, "subscription error");
                Ok(Step::Ignore)
            }
            ServerMessage::Complete { id } => {
                if id == self.id {
                    Ok(Step::Finished)
                } else {
                    Ok(Step::Ignore)
                }
            }
            ServerMessage::ConnectionError { payload } => {
                tracing::error!(%payload, "realtime connection error");
                Ok(Step::Finished)
            }
            ServerMessage::Unknown => {
                tracing::debug!("ignoring unknown realtime message");
                Ok(Step::Ignore)
            }
        }
    }
}

fn send(socket: &WebSocket, msg: &ClientMessage) -> Result<(), RealtimeError> {
    let text = serde_json::to_string(msg)?;
    socket
        .send_with_str(&text)
        .map_err(|e| RealtimeError::Socket(format!("{e:?}")))
}

/// Live `onCreateNote` subscription. Dropping it unsubscribes.
pub(crate) struct NoteSubscription {
    socket: WebSocket,
    id: String,
    closed: bool,
    _on_open: Closure<dyn FnMut(web_sys::Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

impl NoteSubscription {
    pub fn open(
        config: &EnvConfig,
        on_note: impl Fn(Note) + 'static,
    ) -> Result<Self, RealtimeError> {
        let auth = AuthHeader::from_config(config)?;
        let url = connect_url(&config.realtime_url, &auth)?;

        let socket = WebSocket::new_with_str(&url, SUB_PROTOCOL)
            .map_err(|e| RealtimeError::Socket(format!("{e:?}")))?;

        let id = uuid::Uuid::new_v4().to_string();
        let mut protocol = SubscriptionProtocol::new(id.clone(), ON_CREATE_NOTE, auth);
        tracing::debug!(subscription = protocol.id(), "opening realtime socket");

        let open_socket = socket.clone();
        let on_open = Closure::<dyn FnMut(web_sys::Event)>::new(move |_ev: web_sys::Event| {
            if let Err(e) = send(&open_socket, &ClientMessage::ConnectionInit) {
                tracing::error!(error = %e, "failed to send connection_init");
            }
        });

        let message_socket = socket.clone();
        let on_message = Closure::<dyn FnMut(MessageEvent)>::new(move |ev: MessageEvent| {
            let Some(text) = ev.data().as_string() else {
                return;
            };
            let msg = match serde_json::from_str::<ServerMessage>(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!(error = %e, "unparseable realtime message");
                    return;
                }
            };
            match protocol.handle(msg) {
                Ok(Step::Send(reply)) => {
                    if let Err(e) = send(&message_socket, &reply) {
                        tracing::error!(error = %e, "failed to send realtime message");
                    }
                }
                Ok(Step::Deliver(note)) => on_note(note),
                Ok(Step::Finished) => {
                    let _ = message_socket.close();
                }
                Ok(Step::Ignore) => {}
                Err(e) => tracing::error!(error = %e, "realtime protocol error"),
            }
        });

        let on_close = Closure::<dyn FnMut(CloseEvent)>::new(move |ev: CloseEvent| {
            tracing::warn!(code = ev.code(), reason = %ev.reason(), "realtime socket closed");
        });

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Self {
            socket,
            id,
            closed: false,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
        })
    }

    /// Sends `stop`, closes the socket and detaches callbacks. Idempotent.
    pub fn unsubscribe(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if self.socket.ready_state() == WebSocket::OPEN {
            let _ = send(&self.socket, &ClientMessage::Stop { id: self.id.clone() });
        }
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
        let _ = self.socket.close();
        tracing::info!(subscription = %self.id, "unsubscribed");
    }
}

impl Drop for NoteSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthHeader {
        AuthHeader {
            host: "abc.appsync-api.us-east-1.amazonaws.com".to_string(),
            api_key: Some("da2-key".to_string()),
        }
    }

    fn protocol() -> SubscriptionProtocol {
        SubscriptionProtocol::new("sub-1".to_string(), ON_CREATE_NOTE, auth())
    }

    fn parse(json: &str) -> ServerMessage {
        serde_json::from_str(json).expect("server message should parse")
    }

    #[test]
    fn test_auth_header_from_config() {
        let cfg = EnvConfig::from_parts(
            Some("https://abc.appsync-api.us-east-1.amazonaws.com/graphql".to_string()),
            Some("da2-key".to_string()),
            None,
        );
        assert_eq!(AuthHeader::from_config(&cfg).expect("valid url"), auth());

        let local = EnvConfig::from_parts(None, None, None);
        let a = AuthHeader::from_config(&local).expect("valid url");
        assert_eq!(a.host, "localhost:20002");
        assert!(a.api_key.is_none());
    }

    #[test]
    fn test_auth_header_rejects_bad_url() {
        let cfg = EnvConfig::from_parts(Some("not a url".to_string()), None, None);
        assert!(matches!(
            AuthHeader::from_config(&cfg),
            Err(RealtimeError::Endpoint(_))
        ));
    }

    #[test]
    fn test_connect_url_encodes_header() {
        let url = connect_url("wss://rt.example.com/graphql", &auth()).expect("should build");
        let (base, query) = url.split_once('?').expect("has query");
        assert_eq!(base, "wss://rt.example.com/graphql");
        assert!(query.ends_with("&payload=e30="));

        let header = query
            .strip_prefix("header=")
            .and_then(|q| q.split('&').next())
            .expect("header param");
        let header = urlencoding::decode(header).expect("url-decodable");
        let raw = base64::engine::general_purpose::STANDARD
            .decode(header.as_bytes())
            .expect("base64");
        let v: serde_json::Value = serde_json::from_slice(&raw).expect("json");
        assert_eq!(v["host"], "abc.appsync-api.us-east-1.amazonaws.com");
        assert_eq!(v["x-api-key"], "da2-key");
    }

    #[test]
    fn test_client_message_wire_format() {
        let init = serde_json::to_value(ClientMessage::ConnectionInit).expect("serialize");
        assert_eq!(init, serde_json::json!({"type": "connection_init"}));

        let stop = serde_json::to_value(ClientMessage::Stop {
            id: "sub-1".to_string(),
        })
        .expect("serialize");
        assert_eq!(stop, serde_json::json!({"type": "stop", "id": "sub-1"}));

        let start = ClientMessage::start("sub-1", ON_CREATE_NOTE, &auth()).expect("start");
        let v = serde_json::to_value(start).expect("serialize");
        assert_eq!(v["type"], "start");
        assert_eq!(v["id"], "sub-1");
        assert_eq!(v["payload"]["extensions"]["authorization"]["x-api-key"], "da2-key");
        let data: serde_json::Value =
            serde_json::from_str(v["payload"]["data"].as_str().expect("string data"))
                .expect("data is json");
        assert!(data["query"]
            .as_str()
            .unwrap_or_default()
            .contains("onCreateNote"));
    }

    #[test]
    fn test_ack_triggers_single_start() {
        let mut p = protocol();
        let ack = r#"{"type":"connection_ack","payload":{"connectionTimeoutMs":300000}}"#;

        match p.handle(parse(ack)).expect("handled") {
            Step::Send(ClientMessage::Start { id, .. }) => assert_eq!(id, "sub-1"),
            other => panic!("expected start, got {other:?}"),
        }
        assert!(matches!(p.handle(parse(ack)), Ok(Step::Ignore)));
    }

    #[test]
    fn test_data_for_our_subscription_is_delivered() {
        let mut p = protocol();
        let data = r#"{
            "type": "data",
            "id": "sub-1",
            "payload": {"data": {"onCreateNote": {
                "id": "n1", "name": "A", "description": "x", "completed": false, "clientId": "peer"
            }}}
        }"#;
        match p.handle(parse(data)).expect("handled") {
            Step::Deliver(note) => {
                assert_eq!(note.id, "n1");
                assert_eq!(note.client_id.as_deref(), Some("peer"));
            }
            other => panic!("expected delivery, got {other:?}"),
        }
    }

    #[test]
    fn test_data_for_other_subscription_is_ignored() {
        let mut p = protocol();
        let data = r#"{"type":"data","id":"other","payload":{"data":{"onCreateNote":null}}}"#;
        assert!(matches!(p.handle(parse(data)), Ok(Step::Ignore)));
    }

    #[test]
    fn test_keepalive_and_unknown_messages_are_ignored() {
        let mut p = protocol();
        assert!(matches!(p.handle(parse(r#"{"type":"ka"}"#)), Ok(Step::Ignore)));
        assert!(matches!(
            p.handle(parse(r#"{"type":"something_new"}"#)),
            Ok(Step::Ignore)
        ));
        assert!(matches!(
            p.handle(parse(r#"{"type":"start_ack","id":"sub-1"}"#)),
            Ok(Step::Ignore)
        ));
    }

    #[test]
    fn test_complete_and_connection_error_finish() {
        let mut p = protocol();
        assert!(matches!(
            p.handle(parse(r#"{"type":"complete","id":"sub-1"}"#)),
            Ok(Step::Finished)
        ));
        assert!(matches!(
            p.handle(parse(
                r#"{"type":"connection_error","payload":{"errors":[{"message":"denied"}]}}"#
            )),
            Ok(Step::Finished)
        ));
    }

    #[test]
    fn test_subscription_error_is_logged_not_fatal() {
        let mut p = protocol();
        let err = r#"{"type":"error","id":"sub-1","payload":{"errors":[{"errorType":"x"}]}}"#;
        assert!(matches!(p.handle(parse(err)), Ok(Step::Ignore)));
        assert_eq!(p.id(), "sub-1");
    }
}
