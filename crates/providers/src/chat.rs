use crate::http::check_status;
use crate::ServiceError;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct ChatConfig {
    pub base_url: String,
    pub token: Option<String>,
    /// Chat replies can take much longer than list calls.
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Session ids arrive as strings from some backends and integers from others.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
        Uint(u64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
        Id::Uint(n) => n.to_string(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(alias = "response", alias = "content")]
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    cfg: Arc<ChatConfig>,
}

impl ChatClient {
    pub fn new(cfg: ChatConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            cfg: Arc::new(cfg),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    fn messages_url(&self, session_id: &str) -> Result<Url, ServiceError> {
        let mut url = Url::parse(&self.endpoint("/api/chat/sessions"))
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ServiceError::Transport("base url cannot hold a path".into()))?
            .push(session_id)
            .push("messages");
        Ok(url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.cfg.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    pub async fn list_sessions(&self) -> Result<Vec<ChatSession>, ServiceError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Listing {
            List(Vec<ChatSession>),
            Wrapped { sessions: Vec<ChatSession> },
        }

        let url = self.endpoint("/api/chat/sessions");
        debug!(%url, "GET");
        let resp = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;
        let listing: Listing = check_status(resp)
            .await?
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        Ok(match listing {
            Listing::List(s) | Listing::Wrapped { sessions: s } => s,
        })
    }

    /// Sends one message and waits for the reply unless `cancel` fires first.
    ///
    /// Cancelling drops the in-flight request and returns
    /// [`ServiceError::Cancelled`].
    pub async fn send_message(
        &self,
        session_id: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<ChatReply, ServiceError> {
        #[derive(Serialize)]
        struct MessageRequest<'a> {
            content: &'a str,
        }

        let url = self.messages_url(session_id)?;
        debug!(%url, "POST");
        let request = async {
            let resp = self
                .authorize(self.client.post(url).json(&MessageRequest { content }))
                .send()
                .await
                .map_err(|e| ServiceError::Transport(e.to_string()))?;
            check_status(resp)
                .await?
                .json::<ChatReply>()
                .await
                .map_err(|e| ServiceError::Decode(e.to_string()))
        };

        tokio::select! {
            _ = cancel.cancelled() => {
                info!(session_id, "chat request cancelled");
                Err(ServiceError::Cancelled)
            }
            reply = request => reply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ChatClient {
        ChatClient::new(ChatConfig {
            base_url: "http://localhost:8000/".into(),
            token: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn session_id_is_one_path_segment() {
        let url = client().messages_url("q1 review/#2").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/chat/sessions/q1%20review%2F%232/messages"
        );
    }

    #[test]
    fn numeric_session_ids_are_accepted() {
        let sessions: Vec<ChatSession> = serde_json::from_str(
            r#"[{"id": 42, "title": "Intake"}, {"id": "abc-1", "updated_at": null}]"#,
        )
        .unwrap();
        assert_eq!(sessions[0].id, "42");
        assert_eq!(sessions[1].id, "abc-1");
        assert!(serde_json::from_str::<ChatSession>(r#"{"id": true}"#).is_err());
    }
}
