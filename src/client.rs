use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::models::{ModerationStatus, NewVideo, Video};
use crate::user_models::{Credentials, MemberApplication, Registration, Role, Session, User};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "statusCode")]
    status_code: i64,
    #[serde(default)]
    data: Value,
}

#[derive(Serialize)]
struct WithToken<'a, T: Serialize> {
    #[serde(flatten)]
    payload: &'a T,
    token: &'a str,
}

/// HTTP client for the remote catalog service. One endpoint, the operation
/// is picked by the `action` query parameter.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    api_url: String,
    http_client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            api_url: config.api_url.clone(),
            http_client: builder.build()?,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub async fn get_categories(&self) -> Result<Vec<String>> {
        let data = self.get_action("getCategories", &[]).await?;
        take_field(data, "categories")
    }

    /// Lists videos. Without `include_all` the service only returns publicly
    /// visible ones.
    pub async fn get_videos(&self, include_all: bool, category: Option<&str>) -> Result<Vec<Video>> {
        let mut params = Vec::new();
        if include_all {
            params.push(("includeAll", "true"));
        }
        if let Some(category) = category.filter(|c| !c.trim().is_empty()) {
            params.push(("category", category));
        }
        let data = self.get_action("getVideos", &params).await?;
        take_videos(data)
    }

    pub async fn search_videos(&self, keyword: &str) -> Result<Vec<Video>> {
        let data = self
            .get_action("searchVideos", &[("keyword", keyword)])
            .await?;
        take_videos(data)
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Session> {
        let data = self.post_action("login", credentials).await?;

        if !data.get("success").and_then(Value::as_bool).unwrap_or(false) {
            return Err(Error::Remote(
                error_message(&data).unwrap_or_else(|| "Login failed".to_string()),
            ));
        }

        let token = data
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::MalformedResponse("login response has no token".to_string()))?
            .to_string();
        let user: User = take_field(data, "user")?;

        Ok(Session { token, user })
    }

    pub async fn register(&self, registration: &Registration) -> Result<String> {
        let data = self.post_action("register", registration).await?;
        if data.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(Error::Remote(
                error_message(&data).unwrap_or_else(|| "Registration failed".to_string()),
            ));
        }
        Ok(data
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("Application submitted")
            .to_string())
    }

    pub async fn add_video(&self, token: &str, video: &NewVideo) -> Result<()> {
        self.post_action("addVideo", &WithToken { payload: video, token })
            .await?;
        Ok(())
    }

    pub async fn update_video(&self, token: &str, video: &Video) -> Result<()> {
        #[derive(Serialize)]
        struct UpdateBody<'a> {
            id: i64,
            #[serde(flatten)]
            video: &'a Video,
        }
        let body = UpdateBody {
            id: video.id,
            video,
        };
        self.post_action("updateVideo", &WithToken { payload: &body, token })
            .await?;
        Ok(())
    }

    pub async fn update_status(&self, token: &str, id: i64, status: ModerationStatus) -> Result<()> {
        self.post_action(
            "updateStatus",
            &json!({ "id": id, "status": status, "token": token }),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_video(&self, token: &str, id: i64) -> Result<()> {
        self.post_action("deleteVideo", &json!({ "id": id, "token": token }))
            .await?;
        Ok(())
    }

    pub async fn get_pending_members(&self, token: &str) -> Result<Vec<MemberApplication>> {
        let data = self
            .get_action("getPendingMembers", &[("token", token)])
            .await?;
        take_field(data, "members")
    }

    pub async fn approve_member(&self, token: &str, email: &str, role: &Role) -> Result<()> {
        self.post_action(
            "approveMember",
            &json!({ "email": email, "role": role, "token": token }),
        )
        .await?;
        Ok(())
    }

    pub async fn reject_member(&self, token: &str, email: &str) -> Result<()> {
        self.post_action("rejectMember", &json!({ "email": email, "token": token }))
            .await?;
        Ok(())
    }

    async fn get_action(&self, action: &str, params: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!(action, "catalog GET");
        let response = self
            .http_client
            .get(&self.api_url)
            .query(&[("action", action)])
            .query(params)
            .send()
            .await?;
        read_envelope(action, response).await
    }

    async fn post_action<B: Serialize + ?Sized>(&self, action: &str, body: &B) -> Result<Value> {
        tracing::debug!(action, "catalog POST");
        let response = self
            .http_client
            .post(&self.api_url)
            .query(&[("action", action)])
            .json(body)
            .send()
            .await?;
        read_envelope(action, response).await
    }
}

async fn read_envelope(action: &str, response: reqwest::Response) -> Result<Value> {
    let http_status = response.status();
    let text = response.text().await?;

    let envelope: Envelope = serde_json::from_str(&text).map_err(|e| {
        tracing::warn!(action, %http_status, error = %e, "response is not a catalog envelope");
        Error::MalformedResponse(format!("{} returned an unexpected body", action))
    })?;

    if envelope.status_code != 200 {
        let message = error_message(&envelope.data)
            .unwrap_or_else(|| format!("Request failed with status {}", envelope.status_code));
        tracing::debug!(action, status = envelope.status_code, %message, "catalog rejected request");
        return Err(Error::Remote(message));
    }

    Ok(envelope.data)
}

fn error_message(data: &Value) -> Option<String> {
    data.get("error")
        .and_then(Value::as_str)
        .filter(|e| !e.trim().is_empty())
        .map(str::to_string)
}

fn take_field<T: DeserializeOwned>(mut data: Value, key: &str) -> Result<T> {
    let value = data
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| Error::MalformedResponse(format!("response is missing '{}'", key)))?;
    serde_json::from_value(value)
        .map_err(|e| Error::MalformedResponse(format!("invalid '{}': {}", key, e)))
}

// Rows that fail to decode are skipped so one bad sheet row cannot hide the
// rest of the catalog.
fn take_videos(data: Value) -> Result<Vec<Video>> {
    let rows: Vec<Value> = take_field(data, "videos")?;
    Ok(rows
        .into_iter()
        .enumerate()
        .filter_map(|(index, row)| match serde_json::from_value::<Video>(row) {
            Ok(video) => Some(video),
            Err(e) => {
                tracing::warn!(row = index, error = %e, "skipping undecodable video row");
                None
            }
        })
        .collect())
}
