use event_schema::api::{
    CreatePostRequest, CreatePostResponse, ErrorBody, LoginRequest, LoginResponse,
    LogoutRequest, MessageResponse, PublicUser, RegisterRequest, RegisterResponse,
};
use event_schema::Post;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ClientError;

/// Typed client for the feed-service HTTP API
#[derive(Debug, Clone)]
pub struct FeedApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl FeedApi {
    /// `base_url` like `http://127.0.0.1:5100` (no trailing path)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// WebSocket endpoint derived from the HTTP base URL
    pub fn live_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            self.base_url.clone()
        };
        format!("{ws_base}/ws")
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn authorized(&self, req: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        let token = self.token.as_deref().ok_or(ClientError::NotAuthenticated)?;
        Ok(req.bearer_auth(token))
    }

    pub async fn register(&self, req: &RegisterRequest) -> Result<PublicUser, ClientError> {
        let res = self.http.post(self.url("/auth/register")).json(req).send().await?;
        let body: RegisterResponse = decode(res).await?;
        Ok(body.user)
    }

    /// Log in and keep the issued token for later calls
    pub async fn login(&mut self, req: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let res = self.http.post(self.url("/auth/login")).json(req).send().await?;
        let body: LoginResponse = decode(res).await?;
        self.token = Some(body.token.clone());
        Ok(body)
    }

    /// Revoke the current token. It is kept locally so callers can observe
    /// that it is rejected afterwards.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let token = self.token.clone().ok_or(ClientError::NotAuthenticated)?;
        let res = self
            .http
            .post(self.url("/auth/logout"))
            .json(&LogoutRequest { token: Some(token) })
            .send()
            .await?;
        let _: MessageResponse = decode(res).await?;
        Ok(())
    }

    pub async fn create_post(&self, content: &str) -> Result<Post, ClientError> {
        let req = self.authorized(self.http.post(self.url("/posts")))?;
        let res = req
            .json(&CreatePostRequest {
                content: content.to_string(),
            })
            .send()
            .await?;
        let body: CreatePostResponse = decode(res).await?;
        Ok(body.post)
    }

    pub async fn list_posts(&self) -> Result<Vec<Post>, ClientError> {
        let res = self.http.get(self.url("/posts")).send().await?;
        decode(res).await
    }

    pub async fn list_posts_by_user(&self, user_id: Uuid) -> Result<Vec<Post>, ClientError> {
        let res = self
            .http
            .get(self.url(&format!("/posts/user/{user_id}")))
            .send()
            .await?;
        decode(res).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<PublicUser, ClientError> {
        let res = self
            .http
            .get(self.url(&format!("/auth/getuser/{user_id}")))
            .send()
            .await?;
        decode(res).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    let status = res.status();
    let bytes = res.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .map(|b| b.error)
            .or_else(|_| {
                serde_json::from_slice::<Value>(&bytes).map(|v| v.to_string())
            })
            .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
        return Err(ClientError::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_url_follows_scheme() {
        assert_eq!(
            FeedApi::new("http://127.0.0.1:5100/").live_url(),
            "ws://127.0.0.1:5100/ws"
        );
        assert_eq!(
            FeedApi::new("https://pulse.example").live_url(),
            "wss://pulse.example/ws"
        );
    }

    #[tokio::test]
    async fn protected_calls_need_a_token() {
        let api = FeedApi::new("http://127.0.0.1:9");
        assert!(matches!(
            api.create_post("hi").await,
            Err(ClientError::NotAuthenticated)
        ));
        assert!(matches!(api.logout().await, Err(ClientError::NotAuthenticated)));
    }
}
