use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::error::MirrorError;

pub const DEFAULT_API_ROOT: &str =
    "https://omgevingsloketinzage.omgeving.vlaanderen.be/proxy-omv-up/rs/v1/";

pub type ByteStream = BoxStream<'static, Result<Bytes, MirrorError>>;

/// Access to the remote inzage service. Paths are relative to the API root.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, MirrorError>;

    async fn post(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, MirrorError>;

    async fn get_binary(&self, file_id: &str) -> Result<ByteStream, MirrorError>;

    async fn get_paged(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<Value>, MirrorError> {
        match self.get(path, query).await? {
            Value::Object(mut page) => match page.remove("content") {
                Some(Value::Array(content)) => Ok(content),
                Some(Value::Null) | None => Ok(Vec::new()),
                Some(other) => Err(MirrorError::Decode {
                    url: path.to_string(),
                    message: format!("page content is not a list: {other}"),
                }),
            },
            other => Err(MirrorError::Decode {
                url: path.to_string(),
                message: format!("expected a page object, got {other}"),
            }),
        }
    }
}

#[derive(Clone)]
pub struct OmvHttpClient {
    client: Client,
    base_url: String,
}

impl OmvHttpClient {
    pub fn new(api_root: &str, timeout: Option<Duration>) -> Result<Self, MirrorError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("omv-mirror/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| MirrorError::InvalidConfig(err.to_string()))?,
        );
        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|err| MirrorError::Http {
            url: api_root.to_string(),
            message: err.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: api_root.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn download_url(&self, file_id: &str) -> String {
        self.url(&format!("inzage/bestanden/{file_id}/download"))
    }

    async fn send(
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, MirrorError> {
        let response = request.send().await.map_err(|err| MirrorError::Http {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        Self::handle_status(url, response).await
    }

    async fn handle_status(
        url: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, MirrorError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "request failed".to_string());
        Err(MirrorError::Status {
            url: url.to_string(),
            status,
            body,
        })
    }

    async fn json(url: &str, response: reqwest::Response) -> Result<Value, MirrorError> {
        response.json().await.map_err(|err| MirrorError::Decode {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

#[async_trait]
impl ResourceClient for OmvHttpClient {
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Value, MirrorError> {
        let url = self.url(path);
        let response = Self::send(&url, self.client.get(&url).query(query)).await?;
        Self::json(&url, response).await
    }

    async fn post(
        &self,
        path: &str,
        query: &[(&str, String)],
        body: &Value,
    ) -> Result<Value, MirrorError> {
        let url = self.url(path);
        let request = self.client.post(&url).query(query).json(body);
        let response = Self::send(&url, request).await?;
        Self::json(&url, response).await
    }

    async fn get_binary(&self, file_id: &str) -> Result<ByteStream, MirrorError> {
        let url = self.download_url(file_id);
        let response = Self::send(&url, self.client.get(&url)).await?;
        let stream = response.bytes_stream().map(move |chunk| {
            chunk.map_err(|err| MirrorError::Http {
                url: url.clone(),
                message: err.to_string(),
            })
        });
        Ok(stream.boxed())
    }
}
