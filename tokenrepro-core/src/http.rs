//! HTTP client abstraction used by the token check client and the identity
//! platform adapters.
//!
//! Everything that talks to the network goes through [`HttpClient`] so the
//! callers can be exercised in tests without a server. The default
//! implementation wraps reqwest.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::Error;

/// A fully-read HTTP response. Header names are lowercase.
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// A generic trait for making HTTP requests. Non-2xx statuses are returned
/// as responses, only transport failures are errors.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn get(&self, url: String, headers: HashMap<String, String>) -> Result<HttpResponse, Error>;

    async fn post_form(
        &self,
        url: String,
        headers: HashMap<String, String>,
        form: Vec<(String, String)>,
    ) -> Result<HttpResponse, Error>;
}

#[derive(Clone, Default)]
pub struct DefaultHttpClient {
    client: reqwest::Client,
}

impl DefaultHttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn read(response: reqwest::Response) -> Result<HttpResponse, Error> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.text().await?;
        Ok(HttpResponse { status, headers, body })
    }
}

#[async_trait]
impl HttpClient for DefaultHttpClient {
    async fn get(&self, url: String, headers: HashMap<String, String>) -> Result<HttpResponse, Error> {
        let mut request = self.client.get(&url);
        for (key, value) in headers {
            request = request.header(&key, value);
        }
        let response = request.send().await?;
        Self::read(response).await
    }

    async fn post_form(
        &self,
        url: String,
        headers: HashMap<String, String>,
        form: Vec<(String, String)>,
    ) -> Result<HttpResponse, Error> {
        let mut request = self.client.post(&url).form(&form);
        for (key, value) in headers {
            request = request.header(&key, value);
        }
        let response = request.send().await?;
        Self::read(response).await
    }
}

/// `Authorization: Bearer <token>` as a header map.
pub fn bearer_headers(token: &str) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), format!("Bearer {}", token));
    headers
}
