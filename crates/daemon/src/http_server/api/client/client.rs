use reqwest::{header::HeaderMap, header::HeaderValue, Client, StatusCode};
use url::Url;

use super::error::{ApiError, RemoteError};
use super::ApiRequest;

#[derive(Debug, Clone)]
pub struct ApiClient {
    pub remote: Url,
    client: Client,
}

impl ApiClient {
    pub fn new(remote: &Url) -> Result<Self, ApiError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(default_headers).build()?;

        Ok(Self {
            remote: remote.clone(),
            client,
        })
    }

    pub async fn call<T: ApiRequest>(&mut self, request: T) -> Result<T::Response, ApiError> {
        match self.fetch(request).await? {
            Some(response) => Ok(response),
            None => Err(ApiError::HttpStatus(
                StatusCode::NOT_MODIFIED,
                "unexpected 304 for a non-conditional request".into(),
            )),
        }
    }

    /// Like [`ApiClient::call`], but a `304 Not Modified` yields `None`
    pub async fn fetch<T: ApiRequest>(
        &mut self,
        request: T,
    ) -> Result<Option<T::Response>, ApiError> {
        let request_builder = request.build_request(&self.remote, &self.client)?;
        let response = request_builder.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return Ok(None);
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(Some(serde_json::from_value(serde_json::Value::Null)?));
        }
        if status.is_success() {
            return Ok(Some(response.json::<T::Response>().await?));
        }

        let text = response.text().await?;
        match serde_json::from_str::<RemoteError>(&text) {
            Ok(body) => Err(ApiError::Remote { status, body }),
            Err(_) => Err(ApiError::HttpStatus(status, text)),
        }
    }

    /// Get the base URL for API requests
    pub fn base_url(&self) -> &Url {
        &self.remote
    }

    /// Get the underlying HTTP client for custom requests
    pub fn http_client(&self) -> &Client {
        &self.client
    }
}
