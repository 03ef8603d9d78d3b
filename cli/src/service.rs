use std::time::Duration;

use cmr_core::error::ServiceError;
use cmr_core::flow::RecipeService;
use cmr_core::model::{ConvertRequest, ConvertResponse, ParseRequest, ParseResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

pub const PARSE_PATH: &str = "recipe/parse";
pub const CONVERT_PATH: &str = "recipe/convert";

/// Recipe service reached over HTTP with JSON bodies.
pub struct HttpRecipeService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRecipeService {
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self, String> {
        let base_url = base_url(api_url)?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        Ok(Self { client, base_url })
    }

    pub fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.base_url
            .join(path)
            .map_err(|e| ServiceError::Transport(format!("Invalid endpoint {path}: {e}")))
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ServiceError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "Calling recipe service");

        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| ServiceError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.ok().filter(|b| !b.is_empty());
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

impl RecipeService for HttpRecipeService {
    async fn parse(&self, request: &ParseRequest) -> Result<ParseResponse, ServiceError> {
        self.post(PARSE_PATH, request).await
    }

    async fn convert(&self, request: &ConvertRequest) -> Result<ConvertResponse, ServiceError> {
        self.post(CONVERT_PATH, request).await
    }
}

/// Parse the base URL, keeping any path prefix when endpoints are joined.
fn base_url(api_url: &str) -> Result<Url, String> {
    let mut url = Url::parse(api_url.trim()).map_err(|e| format!("Invalid API URL '{api_url}': {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("Unsupported API URL scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(api_url: &str) -> HttpRecipeService {
        HttpRecipeService::new(api_url, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_endpoints_on_bare_host() {
        let svc = service("http://localhost:3333");
        assert_eq!(
            svc.endpoint(PARSE_PATH).unwrap().as_str(),
            "http://localhost:3333/recipe/parse"
        );
    }

    #[test]
    fn test_endpoints_keep_path_prefix() {
        let svc = service("https://example.com/api");
        assert_eq!(
            svc.endpoint(CONVERT_PATH).unwrap().as_str(),
            "https://example.com/api/recipe/convert"
        );
        let svc = service("https://example.com/api/");
        assert_eq!(
            svc.endpoint(CONVERT_PATH).unwrap().as_str(),
            "https://example.com/api/recipe/convert"
        );
    }

    #[test]
    fn test_rejects_bad_urls() {
        assert!(HttpRecipeService::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpRecipeService::new("ftp://example.com", Duration::from_secs(1)).is_err());
    }
}
