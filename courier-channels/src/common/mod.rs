use crate::base::{DispatchError, Result};

/// Create a standard HTTP client with timeout
pub fn create_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(|e| DispatchError::Send(format!("Failed to build HTTP client: {}", e)))
}

/// Turn a non-success HTTP response into an API error
pub async fn check_response(platform: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(DispatchError::Api(format!(
        "{} API error: {} - {}",
        platform, status, body
    )))
}
