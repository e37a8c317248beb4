use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use splitbot_common::{Error, Result};
use tracing::info;

use super::Tool;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SKILL: &str = "\
http_curl performs a single HTTP request and returns the response.

Arguments:
- url (required): absolute http(s) URL.
- method: one of GET, POST, PUT, DELETE, PATCH, HEAD, OPTIONS. Defaults to GET.
- headers: object of header name to string value.
- body: request body as a string. Ignored for GET and HEAD.

The result is an object with status, statusText, headers and data (the body as text).

Examples:
{\"url\": \"https://status.example.com/api/health\"}
{\"url\": \"https://api.example.com/items\", \"method\": \"POST\", \"headers\": {\"Content-Type\": \"application/json\"}, \"body\": \"{\\\"name\\\": \\\"x\\\"}\"}
";

/// In-process tool performing an HTTP request, similar to `curl`.
pub struct HttpCurlTool {
    client: Client,
}

impl HttpCurlTool {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap_or_default(),
        }
    }
}

impl Default for HttpCurlTool {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CurlArgs {
    url: String,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    headers: Map<String, Value>,
    #[serde(default)]
    body: Option<String>,
}

#[async_trait]
impl Tool for HttpCurlTool {
    fn name(&self) -> &str {
        "http_curl"
    }

    fn description(&self) -> &str {
        "Perform an HTTP request to a specified URL, similar to the curl command."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "The URL to send the request to"
                },
                "method": {
                    "type": "string",
                    "enum": ["GET", "POST", "PUT", "DELETE", "PATCH", "HEAD", "OPTIONS"],
                    "default": "GET",
                    "description": "The HTTP method to use"
                },
                "headers": {
                    "type": "object",
                    "additionalProperties": {"type": "string"},
                    "description": "HTTP headers to include in the request"
                },
                "body": {
                    "type": "string",
                    "description": "The body of the request"
                }
            },
            "required": ["url"]
        })
    }

    fn tags(&self) -> Vec<String> {
        vec!["http".to_string()]
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let args: CurlArgs = serde_json::from_value(args)?;
        let method_name = args.method.as_deref().unwrap_or("GET");
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|e| Error::Http(format!("invalid HTTP method '{method_name}': {e}")))?;

        info!("executing HTTP {method} request to {}", args.url);

        let mut request = self.client.request(method.clone(), &args.url);
        for (name, value) in &args.headers {
            let value = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            request = request.header(name.as_str(), value);
        }
        if method != Method::GET
            && method != Method::HEAD
            && let Some(body) = args.body
        {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Http(format!("failed to execute request: {e}")))?;

        let status = response.status();
        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
                )
            })
            .collect();
        let data = response
            .text()
            .await
            .map_err(|e| Error::Http(format!("failed to read response body: {e}")))?;

        Ok(json!({
            "status": status.as_u16(),
            "statusText": status.canonical_reason().unwrap_or_default(),
            "headers": headers,
            "data": data,
        }))
    }

    async fn skill(&self) -> Option<String> {
        Some(SKILL.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn get_is_the_default_method() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-service", "api")
                    .set_body_string("ok"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = HttpCurlTool::new()
            .execute(json!({"url": format!("{}/health", server.uri())}))
            .await
            .unwrap();

        assert_eq!(result["status"], 200);
        assert_eq!(result["statusText"], "OK");
        assert_eq!(result["data"], "ok");
        assert_eq!(result["headers"]["x-service"], "api");
    }

    #[tokio::test]
    async fn post_sends_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/items"))
            .and(header("content-type", "application/json"))
            .and(body_string("{\"name\":\"x\"}"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let result = HttpCurlTool::new()
            .execute(json!({
                "url": format!("{}/items", server.uri()),
                "method": "POST",
                "headers": {"content-type": "application/json"},
                "body": "{\"name\":\"x\"}"
            }))
            .await
            .unwrap();

        assert_eq!(result["status"], 201);
    }

    #[tokio::test]
    async fn error_statuses_are_returned_not_raised() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
            .mount(&server)
            .await;

        let result = HttpCurlTool::new()
            .execute(json!({"url": server.uri(), "method": "DELETE"}))
            .await
            .unwrap();
        assert_eq!(result["status"], 404);
        assert_eq!(result["data"], "missing");
    }

    #[tokio::test]
    async fn unreachable_host_is_an_error() {
        let err = HttpCurlTool::new()
            .execute(json!({"url": "http://127.0.0.1:1/"}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Http(_)));
        let text = err.to_string();
        assert!(text.starts_with("http error: failed to execute request"));
        assert!(!text.contains("mcp"));
    }

    #[test]
    fn schema_accepts_defaults_and_rejects_unknown_methods() {
        let validator = HttpCurlTool::new().validator();
        assert!(validator.validate(&json!({"url": "http://x"})).is_ok());
        assert!(
            validator
                .validate(&json!({"url": "http://x", "method": "FETCH"}))
                .is_err()
        );
    }
}
