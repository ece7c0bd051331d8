use crate::{
    config::GeminiConfig,
    error::{GeminiError, Result},
    models::{GenerateContentResponse, ImageGenerationRequest, ResponsePart},
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;
use std::time::Duration;

use super::ImageGenerator;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Clone)]
pub struct GeminiImageClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model_id: String,
    base_url: String,
}

impl GeminiImageClient {
    /// Builds the client. A missing API key is not an error here: the client
    /// is constructed in a disabled state and every call reports the missing
    /// configuration instead.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeminiError::ClientError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key: config.api_key,
            model_id: config.model_id.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// One `parts` array: the prompt first, then each image in upload order.
    fn build_request_payload(request: &ImageGenerationRequest) -> serde_json::Value {
        let mut parts = vec![json!({ "text": request.prompt })];
        for image in &request.images {
            parts.push(json!({
                "inline_data": {
                    "mime_type": image.mime_type,
                    "data": STANDARD.encode(&image.data),
                }
            }));
        }

        json!({ "contents": [{ "parts": parts }] })
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageClient {
    async fn generate(&self, request: ImageGenerationRequest) -> Result<Vec<u8>> {
        let api_key = match &self.api_key {
            Some(key) => key,
            None => {
                return Err(GeminiError::ConfigError(
                    "Google API key is not configured, image generation is disabled".into(),
                ))
            }
        };

        let payload = Self::build_request_payload(&request);
        let url = format!("{}/{}:generateContent", self.base_url, self.model_id);

        log::info!(
            "Invoking image model: {} ({} attached image(s))",
            self.model_id,
            request.images.len()
        );
        let _timer = crate::logger::timer("gemini generateContent");

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                log::error!("Gemini API call failed: {}", e);
                if e.is_timeout() {
                    GeminiError::RequestError(format!("Gemini API call timed out: {}", e))
                } else {
                    GeminiError::RequestError(format!("Gemini API call failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GeminiError::ResponseError(format!("Failed to read API response: {}", e)))?;

        if !status.is_success() {
            return Err(GeminiError::RequestError(format!(
                "Gemini API returned HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|e| GeminiError::ResponseError(format!("Failed to parse API response: {}", e)))?;

        interpret_parts(collect_parts(parsed)?)
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Flattens the candidate/content nesting of the wire format into the parts
/// the caller cares about, decoding inline image payloads along the way.
fn collect_parts(response: GenerateContentResponse) -> Result<Vec<ResponsePart>> {
    let mut parts = Vec::new();
    for candidate in response.candidates {
        let wire_parts = match candidate.content.and_then(|content| content.parts) {
            Some(parts) => parts,
            None => continue,
        };

        for part in wire_parts {
            if let Some(inline) = part.inline_data {
                let data = STANDARD.decode(&inline.data).map_err(|e| {
                    GeminiError::ResponseError(format!("Failed to decode inline image data: {}", e))
                })?;
                parts.push(ResponsePart::Image(data));
            } else if let Some(text) = part.text {
                parts.push(ResponsePart::Text(text));
            }
        }
    }

    Ok(parts)
}

/// Scans the parts in order. The first inline image wins and the rest are
/// ignored. With no image, text parts are concatenated into the error
/// message; with nothing at all, a fixed "no image data" error results.
fn interpret_parts(parts: Vec<ResponsePart>) -> Result<Vec<u8>> {
    let mut texts: Vec<String> = Vec::new();

    for part in parts {
        match part {
            ResponsePart::Image(data) => return Ok(data),
            ResponsePart::Text(text) => texts.push(text),
        }
    }

    if texts.is_empty() {
        Err(GeminiError::ResponseError(
            "No image data found in the API response".into(),
        ))
    } else {
        Err(GeminiError::ResponseError(format!(
            "The model returned text instead of an image: {}",
            texts.join(" ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn image_part_wins_over_text_parts() {
        let parts = vec![
            ResponsePart::Text("Sure, here you go:".to_string()),
            ResponsePart::Image(b"image bytes".to_vec()),
            ResponsePart::Text("anything else?".to_string()),
        ];

        assert_eq!(interpret_parts(parts).unwrap(), b"image bytes".to_vec());
    }

    #[test]
    fn first_of_several_images_is_returned() {
        let parts = vec![
            ResponsePart::Image(b"first".to_vec()),
            ResponsePart::Image(b"second".to_vec()),
        ];

        assert_eq!(interpret_parts(parts).unwrap(), b"first".to_vec());
    }

    #[test]
    fn empty_response_is_a_no_content_error() {
        let err = interpret_parts(Vec::new()).unwrap_err();
        assert!(err.to_string().contains("No image data"));
    }

    #[test]
    fn text_only_response_carries_the_text_in_order() {
        let parts = vec![
            ResponsePart::Text("I cannot".to_string()),
            ResponsePart::Text("draw that.".to_string()),
        ];

        let err = interpret_parts(parts).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("returned text instead of an image"));
        assert!(message.contains("I cannot draw that."));
    }

    #[tokio::test]
    async fn unconfigured_client_fails_without_network_io() {
        let client = GeminiImageClient::new(GeminiConfig::new()).unwrap();
        assert!(!client.is_configured());

        let err = client
            .generate(ImageGenerationRequest::text_to_image("a red circle"))
            .await
            .unwrap_err();

        match err {
            GeminiError::ConfigError(msg) => assert!(msg.contains("not configured")),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn generate_extracts_the_inline_image() {
        let server = MockServer::start().await;
        let image_bytes = b"\x89PNG\r\n\x1a\nfake image payload".to_vec();

        let body = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "Here is your image." },
                        {
                            "inlineData": {
                                "mimeType": "image/png",
                                "data": STANDARD.encode(&image_bytes),
                            }
                        }
                    ]
                }
            }]
        });

        Mock::given(method("POST"))
            .and(path(format!("/{}:generateContent", DEFAULT_MODEL)))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = GeminiImageClient::new(GeminiConfig::new().with_api_key("test-key"))
            .unwrap()
            .with_base_url(server.uri());

        let result = client
            .generate(ImageGenerationRequest::text_to_image("a red circle"))
            .await
            .unwrap();

        assert_eq!(result, image_bytes);
    }

    #[tokio::test]
    async fn text_only_api_response_is_an_error() {
        let server = MockServer::start().await;

        let body = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{ "text": "I can only describe that scene." }]
                }
            }]
        });

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = GeminiImageClient::new(GeminiConfig::new().with_api_key("test-key"))
            .unwrap()
            .with_base_url(server.uri());

        let err = client
            .generate(ImageGenerationRequest::text_to_image("a red circle"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("returned text instead of an image"));
    }

    #[tokio::test]
    async fn api_error_status_is_surfaced_as_request_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exceeded"))
            .mount(&server)
            .await;

        let client = GeminiImageClient::new(GeminiConfig::new().with_api_key("test-key"))
            .unwrap()
            .with_base_url(server.uri());

        let err = client
            .generate(ImageGenerationRequest::text_to_image("a red circle"))
            .await
            .unwrap_err();

        match err {
            GeminiError::RequestError(msg) => {
                assert!(msg.contains("429"));
                assert!(msg.contains("quota exceeded"));
            }
            other => panic!("expected RequestError, got {:?}", other),
        }
    }
}
