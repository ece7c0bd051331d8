use serde::{Deserialize, Serialize};

/// An image attached to a generation request, in the order it was uploaded.
/// For two-image modes (watermark, product mockup) the second attachment
/// plays a different role than the first, so order is preserved end to end.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ImageGenerationRequest {
    pub prompt: String,
    pub images: Vec<ImageAttachment>,
}

impl ImageGenerationRequest {
    pub fn text_to_image(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            images: Vec::new(),
        }
    }
}

/// One part of a model response, already decoded from the wire format.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePart {
    Image(Vec<u8>),
    Text(String),
}

/// Success body returned to the browser
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiImageResponse {
    pub image: String,
}

/// Failure body returned to the browser
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
}

impl ApiErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// --- Gemini generateContent wire types ---

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    pub parts: Option<Vec<Part>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub text: Option<String>,
    #[serde(alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: Option<String>,
    pub data: String,
}
