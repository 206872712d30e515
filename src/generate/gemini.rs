use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::{
    assets::encoded::{EncodedImage, MIME_PNG},
    foundation::{
        config::SketchConfig,
        error::{GenerationError, SketchResult},
    },
    generate::generator::{SketchGenerator, SketchRequest},
    session::credential::ApiKeyStore,
};

/// Sketch generator backed by the Gemini `generateContent` REST endpoint.
///
/// The API key is read from the shared [`ApiKeyStore`] on every call, so a key selected after
/// construction is picked up without rebuilding the generator.
pub struct GeminiSketchGenerator {
    client: reqwest::blocking::Client,
    keys: ApiKeyStore,
    endpoint: String,
    prompt: String,
    image_size: String,
}

impl GeminiSketchGenerator {
    pub fn new(cfg: &SketchConfig, keys: ApiKeyStore) -> SketchResult<Self> {
        cfg.validate()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(cfg.request_timeout())
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            keys,
            endpoint: generate_endpoint(&cfg.api_base_url, &cfg.model),
            prompt: cfg.prompt.clone(),
            image_size: cfg.image_size.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl SketchGenerator for GeminiSketchGenerator {
    fn generate(&self, request: &SketchRequest<'_>) -> Result<EncodedImage, GenerationError> {
        let key = self.keys.api_key().ok_or(GenerationError::MissingCredential)?;
        let body = build_request_body(&self.prompt, &self.image_size, request)?;

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let bytes = resp
            .bytes()
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(classify_failure(status, &bytes));
        }

        let image = parse_generate_response(&bytes)?;
        tracing::debug!(mime = %image.mime, bytes = image.bytes.len(), "sketch generated");
        Ok(image)
    }
}

pub fn generate_endpoint(base_url: &str, model: &str) -> String {
    format!("{}/models/{model}:generateContent", base_url.trim_end_matches('/'))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    pub image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Prompt text followed by the frame as inline base64 data.
pub fn build_request_body(
    prompt: &str,
    image_size: &str,
    request: &SketchRequest<'_>,
) -> Result<GenerateRequest, GenerationError> {
    if request.image.is_empty() {
        return Err(GenerationError::InvalidImage("empty frame".to_string()));
    }
    if !request.image.mime.starts_with("image/") {
        return Err(GenerationError::InvalidImage(format!(
            "unsupported mime type '{}'",
            request.image.mime
        )));
    }

    Ok(GenerateRequest {
        contents: vec![Content {
            parts: vec![
                Part {
                    text: Some(prompt.to_string()),
                    ..Part::default()
                },
                Part {
                    inline_data: Some(InlineData {
                        mime_type: Some(request.image.mime.clone()),
                        data: Some(request.image.to_base64()),
                    }),
                    ..Part::default()
                },
            ],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
            image_config: ImageConfig {
                aspect_ratio: request.aspect_ratio.to_string(),
                image_size: image_size.to_string(),
            },
        },
    })
}

/// First inline image of the first candidate.
pub fn parse_generate_response(body: &[u8]) -> Result<EncodedImage, GenerationError> {
    let parsed: GenerateResponse = serde_json::from_slice(body)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

    let parts = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let inline = parts
        .into_iter()
        .filter_map(|p| p.inline_data)
        .find(|d| d.data.as_deref().is_some_and(|s| !s.is_empty()))
        .ok_or(GenerationError::MissingImage)?;

    let mime = inline.mime_type.unwrap_or_else(|| MIME_PNG.to_string());
    let data = inline.data.unwrap_or_default();
    EncodedImage::from_base64(mime, &data)
        .map_err(|e| GenerationError::MalformedResponse(e.to_string()))
}

/// Map a non-2xx response to the generation error taxonomy.
pub fn classify_failure(status: u16, body: &[u8]) -> GenerationError {
    let (message, api_status) = match serde_json::from_slice::<ErrorEnvelope>(body) {
        Ok(env) => (env.error.message, env.error.status),
        Err(_) => (String::from_utf8_lossy(body).trim().to_string(), String::new()),
    };

    let key_problem = message.contains("API key")
        || message.contains("Requested entity was not found")
        || api_status == "PERMISSION_DENIED"
        || api_status == "UNAUTHENTICATED";

    match status {
        401 | 403 => GenerationError::Rejected { status, message },
        400 | 404 if key_problem => GenerationError::Rejected { status, message },
        429 => GenerationError::QuotaExceeded { message },
        _ if api_status == "RESOURCE_EXHAUSTED" => GenerationError::QuotaExceeded { message },
        _ => GenerationError::Http { status, message },
    }
}

#[cfg(test)]
#[path = "../../tests/unit/generate/gemini.rs"]
mod tests;
