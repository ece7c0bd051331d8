use actix_multipart::Multipart;
use actix_web::{web, HttpResponse, Result as ActixResult};
use futures::StreamExt;

use crate::encoding;
use crate::error::Result;
use crate::imaging;
use crate::models::{ApiErrorResponse, ApiImageResponse, ImageAttachment, ImageGenerationRequest};

use super::AppState;

const INDEX_HTML: &str = include_str!("../../static/index.html");

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "gateway_configured": state.generator.is_configured(),
    }))
}

/// POST /api/process-image - image-to-image operations. Requires `prompt`
/// and a primary `image` file; an optional `image2` accompanies it for
/// watermark and mockup modes.
pub async fn process_image(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> ActixResult<HttpResponse> {
    let form = match collect_form(&mut payload).await {
        Ok(form) => form,
        Err(response) => return Ok(response),
    };

    let prompt = match form.prompt.filter(|prompt| !prompt.trim().is_empty()) {
        Some(prompt) => prompt,
        None => return Ok(bad_request("No prompt provided")),
    };

    let upload = match form.image.filter(UploadedFile::is_attached) {
        Some(file) => file,
        None => return Ok(bad_request("No image provided")),
    };

    log::info!(
        "Processing image request: \"{}\" ({} bytes uploaded)",
        prompt,
        upload.data.len()
    );

    let mut attachments = Vec::new();
    match prepare_attachment(&upload.data, state.max_image_dimension) {
        Ok(attachment) => attachments.push(attachment),
        Err(e) => return Ok(server_error(&e)),
    }

    if let Some(second) = form.image2.filter(UploadedFile::is_attached) {
        match prepare_attachment(&second.data, state.max_image_dimension) {
            Ok(attachment) => attachments.push(attachment),
            Err(e) => return Ok(server_error(&e)),
        }
    }

    let request = ImageGenerationRequest {
        prompt,
        images: attachments,
    };

    respond_with_generation(&state, request).await
}

/// POST /api/text-to-image - pure generation from a prompt.
pub async fn text_to_image(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> ActixResult<HttpResponse> {
    let form = match collect_form(&mut payload).await {
        Ok(form) => form,
        Err(response) => return Ok(response),
    };

    let prompt = match form.prompt.filter(|prompt| !prompt.trim().is_empty()) {
        Some(prompt) => prompt,
        None => return Ok(bad_request("No prompt provided")),
    };

    log::info!("Text-to-image request: \"{}\"", prompt);

    respond_with_generation(&state, ImageGenerationRequest::text_to_image(prompt)).await
}

async fn respond_with_generation(
    state: &web::Data<AppState>,
    request: ImageGenerationRequest,
) -> ActixResult<HttpResponse> {
    match state.generator.generate(request).await {
        Ok(bytes) => Ok(HttpResponse::Ok().json(ApiImageResponse {
            image: encoding::encode(&bytes),
        })),
        Err(e) => {
            log::error!("API error: {}", e);
            Ok(HttpResponse::InternalServerError()
                .json(ApiErrorResponse::new(format!("API error: {}", e))))
        }
    }
}

/// Decode, normalize and re-encode one upload. The decoded bitmap lives
/// only inside this call.
fn prepare_attachment(bytes: &[u8], max_dimension: u32) -> Result<ImageAttachment> {
    let prepared = imaging::prepare_upload(bytes, max_dimension)?;
    let data = imaging::to_png_bytes(&prepared)?;

    Ok(ImageAttachment {
        mime_type: "image/png".to_string(),
        data,
    })
}

struct UploadedFile {
    filename: String,
    data: Vec<u8>,
}

impl UploadedFile {
    /// The browser submits file inputs even when nothing was picked; an
    /// empty filename or empty body means no actual attachment.
    fn is_attached(&self) -> bool {
        !self.filename.is_empty() && !self.data.is_empty()
    }
}

#[derive(Default)]
struct UploadForm {
    prompt: Option<String>,
    image: Option<UploadedFile>,
    image2: Option<UploadedFile>,
}

async fn collect_form(payload: &mut Multipart) -> std::result::Result<UploadForm, HttpResponse> {
    let mut form = UploadForm::default();

    while let Some(item) = payload.next().await {
        let mut field = match item {
            Ok(field) => field,
            Err(e) => {
                log::error!("Error reading multipart field: {}", e);
                return Err(bad_request(&format!("Invalid multipart data: {}", e)));
            }
        };

        let field_name = match field.name() {
            Some(name) => name.to_string(),
            None => continue,
        };

        match field_name.as_str() {
            "prompt" => {
                let mut data = Vec::new();
                while let Some(chunk) = field.next().await {
                    match chunk {
                        Ok(bytes) => data.extend_from_slice(&bytes),
                        Err(e) => {
                            log::error!("Error reading prompt field: {}", e);
                            return Err(bad_request("Error reading prompt field"));
                        }
                    }
                }
                form.prompt = Some(String::from_utf8_lossy(&data).to_string());
            }
            "image" | "image2" => {
                let filename = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename())
                    .unwrap_or_default()
                    .to_string();

                let mut data = Vec::new();
                while let Some(chunk) = field.next().await {
                    match chunk {
                        Ok(bytes) => data.extend_from_slice(&bytes),
                        Err(e) => {
                            log::error!("Error reading file chunk: {}", e);
                            return Err(bad_request("Error reading uploaded file"));
                        }
                    }
                }

                let file = UploadedFile { filename, data };
                if field_name == "image" {
                    form.image = Some(file);
                } else {
                    form.image2 = Some(file);
                }
            }
            _ => {
                // Drain unknown fields
                while field.next().await.is_some() {}
            }
        }
    }

    Ok(form)
}

fn bad_request(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(ApiErrorResponse::new(message))
}

fn server_error(e: &crate::error::GeminiError) -> HttpResponse {
    log::error!("Server error: {}", e);
    HttpResponse::InternalServerError().json(ApiErrorResponse::new(format!("Server error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeminiError;
    use crate::gemini::ImageGenerator;
    use crate::server::configure;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use image::{DynamicImage, Rgb, RgbImage};
    use std::io::Cursor;
    use std::sync::{Arc, Mutex};

    const BOUNDARY: &str = "----pixgen-test-boundary";

    struct StubGenerator {
        bytes: Vec<u8>,
        last_request: Mutex<Option<ImageGenerationRequest>>,
    }

    impl StubGenerator {
        fn new(bytes: Vec<u8>) -> Self {
            Self {
                bytes,
                last_request: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl ImageGenerator for StubGenerator {
        async fn generate(&self, request: ImageGenerationRequest) -> crate::error::Result<Vec<u8>> {
            *self.last_request.lock().unwrap() = Some(request);
            Ok(self.bytes.clone())
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl ImageGenerator for FailingGenerator {
        async fn generate(&self, _request: ImageGenerationRequest) -> crate::error::Result<Vec<u8>> {
            Err(GeminiError::ResponseError(
                "No image data found in the API response".into(),
            ))
        }

        fn is_configured(&self) -> bool {
            false
        }
    }

    fn text_part(name: &str, value: &str) -> Vec<u8> {
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        )
        .into_bytes()
    }

    fn file_part(name: &str, filename: &str, data: &[u8]) -> Vec<u8> {
        let mut part = format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            BOUNDARY, name, filename
        )
        .into_bytes();
        part.extend_from_slice(data);
        part.extend_from_slice(b"\r\n");
        part
    }

    fn multipart_body(parts: Vec<Vec<u8>>) -> (String, Vec<u8>) {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(&part);
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

        (
            format!("multipart/form-data; boundary={}", BOUNDARY),
            body,
        )
    }

    fn sample_png() -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])));
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
        buffer.into_inner()
    }

    macro_rules! post {
        ($app:expr, $uri:expr, $parts:expr $(,)?) => {{
            let (content_type, body) = multipart_body($parts);
            let req = test::TestRequest::post()
                .uri($uri)
                .insert_header(("content-type", content_type))
                .set_payload(body)
                .to_request();
            test::call_service($app, req)
        }};
    }

    macro_rules! test_app {
        ($generator:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(AppState {
                        generator: $generator,
                        max_image_dimension: 1024,
                    }))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn text_to_image_requires_a_prompt() {
        let app = test_app!(Arc::new(StubGenerator::new(b"png".to_vec())));

        let resp = post!(&app, "/api/text-to-image", vec![]).await;
        assert_eq!(resp.status(), 400);
        let body: ApiErrorResponse = test::read_body_json(resp).await;
        assert!(!body.error.is_empty());
    }

    #[actix_web::test]
    async fn blank_prompt_is_rejected() {
        let app = test_app!(Arc::new(StubGenerator::new(b"png".to_vec())));

        let resp = post!(&app, "/api/text-to-image", vec![text_part("prompt", "   ")]).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn process_image_requires_a_prompt_even_with_an_image() {
        let app = test_app!(Arc::new(StubGenerator::new(b"png".to_vec())));

        let resp = post!(
            &app,
            "/api/process-image",
            vec![file_part("image", "photo.png", &sample_png())],
        )
        .await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn process_image_requires_an_image() {
        let app = test_app!(Arc::new(StubGenerator::new(b"png".to_vec())));

        let resp = post!(
            &app,
            "/api/process-image",
            vec![text_part("prompt", "make it sepia")],
        )
        .await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn empty_filename_counts_as_no_image() {
        let app = test_app!(Arc::new(StubGenerator::new(b"png".to_vec())));

        let resp = post!(
            &app,
            "/api/process-image",
            vec![
                text_part("prompt", "make it sepia"),
                file_part("image", "", &sample_png()),
            ],
        )
        .await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn text_to_image_returns_the_generated_image_as_base64() {
        let generated = b"\x89PNG\r\n\x1a\ngenerated image".to_vec();
        let app = test_app!(Arc::new(StubGenerator::new(generated.clone())));

        let resp = post!(
            &app,
            "/api/text-to-image",
            vec![text_part("prompt", "a red circle")],
        )
        .await;
        assert_eq!(resp.status(), 200);

        let body: ApiImageResponse = test::read_body_json(resp).await;
        assert_eq!(body.image, encoding::encode(&generated));
        assert_eq!(encoding::decode(&body.image).unwrap(), generated);
    }

    #[actix_web::test]
    async fn process_image_forwards_prompt_and_prepared_attachments() {
        let generator = Arc::new(StubGenerator::new(b"result".to_vec()));
        let app = test_app!(generator.clone());

        let resp = post!(
            &app,
            "/api/process-image",
            vec![
                text_part("prompt", "add a watermark"),
                file_part("image", "photo.png", &sample_png()),
                file_part("image2", "mark.png", &sample_png()),
            ],
        )
        .await;
        assert_eq!(resp.status(), 200);

        let request = generator.last_request.lock().unwrap().take().unwrap();
        assert_eq!(request.prompt, "add a watermark");
        assert_eq!(request.images.len(), 2);
        assert!(request
            .images
            .iter()
            .all(|attachment| attachment.mime_type == "image/png"));
        // Attachments are re-encoded PNGs, decodable by the same codec
        assert!(image::load_from_memory(&request.images[0].data).is_ok());
    }

    #[actix_web::test]
    async fn undecodable_upload_is_a_server_error() {
        let app = test_app!(Arc::new(StubGenerator::new(b"png".to_vec())));

        let resp = post!(
            &app,
            "/api/process-image",
            vec![
                text_part("prompt", "make it sepia"),
                file_part("image", "notes.txt", b"this is not an image"),
            ],
        )
        .await;
        assert_eq!(resp.status(), 500);

        let body: ApiErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.contains("Server error"));
    }

    #[actix_web::test]
    async fn gateway_failure_maps_to_a_500_with_the_message() {
        let app = test_app!(Arc::new(FailingGenerator));

        let resp = post!(
            &app,
            "/api/text-to-image",
            vec![text_part("prompt", "a red circle")],
        )
        .await;
        assert_eq!(resp.status(), 500);

        let body: ApiErrorResponse = test::read_body_json(resp).await;
        assert!(body.error.contains("No image data"));
    }

    #[actix_web::test]
    async fn health_reports_gateway_state() {
        let app = test_app!(Arc::new(FailingGenerator));

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["gateway_configured"], false);
    }
}
