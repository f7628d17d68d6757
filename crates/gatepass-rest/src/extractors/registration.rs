//! Multipart registration form extractor.

use super::RequestRejection;
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
};
use gatepass_service::{ImageUpload, RegisterRequest};
use serde_json::{Map, Value};
use validator::Validate;

/// Name of the form part carrying the profile image.
pub const IMAGE_FIELD: &str = "image";

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A parsed and validated registration form.
///
/// Text parts map onto the camelCase fields of [`RegisterRequest`]; empty
/// values count as absent. The `image` part is required.
#[derive(Debug)]
pub struct RegistrationForm {
    pub request: RegisterRequest,
    pub image: ImageUpload,
}

#[async_trait]
impl<S> FromRequest<S> for RegistrationForm
where
    S: Send + Sync,
{
    type Rejection = RequestRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mut multipart = Multipart::from_request(req, state)
            .await
            .map_err(|e| RequestRejection::Form(e.body_text()))?;

        let mut fields = Map::new();
        let mut image = None;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| RequestRejection::Form(e.body_text()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if name == IMAGE_FIELD {
                let file_name = field.file_name().unwrap_or(IMAGE_FIELD).to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| RequestRejection::Form(e.body_text()))?;
                image = Some(ImageUpload::new(file_name, content_type, bytes.to_vec()));
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| RequestRejection::Form(e.body_text()))?;
                if !value.is_empty() {
                    fields.insert(name, Value::String(value));
                }
            }
        }

        let image =
            image.ok_or_else(|| RequestRejection::Form("Image is required".to_string()))?;

        let request: RegisterRequest = serde_json::from_value(Value::Object(fields))
            .map_err(|e| RequestRejection::Form(format!("Invalid registration form: {e}")))?;
        request.validate().map_err(RequestRejection::Validation)?;

        Ok(Self { request, image })
    }
}
