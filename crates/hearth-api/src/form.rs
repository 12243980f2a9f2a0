//! Form decoding shared by the chat and session endpoints
//!
//! Both endpoints accept `multipart/form-data` (needed for image uploads)
//! and `application/x-www-form-urlencoded`.

use axum::{
    Form, RequestExt,
    extract::{Multipart, Request},
    http::header::CONTENT_TYPE,
};
use hearth::{ImageAttachment, SamplingParameters};
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::ApiError;

/// Name of the file field carrying an image
pub const IMAGE_FIELD: &str = "image";

/// Decoded form fields plus an optional uploaded image
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    image: Option<ImageAttachment>,
}

impl FormData {
    pub async fn from_request(req: Request) -> Result<Self, ApiError> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();

        if content_type.starts_with("application/x-www-form-urlencoded") {
            let Form(fields) = req
                .extract::<Form<HashMap<String, String>>, _>()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid form payload: {e}")))?;
            return Ok(Self {
                fields,
                image: None,
            });
        }

        if content_type.starts_with("multipart/form-data") {
            let mut multipart = req
                .extract::<Multipart, _>()
                .await
                .map_err(|e| ApiError::bad_request(format!("Invalid multipart payload: {e}")))?;

            let mut form = Self::default();
            while let Some(field) = multipart
                .next_field()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed reading multipart field: {e}")))?
            {
                let name = field.name().unwrap_or_default().to_string();
                if name == IMAGE_FIELD {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(|e| {
                        ApiError::bad_request(format!("Failed reading multipart 'image' field: {e}"))
                    })?;
                    // browsers send an empty part when no file was picked
                    if !bytes.is_empty() {
                        form.image = Some(ImageAttachment::new(bytes.to_vec(), content_type));
                    }
                } else {
                    let text = field.text().await.map_err(|e| {
                        ApiError::bad_request(format!(
                            "Failed reading multipart '{name}' field: {e}"
                        ))
                    })?;
                    form.fields.insert(name, text);
                }
            }
            return Ok(form);
        }

        Err(ApiError::unsupported_media_type(
            "Expected request with `Content-Type: multipart/form-data` or `application/x-www-form-urlencoded`",
        ))
    }

    /// Field value as sent
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Trimmed field value; blank counts as absent
    pub fn text(&self, name: &str) -> Option<String> {
        self.raw(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Parsed numeric field; blank counts as absent
    pub fn number<T>(&self, name: &str) -> Result<Option<T>, ApiError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.text(name) {
            None => Ok(None),
            Some(value) => value.parse().map(Some).map_err(|e| {
                ApiError::bad_request(format!("Invalid value '{value}' for '{name}': {e}"))
            }),
        }
    }

    /// `true` only for the literal "true", in any case
    pub fn flag(&self, name: &str) -> bool {
        self.text(name)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// `temperature` and `top_k`, defaulting to 0.8 and 40
    pub fn sampling(&self) -> Result<SamplingParameters, ApiError> {
        let defaults = SamplingParameters::default();
        let temperature = self.number::<f32>("temperature")?.unwrap_or(defaults.temperature);
        if !temperature.is_finite() {
            return Err(ApiError::bad_request("temperature must be a finite number"));
        }
        let top_k = self.number::<usize>("top_k")?.unwrap_or(defaults.top_k);
        Ok(SamplingParameters { temperature, top_k })
    }

    pub fn take_image(&mut self) -> Option<ImageAttachment> {
        self.image.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> FormData {
        FormData {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            image: None,
        }
    }

    #[test]
    fn test_flag() {
        assert!(form(&[("vision", "TRUE")]).flag("vision"));
        assert!(form(&[("vision", "true")]).flag("vision"));
        assert!(!form(&[("vision", "yes")]).flag("vision"));
        assert!(!form(&[("vision", "1")]).flag("vision"));
        assert!(!form(&[]).flag("vision"));
    }

    #[test]
    fn test_sampling_defaults() {
        let sampling = form(&[("temperature", ""), ("top_k", " ")]).sampling().unwrap();
        assert_eq!(sampling, SamplingParameters::default());

        let sampling = form(&[("temperature", "0.2"), ("top_k", "5")])
            .sampling()
            .unwrap();
        assert!((sampling.temperature - 0.2).abs() < 1e-6);
        assert_eq!(sampling.top_k, 5);
    }

    #[test]
    fn test_invalid_number() {
        let err = form(&[("num_ctx", "lots")]).number::<u32>("num_ctx").unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
        assert!(err.message.contains("num_ctx"));

        let err = form(&[("top_k", "-3")]).sampling().unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::BAD_REQUEST);
    }
}
