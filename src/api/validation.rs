use thiserror::Error;

use super::models::HairstyleRequest;
use crate::config::ApiLimits;

#[derive(Debug, Error)]
pub enum RequestValidationError {
    #[error("styles must contain between 1 and {0} entries")]
    InvalidStyleCount(usize),
    #[error("photo_url must be an http/https url")]
    InvalidPhotoUrl,
    #[error("style names must not be empty")]
    EmptyStyleName,
    #[error("style name '{0}' exceeds 128 characters")]
    StyleNameTooLong(String),
    #[error("cover for '{0}' must be an http/https url")]
    InvalidCoverUrl(String),
    #[error("detail exceeds {0} characters")]
    DetailTooLong(usize),
}

pub fn validate_hairstyle_request(
    request: &HairstyleRequest,
    limits: &ApiLimits,
) -> Result<(), RequestValidationError> {
    if !(1..=limits.max_styles_per_request).contains(&request.styles.len()) {
        return Err(RequestValidationError::InvalidStyleCount(
            limits.max_styles_per_request,
        ));
    }

    if !is_http_url(&request.photo_url) {
        return Err(RequestValidationError::InvalidPhotoUrl);
    }

    for style in &request.styles {
        if style.name.trim().is_empty() {
            return Err(RequestValidationError::EmptyStyleName);
        }

        if style.name.len() > 128 {
            return Err(RequestValidationError::StyleNameTooLong(style.name.clone()));
        }

        if let Some(cover) = &style.cover {
            if !is_http_url(cover) {
                return Err(RequestValidationError::InvalidCoverUrl(style.name.clone()));
            }
        }
    }

    if let Some(cover) = &request.color.cover {
        if !is_http_url(cover) {
            return Err(RequestValidationError::InvalidCoverUrl(
                request.color.name.clone(),
            ));
        }
    }

    if let Some(detail) = &request.detail {
        if detail.chars().count() > limits.max_detail_chars {
            return Err(RequestValidationError::DetailTooLong(
                limits.max_detail_chars,
            ));
        }
    }

    Ok(())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
