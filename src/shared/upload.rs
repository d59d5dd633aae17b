use std::collections::HashMap;
use std::str::FromStr;

use axum::extract::Multipart;
use tracing::debug;

use crate::core::error::{AppError, Result};
use crate::shared::constants::{ALLOWED_IMAGE_TYPES, MAX_IMAGE_SIZE};

pub const FILE_TOO_LARGE_MESSAGE: &str = "File too large. Max size is 5MB.";
pub const TOO_MANY_FILES_MESSAGE: &str = "Too many files. Maximum is 5 images.";
pub const INVALID_FILE_TYPE_MESSAGE: &str = "Only image files (jpg, jpeg, png, gif) are allowed.";

/// Image file read from a multipart form
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub data: Vec<u8>,
    pub content_type: String,
    pub extension: String,
}

/// Text fields and image files of a multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    pub images: Vec<UploadedImage>,
}

/// Checks extension, MIME type and size. Returns the normalised extension.
pub fn check_image(file_name: &str, content_type: &str, size: usize) -> Result<String> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    let content_type = content_type.to_ascii_lowercase();

    let allowed = ALLOWED_IMAGE_TYPES
        .iter()
        .any(|(ext, mime)| *ext == extension && *mime == content_type);
    if !allowed {
        return Err(AppError::Upload(INVALID_FILE_TYPE_MESSAGE.to_string()));
    }

    if size > MAX_IMAGE_SIZE {
        return Err(AppError::Upload(FILE_TOO_LARGE_MESSAGE.to_string()));
    }

    Ok(extension)
}

impl MultipartForm {
    /// Reads every field. Files under `image_field` are checked and kept, up
    /// to `max_images`; other file fields are ignored.
    pub async fn read(
        mut multipart: Multipart,
        image_field: &str,
        max_images: usize,
    ) -> Result<Self> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| {
            debug!("Failed to read multipart field: {}", e);
            AppError::BadRequest(format!("Failed to read multipart data: {}", e))
        })? {
            let name = field.name().unwrap_or("").to_string();

            if let Some(file_name) = field.file_name().map(str::to_string) {
                if name != image_field {
                    debug!("Ignoring unexpected file field: {}", name);
                    continue;
                }
                if form.images.len() >= max_images {
                    return Err(AppError::Upload(TOO_MANY_FILES_MESSAGE.to_string()));
                }

                let content_type = field
                    .content_type()
                    .map(str::to_string)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                // Reject by name and type before buffering the body
                check_image(&file_name, &content_type, 0)?;

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                let extension = check_image(&file_name, &content_type, data.len())?;

                form.images.push(UploadedImage {
                    data: data.to_vec(),
                    content_type: content_type.to_ascii_lowercase(),
                    extension,
                });
            } else {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read field '{}': {}", name, e))
                })?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    #[cfg(test)]
    pub fn from_fields(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            images: Vec::new(),
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Field value with surrounding whitespace removed; empty values read as absent
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Field value as sent, including empty strings
    pub fn raw(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    pub fn parse<T: FromStr>(&self, name: &str) -> Result<Option<T>> {
        match self.text(name) {
            Some(v) => v
                .parse::<T>()
                .map(Some)
                .map_err(|_| AppError::validation(format!("Invalid value for {}", name))),
            None => Ok(None),
        }
    }

    /// Tri-state read for nullable columns: absent, present and empty, or set
    pub fn nullable<T: FromStr>(&self, name: &str) -> Result<Option<Option<T>>> {
        if !self.has(name) {
            return Ok(None);
        }
        Ok(Some(self.parse(name)?))
    }

    pub fn take_image(&mut self) -> Option<UploadedImage> {
        if self.images.is_empty() {
            None
        } else {
            Some(self.images.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_image_accepts_known_types() {
        assert_eq!(check_image("photo.JPG", "image/jpeg", 10).unwrap(), "jpg");
        assert_eq!(check_image("a.png", "image/png", 10).unwrap(), "png");
        assert_eq!(check_image("a.gif", "image/gif", MAX_IMAGE_SIZE).unwrap(), "gif");
    }

    #[test]
    fn test_check_image_rejects_type_mismatch() {
        for (name, mime) in [
            ("doc.pdf", "application/pdf"),
            ("fake.png", "text/plain"),
            ("noext", "image/png"),
        ] {
            match check_image(name, mime, 10) {
                Err(AppError::Upload(msg)) => assert_eq!(msg, INVALID_FILE_TYPE_MESSAGE),
                other => panic!("expected upload error, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_check_image_rejects_oversize() {
        match check_image("big.png", "image/png", MAX_IMAGE_SIZE + 1) {
            Err(AppError::Upload(msg)) => assert_eq!(msg, FILE_TOO_LARGE_MESSAGE),
            other => panic!("expected upload error, got {:?}", other),
        }
    }

    #[test]
    fn test_form_field_helpers() {
        let form = MultipartForm::from_fields(&[
            ("title", "  Flooded road  "),
            ("end_date", ""),
            ("location_lat", "10.12"),
            ("location_lng", "east"),
        ]);

        assert_eq!(form.text("title").as_deref(), Some("Flooded road"));
        assert!(form.has("end_date"));
        assert_eq!(form.text("end_date"), None);
        assert_eq!(form.raw("end_date").as_deref(), Some(""));
        assert_eq!(form.parse::<f64>("location_lat").unwrap(), Some(10.12));
        assert!(form.parse::<f64>("location_lng").is_err());
        assert_eq!(form.parse::<f64>("missing").unwrap(), None);

        assert_eq!(form.nullable::<f64>("end_date").unwrap(), Some(None));
        assert_eq!(form.nullable::<f64>("missing").unwrap(), None);
    }
}
