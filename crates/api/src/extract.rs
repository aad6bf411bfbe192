//! Request body extraction for create/update endpoints that accept files.
//!
//! `multipart/form-data` bodies carry scalar fields, repeated `name[]`
//! fields and file parts. Any other content type is parsed as a JSON object.
//! Both end up as one [`Attributes`] map.
//!
//! File parts are read chunk by chunk and refused as soon as they pass the
//! size limit of their field. File parts on fields that take no file are
//! skipped unread.

use axum::extract::multipart::Field;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Json;
use bytes::{Bytes, BytesMut};
use catalog_core::attributes::{self, AttributeValue, Attributes};
use catalog_core::uploads::UploadedFile;
use catalog_core::validation::video::{file_rule, FileRule};

use crate::error::{invalid_field, AppError};

/// Submitted attributes, from either a multipart form or a JSON body.
#[derive(Debug)]
pub struct AttributesBody(pub Attributes);

impl<S> FromRequest<S> for AttributesBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return read_multipart(multipart).await.map(Self);
        }

        let Json(body) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        Ok(Self(attributes::from_json(body)?))
    }
}

async fn read_multipart(mut multipart: Multipart) -> Result<Attributes, AppError> {
    let mut attributes = Attributes::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        if name.is_empty() {
            continue;
        }

        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let Some(rule) = file_rule(&name) else {
                    tracing::debug!(field = %name, "Skipping file part on a non-file field");
                    continue;
                };
                let content_type = field.content_type().map(str::to_string);
                let data = read_limited(field, rule).await?;
                // Browsers send an empty part for an untouched file input.
                let value = if file_name.is_empty() && data.is_empty() {
                    AttributeValue::Null
                } else {
                    AttributeValue::File(UploadedFile::new(file_name, content_type, data))
                };
                attributes.insert(name, value);
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                attributes::push_text(&mut attributes, &name, text);
            }
        }
    }

    Ok(attributes)
}

/// Buffer a file part, failing with a field error once it outgrows `rule`.
async fn read_limited(mut field: Field<'_>, rule: FileRule) -> Result<Bytes, AppError> {
    let mut buffer = BytesMut::new();
    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if rule.exceeds((buffer.len() + chunk.len()) as u64) {
            tracing::info!(field = rule.field, max_size_kb = rule.max_size_kb, "Rejected oversized upload");
            return Err(invalid_field(rule.field, rule.too_large_message()));
        }
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer.freeze())
}
