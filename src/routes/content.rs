use axum::body::Body;
use axum::extract::multipart::Field;
use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::Response;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path};
use crate::intake::{self, IncomingFile};
use crate::models::{Category, ContentItem, ContentStatus};
use crate::state::AppState;
use crate::store::{ContentPatch, ContentStats, NewContentItem};

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn attachment_content_disposition(filename: &str) -> Option<String> {
    if filename.is_empty() {
        return None;
    }

    let sanitized: String = filename
        .chars()
        .map(|ch| match ch {
            '"' | '\\' => '_',
            _ => ch,
        })
        .collect();

    let encoded =
        percent_encoding::utf8_percent_encode(&sanitized, percent_encoding::NON_ALPHANUMERIC);
    Some(format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized, encoded
    ))
}

async fn text_field(field: Field<'_>, label: &str) -> AppResult<String> {
    field.text().await.map_err(|err| {
        let msg = format!("invalid {label} field: {err}");
        error!(error = %err, field = label, "invalid multipart text field");
        AppError::bad_request(msg)
    })
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim())
        .filter(|tag| !tag.is_empty())
        .map(|tag| tag.to_string())
        .collect()
}

async fn file_field(field: Field<'_>) -> AppResult<IncomingFile> {
    let declared = field.file_name().map(|name| name.to_string());
    let data = field.bytes().await.map_err(|err| {
        let msg = format!("failed to read file bytes: {err}");
        error!(error = %err, "failed to read file bytes");
        AppError::bad_request(msg)
    })?;
    let declared = declared.ok_or_else(|| {
        error!("upload rejected: missing original filename");
        AppError::bad_request("filename is required")
    })?;
    Ok(IncomingFile {
        name: declared,
        bytes: data.to_vec(),
    })
}

pub async fn list_content(State(state): State<AppState>) -> Json<Vec<ContentItem>> {
    Json(state.content.list())
}

pub async fn get_content(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<ContentItem>> {
    Ok(Json(state.content.get(id)?))
}

pub async fn upload_content(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<ContentItem>)> {
    let mut file: Option<IncomingFile> = None;
    let mut name: Option<String> = None;
    let mut description = String::new();
    let mut category: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();
    let mut version: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        let msg = format!("invalid multipart data: {err}");
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(msg)
    })? {
        let field_name = field.name().map(|n| n.to_string());
        match field_name.as_deref() {
            Some("file") => file = Some(file_field(field).await?),
            Some("name") => name = Some(text_field(field, "name").await?),
            Some("description") => description = text_field(field, "description").await?,
            Some("category") => category = Some(text_field(field, "category").await?),
            Some("tags") => {
                let raw = text_field(field, "tags").await?;
                tags = parse_tags(&raw);
            }
            Some("version") => version = Some(text_field(field, "version").await?),
            _ => {}
        }
    }

    let file = file.ok_or_else(|| {
        error!("upload rejected: missing file field");
        AppError::bad_request("file field is required")
    })?;

    let declared_name = file.name.clone();
    let category = match category {
        Some(raw) => Category::from_name(raw.trim()).ok_or_else(|| {
            AppError::bad_request(
                "category must be one of Documents, Images, Videos, Audio, Other",
            )
        })?,
        None => intake::category_for(&declared_name),
    };

    let stored = state.intake.intake(file).await?;

    let item = state.content.create(NewContentItem {
        name: name.unwrap_or_else(|| declared_name.clone()),
        category,
        size: intake::human_size(stored.byte_size),
        status: ContentStatus::Pending,
        tags,
        file_path: format!("/uploads/{}", stored.stored_path),
        version: version.unwrap_or_else(|| "1.0".to_string()),
        description,
    });

    info!(
        content_id = item.id,
        name = %item.name,
        size = %item.size,
        "content upload succeeded"
    );

    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn upload_content_bulk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<Vec<ContentItem>>)> {
    let mut files: Vec<IncomingFile> = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        let msg = format!("invalid multipart data: {err}");
        error!(error = %err, "invalid multipart data");
        AppError::bad_request(msg)
    })? {
        let field_name = field.name().map(|n| n.to_string());
        if field_name.as_deref() == Some("files") {
            files.push(file_field(field).await?);
        }
    }

    if files.is_empty() {
        error!("bulk upload rejected: no files");
        return Err(AppError::bad_request("no files uploaded"));
    }

    let declared: Vec<String> = files.iter().map(|file| file.name.clone()).collect();
    let stored = state.intake.intake_many(files).await?;

    let batch = declared
        .into_iter()
        .zip(stored)
        .map(|(name, stored)| NewContentItem {
            category: intake::category_for(&name),
            size: intake::human_size(stored.byte_size),
            status: ContentStatus::Pending,
            tags: Vec::new(),
            file_path: format!("/uploads/{}", stored.stored_path),
            version: "1.0".to_string(),
            description: String::new(),
            name,
        })
        .collect();

    let created = state.content.create_bulk(batch);

    info!(count = created.len(), "bulk content upload succeeded");

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_content(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(patch): Json<ContentPatch>,
) -> AppResult<Json<ContentItem>> {
    let item = state.content.update(id, patch)?;
    info!(content_id = item.id, "content updated");
    Ok(Json(item))
}

pub async fn delete_content(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Json<MessageResponse>> {
    let removed = state.content.delete(id)?;

    // Record deletion stands even when the backing file cannot be removed.
    if let Some(stored_name) = removed.file_path.strip_prefix("/uploads/") {
        if let Err(err) = state.storage.remove(stored_name).await {
            warn!(error = %err, content_id = removed.id, "failed to delete backing file");
        }
    }

    info!(content_id = removed.id, name = %removed.name, "content deleted");

    Ok(Json(MessageResponse {
        message: "content deleted".to_string(),
    }))
}

pub async fn download_content(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<Response> {
    let item = state.content.get(id)?;
    let stored_name = item
        .file_path
        .strip_prefix("/uploads/")
        .unwrap_or(&item.file_path);

    let bytes = state.storage.read(stored_name).await.map_err(|err| {
        error!(error = %err, content_id = item.id, "failed to read backing file");
        AppError::not_found("file not found")
    })?;

    let mime = mime_guess::from_path(&item.name).first_or_octet_stream();
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime.as_ref());
    if let Some(disposition) = attachment_content_disposition(&item.name) {
        builder = builder.header(header::CONTENT_DISPOSITION, disposition);
    }

    builder
        .body(Body::from(bytes))
        .map_err(|err| AppError::internal(format!("failed to build response: {err}")))
}

pub async fn search_content(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Json<Vec<ContentItem>> {
    Json(state.content.search(&query))
}

pub async fn content_stats(State(state): State<AppState>) -> Json<ContentStats> {
    Json(state.content.stats())
}

#[cfg(test)]
mod tests {
    use super::{attachment_content_disposition, parse_tags};

    #[test]
    fn disposition_escapes_quotes_and_encodes_unicode() {
        let disposition = attachment_content_disposition("plan \"v2\".pdf").unwrap();
        assert!(disposition.starts_with("attachment; filename=\"plan _v2_.pdf\""));
        assert!(disposition.contains("filename*=UTF-8''"));

        assert_eq!(attachment_content_disposition(""), None);
    }

    #[test]
    fn tags_split_on_commas_and_drop_blanks() {
        assert_eq!(
            parse_tags("fire, safety , ,evacuation"),
            vec!["fire", "safety", "evacuation"]
        );
        assert!(parse_tags("").is_empty());
    }
}
