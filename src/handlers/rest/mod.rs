mod error;

pub use error::ApiError;

use axum::{
    Form, Json,
    extract::{
        FromRequest, Multipart, Path, Query, Request, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, PathRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_macros::debug_handler;
use utoipa::OpenApi;

use std::sync::Arc;

use crate::{
    dto::{
        AnalyzeNoteForm, AnalyzeNoteResponse, CreateNoteRequest, ErrorResponse, MessageResponse,
        NoteEnvelope, NoteResponse, NotesEnvelope, UpdateNoteRequest,
    },
    gemini::InlineImage,
    handlers::AppState,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        create_note,
        update_note,
        delete_note,
        get_one_note,
        get_all_notes,
        analyze_note,
        compare_images
    ),
    components(schemas(
        NoteResponse,
        NoteEnvelope,
        NotesEnvelope,
        MessageResponse,
        ErrorResponse,
        CreateNoteRequest,
        UpdateNoteRequest,
        AnalyzeNoteForm,
        AnalyzeNoteResponse
    )),
    tags(
        (name = "notes", description = "Notes management API"),
        (name = "analysis", description = "Gemini powered analysis")
    )
)]
pub struct ApiDoc;

fn note_id(id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|_| ApiError::validation("Invalid ID format"))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload.map(|Json(body)| body).map_err(|e| {
        tracing::debug!("rejected request body: {e}");
        ApiError::validation("Invalid request format")
    })
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteRequest,
    responses(
        (status = 201, description = "Note created successfully", body = NoteEnvelope),
        (status = 400, description = "Invalid request format", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let payload = json_body(payload)?;

    if payload.created_at.is_some() || payload.updated_at.is_some() {
        tracing::debug!("ignoring client supplied timestamps, the server sets them");
    }

    let note = state
        .notes
        .create_note(payload.title, payload.content, payload.img)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(NoteEnvelope {
            message: "Note created successfully".to_string(),
            note_info: note.into(),
        }),
    )
        .into_response())
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    request_body = UpdateNoteRequest,
    responses(
        (status = 200, description = "Note updated successfully", body = NoteEnvelope),
        (status = 400, description = "Invalid ID or request format", body = ErrorResponse),
        (status = 404, description = "Note not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Json<NoteEnvelope>, ApiError> {
    let id = note_id(id)?;
    let payload = json_body(payload)?;

    let note = state
        .notes
        .update_note(id, payload.title, payload.content, payload.img)
        .await?;

    Ok(Json(NoteEnvelope {
        message: "Note updated successfully".to_string(),
        note_info: note.into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note deleted successfully", body = MessageResponse),
        (status = 400, description = "Invalid ID format", body = ErrorResponse),
        (status = 404, description = "Note not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = note_id(id)?;

    if !state.notes.delete_note(id).await? {
        return Err(ApiError::NotFound(format!("note {id} not found")));
    }

    Ok(Json(MessageResponse {
        message: "Note deleted successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note found", body = NoteEnvelope),
        (status = 400, description = "Invalid ID format", body = ErrorResponse),
        (status = 404, description = "Note not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_one_note(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<NoteEnvelope>, ApiError> {
    let id = note_id(id)?;
    let note = state.notes.get_note(id).await?;

    Ok(Json(NoteEnvelope {
        message: "Note retrieved successfully".to_string(),
        note_info: note.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/notes/all",
    responses(
        (status = 200, description = "List of all notes", body = NotesEnvelope),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_all_notes(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NotesEnvelope>, ApiError> {
    let notes = state.notes.list_notes().await?;

    Ok(Json(NotesEnvelope {
        message: "Notes retrieved successfully".to_string(),
        notes: notes.into_iter().map(NoteResponse::from).collect(),
    }))
}

/// Reads the `request` field from an urlencoded or multipart form, falling
/// back to the query string when the body has no value.
async fn read_request_text(request: Request) -> Option<String> {
    let uri = request.uri().clone();
    let is_multipart = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"));

    let from_body = if is_multipart {
        read_multipart_request(request).await
    } else {
        Form::<AnalyzeNoteForm>::from_request(request, &())
            .await
            .ok()
            .map(|Form(form)| form.request)
    };

    match from_body {
        Some(text) if !text.is_empty() => Some(text),
        _ => Query::<AnalyzeNoteForm>::try_from_uri(&uri)
            .ok()
            .map(|Query(form)| form.request),
    }
}

async fn read_multipart_request(request: Request) -> Option<String> {
    let mut multipart = Multipart::from_request(request, &()).await.ok()?;
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("request") {
            return field.text().await.ok();
        }
    }
    None
}

#[utoipa::path(
    post,
    path = "/api/notes/{id}/analyze",
    params(
        ("id" = i64, Path, description = "Note ID")
    ),
    request_body(content = AnalyzeNoteForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Note analyzed successfully", body = AnalyzeNoteResponse),
        (status = 400, description = "Invalid ID or missing request text", body = ErrorResponse),
        (status = 404, description = "Note not found", body = ErrorResponse),
        (status = 500, description = "Gemini or storage failure", body = ErrorResponse)
    ),
    tag = "analysis"
)]
#[debug_handler]
pub async fn analyze_note(
    State(state): State<Arc<AppState>>,
    id: Result<Path<i64>, PathRejection>,
    request: Request,
) -> Result<Json<AnalyzeNoteResponse>, ApiError> {
    let id = note_id(id)?;
    let note = state.notes.get_note(id).await?;

    let request_text = read_request_text(request)
        .await
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ApiError::validation("Request text is required"))?;

    let result = state.gemini.analyze_note(&note, &request_text).await?;

    Ok(Json(AnalyzeNoteResponse {
        message: "Note analyzed successfully".to_string(),
        result,
    }))
}

/// Compares two uploaded images according to the free-text request.
///
/// Expects a multipart form with a `requestText` field and two image files,
/// `image1` and `image2` (`.png`, `.jpg` or `.jpeg`). The raw Gemini response
/// is returned as the body.
#[utoipa::path(
    post,
    path = "/api/gemini/compare",
    responses(
        (status = 200, description = "Raw Gemini response"),
        (status = 400, description = "Missing field or unsupported image format", body = ErrorResponse),
        (status = 500, description = "Gemini failure", body = ErrorResponse)
    ),
    tag = "analysis"
)]
#[debug_handler]
pub async fn compare_images(
    State(state): State<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::validation("Unable to parse form"))?;

    let mut request_text = String::new();
    let mut image1 = None;
    let mut image2 = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::validation("Unable to parse form"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "requestText" => {
                request_text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::validation("Unable to parse form"))?;
            }
            "image1" | "image2" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|_| ApiError::validation(format!("Error reading {name}")))?;
                let image = Some(InlineImage {
                    file_name,
                    data: data.to_vec(),
                });
                if name == "image1" {
                    image1 = image;
                } else {
                    image2 = image;
                }
            }
            _ => {}
        }
    }

    let image1 = image1.ok_or_else(|| ApiError::validation("Unable to get image1"))?;
    let image2 = image2.ok_or_else(|| ApiError::validation("Unable to get image2"))?;

    let result = state
        .gemini
        .compare_images(&request_text, &[image1, image2])
        .await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        result,
    )
        .into_response())
}
