use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};
use uuid::Uuid;

use crate::analysis::{analyze_deed as run_analysis, AnalyzedDeed};
use crate::engine::input::{parse_calendar_date, patch_date, CALENDAR_DATE_FORMAT};
use crate::engine::DocumentType;
use crate::error::{AppError, AppResult};
use crate::models::{Deed, DeedPatch, NewDeed};
use crate::state::AppState;
use crate::store::{total_pages, ListQuery, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::utils::json::{optional_bool, optional_string};

const MAX_TITLE_LENGTH: usize = 255;

#[derive(Serialize)]
pub struct DeedResponse {
    pub id: Uuid,
    pub title: String,
    pub document_type: String,
    pub has_inquiry_history: bool,
    pub inquiry_date: Option<String>,
    pub deed_date: Option<String>,
    pub uses_tashil_law: bool,
    pub inquiry_response_has_issue: bool,
    pub text: String,
    pub analysis_result: Option<String>,
    pub analysis_date: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

impl From<Deed> for DeedResponse {
    fn from(deed: Deed) -> Self {
        Self {
            id: deed.id,
            title: deed.title,
            document_type: deed.document_type,
            has_inquiry_history: deed.has_inquiry_history,
            inquiry_date: deed.inquiry_date.map(to_calendar_date),
            deed_date: deed.deed_date.map(to_calendar_date),
            uses_tashil_law: deed.uses_tashil_law,
            inquiry_response_has_issue: deed.inquiry_response_has_issue,
            text: deed.text,
            analysis_result: deed.analysis_result,
            analysis_date: deed.analysis_date.map(to_iso),
            created_at: to_iso(deed.created_at),
            updated_at: to_iso(deed.updated_at),
        }
    }
}

#[derive(Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

#[derive(Serialize)]
pub struct DeedListResponse {
    pub deeds: Vec<DeedResponse>,
    pub pagination: Pagination,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub deed: DeedResponse,
    pub analysis: Value,
}

impl From<AnalyzedDeed> for AnalyzeResponse {
    fn from(value: AnalyzedDeed) -> Self {
        Self {
            deed: value.deed.into(),
            analysis: value.analysis,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct DeedListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

pub async fn list_deeds(
    State(state): State<AppState>,
    query: Result<Query<DeedListQuery>, QueryRejection>,
) -> AppResult<Json<DeedListResponse>> {
    let Query(params) = query.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;

    let page = params.page.unwrap_or(1);
    if page < 1 {
        return Err(AppError::bad_request("page must be at least 1"));
    }
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}"
        )));
    }

    let list_query = ListQuery {
        page,
        limit,
        search: params.search,
    };
    let result = state.store.list(&list_query).await.map_err(|err| {
        error!(error = %err, "failed to list deeds");
        AppError::from(err)
    })?;

    Ok(Json(DeedListResponse {
        deeds: result.deeds.into_iter().map(DeedResponse::from).collect(),
        pagination: Pagination {
            page,
            limit,
            total: result.total,
            total_pages: total_pages(result.total, limit),
        },
    }))
}

pub async fn create_deed(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<(StatusCode, Json<DeedResponse>)> {
    let Json(body) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let new_deed = parse_new_deed(&body)?;

    let deed = state.store.create(new_deed).await.map_err(|err| {
        error!(error = %err, "failed to create deed");
        AppError::from(err)
    })?;
    info!(deed_id = %deed.id, document_type = %deed.document_type, "deed created");

    Ok((StatusCode::CREATED, Json(deed.into())))
}

pub async fn get_deed(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<DeedResponse>> {
    let deed_id = deed_id(path)?;
    let deed = state.store.get(deed_id).await.map_err(|err| {
        error!(%deed_id, error = %err, "failed to fetch deed");
        AppError::from(err)
    })?;
    Ok(Json(deed.into()))
}

pub async fn update_deed(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Json<DeedResponse>> {
    let deed_id = deed_id(path)?;
    state.store.get(deed_id).await.map_err(|err| {
        error!(%deed_id, error = %err, "failed to fetch deed for update");
        AppError::from(err)
    })?;

    let Json(body) = payload.map_err(|rejection| AppError::bad_request(rejection.body_text()))?;
    let patch = parse_patch(&body)?;

    let deed = state.store.update(deed_id, patch).await.map_err(|err| {
        error!(%deed_id, error = %err, "failed to update deed");
        AppError::from(err)
    })?;
    info!(%deed_id, "deed updated");

    Ok(Json(deed.into()))
}

pub async fn delete_deed(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<MessageResponse>> {
    let deed_id = deed_id(path)?;
    state.store.delete(deed_id).await.map_err(|err| {
        error!(%deed_id, error = %err, "failed to delete deed");
        AppError::from(err)
    })?;
    info!(%deed_id, "deed deleted");

    Ok(Json(MessageResponse {
        message: "Deed deleted successfully".to_string(),
    }))
}

pub async fn analyze_deed(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> AppResult<Json<AnalyzeResponse>> {
    let deed_id = deed_id(path)?;
    let analyzed = run_analysis(state.store.as_ref(), state.evaluator.as_ref(), deed_id).await?;
    Ok(Json(analyzed.into()))
}

fn deed_id(path: Result<Path<Uuid>, PathRejection>) -> AppResult<Uuid> {
    path.map(|Path(id)| id).map_err(|_| AppError::not_found())
}

fn parse_new_deed(body: &Value) -> AppResult<NewDeed> {
    let title = optional_string(body.get("title")).map_err(AppError::bad_request)?;
    let document_type = optional_string(body.get("document_type")).map_err(AppError::bad_request)?;
    let text = optional_string(body.get("text")).map_err(AppError::bad_request)?;

    let (title, document_type, text) = match (title, document_type, text) {
        (Some(title), Some(document_type), Some(text))
            if !title.trim().is_empty()
                && !document_type.trim().is_empty()
                && !text.trim().is_empty() =>
        {
            (title, document_type, text)
        }
        _ => {
            return Err(AppError::bad_request(
                "Title, document type, and text are required",
            ))
        }
    };

    let title = validate_title(&title)?;
    let document_type: DocumentType = document_type.parse()?;

    Ok(NewDeed {
        id: Uuid::new_v4(),
        title,
        document_type: document_type.as_str().to_string(),
        has_inquiry_history: flag(body, "has_inquiry_history")?.unwrap_or(false),
        inquiry_date: date(body, "inquiry_date")?,
        deed_date: date(body, "deed_date")?,
        uses_tashil_law: flag(body, "uses_tashil_law")?.unwrap_or(false),
        inquiry_response_has_issue: flag(body, "inquiry_response_has_issue")?.unwrap_or(false),
        text,
    })
}

fn parse_patch(body: &Value) -> AppResult<DeedPatch> {
    if !body.is_object() {
        return Err(AppError::bad_request("request body must be a JSON object"));
    }

    let title = match optional_string(body.get("title")).map_err(AppError::bad_request)? {
        Some(title) => Some(validate_title(&title)?),
        None => None,
    };
    let document_type = match optional_string(body.get("document_type"))
        .map_err(AppError::bad_request)?
    {
        Some(value) => Some(value.parse::<DocumentType>()?.as_str().to_string()),
        None => None,
    };
    let text = match optional_string(body.get("text")).map_err(AppError::bad_request)? {
        Some(text) if text.trim().is_empty() => {
            return Err(AppError::bad_request("text must not be empty"))
        }
        other => other,
    };

    Ok(DeedPatch {
        title,
        document_type,
        has_inquiry_history: flag(body, "has_inquiry_history")?,
        inquiry_date: patch_date(body, "inquiry_date")?,
        deed_date: patch_date(body, "deed_date")?,
        uses_tashil_law: flag(body, "uses_tashil_law")?,
        inquiry_response_has_issue: flag(body, "inquiry_response_has_issue")?,
        text,
    })
}

fn validate_title(raw: &str) -> AppResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::bad_request("title must not be empty"));
    }
    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(AppError::bad_request(format!(
            "title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    Ok(trimmed.to_string())
}

fn flag(body: &Value, field: &str) -> AppResult<Option<bool>> {
    optional_bool(body.get(field)).map_err(|reason| AppError::bad_request(format!("{field}: {reason}")))
}

fn date(body: &Value, field: &'static str) -> AppResult<Option<NaiveDate>> {
    match optional_string(body.get(field)).map_err(|reason| AppError::bad_request(format!("{field}: {reason}")))? {
        Some(raw) => Ok(parse_calendar_date(field, &raw)?),
        None => Ok(None),
    }
}

pub(crate) fn to_calendar_date(date: NaiveDate) -> String {
    date.format(CALENDAR_DATE_FORMAT).to_string()
}

pub(crate) fn to_iso(dt: NaiveDateTime) -> String {
    DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc).to_rfc3339()
}
