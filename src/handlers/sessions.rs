use std::str::FromStr;

use actix_web::http::header::{ContentDisposition, ContentType, CONTENT_TYPE};
use actix_web::{web, HttpRequest, HttpResponse};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::application::address_service::LookupOutcome;
use crate::application::attachment_store::read_source;
use crate::domain::attachment::{AttachmentSummary, SourceFile};
use crate::domain::errors::FormError;
use crate::domain::product::{format_money, ProductDraft, ProductList, ProductRow, RowHandle, Unit};
use crate::domain::supplier::SupplierFields;
use crate::errors::AppError;
use crate::state::AppState;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CreateSessionResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRowResponse {
    pub handle: u64,
    pub description: String,
    pub unit: Option<String>,
    /// Decimal as a string; absent while the input is blank.
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
    /// Always `round(quantity * unitPrice, 2)`.
    pub total: String,
}

impl From<&ProductRow> for ProductRowResponse {
    fn from(row: &ProductRow) -> Self {
        Self {
            handle: row.handle().0,
            description: row.description().to_string(),
            unit: row.unit().map(|u| u.code().to_string()),
            quantity: row.quantity().map(ToString::to_string),
            unit_price: row.unit_price().map(ToString::to_string),
            total: format_money(row.total()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentResponse {
    pub id: Uuid,
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl From<AttachmentSummary> for AttachmentResponse {
    fn from(s: AttachmentSummary) -> Self {
        Self {
            id: s.id,
            name: s.name,
            mime_type: s.mime_type,
            size_bytes: s.size_bytes,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub id: Uuid,
    pub fields: SupplierFields,
    pub products: Vec<ProductRowResponse>,
    pub attachments: Vec<AttachmentResponse>,
}

/// Product row inputs. Omitted keys are left untouched; an empty string
/// clears the input back to blank.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductRowRequest {
    pub description: Option<String>,
    /// One of `un`, `kg`, `m`, `cx`.
    pub unit: Option<String>,
    pub quantity: Option<String>,
    pub unit_price: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PostalLookupRequest {
    pub postal_code: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StageParams {
    /// Original file name.
    pub name: String,
}

// ── Input parsing ────────────────────────────────────────────────────────────

fn parse_decimal(field: &str, raw: Option<String>) -> Result<Option<Option<BigDecimal>>, FormError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Some(None));
    }
    BigDecimal::from_str(raw)
        .map(|v| Some(Some(v)))
        .map_err(|_| FormError::InvalidValue(format!("{field} is not a number: '{raw}'")))
}

fn parse_unit(raw: Option<String>) -> Result<Option<Option<Unit>>, FormError> {
    match raw.as_deref().map(str::trim) {
        None => Ok(None),
        Some("") => Ok(Some(None)),
        Some(code) => code.parse().map(|u| Some(Some(u))),
    }
}

fn apply_row_request(
    products: &mut ProductList,
    handle: RowHandle,
    req: ProductRowRequest,
) -> Result<(), FormError> {
    let unit = parse_unit(req.unit)?;
    let quantity = parse_decimal("quantity", req.quantity)?;
    let unit_price = parse_decimal("unitPrice", req.unit_price)?;

    if let Some(description) = req.description {
        products.set_description(handle, description)?;
    }
    if let Some(unit) = unit {
        products.set_unit(handle, unit)?;
    }
    if let Some(quantity) = quantity {
        products.set_quantity(handle, quantity)?;
    }
    if let Some(unit_price) = unit_price {
        products.set_unit_price(handle, unit_price)?;
    }
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

fn session_response(state: &AppState, id: Uuid) -> Result<SessionResponse, FormError> {
    state.sessions.with(id, |s| {
        Ok(SessionResponse {
            id,
            fields: s.fields().clone(),
            products: s.products().rows().iter().map(ProductRowResponse::from).collect(),
            attachments: s
                .attachments()
                .list()
                .into_iter()
                .map(AttachmentResponse::from)
                .collect(),
        })
    })
}

/// POST /sessions
///
/// Opens a fresh supplier form with one blank product row.
#[utoipa::path(
    post,
    path = "/sessions",
    responses(
        (status = 201, description = "Session created", body = CreateSessionResponse),
    ),
    tag = "sessions"
)]
pub async fn create_session(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let id = state.sessions.create()?;
    Ok(HttpResponse::Created().json(CreateSessionResponse { id }))
}

/// PUT /sessions/{id}
///
/// Resumes a session, rebuilding it from the attachment mirror when it is not
/// live (for example after a page reload).
#[utoipa::path(
    put,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Session was live", body = SessionResponse),
        (status = 201, description = "Session rebuilt from mirror", body = SessionResponse),
    ),
    tag = "sessions"
)]
pub async fn open_session(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let rebuilt = state.sessions.open(id)?;
    let body = session_response(&state, id)?;
    if rebuilt {
        Ok(HttpResponse::Created().json(body))
    } else {
        Ok(HttpResponse::Ok().json(body))
    }
}

/// GET /sessions/{id}
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Current form state", body = SessionResponse),
        (status = 404, description = "Session not found"),
    ),
    tag = "sessions"
)]
pub async fn get_session(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(session_response(&state, path.into_inner())?))
}

/// DELETE /sessions/{id}
///
/// Ends the session and discards its attachment mirror.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    params(("id" = Uuid, Path, description = "Session UUID")),
    responses((status = 204, description = "Session closed")),
    tag = "sessions"
)]
pub async fn close_session(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    state.sessions.close(path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

/// PUT /sessions/{id}/fields
#[utoipa::path(
    put,
    path = "/sessions/{id}/fields",
    params(("id" = Uuid, Path, description = "Session UUID")),
    request_body = SupplierFields,
    responses(
        (status = 200, description = "Fields stored", body = SupplierFields),
        (status = 404, description = "Session not found"),
    ),
    tag = "sessions"
)]
pub async fn update_fields(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<SupplierFields>,
) -> Result<HttpResponse, AppError> {
    let fields = body.into_inner();
    let stored = state.sessions.with(path.into_inner(), |s| {
        s.set_fields(fields);
        Ok(s.fields().clone())
    })?;
    Ok(HttpResponse::Ok().json(stored))
}

/// POST /sessions/{id}/postal-code/lookup
///
/// Called when the postal code input loses focus. Codes without exactly
/// eight digits are ignored. A response that arrives after a newer lookup
/// started, or after the code was edited, is discarded.
#[utoipa::path(
    post,
    path = "/sessions/{id}/postal-code/lookup",
    params(("id" = Uuid, Path, description = "Session UUID")),
    request_body = PostalLookupRequest,
    responses(
        (status = 200, description = "Address fields filled", body = SupplierFields),
        (status = 204, description = "Not eight digits, nothing looked up"),
        (status = 404, description = "Postal code not found"),
        (status = 409, description = "Superseded by a newer lookup or edit"),
        (status = 502, description = "Lookup service unreachable"),
    ),
    tag = "sessions"
)]
pub async fn lookup_postal_code(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<PostalLookupRequest>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let raw = body.into_inner().postal_code;

    let ticket = state
        .sessions
        .with(id, |s| Ok(s.begin_postal_lookup(&raw)))?;
    let Some(ticket) = ticket else {
        return Ok(HttpResponse::NoContent().finish());
    };

    // No session lock is held while the lookup is in flight.
    let result = state.addresses.resolve(&ticket).await;

    let (outcome, fields) = state.sessions.with(id, |s| {
        let outcome = s.finish_postal_lookup(&ticket, result)?;
        Ok((outcome, s.fields().clone()))
    })?;

    match outcome {
        LookupOutcome::Applied => Ok(HttpResponse::Ok().json(fields)),
        LookupOutcome::Stale => Err(AppError::Conflict(format!(
            "Lookup for {} was superseded",
            ticket.postal_code()
        ))),
    }
}

/// POST /sessions/{id}/products
#[utoipa::path(
    post,
    path = "/sessions/{id}/products",
    params(("id" = Uuid, Path, description = "Session UUID")),
    request_body = ProductRowRequest,
    responses(
        (status = 201, description = "Row added", body = ProductRowResponse),
        (status = 422, description = "Invalid initial value"),
    ),
    tag = "sessions"
)]
pub async fn add_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ProductRowRequest>,
) -> Result<HttpResponse, AppError> {
    let req = body.into_inner();
    let draft = ProductDraft {
        description: req.description,
        unit: parse_unit(req.unit)?.flatten(),
        quantity: parse_decimal("quantity", req.quantity)?.flatten(),
        unit_price: parse_decimal("unitPrice", req.unit_price)?.flatten(),
    };

    let row = state.sessions.with(path.into_inner(), |s| {
        let products = s.products_mut();
        let handle = products.add_row(draft)?;
        products
            .get(handle)
            .map(ProductRowResponse::from)
            .ok_or_else(|| FormError::Internal(format!("row {handle} vanished")))
    })?;
    Ok(HttpResponse::Created().json(row))
}

/// PATCH /sessions/{id}/products/{handle}
///
/// Updates are applied together or not at all; the row's total is
/// recomputed before the response is built.
#[utoipa::path(
    patch,
    path = "/sessions/{id}/products/{handle}",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
        ("handle" = u64, Path, description = "Product row handle"),
    ),
    request_body = ProductRowRequest,
    responses(
        (status = 200, description = "Row updated", body = ProductRowResponse),
        (status = 404, description = "Session or row not found"),
        (status = 422, description = "Invalid or negative value"),
    ),
    tag = "sessions"
)]
pub async fn update_product(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, u64)>,
    body: web::Json<ProductRowRequest>,
) -> Result<HttpResponse, AppError> {
    let (id, handle) = path.into_inner();
    let handle = RowHandle(handle);
    let req = body.into_inner();

    let row = state.sessions.with(id, |s| {
        let mut products = s.products().clone();
        apply_row_request(&mut products, handle, req)?;
        let row = products
            .get(handle)
            .map(ProductRowResponse::from)
            .ok_or_else(|| FormError::NotFound(format!("Product row {handle}")))?;
        *s.products_mut() = products;
        Ok(row)
    })?;
    Ok(HttpResponse::Ok().json(row))
}

/// DELETE /sessions/{id}/products/{handle}
///
/// Removing the last row leaves a fresh blank row in its place.
#[utoipa::path(
    delete,
    path = "/sessions/{id}/products/{handle}",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
        ("handle" = u64, Path, description = "Product row handle"),
    ),
    responses(
        (status = 200, description = "Remaining rows", body = [ProductRowResponse]),
        (status = 404, description = "Session or row not found"),
    ),
    tag = "sessions"
)]
pub async fn remove_product(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, u64)>,
) -> Result<HttpResponse, AppError> {
    let (id, handle) = path.into_inner();
    let rows = state.sessions.with(id, |s| {
        s.remove_product(RowHandle(handle))?;
        Ok(s.products()
            .rows()
            .iter()
            .map(ProductRowResponse::from)
            .collect::<Vec<_>>())
    })?;
    Ok(HttpResponse::Ok().json(rows))
}

/// POST /sessions/{id}/attachments?name=...
///
/// Stages the raw request body as an attachment. The MIME type is taken from
/// the `Content-Type` header.
#[utoipa::path(
    post,
    path = "/sessions/{id}/attachments",
    params(("id" = Uuid, Path, description = "Session UUID"), StageParams),
    request_body(content = String, description = "Raw file bytes", content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Attachment staged", body = AttachmentResponse),
        (status = 400, description = "Upload could not be read"),
        (status = 507, description = "Upload larger than the session storage quota"),
    ),
    tag = "sessions"
)]
pub async fn stage_attachment(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<StageParams>,
    req: HttpRequest,
    payload: web::Payload,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let name = query.into_inner().name;
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("File name is required".to_string()));
    }
    // Fail fast for unknown sessions before draining the body.
    state.sessions.with(id, |_| Ok(()))?;

    let mime_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let bytes = read_source(payload, state.sessions.storage().quota_bytes()).await?;

    let summary = state.sessions.with(id, |s| {
        s.attachments_mut().stage(SourceFile {
            name,
            mime_type,
            bytes,
        })
    })?;
    Ok(HttpResponse::Created().json(AttachmentResponse::from(summary)))
}

/// GET /sessions/{id}/attachments
#[utoipa::path(
    get,
    path = "/sessions/{id}/attachments",
    params(("id" = Uuid, Path, description = "Session UUID")),
    responses((status = 200, description = "Staged attachments", body = [AttachmentResponse])),
    tag = "sessions"
)]
pub async fn list_attachments(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let items: Vec<AttachmentResponse> = state.sessions.with(path.into_inner(), |s| {
        Ok(s.attachments()
            .list()
            .into_iter()
            .map(AttachmentResponse::from)
            .collect())
    })?;
    Ok(HttpResponse::Ok().json(items))
}

/// GET /sessions/{id}/attachments/{attachment_id}
///
/// Returns the original bytes for download or preview.
#[utoipa::path(
    get,
    path = "/sessions/{id}/attachments/{attachment_id}",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
        ("attachment_id" = Uuid, Path, description = "Attachment UUID"),
    ),
    responses(
        (status = 200, description = "File content", body = String, content_type = "application/octet-stream"),
        (status = 404, description = "Attachment not found"),
    ),
    tag = "sessions"
)]
pub async fn download_attachment(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (id, attachment_id) = path.into_inner();
    let (summary, bytes) = state
        .sessions
        .with(id, |s| s.attachments().fetch(attachment_id))?;

    Ok(HttpResponse::Ok()
        .content_type(summary.mime_type)
        .insert_header(ContentDisposition::attachment(summary.name))
        .body(bytes))
}

/// DELETE /sessions/{id}/attachments/{attachment_id}
#[utoipa::path(
    delete,
    path = "/sessions/{id}/attachments/{attachment_id}",
    params(
        ("id" = Uuid, Path, description = "Session UUID"),
        ("attachment_id" = Uuid, Path, description = "Attachment UUID"),
    ),
    responses(
        (status = 204, description = "Attachment removed"),
        (status = 404, description = "Attachment not found"),
    ),
    tag = "sessions"
)]
pub async fn delete_attachment(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> Result<HttpResponse, AppError> {
    let (id, attachment_id) = path.into_inner();
    let removed = state
        .sessions
        .with(id, |s| s.attachments_mut().remove(attachment_id))?;
    if !removed {
        return Err(FormError::NotFound(format!("Attachment {attachment_id}")).into());
    }
    Ok(HttpResponse::NoContent().finish())
}

/// POST /sessions/{id}/save
///
/// Validates the whole form and returns the pretty-printed supplier document,
/// offered as a download under a timestamped file name.
#[utoipa::path(
    post,
    path = "/sessions/{id}/save",
    params(("id" = Uuid, Path, description = "Session UUID")),
    responses(
        (status = 200, description = "Pretty-printed supplier document", body = String, content_type = "application/json"),
        (status = 422, description = "First validation failure"),
    ),
    tag = "sessions"
)]
pub async fn save_supplier(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let exported = state
        .sessions
        .with(path.into_inner(), |s| s.save(&state.supplier))?;

    Ok(HttpResponse::Ok()
        .insert_header(ContentType::json())
        .insert_header(ContentDisposition::attachment(exported.file_name))
        .body(exported.json))
}
