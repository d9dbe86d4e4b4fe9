pub mod sessions;

use actix_web::HttpResponse;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        sessions::create_session,
        sessions::open_session,
        sessions::get_session,
        sessions::close_session,
        sessions::update_fields,
        sessions::lookup_postal_code,
        sessions::add_product,
        sessions::update_product,
        sessions::remove_product,
        sessions::stage_attachment,
        sessions::list_attachments,
        sessions::download_attachment,
        sessions::delete_attachment,
        sessions::save_supplier,
    ),
    tags((name = "sessions", description = "Supplier registration form sessions"))
)]
pub struct ApiDoc;

/// GET /api-docs/openapi.json
pub async fn openapi_json() -> HttpResponse {
    HttpResponse::Ok().json(ApiDoc::openapi())
}
