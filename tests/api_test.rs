//! Supplier form flows driven through the HTTP adapter with an in-process
//! address lookup, so no network access is needed.

use std::sync::Arc;

use actix_web::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use serde_json::{json, Value};
use supplier_form::configure;
use supplier_form::domain::errors::FormError;
use supplier_form::domain::ports::AddressLookup;
use supplier_form::domain::supplier::{AddressFragment, PostalCode};
use supplier_form::infrastructure::json_export::JsonExporter;
use supplier_form::infrastructure::session_storage::MemorySessionStorage;
use supplier_form::AppState;

struct FakeLookup;

#[async_trait]
impl AddressLookup for FakeLookup {
    async fn lookup(&self, postal_code: &PostalCode) -> Result<AddressFragment, FormError> {
        match postal_code.as_str() {
            "01001000" => Ok(AddressFragment {
                street: "Praça da Sé".into(),
                district: "Sé".into(),
                city: "São Paulo".into(),
                state: "SP".into(),
            }),
            "99999999" => Err(FormError::Unreachable("connection refused".into())),
            _ => Err(FormError::NotFound(format!("Postal code {postal_code}"))),
        }
    }
}

fn state(storage: MemorySessionStorage) -> web::Data<AppState> {
    web::Data::new(AppState::new(
        storage,
        Arc::new(FakeLookup),
        Arc::new(JsonExporter::default()),
    ))
}

fn filled_fields() -> Value {
    json!({
        "legalName": "Eletro Comercial Ltda",
        "tradeName": "Eletro",
        "taxId": "12.345.678/0001-90",
        "postalCode": "01001-000",
        "street": "Praça da Sé",
        "number": "100",
        "district": "Sé",
        "city": "São Paulo",
        "state": "SP",
        "contactName": "Maria Souza",
        "phone": "11 99999-0000",
        "email": "maria@example.com"
    })
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data($state).configure(configure)).await
    };
}

macro_rules! new_session {
    ($app:expr) => {{
        let resp = test::call_service(&$app, test::TestRequest::post().uri("/sessions").to_request()).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["id"].as_str().expect("session id").to_string()
    }};
}

macro_rules! send_json {
    ($app:expr, $req:expr, $body:expr) => {
        test::call_service(&$app, $req.set_json($body).to_request()).await
    };
}

macro_rules! stage {
    ($app:expr, $id:expr, $name:expr, $mime:expr, $bytes:expr) => {
        test::call_service(
            &$app,
            test::TestRequest::post()
                .uri(&format!("/sessions/{}/attachments?name={}", $id, $name))
                .insert_header((CONTENT_TYPE, $mime))
                .set_payload($bytes)
                .to_request(),
        )
        .await
    };
}

/// First row handle of a fresh session.
macro_rules! first_row {
    ($app:expr, $id:expr) => {{
        let resp = test::call_service(
            &$app,
            test::TestRequest::get().uri(&format!("/sessions/{}", $id)).to_request(),
        )
        .await;
        let body: Value = test::read_body_json(resp).await;
        body["products"][0]["handle"].as_u64().expect("row handle")
    }};
}

#[actix_web::test]
async fn scenario_a_complete_form_produces_document() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);

    let resp = send_json!(app, test::TestRequest::put().uri(&format!("/sessions/{id}/fields")), filled_fields());
    assert_eq!(resp.status(), StatusCode::OK);

    let handle = first_row!(app, id);
    let resp = send_json!(
        app,
        test::TestRequest::patch().uri(&format!("/sessions/{id}/products/{handle}")),
        json!({"description": "Cabo HDMI", "unit": "un", "quantity": "2", "unitPrice": "19.90"})
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let row: Value = test::read_body_json(resp).await;
    assert_eq!(row["total"], "39.80");

    let pdf = b"%PDF-1.4 fake".to_vec();
    let resp = stage!(app, id, "cartao-cnpj.pdf", "application/pdf", pdf.clone());
    assert_eq!(resp.status(), StatusCode::CREATED);
    let staged: Value = test::read_body_json(resp).await;
    assert_eq!(staged["sizeBytes"], pdf.len());

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri(&format!("/sessions/{id}/save")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let disposition = resp
        .headers()
        .get(CONTENT_DISPOSITION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.starts_with("attachment"), "{disposition}");
    assert!(disposition.contains("supplier_"), "{disposition}");

    let doc: Value = test::read_body_json(resp).await;
    assert_eq!(doc["supplier"]["legalName"], "Eletro Comercial Ltda");
    assert_eq!(doc["supplier"]["contact"]["email"], "maria@example.com");
    assert_eq!(doc["products"][0]["total"], "39.80");
    assert_eq!(doc["products"][0]["unit"], "un");
    assert_eq!(doc["attachments"].as_array().map(Vec::len), Some(1));
    assert_eq!(doc["attachments"][0]["name"], "cartao-cnpj.pdf");
    assert!(doc["meta"]["createdAt"].is_string());
}

#[actix_web::test]
async fn scenario_b_missing_attachment_blocks_save() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);
    send_json!(app, test::TestRequest::put().uri(&format!("/sessions/{id}/fields")), filled_fields());
    let handle = first_row!(app, id);
    send_json!(
        app,
        test::TestRequest::patch().uri(&format!("/sessions/{id}/products/{handle}")),
        json!({"description": "Cabo HDMI", "unit": "un", "quantity": "2", "unitPrice": "19.90"})
    );

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri(&format!("/sessions/{id}/save")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "At least one attachment is required");
}

#[actix_web::test]
async fn save_reports_first_missing_field() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);
    let mut fields = filled_fields();
    fields["phone"] = json!("  ");
    send_json!(app, test::TestRequest::put().uri(&format!("/sessions/{id}/fields")), fields);

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri(&format!("/sessions/{id}/save")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["field"], "phone");
}

#[actix_web::test]
async fn scenario_c_postal_lookup_fills_or_reports() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);
    let lookup_uri = format!("/sessions/{id}/postal-code/lookup");

    let resp = send_json!(app, test::TestRequest::post().uri(&lookup_uri), json!({"postalCode": "01001000"}));
    assert_eq!(resp.status(), StatusCode::OK);
    let fields: Value = test::read_body_json(resp).await;
    assert_eq!(fields["street"], "Praça da Sé");
    assert_eq!(fields["district"], "Sé");
    assert_eq!(fields["city"], "São Paulo");
    assert_eq!(fields["state"], "SP");

    let resp = send_json!(app, test::TestRequest::post().uri(&lookup_uri), json!({"postalCode": "00000000"}));
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Postal code 00000000 not found");

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/sessions/{id}")).to_request(),
    )
    .await;
    let session: Value = test::read_body_json(resp).await;
    assert_eq!(session["fields"]["city"], "São Paulo");
    assert_eq!(session["fields"]["postalCode"], "00000000");
}

#[actix_web::test]
async fn postal_lookup_ignores_short_codes_and_surfaces_outages() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);
    let lookup_uri = format!("/sessions/{id}/postal-code/lookup");

    let resp = send_json!(app, test::TestRequest::post().uri(&lookup_uri), json!({"postalCode": "01001"}));
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = send_json!(app, test::TestRequest::post().uri(&lookup_uri), json!({"postalCode": "99999-999"}));
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
}

#[actix_web::test]
async fn negative_price_is_rejected() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);
    let handle = first_row!(app, id);

    let resp = send_json!(
        app,
        test::TestRequest::patch().uri(&format!("/sessions/{id}/products/{handle}")),
        json!({"description": "Cabo", "unitPrice": "-1.00"})
    );
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/sessions/{id}")).to_request(),
    )
    .await;
    let session: Value = test::read_body_json(resp).await;
    assert_eq!(session["products"][0]["description"], "");
}

#[actix_web::test]
async fn zero_quantity_saves_with_two_decimal_total() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);
    send_json!(app, test::TestRequest::put().uri(&format!("/sessions/{id}/fields")), filled_fields());

    let handle = first_row!(app, id);
    let resp = send_json!(
        app,
        test::TestRequest::patch().uri(&format!("/sessions/{id}/products/{handle}")),
        json!({"description": "Amostra", "unit": "cx", "quantity": "0", "unitPrice": "19.90"})
    );
    let row: Value = test::read_body_json(resp).await;
    assert_eq!(row["total"], "0.00");
    stage!(app, id, "a.txt", "text/plain", b"a".to_vec());

    let resp = test::call_service(
        &app,
        test::TestRequest::post().uri(&format!("/sessions/{id}/save")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: Value = test::read_body_json(resp).await;
    assert_eq!(doc["products"][0]["total"], "0.00");
}

#[actix_web::test]
async fn exponent_notation_amounts_are_bounded() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);
    let handle = first_row!(app, id);
    let uri = format!("/sessions/{id}/products/{handle}");

    for quantity in ["1e3000000", "1e999999999"] {
        let resp = send_json!(
            app,
            test::TestRequest::patch().uri(&uri),
            json!({"quantity": quantity, "unitPrice": "1"})
        );
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY, "{quantity}");
    }

    let resp = send_json!(app, test::TestRequest::patch().uri(&uri), json!({"quantity": "1e3", "unitPrice": "2"}));
    assert_eq!(resp.status(), StatusCode::OK);
    let row: Value = test::read_body_json(resp).await;
    assert_eq!(row["total"], "2000.00");
}

#[actix_web::test]
async fn removing_only_row_keeps_a_blank_row() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);
    let handle = first_row!(app, id);

    let resp = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/sessions/{id}/products/{handle}"))
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rows: Value = test::read_body_json(resp).await;
    let rows = rows.as_array().expect("rows");
    assert_eq!(rows.len(), 1);
    assert_ne!(rows[0]["handle"].as_u64(), Some(handle));
    assert_eq!(rows[0]["total"], "0.00");
}

#[actix_web::test]
async fn attachment_download_and_delete() {
    let app = app!(state(MemorySessionStorage::new()));
    let id = new_session!(app);
    let bytes: Vec<u8> = (0..=255).collect();

    let resp = stage!(app, id, "blob.bin", "application/octet-stream", bytes.clone());
    let staged: Value = test::read_body_json(resp).await;
    let att = staged["id"].as_str().expect("attachment id").to_string();
    let uri = format!("/sessions/{id}/attachments/{att}");

    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(test::read_body(resp).await.to_vec(), bytes);

    let resp = test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let resp = test::call_service(&app, test::TestRequest::delete().uri(&uri).to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn resumed_session_restores_attachments_from_mirror() {
    let storage = MemorySessionStorage::new();
    let first = app!(state(storage.clone()));
    let id = new_session!(first);
    stage!(first, id, "a.txt", "text/plain", b"hello".to_vec());

    // A new process-level state over the same storage stands in for a reload.
    let second = app!(state(storage));
    let resp = test::call_service(
        &second,
        test::TestRequest::put().uri(&format!("/sessions/{id}")).to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let session: Value = test::read_body_json(resp).await;
    assert_eq!(session["attachments"][0]["name"], "a.txt");
    assert_eq!(session["products"].as_array().map(Vec::len), Some(1));
}

#[actix_web::test]
async fn quota_exceeded_is_reported_and_nothing_staged() {
    let app = app!(state(MemorySessionStorage::with_quota(64)));
    let id = new_session!(app);

    let resp = stage!(app, id, "big.bin", "application/octet-stream", vec![7u8; 1024]);
    assert_eq!(resp.status(), StatusCode::INSUFFICIENT_STORAGE);

    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri(&format!("/sessions/{id}/attachments")).to_request(),
    )
    .await;
    let items: Value = test::read_body_json(resp).await;
    assert_eq!(items.as_array().map(Vec::len), Some(0));
}

#[actix_web::test]
async fn oversized_upload_is_refused_while_streaming() {
    let app = app!(state(MemorySessionStorage::with_quota(1024)));
    let id = new_session!(app);

    let resp = stage!(app, id, "big.bin", "application/octet-stream", vec![0u8; 4096]);
    assert_eq!(resp.status(), StatusCode::INSUFFICIENT_STORAGE);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap_or_default().contains("1024 byte limit"), "{body}");
}

#[actix_web::test]
async fn unknown_session_is_not_found() {
    let app = app!(state(MemorySessionStorage::new()));
    let resp = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/sessions/00000000-0000-0000-0000-000000000000")
            .to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn openapi_document_lists_session_routes() {
    let app = app!(state(MemorySessionStorage::new()));
    let resp = test::call_service(
        &app,
        test::TestRequest::get().uri("/api-docs/openapi.json").to_request(),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let doc: Value = test::read_body_json(resp).await;
    assert!(doc["paths"]["/sessions/{id}/save"].is_object());
}
