use axum::{
    Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, put},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use coa_core::{
    ActivityEntry, ActivityLog, CertificateRecord, CertificateService, CoaError, CoreConfig,
    JsonFileDirectory, JsonFileStore, MemoryLog, UserAccount, UserDirectory, UserUpdate,
};
use coa_render::{RenderAssets, TemplateVariant};
use coa_types::{NonEmptyText, Role};

/// Application state shared across REST API handlers
///
/// Holds the certificate service, the user directory, the in-process
/// activity log, and the render assets cached at startup.
#[derive(Clone)]
struct AppState {
    certificates: CertificateService,
    users: Arc<dyn UserDirectory>,
    activity: Arc<MemoryLog>,
    assets: Arc<RenderAssets>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_records,
        next_code,
        get_record,
        create_record,
        update_record,
        render_pdf,
        list_users,
        create_user,
        update_user,
        delete_user,
        activity
    ),
    components(schemas(HealthRes, NextCodeRes, RecordSchema, UserBody, UserUpdateBody, ActivityRes))
)]
struct ApiDoc;

/// Main entry point for the COA application
///
/// Starts the REST server for the certificate registry.
///
/// # Environment Variables
/// - `COA_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `COA_DATA_DIR`: record/user store directory (default: "data")
/// - `COA_FONT_DIR`: certificate font directory (default: "fonts")
/// - `COA_LOGO_DIR`: brand logo directory (default: "static/image")
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("coa=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("COA_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!("++ Starting COA REST on {}", rest_addr);

    let config = CoreConfig::from_env()?;
    let store = Arc::new(JsonFileStore::open(config.data_dir())?);
    let users: Arc<dyn UserDirectory> = Arc::new(JsonFileDirectory::open(config.data_dir())?);
    let activity_log = Arc::new(MemoryLog::new());
    let certificates = CertificateService::new(store, activity_log.clone());
    let assets = Arc::new(RenderAssets::load(config.font_dir(), config.logo_dir()));

    let app = Router::new()
        .route("/health", get(health))
        .route("/records", get(list_records).post(create_record))
        .route("/records/next-code", get(next_code))
        .route("/records/:code", get(get_record).put(update_record))
        .route("/records/:code/pdf", get(render_pdf))
        .route("/users", get(list_users).post(create_user))
        .route("/users/:username", put(update_user).delete(delete_user))
        .route("/activity", get(activity))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState {
            certificates,
            users,
            activity: activity_log,
            assets,
        });

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// OpenAPI shape of a certificate record: a flat field-name → value map.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
struct RecordSchema(std::collections::BTreeMap<String, String>);

#[derive(serde::Serialize, utoipa::ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
struct NextCodeRes {
    code: String,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
struct UserBody {
    username: String,
    password_hash: String,
    role: String,
}

#[derive(serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
struct UserUpdateBody {
    password_hash: Option<String>,
    role: Option<String>,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
struct ActivityRes {
    timestamp: String,
    actor: String,
    action: String,
    detail: String,
}

impl From<ActivityEntry> for ActivityRes {
    fn from(entry: ActivityEntry) -> Self {
        Self {
            timestamp: entry.timestamp.to_rfc3339(),
            actor: entry.actor,
            action: entry.action,
            detail: entry.detail,
        }
    }
}

#[derive(serde::Deserialize)]
struct SearchParams {
    search: Option<String>,
}

#[derive(serde::Deserialize)]
struct VariantParams {
    variant: Option<String>,
}

type ApiError = (StatusCode, String);

/// The caller's identity as asserted by the upstream identity proxy.
///
/// Authentication itself is out of scope; the server trusts the `x-user` and
/// `x-role` headers placed by the proxy, and only enforces the role gate.
fn caller(headers: &HeaderMap) -> (String, Role) {
    let username = headers
        .get("x-user")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("desconocido")
        .to_owned();
    let role = headers
        .get("x-role")
        .and_then(|value| value.to_str().ok())
        .and_then(Role::parse)
        .unwrap_or(Role::Operator);
    (username, role)
}

fn require_role(headers: &HeaderMap, required: Role) -> Result<String, ApiError> {
    let (username, role) = caller(headers);
    if role.allows(required) {
        Ok(username)
    } else {
        Err((
            StatusCode::FORBIDDEN,
            format!("requires {required} role"),
        ))
    }
}

fn domain_error(err: CoaError) -> ApiError {
    match &err {
        CoaError::RecordNotFound(_) | CoaError::UserNotFound(_) => {
            (StatusCode::NOT_FOUND, err.to_string())
        }
        CoaError::DuplicateUsername(_) => (StatusCode::CONFLICT, err.to_string()),
        CoaError::InvalidInput(_) | CoaError::Code(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        _ => {
            tracing::error!("internal error: {err:?}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".into())
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint used by monitoring and load balancers.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "COA is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/records",
    params(("search" = Option<String>, Query, description = "Case-insensitive substring filter")),
    responses(
        (status = 200, description = "Matching certificate records", body = [RecordSchema]),
        (status = 500, description = "Internal server error")
    )
)]
/// List certificate records, optionally filtered.
///
/// The filter matches case-insensitively against every field value of every
/// record, like the registry search box.
async fn list_records(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<CertificateRecord>>, ApiError> {
    let records = state
        .certificates
        .search(params.search.as_deref())
        .map_err(domain_error)?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/records/next-code",
    responses(
        (status = 200, description = "Code the next registration will receive", body = NextCodeRes)
    )
)]
/// Preview the next sequential certificate code for the current year.
async fn next_code(State(state): State<AppState>) -> Result<Json<NextCodeRes>, ApiError> {
    let code = state
        .certificates
        .next_code(chrono::Utc::now())
        .map_err(domain_error)?;
    Ok(Json(NextCodeRes {
        code: code.to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/records/{code}",
    params(("code" = String, Path, description = "Certificate code, NNNN-YYYY")),
    responses(
        (status = 200, description = "The certificate record", body = RecordSchema),
        (status = 404, description = "No record with that code")
    )
)]
/// Fetch one certificate record by code.
async fn get_record(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<CertificateRecord>, ApiError> {
    let record = state.certificates.fetch(&code).map_err(domain_error)?;
    Ok(Json(record))
}

#[utoipa::path(
    post,
    path = "/records",
    request_body = RecordSchema,
    responses(
        (status = 201, description = "Record registered", body = RecordSchema),
        (status = 500, description = "Internal server error")
    )
)]
/// Register a new certificate record.
///
/// The server assigns the code and stamps the registration timestamp and
/// creator; caller-supplied values for those fields are ignored.
async fn create_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(fields): Json<CertificateRecord>,
) -> Result<(StatusCode, Json<CertificateRecord>), ApiError> {
    let (username, _) = caller(&headers);
    let record = state
        .certificates
        .register(fields, &username, chrono::Utc::now())
        .map_err(domain_error)?;
    Ok((StatusCode::CREATED, Json(record)))
}

#[utoipa::path(
    put,
    path = "/records/{code}",
    params(("code" = String, Path, description = "Certificate code, NNNN-YYYY")),
    request_body = RecordSchema,
    responses(
        (status = 200, description = "Record updated", body = RecordSchema),
        (status = 404, description = "No record with that code")
    )
)]
/// Update a certificate record in place, preserving its identity fields.
async fn update_record(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(fields): Json<CertificateRecord>,
) -> Result<Json<CertificateRecord>, ApiError> {
    let (username, _) = caller(&headers);
    let record = state
        .certificates
        .update(&code, fields, &username)
        .map_err(domain_error)?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/records/{code}/pdf",
    params(
        ("code" = String, Path, description = "Certificate code, NNNN-YYYY"),
        ("variant" = Option<String>, Query, description = "standard (default) or partner")
    ),
    responses(
        (status = 200, description = "The rendered certificate", content_type = "application/pdf"),
        (status = 400, description = "Unknown template variant"),
        (status = 404, description = "No record with that code"),
        (status = 500, description = "Rendering failed")
    )
)]
/// Render the printable certificate for a record.
///
/// Rendering is all-or-nothing: on failure the response carries no partial
/// document. A successful render is recorded in the activity log.
async fn render_pdf(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(params): Query<VariantParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let variant = TemplateVariant::parse(params.variant.as_deref().unwrap_or("standard"))
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;
    let record = state.certificates.fetch(&code).map_err(domain_error)?;

    let bytes = coa_render::render(&record, variant, &state.assets).map_err(|err| {
        tracing::error!("render failed for {code}: {err}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Unable to produce document".to_owned(),
        )
    })?;

    let (username, _) = caller(&headers);
    state.activity.append(
        &username,
        &format!("Generó PDF ({variant})"),
        &format!("Código: {code}"),
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=Certificado-{code}.pdf"),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/users",
    responses(
        (status = 200, description = "All user accounts", body = [UserBody]),
        (status = 403, description = "Requires administrator role")
    )
)]
/// List user accounts. Administrator only.
async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserBody>>, ApiError> {
    require_role(&headers, Role::Administrator)?;
    let accounts = state.users.list().map_err(domain_error)?;
    Ok(Json(
        accounts
            .into_iter()
            .map(|account| UserBody {
                username: account.username.to_string(),
                password_hash: account.password_hash,
                role: account.role.to_string(),
            })
            .collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = UserBody,
    responses(
        (status = 201, description = "User created"),
        (status = 400, description = "Invalid username or role"),
        (status = 403, description = "Requires administrator role"),
        (status = 409, description = "Username already exists")
    )
)]
/// Create a user account. Administrator only.
async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UserBody>,
) -> Result<StatusCode, ApiError> {
    let admin = require_role(&headers, Role::Administrator)?;
    let username = NonEmptyText::new(&body.username)
        .map_err(|err| (StatusCode::BAD_REQUEST, err.to_string()))?;
    let role = Role::parse(&body.role)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("unknown role: {}", body.role)))?;

    state
        .users
        .create(UserAccount {
            username: username.clone(),
            password_hash: body.password_hash,
            role,
        })
        .map_err(domain_error)?;
    state.activity.append(
        &admin,
        "Creó Usuario",
        &format!("Nuevo usuario: {username}"),
    );
    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    put,
    path = "/users/{username}",
    params(("username" = String, Path, description = "Account to update")),
    request_body = UserUpdateBody,
    responses(
        (status = 200, description = "User updated"),
        (status = 403, description = "Requires administrator role"),
        (status = 404, description = "User not found")
    )
)]
/// Update a user's password hash and/or role. Administrator only.
async fn update_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UserUpdateBody>,
) -> Result<StatusCode, ApiError> {
    let admin = require_role(&headers, Role::Administrator)?;
    let role = match body.role.as_deref() {
        Some(value) => Some(Role::parse(value).ok_or_else(|| {
            (StatusCode::BAD_REQUEST, format!("unknown role: {value}"))
        })?),
        None => None,
    };

    state
        .users
        .update(
            &username,
            UserUpdate {
                password_hash: body.password_hash,
                role,
            },
        )
        .map_err(domain_error)?;
    state.activity.append(
        &admin,
        "Editó Usuario",
        &format!("Usuario editado: {username}"),
    );
    Ok(StatusCode::OK)
}

#[utoipa::path(
    delete,
    path = "/users/{username}",
    params(("username" = String, Path, description = "Account to delete")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 403, description = "Requires administrator role"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Cannot delete the calling account")
    )
)]
/// Delete a user account. Administrator only; self-deletion is rejected.
async fn delete_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let admin = require_role(&headers, Role::Administrator)?;
    if admin == username {
        return Err((
            StatusCode::CONFLICT,
            "cannot delete the calling account".into(),
        ));
    }

    state.users.delete(&username).map_err(domain_error)?;
    state.activity.append(
        &admin,
        "Eliminó Usuario",
        &format!("Usuario eliminado: {username}"),
    );
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/activity",
    responses(
        (status = 200, description = "Recent activity, newest first", body = [ActivityRes]),
        (status = 403, description = "Requires administrator role")
    )
)]
/// View the in-process activity log. Administrator only.
async fn activity(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ActivityRes>>, ApiError> {
    require_role(&headers, Role::Administrator)?;
    let entries = state
        .activity
        .recent()
        .into_iter()
        .map(ActivityRes::from)
        .collect();
    Ok(Json(entries))
}
