//! Staffperm REST API Server
//!
//! Run with: cargo run --features server --bin staffperm-server
//!
//! Endpoints:
//!   GET    /modules                                   - Module list with parents
//!   GET    /staff/:staff/permissions                  - Full matrix + revision
//!   PUT    /staff/:staff/permissions                  - Replace matrix
//!   DELETE /staff/:staff/permissions                  - Drop matrix
//!   POST   /staff/:staff/permissions/:scope/edit      - Apply one edit
//!   GET    /staff/:staff/permissions/:scope/roles     - Per-module roles

use std::sync::{Arc, Mutex};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use staffperm::{
    bits_to_names, classify, graph, Edit, MatrixStore, Module, PermError, PermissionMatrix, Role, ScopeId, ScopeMatrix,
    ServerConfig, ALL_BITS,
};

// ============================================================================
// State
// ============================================================================

struct AppState {
    store: MatrixStore,
    lock: Mutex<()>, // Serialize load-edit-save
}

type Shared = Arc<AppState>;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn err(msg: impl Into<String>) -> Self {
        Self { success: false, data: None, error: Some(msg.into()) }
    }
}

type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

fn reply<T>(r: staffperm::Result<T>) -> Reply<T> {
    match r {
        Ok(v) => (StatusCode::OK, Json(ApiResponse::ok(v))),
        Err(e @ PermError::Store(_)) => {
            error!(error = %e, "store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ApiResponse::err(e.to_string())))
        }
        Err(e) => (StatusCode::BAD_REQUEST, Json(ApiResponse::err(e.to_string()))),
    }
}

#[derive(Serialize)]
struct ModuleInfo {
    module: Module,
    bits: Vec<&'static str>,
    parents: Vec<Module>,
    children: Vec<Module>,
}

#[derive(Serialize)]
struct MatrixRes {
    revision: u64,
    matrix: PermissionMatrix,
}

#[derive(Serialize)]
struct RoleInfo {
    module: Module,
    role: Role,
    label: &'static str,
    granted: Vec<&'static str>,
}

#[derive(Serialize)]
struct ScopeRes {
    revision: u64,
    scope: ScopeId,
    rows: ScopeMatrix,
    roles: Vec<RoleInfo>,
    uniform: Option<Role>,
}

fn role_info(scope: &ScopeMatrix) -> Vec<RoleInfo> {
    scope
        .iter()
        .map(|(module, row)| {
            let role = classify(row);
            RoleInfo { module, role, label: role.label(), granted: bits_to_names(row.mask()) }
        })
        .collect()
}

// ============================================================================
// Handlers
// ============================================================================

async fn get_modules() -> Json<ApiResponse<Vec<ModuleInfo>>> {
    let g = graph();
    let list = Module::ALL
        .iter()
        .map(|&m| ModuleInfo {
            module: m,
            bits: bits_to_names(ALL_BITS),
            parents: g.parents_of(m).to_vec(),
            children: g.children_of(m).to_vec(),
        })
        .collect();
    Json(ApiResponse::ok(list))
}

async fn get_matrix(State(st): State<Shared>, Path(staff): Path<String>) -> Reply<MatrixRes> {
    reply(st.store.load_with_revision(&staff).map(|(matrix, revision)| MatrixRes { revision, matrix }))
}

async fn put_matrix(
    State(st): State<Shared>,
    Path(staff): Path<String>,
    Json(mut matrix): Json<PermissionMatrix>,
) -> Reply<MatrixRes> {
    let _l = st.lock.lock().unwrap_or_else(|p| p.into_inner());
    matrix.normalize_all(graph());
    reply(st.store.save(&staff, &matrix).map(|revision| MatrixRes { revision, matrix }))
}

async fn delete_matrix(State(st): State<Shared>, Path(staff): Path<String>) -> Reply<bool> {
    let _l = st.lock.lock().unwrap_or_else(|p| p.into_inner());
    reply(st.store.delete(&staff))
}

async fn post_edit(
    State(st): State<Shared>,
    Path((staff, scope)): Path<(String, String)>,
    Json(edit): Json<Edit>,
) -> Reply<ScopeRes> {
    let _l = st.lock.lock().unwrap_or_else(|p| p.into_inner());
    reply(edit_and_save(&st.store, &staff, ScopeId::from(scope), &edit))
}

fn edit_and_save(store: &MatrixStore, staff: &str, scope: ScopeId, edit: &Edit) -> staffperm::Result<ScopeRes> {
    let (rows, revision) = store.apply_edit(staff, &scope, edit)?;
    info!(staff, %scope, ?edit, revision, "applied edit");
    Ok(ScopeRes { revision, roles: role_info(&rows), uniform: rows.uniform_role(), scope, rows })
}

async fn get_roles(
    State(st): State<Shared>,
    Path((staff, scope)): Path<(String, String)>,
) -> Reply<ScopeRes> {
    let scope = ScopeId::from(scope);
    reply(st.store.load_with_revision(&staff).map(|(matrix, revision)| {
        let rows = matrix.scope(&scope).cloned().unwrap_or_default();
        ScopeRes { revision, roles: role_info(&rows), uniform: rows.uniform_role(), scope, rows }
    }))
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ServerConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(2);
        }
    };

    let store = match MatrixStore::open(&config.store) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to open store");
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = Arc::new(AppState { store, lock: Mutex::new(()) });

    let app = Router::new()
        .route("/modules", get(get_modules))
        .route("/staff/:staff/permissions", get(get_matrix).put(put_matrix).delete(delete_matrix))
        .route("/staff/:staff/permissions/:scope/edit", post(post_edit))
        .route("/staff/:staff/permissions/:scope/roles", get(get_roles))
        .layer(cors)
        .with_state(state);

    let addr = config.addr();
    info!(%addr, "staffperm server listening");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            error!(error = %e, %addr, "bind failed");
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "server error");
    }
}
