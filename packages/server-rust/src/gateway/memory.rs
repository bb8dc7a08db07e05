//! In-process gateway holding files, locks, and users in memory.
//!
//! Implements the backend's lock semantics (one lock per file, expiring,
//! conflicting set returns `FAILED_PRECONDITION`) and serves its own data
//! endpoints through [`InMemoryGateway::data_router`], so the WOPI surface
//! can be exercised end to end without a remote backend.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::get;
use axum::Router;
use parking_lot::Mutex;
use wopibridge_core::messages::{
    AddAppProviderResponse, Code, FileDownloadProtocol, FileUploadProtocol, GetLockResponse,
    InitiateFileDownloadResponse, InitiateFileUploadResponse, Lock, ProviderInfo, Reference,
    ResourceId, ResourceInfo, SetLockResponse, StatResponse, Status, Timestamp, UnlockResponse,
    User, WhoAmIResponse,
};

use super::{Gateway, GatewayError, TRANSFER_TOKEN_HEADER};

#[derive(Debug, Clone)]
struct StoredFile {
    info: ResourceInfo,
    content: Bytes,
    lock: Option<Lock>,
}

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<ResourceId, StoredFile>,
    users: HashMap<String, User>,
    providers: Vec<ProviderInfo>,
}

/// Memory-backed [`Gateway`].
#[derive(Debug, Default)]
pub struct InMemoryGateway {
    inner: Mutex<Inner>,
    data_base: Mutex<Option<String>>,
}

fn now() -> Timestamp {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Timestamp {
        seconds: elapsed.as_secs(),
        nanos: elapsed.subsec_nanos(),
    }
}

fn is_live(lock: &Lock, at: Timestamp) -> bool {
    lock.expiration.is_none_or(|exp| exp > at)
}

impl StoredFile {
    fn live_lock(&self) -> Option<&Lock> {
        self.lock.as_ref().filter(|l| is_live(l, now()))
    }
}

impl InMemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base URL under which [`data_router`](Self::data_router) is
    /// served. Transfers cannot be initiated until this is set.
    pub fn set_data_base(&self, base: impl Into<String>) {
        *self.data_base.lock() = Some(base.into().trim_end_matches('/').to_string());
    }

    pub fn insert_file(&self, info: ResourceInfo, content: impl Into<Bytes>) {
        let content = content.into();
        let mut info = info;
        info.size = content.len() as u64;
        self.inner.lock().files.insert(
            info.id.clone(),
            StoredFile {
                info,
                content,
                lock: None,
            },
        );
    }

    /// Maps a backend credential to the user `WhoAmI` returns for it.
    pub fn insert_user(&self, token: impl Into<String>, user: User) {
        self.inner.lock().users.insert(token.into(), user);
    }

    #[must_use]
    pub fn content(&self, id: &ResourceId) -> Option<Bytes> {
        self.inner.lock().files.get(id).map(|f| f.content.clone())
    }

    /// The currently held, unexpired lock on a file.
    #[must_use]
    pub fn current_lock(&self, id: &ResourceId) -> Option<Lock> {
        self.inner
            .lock()
            .files
            .get(id)
            .and_then(StoredFile::live_lock)
            .cloned()
    }

    /// Places a lock directly, bypassing conflict checks.
    pub fn force_lock(&self, id: &ResourceId, lock: Lock) {
        if let Some(file) = self.inner.lock().files.get_mut(id) {
            file.lock = Some(lock);
        }
    }

    #[must_use]
    pub fn registered_providers(&self) -> Vec<ProviderInfo> {
        self.inner.lock().providers.clone()
    }

    fn find_by_opaque(&self, opaque_id: &str) -> Option<ResourceId> {
        self.inner
            .lock()
            .files
            .keys()
            .find(|id| id.opaque_id == opaque_id)
            .cloned()
    }

    fn store(&self, id: &ResourceId, content: Bytes) -> bool {
        let mut inner = self.inner.lock();
        let Some(file) = inner.files.get_mut(id) else {
            return false;
        };
        file.info.size = content.len() as u64;
        file.info.mtime = Some(now());
        file.content = content;
        true
    }

    /// Serves `GET`/`PUT /data/{opaque_id}`, the endpoints handed out by
    /// transfer negotiation. Requests must carry a transfer token.
    pub fn data_router(self: &Arc<Self>) -> Router {
        Router::new()
            .route("/data/{opaque_id}", get(download).put(upload))
            .with_state(Arc::clone(self))
    }
}

fn has_transfer_token(headers: &HeaderMap) -> bool {
    headers.contains_key(TRANSFER_TOKEN_HEADER)
}

async fn download(
    State(gw): State<Arc<InMemoryGateway>>,
    Path(opaque_id): Path<String>,
    headers: HeaderMap,
) -> Result<Bytes, StatusCode> {
    if !has_transfer_token(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    gw.find_by_opaque(&opaque_id)
        .and_then(|id| gw.content(&id))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn upload(
    State(gw): State<Arc<InMemoryGateway>>,
    Path(opaque_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    if !has_transfer_token(&headers) {
        return StatusCode::UNAUTHORIZED;
    }
    match gw.find_by_opaque(&opaque_id) {
        Some(id) if gw.store(&id, body) => StatusCode::OK,
        _ => StatusCode::NOT_FOUND,
    }
}

fn not_found() -> Status {
    Status::with_message(Code::NotFound, "file not found")
}

#[async_trait]
impl Gateway for InMemoryGateway {
    async fn who_am_i(&self, token: &str) -> Result<WhoAmIResponse, GatewayError> {
        let user = self.inner.lock().users.get(token).cloned();
        Ok(match user {
            Some(user) => WhoAmIResponse {
                status: Status::ok(),
                user: Some(user),
            },
            None => WhoAmIResponse {
                status: Status::new(Code::Unauthenticated),
                user: None,
            },
        })
    }

    async fn stat(&self, _token: &str, reference: &Reference) -> Result<StatResponse, GatewayError> {
        let info = self
            .inner
            .lock()
            .files
            .get(&reference.resource_id)
            .map(|f| f.info.clone());
        Ok(match info {
            Some(info) => StatResponse {
                status: Status::ok(),
                info: Some(info),
            },
            None => StatResponse {
                status: not_found(),
                info: None,
            },
        })
    }

    async fn get_lock(
        &self,
        _token: &str,
        reference: &Reference,
    ) -> Result<GetLockResponse, GatewayError> {
        let inner = self.inner.lock();
        let Some(file) = inner.files.get(&reference.resource_id) else {
            return Ok(GetLockResponse {
                status: not_found(),
                lock: None,
            });
        };
        Ok(GetLockResponse {
            status: Status::ok(),
            lock: file.live_lock().cloned(),
        })
    }

    async fn set_lock(
        &self,
        _token: &str,
        reference: &Reference,
        lock: Lock,
    ) -> Result<SetLockResponse, GatewayError> {
        let mut inner = self.inner.lock();
        let Some(file) = inner.files.get_mut(&reference.resource_id) else {
            return Ok(SetLockResponse {
                status: not_found(),
            });
        };
        if file.live_lock().is_some() {
            return Ok(SetLockResponse {
                status: Status::with_message(Code::FailedPrecondition, "file already locked"),
            });
        }
        file.lock = Some(lock);
        Ok(SetLockResponse {
            status: Status::ok(),
        })
    }

    async fn unlock(
        &self,
        _token: &str,
        reference: &Reference,
        lock: Lock,
    ) -> Result<UnlockResponse, GatewayError> {
        let mut inner = self.inner.lock();
        let Some(file) = inner.files.get_mut(&reference.resource_id) else {
            return Ok(UnlockResponse {
                status: not_found(),
            });
        };
        let status = match file.live_lock() {
            Some(held) if held.lock_id == lock.lock_id => {
                file.lock = None;
                Status::ok()
            }
            Some(_) => Status::with_message(Code::Locked, "lock mismatch"),
            None => Status::with_message(Code::FailedPrecondition, "file not locked"),
        };
        Ok(UnlockResponse { status })
    }

    async fn initiate_file_download(
        &self,
        _token: &str,
        reference: &Reference,
    ) -> Result<InitiateFileDownloadResponse, GatewayError> {
        let base = self.data_base.lock().clone();
        let id = &reference.resource_id;
        if !self.inner.lock().files.contains_key(id) {
            return Ok(InitiateFileDownloadResponse {
                status: not_found(),
                protocols: Vec::new(),
            });
        }
        let protocols = base
            .map(|base| FileDownloadProtocol {
                protocol: "simple".into(),
                download_endpoint: format!("{base}/data/{}", id.opaque_id),
                expose: false,
                token: format!("download-{}", id.opaque_id),
            })
            .into_iter()
            .collect();
        Ok(InitiateFileDownloadResponse {
            status: Status::ok(),
            protocols,
        })
    }

    async fn initiate_file_upload(
        &self,
        _token: &str,
        reference: &Reference,
        lock_id: &str,
    ) -> Result<InitiateFileUploadResponse, GatewayError> {
        let base = self.data_base.lock().clone();
        let id = &reference.resource_id;
        let held = {
            let inner = self.inner.lock();
            match inner.files.get(id) {
                Some(file) => file.live_lock().map(|l| l.lock_id.clone()),
                None => {
                    return Ok(InitiateFileUploadResponse {
                        status: not_found(),
                        protocols: Vec::new(),
                    })
                }
            }
        };
        if held.is_some_and(|held| held != lock_id) {
            return Ok(InitiateFileUploadResponse {
                status: Status::with_message(Code::FailedPrecondition, "lock mismatch"),
                protocols: Vec::new(),
            });
        }
        let protocols = base
            .map(|base| FileUploadProtocol {
                protocol: "simple".into(),
                upload_endpoint: format!("{base}/data/{}", id.opaque_id),
                expose: false,
                token: format!("upload-{}", id.opaque_id),
            })
            .into_iter()
            .collect();
        Ok(InitiateFileUploadResponse {
            status: Status::ok(),
            protocols,
        })
    }

    async fn add_app_provider(
        &self,
        provider: ProviderInfo,
    ) -> Result<AddAppProviderResponse, GatewayError> {
        self.inner.lock().providers.push(provider);
        Ok(AddAppProviderResponse {
            status: Status::ok(),
        })
    }
}
