//! CheckFileInfo: file metadata and host capabilities.

use axum::Json;
use chrono::{DateTime, SecondsFormat};
use tracing::error;
use wopibridge_core::messages::{Code, ResourceInfo, Timestamp, ViewMode};
use wopibridge_core::{FileInfo, WopiContext};

use super::WopiError;
use crate::app::AppContext;
use crate::auth::WopiSession;
use crate::launch::file_extension;

const ANONYMOUS_ID: &str = "anonymous";
const ANONYMOUS_NAME: &str = "Anonymous";

fn version(info: &ResourceInfo) -> String {
    match info.mtime {
        Some(Timestamp { seconds, nanos }) => format!("{seconds}.{nanos}"),
        None if !info.etag.is_empty() => info.etag.clone(),
        None => "0".to_string(),
    }
}

fn last_modified(mtime: Option<Timestamp>) -> String {
    mtime
        .and_then(|t| DateTime::from_timestamp(i64::try_from(t.seconds).ok()?, t.nanos))
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default()
}

fn base_file_name(info: &ResourceInfo) -> String {
    if info.name.is_empty() {
        info.path.rsplit('/').next().unwrap_or_default().to_string()
    } else {
        info.name.clone()
    }
}

/// Projects backend metadata and the session onto a [`FileInfo`].
#[must_use]
pub fn project(info: &ResourceInfo, ctx: &WopiContext) -> FileInfo {
    let name = base_file_name(info);
    let can_write = ctx.view_mode.can_write();
    let view_only = ctx.view_mode == ViewMode::ViewOnly;

    let (user_id, user_friendly_name) = match &ctx.user {
        Some(user) => {
            let friendly = if user.display_name.is_empty() {
                user.username.clone()
            } else {
                user.display_name.clone()
            };
            (user.id.opaque_id.clone(), friendly)
        }
        None => (ANONYMOUS_ID.to_string(), ANONYMOUS_NAME.to_string()),
    };

    FileInfo {
        file_extension: file_extension(&name).to_string(),
        breadcrumb_doc_name: name.clone(),
        base_file_name: name,
        owner_id: info
            .owner
            .as_ref()
            .map(|o| o.opaque_id.clone())
            .unwrap_or_default(),
        user_id,
        user_friendly_name,
        is_anonymous_user: ctx.user.is_none(),
        size: i64::try_from(info.size).ok(),
        version: version(info),
        last_modified_time: last_modified(info.mtime),

        user_can_write: can_write,
        read_only: !can_write,
        user_can_not_write_relative: true,

        supports_locks: true,
        supports_get_lock: true,
        supports_update: true,
        supports_extended_lock_length: true,

        host_view_url: ctx.view_app_url.clone(),
        host_edit_url: ctx.edit_app_url.clone(),

        disable_print: view_only,
        disable_export: view_only,
        disable_copy: view_only,
        ..FileInfo::default()
    }
}

/// Stats the session's file and reports its [`FileInfo`].
///
/// # Errors
///
/// [`WopiError::NotFound`] when the backend does not know the file,
/// [`WopiError::Internal`] for any other failure.
pub async fn check_file_info(
    app: &AppContext,
    session: &WopiSession,
) -> Result<Json<FileInfo>, WopiError> {
    let ctx = &session.context;
    let file_ref = session.file_ref.as_str();

    let resp = app
        .gateway
        .stat(&ctx.access_token, &ctx.file_reference)
        .await
        .map_err(|err| {
            error!(file_ref, error = %err, "Stat failed");
            WopiError::Internal
        })?;

    match (resp.status.code, resp.info) {
        (Code::Ok, Some(info)) => Ok(Json(project(&info, ctx))),
        (Code::NotFound, _) => Err(WopiError::NotFound),
        (code, _) => {
            error!(
                file_ref,
                status = %code,
                status_msg = %resp.status.message,
                "Stat failed"
            );
            Err(WopiError::Internal)
        }
    }
}
