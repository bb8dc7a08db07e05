//! GetFile and PutFile: streaming file contents through the bridge.
//!
//! Both negotiate a transfer with the gateway first, then talk plain HTTP to
//! the data endpoint it returns. Bodies are streamed in both directions and
//! are tied to the editor's request: dropping it aborts the transfer.

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::Response;
use tracing::{debug, error, info};
use wopibridge_core::messages::Code;

use super::error::status_response;
use super::locks::FileLocks;
use super::WopiError;
use crate::app::AppContext;
use crate::auth::WopiSession;
use crate::gateway::{TOKEN_HEADER, TRANSFER_TOKEN_HEADER};

fn transfer_request(
    app: &AppContext,
    method: reqwest::Method,
    endpoint: &str,
    transfer_token: &str,
    access_token: &str,
) -> reqwest::RequestBuilder {
    let mut request = app
        .transfer
        .request(method, endpoint)
        .header(TOKEN_HEADER, access_token);
    // Public-link transfers carry their token in the endpoint instead.
    if !transfer_token.is_empty() {
        request = request.header(TRANSFER_TOKEN_HEADER, transfer_token);
    }
    request
}

/// Streams the file's contents to the editor.
///
/// # Errors
///
/// [`WopiError::Internal`] when negotiation or the download fails.
pub async fn get_file(app: &AppContext, session: &WopiSession) -> Result<Response, WopiError> {
    let ctx = &session.context;
    let file_ref = session.file_ref.as_str();

    let negotiated = app
        .gateway
        .initiate_file_download(&ctx.access_token, &ctx.file_reference)
        .await
        .map_err(|err| {
            error!(file_ref, error = %err, "InitiateFileDownload failed");
            WopiError::Internal
        })?;
    if !negotiated.status.is_ok() {
        error!(
            file_ref,
            status = %negotiated.status.code,
            status_msg = %negotiated.status.message,
            "InitiateFileDownload failed"
        );
        return Err(WopiError::Internal);
    }
    let Some((endpoint, transfer_token)) = negotiated.simple_endpoint() else {
        error!(file_ref, "InitiateFileDownload offered no usable endpoint");
        return Err(WopiError::Internal);
    };

    let upstream = transfer_request(
        app,
        reqwest::Method::GET,
        endpoint,
        transfer_token,
        &ctx.access_token,
    )
    .send()
    .await
    .map_err(|err| {
        error!(file_ref, error = %err, "GetFile: download request failed");
        WopiError::Internal
    })?;

    if upstream.status() != reqwest::StatusCode::OK {
        error!(file_ref, status = upstream.status().as_u16(), "GetFile: download refused");
        return Err(WopiError::Internal);
    }

    debug!(file_ref, size = ?upstream.content_length(), "GetFile: streaming");
    let mut response = Response::builder().status(StatusCode::OK);
    if let Some(len) = upstream.content_length() {
        response = response.header(header::CONTENT_LENGTH, len);
    }
    response
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|err| {
            error!(file_ref, error = %err, "GetFile: building response failed");
            WopiError::Internal
        })
}

/// Streams the editor's request body into the file.
///
/// The upload carries `lock_id` (empty when none was sent). If the backend
/// refuses the upload because of a lock, the editor gets 409 with the lock
/// currently held.
///
/// # Errors
///
/// [`WopiError::Conflict`] for lock refusals, [`WopiError::Internal`] for
/// everything else.
pub async fn put_file(
    app: &AppContext,
    session: &WopiSession,
    lock_id: &str,
    body: Body,
) -> Result<Response, WopiError> {
    let ctx = &session.context;
    let file_ref = session.file_ref.as_str();

    let negotiated = app
        .gateway
        .initiate_file_upload(&ctx.access_token, &ctx.file_reference, lock_id)
        .await
        .map_err(|err| {
            error!(file_ref, lock_id, error = %err, "InitiateFileUpload failed");
            WopiError::Internal
        })?;

    match negotiated.status.code {
        Code::Ok => {}
        Code::FailedPrecondition | Code::Aborted | Code::Locked => {
            let locks = FileLocks::new(
                app.gateway.as_ref(),
                &ctx.access_token,
                &ctx.file_reference,
                file_ref,
                &app.config.app.lock_name,
            );
            let current_lock = locks.get_lock().await?;
            info!(file_ref, lock_id, current_lock = %current_lock, "PutFile refused by lock");
            return Err(WopiError::Conflict { current_lock });
        }
        code => {
            error!(
                file_ref,
                lock_id,
                status = %code,
                status_msg = %negotiated.status.message,
                "InitiateFileUpload failed"
            );
            return Err(WopiError::Internal);
        }
    }
    let Some((endpoint, transfer_token)) = negotiated.simple_endpoint() else {
        error!(file_ref, "InitiateFileUpload offered no usable endpoint");
        return Err(WopiError::Internal);
    };

    let upstream = transfer_request(
        app,
        reqwest::Method::PUT,
        endpoint,
        transfer_token,
        &ctx.access_token,
    )
    .body(reqwest::Body::wrap_stream(body.into_data_stream()))
    .send()
    .await
    .map_err(|err| {
        error!(file_ref, error = %err, "PutFile: upload request failed");
        WopiError::Internal
    })?;

    if !upstream.status().is_success() {
        error!(file_ref, status = upstream.status().as_u16(), "PutFile: upload refused");
        return Err(WopiError::Internal);
    }

    info!(file_ref, "PutFile: stored");
    Ok(status_response(StatusCode::OK))
}
