//! JSON request/response envelope for hosts that only exchange strings with the bridge.
//!
//! Requests look like `{"op": "read_content", "args": {"uri": "..."}}`; `list_grants` takes no
//! `args`. Responses are `{"status": "ok", "value": ...}` or
//! `{"status": "error", "error": {"kind": "...", "message": "..."}}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{BridgeError, BridgeResult};
use crate::service::FileBridgeService;
use crate::types::{
    CopyToLocalRequest, PickDirectoryOptions, PickFileOptions, ReadContentRequest,
    ReleaseAccessRequest, WriteContentRequest, WriteDirectoryEntryRequest,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
/// One boundary request, identified by operation name.
pub enum BridgeRequest {
    /// `pick_file`
    PickFile(PickFileOptions),
    /// `pick_directory`
    PickDirectory(PickDirectoryOptions),
    /// `read_content`
    ReadContent(ReadContentRequest),
    /// `copy_to_local`
    CopyToLocal(CopyToLocalRequest),
    /// `write_content`
    WriteContent(WriteContentRequest),
    /// `write_directory_entry`
    WriteDirectoryEntry(WriteDirectoryEntryRequest),
    /// `release_access`
    ReleaseAccess(ReleaseAccessRequest),
    /// `list_grants`
    ListGrants,
}

impl BridgeRequest {
    /// Returns the operation name carried on the wire.
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::PickFile(_) => "pick_file",
            Self::PickDirectory(_) => "pick_directory",
            Self::ReadContent(_) => "read_content",
            Self::CopyToLocal(_) => "copy_to_local",
            Self::WriteContent(_) => "write_content",
            Self::WriteDirectoryEntry(_) => "write_directory_entry",
            Self::ReleaseAccess(_) => "release_access",
            Self::ListGrants => "list_grants",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
/// One boundary response.
pub enum BridgeResponse {
    /// Successful result.
    Ok {
        /// Operation-specific JSON value.
        value: Value,
    },
    /// Failed result.
    Error {
        /// Error with its taxonomy kind.
        error: BridgeError,
    },
}

impl BridgeResponse {
    fn from_result<T: Serialize>(result: BridgeResult<T>) -> Self {
        match result.and_then(|value| {
            serde_json::to_value(value).map_err(|err| {
                BridgeError::io_failure(format!("failed to serialize response: {err}"))
            })
        }) {
            Ok(value) => Self::Ok { value },
            Err(error) => Self::Error { error },
        }
    }
}

/// Routes a typed request to `service` and wraps the outcome in a response envelope.
pub async fn dispatch<S: FileBridgeService + ?Sized>(
    service: &S,
    request: BridgeRequest,
) -> BridgeResponse {
    let operation = request.operation();
    let response = match request {
        BridgeRequest::PickFile(options) => {
            BridgeResponse::from_result(service.pick_file(options).await)
        }
        BridgeRequest::PickDirectory(options) => {
            BridgeResponse::from_result(service.pick_directory(options).await)
        }
        BridgeRequest::ReadContent(request) => {
            BridgeResponse::from_result(service.read_content(request).await)
        }
        BridgeRequest::CopyToLocal(request) => {
            BridgeResponse::from_result(service.copy_to_local(request).await)
        }
        BridgeRequest::WriteContent(request) => {
            BridgeResponse::from_result(service.write_content(request).await)
        }
        BridgeRequest::WriteDirectoryEntry(request) => {
            BridgeResponse::from_result(service.write_directory_entry(request).await)
        }
        BridgeRequest::ReleaseAccess(request) => {
            BridgeResponse::from_result(Ok(service.release_access(request).await))
        }
        BridgeRequest::ListGrants => BridgeResponse::from_result(Ok(service.list_grants().await)),
    };
    match response {
        BridgeResponse::Error { error } if error.operation.is_none() => BridgeResponse::Error {
            error: error.with_operation(operation),
        },
        other => other,
    }
}

/// Parses a JSON request, dispatches it, and serializes the response.
///
/// Malformed requests produce an `InvalidArgument` error envelope rather than a panic or a
/// transport-level failure.
pub async fn dispatch_json<S: FileBridgeService + ?Sized>(service: &S, raw: &str) -> String {
    let response = match serde_json::from_str::<BridgeRequest>(raw) {
        Ok(request) => dispatch(service, request).await,
        Err(err) => BridgeResponse::Error {
            error: BridgeError::invalid_argument(format!("malformed bridge request: {err}")),
        },
    };
    serde_json::to_string(&response).unwrap_or_else(|err| {
        format!(
            "{{\"status\":\"error\",\"error\":{{\"kind\":\"IOFailure\",\"message\":\"failed to serialize response: {}\"}}}}",
            err.to_string().replace('"', "'")
        )
    })
}

#[cfg(test)]
mod tests {
    use futures::executor::block_on;
    use serde_json::json;

    use super::*;
    use crate::service::NoopFileBridgeService;

    #[test]
    fn requests_parse_by_operation_name() {
        let request: BridgeRequest = serde_json::from_value(json!({
            "op": "copy_to_local",
            "args": {"uri": "content://docs/9", "destination": "documents"}
        }))
        .expect("deserialize");
        assert_eq!(request.operation(), "copy_to_local");

        let list: BridgeRequest =
            serde_json::from_value(json!({"op": "list_grants"})).expect("deserialize");
        assert_eq!(list, BridgeRequest::ListGrants);
    }

    #[test]
    fn dispatch_json_reports_errors_with_operation() {
        let raw = json!({"op": "read_content", "args": {"uri": "content://docs/1"}}).to_string();
        let response: Value =
            serde_json::from_str(&block_on(dispatch_json(&NoopFileBridgeService, &raw)))
                .expect("response json");
        assert_eq!(response["status"], "error");
        assert_eq!(response["error"]["kind"], "PermissionDenied");
        assert_eq!(response["error"]["operation"], "read_content");
    }

    #[test]
    fn dispatch_json_release_never_fails() {
        let raw = json!({"op": "release_access", "args": {"uris": ["a", "b"]}}).to_string();
        let response: Value =
            serde_json::from_str(&block_on(dispatch_json(&NoopFileBridgeService, &raw)))
                .expect("response json");
        assert_eq!(response, json!({"status": "ok", "value": {"releasedCount": 0}}));
    }

    #[test]
    fn malformed_requests_become_invalid_argument() {
        for raw in ["{", r#"{"op": "format_disk"}"#, r#"{"op": "read_content", "args": {}}"#] {
            let response: Value =
                serde_json::from_str(&block_on(dispatch_json(&NoopFileBridgeService, raw)))
                    .expect("response json");
            assert_eq!(response["status"], "error", "input={raw}");
            assert_eq!(response["error"]["kind"], "InvalidArgument", "input={raw}");
        }
    }
}
