//! The client side the agent talks back to
//!
//! [`WorkflowClient`] answers the agent's callbacks and forwards its session
//! updates to the workflow. Internal faults never reach the agent as
//! protocol errors unless the request itself was bad: they are logged,
//! handed to the [`ErrorReporter`], and replaced with the documented default
//! answer.

use std::sync::Arc;

use anyhow::Error;
use async_trait::async_trait;
use shipwright_acp_client::{
    ClientHandler, JsonRpcError, ReadTextFileParams, ReadTextFileResult, RequestPermissionOutcome,
    RequestPermissionParams, RequestPermissionResult, SessionNotification, WriteTextFileParams,
    WriteTextFileResult,
};
use shipwright_commons::{ErrorReporter, TracingErrorReporter};
use tracing::{debug, warn};

use super::filesystem::{FileAccessPolicy, FsAccessError};
use super::permissions::{AutoApprovePolicy, PermissionPolicy};
use crate::orchestrator::queue::NotificationSender;

pub struct WorkflowClient {
    permissions: Arc<dyn PermissionPolicy>,
    files: FileAccessPolicy,
    notifications: NotificationSender,
    reporter: Arc<dyn ErrorReporter>,
}

impl WorkflowClient {
    /// Auto-approving client that reports faults through `tracing`
    pub fn new(notifications: NotificationSender) -> Self {
        Self {
            permissions: Arc::new(AutoApprovePolicy),
            files: FileAccessPolicy,
            notifications,
            reporter: Arc::new(TracingErrorReporter),
        }
    }

    pub fn with_permission_policy(mut self, policy: Arc<dyn PermissionPolicy>) -> Self {
        self.permissions = policy;
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    fn report(&self, error: &Error) {
        if let Err(capture_error) = self.reporter.capture(error) {
            debug!(error = %capture_error, "Error reporter rejected a captured fault");
        }
    }

    /// Log and capture a file fault; bad requests become `invalid_params`
    fn file_fault(&self, method: &str, error: FsAccessError) -> Result<(), JsonRpcError> {
        let request_error = error.is_request_error();
        let message = error.to_string();
        let error = Error::new(error).context(format!("{method} failed"));
        warn!(error = %format!("{error:#}"), "File request from agent failed");
        self.report(&error);

        if request_error {
            Err(JsonRpcError::invalid_params(message))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ClientHandler for WorkflowClient {
    async fn request_permission(
        &self,
        params: RequestPermissionParams,
    ) -> Result<RequestPermissionResult, JsonRpcError> {
        let result = match self.permissions.decide(&params) {
            Ok(result) => result,
            Err(error) => {
                warn!(error = %error, "Permission policy failed; denying");
                self.report(&error.context("permission policy failed"));
                RequestPermissionResult::cancelled()
            }
        };

        match &result.outcome {
            RequestPermissionOutcome::Selected { option_id } => {
                debug!(session_id = %params.session_id, option = %option_id, "Permission granted");
            }
            RequestPermissionOutcome::Cancelled => {
                debug!(session_id = %params.session_id, "Permission denied");
            }
        }
        Ok(result)
    }

    async fn read_text_file(
        &self,
        params: ReadTextFileParams,
    ) -> Result<ReadTextFileResult, JsonRpcError> {
        match self
            .files
            .read_text_file(&params.path, params.line, params.limit)
            .await
        {
            Ok(content) => Ok(ReadTextFileResult { content }),
            Err(error) => {
                self.file_fault("fs/read_text_file", error)?;
                Ok(ReadTextFileResult::default())
            }
        }
    }

    async fn write_text_file(
        &self,
        params: WriteTextFileParams,
    ) -> Result<WriteTextFileResult, JsonRpcError> {
        if let Err(error) = self
            .files
            .write_text_file(&params.path, &params.content)
            .await
        {
            self.file_fault("fs/write_text_file", error)?;
        }
        Ok(WriteTextFileResult::default())
    }

    async fn session_notification(&self, notification: SessionNotification) {
        if !self.notifications.push(notification) {
            debug!("Notification queue closed; dropping session update");
        }
    }
}
