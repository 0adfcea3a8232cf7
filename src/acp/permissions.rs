//! Answers to `session/request_permission`

use anyhow::Result;
use shipwright_acp_client::{PermissionOption, RequestPermissionParams, RequestPermissionResult};

/// Decides how a permission prompt from the agent is answered
///
/// An `Err` is never sent to the agent: the client boundary turns it into a
/// cancelled outcome.
pub trait PermissionPolicy: Send + Sync {
    fn decide(&self, request: &RequestPermissionParams) -> Result<RequestPermissionResult>;
}

/// Approves every prompt that offers an allow option, without asking anyone
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprovePolicy;

impl PermissionPolicy for AutoApprovePolicy {
    fn decide(&self, request: &RequestPermissionParams) -> Result<RequestPermissionResult> {
        Ok(auto_approve(&request.options))
    }
}

/// First allow-kind option in list order, if any
pub fn first_allow_option(options: &[PermissionOption]) -> Option<&PermissionOption> {
    options.iter().find(|option| option.kind.is_allow())
}

/// Select the first allow option; cancel when there is none
pub fn auto_approve(options: &[PermissionOption]) -> RequestPermissionResult {
    match first_allow_option(options) {
        Some(option) => RequestPermissionResult::selected(option.option_id.clone()),
        None => RequestPermissionResult::cancelled(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shipwright_acp_client::PermissionOptionKind;

    fn option(id: &str, kind: PermissionOptionKind) -> PermissionOption {
        PermissionOption::new(id, id, kind)
    }

    #[test]
    fn picks_first_allow_in_list_order() {
        let options = [
            option("reject", PermissionOptionKind::RejectOnce),
            option("always", PermissionOptionKind::AllowAlways),
            option("once", PermissionOptionKind::AllowOnce),
        ];
        assert_eq!(auto_approve(&options), RequestPermissionResult::selected("always"));
    }

    #[test]
    fn cancels_without_allow_options() {
        let options = [
            option("reject", PermissionOptionKind::RejectOnce),
            option("never", PermissionOptionKind::RejectAlways),
            option("odd", PermissionOptionKind::Other),
        ];
        assert_eq!(auto_approve(&options), RequestPermissionResult::cancelled());
        assert_eq!(auto_approve(&[]), RequestPermissionResult::cancelled());
    }

    #[test]
    fn policy_wraps_the_rule() {
        let request = RequestPermissionParams {
            session_id: "s".into(),
            tool_call: serde_json::Value::Null,
            options: vec![option("yes", PermissionOptionKind::AllowOnce)],
        };
        assert_eq!(
            AutoApprovePolicy.decide(&request).unwrap(),
            RequestPermissionResult::selected("yes")
        );
    }
}
