//! Audit trail event kinds.
//!
//! Every significant action is appended to the `events` collection. The
//! stored `type` is `{namespace}.{kind}`, e.g. `cashfree.mandate.created`.

use std::fmt;

/// Kind of audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEventKind {
    OnboardCreated,
    OnboardLinkCreated,
    MandateCreated,
    MandateAuthCreated,
    MandateManage,
    WebhookInvalidSignature,
    /// A verified delivery, tagged with its raw event type.
    WebhookReceived(String),
    /// A subscription event whose mandate could not be resolved.
    WebhookUpsertError,
    WebhookProcessingError,
}

impl AuditEventKind {
    /// Event type without the namespace prefix.
    pub fn event_type(&self) -> String {
        match self {
            AuditEventKind::OnboardCreated => "onboard.created".to_string(),
            AuditEventKind::OnboardLinkCreated => "onboard.link_created".to_string(),
            AuditEventKind::MandateCreated => "mandate.created".to_string(),
            AuditEventKind::MandateAuthCreated => "mandate.auth_created".to_string(),
            AuditEventKind::MandateManage => "mandate.manage".to_string(),
            AuditEventKind::WebhookInvalidSignature => "webhook.invalid_signature".to_string(),
            AuditEventKind::WebhookReceived(event_type) => {
                let event_type = event_type.trim();
                if event_type.is_empty() {
                    "webhook.unknown".to_string()
                } else {
                    format!("webhook.{}", event_type)
                }
            }
            AuditEventKind::WebhookUpsertError => "webhook.upsert_error".to_string(),
            AuditEventKind::WebhookProcessingError => "webhook.processing_error".to_string(),
        }
    }

    /// True for records describing a failure.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            AuditEventKind::WebhookInvalidSignature
                | AuditEventKind::WebhookUpsertError
                | AuditEventKind::WebhookProcessingError
        )
    }

    pub fn namespaced(&self, namespace: &str) -> String {
        format!("{}.{}", namespace, self.event_type())
    }
}

impl fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.event_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_kinds_map_to_dotted_types() {
        assert_eq!(AuditEventKind::OnboardLinkCreated.event_type(), "onboard.link_created");
        assert_eq!(AuditEventKind::MandateAuthCreated.event_type(), "mandate.auth_created");
        assert_eq!(AuditEventKind::WebhookUpsertError.event_type(), "webhook.upsert_error");
    }

    #[test]
    fn received_webhooks_carry_their_type() {
        let kind = AuditEventKind::WebhookReceived("SUBSCRIPTION_PAYMENT_SUCCESS".to_string());
        assert_eq!(kind.namespaced("cashfree"), "cashfree.webhook.SUBSCRIPTION_PAYMENT_SUCCESS");
        assert_eq!(AuditEventKind::WebhookReceived(" ".to_string()).event_type(), "webhook.unknown");
    }

    #[test]
    fn only_failures_are_errors() {
        assert!(AuditEventKind::WebhookInvalidSignature.is_error());
        assert!(AuditEventKind::WebhookProcessingError.is_error());
        assert!(!AuditEventKind::MandateCreated.is_error());
    }
}
