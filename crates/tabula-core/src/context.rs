//! Per-request correlation context.
//!
//! Every independent unit of work (one agent call) gets its own
//! [`RequestContext`], created by the caller and passed down explicitly.
//! Log lines emitted inside [`RequestContext::span`] carry the correlation id,
//! so there is no ambient id that a later unit could inherit by accident.

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::Span;

/// Length of the random component of a correlation id.
const CONTEXT_PREFIX_LEN: usize = 5;

/// Identity of a single unit of work, used for log correlation and audit file names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    request_id: String,
    context_id: String,
}

impl RequestContext {
    /// Start a fresh context for `request_id` with a newly generated correlation id.
    pub fn new(request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        let context_id = format!("{}-{}", random_prefix(CONTEXT_PREFIX_LEN), request_id);
        Self {
            request_id,
            context_id,
        }
    }

    /// Caller-chosen id, stable across retries; names the audit files.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Unique correlation id for this unit of work.
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Tracing span that tags everything logged inside it with this context.
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            ctx = %self.context_id,
            request_id = %self.request_id
        )
    }
}

/// Random alphanumeric string, used for run ids and per-agent log directories.
pub fn random_prefix(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_prefix_length_and_charset() {
        let prefix = random_prefix(8);
        assert_eq!(prefix.len(), 8);
        assert!(prefix.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(random_prefix(0).is_empty());
    }

    #[test]
    fn test_context_id_embeds_request_id() {
        let ctx = RequestContext::new("run1_section_01");
        assert_eq!(ctx.request_id(), "run1_section_01");
        assert!(ctx.context_id().ends_with("-run1_section_01"));
        assert_eq!(ctx.context_id().len(), CONTEXT_PREFIX_LEN + 1 + "run1_section_01".len());
    }

    #[test]
    fn test_each_unit_gets_its_own_context() {
        // Same request id, separate units of work: correlation ids must not be shared.
        let ids: std::collections::HashSet<String> = (0..20)
            .map(|_| RequestContext::new("same").context_id().to_string())
            .collect();
        assert!(ids.len() > 1);
    }
}
