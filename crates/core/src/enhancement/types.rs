//! Core enhancement data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gatherer::GatheredContext;
use crate::synthesizer::{SynthesisResult, SynthesisSource};

/// A request to enhance one ticket for one tenant.
///
/// Immutable for the lifetime of one attempt. The `correlation_id` is
/// generated once when the request is accepted and is carried through every
/// downstream call and log line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnhancementRequest {
    /// Tenant that owns the ticket.
    pub tenant_id: String,
    /// Ticket identifier in the tenant's ticketing system.
    pub ticket_id: String,
    /// Opaque trace token for this request.
    pub correlation_id: String,
    /// Ticket subject line.
    pub subject: String,
    /// Ticket body.
    #[serde(default)]
    pub description: String,
    /// Ticket priority as reported by the ticketing system (e.g. "high").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// Free-form ticket tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl EnhancementRequest {
    /// Create a request with a freshly generated correlation id.
    pub fn new(
        tenant_id: impl Into<String>,
        ticket_id: impl Into<String>,
        subject: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            ticket_id: ticket_id.into(),
            correlation_id: uuid::Uuid::new_v4().to_string(),
            subject: subject.into(),
            description: description.into(),
            priority: None,
            tags: Vec::new(),
        }
    }

    /// Override the correlation id (redeliveries keep the original one).
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    /// Set the ticket priority.
    pub fn with_priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Set the ticket tags.
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Text handed to gatherers: subject and description joined.
    pub fn ticket_text(&self) -> String {
        if self.description.trim().is_empty() {
            self.subject.clone()
        } else {
            format!("{}\n\n{}", self.subject, self.description)
        }
    }
}

/// Lifecycle status of an enhancement record.
///
/// ```text
/// pending -> context_gathering -> synthesizing -> updating -> completed
///    \______________\__________________\______________\-----> failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnhancementStatus {
    Pending,
    ContextGathering,
    Synthesizing,
    Updating,
    Completed,
    Failed,
}

impl EnhancementStatus {
    /// Stable string form used in storage and filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ContextGathering => "context_gathering",
            Self::Synthesizing => "synthesizing",
            Self::Updating => "updating",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Parse the storage string form.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "context_gathering" => Some(Self::ContextGathering),
            "synthesizing" => Some(Self::Synthesizing),
            "updating" => Some(Self::Updating),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true for `completed` and `failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The next forward stage, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::ContextGathering),
            Self::ContextGathering => Some(Self::Synthesizing),
            Self::Synthesizing => Some(Self::Updating),
            Self::Updating => Some(Self::Completed),
            Self::Completed | Self::Failed => None,
        }
    }

    /// Whether `self -> to` is a legal transition.
    ///
    /// Forward moves go one stage at a time; `failed` is reachable from any
    /// non-terminal state; terminal states never move.
    pub fn can_transition_to(&self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }
}

impl std::fmt::Display for EnhancementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The durable lifecycle row for one `(tenant_id, ticket_id)` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnhancementRecord {
    pub tenant_id: String,
    pub ticket_id: String,
    pub status: EnhancementStatus,
    /// Correlation id of the attempt that last touched this record.
    pub correlation_id: String,
    /// True if at least one gatherer did not succeed.
    pub partial_context: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_source: Option<SynthesisSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of accepted attempts for this key.
    pub attempts: u32,
    /// Calls made to the ticketing client during the last attempt.
    pub update_attempts: u32,
    /// Context gathered during the last attempt, kept for diagnostics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<GatheredContext>,
    /// Synthesis produced during the last attempt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis: Option<SynthesisResult>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl EnhancementRecord {
    /// Build the `pending` record for a newly accepted attempt.
    ///
    /// When a previous record exists for the key its `created_at` is kept and
    /// its attempt counter is carried forward; everything else is reset.
    pub fn accept(request: &EnhancementRequest, previous: Option<&EnhancementRecord>) -> Self {
        let now = Utc::now();
        Self {
            tenant_id: request.tenant_id.clone(),
            ticket_id: request.ticket_id.clone(),
            status: EnhancementStatus::Pending,
            correlation_id: request.correlation_id.clone(),
            partial_context: false,
            synthesis_source: None,
            error_message: None,
            attempts: previous.map(|p| p.attempts).unwrap_or(0) + 1,
            update_attempts: 0,
            context: None,
            synthesis: None,
            created_at: previous.map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
            completed_at: None,
        }
    }

    /// Attach the gathered context.
    pub fn set_context(&mut self, context: GatheredContext) {
        self.partial_context = context.is_partial();
        self.context = Some(context);
    }

    /// Attach the synthesis result.
    pub fn set_synthesis(&mut self, synthesis: SynthesisResult) {
        self.synthesis_source = Some(synthesis.source);
        self.synthesis = Some(synthesis);
    }

    /// Returns true if the record has reached `completed` or `failed`.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> EnhancementRequest {
        EnhancementRequest::new("acme", "T-1", "VPN drops", "Every hour the VPN disconnects")
            .with_correlation_id("c-1")
    }

    #[test]
    fn test_forward_transitions_go_one_stage_at_a_time() {
        use EnhancementStatus::*;

        assert!(Pending.can_transition_to(ContextGathering));
        assert!(ContextGathering.can_transition_to(Synthesizing));
        assert!(Synthesizing.can_transition_to(Updating));
        assert!(Updating.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Synthesizing));
        assert!(!ContextGathering.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
    }

    #[test]
    fn test_failed_reachable_from_every_non_terminal_state() {
        use EnhancementStatus::*;

        for status in [Pending, ContextGathering, Synthesizing, Updating] {
            assert!(status.can_transition_to(Failed), "{status} -> failed");
        }
        assert!(!Completed.can_transition_to(Failed));
        assert!(!Failed.can_transition_to(Pending));
    }

    #[test]
    fn test_status_string_roundtrip() {
        use EnhancementStatus::*;

        for status in [Pending, ContextGathering, Synthesizing, Updating, Completed, Failed] {
            assert_eq!(EnhancementStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(EnhancementStatus::parse("acquiring"), None);
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&EnhancementStatus::ContextGathering).unwrap();
        assert_eq!(json, "\"context_gathering\"");
    }

    #[test]
    fn test_accept_new_record() {
        let record = EnhancementRecord::accept(&request(), None);

        assert_eq!(record.status, EnhancementStatus::Pending);
        assert_eq!(record.correlation_id, "c-1");
        assert_eq!(record.attempts, 1);
        assert!(record.completed_at.is_none());
        assert!(!record.partial_context);
    }

    #[test]
    fn test_accept_carries_created_at_and_attempts() {
        let mut previous = EnhancementRecord::accept(&request(), None);
        previous.status = EnhancementStatus::Failed;
        previous.error_message = Some("boom".to_string());
        previous.attempts = 2;

        let retry = request().with_correlation_id("c-2");
        let record = EnhancementRecord::accept(&retry, Some(&previous));

        assert_eq!(record.created_at, previous.created_at);
        assert_eq!(record.attempts, 3);
        assert_eq!(record.correlation_id, "c-2");
        assert!(record.error_message.is_none());
        assert_eq!(record.status, EnhancementStatus::Pending);
    }

    #[test]
    fn test_ticket_text_without_description() {
        let request = EnhancementRequest::new("acme", "T-2", "Printer jam", "  ");
        assert_eq!(request.ticket_text(), "Printer jam");
    }
}
