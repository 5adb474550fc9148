//! Error taxonomy and context envelope.
//!
//! `FleetError` is the flat, thiserror-derived enum every fallible core operation
//! returns. `ErrorContext` wraps one for the cases (action results, audit events,
//! protocol responses) that need the richer envelope: severity, a safe-to-display
//! user message, recovery suggestions, and a request id.

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FleetError>;

/// Taxonomy of core failure kinds.
#[derive(Error, Debug)]
pub enum FleetError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("authorization denied: {0}")]
    Authorization(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session expired: {0}")]
    SessionExpired(String),

    #[error("rate limit exceeded for {key}, resets in {reset_in:?}")]
    RateLimited { key: String, reset_in: Duration },

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("browser crashed: {0}")]
    BrowserCrash(String),

    #[error("browser operation timed out after {0:?}")]
    BrowserTimeout(Duration),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("security violation: {0}")]
    Security(String),

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("pool unavailable: {0}")]
    PoolUnavailable(String),

    #[error("acquisition timed out after {0:?}")]
    AcquisitionTimeout(Duration),

    #[error("circuit open for operation {0}")]
    CircuitOpen(String),

    #[error("system error: {0}")]
    System(String),

    #[error("business rule violated: {0}")]
    BusinessLogic(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Broad category an error falls into, used for protocol status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorCategory {
    Validation,
    Authentication,
    Authorization,
    Session,
    RateLimit,
    Resource,
    Network,
    Browser,
    Configuration,
    Security,
    ExternalService,
    System,
    BusinessLogic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum RecoverySuggestion {
    Retry,
    RetryWithBackoff,
    RefreshToken,
    LoginAgain,
    CheckPermissions,
    ValidateInput,
    WaitAndRetry,
    CheckNetwork,
    CheckResource,
    ContactSupport,
}

/// HTTP-class status a `FleetError` maps onto for the (external) protocol frontends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolStatus {
    pub http: u16,
    pub grpc: &'static str,
    pub json_rpc: i32,
}

impl FleetError {
    pub fn category(&self) -> ErrorCategory {
        use FleetError::*;
        match self {
            Validation(_) => ErrorCategory::Validation,
            Authentication(_) => ErrorCategory::Authentication,
            Authorization(_) => ErrorCategory::Authorization,
            SessionNotFound(_) | SessionExpired(_) => ErrorCategory::Session,
            RateLimited { .. } => ErrorCategory::RateLimit,
            NotFound(_) | QuotaExceeded(_) => ErrorCategory::Resource,
            Network(_) => ErrorCategory::Network,
            BrowserCrash(_) | BrowserTimeout(_) | Navigation(_) | PoolUnavailable(_)
            | AcquisitionTimeout(_) | CircuitOpen(_) => ErrorCategory::Browser,
            Configuration(_) => ErrorCategory::Configuration,
            Security(_) => ErrorCategory::Security,
            ExternalService(_) => ErrorCategory::ExternalService,
            System(_) | Serialization(_) => ErrorCategory::System,
            BusinessLogic(_) => ErrorCategory::BusinessLogic,
        }
    }

    pub fn severity(&self) -> Severity {
        use FleetError::*;
        match self {
            Validation(_) | RateLimited { .. } => Severity::Low,
            SessionNotFound(_) | SessionExpired(_) | NotFound(_) | Network(_) => Severity::Medium,
            Authentication(_) | Authorization(_) | BrowserCrash(_) | BrowserTimeout(_)
            | Navigation(_) | PoolUnavailable(_) | AcquisitionTimeout(_) | CircuitOpen(_)
            | QuotaExceeded(_) | ExternalService(_) | BusinessLogic(_) => Severity::High,
            Configuration(_) | Security(_) | System(_) | Serialization(_) => Severity::Critical,
        }
    }

    /// Whether this event should be audited and flagged for operator attention.
    pub fn should_alert(&self) -> bool {
        matches!(
            self,
            FleetError::Security(_) | FleetError::Authentication(_) | FleetError::System(_)
        )
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FleetError::Network(_)
                | FleetError::BrowserTimeout(_)
                | FleetError::ExternalService(_)
                | FleetError::AcquisitionTimeout(_)
        )
    }

    pub fn recovery_suggestions(&self) -> Vec<RecoverySuggestion> {
        use FleetError::*;
        use RecoverySuggestion::*;
        match self {
            Validation(_) => vec![ValidateInput],
            SessionExpired(_) => vec![RefreshToken, LoginAgain],
            SessionNotFound(_) => vec![LoginAgain],
            Authentication(_) => vec![LoginAgain],
            Authorization(_) => vec![CheckPermissions],
            RateLimited { .. } => vec![WaitAndRetry],
            Network(_) => vec![CheckNetwork, RetryWithBackoff],
            BrowserCrash(_) | BrowserTimeout(_) | Navigation(_) | ExternalService(_) => {
                vec![RetryWithBackoff]
            }
            PoolUnavailable(_) | AcquisitionTimeout(_) => vec![WaitAndRetry, RetryWithBackoff],
            QuotaExceeded(_) | NotFound(_) => vec![CheckResource],
            CircuitOpen(_) => vec![WaitAndRetry],
            Configuration(_) | Security(_) | System(_) | Serialization(_) | BusinessLogic(_) => {
                vec![ContactSupport]
            }
        }
    }

    /// Safe-for-display message; never includes raw internals.
    pub fn user_message(&self) -> String {
        match self.category() {
            ErrorCategory::Validation => "The request was invalid.".into(),
            ErrorCategory::Authentication => "Authentication failed.".into(),
            ErrorCategory::Authorization => "You do not have permission to do that.".into(),
            ErrorCategory::Session => "Your session has expired. Please sign in again.".into(),
            ErrorCategory::RateLimit => "Too many requests. Please slow down.".into(),
            ErrorCategory::Resource => "The requested resource is unavailable.".into(),
            ErrorCategory::Network | ErrorCategory::Browser | ErrorCategory::ExternalService => {
                "A temporary issue occurred. Please try again.".into()
            }
            ErrorCategory::Configuration | ErrorCategory::System => {
                "An unexpected error occurred.".into()
            }
            ErrorCategory::Security => "The request was rejected for security reasons.".into(),
            ErrorCategory::BusinessLogic => "The operation could not be completed.".into(),
        }
    }

    pub fn protocol_status(&self) -> ProtocolStatus {
        match self.category() {
            ErrorCategory::Validation => ProtocolStatus { http: 400, grpc: "INVALID_ARGUMENT", json_rpc: -32602 },
            ErrorCategory::Authentication => ProtocolStatus { http: 401, grpc: "UNAUTHENTICATED", json_rpc: -32001 },
            ErrorCategory::Authorization => ProtocolStatus { http: 403, grpc: "PERMISSION_DENIED", json_rpc: -32002 },
            ErrorCategory::Session => ProtocolStatus { http: 401, grpc: "UNAUTHENTICATED", json_rpc: -32001 },
            ErrorCategory::RateLimit => ProtocolStatus { http: 429, grpc: "RESOURCE_EXHAUSTED", json_rpc: -32003 },
            ErrorCategory::Resource => ProtocolStatus { http: 404, grpc: "NOT_FOUND", json_rpc: -32004 },
            ErrorCategory::Network => ProtocolStatus { http: 503, grpc: "UNAVAILABLE", json_rpc: -32005 },
            ErrorCategory::Browser => ProtocolStatus { http: 504, grpc: "DEADLINE_EXCEEDED", json_rpc: -32006 },
            ErrorCategory::Configuration => ProtocolStatus { http: 500, grpc: "INTERNAL", json_rpc: -32603 },
            ErrorCategory::Security => ProtocolStatus { http: 403, grpc: "PERMISSION_DENIED", json_rpc: -32002 },
            ErrorCategory::ExternalService => ProtocolStatus { http: 502, grpc: "UNAVAILABLE", json_rpc: -32005 },
            ErrorCategory::System => ProtocolStatus { http: 500, grpc: "INTERNAL", json_rpc: -32603 },
            ErrorCategory::BusinessLogic => ProtocolStatus { http: 409, grpc: "ALREADY_EXISTS", json_rpc: -32007 },
        }
    }

    pub fn context(&self, request_id: impl Into<String>) -> ErrorContext {
        ErrorContext {
            code: error_code(self),
            category: self.category(),
            severity: self.severity(),
            user_message: self.user_message(),
            technical_details: self.to_string(),
            request_id: request_id.into(),
            session_id: None,
            user_id: None,
            recovery_suggestions: self.recovery_suggestions(),
            should_alert: self.should_alert(),
            documentation_link: None,
        }
    }
}

fn error_code(err: &FleetError) -> &'static str {
    use FleetError::*;
    match err {
        Validation(_) => "VALIDATION_FAILED",
        Authentication(_) => "AUTH_FAILED",
        Authorization(_) => "AUTHZ_DENIED",
        SessionNotFound(_) => "SESSION_NOT_FOUND",
        SessionExpired(_) => "SESSION_EXPIRED",
        RateLimited { .. } => "RATE_LIMITED",
        NotFound(_) => "NOT_FOUND",
        QuotaExceeded(_) => "QUOTA_EXCEEDED",
        Network(_) => "NETWORK_ERROR",
        BrowserCrash(_) => "BROWSER_CRASH",
        BrowserTimeout(_) => "BROWSER_TIMEOUT",
        Navigation(_) => "NAVIGATION_FAILED",
        Configuration(_) => "CONFIG_ERROR",
        Security(_) => "SECURITY_VIOLATION",
        ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
        PoolUnavailable(_) => "POOL_UNAVAILABLE",
        AcquisitionTimeout(_) => "ACQUISITION_TIMEOUT",
        CircuitOpen(_) => "CIRCUIT_OPEN",
        System(_) => "SYSTEM_ERROR",
        BusinessLogic(_) => "BUSINESS_LOGIC_ERROR",
        Serialization(_) => "SERIALIZATION_ERROR",
    }
}

/// The full context object carried alongside an error for audit/response purposes.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorContext {
    pub code: &'static str,
    pub category: ErrorCategory,
    pub severity: Severity,
    pub user_message: String,
    pub technical_details: String,
    pub request_id: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub recovery_suggestions: Vec<RecoverySuggestion>,
    pub should_alert: bool,
    pub documentation_link: Option<String>,
}

impl ErrorContext {
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_never_retries() {
        let err = FleetError::Validation("bad selector".into());
        assert!(!err.is_retryable());
        assert_eq!(err.protocol_status().http, 400);
    }

    #[test]
    fn session_expired_suggests_refresh() {
        let err = FleetError::SessionExpired("s1".into());
        assert!(err
            .recovery_suggestions()
            .contains(&RecoverySuggestion::RefreshToken));
        assert_eq!(err.protocol_status().http, 401);
    }

    #[test]
    fn security_errors_alert() {
        assert!(FleetError::Security("anomaly".into()).should_alert());
        assert!(!FleetError::Validation("x".into()).should_alert());
    }

    #[test]
    fn context_carries_request_id() {
        let ctx = FleetError::NotFound("page".into()).context("req-1");
        assert_eq!(ctx.request_id, "req-1");
        assert_eq!(ctx.code, "NOT_FOUND");
    }
}
