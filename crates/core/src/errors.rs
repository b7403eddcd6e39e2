use thiserror::Error;

use crate::domain::lead::LeadId;
use crate::domain::worker::WorkerId;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("worker {worker_id} has no group membership")]
    NoGroupMembership { worker_id: WorkerId },
    #[error("no campaigns are linked to the groups of worker {worker_id}")]
    NoCampaignsAvailable { worker_id: WorkerId },
    #[error("no lead is available for worker {worker_id}")]
    NoAvailableLead { worker_id: WorkerId },
    #[error("lead queue of worker {worker_id} is empty")]
    EmptyQueue { worker_id: WorkerId },
    #[error("outcome AgendarUsuario requires a target worker")]
    TargetNotSpecified,
    #[error("outcome AgendaPersonal is missing {missing:?}")]
    AgendaDataMissing { missing: Vec<String> },
    #[error("outcome `{outcome}` is not handled")]
    UnhandledOutcome { outcome: String },
    #[error("worker {0} not found")]
    WorkerNotFound(WorkerId),
    #[error("lead {0} not found")]
    LeadNotFound(LeadId),
    #[error("a lead with external id `{0}` already exists")]
    DuplicateExternalId(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    /// Stable machine-readable code for callers that translate errors into
    /// responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoGroupMembership { .. } => "no-group-membership",
            Self::NoCampaignsAvailable { .. } => "no-campaigns-available",
            Self::NoAvailableLead { .. } => "no-available-lead",
            Self::EmptyQueue { .. } => "empty-queue",
            Self::TargetNotSpecified => "target-not-specified",
            Self::AgendaDataMissing { .. } => "agenda-data-missing",
            Self::UnhandledOutcome { .. } => "unhandled-outcome",
            Self::WorkerNotFound(_) => "worker-not-found",
            Self::LeadNotFound(_) => "lead-not-found",
            Self::DuplicateExternalId(_) => "duplicate-external-id",
            Self::InvariantViolation(_) => "invariant-violation",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(error) => Some(error),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Domain(error) => error.code(),
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "configuration",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("not found: {message}")]
    NotFound { message: String, correlation_id: String },
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("conflict: {message}")]
    Conflict { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "The requested worker or lead does not exist.",
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::Conflict { .. } => "Nothing can be handed out right now. Try again later.",
            Self::ServiceUnavailable { .. } => {
                "The service is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::NotFound { correlation_id, .. }
            | Self::BadRequest { correlation_id, .. }
            | Self::Conflict { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::NotFound { correlation_id: id, .. }
            | InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::Conflict { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let unassigned = || "unassigned".to_owned();
        match value {
            ApplicationError::Domain(
                error @ (DomainError::WorkerNotFound(_) | DomainError::LeadNotFound(_)),
            ) => Self::NotFound { message: error.to_string(), correlation_id: unassigned() },
            ApplicationError::Domain(
                error @ (DomainError::TargetNotSpecified
                | DomainError::AgendaDataMissing { .. }
                | DomainError::UnhandledOutcome { .. }),
            ) => Self::BadRequest { message: error.to_string(), correlation_id: unassigned() },
            ApplicationError::Domain(
                error @ (DomainError::NoGroupMembership { .. }
                | DomainError::NoCampaignsAvailable { .. }
                | DomainError::NoAvailableLead { .. }
                | DomainError::EmptyQueue { .. }
                | DomainError::DuplicateExternalId(_)),
            ) => Self::Conflict { message: error.to_string(), correlation_id: unassigned() },
            ApplicationError::Domain(error @ DomainError::InvariantViolation(_)) => {
                Self::Internal { message: error.to_string(), correlation_id: unassigned() }
            }
            ApplicationError::Persistence(message) | ApplicationError::Integration(message) => {
                Self::ServiceUnavailable { message, correlation_id: unassigned() }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id: unassigned() }
            }
        }
    }
}
