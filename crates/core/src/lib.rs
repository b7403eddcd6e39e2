pub mod assignment;
pub mod authorization;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod hierarchy;
pub mod locks;
pub mod notify;
pub mod outcome;
pub mod ports;
pub mod queue;

pub use assignment::{AssignmentEngine, CandidateOrder, CandidateQuery, PriorityStrategy};
pub use authorization::{Actor, AuthorizationDecision, DenialReason, LeadAction, LeadAuthorizer};
pub use dispatcher::LeadDispatcher;
pub use domain::group::{Campaign, CampaignId, Group, GroupId, ShiftAffinity};
pub use domain::lead::{Lead, LeadId, LeadState, NewLead, Shift};
pub use domain::queue::LeadQueueEntry;
pub use domain::worker::{Worker, WorkerId, WorkerLink};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use hierarchy::HierarchyResolver;
pub use outcome::{LeadOutcome, OutcomeOptions, OutcomeStateMachine};
pub use ports::{ContactNotifier, LeadStore, LeadUnitOfWork};
pub use queue::LeadQueue;
