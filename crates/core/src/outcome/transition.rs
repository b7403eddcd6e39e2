use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::lead::{LeadState, Shift};
use crate::domain::normalize_tag;
use crate::domain::worker::WorkerId;
use crate::errors::DomainError;

/// Outcome tags the state machine knows how to apply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeadOutcome {
    Venta,
    NoInteresa,
    NoMejorar,
    Erroneo,
    MorningShift,
    EveningShift,
    AgendarUsuario,
    AgendaPersonal,
    NoContesta,
}

impl LeadOutcome {
    pub fn parse(tag: &str) -> Option<Self> {
        match normalize_tag(tag).as_str() {
            "venta" => Some(Self::Venta),
            "nointeresa" => Some(Self::NoInteresa),
            "nomejorar" => Some(Self::NoMejorar),
            "erroneo" => Some(Self::Erroneo),
            "morningshift" => Some(Self::MorningShift),
            "eveningshift" => Some(Self::EveningShift),
            "agendarusuario" => Some(Self::AgendarUsuario),
            "agendapersonal" => Some(Self::AgendaPersonal),
            "nocontesta" => Some(Self::NoContesta),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Venta => "Venta",
            Self::NoInteresa => "NoInteresa",
            Self::NoMejorar => "NoMejorar",
            Self::Erroneo => "Erroneo",
            Self::MorningShift => "MorningShift",
            Self::EveningShift => "EveningShift",
            Self::AgendarUsuario => "AgendarUsuario",
            Self::AgendaPersonal => "AgendaPersonal",
            Self::NoContesta => "NoContesta",
        }
    }

    /// Computes the disposition for this outcome.
    ///
    /// `prior_attempts` is the number of log rows recorded for the lead before
    /// the current attempt; once it reaches `escalation_threshold` an
    /// unanswered call escalates to `Ilocalizable`.
    pub fn transition(
        &self,
        options: &OutcomeOptions,
        prior_attempts: u32,
        escalation_threshold: u32,
    ) -> Result<LeadTransition, DomainError> {
        let transition = match self {
            Self::Venta => LeadTransition::resolved(LeadState::Venta),
            Self::NoInteresa => LeadTransition::resolved(LeadState::NoInteresa),
            Self::NoMejorar => LeadTransition::resolved(LeadState::NoMejorar),
            Self::Erroneo => LeadTransition::resolved(LeadState::Erroneo),
            Self::MorningShift => LeadTransition::parked(Shift::Morning),
            Self::EveningShift => LeadTransition::parked(Shift::Evening),
            Self::AgendarUsuario => {
                let target = options.target_worker.clone().ok_or(DomainError::TargetNotSpecified)?;
                LeadTransition {
                    follow_up: Some(FollowUp::Enqueue { target }),
                    ..LeadTransition::resolved(LeadState::AgendarUsuario)
                }
            }
            Self::AgendaPersonal => {
                let subject = options
                    .subject
                    .as_deref()
                    .map(str::trim)
                    .filter(|subject| !subject.is_empty());
                match (subject, options.start_date) {
                    (Some(subject), Some(starts_at)) => LeadTransition {
                        follow_up: Some(FollowUp::ScheduleCall {
                            subject: subject.to_string(),
                            starts_at,
                            notes: options.notes.clone(),
                        }),
                        ..LeadTransition::resolved(LeadState::AgendaPersonal)
                    },
                    (subject, starts_at) => {
                        let mut missing = Vec::new();
                        if subject.is_none() {
                            missing.push("subject".to_string());
                        }
                        if starts_at.is_none() {
                            missing.push("start_date".to_string());
                        }
                        return Err(DomainError::AgendaDataMissing { missing });
                    }
                }
            }
            Self::NoContesta => {
                if prior_attempts >= escalation_threshold {
                    LeadTransition::resolved(LeadState::Ilocalizable)
                } else {
                    LeadTransition::resolved(LeadState::NoContesta)
                }
            }
        };

        Ok(transition)
    }
}

/// Extra data some outcomes need.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeOptions {
    pub target_worker: Option<WorkerId>,
    pub subject: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FollowUp {
    /// Hand the lead to another worker's queue.
    Enqueue { target: WorkerId },
    /// Book a callback for the typing worker.
    ScheduleCall { subject: String, starts_at: DateTime<Utc>, notes: Option<String> },
}

/// New disposition of a lead. `state: None` clears the state; `shift: None`
/// leaves the stored shift untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LeadTransition {
    pub state: Option<LeadState>,
    pub shift: Option<Shift>,
    pub follow_up: Option<FollowUp>,
}

impl LeadTransition {
    fn resolved(state: LeadState) -> Self {
        Self { state: Some(state), shift: None, follow_up: None }
    }

    fn parked(shift: Shift) -> Self {
        Self { state: None, shift: Some(shift), follow_up: None }
    }
}
