use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::group::CampaignId;
use crate::domain::normalize_tag;
use crate::domain::worker::WorkerId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadDocumentId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadState {
    NoContesta,
    Venta,
    NoInteresa,
    NoMejorar,
    Erroneo,
    AgendarUsuario,
    AgendaPersonal,
    Ilocalizable,
    Repetido,
}

impl LeadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoContesta => "no_contesta",
            Self::Venta => "venta",
            Self::NoInteresa => "no_interesa",
            Self::NoMejorar => "no_mejorar",
            Self::Erroneo => "erroneo",
            Self::AgendarUsuario => "agendar_usuario",
            Self::AgendaPersonal => "agenda_personal",
            Self::Ilocalizable => "ilocalizable",
            Self::Repetido => "repetido",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_tag(value).as_str() {
            "nocontesta" => Some(Self::NoContesta),
            "venta" => Some(Self::Venta),
            "nointeresa" => Some(Self::NoInteresa),
            "nomejorar" => Some(Self::NoMejorar),
            "erroneo" => Some(Self::Erroneo),
            "agendarusuario" => Some(Self::AgendarUsuario),
            "agendapersonal" => Some(Self::AgendaPersonal),
            "ilocalizable" => Some(Self::Ilocalizable),
            "repetido" => Some(Self::Repetido),
            _ => None,
        }
    }

    /// States a lead can be re-dialled from: unset is handled by the caller,
    /// this covers the tagged case.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::NoContesta)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    Morning,
    Evening,
}

impl Shift {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match normalize_tag(value).as_str() {
            "morning" | "manana" => Some(Self::Morning),
            "evening" | "tarde" => Some(Self::Evening),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub external_id: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub state: Option<LeadState>,
    pub shift: Option<Shift>,
    pub campaign_id: Option<CampaignId>,
    pub holder: Option<WorkerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLead {
    pub external_id: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub campaign_id: Option<CampaignId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadDocument {
    pub id: LeadDocumentId,
    pub lead_id: LeadId,
    pub file_name: String,
    pub uploaded_at: DateTime<Utc>,
}
