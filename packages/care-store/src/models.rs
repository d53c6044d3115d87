//! Modelos de dados compartilhados entre aplicações
//!
//! Este módulo define as estruturas de dados principais do ecossistema:
//! usuários, pacientes, agendamentos e solicitações de atendimento.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::str::FromStr;
use uuid::Uuid;

/// Gera `as_str`, `Display` e `FromStr` para enums persistidos como texto
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Valor textual gravado no banco e trafegado na API
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!(
                        "Valor inválido para {}: {}",
                        stringify!($name),
                        other
                    )),
                }
            }
        }
    };
}

/// Papel do usuário no sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "paciente")]
    Patient,
    #[serde(rename = "psicologo")]
    Psychologist,
}

text_enum!(Role {
    Patient => "paciente",
    Psychologist => "psicologo",
});

/// Situação do paciente na carteira do psicólogo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientStatus {
    #[serde(rename = "Ativo")]
    Active,
    #[serde(rename = "Inativo")]
    Inactive,
}

text_enum!(PatientStatus {
    Active => "Ativo",
    Inactive => "Inativo",
});

/// Status possíveis de um agendamento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppointmentStatus {
    /// Sessão marcada, ainda não iniciada
    #[serde(rename = "agendado")]
    Scheduled,
    /// Sessão em andamento
    #[serde(rename = "iniciado")]
    Started,
    /// Sessão concluída
    #[serde(rename = "concluido")]
    Completed,
}

text_enum!(AppointmentStatus {
    Scheduled => "agendado",
    Started => "iniciado",
    Completed => "concluido",
});

impl AppointmentStatus {
    /// Próximo status permitido; `None` depois de concluído
    pub fn next(&self) -> Option<AppointmentStatus> {
        match self {
            AppointmentStatus::Scheduled => Some(AppointmentStatus::Started),
            AppointmentStatus::Started => Some(AppointmentStatus::Completed),
            AppointmentStatus::Completed => None,
        }
    }

    /// Transições são monotônicas: sem retorno e sem pular etapas
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        self.next() == Some(next)
    }
}

/// Urgência declarada pelo paciente na solicitação
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Urgency {
    #[serde(rename = "alta")]
    High,
    #[serde(rename = "media")]
    Medium,
    #[serde(rename = "baixa")]
    Low,
}

text_enum!(Urgency {
    High => "alta",
    Medium => "media",
    Low => "baixa",
});

/// Status de uma solicitação de atendimento
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStatus {
    #[serde(rename = "pendente")]
    Pending,
    #[serde(rename = "aceito")]
    Accepted,
    #[serde(rename = "rejeitado")]
    Rejected,
}

text_enum!(RequestStatus {
    Pending => "pendente",
    Accepted => "aceito",
    Rejected => "rejeitado",
});

impl RequestStatus {
    /// Aceito e rejeitado são estados finais
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Única origem válida é `pendente`, e apenas para um estado final
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        matches!(
            (self, next),
            (RequestStatus::Pending, RequestStatus::Accepted)
                | (RequestStatus::Pending, RequestStatus::Rejected)
        )
    }
}

fn decode_text<T>(row: &SqliteRow, column: &str) -> sqlx::Result<T>
where
    T: FromStr<Err = String>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|msg: String| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, msg)),
    })
}

/// Usuário cadastrado (paciente ou psicólogo)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    /// Registro no Conselho Regional de Psicologia
    pub crp: Option<String>,
    pub specialty: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for User {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            role: decode_text(row, "role")?,
            phone: row.try_get("phone")?,
            crp: row.try_get("crp")?,
            specialty: row.try_get("specialty")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Dados de cadastro de um novo usuário
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub phone: Option<String>,
    pub crp: Option<String>,
    pub specialty: Option<String>,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"***")
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// Paciente pertencente à carteira de um psicólogo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub status: PatientStatus,
    /// Psicólogo responsável (dono único do registro)
    pub psychologist_id: Uuid,
    pub total_sessions: i32,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Patient {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            birth_date: row.try_get("birth_date")?,
            age: row.try_get("age")?,
            status: decode_text(row, "status")?,
            psychologist_id: row.try_get("psychologist_id")?,
            total_sessions: row.try_get("total_sessions")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Campos para criação de paciente
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPatient {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub birth_date: NaiveDate,
    pub age: i32,
    pub status: PatientStatus,
    pub psychologist_id: Uuid,
}

/// Representa uma sessão entre psicólogo e paciente
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub psychologist_id: Uuid,
    /// Data no horário local da clínica
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub description: String,
    pub status: AppointmentStatus,
}

impl Appointment {
    /// Início da sessão no horário local da clínica
    pub fn starts_at(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }
}

impl FromRow<'_, SqliteRow> for Appointment {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            patient_id: row.try_get("patient_id")?,
            psychologist_id: row.try_get("psychologist_id")?,
            date: row.try_get("date")?,
            time: row.try_get("time")?,
            description: row.try_get("description")?,
            status: decode_text(row, "status")?,
        })
    }
}

/// Campos de um novo agendamento; o status inicial é sempre `agendado`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub psychologist_id: Uuid,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub description: String,
}

/// Solicitação de atendimento enviada por um paciente
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareRequest {
    pub id: Uuid,
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub preferred_psychologist: Uuid,
    pub description: String,
    pub urgency: Urgency,
    pub notes: Option<String>,
    pub status: RequestStatus,
    /// Nota livre registrada na última transição de status
    pub status_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for CareRequest {
    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: row.try_get("id")?,
            patient_name: row.try_get("patient_name")?,
            patient_email: row.try_get("patient_email")?,
            patient_phone: row.try_get("patient_phone")?,
            preferred_psychologist: row.try_get("preferred_psychologist")?,
            description: row.try_get("description")?,
            urgency: decode_text(row, "urgency")?,
            notes: row.try_get("notes")?,
            status: decode_text(row, "status")?,
            status_note: row.try_get("status_note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Campos enviados pelo paciente ao solicitar atendimento
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCareRequest {
    pub patient_name: String,
    pub patient_email: String,
    pub patient_phone: String,
    pub preferred_psychologist: Uuid,
    pub description: String,
    pub urgency: Urgency,
    pub notes: Option<String>,
}
