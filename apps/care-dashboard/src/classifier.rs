//! Classificação temporal dos agendamentos de um psicólogo
//!
//! Todas as comparações usam o horário local da clínica. "Hoje" compara datas
//! de calendário, não janelas de 24 horas.

use care_store::models::{Appointment, AppointmentStatus};
use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

/// Partição dos agendamentos usada pelo painel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPartition {
    /// Sessões agendadas para o dia de referência
    pub today: Vec<Appointment>,
    /// Próximas sessões agendadas, em ordem crescente
    pub upcoming: Vec<Appointment>,
    /// Total de sessões concluídas
    pub completed_count: usize,
}

/// Converte um instante UTC para o relógio local da clínica
pub fn local_reference(now: DateTime<Utc>, timezone: Tz) -> NaiveDateTime {
    now.with_timezone(&timezone).naive_local()
}

fn is_scheduled_for(appointment: &Appointment, psychologist_id: Uuid) -> bool {
    appointment.psychologist_id == psychologist_id
        && appointment.status == AppointmentStatus::Scheduled
}

pub fn today_sessions(
    appointments: &[Appointment],
    psychologist_id: Uuid,
    reference: NaiveDateTime,
) -> Vec<Appointment> {
    let today = reference.date();
    appointments
        .iter()
        .filter(|a| is_scheduled_for(a, psychologist_id) && a.date == today)
        .cloned()
        .collect()
}

pub fn upcoming_sessions(
    appointments: &[Appointment],
    psychologist_id: Uuid,
    reference: NaiveDateTime,
    limit: usize,
) -> Vec<Appointment> {
    let mut upcoming: Vec<Appointment> = appointments
        .iter()
        .filter(|a| is_scheduled_for(a, psychologist_id) && a.starts_at() >= reference)
        .cloned()
        .collect();
    upcoming.sort_by_key(|a| a.starts_at());
    upcoming.truncate(limit);
    upcoming
}

pub fn completed_count(appointments: &[Appointment], psychologist_id: Uuid) -> usize {
    appointments
        .iter()
        .filter(|a| {
            a.psychologist_id == psychologist_id && a.status == AppointmentStatus::Completed
        })
        .count()
}

/// Função pura de `(agendamentos, psicólogo, referência)`
pub fn classify(
    appointments: &[Appointment],
    psychologist_id: Uuid,
    reference: NaiveDateTime,
    upcoming_limit: usize,
) -> SessionPartition {
    SessionPartition {
        today: today_sessions(appointments, psychologist_id, reference),
        upcoming: upcoming_sessions(appointments, psychologist_id, reference, upcoming_limit),
        completed_count: completed_count(appointments, psychologist_id),
    }
}
