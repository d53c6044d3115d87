//! Métricas do painel do psicólogo
//!
//! As métricas são sempre derivadas das coleções recebidas; nada é guardado
//! entre chamadas.

use care_store::models::{Appointment, CareRequest, Patient, RequestStatus};
use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use crate::classifier;

/// Próxima sessão com o nome do paciente resolvido
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingSession {
    #[serde(flatten)]
    pub appointment: Appointment,
    /// `None` quando o paciente não está na carteira carregada
    pub patient_name: Option<String>,
}

/// Indicadores exibidos no painel
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub total_patients: usize,
    pub today_sessions: Vec<Appointment>,
    pub upcoming_sessions: Vec<UpcomingSession>,
    pub completed_sessions: usize,
    pub pending_requests: usize,
    /// Sem pacientes, agendamentos ou solicitações: painel de boas-vindas
    pub is_new_psychologist: bool,
}

pub fn total_patients(patients: &[Patient], psychologist_id: Uuid) -> usize {
    patients
        .iter()
        .filter(|p| p.psychologist_id == psychologist_id)
        .count()
}

pub fn pending_requests(requests: &[CareRequest], psychologist_id: Uuid) -> usize {
    requests
        .iter()
        .filter(|r| {
            r.status == RequestStatus::Pending && r.preferred_psychologist == psychologist_id
        })
        .count()
}

pub fn is_new_psychologist(
    total_patients: usize,
    appointments: &[Appointment],
    requests: &[CareRequest],
) -> bool {
    total_patients == 0 && appointments.is_empty() && requests.is_empty()
}

/// Compõe as coleções nas métricas do painel sem alterá-las
pub fn aggregate(
    psychologist_id: Uuid,
    appointments: &[Appointment],
    patients: &[Patient],
    requests: &[CareRequest],
    reference: NaiveDateTime,
    upcoming_limit: usize,
) -> DashboardMetrics {
    let partition = classifier::classify(appointments, psychologist_id, reference, upcoming_limit);
    let total_patients = total_patients(patients, psychologist_id);

    let upcoming_sessions = partition
        .upcoming
        .into_iter()
        .map(|appointment| {
            let patient_name = patients
                .iter()
                .find(|p| p.id == appointment.patient_id)
                .map(|p| p.name.clone());
            UpcomingSession {
                appointment,
                patient_name,
            }
        })
        .collect();

    DashboardMetrics {
        total_patients,
        today_sessions: partition.today,
        upcoming_sessions,
        completed_sessions: partition.completed_count,
        pending_requests: pending_requests(requests, psychologist_id),
        is_new_psychologist: is_new_psychologist(total_patients, appointments, requests),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use care_store::models::{AppointmentStatus, PatientStatus, Urgency};
    use chrono::{NaiveDate, NaiveTime, Utc};

    fn patient(psychologist_id: Uuid, name: &str) -> Patient {
        Patient {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@x.com", name.to_lowercase()),
            phone: "11999990000".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            age: 30,
            status: PatientStatus::Active,
            psychologist_id,
            total_sessions: 0,
            created_at: Utc::now(),
        }
    }

    fn request(psychologist_id: Uuid, status: RequestStatus) -> CareRequest {
        CareRequest {
            id: Uuid::new_v4(),
            patient_name: "Bruno".to_string(),
            patient_email: "bruno@x.com".to_string(),
            patient_phone: "11988887777".to_string(),
            preferred_psychologist: psychologist_id,
            description: "Insônia".to_string(),
            urgency: Urgency::Low,
            notes: None,
            status,
            status_note: None,
            created_at: Utc::now(),
        }
    }

    fn appointment(psychologist_id: Uuid, patient_id: Uuid, day: u32) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            patient_id,
            psychologist_id,
            date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            description: "Sessão".to_string(),
            status: AppointmentStatus::Scheduled,
        }
    }

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_new_psychologist_only_when_everything_is_empty() {
        let psy = Uuid::new_v4();

        let empty = aggregate(psy, &[], &[], &[], reference(), 5);
        assert!(empty.is_new_psychologist);

        let with_request = aggregate(
            psy,
            &[],
            &[],
            &[request(psy, RequestStatus::Rejected)],
            reference(),
            5,
        );
        assert!(!with_request.is_new_psychologist);

        let with_patient = aggregate(psy, &[], &[patient(psy, "Ana")], &[], reference(), 5);
        assert!(!with_patient.is_new_psychologist);

        let with_appointment = aggregate(
            psy,
            &[appointment(psy, Uuid::new_v4(), 12)],
            &[],
            &[],
            reference(),
            5,
        );
        assert!(!with_appointment.is_new_psychologist);
    }

    #[test]
    fn test_counts_only_matching_psychologist() {
        let psy = Uuid::new_v4();
        let other = Uuid::new_v4();
        let patients = vec![patient(psy, "Ana"), patient(other, "Caio")];
        let requests = vec![
            request(psy, RequestStatus::Pending),
            request(psy, RequestStatus::Accepted),
            request(other, RequestStatus::Pending),
        ];

        let metrics = aggregate(psy, &[], &patients, &requests, reference(), 5);

        assert_eq!(metrics.total_patients, 1);
        assert_eq!(metrics.pending_requests, 1);
    }

    #[test]
    fn test_upcoming_resolves_patient_names() {
        let psy = Uuid::new_v4();
        let ana = patient(psy, "Ana");
        let appointments = vec![
            appointment(psy, ana.id, 11),
            appointment(psy, Uuid::new_v4(), 12),
        ];

        let metrics = aggregate(psy, &appointments, &[ana], &[], reference(), 5);

        assert_eq!(metrics.upcoming_sessions.len(), 2);
        assert_eq!(metrics.upcoming_sessions[0].patient_name.as_deref(), Some("Ana"));
        assert_eq!(metrics.upcoming_sessions[1].patient_name, None);
    }

    #[test]
    fn test_aggregate_is_deterministic_and_leaves_inputs_untouched() {
        let psy = Uuid::new_v4();
        let patients = vec![patient(psy, "Ana")];
        let appointments = vec![appointment(psy, patients[0].id, 10)];
        let requests = vec![request(psy, RequestStatus::Pending)];
        let before = (appointments.clone(), patients.clone(), requests.clone());

        let first = aggregate(psy, &appointments, &patients, &requests, reference(), 5);
        let second = aggregate(psy, &appointments, &patients, &requests, reference(), 5);

        assert_eq!(first, second);
        assert_eq!((appointments, patients, requests), before);
        assert_eq!(first.today_sessions.len(), 1);
    }
}
