#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use care_store::models::{
    Appointment, CareRequest, NewAppointment, NewCareRequest, NewPatient, NewUser, Patient,
    RequestStatus, Role, Urgency, User,
};
use care_store::{init_db_pool, DataStore, DbConfig, DbResult, SqliteStore};
use chrono::Utc;
use mockall::mock;
use tempfile::{tempdir, TempDir};
use uuid::Uuid;

mock! {
    pub Store {}

    #[async_trait]
    impl DataStore for Store {
        async fn get_appointments(&self, user_id: Uuid, role: Role) -> DbResult<Vec<Appointment>>;
        async fn get_patients(&self, psychologist_id: Uuid) -> DbResult<Vec<Patient>>;
        async fn get_requests(&self, psychologist_id: Uuid) -> DbResult<Vec<CareRequest>>;
        async fn get_request(&self, request_id: Uuid) -> DbResult<CareRequest>;
        async fn create_patient(&self, patient: NewPatient) -> DbResult<Patient>;
        async fn update_request_status(
            &self,
            request_id: Uuid,
            status: RequestStatus,
            note: String,
        ) -> DbResult<()>;
        async fn accept_request(
            &self,
            request_id: Uuid,
            patient: NewPatient,
            note: String,
        ) -> DbResult<Patient>;
        async fn register(&self, user: NewUser) -> DbResult<(User, String)>;
        async fn register_patient(
            &self,
            user: NewUser,
            patient: NewPatient,
        ) -> DbResult<(User, String, Patient)>;
        async fn create_request(&self, request: NewCareRequest) -> DbResult<CareRequest>;
        async fn create_appointment(&self, appointment: NewAppointment) -> DbResult<Appointment>;
        async fn advance_appointment(&self, appointment_id: Uuid) -> DbResult<Appointment>;
    }
}

/// Store SQLite num diretório temporário
pub async fn temp_store() -> Result<(TempDir, Arc<SqliteStore>)> {
    let temp_dir = tempdir()?;
    let config = DbConfig {
        db_path: temp_dir.path().join("dashboard.db").display().to_string(),
        max_connections: 4,
    };
    let pool = init_db_pool(&config).await?;
    Ok((temp_dir, Arc::new(SqliteStore::new(pool))))
}

pub fn new_request(psychologist_id: Uuid, email: &str) -> NewCareRequest {
    NewCareRequest {
        patient_name: "Ana Souza".to_string(),
        patient_email: email.to_string(),
        patient_phone: "11999990000".to_string(),
        preferred_psychologist: psychologist_id,
        description: "Crises de ansiedade".to_string(),
        urgency: Urgency::High,
        notes: Some("Prefere horários à tarde".to_string()),
    }
}

pub fn pending_request(psychologist_id: Uuid, email: &str) -> CareRequest {
    CareRequest {
        id: Uuid::new_v4(),
        patient_name: "Ana Souza".to_string(),
        patient_email: email.to_string(),
        patient_phone: "11999990000".to_string(),
        preferred_psychologist: psychologist_id,
        description: "Crises de ansiedade".to_string(),
        urgency: Urgency::High,
        notes: None,
        status: RequestStatus::Pending,
        status_note: None,
        created_at: Utc::now(),
    }
}

pub fn user_from(new_user: &NewUser) -> User {
    User {
        id: Uuid::new_v4(),
        name: new_user.name.clone(),
        email: new_user.email.clone(),
        role: new_user.role,
        phone: new_user.phone.clone(),
        crp: new_user.crp.clone(),
        specialty: new_user.specialty.clone(),
        created_at: Utc::now(),
    }
}

pub fn patient_from(new_patient: &NewPatient) -> Patient {
    Patient {
        id: Uuid::new_v4(),
        name: new_patient.name.clone(),
        email: new_patient.email.clone(),
        phone: new_patient.phone.clone(),
        birth_date: new_patient.birth_date,
        age: new_patient.age,
        status: new_patient.status,
        psychologist_id: new_patient.psychologist_id,
        total_sessions: 0,
        created_at: Utc::now(),
    }
}
