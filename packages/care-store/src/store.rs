//! Armazenamento de registro do dashboard
//!
//! O trait [`DataStore`] descreve tudo que o serviço consome do banco; a
//! implementação [`SqliteStore`] usa o pool SQLite criado em `init_db_pool`.

use async_trait::async_trait;
use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::credentials;
use crate::error::{DbError, DbResult};
use crate::models::{
    Appointment, AppointmentStatus, CareRequest, NewAppointment, NewCareRequest, NewPatient,
    NewUser, Patient, RequestStatus, Role, User,
};

/// Tamanho do token opaco emitido no cadastro
const SESSION_TOKEN_LEN: usize = 48;

/// Normaliza e-mails antes de gravar ou comparar
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Coleções lidas juntas para montar o painel de um psicólogo
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardData {
    pub appointments: Vec<Appointment>,
    pub patients: Vec<Patient>,
    pub requests: Vec<CareRequest>,
}

/// Operações de dados consumidas pelo dashboard
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Lê agendamentos, pacientes e solicitações de um psicólogo.
    ///
    /// Implementações transacionais devem ler as três coleções do mesmo
    /// snapshot, para que um paciente recém-aceito nunca apareça sem a
    /// solicitação correspondente marcada como aceita.
    async fn get_dashboard_data(&self, psychologist_id: Uuid) -> DbResult<DashboardData> {
        let appointments = self
            .get_appointments(psychologist_id, Role::Psychologist)
            .await?;
        let patients = self.get_patients(psychologist_id).await?;
        let requests = self.get_requests(psychologist_id).await?;
        Ok(DashboardData {
            appointments,
            patients,
            requests,
        })
    }

    /// Agendamentos visíveis ao usuário conforme o papel
    async fn get_appointments(&self, user_id: Uuid, role: Role) -> DbResult<Vec<Appointment>>;

    /// Pacientes de um psicólogo
    async fn get_patients(&self, psychologist_id: Uuid) -> DbResult<Vec<Patient>>;

    /// Solicitações endereçadas a um psicólogo, mais recentes primeiro
    async fn get_requests(&self, psychologist_id: Uuid) -> DbResult<Vec<CareRequest>>;

    async fn get_request(&self, request_id: Uuid) -> DbResult<CareRequest>;

    /// Cria paciente; e-mail repetido para o mesmo psicólogo é violação de restrição
    async fn create_patient(&self, patient: NewPatient) -> DbResult<Patient>;

    /// Move uma solicitação `pendente` para um estado final
    async fn update_request_status(
        &self,
        request_id: Uuid,
        status: RequestStatus,
        note: String,
    ) -> DbResult<()>;

    /// Cria o paciente e marca a solicitação como aceita na mesma transação
    async fn accept_request(
        &self,
        request_id: Uuid,
        patient: NewPatient,
        note: String,
    ) -> DbResult<Patient>;

    /// Cadastra usuário e devolve o token de sessão emitido
    async fn register(&self, user: NewUser) -> DbResult<(User, String)>;

    /// Cadastra o usuário paciente e seu registro na carteira do psicólogo
    /// na mesma transação; nenhum dos dois fica gravado sem o outro
    async fn register_patient(
        &self,
        user: NewUser,
        patient: NewPatient,
    ) -> DbResult<(User, String, Patient)>;

    async fn create_request(&self, request: NewCareRequest) -> DbResult<CareRequest>;

    async fn create_appointment(&self, appointment: NewAppointment) -> DbResult<Appointment>;

    /// Avança o agendamento para o próximo status
    async fn advance_appointment(&self, appointment_id: Uuid) -> DbResult<Appointment>;
}

/// Implementação de [`DataStore`] sobre SQLite
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Explica por que uma atualização condicional não afetou nenhuma linha
    async fn request_transition_failure(&self, request_id: Uuid, target: RequestStatus) -> DbError {
        let current: Result<Option<String>, sqlx::Error> =
            sqlx::query_scalar("SELECT status FROM care_requests WHERE id = ?")
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await;

        match current {
            Ok(None) => DbError::NotFound(format!("Solicitação {}", request_id)),
            Ok(Some(status)) => DbError::InvalidTransition(format!(
                "Solicitação {}: {} -> {}",
                request_id, status, target
            )),
            Err(e) => e.into(),
        }
    }
}

/// Insere o paciente na conexão recebida, que pode estar dentro de uma transação
async fn insert_patient(conn: &mut SqliteConnection, patient: &NewPatient) -> DbResult<Patient> {
    let created = sqlx::query_as::<_, Patient>(
        r#"
        INSERT INTO patients (id, name, email, phone, birth_date, age, status, psychologist_id, total_sessions, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&patient.name)
    .bind(normalize_email(&patient.email))
    .bind(&patient.phone)
    .bind(patient.birth_date)
    .bind(patient.age)
    .bind(patient.status.as_str())
    .bind(patient.psychologist_id)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;
    Ok(created)
}

/// Insere o usuário e a sessão emitida; devolve o token em claro
async fn insert_user(conn: &mut SqliteConnection, user: &NewUser) -> DbResult<(User, String)> {
    let password_hash = credentials::hash_password(&user.password)?;
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect();
    let token_hash = format!("{:x}", Sha256::digest(token.as_bytes()));

    let created = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, name, email, role, phone, crp, specialty, password_hash, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id, name, email, role, phone, crp, specialty, created_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user.name.trim())
    .bind(normalize_email(&user.email))
    .bind(user.role.as_str())
    .bind(&user.phone)
    .bind(&user.crp)
    .bind(&user.specialty)
    .bind(&password_hash)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    sqlx::query("INSERT INTO sessions (token_hash, user_id, created_at) VALUES (?, ?, ?)")
        .bind(&token_hash)
        .bind(created.id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok((created, token))
}

#[async_trait]
impl DataStore for SqliteStore {
    async fn get_dashboard_data(&self, psychologist_id: Uuid) -> DbResult<DashboardData> {
        // Uma única transação de leitura garante o mesmo snapshot WAL
        let mut transaction = self.pool.begin().await?;

        let appointments = sqlx::query_as::<_, Appointment>(
            "SELECT * FROM appointments WHERE psychologist_id = ? ORDER BY date, time",
        )
        .bind(psychologist_id)
        .fetch_all(&mut *transaction)
        .await?;

        let patients = sqlx::query_as::<_, Patient>(
            "SELECT * FROM patients WHERE psychologist_id = ? ORDER BY created_at, name",
        )
        .bind(psychologist_id)
        .fetch_all(&mut *transaction)
        .await?;

        let requests = sqlx::query_as::<_, CareRequest>(
            "SELECT * FROM care_requests WHERE preferred_psychologist = ? ORDER BY created_at DESC",
        )
        .bind(psychologist_id)
        .fetch_all(&mut *transaction)
        .await?;

        transaction.commit().await?;

        Ok(DashboardData {
            appointments,
            patients,
            requests,
        })
    }

    async fn get_appointments(&self, user_id: Uuid, role: Role) -> DbResult<Vec<Appointment>> {
        let appointments = match role {
            Role::Psychologist => {
                sqlx::query_as::<_, Appointment>(
                    "SELECT * FROM appointments WHERE psychologist_id = ? ORDER BY date, time",
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
            Role::Patient => {
                sqlx::query_as::<_, Appointment>(
                    r#"
                    SELECT a.* FROM appointments a
                    JOIN patients p ON p.id = a.patient_id
                    JOIN users u ON u.email = p.email
                    WHERE u.id = ?
                    ORDER BY a.date, a.time
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(appointments)
    }

    async fn get_patients(&self, psychologist_id: Uuid) -> DbResult<Vec<Patient>> {
        let patients = sqlx::query_as::<_, Patient>(
            "SELECT * FROM patients WHERE psychologist_id = ? ORDER BY created_at, name",
        )
        .bind(psychologist_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(patients)
    }

    async fn get_requests(&self, psychologist_id: Uuid) -> DbResult<Vec<CareRequest>> {
        let requests = sqlx::query_as::<_, CareRequest>(
            "SELECT * FROM care_requests WHERE preferred_psychologist = ? ORDER BY created_at DESC",
        )
        .bind(psychologist_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn get_request(&self, request_id: Uuid) -> DbResult<CareRequest> {
        sqlx::query_as::<_, CareRequest>("SELECT * FROM care_requests WHERE id = ?")
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Solicitação {}", request_id)))
    }

    async fn create_patient(&self, patient: NewPatient) -> DbResult<Patient> {
        let mut conn = self.pool.acquire().await?;
        let created = insert_patient(&mut *conn, &patient).await?;

        debug!("Paciente {} criado para psicólogo {}", created.id, created.psychologist_id);
        Ok(created)
    }

    async fn update_request_status(
        &self,
        request_id: Uuid,
        status: RequestStatus,
        note: String,
    ) -> DbResult<()> {
        if !RequestStatus::Pending.can_transition_to(status) {
            return Err(DbError::InvalidTransition(format!(
                "Status de destino inválido: {}",
                status
            )));
        }

        let result = sqlx::query(
            r#"
            UPDATE care_requests
            SET status = ?, status_note = ?, updated_at = ?
            WHERE id = ? AND status = 'pendente'
            "#,
        )
        .bind(status.as_str())
        .bind(&note)
        .bind(Utc::now())
        .bind(request_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.request_transition_failure(request_id, status).await);
        }

        info!("Solicitação {} movida para {}", request_id, status);
        Ok(())
    }

    async fn accept_request(
        &self,
        request_id: Uuid,
        patient: NewPatient,
        note: String,
    ) -> DbResult<Patient> {
        let email = normalize_email(&patient.email);
        let mut transaction = self.pool.begin().await?;

        // A escrita vem primeiro para que a transação já segure o lock de escrita
        let updated = sqlx::query(
            r#"
            UPDATE care_requests
            SET status = 'aceito', status_note = ?, updated_at = ?
            WHERE id = ? AND status = 'pendente'
            "#,
        )
        .bind(&note)
        .bind(Utc::now())
        .bind(request_id)
        .execute(&mut *transaction)
        .await?;

        if updated.rows_affected() == 0 {
            drop(transaction);
            return Err(self
                .request_transition_failure(request_id, RequestStatus::Accepted)
                .await);
        }

        let duplicate: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM patients WHERE psychologist_id = ? AND email = ?")
                .bind(patient.psychologist_id)
                .bind(&email)
                .fetch_optional(&mut *transaction)
                .await?;

        if let Some(existing) = duplicate {
            // O drop da transação desfaz a atualização da solicitação
            return Err(DbError::ConstraintViolation(format!(
                "Paciente {} já cadastrado ({})",
                email, existing
            )));
        }

        let created = insert_patient(&mut *transaction, &patient).await?;

        transaction.commit().await?;

        info!(
            "Solicitação {} aceita; paciente {} criado para psicólogo {}",
            request_id, created.id, created.psychologist_id
        );
        Ok(created)
    }

    async fn register(&self, user: NewUser) -> DbResult<(User, String)> {
        let mut transaction = self.pool.begin().await?;
        let (created, token) = insert_user(&mut *transaction, &user).await?;
        transaction.commit().await?;

        info!("Usuário {} cadastrado como {}", created.id, created.role);
        Ok((created, token))
    }

    async fn register_patient(
        &self,
        user: NewUser,
        patient: NewPatient,
    ) -> DbResult<(User, String, Patient)> {
        let mut transaction = self.pool.begin().await?;
        let (created, token) = insert_user(&mut *transaction, &user).await?;
        // Falha aqui desfaz também o usuário
        let record = insert_patient(&mut *transaction, &patient).await?;
        transaction.commit().await?;

        info!(
            "Paciente {} cadastrado com registro {} para psicólogo {}",
            created.id, record.id, record.psychologist_id
        );
        Ok((created, token, record))
    }

    async fn create_request(&self, request: NewCareRequest) -> DbResult<CareRequest> {
        let created = sqlx::query_as::<_, CareRequest>(
            r#"
            INSERT INTO care_requests
                (id, patient_name, patient_email, patient_phone, preferred_psychologist,
                 description, urgency, notes, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'pendente', ?, ?)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(request.patient_name.trim())
        .bind(normalize_email(&request.patient_email))
        .bind(&request.patient_phone)
        .bind(request.preferred_psychologist)
        .bind(&request.description)
        .bind(request.urgency.as_str())
        .bind(&request.notes)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Solicitação {} registrada para psicólogo {}",
            created.id, created.preferred_psychologist
        );
        Ok(created)
    }

    async fn create_appointment(&self, appointment: NewAppointment) -> DbResult<Appointment> {
        let created = sqlx::query_as::<_, Appointment>(
            r#"
            INSERT INTO appointments (id, patient_id, psychologist_id, date, time, description, status)
            VALUES (?, ?, ?, ?, ?, ?, 'agendado')
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(appointment.patient_id)
        .bind(appointment.psychologist_id)
        .bind(appointment.date)
        .bind(appointment.time)
        .bind(&appointment.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn advance_appointment(&self, appointment_id: Uuid) -> DbResult<Appointment> {
        let mut transaction = self.pool.begin().await?;

        let current = sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = ?")
            .bind(appointment_id)
            .fetch_optional(&mut *transaction)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("Agendamento {}", appointment_id)))?;

        let next = current.status.next().ok_or_else(|| {
            DbError::InvalidTransition(format!(
                "Agendamento {} já está {}",
                appointment_id, current.status
            ))
        })?;

        let advanced = sqlx::query_as::<_, Appointment>(
            "UPDATE appointments SET status = ? WHERE id = ? AND status = ? RETURNING *",
        )
        .bind(next.as_str())
        .bind(appointment_id)
        .bind(current.status.as_str())
        .fetch_optional(&mut *transaction)
        .await?
        .ok_or_else(|| {
            DbError::InvalidTransition(format!(
                "Agendamento {} alterado concorrentemente",
                appointment_id
            ))
        })?;

        // Status e contador de sessões mudam juntos
        if advanced.status == AppointmentStatus::Completed {
            sqlx::query("UPDATE patients SET total_sessions = total_sessions + 1 WHERE id = ?")
                .bind(advanced.patient_id)
                .execute(&mut *transaction)
                .await?;
        }

        transaction.commit().await?;

        info!("Agendamento {} movido para {}", appointment_id, advanced.status);
        Ok(advanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PatientStatus, Urgency};
    use crate::test_support::temp_store;
    use anyhow::Result;
    use chrono::{NaiveDate, NaiveTime};

    fn new_patient(psychologist_id: Uuid, email: &str) -> NewPatient {
        NewPatient {
            name: "Ana Souza".to_string(),
            email: email.to_string(),
            phone: "11999990000".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            age: 30,
            status: PatientStatus::Active,
            psychologist_id,
        }
    }

    fn new_request(psychologist_id: Uuid, email: &str) -> NewCareRequest {
        NewCareRequest {
            patient_name: "Ana Souza".to_string(),
            patient_email: email.to_string(),
            patient_phone: "11999990000".to_string(),
            preferred_psychologist: psychologist_id,
            description: "Ansiedade no trabalho".to_string(),
            urgency: Urgency::Medium,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_accept_request_is_atomic() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let psychologist = Uuid::new_v4();
        let request = store.create_request(new_request(psychologist, "a@x.com")).await?;

        let patient = store
            .accept_request(request.id, new_patient(psychologist, "a@x.com"), "ok".into())
            .await?;

        assert_eq!(patient.email, "a@x.com");
        assert_eq!(patient.psychologist_id, psychologist);
        let stored = store.get_request(request.id).await?;
        assert_eq!(stored.status, RequestStatus::Accepted);
        assert_eq!(stored.status_note.as_deref(), Some("ok"));

        Ok(())
    }

    #[tokio::test]
    async fn test_accept_duplicate_rolls_back_status() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let psychologist = Uuid::new_v4();
        store.create_patient(new_patient(psychologist, "A@X.com")).await?;
        let request = store.create_request(new_request(psychologist, "a@x.com")).await?;

        let result = store
            .accept_request(request.id, new_patient(psychologist, "a@x.com"), "ok".into())
            .await;

        assert!(matches!(result, Err(DbError::ConstraintViolation(_))));
        assert_eq!(store.get_request(request.id).await?.status, RequestStatus::Pending);
        assert_eq!(store.get_patients(psychologist).await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_update_status_only_from_pending() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let psychologist = Uuid::new_v4();
        let request = store.create_request(new_request(psychologist, "b@x.com")).await?;

        store
            .update_request_status(request.id, RequestStatus::Rejected, "não".into())
            .await?;
        let again = store
            .update_request_status(request.id, RequestStatus::Accepted, "sim".into())
            .await;

        assert!(matches!(again, Err(DbError::InvalidTransition(_))));
        assert_eq!(store.get_request(request.id).await?.status, RequestStatus::Rejected);

        let missing = store
            .update_request_status(Uuid::new_v4(), RequestStatus::Rejected, "x".into())
            .await;
        assert!(matches!(missing, Err(DbError::NotFound(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_duplicate_patient_email_is_constraint_violation() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let psychologist = Uuid::new_v4();
        store.create_patient(new_patient(psychologist, "c@x.com")).await?;

        let duplicate = store.create_patient(new_patient(psychologist, "c@x.com")).await;
        assert!(matches!(duplicate, Err(DbError::ConstraintViolation(_))));

        // Outro psicólogo pode ter paciente com o mesmo e-mail
        store.create_patient(new_patient(Uuid::new_v4(), "c@x.com")).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_advance_appointment_is_monotonic() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let psychologist = Uuid::new_v4();
        let patient = store.create_patient(new_patient(psychologist, "d@x.com")).await?;
        let appointment = store
            .create_appointment(NewAppointment {
                patient_id: patient.id,
                psychologist_id: psychologist,
                date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                time: NaiveTime::from_hms_opt(14, 0, 0).unwrap(),
                description: "Primeira sessão".to_string(),
            })
            .await?;
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);

        assert_eq!(
            store.advance_appointment(appointment.id).await?.status,
            AppointmentStatus::Started
        );
        assert_eq!(
            store.advance_appointment(appointment.id).await?.status,
            AppointmentStatus::Completed
        );
        assert!(matches!(
            store.advance_appointment(appointment.id).await,
            Err(DbError::InvalidTransition(_))
        ));

        let patients = store.get_patients(psychologist).await?;
        assert_eq!(patients[0].total_sessions, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_advance_rolls_back_status_when_session_count_fails() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let psychologist = Uuid::new_v4();
        let patient = store.create_patient(new_patient(psychologist, "g@x.com")).await?;
        let appointment = store
            .create_appointment(NewAppointment {
                patient_id: patient.id,
                psychologist_id: psychologist,
                date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
                description: String::new(),
            })
            .await?;
        store.advance_appointment(appointment.id).await?;

        sqlx::query(
            r#"
            CREATE TRIGGER block_session_count BEFORE UPDATE OF total_sessions ON patients
            BEGIN SELECT RAISE(ABORT, 'contador bloqueado'); END;
            "#,
        )
        .execute(store.pool())
        .await?;

        assert!(store.advance_appointment(appointment.id).await.is_err());

        let status: String = sqlx::query_scalar("SELECT status FROM appointments WHERE id = ?")
            .bind(appointment.id)
            .fetch_one(store.pool())
            .await?;
        assert_eq!(status, "iniciado");
        assert_eq!(store.get_patients(psychologist).await?[0].total_sessions, 0);

        // Com o contador liberado, a mesma chamada conclui a sessão
        sqlx::query("DROP TRIGGER block_session_count")
            .execute(store.pool())
            .await?;
        assert_eq!(
            store.advance_appointment(appointment.id).await?.status,
            AppointmentStatus::Completed
        );
        assert_eq!(store.get_patients(psychologist).await?[0].total_sessions, 1);

        Ok(())
    }

    #[tokio::test]
    async fn test_register_patient_is_atomic() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let psychologist = Uuid::new_v4();
        store.create_patient(new_patient(psychologist, "h@x.com")).await?;
        let user = NewUser {
            name: "Helio".to_string(),
            email: "H@x.com".to_string(),
            password: "segredo123".to_string(),
            role: Role::Patient,
            phone: None,
            crp: None,
            specialty: None,
        };

        // Registro de paciente duplicado desfaz o usuário
        let conflict = store
            .register_patient(user.clone(), new_patient(psychologist, "h@x.com"))
            .await;
        assert!(matches!(conflict, Err(DbError::ConstraintViolation(_))));
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(store.pool())
            .await?;
        assert_eq!(users, 0);

        // O mesmo e-mail segue livre para outro psicólogo
        let other = Uuid::new_v4();
        let (created, token, record) = store
            .register_patient(user, new_patient(other, "h@x.com"))
            .await?;
        assert_eq!(created.email, "h@x.com");
        assert_eq!(token.len(), SESSION_TOKEN_LEN);
        assert_eq!(record.psychologist_id, other);
        assert_eq!(record.email, created.email);

        Ok(())
    }

    #[tokio::test]
    async fn test_register_issues_token_and_rejects_duplicate_email() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let form = NewUser {
            name: "Dra. Helena".to_string(),
            email: "helena@clinica.com".to_string(),
            password: "segredo123".to_string(),
            role: Role::Psychologist,
            phone: None,
            crp: Some("06/123456".to_string()),
            specialty: Some("TCC".to_string()),
        };

        let (user, token) = store.register(form.clone()).await?;
        assert_eq!(user.role, Role::Psychologist);
        assert_eq!(token.len(), SESSION_TOKEN_LEN);

        let stored_hash: String =
            sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
                .bind(user.id)
                .fetch_one(store.pool())
                .await?;
        assert!(credentials::verify_password("segredo123", &stored_hash)?);

        let duplicate = store.register(form).await;
        assert!(matches!(duplicate, Err(DbError::ConstraintViolation(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_dashboard_data_reads_all_collections() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let psychologist = Uuid::new_v4();
        let request = store.create_request(new_request(psychologist, "e@x.com")).await?;
        store
            .accept_request(request.id, new_patient(psychologist, "e@x.com"), "ok".into())
            .await?;
        store.create_request(new_request(Uuid::new_v4(), "f@x.com")).await?;

        let data = store.get_dashboard_data(psychologist).await?;

        assert_eq!(data.patients.len(), 1);
        assert_eq!(data.requests.len(), 1);
        assert_eq!(data.requests[0].status, RequestStatus::Accepted);
        assert!(data.appointments.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_patient_sees_own_appointments() -> Result<()> {
        let (_dir, store) = temp_store().await?;
        let psychologist = Uuid::new_v4();
        let (user, _) = store
            .register(NewUser {
                name: "Ana Souza".to_string(),
                email: "ana@x.com".to_string(),
                password: "segredo123".to_string(),
                role: Role::Patient,
                phone: None,
                crp: None,
                specialty: None,
            })
            .await?;
        let patient = store.create_patient(new_patient(psychologist, "ana@x.com")).await?;
        store
            .create_appointment(NewAppointment {
                patient_id: patient.id,
                psychologist_id: psychologist,
                date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
                time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                description: String::new(),
            })
            .await?;

        let as_patient = store.get_appointments(user.id, Role::Patient).await?;
        let as_psychologist = store.get_appointments(psychologist, Role::Psychologist).await?;
        assert_eq!(as_patient.len(), 1);
        assert_eq!(as_patient, as_psychologist);

        Ok(())
    }
}
