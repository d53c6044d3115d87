//! Formulários de entrada: cadastro de usuários e envio de solicitações

use care_store::models::{
    NewCareRequest, NewPatient, NewUser, Patient, PatientStatus, Role, Urgency, User,
};
use care_store::{normalize_email, DataStore, DbError};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::IntakeDefaults;
use crate::error::IntakeError;

/// Formulário de cadastro
#[derive(Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterForm {
    #[validate(length(min = 1, message = "Nome obrigatório"))]
    pub name: String,
    #[validate(email(message = "E-mail inválido"))]
    pub email: String,
    #[validate(length(min = 6, message = "Senha deve ter ao menos 6 caracteres"))]
    pub password: String,
    #[validate(must_match = "password")]
    pub confirm_password: String,
    pub role: Role,
    pub phone: Option<String>,
    pub birth_date: Option<NaiveDate>,
    /// Registro profissional, obrigatório para psicólogos
    pub crp: Option<String>,
    pub specialty: Option<String>,
    /// Psicólogo escolhido pelo paciente no cadastro
    pub psychologist_id: Option<Uuid>,
}

impl RegisterForm {
    fn check(&self) -> Result<(), IntakeError> {
        self.validate()?;
        if self.name.trim().is_empty() {
            return Err(IntakeError::Validation("name: Nome obrigatório".to_string()));
        }
        if self.role == Role::Psychologist
            && self.crp.as_deref().map_or(true, |crp| crp.trim().is_empty())
        {
            return Err(IntakeError::Validation(
                "crp: Registro profissional obrigatório para psicólogos".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resultado do cadastro
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub user: User,
    pub token: String,
    /// Registro de paciente criado junto ao cadastro, quando houver psicólogo escolhido
    pub patient: Option<Patient>,
}

/// Idade completa em `today` para quem nasceu em `birth_date`
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age.max(0)
}

/// Cadastra o usuário e, para pacientes com psicólogo escolhido, o registro de paciente
pub async fn register(
    store: &dyn DataStore,
    defaults: &IntakeDefaults,
    form: RegisterForm,
    today: NaiveDate,
) -> Result<Registration, IntakeError> {
    form.check()?;

    let email = normalize_email(&form.email);
    let owner = match (form.role, form.psychologist_id) {
        (Role::Patient, Some(psychologist_id)) => Some(psychologist_id),
        _ => None,
    };

    if let Some(psychologist_id) = owner {
        let existing = store.get_patients(psychologist_id).await?;
        if existing.iter().any(|p| normalize_email(&p.email) == email) {
            warn!("Cadastro de {} recusado: paciente já existe", email);
            return Err(IntakeError::DuplicatePatient { email });
        }
    }

    let new_user = NewUser {
        name: form.name.trim().to_string(),
        email: email.clone(),
        password: form.password.clone(),
        role: form.role,
        phone: form.phone.clone(),
        crp: form.crp.clone(),
        specialty: form.specialty.clone(),
    };

    let (user, token, patient) = match owner {
        Some(psychologist_id) => {
            let (birth_date, age) = match form.birth_date {
                Some(birth_date) => (birth_date, age_on(birth_date, today)),
                None => (defaults.birth_date, defaults.age),
            };
            let new_patient = NewPatient {
                name: new_user.name.clone(),
                email: email.clone(),
                phone: form.phone.clone().unwrap_or_default(),
                birth_date,
                age,
                status: PatientStatus::Active,
                psychologist_id,
            };
            // Usuário e paciente são gravados juntos ou nenhum dos dois
            let (user, token, patient) = store
                .register_patient(new_user, new_patient)
                .await
                .map_err(|e| match e {
                    DbError::ConstraintViolation(msg) if msg.contains("patients") => {
                        IntakeError::DuplicatePatient {
                            email: email.clone(),
                        }
                    }
                    other => IntakeError::from(other),
                })?;
            (user, token, Some(patient))
        }
        None => {
            let (user, token) = store.register(new_user).await?;
            (user, token, None)
        }
    };

    info!("Cadastro concluído para {} ({})", user.id, user.role);
    Ok(Registration {
        user,
        token,
        patient,
    })
}

/// Formulário de solicitação de atendimento
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CareRequestForm {
    #[validate(length(min = 1, message = "Nome obrigatório"))]
    pub patient_name: String,
    #[validate(email(message = "E-mail inválido"))]
    pub patient_email: String,
    #[validate(length(min = 1, message = "Telefone obrigatório"))]
    pub patient_phone: String,
    pub preferred_psychologist: Uuid,
    #[validate(length(min = 1, message = "Descrição obrigatória"))]
    pub description: String,
    pub urgency: Urgency,
    pub notes: Option<String>,
}

/// Registra uma solicitação `pendente` para o psicólogo escolhido
pub async fn submit_request(
    store: &dyn DataStore,
    form: CareRequestForm,
) -> Result<care_store::models::CareRequest, IntakeError> {
    form.validate()?;
    if form.description.trim().is_empty() {
        return Err(IntakeError::Validation(
            "description: Descrição obrigatória".to_string(),
        ));
    }

    let created = store
        .create_request(NewCareRequest {
            patient_name: form.patient_name,
            patient_email: form.patient_email,
            patient_phone: form.patient_phone,
            preferred_psychologist: form.preferred_psychologist,
            description: form.description,
            urgency: form.urgency,
            notes: form.notes.filter(|n| !n.trim().is_empty()),
        })
        .await?;
    Ok(created)
}
