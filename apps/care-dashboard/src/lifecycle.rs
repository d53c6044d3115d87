//! Ciclo de vida das solicitações de atendimento
//!
//! Uma solicitação nasce `pendente` e termina `aceito` ou `rejeitado`. Aceitar
//! materializa o paciente na carteira do psicólogo na mesma transação que
//! finaliza a solicitação. Operações sobre o mesmo identificador são
//! single-flight: uma segunda chamada enquanto a primeira está em andamento
//! falha com [`IntakeError::OperationInProgress`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use care_store::models::{CareRequest, NewPatient, Patient, PatientStatus, RequestStatus};
use care_store::{normalize_email, DataStore, DbError};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::IntakeDefaults;
use crate::error::IntakeError;

/// Tabela de identificadores em processamento.
///
/// Cada entrada guarda o token de quem a adquiriu; a liberação acontece no
/// `Drop` do [`InFlightGuard`], em qualquer caminho de saída.
#[derive(Debug, Default)]
pub struct InFlight {
    entries: Mutex<HashMap<Uuid, u64>>,
    next_token: AtomicU64,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marca o identificador como em processamento
    pub fn try_acquire(&self, id: Uuid) -> Result<InFlightGuard<'_>, IntakeError> {
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.contains_key(&id) {
            return Err(IntakeError::OperationInProgress(id));
        }
        entries.insert(id, token);
        Ok(InFlightGuard {
            table: self,
            id,
            token,
        })
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn release(&self, id: &Uuid, token: u64) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if entries.get(id) == Some(&token) {
            entries.remove(id);
        }
    }
}

/// Posse de um identificador na [`InFlight`]
#[derive(Debug)]
pub struct InFlightGuard<'a> {
    table: &'a InFlight,
    id: Uuid,
    token: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.table.release(&self.id, self.token);
    }
}

/// Resultado de uma aceitação: a solicitação finalizada e o paciente criado
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptOutcome {
    pub request: CareRequest,
    pub patient: Patient,
}

/// Motor de transições das solicitações
pub struct RequestLifecycle {
    store: Arc<dyn DataStore>,
    defaults: IntakeDefaults,
    in_flight: InFlight,
}

impl RequestLifecycle {
    pub fn new(store: Arc<dyn DataStore>, defaults: IntakeDefaults) -> Self {
        Self {
            store,
            defaults,
            in_flight: InFlight::new(),
        }
    }

    /// Indica se a solicitação está sendo aceita ou rejeitada agora
    pub fn is_processing(&self, request_id: &Uuid) -> bool {
        self.in_flight.contains(request_id)
    }

    /// Solicitações pendentes endereçadas ao psicólogo
    pub async fn pending_requests(
        &self,
        psychologist_id: Uuid,
    ) -> Result<Vec<CareRequest>, IntakeError> {
        let requests = self.store.get_requests(psychologist_id).await?;
        Ok(requests
            .into_iter()
            .filter(|r| !r.status.is_terminal())
            .collect())
    }

    /// Aceita a solicitação e cria o paciente correspondente
    pub async fn accept(
        &self,
        psychologist_id: Uuid,
        request_id: Uuid,
    ) -> Result<AcceptOutcome, IntakeError> {
        let _guard = self.in_flight.try_acquire(request_id).map_err(|e| {
            warn!("Solicitação {} já em processamento", request_id);
            e
        })?;

        let request = self
            .load_pending(psychologist_id, request_id, RequestStatus::Accepted)
            .await?;
        validate_request(&request)?;

        let email = normalize_email(&request.patient_email);
        let existing = self.store.get_patients(psychologist_id).await?;
        if existing.iter().any(|p| normalize_email(&p.email) == email) {
            warn!(
                "Paciente {} já cadastrado para psicólogo {}; solicitação {} mantida pendente",
                email, psychologist_id, request_id
            );
            return Err(IntakeError::DuplicatePatient { email });
        }

        let new_patient = NewPatient {
            name: request.patient_name.clone(),
            email: email.clone(),
            phone: request.patient_phone.clone(),
            birth_date: self.defaults.birth_date,
            age: self.defaults.age,
            status: PatientStatus::Active,
            psychologist_id,
        };

        let note = self.defaults.accept_note.clone();
        let patient = self
            .store
            .accept_request(request_id, new_patient, note.clone())
            .await
            .map_err(|e| match e {
                DbError::ConstraintViolation(_) => IntakeError::DuplicatePatient {
                    email: email.clone(),
                },
                other => IntakeError::from(other),
            })?;

        info!(
            "Solicitação {} aceita por {}; paciente {} criado",
            request_id, psychologist_id, patient.id
        );

        Ok(AcceptOutcome {
            request: CareRequest {
                status: RequestStatus::Accepted,
                status_note: Some(note),
                ..request
            },
            patient,
        })
    }

    /// Rejeita a solicitação; nenhum paciente é criado
    pub async fn reject(
        &self,
        psychologist_id: Uuid,
        request_id: Uuid,
    ) -> Result<CareRequest, IntakeError> {
        let _guard = self.in_flight.try_acquire(request_id).map_err(|e| {
            warn!("Solicitação {} já em processamento", request_id);
            e
        })?;

        let request = self
            .load_pending(psychologist_id, request_id, RequestStatus::Rejected)
            .await?;

        let note = self.defaults.reject_note.clone();
        self.store
            .update_request_status(request_id, RequestStatus::Rejected, note.clone())
            .await?;

        info!("Solicitação {} rejeitada por {}", request_id, psychologist_id);

        Ok(CareRequest {
            status: RequestStatus::Rejected,
            status_note: Some(note),
            ..request
        })
    }

    /// Carrega a solicitação e confere dono e estado antes de qualquer mutação
    async fn load_pending(
        &self,
        psychologist_id: Uuid,
        request_id: Uuid,
        target: RequestStatus,
    ) -> Result<CareRequest, IntakeError> {
        let request = self.store.get_request(request_id).await?;

        if request.preferred_psychologist != psychologist_id {
            return Err(IntakeError::NotFound(format!("Solicitação {}", request_id)));
        }

        if !request.status.can_transition_to(target) {
            warn!(
                "Solicitação {} já está {}; transição para {} recusada",
                request_id, request.status, target
            );
            return Err(IntakeError::InvalidStateTransition(format!(
                "Solicitação {}: {} -> {}",
                request_id, request.status, target
            )));
        }

        Ok(request)
    }
}

/// Campos obrigatórios para materializar um paciente
fn validate_request(request: &CareRequest) -> Result<(), IntakeError> {
    if request.patient_name.trim().is_empty() {
        return Err(IntakeError::Validation(
            "Nome do paciente ausente na solicitação".to_string(),
        ));
    }
    if !validator::validate_email(request.patient_email.trim()) {
        return Err(IntakeError::Validation(format!(
            "E-mail inválido na solicitação: {}",
            request.patient_email
        )));
    }
    Ok(())
}
