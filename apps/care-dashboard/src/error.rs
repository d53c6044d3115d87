//! Erros do dashboard
//!
//! Todos os erros são recuperáveis na fronteira da operação; nenhum derruba o
//! processo.

use care_store::DbError;
use thiserror::Error;
use uuid::Uuid;

/// Falhas das operações de solicitação, cadastro e agendamento
#[derive(Error, Debug)]
pub enum IntakeError {
    #[error("Este paciente já está cadastrado em sua lista: {email}")]
    DuplicatePatient { email: String },

    #[error("Transição de estado inválida: {0}")]
    InvalidStateTransition(String),

    #[error("Solicitação {0} já está sendo processada")]
    OperationInProgress(Uuid),

    #[error("Registro não encontrado: {0}")]
    NotFound(String),

    #[error("Dados inválidos: {0}")]
    Validation(String),

    #[error("Falha ao acessar o armazenamento: {0}")]
    Transport(#[source] DbError),
}

impl IntakeError {
    /// Avisos exibidos ao usuário; a solicitação permanece inalterada
    pub fn is_notice(&self) -> bool {
        matches!(
            self,
            IntakeError::DuplicatePatient { .. }
                | IntakeError::InvalidStateTransition(_)
                | IntakeError::OperationInProgress(_)
        )
    }

    /// Identificador estável do tipo de erro, usado no corpo das respostas
    pub fn kind(&self) -> &'static str {
        match self {
            IntakeError::DuplicatePatient { .. } => "duplicate_patient",
            IntakeError::InvalidStateTransition(_) => "invalid_state_transition",
            IntakeError::OperationInProgress(_) => "operation_in_progress",
            IntakeError::NotFound(_) => "not_found",
            IntakeError::Validation(_) => "validation_failure",
            IntakeError::Transport(_) => "transport_failure",
        }
    }
}

impl From<DbError> for IntakeError {
    fn from(error: DbError) -> Self {
        match error {
            DbError::NotFound(what) => IntakeError::NotFound(what),
            DbError::InvalidTransition(msg) => IntakeError::InvalidStateTransition(msg),
            DbError::ConstraintViolation(msg) => {
                IntakeError::Validation(format!("Registro já existente: {}", msg))
            }
            other => IntakeError::Transport(other),
        }
    }
}

impl From<validator::ValidationErrors> for IntakeError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let detail = errs
                    .first()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    })
                    .unwrap_or_default();
                format!("{}: {}", field, detail)
            })
            .collect();
        fields.sort();
        IntakeError::Validation(fields.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        assert!(matches!(
            IntakeError::from(DbError::InvalidTransition("x".into())),
            IntakeError::InvalidStateTransition(_)
        ));
        assert!(matches!(
            IntakeError::from(DbError::NotFound("x".into())),
            IntakeError::NotFound(_)
        ));
        assert!(matches!(
            IntakeError::from(DbError::ConnectionError("down".into())),
            IntakeError::Transport(_)
        ));
    }

    #[test]
    fn test_notices_are_the_recoverable_user_facing_kinds() {
        assert!(IntakeError::OperationInProgress(Uuid::new_v4()).is_notice());
        assert!(IntakeError::DuplicatePatient { email: "a@x.com".into() }.is_notice());
        assert!(!IntakeError::Transport(DbError::ConnectionError("down".into())).is_notice());
    }
}
