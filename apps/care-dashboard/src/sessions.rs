//! Painéis abertos e intenções do psicólogo
//!
//! Mantém um [`DashboardHandle`] por psicólogo com painel aberto e expõe as
//! duas intenções do painel: aceitar e rejeitar solicitações. O resultado de
//! uma intenção bem-sucedida é refletido no snapshot do painel imediatamente.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use care_store::models::CareRequest;
use care_store::DataStore;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::aggregator::DashboardMetrics;
use crate::classifier::local_reference;
use crate::config::DashboardConfig;
use crate::error::IntakeError;
use crate::lifecycle::{AcceptOutcome, RequestLifecycle};
use crate::refresh::{DashboardHandle, DashboardSnapshot, RefreshCoordinator};

/// Visão somente leitura entregue à apresentação
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    #[serde(flatten)]
    pub snapshot: DashboardSnapshot,
    pub metrics: DashboardMetrics,
}

/// Registro de painéis abertos
pub struct DashboardSessions {
    store: Arc<dyn DataStore>,
    lifecycle: Arc<RequestLifecycle>,
    config: DashboardConfig,
    handles: Mutex<HashMap<Uuid, DashboardHandle>>,
}

impl DashboardSessions {
    pub fn new(
        store: Arc<dyn DataStore>,
        lifecycle: Arc<RequestLifecycle>,
        config: DashboardConfig,
    ) -> Self {
        Self {
            store,
            lifecycle,
            config,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn lifecycle(&self) -> &Arc<RequestLifecycle> {
        &self.lifecycle
    }

    /// Abre o painel do psicólogo; reabrir um painel ativo não faz nada
    pub fn open(&self, psychologist_id: Uuid) {
        let mut handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        handles.entry(psychologist_id).or_insert_with(|| {
            RefreshCoordinator::new(
                self.store.clone(),
                psychologist_id,
                self.config.refresh_interval,
            )
            .spawn()
        });
    }

    /// Visão atual com métricas recalculadas agora; `None` antes da primeira recarga
    pub fn view(&self, psychologist_id: Uuid) -> Result<Option<DashboardView>, IntakeError> {
        let snapshot = {
            let handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
            let handle = handles.get(&psychologist_id).ok_or_else(|| {
                IntakeError::NotFound(format!("Painel do psicólogo {}", psychologist_id))
            })?;
            handle.snapshot()
        };

        let reference = local_reference(Utc::now(), self.config.timezone);
        Ok(snapshot.map(|snapshot| DashboardView {
            metrics: snapshot.metrics(reference, self.config.upcoming_limit),
            snapshot: snapshot.as_ref().clone(),
        }))
    }

    /// Gatilho de foco do painel
    pub fn focus(&self, psychologist_id: Uuid) -> Result<(), IntakeError> {
        let handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        let handle = handles.get(&psychologist_id).ok_or_else(|| {
            IntakeError::NotFound(format!("Painel do psicólogo {}", psychologist_id))
        })?;
        handle.notify_focus();
        Ok(())
    }

    /// Encerra o painel; devolve `false` se não estava aberto
    pub async fn close(&self, psychologist_id: Uuid) -> bool {
        let handle = self
            .handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&psychologist_id);
        match handle {
            Some(handle) => {
                handle.shutdown().await;
                true
            }
            None => false,
        }
    }

    /// Encerra todos os painéis abertos
    pub async fn close_all(&self) {
        let handles: Vec<DashboardHandle> = self
            .handles
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        for handle in handles {
            handle.shutdown().await;
        }
    }

    /// Intenção de aceitar uma solicitação
    pub async fn accept_request(
        &self,
        psychologist_id: Uuid,
        request_id: Uuid,
    ) -> Result<AcceptOutcome, IntakeError> {
        let outcome = self.lifecycle.accept(psychologist_id, request_id).await?;
        self.patch(psychologist_id, |snapshot| snapshot.apply_accepted(&outcome));
        Ok(outcome)
    }

    /// Intenção de rejeitar uma solicitação
    pub async fn reject_request(
        &self,
        psychologist_id: Uuid,
        request_id: Uuid,
    ) -> Result<CareRequest, IntakeError> {
        let rejected = self.lifecycle.reject(psychologist_id, request_id).await?;
        self.patch(psychologist_id, |snapshot| snapshot.apply_rejected(&rejected));
        Ok(rejected)
    }

    fn patch<F>(&self, psychologist_id: Uuid, apply: F)
    where
        F: FnOnce(&mut DashboardSnapshot),
    {
        let handles = self.handles.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = handles.get(&psychologist_id) {
            handle.patch(apply);
        }
    }
}
