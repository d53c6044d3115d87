//! Atualização periódica do painel
//!
//! Cada painel aberto roda uma tarefa que recarrega agendamentos, pacientes e
//! solicitações ao montar, a cada intervalo e quando o foco volta para a
//! aplicação. O snapshot é sempre substituído por inteiro e o último
//! resultado concluído vence. Uma falha de transporte mantém o snapshot
//! anterior. Depois do encerramento nenhuma recarga dispara e resultados em
//! voo são descartados.

use std::sync::Arc;
use std::time::Duration;

use care_store::models::{Appointment, CareRequest, Patient};
use care_store::{DataStore, DbResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregator::{self, DashboardMetrics};
use crate::lifecycle::AcceptOutcome;

/// Última visão completa das coleções de um psicólogo
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub psychologist_id: Uuid,
    pub appointments: Vec<Appointment>,
    pub patients: Vec<Patient>,
    pub requests: Vec<CareRequest>,
    pub fetched_at: DateTime<Utc>,
}

impl DashboardSnapshot {
    /// Lê as três coleções do armazenamento
    pub async fn fetch(store: &dyn DataStore, psychologist_id: Uuid) -> DbResult<Self> {
        let data = store.get_dashboard_data(psychologist_id).await?;
        Ok(Self {
            psychologist_id,
            appointments: data.appointments,
            patients: data.patients,
            requests: data.requests,
            fetched_at: Utc::now(),
        })
    }

    /// Métricas derivadas a cada leitura
    pub fn metrics(&self, reference: NaiveDateTime, upcoming_limit: usize) -> DashboardMetrics {
        aggregator::aggregate(
            self.psychologist_id,
            &self.appointments,
            &self.patients,
            &self.requests,
            reference,
            upcoming_limit,
        )
    }

    /// Reflete uma aceitação local sem esperar a próxima recarga
    pub fn apply_accepted(&mut self, outcome: &AcceptOutcome) {
        self.replace_request(&outcome.request);
        if !self.patients.iter().any(|p| p.id == outcome.patient.id) {
            self.patients.push(outcome.patient.clone());
        }
    }

    /// Reflete uma rejeição local sem esperar a próxima recarga
    pub fn apply_rejected(&mut self, request: &CareRequest) {
        self.replace_request(request);
    }

    fn replace_request(&mut self, request: &CareRequest) {
        match self.requests.iter_mut().find(|r| r.id == request.id) {
            Some(existing) => *existing = request.clone(),
            None => self.requests.push(request.clone()),
        }
    }
}

/// Snapshot publicado; `None` até a primeira recarga bem-sucedida
pub type SharedSnapshot = Option<Arc<DashboardSnapshot>>;

/// Dispara e publica as recargas de um painel
pub struct RefreshCoordinator {
    store: Arc<dyn DataStore>,
    psychologist_id: Uuid,
    interval: Duration,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn DataStore>, psychologist_id: Uuid, interval: Duration) -> Self {
        Self {
            store,
            psychologist_id,
            interval,
        }
    }

    /// Inicia a tarefa de atualização; a primeira recarga é imediata
    pub fn spawn(self) -> DashboardHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel::<SharedSnapshot>(None);
        let snapshot_tx = Arc::new(snapshot_tx);
        let focus = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let psychologist_id = self.psychologist_id;

        let task = tokio::spawn(self.run(snapshot_tx.clone(), focus.clone(), cancel.clone()));

        DashboardHandle {
            psychologist_id,
            snapshot_tx,
            snapshot_rx,
            focus,
            cancel,
            task: Some(task),
        }
    }

    async fn run(
        self,
        snapshot_tx: Arc<watch::Sender<SharedSnapshot>>,
        focus: Arc<Notify>,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Painel do psicólogo {} aberto", self.psychologist_id);

        loop {
            let trigger = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = focus.notified() => "focus",
                _ = ticker.tick() => "interval",
            };

            debug!("Recarga do painel {} ({})", self.psychologist_id, trigger);

            // Recargas não cancelam as anteriores; aplicam-se na ordem de conclusão
            tokio::spawn(refresh_once(
                self.store.clone(),
                self.psychologist_id,
                snapshot_tx.clone(),
                cancel.clone(),
            ));
        }

        info!("Painel do psicólogo {} encerrado", self.psychologist_id);
    }
}

async fn refresh_once(
    store: Arc<dyn DataStore>,
    psychologist_id: Uuid,
    snapshot_tx: Arc<watch::Sender<SharedSnapshot>>,
    cancel: CancellationToken,
) {
    match DashboardSnapshot::fetch(store.as_ref(), psychologist_id).await {
        Ok(snapshot) => {
            if cancel.is_cancelled() {
                debug!("Painel {} encerrado; recarga descartada", psychologist_id);
                return;
            }
            snapshot_tx.send_replace(Some(Arc::new(snapshot)));
        }
        Err(e) => {
            warn!(
                "Falha ao recarregar painel {}; snapshot anterior mantido: {}",
                psychologist_id, e
            );
        }
    }
}

/// Alça de um painel aberto
pub struct DashboardHandle {
    psychologist_id: Uuid,
    snapshot_tx: Arc<watch::Sender<SharedSnapshot>>,
    snapshot_rx: watch::Receiver<SharedSnapshot>,
    focus: Arc<Notify>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl DashboardHandle {
    /// Último snapshot publicado
    pub fn snapshot(&self) -> SharedSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receptor para acompanhar novas publicações
    pub fn subscribe(&self) -> watch::Receiver<SharedSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Gatilho de foco: agenda uma recarga imediata
    pub fn notify_focus(&self) {
        if !self.cancel.is_cancelled() {
            self.focus.notify_one();
        }
    }

    /// Aplica uma alteração local ao snapshot atual, se houver
    pub fn patch<F>(&self, apply: F)
    where
        F: FnOnce(&mut DashboardSnapshot),
    {
        if self.cancel.is_cancelled() {
            return;
        }
        self.snapshot_tx.send_if_modified(|current| match current {
            Some(snapshot) => {
                apply(Arc::make_mut(snapshot));
                true
            }
            None => false,
        });
    }

    /// Encerra o painel e aguarda o fim da tarefa de atualização
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Tarefa do painel {} terminou com erro: {}", self.psychologist_id, e);
            }
        }
    }
}

impl Drop for DashboardHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
