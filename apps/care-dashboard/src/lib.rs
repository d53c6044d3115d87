//! Care Dashboard - Coordenação de solicitações e agendamentos do psicólogo
//!
//! Este crate fornece:
//! - O ciclo de vida das solicitações de atendimento (`lifecycle`)
//! - A classificação temporal dos agendamentos (`classifier`)
//! - As métricas do painel (`aggregator`)
//! - A atualização periódica dos painéis abertos (`refresh`, `sessions`)
//! - A superfície HTTP (`routes`)

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod error;
pub mod intake;
pub mod lifecycle;
pub mod refresh;
pub mod routes;
pub mod sessions;
pub mod telemetry;

pub use error::IntakeError;

/// Informações geradas no build
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}
