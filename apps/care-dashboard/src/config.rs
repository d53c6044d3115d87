//! Configuração do serviço
//!
//! Valores padrão seguem o comportamento do painel; cada um pode ser
//! sobrescrito por variável de ambiente `CARE_*`.

use anyhow::{Context, Result};
use care_store::DbConfig;
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Valores usados ao materializar um paciente a partir de uma solicitação
#[derive(Debug, Clone)]
pub struct IntakeDefaults {
    /// Data de nascimento assumida quando a solicitação não a informa
    pub birth_date: NaiveDate,
    /// Idade assumida quando a solicitação não a informa
    pub age: i32,
    /// Nota de auditoria gravada ao aceitar
    pub accept_note: String,
    /// Nota de auditoria gravada ao rejeitar
    pub reject_note: String,
}

impl Default for IntakeDefaults {
    fn default() -> Self {
        Self {
            birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or_default(),
            age: 30,
            accept_note: "Paciente aceito e cadastrado no sistema".to_string(),
            reject_note: "Solicitação rejeitada pelo psicólogo".to_string(),
        }
    }
}

/// Configuração do painel do psicólogo
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Intervalo entre atualizações periódicas
    pub refresh_interval: Duration,
    /// Fuso horário da clínica; define o que é "hoje"
    pub timezone: Tz,
    /// Quantidade máxima de próximas sessões exibidas
    pub upcoming_limit: usize,
    pub intake: IntakeDefaults,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
            timezone: chrono_tz::America::Sao_Paulo,
            upcoming_limit: 5,
            intake: IntakeDefaults::default(),
        }
    }
}

/// Formato das linhas de log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("Formato de log desconhecido: {}", other),
        }
    }
}

/// Configuração completa do processo
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    /// Limite de requisições HTTP simultâneas
    pub max_concurrent_requests: usize,
    pub log_format: LogFormat,
    pub db: DbConfig,
    pub dashboard: DashboardConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            max_concurrent_requests: 256,
            log_format: LogFormat::Text,
            db: DbConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Carrega a configuração a partir do ambiente do processo
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Carrega a configuração a partir de uma função de consulta
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("CARE_BIND_ADDR") {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("CARE_BIND_ADDR inválido: {}", addr))?;
        }
        if let Some(limit) = lookup("CARE_MAX_CONCURRENCY") {
            config.max_concurrent_requests = limit
                .parse()
                .with_context(|| format!("CARE_MAX_CONCURRENCY inválido: {}", limit))?;
            anyhow::ensure!(
                config.max_concurrent_requests > 0,
                "CARE_MAX_CONCURRENCY deve ser positivo"
            );
        }
        if let Some(format) = lookup("CARE_LOG_FORMAT") {
            config.log_format = format.parse()?;
        }
        if let Some(path) = lookup("CARE_DB_PATH") {
            config.db.db_path = path;
        }
        if let Some(max) = lookup("CARE_DB_MAX_CONNECTIONS") {
            config.db.max_connections = max
                .parse()
                .with_context(|| format!("CARE_DB_MAX_CONNECTIONS inválido: {}", max))?;
        }
        if let Some(secs) = lookup("CARE_REFRESH_INTERVAL_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("CARE_REFRESH_INTERVAL_SECS inválido: {}", secs))?;
            anyhow::ensure!(secs > 0, "CARE_REFRESH_INTERVAL_SECS deve ser positivo");
            config.dashboard.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(tz) = lookup("CARE_TIMEZONE") {
            config.dashboard.timezone = tz
                .parse()
                .map_err(|e| anyhow::anyhow!("CARE_TIMEZONE inválido ({}): {}", tz, e))?;
        }

        Ok(config)
    }
}
