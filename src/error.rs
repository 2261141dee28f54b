use thiserror::Error;

use crate::seed::SeedPhase;

/// Failures surfaced by the seeding pipeline.
///
/// Sessions classify raw driver errors into these variants so the
/// orchestrator can decide per phase whether to skip a row or abort.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("connectivity failure: {0}")]
    Connectivity(String),
    #[error("constraint violation on {table}: {message}")]
    Constraint { table: String, message: String },
    #[error("transaction failure: {0}")]
    Transaction(String),
    #[error("invalid sampling weights: {0}")]
    Sampling(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("phase {phase} aborted: {source}")]
    PhaseAborted {
        phase: SeedPhase,
        #[source]
        source: Box<SeedError>,
    },
}

impl SeedError {
    pub fn constraint(table: &str, message: impl Into<String>) -> Self {
        Self::Constraint {
            table: table.to_string(),
            message: message.into(),
        }
    }

    /// Classify a driver error raised while writing to `table`.
    pub fn from_sqlx(table: &str, err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => {
                // SQLSTATE class 23 = integrity constraint violation
                let is_integrity = db.code().map(|c| c.starts_with("23")).unwrap_or(false);
                if is_integrity {
                    Self::constraint(table, db.message())
                } else {
                    Self::Transaction(db.message().to_string())
                }
            }
            sqlx::Error::Io(e) => Self::Connectivity(e.to_string()),
            sqlx::Error::Tls(e) => Self::Connectivity(e.to_string()),
            sqlx::Error::PoolTimedOut => Self::Connectivity("connection pool timed out".into()),
            sqlx::Error::PoolClosed => Self::Connectivity("connection pool closed".into()),
            other => Self::Transaction(other.to_string()),
        }
    }

    /// The phase-level failure wrapped by the orchestrator, if any.
    pub fn phase(&self) -> Option<SeedPhase> {
        match self {
            Self::PhaseAborted { phase, .. } => Some(*phase),
            _ => None,
        }
    }

    pub fn is_constraint(&self) -> bool {
        match self {
            Self::Constraint { .. } => true,
            Self::PhaseAborted { source, .. } => source.is_constraint(),
            _ => false,
        }
    }
}
