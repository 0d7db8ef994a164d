use chrono::NaiveDate;
use finflow::config::{AgentSeedConfig, SessionConfig};
use finflow::error::AppError;
use finflow::intake::{
    AgentSeedOutcome, Clock, IdentifierGenerator, InMemoryRecordStore, IntakeService,
    RecordStore, SystemClock,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type InMemoryIntake = IntakeService<InMemoryRecordStore>;

/// Intake service over a fresh process-local store, using wall-clock time.
pub(crate) fn in_memory_intake(sessions: &SessionConfig) -> InMemoryIntake {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(InMemoryRecordStore::new(
        clock.clone(),
        Arc::new(IdentifierGenerator::from_entropy()),
    ));
    IntakeService::new(store, clock, sessions)
}

/// Create the configured agent account unless it already exists.
pub(crate) fn seed_agent<S>(
    service: &IntakeService<S>,
    seed: &AgentSeedConfig,
) -> Result<(), AppError>
where
    S: RecordStore + 'static,
{
    let Some(password) = seed.password.as_deref() else {
        warn!(
            email = %seed.email,
            "no agent password configured; skipping agent seeding"
        );
        return Ok(());
    };

    match service.ensure_agent(&seed.email, &seed.name, password)? {
        AgentSeedOutcome::Created(agent) => {
            info!(agent_id = agent.id, email = %agent.email, "default agent created");
        }
        AgentSeedOutcome::AlreadyPresent => {
            info!(email = %seed.email, "default agent already present");
        }
    }
    Ok(())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeding_without_password_is_skipped() {
        let service = in_memory_intake(&SessionConfig::default());
        let seed = AgentSeedConfig {
            email: "agent@finflow.com".to_string(),
            name: "Default Agent".to_string(),
            password: None,
        };

        seed_agent(&service, &seed).expect("seeding skipped cleanly");
        assert!(service
            .store()
            .agent_by_email("agent@finflow.com")
            .expect("lookup")
            .is_none());
    }

    #[test]
    fn seeding_twice_keeps_one_agent() {
        let service = in_memory_intake(&SessionConfig::default());
        let seed = AgentSeedConfig {
            email: "Agent@FinFlow.com".to_string(),
            name: "Default Agent".to_string(),
            password: Some("admin123".to_string()),
        };

        seed_agent(&service, &seed).expect("first seed");
        seed_agent(&service, &seed).expect("second seed");

        let agent = service
            .store()
            .agent_by_email("agent@finflow.com")
            .expect("lookup")
            .expect("agent present");
        assert_eq!(agent.id, 1);
        assert!(service.login("agent@finflow.com", "admin123").is_ok());
    }

    #[test]
    fn parse_date_reports_bad_input() {
        assert_eq!(
            parse_date(" 1990-05-20 "),
            Ok(NaiveDate::from_ymd_opt(1990, 5, 20).expect("valid"))
        );
        assert!(parse_date("20/05/1990").is_err());
    }
}
