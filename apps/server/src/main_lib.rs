use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use goalcoach_ai::{OpenRouterClient, OpenRouterConfig};
use goalcoach_core::coach::{CoachConfig, CoachService, CoachServiceTrait};
use goalcoach_core::goals::{GoalService, GoalServiceTrait};
use goalcoach_storage_sqlite::{
    db, CoachRepository, DbPool, GoalRepository, ProposalRepository,
};

use crate::config::Config;

pub struct AppState {
    pub goal_service: Arc<dyn GoalServiceTrait>,
    pub coach_service: Arc<dyn CoachServiceTrait>,
    pub pool: Arc<DbPool>,
}

pub fn init_tracing() {
    let log_format = std::env::var("GC_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // `try_init` also bridges `log` records from the library crates.
    let result = if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .try_init()
    };
    if let Err(e) = result {
        eprintln!("Tracing already initialized: {e}");
    }
}

fn build_ai(config: &Config) -> Option<OpenRouterClient> {
    let settings = config.openrouter.as_ref()?;
    let mut ai_config = OpenRouterConfig::new(settings.api_key.clone());
    ai_config.model = settings.model.clone();
    ai_config.base_url = settings.base_url.clone();
    ai_config.client_origin = config.client_origin.clone();
    match OpenRouterClient::new(ai_config) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::warn!("OpenRouter disabled: {}", e);
            None
        }
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer(&pool)?;

    let goal_repository = Arc::new(GoalRepository::new(pool.clone(), writer.clone()));
    let coach_repository = Arc::new(CoachRepository::new(pool.clone(), writer.clone()));
    let proposal_repository = Arc::new(ProposalRepository::new(pool.clone(), writer));

    let goal_service = Arc::new(GoalService::new(goal_repository.clone()));

    let coach_config = CoachConfig {
        summary_ttl_hours: config.coach_cache_ttl_hours,
        proposal_ttl_minutes: config.proposal_ttl_minutes,
    };
    let mut coach_service = CoachService::new(
        goal_repository,
        coach_repository,
        proposal_repository,
        coach_config,
    );
    match build_ai(config) {
        Some(ai) => {
            tracing::info!("Coach prose enabled via OpenRouter");
            coach_service = coach_service.with_ai(Arc::new(ai));
        }
        None => tracing::info!("No OpenRouter key configured, coach runs rules-only"),
    }

    Ok(Arc::new(AppState {
        goal_service,
        coach_service: Arc::new(coach_service),
        pool,
    }))
}
