use anyhow::{Context, Result};
use booking_engine::{BookingConfig, BookingEngine, Clock, SystemClock};
use config_engine::{MediConnectConfig, NluBackendKind, SessionStoreKind};
use dialogue_engine::{
    InMemorySessionStore, LlmNluBackend, NluBackend, NluConfig, NluEngine, RedisSessionStore,
    RuleBasedNlu, SessionStore,
};
use schedule_store::{
    DatabasePool, InMemoryScheduleRepository, Language, PostgresScheduleRepository,
    ScheduleRepository,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use voice_recognition_service::{Transcriber, VoiceConfig, VoiceService};

use crate::telephony::{CallbackUrls, ExotelClient};

/// Main MediConnect server state, shared by every handler
#[derive(Clone)]
pub struct MediConnectServer {
    pub config: Arc<MediConnectConfig>,
    pub repository: Arc<dyn ScheduleRepository>,
    pub clock: Arc<dyn Clock>,
    pub booking: BookingEngine,
    pub nlu: NluEngine,
    pub sessions: Arc<dyn SessionStore>,
    pub transcriber: Arc<dyn Transcriber>,
    /// Present only when telephony credentials allow outbound calls
    pub outbound: Option<Arc<ExotelClient>>,
    pub callbacks: CallbackUrls,
    pub started_at: Instant,
}

/// Externally built parts, for tests and embedders
pub struct ServerComponents {
    pub repository: Arc<dyn ScheduleRepository>,
    pub clock: Arc<dyn Clock>,
    /// Rule-based backend over the booking engine when `None`
    pub backend: Option<Arc<dyn NluBackend>>,
    pub sessions: Arc<dyn SessionStore>,
    pub transcriber: Arc<dyn Transcriber>,
}

impl MediConnectServer {
    /// Build every component from configuration
    pub async fn from_config(config: MediConnectConfig) -> Result<Self> {
        let repository: Arc<dyn ScheduleRepository> = match &config.database.url {
            Some(url) => {
                let db = DatabasePool::new(url, config.database.max_connections)
                    .await
                    .context("connecting to the schedule database")?;
                if config.database.run_migrations {
                    db.migrate().await.context("running schedule migrations")?;
                }
                info!("📦 Schedule store: PostgreSQL");
                Arc::new(PostgresScheduleRepository::new(db))
            }
            None => {
                warn!("📦 Schedule store: in-memory (data is lost on restart)");
                Arc::new(InMemoryScheduleRepository::new())
            }
        };

        let clock: Arc<dyn Clock> =
            Arc::new(SystemClock::new(config.booking.clinic_utc_offset_minutes));

        let backend: Option<Arc<dyn NluBackend>> = match config.nlu.backend {
            NluBackendKind::Openai => Some(Arc::new(
                LlmNluBackend::from_settings(&config.nlu).context("configuring the NLU backend")?,
            )),
            NluBackendKind::Rules => None,
        };

        let sessions: Arc<dyn SessionStore> = match config.dialogue.store {
            SessionStoreKind::Memory => Arc::new(InMemorySessionStore::new()),
            SessionStoreKind::Redis => {
                let url = config
                    .dialogue
                    .redis_url
                    .as_deref()
                    .context("dialogue.redis_url is required for the redis session store")?;
                let ttl = Duration::from_secs(config.dialogue.session_ttl_secs);
                Arc::new(
                    RedisSessionStore::connect(url, ttl)
                        .await
                        .context("connecting to the session cache")?,
                )
            }
        };

        let voice_config = VoiceConfig::from_settings(&config.speech, &config.telephony)
            .context("configuring speech recognition")?;
        let transcriber: Arc<dyn Transcriber> =
            Arc::new(VoiceService::new(voice_config).context("starting speech recognition")?);

        let mut server = Self::assemble(
            config,
            ServerComponents {
                repository,
                clock,
                backend,
                sessions,
                transcriber,
            },
        );

        if server.config.telephony.outbound_enabled() {
            match ExotelClient::from_settings(&server.config.telephony) {
                Ok(client) => server.outbound = Some(Arc::new(client)),
                Err(e) => warn!(error = %e, "Outbound reminders disabled"),
            }
        }

        Ok(server)
    }

    /// Wire the booking and NLU engines over prebuilt components
    pub fn assemble(config: MediConnectConfig, parts: ServerComponents) -> Self {
        let booking = BookingEngine::new(
            parts.repository.clone(),
            parts.clock.clone(),
            BookingConfig::from(&config.booking),
        );

        let backend = parts.backend.unwrap_or_else(|| {
            Arc::new(
                RuleBasedNlu::new()
                    .with_availability(Arc::new(booking.clone()))
                    .with_slot_minutes(config.booking.slot_minutes)
                    .with_max_offers(config.booking.max_alternatives),
            )
        });
        let nlu = NluEngine::new(backend, parts.clock.clone(), NluConfig::from(&config.nlu));

        info!(
            nlu_backend = nlu.backend_name(),
            session_store = parts.sessions.backend_name(),
            "Call pipeline assembled"
        );

        Self {
            callbacks: CallbackUrls::new(&config.server.public_base_url),
            config: Arc::new(config),
            repository: parts.repository,
            clock: parts.clock,
            booking,
            nlu,
            sessions: parts.sessions,
            transcriber: parts.transcriber,
            outbound: None,
            started_at: Instant::now(),
        }
    }

    /// Language used when the caller picks none
    pub fn fallback_language(&self) -> Language {
        Language::from_code(&self.config.languages.fallback).unwrap_or(Language::English)
    }

    pub fn max_no_speech_retries(&self) -> u32 {
        self.config.dialogue.max_no_speech_retries
    }
}
