use booking_engine::Clock;
use chrono::NaiveTime;
use config_engine::NluSettings;
use error_common::Categorized;
use schedule_store::Specialty;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::catalog::DoctorCatalog;
use crate::dates::{parse_time, resolve_date, tokens};
use crate::error::{NluError, NluResult};
use crate::fields::{BookingFields, ExtractedFields, FieldUpdates, MissingField};
use crate::nlu::rules::detect_specialty;
use crate::nlu::{BackendReply, EscalationReason, NluBackend, NluContext, NluDecision};
use crate::phrases;
use crate::session::DialogueSession;
use crate::state::{DialogueState, NluAction, NluState};

/// Longest patient name accepted from a backend
const MAX_NAME_CHARS: usize = 60;

#[derive(Debug, Clone)]
pub struct NluConfig {
    /// Upper bound on one backend call
    pub timeout: Duration,
    /// Caller turns allowed before a forced hand-off
    pub max_turns: u32,
    /// Spoken reply budget
    pub max_words: usize,
}

impl Default for NluConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(8),
            max_turns: 6,
            max_words: 50,
        }
    }
}

impl From<&NluSettings> for NluConfig {
    fn from(settings: &NluSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_secs.max(1)),
            max_turns: settings.max_turns.max(1),
            max_words: settings.max_response_words.max(5),
        }
    }
}

/// Runs a backend for one caller turn and turns its advisory output into a
/// [`NluDecision`] the protocol handler can act on without further checks.
#[derive(Clone)]
pub struct NluEngine {
    backend: Arc<dyn NluBackend>,
    clock: Arc<dyn Clock>,
    config: NluConfig,
}

impl NluEngine {
    pub fn new(backend: Arc<dyn NluBackend>, clock: Arc<dyn Clock>, config: NluConfig) -> Self {
        Self {
            backend,
            clock,
            config,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn config(&self) -> &NluConfig {
        &self.config
    }

    /// Snapshot of everything the backend may see for this turn
    pub fn context(
        &self,
        session: &DialogueSession,
        utterance: &str,
        catalog: Arc<DoctorCatalog>,
    ) -> NluContext {
        NluContext {
            call_id: session.call_id.clone(),
            language: session.language,
            hospital_name: session.hospital_name.clone(),
            caller_number: session.caller_number.clone(),
            utterance: utterance.trim().to_string(),
            history: session.history.clone(),
            fields: session.fields.clone(),
            state: session.state,
            catalog,
            now: self.clock.now(),
            turn: session.turn_count.saturating_add(1),
            max_turns: self.config.max_turns,
            max_words: self.config.max_words,
            last_offered: session.last_offered.clone(),
        }
    }

    /// Interpret one utterance. Never fails: backend trouble becomes an
    /// apology plus a hand-off.
    pub async fn process_turn(
        &self,
        session: &DialogueSession,
        utterance: &str,
        catalog: Arc<DoctorCatalog>,
    ) -> NluDecision {
        let ctx = self.context(session, utterance, catalog);
        let started = Instant::now();

        let outcome = match tokio::time::timeout(self.config.timeout, self.backend.interpret(&ctx))
            .await
        {
            Ok(Ok(reply)) => self.validate(&ctx, reply),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(NluError::Timeout(self.config.timeout)),
        };

        let decision = match outcome {
            Ok(decision) => decision,
            Err(e) => self.failed(&ctx, e),
        };

        info!(
            call_id = %ctx.call_id,
            backend = self.backend.name(),
            turn = ctx.turn,
            next_state = ?decision.next_state,
            action = decision.action.as_str(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "NLU turn processed"
        );
        decision
    }

    fn failed(&self, ctx: &NluContext, error: NluError) -> NluDecision {
        warn!(
            call_id = %ctx.call_id,
            backend = self.backend.name(),
            code = error.code(),
            error = %error,
            "NLU backend failed, handing the caller to reception"
        );
        NluDecision {
            response: phrases::apology(ctx.language),
            updates: FieldUpdates::default(),
            next_state: NluState::Escalated,
            action: NluAction::TransferToHuman,
            offered: Vec::new(),
            failure: Some(format!("{}: {}", error.code(), error)),
            escalation: Some(EscalationReason::BackendFailure),
        }
    }

    fn validate(&self, ctx: &NluContext, reply: BackendReply) -> NluResult<NluDecision> {
        let mut next_state = NluState::parse(&reply.next_state)?;
        let mut action = NluAction::parse(&reply.action)?;
        let mut response = reply.response_text.trim().to_string();
        if response.is_empty() {
            return Err(NluError::MalformedOutput("empty response_text".to_string()));
        }

        let updates = validate_fields(ctx, &reply.extracted_data);
        let mut projected = ctx.fields.clone();
        projected.merge(updates.clone());

        let invented = ctx.catalog.unknown_doctor_mentions(&response);
        if !invented.is_empty() {
            warn!(
                call_id = %ctx.call_id,
                names = ?invented,
                "Backend named doctors outside the catalog; reply replaced"
            );
            response = ask_missing(ctx, &projected);
            next_state = NluState::Collecting;
            if action != NluAction::TransferToHuman {
                action = NluAction::None;
            }
        }

        // Hand-off is both a state and an action
        if action == NluAction::TransferToHuman || next_state == NluState::Escalated {
            action = NluAction::TransferToHuman;
            next_state = NluState::Escalated;
        }

        if action == NluAction::BookAppointment || next_state == NluState::Booked {
            if !projected.is_ready() {
                debug!(call_id = %ctx.call_id, missing = ?projected.missing(), "Booking requested early");
                response = ask_missing(ctx, &projected);
                next_state = NluState::Collecting;
                action = NluAction::None;
            } else if ctx.state != DialogueState::Confirming {
                // The caller hears the full booking read back before it is made
                response = ask_missing(ctx, &projected);
                next_state = NluState::Confirming;
                action = NluAction::None;
            } else {
                next_state = NluState::Booked;
                action = NluAction::BookAppointment;
            }
        }

        if action == NluAction::CancelAppointment {
            next_state = NluState::Ended;
        }

        let mut escalation = (next_state == NluState::Escalated)
            .then_some(EscalationReason::CallerRequest);

        if ctx.turn > ctx.max_turns && !next_state.is_terminal() && action == NluAction::None {
            info!(
                call_id = %ctx.call_id,
                turn = ctx.turn,
                max_turns = ctx.max_turns,
                "Turn limit reached without a booking"
            );
            response = phrases::turn_limit(ctx.language);
            next_state = NluState::Escalated;
            action = NluAction::TransferToHuman;
            escalation = Some(EscalationReason::TurnLimit);
        }

        let today = ctx.today();
        let offered = reply
            .offered_slots
            .into_iter()
            .filter(|slot| slot.date >= today)
            .collect();

        Ok(NluDecision {
            response: truncate_words(&response, ctx.max_words),
            updates,
            next_state,
            action,
            offered,
            failure: None,
            escalation,
        })
    }
}

/// Keep only field values that make sense for this hospital and this day
fn validate_fields(ctx: &NluContext, raw: &ExtractedFields) -> FieldUpdates {
    let mut updates = FieldUpdates::default();
    let today = ctx.today();

    let by_id = raw
        .doctor_id
        .as_deref()
        .and_then(|id| Uuid::parse_str(id.trim()).ok())
        .and_then(|id| ctx.catalog.find_by_id(id));
    let doctor = by_id.or_else(|| {
        raw.doctor_name
            .as_deref()
            .and_then(|name| ctx.catalog.find_by_name(name))
    });
    if doctor.is_none() && (raw.doctor_id.is_some() || raw.doctor_name.is_some()) {
        debug!(
            call_id = %ctx.call_id,
            doctor = ?raw.doctor_name,
            "Discarded doctor not in the catalog"
        );
    }

    let specialty = raw.department.as_deref().and_then(|department| {
        department
            .parse::<Specialty>()
            .ok()
            .or_else(|| detect_specialty(&tokens(department)))
    });

    match (doctor, specialty) {
        (Some(doctor), _) => {
            updates.doctor_id = Some(doctor.id);
            updates.doctor_name = Some(doctor.name.clone());
            updates.specialty = Some(doctor.specialty);
        }
        (None, Some(specialty)) if ctx.catalog.offers(specialty) => {
            updates.specialty = Some(specialty);
            let current = ctx.fields.doctor_id.and_then(|id| ctx.catalog.find_by_id(id));
            if current.map_or(true, |d| d.specialty != specialty) {
                if let Some(first) = ctx.catalog.by_specialty(specialty).next() {
                    updates.doctor_id = Some(first.id);
                    updates.doctor_name = Some(first.name.clone());
                }
            }
        }
        (None, Some(specialty)) => {
            debug!(call_id = %ctx.call_id, %specialty, "Discarded department not offered");
        }
        (None, None) => {}
    }

    updates.preferred_date = raw
        .preferred_date
        .as_deref()
        .and_then(|d| resolve_date(d, today))
        .filter(|d| *d >= today);

    updates.preferred_time = raw.preferred_time.as_deref().and_then(|t| {
        let t = t.trim();
        // Backends are asked for 24-hour HH:MM; fall back to spoken forms
        NaiveTime::parse_from_str(t, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(t, "%H:%M:%S"))
            .ok()
            .or_else(|| parse_time(t))
    });

    updates.patient_name = raw
        .patient_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty() && n.chars().count() <= MAX_NAME_CHARS)
        .map(str::to_string);

    updates.symptoms = raw
        .symptoms
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    updates
}

/// The question for the first field still missing, or the read-back
fn ask_missing(ctx: &NluContext, fields: &BookingFields) -> String {
    let language = ctx.language;
    let doctor = fields.doctor_id.and_then(|id| ctx.catalog.find_by_id(id));
    match (fields.missing().first(), doctor) {
        (Some(MissingField::Department), _) | (_, None) => {
            phrases::ask_department(language, &ctx.catalog.specialties())
        }
        (Some(MissingField::Date), Some(doctor)) => {
            phrases::ask_date(language, &doctor.name, &doctor.schedule.working_days())
        }
        (Some(MissingField::Time), Some(_)) => phrases::ask_new_slot(language),
        (Some(MissingField::PatientName), Some(_)) => phrases::ask_name(language),
        (None, Some(doctor)) => match (fields.preferred_date, fields.preferred_time) {
            (Some(date), Some(time)) => phrases::confirm_booking(
                language,
                fields.patient_name.as_deref().unwrap_or_default(),
                &doctor.name,
                date,
                time,
                ctx.today(),
            ),
            _ => phrases::ask_new_slot(language),
        },
    }
}

fn truncate_words(text: &str, max_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= max_words {
        return words.join(" ");
    }
    words
        .into_iter()
        .take(max_words)
        .collect::<Vec<_>>()
        .join(" ")
}
