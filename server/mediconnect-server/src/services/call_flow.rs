//! The telephone booking dialogue, one webhook at a time.
//!
//! Every function here returns markup, never an error: whatever goes wrong
//! mid-call, the caller hears something and the call either continues or
//! hangs up cleanly.

use booking_engine::{BookingConfirmation, BookingError, BookingRequest};
use chrono::Utc;
use dialogue_engine::{
    phrases, BookingFields, DialogueSession, DialogueState, DoctorCatalog, NluAction, SessionError,
    SessionSeed,
};
use error_common::{codes, log_categorized, Categorized, ErrorContext};
use logger_redacted::mask_phone;
use schedule_store::{
    normalize_phone, AppointmentFilter, BookingChannel, CallCompletion, ConversationStatus,
    ConversationTurn, DoctorFilter, Language, NewConversation, OutcomeUpdate, PatientIdentity,
    StoreError,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use voice_recognition_service::Transcript;

use crate::server::MediConnectServer;
use crate::telephony::{VoiceResponse, WebhookPayload};

fn context_for(session: &DialogueSession) -> ErrorContext {
    let context = ErrorContext::new()
        .with_call_id(session.call_id.clone())
        .with_turn(session.turn_count);
    match session.hospital_id {
        Some(id) => context.with_hospital_id(id.to_string()),
        None => context,
    }
}

fn goodbye(language: Language) -> VoiceResponse {
    VoiceResponse::new()
        .say(phrases::goodbye(language), language)
        .hangup()
}

fn apology_and_hangup(language: Language) -> VoiceResponse {
    VoiceResponse::new()
        .say(phrases::apology(language), language)
        .hangup()
}

/// Speak `text`, then record the caller's answer
fn listen(server: &MediConnectServer, session: &DialogueSession, text: &str) -> VoiceResponse {
    let telephony = &server.config.telephony;
    let language = session.language;
    let action = server.callbacks.process_speech(&session.call_id, language);
    VoiceResponse::new()
        .say(text, language)
        .record(
            action.clone(),
            telephony.record_max_length_secs,
            telephony.record_silence_timeout_secs,
            telephony.finish_on_key.clone(),
        )
        .say(phrases::could_not_hear(language), language)
        .redirect(action)
}

fn language_menu(server: &MediConnectServer, call_id: &str, retry: bool) -> VoiceResponse {
    let fallback = server.fallback_language();
    let menu = if retry {
        VoiceResponse::new().say(phrases::LANGUAGE_MENU_RETRY, Language::English)
    } else {
        VoiceResponse::new()
            .say(phrases::LANGUAGE_MENU_HINDI, Language::Hindi)
            .say(phrases::LANGUAGE_MENU_ENGLISH, Language::English)
    };
    menu.gather(
        server.callbacks.language_selected(call_id),
        1,
        server.config.telephony.language_gather_timeout_secs,
    )
    .say(phrases::NO_LANGUAGE_INPUT, Language::English)
    .redirect(server.callbacks.greeting(call_id, fallback))
}

async fn record_outcome(server: &MediConnectServer, call_id: &str, update: OutcomeUpdate) {
    if let Err(e) = server.repository.record_outcome(call_id, update).await {
        log_categorized(&ErrorContext::new().with_call_id(call_id), &e);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Saved {
    Yes,
    /// The call-end callback removed the session; the turn must be dropped
    CallEnded,
    Failed,
}

async fn persist_session(server: &MediConnectServer, session: &DialogueSession) -> Saved {
    match server.sessions.update(session.clone()).await {
        Ok(()) => Saved::Yes,
        Err(SessionError::NotFound(_)) => {
            debug!(call_id = %session.call_id, "Call ended while the turn was in flight");
            Saved::CallEnded
        }
        Err(e) => {
            log_categorized(&context_for(session), &e);
            Saved::Failed
        }
    }
}

/// Whether the call-end callback has not yet released this call
async fn session_is_live(server: &MediConnectServer, call_id: &str) -> bool {
    match server.sessions.get(call_id).await {
        Ok(Some(_)) => true,
        Ok(None) => false,
        Err(e) => {
            // Unknown; the save at the end of the turn reports store failures
            log_categorized(&ErrorContext::new().with_call_id(call_id), &e);
            true
        }
    }
}

/// Live session for a call, rebuilt from the conversation record when the
/// session store lost it mid-call
async fn load_session(server: &MediConnectServer, call_id: &str) -> Option<DialogueSession> {
    match server.sessions.get(call_id).await {
        Ok(Some(session)) => return Some(session),
        Ok(None) => {}
        Err(e) => {
            log_categorized(&ErrorContext::new().with_call_id(call_id), &e);
            return None;
        }
    }

    let conversation = match server.repository.get_conversation(call_id).await {
        Ok(Some(c)) if c.status == ConversationStatus::InProgress && c.hospital_id.is_some() => c,
        Ok(_) => {
            warn!(
                call_id,
                code = codes::telephony::SESSION_GONE,
                "Webhook for a call with no live session"
            );
            return None;
        }
        Err(e) => {
            log_categorized(&ErrorContext::new().with_call_id(call_id), &e);
            return None;
        }
    };

    let seed = SessionSeed {
        call_id: call_id.to_string(),
        hospital_id: conversation.hospital_id,
        hospital_name: conversation.hospital_name.clone(),
        caller_number: conversation.caller_number.clone(),
        language: conversation.language.unwrap_or_else(|| server.fallback_language()),
    };
    let mut session = match server.sessions.get_or_create(seed).await {
        Ok(session) => session,
        Err(e) => {
            log_categorized(&ErrorContext::new().with_call_id(call_id), &e);
            return None;
        }
    };

    if let Ok(fields) = serde_json::from_value::<BookingFields>(conversation.collected.clone()) {
        session.fields = fields;
    }
    if let Ok(state) = conversation.state.parse::<DialogueState>() {
        if !state.is_terminal() {
            session.state = state;
        }
    }
    session.turn_count = u32::try_from(conversation.turns.len()).unwrap_or(u32::MAX);
    info!(call_id, state = %session.state, "Dialogue session rebuilt from the call record");
    Some(session)
}

/// End the dialogue with a hand-off to reception
async fn escalate(
    server: &MediConnectServer,
    mut session: DialogueSession,
    reason: &str,
    text: String,
    error: Option<String>,
) -> VoiceResponse {
    let language = session.language;
    session.transition(DialogueState::Escalated);
    session.push_assistant(text.clone());
    if persist_session(server, &session).await == Saved::CallEnded {
        return goodbye(language);
    }

    let mut update = OutcomeUpdate::escalated(DialogueState::Escalated.as_str(), reason);
    update.collected = Some(session.collected_json());
    update.error = error;
    record_outcome(server, &session.call_id, update).await;

    info!(call_id = %session.call_id, reason, "Call handed to reception");
    VoiceResponse::new().say(text, language).hangup()
}

// ============================================================================
// Webhook steps
// ============================================================================

/// First webhook of a call: open the record and play the language menu
pub async fn incoming(server: &MediConnectServer, payload: &WebhookPayload) -> VoiceResponse {
    let fallback = server.fallback_language();
    let call_id = match payload.require_call_id() {
        Ok(id) => id,
        Err(e) => {
            log_categorized(&ErrorContext::new(), &e);
            return VoiceResponse::technical_difficulties();
        }
    };
    let caller = payload.from.clone().unwrap_or_default();

    let hospital = match server
        .repository
        .resolve_hospital_for_call(payload.to.as_deref())
        .await
    {
        Ok(hospital) => hospital,
        Err(e) => {
            log_categorized(&ErrorContext::new().with_call_id(call_id), &e);
            return apology_and_hangup(fallback);
        }
    };

    info!(
        call_id,
        caller = %mask_phone(&caller),
        hospital = hospital.as_ref().map_or("-", |h| h.name.as_str()),
        "📞 Incoming call"
    );

    let record = NewConversation {
        call_id: call_id.to_string(),
        hospital_id: hospital.as_ref().map(|h| h.id),
        hospital_name: hospital.as_ref().map(|h| h.name.clone()),
        caller_number: normalize_phone(&caller),
        dialed_number: payload.to.as_deref().map(normalize_phone),
        state: DialogueState::Incoming.as_str().to_string(),
        billing_amount: hospital.as_ref().map_or(0, |h| h.cost_per_call),
        currency: hospital
            .as_ref()
            .map_or_else(|| "INR".to_string(), |h| h.currency.clone()),
    };
    match server.repository.create_conversation(record).await {
        Ok(_) => {}
        Err(StoreError::Duplicate(_)) => debug!(call_id, "Provider retried the incoming webhook"),
        Err(e) => {
            log_categorized(&ErrorContext::new().with_call_id(call_id), &e);
            return apology_and_hangup(fallback);
        }
    }

    let Some(hospital) = hospital else {
        warn!(
            call_id,
            code = codes::telephony::UNKNOWN_HOSPITAL,
            dialed = payload.to.as_deref().unwrap_or("-"),
            "No hospital serves the dialed number"
        );
        let update = OutcomeUpdate::escalated(DialogueState::Escalated.as_str(), "unknown_hospital");
        record_outcome(server, call_id, update).await;
        return apology_and_hangup(fallback);
    };

    let seed = SessionSeed {
        call_id: call_id.to_string(),
        hospital_id: Some(hospital.id),
        hospital_name: Some(hospital.name.clone()),
        caller_number: caller,
        language: hospital.default_language,
    };
    let mut session = match server.sessions.get_or_create(seed).await {
        Ok(session) => session,
        Err(e) => {
            log_categorized(&ErrorContext::new().with_call_id(call_id), &e);
            return apology_and_hangup(hospital.default_language);
        }
    };
    session.transition(DialogueState::LanguageSelect);
    if persist_session(server, &session).await == Saved::CallEnded {
        return goodbye(session.language);
    }

    let update = OutcomeUpdate {
        state: Some(DialogueState::LanguageSelect.as_str().to_string()),
        ..OutcomeUpdate::default()
    };
    record_outcome(server, call_id, update).await;

    language_menu(server, call_id, false)
}

/// Digit pressed at the language menu
pub async fn language_selected(server: &MediConnectServer, payload: &WebhookPayload) -> VoiceResponse {
    let call_id = match payload.require_call_id() {
        Ok(id) => id,
        Err(e) => {
            log_categorized(&ErrorContext::new(), &e);
            return VoiceResponse::technical_difficulties();
        }
    };
    let Some(mut session) = load_session(server, call_id).await else {
        return VoiceResponse::technical_difficulties();
    };

    let digits = payload.digits.as_deref().unwrap_or_default().trim();
    let language = match Language::from_digit(digits) {
        Some(language) => language,
        None if digits.is_empty() => server.fallback_language(),
        None if session.digit_retries == 0 => {
            info!(
                call_id,
                code = codes::telephony::INVALID_DIGIT,
                digits,
                "Unusable language choice, asking again"
            );
            session.digit_retries += 1;
            if persist_session(server, &session).await == Saved::CallEnded {
                return goodbye(session.language);
            }
            return language_menu(server, call_id, true);
        }
        None => server.fallback_language(),
    };

    greet(server, session, language).await
}

/// Greeting after the language menu, or straight from its timeout redirect
pub async fn greeting(server: &MediConnectServer, payload: &WebhookPayload) -> VoiceResponse {
    let call_id = match payload.require_call_id() {
        Ok(id) => id,
        Err(e) => {
            log_categorized(&ErrorContext::new(), &e);
            return VoiceResponse::technical_difficulties();
        }
    };
    let Some(session) = load_session(server, call_id).await else {
        return VoiceResponse::technical_difficulties();
    };
    let language = payload
        .language
        .as_deref()
        .and_then(Language::from_code)
        .unwrap_or_else(|| server.fallback_language());
    greet(server, session, language).await
}

async fn greet(
    server: &MediConnectServer,
    mut session: DialogueSession,
    language: Language,
) -> VoiceResponse {
    let call_id = session.call_id.clone();
    session.language = language;

    let hospital_greeting = match session.hospital_id {
        Some(id) => match server.repository.get_hospital(id).await {
            Ok(hospital) => hospital
                .map(|h| h.greetings.for_language(language).trim().to_string())
                .filter(|g| !g.is_empty()),
            Err(e) => {
                log_categorized(&context_for(&session), &e);
                None
            }
        },
        None => None,
    };
    let text = hospital_greeting
        .unwrap_or_else(|| phrases::default_greeting(session.hospital_name.as_deref(), language));

    session.push_assistant(text.clone());
    session.transition(DialogueState::Listening);
    if persist_session(server, &session).await != Saved::Yes {
        return goodbye(language);
    }

    if let Err(e) = server
        .repository
        .set_conversation_language(&call_id, language)
        .await
    {
        log_categorized(&context_for(&session), &e);
    }
    let update = OutcomeUpdate {
        state: Some(DialogueState::Listening.as_str().to_string()),
        ..OutcomeUpdate::default()
    };
    record_outcome(server, &call_id, update).await;

    info!(call_id = %call_id, language = language.code(), "Caller greeted");
    listen(server, &session, &text)
}

/// One recorded caller turn
pub async fn process_speech(server: &MediConnectServer, payload: &WebhookPayload) -> VoiceResponse {
    let call_id = match payload.require_call_id() {
        Ok(id) => id,
        Err(e) => {
            log_categorized(&ErrorContext::new(), &e);
            return VoiceResponse::technical_difficulties();
        }
    };
    let Some(mut session) = load_session(server, call_id).await else {
        return VoiceResponse::technical_difficulties();
    };
    let language = session.language;

    if session.state.is_terminal() {
        return goodbye(language);
    }

    let transcript = match payload.recording_url.as_deref() {
        None => Transcript::NoSpeech,
        Some(url) => match server
            .transcriber
            .transcribe_recording(url, language, &[language.alternate()])
            .await
        {
            Ok(transcript) => transcript,
            Err(e) => {
                log_categorized(&context_for(&session), &e);
                let error = format!("{}: {}", e.code(), e);
                return escalate(server, session, "speech_failure", phrases::apology(language), Some(error))
                    .await;
            }
        },
    };

    let Some(utterance) = transcript.text().map(str::to_string) else {
        let silent = session.record_no_speech();
        info!(
            call_id,
            code = codes::telephony::NO_SPEECH,
            silent,
            limit = server.max_no_speech_retries(),
            "No speech in recording"
        );
        if silent >= server.max_no_speech_retries() {
            return escalate(server, session, "no_speech", phrases::no_speech_handoff(language), None)
                .await;
        }
        if persist_session(server, &session).await == Saved::CallEnded {
            return goodbye(language);
        }
        return listen(server, &session, &phrases::could_not_hear(language));
    };

    let filter = DoctorFilter {
        hospital_id: session.hospital_id,
        active_only: true,
        ..DoctorFilter::default()
    };
    let doctors = match server.repository.list_doctors(filter).await {
        Ok(doctors) => doctors,
        Err(e) => {
            log_categorized(&context_for(&session), &e);
            let error = format!("{}: {}", e.code(), e);
            return escalate(server, session, "store_failure", phrases::apology(language), Some(error))
                .await;
        }
    };

    let decision = server
        .nlu
        .process_turn(&session, &utterance, Arc::new(DoctorCatalog::new(doctors)))
        .await;
    session.apply_turn(&utterance, &decision);

    let mut outcome = OutcomeUpdate {
        error: decision.failure.clone(),
        escalation_reason: decision.escalation.map(|r| r.as_str().to_string()),
        ..OutcomeUpdate::default()
    };
    let mut spoken = decision.response.clone();

    let commits = matches!(
        decision.action,
        NluAction::BookAppointment | NluAction::CancelAppointment
    );
    if commits && !session_is_live(server, call_id).await {
        debug!(call_id, action = ?decision.action, "Caller hung up before the commit, turn dropped");
        return goodbye(language);
    }

    match decision.action {
        NluAction::BookAppointment => {
            spoken = complete_booking(server, &mut session, &mut outcome).await;
        }
        NluAction::CancelAppointment => {
            spoken = cancel_for_caller(server, &mut session, &mut outcome).await;
        }
        NluAction::TransferToHuman | NluAction::None => {}
    }
    if spoken != decision.response {
        session.push_assistant(spoken.clone());
    }

    match persist_session(server, &session).await {
        Saved::Yes => {}
        // The record is already closed; nothing more is written for this turn
        Saved::CallEnded => return goodbye(language),
        Saved::Failed => {
            if !session.state.is_terminal() {
                spoken = phrases::apology(language);
                session.transition(DialogueState::Escalated);
                outcome.escalation_reason = Some("session_store".to_string());
            }
        }
    }

    let turn = ConversationTurn {
        utterance,
        response: spoken.clone(),
        state: session.state.as_str().to_string(),
        at: Utc::now(),
    };
    if let Err(e) = server.repository.append_turn(call_id, turn).await {
        log_categorized(&context_for(&session), &e);
    }
    outcome.state = Some(session.state.as_str().to_string());
    outcome.collected = Some(session.collected_json());
    record_outcome(server, call_id, outcome).await;

    if session.state.is_terminal() {
        VoiceResponse::new().say(spoken, language).hangup()
    } else {
        listen(server, &session, &spoken)
    }
}

/// Commit the confirmed booking; returns what to say
async fn complete_booking(
    server: &MediConnectServer,
    session: &mut DialogueSession,
    outcome: &mut OutcomeUpdate,
) -> String {
    let language = session.language;
    let today = server.clock.today();

    match book_from_session(server, session).await {
        Ok(confirmation) => {
            let appointment = &confirmation.appointment;
            outcome.booking_successful = Some(true);
            outcome.appointment_id = Some(appointment.id);
            phrases::booked(
                language,
                &appointment.appointment_number,
                &confirmation.doctor_name,
                appointment.date,
                appointment.time,
                today,
            )
        }
        Err(e) if e.is_slot_taken() => {
            info!(call_id = %session.call_id, code = e.code(), "Requested slot taken, offering alternatives");
            let alternatives = e.alternatives().to_vec();
            session.fields.clear_slot();
            session.last_offered.clone_from(&alternatives);
            session.transition(DialogueState::Collecting);
            phrases::slot_taken(language, &alternatives, today)
        }
        Err(e) if e.category().requires_escalation() => {
            log_categorized(&context_for(session), &e);
            session.transition(DialogueState::Escalated);
            outcome.escalation_reason = Some("booking_failure".to_string());
            outcome.error = Some(format!("{}: {}", e.code(), e));
            phrases::apology(language)
        }
        Err(e) => {
            log_categorized(&context_for(session), &e);
            session.fields.clear_slot();
            session.last_offered.clear();
            session.transition(DialogueState::Collecting);
            phrases::ask_new_slot(language)
        }
    }
}

async fn book_from_session(
    server: &MediConnectServer,
    session: &DialogueSession,
) -> Result<BookingConfirmation, BookingError> {
    let fields = &session.fields;
    let (Some(hospital_id), Some(doctor_id), Some(date), Some(time)) = (
        session.hospital_id,
        fields.doctor_id,
        fields.preferred_date,
        fields.preferred_time,
    ) else {
        return Err(BookingError::InvalidRequest(
            "booking confirmed with fields missing".to_string(),
        ));
    };

    let phone = fields
        .patient_phone
        .clone()
        .unwrap_or_else(|| session.caller_number.clone());
    let request = BookingRequest {
        hospital_id,
        doctor_id,
        patient: PatientIdentity {
            phone,
            name: fields.patient_name.clone(),
            language: Some(session.language),
        },
        date,
        time,
        symptoms: fields.symptoms.clone(),
        language: session.language,
        channel: BookingChannel::Voice,
        call_id: Some(session.call_id.clone()),
    };
    server.booking.book_appointment(request).await
}

/// Cancel the caller's only upcoming appointment at this hospital
async fn cancel_for_caller(
    server: &MediConnectServer,
    session: &mut DialogueSession,
    outcome: &mut OutcomeUpdate,
) -> String {
    let language = session.language;
    let today = server.clock.today();

    match find_cancellable(server, session).await {
        Ok(Some(appointment_id)) => match server.booking.cancel_appointment(appointment_id).await {
            Ok(appointment) => {
                outcome.appointment_id = Some(appointment.id);
                phrases::cancelled(language, &appointment.appointment_number, appointment.date, today)
            }
            Err(e) => {
                log_categorized(&context_for(session), &e);
                session.transition(DialogueState::Escalated);
                outcome.escalation_reason = Some("cancellation_failure".to_string());
                outcome.error = Some(format!("{}: {}", e.code(), e));
                phrases::apology(language)
            }
        },
        Ok(None) => {
            session.transition(DialogueState::Escalated);
            outcome.escalation_reason = Some("cancellation_lookup".to_string());
            phrases::no_cancellable_appointment(language)
        }
        Err(e) => {
            log_categorized(&context_for(session), &e);
            session.transition(DialogueState::Escalated);
            outcome.escalation_reason = Some("cancellation_failure".to_string());
            outcome.error = Some(format!("{}: {}", e.code(), e));
            phrases::apology(language)
        }
    }
}

async fn find_cancellable(
    server: &MediConnectServer,
    session: &DialogueSession,
) -> Result<Option<Uuid>, StoreError> {
    let phone = session
        .fields
        .patient_phone
        .as_deref()
        .unwrap_or(&session.caller_number);
    let Some(patient) = server
        .repository
        .find_patient_by_phone(&normalize_phone(phone))
        .await?
    else {
        return Ok(None);
    };

    let today = server.clock.today();
    let filter = AppointmentFilter {
        hospital_id: session.hospital_id,
        patient_id: Some(patient.id),
        ..AppointmentFilter::default()
    };
    let upcoming: Vec<Uuid> = server
        .repository
        .list_appointments(filter)
        .await?
        .into_iter()
        .filter(|a| a.status.is_active() && a.date >= today)
        .map(|a| a.id)
        .collect();

    // More than one is ambiguous over the phone
    Ok(match upcoming.as_slice() {
        [only] => Some(*only),
        _ => None,
    })
}

/// Provider call-status callback: close the record and drop the session
pub async fn call_ended(server: &MediConnectServer, payload: &WebhookPayload) -> serde_json::Value {
    let call_id = match payload.require_call_id() {
        Ok(id) => id,
        Err(e) => {
            log_categorized(&ErrorContext::new(), &e);
            return serde_json::json!({ "success": false, "error": e.to_string() });
        }
    };

    let completion = CallCompletion {
        provider_status: payload.status.clone(),
        duration_secs: payload.duration_secs,
        ended_at: Utc::now(),
    };
    match server.repository.complete_conversation(call_id, completion).await {
        Ok(conversation) => info!(
            call_id,
            status = %conversation.status,
            duration_secs = conversation.duration_secs.unwrap_or_default(),
            booked = conversation.outcome.booking_successful,
            "📴 Call ended"
        ),
        Err(StoreError::NotFound { .. }) => {
            debug!(call_id, "Status callback for a call with no record");
        }
        Err(e) => log_categorized(&ErrorContext::new().with_call_id(call_id), &e),
    }

    match server.sessions.delete(call_id).await {
        Ok(removed) => debug!(call_id, removed, "Dialogue session released"),
        Err(e) => log_categorized(&ErrorContext::new().with_call_id(call_id), &e),
    }

    serde_json::json!({ "success": true })
}

/// Markup for an outbound reminder call
pub async fn reminder(server: &MediConnectServer, appointment_id: Uuid) -> VoiceResponse {
    let context = ErrorContext::new().add_context("appointment_id", appointment_id.to_string());
    let appointment = match server.repository.get_appointment(appointment_id).await {
        Ok(Some(appointment)) => appointment,
        Ok(None) => {
            warn!(%appointment_id, "Reminder for an unknown appointment");
            return VoiceResponse::technical_difficulties();
        }
        Err(e) => {
            log_categorized(&context, &e);
            return VoiceResponse::technical_difficulties();
        }
    };

    let (doctor, hospital) = match tokio::try_join!(
        server.repository.get_doctor(appointment.doctor_id),
        server.repository.get_hospital(appointment.hospital_id),
    ) {
        Ok((Some(doctor), Some(hospital))) => (doctor, hospital),
        Ok(_) => {
            warn!(%appointment_id, "Reminder appointment references missing records");
            return VoiceResponse::technical_difficulties();
        }
        Err(e) => {
            log_categorized(&context, &e);
            return VoiceResponse::technical_difficulties();
        }
    };

    let language = appointment.language;
    VoiceResponse::new()
        .say(
            phrases::reminder(
                language,
                &hospital.name,
                &doctor.name,
                appointment.date,
                appointment.time,
                server.clock.today(),
            ),
            language,
        )
        .hangup()
}
