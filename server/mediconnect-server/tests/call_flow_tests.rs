mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{
    at, ends_call, hang_up, harness, harness_configured, harness_with, keeps_listening, monday,
};
use config_engine::MediConnectConfig;
use dialogue_engine::SessionStore;
use mockall::mock;
use schedule_store::{
    AppointmentFilter, AppointmentStatus, ConversationStatus, Language, ScheduleRepository,
    Specialty,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use voice_recognition_service::{Transcriber, Transcript, VoiceError, VoiceResult};

mock! {
    pub Speech {}

    #[async_trait]
    impl Transcriber for Speech {
        async fn transcribe_recording(
            &self,
            recording_url: &str,
            language: Language,
            alternates: &[Language],
        ) -> VoiceResult<Transcript>;
    }
}

#[tokio::test]
async fn hindi_caller_books_cardiology_for_tomorrow() {
    let h = harness().await;
    let call = "CA-hindi-cardio";

    let greeting = h.answer(call, "09876543210", "1").await;
    assert!(greeting.contains("language=\"hi-IN\""), "{greeting}");
    assert!(keeps_listening(&greeting));

    let offer = h.say(call, "mujhe dil ke doctor ko dikhana hai, kal").await;
    assert!(keeps_listening(&offer), "{offer}");
    assert!(offer.contains("Dr. Priya Patel"), "{offer}");

    let ask_name = h.say(call, "haan pehla wala theek hai").await;
    assert!(keeps_listening(&ask_name), "{ask_name}");
    assert!(ask_name.contains("नाम"), "{ask_name}");

    let confirm = h.say(call, "mera naam Ramesh hai").await;
    assert!(keeps_listening(&confirm), "{confirm}");

    let booked = h.say(call, "haan").await;
    assert!(ends_call(&booked), "{booked}");
    assert!(booked.contains("बुक हो गई है"), "{booked}");

    let appointments = h
        .repo
        .list_appointments(AppointmentFilter::default())
        .await
        .unwrap();
    assert_eq!(appointments.len(), 1);
    let appointment = &appointments[0];
    assert_eq!(appointment.specialty, Specialty::Cardiology);
    assert_eq!(appointment.date, monday());
    assert_eq!(appointment.time, at(10, 0));
    assert!(appointment.status.is_active());
    assert_eq!(appointment.call_id.as_deref(), Some(call));
    assert!(booked.contains(&appointment.appointment_number.replace('-', " ")));

    let patient = h.repo.get_patient(appointment.patient_id).await.unwrap().unwrap();
    assert_eq!(patient.phone, "9876543210");
    assert_eq!(patient.name.as_deref(), Some("Ramesh"));

    let conversation = h.repo.get_conversation(call).await.unwrap().unwrap();
    assert!(conversation.outcome.booking_successful);
    assert_eq!(conversation.outcome.appointment_id, Some(appointment.id));
    assert_eq!(conversation.state, "booked");
    assert_eq!(conversation.turns.len(), 4);
}

#[tokio::test]
async fn department_not_offered_is_declined_without_a_booking() {
    let h = harness().await;
    let call = "CA-neuro";
    h.answer(call, "9810012345", "2").await;

    let reply = h.say(call, "I need a neurologist for my migraine").await;
    assert!(keeps_listening(&reply), "{reply}");
    assert!(reply.contains("Neurology"), "{reply}");

    let appointments = h
        .repo
        .list_appointments(AppointmentFilter::default())
        .await
        .unwrap();
    assert!(appointments.is_empty());
    let conversation = h.repo.get_conversation(call).await.unwrap().unwrap();
    assert!(!conversation.outcome.booking_successful);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_callers_racing_for_one_slot_get_one_booking() {
    let h = Arc::new(harness().await);
    let callers = [("CA-race-1", "9811111111"), ("CA-race-2", "9822222222")];

    for (call, phone) in callers {
        h.answer(call, phone, "1").await;
        h.say(call, "mujhe dil ke doctor ko dikhana hai, kal").await;
        h.say(call, "haan pehla wala theek hai").await;
        let confirm = h.say(call, "mera naam Ramesh hai").await;
        assert!(keeps_listening(&confirm), "{confirm}");
    }

    let tasks: Vec<_> = callers
        .iter()
        .map(|(call, _)| {
            let h = h.clone();
            let call = call.to_string();
            tokio::spawn(async move { h.say(&call, "haan").await })
        })
        .collect();
    let mut replies = Vec::new();
    for task in tasks {
        replies.push(task.await.unwrap());
    }

    let booked: Vec<_> = replies.iter().filter(|r| ends_call(r)).collect();
    let offered: Vec<_> = replies.iter().filter(|r| keeps_listening(r)).collect();
    assert_eq!(booked.len(), 1, "{replies:?}");
    assert_eq!(offered.len(), 1, "{replies:?}");
    assert!(offered[0].contains("अब खाली नहीं"), "{}", offered[0]);

    let held = h
        .repo
        .list_appointments(AppointmentFilter {
            date: Some(monday()),
            ..AppointmentFilter::default()
        })
        .await
        .unwrap();
    let at_ten: Vec<_> = held
        .iter()
        .filter(|a| a.time == at(10, 0) && a.status.is_active())
        .collect();
    assert_eq!(at_ten.len(), 1);
}

#[tokio::test]
async fn three_silent_recordings_hand_off_to_reception() {
    let h = harness().await;
    let call = "CA-silent";
    h.answer(call, "9833333333", "1").await;

    for _ in 0..2 {
        let (_, reply) = h
            .webhook("/api/voice/process-speech", &[("CallSid", call)])
            .await;
        assert!(keeps_listening(&reply), "{reply}");
    }
    let (status, last) = h
        .webhook("/api/voice/process-speech", &[("CallSid", call)])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ends_call(&last), "{last}");
    assert!(last.contains("रिसेप्शन"), "{last}");

    let conversation = h.repo.get_conversation(call).await.unwrap().unwrap();
    assert!(conversation.outcome.escalated);
    assert_eq!(conversation.outcome.escalation_reason.as_deref(), Some("no_speech"));
}

#[tokio::test]
async fn empty_transcript_counts_as_silence() {
    let h = harness().await;
    let call = "CA-blank";
    h.answer(call, "9833333334", "2").await;

    let reply = h.say(call, "   ").await;
    assert!(keeps_listening(&reply), "{reply}");
    let session = h.sessions.get(call).await.unwrap().unwrap();
    assert_eq!(session.no_speech_count, 1);
}

#[tokio::test]
async fn call_end_closes_the_record_and_drops_the_session() {
    let h = harness().await;
    let call = "CA-hangup";
    h.answer(call, "9844444444", "2").await;
    assert!(h.sessions.get(call).await.unwrap().is_some());

    let (status, body) = h
        .webhook(
            "/api/voice/status-callback",
            &[("CallSid", call), ("Status", "completed"), ("Duration", "95")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"success\":true"), "{body}");
    assert!(h.sessions.get(call).await.unwrap().is_none());

    let conversation = h.repo.get_conversation(call).await.unwrap().unwrap();
    assert_eq!(conversation.status, ConversationStatus::Completed);
    assert_eq!(conversation.duration_secs, Some(95));

    // A late recording after hang-up is answered, never written back
    let late = h.say(call, "kal subah").await;
    assert!(late.contains("<Hangup/>"), "{late}");
    assert!(h.sessions.get(call).await.unwrap().is_none());
}

#[tokio::test]
async fn call_ended_alias_acknowledges_unknown_calls() {
    let h = harness().await;
    let (status, body) = h
        .webhook("/api/voice/call-ended", &[("CallSid", "CA-never-seen")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"success\":true"), "{body}");

    let (status, body) = h.webhook("/api/voice/call-ended", &[]).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("\"success\":false"), "{body}");
}

#[tokio::test]
async fn missing_call_id_gets_safe_markup() {
    let h = harness().await;
    let (status, xml) = h
        .webhook("/api/voice/incoming", &[("From", "9876543210")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ends_call(&xml), "{xml}");
}

#[tokio::test]
async fn bad_digit_is_asked_once_then_falls_back() {
    let h = harness().await;
    let call = "CA-digits";
    h.webhook(
        "/api/voice/incoming",
        &[("CallSid", call), ("From", "9855555555"), ("To", "01140036376")],
    )
    .await;

    let (_, retry) = h
        .webhook("/api/voice/language-selected", &[("CallSid", call), ("Digits", "7")])
        .await;
    assert!(retry.contains("<Gather"), "{retry}");
    assert!(!retry.contains("<Record "), "{retry}");

    let (_, greeting) = h
        .webhook("/api/voice/language-selected", &[("CallSid", call), ("Digits", "9")])
        .await;
    assert!(keeps_listening(&greeting), "{greeting}");
    assert!(greeting.contains("language=\"en-IN\""), "{greeting}");
}

#[tokio::test]
async fn lost_session_is_rebuilt_from_the_call_record() {
    let h = harness().await;
    let call = "CA-failover";
    h.answer(call, "9866666666", "1").await;

    // Another node answering, or a restart, loses the in-memory session
    assert!(h.sessions.delete(call).await.unwrap());

    let offer = h.say(call, "mujhe dil ke doctor ko dikhana hai, kal").await;
    assert!(keeps_listening(&offer), "{offer}");
    assert!(offer.contains("Dr. Priya Patel"), "{offer}");
    assert!(offer.contains("language=\"hi-IN\""), "{offer}");
}

#[tokio::test]
async fn caller_cancels_their_only_upcoming_appointment() {
    let h = harness().await;
    let booking_call = "CA-book-first";
    h.answer(booking_call, "9877777777", "2").await;
    h.say(booking_call, "Dr. Priya Patel tomorrow").await;
    h.say(booking_call, "the first one").await;
    h.say(booking_call, "my name is Asha Rao").await;
    let booked = h.say(booking_call, "yes").await;
    assert!(ends_call(&booked), "{booked}");

    let cancel_call = "CA-cancel";
    h.answer(cancel_call, "+91 98777 77777", "2").await;
    let reply = h.say(cancel_call, "I want to cancel my appointment").await;
    assert!(ends_call(&reply), "{reply}");

    let appointments = h
        .repo
        .list_appointments(AppointmentFilter::default())
        .await
        .unwrap();
    assert_eq!(appointments.len(), 1);
    assert_eq!(appointments[0].status, AppointmentStatus::Cancelled);
}

#[tokio::test]
async fn transcription_outage_escalates_at_once() {
    let mut speech = MockSpeech::new();
    speech
        .expect_transcribe_recording()
        .times(1)
        .returning(|_, _, _| Err(VoiceError::provider("google", "503 backend unavailable")));
    let h = harness_with(Some(Arc::new(speech))).await;
    let call = "CA-asr-down";
    h.answer(call, "9888888888", "2").await;

    let (status, reply) = h
        .webhook(
            "/api/voice/process-speech",
            &[("CallSid", call), ("RecordingUrl", "https://recordings.test/x.mp3")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ends_call(&reply), "{reply}");

    let conversation = h.repo.get_conversation(call).await.unwrap().unwrap();
    assert!(conversation.outcome.escalated);
    assert_eq!(conversation.outcome.escalation_reason.as_deref(), Some("speech_failure"));
    assert!(conversation.outcome.error.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hang_up_during_a_slow_turn_discards_it() {
    let h = Arc::new(harness().await);
    let call = "CA-slow-turn";
    h.answer(call, "9899999999", "2").await;

    let turn = {
        let h = h.clone();
        tokio::spawn(async move {
            h.say_slowly(call, "Dr. Priya Patel tomorrow", Duration::from_millis(400))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    hang_up(&h, call).await;
    let closed = h.repo.get_conversation(call).await.unwrap().unwrap();

    let reply = turn.await.unwrap();
    assert!(ends_call(&reply), "{reply}");

    let after = h.repo.get_conversation(call).await.unwrap().unwrap();
    assert_eq!(after.status, ConversationStatus::Completed);
    assert!(after.turns.is_empty(), "{:?}", after.turns);
    assert_eq!(after.state, closed.state);
    assert!(h.sessions.get(call).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn caller_who_hangs_up_before_the_booking_commits_gets_none() {
    let h = Arc::new(harness().await);
    let call = "CA-gone-at-yes";
    h.answer(call, "9877700000", "2").await;
    h.say(call, "Dr. Priya Patel tomorrow").await;
    h.say(call, "the first one").await;
    let confirm = h.say(call, "my name is Asha Rao").await;
    assert!(keeps_listening(&confirm), "{confirm}");

    let turn = {
        let h = h.clone();
        tokio::spawn(async move { h.say_slowly(call, "yes", Duration::from_millis(400)).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    hang_up(&h, call).await;

    let reply = turn.await.unwrap();
    assert!(ends_call(&reply), "{reply}");
    let appointments = h
        .repo
        .list_appointments(AppointmentFilter::default())
        .await
        .unwrap();
    assert!(appointments.is_empty(), "{appointments:?}");
    let conversation = h.repo.get_conversation(call).await.unwrap().unwrap();
    assert!(!conversation.outcome.booking_successful);
    assert_eq!(conversation.turns.len(), 3);
}

#[tokio::test]
async fn stalled_recognition_still_answers_with_markup() {
    let mut config = MediConnectConfig::default();
    config.server.request_timeout_secs = 1;
    let h = harness_configured(config, None).await;
    let call = "CA-stalled";
    h.answer(call, "9812121212", "2").await;

    let started = Instant::now();
    let reply = h
        .say_slowly(call, "Dr. Priya Patel tomorrow", Duration::from_secs(3))
        .await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(reply.contains("<Say"), "{reply}");
    assert!(ends_call(&reply), "{reply}");
}
