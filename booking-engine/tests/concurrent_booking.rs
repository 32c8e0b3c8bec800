//! Two callers racing for the same doctor, date and time.

use async_trait::async_trait;
use booking_engine::{
    BookingConfig, BookingEngine, BookingError, BookingRequest, FixedClock,
};
use chrono::{NaiveDate, NaiveTime};
use schedule_store::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;
use uuid::Uuid;

/// Holds the first `racers` availability reads at a barrier, so every racer
/// sees the slot open before any of them commits.
struct RendezvousRepository {
    inner: InMemoryScheduleRepository,
    racers: usize,
    arrivals: AtomicUsize,
    barrier: Barrier,
}

#[async_trait]
impl ScheduleRepository for RendezvousRepository {
    async fn insert_hospital(&self, hospital: Hospital) -> StoreResult<Hospital> {
        self.inner.insert_hospital(hospital).await
    }
    async fn get_hospital(&self, id: Uuid) -> StoreResult<Option<Hospital>> {
        self.inner.get_hospital(id).await
    }
    async fn find_hospital_by_inbound_number(&self, number: &str) -> StoreResult<Option<Hospital>> {
        self.inner.find_hospital_by_inbound_number(number).await
    }
    async fn list_hospitals(&self, active_only: bool) -> StoreResult<Vec<Hospital>> {
        self.inner.list_hospitals(active_only).await
    }
    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor> {
        self.inner.insert_doctor(doctor).await
    }
    async fn get_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        self.inner.get_doctor(id).await
    }
    async fn list_doctors(&self, filter: DoctorFilter) -> StoreResult<Vec<Doctor>> {
        self.inner.list_doctors(filter).await
    }
    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        self.inner.get_patient(id).await
    }
    async fn find_patient_by_phone(&self, phone: &str) -> StoreResult<Option<Patient>> {
        self.inner.find_patient_by_phone(phone).await
    }
    async fn search_patients(&self, query: Option<&str>, limit: usize) -> StoreResult<Vec<Patient>> {
        self.inner.search_patients(query, limit).await
    }
    async fn create_appointment(&self, new: NewAppointment) -> StoreResult<BookedAppointment> {
        self.inner.create_appointment(new).await
    }
    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        self.inner.get_appointment(id).await
    }
    async fn list_appointments(&self, filter: AppointmentFilter) -> StoreResult<Vec<Appointment>> {
        self.inner.list_appointments(filter).await
    }
    async fn booked_times(&self, doctor_id: Uuid, date: NaiveDate) -> StoreResult<Vec<NaiveTime>> {
        let times = self.inner.booked_times(doctor_id, date).await;
        if self.arrivals.fetch_add(1, Ordering::SeqCst) < self.racers {
            self.barrier.wait().await;
        }
        times
    }
    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        self.inner.update_appointment_status(id, status).await
    }
    async fn appointment_stats(
        &self,
        hospital_id: Option<Uuid>,
        today: NaiveDate,
    ) -> StoreResult<AppointmentStats> {
        self.inner.appointment_stats(hospital_id, today).await
    }
    async fn create_conversation(&self, new: NewConversation) -> StoreResult<Conversation> {
        self.inner.create_conversation(new).await
    }
    async fn get_conversation(&self, call_id: &str) -> StoreResult<Option<Conversation>> {
        self.inner.get_conversation(call_id).await
    }
    async fn set_conversation_language(&self, call_id: &str, language: Language) -> StoreResult<()> {
        self.inner.set_conversation_language(call_id, language).await
    }
    async fn append_turn(&self, call_id: &str, turn: ConversationTurn) -> StoreResult<()> {
        self.inner.append_turn(call_id, turn).await
    }
    async fn record_outcome(&self, call_id: &str, update: OutcomeUpdate) -> StoreResult<()> {
        self.inner.record_outcome(call_id, update).await
    }
    async fn complete_conversation(
        &self,
        call_id: &str,
        completion: CallCompletion,
    ) -> StoreResult<Conversation> {
        self.inner.complete_conversation(call_id, completion).await
    }
    async fn list_conversations(&self, filter: ConversationFilter) -> StoreResult<Vec<Conversation>> {
        self.inner.list_conversations(filter).await
    }
    async fn call_stats(&self, hospital_id: Option<Uuid>) -> StoreResult<CallStats> {
        self.inner.call_stats(hospital_id).await
    }
    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
}

fn request(tenant: &demo::DemoTenant, phone: &str, call_id: &str) -> BookingRequest {
    BookingRequest {
        hospital_id: tenant.hospital.id,
        doctor_id: tenant.doctor_named("Rajesh").unwrap().id,
        patient: PatientIdentity {
            phone: phone.to_string(),
            name: None,
            language: None,
        },
        date: monday(),
        time: t(14, 0),
        symptoms: None,
        language: Language::English,
        channel: BookingChannel::Voice,
        call_id: Some(call_id.to_string()),
    }
}

fn clock() -> Arc<FixedClock> {
    Arc::new(FixedClock::at(
        NaiveDate::from_ymd_opt(2026, 2, 8).unwrap(),
        t(9, 0),
    ))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn both_validate_then_exactly_one_commits() {
    let inner = InMemoryScheduleRepository::new();
    let tenant = demo::seed(&inner).await.unwrap();
    let repo = Arc::new(RendezvousRepository {
        inner: inner.clone(),
        racers: 2,
        arrivals: AtomicUsize::new(0),
        barrier: Barrier::new(2),
    });
    let engine = BookingEngine::new(repo, clock(), BookingConfig::default());

    let first = {
        let engine = engine.clone();
        let req = request(&tenant, "9876500001", "call-a");
        tokio::spawn(async move { engine.book_appointment(req).await })
    };
    let second = {
        let engine = engine.clone();
        let req = request(&tenant, "9876500002", "call-b");
        tokio::spawn(async move { engine.book_appointment(req).await })
    };

    let mut results = vec![first.await.unwrap(), second.await.unwrap()];
    results.sort_by_key(Result::is_err);

    let [winner, loser] = <[_; 2]>::try_from(results).unwrap();
    assert!(winner.is_ok());
    let loser = loser.unwrap_err();
    assert!(
        matches!(loser, BookingError::SlotConflict { .. }),
        "expected a commit-time conflict, got {loser:?}"
    );
    let offered: Vec<NaiveTime> = loser.alternatives().iter().map(|s| s.time).collect();
    assert_eq!(offered, vec![t(14, 30), t(15, 0), t(15, 30)]);

    let held = inner
        .list_appointments(AppointmentFilter {
            doctor_id: Some(tenant.doctor_named("Rajesh").unwrap().id),
            date: Some(monday()),
            ..AppointmentFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(held.iter().filter(|a| a.status.holds_slot()).count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_callers_one_slot() {
    let repo = InMemoryScheduleRepository::new();
    let tenant = demo::seed(&repo).await.unwrap();
    let engine = BookingEngine::new(Arc::new(repo.clone()), clock(), BookingConfig::default());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = engine.clone();
            let req = request(&tenant, &format!("98765000{i:02}"), &format!("call-{i}"));
            tokio::spawn(async move { engine.book_appointment(req).await })
        })
        .collect();

    let mut booked = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => booked += 1,
            Err(e) => {
                assert!(e.is_slot_taken(), "unexpected error: {e}");
                assert!(!e.alternatives().is_empty());
            }
        }
    }
    assert_eq!(booked, 1);

    let held = repo
        .booked_times(tenant.doctor_named("Rajesh").unwrap().id, monday())
        .await
        .unwrap();
    assert_eq!(held, vec![t(14, 0)]);
}
