use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::conversation::*;
use crate::error::{StoreError, StoreResult};
use crate::models::*;
use crate::repository::*;

type SlotKey = (Uuid, NaiveDate, NaiveTime);

/// In-memory repository for tests, demos and single-node deployments.
///
/// The `slots` index maps every held (doctor, date, time) triple to the
/// appointment holding it. A booking commits inside the vacant-entry guard
/// for its triple, so two bookings for the same slot serialise on that shard
/// and the loser sees the occupied entry.
#[derive(Clone, Default)]
pub struct InMemoryScheduleRepository {
    hospitals: Arc<DashMap<Uuid, Hospital>>,
    doctors: Arc<DashMap<Uuid, Doctor>>,
    patients: Arc<DashMap<Uuid, Patient>>,
    patients_by_phone: Arc<DashMap<String, Uuid>>,
    appointments: Arc<DashMap<Uuid, Appointment>>,
    slots: Arc<DashMap<SlotKey, Uuid>>,
    sequences: Arc<DashMap<NaiveDate, u32>>,
    conversations: Arc<DashMap<String, Conversation>>,
}

impl InMemoryScheduleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the caller's patient record and count the new booking.
    /// Called with the slot entry held.
    fn upsert_patient(&self, identity: &PatientIdentity) -> Patient {
        let phone = normalize_phone(&identity.phone);
        let now = Utc::now();

        let id = match self.patients_by_phone.entry(phone.clone()) {
            Entry::Occupied(existing) => *existing.get(),
            Entry::Vacant(vacant) => {
                let patient = Patient {
                    id: Uuid::new_v4(),
                    phone,
                    name: None,
                    age: None,
                    preferred_language: None,
                    stats: PatientStats::default(),
                    created_at: now,
                    updated_at: now,
                };
                let id = patient.id;
                self.patients.insert(id, patient);
                vacant.insert(id);
                id
            }
        };

        let mut patient = self.patients.entry(id).or_insert_with(|| Patient {
            id,
            phone: normalize_phone(&identity.phone),
            name: None,
            age: None,
            preferred_language: None,
            stats: PatientStats::default(),
            created_at: now,
            updated_at: now,
        });
        if let Some(name) = identity.name.as_ref().filter(|n| !n.trim().is_empty()) {
            patient.name = Some(name.trim().to_string());
        }
        if identity.language.is_some() {
            patient.preferred_language = identity.language;
        }
        patient.stats.total += 1;
        patient.updated_at = now;
        patient.clone()
    }

    fn next_sequence(&self, day: NaiveDate) -> u32 {
        let mut counter = self.sequences.entry(day).or_insert(0);
        *counter += 1;
        *counter
    }

    fn with_conversation<F>(&self, call_id: &str, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut Conversation),
    {
        let mut conversation = self
            .conversations
            .get_mut(call_id)
            .ok_or_else(|| StoreError::not_found("conversation", call_id))?;
        f(&mut conversation);
        Ok(())
    }
}

fn take_limit<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}

#[async_trait]
impl ScheduleRepository for InMemoryScheduleRepository {
    async fn insert_hospital(&self, mut hospital: Hospital) -> StoreResult<Hospital> {
        hospital.inbound_number = normalize_phone(&hospital.inbound_number);
        let clash = self.hospitals.iter().any(|h| {
            h.id != hospital.id
                && (h.inbound_number == hospital.inbound_number || h.slug == hospital.slug)
        });
        if clash {
            return Err(StoreError::Duplicate(format!(
                "hospital with slug '{}' or inbound number already exists",
                hospital.slug
            )));
        }
        self.hospitals.insert(hospital.id, hospital.clone());
        Ok(hospital)
    }

    async fn get_hospital(&self, id: Uuid) -> StoreResult<Option<Hospital>> {
        Ok(self.hospitals.get(&id).map(|h| h.clone()))
    }

    async fn find_hospital_by_inbound_number(
        &self,
        number: &str,
    ) -> StoreResult<Option<Hospital>> {
        let wanted = normalize_phone(number);
        Ok(self
            .hospitals
            .iter()
            .find(|h| h.inbound_number == wanted)
            .map(|h| h.clone()))
    }

    async fn list_hospitals(&self, active_only: bool) -> StoreResult<Vec<Hospital>> {
        let mut hospitals: Vec<Hospital> = self
            .hospitals
            .iter()
            .filter(|h| !active_only || h.is_active)
            .map(|h| h.clone())
            .collect();
        hospitals.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hospitals)
    }

    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor> {
        if !self.hospitals.contains_key(&doctor.hospital_id) {
            return Err(StoreError::not_found("hospital", doctor.hospital_id));
        }
        self.doctors.insert(doctor.id, doctor.clone());
        Ok(doctor)
    }

    async fn get_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        Ok(self.doctors.get(&id).map(|d| d.clone()))
    }

    async fn list_doctors(&self, filter: DoctorFilter) -> StoreResult<Vec<Doctor>> {
        let mut doctors: Vec<Doctor> = self
            .doctors
            .iter()
            .filter(|d| {
                filter.hospital_id.map_or(true, |id| d.hospital_id == id)
                    && filter.specialty.map_or(true, |s| d.specialty == s)
                    && (!filter.active_only || d.is_active)
            })
            .map(|d| d.clone())
            .collect();
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }

    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        Ok(self.patients.get(&id).map(|p| p.clone()))
    }

    async fn find_patient_by_phone(&self, phone: &str) -> StoreResult<Option<Patient>> {
        let normalized = normalize_phone(phone);
        let id = self.patients_by_phone.get(&normalized).map(|id| *id);
        Ok(id.and_then(|id| self.patients.get(&id).map(|p| p.clone())))
    }

    async fn search_patients(
        &self,
        query: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Patient>> {
        let needle = query.map(|q| q.trim().to_lowercase()).filter(|q| !q.is_empty());
        let mut patients: Vec<Patient> = self
            .patients
            .iter()
            .filter(|p| match &needle {
                None => true,
                Some(needle) => {
                    p.phone.contains(needle.as_str())
                        || p.name
                            .as_ref()
                            .is_some_and(|n| n.to_lowercase().contains(needle.as_str()))
                }
            })
            .map(|p| p.clone())
            .collect();
        patients.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        patients.truncate(limit);
        Ok(patients)
    }

    async fn create_appointment(&self, new: NewAppointment) -> StoreResult<BookedAppointment> {
        let key = (new.doctor_id, new.date, new.time);

        match self.slots.entry(key) {
            Entry::Occupied(_) => Err(StoreError::SlotTaken {
                doctor_id: new.doctor_id,
                date: new.date,
                time: new.time,
            }),
            Entry::Vacant(slot) => {
                let patient = self.upsert_patient(&new.patient);
                let sequence = self.next_sequence(new.booked_on);
                let now = Utc::now();

                let appointment = Appointment {
                    id: Uuid::new_v4(),
                    appointment_number: format_appointment_number(
                        &new.number_prefix,
                        new.booked_on,
                        sequence,
                    ),
                    hospital_id: new.hospital_id,
                    doctor_id: new.doctor_id,
                    patient_id: patient.id,
                    patient_phone: patient.phone.clone(),
                    date: new.date,
                    time: new.time,
                    duration_minutes: new.duration_minutes,
                    specialty: new.specialty,
                    status: new.status,
                    symptoms: new.symptoms,
                    language: new.language,
                    channel: new.channel,
                    call_id: new.call_id,
                    created_at: now,
                    updated_at: now,
                };

                self.appointments.insert(appointment.id, appointment.clone());
                slot.insert(appointment.id);

                Ok(BookedAppointment {
                    appointment,
                    patient,
                })
            }
        }
    }

    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        Ok(self.appointments.get(&id).map(|a| a.clone()))
    }

    async fn list_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> StoreResult<Vec<Appointment>> {
        let mut appointments: Vec<Appointment> = self
            .appointments
            .iter()
            .filter(|a| filter.matches(a))
            .map(|a| a.clone())
            .collect();
        appointments.sort_by_key(|a| (a.date, a.time, a.created_at));
        Ok(take_limit(appointments, filter.limit))
    }

    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<NaiveTime>> {
        let mut times: Vec<NaiveTime> = self
            .appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id && a.date == date && a.status.holds_slot())
            .map(|a| a.time)
            .collect();
        times.sort();
        times.dedup();
        Ok(times)
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        // Guard released before the patient and slot maps are touched
        let updated = {
            let mut appointment = self
                .appointments
                .get_mut(&id)
                .ok_or_else(|| StoreError::not_found("appointment", id))?;
            if !appointment.status.can_transition_to(status) {
                return Err(StoreError::InvalidTransition {
                    from: appointment.status,
                    to: status,
                });
            }
            appointment.status = status;
            appointment.updated_at = Utc::now();
            appointment.clone()
        };

        if let Some(mut patient) = self.patients.get_mut(&updated.patient_id) {
            patient.stats.record_transition(status);
            patient.updated_at = Utc::now();
        }

        if !status.holds_slot() {
            self.slots
                .remove_if(&(updated.doctor_id, updated.date, updated.time), |_, holder| {
                    *holder == id
                });
        }

        Ok(updated)
    }

    async fn appointment_stats(
        &self,
        hospital_id: Option<Uuid>,
        today: NaiveDate,
    ) -> StoreResult<AppointmentStats> {
        let mut stats = AppointmentStats::default();
        for appointment in self.appointments.iter() {
            if hospital_id.is_some_and(|id| appointment.hospital_id != id) {
                continue;
            }
            stats.total += 1;
            if appointment.date == today {
                stats.today += 1;
            }
            *stats.by_status.entry(appointment.status).or_insert(0) += 1;
        }
        Ok(stats)
    }

    async fn create_conversation(&self, new: NewConversation) -> StoreResult<Conversation> {
        match self.conversations.entry(new.call_id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(format!(
                "conversation for call {}",
                new.call_id
            ))),
            Entry::Vacant(vacant) => {
                let now = Utc::now();
                let conversation = Conversation {
                    id: Uuid::new_v4(),
                    call_id: new.call_id,
                    hospital_id: new.hospital_id,
                    hospital_name: new.hospital_name,
                    caller_number: normalize_phone(&new.caller_number),
                    dialed_number: new.dialed_number,
                    language: None,
                    state: new.state,
                    turns: Vec::new(),
                    collected: serde_json::Value::Null,
                    outcome: ConversationOutcome::default(),
                    status: ConversationStatus::InProgress,
                    provider_status: None,
                    duration_secs: None,
                    billing: CallBilling {
                        billable: true,
                        amount: new.billing_amount,
                        currency: new.currency,
                        billed: false,
                    },
                    started_at: now,
                    ended_at: None,
                    updated_at: now,
                };
                vacant.insert(conversation.clone());
                Ok(conversation)
            }
        }
    }

    async fn get_conversation(&self, call_id: &str) -> StoreResult<Option<Conversation>> {
        Ok(self.conversations.get(call_id).map(|c| c.clone()))
    }

    async fn set_conversation_language(
        &self,
        call_id: &str,
        language: Language,
    ) -> StoreResult<()> {
        self.with_conversation(call_id, |c| {
            c.language = Some(language);
            c.updated_at = Utc::now();
        })
    }

    async fn append_turn(&self, call_id: &str, turn: ConversationTurn) -> StoreResult<()> {
        self.with_conversation(call_id, |c| {
            c.state = turn.state.clone();
            c.turns.push(turn);
            c.updated_at = Utc::now();
        })
    }

    async fn record_outcome(&self, call_id: &str, update: OutcomeUpdate) -> StoreResult<()> {
        self.with_conversation(call_id, |c| update.apply(c))
    }

    async fn complete_conversation(
        &self,
        call_id: &str,
        completion: CallCompletion,
    ) -> StoreResult<Conversation> {
        let mut conversation = self
            .conversations
            .get_mut(call_id)
            .ok_or_else(|| StoreError::not_found("conversation", call_id))?;
        completion.apply(&mut conversation);
        Ok(conversation.clone())
    }

    async fn list_conversations(
        &self,
        filter: ConversationFilter,
    ) -> StoreResult<Vec<Conversation>> {
        let mut conversations: Vec<Conversation> = self
            .conversations
            .iter()
            .filter(|c| filter.matches(c))
            .map(|c| c.clone())
            .collect();
        conversations.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(take_limit(conversations, filter.limit))
    }

    async fn call_stats(&self, hospital_id: Option<Uuid>) -> StoreResult<CallStats> {
        let mut stats = CallStats::default();
        for conversation in self.conversations.iter() {
            if hospital_id.is_some_and(|id| conversation.hospital_id != Some(id)) {
                continue;
            }
            stats.total_calls += 1;
            if conversation.outcome.booking_successful {
                stats.successful_bookings += 1;
            }
            if conversation.outcome.escalated {
                stats.escalated += 1;
            }
            if conversation.billing.billable {
                stats.billable_amount += conversation.billing.amount;
            }
        }
        Ok(stats)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    fn request(doctor: &Doctor, phone: &str, time: NaiveTime) -> NewAppointment {
        NewAppointment {
            hospital_id: doctor.hospital_id,
            doctor_id: doctor.id,
            specialty: doctor.specialty,
            patient: PatientIdentity {
                phone: phone.to_string(),
                name: Some("Asha".to_string()),
                language: Some(Language::Hindi),
            },
            date: fixtures::monday(),
            time,
            duration_minutes: 30,
            status: AppointmentStatus::Booked,
            symptoms: None,
            language: Language::Hindi,
            channel: BookingChannel::Voice,
            call_id: None,
            number_prefix: "MED".to_string(),
            booked_on: fixtures::monday(),
        }
    }

    #[tokio::test]
    async fn test_same_slot_is_rejected() {
        let repo = InMemoryScheduleRepository::new();
        let (_, doctor) = fixtures::seed_one(&repo).await;
        let ten = fixtures::time(10, 0);

        let first = repo.create_appointment(request(&doctor, "9876543210", ten)).await;
        let second = repo.create_appointment(request(&doctor, "9123456789", ten)).await;

        assert!(first.is_ok());
        assert!(matches!(second, Err(StoreError::SlotTaken { .. })));
        assert_eq!(repo.booked_times(doctor.id, fixtures::monday()).await.unwrap(), vec![ten]);
    }

    #[tokio::test]
    async fn test_concurrent_bookings_one_winner() {
        let repo = InMemoryScheduleRepository::new();
        let (_, doctor) = fixtures::seed_one(&repo).await;
        let ten = fixtures::time(10, 0);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let repo = repo.clone();
                let req = request(&doctor, &format!("98765432{i:02}"), ten);
                tokio::spawn(async move { repo.create_appointment(req).await })
            })
            .collect();

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn test_numbers_are_sequential_per_day() {
        let repo = InMemoryScheduleRepository::new();
        let (_, doctor) = fixtures::seed_one(&repo).await;

        let a = repo
            .create_appointment(request(&doctor, "9876543210", fixtures::time(10, 0)))
            .await
            .unwrap();
        let b = repo
            .create_appointment(request(&doctor, "9876543210", fixtures::time(10, 30)))
            .await
            .unwrap();

        assert!(a.appointment.appointment_number.ends_with("-0001"));
        assert!(b.appointment.appointment_number.ends_with("-0002"));
        assert_eq!(a.patient.id, b.patient.id);
        assert_eq!(b.patient.stats.total, 2);
    }

    #[tokio::test]
    async fn test_cancel_frees_slot_and_counts() {
        let repo = InMemoryScheduleRepository::new();
        let (_, doctor) = fixtures::seed_one(&repo).await;
        let ten = fixtures::time(10, 0);

        let booked = repo
            .create_appointment(request(&doctor, "+91 98765 43210", ten))
            .await
            .unwrap();
        repo.update_appointment_status(booked.appointment.id, AppointmentStatus::Cancelled)
            .await
            .unwrap();

        assert!(repo.booked_times(doctor.id, fixtures::monday()).await.unwrap().is_empty());
        let patient = repo.find_patient_by_phone("9876543210").await.unwrap().unwrap();
        assert_eq!(patient.stats.cancelled, 1);
        assert_eq!(patient.stats.total, 1);

        // Slot can be re-booked once cancelled
        assert!(repo
            .create_appointment(request(&doctor, "9123456789", ten))
            .await
            .is_ok());

        let err = repo
            .update_appointment_status(booked.appointment.id, AppointmentStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_unknown_number_falls_back_to_single_hospital() {
        let repo = InMemoryScheduleRepository::new();
        let (hospital, _) = fixtures::seed_one(&repo).await;

        let by_number = repo.resolve_hospital_for_call(Some("011-40036376")).await.unwrap();
        assert_eq!(by_number.map(|h| h.id), Some(hospital.id));

        let fallback = repo.resolve_hospital_for_call(Some("+912222222222")).await.unwrap();
        assert_eq!(fallback.map(|h| h.id), Some(hospital.id));

        let mut second = fixtures::hospital("second", "02200000000");
        second.id = Uuid::new_v4();
        repo.insert_hospital(second).await.unwrap();
        assert!(repo.resolve_hospital_for_call(None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conversation_lifecycle() {
        let repo = InMemoryScheduleRepository::new();
        repo.create_conversation(NewConversation {
            call_id: "CA1".to_string(),
            hospital_id: None,
            hospital_name: None,
            caller_number: "09876543210".to_string(),
            dialed_number: None,
            state: "language_select".to_string(),
            billing_amount: 50,
            currency: "INR".to_string(),
        })
        .await
        .unwrap();

        repo.append_turn(
            "CA1",
            ConversationTurn {
                utterance: "kal heart doctor".to_string(),
                response: "Dr. Priya Patel".to_string(),
                state: "collecting".to_string(),
                at: Utc::now(),
            },
        )
        .await
        .unwrap();
        repo.record_outcome("CA1", OutcomeUpdate::escalated("escalated", "max turns"))
            .await
            .unwrap();

        let done = repo
            .complete_conversation(
                "CA1",
                CallCompletion {
                    provider_status: Some("completed".to_string()),
                    duration_secs: Some(42),
                    ended_at: Utc::now(),
                },
            )
            .await
            .unwrap();

        assert_eq!(done.caller_number, "9876543210");
        assert_eq!(done.turns.len(), 1);
        assert_eq!(done.state, "escalated");
        assert!(done.outcome.escalated);
        assert_eq!(done.status, ConversationStatus::Completed);
        assert_eq!(done.duration_secs, Some(42));

        let stats = repo.call_stats(None).await.unwrap();
        assert_eq!(stats.total_calls, 1);
        assert_eq!(stats.escalated, 1);
        assert_eq!(stats.billable_amount, 50);
    }
}
