use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use schedule_store::{
    Appointment, AppointmentStatus, Doctor, NewAppointment, ScheduleRepository, StoreError,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{BookingError, BookingResult};
use crate::models::*;
use crate::slots;

/// Availability and booking over a [`ScheduleRepository`].
///
/// The engine validates a request against the current open slots and then
/// relies on the repository's atomic `create_appointment` for the commit, so
/// a race lost between the two steps surfaces as
/// [`BookingError::SlotConflict`] instead of a double booking.
#[derive(Clone)]
pub struct BookingEngine {
    repository: Arc<dyn ScheduleRepository>,
    clock: Arc<dyn Clock>,
    config: BookingConfig,
}

impl BookingEngine {
    pub fn new(
        repository: Arc<dyn ScheduleRepository>,
        clock: Arc<dyn Clock>,
        config: BookingConfig,
    ) -> Self {
        Self {
            repository,
            clock,
            config,
        }
    }

    pub fn repository(&self) -> &Arc<dyn ScheduleRepository> {
        &self.repository
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn config(&self) -> &BookingConfig {
        &self.config
    }

    // =============================================================================
    // Availability
    // =============================================================================

    /// Open slots for a doctor on a date
    pub async fn find_available_slots(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> BookingResult<SlotAvailability> {
        let doctor = self.active_doctor(doctor_id).await?;
        self.availability_for(&doctor, date).await
    }

    /// Up to `count` open slots starting at `date`, scanning forward
    /// `lookahead_days` days
    pub async fn suggest_alternatives(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
        count: usize,
    ) -> BookingResult<Vec<SlotOption>> {
        let doctor = self.active_doctor(doctor_id).await?;
        self.alternatives_for(&doctor, date, None, count).await
    }

    async fn availability_for(
        &self,
        doctor: &Doctor,
        date: NaiveDate,
    ) -> BookingResult<SlotAvailability> {
        if !doctor.schedule.works_on(date.weekday()) {
            return Ok(SlotAvailability::NotAvailableThatDay);
        }
        let booked = self.repository.booked_times(doctor.id, date).await?;
        let open = slots::open_slots(
            &doctor.schedule,
            date,
            self.config.slot_minutes,
            &booked,
            self.clock.now(),
        );
        Ok(SlotAvailability::Open(open))
    }

    /// Open slots near `preferred` on `from`, then the following days in order
    async fn alternatives_for(
        &self,
        doctor: &Doctor,
        from: NaiveDate,
        preferred: Option<NaiveTime>,
        count: usize,
    ) -> BookingResult<Vec<SlotOption>> {
        let mut found = Vec::new();
        let start = from.max(self.clock.today());

        for offset in 0..=i64::from(self.config.lookahead_days) {
            if found.len() >= count {
                break;
            }
            let Some(date) = start.checked_add_signed(Duration::days(offset)) else {
                break;
            };
            let open = match self.availability_for(doctor, date).await? {
                SlotAvailability::Open(open) => open,
                SlotAvailability::NotAvailableThatDay => continue,
            };
            let ordered = match preferred {
                Some(time) if date == from => slots::nearest_first(open, time),
                _ => open,
            };
            found.extend(
                ordered
                    .into_iter()
                    .filter(|t| Some(*t) != preferred || date != from)
                    .map(|time| SlotOption { date, time })
                    .take(count - found.len()),
            );
        }

        Ok(found)
    }

    // =============================================================================
    // Booking
    // =============================================================================

    pub async fn book_appointment(
        &self,
        request: BookingRequest,
    ) -> BookingResult<BookingConfirmation> {
        if request.patient.phone.chars().filter(char::is_ascii_digit).count() < 10 {
            return Err(BookingError::InvalidRequest(
                "patient phone number must have at least 10 digits".to_string(),
            ));
        }

        let doctor = self.active_doctor(request.doctor_id).await?;
        if doctor.hospital_id != request.hospital_id {
            return Err(BookingError::DoctorNotFound(request.doctor_id));
        }

        let availability = self.availability_for(&doctor, request.date).await?;
        if availability == SlotAvailability::NotAvailableThatDay {
            return Err(BookingError::NotAvailableThatDay {
                doctor: doctor.name.clone(),
                date: request.date,
                weekday: request.date.weekday(),
                working_days: doctor.schedule.working_days(),
            });
        }
        if !availability.is_open(request.time) {
            debug!(
                doctor_id = %doctor.id,
                date = %request.date,
                time = %request.time,
                "Requested slot is not open"
            );
            let alternatives = self
                .alternatives_for(&doctor, request.date, Some(request.time), self.config.max_alternatives)
                .await?;
            return Err(BookingError::SlotUnavailable {
                date: request.date,
                time: request.time,
                alternatives,
            });
        }

        let new = NewAppointment {
            hospital_id: request.hospital_id,
            doctor_id: doctor.id,
            specialty: doctor.specialty,
            patient: request.patient,
            date: request.date,
            time: request.time,
            duration_minutes: self.config.slot_minutes,
            status: self.config.initial_status,
            symptoms: request.symptoms.filter(|s| !s.trim().is_empty()),
            language: request.language,
            channel: request.channel,
            call_id: request.call_id,
            number_prefix: self.config.appointment_prefix.clone(),
            booked_on: self.clock.today(),
        };

        match self.repository.create_appointment(new).await {
            Ok(booked) => {
                info!(
                    appointment = %booked.appointment.appointment_number,
                    doctor = %doctor.name,
                    date = %booked.appointment.date,
                    time = %booked.appointment.time,
                    channel = booked.appointment.channel.as_str(),
                    "Appointment booked"
                );
                Ok(BookingConfirmation {
                    appointment: booked.appointment,
                    patient: booked.patient,
                    doctor_name: doctor.name,
                    specialty: doctor.specialty,
                })
            }
            Err(StoreError::SlotTaken { date, time, .. }) => {
                warn!(
                    doctor_id = %doctor.id,
                    %date,
                    %time,
                    "Slot taken by a concurrent booking"
                );
                let alternatives = self
                    .alternatives_for(&doctor, date, Some(time), self.config.max_alternatives)
                    .await?;
                Err(BookingError::SlotConflict {
                    date,
                    time,
                    alternatives,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    // =============================================================================
    // Lifecycle
    // =============================================================================

    pub async fn cancel_appointment(&self, appointment_id: Uuid) -> BookingResult<Appointment> {
        self.update_status(appointment_id, AppointmentStatus::Cancelled)
            .await
    }

    /// Move an appointment forward in its lifecycle; backward moves fail
    /// with `StoreError::InvalidTransition`
    pub async fn update_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
    ) -> BookingResult<Appointment> {
        let appointment = self
            .repository
            .update_appointment_status(appointment_id, status)
            .await?;
        info!(
            appointment = %appointment.appointment_number,
            status = %appointment.status,
            "Appointment status updated"
        );
        Ok(appointment)
    }

    async fn active_doctor(&self, doctor_id: Uuid) -> BookingResult<Doctor> {
        match self.repository.get_doctor(doctor_id).await? {
            Some(doctor) if doctor.is_active => Ok(doctor),
            _ => Err(BookingError::DoctorNotFound(doctor_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{NaiveDateTime, Weekday};
    use schedule_store::{
        demo, BookingChannel, InMemoryScheduleRepository, Language, PatientIdentity,
    };

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    /// Sunday 2026-02-08 20:00, so Monday is "tomorrow"
    fn sunday_evening() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 8).unwrap().and_time(t(20, 0))
    }

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 9).unwrap()
    }

    async fn setup() -> (BookingEngine, demo::DemoTenant, FixedClock) {
        let repo = InMemoryScheduleRepository::new();
        let tenant = demo::seed(&repo).await.unwrap();
        let clock = FixedClock::new(sunday_evening());
        let engine = BookingEngine::new(
            Arc::new(repo),
            Arc::new(clock.clone()),
            BookingConfig::default(),
        );
        (engine, tenant, clock)
    }

    fn request(tenant: &demo::DemoTenant, doctor: &str, date: NaiveDate, time: NaiveTime) -> BookingRequest {
        BookingRequest {
            hospital_id: tenant.hospital.id,
            doctor_id: tenant.doctor_named(doctor).unwrap().id,
            patient: PatientIdentity {
                phone: "+91 98765 43210".to_string(),
                name: Some("Ramesh".to_string()),
                language: Some(Language::Hindi),
            },
            date,
            time,
            symptoms: Some("chest pain".to_string()),
            language: Language::Hindi,
            channel: BookingChannel::Voice,
            call_id: Some("call-1".to_string()),
        }
    }

    #[tokio::test]
    async fn cardiologist_is_not_available_on_tuesday() {
        let (engine, tenant, _) = setup().await;
        let priya = tenant.doctor_named("Priya").unwrap().id;
        let tuesday = monday().succ_opt().unwrap();

        let availability = engine.find_available_slots(priya, tuesday).await.unwrap();
        assert_eq!(availability, SlotAvailability::NotAvailableThatDay);

        let err = engine
            .book_appointment(request(&tenant, "Priya", tuesday, t(10, 0)))
            .await
            .unwrap_err();
        match err {
            BookingError::NotAvailableThatDay { working_days, .. } => {
                assert_eq!(working_days, vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn booking_removes_the_slot_and_numbers_by_booking_day() {
        let (engine, tenant, _) = setup().await;
        let priya = tenant.doctor_named("Priya").unwrap().id;

        let confirmation = engine
            .book_appointment(request(&tenant, "Priya", monday(), t(10, 0)))
            .await
            .unwrap();

        assert_eq!(confirmation.appointment.appointment_number, "MED-20260208-0001");
        assert_eq!(confirmation.appointment.status, AppointmentStatus::Booked);
        assert_eq!(confirmation.doctor_name, "Dr. Priya Patel");
        assert_eq!(confirmation.patient.phone, "9876543210");

        let open = engine.find_available_slots(priya, monday()).await.unwrap();
        assert!(!open.is_open(t(10, 0)));
        assert!(open.is_open(t(10, 30)));
    }

    #[tokio::test]
    async fn taken_slot_offers_nearest_alternatives() {
        let (engine, tenant, _) = setup().await;
        engine
            .book_appointment(request(&tenant, "Priya", monday(), t(10, 30)))
            .await
            .unwrap();

        let err = engine
            .book_appointment(request(&tenant, "Priya", monday(), t(10, 30)))
            .await
            .unwrap_err();

        assert!(err.is_slot_taken());
        assert!(matches!(err, BookingError::SlotUnavailable { .. }));
        let times: Vec<NaiveTime> = err.alternatives().iter().map(|s| s.time).collect();
        assert_eq!(times, vec![t(10, 0), t(11, 0), t(11, 30)]);
    }

    #[tokio::test]
    async fn alternatives_roll_over_to_following_days() {
        let (engine, tenant, _) = setup().await;
        let priya = tenant.doctor_named("Priya").unwrap().id;
        for time in [t(10, 0), t(10, 30), t(11, 0), t(11, 30), t(15, 0), t(15, 30), t(16, 0)] {
            engine
                .book_appointment(request(&tenant, "Priya", monday(), time))
                .await
                .unwrap();
        }

        let suggestions = engine.suggest_alternatives(priya, monday(), 3).await.unwrap();
        let wednesday = monday().succ_opt().unwrap().succ_opt().unwrap();
        assert_eq!(
            suggestions,
            vec![
                SlotOption { date: monday(), time: t(16, 30) },
                SlotOption { date: wednesday, time: t(10, 0) },
                SlotOption { date: wednesday, time: t(10, 30) },
            ]
        );
    }

    #[tokio::test]
    async fn past_slots_today_are_not_offered() {
        let (engine, tenant, clock) = setup().await;
        let rajesh = tenant.doctor_named("Rajesh").unwrap().id;
        clock.set(monday().and_time(t(15, 10)));

        let open = engine.find_available_slots(rajesh, monday()).await.unwrap();
        assert_eq!(open.open_times(), &[t(15, 30), t(16, 0), t(16, 30)]);
    }

    #[tokio::test]
    async fn doctor_from_another_hospital_is_rejected() {
        let (engine, tenant, _) = setup().await;
        let mut req = request(&tenant, "Rajesh", monday(), t(9, 0));
        req.hospital_id = Uuid::new_v4();

        let err = engine.book_appointment(req).await.unwrap_err();
        assert!(matches!(err, BookingError::DoctorNotFound(_)));
    }

    #[tokio::test]
    async fn short_phone_number_is_rejected() {
        let (engine, tenant, _) = setup().await;
        let mut req = request(&tenant, "Rajesh", monday(), t(9, 0));
        req.patient.phone = "12345".to_string();

        let err = engine.book_appointment(req).await.unwrap_err();
        assert!(matches!(err, BookingError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn cancel_reopens_the_slot_and_blocks_further_moves() {
        let (engine, tenant, _) = setup().await;
        let rajesh = tenant.doctor_named("Rajesh").unwrap().id;
        let booked = engine
            .book_appointment(request(&tenant, "Rajesh", monday(), t(9, 0)))
            .await
            .unwrap();

        let cancelled = engine
            .cancel_appointment(booked.appointment.id)
            .await
            .unwrap();
        assert_eq!(cancelled.status, AppointmentStatus::Cancelled);

        let open = engine.find_available_slots(rajesh, monday()).await.unwrap();
        assert!(open.is_open(t(9, 0)));

        let err = engine
            .update_status(booked.appointment.id, AppointmentStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BookingError::Store(StoreError::InvalidTransition { .. })
        ));
    }
}
