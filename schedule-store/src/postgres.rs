use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use crate::connection::DatabasePool;
use crate::conversation::*;
use crate::error::{StoreError, StoreResult};
use crate::models::*;
use crate::repository::*;

const ACTIVE_SLOT_INDEX: &str = "appointments_active_slot";

const HOSPITAL_COLUMNS: &str = "id, name, slug, phone_number, inbound_number, address, email, \
     working_hours_start, working_hours_end, working_days, default_language, greeting_hi, \
     greeting_en, cost_per_call, currency, is_active, created_at, updated_at";

const DOCTOR_COLUMNS: &str = "id, hospital_id, name, specialty, qualification, experience_years, \
     consultation_fee, languages, schedule, is_active, created_at, updated_at";

const PATIENT_COLUMNS: &str = "id, phone, name, age, preferred_language, total_appointments, \
     completed_appointments, cancelled_appointments, no_show_count, created_at, updated_at";

const APPOINTMENT_COLUMNS: &str = "id, appointment_number, hospital_id, doctor_id, patient_id, \
     patient_phone, appointment_date, appointment_time, duration_minutes, specialty, status, \
     symptoms, language, channel, call_id, created_at, updated_at";

const CONVERSATION_COLUMNS: &str = "id, call_id, hospital_id, hospital_name, caller_number, \
     dialed_number, language, state, turns, collected, booking_successful, appointment_id, \
     escalated, escalation_reason, error, status, provider_status, duration_secs, billable, \
     billing_amount, currency, billed, started_at, ended_at, updated_at";

/// sqlx-backed repository.
///
/// The no-double-booking rule is the partial unique index
/// `appointments_active_slot`; a unique violation on it becomes
/// [`StoreError::SlotTaken`].
#[derive(Clone)]
pub struct PostgresScheduleRepository {
    db: DatabasePool,
}

impl PostgresScheduleRepository {
    pub fn new(db: DatabasePool) -> Self {
        Self { db }
    }
}

fn parse_column<T: FromStr<Err = String>>(row: &PgRow, column: &str) -> StoreResult<T> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(StoreError::Corrupt)
}

fn parse_optional<T: FromStr<Err = String>>(row: &PgRow, column: &str) -> StoreResult<Option<T>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| s.parse().map_err(StoreError::Corrupt)).transpose()
}

fn to_u32(value: i32, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {column}: {value}")))
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u64(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

fn limit_param(limit: Option<usize>) -> Option<i64> {
    limit.map(|l| i64::try_from(l).unwrap_or(i64::MAX))
}

fn hospital_from_row(row: &PgRow) -> StoreResult<Hospital> {
    let working_days: Json<Vec<Weekday>> = row.try_get("working_days")?;
    Ok(Hospital {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        phone_number: row.try_get("phone_number")?,
        inbound_number: row.try_get("inbound_number")?,
        address: row.try_get("address")?,
        email: row.try_get("email")?,
        working_hours: WorkingHours {
            start: row.try_get("working_hours_start")?,
            end: row.try_get("working_hours_end")?,
        },
        working_days: working_days.0,
        default_language: parse_column(row, "default_language")?,
        greetings: Greetings {
            hindi: row.try_get("greeting_hi")?,
            english: row.try_get("greeting_en")?,
        },
        cost_per_call: row.try_get("cost_per_call")?,
        currency: row.try_get("currency")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn doctor_from_row(row: &PgRow) -> StoreResult<Doctor> {
    let languages: Json<Vec<Language>> = row.try_get("languages")?;
    let schedule: Json<Vec<AvailabilityWindow>> = row.try_get("schedule")?;
    Ok(Doctor {
        id: row.try_get("id")?,
        hospital_id: row.try_get("hospital_id")?,
        name: row.try_get("name")?,
        specialty: parse_column(row, "specialty")?,
        qualification: row.try_get("qualification")?,
        experience_years: to_u32(row.try_get("experience_years")?, "experience_years")?,
        consultation_fee: row.try_get("consultation_fee")?,
        languages: languages.0,
        schedule: WeeklySchedule::new(schedule.0)?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn patient_from_row(row: &PgRow) -> StoreResult<Patient> {
    let age: Option<i32> = row.try_get("age")?;
    Ok(Patient {
        id: row.try_get("id")?,
        phone: row.try_get("phone")?,
        name: row.try_get("name")?,
        age: age.map(|a| to_u32(a, "age")).transpose()?,
        preferred_language: parse_optional(row, "preferred_language")?,
        stats: PatientStats {
            total: to_u32(row.try_get("total_appointments")?, "total_appointments")?,
            completed: to_u32(row.try_get("completed_appointments")?, "completed_appointments")?,
            cancelled: to_u32(row.try_get("cancelled_appointments")?, "cancelled_appointments")?,
            no_show: to_u32(row.try_get("no_show_count")?, "no_show_count")?,
        },
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn appointment_from_row(row: &PgRow) -> StoreResult<Appointment> {
    Ok(Appointment {
        id: row.try_get("id")?,
        appointment_number: row.try_get("appointment_number")?,
        hospital_id: row.try_get("hospital_id")?,
        doctor_id: row.try_get("doctor_id")?,
        patient_id: row.try_get("patient_id")?,
        patient_phone: row.try_get("patient_phone")?,
        date: row.try_get("appointment_date")?,
        time: row.try_get("appointment_time")?,
        duration_minutes: to_u32(row.try_get("duration_minutes")?, "duration_minutes")?,
        specialty: parse_column(row, "specialty")?,
        status: parse_column(row, "status")?,
        symptoms: row.try_get("symptoms")?,
        language: parse_column(row, "language")?,
        channel: parse_column(row, "channel")?,
        call_id: row.try_get("call_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn conversation_from_row(row: &PgRow) -> StoreResult<Conversation> {
    let turns: Json<Vec<ConversationTurn>> = row.try_get("turns")?;
    let duration: Option<i32> = row.try_get("duration_secs")?;
    Ok(Conversation {
        id: row.try_get("id")?,
        call_id: row.try_get("call_id")?,
        hospital_id: row.try_get("hospital_id")?,
        hospital_name: row.try_get("hospital_name")?,
        caller_number: row.try_get("caller_number")?,
        dialed_number: row.try_get("dialed_number")?,
        language: parse_optional(row, "language")?,
        state: row.try_get("state")?,
        turns: turns.0,
        collected: row.try_get("collected")?,
        outcome: ConversationOutcome {
            booking_successful: row.try_get("booking_successful")?,
            appointment_id: row.try_get("appointment_id")?,
            escalated: row.try_get("escalated")?,
            escalation_reason: row.try_get("escalation_reason")?,
            error: row.try_get("error")?,
        },
        status: parse_column(row, "status")?,
        provider_status: row.try_get("provider_status")?,
        duration_secs: duration.map(|d| to_u32(d, "duration_secs")).transpose()?,
        billing: CallBilling {
            billable: row.try_get("billable")?,
            amount: row.try_get("billing_amount")?,
            currency: row.try_get("currency")?,
            billed: row.try_get("billed")?,
        },
        started_at: row.try_get("started_at")?,
        ended_at: row.try_get("ended_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn is_unique_violation(error: &sqlx::Error, constraint: Option<&str>) -> bool {
    match error {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505")
                && constraint.map_or(true, |c| db.constraint() == Some(c))
        }
        _ => false,
    }
}

#[async_trait]
impl ScheduleRepository for PostgresScheduleRepository {
    async fn insert_hospital(&self, hospital: Hospital) -> StoreResult<Hospital> {
        let sql = format!(
            "INSERT INTO hospitals ({HOSPITAL_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {HOSPITAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(hospital.id)
            .bind(&hospital.name)
            .bind(&hospital.slug)
            .bind(&hospital.phone_number)
            .bind(normalize_phone(&hospital.inbound_number))
            .bind(&hospital.address)
            .bind(&hospital.email)
            .bind(hospital.working_hours.start)
            .bind(hospital.working_hours.end)
            .bind(Json(&hospital.working_days))
            .bind(hospital.default_language.code())
            .bind(&hospital.greetings.hindi)
            .bind(&hospital.greetings.english)
            .bind(hospital.cost_per_call)
            .bind(&hospital.currency)
            .bind(hospital.is_active)
            .bind(hospital.created_at)
            .bind(hospital.updated_at)
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| {
                if is_unique_violation(&e, None) {
                    StoreError::Duplicate(format!("hospital '{}'", hospital.slug))
                } else {
                    e.into()
                }
            })?;
        hospital_from_row(&row)
    }

    async fn get_hospital(&self, id: Uuid) -> StoreResult<Option<Hospital>> {
        let sql = format!("SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(hospital_from_row).transpose()
    }

    async fn find_hospital_by_inbound_number(
        &self,
        number: &str,
    ) -> StoreResult<Option<Hospital>> {
        let sql = format!("SELECT {HOSPITAL_COLUMNS} FROM hospitals WHERE inbound_number = $1");
        let row = sqlx::query(&sql)
            .bind(normalize_phone(number))
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(hospital_from_row).transpose()
    }

    async fn list_hospitals(&self, active_only: bool) -> StoreResult<Vec<Hospital>> {
        let sql = format!(
            "SELECT {HOSPITAL_COLUMNS} FROM hospitals \
             WHERE ($1 = FALSE OR is_active) ORDER BY name ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(active_only)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(hospital_from_row).collect()
    }

    async fn insert_doctor(&self, doctor: Doctor) -> StoreResult<Doctor> {
        let sql = format!(
            "INSERT INTO doctors ({DOCTOR_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {DOCTOR_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(doctor.id)
            .bind(doctor.hospital_id)
            .bind(&doctor.name)
            .bind(doctor.specialty.as_str())
            .bind(&doctor.qualification)
            .bind(to_i32(doctor.experience_years))
            .bind(doctor.consultation_fee)
            .bind(Json(&doctor.languages))
            .bind(Json(doctor.schedule.windows()))
            .bind(doctor.is_active)
            .bind(doctor.created_at)
            .bind(doctor.updated_at)
            .fetch_one(self.db.pool())
            .await?;
        doctor_from_row(&row)
    }

    async fn get_doctor(&self, id: Uuid) -> StoreResult<Option<Doctor>> {
        let sql = format!("SELECT {DOCTOR_COLUMNS} FROM doctors WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(doctor_from_row).transpose()
    }

    async fn list_doctors(&self, filter: DoctorFilter) -> StoreResult<Vec<Doctor>> {
        let sql = format!(
            "SELECT {DOCTOR_COLUMNS} FROM doctors \
             WHERE ($1::uuid IS NULL OR hospital_id = $1) \
               AND ($2::text IS NULL OR specialty = $2) \
               AND ($3 = FALSE OR is_active) \
             ORDER BY name ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.hospital_id)
            .bind(filter.specialty.map(|s| s.as_str()))
            .bind(filter.active_only)
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(doctor_from_row).collect()
    }

    async fn get_patient(&self, id: Uuid) -> StoreResult<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(patient_from_row).transpose()
    }

    async fn find_patient_by_phone(&self, phone: &str) -> StoreResult<Option<Patient>> {
        let sql = format!("SELECT {PATIENT_COLUMNS} FROM patients WHERE phone = $1");
        let row = sqlx::query(&sql)
            .bind(normalize_phone(phone))
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(patient_from_row).transpose()
    }

    async fn search_patients(
        &self,
        query: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Patient>> {
        let pattern = query
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(|q| format!("%{q}%"));
        let sql = format!(
            "SELECT {PATIENT_COLUMNS} FROM patients \
             WHERE ($1::text IS NULL OR phone LIKE $1 OR name ILIKE $1) \
             ORDER BY created_at DESC LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(pattern)
            .bind(limit_param(Some(limit)))
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(patient_from_row).collect()
    }

    async fn create_appointment(&self, new: NewAppointment) -> StoreResult<BookedAppointment> {
        let mut tx = self.db.pool().begin().await?;
        let now = Utc::now();

        let patient_sql = format!(
            "INSERT INTO patients (id, phone, name, preferred_language, total_appointments, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, 1, $5, $5) \
             ON CONFLICT (phone) DO UPDATE SET \
                 name = COALESCE(EXCLUDED.name, patients.name), \
                 preferred_language = COALESCE(EXCLUDED.preferred_language, patients.preferred_language), \
                 total_appointments = patients.total_appointments + 1, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING {PATIENT_COLUMNS}"
        );
        let patient_row = sqlx::query(&patient_sql)
            .bind(Uuid::new_v4())
            .bind(normalize_phone(&new.patient.phone))
            .bind(
                new.patient
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty()),
            )
            .bind(new.patient.language.map(|l| l.code()))
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;
        let patient = patient_from_row(&patient_row)?;

        let sequence: i32 = sqlx::query_scalar(
            "INSERT INTO appointment_sequences (booking_day, last_value) VALUES ($1, 1) \
             ON CONFLICT (booking_day) DO UPDATE \
                 SET last_value = appointment_sequences.last_value + 1 \
             RETURNING last_value",
        )
        .bind(new.booked_on)
        .fetch_one(&mut *tx)
        .await?;

        let number = format_appointment_number(
            &new.number_prefix,
            new.booked_on,
            to_u32(sequence, "last_value")?,
        );

        let insert_sql = format!(
            "INSERT INTO appointments ({APPOINTMENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $16) \
             RETURNING {APPOINTMENT_COLUMNS}"
        );
        let inserted = sqlx::query(&insert_sql)
            .bind(Uuid::new_v4())
            .bind(&number)
            .bind(new.hospital_id)
            .bind(new.doctor_id)
            .bind(patient.id)
            .bind(&patient.phone)
            .bind(new.date)
            .bind(new.time)
            .bind(to_i32(new.duration_minutes))
            .bind(new.specialty.as_str())
            .bind(new.status.as_str())
            .bind(&new.symptoms)
            .bind(new.language.code())
            .bind(new.channel.as_str())
            .bind(&new.call_id)
            .bind(now)
            .fetch_one(&mut *tx)
            .await;

        let row = match inserted {
            Ok(row) => row,
            Err(e) if is_unique_violation(&e, Some(ACTIVE_SLOT_INDEX)) => {
                // Dropping the transaction rolls back the patient and sequence bumps
                return Err(StoreError::SlotTaken {
                    doctor_id: new.doctor_id,
                    date: new.date,
                    time: new.time,
                });
            }
            Err(e) => return Err(e.into()),
        };
        let appointment = appointment_from_row(&row)?;

        tx.commit().await?;

        Ok(BookedAppointment {
            appointment,
            patient,
        })
    }

    async fn get_appointment(&self, id: Uuid) -> StoreResult<Option<Appointment>> {
        let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(appointment_from_row).transpose()
    }

    async fn list_appointments(
        &self,
        filter: AppointmentFilter,
    ) -> StoreResult<Vec<Appointment>> {
        let sql = format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
             WHERE ($1::uuid IS NULL OR hospital_id = $1) \
               AND ($2::uuid IS NULL OR doctor_id = $2) \
               AND ($3::uuid IS NULL OR patient_id = $3) \
               AND ($4::date IS NULL OR appointment_date = $4) \
               AND ($5::text IS NULL OR status = $5) \
             ORDER BY appointment_date, appointment_time, created_at \
             LIMIT $6"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.hospital_id)
            .bind(filter.doctor_id)
            .bind(filter.patient_id)
            .bind(filter.date)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(limit_param(filter.limit))
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(appointment_from_row).collect()
    }

    async fn booked_times(
        &self,
        doctor_id: Uuid,
        date: NaiveDate,
    ) -> StoreResult<Vec<NaiveTime>> {
        let times = sqlx::query_scalar::<_, NaiveTime>(
            "SELECT DISTINCT appointment_time FROM appointments \
             WHERE doctor_id = $1 AND appointment_date = $2 AND status <> 'cancelled' \
             ORDER BY appointment_time",
        )
        .bind(doctor_id)
        .bind(date)
        .fetch_all(self.db.pool())
        .await?;
        Ok(times)
    }

    async fn update_appointment_status(
        &self,
        id: Uuid,
        status: AppointmentStatus,
    ) -> StoreResult<Appointment> {
        let mut tx = self.db.pool().begin().await?;

        let current: Option<String> =
            sqlx::query_scalar("SELECT status FROM appointments WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        let current: AppointmentStatus = current
            .ok_or_else(|| StoreError::not_found("appointment", id))?
            .parse()
            .map_err(StoreError::Corrupt)?;

        if !current.can_transition_to(status) {
            return Err(StoreError::InvalidTransition {
                from: current,
                to: status,
            });
        }

        let sql = format!(
            "UPDATE appointments SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING {APPOINTMENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await?;
        let appointment = appointment_from_row(&row)?;

        sqlx::query(
            "UPDATE patients SET \
                 completed_appointments = completed_appointments + CASE WHEN $2 = 'completed' THEN 1 ELSE 0 END, \
                 cancelled_appointments = cancelled_appointments + CASE WHEN $2 = 'cancelled' THEN 1 ELSE 0 END, \
                 no_show_count = no_show_count + CASE WHEN $2 = 'no_show' THEN 1 ELSE 0 END, \
                 updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(appointment.patient_id)
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(appointment)
    }

    async fn appointment_stats(
        &self,
        hospital_id: Option<Uuid>,
        today: NaiveDate,
    ) -> StoreResult<AppointmentStats> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*)::BIGINT AS total, \
                    COUNT(*) FILTER (WHERE appointment_date = $2)::BIGINT AS today \
             FROM appointments \
             WHERE ($1::uuid IS NULL OR hospital_id = $1) \
             GROUP BY status",
        )
        .bind(hospital_id)
        .bind(today)
        .fetch_all(self.db.pool())
        .await?;

        let mut stats = AppointmentStats::default();
        for row in &rows {
            let status: AppointmentStatus = parse_column(row, "status")?;
            let total = to_u64(row.try_get("total")?);
            stats.total += total;
            stats.today += to_u64(row.try_get("today")?);
            stats.by_status.insert(status, total);
        }
        Ok(stats)
    }

    async fn create_conversation(&self, new: NewConversation) -> StoreResult<Conversation> {
        let sql = format!(
            "INSERT INTO conversations (id, call_id, hospital_id, hospital_name, caller_number, \
                 dialed_number, state, billing_amount, currency) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {CONVERSATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.call_id)
            .bind(new.hospital_id)
            .bind(&new.hospital_name)
            .bind(normalize_phone(&new.caller_number))
            .bind(&new.dialed_number)
            .bind(&new.state)
            .bind(new.billing_amount)
            .bind(&new.currency)
            .fetch_one(self.db.pool())
            .await
            .map_err(|e| {
                if is_unique_violation(&e, None) {
                    StoreError::Duplicate(format!("conversation for call {}", new.call_id))
                } else {
                    e.into()
                }
            })?;
        conversation_from_row(&row)
    }

    async fn get_conversation(&self, call_id: &str) -> StoreResult<Option<Conversation>> {
        let sql = format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE call_id = $1");
        let row = sqlx::query(&sql)
            .bind(call_id)
            .fetch_optional(self.db.pool())
            .await?;
        row.as_ref().map(conversation_from_row).transpose()
    }

    async fn set_conversation_language(
        &self,
        call_id: &str,
        language: Language,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET language = $2, updated_at = NOW() WHERE call_id = $1",
        )
        .bind(call_id)
        .bind(language.code())
        .execute(self.db.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("conversation", call_id));
        }
        Ok(())
    }

    async fn append_turn(&self, call_id: &str, turn: ConversationTurn) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE conversations SET turns = turns || $2, state = $3, updated_at = NOW() \
             WHERE call_id = $1",
        )
        .bind(call_id)
        .bind(Json(vec![&turn]))
        .bind(&turn.state)
        .execute(self.db.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("conversation", call_id));
        }
        Ok(())
    }

    async fn record_outcome(&self, call_id: &str, update: OutcomeUpdate) -> StoreResult<()> {
        let escalated = update.escalation_reason.is_some();
        let result = sqlx::query(
            "UPDATE conversations SET \
                 state = COALESCE($2, state), \
                 collected = COALESCE($3, collected), \
                 appointment_id = COALESCE($4, appointment_id), \
                 booking_successful = COALESCE($5, booking_successful), \
                 escalated = escalated OR $6, \
                 escalation_reason = COALESCE($7, escalation_reason), \
                 error = COALESCE($8, error), \
                 updated_at = NOW() \
             WHERE call_id = $1",
        )
        .bind(call_id)
        .bind(update.state)
        .bind(update.collected)
        .bind(update.appointment_id)
        .bind(update.booking_successful)
        .bind(escalated)
        .bind(update.escalation_reason)
        .bind(update.error)
        .execute(self.db.pool())
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("conversation", call_id));
        }
        Ok(())
    }

    async fn complete_conversation(
        &self,
        call_id: &str,
        completion: CallCompletion,
    ) -> StoreResult<Conversation> {
        let status =
            ConversationStatus::from_provider_status(completion.provider_status.as_deref());
        let ended_at: DateTime<Utc> = completion.ended_at;
        let sql = format!(
            "UPDATE conversations SET \
                 status = $2, \
                 provider_status = $3, \
                 duration_secs = COALESCE($4, GREATEST(0, EXTRACT(EPOCH FROM ($5 - started_at)))::INTEGER), \
                 ended_at = $5, \
                 updated_at = NOW() \
             WHERE call_id = $1 \
             RETURNING {CONVERSATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(call_id)
            .bind(status.as_str())
            .bind(&completion.provider_status)
            .bind(completion.duration_secs.map(to_i32))
            .bind(ended_at)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| StoreError::not_found("conversation", call_id))?;
        conversation_from_row(&row)
    }

    async fn list_conversations(
        &self,
        filter: ConversationFilter,
    ) -> StoreResult<Vec<Conversation>> {
        let sql = format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations \
             WHERE ($1::uuid IS NULL OR hospital_id = $1) \
               AND ($2::text IS NULL OR status = $2) \
             ORDER BY started_at DESC \
             LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.hospital_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(limit_param(filter.limit))
            .fetch_all(self.db.pool())
            .await?;
        rows.iter().map(conversation_from_row).collect()
    }

    async fn call_stats(&self, hospital_id: Option<Uuid>) -> StoreResult<CallStats> {
        let row = sqlx::query(
            "SELECT COUNT(*)::BIGINT AS total_calls, \
                    COUNT(*) FILTER (WHERE booking_successful)::BIGINT AS successful_bookings, \
                    COUNT(*) FILTER (WHERE escalated)::BIGINT AS escalated, \
                    COALESCE(SUM(billing_amount) FILTER (WHERE billable), 0)::BIGINT AS billable_amount \
             FROM conversations \
             WHERE ($1::uuid IS NULL OR hospital_id = $1)",
        )
        .bind(hospital_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(CallStats {
            total_calls: to_u64(row.try_get("total_calls")?),
            successful_bookings: to_u64(row.try_get("successful_bookings")?),
            escalated: to_u64(row.try_get("escalated")?),
            billable_amount: row.try_get("billable_amount")?,
        })
    }

    async fn health_check(&self) -> bool {
        self.db.is_healthy().await
    }
}
