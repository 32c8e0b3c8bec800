use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use schedule_store::Specialty;
use uuid::Uuid;

/// Booking slots accumulated over a call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingFields {
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
    pub specialty: Option<Specialty>,
    pub doctor_id: Option<Uuid>,
    pub doctor_name: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<NaiveTime>,
    pub symptoms: Option<String>,
}

/// A field the dialogue still has to ask for, in asking order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Department,
    Date,
    Time,
    PatientName,
}

impl BookingFields {
    pub fn merge(&mut self, updates: FieldUpdates) {
        let FieldUpdates {
            patient_name,
            specialty,
            doctor_id,
            doctor_name,
            preferred_date,
            preferred_time,
            symptoms,
        } = updates;

        if patient_name.is_some() {
            self.patient_name = patient_name;
        }
        if let Some(specialty) = specialty {
            // A new department invalidates a doctor picked for another one
            if self.specialty != Some(specialty) && doctor_id.is_none() {
                self.doctor_id = None;
                self.doctor_name = None;
            }
            self.specialty = Some(specialty);
        }
        if doctor_id.is_some() {
            self.doctor_id = doctor_id;
            self.doctor_name = doctor_name;
        }
        if preferred_date.is_some() {
            self.preferred_date = preferred_date;
        }
        if preferred_time.is_some() {
            self.preferred_time = preferred_time;
        }
        if symptoms.is_some() {
            self.symptoms = symptoms;
        }
    }

    /// Fields still needed, first one to ask for first
    pub fn missing(&self) -> Vec<MissingField> {
        let mut missing = Vec::new();
        if self.doctor_id.is_none() {
            missing.push(MissingField::Department);
        }
        if self.preferred_date.is_none() {
            missing.push(MissingField::Date);
        }
        if self.preferred_time.is_none() {
            missing.push(MissingField::Time);
        }
        if self.patient_name.is_none() {
            missing.push(MissingField::PatientName);
        }
        missing
    }

    pub fn is_ready(&self) -> bool {
        self.missing().is_empty()
    }

    /// Forget the chosen date and time, keeping doctor and caller details
    pub fn clear_slot(&mut self) {
        self.preferred_date = None;
        self.preferred_time = None;
    }
}

/// Validated field changes produced by one turn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdates {
    pub patient_name: Option<String>,
    pub specialty: Option<Specialty>,
    pub doctor_id: Option<Uuid>,
    pub doctor_name: Option<String>,
    pub preferred_date: Option<NaiveDate>,
    pub preferred_time: Option<NaiveTime>,
    pub symptoms: Option<String>,
}

impl FieldUpdates {
    pub fn is_empty(&self) -> bool {
        *self == FieldUpdates::default()
    }
}

/// Field values exactly as a backend reported them, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedFields {
    pub patient_name: Option<String>,
    pub department: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_id: Option<String>,
    pub preferred_date: Option<String>,
    pub preferred_time: Option<String>,
    pub symptoms: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, d).unwrap()
    }

    #[test]
    fn merge_keeps_existing_values_when_update_is_silent() {
        let mut fields = BookingFields {
            patient_name: Some("Ramesh".into()),
            preferred_date: Some(date(9)),
            ..BookingFields::default()
        };
        fields.merge(FieldUpdates {
            preferred_time: NaiveTime::from_hms_opt(10, 0, 0),
            ..FieldUpdates::default()
        });

        assert_eq!(fields.patient_name.as_deref(), Some("Ramesh"));
        assert_eq!(fields.preferred_date, Some(date(9)));
        assert_eq!(fields.preferred_time, NaiveTime::from_hms_opt(10, 0, 0));
    }

    #[test]
    fn changing_department_drops_the_old_doctor() {
        let mut fields = BookingFields {
            specialty: Some(Specialty::Cardiology),
            doctor_id: Some(Uuid::new_v4()),
            doctor_name: Some("Dr. Priya Patel".into()),
            ..BookingFields::default()
        };
        fields.merge(FieldUpdates {
            specialty: Some(Specialty::Dermatology),
            ..FieldUpdates::default()
        });

        assert_eq!(fields.specialty, Some(Specialty::Dermatology));
        assert!(fields.doctor_id.is_none());
        assert_eq!(fields.missing().first(), Some(&MissingField::Department));
    }

    #[test]
    fn missing_fields_come_in_asking_order() {
        let fields = BookingFields {
            doctor_id: Some(Uuid::new_v4()),
            ..BookingFields::default()
        };
        assert_eq!(
            fields.missing(),
            vec![MissingField::Date, MissingField::Time, MissingField::PatientName]
        );
        assert!(!fields.is_ready());
    }

    #[test]
    fn extracted_fields_accept_camel_case_and_missing_keys() {
        let raw: ExtractedFields =
            serde_json::from_str(r#"{"preferredDate":"kal","department":"cardiology"}"#).unwrap();
        assert_eq!(raw.preferred_date.as_deref(), Some("kal"));
        assert_eq!(raw.department.as_deref(), Some("cardiology"));
        assert!(raw.patient_name.is_none());
    }
}
