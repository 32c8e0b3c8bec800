pub mod analytics;
pub mod appointments;
pub mod conversations;
pub mod doctors;
pub mod health;
pub mod hospitals;
pub mod patients;
pub mod voice;
