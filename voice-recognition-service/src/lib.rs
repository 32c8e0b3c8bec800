//! Speech transcription adapter for recorded telephone turns
//!
//! Turns a telephony provider's recording reference into text. Each turn is
//! downloaded, sent to a speech provider with booking vocabulary hints in
//! Hindi and English, and returned as a [`Transcript`]:
//!
//! - [`Transcript::Speech`] when something was recognised
//! - [`Transcript::NoSpeech`] for silence or an empty recording, which the
//!   call flow answers with a bounded re-prompt
//! - [`VoiceError`] for download, provider or timeout failures, which the
//!   call flow answers by escalating to a human
//!
//! # Providers
//!
//! - **Google** Cloud Speech-to-Text REST, `phone_call` model, 8 kHz LINEAR16
//! - **Whisper**, self-hosted behind an OpenAI-compatible transcription route
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use schedule_store::Language;
//! use voice_recognition_service::{Transcriber, VoiceConfig, VoiceService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = VoiceService::new(VoiceConfig::default())?;
//! let transcript = service
//!     .transcribe_recording(
//!         "https://recordings.example/CA123.wav",
//!         Language::Hindi,
//!         &[Language::English],
//!     )
//!     .await?;
//! println!("caller said: {:?}", transcript.text());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod providers;
pub mod recording;
pub mod service;
pub mod transcription;
pub mod vocabulary;

pub use config::*;
pub use error::*;
pub use providers::SpeechProvider;
pub use recording::{RecordingFetcher, RecordingSource};
pub use service::*;
pub use transcription::*;
pub use vocabulary::*;
