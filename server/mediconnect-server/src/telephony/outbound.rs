//! Outbound calls through the provider's REST API.
//!
//! Used for appointment reminders: the provider dials the patient and
//! fetches call markup from our `/api/voice/reminder` endpoint once the
//! call connects.

use config_engine::TelephonySettings;
use error_common::{codes, Categorized, ErrorCategory};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum OutboundError {
    #[error("outbound calling is not configured: {0}")]
    NotConfigured(&'static str),
    #[error("provider rejected the call: {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("provider request failed: {0}")]
    Network(#[from] reqwest::Error),
}

impl Categorized for OutboundError {
    fn category(&self) -> ErrorCategory {
        match self {
            OutboundError::NotConfigured(_) => ErrorCategory::Input,
            OutboundError::Rejected { .. } | OutboundError::Network(_) => ErrorCategory::Backend,
        }
    }

    fn code(&self) -> &'static str {
        codes::telephony::OUTBOUND_FAILED
    }
}

/// A call the provider accepted for dialling
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PlacedCall {
    pub call_sid: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectResponse {
    #[serde(rename = "Call")]
    call: ConnectCall,
}

#[derive(Debug, Deserialize)]
struct ConnectCall {
    #[serde(rename = "Sid")]
    sid: String,
    #[serde(rename = "Status", default)]
    status: Option<String>,
}

pub struct ExotelClient {
    client: reqwest::Client,
    accounts_url: String,
    api_key: String,
    api_token: String,
    caller_id: String,
}

impl ExotelClient {
    pub fn from_settings(settings: &TelephonySettings) -> Result<Self, OutboundError> {
        let account_sid = settings
            .account_sid
            .as_deref()
            .ok_or(OutboundError::NotConfigured("telephony.account_sid"))?;
        let api_key = settings
            .api_key
            .clone()
            .ok_or(OutboundError::NotConfigured("telephony.api_key"))?;
        let api_token = settings
            .api_token
            .clone()
            .ok_or(OutboundError::NotConfigured("telephony.api_token"))?;
        let caller_id = settings
            .caller_id
            .clone()
            .ok_or(OutboundError::NotConfigured("telephony.caller_id"))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        Ok(Self {
            client,
            accounts_url: format!(
                "{}/v1/Accounts/{}",
                settings.api_base_url.trim_end_matches('/'),
                account_sid
            ),
            api_key,
            api_token,
            caller_id,
        })
    }

    /// Ask the provider to dial `to`, serving markup from `markup_url`
    pub async fn make_outbound_call(
        &self,
        to: &str,
        markup_url: &str,
        status_callback: &str,
    ) -> Result<PlacedCall, OutboundError> {
        let form = [
            ("From", to),
            ("CallerId", self.caller_id.as_str()),
            ("Url", markup_url),
            ("StatusCallback", status_callback),
        ];
        let response = self
            .client
            .post(format!("{}/Calls/connect.json", self.accounts_url))
            .basic_auth(&self.api_key, Some(&self.api_token))
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OutboundError::Rejected {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let parsed: ConnectResponse = response.json().await?;
        info!(call_sid = %parsed.call.sid, "Outbound call placed");
        Ok(PlacedCall {
            call_sid: parsed.call.sid,
            status: parsed.call.status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_the_full_credential_set() {
        let settings = TelephonySettings {
            account_sid: Some("citycare".into()),
            api_key: Some("key".into()),
            ..TelephonySettings::default()
        };
        let err = ExotelClient::from_settings(&settings).err().unwrap();
        assert!(matches!(err, OutboundError::NotConfigured("telephony.api_token")));
    }

    #[test]
    fn account_url_is_built_from_the_base() {
        let settings = TelephonySettings {
            account_sid: Some("citycare".into()),
            api_key: Some("key".into()),
            api_token: Some("token".into()),
            caller_id: Some("01140036376".into()),
            api_base_url: "https://api.exotel.com/".into(),
            ..TelephonySettings::default()
        };
        let caller = ExotelClient::from_settings(&settings).unwrap();
        assert_eq!(caller.accounts_url, "https://api.exotel.com/v1/Accounts/citycare");
    }

    #[test]
    fn connect_response_parses() {
        let parsed: ConnectResponse =
            serde_json::from_str(r#"{"Call":{"Sid":"b6cfaf0e","Status":"in-progress","To":"x"}}"#)
                .unwrap();
        assert_eq!(parsed.call.sid, "b6cfaf0e");
        assert_eq!(parsed.call.status.as_deref(), Some("in-progress"));
    }
}
