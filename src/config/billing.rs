//! Billing provider configuration (Google Play Developer API)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::error::ValidationError;

/// Google Play billing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Application package whose notifications and purchases are accepted
    pub package_name: String,

    /// Path to the service-account JSON key used for the Developer API
    #[serde(default = "default_key_path")]
    pub service_account_key_path: PathBuf,

    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout for a single Developer API call, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Shared token expected in the `token` query parameter of push deliveries.
    /// When unset, pushes are accepted without a token.
    pub push_token: Option<String>,
}

impl BillingConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate billing configuration
    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.package_name.is_empty() {
            return Err(ValidationError::MissingRequired("BILLING__PACKAGE_NAME"));
        }
        if !is_valid_package_name(&self.package_name) {
            return Err(ValidationError::InvalidPackageName(
                self.package_name.clone(),
            ));
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > 120 {
            return Err(ValidationError::InvalidTimeout);
        }
        if production && !self.api_base_url.starts_with("https://") {
            return Err(ValidationError::BillingUrlMustBeHttps);
        }
        Ok(())
    }
}

/// Android application ids are dot-separated segments of `[A-Za-z0-9_]`,
/// each starting with a letter, with at least two segments.
fn is_valid_package_name(name: &str) -> bool {
    let segments: Vec<&str> = name.split('.').collect();
    segments.len() >= 2
        && segments.iter().all(|segment| {
            let mut chars = segment.chars();
            matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            package_name: String::new(),
            service_account_key_path: default_key_path(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
            push_token: None,
        }
    }
}

fn default_key_path() -> PathBuf {
    PathBuf::from("play-billing-key.json")
}

fn default_api_base_url() -> String {
    "https://androidpublisher.googleapis.com".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> BillingConfig {
        BillingConfig {
            package_name: "cz.filip.svatebniplanovac".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_billing_defaults() {
        let config = BillingConfig::default();
        assert_eq!(
            config.service_account_key_path,
            PathBuf::from("play-billing-key.json")
        );
        assert_eq!(config.api_base_url, "https://androidpublisher.googleapis.com");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert!(config.push_token.is_none());
    }

    #[test]
    fn test_validation_requires_package_name() {
        assert_eq!(
            BillingConfig::default().validate(false),
            Err(ValidationError::MissingRequired("BILLING__PACKAGE_NAME"))
        );
    }

    #[test]
    fn test_package_name_format() {
        assert!(is_valid_package_name("com.example.app"));
        assert!(is_valid_package_name("cz.filip.svatebniplanovac"));
        assert!(!is_valid_package_name("single"));
        assert!(!is_valid_package_name("com..app"));
        assert!(!is_valid_package_name("com.1app"));
        assert!(!is_valid_package_name("com.my-app"));
    }

    #[test]
    fn test_production_requires_https() {
        let config = BillingConfig {
            api_base_url: "http://localhost:9999".to_string(),
            ..valid()
        };
        assert!(config.validate(false).is_ok());
        assert_eq!(
            config.validate(true),
            Err(ValidationError::BillingUrlMustBeHttps)
        );
    }

    #[test]
    fn test_validation_timeout_bounds() {
        let config = BillingConfig {
            request_timeout_secs: 0,
            ..valid()
        };
        assert_eq!(config.validate(false), Err(ValidationError::InvalidTimeout));
    }
}
