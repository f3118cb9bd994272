use std::{env, str::FromStr};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// What happens to a submission that arrives after the attempt deadline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LateSubmissionPolicy {
    /// The attempt is expired with a zero score and the submission is refused.
    Reject,
    /// The submission is graded normally and flagged as late.
    AcceptFlagged,
}

impl FromStr for LateSubmissionPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "reject" => Ok(LateSubmissionPolicy::Reject),
            "accept_flagged" | "accept" => Ok(LateSubmissionPolicy::AcceptFlagged),
            other => Err(format!("unknown late submission policy '{}'", other)),
        }
    }
}

/// Settings handed to the attempt manager at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct AttemptPolicy {
    pub late_submission: LateSubmissionPolicy,
    pub grace_period_seconds: i64,
}

impl Default for AttemptPolicy {
    fn default() -> Self {
        Self {
            late_submission: LateSubmissionPolicy::Reject,
            grace_period_seconds: 30,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub app_env: String,
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,
    pub jwt_secret: SecretString,
    pub jwt_expiration_hours: i64,
    pub attempt_policy: AttemptPolicy,
    pub quiz_cache_ttl_seconds: u64,
    pub quiz_cache_max_capacity: u64,
    pub attempt_sweep_interval_seconds: u64,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        let late_submission = env::var("LATE_SUBMISSION_POLICY")
            .ok()
            .and_then(|p| match p.parse() {
                Ok(policy) => Some(policy),
                Err(e) => {
                    log::warn!("{}, falling back to reject", e);
                    None
                }
            })
            .unwrap_or(LateSubmissionPolicy::Reject);

        Self {
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME").unwrap_or_else(|_| "lms-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env_or("WEB_SERVER_PORT", 8080),
            jwt_secret: SecretString::from(
                env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "dev_secret_key_change_in_production".to_string()),
            ),
            jwt_expiration_hours: env_or("JWT_EXPIRATION_HOURS", 24),
            attempt_policy: AttemptPolicy {
                late_submission,
                grace_period_seconds: env_or("LATE_SUBMISSION_GRACE_SECONDS", 30),
            },
            quiz_cache_ttl_seconds: env_or("QUIZ_CACHE_TTL_SECONDS", 300),
            quiz_cache_max_capacity: env_or("QUIZ_CACHE_MAX_CAPACITY", 10_000),
            attempt_sweep_interval_seconds: env_or("ATTEMPT_SWEEP_INTERVAL_SECONDS", 60),
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("production")
    }

    /// Validate that production-critical configuration is set
    /// Panics if required secrets are using default values
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        let jwt_secret = self.jwt_secret.expose_secret();

        if jwt_secret == "dev_secret_key_change_in_production" {
            panic!(
                "FATAL: JWT_SECRET is using default value! Set JWT_SECRET environment variable to a secure random string."
            );
        }

        if jwt_secret.len() < 32 {
            panic!(
                "FATAL: JWT_SECRET is too short ({}). Must be at least 32 characters for security.",
                jwt_secret.len()
            );
        }

        if self.attempt_policy.grace_period_seconds < 0 {
            panic!("FATAL: LATE_SUBMISSION_GRACE_SECONDS must not be negative.");
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            app_env: "test".to_string(),
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "lms-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            jwt_secret: SecretString::from("test_jwt_secret_key".to_string()),
            jwt_expiration_hours: 1,
            attempt_policy: AttemptPolicy::default(),
            quiz_cache_ttl_seconds: 60,
            quiz_cache_max_capacity: 100,
            attempt_sweep_interval_seconds: 60,
        }
    }
}
