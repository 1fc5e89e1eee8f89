//! Deployment environment

use serde::{Deserialize, Serialize};

/// Where the process is running
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    /// Automated test runs against throwaway backends
    Test,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Whether the logging SMS gateway may stand in for a real provider
    pub fn allows_mock_sms(&self) -> bool {
        !self.is_production()
    }

    /// Read `ENVIRONMENT`, defaulting to development when unset or unknown
    pub fn from_env() -> Self {
        std::env::var("ENVIRONMENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default()
    }

    /// Environment-specific dotenv file loaded before `.env`
    pub fn env_file(&self) -> &'static str {
        match self {
            Environment::Development => ".env.development",
            Environment::Test => ".env.test",
            Environment::Production => ".env.production",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Test => "test",
            Environment::Production => "production",
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "test" | "testing" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("Unknown environment: {}", other)),
        }
    }
}
