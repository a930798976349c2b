use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

/// Remote store credentials and folder settings.
///
/// The key, client id and access token ship as placeholders; until all three
/// are replaced the storage layer reports `CredentialsMissing` and runs
/// against the local fallback only.
#[derive(Debug, Clone, Deserialize)]
pub struct Drive {
    pub enabled: bool,
    pub api_key: String,
    pub client_id: String,
    pub access_token: String,
    pub folder_name: String,
}

impl Drive {
    /// True when any credential is still empty or a `YOUR_...` placeholder.
    pub fn credentials_missing(&self) -> bool {
        is_placeholder(&self.api_key)
            || is_placeholder(&self.client_id)
            || is_placeholder(&self.access_token)
    }
}

impl Default for Drive {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: "YOUR_GOOGLE_API_KEY_HERE".into(),
            client_id: "YOUR_GOOGLE_CLIENT_ID_HERE".into(),
            access_token: "YOUR_GOOGLE_ACCESS_TOKEN_HERE".into(),
            folder_name: "Clarity Co Analytics".into(),
        }
    }
}

/// Admin portal credentials. The password is hashed at startup and the
/// plaintext is dropped; see `auth::AdminAccount`.
#[derive(Debug, Clone, Deserialize)]
pub struct Admin {
    pub username: String,
    pub password: String,
}

impl Default for Admin {
    fn default() -> Self {
        Self {
            username: "admin".into(),
            password: "clarity2024".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub app_name: String,
    pub version: String,
    pub bind: String,
    pub data_dir: String,
    pub refresh_secs: u64,
    pub demo_data: bool,
    pub drive: Drive,
    pub admin: Admin,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            app_name: "Clarity Co Analytics".into(),
            version: "1.0.0".into(),
            bind: "127.0.0.1:3000".into(),
            data_dir: "database".into(),
            refresh_secs: 30,
            demo_data: true,
            drive: Drive::default(),
            admin: Admin::default(),
        }
    }
}

impl Settings {
    /// Layered load: built-in defaults, then an optional `config.toml`, then
    /// environment variables with `__` separating nesting levels (for
    /// example `DRIVE__ACCESS_TOKEN` overrides `drive.access_token`).
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("app_name", "Clarity Co Analytics")?
            .set_default("version", "1.0.0")?
            .set_default("bind", "127.0.0.1:3000")?
            .set_default("data_dir", "database")?
            .set_default("refresh_secs", 30)?
            .set_default("demo_data", true)?
            .set_default("drive.enabled", true)?
            .set_default("drive.api_key", "YOUR_GOOGLE_API_KEY_HERE")?
            .set_default("drive.client_id", "YOUR_GOOGLE_CLIENT_ID_HERE")?
            .set_default("drive.access_token", "YOUR_GOOGLE_ACCESS_TOKEN_HERE")?
            .set_default("drive.folder_name", "Clarity Co Analytics")?
            .set_default("admin.username", "admin")?
            .set_default("admin.password", "clarity2024")?
            .add_source(
                File::with_name("config.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::default().separator("__").try_parsing(true))
            .build()?;

        config.try_deserialize()
    }
}

fn is_placeholder(value: &str) -> bool {
    value.trim().is_empty() || value.starts_with("YOUR_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::{remove_var, set_var};

    #[test]
    fn test_defaults_are_placeholders() {
        let settings = Settings::default();
        assert!(settings.drive.credentials_missing());
        assert_eq!(settings.drive.folder_name, "Clarity Co Analytics");
        assert_eq!(settings.refresh_secs, 30);
        assert!(settings.demo_data);
    }

    #[test]
    fn test_env_override() {
        unsafe {
            set_var("DRIVE__ACCESS_TOKEN", "ya29.test-token");
            set_var("DRIVE__API_KEY", "AIza-test-key");
            set_var("DRIVE__CLIENT_ID", "test-client.apps.example.com");
        }
        let settings = Settings::new().unwrap_or_default();
        assert!(!settings.drive.credentials_missing());
        assert_eq!(settings.drive.access_token, "ya29.test-token");
        unsafe {
            remove_var("DRIVE__ACCESS_TOKEN");
            remove_var("DRIVE__API_KEY");
            remove_var("DRIVE__CLIENT_ID");
        }
    }

    #[test]
    fn test_placeholder_detection() {
        let mut drive = Drive::default();
        drive.api_key = "AIza-real".into();
        drive.client_id = "real.apps.example.com".into();
        assert!(drive.credentials_missing());
        drive.access_token = "ya29.real".into();
        assert!(!drive.credentials_missing());
        drive.access_token = "   ".into();
        assert!(drive.credentials_missing());
    }
}
