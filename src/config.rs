use reqwest::Url;
use serde::Deserialize;

pub const DEFAULT_API_URL: &str = "https://api.dub.co";
pub const DEFAULT_SESSION_COOKIE: &str = "mc_dub";
pub const DEFAULT_CLICK_ID_COOKIE: &str = "dub_id";

/// Component settings, built once at start-up.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,
    #[serde(default = "default_click_id_cookie")]
    pub click_id_cookie: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_session_cookie() -> String {
    DEFAULT_SESSION_COOKIE.to_string()
}

fn default_click_id_cookie() -> String {
    DEFAULT_CLICK_ID_COOKIE.to_string()
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingApiKey,
    EmptyCookieName(&'static str),
    InvalidApiUrl(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MissingApiKey => write!(f, "DUB_API_KEY is not set"),
            ConfigError::EmptyCookieName(which) => write!(f, "{} cookie name is empty", which),
            ConfigError::InvalidApiUrl(url) => {
                write!(f, "API URL must be an absolute http(s) URL: {}", url)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Settings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_url: default_api_url(),
            session_cookie: default_session_cookie(),
            click_id_cookie: default_click_id_cookie(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if !is_valid_http_url(&self.api_url) {
            return Err(ConfigError::InvalidApiUrl(self.api_url.clone()));
        }
        if self.session_cookie.is_empty() {
            return Err(ConfigError::EmptyCookieName("session"));
        }
        if self.click_id_cookie.is_empty() {
            return Err(ConfigError::EmptyCookieName("click id"));
        }
        Ok(())
    }

    pub fn cookie_names(&self) -> CookieNames {
        CookieNames {
            session: self.session_cookie.clone(),
            click_id: self.click_id_cookie.clone(),
        }
    }

    /// Build from Cloudflare Worker environment
    #[cfg(target_arch = "wasm32")]
    pub fn from_worker_env(env: &worker::Env) -> worker::Result<Self> {
        let api_key = env.secret("DUB_API_KEY")?.to_string();
        let var = |name: &str| {
            env.var(name)
                .map(|v| v.to_string())
                .ok()
                .filter(|v| !v.is_empty())
        };

        let settings = Self {
            api_key,
            api_url: var("DUB_API_URL").unwrap_or_else(default_api_url),
            session_cookie: var("SESSION_COOKIE_NAME").unwrap_or_else(default_session_cookie),
            click_id_cookie: var("CLICK_ID_COOKIE_NAME").unwrap_or_else(default_click_id_cookie),
        };
        settings
            .validate()
            .map_err(|e| worker::Error::RustError(e.to_string()))?;
        Ok(settings)
    }
}

/// Names of the cookies the component reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieNames {
    /// Session cookie owned by this component.
    pub session: String,
    /// Referral cookie set by Dub's client-side script; read only.
    pub click_id: String,
}

impl Default for CookieNames {
    fn default() -> Self {
        Self {
            session: DEFAULT_SESSION_COOKIE.to_string(),
            click_id: DEFAULT_CLICK_ID_COOKIE.to_string(),
        }
    }
}

fn is_valid_http_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(url) => {
            matches!(url.scheme(), "http" | "https")
                && url.host_str().is_some_and(|host| !host.is_empty())
        }
        Err(_) => false,
    }
}
