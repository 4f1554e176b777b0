//! Google OAuth credentials for the Sheets API
//!
//! Reads and writes the authorized-user `token.json` format, refreshes expired
//! access tokens, and supports the installed-app authorization-code flow. The
//! interactive part (showing the URL, reading the code) belongs to the caller.

use chrono::{DateTime, Duration as ChronoDuration, NaiveDateTime, Utc};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::SheetsSettings;
use crate::error::{Result, SheetAiError};

/// Read/write access to spreadsheets
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
/// Redirect registered for the installed-app client
pub const REDIRECT_URI: &str = "http://localhost:8080";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are treated as expired this long before their real expiry
const EXPIRY_SKEW_SECS: i64 = 60;

/// Cached credentials of a signed-in user (`token.json`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// RFC 3339, or a naive UTC timestamp as older tools wrote it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,
}

impl AuthorizedUser {
    /// Load the token file; `None` when it does not exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let user = serde_json::from_str(&content).map_err(|e| SheetAiError::InvalidCredentials {
            reason: format!("{}: {}", path.display(), e),
        })?;
        Ok(Some(user))
    }

    /// Persist the token file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.expiry.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    /// Access token present and not about to expire
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.token.as_deref().map_or(true, str::is_empty) {
            return false;
        }
        match self.expires_at() {
            Some(expiry) => expiry - ChronoDuration::seconds(EXPIRY_SKEW_SECS) > now,
            None => true,
        }
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh(&mut self, http: &HttpClient) -> Result<()> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or(SheetAiError::TokenExpired)?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let grant = post_token_request(http, &self.token_uri, &params).await?;
        self.apply_grant(grant, Utc::now());
        info!("Refreshed spreadsheet access token");
        Ok(())
    }

    fn apply_grant(&mut self, grant: TokenGrant, now: DateTime<Utc>) {
        self.token = Some(grant.access_token);
        if let Some(refresh) = grant.refresh_token {
            self.refresh_token = Some(refresh);
        }
        self.expiry = grant
            .expires_in
            .map(|secs| (now + ChronoDuration::seconds(secs)).to_rfc3339());
    }
}

/// OAuth client secrets (`credentials.json`)
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

/// Installed-application authorization-code flow
#[derive(Debug, Clone)]
pub struct InstalledApp {
    secrets: ClientSecrets,
}

impl InstalledApp {
    pub fn new(secrets: ClientSecrets) -> Self {
        Self { secrets }
    }

    /// Read the client secrets downloaded from the cloud console
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SheetAiError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let file: ClientSecretsFile =
            serde_json::from_str(&content).map_err(|e| SheetAiError::InvalidCredentials {
                reason: format!("{}: {}", path.display(), e),
            })?;
        file.installed
            .or(file.web)
            .map(Self::new)
            .ok_or_else(|| SheetAiError::InvalidCredentials {
                reason: format!("{} has no 'installed' or 'web' client", path.display()),
            })
    }

    /// URL the user opens to grant access
    pub fn authorization_url(&self) -> String {
        format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&access_type=offline&prompt=consent",
            self.secrets.auth_uri,
            urlencoding::encode(&self.secrets.client_id),
            urlencoding::encode(REDIRECT_URI),
            urlencoding::encode(SHEETS_SCOPE),
        )
    }

    /// Trade the pasted code (or the whole redirect URL) for tokens
    pub async fn exchange_code(&self, http: &HttpClient, pasted: &str) -> Result<AuthorizedUser> {
        let code = extract_code(pasted).ok_or_else(|| SheetAiError::InvalidCredentials {
            reason: "no authorization code entered".to_string(),
        })?;

        let params = [
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("client_id", self.secrets.client_id.as_str()),
            ("client_secret", self.secrets.client_secret.as_str()),
            ("redirect_uri", REDIRECT_URI),
        ];
        let grant = post_token_request(http, &self.secrets.token_uri, &params).await?;

        let mut user = AuthorizedUser {
            token: None,
            refresh_token: None,
            client_id: self.secrets.client_id.clone(),
            client_secret: self.secrets.client_secret.clone(),
            token_uri: self.secrets.token_uri.clone(),
            scopes: vec![SHEETS_SCOPE.to_string()],
            expiry: None,
        };
        user.apply_grant(grant, Utc::now());
        Ok(user)
    }
}

/// Pull `code=` out of a redirect URL, or take the input as the bare code
fn extract_code(pasted: &str) -> Option<String> {
    let trimmed = pasted.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(query) = trimmed.split_once('?').map(|(_, q)| q) {
        for pair in query.split('&') {
            if let Some(value) = pair.strip_prefix("code=") {
                return urlencoding::decode(value).ok().map(|v| v.into_owned());
            }
        }
    }
    Some(trimmed.to_string())
}

#[derive(Deserialize)]
struct TokenGrant {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
}

async fn post_token_request(
    http: &HttpClient,
    token_uri: &str,
    params: &[(&str, &str)],
) -> Result<TokenGrant> {
    let response = http.post(token_uri).form(params).send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let reason = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("error_description")
                    .or_else(|| v.get("error"))
                    .and_then(|e| e.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("token endpoint answered {}", status));
        return Err(SheetAiError::InvalidCredentials { reason });
    }

    Ok(serde_json::from_str(&body)?)
}

enum TokenKind {
    Fixed(String),
    Authorized {
        user: Mutex<AuthorizedUser>,
        path: PathBuf,
    },
}

/// Hands out a valid bearer token, refreshing and re-saving as needed
pub struct TokenSource {
    kind: TokenKind,
    http: HttpClient,
}

impl TokenSource {
    /// A token managed elsewhere (never refreshed)
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            kind: TokenKind::Fixed(token.into()),
            http: HttpClient::new(),
        }
    }

    /// A signed-in user whose token file lives at `path`
    pub fn authorized(user: AuthorizedUser, path: impl Into<PathBuf>, http: HttpClient) -> Self {
        Self {
            kind: TokenKind::Authorized {
                user: Mutex::new(user),
                path: path.into(),
            },
            http,
        }
    }

    pub async fn bearer(&self) -> Result<String> {
        match &self.kind {
            TokenKind::Fixed(token) => Ok(token.clone()),
            TokenKind::Authorized { user, path } => {
                let mut user = user.lock().await;
                if !user.is_valid_at(Utc::now()) {
                    user.refresh(&self.http).await?;
                    if let Err(e) = user.save(path) {
                        warn!("Could not persist refreshed token to {}: {}", path.display(), e);
                    }
                }
                user.token.clone().ok_or(SheetAiError::TokenExpired)
            }
        }
    }
}

/// Where credential bootstrap ended up
pub enum Credentials {
    /// Ready to call the API
    Ready(TokenSource),
    /// No cached token; the user must authorize `app` first
    NeedsAuthorization(InstalledApp),
}

impl Credentials {
    /// Static token, then cached `token.json`, then the installed-app flow
    pub fn resolve(settings: &SheetsSettings, http: &HttpClient) -> Result<Self> {
        if let Some(token) = settings.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
            return Ok(Self::Ready(TokenSource::fixed(token.trim())));
        }

        if let Some(user) = AuthorizedUser::load(&settings.token_path)? {
            let usable = user.is_valid_at(Utc::now()) || user.refresh_token.is_some();
            if usable {
                return Ok(Self::Ready(TokenSource::authorized(
                    user,
                    &settings.token_path,
                    http.clone(),
                )));
            }
            warn!(
                "{} holds an expired token without refresh token",
                settings.token_path.display()
            );
        }

        Ok(Self::NeedsAuthorization(InstalledApp::from_file(
            &settings.credentials_path,
        )?))
    }
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn user(token: Option<&str>, expiry: Option<&str>) -> AuthorizedUser {
        AuthorizedUser {
            token: token.map(str::to_string),
            refresh_token: Some("1//refresh".to_string()),
            client_id: "client.apps.googleusercontent.com".to_string(),
            client_secret: "shh".to_string(),
            token_uri: default_token_uri(),
            scopes: vec![SHEETS_SCOPE.to_string()],
            expiry: expiry.map(str::to_string),
        }
    }

    #[test]
    fn test_expiry_formats() {
        let rfc = user(Some("t"), Some("2030-01-01T00:00:00Z"));
        let naive = user(Some("t"), Some("2030-01-01T00:00:00.123456"));
        assert_eq!(rfc.expires_at().unwrap().timestamp(), 1893456000);
        assert_eq!(naive.expires_at().unwrap().timestamp(), 1893456000);
    }

    #[test]
    fn test_validity() {
        let now = DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);

        assert!(user(Some("t"), Some("2030-01-01T01:00:00Z")).is_valid_at(now));
        // inside the skew window counts as expired
        assert!(!user(Some("t"), Some("2030-01-01T00:00:30Z")).is_valid_at(now));
        assert!(!user(None, Some("2030-01-02T00:00:00Z")).is_valid_at(now));
        assert!(user(Some("t"), None).is_valid_at(now));
    }

    #[test]
    fn test_token_file_round_trip_ignores_extra_fields() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(
            &path,
            r#"{"token": "ya29.x", "refresh_token": "1//r", "token_uri": "https://oauth2.googleapis.com/token",
                "client_id": "cid", "client_secret": "cs", "scopes": ["https://www.googleapis.com/auth/spreadsheets"],
                "universe_domain": "googleapis.com", "account": "", "expiry": "2030-01-01T00:00:00.000000Z"}"#,
        )
        .unwrap();

        let loaded = AuthorizedUser::load(&path).unwrap().unwrap();
        assert_eq!(loaded.token.as_deref(), Some("ya29.x"));
        assert_eq!(loaded.client_id, "cid");

        loaded.save(&path).unwrap();
        let reloaded = AuthorizedUser::load(&path).unwrap().unwrap();
        assert_eq!(reloaded.refresh_token.as_deref(), Some("1//r"));
        assert!(AuthorizedUser::load(&dir.path().join("missing.json")).unwrap().is_none());
    }

    #[test]
    fn test_apply_grant_keeps_refresh_token_when_absent() {
        let mut u = user(Some("old"), None);
        let now = Utc::now();
        u.apply_grant(
            TokenGrant {
                access_token: "new".to_string(),
                expires_in: Some(3600),
                refresh_token: None,
            },
            now,
        );
        assert_eq!(u.token.as_deref(), Some("new"));
        assert_eq!(u.refresh_token.as_deref(), Some("1//refresh"));
        assert!(u.is_valid_at(now));
    }

    #[test]
    fn test_installed_app_from_file_and_url() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            r#"{"installed": {"client_id": "abc.apps.googleusercontent.com", "client_secret": "s",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"}}"#,
        )
        .unwrap();

        let app = InstalledApp::from_file(&path).unwrap();
        let url = app.authorization_url();
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?response_type=code"));
        assert!(url.contains("client_id=abc.apps.googleusercontent.com"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080"));
        assert!(url.contains("scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fspreadsheets"));
    }

    #[test]
    fn test_installed_app_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            InstalledApp::from_file(&dir.path().join("credentials.json")),
            Err(SheetAiError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_extract_code() {
        assert_eq!(extract_code("  4/0Abc  ").as_deref(), Some("4/0Abc"));
        assert_eq!(
            extract_code("http://localhost:8080/?state=x&code=4%2F0Abc&scope=s").as_deref(),
            Some("4/0Abc")
        );
        assert!(extract_code("   ").is_none());
    }

    #[tokio::test]
    async fn test_resolve_prefers_static_token() {
        let dir = TempDir::new().unwrap();
        let mut settings = SheetsSettings::default();
        settings.access_token = Some(" ya29.static ".to_string());
        settings.token_path = dir.path().join("token.json");

        match Credentials::resolve(&settings, &HttpClient::new()).unwrap() {
            Credentials::Ready(source) => assert_eq!(source.bearer().await.unwrap(), "ya29.static"),
            Credentials::NeedsAuthorization(_) => panic!("static token should be ready"),
        }
    }

    #[tokio::test]
    async fn test_resolve_uses_cached_valid_token() {
        let dir = TempDir::new().unwrap();
        let mut settings = SheetsSettings::default();
        settings.token_path = dir.path().join("token.json");
        user(Some("ya29.cached"), Some("2999-01-01T00:00:00Z"))
            .save(&settings.token_path)
            .unwrap();

        match Credentials::resolve(&settings, &HttpClient::new()).unwrap() {
            Credentials::Ready(source) => assert_eq!(source.bearer().await.unwrap(), "ya29.cached"),
            Credentials::NeedsAuthorization(_) => panic!("cached token should be ready"),
        }
    }

    #[test]
    fn test_resolve_falls_back_to_installed_app() {
        let dir = TempDir::new().unwrap();
        let mut settings = SheetsSettings::default();
        settings.token_path = dir.path().join("token.json");
        settings.credentials_path = dir.path().join("credentials.json");
        std::fs::write(
            &settings.credentials_path,
            r#"{"web": {"client_id": "w", "client_secret": "s"}}"#,
        )
        .unwrap();

        assert!(matches!(
            Credentials::resolve(&settings, &HttpClient::new()).unwrap(),
            Credentials::NeedsAuthorization(_)
        ));
    }
}
