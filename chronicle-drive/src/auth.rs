//! OAuth2 credentials for the Drive API.
//!
//! Credentials come from an authorized-user token file, the JSON layout
//! Google's client libraries write after the consent flow:
//!
//! ```json
//! {"token": "...", "refresh_token": "...", "token_uri": "https://oauth2.googleapis.com/token",
//!  "client_id": "...", "client_secret": "...", "scopes": ["..."], "expiry": "2024-05-01T12:00:00Z"}
//! ```
//!
//! An expired access token is refreshed with the `refresh_token` grant and
//! the file is rewritten, so later runs start from the fresh token.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use crate::error::{DriveError, Result};

/// Scope covering file metadata and content export.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Environment variable holding a ready-made bearer token.
pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_DRIVE_ACCESS_TOKEN";

/// Tokens this close to expiry are refreshed early.
const EXPIRY_SKEW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct AccessToken {
    pub secret: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Source of bearer tokens for Drive requests.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<AccessToken>;
}

/// A fixed bearer token, typically minted elsewhere (e.g. `gcloud auth print-access-token`).
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Read the token from `GOOGLE_DRIVE_ACCESS_TOKEN`, if set and non-empty.
    pub fn from_env() -> Option<Self> {
        std::env::var(ACCESS_TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .map(Self::new)
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<AccessToken> {
        Ok(AccessToken {
            secret: self.0.clone(),
            expires_at: None,
        })
    }
}

/// Authorized-user token file contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    /// Keys we do not interpret (`universe_domain`, `account`, ...), kept on rewrite
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthorizedUser {
    /// Stored token usable at `now`. A token without expiry counts as valid.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let Some(token) = self.token.as_deref() else {
            return false;
        };
        if token.is_empty() {
            return false;
        }
        match self.expiry {
            Some(expiry) => expiry - Duration::seconds(EXPIRY_SKEW_SECS) > now,
            None => true,
        }
    }

    fn current_token(&self) -> Option<AccessToken> {
        self.token.as_ref().map(|secret| AccessToken {
            secret: secret.clone(),
            expires_at: self.expiry,
        })
    }

    /// Fill client id/secret/token URI from the client secrets file when the
    /// token file lacks them.
    pub fn fill_client(&mut self, secrets: &ClientSecrets) {
        if self.client_id.is_none() {
            self.client_id = Some(secrets.client_id.clone());
        }
        if self.client_secret.is_none() {
            self.client_secret = Some(secrets.client_secret.clone());
        }
        if self.token_uri.is_none() {
            self.token_uri = secrets.token_uri.clone();
        }
    }

    /// Record the result of a refresh exchange.
    pub fn apply_refresh(&mut self, response: TokenResponse, now: DateTime<Utc>) -> AccessToken {
        self.expiry = response
            .expires_in
            .map(|secs| now + Duration::seconds(secs));
        self.token = Some(response.access_token.clone());
        if let Some(refresh) = response.refresh_token {
            self.refresh_token = Some(refresh);
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_owned).collect();
        }

        AccessToken {
            secret: response.access_token,
            expires_at: self.expiry,
        }
    }
}

/// OAuth client secrets as downloaded from the Cloud Console.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl ClientSecrets {
    /// Parse a `credentials.json`, which nests the fields under `installed` or `web`.
    pub fn from_json(contents: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Wrapper {
            installed: Option<ClientSecrets>,
            web: Option<ClientSecrets>,
        }

        let wrapper: Wrapper = serde_json::from_str(contents)?;
        wrapper.installed.or(wrapper.web).ok_or_else(|| DriveError::Refresh {
            reason: "client secrets file has neither an 'installed' nor a 'web' section".into(),
        })
    }
}

/// Response of the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// Credentials backed by an authorized-user token file.
pub struct AuthorizedUserProvider {
    token_path: PathBuf,
    secrets_path: Option<PathBuf>,
    http: Client,
    state: Mutex<Option<AuthorizedUser>>,
}

impl AuthorizedUserProvider {
    pub fn new(token_path: impl Into<PathBuf>) -> Self {
        Self {
            token_path: token_path.into(),
            secrets_path: None,
            http: Client::new(),
            state: Mutex::new(None),
        }
    }

    /// Client secrets file consulted when the token file lacks client fields.
    pub fn with_client_secrets(mut self, path: impl Into<PathBuf>) -> Self {
        self.secrets_path = Some(path.into());
        self
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    async fn load(&self) -> Result<AuthorizedUser> {
        let contents = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DriveError::MissingCredentials {
                    path: self.token_path.clone(),
                })
            }
            Err(err) => return Err(err.into()),
        };

        let mut user: AuthorizedUser =
            serde_json::from_str(&contents).map_err(|err| DriveError::InvalidToken {
                path: self.token_path.clone(),
                reason: err.to_string(),
            })?;

        if let Some(secrets_path) = &self.secrets_path {
            if user.client_id.is_none() || user.client_secret.is_none() {
                match tokio::fs::read_to_string(secrets_path).await {
                    Ok(contents) => user.fill_client(&ClientSecrets::from_json(&contents)?),
                    Err(err) => debug!("client secrets {:?} unavailable: {}", secrets_path, err),
                }
            }
        }

        Ok(user)
    }

    async fn save(&self, user: &AuthorizedUser) -> Result<()> {
        let json = serde_json::to_vec_pretty(user)?;
        tokio::fs::write(&self.token_path, json).await?;
        debug!("token saved to {:?}", self.token_path);
        Ok(())
    }

    #[instrument(skip_all)]
    async fn refresh(&self, user: &mut AuthorizedUser) -> Result<AccessToken> {
        let invalid = |field: &str| DriveError::InvalidToken {
            path: self.token_path.clone(),
            reason: format!("no '{}' to refresh with", field),
        };
        let refresh_token = user.refresh_token.clone().ok_or_else(|| invalid("refresh_token"))?;
        let client_id = user.client_id.clone().ok_or_else(|| invalid("client_id"))?;
        let client_secret = user.client_secret.clone().ok_or_else(|| invalid("client_secret"))?;
        let token_uri = user
            .token_uri
            .clone()
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string());

        let response = self
            .http
            .post(&token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DriveError::Refresh {
                reason: format!("{}: {}", status, body.trim()),
            });
        }

        let token: TokenResponse = response.json().await?;
        let access = user.apply_refresh(token, Utc::now());
        info!("access token refreshed");
        Ok(access)
    }
}

#[async_trait]
impl CredentialProvider for AuthorizedUserProvider {
    async fn access_token(&self) -> Result<AccessToken> {
        let mut state = self.state.lock().await;
        let mut user = match state.take() {
            Some(user) => user,
            None => self.load().await?,
        };

        let cached = if user.is_fresh(Utc::now()) {
            user.current_token()
        } else {
            None
        };

        let result = match cached {
            Some(token) => Ok(token),
            None => match self.refresh(&mut user).await {
                Ok(token) => self.save(&user).await.map(|_| token),
                Err(err) => Err(err),
            },
        };

        *state = Some(user);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn user(token: Option<&str>, expiry: Option<DateTime<Utc>>) -> AuthorizedUser {
        AuthorizedUser {
            token: token.map(str::to_owned),
            refresh_token: Some("refresh".into()),
            token_uri: None,
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
            scopes: vec![DRIVE_READONLY_SCOPE.into()],
            expiry,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_freshness() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        assert!(user(Some("t"), None).is_fresh(now));
        assert!(user(Some("t"), Some(now + Duration::minutes(10))).is_fresh(now));
        assert!(!user(Some("t"), Some(now + Duration::seconds(30))).is_fresh(now));
        assert!(!user(Some("t"), Some(now - Duration::minutes(1))).is_fresh(now));
        assert!(!user(None, None).is_fresh(now));
        assert!(!user(Some(""), None).is_fresh(now));
    }

    #[test]
    fn test_parse_google_token_file() {
        let parsed: AuthorizedUser = serde_json::from_value(json!({
            "token": "ya29.abc",
            "refresh_token": "1//xyz",
            "token_uri": "https://oauth2.googleapis.com/token",
            "client_id": "123.apps.googleusercontent.com",
            "client_secret": "shh",
            "scopes": [DRIVE_READONLY_SCOPE],
            "universe_domain": "googleapis.com",
            "account": "",
            "expiry": "2024-05-01T12:00:00.123456Z"
        }))
        .unwrap();

        assert_eq!(parsed.token.as_deref(), Some("ya29.abc"));
        assert_eq!(parsed.extra.get("universe_domain"), Some(&json!("googleapis.com")));
        assert!(parsed.expiry.is_some());

        let rewritten = serde_json::to_value(&parsed).unwrap();
        assert_eq!(rewritten["universe_domain"], "googleapis.com");
    }

    #[test]
    fn test_apply_refresh() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut u = user(Some("old"), Some(now - Duration::hours(1)));

        let token = u.apply_refresh(
            TokenResponse {
                access_token: "new".into(),
                expires_in: Some(3599),
                refresh_token: None,
                scope: Some(DRIVE_READONLY_SCOPE.into()),
            },
            now,
        );

        assert_eq!(token.secret, "new");
        assert_eq!(u.token.as_deref(), Some("new"));
        assert_eq!(u.refresh_token.as_deref(), Some("refresh"));
        assert_eq!(u.expiry, Some(now + Duration::seconds(3599)));
        assert!(u.is_fresh(now));
    }

    #[test]
    fn test_client_secrets_sections() {
        let installed = ClientSecrets::from_json(
            r#"{"installed": {"client_id": "a", "client_secret": "b", "token_uri": "https://t"}}"#,
        )
        .unwrap();
        assert_eq!(installed.client_id, "a");

        let web = ClientSecrets::from_json(r#"{"web": {"client_id": "c", "client_secret": "d"}}"#)
            .unwrap();
        assert_eq!(web.token_uri, None);

        assert!(ClientSecrets::from_json("{}").is_err());
    }

    #[test]
    fn test_fill_client_keeps_existing_fields() {
        let mut u = user(None, None);
        u.client_secret = None;
        u.fill_client(&ClientSecrets {
            client_id: "other".into(),
            client_secret: "filled".into(),
            token_uri: Some("https://t".into()),
        });

        assert_eq!(u.client_id.as_deref(), Some("id"));
        assert_eq!(u.client_secret.as_deref(), Some("filled"));
        assert_eq!(u.token_uri.as_deref(), Some("https://t"));
    }

    #[tokio::test]
    async fn test_missing_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let provider = AuthorizedUserProvider::new(dir.path().join("token.json"));

        let err = provider.access_token().await.unwrap_err();
        assert!(matches!(err, DriveError::MissingCredentials { .. }));
    }

    #[tokio::test]
    async fn test_malformed_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "not json").unwrap();

        let err = AuthorizedUserProvider::new(&path).access_token().await.unwrap_err();
        assert!(matches!(err, DriveError::InvalidToken { .. }));
    }

    #[tokio::test]
    async fn test_fresh_token_is_used_without_refresh() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let stored = user(Some("still-good"), Some(Utc::now() + Duration::hours(1)));
        std::fs::write(&path, serde_json::to_string(&stored).unwrap()).unwrap();

        let token = AuthorizedUserProvider::new(&path).access_token().await.unwrap();
        assert_eq!(token.secret, "still-good");
    }

    #[tokio::test]
    async fn test_static_token() {
        let token = StaticToken::new("abc").access_token().await.unwrap();
        assert_eq!(token.secret, "abc");
        assert_eq!(token.expires_at, None);
    }
}
