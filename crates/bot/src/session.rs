//! Getting the bot account signed in: reuse the token saved by a previous
//! run, or log in once and keep the token for next time.

use std::{io::IsTerminal as _, path::Path};

use anyhow::{Context as _, Result, anyhow, bail};
use matrix_sdk::{
    Client, SessionMeta,
    authentication::{SessionTokens, matrix::MatrixSession},
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Token file contents. Only what `restore_session` needs.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub(crate) struct SavedSession {
    pub(crate) access_token: String,
    #[serde(default)]
    pub(crate) refresh_token: Option<String>,
    pub(crate) user_id: String,
    pub(crate) device_id: String,
}

impl SavedSession {
    fn into_matrix(self) -> Result<MatrixSession> {
        Ok(MatrixSession {
            meta: SessionMeta {
                user_id: self
                    .user_id
                    .parse()
                    .with_context(|| format!("saved user id {} is invalid", self.user_id))?,
                device_id: self.device_id.into(),
            },
            tokens: SessionTokens {
                access_token: self.access_token,
                refresh_token: self.refresh_token,
            },
        })
    }
}

#[derive(Debug)]
pub(crate) struct Credentials<'a> {
    pub(crate) homeserver: &'a str,
    pub(crate) username: &'a str,
    pub(crate) password: Option<&'a str>,
    pub(crate) device_name: &'a str,
    pub(crate) store: &'a Path,
    pub(crate) session_file: &'a Path,
}

pub(crate) async fn connect(creds: &Credentials<'_>) -> Result<Client> {
    std::fs::create_dir_all(creds.store)
        .with_context(|| format!("cannot create store at {}", creds.store.display()))?;

    let client = Client::builder()
        .homeserver_url(creds.homeserver)
        .handle_refresh_tokens()
        .sqlite_store(creds.store, None)
        .build()
        .await
        .context("cannot build matrix client")?;

    match load_session(creds.session_file)? {
        Some(saved) => {
            info!(user = %saved.user_id, device = %saved.device_id, "Reusing saved session");
            client
                .restore_session(saved.into_matrix()?)
                .await
                .context("saved session was refused")?;
        }
        None => login(&client, creds).await?,
    }
    Ok(client)
}

async fn login(client: &Client, creds: &Credentials<'_>) -> Result<()> {
    let password = password(creds)?;
    let response = client
        .matrix_auth()
        .login_username(creds.username, &password)
        .initial_device_display_name(creds.device_name)
        .request_refresh_token()
        .send()
        .await
        .with_context(|| format!("login as {} failed", creds.username))?;

    let saved = SavedSession {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        user_id: response.user_id.to_string(),
        device_id: response.device_id.to_string(),
    };
    save_session(creds.session_file, &saved)?;
    info!(user = %saved.user_id, device = %saved.device_id, "Logged in; session saved");
    Ok(())
}

fn password(creds: &Credentials<'_>) -> Result<String> {
    if let Some(p) = creds.password.map(str::trim).filter(|s| !s.is_empty()) {
        return Ok(p.to_owned());
    }
    if !std::io::stdin().is_terminal() {
        bail!(
            "no saved session at {} and no password given",
            creds.session_file.display()
        );
    }
    #[cfg(feature = "rpassword")]
    {
        rpassword::prompt_password(format!("Password for {}: ", creds.username))
            .context("cannot read password")
    }
    #[cfg(not(feature = "rpassword"))]
    {
        Err(anyhow!("built without password prompt; pass --password"))
    }
}

pub(crate) fn load_session(path: &Path) -> Result<Option<SavedSession>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(anyhow!(e).context(format!("cannot read {}", path.display()))),
    };
    serde_json::from_str(&raw)
        .map(Some)
        .with_context(|| format!("{} is not a session file", path.display()))
}

pub(crate) fn save_session(path: &Path, session: &SavedSession) -> Result<()> {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(session)?)
        .with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved() -> SavedSession {
        SavedSession {
            access_token: "tok".to_owned(),
            refresh_token: None,
            user_id: "@bot:example.org".to_owned(),
            device_id: "DEVICE".to_owned(),
        }
    }

    #[test]
    fn session_round_trips_through_disk() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("session.json");
        assert!(load_session(&path).unwrap().is_none());

        save_session(&path, &saved()).unwrap();
        assert_eq!(load_session(&path).unwrap(), Some(saved()));
    }

    #[test]
    fn corrupt_session_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("session.json");
        std::fs::write(&path, "nope").unwrap();
        assert!(load_session(&path).is_err());
    }

    #[test]
    fn saved_session_converts_for_restore() {
        let session = saved().into_matrix().unwrap();
        assert_eq!(session.meta.user_id.as_str(), "@bot:example.org");
        assert_eq!(session.tokens.access_token, "tok");

        let bad = SavedSession {
            user_id: "not-a-user".to_owned(),
            ..saved()
        };
        assert!(bad.into_matrix().is_err());
    }
}
