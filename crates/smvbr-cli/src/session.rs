// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use smvbr_app::SessionContext;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::config::APP_NAME;

const SESSION_VERSION: i64 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    version: i64,
    user: SessionContext,
}

/// Persists the signed-in user between invocations.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("SMVBR_SESSION_PATH") {
            return Ok(PathBuf::from(path));
        }

        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set SMVBR_SESSION_PATH to the session file")
        })?;
        Ok(data_root.join(APP_NAME).join("session.toml"))
    }

    /// Returns `None` when nobody is signed in. A session file from another
    /// version is treated as signed out.
    pub fn load(&self) -> Result<Option<SessionContext>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read session file {}", self.path.display()))?;
        let file: SessionFile = toml::from_str(&raw).with_context(|| {
            format!(
                "parse session file {}; run `smvbr logout` to reset it",
                self.path.display()
            )
        })?;

        if file.version != SESSION_VERSION {
            tracing::warn!(
                path = %self.path.display(),
                version = file.version,
                "ignoring session file with unsupported version"
            );
            return Ok(None);
        }
        Ok(Some(file.user))
    }

    /// Like [`SessionStore::load`], but an unreadable session file only
    /// logs a warning. For commands that work signed out.
    pub fn load_or_signed_out(&self) -> Option<SessionContext> {
        self.load().unwrap_or_else(|error| {
            tracing::warn!(
                path = %self.path.display(),
                error = format!("{error:#}"),
                "ignoring unreadable session file"
            );
            None
        })
    }

    pub fn save(&self, session: &SessionContext) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create session directory {}", parent.display()))?;
        }

        let file = SessionFile {
            version: SESSION_VERSION,
            user: session.clone(),
        };
        let raw = toml::to_string(&file).context("encode session")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("write session file {}", self.path.display()))?;
        tracing::info!(user_id = %session.user_id, "session saved");
        Ok(())
    }

    /// Removes the session file. Returns whether one existed.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)
            .with_context(|| format!("remove session file {}", self.path.display()))?;
        Ok(true)
    }
}
