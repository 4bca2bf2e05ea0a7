//! Run identity shared by every scenario.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Password used for generated accounts
pub const DEFAULT_PASSWORD: &str = "password123";

/// Display name used for generated accounts
pub const DEFAULT_DISPLAY_NAME: &str = "Test User";

/// Credentials and naming stamp for one run.
///
/// Created once, then borrowed by every step that needs credentials. The email
/// embeds the creation second so runs started in different seconds never
/// collide on the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    email: String,
    password: String,
    display_name: String,
    run_stamp: i64,
}

impl Session {
    /// Session stamped with the current Unix time
    #[must_use]
    pub fn generate() -> Self {
        Self::from_stamp(Utc::now().timestamp())
    }

    /// Session for a fixed stamp
    #[must_use]
    pub fn from_stamp(run_stamp: i64) -> Self {
        Self {
            email: format!("test_{run_stamp}@example.com"),
            password: DEFAULT_PASSWORD.to_string(),
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            run_stamp,
        }
    }

    /// Generated email address
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Account password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Account display name
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Unix seconds the session was stamped with
    #[must_use]
    pub const fn run_stamp(&self) -> i64 {
        self.run_stamp
    }

    /// Run-unique label, e.g. `Test Workout 1700000000`
    #[must_use]
    pub fn unique_label(&self, prefix: &str) -> String {
        format!("{prefix} {}", self.run_stamp)
    }
}

/// Lowercase `name` and collapse each whitespace run into one `-`.
///
/// Matches the way the app derives list item ids from item names.
#[must_use]
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push('-');
            }
            in_space = true;
        } else {
            out.extend(c.to_lowercase());
            in_space = false;
        }
    }
    out
}
