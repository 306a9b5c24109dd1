use anyhow::{Context, Result};
use keyring::Entry;

use super::SignInForm;

const SERVICE_NAME: &str = "schooldash";

/// Remembered sign-in passwords in the OS keychain.
///
/// Entries are keyed by the normalized email, so `Parent@School.org` and
/// ` parent@school.org` recall the same password.
pub struct CredentialStore;

impl CredentialStore {
    fn entry(email: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, &account_for(email)).context("Failed to create keyring entry")
    }

    /// Keep the password of a sign-in that succeeded.
    pub fn remember(form: &SignInForm) -> Result<()> {
        Self::entry(&form.email)?
            .set_password(&form.password)
            .context("Failed to store password in keychain")
    }

    /// The remembered sign-in for `email`, or `None` when nothing is stored.
    pub fn recall(email: &str) -> Result<Option<SignInForm>> {
        match Self::entry(email)?.get_password() {
            Ok(password) => Ok(Some(SignInForm::new(email, password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve password from keychain"),
        }
    }

    /// Drop the remembered password. Forgetting an unknown email is not an error.
    pub fn forget(email: &str) -> Result<()> {
        match Self::entry(email)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete credential from keychain"),
        }
    }
}

fn account_for(email: &str) -> String {
    email.trim().to_lowercase()
}
