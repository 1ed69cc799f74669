use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;
use uuid::Uuid;

use crate::demo::storage::{BrowserStorage, StorageError};
use crate::domain::validation::{sanitize_email, validate_email, InvalidInput};

pub const MAX_ACTIVITY_ENTRIES: usize = 100;

const ACCOUNTS_KEY: &str = "mindful_accounts";
const SESSION_KEY: &str = "mindful_session";
const REMEMBERED_LOGIN_KEY: &str = "mindful_remembered_login";

const MAX_NAME_LENGTH: usize = 256;
const FORBIDDEN_NAME_CHARS: [char; 9] = ['/', '{', '}', '"', '>', '<', '\\', '(', ')'];
const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error(transparent)]
    InvalidInput(#[from] InvalidInput),
    #[error("An account with this email already exists")]
    EmailTaken,
    // Deliberately the same whether the email exists or not.
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Account not found")]
    NotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub action: String,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// A locally stored account. The password is kept in plain text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub activity: Vec<ActivityEntry>,
}

impl Account {
    /// Appends to the log, dropping the oldest entries past the cap.
    pub fn record_activity(&mut self, action: &str, details: Option<String>) {
        self.activity.push(ActivityEntry {
            id: Uuid::new_v4(),
            action: action.to_string(),
            details,
            timestamp: Utc::now(),
        });

        if self.activity.len() > MAX_ACTIVITY_ENTRIES {
            let overflow = self.activity.len() - MAX_ACTIVITY_ENTRIES;
            self.activity.drain(..overflow);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub logged_in_at: DateTime<Utc>,
    pub remember_me: bool,
}

/// Credentials replayed into the login form when "remember me" was ticked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RememberedLogin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct SignUp {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub bio: Option<String>,
}

/// Fields left as `None` are kept. Id and join date cannot be changed.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
}

pub struct LocalAccounts<S> {
    storage: S,
}

impl<S: BrowserStorage> LocalAccounts<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn accounts(&self) -> Result<Vec<Account>, AccountError> {
        self.read(ACCOUNTS_KEY).map(Option::unwrap_or_default)
    }

    pub fn session(&self) -> Result<Option<Session>, AccountError> {
        self.read(SESSION_KEY)
    }

    pub fn remembered_login(&self) -> Result<Option<RememberedLogin>, AccountError> {
        self.read(REMEMBERED_LOGIN_KEY)
    }

    /// Creates the account and logs it in.
    #[tracing::instrument(name = "Demo account sign up", skip(self, sign_up))]
    pub fn sign_up(&self, sign_up: SignUp) -> Result<Account, AccountError> {
        let first_name = parse_name(&sign_up.first_name)?;
        let last_name = parse_name(&sign_up.last_name)?;
        let email = parse_email(&sign_up.email)?;
        let password = parse_password(&sign_up.password)?;

        let mut accounts = self.accounts()?;
        if accounts.iter().any(|account| account.email == email) {
            return Err(AccountError::EmailTaken);
        }

        let now = Utc::now();
        let mut account = Account {
            id: Uuid::new_v4(),
            first_name,
            last_name,
            email,
            password,
            bio: sign_up.bio.filter(|bio| !bio.trim().is_empty()),
            joined_at: now,
            last_login: Some(now),
            activity: Vec::new(),
        };
        account.record_activity("account_created", None);

        accounts.push(account.clone());
        self.write(ACCOUNTS_KEY, &accounts)?;
        self.start_session(account.id, false)?;

        Ok(account)
    }

    #[tracing::instrument(name = "Demo account log in", skip(self, password))]
    pub fn log_in(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> Result<Account, AccountError> {
        let email = sanitize_email(Some(email));
        let mut accounts = self.accounts()?;

        let account = accounts
            .iter_mut()
            .find(|account| account.email == email && account.password == password)
            .ok_or(AccountError::InvalidCredentials)?;
        account.last_login = Some(Utc::now());
        account.record_activity("login", None);
        let account = account.clone();

        self.write(ACCOUNTS_KEY, &accounts)?;
        self.start_session(account.id, remember_me)?;

        if remember_me {
            self.write(
                REMEMBERED_LOGIN_KEY,
                &RememberedLogin {
                    email: account.email.clone(),
                    password: password.to_string(),
                },
            )?;
        } else {
            self.storage.remove_item(REMEMBERED_LOGIN_KEY)?;
        }

        Ok(account)
    }

    /// Ends the session. Remembered credentials survive a logout.
    pub fn log_out(&self) -> Result<(), AccountError> {
        if let Some(session) = self.session()? {
            match self.log_activity(session.user_id, "logout", None) {
                Ok(()) | Err(AccountError::NotFound) => {}
                Err(err) => return Err(err),
            }
        }

        self.storage.remove_item(SESSION_KEY)?;

        Ok(())
    }

    pub fn current_user(&self) -> Result<Option<Account>, AccountError> {
        let session = match self.session()? {
            Some(session) => session,
            None => return Ok(None),
        };

        Ok(self
            .accounts()?
            .into_iter()
            .find(|account| account.id == session.user_id))
    }

    #[tracing::instrument(name = "Demo account profile update", skip(self, update))]
    pub fn update_profile(&self, id: Uuid, update: ProfileUpdate) -> Result<Account, AccountError> {
        let first_name = update.first_name.as_deref().map(parse_name).transpose()?;
        let last_name = update.last_name.as_deref().map(parse_name).transpose()?;
        let email = update.email.as_deref().map(parse_email).transpose()?;
        let password = update.password.as_deref().map(parse_password).transpose()?;

        let mut accounts = self.accounts()?;

        if let Some(email) = &email {
            if accounts
                .iter()
                .any(|account| account.id != id && &account.email == email)
            {
                return Err(AccountError::EmailTaken);
            }
        }

        let account = accounts
            .iter_mut()
            .find(|account| account.id == id)
            .ok_or(AccountError::NotFound)?;

        if let Some(first_name) = first_name {
            account.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            account.last_name = last_name;
        }
        if let Some(email) = email {
            account.email = email;
        }
        if let Some(password) = password {
            account.password = password;
        }
        if let Some(bio) = update.bio {
            account.bio = Some(bio).filter(|bio| !bio.trim().is_empty());
        }
        account.record_activity("profile_updated", None);
        let account = account.clone();

        self.write(ACCOUNTS_KEY, &accounts)?;

        Ok(account)
    }

    pub fn log_activity(
        &self,
        id: Uuid,
        action: &str,
        details: Option<String>,
    ) -> Result<(), AccountError> {
        let mut accounts = self.accounts()?;
        let account = accounts
            .iter_mut()
            .find(|account| account.id == id)
            .ok_or(AccountError::NotFound)?;

        account.record_activity(action, details);

        self.write(ACCOUNTS_KEY, &accounts)
    }

    /// Removes every account, the session and remembered credentials.
    #[tracing::instrument(name = "Demo account data wipe", skip(self))]
    pub fn clear_all_data(&self) -> Result<(), AccountError> {
        for key in [ACCOUNTS_KEY, SESSION_KEY, REMEMBERED_LOGIN_KEY] {
            self.storage.remove_item(key)?;
        }

        Ok(())
    }

    fn start_session(&self, user_id: Uuid, remember_me: bool) -> Result<(), AccountError> {
        self.write(
            SESSION_KEY,
            &Session {
                user_id,
                logged_in_at: Utc::now(),
                remember_me,
            },
        )
    }

    fn read<T: serde::de::DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AccountError> {
        match self.storage.get_item(key)? {
            Some(raw) => {
                let value = serde_json::from_str(&raw).map_err(StorageError::from)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AccountError> {
        let raw = serde_json::to_string(value).map_err(StorageError::from)?;
        self.storage.set_item(key, &raw)?;

        Ok(())
    }
}

fn parse_name(name: &str) -> Result<String, InvalidInput> {
    let name = name.trim();
    let is_too_long = name.graphemes(true).count() > MAX_NAME_LENGTH;
    let contains_forbidden_chars = name.chars().any(|char| FORBIDDEN_NAME_CHARS.contains(&char));

    if name.is_empty() || is_too_long || contains_forbidden_chars {
        return Err(InvalidInput::new(format!("{} is not a valid name", name)));
    }

    Ok(name.to_string())
}

fn parse_email(email: &str) -> Result<String, InvalidInput> {
    validate_email(Some(email))?;

    Ok(sanitize_email(Some(email)))
}

fn parse_password(password: &str) -> Result<String, InvalidInput> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(InvalidInput::new(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }

    Ok(password.to_string())
}
