//! Client-side account simulation used by the site's demo pages.
//!
//! **Not an authentication system.** Passwords are stored and compared in plain text, nothing
//! is verified by a server and any holder of the storage can read or forge every record. It
//! exists to demonstrate an account lifecycle and must never guard real data. It is not wired
//! into the HTTP API.

pub mod accounts;
pub mod storage;

pub use accounts::{
    Account, AccountError, ActivityEntry, LocalAccounts, ProfileUpdate, RememberedLogin, Session,
    SignUp, MAX_ACTIVITY_ENTRIES,
};
pub use storage::{BrowserStorage, FileStorage, MemoryStorage, StorageError};
