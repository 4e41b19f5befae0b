//! Identity and access guard: registration, credential checks, and bearer
//! tokens recorded server-side with an expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::http::{header, HeaderMap};
use chrono::{DateTime, Duration, Utc};
use rand::distributions::{Alphanumeric, Distribution};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use super::domain::{Account, AccountId, Role};
use super::error::PortalError;
use super::store::{AccountStore, StoreError};

const TOKEN_LENGTH: usize = 64;

/// Authenticated caller identity derived from a bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub account_id: AccountId,
    pub role: Role,
}

impl Caller {
    pub fn require_admin(&self) -> Result<(), PortalError> {
        if self.role == Role::Administrator {
            Ok(())
        } else {
            Err(PortalError::PermissionDenied)
        }
    }

    pub fn require_registrant(&self) -> Result<(), PortalError> {
        if self.role == Role::Registrant {
            Ok(())
        } else {
            Err(PortalError::PermissionDenied)
        }
    }
}

/// Successful login payload.
#[derive(Debug, Clone, Serialize)]
pub struct LoginGrant {
    pub token: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
struct Session {
    account_id: AccountId,
    role: Role,
    expires_at: DateTime<Utc>,
}

/// Account registration, login, and token verification over an [`AccountStore`].
pub struct AuthService<A> {
    accounts: Arc<A>,
    sessions: Mutex<HashMap<String, Session>>,
    token_ttl: Duration,
}

impl<A> AuthService<A>
where
    A: AccountStore + 'static,
{
    pub fn new(accounts: Arc<A>, token_ttl: Duration) -> Self {
        Self {
            accounts,
            sessions: Mutex::new(HashMap::new()),
            token_ttl,
        }
    }

    /// Create a registrant account with a hashed credential.
    pub fn register(&self, email: &str, password: &str) -> Result<Account, PortalError> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(PortalError::Validation(
                "a valid email is required".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(PortalError::Validation("password is required".to_string()));
        }

        let hash = hash_password(password)?;
        match self.accounts.insert(email, &hash, Role::Registrant) {
            Ok(account) => Ok(account),
            Err(StoreError::Conflict) => Err(PortalError::EmailTaken),
            Err(err) => Err(PortalError::storage(err)),
        }
    }

    /// Idempotently create the administrator account configured at startup.
    pub fn seed_admin(&self, email: &str, password: &str) -> Result<(), PortalError> {
        if self
            .accounts
            .find_by_email(email)
            .map_err(PortalError::storage)?
            .is_some()
        {
            return Ok(());
        }

        let hash = hash_password(password)?;
        match self.accounts.insert(email, &hash, Role::Administrator) {
            // A concurrent seed beat us to it; the account exists either way.
            Ok(_) | Err(StoreError::Conflict) => Ok(()),
            Err(err) => Err(PortalError::storage(err)),
        }
    }

    /// Check credentials and issue a bearer token. Unknown email and wrong
    /// password are indistinguishable to the caller.
    pub fn login(&self, email: &str, password: &str) -> Result<LoginGrant, PortalError> {
        let account = self
            .accounts
            .find_by_email(email.trim())
            .map_err(PortalError::storage)?
            .ok_or(PortalError::InvalidCredentials)?;

        if !verify_password(password, &account.password_hash)? {
            return Err(PortalError::InvalidCredentials);
        }

        let token = issue_token();
        let session = Session {
            account_id: account.id,
            role: account.role,
            expires_at: Utc::now() + self.token_ttl,
        };

        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| PortalError::Storage("session table mutex poisoned".to_string()))?;
        sessions.insert(token.clone(), session);

        tracing::info!(account_id = account.id.0, role = account.role.label(), "login");
        Ok(LoginGrant {
            token,
            role: account.role,
        })
    }

    /// Resolve a bearer token to a caller identity, pruning it when expired.
    pub fn verify(&self, token: &str) -> Result<Caller, PortalError> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| PortalError::Storage("session table mutex poisoned".to_string()))?;

        match sessions.get(token) {
            Some(session) if session.expires_at > Utc::now() => Ok(Caller {
                account_id: session.account_id,
                role: session.role,
            }),
            Some(_) => {
                sessions.remove(token);
                Err(PortalError::InvalidToken)
            }
            None => Err(PortalError::InvalidToken),
        }
    }

    /// Extract and verify the `Authorization: Bearer` header.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<Caller, PortalError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(PortalError::MissingToken)?
            .to_str()
            .map_err(|_| PortalError::InvalidToken)?;
        let token = value
            .strip_prefix("Bearer ")
            .ok_or(PortalError::MissingToken)?;
        self.verify(token)
    }

    #[cfg(test)]
    fn expire_all(&self) {
        let mut sessions = self.sessions.lock().expect("session mutex poisoned");
        for session in sessions.values_mut() {
            session.expires_at = Utc::now() - Duration::seconds(1);
        }
    }
}

fn issue_token() -> String {
    let mut rng = StdRng::from_entropy();
    (0..TOKEN_LENGTH)
        .map(|_| Alphanumeric.sample(&mut rng) as char)
        .collect()
}

fn hash_password(password: &str) -> Result<String, PortalError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| PortalError::Storage(format!("credential hashing failed: {err}")))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, PortalError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|err| PortalError::Storage(format!("stored credential malformed: {err}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
