// src/auth.rs
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::session::{SessionManager, SessionStoreError};

/// Access roles, ordered by seniority: every role grants everything the
/// roles below it grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Admin,
}

impl Role {
    fn rank(self) -> u8 {
        match self {
            Role::User => 0,
            Role::Manager => 1,
            Role::Admin => 2,
        }
    }

    /// Whether this role covers the capabilities of `required`.
    pub fn grants(self, required: Role) -> bool {
        self.rank() >= required.rank()
    }
}

/// Capability check for a single required role.
pub fn has_role(current: Role, required: Role) -> bool {
    current.grants(required)
}

/// Capability check against a list of acceptable roles; true if any of
/// them is covered by the current role.
pub fn has_any_role(current: Role, required: &[Role]) -> bool {
    required.iter().any(|r| current.grants(*r))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub username: String,
    pub id: String,
    pub name: String,
    pub email: String,
    pub department: String,
    pub position: String,
    pub role: Role,
    pub manager: Option<String>,
    pub start_date: NaiveDate,
    pub active: bool,
}

#[derive(Error, Debug)]
pub enum AuthError {
    /// One message for unknown user, wrong password and deactivated
    /// account alike; the response must not reveal which it was.
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Session(#[from] SessionStoreError),
}

/// Lookup of login credentials. Async so a database- or directory-backed
/// implementation can slot in behind the same trait.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Returns the employee record iff the username exists, the password
    /// matches and the account is active.
    async fn verify(&self, username: &str, password: &str) -> Option<Employee>;

    /// Replaces the password after verifying the current one. Returns
    /// false on any mismatch, without distinguishing the cause.
    async fn set_password(&self, username: &str, current: &str, new_password: &str) -> bool;
}

fn sha256_hex(input: &str) -> String {
    hex::encode(Sha256::digest(input.as_bytes()))
}

struct Account {
    username: String,
    password_digest: String,
    employee: Employee,
}

static SEED_ACCOUNTS: Lazy<Vec<(&str, &str, Employee)>> = Lazy::new(|| {
    let start = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
    vec![
        (
            "user1",
            "password1",
            Employee {
                username: "user1".into(),
                id: "E-01".into(),
                name: "Anna Nilsson".into(),
                email: "anna.nilsson@example.com".into(),
                department: "Training".into(),
                position: "Coordinator".into(),
                role: Role::User,
                manager: Some("E-02".into()),
                start_date: start(2021, 3, 1),
                active: true,
            },
        ),
        (
            "manager1",
            "password2",
            Employee {
                username: "manager1".into(),
                id: "E-02".into(),
                name: "Per Holm".into(),
                email: "per.holm@example.com".into(),
                department: "Training".into(),
                position: "Training Manager".into(),
                role: Role::Manager,
                manager: Some("E-03".into()),
                start_date: start(2018, 9, 15),
                active: true,
            },
        ),
        (
            "admin1",
            "password3",
            Employee {
                username: "admin1".into(),
                id: "E-03".into(),
                name: "Eva Strand".into(),
                email: "eva.strand@example.com".into(),
                department: "Operations".into(),
                position: "Site Administrator".into(),
                role: Role::Admin,
                manager: None,
                start_date: start(2015, 1, 12),
                active: true,
            },
        ),
        (
            "former1",
            "password4",
            Employee {
                username: "former1".into(),
                id: "E-04".into(),
                name: "Ola Grens".into(),
                email: "ola.grens@example.com".into(),
                department: "Training".into(),
                position: "Instructor".into(),
                role: Role::User,
                manager: Some("E-02".into()),
                start_date: start(2019, 6, 1),
                active: false,
            },
        ),
    ]
});

/// Fixed credential table seeded in code. Passwords are kept as SHA-256
/// digests; the Mutex is only there so password changes can rewrite them.
pub struct SeededCredentials {
    accounts: Mutex<Vec<Account>>,
}

impl SeededCredentials {
    pub fn new() -> Self {
        let accounts = SEED_ACCOUNTS
            .iter()
            .map(|(username, password, employee)| Account {
                username: (*username).to_string(),
                password_digest: sha256_hex(password),
                employee: employee.clone(),
            })
            .collect();
        Self {
            accounts: Mutex::new(accounts),
        }
    }
}

impl Default for SeededCredentials {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for SeededCredentials {
    async fn verify(&self, username: &str, password: &str) -> Option<Employee> {
        let accounts = self.accounts.lock().unwrap();
        let account = accounts.iter().find(|a| a.username == username)?;
        if account.password_digest != sha256_hex(password) {
            debug!("Password mismatch for {}", username);
            return None;
        }
        if !account.employee.active {
            debug!("Deactivated account {}", username);
            return None;
        }
        Some(account.employee.clone())
    }

    async fn set_password(&self, username: &str, current: &str, new_password: &str) -> bool {
        let mut accounts = self.accounts.lock().unwrap();
        let Some(account) = accounts.iter_mut().find(|a| a.username == username) else {
            return false;
        };
        if account.password_digest != sha256_hex(current) || !account.employee.active {
            return false;
        }
        account.password_digest = sha256_hex(new_password);
        true
    }
}

/// Login/logout and password changes. Every credential operation waits a
/// fixed configured latency first, standing in for the round trip a real
/// identity backend would cost; there is no retry or cancellation path.
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<SessionManager>,
    latency: Duration,
}

impl AuthService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<SessionManager>,
        latency: Duration,
    ) -> Self {
        Self {
            credentials,
            sessions,
            latency,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Employee, AuthError> {
        tokio::time::sleep(self.latency).await;
        match self.credentials.verify(username, password).await {
            Some(employee) => {
                self.sessions.open(employee.clone())?;
                info!("Login succeeded for {}", username);
                Ok(employee)
            }
            None => {
                warn!("Login rejected for {}", username);
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub fn logout(&self) -> Result<(), SessionStoreError> {
        self.sessions.close()
    }

    pub async fn change_password(
        &self,
        username: &str,
        current: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        tokio::time::sleep(self.latency).await;
        if self
            .credentials
            .set_password(username, current, new_password)
            .await
        {
            info!("Password changed for {}", username);
            Ok(())
        } else {
            warn!("Password change rejected for {}", username);
            Err(AuthError::InvalidCredentials)
        }
    }
}
