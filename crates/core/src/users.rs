//! User directory: accounts and the unique-username invariant.
//!
//! Password verification and hashing belong to the upstream identity
//! provider; this directory only carries the opaque hash and the role used
//! for authorization gating.

use crate::error::{CoaError, CoaResult};
use coa_types::{NonEmptyText, Role};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A stored user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: NonEmptyText,
    pub password_hash: String,
    pub role: Role,
}

/// Partial update applied to an existing account.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

/// Operations exposed by the user directory. Usernames are unique.
pub trait UserDirectory: Send + Sync {
    fn list(&self) -> CoaResult<Vec<UserAccount>>;

    fn find(&self, username: &str) -> CoaResult<Option<UserAccount>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|account| account.username.as_str() == username))
    }

    fn create(&self, account: UserAccount) -> CoaResult<()>;

    fn update(&self, username: &str, update: UserUpdate) -> CoaResult<()>;

    fn delete(&self, username: &str) -> CoaResult<()>;
}

fn apply_update(
    accounts: &mut [UserAccount],
    username: &str,
    update: UserUpdate,
) -> CoaResult<()> {
    let account = accounts
        .iter_mut()
        .find(|account| account.username.as_str() == username)
        .ok_or_else(|| CoaError::UserNotFound(username.to_owned()))?;
    if let Some(password_hash) = update.password_hash {
        account.password_hash = password_hash;
    }
    if let Some(role) = update.role {
        account.role = role;
    }
    Ok(())
}

/// User directory persisted as a JSON file under the data directory.
pub struct JsonFileDirectory {
    path: PathBuf,
}

impl JsonFileDirectory {
    pub fn open(data_dir: &Path) -> CoaResult<Self> {
        fs::create_dir_all(data_dir).map_err(CoaError::DataDirCreation)?;
        Ok(Self {
            path: data_dir.join("users.json"),
        })
    }

    fn read_accounts(&self) -> CoaResult<Vec<UserAccount>> {
        if !self.path.is_file() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(CoaError::FileRead)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&contents).map_err(CoaError::Deserialization)
    }

    fn write_accounts(&self, accounts: &[UserAccount]) -> CoaResult<()> {
        let contents = serde_json::to_string_pretty(accounts).map_err(CoaError::Serialization)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents).map_err(CoaError::FileWrite)?;
        fs::rename(&tmp, &self.path).map_err(CoaError::FileWrite)?;
        Ok(())
    }
}

impl UserDirectory for JsonFileDirectory {
    fn list(&self) -> CoaResult<Vec<UserAccount>> {
        self.read_accounts()
    }

    fn create(&self, account: UserAccount) -> CoaResult<()> {
        let mut accounts = self.read_accounts()?;
        if accounts
            .iter()
            .any(|existing| existing.username == account.username)
        {
            return Err(CoaError::DuplicateUsername(
                account.username.as_str().to_owned(),
            ));
        }
        accounts.push(account);
        self.write_accounts(&accounts)
    }

    fn update(&self, username: &str, update: UserUpdate) -> CoaResult<()> {
        let mut accounts = self.read_accounts()?;
        apply_update(&mut accounts, username, update)?;
        self.write_accounts(&accounts)
    }

    fn delete(&self, username: &str) -> CoaResult<()> {
        let mut accounts = self.read_accounts()?;
        let before = accounts.len();
        accounts.retain(|account| account.username.as_str() != username);
        if accounts.len() == before {
            return Err(CoaError::UserNotFound(username.to_owned()));
        }
        self.write_accounts(&accounts)
    }
}

/// In-memory user directory for tests and demos.
#[derive(Default)]
pub struct MemoryDirectory {
    accounts: std::sync::Mutex<Vec<UserAccount>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDirectory for MemoryDirectory {
    fn list(&self) -> CoaResult<Vec<UserAccount>> {
        Ok(self.accounts.lock().expect("directory lock poisoned").clone())
    }

    fn create(&self, account: UserAccount) -> CoaResult<()> {
        let mut accounts = self.accounts.lock().expect("directory lock poisoned");
        if accounts
            .iter()
            .any(|existing| existing.username == account.username)
        {
            return Err(CoaError::DuplicateUsername(
                account.username.as_str().to_owned(),
            ));
        }
        accounts.push(account);
        Ok(())
    }

    fn update(&self, username: &str, update: UserUpdate) -> CoaResult<()> {
        let mut accounts = self.accounts.lock().expect("directory lock poisoned");
        apply_update(&mut accounts, username, update)
    }

    fn delete(&self, username: &str) -> CoaResult<()> {
        let mut accounts = self.accounts.lock().expect("directory lock poisoned");
        let before = accounts.len();
        accounts.retain(|account| account.username.as_str() != username);
        if accounts.len() == before {
            return Err(CoaError::UserNotFound(username.to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn account(name: &str, role: Role) -> UserAccount {
        UserAccount {
            username: NonEmptyText::new(name).unwrap(),
            password_hash: format!("hash-{name}"),
            role,
        }
    }

    #[test]
    fn test_create_rejects_duplicate_username() {
        let directory = MemoryDirectory::new();
        directory.create(account("qa1", Role::Operator)).unwrap();
        let err = directory.create(account("qa1", Role::Supervisor));
        assert!(matches!(err, Err(CoaError::DuplicateUsername(name)) if name == "qa1"));
    }

    #[test]
    fn test_update_changes_only_requested_fields() {
        let directory = MemoryDirectory::new();
        directory.create(account("qa1", Role::Operator)).unwrap();
        directory
            .update(
                "qa1",
                UserUpdate {
                    role: Some(Role::Supervisor),
                    ..Default::default()
                },
            )
            .unwrap();
        let found = directory.find("qa1").unwrap().unwrap();
        assert_eq!(found.role, Role::Supervisor);
        assert_eq!(found.password_hash, "hash-qa1");
    }

    #[test]
    fn test_delete_missing_user_errors() {
        let directory = MemoryDirectory::new();
        assert!(matches!(
            directory.delete("nadie"),
            Err(CoaError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_file_directory_round_trip() {
        let dir = TempDir::new().unwrap();
        let directory = JsonFileDirectory::open(dir.path()).unwrap();
        directory.create(account("admin", Role::Administrator)).unwrap();
        directory.create(account("qa1", Role::Operator)).unwrap();

        assert_eq!(directory.list().unwrap().len(), 2);
        directory.delete("qa1").unwrap();
        assert!(directory.find("qa1").unwrap().is_none());
        assert!(directory.find("admin").unwrap().is_some());
    }
}
