//! Master password gate.

use tracing::{debug, info};
use zeroize::Zeroize;

use crate::crypto::MasterCrypto;
use crate::error::{PassbookError, Result};
use crate::models::MasterRecord;
use crate::store::EntryStore;

/// Number of login attempts before giving up.
pub const MAX_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No master password stored yet.
    Uninitialized,
    Locked,
    Unlocked,
}

/// Guards access to an [`EntryStore`] behind the master password.
pub struct MasterGate {
    store: EntryStore,
    crypto: MasterCrypto,
    state: GateState,
}

impl MasterGate {
    /// Wrap an opened store; the gate starts locked or uninitialized.
    pub fn new(store: EntryStore) -> Self {
        let state = if store.master().is_some() {
            GateState::Locked
        } else {
            GateState::Uninitialized
        };
        Self {
            store,
            crypto: MasterCrypto::new(),
            state,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Store the first master password and unlock.
    pub fn initialize(&mut self, password: &str) -> Result<()> {
        if self.state != GateState::Uninitialized {
            return Err(PassbookError::AlreadyInitialized);
        }
        if password.is_empty() {
            return Err(PassbookError::InvalidInput(
                "Master password cannot be empty.".to_string(),
            ));
        }

        let digest = self.crypto.hash(password)?;
        self.store.set_master(MasterRecord::from(digest))?;
        self.state = GateState::Unlocked;
        info!("master password created");
        Ok(())
    }

    /// Check `password` against the stored master password.
    pub fn unlock(&mut self, password: &str) -> Result<()> {
        let record = match (self.state, self.store.master()) {
            (GateState::Unlocked, _) => return Ok(()),
            (_, Some(record)) => record,
            (_, None) => return Err(PassbookError::NotInitialized),
        };

        if self.crypto.verify(password, &record.digest())? {
            self.state = GateState::Unlocked;
            debug!("gate unlocked");
            Ok(())
        } else {
            debug!("master password mismatch");
            Err(PassbookError::AuthFailed)
        }
    }

    /// Hand out the store once unlocked.
    pub fn into_store(self) -> Result<EntryStore> {
        match self.state {
            GateState::Unlocked => Ok(self.store),
            GateState::Uninitialized => Err(PassbookError::NotInitialized),
            GateState::Locked => Err(PassbookError::AuthFailed),
        }
    }
}

/// Run first-time setup with `ask` supplying (password, confirmation) pairs.
///
/// Empty passwords and mismatched confirmations are reported through
/// `notify` and asked again.
pub fn run_setup<A, N>(gate: &mut MasterGate, mut ask: A, mut notify: N) -> Result<()>
where
    A: FnMut() -> Result<(String, String)>,
    N: FnMut(&str) -> Result<()>,
{
    loop {
        let (mut first, mut second) = ask()?;
        let outcome = if first.is_empty() {
            Some("Master password cannot be empty.")
        } else if first != second {
            Some("Passwords do not match. Try again.")
        } else {
            None
        };

        let result = match outcome {
            Some(msg) => notify(msg).map(|_| false),
            None => gate.initialize(&first).map(|_| true),
        };
        first.zeroize();
        second.zeroize();

        if result? {
            return Ok(());
        }
    }
}

/// Ask for the master password up to [`MAX_ATTEMPTS`] times.
pub fn run_login<A, N>(gate: &mut MasterGate, mut ask: A, mut notify: N) -> Result<()>
where
    A: FnMut() -> Result<String>,
    N: FnMut(&str) -> Result<()>,
{
    for _ in 0..MAX_ATTEMPTS {
        let mut password = ask()?;
        let result = gate.unlock(&password);
        password.zeroize();

        match result {
            Ok(()) => return Ok(()),
            Err(PassbookError::AuthFailed) => notify("Incorrect password.")?,
            Err(e) => return Err(e),
        }
    }
    Err(PassbookError::AuthFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewEntry;
    use crate::store::DATA_FILE_NAME;
    use tempfile::tempdir;

    #[test]
    fn test_first_run_unlocks() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        let mut gate = MasterGate::new(EntryStore::open(&path).unwrap());
        assert_eq!(gate.state(), GateState::Uninitialized);

        gate.initialize("hunter2").unwrap();
        assert_eq!(gate.state(), GateState::Unlocked);

        let reopened = MasterGate::new(EntryStore::open(&path).unwrap());
        assert_eq!(reopened.state(), GateState::Locked);
    }

    #[test]
    fn test_wrong_password_is_auth_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        MasterGate::new(EntryStore::open(&path).unwrap())
            .initialize("hunter2")
            .unwrap();

        let mut gate = MasterGate::new(EntryStore::open(&path).unwrap());
        assert!(matches!(gate.unlock("hunter3"), Err(PassbookError::AuthFailed)));
        assert_eq!(gate.state(), GateState::Locked);
        assert!(matches!(gate.into_store(), Err(PassbookError::AuthFailed)));
    }

    #[test]
    fn test_right_password_gives_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        let mut gate = MasterGate::new(EntryStore::open(&path).unwrap());
        gate.initialize("hunter2").unwrap();
        let mut store = gate.into_store().unwrap();
        store
            .add(NewEntry {
                name: "Email".to_string(),
                ..Default::default()
            })
            .unwrap();

        let mut gate = MasterGate::new(EntryStore::open(&path).unwrap());
        gate.unlock("hunter2").unwrap();
        let store = gate.into_store().unwrap();
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn test_unlock_before_setup() {
        let dir = tempdir().unwrap();
        let mut gate = MasterGate::new(EntryStore::open(dir.path().join(DATA_FILE_NAME)).unwrap());
        assert!(matches!(gate.unlock("x"), Err(PassbookError::NotInitialized)));
    }

    #[test]
    fn test_initialize_twice() {
        let dir = tempdir().unwrap();
        let mut gate = MasterGate::new(EntryStore::open(dir.path().join(DATA_FILE_NAME)).unwrap());
        gate.initialize("a").unwrap();
        assert!(matches!(
            gate.initialize("b"),
            Err(PassbookError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_setup_reprompts() {
        let dir = tempdir().unwrap();
        let mut gate = MasterGate::new(EntryStore::open(dir.path().join(DATA_FILE_NAME)).unwrap());

        let mut answers = vec![
            ("good".to_string(), "good".to_string()),
            ("one".to_string(), "two".to_string()),
            (String::new(), String::new()),
        ];
        let mut notes = Vec::new();
        run_setup(
            &mut gate,
            || answers.pop().ok_or(PassbookError::Cancelled),
            |msg| {
                notes.push(msg.to_string());
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(gate.state(), GateState::Unlocked);
        assert_eq!(notes.len(), 2);
        assert!(gate.unlock("good").is_ok());
    }

    #[test]
    fn test_login_gives_up_after_three() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        MasterGate::new(EntryStore::open(&path).unwrap())
            .initialize("right")
            .unwrap();

        let mut gate = MasterGate::new(EntryStore::open(&path).unwrap());
        let mut asked = 0;
        let result = run_login(
            &mut gate,
            || {
                asked += 1;
                Ok("wrong".to_string())
            },
            |_| Ok(()),
        );
        assert!(matches!(result, Err(PassbookError::AuthFailed)));
        assert_eq!(asked, MAX_ATTEMPTS);
    }

    #[test]
    fn test_login_second_attempt() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        MasterGate::new(EntryStore::open(&path).unwrap())
            .initialize("right")
            .unwrap();

        let mut gate = MasterGate::new(EntryStore::open(&path).unwrap());
        let mut answers = vec!["right".to_string(), "wrong".to_string()];
        run_login(&mut gate, || Ok(answers.pop().unwrap()), |_| Ok(())).unwrap();
        assert_eq!(gate.state(), GateState::Unlocked);
    }

    #[test]
    fn test_setup_stops_when_notify_fails() {
        let dir = tempdir().unwrap();
        let mut gate = MasterGate::new(EntryStore::open(dir.path().join(DATA_FILE_NAME)).unwrap());

        let mut asked = 0;
        let result = run_setup(
            &mut gate,
            || {
                asked += 1;
                Ok(("one".to_string(), "two".to_string()))
            },
            |_| Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into()),
        );

        assert!(matches!(result, Err(PassbookError::Io(_))));
        assert_eq!(asked, 1);
        assert_eq!(gate.state(), GateState::Uninitialized);
    }

    #[test]
    fn test_login_stops_when_notify_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(DATA_FILE_NAME);
        MasterGate::new(EntryStore::open(&path).unwrap())
            .initialize("right")
            .unwrap();

        let mut gate = MasterGate::new(EntryStore::open(&path).unwrap());
        let mut asked = 0;
        let result = run_login(
            &mut gate,
            || {
                asked += 1;
                Ok("wrong".to_string())
            },
            |_| Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe).into()),
        );

        assert!(matches!(result, Err(PassbookError::Io(_))));
        assert_eq!(asked, 1);
        assert_eq!(gate.state(), GateState::Locked);
    }
}
