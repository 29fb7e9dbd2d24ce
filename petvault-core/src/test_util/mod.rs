//! In-memory fakes for the provider, cache and pet store boundaries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use petvault_common::{Identity, Pet, PetDraft, PetUpdate, UserProfile, UserRole};
use tokio::sync::broadcast;

use crate::auth::{AuthError, AuthStateChange, AuthenticatedUser, IdentityProvider};
use crate::cache::{CacheError, CachedSession, SessionCache};
use crate::pets::{PetError, PetStore};

const MIN_PASSWORD_LEN: usize = 6;

struct FakeAccount {
    password: String,
    identity: Identity,
}

/// Scriptable in-memory identity provider.
pub struct FakeIdentityProvider {
    changes: broadcast::Sender<AuthStateChange>,
    accounts: Mutex<HashMap<String, FakeAccount>>,
    profiles: Mutex<HashMap<String, UserProfile>>,
    current: Mutex<Option<Identity>>,
    profile_fetch_fails: AtomicBool,
    next_sign_out_error: Mutex<Option<AuthError>>,
}

impl FakeIdentityProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            changes,
            accounts: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
            profile_fetch_fails: AtomicBool::new(false),
            next_sign_out_error: Mutex::new(None),
        }
    }

    /// Register an account with a matching profile record.
    pub fn add_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
        role: UserRole,
    ) -> (Identity, UserProfile) {
        let now = Utc::now();
        let identity = Identity {
            uid: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: display_name.to_string(),
        };
        let profile = UserProfile {
            uid: identity.uid.clone(),
            email: email.to_string(),
            display_name: display_name.to_string(),
            role,
            created_at: now,
            updated_at: now,
            last_login_at: now,
        };

        self.accounts.lock().unwrap().insert(
            email.to_string(),
            FakeAccount {
                password: password.to_string(),
                identity: identity.clone(),
            },
        );
        self.profiles
            .lock()
            .unwrap()
            .insert(identity.uid.clone(), profile.clone());

        (identity, profile)
    }

    /// Drop the profile record while keeping the account.
    pub fn remove_profile(&self, uid: &str) {
        self.profiles.lock().unwrap().remove(uid);
    }

    /// Set the provider-side active identity without notifying.
    pub fn set_current(&self, identity: Option<Identity>) {
        *self.current.lock().unwrap() = identity;
    }

    /// Push a change notification to subscribers.
    pub fn emit(&self, change: AuthStateChange) {
        let _ = self.changes.send(change);
    }

    /// Make `current_user_profile` fail with a network error.
    pub fn fail_profile_fetch(&self, fail: bool) {
        self.profile_fetch_fails.store(fail, Ordering::SeqCst);
    }

    /// Make the next `sign_out` call fail.
    pub fn fail_next_sign_out(&self, error: AuthError) {
        *self.next_sign_out_error.lock().unwrap() = Some(error);
    }
}

impl Default for FakeIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentityProvider {
    async fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        let identity = {
            let accounts = self.accounts.lock().unwrap();
            let account = accounts.get(email).ok_or(AuthError::InvalidCredentials)?;
            if account.password != password {
                return Err(AuthError::InvalidCredentials);
            }
            account.identity.clone()
        };

        self.set_current(Some(identity.clone()));
        self.emit(Some(identity.clone()));

        let profile = {
            let mut profiles = self.profiles.lock().unwrap();
            let profile = profiles
                .get(&identity.uid)
                .cloned()
                .ok_or(AuthError::UserDataNotFound)?;
            // Server-side last-login side effect.
            let now = Utc::now();
            if let Some(stored) = profiles.get_mut(&identity.uid) {
                stored.last_login_at = now;
                stored.updated_at = now;
            }
            profile
        };

        Ok(AuthenticatedUser { identity, profile })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<AuthenticatedUser, AuthError> {
        if !email.contains('@') {
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        if self.accounts.lock().unwrap().contains_key(email) {
            return Err(AuthError::EmailInUse);
        }

        let (identity, profile) = self.add_account(email, password, display_name, UserRole::User);
        self.set_current(Some(identity.clone()));
        self.emit(Some(identity.clone()));

        Ok(AuthenticatedUser { identity, profile })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(error) = self.next_sign_out_error.lock().unwrap().take() {
            return Err(error);
        }
        self.set_current(None);
        self.emit(None);
        Ok(())
    }

    async fn current_user_profile(&self) -> Result<Option<UserProfile>, AuthError> {
        if self.profile_fetch_fails.load(Ordering::SeqCst) {
            return Err(AuthError::Network("simulated connection failure".to_string()));
        }
        let current = self.current.lock().unwrap().clone();
        match current {
            Some(identity) => Ok(self.profiles.lock().unwrap().get(&identity.uid).cloned()),
            None => Ok(None),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthStateChange> {
        self.changes.subscribe()
    }
}

/// In-memory session cache with injectable failures.
pub struct MemorySessionCache {
    entry: Mutex<Option<CachedSession>>,
    load_fails: AtomicBool,
    save_fails: AtomicBool,
}

impl MemorySessionCache {
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(None),
            load_fails: AtomicBool::new(false),
            save_fails: AtomicBool::new(false),
        }
    }

    pub fn seed(&self, identity: &Identity, profile: &UserProfile) {
        *self.entry.lock().unwrap() = Some(CachedSession {
            identity: identity.clone(),
            profile: profile.clone(),
        });
    }

    pub fn entry(&self) -> Option<CachedSession> {
        self.entry.lock().unwrap().clone()
    }

    pub fn fail_load(&self, fail: bool) {
        self.load_fails.store(fail, Ordering::SeqCst);
    }

    pub fn fail_save(&self, fail: bool) {
        self.save_fails.store(fail, Ordering::SeqCst);
    }
}

impl Default for MemorySessionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCache for MemorySessionCache {
    fn load(&self) -> Result<Option<CachedSession>, CacheError> {
        if self.load_fails.load(Ordering::SeqCst) {
            return Err(CacheError::Io("simulated read failure".to_string()));
        }
        Ok(self.entry())
    }

    fn save(&self, identity: &Identity, profile: &UserProfile) -> Result<(), CacheError> {
        if self.save_fails.load(Ordering::SeqCst) {
            return Err(CacheError::Io("simulated write failure".to_string()));
        }
        self.seed(identity, profile);
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        *self.entry.lock().unwrap() = None;
        Ok(())
    }
}

/// In-memory owner-scoped pet store.
pub struct MemoryPetStore {
    pets: Mutex<HashMap<String, Vec<Pet>>>,
}

impl MemoryPetStore {
    pub fn new() -> Self {
        Self {
            pets: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryPetStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PetStore for MemoryPetStore {
    async fn list(&self, owner_id: &str) -> Result<Vec<Pet>, PetError> {
        Ok(self
            .pets
            .lock()
            .unwrap()
            .get(owner_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get(&self, owner_id: &str, id: &str) -> Result<Pet, PetError> {
        self.pets
            .lock()
            .unwrap()
            .get(owner_id)
            .and_then(|pets| pets.iter().find(|p| p.id == id))
            .cloned()
            .ok_or(PetError::NotFound)
    }

    async fn create(&self, owner_id: &str, draft: PetDraft) -> Result<Pet, PetError> {
        let now = Utc::now();
        let pet = Pet {
            id: uuid::Uuid::new_v4().to_string(),
            name: draft.name,
            age: draft.age,
            category: draft.category,
            breed: draft.breed,
            photo_url: draft.photo_url,
            description: draft.description,
            owner_id: owner_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.pets
            .lock()
            .unwrap()
            .entry(owner_id.to_string())
            .or_default()
            .push(pet.clone());
        Ok(pet)
    }

    async fn update(&self, owner_id: &str, id: &str, update: PetUpdate) -> Result<Pet, PetError> {
        let mut pets = self.pets.lock().unwrap();
        let pet = pets
            .get_mut(owner_id)
            .and_then(|pets| pets.iter_mut().find(|p| p.id == id))
            .ok_or(PetError::NotFound)?;
        pet.apply(update, Utc::now());
        Ok(pet.clone())
    }

    async fn delete(&self, owner_id: &str, id: &str) -> Result<(), PetError> {
        let mut pets = self.pets.lock().unwrap();
        let owner_pets = pets.get_mut(owner_id).ok_or(PetError::NotFound)?;
        let before = owner_pets.len();
        owner_pets.retain(|p| p.id != id);
        if owner_pets.len() == before {
            return Err(PetError::NotFound);
        }
        Ok(())
    }
}
