//! Hand-written port doubles shared by the unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::{
    AccessToken, DataPlug, FileId, FileVisibility, HatDomain, Note, NoteId, PendingImage,
};
use crate::ports::{
    Alert, AuthResult, AuthSurface, Choice, CredentialStore, HatApiError, HatService,
    Interaction, Prompt, Renewable, TokenStatus, UploadProgress, USER_TOKEN_KEY,
};
use crate::token_store::TokenStore;

pub(crate) fn domain() -> HatDomain {
    HatDomain::new("alice.hat.net").unwrap()
}

pub(crate) fn token(value: &str) -> AccessToken {
    AccessToken::new(value).unwrap()
}

pub(crate) fn token_store(initial: &str) -> Arc<TokenStore> {
    Arc::new(TokenStore::new(Arc::new(MemoryCredentialStore::with_token(
        initial,
    ))))
}

// ============================================================================
// MemoryCredentialStore
// ============================================================================

pub(crate) struct MemoryCredentialStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: bool,
}

impl MemoryCredentialStore {
    pub(crate) fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            fail_writes: false,
        }
    }

    pub(crate) fn with_token(value: &str) -> Self {
        let store = Self::new();
        store
            .values
            .lock()
            .unwrap()
            .insert(USER_TOKEN_KEY.to_string(), value.to_string());
        store
    }

    pub(crate) fn failing_writes() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            fail_writes: true,
        }
    }

    pub(crate) fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("credential store is read-only");
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}

// ============================================================================
// MockHat
// ============================================================================

/// One recorded call: the operation name, the token it carried and a detail
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub op: &'static str,
    pub token: String,
    pub detail: String,
}

/// Scriptable HAT double that records every call in order
pub(crate) struct MockHat {
    calls: Mutex<Vec<Call>>,
    renewals: Mutex<HashMap<&'static str, AccessToken>>,
    pub validity: Mutex<VecDeque<Result<TokenStatus, HatApiError>>>,
    pub notes: Mutex<Vec<Note>>,
    pub post_result: Mutex<Result<NoteId, HatApiError>>,
    pub delete_result: Mutex<Result<(), HatApiError>>,
    pub upload_result: Mutex<Result<FileId, HatApiError>>,
    pub visibility_result: Mutex<Result<(), HatApiError>>,
    pub plugs: Mutex<Result<Vec<DataPlug>, HatApiError>>,
    pub plug_active: Mutex<HashMap<String, Result<bool, HatApiError>>>,
    pub claim_result: Mutex<Result<(), HatApiError>>,
}

impl MockHat {
    pub(crate) fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            renewals: Mutex::new(HashMap::new()),
            validity: Mutex::new(VecDeque::new()),
            notes: Mutex::new(Vec::new()),
            post_result: Mutex::new(Ok(NoteId::new("note-1").unwrap())),
            delete_result: Mutex::new(Ok(())),
            upload_result: Mutex::new(Ok(FileId::new("rumpelphoto-1.jpg").unwrap())),
            visibility_result: Mutex::new(Ok(())),
            plugs: Mutex::new(Ok(vec![
                DataPlug::new("facebook", "https://social-plug.hubofallthings.com/dataplug"),
                DataPlug::new("twitter", "https://twitter-plug.hubofallthings.com"),
            ])),
            plug_active: Mutex::new(HashMap::new()),
            claim_result: Mutex::new(Ok(())),
        }
    }

    pub(crate) fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn ops(&self) -> Vec<&'static str> {
        self.calls().into_iter().map(|c| c.op).collect()
    }

    pub(crate) fn count(&self, op: &str) -> usize {
        self.calls().iter().filter(|c| c.op == op).count()
    }

    /// Makes the next call to `op` hand back a renewed token
    pub(crate) fn renew_on(&self, op: &'static str, value: &str) {
        self.renewals.lock().unwrap().insert(op, token(value));
    }

    pub(crate) fn expire_next_validation(&self) {
        self.validity
            .lock()
            .unwrap()
            .push_back(Ok(TokenStatus::Expired));
    }

    pub(crate) fn set_plug_active(&self, name: &str, result: Result<bool, HatApiError>) {
        self.plug_active
            .lock()
            .unwrap()
            .insert(name.to_string(), result);
    }

    fn record<T>(&self, op: &'static str, token: &AccessToken, detail: String, value: T) -> Renewable<T> {
        self.calls.lock().unwrap().push(Call {
            op,
            token: token.secret().to_string(),
            detail,
        });
        match self.renewals.lock().unwrap().remove(op) {
            Some(renewed) => Renewable::renewed(value, renewed),
            None => Renewable::new(value),
        }
    }
}

#[async_trait]
impl HatService for MockHat {
    async fn validate_token(
        &self,
        token: &AccessToken,
    ) -> Result<Renewable<TokenStatus>, HatApiError> {
        let status = self
            .validity
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(TokenStatus::Valid));
        let renewable = self.record("validate_token", token, String::new(), ());
        status.map(|s| renewable.map(|_| s))
    }

    async fn fetch_notes(&self, token: &AccessToken) -> Result<Renewable<Vec<Note>>, HatApiError> {
        let notes = self.notes.lock().unwrap().clone();
        Ok(self.record("fetch_notes", token, String::new(), notes))
    }

    async fn post_note(
        &self,
        token: &AccessToken,
        note: &Note,
    ) -> Result<Renewable<NoteId>, HatApiError> {
        let detail = format!(
            "shared={} shared_on={} photo={}",
            note.is_shared(),
            note.shared_on().to_wire(),
            note.photo().map(|p| p.link.as_str()).unwrap_or("")
        );
        let result = self.post_result.lock().unwrap().clone();
        let renewable = self.record("post_note", token, detail, ());
        result.map(|id| renewable.map(|_| id))
    }

    async fn delete_note(
        &self,
        token: &AccessToken,
        id: &NoteId,
    ) -> Result<Renewable<()>, HatApiError> {
        let result = self.delete_result.lock().unwrap().clone();
        let renewable = self.record("delete_note", token, id.to_string(), ());
        result.map(|_| renewable)
    }

    async fn upload_file(
        &self,
        token: &AccessToken,
        image: &PendingImage,
        progress: Option<UploadProgress>,
    ) -> Result<Renewable<FileId>, HatApiError> {
        if let Some(progress) = progress {
            let total = image.len() as u64;
            progress(total / 2, total);
            progress(total, total);
        }
        let result = self.upload_result.lock().unwrap().clone();
        let renewable = self.record("upload_file", token, image.name.clone(), ());
        result.map(|id| renewable.map(|_| id))
    }

    async fn set_file_visibility(
        &self,
        token: &AccessToken,
        file_id: &FileId,
        visibility: FileVisibility,
    ) -> Result<Renewable<()>, HatApiError> {
        let result = self.visibility_result.lock().unwrap().clone();
        let renewable = self.record(
            "set_file_visibility",
            token,
            format!("{file_id}:{visibility}"),
            (),
        );
        result.map(|_| renewable)
    }

    async fn list_data_plugs(
        &self,
        token: &AccessToken,
    ) -> Result<Renewable<Vec<DataPlug>>, HatApiError> {
        let result = self.plugs.lock().unwrap().clone();
        let renewable = self.record("list_data_plugs", token, String::new(), ());
        result.map(|plugs| renewable.map(|_| plugs))
    }

    async fn is_data_plug_active(
        &self,
        token: &AccessToken,
        plug_name: &str,
    ) -> Result<Renewable<bool>, HatApiError> {
        let result = self
            .plug_active
            .lock()
            .unwrap()
            .get(plug_name)
            .cloned()
            .unwrap_or(Ok(true));
        let renewable = self.record("is_data_plug_active", token, plug_name.to_string(), ());
        result.map(|active| renewable.map(|_| active))
    }

    async fn claim_offer(
        &self,
        token: &AccessToken,
        offer_id: &str,
    ) -> Result<Renewable<()>, HatApiError> {
        let result = self.claim_result.lock().unwrap().clone();
        let renewable = self.record("claim_offer", token, offer_id.to_string(), ());
        result.map(|_| renewable)
    }
}

// ============================================================================
// MockInteraction
// ============================================================================

/// Interaction double answering prompts from a script
///
/// Unscripted prompts are answered with `Choice::Proceed`.
pub(crate) struct MockInteraction {
    choices: Mutex<VecDeque<Choice>>,
    prompts: Mutex<Vec<Prompt>>,
    alerts: Mutex<Vec<Alert>>,
    authorizations: Mutex<Vec<String>>,
    progress: Mutex<Vec<f64>>,
    pub fail_authorization: bool,
}

impl MockInteraction {
    pub(crate) fn new() -> Self {
        Self::scripted(Vec::new())
    }

    pub(crate) fn scripted(choices: Vec<Choice>) -> Self {
        Self {
            choices: Mutex::new(choices.into()),
            prompts: Mutex::new(Vec::new()),
            alerts: Mutex::new(Vec::new()),
            authorizations: Mutex::new(Vec::new()),
            progress: Mutex::new(Vec::new()),
            fail_authorization: false,
        }
    }

    pub(crate) fn push_choice(&self, choice: Choice) {
        self.choices.lock().unwrap().push_back(choice);
    }

    pub(crate) fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().unwrap().clone()
    }

    pub(crate) fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }

    pub(crate) fn authorizations(&self) -> Vec<String> {
        self.authorizations.lock().unwrap().clone()
    }

    pub(crate) fn progress(&self) -> Vec<f64> {
        self.progress.lock().unwrap().clone()
    }
}

#[async_trait]
impl Interaction for MockInteraction {
    async fn confirm(&self, prompt: &Prompt) -> Choice {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.choices
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Choice::Proceed)
    }

    async fn alert(&self, alert: &Alert) {
        self.alerts.lock().unwrap().push(alert.clone());
    }

    async fn present_authorization(&self, url: &str) -> anyhow::Result<()> {
        self.authorizations.lock().unwrap().push(url.to_string());
        if self.fail_authorization {
            anyhow::bail!("no browser available");
        }
        Ok(())
    }

    fn progress(&self, fraction: f64) {
        self.progress.lock().unwrap().push(fraction);
    }
}

// ============================================================================
// MockAuth
// ============================================================================

#[derive(Clone)]
pub(crate) enum AuthScript {
    Authorize(String),
    Cancel,
    Fail(String),
}

pub(crate) struct MockAuth {
    script: AuthScript,
    calls: Mutex<Vec<String>>,
}

impl MockAuth {
    pub(crate) fn new(script: AuthScript) -> Self {
        Self {
            script,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AuthSurface for MockAuth {
    async fn reauthorize(&self, domain: &HatDomain) -> anyhow::Result<AuthResult> {
        self.calls.lock().unwrap().push(domain.to_string());
        match &self.script {
            AuthScript::Authorize(value) => Ok(AuthResult::Authorized(token(value))),
            AuthScript::Cancel => Ok(AuthResult::Cancelled),
            AuthScript::Fail(message) => anyhow::bail!("{message}"),
        }
    }
}
