//! Shared fakes for the application integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};
use textdrive_application::{
    AuthSession, Collaborators, DocumentRegistry, RemoteFileClient, TextDriveApp,
};
use textdrive_core::auth::{AccessToken, AuthRequest, Authorizer};
use textdrive_core::remote::{ApiRequest, DriveTransport, FILES_PATH, HttpMethod, UPLOAD_PREFIX};
use textdrive_core::session::{MemorySessionStore, PersistedFileIndex};
use textdrive_core::settings::{EditorSettings, InMemorySettingsService};
use textdrive_core::ui::{DialogButton, DialogService, FilePicker};
use textdrive_core::{AppEvent, EventBus, EventSubscription, Result, TextDriveError};
use textdrive_infrastructure::HeadlessEditor;

pub const TOKEN: &str = "test-token";

// ============================================================================
// In-memory drive
// ============================================================================

#[derive(Debug, Clone)]
pub struct StoredFile {
    pub metadata: Value,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: HttpMethod,
    pub path: String,
    pub upload: bool,
}

#[derive(Default)]
pub struct FakeDrive {
    files: Mutex<BTreeMap<String, StoredFile>>,
    calls: Mutex<Vec<Call>>,
    downloads: Mutex<Vec<(String, String)>>,
    next_id: AtomicUsize,
    fail_next: Mutex<Option<TextDriveError>>,
    revoked: Mutex<HashSet<String>>,
    omit_download_url: Mutex<HashSet<String>>,
}

impl FakeDrive {
    pub fn seed(&self, id: &str, title: &str, mime_type: &str, content: &str) {
        self.files.lock().unwrap().insert(
            id.to_string(),
            StoredFile {
                metadata: json!({
                    "id": id,
                    "title": title,
                    "mimeType": mime_type,
                    "etag": format!("\"etag-{id}\""),
                }),
                content: content.to_string(),
            },
        );
    }

    pub fn file(&self, id: &str) -> Option<StoredFile> {
        self.files.lock().unwrap().get(id).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_with(&self, method: HttpMethod) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == method)
            .collect()
    }

    /// `(url, authorization header)` of every download.
    pub fn downloads(&self) -> Vec<(String, String)> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn fail_next(&self, err: TextDriveError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    /// Rejects `token` with 401 from now on.
    pub fn revoke(&self, token: &str) {
        self.revoked.lock().unwrap().insert(token.to_string());
    }

    pub fn omit_download_url(&self, id: &str) {
        self.omit_download_url.lock().unwrap().insert(id.to_string());
    }

    fn with_download_url(&self, id: &str, metadata: &Value) -> Value {
        let mut metadata = metadata.clone();
        if !self.omit_download_url.lock().unwrap().contains(id) {
            metadata["downloadUrl"] = json!(format!("mem://{id}"));
        }
        metadata
    }

    fn create(&self, mut metadata: Value, content: String) -> Value {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("new-{n}");
        metadata["id"] = json!(id);
        self.files
            .lock()
            .unwrap()
            .insert(id.clone(), StoredFile {
                metadata: metadata.clone(),
                content,
            });
        metadata
    }
}

/// Splits a request body into its metadata and optional content part.
pub fn split_body(request: &ApiRequest) -> (Value, Option<String>) {
    let body = request.body.as_deref().unwrap_or_default();
    if !request.is_upload() {
        return (serde_json::from_str(body).unwrap(), None);
    }

    let content_type = request.content_type.as_deref().unwrap();
    let boundary = content_type
        .split("boundary=\"")
        .nth(1)
        .unwrap()
        .trim_end_matches('"');
    let delimiter = format!("\r\n--{boundary}\r\n");
    let close = format!("\r\n--{boundary}--");

    let inner = body
        .strip_prefix(&delimiter)
        .unwrap()
        .strip_suffix(&close)
        .unwrap();
    let (metadata_part, content_part) = inner.split_once(&delimiter).unwrap();
    let metadata = metadata_part.split_once("\r\n\r\n").unwrap().1;
    let content = content_part.split_once("\r\n\r\n").unwrap().1;
    (serde_json::from_str(metadata).unwrap(), Some(content.to_string()))
}

#[async_trait]
impl DriveTransport for FakeDrive {
    async fn execute(&self, token: &AccessToken, request: &ApiRequest) -> Result<Value> {
        assert!(token.secret().starts_with(TOKEN));
        self.calls.lock().unwrap().push(Call {
            method: request.method,
            path: request.path.clone(),
            upload: request.is_upload(),
        });
        if let Some(err) = self.fail_next.lock().unwrap().take() {
            return Err(err);
        }
        if self.revoked.lock().unwrap().contains(token.secret()) {
            return Err(TextDriveError::remote_api(401, "Invalid Credentials"));
        }

        let path = request
            .path
            .strip_prefix(UPLOAD_PREFIX)
            .unwrap_or(&request.path);
        let id = path
            .strip_prefix(FILES_PATH)
            .map(|rest| rest.trim_start_matches('/'))
            .unwrap_or_default()
            .to_string();

        let not_found = || TextDriveError::remote_api(404, format!("File not found: {id}"));

        match request.method {
            HttpMethod::Get if id.is_empty() => {
                let files = self.files.lock().unwrap().clone();
                let items: Vec<Value> = files
                    .iter()
                    .map(|(id, f)| self.with_download_url(id, &f.metadata))
                    .collect();
                Ok(json!({ "kind": "drive#fileList", "items": items }))
            }
            HttpMethod::Get => {
                let file = self.file(&id).ok_or_else(not_found)?;
                Ok(self.with_download_url(&id, &file.metadata))
            }
            HttpMethod::Post => {
                let (metadata, content) = split_body(request);
                Ok(self.create(metadata, content.unwrap_or_default()))
            }
            HttpMethod::Put => {
                let (metadata, content) = split_body(request);
                let mut files = self.files.lock().unwrap();
                let stored = files.get_mut(&id).ok_or_else(not_found)?;
                stored.metadata = metadata.clone();
                if let Some(content) = content {
                    stored.content = content;
                }
                Ok(metadata)
            }
            HttpMethod::Delete => {
                self.files.lock().unwrap().remove(&id).ok_or_else(not_found)?;
                Ok(Value::Null)
            }
        }
    }

    async fn download(&self, token: &AccessToken, url: &str) -> Result<String> {
        self.downloads
            .lock()
            .unwrap()
            .push((url.to_string(), token.bearer()));
        let id = url.trim_start_matches("mem://");
        self.file(id)
            .map(|f| f.content)
            .ok_or_else(|| TextDriveError::remote_api(404, "Not Found"))
    }
}

// ============================================================================
// Authorizer
// ============================================================================

/// Issues `TOKEN`, then `TOKEN-2`, `TOKEN-3`... Silent requests return the
/// cached token until it is invalidated.
pub struct FakeAuthorizer {
    pub silent_ok: bool,
    pub interactive_ok: bool,
    pub lookup_id: Option<String>,
    pub silent_requests: AtomicUsize,
    pub interactive_requests: AtomicUsize,
    pub lookups: AtomicUsize,
    issued: AtomicUsize,
    cached: Mutex<Option<String>>,
}

impl FakeAuthorizer {
    pub fn new(silent_ok: bool, interactive_ok: bool, lookup_id: Option<&str>) -> Self {
        Self {
            silent_ok,
            interactive_ok,
            lookup_id: lookup_id.map(str::to_string),
            silent_requests: AtomicUsize::new(0),
            interactive_requests: AtomicUsize::new(0),
            lookups: AtomicUsize::new(0),
            issued: AtomicUsize::new(0),
            cached: Mutex::new(None),
        }
    }

    fn issue(&self) -> AccessToken {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let token = if n == 1 {
            TOKEN.to_string()
        } else {
            format!("{TOKEN}-{n}")
        };
        *self.cached.lock().unwrap() = Some(token.clone());
        AccessToken::new(token)
    }
}

#[async_trait]
impl Authorizer for FakeAuthorizer {
    async fn request_token(&self, request: &AuthRequest) -> Result<AccessToken> {
        if request.interactive {
            self.interactive_requests.fetch_add(1, Ordering::SeqCst);
            if self.interactive_ok {
                return Ok(self.issue());
            }
            return Err(TextDriveError::auth_failed(0, "access_denied"));
        }
        self.silent_requests.fetch_add(1, Ordering::SeqCst);
        if !self.silent_ok {
            return Err(TextDriveError::AuthRequired);
        }
        let cached = self.cached.lock().unwrap().clone();
        Ok(cached.map(AccessToken::new).unwrap_or_else(|| self.issue()))
    }

    async fn lookup_user_id(&self, _token: &AccessToken) -> Result<Option<String>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.lookup_id.clone())
    }

    async fn invalidate(&self, token: &AccessToken) {
        let mut cached = self.cached.lock().unwrap();
        if cached.as_deref() == Some(token.secret()) {
            *cached = None;
        }
    }
}

// ============================================================================
// Dialog and picker
// ============================================================================

#[derive(Default)]
pub struct ScriptedDialog {
    message: Mutex<String>,
    buttons: Mutex<Vec<DialogButton>>,
    answers: Mutex<VecDeque<Option<String>>>,
    prompt_answers: Mutex<VecDeque<Option<String>>>,
    shown: Mutex<Vec<String>>,
    prompted: Mutex<Vec<String>>,
}

impl ScriptedDialog {
    /// Queues the button id chosen for the next dialog.
    pub fn answer(&self, button: Option<&str>) {
        self.answers
            .lock()
            .unwrap()
            .push_back(button.map(str::to_string));
    }

    /// Queues the text entered at the next prompt.
    pub fn reply(&self, text: Option<&str>) {
        self.prompt_answers
            .lock()
            .unwrap()
            .push_back(text.map(str::to_string));
    }

    /// Messages of every dialog shown so far.
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }

    pub fn prompted(&self) -> Vec<String> {
        self.prompted.lock().unwrap().clone()
    }

    pub fn last_buttons(&self) -> Vec<String> {
        self.buttons
            .lock()
            .unwrap()
            .iter()
            .map(|b| b.id.clone())
            .collect()
    }
}

#[async_trait]
impl DialogService for ScriptedDialog {
    fn set_message(&self, message: &str) {
        *self.message.lock().unwrap() = message.to_string();
    }

    fn set_buttons(&self, buttons: Vec<DialogButton>) {
        *self.buttons.lock().unwrap() = buttons;
    }

    async fn show(&self) -> Option<String> {
        let message = self.message.lock().unwrap().clone();
        self.shown.lock().unwrap().push(message);
        self.answers.lock().unwrap().pop_front().flatten()
    }

    async fn prompt(&self, message: &str) -> Option<String> {
        self.prompted.lock().unwrap().push(message.to_string());
        self.prompt_answers.lock().unwrap().pop_front().flatten()
    }
}

#[derive(Default)]
pub struct StaticPicker {
    pub ids: Vec<String>,
    pub requests: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl FilePicker for StaticPicker {
    async fn pick(&self, title: &str, mime_types: &[&str]) -> Vec<String> {
        self.requests.lock().unwrap().push((
            title.to_string(),
            mime_types.iter().map(|m| m.to_string()).collect(),
        ));
        self.ids.clone()
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Options {
    pub session: String,
    pub silent_ok: bool,
    pub interactive_ok: bool,
    pub lookup_id: Option<String>,
    pub settings: EditorSettings,
    pub picks: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            session: String::new(),
            silent_ok: true,
            interactive_ok: true,
            lookup_id: Some("user-1".to_string()),
            settings: EditorSettings::default(),
            picks: Vec::new(),
        }
    }
}

pub struct Harness {
    pub bus: EventBus,
    pub events: EventSubscription,
    pub drive: Arc<FakeDrive>,
    pub authorizer: Arc<FakeAuthorizer>,
    pub dialog: Arc<ScriptedDialog>,
    pub picker: Arc<StaticPicker>,
    pub editor: Arc<HeadlessEditor>,
    pub settings: Arc<InMemorySettingsService>,
    pub store: Arc<MemorySessionStore>,
    pub auth: Arc<AuthSession>,
    pub client: Arc<RemoteFileClient>,
    pub app: TextDriveApp,
}

impl Harness {
    pub async fn new(options: Options) -> Self {
        let bus = EventBus::new();
        let events = bus.subscribe();

        let drive = Arc::new(FakeDrive::default());
        let authorizer = Arc::new(FakeAuthorizer::new(
            options.silent_ok,
            options.interactive_ok,
            options.lookup_id.as_deref(),
        ));
        let dialog = Arc::new(ScriptedDialog::default());
        let picker = Arc::new(StaticPicker {
            ids: options.picks,
            ..Default::default()
        });
        let editor = Arc::new(HeadlessEditor::new(bus.clone()));
        let settings = Arc::new(InMemorySettingsService::new(options.settings, bus.clone()));
        let store = Arc::new(MemorySessionStore::new(options.session));

        let index = PersistedFileIndex::load(store.clone()).await;
        let auth_config = textdrive_core::auth::AuthConfig::new(
            "test-client",
            ["https://www.googleapis.com/auth/drive"],
            index.user_id().map(str::to_string),
        );
        let auth = Arc::new(AuthSession::new(auth_config, authorizer.clone(), bus.clone()));
        let client = Arc::new(RemoteFileClient::new(auth.clone(), drive.clone(), bus.clone()));

        let collaborators = Collaborators {
            editor: editor.clone(),
            dialog: dialog.clone(),
            picker: picker.clone(),
            settings: settings.clone(),
        };
        let registry = DocumentRegistry::new(index, client.clone(), collaborators, bus.clone());
        let app = TextDriveApp::new(auth.clone(), registry, settings.clone(), dialog.clone(), &bus);

        Self {
            bus,
            events,
            drive,
            authorizer,
            dialog,
            picker,
            editor,
            settings,
            store,
            auth,
            client,
            app,
        }
    }

    /// Builds the harness and starts the app (silent auth plus restore).
    pub async fn started(options: Options) -> Self {
        let mut harness = Self::new(options).await;
        harness.app.start().await;
        harness
    }

    pub fn registry(&self) -> &DocumentRegistry {
        self.app.registry()
    }

    pub fn registry_mut(&mut self) -> &mut DocumentRegistry {
        self.app.registry_mut()
    }

    /// Every event observed since the last call.
    pub fn take_events(&mut self) -> Vec<AppEvent> {
        self.events.drain()
    }

    /// Asserts the index equals the set of ids bound to open documents.
    pub fn assert_index_consistent(&self) {
        let registry = self.registry();
        let mut bound: Vec<String> = registry
            .documents()
            .iter()
            .filter_map(|d| d.remote_id.clone())
            .collect();
        let mut indexed = registry.index().ids().to_vec();
        bound.sort();
        indexed.sort();
        assert_eq!(bound, indexed, "index out of sync with open documents");
    }
}

pub fn count<F>(events: &[AppEvent], f: F) -> usize
where
    F: Fn(&AppEvent) -> bool,
{
    events.iter().filter(|e| f(e)).count()
}
