//! Paste handling: placeholder, upload, replace
//!
//! Each pasted image goes through its own small state machine:
//!
//! ```text
//! Idle -> PlaceholderInserted -> Uploading -> Replaced
//!                                          -> PlaceholderMissing
//!                                          -> FailedNotified
//! ```
//!
//! All placeholders for one paste are inserted synchronously, in clipboard
//! order, before any upload starts. Uploads then run as independent tokio
//! tasks and finish in whatever order the server answers; each task only ever
//! looks for its own placeholder, so results cannot be cross-wired.
//!
//! The editor lock is taken for the insertion pass and again for each
//! replacement, never across an upload.

use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::clipboard::{ClipboardFile, PasteEvent};
use crate::config::Settings;
use crate::editor::{Editor, Position};
use crate::notify::{ERROR_NOTICE_DURATION, Notifier};
use crate::placeholder::Placeholder;
use crate::replace::Locator;
use crate::settings::SharedSettings;
use crate::upload::{UploadError, Uploader};

/// Editor shared between the paste handler and its upload tasks
pub type SharedEditor<E> = Arc<Mutex<E>>;

pub fn shared_editor<E: Editor>(editor: E) -> SharedEditor<E> {
    Arc::new(Mutex::new(editor))
}

/// Why a paste was left to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The clipboard carries no files
    NoFiles,
    /// Upload URL or token missing
    NotConfigured,
    /// The first file is not an image
    NotImage,
}

/// Lifecycle of one pasted file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    PlaceholderInserted,
    Uploading,
    Replaced,
    /// Uploaded, but the placeholder was no longer in the document
    PlaceholderMissing,
    FailedNotified,
}

impl UploadState {
    /// No further transitions happen from this state
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            UploadState::Replaced | UploadState::PlaceholderMissing | UploadState::FailedNotified
        )
    }
}

/// Final result of one upload task
#[derive(Debug)]
pub enum UploadOutcome {
    /// The placeholder was swapped for the image link
    Replaced {
        token: String,
        url: String,
        at: Position,
    },
    /// Upload succeeded but the placeholder was gone from the document
    PlaceholderMissing { token: String, url: String },
    /// Upload failed; the placeholder stays and the user was notified
    Failed { token: String, error: UploadError },
    /// The upload task panicked or was cancelled; the placeholder stays
    Aborted { token: String, reason: String },
}

impl UploadOutcome {
    pub fn token(&self) -> &str {
        match self {
            UploadOutcome::Replaced { token, .. }
            | UploadOutcome::PlaceholderMissing { token, .. }
            | UploadOutcome::Failed { token, .. }
            | UploadOutcome::Aborted { token, .. } => token,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            UploadOutcome::Failed { .. } | UploadOutcome::Aborted { .. }
        )
    }
}

/// Markdown image link for an uploaded file
pub fn image_markdown(url: &str) -> String {
    format!("![]({url})")
}

/// One file between paste and replacement
#[derive(Debug)]
pub struct PendingUpload {
    placeholder: Placeholder,
    file: ClipboardFile,
    /// Line the placeholder was inserted on
    line: usize,
    state: UploadState,
}

impl PendingUpload {
    pub fn new(file: ClipboardFile) -> Self {
        Self::with_placeholder(file, Placeholder::new())
    }

    pub fn with_placeholder(file: ClipboardFile, placeholder: Placeholder) -> Self {
        Self {
            placeholder,
            file,
            line: 0,
            state: UploadState::Idle,
        }
    }

    pub fn placeholder(&self) -> &Placeholder {
        &self.placeholder
    }

    pub fn file(&self) -> &ClipboardFile {
        &self.file
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Line the placeholder was inserted on
    pub fn line(&self) -> usize {
        self.line
    }

    /// Insert the placeholder over the current selection
    pub fn insert_placeholder<E: Editor + ?Sized>(&mut self, editor: &mut E) {
        self.line = editor.cursor().line;
        editor.replace_selection(&self.placeholder.text());
        self.state = UploadState::PlaceholderInserted;
    }

    /// Send the file, returning its public URL
    pub async fn upload(
        &mut self,
        uploader: &dyn Uploader,
        settings: &Settings,
    ) -> Result<String, UploadError> {
        self.state = UploadState::Uploading;
        uploader.upload(&self.file, settings).await
    }

    /// Swap the placeholder for the image link
    pub fn complete<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        url: String,
        locator: Locator,
    ) -> UploadOutcome {
        let token = self.placeholder.token().to_string();
        match locator.replace(editor, &self.placeholder.text(), &image_markdown(&url)) {
            Some(at) => {
                self.state = UploadState::Replaced;
                tracing::info!("Replaced placeholder {} with {} at {}", token, url, at);
                UploadOutcome::Replaced { token, url, at }
            }
            None => {
                self.state = UploadState::PlaceholderMissing;
                tracing::warn!(
                    "Uploaded {} but placeholder {} is no longer in the document",
                    url,
                    token
                );
                UploadOutcome::PlaceholderMissing { token, url }
            }
        }
    }

    /// Tell the user the upload failed; the placeholder stays
    pub fn fail(&mut self, error: UploadError, notifier: &dyn Notifier) -> UploadOutcome {
        self.state = UploadState::FailedNotified;
        let token = self.placeholder.token().to_string();
        tracing::warn!("Upload for placeholder {} failed: {}", token, error);
        notifier.notify(&format!("Image upload failed: {error}"), ERROR_NOTICE_DURATION);
        UploadOutcome::Failed { token, error }
    }
}

/// Uploads started by one paste
#[derive(Debug, Default)]
pub struct PasteDispatch {
    ignored: Option<IgnoreReason>,
    tokens: Vec<String>,
    handles: Vec<JoinHandle<UploadOutcome>>,
}

impl PasteDispatch {
    fn ignored(reason: IgnoreReason) -> Self {
        Self {
            ignored: Some(reason),
            ..Default::default()
        }
    }

    /// Whether the paste was taken over (default paste suppressed)
    pub fn is_intercepted(&self) -> bool {
        self.ignored.is_none()
    }

    pub fn ignore_reason(&self) -> Option<IgnoreReason> {
        self.ignored
    }

    /// Placeholder tokens, in clipboard order
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every upload, returning one outcome per file in clipboard order
    pub async fn join(self) -> Vec<UploadOutcome> {
        join_all(self.handles)
            .await
            .into_iter()
            .zip(self.tokens)
            .map(|(result, token)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(
                        "Upload task for placeholder {} ended abnormally: {}",
                        token,
                        e
                    );
                    UploadOutcome::Aborted {
                        token,
                        reason: e.to_string(),
                    }
                }
            })
            .collect()
    }
}

/// Intercepts image pastes and drives their uploads
pub struct PasteOrchestrator<E: Editor + Send + 'static> {
    editor: SharedEditor<E>,
    uploader: Arc<dyn Uploader>,
    notifier: Arc<dyn Notifier>,
    settings: SharedSettings,
    scoped_replace: bool,
}

impl<E: Editor + Send + 'static> PasteOrchestrator<E> {
    pub fn new(
        editor: SharedEditor<E>,
        uploader: Arc<dyn Uploader>,
        notifier: Arc<dyn Notifier>,
        settings: SharedSettings,
    ) -> Self {
        Self {
            editor,
            uploader,
            notifier,
            settings,
            scoped_replace: false,
        }
    }

    /// Search for each placeholder from its insertion line first.
    ///
    /// Off by default: the plain scan from the top of the document is used.
    pub fn with_scoped_replace(mut self, enabled: bool) -> Self {
        self.scoped_replace = enabled;
        self
    }

    pub fn editor(&self) -> SharedEditor<E> {
        Arc::clone(&self.editor)
    }

    /// Decide whether this paste is ours
    pub fn check(event: &PasteEvent, settings: &Settings) -> Result<(), IgnoreReason> {
        let Some(first) = event.files.first() else {
            return Err(IgnoreReason::NoFiles);
        };
        if !settings.is_complete() {
            return Err(IgnoreReason::NotConfigured);
        }
        if !first.is_image() {
            return Err(IgnoreReason::NotImage);
        }
        Ok(())
    }

    /// Handle a paste event.
    ///
    /// Must be called from within a tokio runtime. When the paste is taken
    /// over, the default action is suppressed, a placeholder is inserted for
    /// every file and one upload task is spawned per file.
    pub fn handle_paste(&self, event: &mut PasteEvent) -> PasteDispatch {
        let settings = self.settings.snapshot();
        if let Err(reason) = Self::check(event, &settings) {
            tracing::debug!("Paste left to the editor: {:?}", reason);
            return PasteDispatch::ignored(reason);
        }

        event.prevent_default();

        let pending: Vec<PendingUpload> = {
            let mut editor = self.editor.lock();
            event
                .files
                .iter()
                .cloned()
                .map(|file| {
                    let mut upload = PendingUpload::new(file);
                    upload.insert_placeholder(&mut *editor);
                    upload
                })
                .collect()
        };

        tracing::debug!("Intercepted paste with {} file(s)", pending.len());

        let tokens = pending
            .iter()
            .map(|p| p.placeholder().token().to_string())
            .collect();

        let settings = Arc::new(settings);
        let handles = pending
            .into_iter()
            .map(|upload| {
                let editor = Arc::clone(&self.editor);
                let uploader = Arc::clone(&self.uploader);
                let notifier = Arc::clone(&self.notifier);
                let settings = Arc::clone(&settings);
                let scoped = self.scoped_replace;
                tokio::spawn(async move {
                    run_upload(upload, editor, uploader, notifier, settings, scoped).await
                })
            })
            .collect();

        PasteDispatch {
            ignored: None,
            tokens,
            handles,
        }
    }
}

async fn run_upload<E: Editor + Send + 'static>(
    mut upload: PendingUpload,
    editor: SharedEditor<E>,
    uploader: Arc<dyn Uploader>,
    notifier: Arc<dyn Notifier>,
    settings: Arc<Settings>,
    scoped: bool,
) -> UploadOutcome {
    let result = upload.upload(uploader.as_ref(), &settings).await;
    match result {
        Ok(url) => {
            let locator = if scoped {
                Locator::with_hint(upload.line())
            } else {
                Locator::new()
            };
            let mut editor = editor.lock();
            upload.complete(&mut *editor, url, locator)
        }
        Err(error) => upload.fail(error, notifier.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::editor::TextBuffer;

    /// Uploader answering per file payload, optionally after a delay
    #[derive(Default)]
    struct ScriptedUploader {
        script: HashMap<Vec<u8>, (Duration, Option<String>)>,
        calls: Mutex<Vec<Vec<u8>>>,
    }

    impl ScriptedUploader {
        fn respond(mut self, data: &[u8], delay_ms: u64, url: Option<&str>) -> Self {
            self.script.insert(
                data.to_vec(),
                (Duration::from_millis(delay_ms), url.map(str::to_string)),
            );
            self
        }

        fn calls(&self) -> usize {
            self.calls.lock().len()
        }
    }

    #[async_trait]
    impl Uploader for ScriptedUploader {
        async fn upload(
            &self,
            file: &ClipboardFile,
            _settings: &Settings,
        ) -> Result<String, UploadError> {
            self.calls.lock().push(file.data.clone());
            if file.data == b"crash" {
                panic!("uploader crashed");
            }
            let (delay, url) = self
                .script
                .get(&file.data)
                .cloned()
                .unwrap_or((Duration::ZERO, None));
            tokio::time::sleep(delay).await;
            url.ok_or(UploadError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<(String, Duration)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str, duration: Duration) {
            self.messages.lock().push((message.to_string(), duration));
        }
    }

    fn configured() -> SharedSettings {
        SharedSettings::new(Settings {
            url: "http://localhost:8080".to_string(),
            authorize_token: Some("tok".to_string()),
        })
    }

    fn image(data: &[u8]) -> ClipboardFile {
        ClipboardFile::new("image/png", data.to_vec())
    }

    struct Harness {
        orchestrator: PasteOrchestrator<TextBuffer>,
        uploader: Arc<ScriptedUploader>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness(text: &str, uploader: ScriptedUploader, settings: SharedSettings) -> Harness {
        let uploader = Arc::new(uploader);
        let notifier = Arc::new(RecordingNotifier::default());
        let orchestrator = PasteOrchestrator::new(
            shared_editor(TextBuffer::new(text)),
            uploader.clone(),
            notifier.clone(),
            settings,
        );
        Harness {
            orchestrator,
            uploader,
            notifier,
        }
    }

    fn text_of(h: &Harness) -> String {
        h.orchestrator.editor().lock().text().to_string()
    }

    #[test]
    fn test_check_order() {
        let settings = configured().snapshot();
        let empty = PasteEvent::default();
        assert_eq!(
            PasteOrchestrator::<TextBuffer>::check(&empty, &settings),
            Err(IgnoreReason::NoFiles)
        );

        let text_first = PasteEvent::new(vec![
            ClipboardFile::new("text/plain", vec![]),
            image(b"a"),
        ]);
        assert_eq!(
            PasteOrchestrator::<TextBuffer>::check(&text_first, &settings),
            Err(IgnoreReason::NotImage)
        );

        assert_eq!(
            PasteOrchestrator::<TextBuffer>::check(&text_first, &Settings::default()),
            Err(IgnoreReason::NotConfigured)
        );

        let image_first = PasteEvent::new(vec![image(b"a")]);
        assert_eq!(
            PasteOrchestrator::<TextBuffer>::check(&image_first, &settings),
            Ok(())
        );
    }

    #[tokio::test]
    async fn test_ignored_pastes_change_nothing() {
        let h = harness("note\n", ScriptedUploader::default(), configured());

        let mut empty = PasteEvent::default();
        let dispatch = h.orchestrator.handle_paste(&mut empty);
        assert_eq!(dispatch.ignore_reason(), Some(IgnoreReason::NoFiles));
        assert!(!empty.is_default_prevented());

        let mut text = PasteEvent::new(vec![ClipboardFile::new("text/plain", b"hi".to_vec())]);
        let dispatch = h.orchestrator.handle_paste(&mut text);
        assert_eq!(dispatch.ignore_reason(), Some(IgnoreReason::NotImage));
        assert!(!text.is_default_prevented());
        assert!(dispatch.join().await.is_empty());

        assert_eq!(text_of(&h), "note\n");
        assert_eq!(h.uploader.calls(), 0);
    }

    #[tokio::test]
    async fn test_unconfigured_paste_is_ignored() {
        let h = harness("", ScriptedUploader::default(), SharedSettings::default());
        let mut event = PasteEvent::new(vec![image(b"a")]);
        let dispatch = h.orchestrator.handle_paste(&mut event);

        assert_eq!(dispatch.ignore_reason(), Some(IgnoreReason::NotConfigured));
        assert!(!event.is_default_prevented());
        assert_eq!(text_of(&h), "");
        assert_eq!(h.uploader.calls(), 0);
    }

    #[tokio::test]
    async fn test_single_image_replaced() {
        let uploader = ScriptedUploader::default().respond(b"a", 0, Some("https://x/y.png"));
        let h = harness("intro\n", uploader, configured());

        let mut event = PasteEvent::new(vec![image(b"a")]);
        let dispatch = h.orchestrator.handle_paste(&mut event);
        assert!(event.is_default_prevented());
        assert!(dispatch.is_intercepted());

        let token = dispatch.tokens()[0].clone();
        assert_eq!(
            text_of(&h),
            format!("intro\n![uploading...]({token})\n")
        );

        let outcomes = dispatch.join().await;
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(
            &outcomes[0],
            UploadOutcome::Replaced { url, at, .. }
                if url == "https://x/y.png" && *at == Position::new(1, 0)
        ));
        assert_eq!(text_of(&h), "intro\n![](https://x/y.png)\n");
        assert_eq!(h.uploader.calls(), 1);
        assert!(h.notifier.messages.lock().is_empty());
    }

    #[tokio::test]
    async fn test_every_file_gets_a_placeholder_when_first_is_image() {
        let uploader = ScriptedUploader::default()
            .respond(b"a", 0, Some("https://x/a.png"))
            .respond(b"doc", 0, Some("https://x/doc.pdf"));
        let h = harness("", uploader, configured());

        let mut event = PasteEvent::new(vec![
            image(b"a"),
            ClipboardFile::new("application/pdf", b"doc".to_vec()),
        ]);
        let dispatch = h.orchestrator.handle_paste(&mut event);
        assert_eq!(dispatch.len(), 2);

        dispatch.join().await;
        assert_eq!(text_of(&h), "![](https://x/a.png)\n![](https://x/doc.pdf)\n");
    }

    #[tokio::test]
    async fn test_two_images_not_cross_wired() {
        // First file finishes last
        let uploader = ScriptedUploader::default()
            .respond(b"first", 80, Some("https://x/first.png"))
            .respond(b"second", 0, Some("https://x/second.png"));
        let h = harness("", uploader, configured());

        let mut event = PasteEvent::new(vec![image(b"first"), image(b"second")]);
        let dispatch = h.orchestrator.handle_paste(&mut event);

        let tokens = dispatch.tokens().to_vec();
        assert_eq!(tokens.len(), 2);
        assert_ne!(tokens[0], tokens[1]);
        assert_eq!(
            text_of(&h),
            format!(
                "![uploading...]({})\n![uploading...]({})\n",
                tokens[0], tokens[1]
            )
        );

        let outcomes = dispatch.join().await;
        assert_eq!(outcomes[0].token(), tokens[0]);
        assert_eq!(outcomes[1].token(), tokens[1]);
        assert_eq!(
            text_of(&h),
            "![](https://x/first.png)\n![](https://x/second.png)\n"
        );
    }

    #[tokio::test]
    async fn test_failure_keeps_placeholder_and_notifies_once() {
        let h = harness("", ScriptedUploader::default(), configured());

        let mut event = PasteEvent::new(vec![image(b"unscripted")]);
        let dispatch = h.orchestrator.handle_paste(&mut event);
        let token = dispatch.tokens()[0].clone();
        let outcomes = dispatch.join().await;

        assert!(outcomes[0].is_failure());
        assert_eq!(text_of(&h), format!("![uploading...]({token})\n"));

        let messages = h.notifier.messages.lock();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].0.contains("500"));
        assert_eq!(messages[0].1, ERROR_NOTICE_DURATION);
    }

    #[tokio::test]
    async fn test_edits_during_upload_are_kept() {
        let uploader = ScriptedUploader::default().respond(b"a", 50, Some("https://x/a.png"));
        let h = harness("", uploader, configured());

        let mut event = PasteEvent::new(vec![image(b"a")]);
        let dispatch = h.orchestrator.handle_paste(&mut event);

        // User keeps typing, and adds a line above the placeholder
        {
            let editor = h.orchestrator.editor();
            let mut editor = editor.lock();
            editor.replace_selection("typed after");
            editor.replace_range("# Title\n", Position::new(0, 0), Position::new(0, 0));
        }

        dispatch.join().await;
        assert_eq!(text_of(&h), "# Title\n![](https://x/a.png)\ntyped after");
    }

    #[tokio::test]
    async fn test_deleted_placeholder_reports_missing() {
        let uploader = ScriptedUploader::default().respond(b"a", 50, Some("https://x/a.png"));
        let h = harness("", uploader, configured());

        let mut event = PasteEvent::new(vec![image(b"a")]);
        let dispatch = h.orchestrator.handle_paste(&mut event);
        {
            let editor = h.orchestrator.editor();
            let mut editor = editor.lock();
            let end = editor.cursor();
            editor.replace_range("", Position::new(0, 0), end);
        }

        let outcomes = dispatch.join().await;
        assert!(matches!(outcomes[0], UploadOutcome::PlaceholderMissing { .. }));
        assert_eq!(text_of(&h), "");
    }

    #[tokio::test]
    async fn test_settings_updates_apply_to_next_paste() {
        let uploader = ScriptedUploader::default().respond(b"a", 0, Some("https://x/a.png"));
        let settings = SharedSettings::default();
        let h = harness("", uploader, settings.clone());

        let mut event = PasteEvent::new(vec![image(b"a")]);
        assert!(!h.orchestrator.handle_paste(&mut event).is_intercepted());

        settings.update(|s| s.authorize_token = Some("tok".to_string()));
        let mut event = PasteEvent::new(vec![image(b"a")]);
        let dispatch = h.orchestrator.handle_paste(&mut event);
        assert!(dispatch.is_intercepted());
        dispatch.join().await;
        assert_eq!(text_of(&h), "![](https://x/a.png)\n");
    }

    #[tokio::test]
    async fn test_pending_upload_state_machine() {
        let uploader = ScriptedUploader::default().respond(b"a", 0, Some("https://x/a.png"));
        let mut buffer = TextBuffer::new("top\n");
        let mut upload =
            PendingUpload::with_placeholder(image(b"a"), Placeholder::with_token("t0k3n"));
        assert_eq!(upload.state(), UploadState::Idle);

        upload.insert_placeholder(&mut buffer);
        assert_eq!(upload.state(), UploadState::PlaceholderInserted);
        assert_eq!(upload.line(), 1);
        assert_eq!(buffer.text(), "top\n![uploading...](t0k3n)\n");

        let url = upload
            .upload(&uploader, &configured().snapshot())
            .await
            .unwrap();
        assert_eq!(upload.state(), UploadState::Uploading);

        let outcome = upload.complete(&mut buffer, url, Locator::new());
        assert!(matches!(outcome, UploadOutcome::Replaced { .. }));
        assert_eq!(upload.state(), UploadState::Replaced);
        assert!(upload.state().is_terminal());
        assert_eq!(buffer.text(), "top\n![](https://x/a.png)\n");
    }

    #[test]
    fn test_complete_without_placeholder_is_missing() {
        let mut buffer = TextBuffer::new("top\n");
        let mut upload =
            PendingUpload::with_placeholder(image(b"a"), Placeholder::with_token("t0k3n"));
        upload.insert_placeholder(&mut buffer);
        buffer.replace_range("", Position::new(1, 0), Position::new(2, 0));

        let url = "https://x/a.png".to_string();
        let outcome = upload.complete(&mut buffer, url, Locator::new());
        assert!(matches!(outcome, UploadOutcome::PlaceholderMissing { .. }));
        assert_eq!(upload.state(), UploadState::PlaceholderMissing);
        assert!(upload.state().is_terminal());
        assert_eq!(buffer.text(), "top\n");
    }

    #[tokio::test]
    async fn test_fail_notifies_and_ends_in_failed_state() {
        let uploader = ScriptedUploader::default();
        let notifier = RecordingNotifier::default();
        let mut buffer = TextBuffer::new("");
        let mut upload =
            PendingUpload::with_placeholder(image(b"a"), Placeholder::with_token("t0k3n"));
        upload.insert_placeholder(&mut buffer);

        let error = upload
            .upload(&uploader, &configured().snapshot())
            .await
            .unwrap_err();
        assert_eq!(upload.state(), UploadState::Uploading);
        assert!(!upload.state().is_terminal());

        let outcome = upload.fail(error, &notifier);
        assert!(outcome.is_failure());
        assert_eq!(upload.state(), UploadState::FailedNotified);
        assert_eq!(notifier.messages.lock().len(), 1);
        assert_eq!(buffer.text(), "![uploading...](t0k3n)\n");
    }

    #[tokio::test]
    async fn test_crashed_task_reported_in_order() {
        let uploader = ScriptedUploader::default()
            .respond(b"a", 0, Some("https://x/a.png"))
            .respond(b"crash", 0, None)
            .respond(b"b", 20, Some("https://x/b.png"));
        let h = harness("", uploader, configured());

        let mut event = PasteEvent::new(vec![image(b"a"), image(b"crash"), image(b"b")]);
        let dispatch = h.orchestrator.handle_paste(&mut event);
        let tokens = dispatch.tokens().to_vec();

        let outcomes = dispatch.join().await;
        assert_eq!(outcomes.len(), 3);
        for (outcome, token) in outcomes.iter().zip(&tokens) {
            assert_eq!(outcome.token(), token);
        }
        assert!(matches!(outcomes[1], UploadOutcome::Aborted { .. }));
        assert!(outcomes[1].is_failure());
        assert!(!outcomes[2].is_failure());
        assert_eq!(
            text_of(&h),
            format!(
                "![](https://x/a.png)\n![uploading...]({})\n![](https://x/b.png)\n",
                tokens[1]
            )
        );
    }

    #[tokio::test]
    async fn test_scoped_replace_prefers_insertion_line() {
        let uploader = ScriptedUploader::default().respond(b"a", 0, Some("https://x/a.png"));
        let orchestrator = PasteOrchestrator::new(
            shared_editor(TextBuffer::new("a\nb\n")),
            Arc::new(uploader),
            Arc::new(RecordingNotifier::default()),
            configured(),
        )
        .with_scoped_replace(true);

        let mut event = PasteEvent::new(vec![image(b"a")]);
        let dispatch = orchestrator.handle_paste(&mut event);
        let token = dispatch.tokens()[0].clone();
        {
            // A copy of the placeholder lands above the real one
            let editor = orchestrator.editor();
            let mut editor = editor.lock();
            editor.replace_range(
                &format!("![uploading...]({token}) copy\n"),
                Position::new(0, 0),
                Position::new(0, 0),
            );
        }
        dispatch.join().await;

        let text = orchestrator.editor().lock().text().to_string();
        assert_eq!(
            text,
            format!("![uploading...]({token}) copy\na\nb\n![](https://x/a.png)\n")
        );
    }
}
