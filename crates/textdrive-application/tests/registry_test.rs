//! Document registry behavior against an in-memory drive.

mod support;

use support::{Harness, Options, count};
use textdrive_application::document_registry::{CLOSE_PROMPT, NAME_PROMPT, PICKER_TITLE};
use textdrive_application::{CloseOutcome, SaveOutcome};
use textdrive_core::AppEvent;
use textdrive_core::document::{LocalId, SaveState};
use textdrive_core::remote::HttpMethod;
use textdrive_core::settings::{EditorSettings, SettingKey, SettingValue, SettingsService};
use textdrive_core::ui::{BUTTON_CANCEL, BUTTON_NO, BUTTON_YES, BufferHandle};
use textdrive_core::TextDriveError;

/// Seeds two files and starts the app with the given session string.
async fn seeded(session: &str, options: Options) -> Harness {
    let mut harness = Harness::new(Options {
        session: session.to_string(),
        ..options
    })
    .await;
    harness.drive.seed("a", "alpha.txt", "text/plain", "alpha");
    harness.drive.seed("b", "beta.md", "text/markdown", "beta");
    harness.app.start().await;
    harness
}

fn local_id_of(harness: &Harness, remote_id: &str) -> LocalId {
    harness
        .registry()
        .documents()
        .iter()
        .find(|d| d.remote_id.as_deref() == Some(remote_id))
        .map(|d| d.local_id)
        .unwrap()
}

/// Simulates a user edit of a document and lets the app react to it.
async fn edit(harness: &mut Harness, local_id: LocalId, suffix: &str) {
    let buffer = harness.registry().document(local_id).unwrap().buffer;
    assert!(harness.editor.edit(buffer, |text| text.push_str(suffix)));
    harness.app.process_pending().await;
}

// ============================================================================
// Session restore and tabs
// ============================================================================

#[tokio::test]
async fn test_restore_opens_every_indexed_file() {
    let harness = seeded("f=a,b", Options::default()).await;
    let registry = harness.registry();

    let names: Vec<String> = registry.documents().iter().map(|d| d.name()).collect();
    assert_eq!(names, vec!["alpha.txt", "beta.md"]);
    assert!(registry
        .documents()
        .iter()
        .all(|d| d.save_state == SaveState::Saved));

    let a = local_id_of(&harness, "a");
    assert_eq!(registry.text_of(a).as_deref(), Some("alpha"));
    assert_eq!(registry.current().unwrap().remote_id.as_deref(), Some("b"));
    assert_eq!(registry.index().ids(), &["a", "b"]);
    harness.assert_index_consistent();
}

#[tokio::test]
async fn test_empty_session_opens_one_fresh_document() {
    let harness = Harness::started(Options::default()).await;
    let registry = harness.registry();

    assert_eq!(registry.documents().len(), 1);
    let document = registry.current().unwrap();
    assert_eq!(document.local_id, LocalId(0));
    assert_eq!(document.name(), "Untitled 0");
    assert!(!document.is_bound());
    assert!(registry.index().is_empty());
}

#[tokio::test]
async fn test_index_tracks_bound_documents_through_close() {
    let mut harness = seeded("f=a,b", Options::default()).await;

    harness.registry_mut().new_tab(None, None).await;
    harness.assert_index_consistent();

    let a = local_id_of(&harness, "a");
    let outcome = harness.registry_mut().close(a).await.unwrap();

    assert_eq!(outcome, CloseOutcome::Closed);
    assert_eq!(harness.registry().index().ids(), &["b"]);
    harness.assert_index_consistent();
    assert_eq!(harness.store.current().await, "u=user-1&f=b");
}

#[tokio::test]
async fn test_local_ids_are_never_reused() {
    let mut harness = Harness::started(Options::default()).await;

    let first = harness.registry().current().unwrap().local_id;
    let second = harness.registry_mut().new_tab(None, None).await;
    let third = harness.registry_mut().new_tab(None, None).await;
    harness.registry_mut().close(third).await.unwrap();
    let fourth = harness.registry_mut().new_tab(None, None).await;

    let ids = [first, second, third, fourth];
    assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids: {ids:?}");
    assert!(harness.registry().document(third).is_none());
}

#[tokio::test]
async fn test_closing_last_document_opens_a_fresh_one() {
    let mut harness = Harness::started(Options::default()).await;
    harness.take_events();

    let outcome = harness.registry_mut().close_current().await.unwrap();

    assert_eq!(outcome, CloseOutcome::Closed);
    let registry = harness.registry();
    assert_eq!(registry.documents().len(), 1);
    let fresh = registry.current().unwrap();
    assert_eq!(fresh.local_id, LocalId(1));
    assert_eq!(fresh.name(), "Untitled 1");

    let events = harness.take_events();
    assert_eq!(count(&events, |e| matches!(e, AppEvent::TabClosed(_))), 1);
    assert_eq!(count(&events, |e| matches!(e, AppEvent::NewTab(_))), 1);
}

#[tokio::test]
async fn test_open_file_id_shows_already_open_document() {
    let mut harness = seeded("f=a", Options::default()).await;
    let a = local_id_of(&harness, "a");
    harness.registry_mut().new_tab(None, None).await;

    let opened = harness.registry_mut().open_file_id("a").await;

    assert_eq!(opened, Some(a));
    assert_eq!(harness.registry().documents().len(), 2);
    assert_eq!(harness.registry().current().unwrap().local_id, a);
    let fetches = harness
        .drive
        .calls_with(HttpMethod::Get)
        .into_iter()
        .filter(|c| c.path == "/drive/v2/files/a")
        .count();
    assert_eq!(fetches, 1);
}

#[tokio::test]
async fn test_open_file_uses_picker_for_plain_text() {
    let mut harness = seeded(
        "",
        Options {
            picks: vec!["a".to_string(), "b".to_string()],
            ..Default::default()
        },
    )
    .await;

    let opened = harness.registry_mut().open_file().await;

    assert_eq!(opened.len(), 2);
    let requests = harness.picker.requests.lock().unwrap().clone();
    assert_eq!(
        requests,
        vec![(PICKER_TITLE.to_string(), vec!["text/plain".to_string()])]
    );
    assert_eq!(harness.registry().documents().len(), 3);
    assert_eq!(harness.registry().index().ids(), &["a", "b"]);
    harness.assert_index_consistent();
}

#[tokio::test]
async fn test_next_tab_wraps_around() {
    let mut harness = seeded("f=a,b", Options::default()).await;
    let a = local_id_of(&harness, "a");
    let b = local_id_of(&harness, "b");

    harness.registry_mut().next_tab();
    assert_eq!(harness.registry().current().unwrap().local_id, a);
    harness.registry_mut().next_tab();
    assert_eq!(harness.registry().current().unwrap().local_id, b);
}

#[tokio::test]
async fn test_failed_fetch_leaves_document_loading() {
    let mut harness = seeded("f=missing", Options::default()).await;

    let document = harness.registry().current().unwrap();
    assert_eq!(document.name(), "Loading...");
    assert_eq!(document.remote_id.as_deref(), Some("missing"));
    assert!(document.remote_file.is_none());
    assert!(harness
        .dialog
        .shown()
        .contains(&"Error 404: File not found: missing".to_string()));

    let err = harness.registry_mut().save(None).await.unwrap_err();
    assert!(err.is_consistency());
    assert_eq!(
        harness.registry().current().unwrap().save_state,
        SaveState::Saved
    );
}

// ============================================================================
// Edits
// ============================================================================

#[tokio::test]
async fn test_doc_change_marks_owning_document_unsaved() {
    let mut harness = seeded("f=a,b", Options::default()).await;
    let a = local_id_of(&harness, "a");
    let b = local_id_of(&harness, "b");
    assert_eq!(harness.registry().current().unwrap().local_id, b);

    edit(&mut harness, a, "!").await;

    let registry = harness.registry();
    assert_eq!(registry.document(a).unwrap().save_state, SaveState::Unsaved);
    assert_eq!(registry.document(b).unwrap().save_state, SaveState::Saved);
}

#[tokio::test]
async fn test_doc_change_for_unknown_buffer_is_rejected() {
    let mut harness = Harness::started(Options::default()).await;

    let err = harness
        .registry_mut()
        .on_doc_changed(BufferHandle(999))
        .unwrap_err();

    assert!(matches!(err, TextDriveError::Consistency(_)));
}

// ============================================================================
// Save
// ============================================================================

#[tokio::test]
async fn test_saving_unbound_document_inserts_once() {
    let mut harness = Harness::started(Options::default()).await;
    assert!(harness.editor.type_line("hello"));
    harness.app.process_pending().await;
    assert_eq!(
        harness.registry().current().unwrap().save_state,
        SaveState::Unsaved
    );
    harness.take_events();

    harness.dialog.reply(Some("notes.txt"));
    let outcome = harness.registry_mut().save(None).await.unwrap();

    assert_eq!(outcome, SaveOutcome::Saved);
    assert_eq!(harness.dialog.prompted(), vec![NAME_PROMPT]);

    let inserts = harness.drive.calls_with(HttpMethod::Post);
    assert_eq!(inserts.len(), 1);
    assert!(inserts[0].upload);
    assert_eq!(inserts[0].path, "/upload/drive/v2/files");

    let stored = harness.drive.file("new-1").unwrap();
    assert_eq!(stored.metadata["title"], "notes.txt");
    assert_eq!(stored.metadata["mimeType"], "text/plain");
    assert_eq!(stored.content, "hello");

    let document = harness.registry().current().unwrap();
    assert_eq!(document.remote_id.as_deref(), Some("new-1"));
    assert_eq!(document.name(), "notes.txt");
    assert_eq!(document.save_state, SaveState::Saved);
    harness.assert_index_consistent();

    let events = harness.take_events();
    assert_eq!(count(&events, |e| matches!(e, AppEvent::TabRenamed(_))), 1);
    let states: Vec<SaveState> = events
        .iter()
        .filter_map(|e| match e {
            AppEvent::TabChange(summary) => Some(summary.save_state),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![SaveState::Saving, SaveState::Saved]);
}

#[tokio::test]
async fn test_saving_bound_document_updates_in_place() {
    let mut harness = seeded("f=a", Options::default()).await;
    let a = local_id_of(&harness, "a");
    edit(&mut harness, a, " more").await;

    let outcome = harness.registry_mut().save(Some(a)).await.unwrap();

    assert_eq!(outcome, SaveOutcome::Saved);
    assert!(harness.drive.calls_with(HttpMethod::Post).is_empty());
    let updates = harness.drive.calls_with(HttpMethod::Put);
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].path, "/upload/drive/v2/files/a");

    let stored = harness.drive.file("a").unwrap();
    assert_eq!(stored.content, "alpha more");
    assert_eq!(stored.metadata["etag"], "\"etag-a\"");

    let document = harness.registry().document(a).unwrap();
    assert_eq!(document.remote_id.as_deref(), Some("a"));
    assert_eq!(document.save_state, SaveState::Saved);
    assert_eq!(harness.registry().index().ids(), &["a"]);
    assert!(harness.dialog.prompted().is_empty());
}

#[tokio::test]
async fn test_cancelled_title_prompt_keeps_document_unsaved() {
    let mut harness = Harness::started(Options::default()).await;
    harness.editor.type_line("draft");
    harness.app.process_pending().await;

    harness.dialog.reply(None);
    assert_eq!(
        harness.registry_mut().save(None).await.unwrap(),
        SaveOutcome::Cancelled
    );
    harness.dialog.reply(Some("   "));
    assert_eq!(
        harness.registry_mut().save(None).await.unwrap(),
        SaveOutcome::Cancelled
    );

    assert_eq!(
        harness.registry().current().unwrap().save_state,
        SaveState::Unsaved
    );
    assert!(harness.drive.calls().is_empty());
}

#[tokio::test]
async fn test_failed_save_reverts_to_unsaved() {
    let mut harness = seeded("f=a", Options::default()).await;
    let a = local_id_of(&harness, "a");
    edit(&mut harness, a, "?").await;

    harness
        .drive
        .fail_next(TextDriveError::remote_api(500, "Backend Error"));
    let outcome = harness.registry_mut().save(None).await.unwrap();
    harness.app.process_pending().await;

    assert_eq!(outcome, SaveOutcome::Failed);
    assert_eq!(
        harness.registry().document(a).unwrap().save_state,
        SaveState::Unsaved
    );
    assert_eq!(harness.drive.file("a").unwrap().content, "alpha");
    assert_eq!(
        harness.dialog.shown().last().map(String::as_str),
        Some("Error 500: Backend Error")
    );
}

#[tokio::test]
async fn test_save_as_opens_a_copy_and_keeps_original() {
    let mut harness = seeded("f=b", Options::default()).await;
    let b = local_id_of(&harness, "b");
    edit(&mut harness, b, " edited").await;

    harness.dialog.reply(Some("copy.md"));
    let outcome = harness.registry_mut().save_as(None).await.unwrap();

    let SaveOutcome::SavedAs(copy) = outcome else {
        panic!("unexpected outcome {outcome:?}");
    };
    assert!(copy > b);

    let registry = harness.registry();
    let original = registry.document(b).unwrap();
    assert_eq!(original.remote_id.as_deref(), Some("b"));
    assert_eq!(original.save_state, SaveState::Unsaved);

    let duplicate = registry.document(copy).unwrap();
    assert_eq!(duplicate.remote_id.as_deref(), Some("new-1"));
    assert_eq!(duplicate.name(), "copy.md");
    assert_eq!(duplicate.save_state, SaveState::Saved);
    assert_eq!(registry.text_of(copy).as_deref(), Some("beta edited"));
    assert_eq!(registry.current().unwrap().local_id, copy);

    let bound_to_copy = registry
        .documents()
        .iter()
        .filter(|d| d.remote_id.as_deref() == Some("new-1"))
        .count();
    assert_eq!(bound_to_copy, 1);

    assert_eq!(harness.drive.calls_with(HttpMethod::Post).len(), 1);
    assert!(harness.drive.calls_with(HttpMethod::Put).is_empty());
    let stored = harness.drive.file("new-1").unwrap();
    assert_eq!(stored.metadata["mimeType"], "text/markdown");
    assert_eq!(harness.drive.file("b").unwrap().content, "beta");
    harness.assert_index_consistent();
}

#[tokio::test]
async fn test_save_as_on_unbound_document_saves_normally() {
    let mut harness = Harness::started(Options::default()).await;
    harness.editor.type_line("fresh");
    harness.app.process_pending().await;

    harness.dialog.reply(Some("fresh.txt"));
    let outcome = harness.registry_mut().save_as(None).await.unwrap();

    assert_eq!(outcome, SaveOutcome::Saved);
    assert_eq!(harness.dialog.prompted(), vec![NAME_PROMPT]);
    assert_eq!(harness.registry().documents().len(), 1);
}

// ============================================================================
// Close
// ============================================================================

#[tokio::test]
async fn test_cancelled_close_keeps_document_open() {
    let mut harness = seeded("f=a", Options::default()).await;
    let a = local_id_of(&harness, "a");
    edit(&mut harness, a, "~").await;

    harness.dialog.answer(Some(BUTTON_CANCEL));
    let outcome = harness.registry_mut().close(a).await.unwrap();

    assert_eq!(outcome, CloseOutcome::Cancelled);
    assert_eq!(harness.dialog.shown(), vec![CLOSE_PROMPT]);
    assert_eq!(
        harness.dialog.last_buttons(),
        vec![BUTTON_YES, BUTTON_NO, BUTTON_CANCEL]
    );
    let document = harness.registry().document(a).unwrap();
    assert_eq!(document.save_state, SaveState::Unsaved);
    assert_eq!(harness.registry().index().ids(), &["a"]);
    assert!(harness.drive.calls_with(HttpMethod::Put).is_empty());
}

#[tokio::test]
async fn test_dismissed_close_dialog_counts_as_cancel() {
    let mut harness = Harness::started(Options::default()).await;
    harness.editor.type_line("x");
    harness.app.process_pending().await;

    harness.dialog.answer(None);
    let outcome = harness.registry_mut().close_current().await.unwrap();

    assert_eq!(outcome, CloseOutcome::Cancelled);
    assert_eq!(harness.registry().documents().len(), 1);
}

#[tokio::test]
async fn test_close_without_saving_discards_changes() {
    let mut harness = seeded("f=a,b", Options::default()).await;
    let a = local_id_of(&harness, "a");
    let b = local_id_of(&harness, "b");
    edit(&mut harness, b, " discarded").await;

    harness.dialog.answer(Some(BUTTON_NO));
    let outcome = harness.registry_mut().close(b).await.unwrap();

    assert_eq!(outcome, CloseOutcome::Closed);
    assert_eq!(harness.registry().current().unwrap().local_id, a);
    assert_eq!(harness.registry().index().ids(), &["a"]);
    assert_eq!(harness.drive.file("b").unwrap().content, "beta");
    harness.assert_index_consistent();
}

#[tokio::test]
async fn test_close_with_save_inserts_then_closes() {
    let mut harness = Harness::started(Options::default()).await;
    harness.editor.type_line("keep me");
    harness.app.process_pending().await;

    harness.dialog.answer(Some(BUTTON_YES));
    harness.dialog.reply(Some("kept.txt"));
    let outcome = harness.registry_mut().close_current().await.unwrap();

    assert_eq!(outcome, CloseOutcome::Closed);
    assert_eq!(harness.drive.file("new-1").unwrap().content, "keep me");
    let fresh = harness.registry().current().unwrap();
    assert_eq!(fresh.name(), "Untitled 1");
    assert!(harness.registry().index().is_empty());
}

#[tokio::test]
async fn test_close_with_autosave_saves_bound_document_silently() {
    let mut harness = seeded("f=a", autosave_options()).await;
    let a = local_id_of(&harness, "a");
    edit(&mut harness, a, " autosaved").await;

    let outcome = harness.registry_mut().close(a).await.unwrap();

    assert_eq!(outcome, CloseOutcome::Closed);
    assert!(harness.dialog.shown().is_empty());
    assert_eq!(harness.drive.calls_with(HttpMethod::Put).len(), 1);
    assert_eq!(harness.drive.file("a").unwrap().content, "alpha autosaved");
}

fn autosave_options() -> Options {
    Options {
        settings: EditorSettings {
            autosave: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[tokio::test]
async fn test_autosave_close_of_unloaded_document_asks_first() {
    let mut harness = seeded("f=missing", autosave_options()).await;
    let missing = local_id_of(&harness, "missing");
    edit(&mut harness, missing, "typed while loading").await;

    harness.dialog.answer(Some(BUTTON_NO));
    let outcome = harness.registry_mut().close(missing).await.unwrap();

    assert_eq!(outcome, CloseOutcome::Closed);
    assert_eq!(
        harness.dialog.shown().last().map(String::as_str),
        Some(CLOSE_PROMPT)
    );
    assert!(harness.registry().document(missing).is_none());
    assert!(harness.registry().index().is_empty());
    assert!(harness.drive.calls_with(HttpMethod::Put).is_empty());
    harness.assert_index_consistent();
}

#[tokio::test]
async fn test_saving_unloaded_document_on_close_keeps_it_open() {
    let mut harness = seeded("f=missing", autosave_options()).await;
    let missing = local_id_of(&harness, "missing");
    edit(&mut harness, missing, "typed while loading").await;

    harness.dialog.answer(Some(BUTTON_YES));
    let outcome = harness.registry_mut().close(missing).await.unwrap();

    assert_eq!(outcome, CloseOutcome::SaveFailed);
    let document = harness.registry().document(missing).unwrap();
    assert_eq!(document.save_state, SaveState::Unsaved);
    assert_eq!(harness.registry().index().ids(), &["missing"]);
}

#[tokio::test]
async fn test_shutdown_with_autosave_saves_pending_documents() {
    let mut harness = seeded("f=a,b", autosave_options()).await;
    let a = local_id_of(&harness, "a");
    let b = local_id_of(&harness, "b");
    edit(&mut harness, a, "1").await;
    edit(&mut harness, b, "2").await;

    harness.app.shutdown().await;

    assert_eq!(harness.drive.calls_with(HttpMethod::Put).len(), 2);
    assert_eq!(harness.drive.file("a").unwrap().content, "alpha1");
    assert_eq!(harness.drive.file("b").unwrap().content, "beta2");
    assert!(harness
        .registry()
        .documents()
        .iter()
        .all(|d| d.save_state == SaveState::Saved));
}

// ============================================================================
// Settings
// ============================================================================

#[tokio::test]
async fn test_new_documents_follow_view_settings() {
    let mut harness = Harness::started(Options {
        settings: EditorSettings {
            tabsize: 4,
            wraplines: false,
            ..Default::default()
        },
        ..Default::default()
    })
    .await;

    let local_id = harness.registry_mut().new_tab(None, None).await;
    let buffer = harness.registry().document(local_id).unwrap().buffer;
    let view = harness.editor.view(buffer).unwrap();

    assert_eq!(view.tab_width, 4);
    assert!(!view.wrap);
}

#[tokio::test]
async fn test_zero_tab_size_falls_back_everywhere() {
    let mut harness = seeded("f=a,b", Options::default()).await;

    harness
        .settings
        .set(SettingKey::TabSize, SettingValue::Integer(0))
        .unwrap();
    harness.app.process_pending().await;

    assert_eq!(
        harness.settings.get(SettingKey::TabSize),
        SettingValue::Integer(8)
    );
    for document in harness.registry().documents() {
        assert_eq!(harness.editor.view(document.buffer).unwrap().tab_width, 8);
    }

    let later = harness.registry_mut().new_tab(None, None).await;
    let buffer = harness.registry().document(later).unwrap().buffer;
    assert_eq!(harness.editor.view(buffer).unwrap().tab_width, 8);
}

#[tokio::test]
async fn test_wrap_change_applies_to_open_documents() {
    let mut harness = seeded("f=a,b", Options::default()).await;

    harness
        .settings
        .set(SettingKey::WrapLines, SettingValue::Bool(false))
        .unwrap();
    harness.app.process_pending().await;

    for document in harness.registry().documents() {
        assert!(!harness.editor.view(document.buffer).unwrap().wrap);
    }
}
