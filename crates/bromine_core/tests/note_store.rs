use bromine_core::db::open_db_in_memory;
use bromine_core::model::cover::CoverImage;
use bromine_core::model::note::{NoteDraft, NotePatch, NoteValidationError};
use bromine_core::repo::note_repo::SqliteNoteRepository;
use bromine_core::service::note_service::{NoteService, NoteServiceError};
use rusqlite::Connection;
use uuid::Uuid;

fn service(conn: &Connection) -> NoteService<SqliteNoteRepository<'_>> {
    NoteService::new(SqliteNoteRepository::try_new(conn).unwrap())
}

fn draft(local_id: &str, title: &str, content: &str) -> NoteDraft {
    NoteDraft {
        local_id: Some(local_id.to_string()),
        title: Some(title.to_string()),
        content: content.to_string(),
        cover_image: CoverImage::none(),
    }
}

#[test]
fn create_twice_with_same_local_id_updates_instead_of_duplicating() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let first = service.create(&draft("abc", "Untitled", "<p></p>")).unwrap();
    let second = service
        .create(&NoteDraft {
            cover_image: CoverImage::new("#FFD700"),
            ..draft("abc", "Groceries", "<p>milk</p>")
        })
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(second.title, "Groceries");
    assert_eq!(second.content, "<p>milk</p>");
    assert_eq!(second.cover_image.as_str(), "#FFD700");

    let notes = service.list().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].local_id, "abc");
}

#[test]
fn create_without_local_id_generates_a_key() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let a = service
        .create(&NoteDraft {
            local_id: None,
            ..draft("unused", "A", "")
        })
        .unwrap();
    let b = service
        .create(&NoteDraft {
            local_id: None,
            ..draft("unused", "B", "")
        })
        .unwrap();

    assert_ne!(a.local_id, b.local_id);
    assert_eq!(service.list().unwrap().len(), 2);
}

#[test]
fn create_without_title_is_a_validation_error() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let err = service
        .create(&NoteDraft {
            local_id: Some("abc".to_string()),
            ..NoteDraft::default()
        })
        .unwrap_err();
    assert!(matches!(
        err,
        NoteServiceError::Validation(NoteValidationError::MissingTitle)
    ));
    assert!(service.list().unwrap().is_empty());
}

#[test]
fn update_replaces_mutable_fields_and_keeps_identity() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let note = service
        .create(&NoteDraft {
            cover_image: CoverImage::new("#FF6B6B"),
            ..draft("abc", "Untitled", "<p>draft</p>")
        })
        .unwrap();

    let patch = NotePatch {
        title: "Plan".to_string(),
        content: String::new(),
        cover_image: CoverImage::none(),
        edit_seq: None,
    };
    service.update(note.id, &patch).unwrap();

    let stored = service.get(note.id).unwrap().unwrap();
    assert_eq!(stored.title, patch.title);
    assert_eq!(stored.content, patch.content);
    assert_eq!(stored.cover_image, patch.cover_image);
    assert_eq!(stored.id, note.id);
    assert_eq!(stored.local_id, note.local_id);
    assert_eq!(stored.created_at, note.created_at);
}

#[test]
fn update_of_unknown_note_fails_loud() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let missing = Uuid::new_v4();

    let err = service
        .update(
            missing,
            &NotePatch {
                title: "x".to_string(),
                ..NotePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, NoteServiceError::NoteNotFound(id) if id == missing));

    let err = service
        .update(
            missing,
            &NotePatch {
                title: "x".to_string(),
                edit_seq: Some(3),
                ..NotePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, NoteServiceError::NoteNotFound(_)));
}

#[test]
fn older_edit_seq_is_rejected_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let note = service.create(&draft("abc", "Untitled", "")).unwrap();

    let newer = NotePatch {
        title: "second".to_string(),
        edit_seq: Some(2),
        ..NotePatch::default()
    };
    let saved = service.update(note.id, &newer).unwrap();
    assert_eq!(saved.edit_seq, 2);

    let older = NotePatch {
        title: "first".to_string(),
        edit_seq: Some(1),
        ..NotePatch::default()
    };
    let err = service.update(note.id, &older).unwrap_err();
    assert!(matches!(
        err,
        NoteServiceError::StaleWrite {
            stored: 2,
            attempted: 1,
            ..
        }
    ));
    assert_eq!(service.get(note.id).unwrap().unwrap().title, "second");

    // Retrying the same sequence is accepted.
    assert!(service.update(note.id, &newer).is_ok());

    // Unstamped writes always win.
    let unstamped = NotePatch {
        title: "forced".to_string(),
        ..NotePatch::default()
    };
    let saved = service.update(note.id, &unstamped).unwrap();
    assert_eq!(saved.title, "forced");
    assert_eq!(saved.edit_seq, 2);
}

#[test]
fn delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let note = service.create(&draft("abc", "Untitled", "")).unwrap();

    service.delete(note.id).unwrap();
    service.delete(note.id).unwrap();
    service.delete(Uuid::new_v4()).unwrap();

    assert!(service.get(note.id).unwrap().is_none());
    assert!(service.list().unwrap().is_empty());
}

#[test]
fn dashboard_lists_newest_first() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    service.create(&draft("a", "First", "<p>one</p>")).unwrap();
    service.create(&draft("b", "Second", "")).unwrap();

    let cards = service.dashboard().unwrap();
    let titles: Vec<&str> = cards.iter().map(|card| card.title.as_str()).collect();
    assert_eq!(titles, ["Second", "First"]);
    assert_eq!(cards[0].preview, "No content");
    assert_eq!(cards[1].preview, "one");
}

#[test]
fn link_candidates_exclude_current_note() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let a = service.create(&draft("a", "A", "")).unwrap();
    let b = service.create(&draft("b", "B", "")).unwrap();

    let candidates = service.link_candidates(a.id).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].id, b.id);
}
