use bromine_core::db::open_db_in_memory;
use bromine_core::model::document::{Block, Document};
use bromine_core::model::note::{Note, NoteDraft, NotePatch};
use bromine_core::model::note_link::ViewMode;
use bromine_core::repo::note_repo::SqliteNoteRepository;
use bromine_core::service::note_service::NoteService;
use bromine_core::session::{EditorSession, SessionError, StoreGateway};
use rusqlite::Connection;

fn session(conn: &Connection) -> EditorSession<StoreGateway<SqliteNoteRepository<'_>>> {
    let repo = SqliteNoteRepository::try_new(conn).unwrap();
    EditorSession::new(StoreGateway::new(NoteService::new(repo)))
}

fn create(
    session: &EditorSession<StoreGateway<SqliteNoteRepository<'_>>>,
    local_id: &str,
    title: &str,
    content: &str,
) -> Note {
    session
        .gateway()
        .service()
        .create(&NoteDraft {
            local_id: Some(local_id.to_string()),
            title: Some(title.to_string()),
            content: content.to_string(),
            ..NoteDraft::default()
        })
        .unwrap()
}

#[test]
fn link_to_deleted_note_reports_not_found_and_keeps_host_open() {
    let conn = open_db_in_memory().unwrap();
    let mut session = session(&conn);

    let n1 = create(&session, "abc", "Untitled", "<p></p>");
    assert_eq!(n1.local_id, "abc");
    assert_eq!(n1.title, "Untitled");
    let n2 = create(&session, "def", "Recipes", "<p>Flour, eggs</p>");

    session.open(n1.clone());
    let (ordinal, outcome) = session.insert_link(0, &n2).unwrap();
    assert_eq!(ordinal, 0);
    assert!(outcome.is_saved());

    let link = session.current().unwrap().document().note_link(0).unwrap().clone();
    assert_eq!(link.target_id, Some(n2.id));
    assert_eq!(link.title, "Recipes");
    assert_eq!(link.preview, "Flour, eggs");
    assert_eq!(link.view_mode, ViewMode::Card);

    session.gateway().service().delete(n2.id).unwrap();

    let err = session.follow_link(0).unwrap_err();
    assert_eq!(err, SessionError::DanglingLink(Some(n2.id)));
    assert!(err.to_string().starts_with("note not found"));
    assert_eq!(session.current().unwrap().id(), n1.id);
}

#[test]
fn following_a_live_link_opens_the_target() {
    let conn = open_db_in_memory().unwrap();
    let mut session = session(&conn);
    let host = create(&session, "a", "Host", "<p>intro</p>");
    let target = create(&session, "b", "Target", "<p>body</p>");

    session.open(host);
    session.insert_link(1, &target).unwrap();

    assert_eq!(session.follow_link(0).unwrap(), target.id);
    let open = session.current().unwrap();
    assert_eq!(open.id(), target.id);
    assert_eq!(open.title(), "Target");
}

#[test]
fn link_snapshot_does_not_follow_target_edits() {
    let conn = open_db_in_memory().unwrap();
    let mut session = session(&conn);
    let host = create(&session, "a", "Host", "");
    let target = create(&session, "b", "Recipes", "<p>Flour, eggs</p>");

    session.open(host.clone());
    session.insert_link(0, &target).unwrap();

    session
        .gateway()
        .service()
        .update(
            target.id,
            &NotePatch {
                title: "Desserts".to_string(),
                content: "<p>Sugar</p>".to_string(),
                ..NotePatch::from_note(&target)
            },
        )
        .unwrap();

    let stored = session.gateway().service().get(host.id).unwrap().unwrap();
    let document = Document::parse_html(&stored.content);
    let link = document.note_link(0).unwrap();
    assert_eq!(link.title, "Recipes");
    assert_eq!(link.preview, "Flour, eggs");
}

#[test]
fn toggled_view_mode_survives_reload() {
    let conn = open_db_in_memory().unwrap();
    let mut session = session(&conn);
    let host = create(&session, "a", "Host", "<p>before</p>");
    let target = create(&session, "b", "Target", "");

    session.open(host.clone());
    session.insert_link(1, &target).unwrap();
    let (mode, outcome) = session.toggle_link_view(0).unwrap();
    assert_eq!(mode, ViewMode::Link);
    assert!(outcome.is_saved());

    session.close();
    let reloaded = session.gateway().service().get(host.id).unwrap().unwrap();
    session.open(reloaded);

    let document = session.current().unwrap().document();
    assert_eq!(document.note_link(0).unwrap().view_mode, ViewMode::Link);
    assert!(matches!(document.blocks()[0], Block::Paragraph { .. }));
    assert_eq!(document.note_links()[0].preview, "No preview");
}

#[test]
fn a_note_cannot_link_to_itself() {
    let conn = open_db_in_memory().unwrap();
    let mut session = session(&conn);
    let note = create(&session, "a", "Solo", "");

    session.open(note.clone());
    assert_eq!(
        session.insert_link(0, &note).unwrap_err(),
        SessionError::SelfLink
    );
    assert!(session.current().unwrap().document().note_links().is_empty());
}
