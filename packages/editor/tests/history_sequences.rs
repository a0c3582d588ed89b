//! Long undo/redo sequences driven through toolbar commands
//!
//! This tests:
//! - N undos then N redos land on the state after the Nth command
//! - Recording after an undo truncates the redo branch
//! - The log never exceeds its bound and evicts oldest first

use scribe_editor::{CapabilitySet, EditorConfig, EditorSession, Selection, ToolbarCommand};
use scribe_evaluator::MarkupCompiler;
use std::sync::Arc;

fn session(history_limit: usize) -> EditorSession {
    let config = EditorConfig {
        history_limit,
        new_document_template: "start".to_string(),
        ..Default::default()
    };
    EditorSession::new_document(&config, CapabilitySet::builtins(), Arc::new(MarkupCompiler::new()))
        .unwrap()
}

/// Cycle through commands that always change the text
fn command(i: usize) -> ToolbarCommand {
    match i % 5 {
        0 => ToolbarCommand::Bold,
        1 => ToolbarCommand::Italic,
        2 => ToolbarCommand::Quote,
        3 => ToolbarCommand::InlineCode,
        _ => ToolbarCommand::Strikethrough,
    }
}

/// Run `count` commands and return the text after each one
fn run_commands(session: &mut EditorSession, count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            session.set_selection(Selection::new(0, session.text().len()));
            session.apply_command(&command(i)).unwrap();
            session.text().to_string()
        })
        .collect()
}

#[tokio::test]
async fn test_undo_all_then_redo_all() {
    let mut session = session(50);
    let states = run_commands(&mut session, 12);

    for _ in 0..12 {
        assert!(session.undo());
    }
    assert_eq!(session.text(), "start");
    assert!(!session.can_undo());

    for expected in &states {
        assert!(session.redo());
        assert_eq!(session.text(), expected);
    }
    assert!(!session.can_redo());
    assert!(!session.redo());
}

#[tokio::test]
async fn test_new_command_after_undo_truncates_redo() {
    let mut session = session(50);
    let states = run_commands(&mut session, 4);

    session.undo();
    session.undo();
    assert_eq!(session.text(), states[1]);
    assert!(session.can_redo());

    session.apply_command(&ToolbarCommand::Heading(3)).unwrap();
    assert!(!session.can_redo());
    assert!(!session.redo());
    assert!(session.text().starts_with("### "));

    session.undo();
    assert_eq!(session.text(), states[1]);
}

#[tokio::test]
async fn test_fifty_five_commands_with_limit_fifty() {
    let mut session = session(50);
    let states = run_commands(&mut session, 55);

    assert_eq!(session.history().len(), 50);

    let mut undos = 0;
    while session.undo() {
        undos += 1;
    }
    assert_eq!(undos, 49);
    // Oldest surviving entry is the state after the 6th command
    assert_eq!(session.text(), states[5]);
    assert_ne!(session.text(), "start");
}

#[tokio::test]
async fn test_bound_holds_at_every_step() {
    let mut session = session(7);
    for i in 0..30 {
        session.set_selection(Selection::cursor(0));
        session.apply_command(&command(i)).unwrap();
        assert!(session.history().len() <= 7);
    }
    assert_eq!(session.history().len(), 7);
}

#[tokio::test]
async fn test_undo_at_oldest_is_a_no_op() {
    let mut session = session(50);
    assert!(!session.can_undo());
    assert!(!session.undo());
    assert_eq!(session.text(), "start");
    assert_eq!(session.history().cursor(), 0);
}
