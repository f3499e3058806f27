//! Checkpoint cadence, revision sequencing, and per-thread exclusivity.

mod common;

use std::sync::Arc;

use common::*;
use noteflow::engine::{
    Checkpoint, CheckpointError, CheckpointStore, EngineError, RunStatus, TurnRequest,
};
use noteflow::event::ResumeDecision;
use noteflow::state::WorkflowState;
use noteflow::types::NodeKind;

#[tokio::test]
async fn every_node_boundary_persists_a_revision() {
    let model = ScriptedModel::texts(&[&classifier_json("GENERAL", None), "answer"]);
    let (engine, store) = engine_with(model, MemoryNoteStore::new());

    engine
        .start_turn("t1", TurnRequest::new("q", "proj"))
        .await
        .unwrap();

    let chain = store.chain("t1");
    let summary: Vec<(u64, RunStatus)> = chain.iter().map(|cp| (cp.revision, cp.status)).collect();
    assert_eq!(
        summary,
        vec![
            (
                1,
                RunStatus::InProgress {
                    next: NodeKind::ResponseGenerator
                }
            ),
            (2, RunStatus::Completed),
        ]
    );
}

#[tokio::test]
async fn consent_path_checkpoints_through_suspension_and_resume() {
    let model = ScriptedModel::texts(&[&classifier_json("ADD_TO_NOTE", None), "draft"]);
    let (engine, store) = engine_with(model, MemoryNoteStore::new());

    engine
        .start_turn("t1", TurnRequest::new("note this", "proj"))
        .await
        .unwrap();
    engine
        .resume("t1", ResumeDecision::approve())
        .await
        .unwrap();

    let statuses: Vec<RunStatus> = store.chain("t1").iter().map(|cp| cp.status).collect();
    assert_eq!(
        statuses,
        vec![
            RunStatus::InProgress {
                next: NodeKind::NoteGenerator
            },
            RunStatus::InProgress {
                next: NodeKind::ConsentGate
            },
            RunStatus::AwaitingConsent,
            RunStatus::Completed,
        ]
    );
}

#[tokio::test]
async fn second_turn_continues_the_revision_chain() {
    let model = ScriptedModel::texts(&[
        &classifier_json("GENERAL", None),
        "first",
        &classifier_json("GENERAL", None),
        "second",
    ]);
    let (engine, store) = engine_with(model, MemoryNoteStore::new());

    engine
        .start_turn("t1", TurnRequest::new("one", "proj"))
        .await
        .unwrap();
    engine
        .start_turn("t1", TurnRequest::new("two", "proj"))
        .await
        .unwrap();

    let revisions: Vec<u64> = store.chain("t1").iter().map(|cp| cp.revision).collect();
    assert_eq!(revisions, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn concurrent_runs_on_one_thread_are_rejected() {
    let inner = ScriptedModel::texts(&[&classifier_json("GENERAL", None), "answer"]);
    let (gated, mut entered, gate) = GatedModel::new(inner);
    let (engine, _) = engine_with(gated, MemoryNoteStore::new());
    let engine = Arc::new(engine);

    let background = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            engine
                .start_turn("t1", TurnRequest::new("first", "proj"))
                .await
        })
    };
    entered.recv().await.expect("first run reaches the model");

    // The first run holds the thread lease while parked in the model call.
    let err = engine
        .start_turn("t1", TurnRequest::new("second", "proj"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ThreadBusy { .. }));

    gate.add_permits(2);
    background.await.unwrap().unwrap();

    // Lease released; the thread accepts turns again (replies exhausted is
    // fine, we only care that the lease no longer blocks).
    gate.add_permits(1);
    let err = engine
        .start_turn("t1", TurnRequest::new("third", "proj"))
        .await
        .unwrap_err();
    assert!(!matches!(err, EngineError::ThreadBusy { .. }));
}

#[tokio::test]
async fn interleaved_writer_surfaces_a_conflict() {
    let inner = ScriptedModel::texts(&[&classifier_json("GENERAL", None), "answer"]);
    let (gated, mut entered, gate) = GatedModel::new(inner);
    let (engine, store) = engine_with(gated, MemoryNoteStore::new());
    let engine = Arc::new(engine);

    let background = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.start_turn("t1", TurnRequest::new("q", "proj")).await })
    };
    entered.recv().await.expect("run reaches the model");

    // Another process writes revision 1 while our run is mid-node.
    store
        .save(Checkpoint::new(
            "t1",
            1,
            RunStatus::Completed,
            WorkflowState::default(),
        ))
        .await
        .unwrap();

    gate.add_permits(2);
    let err = background.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        EngineError::Checkpoint(CheckpointError::Conflict {
            attempted: 1,
            current: 1,
            ..
        })
    ));
}

#[tokio::test]
async fn distinct_threads_run_independently() {
    let model = ScriptedModel::texts(&[
        &classifier_json("GENERAL", None),
        "one",
        &classifier_json("GENERAL", None),
        "two",
    ]);
    let (engine, store) = engine_with(model, MemoryNoteStore::new());

    engine
        .start_turn("alpha", TurnRequest::new("q", "proj"))
        .await
        .unwrap();
    engine
        .start_turn("beta", TurnRequest::new("q", "proj"))
        .await
        .unwrap();

    let mut threads = store.list_threads().await.unwrap();
    threads.sort();
    assert_eq!(threads, vec!["alpha", "beta"]);
    assert_eq!(store.chain("alpha").len(), 2);
    assert_eq!(store.chain("beta").len(), 2);
}
