//! Checkpointing and resuming an interrupted run.

mod common;

use std::fs;

use common::{Workspace, dir, file, stored_file};
use manifest::FileRecord;
use test_support::ScriptedClient;
use transfer::{Phase2, Phase2Config, Progress, ResumePosition, resume};

const BASE: &[u8] = b"stored copy of the changed file\n";

fn previous() -> Vec<FileRecord> {
    vec![
        dir("/home", 1),
        stored_file("/home/a", 1, "0000/0000/0000", b"a"),
        stored_file("/home/b", 1, "0000/0000/0001", b"b"),
        stored_file("/home/c", 1, "0000/0000/0002", BASE),
        stored_file("/home/e", 1, "0000/0000/0003", b"e"),
    ]
}

fn phase1() -> Vec<FileRecord> {
    vec![
        dir("/home", 1),
        file("/home/a", 1),
        file("/home/c", 2),
        file("/home/d", 2),
        file("/home/e", 1),
        file("/home/f", 2),
        file("/home/g", 2),
    ]
}

fn workspace() -> Workspace {
    let ws = Workspace::new();
    ws.store("0000/0000/0000", b"a");
    ws.store("0000/0000/0001", b"b");
    ws.store("0000/0000/0002", BASE);
    ws.store("0000/0000/0003", b"e");
    ws.previous(&previous());
    ws.phase1(&phase1());
    ws
}

fn client() -> ScriptedClient {
    ScriptedClient::new().with_file("/home/c", b"the changed file, edited\n".to_vec())
}

/// Steps until `done` entries are dispositioned, then checkpoints and drops
/// the run as if the server had died.
fn interrupt_after(ws: &Workspace, done: u64) -> ResumePosition {
    let mut phase2 = Phase2::open(client(), Phase2Config::default(), ws.dirs.clone(), None).unwrap();
    while phase2.stats().total() < done {
        assert_eq!(phase2.step().unwrap(), Progress::Continue);
    }
    phase2.checkpoint().unwrap()
}

fn logs(ws: &Workspace) -> (Vec<u8>, Vec<u8>) {
    (
        fs::read(&ws.dirs.unchanged).unwrap(),
        fs::read(&ws.dirs.changed).unwrap(),
    )
}

#[test]
fn resumed_run_matches_an_uninterrupted_one() {
    let reference = workspace();
    reference.run(client());

    for done in 1..=6 {
        let ws = workspace();
        let position = interrupt_after(&ws, done);
        resume::prepare(&ws.dirs, &position).unwrap();

        let mut phase2 =
            Phase2::open(client(), Phase2Config::default(), ws.dirs.clone(), Some(position)).unwrap();
        phase2.run().unwrap();
        assert!(phase2.is_finished());

        assert_eq!(logs(&ws), logs(&reference), "interrupted after {done}");
        for datapath in ["0000/0000/0004", "0000/0000/0005", "0000/0000/0006"] {
            assert_eq!(
                ws.received_data(datapath),
                reference.received_data(datapath),
                "{datapath} after {done}"
            );
        }
        assert_eq!(
            fs::read(ws.forward_delta("0000/0000/0002")).unwrap(),
            b"the changed file, edited\n"
        );
    }
}

#[test]
fn checkpoint_before_any_work_is_the_start() {
    let ws = workspace();
    let mut phase2 = Phase2::open(client(), Phase2Config::default(), ws.dirs.clone(), None).unwrap();
    let position = phase2.checkpoint().unwrap();
    assert_eq!(position.unchanged_len, 0);
    assert_eq!(position.changed_len, 0);
    assert_eq!(position.next_data_index, 4);
}

#[test]
fn checkpoint_trails_outstanding_requests() {
    let ws = workspace();
    let mut phase2 = Phase2::open(client(), Phase2Config::default(), ws.dirs.clone(), None).unwrap();
    // Dispositions /home and /home/a, then requests /home/c without servicing
    // the client.
    while phase2.stats().total() < 2 {
        assert_eq!(phase2.step().unwrap(), Progress::Continue);
    }
    let settled = phase2.checkpoint().unwrap();
    assert_eq!(phase2.step().unwrap(), Progress::Continue);
    let pending = phase2.checkpoint().unwrap();

    assert_eq!(pending.phase1, settled.phase1);
    assert_eq!(pending.changed_len, 0);
}

#[test]
fn resume_with_foreign_logs_is_rejected() {
    let ws = workspace();
    let position = ResumePosition {
        unchanged_len: 4096,
        ..ResumePosition::default()
    };
    fs::create_dir_all(&ws.dirs.working).unwrap();
    fs::write(&ws.dirs.unchanged, b"short").unwrap();
    assert!(resume::prepare(&ws.dirs, &position).is_err());
}
