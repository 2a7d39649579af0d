//! Whole runs against an in-process client.

mod common;

use checksums::{Md5, to_hex};
use common::{Workspace, datapath, dir, file, paths, stored_file};
use manifest::ManifestWriter;
use protocol::{Command, Record};
use test_support::{CHUNK_LEN, MemoryTransport, Request, ScriptedClient};
use transfer::{PHASE_END, Phase2, Phase2Config, Phase2Error, Progress};

#[test]
fn new_file_is_requested_received_and_logged() {
    let ws = Workspace::new();
    ws.phase1(&[file("/docs/report.txt", 1_700_000_000)]);
    let contents = b"quarterly numbers\n".repeat(1000);
    let client = ScriptedClient::new().with_file("/docs/report.txt", contents.clone());

    let (stats, client) = ws.run(client);

    let sent: Vec<Command> = client.received().iter().map(Record::command).collect();
    assert_eq!(sent, [Command::Attribs, Command::File, Command::Gen]);
    assert_eq!(client.requests(), &[Request::New("/docs/report.txt".into())]);

    let changed = ws.changed();
    assert_eq!(changed.len(), 1);
    assert_eq!(datapath(&changed[0]), "0000/0000/0000");
    let end = changed[0].end_file().unwrap().unwrap();
    assert_eq!(end.bytes, contents.len() as u64);
    assert_eq!(end.md5, Some(to_hex(&Md5::digest(&contents))));
    assert_eq!(ws.received_data("0000/0000/0000"), contents);

    assert_eq!(stats.new, 1);
    assert_eq!(stats.received, contents.len() as u64);
    assert_eq!(stats.warnings, 0);
    assert!(ws.unchanged().is_empty());
}

#[test]
fn identical_file_requests_nothing() {
    let ws = Workspace::new();
    ws.store("0000/0000/0000", b"same");
    ws.previous(&[stored_file("/same", 42, "0000/0000/0000", b"same")]);
    ws.phase1(&[file("/same", 42)]);

    let (stats, client) = ws.run(ScriptedClient::new());

    assert!(client.requests().is_empty());
    assert_eq!(
        client.received(),
        &[Record::with_text(Command::Gen, PHASE_END)]
    );
    assert_eq!(paths(&ws.unchanged()), ["/same"]);
    assert!(ws.changed().is_empty());
    assert_eq!(stats.same, 1);
    assert_eq!(stats.received, 0);
}

#[test]
fn interrupted_request_is_skipped() {
    let ws = Workspace::new();
    ws.phase1(&[file("/gone", 1), file("/kept", 1)]);
    let client = ScriptedClient::new().interrupt("/gone");

    let (stats, client) = ws.run(client);

    assert_eq!(
        client.requests(),
        &[
            Request::Interrupted("/gone".into()),
            Request::New("/kept".into())
        ]
    );
    assert_eq!(paths(&ws.changed()), ["/kept"]);
    assert_eq!(stats.new, 1);
}

#[test]
fn client_warnings_are_counted_not_fatal() {
    let ws = Workspace::new();
    ws.phase1(&[dir("/tmp", 1)]);
    let mut client = ScriptedClient::new();
    client.push(Record::with_text(Command::Warning, "/tmp/socket: skipped"));
    client.push(Record::with_text(Command::Message, "scanning"));

    let (stats, _) = ws.run(client);

    assert_eq!(stats.warnings, 2);
    assert_eq!(stats.new, 1);
}

#[test]
fn small_write_buffer_gives_the_same_result() {
    let base: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
    let build = || {
        let ws = Workspace::new();
        ws.store("0000/0000/0000", &base);
        ws.previous(&[
            dir("/d", 1),
            stored_file("/d/big", 1, "0000/0000/0000", &base),
        ]);
        ws.phase1(&[
            dir("/d", 1),
            file("/d/big", 2),
            file("/d/new-1", 2),
            file("/d/new-2", 2),
        ]);
        ws
    };
    let client = |capacity: usize| {
        ScriptedClient::with_capacity(capacity)
            .with_file("/d/big", vec![7u8; 3 * CHUNK_LEN + 11])
            .with_file("/d/new-1", b"one".to_vec())
    };

    let roomy = build();
    let (roomy_stats, roomy_client) = roomy.run(client(usize::MAX / 2));

    let tight = build();
    let tight_client = client(200);
    let (tight_stats, tight_client) = tight.run(tight_client);

    assert_eq!(tight_stats, roomy_stats);
    assert_eq!(tight_client.requests(), roomy_client.requests());
    assert_eq!(tight_client.signature("/d/big"), roomy_client.signature("/d/big"));
    assert_eq!(
        std::fs::read(&tight.dirs.changed).unwrap(),
        std::fs::read(&roomy.dirs.changed).unwrap()
    );
    assert_eq!(
        std::fs::read(&tight.dirs.unchanged).unwrap(),
        std::fs::read(&roomy.dirs.unchanged).unwrap()
    );
}

#[test]
fn unexpected_record_is_a_protocol_error() {
    let ws = Workspace::new();
    ws.phase1(&[]);
    let mut transport = MemoryTransport::new();
    transport.push_inbound(Record::new(Command::Append, b"stray".to_vec()));

    let mut phase2 = Phase2::open(transport, Phase2Config::default(), ws.dirs.clone(), None).unwrap();
    let err = phase2.run().unwrap_err();
    assert!(matches!(err, Phase2Error::Protocol(_)), "{err}");
}

#[test]
fn path_without_attributes_is_rejected() {
    let ws = Workspace::new();
    ws.phase1(&[]);
    let mut transport = MemoryTransport::new();
    transport.push_inbound(Record::with_text(Command::File, "/x"));

    let mut phase2 = Phase2::open(transport, Phase2Config::default(), ws.dirs.clone(), None).unwrap();
    assert!(matches!(phase2.run(), Err(Phase2Error::Protocol(_))));
}

#[test]
fn closed_connection_fails_the_phase() {
    let ws = Workspace::new();
    ws.phase1(&[]);
    let mut transport = MemoryTransport::new();
    transport.close();

    let mut phase2 = Phase2::open(transport, Phase2Config::default(), ws.dirs.clone(), None).unwrap();
    assert!(phase2.run().is_err());
    assert!(!phase2.is_finished());
}

#[test]
fn step_reports_finished_after_acknowledgement() {
    let ws = Workspace::new();
    ManifestWriter::create(&ws.dirs.phase1).unwrap().close().unwrap();
    let mut phase2 =
        Phase2::open(ScriptedClient::new(), Phase2Config::default(), ws.dirs.clone(), None).unwrap();

    let mut steps = 0;
    while phase2.step().unwrap() == Progress::Continue {
        steps += 1;
        assert!(steps < 100, "phase never finished");
    }
    assert_eq!(phase2.step().unwrap(), Progress::Finished);
    assert!(phase2.transport().phase_end_seen());
}
