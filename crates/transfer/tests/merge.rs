//! Merging the client's list against the previous manifest.

mod common;

use std::fs;

use common::{Workspace, datapath, dir, file, paths, stored_file};
use manifest::{AttribCodec, StatAttribs};
use protocol::Command;
use test_support::{Request, ScriptedClient, entry, link, stored};
use transfer::Phase2Config;

#[test]
fn each_path_gets_exactly_one_disposition() {
    let ws = Workspace::new();
    ws.store("0000/0000/0000", b"A");
    ws.store("0000/0000/0001", b"C");
    ws.store("0000/0000/0002", b"D");
    ws.previous(&[
        stored_file("/a", 10, "0000/0000/0000", b"A"),
        stored_file("/c", 10, "0000/0000/0001", b"C"),
        stored_file("/d", 10, "0000/0000/0002", b"D"),
    ]);
    ws.phase1(&[file("/a", 10), file("/b", 10), file("/d", 10)]);

    let (stats, client) = ws.run(ScriptedClient::new());

    assert_eq!(stats.same, 2);
    assert_eq!(stats.new, 1);
    assert_eq!(stats.deleted, 1);
    assert_eq!(stats.changed, 0);
    assert_eq!(client.requests(), &[Request::New("/b".into())]);
    assert_eq!(paths(&ws.unchanged()), ["/a", "/d"]);
    let changed = ws.changed();
    assert_eq!(paths(&changed), ["/b"]);
    assert_eq!(datapath(&changed[0]), "0000/0000/0003");
    assert_eq!(ws.received_data("0000/0000/0003"), b"contents of /b\n");
}

#[test]
fn unchanged_entries_keep_their_stored_data() {
    let ws = Workspace::new();
    ws.store("0000/0000/0000", b"payload");
    ws.previous(&[stored_file("/etc/hosts", 77, "0000/0000/0000", b"payload")]);
    ws.phase1(&[file("/etc/hosts", 77)]);

    let (stats, client) = ws.run(ScriptedClient::new());

    assert!(client.requests().is_empty());
    assert_eq!(stats.bytes, 7);
    let unchanged = ws.unchanged();
    assert_eq!(unchanged.len(), 1);
    assert_eq!(datapath(&unchanged[0]), "0000/0000/0000");
    assert_eq!(unchanged[0].endfile_bytes(), 7);
    assert!(ws.changed().is_empty());
}

#[test]
fn unchanged_classification_is_idempotent() {
    let first = Workspace::new();
    first.store("0000/0000/0000", b"one");
    first.previous(&[
        dir("/srv", 5),
        link("/srv/link", "one", 5),
        stored_file("/srv/one", 5, "0000/0000/0000", b"one"),
    ]);
    first.phase1(&[dir("/srv", 5), link("/srv/link", "one", 5), file("/srv/one", 5)]);
    let (stats, _) = first.run(ScriptedClient::new());
    assert_eq!(stats.same, 3);
    let first_log = fs::read(&first.dirs.unchanged).unwrap();

    // The finished log becomes the next run's previous manifest.
    let second = Workspace::new();
    second.store("0000/0000/0000", b"one");
    fs::create_dir_all(second.dirs.previous.parent().unwrap()).unwrap();
    fs::write(&second.dirs.previous, &first_log).unwrap();
    second.phase1(&[dir("/srv", 5), link("/srv/link", "one", 5), file("/srv/one", 5)]);
    let (stats, client) = second.run(ScriptedClient::new());

    assert_eq!(stats.same, 3);
    assert!(client.requests().is_empty());
    assert!(second.changed().is_empty());
    assert_eq!(fs::read(&second.dirs.unchanged).unwrap(), first_log);
}

#[test]
fn unchanged_attributes_are_re_encoded() {
    let ws = Workspace::new();
    ws.store("0000/0000/0000", b"x");
    let mut stored = stored_file("/f", 9, "0000/0000/0000", b"x");
    stored.stat.uid = 1000;
    StatAttribs.encode(&mut stored).unwrap();
    ws.previous(&[stored]);

    // The client reports a new owner; only ctime and mtime drive the decision.
    let mut current = file("/f", 9);
    current.stat.uid = 0;
    StatAttribs.encode(&mut current).unwrap();
    ws.phase1(&[current.clone()]);

    ws.run(ScriptedClient::new());

    let unchanged = ws.unchanged();
    assert_eq!(unchanged.len(), 1);
    let mut logged = unchanged[0].clone();
    StatAttribs.decode(&mut logged).unwrap();
    assert_eq!(logged.stat.uid, 0);
    assert_eq!(unchanged[0].attr, current.attr);
}

#[test]
fn missing_previous_manifest_makes_everything_new() {
    let ws = Workspace::new();
    ws.phase1(&[
        dir("/home", 1),
        file("/home/a", 1),
        link("/home/l", "a", 1),
        entry(Command::Special, "/home/p", 1, 1),
    ]);

    let (stats, client) = ws.run(ScriptedClient::new());

    assert_eq!(stats.new, 4);
    assert_eq!(stats.deleted, 0);
    assert_eq!(client.requests(), &[Request::New("/home/a".into())]);
    assert_eq!(paths(&ws.unchanged()), ["/home", "/home/l", "/home/p"]);
    assert_eq!(paths(&ws.changed()), ["/home/a"]);
    assert_eq!(datapath(&ws.changed()[0]), "0000/0000/0000");
}

#[test]
fn trailing_previous_entries_are_deleted() {
    let ws = Workspace::new();
    ws.previous(&[dir("/a", 1), dir("/y", 1), dir("/z", 1)]);
    ws.phase1(&[dir("/a", 1)]);

    let (stats, _) = ws.run(ScriptedClient::new());

    assert_eq!(stats.same, 1);
    assert_eq!(stats.deleted, 2);
}

#[test]
fn kind_change_requests_the_whole_file() {
    let ws = Workspace::new();
    ws.previous(&[entry(Command::Special, "/dev/thing", 3, 3)]);
    ws.phase1(&[file("/dev/thing", 3)]);

    let (stats, client) = ws.run(ScriptedClient::new());

    assert_eq!(client.requests(), &[Request::New("/dev/thing".into())]);
    assert_eq!(stats.new, 1);
}

#[test]
fn changed_non_file_is_logged_without_a_request() {
    let ws = Workspace::new();
    ws.previous(&[dir("/var", 3)]);
    ws.phase1(&[dir("/var", 4)]);

    let (stats, client) = ws.run(ScriptedClient::new());

    assert!(client.requests().is_empty());
    assert_eq!(stats.changed, 1);
    assert_eq!(paths(&ws.unchanged()), ["/var"]);
}

// A status-change-only difference on a Windows client is treated as a data
// change and requested as a delta. Metadata kinds are always requested in
// full. Both behaviours are kept exactly as the decision table states them.
#[test]
fn status_change_only_depends_on_kind_and_platform() {
    let build = || {
        let ws = Workspace::new();
        ws.store("0000/0000/0000", b"data");
        ws.store("0000/0000/0001", b"meta");
        ws.previous(&[
            stored_file("/f", 5, "0000/0000/0000", b"data"),
            stored(entry(Command::Metadata, "/m", 5, 5), "0000/0000/0001", b"meta"),
        ]);
        ws.phase1(&[
            entry(Command::File, "/f", 5, 6),
            entry(Command::Metadata, "/m", 5, 6),
        ]);
        ws
    };

    let posix = build();
    let (stats, client) = posix.run(ScriptedClient::new());
    assert_eq!(client.requests(), &[Request::New("/m".into())]);
    assert_eq!(stats.same, 1);
    assert_eq!(paths(&posix.unchanged()), ["/f"]);

    let windows = build();
    let config = Phase2Config {
        client_is_windows: true,
        ..Phase2Config::default()
    };
    let (stats, client) = windows.run_with(ScriptedClient::new(), config);
    assert_eq!(
        client.requests(),
        &[
            Request::Delta {
                path: "/f".into(),
                datapath: "0000/0000/0000".into()
            },
            Request::New("/m".into()),
        ]
    );
    assert_eq!(stats.changed, 1);
    assert_eq!(stats.new, 1);
}

#[test]
fn delta_disabled_requests_changed_files_in_full() {
    let ws = Workspace::new();
    ws.store("0000/0000/0000", b"old");
    ws.previous(&[stored_file("/f", 1, "0000/0000/0000", b"old")]);
    ws.phase1(&[file("/f", 2)]);

    let config = Phase2Config {
        delta_enabled: false,
        ..Phase2Config::default()
    };
    let (stats, client) = ws.run_with(ScriptedClient::new(), config);

    assert_eq!(client.requests(), &[Request::New("/f".into())]);
    assert_eq!(stats.new, 1);
    assert_eq!(datapath(&ws.changed()[0]), "0000/0000/0001");
}

#[test]
fn compression_switch_requests_the_whole_file() {
    let ws = Workspace::new();
    ws.store("0000/0000/0000.gz", b"not really gzip");
    let mut old = stored_file("/z", 1, "0000/0000/0000.gz", b"zzz");
    old.compression = 9;
    StatAttribs.encode(&mut old).unwrap();
    ws.previous(&[old]);
    ws.phase1(&[file("/z", 2)]);

    let (stats, client) = ws.run(ScriptedClient::new());

    assert_eq!(client.requests(), &[Request::New("/z".into())]);
    assert_eq!(stats.new, 1);
}

#[test]
fn encrypted_files_are_never_deltas() {
    let ws = Workspace::new();
    ws.store("0000/0000/0000", b"cipher");
    ws.previous(&[stored(
        entry(Command::EncFile, "/secret", 1, 1),
        "0000/0000/0000",
        b"cipher",
    )]);
    ws.phase1(&[entry(Command::EncFile, "/secret", 2, 2)]);

    let (_, client) = ws.run(ScriptedClient::new());

    assert_eq!(client.requests(), &[Request::New("/secret".into())]);
}
