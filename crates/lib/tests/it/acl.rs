//! Registry lifecycle, persistence overlay, and dispatch-level checks.

use emberstore::acl::{ConnId, DEFAULT_USERNAME, LoadMode};
use emberstore::commands::{CommandTable, HandlerContext};
use emberstore::pubsub::{PubSub, PushSender};
use emberstore::server::dispatch;
use emberstore::store::Store;
use emberstore::{Acl, ServerConfig};

use crate::helpers::*;

// ==========================
// STARTUP OVERLAY
// ==========================

#[test]
fn test_startup_prepends_default_when_file_lacks_it() {
    let alice = user_from_rules("alice", &[">pw", "+@read"]);
    let (acl, _dir, _path) = acl_with_user_file(&[alice]);

    assert_eq!(acl.usernames(), vec!["default", "alice"]);
}

#[test]
fn test_startup_file_overrides_builtin_default() {
    // Raw JSON pins the persisted field-name contract.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    std::fs::write(
        &path,
        r#"[{"Username": "default", "Enabled": true, "NoPassword": true}]"#,
    )
    .unwrap();

    let config = ServerConfig {
        acl_file: Some(path),
        ..open_config()
    };
    let acl = Acl::new(config).unwrap();

    let default = acl.lookup_user(DEFAULT_USERNAME).unwrap();
    assert!(default.no_password);

    // No-password default means fresh sessions come up authenticated.
    let (conn, _cancel) = acl.register_connection();
    assert!(acl.session_info(conn).unwrap().0);
}

#[test]
fn test_startup_malformed_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    std::fs::write(&path, "{ definitely not a user array").unwrap();

    let config = ServerConfig {
        acl_file: Some(path),
        ..open_config()
    };
    let err = Acl::new(config).unwrap_err();
    assert!(err.is_persistence_error());
}

// ==========================
// ON-DEMAND LOAD / SAVE
// ==========================

/// Registry whose configured user file does not exist yet, so startup skips
/// it and the test controls what LOAD will read.
fn acl_with_pending_file() -> (Acl, tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("users.json");
    let config = ServerConfig {
        acl_file: Some(path.clone()),
        ..open_config()
    };
    (Acl::new(config).unwrap(), dir, path)
}

#[test]
fn test_load_merge_unions_and_retains_existing_entries() {
    let (acl, _dir, path) = acl_with_pending_file();
    acl.set_user(&tokens(&["alice", "+@read", "+get", "%RW~a"]))
        .unwrap();

    let disk_alice = user_from_rules("alice", &["off", "+@write", "%RW~b"]);
    emberstore::acl::save_users(&path, &[disk_alice]).unwrap();

    acl.load(LoadMode::Merge).unwrap();

    let alice = acl.lookup_user("alice").unwrap();
    assert!(!alice.enabled);
    assert_eq!(alice.included_categories, vec!["read", "write"]);
    // Pre-existing entries not present in the loaded file are retained.
    assert_eq!(alice.included_commands, vec!["get"]);
    assert_eq!(alice.included_keys, vec!["a", "b"]);
}

#[test]
fn test_load_replace_takes_exactly_the_file_lists() {
    let (acl, _dir, path) = acl_with_pending_file();
    acl.set_user(&tokens(&["alice", "+@read", "+get", "%RW~a"]))
        .unwrap();

    let disk_alice = user_from_rules("alice", &["off", "+@write", "%RW~b"]);
    emberstore::acl::save_users(&path, &[disk_alice.clone()]).unwrap();

    acl.load(LoadMode::Replace).unwrap();

    let alice = acl.lookup_user("alice").unwrap();
    assert_eq!(alice, disk_alice);
}

#[test]
fn test_load_appends_unknown_users() {
    let (acl, _dir, path) = acl_with_pending_file();

    let bob = user_from_rules("bob", &["nopass"]);
    emberstore::acl::save_users(&path, &[bob]).unwrap();

    acl.load(LoadMode::Merge).unwrap();
    assert_eq!(acl.usernames(), vec!["default", "bob"]);
}

#[test]
fn test_save_then_load_replace_is_field_equal() {
    let (acl, _dir, _path) = acl_with_pending_file();
    acl.set_user(&tokens(&["alice", ">pw", "+@read", "%RW~a", "+&events"]))
        .unwrap();
    acl.set_user(&tokens(&["bob", "nopass", "+@*", "+*"])).unwrap();

    acl.save().unwrap();
    let mut before = acl.users_snapshot();

    acl.set_user(&tokens(&["alice", "+@write"])).unwrap();
    acl.delete_users(&["bob".to_string()]);

    acl.load(LoadMode::Replace).unwrap();
    let mut after = acl.users_snapshot();

    // Field-equal as a set: ordering is not part of the contract.
    before.sort_by(|a, b| a.username.cmp(&b.username));
    after.sort_by(|a, b| a.username.cmp(&b.username));
    assert_eq!(before, after);
}

// ==========================
// FULL DISPATCH PIPELINE
// ==========================

struct Pipeline {
    acl: Acl,
    store: Store,
    pubsub: PubSub,
    table: CommandTable,
    push: PushSender,
    conn: ConnId,
    _push_rx: tokio::sync::mpsc::UnboundedReceiver<Vec<u8>>,
    _cancel: tokio::sync::oneshot::Receiver<()>,
}

impl Pipeline {
    fn new(config: ServerConfig) -> Self {
        let acl = Acl::new(config).unwrap();
        let (push, push_rx) = tokio::sync::mpsc::unbounded_channel();
        let (conn, cancel) = acl.register_connection();
        Self {
            acl,
            store: Store::new(),
            pubsub: PubSub::new(),
            table: CommandTable::standard(),
            push,
            conn,
            _push_rx: push_rx,
            _cancel: cancel,
        }
    }

    fn send(&self, inline: &str) -> String {
        let ctx = HandlerContext {
            acl: &self.acl,
            store: &self.store,
            pubsub: &self.pubsub,
            table: &self.table,
            push: &self.push,
            conn: self.conn,
        };
        let reply = dispatch(&ctx, &[inline.to_string()]);
        String::from_utf8(reply).unwrap()
    }
}

#[test]
fn test_dispatch_denies_before_the_handler_runs() {
    let pipeline = Pipeline::new(open_config());

    // The default user includes nothing, so the category gate fires and the
    // store is never touched.
    let reply = pipeline.send("set k v");
    assert!(reply.starts_with("-Error not authorized"));
    assert!(pipeline.store.get("k").is_none());

    pipeline
        .acl
        .set_user(&tokens(&["default", "+@*", "+*", "%RW~*", "%W~*"]))
        .unwrap();
    assert_eq!(pipeline.send("set k v"), "+OK\r\n\n");
    assert!(pipeline.store.get("k").is_some());
}

#[test]
fn test_dispatch_unknown_command() {
    let pipeline = Pipeline::new(open_config());
    let reply = pipeline.send("flushall");
    assert_eq!(reply, "-Error unknown command flushall\r\n\n");
}

#[test]
fn test_dispatch_auth_is_reachable_then_gates_lift() {
    let pipeline = Pipeline::new(password_config("secret"));
    pipeline
        .acl
        .set_user(&tokens(&["default", "+@*", "+*", "%RW~*"]))
        .unwrap();

    // Everything but AUTH is gated while unauthenticated.
    let reply = pipeline.send("ping");
    assert_eq!(reply, "-Error user must be authenticated\r\n\n");

    assert_eq!(pipeline.send("auth wrong"), "-Error could not authenticate user\r\n\n");
    assert_eq!(pipeline.send("auth secret"), "+OK\r\n\n");
    assert_eq!(pipeline.send("ping"), "+PONG\r\n\n");
}

#[test]
fn test_dispatch_whoami_tracks_rebinding() {
    let pipeline = Pipeline::new(open_config());
    pipeline
        .acl
        .set_user(&tokens(&["default", "+@*", "+*", "%RW~*"]))
        .unwrap();
    pipeline
        .acl
        .set_user(&tokens(&["alice", ">pw", "+@*", "+*", "%RW~*"]))
        .unwrap();

    assert_eq!(pipeline.send("acl whoami"), "+default\r\n\n");
    assert_eq!(pipeline.send("auth alice pw"), "+OK\r\n\n");
    assert_eq!(pipeline.send("acl whoami"), "+alice\r\n\n");
}
