//! End-to-end tests over a real TCP connection.

use std::net::SocketAddr;

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::{Duration, timeout};

use emberstore::acl::User;
use emberstore::{Server, ServerConfig, wire};

use crate::helpers::*;

struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
        }
    }

    /// Send one command in the array form.
    async fn send(&mut self, parts: &[&str]) {
        let mut message = format!("*{}\r\n", parts.len());
        for part in parts {
            message.push_str(&format!("${}\r\n{}\r\n", part.len(), part));
        }
        message.push('\n');
        self.writer.write_all(message.as_bytes()).await.unwrap();
    }

    /// Read one reply; `None` means the server closed the connection.
    async fn reply(&mut self) -> Option<Vec<String>> {
        timeout(Duration::from_secs(5), wire::read_message(&mut self.reader))
            .await
            .expect("timed out waiting for a reply")
            .unwrap()
    }

    async fn expect_line(&mut self, line: &str) {
        assert_eq!(self.reply().await.unwrap(), vec![line.to_string()]);
    }
}

/// Start a server on an ephemeral port with the given user file contents.
async fn start_server(users: &[User]) -> SocketAddr {
    let dir = tempfile::tempdir().unwrap();
    let path = write_user_file(dir.path(), users);
    let config = ServerConfig {
        port: 0,
        acl_file: Some(path),
        ..open_config()
    };

    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr();
    tokio::spawn(async move {
        let _ = server.run().await;
    });
    // The user file may go away once the server has loaded it.
    drop(dir);
    addr
}

fn open_default() -> User {
    user_from_rules(
        "default",
        &["nopass", "+@*", "+*", "%RW~*", "%R~*", "%W~*", "+&*"],
    )
}

fn alice() -> User {
    user_from_rules("alice", &[">pw", "+@*", "+*", "%RW~*", "%R~*"])
}

#[tokio::test]
async fn test_ping_set_get_over_tcp() {
    let addr = start_server(&[open_default()]).await;
    let mut client = Client::connect(addr).await;

    client.send(&["ping"]).await;
    client.expect_line("+PONG").await;

    client.send(&["set", "greeting", "hello"]).await;
    client.expect_line("+OK").await;

    client.send(&["get", "greeting"]).await;
    client.expect_line("+hello").await;

    client.send(&["mget", "greeting", "missing"]).await;
    let lines = client.reply().await.unwrap();
    assert_eq!(lines, vec!["*2", "$5", "hello", "$3", "nil"]);
}

#[tokio::test]
async fn test_list_commands_over_tcp() {
    let addr = start_server(&[open_default()]).await;
    let mut client = Client::connect(addr).await;

    client.send(&["rpush", "todo", "write", "test"]).await;
    client.expect_line("+OK").await;

    client.send(&["llen", "todo"]).await;
    client.expect_line(":2").await;

    client.send(&["lrange", "todo", "0", "-1"]).await;
    let lines = client.reply().await.unwrap();
    assert_eq!(lines, vec!["*2", "$5", "write", "$4", "test"]);

    client.send(&["lpop", "todo"]).await;
    client.expect_line("+write").await;
}

#[tokio::test]
async fn test_denied_command_over_tcp() {
    // A default user with no grants at all: the category gate fires before
    // any handler runs.
    let addr = start_server(&[user_from_rules("default", &["nopass"])]).await;
    let mut client = Client::connect(addr).await;

    client.send(&["get", "k"]).await;
    let lines = client.reply().await.unwrap();
    assert!(lines[0].starts_with("-Error not authorized"));

    // The connection survives a denial.
    client.send(&["auth", "default", "anything"]).await;
    client.expect_line("+OK").await;
}

#[tokio::test]
async fn test_pubsub_delivery_over_tcp() {
    let addr = start_server(&[open_default()]).await;
    let mut subscriber = Client::connect(addr).await;
    let mut publisher = Client::connect(addr).await;

    subscriber.send(&["subscribe", "news"]).await;
    subscriber.expect_line("+OK").await;

    publisher.send(&["publish", "news", "hello"]).await;
    publisher.expect_line(":1").await;

    let pushed = subscriber.reply().await.unwrap();
    assert_eq!(pushed, vec!["*3", "$7", "message", "$4", "news", "$5", "hello"]);
}

#[tokio::test]
async fn test_deluser_closes_live_connections() {
    let addr = start_server(&[open_default(), alice()]).await;

    let mut alice_conn = Client::connect(addr).await;
    alice_conn.send(&["auth", "alice", "pw"]).await;
    alice_conn.expect_line("+OK").await;

    let mut admin = Client::connect(addr).await;
    admin.send(&["acl", "deluser", "alice"]).await;
    admin.expect_line("+OK").await;

    // The registry cancels alice's session without waiting for her next
    // command; her connection's next read observes the close.
    assert!(alice_conn.reply().await.is_none());

    // The admin connection is untouched.
    admin.send(&["ping"]).await;
    admin.expect_line("+PONG").await;
}
