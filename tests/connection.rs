//! Connection manager and event loop against a scripted local server.

use std::time::Duration;

use slirc_bot::dispatch::{Dispatcher, EventKey};
use slirc_bot::handlers::{AutoJoin, CtcpResponder};
use slirc_bot::{Client, Connection, ConnectionSettings, ConnectionState, MessageKind, RotationList, ServerAddress};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

async fn listen() -> (TcpListener, ServerAddress) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, ServerAddress::new("127.0.0.1", port))
}

/// An address nothing listens on.
async fn dead_address() -> ServerAddress {
    let (listener, address) = listen().await;
    drop(listener);
    address
}

fn settings() -> ConnectionSettings {
    ConnectionSettings {
        connect_timeout: Duration::from_secs(2),
        reconnect_delay: Duration::ZERO,
        poll_interval: Duration::from_millis(20),
        ..ConnectionSettings::default()
    }
}

fn connection(servers: Vec<ServerAddress>, settings: ConnectionSettings) -> Connection {
    let nicks = RotationList::new(["bot".to_string(), "bot_".to_string()]).unwrap();
    Connection::new(RotationList::new(servers).unwrap(), nicks, settings)
}

struct Peer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Peer {
    fn new(stream: TcpStream) -> Self {
        let (read, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn recv(&mut self) -> String {
        timeout(Duration::from_secs(5), self.lines.next_line())
            .await
            .expect("client went quiet")
            .unwrap()
            .expect("client hung up")
    }

    async fn send(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\r\n").await.unwrap();
    }
}

#[tokio::test]
async fn test_registration_lines() {
    let (listener, address) = listen().await;
    let mut conn = connection(
        vec![address],
        ConnectionSettings {
            password: Some("secret".into()),
            ..settings()
        },
    );

    let (accepted, connected) = tokio::join!(listener.accept(), conn.connect());
    connected.unwrap();
    let mut peer = Peer::new(accepted.unwrap().0);

    assert_eq!(peer.recv().await, "PASS secret");
    assert_eq!(peer.recv().await, "USER slirc 0 * :slirc-bot");
    assert_eq!(peer.recv().await, "NICK bot");
    assert_eq!(conn.state(), ConnectionState::Connected);
    assert!(conn.connected());
    assert_eq!(conn.generation(), 1);
}

#[tokio::test]
async fn test_failed_server_rotates() {
    let dead = dead_address().await;
    let (listener, live) = listen().await;
    let mut conn = connection(vec![dead.clone(), live.clone()], settings());

    assert!(conn.connect().await.is_err());
    assert_eq!(conn.state(), ConnectionState::Disconnected);
    assert_eq!(conn.servers().current(), &live);

    let (accepted, connected) = tokio::join!(listener.accept(), conn.connect());
    connected.unwrap();
    accepted.unwrap();
    assert_eq!(conn.server(), Some(&live));

    conn.promote_current();
    assert_eq!(conn.servers().iter().next(), Some(&live));
    assert_eq!(conn.servers().cursor(), 0);
}

#[tokio::test]
async fn test_read_polls_and_detects_eof() {
    let (listener, address) = listen().await;
    let mut conn = connection(vec![address], settings());
    let (accepted, connected) = tokio::join!(listener.accept(), conn.connect());
    connected.unwrap();
    let mut peer = Peer::new(accepted.unwrap().0);
    for _ in 0..2 {
        peer.recv().await;
    }

    // nothing sent yet: the poll gives up quickly
    assert_eq!(conn.read().await, None);
    assert!(conn.connected());

    peer.send(":irc.example.net NOTICE * :hello").await;
    let line = timeout(Duration::from_secs(5), async {
        loop {
            if let Some(line) = conn.read().await {
                return line;
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(line, ":irc.example.net NOTICE * :hello");

    drop(peer);
    timeout(Duration::from_secs(5), async {
        while conn.connected() {
            conn.read().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(conn.state(), ConnectionState::Disconnected);

    // writes while disconnected are dropped quietly
    conn.raw_send("PRIVMSG #void :anyone?").await;
    assert!(!conn.connected());
}

#[tokio::test]
async fn test_send_helpers_split_and_frame() {
    let (listener, address) = listen().await;
    let mut conn = connection(vec![address], settings());
    let (accepted, connected) = tokio::join!(listener.accept(), conn.connect());
    connected.unwrap();
    let mut peer = Peer::new(accepted.unwrap().0);
    for _ in 0..2 {
        peer.recv().await;
    }

    conn.send_message("#rust", "one\ntwo", false).await;
    conn.send_message("#rust", "waves", true).await;
    conn.notice("alice", "psst").await;
    conn.part("#rust", Some("bye now")).await;
    conn.raw_send("MODE #rust +n\r\n\r\nTOPIC #rust").await;

    assert_eq!(peer.recv().await, "PRIVMSG #rust :one");
    assert_eq!(peer.recv().await, "PRIVMSG #rust :two");
    assert_eq!(peer.recv().await, "PRIVMSG #rust :\x01ACTION waves\x01");
    assert_eq!(peer.recv().await, "NOTICE alice :psst");
    assert_eq!(peer.recv().await, "PART #rust :bye now");
    assert_eq!(peer.recv().await, "MODE #rust +n");
    assert_eq!(peer.recv().await, "TOPIC #rust");
}

#[tokio::test]
async fn test_ctcp_payload_stays_on_one_line() {
    let (listener, address) = listen().await;
    let mut conn = connection(vec![address], settings());
    let (accepted, connected) = tokio::join!(listener.accept(), conn.connect());
    connected.unwrap();
    let mut peer = Peer::new(accepted.unwrap().0);
    for _ in 0..2 {
        peer.recv().await;
    }

    conn.ctcp_reply("alice", "PING", "x\r\nQUIT :gone").await;
    conn.ctcp("alice", "PING y\nJOIN #elsewhere").await;
    conn.ctcp_reply("alice", "VERSION", &"v".repeat(600)).await;
    conn.raw_send("PING :marker").await;

    assert_eq!(peer.recv().await, "NOTICE alice :\x01PING x\x01");
    assert_eq!(peer.recv().await, "PRIVMSG alice :\x01PING y\x01");
    let version = peer.recv().await;
    assert!(version.starts_with("NOTICE alice :\x01VERSION vvv"));
    assert!(version.ends_with('\x01'));
    // relayed with the longest address assumed before ours is known
    let relayed = format!(":bot!slirc@{} {}\r\n", "x".repeat(63), version);
    assert!(relayed.len() <= 512, "{} bytes", relayed.len());
    assert_eq!(peer.recv().await, "PING :marker");
}

#[tokio::test]
async fn test_client_session() {
    let (listener, address) = listen().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut peer = Peer::new(stream);
        let mut received = Vec::new();

        received.push(peer.recv().await); // USER
        received.push(peer.recv().await); // NICK bot
        peer.send(":irc.example.net 433 * bot :Nickname is already in use").await;
        received.push(peer.recv().await);
        peer.send(":irc.example.net 001 bot_ :Welcome").await;
        received.push(peer.recv().await);
        peer.send(":bot_!slirc@bot.example JOIN #test").await;
        peer.send("PING :abc123").await;
        received.push(peer.recv().await);
        peer.send(":alice!a@alice.example PRIVMSG bot_ :\x01VERSION\x01").await;
        received.push(peer.recv().await);
        received.push(peer.recv().await); // QUIT, then hang up
        received
    });

    let mut dispatcher = Dispatcher::new();
    let ctcp = dispatcher.register(Box::new(CtcpResponder::new("test 1.0")));
    dispatcher.subscribe(ctcp, EventKey::Message(MessageKind::Ctcp));
    let autojoin = dispatcher.register(Box::new(AutoJoin::new(vec!["#test".into()])));
    dispatcher.subscribe(autojoin, EventKey::Connect);

    let mut client = Client::new(connection(vec![address], settings()), dispatcher, vec!["!".into()]);

    timeout(Duration::from_secs(10), async {
        while client.registry().find_user("alice").is_none() {
            client.tick().await;
        }
    })
    .await
    .unwrap();

    assert!(client.registered());
    assert_eq!(client.connection().nickname(), "bot_");
    assert_eq!(client.connection().nicknames().current(), "bot_");
    assert_eq!(client.connection().own_address(), Some("slirc@bot.example"));
    assert!(client.registry().find_channel("#test").is_some());

    client.quit(Some("done")).await;
    timeout(Duration::from_secs(5), async {
        while !server.is_finished() || client.registered() {
            client.tick().await;
        }
    })
    .await
    .unwrap();

    let received = server.await.unwrap();
    assert_eq!(
        received,
        [
            "USER slirc 0 * :slirc-bot",
            "NICK bot",
            "NICK bot_",
            "JOIN #test",
            "PONG :abc123",
            "NOTICE alice :\x01VERSION test 1.0\x01",
            "QUIT :done",
        ]
    );

    // the server hung up: state from that connection is gone
    assert!(!client.connection().connected());
    assert_eq!(client.registry().channels().count(), 0);
}
