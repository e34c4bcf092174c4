//! TCP listener and the per-connection dispatch loop.
//!
//! One task per connection. The read loop multiplexes three things: socket
//! reads, pub/sub pushes through the connection's outbound channel, and the
//! registry's cancellation signal, which fires when the session's user is
//! deleted and closes the connection at its next blocking wait.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error as ThisError;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::acl::Acl;
use crate::commands::{CommandError, CommandTable, HandlerContext};
use crate::config::ServerConfig;
use crate::pubsub::PubSub;
use crate::store::Store;
use crate::wire;

/// Errors from the listener itself.
#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("could not bind {address}: {reason}")]
    Bind {
        /// The requested address
        address: String,
        /// The underlying failure
        reason: String,
    },
}

impl From<ServerError> for crate::Error {
    fn from(err: ServerError) -> Self {
        crate::Error::Server(err)
    }
}

/// The assembled server: listener, registry, store, bus, and command table.
pub struct Server {
    acl: Arc<Acl>,
    store: Arc<Store>,
    pubsub: Arc<PubSub>,
    table: Arc<CommandTable>,
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Build the registry from `config` and bind the TCP listener.
    ///
    /// A malformed user file surfaces here and the caller treats it as
    /// fatal. Port 0 is supported; `local_addr` reports what was actually
    /// bound.
    pub async fn bind(config: ServerConfig) -> crate::Result<Self> {
        let address = format!("{}:{}", config.host, config.port);
        let acl = Acl::new(config)?;

        let listener = TcpListener::bind(&address)
            .await
            .map_err(|e| ServerError::Bind {
                address: address.clone(),
                reason: e.to_string(),
            })?;
        let local_addr = listener.local_addr()?;
        tracing::info!("listening on {local_addr}");

        Ok(Self {
            acl: Arc::new(acl),
            store: Arc::new(Store::new()),
            pubsub: Arc::new(PubSub::new()),
            table: Arc::new(CommandTable::standard()),
            listener,
            local_addr,
        })
    }

    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The access-control registry, shared with every connection task.
    pub fn acl(&self) -> &Arc<Acl> {
        &self.acl
    }

    /// Accept connections until the enclosing task is cancelled.
    pub async fn run(self) -> crate::Result<()> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::debug!("accepted connection from {peer}");
                    let acl = Arc::clone(&self.acl);
                    let store = Arc::clone(&self.store);
                    let pubsub = Arc::clone(&self.pubsub);
                    let table = Arc::clone(&self.table);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, acl, store, pubsub, table).await {
                            tracing::warn!("connection error: {e}");
                        }
                    });
                }
                Err(e) => {
                    tracing::warn!("could not establish connection: {e}");
                }
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    acl: Arc<Acl>,
    store: Arc<Store>,
    pubsub: Arc<PubSub>,
    table: Arc<CommandTable>,
) -> crate::Result<()> {
    let (conn, mut cancel) = acl.register_connection();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Vec<u8>>();

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);

    let result: crate::Result<()> = loop {
        tokio::select! {
            _ = &mut cancel => {
                tracing::info!("{conn} invalidated by the registry, closing");
                break Ok(());
            }
            Some(pushed) = push_rx.recv() => {
                if let Err(e) = write_half.write_all(&pushed).await {
                    break Err(e.into());
                }
            }
            message = wire::read_message(&mut reader) => {
                match message {
                    Ok(None) => break Ok(()),
                    Ok(Some(lines)) => {
                        let ctx = HandlerContext {
                            acl: &acl,
                            store: &store,
                            pubsub: &pubsub,
                            table: &table,
                            push: &push_tx,
                            conn,
                        };
                        let reply = dispatch(&ctx, &lines);
                        if let Err(e) = write_half.write_all(&reply).await {
                            break Err(e.into());
                        }
                    }
                    Err(e) => {
                        tracing::debug!("{conn} read failed: {e}");
                        break Ok(());
                    }
                }
            }
        }
    };

    pubsub.drop_connection(conn);
    acl.unregister_connection(conn);
    result
}

/// Decode, authorize, and execute one message, turning every failure into an
/// error reply. Nothing in here terminates the process at request time.
pub fn dispatch(ctx: &HandlerContext<'_>, lines: &[String]) -> Vec<u8> {
    match run_command(ctx, lines) {
        Ok(reply) => reply,
        Err(err) => wire::error(err),
    }
}

fn run_command(ctx: &HandlerContext<'_>, lines: &[String]) -> crate::Result<Vec<u8>> {
    let args = wire::decode(lines)?;

    let spec = ctx
        .table
        .lookup(&args[0])
        .ok_or_else(|| CommandError::UnknownCommand {
            command: args[0].to_ascii_lowercase(),
        })?;
    let sub = args.get(1).and_then(|token| spec.subcommand(token));

    ctx.acl.authorize(ctx.conn, &args, spec, sub)?;
    (spec.handler)(ctx, &args)
}
