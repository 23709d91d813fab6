//! burrowd: a small multi-user world server speaking plain text over TCP.
//!
//! - One thread, one reactor: every client, the listener and the autosave
//!   timer are sources of the same `burrowio::Reactor`.
//! - The world is replayed from a command script at startup and written
//!   back by `describe save`, the autosave timer and on Ctrl-C.

mod config;
mod dispatch;
mod server;
mod session;
mod tell;
mod verbs;

use anyhow::Context;
use burrowio::Reactor;
use burrowio::tcp::tcp_bind;
use tracing::{info, warn};

use crate::server::Server;

const DEFAULT_WELCOME: &str = "Welcome. Type look to look around, dig to make new ways.";

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,burrowd=info".into()),
        )
        .with_target(false)
        .init();

    let cfg = config::parse_args();

    let welcome = match std::fs::read_to_string(&cfg.welcome_path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %cfg.welcome_path.display(), error = %e, "no welcome text; using default");
            DEFAULT_WELCOME.to_string()
        }
    };

    let listener = tcp_bind(&cfg.bind_host, cfg.port)
        .with_context(|| format!("bind {}:{}", cfg.bind_host, cfg.port))?;
    info!(host = %cfg.bind_host, port = cfg.port, "listening");

    let mut reactor = Reactor::new(cfg.tick);
    reactor.add_listener(listener);

    let mut server = Server::new(cfg, welcome);
    server.start_autosave(&mut reactor);
    server.load_world()?;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        let stop = tokio::select! {
            res = reactor.dispatch(&mut server) => {
                res?;
                false
            }
            _ = &mut ctrl_c => true,
        };
        if stop {
            info!("shutting down");
            server.save()?;
            return Ok(());
        }
    }
}
