//! The node binary: parses CLI arguments, lays out the per-node data
//! directory, brings up the KV store, the replicated FSM, the consensus
//! runtime, and the three listeners (raft peer RPC, admin HTTP, SQL wire),
//! then runs until the process is killed. The Rust shape of `main.go`'s
//! `main()`.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use pgraft_consensus::ConsensusHandle;
use pgraft_fsm::Fsm;
use pgraft_kv::{KvStore, DATA_BUCKET};
use pgraft_paths::NodePaths;

/// `id`, `raft_port`, `pg_port`, `http_port`, `data_dir` mirror the Go
/// prototype's config parameters verbatim. `seed` is an
/// addition: the prototype's cluster bring-up left bootstrap-vs-join to
/// an operator convention this port makes explicit, since `openraft`
/// requires exactly one call to `initialize` per cluster.
#[derive(Parser, Debug)]
#[command(name = "pgraft-node", about = "One node of a replicated pgwire-speaking SQL store")]
struct NodeArgs {
    #[arg(long)]
    id: String,

    #[arg(long)]
    raft_port: u16,

    #[arg(long)]
    pg_port: u16,

    #[arg(long)]
    http_port: u16,

    #[arg(long, default_value = "./data")]
    data_dir: PathBuf,

    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = NodeArgs::parse();
    let node_id: u64 = args
        .id
        .parse()
        .map_err(|_| anyhow::anyhow!("--id must parse as a positive integer (raft node id)"))?;

    let paths = NodePaths::new(args.data_dir.clone(), args.id.clone());
    paths.create_all()?;

    let store = Arc::new(KvStore::open(paths.kv_file())?);
    // Every boot starts from a clean slate, seed or join alike: mirrors
    // `main.go`'s unconditional `pe.delete()`.
    store.reset_bucket(DATA_BUCKET)?;

    let fsm = Fsm::new(store.clone());
    let raft_addr = format!("127.0.0.1:{}", args.raft_port);
    let consensus = Arc::new(ConsensusHandle::start(node_id, raft_addr, paths.raft_dir(), fsm, args.seed).await?);

    let raft_listener = tokio::net::TcpListener::bind(("0.0.0.0", args.raft_port)).await?;
    let raft_router = pgraft_consensus::raft_rpc_router(consensus.raft());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(raft_listener, raft_router).await {
            tracing::error!(error = %e, "raft peer rpc server exited");
        }
    });

    let admin_listener = tokio::net::TcpListener::bind(("0.0.0.0", args.http_port)).await?;
    let admin_router = pgraft_admin::router(consensus.clone());
    tokio::spawn(async move {
        if let Err(e) = axum::serve(admin_listener, admin_router).await {
            tracing::error!(error = %e, "admin http server exited");
        }
    });

    let pg_listener = tokio::net::TcpListener::bind(("0.0.0.0", args.pg_port)).await?;
    tracing::info!(
        id = %args.id,
        raft_port = args.raft_port,
        pg_port = args.pg_port,
        http_port = args.http_port,
        seed = args.seed,
        "pgraft node starting"
    );
    pgraft_wire::serve(pg_listener, store, consensus).await;

    Ok(())
}
