use openraft::BasicNode;

/// The response handed back through `openraft`'s client-write channel: `Ok`
/// if the replicated FSM accepted the entry, `Err` with the executor's
/// rendered error message otherwise. A non-nil response on the leader
/// surfaces to the caller that invoked `apply`.
pub type FsmResponse = Result<(), String>;

openraft::declare_raft_types!(
    /// The `openraft` type configuration this whole cluster shares. `D` is
    /// the raw SQL statement text, replicated verbatim as the log entry
    /// payload.
    pub TypeConfig:
        D = Vec<u8>,
        R = FsmResponse,
        NodeId = u64,
        Node = BasicNode,
        Entry = openraft::Entry<TypeConfig>,
        SnapshotData = std::io::Cursor<Vec<u8>>,
        AsyncRuntime = openraft::TokioRuntime,
);
