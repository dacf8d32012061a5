use chainfeed_core::IngestError;
use chainfeed_rpc::TransportError;

/// Map a transport failure into the ingest taxonomy.
pub(crate) fn from_transport(e: TransportError) -> IngestError {
    match e {
        TransportError::Timeout { ms } => IngestError::Timeout { ms },
        other => IngestError::Transport(other.to_string()),
    }
}
