//! Deterministic conflict resolution for remote pushes.

use super::{CacheEntry, DeviceId, RemoteDocument};

/// Outcome of reconciling a remote push against the cached entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Nothing is cached yet; store the remote copy.
    Insert,
    /// The push echoes this device's own cached revision; mark it confirmed.
    ConfirmLocal,
    /// The remote copy is at least as new; it replaces the cached body and
    /// supersedes any optimistic write.
    AcceptRemote,
    /// The cached write is newer; keep it and let it upload.
    KeepLocal,
}

/// Decides how a remote push affects the cached entry.
///
/// Last writer wins by `written_at`; the remote side wins ties because the
/// remote store orders writes across devices while device clocks drift.
/// Echoes of an older revision from this same device never overwrite a
/// newer local write.
#[must_use]
pub fn resolve(
    local: Option<&CacheEntry>,
    incoming: &RemoteDocument,
    device_id: DeviceId,
) -> Resolution {
    let Some(entry) = local else {
        return Resolution::Insert;
    };
    if let Some(origin) = incoming.origin.filter(|origin| origin.device_id == device_id) {
        if origin.revision == entry.revision {
            return Resolution::ConfirmLocal;
        }
        if origin.revision < entry.revision {
            return Resolution::KeepLocal;
        }
    }
    if incoming.written_at >= entry.written_at {
        Resolution::AcceptRemote
    } else {
        Resolution::KeepLocal
    }
}
