//! CLI command implementations.

pub mod run;
pub mod set;
pub mod simulate;
pub mod status;

use std::path::Path;

use tandem_sync_client::{FileStore, LoopbackLink, Synchronizer};
use tandem_sync_types::Role;

/// Synchronizer over the settings file, with no counterpart attached.
///
/// Its link never reports activation, so local changes stay pending.
pub(crate) fn offline_synchronizer(
    role: Role,
    data_dir: &Path,
) -> Synchronizer<FileStore, LoopbackLink> {
    let ((primary, _), (companion, _)) = LoopbackLink::pair();
    let link = match role {
        Role::Primary => primary,
        Role::Companion => companion,
    };
    Synchronizer::new(role, FileStore::in_dir(data_dir), link)
}
