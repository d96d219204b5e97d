//! Registry of programs owned by a running recording task

use pmoprogram::ProgramId;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Set of program ids currently owned by a task
///
/// A program is launched only after its id has been claimed here, so two
/// preparation cycles loading the same `Scheduled` row never drive the
/// same program concurrently.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<ProgramId>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn ids(&self) -> MutexGuard<'_, HashSet<ProgramId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `id`, or `None` if another task already owns it
    pub fn claim(&self, id: ProgramId) -> Option<Claim> {
        if !self.ids().insert(id) {
            return None;
        }
        Some(Claim {
            id,
            registry: self.clone(),
        })
    }

    pub fn contains(&self, id: &ProgramId) -> bool {
        self.ids().contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }
}

/// Ownership of one program; released on drop
#[derive(Debug)]
pub struct Claim {
    id: ProgramId,
    registry: InFlight,
}

impl Claim {
    pub fn id(&self) -> ProgramId {
        self.id
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        self.registry.ids().remove(&self.id);
    }
}
