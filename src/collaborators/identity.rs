//! Identity/session provider contract.

use crate::job::domain::StaffId;
use std::sync::{Arc, RwLock};

/// Supplies the staff member of the authenticated session.
///
/// `None` means no operation is permitted.
pub trait IdentityProvider: Send + Sync {
    /// Returns the signed-in staff identifier, if any.
    fn current_staff_id(&self) -> Option<StaffId>;
}

/// Identity provider holding a single, switchable staff session.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityProvider {
    staff_id: Arc<RwLock<Option<StaffId>>>,
}

impl StaticIdentityProvider {
    /// Creates a provider already signed in as `staff_id`.
    #[must_use]
    pub fn signed_in(staff_id: StaffId) -> Self {
        Self {
            staff_id: Arc::new(RwLock::new(Some(staff_id))),
        }
    }

    /// Replaces the current session.
    pub fn set(&self, staff_id: Option<StaffId>) {
        if let Ok(mut current) = self.staff_id.write() {
            *current = staff_id;
        }
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn current_staff_id(&self) -> Option<StaffId> {
        self.staff_id.read().ok().and_then(|current| current.clone())
    }
}
