//! Appointment state machine.
//!
//! Every status change, the admin override included, goes through one
//! transition table. Actions carry their own role gates; cancellation is
//! the only action with an object-level grant (the owning client).

use crate::error::VetdeskError;
use crate::principal::{Principal, Role};
use crate::types::{Appointment, AppointmentStatus};

/// Legal edges: the forward chain plus the two alternate terminals,
/// reachable from any non-terminal state. Terminal states have no
/// outgoing edges.
pub fn transition_allowed(from: AppointmentStatus, to: AppointmentStatus) -> bool {
    use AppointmentStatus::*;
    match (from, to) {
        (Scheduled, Confirmed) => true,
        (Confirmed, InProgress) => true,
        (InProgress, Completed) => true,
        (from, Cancelled | NoShow) => !from.is_terminal(),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Confirm,
    Begin,
    Complete,
    Cancel,
    MarkNoShow,
    /// Admin override to an explicit status. Validated against the same
    /// table as every other action; there is no unvalidated setter.
    Set(AppointmentStatus),
}

impl TransitionAction {
    pub fn target(&self) -> AppointmentStatus {
        match self {
            Self::Confirm => AppointmentStatus::Confirmed,
            Self::Begin => AppointmentStatus::InProgress,
            Self::Complete => AppointmentStatus::Completed,
            Self::Cancel => AppointmentStatus::Cancelled,
            Self::MarkNoShow => AppointmentStatus::NoShow,
            Self::Set(status) => *status,
        }
    }

    /// Dotted-audit and log name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Confirm => "confirm",
            Self::Begin => "begin",
            Self::Complete => "complete",
            Self::Cancel => "cancel",
            Self::MarkNoShow => "mark_no_show",
            Self::Set(_) => "set_status",
        }
    }

    /// Role gate. Visibility is checked by the caller before this runs;
    /// a failing gate on a visible row is Forbidden, not NotFound.
    pub fn permitted(&self, principal: &Principal, appt: &Appointment) -> bool {
        match self {
            Self::Confirm | Self::MarkNoShow => principal.roles.is_staff(),
            Self::Begin | Self::Complete => {
                principal.is_admin() || principal.has_role(Role::Veterinarian)
            }
            Self::Cancel => {
                principal.is_admin()
                    || principal.has_role(Role::Receptionist)
                    || (principal.has_role(Role::Client) && principal.is_self(&appt.client_id))
            }
            Self::Set(_) => principal.is_admin(),
        }
    }
}

/// Gate and validate one transition. Returns the new status for the
/// caller to persist.
pub fn apply(
    principal: &Principal,
    appt: &Appointment,
    action: TransitionAction,
) -> Result<AppointmentStatus, VetdeskError> {
    if !action.permitted(principal, appt) {
        return Err(VetdeskError::Forbidden(format!(
            "{} may not {} appointment {}",
            principal.user_id,
            action.name(),
            appt.id
        )));
    }
    let from = appt.status;
    let to = action.target();
    if !transition_allowed(from, to) {
        return Err(VetdeskError::InvalidTransition {
            from: from.as_str().into(),
            to: to.as_str().into(),
        });
    }
    Ok(to)
}
