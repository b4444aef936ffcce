use super::SchedulingError;
use crate::models::AppointmentStatus;

impl AppointmentStatus {
    /// Statuses reachable in one step. SCHEDULED is the only non-terminal state.
    pub fn allowed_next(self) -> &'static [AppointmentStatus] {
        use AppointmentStatus::*;
        match self {
            Scheduled => &[Completed, Cancelled, NoShow],
            Completed | Cancelled | NoShow => &[],
        }
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }

    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        self.allowed_next().contains(&next)
    }
}

/// Fails with `InvalidTransition` unless `from -> to` is in the table.
pub fn check_transition(
    booking_id: i64,
    from: AppointmentStatus,
    to: AppointmentStatus,
) -> Result<(), SchedulingError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(SchedulingError::InvalidTransition { booking_id, from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn scheduled_reaches_every_terminal_state() {
        for to in [Completed, Cancelled, NoShow] {
            assert!(Scheduled.can_transition_to(to), "scheduled -> {to}");
        }
        assert!(!Scheduled.is_terminal());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [Completed, Cancelled, NoShow] {
            assert!(from.is_terminal());
            for to in AppointmentStatus::ALL {
                assert!(!from.can_transition_to(*to), "{from} -> {to} must be rejected");
            }
        }
    }

    #[test]
    fn nothing_returns_to_scheduled() {
        for from in AppointmentStatus::ALL {
            assert!(!from.can_transition_to(Scheduled));
        }
    }

    #[test]
    fn check_transition_reports_both_ends() {
        let err = check_transition(7, Cancelled, Completed).unwrap_err();
        match err {
            SchedulingError::InvalidTransition { booking_id, from, to } => {
                assert_eq!(booking_id, 7);
                assert_eq!(from, Cancelled);
                assert_eq!(to, Completed);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
