use super::domain::ApplicationStatus;

/// Statuses an application may move to from `from`.
///
/// `rejected` and `disbursed` are terminal. No status may transition to itself.
pub fn allowed_transitions(from: ApplicationStatus) -> &'static [ApplicationStatus] {
    use ApplicationStatus::*;

    match from {
        Submitted => &[UnderReview, Rejected],
        UnderReview => &[Approved, Rejected],
        Approved => &[Disbursed, Rejected],
        Rejected | Disbursed => &[],
    }
}

pub fn can_transition(from: ApplicationStatus, to: ApplicationStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

pub fn is_terminal(status: ApplicationStatus) -> bool {
    allowed_transitions(status).is_empty()
}
