use crate::error::EngineError;
use crate::models::VehicleStatus;

/// Vehicle occupancy moves IN -> OUT -> DONE. No transition skips a state
/// and none moves backward. IN -> OUT is driven by the sweep once the
/// vehicle's in-time has passed; OUT -> DONE only by settlement.
pub fn ensure_transition(from: VehicleStatus, to: VehicleStatus) -> Result<(), EngineError> {
    let legal = matches!(
        (from, to),
        (VehicleStatus::In, VehicleStatus::Out) | (VehicleStatus::Out, VehicleStatus::Done)
    );

    if legal {
        Ok(())
    } else {
        Err(EngineError::InvalidStateTransition { from, to })
    }
}

/// Whether a status still counts against the lot's booked-slot counter.
/// Only settlement releases the slot; the sweep leaves occupancy untouched.
pub fn holds_slot(status: VehicleStatus) -> bool {
    !matches!(status, VehicleStatus::Done)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions_are_legal() {
        ensure_transition(VehicleStatus::In, VehicleStatus::Out).unwrap();
        ensure_transition(VehicleStatus::Out, VehicleStatus::Done).unwrap();
    }

    #[test]
    fn test_skipping_and_backward_transitions_are_rejected() {
        let illegal = [
            (VehicleStatus::In, VehicleStatus::Done),
            (VehicleStatus::In, VehicleStatus::In),
            (VehicleStatus::Out, VehicleStatus::In),
            (VehicleStatus::Out, VehicleStatus::Out),
            (VehicleStatus::Done, VehicleStatus::In),
            (VehicleStatus::Done, VehicleStatus::Out),
            (VehicleStatus::Done, VehicleStatus::Done),
        ];

        for (from, to) in illegal {
            let err = ensure_transition(from, to).unwrap_err();
            match err {
                EngineError::InvalidStateTransition { from: f, to: t } => {
                    assert_eq!(f, from);
                    assert_eq!(t, to);
                }
                other => panic!("expected InvalidStateTransition, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_only_done_releases_the_slot() {
        assert!(holds_slot(VehicleStatus::In));
        assert!(holds_slot(VehicleStatus::Out));
        assert!(!holds_slot(VehicleStatus::Done));
    }
}
