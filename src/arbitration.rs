//! Accepting one application for a booking and rejecting its siblings.
//!
//! `settle` only computes the new state. Stores call it while holding the
//! booking exclusively and persist every returned record in one unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Application, Booking, Notification};
use crate::error::{invalid_state_error, not_found_error, Error};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Settlement {
    pub booking: Booking,
    pub accepted: Application,
    pub rejected: Vec<Application>,
    pub notification: Notification,
}

/// Settles `booking` in favour of `application_id`.
///
/// `applications` must be every application stored for the booking. On
/// error nothing has been modified.
#[tracing::instrument(skip(booking, applications, now), fields(booking_id = %booking.id))]
pub fn settle(
    mut booking: Booking,
    applications: Vec<Application>,
    application_id: &str,
    now: DateTime<Utc>,
) -> Result<Settlement, Error> {
    if !booking.is_pending() {
        tracing::info!(status = booking.status.name(), "booking is not pending");
        return Err(invalid_state_error());
    }

    let (mut targets, siblings): (Vec<_>, Vec<_>) = applications
        .into_iter()
        .filter(|application| application.booking_id == booking.id)
        .partition(|application| application.id == application_id);

    let mut accepted = targets.pop().ok_or_else(not_found_error)?;

    accepted.accept(now)?;
    booking.accept(accepted.vendor_id.clone(), now)?;

    let rejected = siblings
        .into_iter()
        .filter(Application::is_pending)
        .map(|mut application| {
            application.reject(now)?;
            Ok(application)
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let notification =
        Notification::application_accepted(accepted.vendor_id.clone(), booking.id.clone(), now);

    tracing::info!(
        application_id,
        vendor_id = %accepted.vendor_id,
        rejected = rejected.len(),
        "booking settled"
    );

    Ok(Settlement {
        booking,
        accepted,
        rejected,
        notification,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{sample_quote, sample_request, ApplicationStatus, BookingStatus};

    fn fixture() -> (Booking, Application, Application) {
        let now = Utc::now();
        let booking = Booking::new("rider".into(), sample_request(), now).unwrap();
        let a1 = Application::new(&booking, "v1".into(), sample_quote(1500.0), now).unwrap();
        let a2 = Application::new(&booking, "v2".into(), sample_quote(1800.0), now).unwrap();

        (booking, a1, a2)
    }

    #[test]
    fn accepts_target_and_rejects_siblings() {
        let (booking, a1, a2) = fixture();

        let settlement = settle(booking, vec![a1.clone(), a2.clone()], &a1.id, Utc::now()).unwrap();

        assert_eq!(settlement.accepted.id, a1.id);
        assert_eq!(settlement.accepted.status, ApplicationStatus::Accepted);
        assert_eq!(settlement.rejected.len(), 1);
        assert_eq!(settlement.rejected[0].id, a2.id);
        assert_eq!(settlement.rejected[0].status, ApplicationStatus::Rejected);
        assert_eq!(settlement.booking.status, BookingStatus::Accepted);
        assert_eq!(settlement.booking.vendor_id.as_deref(), Some("v1"));
        assert_eq!(settlement.notification.recipient_id, "v1");
        assert_eq!(settlement.notification.kind, "application_accepted");
        assert_eq!(settlement.notification.booking_id, settlement.booking.id);
    }

    #[test]
    fn already_rejected_siblings_are_left_alone() {
        let (booking, a1, mut a2) = fixture();
        a2.reject(Utc::now()).unwrap();

        let settlement = settle(booking, vec![a1.clone(), a2], &a1.id, Utc::now()).unwrap();

        assert!(settlement.rejected.is_empty());
    }

    #[test]
    fn missing_target_is_not_found() {
        let (booking, a1, _) = fixture();

        let err = settle(booking, vec![a1], "nope", Utc::now()).unwrap_err();
        assert!(err.is_not_found_error());
    }

    #[test]
    fn non_pending_booking_is_invalid_state() {
        let (mut booking, a1, a2) = fixture();
        booking.cancel(Utc::now()).unwrap();

        let err = settle(booking, vec![a1.clone(), a2], &a1.id, Utc::now()).unwrap_err();
        assert!(err.is_invalid_state_error());
    }

    #[test]
    fn rejected_target_is_invalid_state() {
        let (booking, a1, mut a2) = fixture();
        a2.reject(Utc::now()).unwrap();

        let err = settle(booking, vec![a1, a2.clone()], &a2.id, Utc::now()).unwrap_err();
        assert!(err.is_invalid_state_error());
    }
}
