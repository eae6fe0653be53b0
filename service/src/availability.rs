//! Availability of the venue calendar.

use common::DateTime;
use derive_more::{Display, Error};

use crate::{
    domain::reservation::{
        self, EffectiveEndDateTime, EndDateTime, StartDateTime, Window,
    },
    read::reservation::Occupied,
};

/// Violation of the temporal rules of a reservation.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum Violation {
    /// Start is in the past.
    #[display("reservation cannot start in the past")]
    StartInPast,

    /// Scheduled end precedes the start.
    #[display("reservation cannot end before it starts")]
    EndBeforeStart,

    /// Actual end precedes the start.
    #[display("reservation cannot effectively end before it starts")]
    EffectiveEndBeforeStart,
}

/// Checks the temporal rules of a reservation.
///
/// The start is checked against `now` only if it's provided.
///
/// # Errors
///
/// With the first [`Violation`] found.
pub fn validate(
    starts_at: StartDateTime,
    ends_at: EndDateTime,
    effectively_ends_at: Option<EffectiveEndDateTime>,
    now: Option<DateTime>,
) -> Result<(), Violation> {
    let starts_at = starts_at.coerce::<()>();
    if now.is_some_and(|now| starts_at < now) {
        return Err(Violation::StartInPast);
    }
    if ends_at.coerce::<()>() < starts_at {
        return Err(Violation::EndBeforeStart);
    }
    if effectively_ends_at.is_some_and(|e| e.coerce::<()>() < starts_at) {
        return Err(Violation::EffectiveEndBeforeStart);
    }
    Ok(())
}

/// Finds a reservation among the `occupied` ones whose [`Window`] overlaps
/// the provided one.
///
/// The `excluded` reservation (the one being rescheduled) never conflicts
/// with itself.
#[must_use]
pub fn find_conflict<'a>(
    window: &Window,
    occupied: impl IntoIterator<Item = &'a Occupied>,
    excluded: Option<reservation::Id>,
) -> Option<reservation::Id> {
    occupied
        .into_iter()
        .filter(|o| Some(o.id) != excluded)
        .find(|o| o.window.overlaps(window))
        .map(|o| o.id)
}

#[cfg(test)]
mod spec {
    use common::DateTime;

    use super::{find_conflict, validate, Violation};
    use crate::{
        domain::reservation::{self, Window},
        read::reservation::Occupied,
    };

    fn at(s: &str) -> DateTime {
        DateTime::parse(s).unwrap()
    }

    fn occupied(id: i64, start: &str, end: &str) -> Occupied {
        Occupied {
            id: reservation::Id::from(id),
            window: Window::buffered(at(start).coerce(), at(end).coerce(), None),
        }
    }

    #[test]
    fn detects_overlapping_slot() {
        let booked = [occupied(1, "2025-06-01, 06:00 PM", "2025-06-01, 11:00 PM")];

        let candidate = Window::buffered(
            at("2025-06-01, 08:00 PM").coerce(),
            at("2025-06-01, 10:00 PM").coerce(),
            None,
        );
        assert_eq!(
            find_conflict(&candidate, &booked, None),
            Some(reservation::Id::from(1)),
        );
    }

    #[test]
    fn respects_buffer() {
        let booked = [occupied(1, "2025-06-01, 06:00 PM", "2025-06-01, 11:00 PM")];

        // Starts 3 hours after the end: buffers overlap.
        let near = Window::buffered(
            at("2025-06-02, 02:00 AM").coerce(),
            at("2025-06-02, 04:00 AM").coerce(),
            None,
        );
        assert!(find_conflict(&near, &booked, None).is_some());

        // Starts 4 hours after the end: buffers just touch.
        let far = Window::buffered(
            at("2025-06-02, 03:00 AM").coerce(),
            at("2025-06-02, 05:00 AM").coerce(),
            None,
        );
        assert!(find_conflict(&far, &booked, None).is_none());
    }

    #[test]
    fn uses_actual_end() {
        let booked = [Occupied {
            id: reservation::Id::from(1),
            window: Window::buffered(
                at("2025-06-01, 06:00 PM").coerce(),
                at("2025-06-01, 11:00 PM").coerce(),
                Some(at("2025-06-02, 01:00 AM").coerce()),
            ),
        }];

        let candidate = Window::buffered(
            at("2025-06-02, 04:00 AM").coerce(),
            at("2025-06-02, 06:00 AM").coerce(),
            None,
        );
        assert!(find_conflict(&candidate, &booked, None).is_some());
    }

    #[test]
    fn excludes_itself() {
        let booked = [
            occupied(1, "2025-06-01, 06:00 PM", "2025-06-01, 11:00 PM"),
            occupied(2, "2025-06-03, 06:00 PM", "2025-06-03, 11:00 PM"),
        ];

        let moved = Window::buffered(
            at("2025-06-01, 07:00 PM").coerce(),
            at("2025-06-01, 11:30 PM").coerce(),
            None,
        );
        assert!(
            find_conflict(&moved, &booked, Some(reservation::Id::from(1)))
                .is_none(),
        );
        assert_eq!(
            find_conflict(&moved, &booked, Some(reservation::Id::from(2))),
            Some(reservation::Id::from(1)),
        );
    }

    #[test]
    fn validates_temporal_rules() {
        let now = at("2025-05-01, 10:00 AM");
        let start = at("2025-06-01, 06:00 PM").coerce();
        let end = at("2025-06-01, 11:00 PM").coerce();

        assert_eq!(validate(start, end, None, Some(now)), Ok(()));
        assert_eq!(
            validate(start, end, Some(at("2025-06-02, 01:00 AM").coerce()), Some(now)),
            Ok(()),
        );
        assert_eq!(
            validate(at("2025-04-01, 06:00 PM").coerce(), end, None, Some(now)),
            Err(Violation::StartInPast),
        );
        assert_eq!(
            validate(at("2025-04-01, 06:00 PM").coerce(), end, None, None),
            Ok(()),
        );
        assert_eq!(
            validate(start, at("2025-06-01, 05:00 PM").coerce(), None, Some(now)),
            Err(Violation::EndBeforeStart),
        );
        assert_eq!(
            validate(
                start,
                end,
                Some(at("2025-06-01, 05:00 PM").coerce()),
                Some(now),
            ),
            Err(Violation::EffectiveEndBeforeStart),
        );
    }
}
