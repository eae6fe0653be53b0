//! Date and time utilities.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, marker::PhantomData, ops, time::Duration};

use derive_more::{Debug, Display, Error};
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{
    format_description::BorrowedFormatItem, macros::format_description,
    PrimitiveDateTime, Time, UtcOffset,
};

pub use time::Weekday;

/// Untyped date and time.
pub type DateTime = DateTimeOf;

/// Wire format of a [`DateTime`]: `yyyy-MM-dd, hh:mm a`.
const WIRE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day], [hour repr:12]:[minute] [period case:upper]"
);

/// Date and time on the venue calendar.
///
/// Venue wall-clock time is stored with the UTC offset, so calendar
/// properties (date, weekday) are read from it directly.
#[derive(Debug)]
pub struct DateTimeOf<Of: ?Sized = ()> {
    /// Inner representation of the date and time.
    inner: time::OffsetDateTime,

    /// Type parameter describing the kind of date and time.
    #[debug(skip)]
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateTimeOf<Of> {
    /// Creates a new [`DateTime`] representing the current date and time.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn now() -> Self {
        let inner = time::OffsetDateTime::now_utc();
        Self {
            _of: PhantomData,
            inner: inner
                .replace_microsecond(inner.microsecond())
                .expect("infallible"),
        }
    }

    /// Parses a [`DateTime`] from its `yyyy-MM-dd, hh:mm a` wire format
    /// (e.g. `2025-06-01, 06:00 PM`).
    ///
    /// # Errors
    ///
    /// Returns an error if the string doesn't match the wire format.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        use ParseError as E;

        PrimitiveDateTime::parse(input.trim(), WIRE_FORMAT)
            .map_err(E::Parse)?
            .assume_utc()
            .try_into()
            .map_err(E::ComponentRange)
    }

    /// Formats this [`DateTime`] into its `yyyy-MM-dd, hh:mm a` wire format.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn format(&self) -> String {
        self.inner.format(WIRE_FORMAT).unwrap_or_else(|e| {
            panic!("cannot format `DateTime` in wire format: {e}")
        })
    }

    /// Returns the [`Weekday`] of this [`DateTime`].
    #[must_use]
    pub fn weekday(&self) -> Weekday {
        self.inner.weekday()
    }

    /// Returns the [`DateTime`] of the next calendar day at the provided
    /// `hour` sharp.
    ///
    /// [`None`] is returned if the result is out of the supported range.
    #[must_use]
    pub fn next_day_at(&self, hour: u8) -> Option<Self> {
        let date = self.inner.date().next_day()?;
        let time = Time::from_hms(hour, 0, 0).ok()?;
        Some(Self {
            inner: PrimitiveDateTime::new(date, time).assume_utc(),
            _of: PhantomData,
        })
    }

    /// Returns the number of whole hours elapsed since the `earlier`
    /// [`DateTime`].
    ///
    /// Negative if `earlier` is actually later than this [`DateTime`].
    #[must_use]
    pub fn whole_hours_since<T: ?Sized>(&self, earlier: DateTimeOf<T>) -> i64 {
        (self.inner - earlier.inner).whole_hours()
    }

    /// Coerces one kind of [`DateTime`] into another.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateTimeOf<NewOf> {
        DateTimeOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
}

/// Error of parsing [`DateTime`] from a string.
#[derive(Clone, Copy, Debug, Display, Error)]
pub enum ParseError {
    /// Failed to parse the string into an [`DateTime`].
    Parse(time::error::Parse),

    /// Parsed [`DateTime`] has an out of range component.
    ComponentRange(time::error::ComponentRange),
}

impl<Of: ?Sized> Copy for DateTimeOf<Of> {}
impl<Of: ?Sized> Clone for DateTimeOf<Of> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Of: ?Sized> Eq for DateTimeOf<Of> {}
impl<Of: ?Sized> PartialEq for DateTimeOf<Of> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<Of: ?Sized> Ord for DateTimeOf<Of> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}
impl<Of: ?Sized> PartialOrd for DateTimeOf<Of> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<Of: ?Sized> TryFrom<time::OffsetDateTime> for DateTimeOf<Of> {
    type Error = time::error::ComponentRange;

    fn try_from(dt: time::OffsetDateTime) -> Result<Self, Self::Error> {
        dt.to_offset(UtcOffset::UTC)
            .replace_microsecond(dt.microsecond())
            .map(|inner| Self {
                inner,
                _of: PhantomData,
            })
    }
}

impl<Of: ?Sized> From<DateTimeOf<Of>> for time::OffsetDateTime {
    fn from(dt: DateTimeOf<Of>) -> Self {
        dt.inner
    }
}

impl<Of: ?Sized> ops::Add<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner + rhs,
            _of: PhantomData,
        }
    }
}

impl<Of: ?Sized> ops::Sub<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self::Output {
        Self {
            inner: self.inner - rhs,
            _of: PhantomData,
        }
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> FromSql<'_> for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);

    fn from_sql(
        ty: &Type,
        raw: &[u8],
    ) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        time::OffsetDateTime::from_sql(ty, raw)?
            .try_into()
            .map_err(Box::from)
    }
}

#[cfg(feature = "postgres")]
impl<Of: ?Sized> ToSql for DateTimeOf<Of> {
    accepts!(TIMESTAMPTZ);
    to_sql_checked!();

    fn to_sql(
        &self,
        ty: &Type,
        w: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn StdError + Sync + Send>> {
        self.inner.to_sql(ty, w)
    }
}

#[cfg(feature = "juniper")]
mod juniper {
    //! Module providing integration with [`juniper`] crate.

    use juniper::{graphql_scalar, InputValue, ScalarValue, Value};

    /// Venue date and time in `yyyy-MM-dd, hh:mm a` format
    /// (e.g. `2025-06-01, 06:00 PM`).
    #[graphql_scalar(with = Self, parse_token(String))]
    type DateTime = crate::DateTime;

    impl DateTime {
        fn to_output<S: ScalarValue>(dt: &DateTime) -> Value<S> {
            Value::scalar(dt.format())
        }

        fn from_input<S: ScalarValue>(
            input: &InputValue<S>,
        ) -> Result<Self, String> {
            input
                .as_string_value()
                .ok_or_else(|| {
                    format!(
                        "Cannot parse `DateTime` input scalar from \
                         non-string value: {input}",
                    )
                })
                .and_then(|s| {
                    Self::parse(s).map_err(|e| {
                        format!("Cannot parse `DateTime` input scalar: {e}")
                    })
                })
        }
    }
}

#[cfg(test)]
mod spec {
    use time::Weekday;

    use super::DateTime;

    fn at(s: &str) -> DateTime {
        DateTime::parse(s).unwrap()
    }

    #[test]
    fn parses_wire_format() {
        let dt = at("2099-06-01, 06:30 PM");
        assert_eq!(dt.format(), "2099-06-01, 06:30 PM");

        assert_eq!(at("2099-06-01, 12:00 AM").format(), "2099-06-01, 12:00 AM");
        assert!(at("2099-06-01, 12:00 AM") < at("2099-06-01, 01:00 AM"));
        assert!(at("2099-06-01, 11:59 AM") < at("2099-06-01, 12:00 PM"));

        assert!(DateTime::parse("2099-06-01 18:30").is_err());
        assert!(DateTime::parse("2099-06-01, 13:30 PM").is_err());
        assert!(DateTime::parse("").is_err());
    }

    #[test]
    fn knows_weekday() {
        assert_eq!(at("2099-06-01, 10:00 AM").weekday(), Weekday::Monday);
        assert_eq!(at("2099-06-06, 10:00 AM").weekday(), Weekday::Saturday);
    }

    #[test]
    fn jumps_to_next_day() {
        let start = at("2099-06-30, 11:00 PM");
        assert_eq!(
            start.next_day_at(3).unwrap().format(),
            "2099-07-01, 03:00 AM",
        );
    }

    #[test]
    fn counts_whole_hours() {
        let from = at("2099-06-02, 03:00 AM");
        assert_eq!(at("2099-06-02, 05:59 AM").whole_hours_since(from), 2);
        assert_eq!(at("2099-06-02, 06:00 AM").whole_hours_since(from), 3);
        assert_eq!(at("2099-06-02, 01:00 AM").whole_hours_since(from), -2);
    }
}
