//! [`Error`]-related definitions.

use std::fmt;

use derive_more::Error as StdError;
use itertools::Itertools as _;
use juniper::IntoFieldError;
use service::{
    availability::Violation,
    domain::{receipt::Rejection, reservation::UnknownAction},
    infra::database,
};
use tracerr::{Trace, Traced};

/// Defines a new error type.
#[expect(clippy::module_name_repetitions, reason = "more readable")]
#[macro_export]
macro_rules! define_error {
    (
        enum $name:ident {
            $(
                #[code = $code:literal]
                #[status = $status_code:ident]
                #[message = $message:literal]
                $variant:ident
            ),* $(,)?
        }
    ) => {
        /// Error type.
        #[derive(
            Clone,
            Copy,
            Debug,
            ::derive_more::Display,
            ::derive_more::Error
        )]
        #[repr(u16)]
        pub enum $name {
            $(
                #[display($message)]
                #[doc = $message]
                $variant,
            )*
        }

        impl From<$name> for $crate::Error {
            fn from(err: $name) -> Self {
                match err {
                    $(
                        $name::$variant => Self {
                            code: $code,
                            status_code: ::http::StatusCode::$status_code,
                            message: $message.to_string(),
                            backtrace: None,
                        },
                    )*
                }
            }
        }
    };
}

/// GraphQL API [`Error`].
#[derive(Clone, Debug, StdError)]
pub struct Error {
    /// [`Error`] code.
    pub code: Code,

    /// [`http::StatusCode`] of this [`Error`].
    pub status_code: http::StatusCode,

    /// Backtrace of this [`Error`].
    #[error(not(backtrace))]
    pub backtrace: Option<Trace>,

    /// [`Error`] message.
    pub message: String,
}

impl Error {
    /// Creates a new [`Error`] representing an internal server error.
    #[must_use]
    pub fn internal(msg: &impl ToString) -> Self {
        Self {
            code: "INTERNAL_SERVER_ERROR",
            status_code: http::StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            backtrace: None,
        }
    }

    /// Creates a new [`Error`] of invalid client input with the provided
    /// `code`.
    #[must_use]
    pub fn bad_request(code: Code, msg: &impl ToString) -> Self {
        Self {
            code,
            status_code: http::StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            backtrace: None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            code,
            status_code: _,
            backtrace,
            message,
        } = self;

        write!(
            f,
            "[{code}]: {message}{}",
            backtrace
                .iter()
                .format_with("\n", |trace, f| f(&format_args!("{trace}"))),
        )
    }
}

impl<S> IntoFieldError<S> for Error
where
    S: From<String>,
{
    fn into_field_error(self) -> juniper::FieldError<S> {
        let mut ext = juniper::Object::with_capacity(1);
        drop(
            ext.add_field("code", juniper::Value::scalar(self.code.to_owned())),
        );
        drop(
            ext.add_field(
                "backtrace",
                juniper::Value::list(
                    self.backtrace
                        .iter()
                        .flat_map(|trace| trace.iter())
                        .map(|frame| juniper::Value::scalar(frame.to_string()))
                        .collect(),
                ),
            ),
        );
        juniper::FieldError::new(self.message, juniper::Value::object(ext))
    }
}

/// [`Error`] code.
pub type Code = &'static str;

/// Helper trait for converting types into [`Error`]s.
pub trait AsError {
    /// Tries to convert the type into an [`Error`].
    ///
    /// [`None`] is returned if the type cannot be converted into an [`Error`].
    fn try_as_error(&self) -> Option<Error>;

    /// Converts the type into an [`Error`].
    fn as_error(&self) -> Error
    where
        Self: fmt::Display,
    {
        self.try_as_error()
            .unwrap_or_else(|| Error::internal(&self))
    }

    /// Converts the type into an [`Error`] by consuming it.
    fn into_error(self) -> Error
    where
        Self: fmt::Display + Sized,
    {
        self.as_error()
    }
}

impl<E: AsError> AsError for Traced<E> {
    fn try_as_error(&self) -> Option<Error> {
        let mut error = self.as_ref().try_as_error()?;
        error.backtrace = Some(self.trace().clone());
        Some(error)
    }
}

define_error! {
    enum InfraError {
        #[code = "SERVICE_UNAVAILABLE"]
        #[status = SERVICE_UNAVAILABLE]
        #[message = "Service is temporarily unavailable, retry later"]
        Unavailable,
    }
}

impl AsError for database::Error {
    fn try_as_error(&self) -> Option<Error> {
        // The cause stays in logs only.
        tracing::error!("`Database` operation failed: {self}");
        Some(InfraError::Unavailable.into())
    }
}

impl AsError for Violation {
    fn try_as_error(&self) -> Option<Error> {
        define_error! {
            enum Error {
                #[code = "START_IN_PAST"]
                #[status = BAD_REQUEST]
                #[message = "Reservation cannot start in the past"]
                StartInPast,

                #[code = "END_BEFORE_START"]
                #[status = BAD_REQUEST]
                #[message = "Reservation cannot end before it starts"]
                EndBeforeStart,

                #[code = "EFFECTIVE_END_BEFORE_START"]
                #[status = BAD_REQUEST]
                #[message = "Reservation cannot effectively end before it \
                             starts"]
                EffectiveEndBeforeStart,
            }
        }

        Some(
            match self {
                Self::StartInPast => Error::StartInPast,
                Self::EndBeforeStart => Error::EndBeforeStart,
                Self::EffectiveEndBeforeStart => Error::EffectiveEndBeforeStart,
            }
            .into(),
        )
    }
}

impl AsError for Rejection {
    fn try_as_error(&self) -> Option<Error> {
        let code = match self {
            Self::NoPayments => "NO_PAYMENTS",
            Self::NonPositivePayment(_) => "NON_POSITIVE_PAYMENT",
            Self::NegativeAmountDue(_) => "NEGATIVE_AMOUNT_DUE",
            Self::Overpayment { .. } => "OVERPAYMENT",
        };
        Some(Error::bad_request(code, self))
    }
}

impl AsError for UnknownAction {
    fn try_as_error(&self) -> Option<Error> {
        Some(Error::bad_request("UNKNOWN_ACTION", self))
    }
}

#[cfg(test)]
mod spec {
    use common::Money;
    use service::{
        availability::Violation,
        domain::{receipt::Rejection, reservation::Action},
    };

    use super::AsError as _;

    #[test]
    fn maps_schedule_violations_to_bad_request() {
        for (violation, code) in [
            (Violation::StartInPast, "START_IN_PAST"),
            (Violation::EndBeforeStart, "END_BEFORE_START"),
            (Violation::EffectiveEndBeforeStart, "EFFECTIVE_END_BEFORE_START"),
        ] {
            let err = violation.as_error();
            assert_eq!(err.code, code);
            assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn keeps_rejection_details() {
        let err = Rejection::Overpayment {
            paid: Money::from(2000),
            due: Money::from(1998),
        }
        .as_error();

        assert_eq!(err.code, "OVERPAYMENT");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "paid 2000.00 exceeds the amount due 1998.00");
    }

    #[test]
    fn rejects_unknown_action() {
        let err = Action::parse("Archive").unwrap_err().into_error();

        assert_eq!(err.code, "UNKNOWN_ACTION");
        assert_eq!(err.status_code, http::StatusCode::BAD_REQUEST);
        assert!(err.message.contains("`Archive`"), "{err}");
    }
}
