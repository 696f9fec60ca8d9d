//! [`DateTime`] definitions.

#[cfg(feature = "postgres")]
use std::error::Error as StdError;
use std::{cmp::Ordering, marker::PhantomData, ops, time::Duration};

use derive_more::Debug;
#[cfg(feature = "postgres")]
use postgres_types::{
    accepts, private::BytesMut, to_sql_checked, FromSql, IsNull, ToSql, Type,
};
use time::{
    format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset,
};

/// [`DateTimeOf`] not bound to any particular event.
pub type DateTime = DateTimeOf;

/// Moment in UTC with microsecond precision, marked with the `Of` event it
/// describes.
///
/// Marking keeps, for example, a creation moment from being passed where an
/// expiration one is expected. Use [`DateTimeOf::coerce()`] to re-mark.
#[derive(Debug)]
#[debug("{inner}")]
pub struct DateTimeOf<Of: ?Sized = ()> {
    /// Moment itself, always in UTC.
    inner: OffsetDateTime,

    /// Event marker.
    _of: PhantomData<Of>,
}

impl<Of: ?Sized> DateTimeOf<Of> {
    /// Wraps the provided moment, truncating it to microseconds.
    fn truncated(
        dt: OffsetDateTime,
    ) -> Result<Self, time::error::ComponentRange> {
        // Postgres `TIMESTAMPTZ` stores microseconds only.
        dt.to_offset(UtcOffset::UTC)
            .replace_microsecond(dt.microsecond())
            .map(|inner| Self {
                inner,
                _of: PhantomData,
            })
    }

    /// Returns the current moment.
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn now() -> Self {
        Self::truncated(OffsetDateTime::now_utc())
            .expect("current microsecond is always in range")
    }

    /// Returns the moment the provided Unix timestamp (in seconds) points
    /// to, if it's representable.
    #[must_use]
    pub fn from_unix_timestamp(secs: i64) -> Option<Self> {
        OffsetDateTime::from_unix_timestamp(secs)
            .ok()
            .map(|inner| Self {
                inner,
                _of: PhantomData,
            })
    }

    /// Returns the Unix timestamp (in seconds) of this moment.
    #[must_use]
    pub fn unix_timestamp(&self) -> i64 {
        self.inner.unix_timestamp()
    }

    /// Formats this moment as an [RFC 3339] string.
    ///
    /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
    #[expect(clippy::missing_panics_doc, reason = "infallible")]
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.inner
            .format(&Rfc3339)
            .expect("UTC moment with 4-digit year is always formattable")
    }

    /// Re-marks this moment as describing the `NewOf` event.
    #[must_use]
    pub fn coerce<NewOf: ?Sized>(self) -> DateTimeOf<NewOf> {
        DateTimeOf {
            inner: self.inner,
            _of: PhantomData,
        }
    }
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

impl<Of: ?Sized> ops::Add<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self {
            inner: self.inner + rhs,
            _of: PhantomData,
        }
    }
}

impl<Of: ?Sized> ops::Sub<Duration> for DateTimeOf<Of> {
    type Output = Self;

    fn sub(self, rhs: Duration) -> Self {
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
        Ok(Self::truncated(OffsetDateTime::from_sql(ty, raw)?)?)
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

pub mod serde {
    //! [`serde`] representations of [`DateTimeOf`] for `#[serde(with)]`.

    pub mod unix_timestamp {
        //! [`DateTimeOf`] as an integer Unix timestamp in seconds.

        use serde::{de::Error as _, Deserialize as _, Deserializer, Serializer};

        use crate::DateTimeOf;

        /// Serializes the [`DateTimeOf`] as a Unix timestamp.
        ///
        /// # Errors
        ///
        /// If the `serializer` fails.
        pub fn serialize<Of, S>(
            dt: &DateTimeOf<Of>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            Of: ?Sized,
            S: Serializer,
        {
            serializer.serialize_i64(dt.unix_timestamp())
        }

        /// Deserializes a [`DateTimeOf`] from a Unix timestamp.
        ///
        /// # Errors
        ///
        /// If the value is not an integer or is out of range.
        pub fn deserialize<'de, Of, D>(
            deserializer: D,
        ) -> Result<DateTimeOf<Of>, D::Error>
        where
            Of: ?Sized,
            D: Deserializer<'de>,
        {
            let secs = i64::deserialize(deserializer)?;
            DateTimeOf::from_unix_timestamp(secs).ok_or_else(|| {
                D::Error::custom(format!("timestamp {secs} is out of range"))
            })
        }
    }

    pub mod rfc3339 {
        //! [`DateTimeOf`] as an [RFC 3339] string.
        //!
        //! [RFC 3339]: https://tools.ietf.org/html/rfc3339

        use serde::Serializer;

        use crate::DateTimeOf;

        /// Serializes the [`DateTimeOf`] as an [RFC 3339] string.
        ///
        /// # Errors
        ///
        /// If the `serializer` fails.
        ///
        /// [RFC 3339]: https://tools.ietf.org/html/rfc3339
        pub fn serialize<Of, S>(
            dt: &DateTimeOf<Of>,
            serializer: S,
        ) -> Result<S::Ok, S::Error>
        where
            Of: ?Sized,
            S: Serializer,
        {
            serializer.serialize_str(&dt.to_rfc3339())
        }
    }
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use super::DateTime;

    #[test]
    fn formats_rfc3339_in_utc() {
        let dt = DateTime::from_unix_timestamp(1_714_558_830).unwrap();

        assert_eq!(dt.to_rfc3339(), "2024-05-01T10:20:30Z");
    }

    #[test]
    fn truncates_now_to_microseconds() {
        let now = DateTime::now();

        assert_eq!(now.inner.nanosecond() % 1_000, 0);
    }

    #[test]
    fn shifts_by_duration() {
        let dt = DateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let later = dt + Duration::from_secs(60);

        assert_eq!(later.unix_timestamp(), 1_700_000_060);
        assert!(dt < later);

        let earlier = dt - Duration::from_secs(3600);
        assert_eq!(earlier.unix_timestamp(), 1_699_996_400);
        assert_eq!(earlier + Duration::from_secs(3600), dt);
    }

    #[test]
    fn serializes_as_unix_timestamp() {
        #[derive(serde::Deserialize, serde::Serialize)]
        struct Claims {
            #[serde(with = "crate::datetime::serde::unix_timestamp")]
            exp: DateTime,
        }

        let claims: Claims = serde_json::from_str(r#"{"exp": 42}"#).unwrap();
        assert_eq!(claims.exp.unix_timestamp(), 42);
        assert_eq!(
            serde_json::to_string(&claims).unwrap(),
            r#"{"exp":42}"#,
        );
    }
}
