//! User definitions.
//!
//! Users are owned by an external identity provider, so only their IDs and
//! authorized [`Session`]s are known to this service.

pub mod session;

use common::define_kind;
use derive_more::{Display, From, FromStr, Into};
#[cfg(feature = "postgres")]
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use self::session::Session;

/// ID of a user.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    Eq,
    From,
    FromStr,
    Hash,
    Into,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[cfg_attr(feature = "postgres", derive(ToSql, FromSql), postgres(transparent))]
pub struct Id(Uuid);

impl Id {
    /// Creates a new random [`Id`].
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

define_kind! {
    #[doc = "Role of a user on the platform."]
    enum Role {
        #[doc = "Buyer or investor."]
        Client = 1,

        #[doc = "Platform administrator."]
        Admin = 2,

        #[doc = "Agent listing plots on behalf of their owners."]
        RealEstateAgent = 3,

        #[doc = "Business vendor of the marketplace."]
        B2bVendor = 4,
    }
}

impl Role {
    /// Indicates whether this [`Role`] has administrative privileges.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}
