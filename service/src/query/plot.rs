//! [`Query`] collection related to a single [`Plot`].

use common::operations::By;

use crate::domain::{plot, Plot};
#[cfg(doc)]
use crate::Query;

use super::Read;

/// Queries a [`Plot`] by its [`plot::Id`].
pub type ById = Read<By<Option<Plot>, plot::Id>>;
