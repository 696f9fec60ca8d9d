//! [`Command`] for creating a new [`Plot`].

use common::{operations::Insert, Area, Money};
use derive_more::{Display, Error, From};
use tracerr::Traced;

use crate::{
    domain::{plot, user, Plot},
    infra::{database, Database},
    Service,
};

use super::Command;

/// [`Command`] for creating a new [`Plot`] listing.
#[derive(Clone, Debug)]
pub struct CreatePlot {
    /// ID of the user listing the [`Plot`].
    pub owner_id: user::Id,

    /// [`plot::Title`] of a new [`Plot`].
    pub title: plot::Title,

    /// [`plot::Location`] of a new [`Plot`].
    pub location: plot::Location,

    /// Total [`Area`] of a new [`Plot`].
    pub total_area: Area,

    /// Price of a single square foot of a new [`Plot`].
    pub price_per_sqft: Money,
}

impl<Db> Command<CreatePlot> for Service<Db>
where
    Db: Database<Insert<Plot>, Err = Traced<database::Error>>,
{
    type Ok = Plot;
    type Err = Traced<ExecutionError>;

    async fn execute(&self, cmd: CreatePlot) -> Result<Self::Ok, Self::Err> {
        use ExecutionError as E;

        let CreatePlot {
            owner_id,
            title,
            location,
            total_area,
            price_per_sqft,
        } = cmd;

        if !total_area.is_positive() {
            return Err(tracerr::new!(E::AreaNotPositive));
        }
        if !price_per_sqft.is_positive() {
            return Err(tracerr::new!(E::PriceNotPositive));
        }
        if price_per_sqft > Money::MAX_UNIT_PRICE {
            return Err(tracerr::new!(E::PriceTooHigh));
        }

        let plot =
            Plot::new(owner_id, title, location, total_area, price_per_sqft);

        self.database()
            .execute(Insert(plot.clone()))
            .await
            .map_err(tracerr::map_from_and_wrap!(=> E))
            .map(drop)?;

        Ok(plot)
    }
}

/// Error of [`CreatePlot`] [`Command`] execution.
#[derive(Debug, Display, Error, From)]
pub enum ExecutionError {
    /// Total [`Area`] of a [`Plot`] is zero.
    #[display("Total area must be positive")]
    #[from(ignore)]
    AreaNotPositive,

    /// [`Database`] error.
    #[display("`Database` operation failed: {_0}")]
    Db(database::Error),

    /// Price of a [`Plot`] square foot is zero.
    #[display("Price per square foot must be positive")]
    #[from(ignore)]
    PriceNotPositive,

    /// Price of a [`Plot`] square foot exceeds [`Money::MAX_UNIT_PRICE`].
    #[display(
        "Price per square foot must not exceed {}",
        Money::MAX_UNIT_PRICE
    )]
    #[from(ignore)]
    PriceTooHigh,
}
