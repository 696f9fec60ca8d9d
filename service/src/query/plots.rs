//! [`Query`] collection related to the multiple [`Plot`]s.

use common::operations::By;

use crate::read;
#[cfg(doc)]
use crate::{domain::Plot, Query};

use super::Read;

/// Queries a list of [`Plot`]s.
pub type List =
    Read<By<read::plot::list::Page, read::plot::list::Selector>>;

#[cfg(test)]
mod spec {
    use std::str::FromStr as _;

    use common::{Area, Money};

    use crate::{
        command::{self, Command as _},
        domain::{booking, plot, user, Plot},
        infra::Memory,
        read::plot::list::{Arguments, Filter, Selector},
        Config, Query as _, Service,
    };

    use super::List;

    async fn create(svc: &Service<Memory>, owner_id: user::Id) -> Plot {
        svc.execute(command::CreatePlot {
            owner_id,
            title: plot::Title::new("Lakeside").unwrap(),
            location: plot::Location::new("Goa").unwrap(),
            total_area: Area::from_str("100").unwrap(),
            price_per_sqft: Money::from_str("10").unwrap(),
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn pages_by_id() {
        let (svc, _bg) =
            Service::new(Config::new(b"s", Default::default()), Memory::new());
        let owner = user::Id::new();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(create(&svc, owner).await.id);
        }
        ids.sort();

        let first = svc
            .execute(List::by(Selector {
                arguments: Arguments::new(Some(2), None).unwrap(),
                filter: Filter::default(),
            }))
            .await
            .unwrap();
        assert!(first.has_next_page);
        assert_eq!(
            first.edges.iter().map(|e| e.cursor).collect::<Vec<_>>(),
            ids[..2],
        );

        let second = svc
            .execute(List::by(Selector {
                arguments: Arguments::new(Some(2), first.end_cursor().copied())
                    .unwrap(),
                filter: Filter::default(),
            }))
            .await
            .unwrap();
        assert!(!second.has_next_page);
        assert_eq!(second.edges.len(), 1);
        assert_eq!(second.edges[0].node.id, ids[2]);
    }

    #[tokio::test]
    async fn filters_by_owner_and_availability() {
        let (svc, _bg) =
            Service::new(Config::new(b"s", Default::default()), Memory::new());
        let (alice, bob) = (user::Id::new(), user::Id::new());
        let sold = create(&svc, alice).await;
        let free = create(&svc, alice).await;
        _ = create(&svc, bob).await;

        _ = svc
            .execute(command::ReservePlot {
                plot_id: sold.id,
                client_id: bob,
                kind: booking::Kind::FullPlot,
                requested_area: None,
            })
            .await
            .unwrap();

        let page = svc
            .execute(List::by(Selector {
                arguments: Arguments::new(None, None).unwrap(),
                filter: Filter {
                    available_only: true,
                    owner_id: Some(alice),
                },
            }))
            .await
            .unwrap();

        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].node.id, free.id);
    }
}
