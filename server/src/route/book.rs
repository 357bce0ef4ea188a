use application::service::{GetReservationService, NotifyReservationService};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use uuid::Uuid;

use crate::caller::Caller;
use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::handler::AppModule;
use crate::request::{BookReservationsQuery, NotifyFirstInLineRequest, ReservationTransformer};
use crate::response::ReservationPresenter;

/// Queue views keyed by book.
pub trait BookRouter {
    fn route_book(self) -> Self;
}

impl BookRouter for Router<AppModule> {
    fn route_book(self) -> Self {
        self.route(
            "/books/:id/reservations",
            get(
                |State(module): State<AppModule>,
                 _caller: Caller,
                 Path(id): Path<Uuid>,
                 Query(req): Query<BookReservationsQuery>| async move {
                    Controller::new(ReservationTransformer, ReservationPresenter)
                        .intake((id, req))
                        .handle(|dto| async move { module.get_book_reservations(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/books/:id/reservations/notify",
            post(
                |State(module): State<AppModule>, caller: Caller, Path(id): Path<Uuid>| async move {
                    Controller::new(ReservationTransformer, ReservationPresenter)
                        .intake(NotifyFirstInLineRequest::new(id, caller))
                        .handle(|dto| async move { module.notify_first_in_line(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
