use application::service::{
    AuthorizationService, CancelReservationService, CreateReservationService,
    ExpireReservationService, FulfillReservationService, GetReservationService,
};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use error_stack::Report;
use kernel::KernelError;
use uuid::Uuid;

use crate::caller::Caller;
use crate::controller::Controller;
use crate::error::ErrorStatus;
use crate::handler::AppModule;
use crate::request::{
    CancelReservationRequest, CreateReservationRequest, ExpireReservationRequest,
    FulfillReservationRequest, GetReservationRequest, ListReservationsQuery,
    ReservationTransformer,
};
use crate::response::{CreatedPresenter, ReservationPresenter};

pub trait ReservationRouter {
    fn route_reservation(self) -> Self;
}

impl ReservationRouter for Router<AppModule> {
    fn route_reservation(self) -> Self {
        self.route(
            "/reservations",
            post(
                |State(module): State<AppModule>,
                 caller: Caller,
                 Json(req): Json<CreateReservationRequest>| async move {
                    Controller::new(ReservationTransformer, CreatedPresenter)
                        .intake((caller, req))
                        .handle(|dto| async move { module.create_reservation(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            )
            .get(
                |State(module): State<AppModule>,
                 caller: Caller,
                 Query(req): Query<ListReservationsQuery>| async move {
                    Controller::new(ReservationTransformer, ReservationPresenter)
                        .intake((caller, req))
                        .handle(|dto| async move { module.get_all_reservations(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/reservations/me",
            get(
                |State(module): State<AppModule>, caller: Caller| async move {
                    Controller::new(ReservationTransformer, ReservationPresenter)
                        .intake(caller)
                        .handle(|dto| async move { module.get_user_reservations(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/reservations/expired",
            post(
                |State(module): State<AppModule>, caller: Caller| async move {
                    Controller::new((), ReservationPresenter)
                        .bypass(|| async move {
                            module.ensure_admin(caller.user_id()).await?;
                            module.sweep_expired_reservations().await
                        })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/reservations/:id",
            get(
                |State(module): State<AppModule>, _caller: Caller, Path(id): Path<Uuid>| async move {
                    Controller::new(ReservationTransformer, ReservationPresenter)
                        .intake(GetReservationRequest::new(id))
                        .handle(|dto| async move { module.get_reservation(dto).await })
                        .await
                        .and_then(|found| {
                            found.ok_or_else(|| {
                                Report::new(KernelError::NotFound)
                                    .attach_printable(format!("Reservation {id} not found"))
                            })
                        })
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/reservations/:id/first-in-line",
            get(
                |State(module): State<AppModule>, _caller: Caller, Path(id): Path<Uuid>| async move {
                    Controller::new(ReservationTransformer, ReservationPresenter)
                        .intake(GetReservationRequest::new(id))
                        .handle(|dto| async move { module.is_first_in_line(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/reservations/:id/fulfill",
            post(
                |State(module): State<AppModule>, caller: Caller, Path(id): Path<Uuid>| async move {
                    Controller::new(ReservationTransformer, ReservationPresenter)
                        .intake(FulfillReservationRequest::new(id, caller))
                        .handle(|dto| async move { module.fulfill_reservation(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/reservations/:id/cancel",
            post(
                |State(module): State<AppModule>, caller: Caller, Path(id): Path<Uuid>| async move {
                    Controller::new(ReservationTransformer, ReservationPresenter)
                        .intake(CancelReservationRequest::new(id, caller))
                        .handle(|dto| async move { module.cancel_reservation(dto).await })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
        .route(
            "/reservations/:id/expire",
            post(
                |State(module): State<AppModule>, caller: Caller, Path(id): Path<Uuid>| async move {
                    Controller::new(ReservationTransformer, ReservationPresenter)
                        .intake(ExpireReservationRequest::new(id))
                        .handle(|dto| async move {
                            module.ensure_admin(caller.user_id()).await?;
                            module.expire_reservation(dto).await
                        })
                        .await
                        .map_err(ErrorStatus::from)
                },
            ),
        )
    }
}
