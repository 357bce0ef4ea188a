use application::transfer::{
    CancelReservationDto, CreateReservationDto, ExpireReservationDto, FulfillReservationDto,
    GetAllReservationsDto, GetBookReservationsDto, GetReservationDto, GetUserReservationsDto,
    NotifyFirstInLineDto,
};
use kernel::prelude::entity::ReservationStatus;
use serde::Deserialize;
use uuid::Uuid;

use crate::caller::Caller;
use crate::controller::Intake;

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    book_id: Uuid,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListReservationsQuery {
    status: Option<ReservationStatus>,
    limit: Option<i64>,
    offset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookReservationsQuery {
    status: Option<ReservationStatus>,
}

#[derive(Debug)]
pub struct GetReservationRequest {
    id: Uuid,
}

impl GetReservationRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug)]
pub struct FulfillReservationRequest {
    id: Uuid,
    caller: Caller,
}

impl FulfillReservationRequest {
    pub fn new(id: Uuid, caller: Caller) -> Self {
        Self { id, caller }
    }
}

#[derive(Debug)]
pub struct CancelReservationRequest {
    id: Uuid,
    caller: Caller,
}

impl CancelReservationRequest {
    pub fn new(id: Uuid, caller: Caller) -> Self {
        Self { id, caller }
    }
}

#[derive(Debug)]
pub struct ExpireReservationRequest {
    id: Uuid,
}

impl ExpireReservationRequest {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

#[derive(Debug)]
pub struct NotifyFirstInLineRequest {
    book_id: Uuid,
    caller: Caller,
}

impl NotifyFirstInLineRequest {
    pub fn new(book_id: Uuid, caller: Caller) -> Self {
        Self { book_id, caller }
    }
}

pub struct ReservationTransformer;

impl Intake<(Caller, CreateReservationRequest)> for ReservationTransformer {
    type To = CreateReservationDto;
    fn emit(&self, input: (Caller, CreateReservationRequest)) -> Self::To {
        let (caller, input) = input;
        CreateReservationDto {
            book_id: input.book_id,
            user_id: caller.id(),
        }
    }
}

impl Intake<GetReservationRequest> for ReservationTransformer {
    type To = GetReservationDto;
    fn emit(&self, input: GetReservationRequest) -> Self::To {
        GetReservationDto { id: input.id }
    }
}

impl Intake<Caller> for ReservationTransformer {
    type To = GetUserReservationsDto;
    fn emit(&self, input: Caller) -> Self::To {
        GetUserReservationsDto {
            user_id: input.id(),
        }
    }
}

impl Intake<(Caller, ListReservationsQuery)> for ReservationTransformer {
    type To = GetAllReservationsDto;
    fn emit(&self, input: (Caller, ListReservationsQuery)) -> Self::To {
        let (caller, query) = input;
        GetAllReservationsDto {
            acting_user_id: caller.id(),
            status: query.status,
            limit: query.limit,
            offset: query.offset,
        }
    }
}

impl Intake<(Uuid, BookReservationsQuery)> for ReservationTransformer {
    type To = GetBookReservationsDto;
    fn emit(&self, input: (Uuid, BookReservationsQuery)) -> Self::To {
        let (book_id, query) = input;
        GetBookReservationsDto {
            book_id,
            status: query.status,
        }
    }
}

impl Intake<FulfillReservationRequest> for ReservationTransformer {
    type To = FulfillReservationDto;
    fn emit(&self, input: FulfillReservationRequest) -> Self::To {
        FulfillReservationDto {
            reservation_id: input.id,
            acting_user_id: input.caller.id(),
        }
    }
}

impl Intake<CancelReservationRequest> for ReservationTransformer {
    type To = CancelReservationDto;
    fn emit(&self, input: CancelReservationRequest) -> Self::To {
        CancelReservationDto {
            reservation_id: input.id,
            acting_user_id: input.caller.id(),
        }
    }
}

impl Intake<ExpireReservationRequest> for ReservationTransformer {
    type To = ExpireReservationDto;
    fn emit(&self, input: ExpireReservationRequest) -> Self::To {
        ExpireReservationDto {
            reservation_id: input.id,
        }
    }
}

impl Intake<NotifyFirstInLineRequest> for ReservationTransformer {
    type To = NotifyFirstInLineDto;
    fn emit(&self, input: NotifyFirstInLineRequest) -> Self::To {
        NotifyFirstInLineDto {
            book_id: input.book_id,
            acting_user_id: input.caller.id(),
        }
    }
}
