use application::transfer::{FirstInLineDto, FulfillmentDto, NotificationDto, ReservationDto};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use kernel::prelude::entity::ReservationStatus;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::controller::Exhaust;

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    id: Uuid,
    book_id: Uuid,
    user_id: Uuid,
    status: ReservationStatus,
    #[serde(with = "time::serde::rfc3339")]
    reserved_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    expires_at: OffsetDateTime,
    notified: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    fulfilled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    cancelled_at: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    expired_at: Option<OffsetDateTime>,
}

impl From<ReservationDto> for ReservationResponse {
    fn from(value: ReservationDto) -> Self {
        Self {
            id: value.id,
            book_id: value.book_id,
            user_id: value.user_id,
            status: value.status,
            reserved_at: value.reserved_at,
            expires_at: value.expires_at,
            notified: value.notified,
            fulfilled_at: value.fulfilled_at,
            cancelled_at: value.cancelled_at,
            expired_at: value.expired_at,
        }
    }
}

impl IntoResponse for ReservationResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedResponse(ReservationResponse);

impl IntoResponse for CreatedResponse {
    fn into_response(self) -> axum::response::Response {
        (StatusCode::CREATED, Json(self.0)).into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct FirstInLineResponse {
    reservation_id: Uuid,
    is_first_in_line: bool,
    first_in_line: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct FulfillmentResponse {
    reservation: ReservationResponse,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    reservation: Option<ReservationResponse>,
    warnings: Vec<String>,
}

pub struct ReservationPresenter;

impl Exhaust<ReservationDto> for ReservationPresenter {
    type To = ReservationResponse;
    fn emit(&self, input: ReservationDto) -> Self::To {
        ReservationResponse::from(input)
    }
}

impl Exhaust<Option<ReservationDto>> for ReservationPresenter {
    type To = Option<ReservationResponse>;
    fn emit(&self, input: Option<ReservationDto>) -> Self::To {
        input.map(ReservationResponse::from)
    }
}

impl Exhaust<Vec<ReservationDto>> for ReservationPresenter {
    type To = Json<Vec<ReservationResponse>>;
    fn emit(&self, input: Vec<ReservationDto>) -> Self::To {
        let result = input
            .into_iter()
            .map(ReservationResponse::from)
            .collect::<Vec<_>>();
        Json::from(result)
    }
}

impl Exhaust<FirstInLineDto> for ReservationPresenter {
    type To = Json<FirstInLineResponse>;
    fn emit(&self, input: FirstInLineDto) -> Self::To {
        Json(FirstInLineResponse {
            reservation_id: input.reservation_id,
            is_first_in_line: input.is_first_in_line,
            first_in_line: input.first_in_line,
        })
    }
}

impl Exhaust<FulfillmentDto> for ReservationPresenter {
    type To = Json<FulfillmentResponse>;
    fn emit(&self, input: FulfillmentDto) -> Self::To {
        Json(FulfillmentResponse {
            reservation: ReservationResponse::from(input.reservation),
            warnings: input.warnings,
        })
    }
}

impl Exhaust<NotificationDto> for ReservationPresenter {
    type To = Json<NotificationResponse>;
    fn emit(&self, input: NotificationDto) -> Self::To {
        Json(NotificationResponse {
            reservation: input.reservation.map(ReservationResponse::from),
            warnings: input.warnings,
        })
    }
}

pub struct CreatedPresenter;

impl Exhaust<ReservationDto> for CreatedPresenter {
    type To = CreatedResponse;
    fn emit(&self, input: ReservationDto) -> Self::To {
        CreatedResponse(ReservationResponse::from(input))
    }
}

#[cfg(test)]
mod test {
    use application::transfer::{FulfillmentDto, ReservationDto};
    use kernel::prelude::entity::ReservationStatus;
    use serde_json::Value;
    use time::macros::datetime;
    use uuid::Uuid;

    use crate::controller::Exhaust;
    use crate::response::ReservationPresenter;

    fn fulfilled() -> ReservationDto {
        ReservationDto {
            id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            status: ReservationStatus::Fulfilled,
            reserved_at: datetime!(2024-03-01 10:00 UTC),
            expires_at: datetime!(2024-03-08 10:00 UTC),
            notified: true,
            fulfilled_at: Some(datetime!(2024-03-02 09:30 UTC)),
            cancelled_at: None,
            expired_at: None,
        }
    }

    #[test]
    fn fulfillment_serializes_with_rfc3339_and_warnings() {
        let response = ReservationPresenter.emit(FulfillmentDto {
            reservation: fulfilled(),
            warnings: vec!["Notification failed".to_string()],
        });
        let json: Value = serde_json::to_value(&response.0).unwrap();
        let reservation = &json["reservation"];
        assert_eq!(reservation["status"], "fulfilled");
        assert_eq!(reservation["reserved_at"], "2024-03-01T10:00:00Z");
        assert_eq!(reservation["fulfilled_at"], "2024-03-02T09:30:00Z");
        assert!(reservation["cancelled_at"].is_null());
        assert_eq!(json["warnings"][0], "Notification failed");
    }
}
