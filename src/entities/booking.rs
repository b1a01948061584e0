use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{invalid_input_error, invalid_state_error, Error};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub rider_id: String,
    pub route: Route,
    pub passengers: u32,
    pub vehicle: Vehicle,
    pub status: Status,
    pub has_applications: bool,
    pub vendor_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub from: String,
    pub to: String,
    pub from_state: String,
    pub to_state: String,
    pub pickup_address: String,
    pub drop_address: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub trip_type: TripType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripType {
    OneWay,
    RoundTrip,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub name: String,
    pub category: String,
    pub seats: u32,
    pub fare: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    Cancelled,
    Completed,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

/// What a rider submits; the rest of a booking is assigned by the service.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BookingRequest {
    pub route: Route,
    pub passengers: u32,
    pub vehicle: Vehicle,
}

impl Booking {
    pub fn new(rider_id: String, request: BookingRequest, now: DateTime<Utc>) -> Result<Self, Error> {
        let BookingRequest {
            route,
            passengers,
            vehicle,
        } = request;

        if passengers == 0 || passengers > vehicle.seats {
            return Err(invalid_input_error());
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            rider_id,
            route,
            passengers,
            vehicle,
            status: Status::Pending,
            has_applications: false,
            vendor_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    /// Open bookings are the ones vendors may still quote on.
    pub fn is_open(&self) -> bool {
        self.is_pending() && self.vendor_id.is_none()
    }

    pub fn receive_application(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        if !self.is_open() {
            return Err(invalid_state_error());
        }

        self.has_applications = true;
        self.updated_at = now;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(booking_id = %self.id))]
    pub fn accept(&mut self, vendor_id: String, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Accepted;
                self.vendor_id = Some(vendor_id);
                self.updated_at = now;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    #[tracing::instrument(skip(self), fields(booking_id = %self.id))]
    pub fn cancel(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Pending | Status::Accepted => {
                self.status = Status::Cancelled;
                self.updated_at = now;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    #[tracing::instrument(skip(self), fields(booking_id = %self.id))]
    pub fn complete(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Accepted => {
                self.status = Status::Completed;
                self.updated_at = now;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    /// Moves to `status` through the matching transition. Acceptance only
    /// happens through arbitration, so it is refused here.
    pub fn transition(&mut self, status: Status, now: DateTime<Utc>) -> Result<(), Error> {
        match status {
            Status::Cancelled => self.cancel(now),
            Status::Completed => self.complete(now),
            Status::Pending | Status::Accepted => Err(invalid_state_error()),
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.status, Status::Accepted | Status::Completed)
    }
}

impl PolarClass for Booking {
    fn get_polar_class_builder() -> oso::ClassBuilder<Booking> {
        oso::Class::builder()
            .name("Booking")
            .add_attribute_getter("id", |recv: &Booking| recv.id.clone())
            .add_attribute_getter("rider_id", |recv: &Booking| recv.rider_id.clone())
            .add_attribute_getter("vendor_id", |recv: &Booking| recv.vendor_id.clone())
            .add_attribute_getter("status", |recv: &Booking| recv.status.name().to_string())
            .add_method("is_open", |recv: &Booking| recv.is_open())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Booking::get_polar_class_builder();
        builder.build()
    }
}

#[cfg(test)]
pub(crate) fn sample_request() -> BookingRequest {
    BookingRequest {
        route: Route {
            from: "Pune".into(),
            to: "Mumbai".into(),
            from_state: "Maharashtra".into(),
            to_state: "Maharashtra".into(),
            pickup_address: "Shivaji Nagar".into(),
            drop_address: "Bandra West".into(),
            date: NaiveDate::from_ymd_opt(2026, 11, 2).unwrap(),
            time: NaiveTime::from_hms_opt(7, 30, 0).unwrap(),
            trip_type: TripType::OneWay,
        },
        passengers: 3,
        vehicle: Vehicle {
            name: "Dzire".into(),
            category: "sedan".into(),
            seats: 4,
            fare: Some(2200.0),
        },
    }
}

#[test]
fn passenger_count_must_fit_vehicle() {
    let mut request = sample_request();
    request.passengers = 0;
    assert!(Booking::new("rider".into(), request.clone(), Utc::now()).is_err());

    request.passengers = 5;
    assert!(Booking::new("rider".into(), request.clone(), Utc::now()).is_err());

    request.passengers = 4;
    let booking = Booking::new("rider".into(), request, Utc::now()).unwrap();
    assert!(booking.is_open());
    assert!(!booking.has_applications);
}

#[test]
fn booking_lifecycle() {
    let now = Utc::now();
    let mut booking = Booking::new("rider".into(), sample_request(), now).unwrap();

    assert!(booking.complete(now).is_err());
    assert!(booking.transition(Status::Accepted, now).is_err());

    booking.receive_application(now).unwrap();
    assert!(booking.has_applications);

    booking.accept("vendor".into(), now).unwrap();
    assert_eq!(booking.vendor_id.as_deref(), Some("vendor"));
    assert!(!booking.is_open());
    assert!(booking.receive_application(now).is_err());
    assert!(booking.accept("other".into(), now).is_err());

    booking.transition(Status::Completed, now).unwrap();
    assert!(booking.is_settled());
    assert!(booking.cancel(now).is_err());
}

#[test]
fn cancelled_booking_is_terminal() {
    let now = Utc::now();
    let mut booking = Booking::new("rider".into(), sample_request(), now).unwrap();

    booking.cancel(now).unwrap();
    assert_eq!(booking.status, Status::Cancelled);
    assert!(booking.accept("vendor".into(), now).is_err());
    assert!(booking.complete(now).is_err());
    assert!(booking.cancel(now).is_err());
}
