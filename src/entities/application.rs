use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};

use crate::entities::{Booking, Profile};
use crate::error::{invalid_input_error, invalid_state_error, Error};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: String,
    pub booking_id: String,
    pub vendor_id: String,
    pub rider_id: String,
    pub price: f64,
    pub notes: String,
    pub vendor_details: VendorDetails,
    pub status: Status,
    pub payment: Payment,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorDetails {
    pub company_name: String,
    pub driver_name: String,
    pub car_number: String,
    pub driver_mobile: String,
    pub company_mobile: String,
    pub email: String,
}

impl VendorDetails {
    /// Fills the company contact fields the vendor left blank from their
    /// profile.
    pub fn fill_blanks(&mut self, profile: &Profile) {
        fn fill(field: &mut String, value: &str) {
            if field.trim().is_empty() {
                *field = value.to_string();
            }
        }

        if let Some(business) = &profile.business {
            fill(&mut self.company_name, &business.business_name);
            fill(&mut self.company_mobile, &business.office_phone);
        }
        fill(&mut self.email, &profile.email);
        fill(&mut self.driver_mobile, &profile.phone);
    }
}

/// A vendor's price quote for a booking.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub vendor_details: VendorDetails,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Accepted,
    Rejected,
}

impl Status {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Payment {
    Unpaid,
    Paid {
        transaction_id: String,
        paid_at: DateTime<Utc>,
    },
}

impl Application {
    /// One application per vendor per booking: the id is derived from both.
    pub fn id_for(booking_id: &str, vendor_id: &str) -> String {
        format!("{booking_id}_{vendor_id}")
    }

    pub fn new(
        booking: &Booking,
        vendor_id: String,
        quote: Quote,
        now: DateTime<Utc>,
    ) -> Result<Self, Error> {
        if !quote.price.is_finite() || quote.price <= 0.0 {
            return Err(invalid_input_error());
        }

        Ok(Self {
            id: Self::id_for(&booking.id, &vendor_id),
            booking_id: booking.id.clone(),
            vendor_id,
            rider_id: booking.rider_id.clone(),
            price: quote.price,
            notes: quote.notes,
            vendor_details: quote.vendor_details,
            status: Status::Pending,
            payment: Payment::Unpaid,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_pending(&self) -> bool {
        self.status == Status::Pending
    }

    pub fn is_paid(&self) -> bool {
        matches!(self.payment, Payment::Paid { .. })
    }

    pub fn accept(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Accepted;
                self.updated_at = now;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    pub fn reject(&mut self, now: DateTime<Utc>) -> Result<(), Error> {
        match self.status {
            Status::Pending => {
                self.status = Status::Rejected;
                self.updated_at = now;
                Ok(())
            }
            _ => Err(invalid_state_error()),
        }
    }

    pub fn ensure_withdrawable(&self) -> Result<(), Error> {
        if !self.is_pending() {
            return Err(invalid_state_error());
        }

        Ok(())
    }

    pub fn mark_paid(&mut self, transaction_id: String, now: DateTime<Utc>) -> Result<(), Error> {
        if self.status != Status::Accepted || self.is_paid() {
            return Err(invalid_state_error());
        }

        self.payment = Payment::Paid {
            transaction_id,
            paid_at: now,
        };
        self.updated_at = now;
        Ok(())
    }
}

impl PolarClass for Application {
    fn get_polar_class_builder() -> oso::ClassBuilder<Application> {
        oso::Class::builder()
            .name("Application")
            .add_attribute_getter("id", |recv: &Application| recv.id.clone())
            .add_attribute_getter("booking_id", |recv: &Application| recv.booking_id.clone())
            .add_attribute_getter("vendor_id", |recv: &Application| recv.vendor_id.clone())
            .add_attribute_getter("rider_id", |recv: &Application| recv.rider_id.clone())
            .add_attribute_getter("status", |recv: &Application| {
                recv.status.name().to_string()
            })
    }

    fn get_polar_class() -> oso::Class {
        let builder = Application::get_polar_class_builder();
        builder.build()
    }
}

#[cfg(test)]
pub(crate) fn sample_quote(price: f64) -> Quote {
    Quote {
        price,
        notes: "AC, luggage carrier".into(),
        vendor_details: VendorDetails {
            company_name: "Sahyadri Travels".into(),
            driver_name: "Ramesh".into(),
            car_number: "MH12AB1234".into(),
            driver_mobile: "9800000001".into(),
            company_mobile: "9800000002".into(),
            email: "desk@sahyadri.example".into(),
        },
    }
}
