use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{User, VENDOR};
use crate::error::{invalid_input_error, Error};

/// Contact details kept for a rider or vendor account. The id is the
/// account id issued by the identity gateway.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub business: Option<Business>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Vendor-only company record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Business {
    pub business_name: String,
    pub gst_number: String,
    #[serde(default)]
    pub business_type: String,
    pub address: String,
    pub office_phone: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub business: Option<Business>,
}

/// Email belongs to the identity gateway and is not edited here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub business: Option<Business>,
}

fn is_phone_number(value: &str) -> bool {
    value.len() == 10 && value.bytes().all(|b| b.is_ascii_digit())
}

fn validate(
    user: &User,
    name: &str,
    phone: &str,
    business: &Option<Business>,
) -> Result<(), Error> {
    if name.trim().is_empty() || !is_phone_number(phone) {
        return Err(invalid_input_error());
    }

    // vendors must describe their business, riders have none
    match (user.has_role(VENDOR.into()), business) {
        (true, Some(business)) if !is_phone_number(&business.office_phone) => {
            Err(invalid_input_error())
        }
        (true, Some(_)) | (false, None) => Ok(()),
        _ => Err(invalid_input_error()),
    }
}

impl Profile {
    pub fn new(user: &User, request: ProfileRequest, now: DateTime<Utc>) -> Result<Self, Error> {
        validate(user, &request.name, &request.phone, &request.business)?;

        if !request.email.contains('@') {
            return Err(invalid_input_error());
        }

        Ok(Self {
            id: user.id.clone(),
            name: request.name,
            email: request.email,
            phone: request.phone,
            business: request.business,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(&mut self, user: &User, update: ProfileUpdate, now: DateTime<Utc>) -> Result<(), Error> {
        validate(user, &update.name, &update.phone, &update.business)?;

        self.name = update.name;
        self.phone = update.phone;
        self.business = update.business;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_business() -> Business {
    Business {
        business_name: "Sahyadri Travels".into(),
        gst_number: "27AAPFS1234K1Z5".into(),
        business_type: "fleet".into(),
        address: "FC Road, Pune".into(),
        office_phone: "9800000002".into(),
    }
}

#[test]
fn vendor_profile_needs_business() {
    let vendor = User::new("v1", &[VENDOR]);
    let mut request = ProfileRequest {
        name: "Ramesh Patil".into(),
        email: "desk@sahyadri.example".into(),
        phone: "9800000001".into(),
        business: None,
    };
    assert!(Profile::new(&vendor, request.clone(), Utc::now()).is_err());

    request.business = Some(sample_business());
    let profile = Profile::new(&vendor, request, Utc::now()).unwrap();
    assert_eq!(profile.id, "v1");
}

#[test]
fn rider_profile_has_no_business() {
    let rider = User::new("r1", &[crate::auth::RIDER]);
    let request = ProfileRequest {
        name: "Asha".into(),
        email: "asha@example.com".into(),
        phone: "9811111111".into(),
        business: Some(sample_business()),
    };
    assert!(Profile::new(&rider, request.clone(), Utc::now()).is_err());

    let profile = Profile::new(
        &rider,
        ProfileRequest {
            business: None,
            ..request
        },
        Utc::now(),
    )
    .unwrap();
    assert!(profile.business.is_none());
}

#[test]
fn phone_numbers_are_ten_digits() {
    let rider = User::new("r1", &[crate::auth::RIDER]);
    let mut profile = Profile::new(
        &rider,
        ProfileRequest {
            name: "Asha".into(),
            email: "asha@example.com".into(),
            phone: "9811111111".into(),
            business: None,
        },
        Utc::now(),
    )
    .unwrap();

    for phone in ["981111111", "98111111112", "98111x1111"] {
        let update = ProfileUpdate {
            name: "Asha K".into(),
            phone: phone.into(),
            business: None,
        };
        assert!(profile.update(&rider, update, Utc::now()).is_err());
    }
    assert_eq!(profile.name, "Asha");

    let update = ProfileUpdate {
        name: "Asha K".into(),
        phone: "9822222222".into(),
        business: None,
    };
    profile.update(&rider, update, Utc::now()).unwrap();
    assert_eq!(profile.phone, "9822222222");
}
