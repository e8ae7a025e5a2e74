// Persisted entity shapes for users, properties, bookings and reviews

use crate::error::{ListingError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// Names of the schema constraints the store enforces
pub mod constraints {
    pub const PRIMARY_KEY: &str = "primary_key";
    pub const UNIQUE_USER_EMAIL: &str = "unique_user_email";
    pub const USER_EMAIL_REQUIRED: &str = "user_email_required";
    pub const PROPERTY_TITLE: &str = "property_title_length";
    pub const PROPERTY_LOCATION: &str = "property_location_length";
    pub const PRICE_NON_NEGATIVE: &str = "price_per_night_non_negative";
    pub const PRICE_MAX_DIGITS: &str = "price_per_night_max_digits";
    pub const CHECK_OUT_AFTER_CHECK_IN: &str = "check_out_after_check_in";
    pub const UNIQUE_GUEST_PROPERTY_BOOKING: &str = "unique_guest_property_booking";
    pub const BOOKING_NO_OVERLAP: &str = "booking_no_overlap";
    pub const RATING_RANGE: &str = "rating_range";
    pub const REVIEW_COMMENT: &str = "review_comment_required";
    pub const ONE_REVIEW_PER_BOOKING: &str = "one_review_per_booking";
    pub const REVIEW_BOOKING_ONE_TO_ONE: &str = "review_booking_one_to_one";
}

pub const MAX_TEXT_LENGTH: usize = 255;
pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

// Fixed-point money amount, stored as whole cents.
//
// Renders as a decimal string with exactly two places ("175.00") and accepts
// either a decimal string or a JSON number on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Price(i64);

impl Price {
    // 10 digits with 2 decimal places
    pub const MAX: Price = Price(9_999_999_999);
    pub const ZERO: Price = Price(0);

    pub const fn from_cents(cents: i64) -> Self {
        Price(cents)
    }

    pub fn from_units(units: i64) -> Self {
        Price(units.saturating_mul(100))
    }

    pub fn cents(&self) -> i64 {
        self.0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl FromStr for Price {
    type Err = ListingError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| ListingError::InvalidInput(format!("price {:?}: {}", s, reason));

        let trimmed = s.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("a valid number is required"));
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid("a valid number is required"));
        }
        if frac.len() > 2 {
            return Err(invalid("ensure that there are no more than 2 decimal places"));
        }

        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid("number is too large"))?
        };
        let frac_value: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("bad fraction"))? * 10,
            _ => frac.parse().map_err(|_| invalid("bad fraction"))?,
        };

        let cents = whole_value
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(|| invalid("number is too large"))?;

        Ok(Price(if negative { -cents } else { cents }))
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

struct PriceVisitor;

impl<'de> Visitor<'de> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a decimal amount as a string or number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Price, E> {
        v.parse().map_err(E::custom)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Price, E> {
        v.checked_mul(100)
            .map(Price)
            .ok_or_else(|| E::custom("price is too large"))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Price, E> {
        i64::try_from(v)
            .map_err(|_| E::custom("price is too large"))
            .and_then(|v| self.visit_i64(v))
    }

    // Shortest round-trip text of the number, so 12.345 keeps its third decimal
    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Price, E> {
        v.to_string().parse().map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Price, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

// User account; owned by the surrounding auth system, modelled here only as far
// as ownership and rendering need it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: Uuid,
    pub host: Uuid,
    pub title: String,
    pub location: String,
    pub price_per_night: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in {}", self.title, self.location)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub guest: Uuid,
    pub property: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub guest: Uuid,
    pub property: Uuid,
    pub booking: Option<Uuid>,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Drafts handed to the store on create. `id` is assigned by the store when absent.

#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub id: Option<Uuid>,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProperty {
    pub id: Option<Uuid>,
    pub host: Uuid,
    pub title: String,
    pub location: String,
    pub price_per_night: Price,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub id: Option<Uuid>,
    pub guest: Uuid,
    pub property: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub id: Option<Uuid>,
    pub guest: Uuid,
    pub property: Uuid,
    pub booking: Option<Uuid>,
    pub rating: i32,
    pub comment: String,
}
