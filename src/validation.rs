// Booking validation and field-level checks for external input

use crate::error::{ListingError, Result};
use crate::models::{constraints, Price, MAX_RATING, MAX_TEXT_LENGTH, MIN_RATING};
use crate::serializers::{PropertyInput, ReviewInput};
use crate::store::{BookingFilter, ListingStore};
use chrono::NaiveDate;
use tracing::{debug, warn};
use uuid::Uuid;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

// The booking fields that take part in date validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingCandidate {
    pub property: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

pub fn validate_date_range(check_in: NaiveDate, check_out: NaiveDate) -> Result<()> {
    if check_out <= check_in {
        return Err(ListingError::InvalidDateRange {
            check_in,
            check_out,
        });
    }
    Ok(())
}

// Half-open [check_in, check_out) overlap; back-to-back stays do not overlap
pub fn ranges_overlap(
    a_check_in: NaiveDate,
    a_check_out: NaiveDate,
    b_check_in: NaiveDate,
    b_check_out: NaiveDate,
) -> bool {
    a_check_in < b_check_out && a_check_out > b_check_in
}

/// Checks a candidate booking against the bookings already stored for its
/// property.
///
/// `exclude` names a booking to ignore, so that an update does not conflict
/// with the row it replaces. This is a read-then-check: the store repeats the
/// overlap test atomically when the row is written, and that second check is
/// the authoritative one.
pub async fn validate_booking<S: ListingStore + ?Sized>(
    store: &S,
    candidate: &BookingCandidate,
    exclude: Option<Uuid>,
) -> Result<()> {
    validate_date_range(candidate.check_in, candidate.check_out)?;

    let filter = BookingFilter {
        property: Some(candidate.property),
        overlapping: Some((candidate.check_in, candidate.check_out)),
        exclude,
        ..Default::default()
    };
    let overlapping = store.query_bookings(filter).await?;

    if let Some(existing) = overlapping.first() {
        warn!(
            property = %candidate.property,
            conflicting = %existing.id,
            check_in = %candidate.check_in,
            check_out = %candidate.check_out,
            "Rejecting overlapping booking"
        );
        return Err(ListingError::OverlapConflict {
            property: candidate.property,
            conflicting: existing.id,
        });
    }

    debug!(property = %candidate.property, "Booking dates are available");
    Ok(())
}

// Required text field of at most MAX_TEXT_LENGTH characters
pub fn validate_text(constraint: &'static str, field: &str, value: &str) -> Result<()> {
    validate_required(constraint, field, value)?;
    let length = value.chars().count();
    if length > MAX_TEXT_LENGTH {
        return Err(ListingError::constraint(
            constraint,
            format!(
                "{} must have at most {} characters (it has {})",
                field, MAX_TEXT_LENGTH, length
            ),
        ));
    }
    Ok(())
}

pub fn validate_required(constraint: &'static str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ListingError::constraint(
            constraint,
            format!("{} may not be blank", field),
        ));
    }
    Ok(())
}

pub fn validate_price(price: Price) -> Result<()> {
    if price.is_negative() {
        return Err(ListingError::constraint(
            constraints::PRICE_NON_NEGATIVE,
            format!("price_per_night must be at least 0 (got {})", price),
        ));
    }
    if price > Price::MAX {
        return Err(ListingError::constraint(
            constraints::PRICE_MAX_DIGITS,
            format!("price_per_night must be at most {} (got {})", Price::MAX, price),
        ));
    }
    Ok(())
}

pub fn validate_rating(rating: i32) -> Result<()> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(ListingError::constraint(
            constraints::RATING_RANGE,
            format!(
                "rating must be between {} and {} (got {})",
                MIN_RATING, MAX_RATING, rating
            ),
        ));
    }
    Ok(())
}

impl Validate for PropertyInput {
    fn validate(&self) -> Result<()> {
        validate_text(constraints::PROPERTY_TITLE, "title", &self.title)?;
        validate_text(constraints::PROPERTY_LOCATION, "location", &self.location)?;
        validate_price(self.price_per_night)
    }
}

impl Validate for ReviewInput {
    fn validate(&self) -> Result<()> {
        validate_rating(self.rating)?;
        validate_required(constraints::REVIEW_COMMENT, "comment", &self.comment)
    }
}
