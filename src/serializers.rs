// External representation of the listing entities: rendered views for output
// and input types for incoming request bodies.
//
// Input types only declare writable fields. Read-only keys sent by a client
// (id, host, timestamps) are ignored by serde and always assigned server-side.

use crate::models::{Booking, NewBooking, NewProperty, NewReview, Price, Property, Review, User};
use crate::validation::BookingCandidate;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Public fields of a host account; nothing sensitive is exposed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostView {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for HostView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyView {
    pub id: Uuid,
    pub host: HostView,
    pub title: String,
    pub location: String,
    pub price_per_night: Price,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PropertyView {
    pub fn render(property: &Property, host: &User) -> Self {
        Self {
            id: property.id,
            host: host.into(),
            title: property.title.clone(),
            location: property.location.clone(),
            price_per_night: property.price_per_night,
            created_at: property.created_at,
            updated_at: property.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingView {
    pub id: Uuid,
    pub guest: Uuid,
    pub property: Uuid,
    pub property_details: PropertyView,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingView {
    // `property_details` must be the rendering of `booking.property`
    pub fn render(booking: &Booking, property_details: PropertyView) -> Self {
        Self {
            id: booking.id,
            guest: booking.guest,
            property: booking.property,
            property_details,
            check_in: booking.check_in,
            check_out: booking.check_out,
            created_at: booking.created_at,
            updated_at: booking.updated_at,
        }
    }
}

// A property rendering extended with all of its bookings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDetailView {
    #[serde(flatten)]
    pub property: PropertyView,
    pub bookings: Vec<BookingView>,
}

impl PropertyDetailView {
    pub fn render(property: PropertyView, bookings: &[Booking]) -> Self {
        let bookings = bookings
            .iter()
            .map(|booking| BookingView::render(booking, property.clone()))
            .collect();
        Self { property, bookings }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewView {
    pub id: Uuid,
    pub guest: Uuid,
    pub property: Uuid,
    pub booking: Option<Uuid>,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            id: review.id,
            guest: review.guest,
            property: review.property,
            booking: review.booking,
            rating: review.rating,
            comment: review.comment.clone(),
            created_at: review.created_at,
            updated_at: review.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInput {
    pub title: String,
    pub location: String,
    pub price_per_night: Price,
}

impl PropertyInput {
    pub fn into_new(self, host: Uuid) -> NewProperty {
        NewProperty {
            id: None,
            host,
            title: self.title,
            location: self.location,
            price_per_night: self.price_per_night,
        }
    }

    // Overwrite the writable fields; id, host and timestamps are kept
    pub fn apply(self, property: Property) -> Property {
        Property {
            title: self.title,
            location: self.location,
            price_per_night: self.price_per_night,
            ..property
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingInput {
    // Defaults to the calling user when omitted
    #[serde(default)]
    pub guest: Option<Uuid>,
    pub property: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl BookingInput {
    pub fn guest_or(&self, caller: Uuid) -> Uuid {
        self.guest.unwrap_or(caller)
    }

    pub fn candidate(&self) -> BookingCandidate {
        BookingCandidate {
            property: self.property,
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }

    pub fn into_new(self, caller: Uuid) -> NewBooking {
        NewBooking {
            id: None,
            guest: self.guest_or(caller),
            property: self.property,
            check_in: self.check_in,
            check_out: self.check_out,
        }
    }

    pub fn apply(self, caller: Uuid, booking: Booking) -> Booking {
        Booking {
            guest: self.guest_or(caller),
            property: self.property,
            check_in: self.check_in,
            check_out: self.check_out,
            ..booking
        }
    }
}

// The reviewing guest is always the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewInput {
    pub property: Uuid,
    #[serde(default)]
    pub booking: Option<Uuid>,
    pub rating: i32,
    pub comment: String,
}

impl ReviewInput {
    pub fn into_new(self, guest: Uuid) -> NewReview {
        NewReview {
            id: None,
            guest,
            property: self.property,
            booking: self.booking,
            rating: self.rating,
            comment: self.comment,
        }
    }
}
