// Persistence contract for the listing entities and an in-memory implementation
// that enforces the schema constraints (foreign keys, checks, unique indexes and
// the booking overlap exclusion) atomically with each write.

use crate::error::{EntityKind, ListingError, Result};
use crate::models::{
    constraints, Booking, NewBooking, NewProperty, NewReview, NewUser, Price, Property, Review,
    Role, User,
};
use crate::validation::{
    ranges_overlap, validate_price, validate_rating, validate_required, validate_text,
};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl UserFilter {
    pub fn matches(&self, user: &User) -> bool {
        self.email
            .as_deref()
            .map_or(true, |email| user.email.eq_ignore_ascii_case(email))
            && self.role.map_or(true, |role| user.role == role)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PropertyFilter {
    pub host: Option<Uuid>,
    pub location_contains: Option<String>,
    pub max_price: Option<Price>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        let matches_host = self.host.map_or(true, |host| property.host == host);
        let matches_location = self.location_contains.as_ref().map_or(true, |needle| {
            property
                .location
                .to_lowercase()
                .contains(&needle.to_lowercase())
        });
        let matches_price = self
            .max_price
            .map_or(true, |max| property.price_per_night <= max);

        matches_host && matches_location && matches_price
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub property: Option<Uuid>,
    pub guest: Option<Uuid>,
    // Keep only bookings overlapping this half-open [check_in, check_out) window
    pub overlapping: Option<(NaiveDate, NaiveDate)>,
    pub exclude: Option<Uuid>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        let matches_property = self.property.map_or(true, |p| booking.property == p);
        let matches_guest = self.guest.map_or(true, |g| booking.guest == g);
        let matches_window = self.overlapping.map_or(true, |(check_in, check_out)| {
            ranges_overlap(booking.check_in, booking.check_out, check_in, check_out)
        });
        let not_excluded = self.exclude.map_or(true, |id| booking.id != id);

        matches_property && matches_guest && matches_window && not_excluded
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub property: Option<Uuid>,
    pub guest: Option<Uuid>,
    pub booking: Option<Uuid>,
}

impl ReviewFilter {
    pub fn matches(&self, review: &Review) -> bool {
        self.property.map_or(true, |p| review.property == p)
            && self.guest.map_or(true, |g| review.guest == g)
            && self.booking.map_or(true, |b| review.booking == Some(b))
    }
}

// Rows removed by a delete, including everything removed by cascade
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub users: usize,
    pub properties: usize,
    pub bookings: usize,
    pub reviews: usize,
}

impl DeleteSummary {
    pub fn total(&self) -> usize {
        self.users + self.properties + self.bookings + self.reviews
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub users: usize,
    pub properties: usize,
    pub bookings: usize,
    pub reviews: usize,
}

/// Durable storage for the listing entities.
///
/// Every write is atomic: a create, update or delete either applies all of
/// its effects (including cascades) or fails without changing anything.
/// Queries return rows newest first.
#[async_trait]
pub trait ListingStore: Send + Sync + 'static {
    async fn create_user(&self, user: NewUser) -> Result<User>;
    async fn get_user(&self, id: Uuid) -> Result<User>;
    async fn query_users(&self, filter: UserFilter) -> Result<Vec<User>>;
    // Cascades to hosted properties and to the user's bookings and reviews
    async fn delete_user(&self, id: Uuid) -> Result<DeleteSummary>;

    async fn create_property(&self, property: NewProperty) -> Result<Property>;
    async fn update_property(&self, property: Property) -> Result<Property>;
    async fn get_property(&self, id: Uuid) -> Result<Property>;
    async fn query_properties(&self, filter: PropertyFilter) -> Result<Vec<Property>>;
    async fn delete_property(&self, id: Uuid) -> Result<DeleteSummary>;

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking>;
    async fn update_booking(&self, booking: Booking) -> Result<Booking>;
    async fn get_booking(&self, id: Uuid) -> Result<Booking>;
    async fn query_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>>;
    async fn delete_booking(&self, id: Uuid) -> Result<DeleteSummary>;

    async fn create_review(&self, review: NewReview) -> Result<Review>;
    async fn update_review(&self, review: Review) -> Result<Review>;
    async fn get_review(&self, id: Uuid) -> Result<Review>;
    async fn query_reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>>;
    async fn delete_review(&self, id: Uuid) -> Result<DeleteSummary>;

    // Remove every property, booking and review; users are kept
    async fn clear_listings(&self) -> Result<DeleteSummary>;

    fn stats(&self) -> StoreStats;
}

struct TableEntry<T> {
    row: T,
    // Insertion order, used to list newest first
    seq: u64,
}

type Table<T> = HashMap<Uuid, TableEntry<T>>;

#[derive(Default)]
struct Tables {
    users: Table<User>,
    properties: Table<Property>,
    bookings: Table<Booking>,
    reviews: Table<Review>,
    next_seq: u64,
}

fn newest_first<T: Clone>(table: &Table<T>, keep: impl Fn(&T) -> bool) -> Vec<T> {
    let mut entries: Vec<&TableEntry<T>> = table.values().filter(|e| keep(&e.row)).collect();
    entries.sort_by(|a, b| b.seq.cmp(&a.seq));
    entries.into_iter().map(|e| e.row.clone()).collect()
}

fn fetch<T: Clone>(table: &Table<T>, entity: EntityKind, id: Uuid) -> Result<T> {
    table
        .get(&id)
        .map(|e| e.row.clone())
        .ok_or_else(|| ListingError::not_found(entity, id))
}

fn require<T>(table: &Table<T>, entity: EntityKind, id: Uuid) -> Result<()> {
    if table.contains_key(&id) {
        Ok(())
    } else {
        Err(ListingError::not_found(entity, id))
    }
}

fn assign_id<T>(table: &Table<T>, requested: Option<Uuid>) -> Result<Uuid> {
    match requested {
        Some(id) if table.contains_key(&id) => Err(ListingError::constraint(
            constraints::PRIMARY_KEY,
            format!("a row with id {} already exists", id),
        )),
        Some(id) => Ok(id),
        None => Ok(Uuid::new_v4()),
    }
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn check_user(&self, email: &str) -> Result<()> {
        validate_required(constraints::USER_EMAIL_REQUIRED, "email", email)?;
        let taken = self
            .users
            .values()
            .any(|e| e.row.email.eq_ignore_ascii_case(email));
        if taken {
            return Err(ListingError::constraint(
                constraints::UNIQUE_USER_EMAIL,
                format!("a user with email {} already exists", email),
            ));
        }
        Ok(())
    }

    fn check_property(&self, host: Uuid, title: &str, location: &str, price: Price) -> Result<()> {
        require(&self.users, EntityKind::User, host)?;
        validate_text(constraints::PROPERTY_TITLE, "title", title)?;
        validate_text(constraints::PROPERTY_LOCATION, "location", location)?;
        validate_price(price)
    }

    fn check_booking(
        &self,
        guest: Uuid,
        property: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        exclude: Option<Uuid>,
    ) -> Result<()> {
        require(&self.users, EntityKind::User, guest)?;
        require(&self.properties, EntityKind::Property, property)?;

        if check_out <= check_in {
            return Err(ListingError::constraint(
                constraints::CHECK_OUT_AFTER_CHECK_IN,
                format!("check_out {} is not after check_in {}", check_out, check_in),
            ));
        }

        let same_property: Vec<&Booking> = self
            .bookings
            .values()
            .map(|e| &e.row)
            .filter(|b| b.property == property && Some(b.id) != exclude)
            .collect();

        if same_property
            .iter()
            .any(|b| b.guest == guest && b.check_in == check_in)
        {
            return Err(ListingError::constraint(
                constraints::UNIQUE_GUEST_PROPERTY_BOOKING,
                format!(
                    "guest {} already has a booking for property {} starting {}",
                    guest, property, check_in
                ),
            ));
        }

        if let Some(other) = same_property
            .iter()
            .find(|b| ranges_overlap(b.check_in, b.check_out, check_in, check_out))
        {
            debug!(
                constraint = constraints::BOOKING_NO_OVERLAP,
                property = %property,
                conflicting = %other.id,
                "Rejected overlapping booking"
            );
            return Err(ListingError::OverlapConflict {
                property,
                conflicting: other.id,
            });
        }
        Ok(())
    }

    fn check_review(
        &self,
        guest: Uuid,
        property: Uuid,
        booking: Option<Uuid>,
        rating: i32,
        comment: &str,
        exclude: Option<Uuid>,
    ) -> Result<()> {
        require(&self.users, EntityKind::User, guest)?;
        require(&self.properties, EntityKind::Property, property)?;
        validate_rating(rating)?;
        validate_required(constraints::REVIEW_COMMENT, "comment", comment)?;

        // NULL bookings never collide, as with a SQL unique index
        let Some(booking) = booking else {
            return Ok(());
        };
        require(&self.bookings, EntityKind::Booking, booking)?;

        let existing = self
            .reviews
            .values()
            .map(|e| &e.row)
            .find(|r| Some(r.id) != exclude && r.booking == Some(booking));

        match existing {
            Some(other) if other.guest == guest && other.property == property => {
                Err(ListingError::constraint(
                    constraints::ONE_REVIEW_PER_BOOKING,
                    format!("guest {} already reviewed booking {}", guest, booking),
                ))
            }
            Some(other) => Err(ListingError::constraint(
                constraints::REVIEW_BOOKING_ONE_TO_ONE,
                format!("booking {} already has review {}", booking, other.id),
            )),
            None => Ok(()),
        }
    }

    fn remove_review(&mut self, id: Uuid, summary: &mut DeleteSummary) {
        if self.reviews.remove(&id).is_some() {
            summary.reviews += 1;
        }
    }

    fn remove_booking(&mut self, id: Uuid, summary: &mut DeleteSummary) {
        if self.bookings.remove(&id).is_some() {
            summary.bookings += 1;
        }
        let before = self.reviews.len();
        self.reviews.retain(|_, e| e.row.booking != Some(id));
        summary.reviews += before - self.reviews.len();
    }

    fn remove_property(&mut self, id: Uuid, summary: &mut DeleteSummary) {
        if self.properties.remove(&id).is_some() {
            summary.properties += 1;
        }
        let bookings: Vec<Uuid> = self
            .bookings
            .values()
            .filter(|e| e.row.property == id)
            .map(|e| e.row.id)
            .collect();
        for booking in bookings {
            self.remove_booking(booking, summary);
        }
        let before = self.reviews.len();
        self.reviews.retain(|_, e| e.row.property != id);
        summary.reviews += before - self.reviews.len();
    }

    fn remove_user(&mut self, id: Uuid, summary: &mut DeleteSummary) {
        if self.users.remove(&id).is_some() {
            summary.users += 1;
        }
        let hosted: Vec<Uuid> = self
            .properties
            .values()
            .filter(|e| e.row.host == id)
            .map(|e| e.row.id)
            .collect();
        for property in hosted {
            self.remove_property(property, summary);
        }
        let booked: Vec<Uuid> = self
            .bookings
            .values()
            .filter(|e| e.row.guest == id)
            .map(|e| e.row.id)
            .collect();
        for booking in booked {
            self.remove_booking(booking, summary);
        }
        let before = self.reviews.len();
        self.reviews.retain(|_, e| e.row.guest != id);
        summary.reviews += before - self.reviews.len();
    }
}

// In-memory store. A single lock over all tables serialises every
// check-then-write, so constraint checks cannot race with other writers.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let mut tables = self.tables.write();
        let id = assign_id(&tables.users, user.id)?;
        tables.check_user(&user.email)?;

        let now = Utc::now();
        let row = User {
            id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.next_seq();
        tables.users.insert(id, TableEntry { row: row.clone(), seq });
        debug!(user = %id, email = %row.email, "Inserted user");
        Ok(row)
    }

    async fn get_user(&self, id: Uuid) -> Result<User> {
        fetch(&self.tables.read().users, EntityKind::User, id)
    }

    async fn query_users(&self, filter: UserFilter) -> Result<Vec<User>> {
        Ok(newest_first(&self.tables.read().users, |u| filter.matches(u)))
    }

    async fn delete_user(&self, id: Uuid) -> Result<DeleteSummary> {
        let mut tables = self.tables.write();
        require(&tables.users, EntityKind::User, id)?;
        let mut summary = DeleteSummary::default();
        tables.remove_user(id, &mut summary);
        debug!(user = %id, ?summary, "Deleted user");
        Ok(summary)
    }

    async fn create_property(&self, property: NewProperty) -> Result<Property> {
        let mut tables = self.tables.write();
        let id = assign_id(&tables.properties, property.id)?;
        tables.check_property(
            property.host,
            &property.title,
            &property.location,
            property.price_per_night,
        )?;

        let now = Utc::now();
        let row = Property {
            id,
            host: property.host,
            title: property.title,
            location: property.location,
            price_per_night: property.price_per_night,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.next_seq();
        tables.properties.insert(id, TableEntry { row: row.clone(), seq });
        debug!(property = %id, host = %row.host, "Inserted property");
        Ok(row)
    }

    async fn update_property(&self, property: Property) -> Result<Property> {
        let mut tables = self.tables.write();
        let created_at = fetch(&tables.properties, EntityKind::Property, property.id)?.created_at;
        tables.check_property(
            property.host,
            &property.title,
            &property.location,
            property.price_per_night,
        )?;

        let row = Property {
            created_at,
            updated_at: Utc::now(),
            ..property
        };
        if let Some(entry) = tables.properties.get_mut(&row.id) {
            entry.row = row.clone();
        }
        debug!(property = %row.id, "Updated property");
        Ok(row)
    }

    async fn get_property(&self, id: Uuid) -> Result<Property> {
        fetch(&self.tables.read().properties, EntityKind::Property, id)
    }

    async fn query_properties(&self, filter: PropertyFilter) -> Result<Vec<Property>> {
        Ok(newest_first(&self.tables.read().properties, |p| {
            filter.matches(p)
        }))
    }

    async fn delete_property(&self, id: Uuid) -> Result<DeleteSummary> {
        let mut tables = self.tables.write();
        require(&tables.properties, EntityKind::Property, id)?;
        let mut summary = DeleteSummary::default();
        tables.remove_property(id, &mut summary);
        debug!(property = %id, ?summary, "Deleted property");
        Ok(summary)
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking> {
        let mut tables = self.tables.write();
        let id = assign_id(&tables.bookings, booking.id)?;
        tables.check_booking(
            booking.guest,
            booking.property,
            booking.check_in,
            booking.check_out,
            None,
        )?;

        let now = Utc::now();
        let row = Booking {
            id,
            guest: booking.guest,
            property: booking.property,
            check_in: booking.check_in,
            check_out: booking.check_out,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.next_seq();
        tables.bookings.insert(id, TableEntry { row: row.clone(), seq });
        debug!(
            booking = %id,
            property = %row.property,
            check_in = %row.check_in,
            check_out = %row.check_out,
            "Inserted booking"
        );
        Ok(row)
    }

    async fn update_booking(&self, booking: Booking) -> Result<Booking> {
        let mut tables = self.tables.write();
        let created_at = fetch(&tables.bookings, EntityKind::Booking, booking.id)?.created_at;
        tables.check_booking(
            booking.guest,
            booking.property,
            booking.check_in,
            booking.check_out,
            Some(booking.id),
        )?;

        let row = Booking {
            created_at,
            updated_at: Utc::now(),
            ..booking
        };
        if let Some(entry) = tables.bookings.get_mut(&row.id) {
            entry.row = row.clone();
        }
        debug!(booking = %row.id, "Updated booking");
        Ok(row)
    }

    async fn get_booking(&self, id: Uuid) -> Result<Booking> {
        fetch(&self.tables.read().bookings, EntityKind::Booking, id)
    }

    async fn query_bookings(&self, filter: BookingFilter) -> Result<Vec<Booking>> {
        Ok(newest_first(&self.tables.read().bookings, |b| filter.matches(b)))
    }

    async fn delete_booking(&self, id: Uuid) -> Result<DeleteSummary> {
        let mut tables = self.tables.write();
        require(&tables.bookings, EntityKind::Booking, id)?;
        let mut summary = DeleteSummary::default();
        tables.remove_booking(id, &mut summary);
        debug!(booking = %id, ?summary, "Deleted booking");
        Ok(summary)
    }

    async fn create_review(&self, review: NewReview) -> Result<Review> {
        let mut tables = self.tables.write();
        let id = assign_id(&tables.reviews, review.id)?;
        tables.check_review(
            review.guest,
            review.property,
            review.booking,
            review.rating,
            &review.comment,
            None,
        )?;

        let now = Utc::now();
        let row = Review {
            id,
            guest: review.guest,
            property: review.property,
            booking: review.booking,
            rating: review.rating,
            comment: review.comment,
            created_at: now,
            updated_at: now,
        };
        let seq = tables.next_seq();
        tables.reviews.insert(id, TableEntry { row: row.clone(), seq });
        debug!(review = %id, property = %row.property, rating = row.rating, "Inserted review");
        Ok(row)
    }

    async fn update_review(&self, review: Review) -> Result<Review> {
        let mut tables = self.tables.write();
        let created_at = fetch(&tables.reviews, EntityKind::Review, review.id)?.created_at;
        tables.check_review(
            review.guest,
            review.property,
            review.booking,
            review.rating,
            &review.comment,
            Some(review.id),
        )?;

        let row = Review {
            created_at,
            updated_at: Utc::now(),
            ..review
        };
        if let Some(entry) = tables.reviews.get_mut(&row.id) {
            entry.row = row.clone();
        }
        debug!(review = %row.id, "Updated review");
        Ok(row)
    }

    async fn get_review(&self, id: Uuid) -> Result<Review> {
        fetch(&self.tables.read().reviews, EntityKind::Review, id)
    }

    async fn query_reviews(&self, filter: ReviewFilter) -> Result<Vec<Review>> {
        Ok(newest_first(&self.tables.read().reviews, |r| filter.matches(r)))
    }

    async fn delete_review(&self, id: Uuid) -> Result<DeleteSummary> {
        let mut tables = self.tables.write();
        require(&tables.reviews, EntityKind::Review, id)?;
        let mut summary = DeleteSummary::default();
        tables.remove_review(id, &mut summary);
        debug!(review = %id, "Deleted review");
        Ok(summary)
    }

    async fn clear_listings(&self) -> Result<DeleteSummary> {
        let mut tables = self.tables.write();
        let summary = DeleteSummary {
            users: 0,
            properties: tables.properties.len(),
            bookings: tables.bookings.len(),
            reviews: tables.reviews.len(),
        };
        tables.properties.clear();
        tables.bookings.clear();
        tables.reviews.clear();
        debug!(?summary, "Cleared listings");
        Ok(summary)
    }

    fn stats(&self) -> StoreStats {
        let tables = self.tables.read();
        StoreStats {
            users: tables.users.len(),
            properties: tables.properties.len(),
            bookings: tables.bookings.len(),
            reviews: tables.reviews.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::Arc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn user(store: &MemoryStore, email: &str, role: Role) -> User {
        store
            .create_user(NewUser {
                id: None,
                email: email.to_string(),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                role,
            })
            .await
            .unwrap()
    }

    async fn property(store: &MemoryStore, host: Uuid, title: &str) -> Property {
        store
            .create_property(NewProperty {
                id: None,
                host,
                title: title.to_string(),
                location: "Aspen, Colorado".to_string(),
                price_per_night: Price::from_units(175),
            })
            .await
            .unwrap()
    }

    fn new_booking(guest: Uuid, property: Uuid, check_in: &str, check_out: &str) -> NewBooking {
        NewBooking {
            id: None,
            guest,
            property,
            check_in: date(check_in),
            check_out: date(check_out),
        }
    }

    fn new_review(guest: Uuid, property: Uuid, booking: Option<Uuid>, rating: i32) -> NewReview {
        NewReview {
            id: None,
            guest,
            property,
            booking,
            rating,
            comment: "Lovely stay".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_ids_and_timestamps() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;
        assert_eq!(host.created_at, host.updated_at);

        let explicit = Uuid::new_v4();
        let created = store
            .create_property(NewProperty {
                id: Some(explicit),
                host: host.id,
                title: "Cabin".to_string(),
                location: "Aspen".to_string(),
                price_per_night: Price::ZERO,
            })
            .await
            .unwrap();
        assert_eq!(created.id, explicit);

        let duplicate = store
            .create_property(NewProperty {
                id: Some(explicit),
                host: host.id,
                title: "Other".to_string(),
                location: "Aspen".to_string(),
                price_per_night: Price::ZERO,
            })
            .await;
        assert_eq!(
            duplicate.unwrap_err().constraint_name(),
            Some(constraints::PRIMARY_KEY)
        );
    }

    #[tokio::test]
    async fn test_unique_email() {
        let store = MemoryStore::new();
        user(&store, "host1@example.com", Role::Host).await;
        let err = store
            .create_user(NewUser {
                id: None,
                email: "HOST1@example.com".to_string(),
                first_name: "Again".to_string(),
                last_name: "Host".to_string(),
                role: Role::Host,
            })
            .await
            .unwrap_err();
        assert_eq!(err.constraint_name(), Some(constraints::UNIQUE_USER_EMAIL));
    }

    #[tokio::test]
    async fn test_property_constraints() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;

        let negative = store
            .create_property(NewProperty {
                id: None,
                host: host.id,
                title: "Cabin".to_string(),
                location: "Aspen".to_string(),
                price_per_night: Price::from_cents(-1),
            })
            .await;
        assert_eq!(
            negative.unwrap_err().constraint_name(),
            Some(constraints::PRICE_NON_NEGATIVE)
        );

        let orphan = store
            .create_property(NewProperty {
                id: None,
                host: Uuid::new_v4(),
                title: "Cabin".to_string(),
                location: "Aspen".to_string(),
                price_per_night: Price::ZERO,
            })
            .await;
        assert!(matches!(
            orphan,
            Err(ListingError::NotFound {
                entity: EntityKind::User,
                ..
            })
        ));
        assert_eq!(store.stats().properties, 0);
    }

    #[tokio::test]
    async fn test_booking_constraints() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;
        let guest = user(&store, "guest@example.com", Role::Guest).await;
        let cabin = property(&store, host.id, "Cabin").await;

        let same_day = store
            .create_booking(new_booking(guest.id, cabin.id, "2025-02-01", "2025-02-01"))
            .await;
        assert_eq!(
            same_day.unwrap_err().constraint_name(),
            Some(constraints::CHECK_OUT_AFTER_CHECK_IN)
        );

        let first = store
            .create_booking(new_booking(guest.id, cabin.id, "2025-01-10", "2025-01-15"))
            .await
            .unwrap();

        let duplicate_key = store
            .create_booking(new_booking(guest.id, cabin.id, "2025-01-10", "2025-01-12"))
            .await;
        assert_eq!(
            duplicate_key.unwrap_err().constraint_name(),
            Some(constraints::UNIQUE_GUEST_PROPERTY_BOOKING)
        );

        let overlap = store
            .create_booking(new_booking(guest.id, cabin.id, "2025-01-14", "2025-01-18"))
            .await;
        match overlap {
            Err(ListingError::OverlapConflict { conflicting, .. }) => {
                assert_eq!(conflicting, first.id)
            }
            other => panic!("expected overlap conflict, got {:?}", other),
        }

        store
            .create_booking(new_booking(guest.id, cabin.id, "2025-01-15", "2025-01-18"))
            .await
            .unwrap();
        assert_eq!(store.stats().bookings, 2);
    }

    #[tokio::test]
    async fn test_update_booking_rechecks_constraints() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;
        let guest = user(&store, "guest@example.com", Role::Guest).await;
        let cabin = property(&store, host.id, "Cabin").await;

        let first = store
            .create_booking(new_booking(guest.id, cabin.id, "2025-01-10", "2025-01-15"))
            .await
            .unwrap();
        let second = store
            .create_booking(new_booking(guest.id, cabin.id, "2025-01-20", "2025-01-25"))
            .await
            .unwrap();

        // Extending in place does not conflict with itself
        let extended = store
            .update_booking(Booking {
                check_out: date("2025-01-18"),
                ..first.clone()
            })
            .await
            .unwrap();
        assert_eq!(extended.created_at, first.created_at);
        assert!(extended.updated_at >= first.updated_at);

        let clash = store
            .update_booking(Booking {
                check_out: date("2025-01-22"),
                ..extended.clone()
            })
            .await;
        assert!(matches!(clash, Err(ListingError::OverlapConflict { conflicting, .. }) if conflicting == second.id));
        assert_eq!(
            store.get_booking(first.id).await.unwrap().check_out,
            date("2025-01-18")
        );

        let missing = store
            .update_booking(Booking {
                id: Uuid::new_v4(),
                ..second
            })
            .await;
        assert!(matches!(missing, Err(ListingError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_review_constraints() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;
        let guest = user(&store, "guest@example.com", Role::Guest).await;
        let other_guest = user(&store, "other@example.com", Role::Guest).await;
        let cabin = property(&store, host.id, "Cabin").await;
        let booking = store
            .create_booking(new_booking(guest.id, cabin.id, "2025-01-10", "2025-01-15"))
            .await
            .unwrap();

        for rating in [0, 6] {
            let err = store
                .create_review(new_review(guest.id, cabin.id, Some(booking.id), rating))
                .await
                .unwrap_err();
            assert_eq!(err.constraint_name(), Some(constraints::RATING_RANGE));
        }

        store
            .create_review(new_review(guest.id, cabin.id, Some(booking.id), 5))
            .await
            .unwrap();

        let again = store
            .create_review(new_review(guest.id, cabin.id, Some(booking.id), 4))
            .await;
        assert_eq!(
            again.unwrap_err().constraint_name(),
            Some(constraints::ONE_REVIEW_PER_BOOKING)
        );

        let someone_else = store
            .create_review(new_review(other_guest.id, cabin.id, Some(booking.id), 4))
            .await;
        assert_eq!(
            someone_else.unwrap_err().constraint_name(),
            Some(constraints::REVIEW_BOOKING_ONE_TO_ONE)
        );

        // Reviews without a booking never collide
        store
            .create_review(new_review(guest.id, cabin.id, None, 3))
            .await
            .unwrap();
        store
            .create_review(new_review(guest.id, cabin.id, None, 4))
            .await
            .unwrap();

        let missing_booking = store
            .create_review(new_review(guest.id, cabin.id, Some(Uuid::new_v4()), 4))
            .await;
        assert!(matches!(
            missing_booking,
            Err(ListingError::NotFound {
                entity: EntityKind::Booking,
                ..
            })
        ));
        assert_eq!(store.stats().reviews, 3);
    }

    #[tokio::test]
    async fn test_cascade_delete_host() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;
        let other_host = user(&store, "other-host@example.com", Role::Host).await;
        let guest = user(&store, "guest@example.com", Role::Guest).await;
        let cabin = property(&store, host.id, "Cabin").await;
        let villa = property(&store, host.id, "Villa").await;
        let loft = property(&store, other_host.id, "Loft").await;

        for p in [&cabin, &villa, &loft] {
            let booking = store
                .create_booking(new_booking(guest.id, p.id, "2025-03-01", "2025-03-04"))
                .await
                .unwrap();
            store
                .create_review(new_review(guest.id, p.id, Some(booking.id), 4))
                .await
                .unwrap();
        }

        let summary = store.delete_user(host.id).await.unwrap();
        assert_eq!(
            summary,
            DeleteSummary {
                users: 1,
                properties: 2,
                bookings: 2,
                reviews: 2,
            }
        );
        assert_eq!(
            store.stats(),
            StoreStats {
                users: 2,
                properties: 1,
                bookings: 1,
                reviews: 1,
            }
        );
        let remaining = store.query_bookings(BookingFilter::default()).await.unwrap();
        assert!(remaining.iter().all(|b| b.property == loft.id));
    }

    #[tokio::test]
    async fn test_cascade_delete_property() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;
        let guest = user(&store, "guest@example.com", Role::Guest).await;
        let other_guest = user(&store, "other-guest@example.com", Role::Guest).await;
        let cabin = property(&store, host.id, "Cabin").await;
        let villa = property(&store, host.id, "Villa").await;

        let first = store
            .create_booking(new_booking(guest.id, cabin.id, "2025-03-01", "2025-03-04"))
            .await
            .unwrap();
        store
            .create_booking(new_booking(other_guest.id, cabin.id, "2025-03-04", "2025-03-07"))
            .await
            .unwrap();
        let kept = store
            .create_booking(new_booking(guest.id, villa.id, "2025-03-01", "2025-03-04"))
            .await
            .unwrap();
        store
            .create_review(new_review(guest.id, cabin.id, Some(first.id), 4))
            .await
            .unwrap();
        store
            .create_review(new_review(other_guest.id, cabin.id, None, 3))
            .await
            .unwrap();
        let villa_review = store
            .create_review(new_review(guest.id, villa.id, None, 5))
            .await
            .unwrap();

        let summary = store.delete_property(cabin.id).await.unwrap();
        assert_eq!(
            summary,
            DeleteSummary {
                users: 0,
                properties: 1,
                bookings: 2,
                reviews: 2,
            }
        );
        assert_eq!(summary.total(), 5);
        assert!(matches!(
            store.get_property(cabin.id).await,
            Err(ListingError::NotFound { .. })
        ));
        assert!(store
            .query_reviews(ReviewFilter {
                property: Some(cabin.id),
                ..Default::default()
            })
            .await
            .unwrap()
            .is_empty());

        let bookings = store.query_bookings(BookingFilter::default()).await.unwrap();
        assert_eq!(bookings, vec![kept]);
        let reviews = store.query_reviews(ReviewFilter::default()).await.unwrap();
        assert_eq!(reviews, vec![villa_review]);
        assert_eq!(store.stats().users, 3);

        assert!(matches!(
            store.delete_property(cabin.id).await,
            Err(ListingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cascade_delete_booking_and_guest() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;
        let guest = user(&store, "guest@example.com", Role::Guest).await;
        let cabin = property(&store, host.id, "Cabin").await;
        let booking = store
            .create_booking(new_booking(guest.id, cabin.id, "2025-03-01", "2025-03-04"))
            .await
            .unwrap();
        store
            .create_review(new_review(guest.id, cabin.id, Some(booking.id), 4))
            .await
            .unwrap();
        store
            .create_review(new_review(guest.id, cabin.id, None, 5))
            .await
            .unwrap();

        let summary = store.delete_booking(booking.id).await.unwrap();
        assert_eq!((summary.bookings, summary.reviews), (1, 1));

        let summary = store.delete_user(guest.id).await.unwrap();
        assert_eq!((summary.users, summary.reviews), (1, 1));
        assert_eq!(store.stats().properties, 1);

        assert!(matches!(
            store.delete_booking(booking.id).await,
            Err(ListingError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_queries_newest_first_with_filters() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;
        let other_host = user(&store, "other@example.com", Role::Host).await;
        let cabin = property(&store, host.id, "Cabin").await;
        let villa = property(&store, host.id, "Villa").await;
        let loft = store
            .create_property(NewProperty {
                id: None,
                host: other_host.id,
                title: "Loft".to_string(),
                location: "New York, NY".to_string(),
                price_per_night: Price::from_units(225),
            })
            .await
            .unwrap();

        let all = store
            .query_properties(PropertyFilter::default())
            .await
            .unwrap();
        let titles: Vec<&str> = all.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Loft", "Villa", "Cabin"]);

        let hosted = store
            .query_properties(PropertyFilter {
                host: Some(host.id),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(
            hosted.iter().map(|p| p.id).collect::<Vec<_>>(),
            vec![villa.id, cabin.id]
        );

        let in_new_york = store
            .query_properties(PropertyFilter {
                location_contains: Some("new york".to_string()),
                max_price: Some(Price::from_units(300)),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(in_new_york, vec![loft]);

        let hosts = store
            .query_users(UserFilter {
                role: Some(Role::Host),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(hosts.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_listings_keeps_users() {
        let store = MemoryStore::new();
        let host = user(&store, "host@example.com", Role::Host).await;
        let guest = user(&store, "guest@example.com", Role::Guest).await;
        let cabin = property(&store, host.id, "Cabin").await;
        store
            .create_booking(new_booking(guest.id, cabin.id, "2025-03-01", "2025-03-04"))
            .await
            .unwrap();

        let summary = store.clear_listings().await.unwrap();
        assert_eq!(summary.total(), 2);
        assert_eq!(
            store.stats(),
            StoreStats {
                users: 2,
                ..Default::default()
            }
        );
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_bookings_single_winner() {
        let store = Arc::new(MemoryStore::new());
        let host = user(&store, "host@example.com", Role::Host).await;
        let cabin = property(&store, host.id, "Cabin").await;

        let mut guests = Vec::new();
        for i in 0..16 {
            guests.push(user(&store, &format!("guest{}@example.com", i), Role::Guest).await);
        }

        let property_id = cabin.id;
        let handles = guests.into_iter().enumerate().map(|(i, guest)| {
            let store = Arc::clone(&store);
            let check_in = date("2025-06-01") + chrono::Days::new((i % 3) as u64);
            tokio::spawn(async move {
                store
                    .create_booking(NewBooking {
                        id: None,
                        guest: guest.id,
                        property: property_id,
                        check_in,
                        check_out: check_in + chrono::Days::new(5),
                    })
                    .await
            })
        });

        let results = join_all(handles).await;
        let succeeded = results
            .into_iter()
            .map(|joined| joined.unwrap())
            .filter(|result| result.is_ok())
            .count();
        assert_eq!(succeeded, 1);
        assert_eq!(store.stats().bookings, 1);
    }
}
