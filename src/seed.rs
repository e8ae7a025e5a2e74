// Demonstration fixture: four users, four properties, one booking per
// property and guest, and one review per booking.
//
// Each step returns the rows it created and the next step receives them as
// arguments.

use crate::config::SeedConfig;
use crate::error::{ListingError, Result};
use crate::models::{
    Booking, NewBooking, NewProperty, NewReview, NewUser, Price, Property, Review, Role, User,
};
use crate::store::{DeleteSummary, ListingStore, UserFilter};
use crate::validation::Validate;
use chrono::{Days, NaiveDate};
use rand::Rng;
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

struct SeedUser {
    email: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    role: Role,
}

const SEED_USERS: [SeedUser; 4] = [
    SeedUser {
        email: "host1@example.com",
        first_name: "John",
        last_name: "Smith",
        role: Role::Host,
    },
    SeedUser {
        email: "host2@example.com",
        first_name: "Sarah",
        last_name: "Johnson",
        role: Role::Host,
    },
    SeedUser {
        email: "guest1@example.com",
        first_name: "Michael",
        last_name: "Brown",
        role: Role::Guest,
    },
    SeedUser {
        email: "guest2@example.com",
        first_name: "Emily",
        last_name: "Davis",
        role: Role::Guest,
    },
];

struct SeedProperty {
    // Index into the seeded hosts
    host: usize,
    title: &'static str,
    location: &'static str,
    price_cents: i64,
}

const SEED_PROPERTIES: [SeedProperty; 4] = [
    SeedProperty {
        host: 0,
        title: "Cozy Mountain Cabin",
        location: "Aspen, Colorado",
        price_cents: 17_500,
    },
    SeedProperty {
        host: 0,
        title: "Beachfront Villa",
        location: "Miami, Florida",
        price_cents: 30_000,
    },
    SeedProperty {
        host: 1,
        title: "Downtown Loft",
        location: "New York, NY",
        price_cents: 22_500,
    },
    SeedProperty {
        host: 1,
        title: "Desert Oasis",
        location: "Palm Springs, California",
        price_cents: 19_500,
    },
];

#[derive(Debug, Clone, Default)]
pub struct SeedReport {
    pub cleared: DeleteSummary,
    pub hosts: Vec<User>,
    pub guests: Vec<User>,
    pub properties: Vec<Property>,
    pub bookings: Vec<Booking>,
    pub reviews: Vec<Review>,
}

/// Replaces all listings in `store` with the demonstration fixture.
///
/// Existing users with a seeded email address are reused. Check-in dates are
/// offset from `today`; stay lengths, ratings and comments come from `rng`.
pub async fn seed<S, R>(
    store: &S,
    config: &SeedConfig,
    today: NaiveDate,
    rng: &mut R,
) -> Result<SeedReport>
where
    S: ListingStore + ?Sized,
    R: Rng,
{
    config.validate()?;
    info!("Seeding data...");

    let cleared = clear_data(store).await?;
    let (hosts, guests) = create_users(store).await?;
    let properties = create_properties(store, &hosts).await?;
    let bookings = create_bookings(store, config, today, &properties, &guests, rng).await?;
    let reviews = create_reviews(store, config, &properties, &bookings, rng).await?;

    info!(
        properties = properties.len(),
        bookings = bookings.len(),
        reviews = reviews.len(),
        "Done!"
    );
    Ok(SeedReport {
        cleared,
        hosts,
        guests,
        properties,
        bookings,
        reviews,
    })
}

async fn clear_data<S: ListingStore + ?Sized>(store: &S) -> Result<DeleteSummary> {
    info!("Deleting old data...");
    store.clear_listings().await
}

async fn create_users<S: ListingStore + ?Sized>(store: &S) -> Result<(Vec<User>, Vec<User>)> {
    info!("Creating users...");
    let mut hosts = Vec::new();
    let mut guests = Vec::new();

    for seed_user in &SEED_USERS {
        let existing = store
            .query_users(UserFilter {
                email: Some(seed_user.email.to_string()),
                ..Default::default()
            })
            .await?;

        let user = match existing.into_iter().next() {
            Some(user) => {
                info!(email = %user.email, "Reusing user");
                user
            }
            None => {
                let user = store
                    .create_user(NewUser {
                        id: None,
                        email: seed_user.email.to_string(),
                        first_name: seed_user.first_name.to_string(),
                        last_name: seed_user.last_name.to_string(),
                        role: seed_user.role,
                    })
                    .await?;
                info!(email = %user.email, "Created user");
                user
            }
        };

        match seed_user.role {
            Role::Host => hosts.push(user),
            Role::Guest => guests.push(user),
        }
    }

    Ok((hosts, guests))
}

async fn create_properties<S: ListingStore + ?Sized>(
    store: &S,
    hosts: &[User],
) -> Result<Vec<Property>> {
    info!("Creating properties...");
    let mut properties = Vec::with_capacity(SEED_PROPERTIES.len());

    for seed_property in &SEED_PROPERTIES {
        let host = &hosts[seed_property.host % hosts.len()];
        let property = store
            .create_property(NewProperty {
                id: None,
                host: host.id,
                title: seed_property.title.to_string(),
                location: seed_property.location.to_string(),
                price_per_night: Price::from_cents(seed_property.price_cents),
            })
            .await?;
        info!(title = %property.title, "Created property");
        properties.push(property);
    }

    Ok(properties)
}

async fn create_bookings<S, R>(
    store: &S,
    config: &SeedConfig,
    today: NaiveDate,
    properties: &[Property],
    guests: &[User],
    rng: &mut R,
) -> Result<Vec<Booking>>
where
    S: ListingStore + ?Sized,
    R: Rng,
{
    info!("Creating bookings...");
    let mut bookings = Vec::with_capacity(properties.len() * guests.len());

    for (i, property) in properties.iter().enumerate() {
        for (j, guest) in guests.iter().enumerate() {
            let offset = (i + j) as u64 * u64::from(config.booking_spacing_days);
            let nights = rng.gen_range(config.min_stay_nights..=config.max_stay_nights);
            let check_in = today
                .checked_add_days(Days::new(offset))
                .ok_or_else(|| date_out_of_range(today, offset))?;
            let check_out = check_in
                .checked_add_days(Days::new(u64::from(nights)))
                .ok_or_else(|| date_out_of_range(check_in, u64::from(nights)))?;

            let booking = store
                .create_booking(NewBooking {
                    id: None,
                    guest: guest.id,
                    property: property.id,
                    check_in,
                    check_out,
                })
                .await?;
            info!(property = %property.title, guest = %guest.email, "Created booking");
            bookings.push(booking);
        }
    }

    Ok(bookings)
}

fn date_out_of_range(from: NaiveDate, days: u64) -> ListingError {
    ListingError::Config {
        message: format!("seed date {} + {} days is out of range", from, days),
    }
}

async fn create_reviews<S, R>(
    store: &S,
    config: &SeedConfig,
    properties: &[Property],
    bookings: &[Booking],
    rng: &mut R,
) -> Result<Vec<Review>>
where
    S: ListingStore + ?Sized,
    R: Rng,
{
    info!("Creating reviews...");
    let titles: HashMap<Uuid, &str> = properties
        .iter()
        .map(|p| (p.id, p.title.as_str()))
        .collect();
    let mut reviews = Vec::with_capacity(bookings.len());

    for booking in bookings {
        let title = titles.get(&booking.property).copied().unwrap_or("the property");
        let review = store
            .create_review(NewReview {
                id: None,
                guest: booking.guest,
                property: booking.property,
                booking: Some(booking.id),
                rating: rng.gen_range(config.min_rating..=config.max_rating),
                comment: random_comment(title, rng),
            })
            .await?;
        info!(property = %title, rating = review.rating, "Created review");
        reviews.push(review);
    }

    Ok(reviews)
}

pub fn random_comment<R: Rng>(property_title: &str, rng: &mut R) -> String {
    match rng.gen_range(0..5) {
        0 => format!("Great stay at {}! Would definitely recommend.", property_title),
        1 => format!("{} was wonderful. Perfect for our vacation.", property_title),
        2 => "Nice place but could use some improvements.".to_string(),
        3 => format!("Absolutely loved our time at {}!", property_title),
        _ => format!(
            "Good value for the price. Enjoyed our stay at {}.",
            property_title
        ),
    }
}
