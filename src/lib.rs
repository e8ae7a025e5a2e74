// Core of the travel listings backend: properties, bookings and reviews

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod seed;
pub mod serializers;
pub mod service;
pub mod store;
pub mod validation;

// Re-export key types for convenience
pub use config::{ApiConfig, ListingConfig, LoggingConfig, SeedConfig};
pub use error::{EntityKind, ListingError, Result};
pub use models::{Booking, Price, Property, Review, Role, User};
pub use seed::{seed, SeedReport};
pub use serializers::{
    BookingInput, BookingView, HostView, PropertyDetailView, PropertyInput, PropertyView,
    ReviewInput, ReviewView,
};
pub use service::{ApiIndex, ListingService, RequestContext};
pub use store::{
    BookingFilter, DeleteSummary, ListingStore, MemoryStore, PropertyFilter, ReviewFilter,
    StoreStats, UserFilter,
};
pub use validation::{ranges_overlap, validate_booking, validate_date_range, BookingCandidate};
