// Error types shared by the store, validation and service layers

use crate::models::constraints;
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// Which table a missing row was looked up in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Property,
    Booking,
    Review,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::User => "user",
            EntityKind::Property => "property",
            EntityKind::Booking => "booking",
            EntityKind::Review => "review",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ListingError {
    #[error("Check-out date must be after check-in date ({check_in} -> {check_out})")]
    InvalidDateRange {
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("This property is already booked for the selected dates (property {property}, conflicts with booking {conflicting})")]
    OverlapConflict { property: Uuid, conflicting: Uuid },

    #[error("Constraint {constraint} violated: {message}")]
    ConstraintViolation {
        constraint: &'static str,
        message: String,
    },

    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ListingError {
    pub fn constraint(constraint: &'static str, message: impl Into<String>) -> Self {
        ListingError::ConstraintViolation {
            constraint,
            message: message.into(),
        }
    }

    pub fn not_found(entity: EntityKind, id: Uuid) -> Self {
        ListingError::NotFound { entity, id }
    }

    // Name of the violated constraint, if this is a constraint failure
    pub fn constraint_name(&self) -> Option<&'static str> {
        match self {
            ListingError::ConstraintViolation { constraint, .. } => Some(*constraint),
            ListingError::OverlapConflict { .. } => Some(constraints::BOOKING_NO_OVERLAP),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ListingError>;
