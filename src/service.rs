// Request-level operations: validate input, persist through the store and
// render the stored rows.

use crate::config::ApiConfig;
use crate::error::Result;
use crate::models::{Booking, NewUser, Property, User};
use crate::serializers::{
    BookingInput, BookingView, PropertyDetailView, PropertyInput, PropertyView, ReviewInput,
    ReviewView,
};
use crate::store::{
    BookingFilter, DeleteSummary, ListingStore, PropertyFilter, ReviewFilter,
};
use crate::validation::{validate_booking, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

// Identity of the caller plus an id that ties together the logs of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub correlation_id: String,
}

impl RequestContext {
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            correlation_id: Uuid::new_v4().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiIndex {
    pub message: String,
    pub version: String,
    pub app: String,
}

pub struct ListingService<S: ListingStore> {
    store: Arc<S>,
    api: ApiConfig,
}

impl<S: ListingStore> ListingService<S> {
    pub fn new(store: Arc<S>, api: ApiConfig) -> Self {
        Self { store, api }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn api_index(&self) -> ApiIndex {
        ApiIndex {
            message: self.api.message.clone(),
            version: self.api.version.clone(),
            app: self.api.app.clone(),
        }
    }

    pub async fn create_user(&self, user: NewUser) -> Result<User> {
        let user = self.store.create_user(user).await?;
        info!(user = %user.id, email = %user.email, "Created user");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, id: Uuid) -> Result<DeleteSummary> {
        let summary = self.store.delete_user(id).await?;
        info!(?summary, "Deleted user");
        Ok(summary)
    }

    async fn render_property(&self, property: &Property) -> Result<PropertyView> {
        let host = self.store.get_user(property.host).await?;
        Ok(PropertyView::render(property, &host))
    }

    async fn render_booking(&self, booking: &Booking) -> Result<BookingView> {
        let property = self.store.get_property(booking.property).await?;
        let details = self.render_property(&property).await?;
        Ok(BookingView::render(booking, details))
    }

    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, user = %ctx.user_id))]
    pub async fn create_property(
        &self,
        ctx: &RequestContext,
        input: PropertyInput,
    ) -> Result<PropertyView> {
        input.validate()?;
        let host = self.store.get_user(ctx.user_id).await?;
        let property = self.store.create_property(input.into_new(host.id)).await?;
        info!(property = %property.id, title = %property.title, "Created property");
        Ok(PropertyView::render(&property, &host))
    }

    pub async fn create_property_json(
        &self,
        ctx: &RequestContext,
        body: &str,
    ) -> Result<PropertyView> {
        let input: PropertyInput = serde_json::from_str(body)?;
        self.create_property(ctx, input).await
    }

    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, property = %id))]
    pub async fn update_property(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: PropertyInput,
    ) -> Result<PropertyView> {
        input.validate()?;
        let existing = self.store.get_property(id).await?;
        let property = self.store.update_property(input.apply(existing)).await?;
        info!("Updated property");
        self.render_property(&property).await
    }

    pub async fn get_property(&self, id: Uuid) -> Result<PropertyDetailView> {
        let property = self.store.get_property(id).await?;
        let base = self.render_property(&property).await?;
        let bookings = self
            .store
            .query_bookings(BookingFilter {
                property: Some(id),
                ..Default::default()
            })
            .await?;
        Ok(PropertyDetailView::render(base, &bookings))
    }

    pub async fn list_properties(&self, filter: PropertyFilter) -> Result<Vec<PropertyView>> {
        let properties = self.store.query_properties(filter).await?;
        let mut hosts: HashMap<Uuid, User> = HashMap::new();
        let mut views = Vec::with_capacity(properties.len());

        for property in &properties {
            if !hosts.contains_key(&property.host) {
                let host = self.store.get_user(property.host).await?;
                hosts.insert(host.id, host);
            }
            if let Some(host) = hosts.get(&property.host) {
                views.push(PropertyView::render(property, host));
            }
        }
        Ok(views)
    }

    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, property = %id))]
    pub async fn delete_property(&self, ctx: &RequestContext, id: Uuid) -> Result<DeleteSummary> {
        let summary = self.store.delete_property(id).await?;
        info!(?summary, "Deleted property");
        Ok(summary)
    }

    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, user = %ctx.user_id))]
    pub async fn create_booking(
        &self,
        ctx: &RequestContext,
        input: BookingInput,
    ) -> Result<BookingView> {
        // Fast path for a clear error; the store re-checks overlap atomically
        validate_booking(&*self.store, &input.candidate(), None).await?;

        let booking = self.store.create_booking(input.into_new(ctx.user_id)).await?;
        info!(
            booking = %booking.id,
            property = %booking.property,
            nights = booking.nights(),
            "Created booking"
        );
        self.render_booking(&booking).await
    }

    pub async fn create_booking_json(
        &self,
        ctx: &RequestContext,
        body: &str,
    ) -> Result<BookingView> {
        let input: BookingInput = serde_json::from_str(body)?;
        self.create_booking(ctx, input).await
    }

    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, booking = %id))]
    pub async fn update_booking(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        input: BookingInput,
    ) -> Result<BookingView> {
        let existing = self.store.get_booking(id).await?;
        validate_booking(&*self.store, &input.candidate(), Some(id)).await?;

        let booking = self
            .store
            .update_booking(input.apply(ctx.user_id, existing))
            .await?;
        info!("Updated booking");
        self.render_booking(&booking).await
    }

    pub async fn get_booking(&self, id: Uuid) -> Result<BookingView> {
        let booking = self.store.get_booking(id).await?;
        self.render_booking(&booking).await
    }

    pub async fn list_bookings(&self, filter: BookingFilter) -> Result<Vec<BookingView>> {
        let bookings = self.store.query_bookings(filter).await?;
        let mut rendered: HashMap<Uuid, PropertyView> = HashMap::new();
        let mut views = Vec::with_capacity(bookings.len());

        for booking in &bookings {
            let details = match rendered.get(&booking.property) {
                Some(view) => view.clone(),
                None => {
                    let property = self.store.get_property(booking.property).await?;
                    let view = self.render_property(&property).await?;
                    rendered.insert(property.id, view.clone());
                    view
                }
            };
            views.push(BookingView::render(booking, details));
        }
        Ok(views)
    }

    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, booking = %id))]
    pub async fn delete_booking(&self, ctx: &RequestContext, id: Uuid) -> Result<DeleteSummary> {
        let summary = self.store.delete_booking(id).await?;
        info!(?summary, "Deleted booking");
        Ok(summary)
    }

    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, user = %ctx.user_id))]
    pub async fn create_review(
        &self,
        ctx: &RequestContext,
        input: ReviewInput,
    ) -> Result<ReviewView> {
        input.validate()?;
        let review = self.store.create_review(input.into_new(ctx.user_id)).await?;
        info!(review = %review.id, rating = review.rating, "Created review");
        Ok(ReviewView::from(&review))
    }

    pub async fn list_reviews(&self, filter: ReviewFilter) -> Result<Vec<ReviewView>> {
        let reviews = self.store.query_reviews(filter).await?;
        Ok(reviews.iter().map(ReviewView::from).collect())
    }

    #[instrument(skip_all, fields(correlation_id = %ctx.correlation_id, review = %id))]
    pub async fn delete_review(&self, ctx: &RequestContext, id: Uuid) -> Result<DeleteSummary> {
        let summary = self.store.delete_review(id).await?;
        info!("Deleted review");
        Ok(summary)
    }
}
