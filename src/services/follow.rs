//! Subscription service
//!
//! A user follows authors to see their recipes in the subscriptions feed.
//! Following yourself and following twice are both rejected.

use crate::db::is_unique_violation;
use crate::db::repositories::{FollowRepository, UserRepository};
use crate::models::{ListParams, PagedResult, User};
use crate::serializers::FieldErrors;
use anyhow::Context;
use std::sync::Arc;

pub const SELF_SUBSCRIBE: &str = "You cannot subscribe to yourself.";
pub const ALREADY_SUBSCRIBED: &str = "You are already subscribed to this author.";
pub const NOT_SUBSCRIBED: &str = "You are not subscribed to this author.";

#[derive(Debug, thiserror::Error)]
pub enum FollowServiceError {
    #[error("Author not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

fn rejected(message: &str) -> FollowServiceError {
    FollowServiceError::Validation(FieldErrors::single("errors", message))
}

pub struct FollowService {
    follows: Arc<dyn FollowRepository>,
    users: Arc<dyn UserRepository>,
}

impl FollowService {
    pub fn new(follows: Arc<dyn FollowRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { follows, users }
    }

    async fn author(&self, author_id: i64) -> Result<User, FollowServiceError> {
        self.users
            .get_by_id(author_id)
            .await
            .context("Failed to get author")?
            .ok_or_else(|| FollowServiceError::NotFound(author_id.to_string()))
    }

    /// Follow an author, returning the author
    pub async fn subscribe(&self, user: &User, author_id: i64) -> Result<User, FollowServiceError> {
        let author = self.author(author_id).await?;
        if author.id == user.id {
            return Err(rejected(SELF_SUBSCRIBE));
        }
        if self
            .follows
            .exists(user.id, author.id)
            .await
            .context("Failed to check subscription")?
        {
            return Err(rejected(ALREADY_SUBSCRIBED));
        }

        match self.follows.create(user.id, author.id).await {
            Ok(_) => {
                tracing::info!(user_id = user.id, author_id = author.id, "Subscribed");
                Ok(author)
            }
            Err(e) if is_unique_violation(&e) => Err(rejected(ALREADY_SUBSCRIBED)),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn unsubscribe(&self, user: &User, author_id: i64) -> Result<(), FollowServiceError> {
        let author = self.author(author_id).await?;
        let removed = self
            .follows
            .delete(user.id, author.id)
            .await
            .context("Failed to delete subscription")?;
        if !removed {
            return Err(rejected(NOT_SUBSCRIBED));
        }

        tracing::info!(user_id = user.id, author_id = author.id, "Unsubscribed");
        Ok(())
    }

    /// Authors the user follows, most recently followed first
    pub async fn subscriptions(&self, user: &User, params: &ListParams) -> Result<PagedResult<User>, FollowServiceError> {
        let (authors, total) = self
            .follows
            .list_authors(user.id, params)
            .await
            .context("Failed to list subscriptions")?;
        Ok(PagedResult::new(authors, total, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxFollowRepository, SqlxUserRepository};
    use crate::db::testing::{insert_user, migrated_pool};

    async fn setup() -> (FollowService, User, User) {
        let pool = migrated_pool().await;
        let users = SqlxUserRepository::boxed(pool.clone());
        let reader = insert_user(&pool, "reader").await;
        let chef = insert_user(&pool, "chef").await;
        let reader = users.get_by_id(reader).await.unwrap().unwrap();
        let chef = users.get_by_id(chef).await.unwrap().unwrap();
        (FollowService::new(SqlxFollowRepository::boxed(pool), users), reader, chef)
    }

    fn message(err: FollowServiceError) -> String {
        match err {
            FollowServiceError::Validation(errors) => errors.get("errors").unwrap()[0].clone(),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_unsubscribe() {
        let (service, reader, chef) = setup().await;

        let author = service.subscribe(&reader, chef.id).await.unwrap();
        assert_eq!(author.id, chef.id);

        let page = service.subscriptions(&reader, &ListParams::default()).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].username, "chef");

        service.unsubscribe(&reader, chef.id).await.unwrap();
        assert_eq!(message(service.unsubscribe(&reader, chef.id).await.unwrap_err()), NOT_SUBSCRIBED);
    }

    #[tokio::test]
    async fn test_self_and_duplicate_rejected() {
        let (service, reader, chef) = setup().await;

        assert_eq!(message(service.subscribe(&reader, reader.id).await.unwrap_err()), SELF_SUBSCRIBE);

        service.subscribe(&reader, chef.id).await.unwrap();
        assert_eq!(message(service.subscribe(&reader, chef.id).await.unwrap_err()), ALREADY_SUBSCRIBED);
    }

    #[tokio::test]
    async fn test_unknown_author() {
        let (service, reader, _) = setup().await;
        assert!(matches!(
            service.subscribe(&reader, 404).await,
            Err(FollowServiceError::NotFound(_))
        ));
    }
}
