//! Database queries for alert subscriptions.

use async_trait::async_trait;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::entity::test_subscription::{self as subscription, Entity as Subscription};
use crate::services::subscribers::SubscriberDirectory;
use crate::store::StoreResult;

use super::{classify_db_err, DbPool};

#[async_trait]
impl SubscriberDirectory for DbPool {
    async fn subscribers(&self, test_name: &str) -> StoreResult<Vec<String>> {
        let rows = Subscription::find()
            .filter(subscription::Column::TestName.eq(test_name))
            .filter(subscription::Column::NotificationsEnabled.eq(true))
            .order_by_asc(subscription::Column::Email)
            .all(self.connection())
            .await
            .map_err(classify_db_err)?;

        Ok(rows.into_iter().map(|r| r.email).collect())
    }
}
