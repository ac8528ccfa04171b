//! Notification writer
//!
//! Notifications are append-only rows consumed by the client's inbox.

use tracing::debug;

use crate::db::schemas::{NotificationDoc, NOTIFICATION_COLLECTION};
use crate::db::MongoClient;
use crate::types::Result;

/// Append one notification
pub async fn notify(mongo: &MongoClient, notification: NotificationDoc) -> Result<()> {
    let kind = notification.kind.clone();
    let recipient = notification.user_id.clone();
    mongo
        .collection::<NotificationDoc>(NOTIFICATION_COLLECTION)
        .await?
        .insert_one(notification)
        .await?;
    debug!(kind = %kind, recipient = %recipient, "Notification recorded");
    Ok(())
}
