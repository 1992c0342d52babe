//! Greeting a newly connected subscriber.
//!
//! A new subscriber first gets the recent-activity count, then a batch from
//! its own harvest, both addressed to it alone. This runs on the connection's
//! task and is independent of the scheduler's cadence.

use crate::fetch::FetchDocument;
use crate::hub::{Publisher, SubscriberId};
use crate::models::ServerEvent;
use crate::pipeline::Harvest;
use crate::store::Store;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Deliver the initial count and a fresh batch to `subscriber`.
///
/// A failure at either step becomes an `error` event for this subscriber;
/// a failed count does not prevent the batch from being sent.
#[instrument(level = "info", skip_all, fields(subscriber = subscriber))]
pub async fn greet<F, S, P>(
    subscriber: SubscriberId,
    fetcher: &F,
    store: &S,
    publisher: &P,
    harvest: &Harvest,
    window: Duration,
) where
    F: FetchDocument,
    S: Store,
    P: Publisher,
{
    let count_event = match store.count_since(window).await {
        Ok(count) => ServerEvent::InitialCount { count },
        Err(e) => {
            error!(error = %e, "Error getting recent story count");
            ServerEvent::Error {
                message: "Error fetching recent story count".to_string(),
            }
        }
    };
    if let Err(e) = publisher.publish_to_one(subscriber, count_event).await {
        warn!(error = %e, "Subscriber left before the initial count");
        return;
    }

    let stories_event = match harvest.run(fetcher).await {
        Ok(stories) => {
            info!(stories = stories.len(), "Sending initial stories");
            ServerEvent::NewStories { stories }
        }
        Err(e) => {
            error!(error = %e, "Error handling new connection");
            ServerEvent::Error {
                message: "Error fetching initial data".to_string(),
            }
        }
    };
    if let Err(e) = publisher.publish_to_one(subscriber, stories_event).await {
        warn!(error = %e, "Subscriber left before the initial stories");
    }
}
