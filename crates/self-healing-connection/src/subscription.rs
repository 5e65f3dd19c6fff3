use crate::error::SubscriptionError;
use crate::events::FaultEvent;
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// A handle receiving [`FaultEvent`]s for one connection.
///
/// Each subscription receives every event published after it was created,
/// in generation order. Events published before subscribing are not
/// replayed.
#[derive(Debug)]
pub struct FaultSubscription {
    receiver: broadcast::Receiver<FaultEvent>,
}

impl FaultSubscription {
    pub(crate) fn new(receiver: broadcast::Receiver<FaultEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next fault event.
    pub async fn recv(&mut self) -> Result<FaultEvent, SubscriptionError> {
        self.receiver.recv().await.map_err(|err| match err {
            RecvError::Lagged(missed) => SubscriptionError::Lagged(missed),
            RecvError::Closed => SubscriptionError::Closed,
        })
    }

    /// Returns the next event if one is already queued.
    pub fn try_recv(&mut self) -> Result<Option<FaultEvent>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Lagged(missed)) => Err(SubscriptionError::Lagged(missed)),
            Err(TryRecvError::Closed) => Err(SubscriptionError::Closed),
        }
    }

    /// Converts the subscription into a stream that reports lag.
    ///
    /// A subscriber that falls more than `event_capacity` events behind
    /// yields `Err(SubscriptionError::Lagged(n))` for the `n` events it lost,
    /// then carries on with the oldest retained event. The stream ends once
    /// the connection is dropped.
    pub fn into_results_stream(
        self,
    ) -> impl Stream<Item = Result<FaultEvent, SubscriptionError>> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            match subscription.recv().await {
                Err(SubscriptionError::Closed) => None,
                item => Some((item, subscription)),
            }
        })
    }

    /// Converts the subscription into a stream of events.
    ///
    /// Lossy: events dropped because the subscriber lagged are skipped
    /// without a trace in the stream (a warning is logged). Use
    /// [`into_results_stream`](Self::into_results_stream) when every
    /// regeneration must be accounted for. The stream ends once the
    /// connection is dropped.
    pub fn into_stream(self) -> impl Stream<Item = FaultEvent> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            loop {
                match subscription.recv().await {
                    Ok(event) => return Some((event, subscription)),
                    Err(SubscriptionError::Lagged(_missed)) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(missed = _missed, "fault subscriber lagged");
                        continue;
                    }
                    Err(SubscriptionError::Closed) => return None,
                }
            }
        })
    }
}

impl Clone for FaultSubscription {
    /// The clone receives only events published after it was created.
    fn clone(&self) -> Self {
        Self {
            receiver: self.receiver.resubscribe(),
        }
    }
}
