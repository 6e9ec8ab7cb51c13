//! In-process pub/sub for board and card changes.
//!
//! Every topic owns a `tokio::sync::broadcast` channel that is created on the
//! first subscription and dropped again once its last subscriber goes away.
//! Emitting to a topic nobody listens to is a no-op. Nothing is persisted, so
//! a subscriber only ever sees events emitted after it subscribed.

mod types;

use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::BoxStream;
use tokio::sync::broadcast::{self, error::RecvError};
use utils::tracked_id::TrackedIdGenerator;

pub use types::*;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_MAX_SUBSCRIBERS_PER_TOPIC: usize = 1000;
/// Upper bound on buffered events per topic.
pub const MAX_CHANNEL_CAPACITY: usize = 65_536;

struct Inner {
    topics: DashMap<Topic, broadcast::Sender<TrackedEvent>>,
    ids: TrackedIdGenerator,
    capacity: usize,
    max_subscribers: usize,
}

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_SUBSCRIBERS_PER_TOPIC)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.inner.topics.len())
            .field("capacity", &self.inner.capacity)
            .finish()
    }
}

impl EventBus {
    pub fn new(capacity: usize, max_subscribers: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: DashMap::new(),
                ids: TrackedIdGenerator::new(),
                capacity: capacity.clamp(1, MAX_CHANNEL_CAPACITY),
                max_subscribers,
            }),
        }
    }

    /// Deliver `event` to every current subscriber of `topic`.
    ///
    /// The tracked id is drawn while the topic entry is locked, so subscribers
    /// of one topic see ids in increasing order. Returns the number of
    /// receivers the event was handed to.
    pub fn emit(&self, topic: &Topic, event: AnyEvent) -> usize {
        let event_type = event.event_type();
        let sent = {
            let Some(sender) = self.inner.topics.get_mut(topic) else {
                return 0;
            };
            sender.send(TrackedEvent {
                id: self.inner.ids.next_id().to_string(),
                event,
            })
        };

        match sent {
            Ok(delivered) => {
                tracing::trace!(%topic, event_type, delivered, "event emitted");
                delivered
            }
            Err(_) => {
                self.prune_topic(topic);
                0
            }
        }
    }

    pub fn emit_board_event(&self, event: BoardEvent) -> usize {
        let topic = Topic::Board(event.board_id());
        self.emit(&topic, AnyEvent::Board(event))
    }

    pub fn emit_card_event(&self, event: CardEvent) -> usize {
        let topic = Topic::Card(event.card_id());
        self.emit(&topic, AnyEvent::Card(event))
    }

    pub fn subscribe(&self, topic: Topic) -> Subscription {
        // Subscribe under the entry lock; `prune_topic` must not see a zero
        // receiver count for a channel that is about to gain one.
        let (receiver, count) = {
            let sender = self
                .inner
                .topics
                .entry(topic)
                .or_insert_with(|| broadcast::channel(self.inner.capacity).0);
            let receiver = sender.subscribe();
            (receiver, sender.receiver_count())
        };
        if count > self.inner.max_subscribers {
            tracing::warn!(
                %topic,
                subscribers = count,
                limit = self.inner.max_subscribers,
                "topic has more subscribers than the configured limit"
            );
        } else {
            tracing::debug!(%topic, subscribers = count, "subscribed");
        }

        Subscription {
            topic,
            receiver: Some(receiver),
            bus: self.clone(),
        }
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.inner
            .topics
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.inner.topics.len()
    }

    /// Drop every channel that has no receivers left.
    pub fn prune_idle(&self) -> usize {
        let before = self.inner.topics.len();
        self.inner
            .topics
            .retain(|_, sender| sender.receiver_count() > 0);
        before.saturating_sub(self.inner.topics.len())
    }

    fn prune_topic(&self, topic: &Topic) {
        if self
            .inner
            .topics
            .remove_if(topic, |_, sender| sender.receiver_count() == 0)
            .is_some()
        {
            tracing::debug!(%topic, "removed idle topic");
        }
    }
}

/// A live subscription to one topic. Dropping it unsubscribes.
pub struct Subscription {
    topic: Topic,
    receiver: Option<broadcast::Receiver<TrackedEvent>>,
    bus: EventBus,
}

impl Subscription {
    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Next event, or `None` once the channel is gone.
    ///
    /// A subscriber that falls behind the channel capacity skips the missed
    /// events rather than erroring.
    pub async fn recv(&mut self) -> Option<TrackedEvent> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(topic = %self.topic, skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(mut self) -> BoxStream<'static, TrackedEvent> {
        Box::pin(async_stream::stream! {
            while let Some(event) = self.recv().await {
                yield event;
            }
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        drop(self.receiver.take());
        self.bus.prune_topic(&self.topic);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::StreamExt;
    use tokio::time::timeout;

    use super::*;

    fn card_created(board_id: i64, card: &str) -> BoardEvent {
        BoardEvent::CardCreated(BoardCardPayload {
            board_id,
            card_public_id: card.to_string(),
            list_public_id: Some("llllllllllll".to_string()),
            changes: None,
        })
    }

    fn comment_added(card_id: i64) -> CardEvent {
        CardEvent::CommentAdded(CardCommentPayload {
            card_id,
            card_public_id: "cccccccccccc".to_string(),
            comment_public_id: "mmmmmmmmmmmm".to_string(),
            comment: Some("hello".to_string()),
        })
    }

    #[tokio::test]
    async fn emit_without_listeners_is_a_no_op() {
        let bus = EventBus::default();
        assert_eq!(bus.emit_board_event(card_created(1, "aaaaaaaaaaaa")), 0);
        assert_eq!(bus.topic_count(), 0);
    }

    #[tokio::test]
    async fn subscribers_only_see_their_topic() {
        let bus = EventBus::default();
        let mut board_one = bus.subscribe(Topic::Board(1));
        let mut board_two = bus.subscribe(Topic::Board(2));
        let mut card_one = bus.subscribe(Topic::Card(1));

        assert_eq!(bus.emit_board_event(card_created(1, "aaaaaaaaaaaa")), 1);
        assert_eq!(bus.emit_card_event(comment_added(1)), 1);

        let received = board_one.recv().await.unwrap();
        assert_eq!(received.event.event_type(), "card.created");
        let received = card_one.recv().await.unwrap();
        assert_eq!(received.event.event_type(), "comment.added");

        let nothing = timeout(Duration::from_millis(50), board_two.recv()).await;
        assert!(nothing.is_err(), "board 2 must not receive board 1 events");
    }

    #[tokio::test]
    async fn late_subscribers_miss_earlier_events() {
        let bus = EventBus::default();
        let _early = bus.subscribe(Topic::Board(5));
        bus.emit_board_event(card_created(5, "aaaaaaaaaaaa"));

        let mut late = bus.subscribe(Topic::Board(5));
        bus.emit_board_event(card_created(5, "bbbbbbbbbbbb"));

        let received = late.recv().await.unwrap();
        match received.event {
            AnyEvent::Board(BoardEvent::CardCreated(payload)) => {
                assert_eq!(payload.card_public_id, "bbbbbbbbbbbb");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn all_subscribers_share_event_ids() {
        let bus = EventBus::default();
        let mut a = bus.subscribe(Topic::Board(1));
        let mut b = bus.subscribe(Topic::Board(1));

        assert_eq!(bus.emit_board_event(card_created(1, "aaaaaaaaaaaa")), 2);
        bus.emit_board_event(card_created(1, "bbbbbbbbbbbb"));

        let (a1, b1) = (a.recv().await.unwrap(), b.recv().await.unwrap());
        let (a2, b2) = (a.recv().await.unwrap(), b.recv().await.unwrap());
        assert_eq!(a1.id, b1.id);
        assert_eq!(a2.id, b2.id);
        assert!(a2.id.parse::<u64>().unwrap() > a1.id.parse::<u64>().unwrap());
    }

    #[tokio::test]
    async fn dropping_last_subscriber_removes_topic() {
        let bus = EventBus::default();
        let first = bus.subscribe(Topic::Card(3));
        let second = bus.subscribe(Topic::Card(3));
        assert_eq!(bus.subscriber_count(&Topic::Card(3)), 2);

        drop(first);
        assert_eq!(bus.topic_count(), 1);
        assert_eq!(bus.subscriber_count(&Topic::Card(3)), 1);

        drop(second);
        assert_eq!(bus.topic_count(), 0);
        assert_eq!(bus.emit_card_event(comment_added(3)), 0);
    }

    #[tokio::test]
    async fn stream_yields_events_and_unsubscribes_on_drop() {
        let bus = EventBus::default();
        let mut stream = bus.subscribe(Topic::Board(9)).into_stream();

        bus.emit_board_event(card_created(9, "aaaaaaaaaaaa"));
        let event = timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.event.event_type(), "card.created");

        drop(stream);
        assert_eq!(bus.topic_count(), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_missed_events() {
        let bus = EventBus::new(2, 10);
        let mut slow = bus.subscribe(Topic::Board(1));

        for n in 0..5 {
            bus.emit_board_event(card_created(1, &format!("card{n:08}")));
        }

        let received = slow.recv().await.unwrap();
        match received.event {
            AnyEvent::Board(BoardEvent::CardCreated(payload)) => {
                assert_eq!(payload.card_public_id, "card00000003");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn oversized_capacity_is_clamped() {
        let bus = EventBus::new(usize::MAX, 10);
        let _sub = bus.subscribe(Topic::Board(1));
        assert_eq!(bus.emit_board_event(card_created(1, "aaaaaaaaaaaa")), 1);
    }

    #[tokio::test]
    async fn exceeding_subscriber_limit_still_subscribes() {
        let bus = EventBus::new(8, 1);
        let _a = bus.subscribe(Topic::Board(1));
        let _b = bus.subscribe(Topic::Board(1));
        assert_eq!(bus.subscriber_count(&Topic::Board(1)), 2);
    }

    #[test]
    fn resubscribing_while_last_subscriber_drops_stays_attached() {
        let bus = EventBus::default();
        for _ in 0..2_000 {
            let first = bus.subscribe(Topic::Board(1));
            let second = std::thread::scope(|scope| {
                scope.spawn(move || drop(first));
                bus.subscribe(Topic::Board(1))
            });

            assert_eq!(bus.subscriber_count(&Topic::Board(1)), 1);
            assert_eq!(bus.emit_board_event(card_created(1, "aaaaaaaaaaaa")), 1);
            drop(second);
            assert_eq!(bus.topic_count(), 0);
        }
    }

    #[test]
    fn concurrent_emits_arrive_in_id_order() {
        let bus = EventBus::new(1024, 10);
        let mut sub = bus.subscribe(Topic::Board(1));

        std::thread::scope(|scope| {
            for t in 0..4 {
                let bus = &bus;
                scope.spawn(move || {
                    for n in 0..200 {
                        bus.emit_board_event(card_created(1, &format!("t{t}n{n:07}")));
                    }
                });
            }
        });

        let receiver = sub.receiver.as_mut().unwrap();
        let mut ids = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            ids.push(event.id.parse::<u64>().unwrap());
        }
        assert_eq!(ids.len(), 800);
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "ids out of order");
    }

    #[tokio::test]
    async fn prune_idle_drops_empty_channels() {
        let bus = EventBus::default();
        let mut sub = bus.subscribe(Topic::Board(1));
        // receiver gone, Drop not yet run
        drop(sub.receiver.take());
        assert_eq!(bus.prune_idle(), 1);
        assert_eq!(bus.topic_count(), 0);
    }
}
