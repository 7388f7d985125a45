//! [`BlockTemplateFeed`] tells the session layer when fresh work is available.

use crate::{BridgeActor, Metrics, WorkReadyHandler};
use async_trait::async_trait;
use bridge_node::{
    ConnectionSupervisor, NewBlockTemplateHandler, NewBlockTemplateNotification, NodeClient,
    NodeConnector, NodeError, NotificationSubscription, ReconnectOutcome, SyncMonitor,
};
use derive_more::Display;
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::{
    sync::Notify,
    time::{Instant, Interval, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// States of the feed loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedState {
    /// Checking that the node is synced before waiting for the next event.
    Polling,
    /// Racing push notifications against the fallback ticker.
    AwaitingEvent,
    /// Reconnecting failed; waiting the backoff before the next sync check.
    Degraded(Duration),
    /// Cancelled.
    Stopped,
}

/// How the feed learns about new block templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedMode {
    /// Node notifications plus the fallback ticker.
    Push,
    /// The fallback ticker only; the node refused the notification registration.
    TimerOnly,
}

/// What caused a work-ready signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum WorkTrigger {
    /// The node pushed a new block template notification.
    #[display("push")]
    Push,
    /// The maximum work staleness elapsed without a notification.
    #[display("timer")]
    Timer,
}

/// Races new block template notifications from the node against a fallback ticker and invokes
/// the [`WorkReadyHandler`] whenever either fires.
///
/// Before each wait the node must report itself synced. If the sync check fails the feed
/// reconnects, backing off while the node stays unreachable or keeps failing right after a
/// successful reconnect. The handler is never invoked from the degraded state.
#[derive(Debug)]
pub struct BlockTemplateFeed<K: NodeConnector, H> {
    connection: Arc<ConnectionSupervisor<K>>,
    sync: SyncMonitor<K>,
    handler: H,
    max_work_staleness: Duration,
    reconnect_retry_interval: Duration,
    cancel_token: CancellationToken,
    new_template: Arc<Notify>,
    subscription: Option<NotificationSubscription>,
    /// Set by a successful reconnect, cleared by the next sync check.
    reconnected: bool,
}

impl<K, H> BlockTemplateFeed<K, H>
where
    K: NodeConnector,
    H: WorkReadyHandler,
{
    /// Creates a new [`BlockTemplateFeed`].
    pub fn new(
        connection: Arc<ConnectionSupervisor<K>>,
        handler: H,
        max_work_staleness: Duration,
        sync_retry_interval: Duration,
        reconnect_retry_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        let sync = SyncMonitor::new(connection.clone(), sync_retry_interval, cancel_token.clone());
        Self {
            connection,
            sync,
            handler,
            max_work_staleness,
            reconnect_retry_interval,
            cancel_token,
            new_template: Arc::new(Notify::new()),
            subscription: None,
            reconnected: false,
        }
    }

    /// Registers for new block template notifications on the current client.
    ///
    /// Notifications only store a wake-up permit, so any burst arriving while the handler runs
    /// collapses into a single pending signal. Returns `None` if cancelled.
    async fn register(&mut self) -> Option<FeedMode> {
        let new_template = self.new_template.clone();
        let on_notification: NewBlockTemplateHandler =
            Arc::new(move |_: NewBlockTemplateNotification| new_template.notify_one());

        let registration = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return None,
            registration = Self::subscribe(&self.connection, on_notification) => registration,
        };

        let mode = match registration {
            Ok(subscription) => {
                self.subscription = Some(subscription);
                info!(target: "bridge::feed", "Registered for new block template notifications");
                FeedMode::Push
            }
            Err(err) => {
                self.subscription = None;
                error!(
                    target: "bridge::feed",
                    %err,
                    fallback_interval = ?self.max_work_staleness,
                    "Failed to register for new block template notifications, running on the fallback ticker only"
                );
                FeedMode::TimerOnly
            }
        };
        Metrics::set_push_enabled(mode == FeedMode::Push);
        Some(mode)
    }

    async fn subscribe(
        connection: &ConnectionSupervisor<K>,
        handler: NewBlockTemplateHandler,
    ) -> Result<NotificationSubscription, NodeError> {
        connection
            .client()?
            .register_for_new_block_template_notifications(handler)
            .await
            .map_err(NodeError::Registration)
    }

    fn push_active(&self) -> bool {
        self.subscription.as_ref().is_some_and(NotificationSubscription::is_active)
    }

    async fn poll(&mut self) -> FeedState {
        let synced = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return FeedState::Stopped,
            synced = self.sync.wait_for_sync(false) => synced,
        };

        let reconnected = std::mem::take(&mut self.reconnected);
        match synced {
            Ok(()) => FeedState::AwaitingEvent,
            Err(NodeError::Cancelled) => FeedState::Stopped,
            Err(err) if reconnected => {
                warn!(
                    target: "bridge::feed",
                    %err,
                    retry_in = ?self.reconnect_retry_interval,
                    "Node sync check failed right after reconnecting"
                );
                FeedState::Degraded(self.reconnect_retry_interval)
            }
            Err(err) => {
                warn!(target: "bridge::feed", %err, "Node sync check failed, reconnecting");
                self.reconnect().await
            }
        }
    }

    async fn reconnect(&mut self) -> FeedState {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return FeedState::Stopped,
            outcome = self.connection.reconnect() => outcome,
        };

        match outcome {
            Ok(outcome) => {
                self.reconnected = true;
                // A fresh client has no registrations, and an in-place reconnect may have failed
                // to renew ours.
                let renew = outcome == ReconnectOutcome::Replaced || !self.push_active();
                if renew && self.register().await.is_none() {
                    return FeedState::Stopped;
                }
                FeedState::Polling
            }
            Err(err) => {
                warn!(
                    target: "bridge::feed",
                    %err,
                    retry_in = ?self.reconnect_retry_interval,
                    "Failed to reconnect to node"
                );
                FeedState::Degraded(self.reconnect_retry_interval)
            }
        }
    }

    async fn await_event(&mut self, ticker: &mut Interval) -> FeedState {
        let trigger = tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => return FeedState::Stopped,
            _ = self.new_template.notified() => {
                // A push postpones the next fallback by a full interval.
                ticker.reset();
                WorkTrigger::Push
            }
            _ = ticker.tick() => WorkTrigger::Timer,
        };

        debug!(target: "bridge::feed", %trigger, "New work available");
        Metrics::record_work_ready(trigger);
        self.handler.on_work_ready();
        FeedState::Polling
    }

    async fn back_off(&self, backoff: Duration) -> FeedState {
        tokio::select! {
            biased;
            _ = self.cancel_token.cancelled() => FeedState::Stopped,
            _ = tokio::time::sleep(backoff) => FeedState::Polling,
        }
    }
}

#[async_trait]
impl<K, H> BridgeActor for BlockTemplateFeed<K, H>
where
    K: NodeConnector,
    H: WorkReadyHandler + 'static,
{
    type Error = Infallible;

    async fn start(mut self) -> Result<(), Self::Error> {
        info!(
            target: "bridge::feed",
            max_work_staleness = ?self.max_work_staleness,
            "Starting block template feed"
        );

        let mut state = match self.register().await {
            Some(mode) => {
                debug!(target: "bridge::feed", ?mode, "Block template feed mode");
                FeedState::Polling
            }
            None => FeedState::Stopped,
        };

        let mut ticker =
            interval_at(Instant::now() + self.max_work_staleness, self.max_work_staleness);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            state = match state {
                FeedState::Polling => self.poll().await,
                FeedState::AwaitingEvent => self.await_event(&mut ticker).await,
                FeedState::Degraded(backoff) => self.back_off(backoff).await,
                FeedState::Stopped => break,
            };
        }

        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        info!(target: "bridge::feed", "Block template feed stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_node::{
        ClientError,
        test_utils::{MockNodeClient, node_info, supervisor_with},
    };
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };
    use tokio::time::sleep;

    const STALENESS: Duration = Duration::from_secs(30);
    const RETRY: Duration = Duration::from_secs(5);

    /// Records the offset from `started` of every work-ready signal.
    #[derive(Clone)]
    struct Recorder {
        started: Instant,
        calls: Arc<Mutex<Vec<Duration>>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self { started: Instant::now(), calls: Arc::default() }
        }

        fn handler(&self) -> impl WorkReadyHandler + 'static {
            let started = self.started;
            let calls = self.calls.clone();
            move || calls.lock().unwrap().push(started.elapsed())
        }

        fn calls(&self) -> Vec<Duration> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn assert_near(calls: &[Duration], expected_secs: &[u64]) {
        assert_eq!(calls.len(), expected_secs.len(), "calls at {calls:?}");
        for (call, expected) in calls.iter().zip(expected_secs) {
            let expected = Duration::from_secs(*expected);
            assert!(
                *call >= expected && *call < expected + Duration::from_secs(1),
                "call at {call:?}, expected near {expected:?}"
            );
        }
    }

    fn synced_client() -> MockNodeClient {
        let mut client = MockNodeClient::new();
        client.expect_get_info().returning(|| Ok(node_info(true)));
        client
    }

    fn accept_registration(client: &mut MockNodeClient, token: CancellationToken) {
        client
            .expect_register_for_new_block_template_notifications()
            .returning(move |_| Ok(NotificationSubscription::new(token.clone())));
    }

    async fn run_feed(
        client: MockNodeClient,
        recorder: &Recorder,
        cancel_token: CancellationToken,
    ) -> tokio::task::JoinHandle<Result<(), Infallible>> {
        let feed = BlockTemplateFeed::new(
            supervisor_with(client).await,
            recorder.handler(),
            STALENESS,
            RETRY,
            RETRY,
            cancel_token,
        );
        tokio::spawn(feed.start())
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_delivers_work_every_interval_without_pushes() {
        let mut client = synced_client();
        accept_registration(&mut client, CancellationToken::new());

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        sleep(Duration::from_secs(95)).await;
        cancel_token.cancel();
        feed.await.unwrap().unwrap();

        assert_near(&recorder.calls(), &[30, 60, 90]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_push_delivers_immediately_and_postpones_fallback() {
        let pushed: Arc<Mutex<Option<NewBlockTemplateHandler>>> = Arc::default();
        let mut client = synced_client();
        let slot = pushed.clone();
        client.expect_register_for_new_block_template_notifications().returning(move |handler| {
            *slot.lock().unwrap() = Some(handler);
            Ok(NotificationSubscription::new(CancellationToken::new()))
        });

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        sleep(Duration::from_secs(5)).await;
        let push = pushed.lock().unwrap().clone().unwrap();
        push(NewBlockTemplateNotification {});

        sleep(Duration::from_secs(65)).await;
        cancel_token.cancel();
        feed.await.unwrap().unwrap();

        assert_near(&recorder.calls(), &[5, 35, 65]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_pushes_is_coalesced() {
        let pushed: Arc<Mutex<Option<NewBlockTemplateHandler>>> = Arc::default();
        let mut client = synced_client();
        let slot = pushed.clone();
        client.expect_register_for_new_block_template_notifications().returning(move |handler| {
            *slot.lock().unwrap() = Some(handler);
            Ok(NotificationSubscription::new(CancellationToken::new()))
        });

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        sleep(Duration::from_secs(5)).await;
        let push = pushed.lock().unwrap().clone().unwrap();
        for _ in 0..10 {
            push(NewBlockTemplateNotification {});
        }

        sleep(Duration::from_secs(10)).await;
        cancel_token.cancel();
        feed.await.unwrap().unwrap();

        // One signal is delivered to the waiting feed, at most one more stays pending.
        let calls = recorder.calls();
        assert!((1..=2).contains(&calls.len()), "calls at {calls:?}");
        assert!(calls.iter().all(|call| call.as_secs() == 5), "calls at {calls:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsynced_node_never_receives_work() {
        let mut client = MockNodeClient::new();
        client.expect_get_info().returning(|| Ok(node_info(false)));
        accept_registration(&mut client, CancellationToken::new());

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        sleep(Duration::from_secs(95)).await;
        cancel_token.cancel();
        feed.await.unwrap().unwrap();

        assert!(recorder.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_node_degrades_then_resumes_after_reconnect() {
        let node_up = Arc::new(AtomicBool::new(true));
        let connected = Arc::new(AtomicBool::new(true));
        let reconnects = Arc::new(AtomicUsize::new(0));

        let mut client = MockNodeClient::new();
        let (up, link) = (node_up.clone(), connected.clone());
        client.expect_get_info().returning(move || {
            if up.load(Ordering::SeqCst) && link.load(Ordering::SeqCst) {
                Ok(node_info(true))
            } else {
                link.store(false, Ordering::SeqCst);
                Err(ClientError::Disconnected)
            }
        });
        let (up, link, attempts) = (node_up.clone(), connected.clone(), reconnects.clone());
        client.expect_reconnect().returning(move || {
            attempts.fetch_add(1, Ordering::SeqCst);
            if up.load(Ordering::SeqCst) {
                link.store(true, Ordering::SeqCst);
                Ok(())
            } else {
                Err(ClientError::Disconnected)
            }
        });
        accept_registration(&mut client, CancellationToken::new());

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        sleep(Duration::from_secs(40)).await;
        node_up.store(false, Ordering::SeqCst);
        sleep(Duration::from_secs(62)).await;
        node_up.store(true, Ordering::SeqCst);
        sleep(Duration::from_secs(28)).await;
        cancel_token.cancel();
        feed.await.unwrap().unwrap();

        // The tick at 60s was armed by the sync check at 30s. From then on the node is
        // unreachable until the degraded loop's attempt at 105s succeeds, which delivers the
        // overdue tick right away.
        assert_near(&recorder.calls(), &[30, 60, 105]);
        assert!(reconnects.load(Ordering::SeqCst) > 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_work_and_unsubscribes() {
        let token = CancellationToken::new();
        let mut client = synced_client();
        accept_registration(&mut client, token.clone());

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        sleep(Duration::from_secs(45)).await;
        assert!(!token.is_cancelled());
        cancel_token.cancel();
        feed.await.unwrap().unwrap();

        sleep(Duration::from_secs(60)).await;
        assert_near(&recorder.calls(), &[30]);
        assert!(token.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_failing_after_reconnect_backs_off() {
        let reconnects = Arc::new(AtomicUsize::new(0));

        let mut client = MockNodeClient::new();
        client.expect_get_info().returning(|| Err(ClientError::Disconnected));
        let attempts = reconnects.clone();
        client.expect_reconnect().returning(move || {
            attempts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        accept_registration(&mut client, CancellationToken::new());

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        sleep(Duration::from_secs(62)).await;
        cancel_token.cancel();
        feed.await.unwrap().unwrap();

        // One reconnect per backoff period: at 0s, 5s, ..., 60s.
        let reconnects = reconnects.load(Ordering::SeqCst);
        assert!((10..=13).contains(&reconnects), "{reconnects} reconnects");
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_discards_pending_push_and_overdue_tick() {
        let pushed: Arc<Mutex<Option<NewBlockTemplateHandler>>> = Arc::default();
        let mut client = MockNodeClient::new();
        client.expect_get_info().returning(|| Ok(node_info(false)));
        let slot = pushed.clone();
        client.expect_register_for_new_block_template_notifications().returning(move |handler| {
            *slot.lock().unwrap() = Some(handler);
            Ok(NotificationSubscription::new(CancellationToken::new()))
        });

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        // The tick at 30s is overdue and a push is pending while the feed waits for sync.
        sleep(Duration::from_secs(40)).await;
        let push = pushed.lock().unwrap().clone().unwrap();
        push(NewBlockTemplateNotification {});
        sleep(Duration::from_secs(1)).await;

        cancel_token.cancel();
        feed.await.unwrap().unwrap();
        sleep(Duration::from_secs(60)).await;

        assert!(recorder.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lost_subscription_is_renewed_after_reconnect() {
        let tokens: Arc<Mutex<Vec<CancellationToken>>> = Arc::default();
        let drop_link = Arc::new(AtomicBool::new(false));

        let mut client = MockNodeClient::new();
        let link = drop_link.clone();
        client.expect_get_info().returning(move || {
            if link.swap(false, Ordering::SeqCst) {
                Err(ClientError::Disconnected)
            } else {
                Ok(node_info(true))
            }
        });
        client.expect_reconnect().times(1).returning(|| Ok(()));
        let issued = tokens.clone();
        client.expect_register_for_new_block_template_notifications().times(2).returning(
            move |_| {
                let token = CancellationToken::new();
                issued.lock().unwrap().push(token.clone());
                Ok(NotificationSubscription::new(token))
            },
        );

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        // The client could not renew the subscription and the next sync check fails.
        sleep(Duration::from_secs(10)).await;
        tokens.lock().unwrap()[0].cancel();
        drop_link.store(true, Ordering::SeqCst);

        sleep(Duration::from_secs(35)).await;
        let issued = tokens.lock().unwrap().clone();
        assert_eq!(issued.len(), 2);
        assert!(!issued[1].is_cancelled());

        cancel_token.cancel();
        feed.await.unwrap().unwrap();
        assert_near(&recorder.calls(), &[30]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_registration() {
        let mut client = MockNodeClient::new();
        client.expect_register_for_new_block_template_notifications().never();
        client.expect_get_info().never();

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        cancel_token.cancel();
        let feed = run_feed(client, &recorder, cancel_token).await;

        feed.await.unwrap().unwrap();
        assert!(recorder.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_failure_falls_back_to_timer() {
        let mut client = synced_client();
        client
            .expect_register_for_new_block_template_notifications()
            .returning(|_| Err(ClientError::Disconnected));

        let recorder = Recorder::new();
        let cancel_token = CancellationToken::new();
        let feed = run_feed(client, &recorder, cancel_token.clone()).await;

        sleep(Duration::from_secs(65)).await;
        cancel_token.cancel();
        feed.await.unwrap().unwrap();

        assert_near(&recorder.calls(), &[30, 60]);
    }
}
