//! Subscription layer turning raw advertisements into sensor readings.
//!
//! [`ReadingSubscription`] adapts the unfiltered advertisement stream of a
//! [`Scanner`] into validated [`Reading`]s for a single registered consumer.
//! Per event it filters by the advertised device name, gates on the exact
//! frame length, and then decodes. Length mismatches are dropped silently
//! while checksum failures are delivered as error readings; the device
//! firmware behaves this way and consumers rely on the distinction.

use crate::frame::{self, DecodeError, FRAME_LEN};
use crate::reading::Reading;
use crate::scanner::{AdvertisementHandler, DEVICE_NAME, RawAdvertisement, ScanFilter, Scanner};
use std::sync::{Arc, Mutex};

/// Lifecycle states of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// No consumer registered yet.
    Unregistered,
    /// Consumer registered, waiting for the radio readiness signal.
    AwaitingReady,
    /// Scan running, events flowing to the consumer.
    Active,
    /// Scan stopped via [`ReadingSubscription::unsubscribe`].
    Stopped,
}

type ReadingCallback = Arc<dyn Fn(Reading) + Send + Sync + 'static>;

struct Inner {
    scanner: Arc<dyn Scanner>,
    state: Mutex<SubscriptionState>,
    callback: Mutex<Option<ReadingCallback>>,
}

/// Single-subscriber adapter from a raw advertisement stream to readings.
///
/// The scanning collaborator is passed in at construction rather than
/// reached through a process-wide singleton, so tests can substitute a fake.
pub struct ReadingSubscription {
    inner: Arc<Inner>,
}

impl ReadingSubscription {
    pub fn new(scanner: Arc<dyn Scanner>) -> Self {
        ReadingSubscription {
            inner: Arc::new(Inner {
                scanner,
                state: Mutex::new(SubscriptionState::Unregistered),
                callback: Mutex::new(None),
            }),
        }
    }

    /// Register the consumer callback and start scanning.
    ///
    /// If the radio is not ready yet, activation is deferred until the
    /// readiness signal and the scan then starts exactly once, no matter how
    /// many times `subscribe` was called in the meantime.
    ///
    /// This is a single-subscriber design: calling `subscribe` again replaces
    /// the previous callback (last writer wins) without re-registering any
    /// scanner hooks. After [`unsubscribe`](Self::unsubscribe) a new callback
    /// may be registered, but the scan is not restarted.
    pub fn subscribe<F>(&self, on_reading: F)
    where
        F: Fn(Reading) + Send + Sync + 'static,
    {
        *self.inner.callback.lock().unwrap() = Some(Arc::new(on_reading));

        let mut state = self.inner.state.lock().unwrap();
        if *state != SubscriptionState::Unregistered {
            return;
        }

        if self.inner.scanner.is_ready() {
            *state = SubscriptionState::Active;
            drop(state);
            Inner::start_listening(&self.inner);
        } else {
            *state = SubscriptionState::AwaitingReady;
            drop(state);
            let inner = Arc::clone(&self.inner);
            self.inner
                .scanner
                .on_ready(Box::new(move || Inner::radio_ready(&inner)));
        }
    }

    /// Stop the advertisement scan and drop the consumer binding.
    ///
    /// Events already in flight at the scanner may still race in, but none
    /// are delivered once the binding is cleared and no new scan activity is
    /// initiated.
    pub fn unsubscribe(&self) {
        let mut state = self.inner.state.lock().unwrap();
        match *state {
            SubscriptionState::Active => {
                *state = SubscriptionState::Stopped;
                drop(state);
                self.inner.scanner.stop_scanning();
            }
            SubscriptionState::AwaitingReady | SubscriptionState::Unregistered => {
                // Scan never started, nothing to stop at the radio.
                *state = SubscriptionState::Stopped;
                drop(state);
            }
            SubscriptionState::Stopped => return,
        }
        self.inner.callback.lock().unwrap().take();
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SubscriptionState {
        *self.inner.state.lock().unwrap()
    }
}

impl Inner {
    fn radio_ready(inner: &Arc<Inner>) {
        let mut state = inner.state.lock().unwrap();
        if *state != SubscriptionState::AwaitingReady {
            return;
        }
        *state = SubscriptionState::Active;
        drop(state);
        Inner::start_listening(inner);
    }

    fn start_listening(inner: &Arc<Inner>) {
        let events = Arc::clone(inner);
        let handler: AdvertisementHandler =
            Box::new(move |adv| events.handle_advertisement(adv));
        inner.scanner.start_scanning(&ScanFilter::default(), handler);
    }

    fn handle_advertisement(&self, adv: RawAdvertisement) {
        if adv.local_name.as_deref() != Some(DEVICE_NAME) {
            return;
        }
        let Some(payload) = adv.manufacturer_data else {
            return;
        };
        if payload.len() != FRAME_LEN {
            return;
        }

        let reading = match frame::decode(&payload) {
            Ok(fields) => Reading::decoded(adv.device_id, fields),
            Err(error @ DecodeError::ChecksumMismatch { .. }) => {
                Reading::checksum_failure(adv.device_id, error)
            }
            // Length is gated above, so the decoder cannot report it here.
            Err(DecodeError::MalformedLength { .. }) => return,
        };

        // Clone out of the lock so a slow consumer never blocks `subscribe`.
        let callback = self.callback.lock().unwrap().clone();
        if let Some(callback) = callback {
            callback(reading);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::ProbeType;
    use crate::test_utils::{TEST_DEVICE, advertisement, frame};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory scanning collaborator with scripted readiness and events.
    #[derive(Default)]
    struct FakeScanner {
        ready: AtomicBool,
        ready_hooks: Mutex<Vec<Box<dyn FnOnce() + Send>>>,
        handler: Mutex<Option<AdvertisementHandler>>,
        start_calls: AtomicUsize,
        stop_calls: AtomicUsize,
    }

    impl FakeScanner {
        fn ready() -> Self {
            let scanner = FakeScanner::default();
            scanner.ready.store(true, Ordering::SeqCst);
            scanner
        }

        /// Flip to ready and fire every registered one-shot hook.
        fn power_on(&self) {
            self.ready.store(true, Ordering::SeqCst);
            let hooks = std::mem::take(&mut *self.ready_hooks.lock().unwrap());
            for hook in hooks {
                hook();
            }
        }

        /// Push one advertisement through the registered handler.
        fn advertise(&self, adv: RawAdvertisement) {
            let handler = self.handler.lock().unwrap();
            if let Some(handler) = handler.as_ref() {
                handler(adv);
            }
        }

        fn start_count(&self) -> usize {
            self.start_calls.load(Ordering::SeqCst)
        }

        fn stop_count(&self) -> usize {
            self.stop_calls.load(Ordering::SeqCst)
        }
    }

    impl Scanner for FakeScanner {
        fn is_ready(&self) -> bool {
            self.ready.load(Ordering::SeqCst)
        }

        fn on_ready(&self, notify: Box<dyn FnOnce() + Send + 'static>) {
            self.ready_hooks.lock().unwrap().push(notify);
        }

        fn start_scanning(&self, filter: &ScanFilter, handler: AdvertisementHandler) {
            assert_eq!(filter, &ScanFilter::default());
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            *self.handler.lock().unwrap() = Some(handler);
        }

        fn stop_scanning(&self) {
            self.stop_calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn collecting_subscription(
        scanner: &Arc<FakeScanner>,
    ) -> (ReadingSubscription, Arc<Mutex<Vec<Reading>>>) {
        let subscription = ReadingSubscription::new(Arc::clone(scanner) as Arc<dyn Scanner>);
        let readings = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&readings);
        subscription.subscribe(move |reading| sink.lock().unwrap().push(reading));
        (subscription, readings)
    }

    #[test]
    fn test_subscribe_on_ready_radio_goes_active() {
        let scanner = Arc::new(FakeScanner::ready());
        let (subscription, _) = collecting_subscription(&scanner);

        assert_eq!(subscription.state(), SubscriptionState::Active);
        assert_eq!(scanner.start_count(), 1);
    }

    #[test]
    fn test_subscribe_defers_until_readiness_signal() {
        let scanner = Arc::new(FakeScanner::default());
        let (subscription, _) = collecting_subscription(&scanner);

        assert_eq!(subscription.state(), SubscriptionState::AwaitingReady);
        assert_eq!(scanner.start_count(), 0);

        scanner.power_on();
        assert_eq!(subscription.state(), SubscriptionState::Active);
        assert_eq!(scanner.start_count(), 1);
    }

    #[test]
    fn test_repeat_subscribe_before_readiness_starts_scan_once() {
        let scanner = Arc::new(FakeScanner::default());
        let (subscription, readings) = collecting_subscription(&scanner);
        subscription.subscribe(|_| {});
        subscription.subscribe({
            let sink = Arc::clone(&readings);
            move |reading| sink.lock().unwrap().push(reading)
        });

        scanner.power_on();
        assert_eq!(scanner.start_count(), 1);

        // Last registered callback wins.
        scanner.advertise(advertisement(Some(DEVICE_NAME), Some(frame(100, 200, 0, 50))));
        assert_eq!(readings.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_valid_frame_reaches_consumer() {
        let scanner = Arc::new(FakeScanner::ready());
        let (_subscription, readings) = collecting_subscription(&scanner);

        scanner.advertise(advertisement(Some(DEVICE_NAME), Some(frame(2525, 6049, 1, 87))));

        let readings = readings.lock().unwrap();
        assert_eq!(readings.len(), 1);
        let reading = &readings[0];
        assert!(reading.is_ok());
        assert_eq!(reading.device_id, TEST_DEVICE);
        assert_eq!(reading.temperature, Some(25.25));
        assert_eq!(reading.humidity, Some(60.49));
        assert_eq!(reading.probe_type, ProbeType::External);
        assert_eq!(reading.battery, Some(87));
    }

    #[test]
    fn test_checksum_failure_is_surfaced_as_error_reading() {
        let scanner = Arc::new(FakeScanner::ready());
        let (_subscription, readings) = collecting_subscription(&scanner);

        let mut payload = frame(100, 200, 0, 50);
        payload[6] ^= 0x40;
        scanner.advertise(advertisement(Some(DEVICE_NAME), Some(payload)));

        let readings = readings.lock().unwrap();
        assert_eq!(readings.len(), 1);
        assert!(!readings[0].is_ok());
        assert!(matches!(
            readings[0].error,
            Some(DecodeError::ChecksumMismatch { .. })
        ));
        assert_eq!(readings[0].temperature, None);
    }

    #[test]
    fn test_foreign_device_name_is_dropped() {
        let scanner = Arc::new(FakeScanner::ready());
        let (_subscription, readings) = collecting_subscription(&scanner);

        // Valid payload, wrong or missing name: no callback either way.
        let payload = frame(100, 200, 0, 50);
        scanner.advertise(advertisement(Some("spr"), Some(payload.clone())));
        scanner.advertise(advertisement(Some("sps-2"), Some(payload.clone())));
        scanner.advertise(advertisement(None, Some(payload)));

        assert!(readings.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_or_wrong_length_payload_is_dropped() {
        let scanner = Arc::new(FakeScanner::ready());
        let (_subscription, readings) = collecting_subscription(&scanner);

        scanner.advertise(advertisement(Some(DEVICE_NAME), None));
        scanner.advertise(advertisement(Some(DEVICE_NAME), Some(vec![])));
        scanner.advertise(advertisement(Some(DEVICE_NAME), Some(vec![0u8; 8])));
        scanner.advertise(advertisement(Some(DEVICE_NAME), Some(vec![0u8; 10])));

        assert!(readings.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unsubscribe_stops_scan_and_delivery() {
        let scanner = Arc::new(FakeScanner::ready());
        let (subscription, readings) = collecting_subscription(&scanner);

        subscription.unsubscribe();
        assert_eq!(subscription.state(), SubscriptionState::Stopped);
        assert_eq!(scanner.stop_count(), 1);

        // The fake still holds the handler; cleared binding means no delivery.
        scanner.advertise(advertisement(Some(DEVICE_NAME), Some(frame(100, 200, 0, 50))));
        assert!(readings.lock().unwrap().is_empty());

        // Repeat unsubscribe does not reach the scanner again.
        subscription.unsubscribe();
        assert_eq!(scanner.stop_count(), 1);
    }

    #[test]
    fn test_unsubscribe_while_awaiting_ready_never_starts_scan() {
        let scanner = Arc::new(FakeScanner::default());
        let (subscription, _) = collecting_subscription(&scanner);

        subscription.unsubscribe();
        assert_eq!(subscription.state(), SubscriptionState::Stopped);
        assert_eq!(scanner.stop_count(), 0);

        scanner.power_on();
        assert_eq!(scanner.start_count(), 0);
        assert_eq!(subscription.state(), SubscriptionState::Stopped);
    }

    #[test]
    fn test_resubscribe_after_stop_keeps_state_intact() {
        let scanner = Arc::new(FakeScanner::ready());
        let (subscription, _) = collecting_subscription(&scanner);

        subscription.unsubscribe();
        subscription.subscribe(|_| {});

        // New binding, but the stopped scan is not restarted.
        assert_eq!(subscription.state(), SubscriptionState::Stopped);
        assert_eq!(scanner.start_count(), 1);
        assert_eq!(scanner.stop_count(), 1);
    }
}
