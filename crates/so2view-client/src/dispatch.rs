use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use so2view_frame::Channel;
use so2view_payload::Reading;
use tracing::{debug, error, warn};

use crate::connection::Connection;
use crate::error::{ClientError, Result};
use crate::registry::Registry;

/// Source of readings for a dispatch pass.
pub trait Fetch {
    /// Fetch one reading; `Ok(None)` means the channel had no data.
    fn fetch(&mut self, channel: Channel) -> Result<Option<Reading>>;

    /// Bring the link up before a pass, if it is down.
    fn ensure_connected(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Fetch for Connection {
    fn fetch(&mut self, channel: Channel) -> Result<Option<Reading>> {
        self.request_channel(channel)
    }

    fn ensure_connected(&mut self) -> Result<()> {
        if self.is_connected() {
            return Ok(());
        }
        self.reconnect_once()
    }
}

/// A channel whose fetch failed during a pass.
#[derive(Debug)]
pub struct ChannelFailure {
    pub channel: Channel,
    pub error: ClientError,
}

/// Outcome of one dispatch pass.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Channels whose reading reached their subscribers.
    pub delivered: Vec<Channel>,
    /// Channels that answered "no data".
    pub skipped: Vec<Channel>,
    /// Channels whose request failed.
    pub failed: Vec<ChannelFailure>,
    /// Callbacks that panicked.
    pub callback_panics: usize,
}

impl DispatchReport {
    /// True when no channel failed and no callback panicked.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && self.callback_panics == 0
    }

    /// Channels visited by the pass.
    pub fn channel_count(&self) -> usize {
        self.delivered.len() + self.skipped.len() + self.failed.len()
    }
}

/// Runs fetch-and-notify passes over a [`Registry`].
pub struct Dispatcher<F> {
    fetcher: Arc<Mutex<F>>,
    registry: Registry,
    reconnect_on_failure: bool,
}

impl<F> Clone for Dispatcher<F> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            registry: self.registry.clone(),
            reconnect_on_failure: self.reconnect_on_failure,
        }
    }
}

impl<F: Fetch> Dispatcher<F> {
    pub fn new(fetcher: Arc<Mutex<F>>, registry: Registry) -> Self {
        Self {
            fetcher,
            registry,
            reconnect_on_failure: false,
        }
    }

    /// Try to bring a dropped link back up at the start of each pass.
    pub fn with_reconnect_on_failure(mut self, enabled: bool) -> Self {
        self.reconnect_on_failure = enabled;
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// One pass: fetch each subscribed channel once and notify its subscribers.
    ///
    /// A failing channel does not stop the pass, and a panicking callback
    /// does not stop its siblings. Both are recorded in the report.
    pub fn dispatch_once(&self) -> DispatchReport {
        let mut report = DispatchReport::default();
        let entries = self.registry.snapshot();
        if entries.is_empty() {
            return report;
        }

        if self.reconnect_on_failure {
            if let Err(err) = self.lock_fetcher().ensure_connected() {
                warn!(error = %err, "reconnect before dispatch pass failed");
            }
        }

        for (channel, callbacks) in entries {
            // Lock per request so ad-hoc requests can interleave with a pass.
            let fetched = self.lock_fetcher().fetch(channel);
            match fetched {
                Ok(None) => {
                    debug!(%channel, "skipped, no data");
                    report.skipped.push(channel);
                }
                Ok(Some(reading)) => {
                    for (index, callback) in callbacks.iter().enumerate() {
                        let outcome = catch_unwind(AssertUnwindSafe(|| {
                            callback(&reading.payload, &reading.metadata)
                        }));
                        if outcome.is_err() {
                            error!(%channel, subscriber = index, "subscriber panicked");
                            report.callback_panics += 1;
                        }
                    }
                    report.delivered.push(channel);
                }
                Err(error) => {
                    warn!(%channel, %error, "channel fetch failed");
                    report.failed.push(ChannelFailure { channel, error });
                }
            }
        }

        debug!(
            delivered = report.delivered.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "dispatch pass finished"
        );
        report
    }

    fn lock_fetcher(&self) -> std::sync::MutexGuard<'_, F> {
        self.fetcher.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, VecDeque};

    use so2view_frame::{BOT, CAM, SPC, TOP};
    use so2view_payload::{
        ChannelKind, ChannelTable, ImageFrame, Metadata, Payload, Samples, Spectrum,
    };

    use super::*;
    use crate::config::ClientConfig;
    use crate::testing::{gray_png, FakeInstrument, Reply};

    /// In-memory fetcher with scripted results per channel.
    #[derive(Default)]
    struct Scripted {
        results: HashMap<Channel, VecDeque<Result<Option<Reading>>>>,
        calls: Vec<Channel>,
        reconnects: usize,
    }

    impl Scripted {
        fn push(&mut self, channel: Channel, result: Result<Option<Reading>>) {
            self.results.entry(channel).or_default().push_back(result);
        }
    }

    impl Fetch for Scripted {
        fn fetch(&mut self, channel: Channel) -> Result<Option<Reading>> {
            self.calls.push(channel);
            self.results
                .get_mut(&channel)
                .and_then(VecDeque::pop_front)
                .unwrap_or(Ok(None))
        }

        fn ensure_connected(&mut self) -> Result<()> {
            self.reconnects += 1;
            Ok(())
        }
    }

    fn gray_reading(channel: Channel, value: u8) -> Reading {
        let frame = ImageFrame::from_parts(1, 1, 1, Samples::U8(vec![value])).unwrap();
        let mut metadata = Metadata::new();
        metadata.insert("name", channel.as_str());
        Reading {
            payload: Payload::Image(frame),
            metadata,
        }
    }

    fn dispatcher(fetcher: Scripted) -> (Dispatcher<Scripted>, Arc<Mutex<Scripted>>) {
        let fetcher = Arc::new(Mutex::new(fetcher));
        let dispatcher = Dispatcher::new(Arc::clone(&fetcher), Registry::default());
        (dispatcher, fetcher)
    }

    #[test]
    fn subscribers_run_in_registration_order() {
        let mut fetcher = Scripted::default();
        fetcher.push(CAM, Ok(Some(gray_reading(CAM, 9))));
        let (dispatcher, _) = dispatcher(fetcher);

        let order = Arc::new(Mutex::new(Vec::new()));
        for id in 0..4 {
            let order = Arc::clone(&order);
            dispatcher
                .registry()
                .subscribe("cam", move |_, _| order.lock().unwrap().push(id))
                .unwrap();
        }

        let report = dispatcher.dispatch_once();
        assert_eq!(report.delivered, vec![CAM]);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn no_data_skips_callbacks() {
        let mut fetcher = Scripted::default();
        fetcher.push(TOP, Ok(None));
        let (dispatcher, _) = dispatcher(fetcher);

        let hits = Arc::new(Mutex::new(0));
        let sink = Arc::clone(&hits);
        dispatcher
            .registry()
            .subscribe("top", move |_, _| *sink.lock().unwrap() += 1)
            .unwrap();

        let report = dispatcher.dispatch_once();
        assert_eq!(report.skipped, vec![TOP]);
        assert!(report.is_clean());
        assert_eq!(*hits.lock().unwrap(), 0);
    }

    #[test]
    fn failing_channel_does_not_stop_the_pass() {
        let mut fetcher = Scripted::default();
        fetcher.push(TOP, Err(ClientError::NotConnected));
        fetcher.push(BOT, Ok(Some(gray_reading(BOT, 1))));
        let (dispatcher, _) = dispatcher(fetcher);

        let seen = Arc::new(Mutex::new(Vec::new()));
        for name in ["top", "bot"] {
            let seen = Arc::clone(&seen);
            dispatcher
                .registry()
                .subscribe(name, move |_, metadata| {
                    seen.lock().unwrap().push(metadata.channel().unwrap().to_string())
                })
                .unwrap();
        }

        let report = dispatcher.dispatch_once();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].channel, TOP);
        assert_eq!(report.delivered, vec![BOT]);
        assert_eq!(*seen.lock().unwrap(), vec!["bot"]);
    }

    #[test]
    fn panicking_callback_does_not_stop_siblings() {
        let mut fetcher = Scripted::default();
        fetcher.push(BOT, Ok(Some(gray_reading(BOT, 5))));
        let (dispatcher, _) = dispatcher(fetcher);

        let after = Arc::new(Mutex::new(false));
        let sink = Arc::clone(&after);
        dispatcher
            .registry()
            .subscribe("bot", |_, _| panic!("subscriber bug"))
            .unwrap();
        dispatcher
            .registry()
            .subscribe("bot", move |_, _| *sink.lock().unwrap() = true)
            .unwrap();

        let report = dispatcher.dispatch_once();
        assert_eq!(report.callback_panics, 1);
        assert!(!report.is_clean());
        assert!(*after.lock().unwrap());
    }

    #[test]
    fn channels_are_fetched_in_table_order() {
        let (dispatcher, fetcher) = dispatcher(Scripted::default());
        for name in ["spc", "xyz", "cam", "top"] {
            dispatcher.registry().subscribe(name, |_, _| {}).unwrap();
        }

        dispatcher.dispatch_once();
        dispatcher.dispatch_once();

        let xyz = Channel::new("xyz").unwrap();
        let calls = fetcher.lock().unwrap().calls.clone();
        assert_eq!(calls, vec![TOP, CAM, SPC, xyz, TOP, CAM, SPC, xyz]);
    }

    #[test]
    fn callback_may_subscribe_during_a_pass() {
        let mut fetcher = Scripted::default();
        fetcher.push(TOP, Ok(Some(gray_reading(TOP, 2))));
        let (dispatcher, _) = dispatcher(fetcher);

        let registry = dispatcher.registry().clone();
        dispatcher
            .registry()
            .subscribe("top", move |_, _| {
                registry.subscribe("cmp", |_, _| {}).unwrap();
            })
            .unwrap();

        let report = dispatcher.dispatch_once();
        assert_eq!(report.channel_count(), 1);
        assert_eq!(dispatcher.registry().channels().len(), 2);
    }

    #[test]
    fn reconnect_hook_runs_only_when_enabled() {
        let (plain, fetcher) = dispatcher(Scripted::default());
        plain.registry().subscribe("top", |_, _| {}).unwrap();
        plain.dispatch_once();
        assert_eq!(fetcher.lock().unwrap().reconnects, 0);

        let eager = plain.clone().with_reconnect_on_failure(true);
        eager.dispatch_once();
        assert_eq!(fetcher.lock().unwrap().reconnects, 1);
    }

    #[test]
    fn bot_scenario_over_tcp() {
        let instrument = FakeInstrument::spawn(vec![
            ("bot", Reply::Body(gray_png(1, 1, &[17], &[]))),
            ("bot", Reply::Body(gray_png(1, 1, &[201], &[]))),
        ]);
        let mut connection = Connection::new(ClientConfig::default());
        connection.connect("127.0.0.1", instrument.port()).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(Mutex::new(connection)), Registry::default());

        let recorded = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&recorded);
        dispatcher
            .registry()
            .subscribe("bot", move |payload, metadata| {
                assert_eq!(metadata.channel(), Some("bot"));
                let frame = payload.as_image().expect("bot carries images");
                sink.lock().unwrap().push(frame.samples().clone());
            })
            .unwrap();

        assert_eq!(dispatcher.dispatch_once().delivered, vec![BOT]);
        assert_eq!(dispatcher.dispatch_once().delivered, vec![BOT]);

        assert_eq!(
            *recorded.lock().unwrap(),
            vec![Samples::U8(vec![17]), Samples::U8(vec![201])]
        );
    }

    #[test]
    fn spectrum_and_image_in_one_pass() {
        let table = ChannelTable::default().with(SPC, ChannelKind::Spectrum { samples: 2 });
        let instrument = FakeInstrument::spawn(vec![
            ("top", Reply::Body(Vec::new())),
            ("spc", Reply::Body(Spectrum::new(vec![4.0, 8.0]).to_le_bytes())),
        ]);
        let mut connection = Connection::new(ClientConfig::default().with_channels(table.clone()));
        connection.connect("127.0.0.1", instrument.port()).unwrap();
        let dispatcher = Dispatcher::new(Arc::new(Mutex::new(connection)), Registry::new(table));

        let kinds = Arc::new(Mutex::new(Vec::new()));
        for name in ["spc", "top"] {
            let kinds = Arc::clone(&kinds);
            dispatcher
                .registry()
                .subscribe(name, move |payload, _| {
                    kinds.lock().unwrap().push(payload.kind_name())
                })
                .unwrap();
        }

        let report = dispatcher.dispatch_once();
        assert_eq!(report.skipped, vec![TOP]);
        assert_eq!(report.delivered, vec![SPC]);
        assert_eq!(*kinds.lock().unwrap(), vec!["spectrum"]);
        assert_eq!(instrument.requests(), vec!["top", "spc"]);
    }
}
