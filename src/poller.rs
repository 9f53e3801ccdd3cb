// Recognition polling: periodically ship the canvas to the classifier.
//
// The public interface is [`Poller::tick`] (called from the event loop on
// its own clock) and [`Poller::drain`] (responses, tagged with the round
// generation they were sent for). The classifier itself runs on a worker
// thread behind an `mpsc` channel, so a slow request never stalls the
// frame callback or the countdown.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::classifier::{Classifier, INSTRUCTION};
use crate::clock::Interval;
use crate::error::Error;
use crate::stroke::{Snapshot, StrokeRenderer};

/// Default time between polls; longer trades responsiveness for quota.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

// ════════════════════════════════════════════════════════════════════════════
// Wire types between the loop and the worker
// ════════════════════════════════════════════════════════════════════════════

struct PollRequest {
    seq: u64,
    generation: u64,
    snapshot: Snapshot,
}

struct PollReply {
    seq: u64,
    response: PollResponse,
}

/// One classifier round trip, successful or not.
#[derive(Debug)]
pub struct PollResponse {
    /// Round generation the snapshot was taken in.
    pub generation: u64,
    /// Raw classifier text, or why there is none.
    pub result: Result<String, Error>,
}

impl PollResponse {
    fn failed(generation: u64, why: String) -> Self {
        Self { generation, result: Err(Error::ClassifierRequestFailed(why)) }
    }
}

/// What a call to [`Poller::tick`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollTick {
    /// Not running, or the interval has not elapsed.
    NotDue,
    /// Due, but the previous request has not come back yet.
    SkippedInFlight,
    /// Due, but the canvas holds nothing but background.
    SkippedBlank,
    /// Snapshot handed to the worker.
    Submitted { generation: u64 },
    /// The worker thread is gone; a failure is queued for `drain`.
    WorkerGone,
}

// ════════════════════════════════════════════════════════════════════════════
// Poller
// ════════════════════════════════════════════════════════════════════════════

struct InFlight {
    seq: u64,
    generation: u64,
    sent_at: Instant,
}

pub struct Poller {
    period: Duration,
    timeout: Duration,
    interval: Option<Interval>, // Some only while a round is being played
    in_flight: Option<InFlight>,
    next_seq: u64,
    pending: Vec<PollResponse>, // failures raised on this side of the channel
    worker_gone: bool,
    tx: Sender<PollRequest>,
    rx: Receiver<PollReply>,
}

impl Poller {
    /// Move `classifier` onto its own worker thread. A request with no
    /// answer after `timeout` is reported as failed and its late answer,
    /// if any, is dropped. Dropping the poller closes the request channel,
    /// and the worker exits after at most the request it is serving.
    pub fn spawn<C: Classifier>(classifier: C, period: Duration, timeout: Duration) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<PollRequest>();
        let (resp_tx, resp_rx) = mpsc::channel::<PollReply>();
        let spawned = thread::Builder::new()
            .name("classifier".into())
            .spawn(move || worker_loop(classifier, req_rx, resp_tx));
        if let Err(e) = spawned {
            // The request receiver died with the closure; `tick` reports WorkerGone.
            error!("failed to spawn classifier worker: {e}");
        }
        Self {
            period,
            timeout,
            interval: None,
            in_flight: None,
            next_seq: 0,
            pending: Vec::new(),
            worker_gone: false,
            tx: req_tx,
            rx: resp_rx,
        }
    }

    /// Arm the timer; the first poll happens one period after `now`.
    pub fn start(&mut self, now: Instant) {
        self.interval = Some(Interval::starting(now, self.period));
    }

    /// Disarm the timer. A request already in flight still comes back
    /// through `drain` (answer, failure or timeout).
    pub fn stop(&mut self) {
        self.interval = None;
    }

    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Poll if due. Snapshots are taken here, between frame callbacks, so
    /// they only ever contain fully committed strokes.
    pub fn tick(&mut self, now: Instant, generation: u64, canvas: &StrokeRenderer) -> PollTick {
        self.expire(now);

        let Some(interval) = self.interval.as_mut() else {
            return PollTick::NotDue;
        };
        if !interval.due(now) {
            return PollTick::NotDue;
        }
        // Missed periods after a stall collapse into this one tick.
        while interval.due(now) {}

        if self.in_flight.is_some() {
            debug!("poll skipped: previous request still in flight");
            return PollTick::SkippedInFlight;
        }
        let snapshot = match canvas.snapshot() {
            Some(s) if !canvas.is_blank() => s,
            _ => {
                debug!("poll skipped: canvas is blank");
                return PollTick::SkippedBlank;
            }
        };

        let seq = self.next_seq;
        self.next_seq += 1;
        if self.tx.send(PollRequest { seq, generation, snapshot }).is_err() {
            if !self.worker_gone {
                error!("classifier worker has exited; every poll will fail");
                self.worker_gone = true;
            }
            self.pending.push(PollResponse::failed(generation, "classifier worker has exited".into()));
            return PollTick::WorkerGone;
        }
        self.in_flight = Some(InFlight { seq, generation, sent_at: now });
        debug!(generation, seq, "poll submitted");
        PollTick::Submitted { generation }
    }

    /// Give up on a request older than the timeout.
    fn expire(&mut self, now: Instant) {
        let timeout = self.timeout;
        if let Some(late) = self.in_flight.take_if(|f| now.saturating_duration_since(f.sent_at) > timeout) {
            warn!(generation = late.generation, ?timeout, "classifier request timed out");
            self.pending.push(PollResponse::failed(late.generation, format!("no answer within {timeout:?}")));
        }
    }

    /// Collect every response that has arrived, oldest first. Never blocks.
    pub fn drain(&mut self) -> Vec<PollResponse> {
        let mut out = std::mem::take(&mut self.pending);
        loop {
            match self.rx.try_recv() {
                Ok(reply) => {
                    if self.in_flight.as_ref().is_some_and(|f| f.seq == reply.seq) {
                        self.in_flight = None;
                        out.push(reply.response);
                    } else {
                        debug!(seq = reply.seq, "answer to a timed-out request dropped");
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if let Some(lost) = self.in_flight.take() {
                        warn!(generation = lost.generation, "classifier worker stopped mid-request");
                        out.push(PollResponse::failed(lost.generation, "classifier worker stopped".into()));
                    }
                    break;
                }
            }
        }
        out
    }
}

fn worker_loop<C: Classifier>(mut classifier: C, rx: Receiver<PollRequest>, tx: Sender<PollReply>) {
    for req in rx {
        let result = req
            .snapshot
            .encode_jpeg()
            .and_then(|jpeg| classifier.classify(&jpeg, INSTRUCTION));
        let reply = PollReply { seq: req.seq, response: PollResponse { generation: req.generation, result } };
        if tx.send(reply).is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{DEFAULT_CLASSIFIER_TIMEOUT, ScriptedClassifier};
    use crate::gesture::InputState;
    use crate::types::Point2D;

    fn inked_canvas() -> StrokeRenderer {
        let mut r = StrokeRenderer::new(64, 48, 0x00FF_FFFF, 0, 6.0);
        r.apply(InputState::Draw, Some(Point2D::new(10.0, 10.0)));
        r.apply(InputState::Draw, Some(Point2D::new(50.0, 30.0)));
        r
    }

    fn spawn_with<C: Classifier>(classifier: C) -> Poller {
        Poller::spawn(classifier, DEFAULT_POLL_INTERVAL, DEFAULT_CLASSIFIER_TIMEOUT)
    }

    /// Never answers.
    struct Stalled;

    impl Classifier for Stalled {
        fn classify(&mut self, _jpeg: &[u8], _instruction: &str) -> Result<String, Error> {
            thread::sleep(Duration::from_secs(3600));
            Ok("too late".into())
        }
    }

    /// Answers whatever the test pushes, when it pushes it.
    struct Gated(Receiver<String>);

    impl Classifier for Gated {
        fn classify(&mut self, _jpeg: &[u8], _instruction: &str) -> Result<String, Error> {
            self.0.recv().map_err(|e| Error::ClassifierRequestFailed(e.to_string()))
        }
    }

    struct Crashes;

    impl Classifier for Crashes {
        fn classify(&mut self, _jpeg: &[u8], _instruction: &str) -> Result<String, Error> {
            panic!("classifier bug");
        }
    }

    fn wait_for(poller: &mut Poller) -> Vec<PollResponse> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let got = poller.drain();
            if !got.is_empty() || Instant::now() > deadline {
                return got;
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn idle_until_started() {
        let mut p = spawn_with(ScriptedClassifier::new(vec!["Fish".into()]));
        let t0 = Instant::now();
        assert_eq!(p.tick(t0 + Duration::from_secs(10), 1, &inked_canvas()), PollTick::NotDue);
        assert!(!p.is_running());
    }

    #[test]
    fn blank_canvas_is_skipped() {
        let mut p = spawn_with(ScriptedClassifier::new(vec!["Fish".into()]));
        let t0 = Instant::now();
        p.start(t0);
        let blank = StrokeRenderer::new(64, 48, 0x00FF_FFFF, 0, 6.0);
        assert_eq!(p.tick(t0 + DEFAULT_POLL_INTERVAL, 1, &blank), PollTick::SkippedBlank);
        assert!(!p.in_flight());
    }

    #[test]
    fn submits_and_returns_tagged_response() {
        let mut p = spawn_with(ScriptedClassifier::new(vec!["Fish, Boat, Bird".into()]));
        let t0 = Instant::now();
        p.start(t0);
        assert_eq!(p.tick(t0 + Duration::from_millis(100), 7, &inked_canvas()), PollTick::NotDue);
        assert_eq!(
            p.tick(t0 + DEFAULT_POLL_INTERVAL, 7, &inked_canvas()),
            PollTick::Submitted { generation: 7 }
        );
        assert!(p.in_flight());

        let got = wait_for(&mut p);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].generation, 7);
        assert_eq!(got[0].result.as_ref().unwrap(), "Fish, Boat, Bird");
        assert!(!p.in_flight());
    }

    #[test]
    fn in_flight_request_blocks_next_tick() {
        let mut p = spawn_with(ScriptedClassifier::new(vec!["Line".into()]));
        let t0 = Instant::now();
        p.start(t0);
        let canvas = inked_canvas();
        assert!(matches!(p.tick(t0 + DEFAULT_POLL_INTERVAL, 1, &canvas), PollTick::Submitted { .. }));
        // Response not drained yet, so the guard still holds.
        assert_eq!(p.tick(t0 + DEFAULT_POLL_INTERVAL * 2, 1, &canvas), PollTick::SkippedInFlight);
        wait_for(&mut p);
        assert!(matches!(p.tick(t0 + DEFAULT_POLL_INTERVAL * 3, 1, &canvas), PollTick::Submitted { .. }));
    }

    #[test]
    fn failures_come_back_as_errors() {
        let mut p = spawn_with(ScriptedClassifier::with_failures(vec![Err("503".into())]));
        let t0 = Instant::now();
        p.start(t0);
        p.tick(t0 + DEFAULT_POLL_INTERVAL, 2, &inked_canvas());
        let got = wait_for(&mut p);
        assert!(matches!(got[0].result, Err(Error::ClassifierRequestFailed(_))));
    }

    #[test]
    fn stop_disarms_timer() {
        let mut p = spawn_with(ScriptedClassifier::new(vec!["Line".into()]));
        let t0 = Instant::now();
        p.start(t0);
        p.stop();
        assert_eq!(p.tick(t0 + DEFAULT_POLL_INTERVAL, 1, &inked_canvas()), PollTick::NotDue);
    }

    #[test]
    fn stalled_request_times_out_and_polling_resumes() {
        let timeout = Duration::from_millis(100);
        let mut p = Poller::spawn(Stalled, DEFAULT_POLL_INTERVAL, timeout);
        let t0 = Instant::now();
        p.start(t0);
        let canvas = inked_canvas();
        let sent = t0 + DEFAULT_POLL_INTERVAL;
        assert_eq!(p.tick(sent, 4, &canvas), PollTick::Submitted { generation: 4 });

        // Not yet past the deadline.
        assert_eq!(p.tick(sent + timeout, 4, &canvas), PollTick::NotDue);
        assert!(p.in_flight());

        assert_eq!(p.tick(sent + Duration::from_millis(150), 4, &canvas), PollTick::NotDue);
        assert!(!p.in_flight());
        let got = p.drain();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].generation, 4);
        assert!(matches!(got[0].result, Err(Error::ClassifierRequestFailed(_))));

        // The next round is not blocked by the stuck request.
        p.start(sent + Duration::from_secs(1));
        assert_eq!(
            p.tick(sent + Duration::from_secs(1) + DEFAULT_POLL_INTERVAL, 5, &canvas),
            PollTick::Submitted { generation: 5 }
        );
    }

    #[test]
    fn answer_to_timed_out_request_is_dropped() {
        let (answers, gate) = mpsc::channel();
        let timeout = Duration::from_millis(100);
        let mut p = Poller::spawn(Gated(gate), DEFAULT_POLL_INTERVAL, timeout);
        let t0 = Instant::now();
        p.start(t0);
        let canvas = inked_canvas();

        p.tick(t0 + DEFAULT_POLL_INTERVAL, 1, &canvas);
        // Expires at the next due tick, which submits a fresh request.
        assert_eq!(p.tick(t0 + DEFAULT_POLL_INTERVAL * 2, 1, &canvas), PollTick::Submitted { generation: 1 });
        let timed_out = p.drain();
        assert_eq!(timed_out.len(), 1);
        assert!(timed_out[0].result.is_err());

        answers.send("Late".to_string()).unwrap();
        answers.send("Fresh".to_string()).unwrap();
        let got = wait_for(&mut p);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].result.as_ref().unwrap(), "Fresh");
        assert!(!p.in_flight());
    }

    #[test]
    fn crashed_worker_reports_failures() {
        let mut p = spawn_with(Crashes);
        let t0 = Instant::now();
        p.start(t0);
        let canvas = inked_canvas();
        assert_eq!(p.tick(t0 + DEFAULT_POLL_INTERVAL, 3, &canvas), PollTick::Submitted { generation: 3 });

        let got = wait_for(&mut p);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].generation, 3);
        assert!(matches!(got[0].result, Err(Error::ClassifierRequestFailed(_))));
        assert!(!p.in_flight());

        // Later polls keep failing visibly instead of going quiet.
        p.tick(t0 + DEFAULT_POLL_INTERVAL * 2, 3, &canvas);
        let again = wait_for(&mut p);
        assert!(matches!(again[0].result, Err(Error::ClassifierRequestFailed(_))));
        assert!(p.is_running());
    }
}
