use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Sender},
        Arc, Mutex, MutexGuard,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::metrics::{Counter, MetricsCollector};
use crate::models::{AnnouncementRequest, Priority};

use super::sink::{SpeechError, SpeechSink};

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

/// A request that passed the cooldown check and is waiting for the speech thread.
#[derive(Debug, Clone)]
pub struct Announcement {
    pub subject_id: String,
    pub phrase: String,
    pub priority: Priority,
    pub enqueued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressReason {
    /// Same subject was announced less than one cooldown ago.
    Cooldown,
    /// Nothing to say.
    EmptyPhrase,
    /// Info request while the queue is at its cap.
    QueueFull,
    /// Mediator already shut down.
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferOutcome {
    Emitted,
    Suppressed(SuppressReason),
}

struct MediatorInner {
    cooldown: Duration,
    queue_capacity: usize,
    last_emitted: Mutex<HashMap<String, Instant>>,
    queue: Mutex<Option<Sender<Announcement>>>,
    pending: Arc<AtomicUsize>,
    worker: Mutex<Option<JoinHandle<()>>>,
    history: Option<Database>,
    metrics: MetricsCollector,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MediatorInner {
    fn close(&self) {
        // Dropping the sender lets the delivery thread drain what is queued and exit.
        lock(&self.queue).take();

        if let Some(handle) = lock(&self.worker).take() {
            if let Err(join_err) = handle.join() {
                log_error!("Failed to join speech delivery thread: {join_err:?}");
            }
        }
    }
}

impl Drop for MediatorInner {
    fn drop(&mut self) {
        self.close();
    }
}

/// Single funnel between every producer of spoken output and the speech sink.
///
/// `offer` never blocks on speech: accepted phrases go onto a channel drained
/// by one dedicated thread that owns the sink. Each subject gets at most one
/// phrase per cooldown. Info requests are refused once `queue_capacity`
/// phrases are waiting; Alert requests are always queued.
#[derive(Clone)]
pub struct AnnouncementMediator {
    inner: Arc<MediatorInner>,
}

impl AnnouncementMediator {
    pub fn new(
        sink: Box<dyn SpeechSink>,
        cooldown: Duration,
        queue_capacity: usize,
        history: Option<Database>,
        metrics: MetricsCollector,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::channel::<Announcement>();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker = {
            let pending = Arc::clone(&pending);
            let metrics = metrics.clone();
            let mut sink = sink;
            thread::Builder::new()
                .name("speech-delivery".into())
                .spawn(move || {
                    while let Ok(announcement) = rx.recv() {
                        pending.fetch_sub(1, Ordering::SeqCst);
                        let waited = Utc::now().signed_duration_since(announcement.enqueued_at);
                        log_debug!(
                            "Speaking {} for {} after {}ms queued",
                            announcement.priority.as_str(),
                            announcement.subject_id,
                            waited.num_milliseconds()
                        );
                        match sink.speak(&announcement.phrase) {
                            Ok(()) => metrics.incr(Counter::SpeechDelivered),
                            Err(SpeechError::ServiceUnavailable(reason)) => {
                                metrics.incr(Counter::SpeechFailures);
                                log_error!(
                                    "Speech sink failed for '{}' ({}): {reason}",
                                    announcement.phrase,
                                    announcement.subject_id
                                );
                            }
                        }
                    }
                    log_info!("Speech delivery thread drained and exiting");
                })
                .context("failed to spawn speech delivery thread")?
        };

        Ok(Self {
            inner: Arc::new(MediatorInner {
                cooldown,
                queue_capacity: queue_capacity.max(1),
                last_emitted: Mutex::new(HashMap::new()),
                queue: Mutex::new(Some(tx)),
                pending,
                worker: Mutex::new(Some(worker)),
                history,
                metrics,
            }),
        })
    }

    /// Phrases accepted but not yet handed to the sink.
    pub fn pending(&self) -> usize {
        self.inner.pending.load(Ordering::SeqCst)
    }

    pub fn offer_now(&self, request: &AnnouncementRequest) -> OfferOutcome {
        self.offer(request, Instant::now())
    }

    pub fn offer(&self, request: &AnnouncementRequest, now: Instant) -> OfferOutcome {
        let inner = &self.inner;
        let phrase = request.phrase.trim();

        if phrase.is_empty() {
            inner.metrics.incr(Counter::DroppedEmpty);
            log_debug!("Dropped empty announcement for {}", request.subject_id);
            return OfferOutcome::Suppressed(SuppressReason::EmptyPhrase);
        }

        // Held across check, enqueue and stamp so two offers for one subject cannot both pass.
        let mut last_emitted = lock(&inner.last_emitted);
        let cooldown = inner.cooldown;
        last_emitted.retain(|_, at| now.saturating_duration_since(*at) < cooldown);

        if last_emitted.contains_key(&request.subject_id) {
            inner.metrics.incr(Counter::SuppressedCooldown);
            log_debug!(
                "Suppressed '{}' for {}: cooldown",
                phrase,
                request.subject_id
            );
            return OfferOutcome::Suppressed(SuppressReason::Cooldown);
        }

        if request.priority == Priority::Info
            && inner.pending.load(Ordering::SeqCst) >= inner.queue_capacity
        {
            inner.metrics.incr(Counter::SuppressedQueueFull);
            log_warn!(
                "Suppressed '{}' for {}: {} announcements already queued",
                phrase,
                request.subject_id,
                inner.queue_capacity
            );
            return OfferOutcome::Suppressed(SuppressReason::QueueFull);
        }

        let enqueued_at = Utc::now();
        let announcement = Announcement {
            subject_id: request.subject_id.clone(),
            phrase: phrase.to_string(),
            priority: request.priority,
            enqueued_at,
        };

        {
            let queue = lock(&inner.queue);
            let Some(tx) = queue.as_ref() else {
                log_warn!("Announcement '{}' offered after shutdown", phrase);
                return OfferOutcome::Suppressed(SuppressReason::Closed);
            };
            inner.pending.fetch_add(1, Ordering::SeqCst);
            if tx.send(announcement).is_err() {
                inner.pending.fetch_sub(1, Ordering::SeqCst);
                log_error!("Speech delivery thread is gone; '{}' not spoken", phrase);
                return OfferOutcome::Suppressed(SuppressReason::Closed);
            }
        }

        last_emitted.insert(request.subject_id.clone(), now);
        drop(last_emitted);

        if let Some(history) = &inner.history {
            if let Err(err) = history.record_history_detached(phrase, enqueued_at) {
                log_error!("Failed to queue history entry for '{}': {err:?}", phrase);
            }
        }

        inner.metrics.incr(Counter::AnnouncementsEmitted);
        match request.priority {
            Priority::Alert => log_warn!("Alert for {}: {}", request.subject_id, phrase),
            Priority::Info => log_info!("Announce for {}: {}", request.subject_id, phrase),
        }

        OfferOutcome::Emitted
    }

    /// Stop accepting requests, speak everything still queued, and join the delivery thread.
    ///
    /// Blocks until the sink finishes; call it from `spawn_blocking` inside the runtime.
    pub fn close(&self) {
        self.inner.close();
    }
}
