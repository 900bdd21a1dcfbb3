use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use varsel_core::{cancel_reminders, execute, process_due_job, schedule_reminders, SweepRemindersUseCase};
use varsel_domain::{Booking, BookingStatus, ReminderNotification, ID};
use varsel_infra::{ChannelOutcome, INotificationChannel, ISys, Notifier, VarselContext};

const HOUR: i64 = 1000 * 60 * 60;

struct StaticTimeSys(i64);
impl ISys for StaticTimeSys {
    fn get_timestamp_millis(&self) -> i64 {
        self.0
    }
}

/// Channel fake that records which (booking, offset) pairs reached it
struct RecordingChannel {
    sends: Mutex<Vec<(ID, String)>>,
    send_count: AtomicUsize,
}

impl RecordingChannel {
    fn new() -> Self {
        Self {
            sends: Mutex::new(Vec::new()),
            send_count: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl INotificationChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(
        &self,
        booking: &Booking,
        notification: &ReminderNotification,
    ) -> ChannelOutcome {
        self.send_count.fetch_add(1, Ordering::SeqCst);
        self.sends
            .lock()
            .unwrap()
            .push((booking.id.clone(), notification.data.offset_label.clone()));
        ChannelOutcome::Delivered
    }
}

fn setup(now: i64) -> (VarselContext, Arc<RecordingChannel>) {
    let mut ctx = VarselContext::create_inmemory();
    ctx.sys = Arc::new(StaticTimeSys(now));
    let channel = Arc::new(RecordingChannel::new());
    ctx.notifier = Notifier::new(vec![channel.clone()]);
    (ctx, channel)
}

fn advance(ctx: &mut VarselContext, to: i64) {
    ctx.sys = Arc::new(StaticTimeSys(to));
}

async fn drain_and_process(ctx: &VarselContext) -> usize {
    let due_jobs = ctx
        .repos
        .reminder_jobs
        .delete_due_before(ctx.sys.get_timestamp_millis())
        .await;
    let processed = due_jobs.len();
    for job in due_jobs {
        process_due_job(job, ctx).await;
    }
    processed
}

#[tokio::test]
async fn reminders_fire_independently_at_their_own_offsets() {
    let event_time = 1000 * HOUR;
    let (mut ctx, channel) = setup(event_time - 30 * HOUR);

    let mut booking = Booking::new(event_time, ID::new());
    booking.status = BookingStatus::Confirmed;
    ctx.repos.bookings.insert(&booking).await.unwrap();

    let jobs = schedule_reminders(booking.clone(), &ctx).await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].due_at, event_time - 24 * HOUR);
    assert_eq!(jobs[1].due_at, event_time - 2 * HOUR);

    // Nothing is due yet
    assert_eq!(drain_and_process(&ctx).await, 0);

    // The 24h job becomes due
    advance(&mut ctx, event_time - 24 * HOUR);
    assert_eq!(drain_and_process(&ctx).await, 1);
    assert_eq!(channel.send_count.load(Ordering::SeqCst), 1);

    let stored = ctx.repos.bookings.find(&booking.id).await.unwrap();
    assert_eq!(
        stored.reminder_state.entry("24h").sent_at,
        Some(event_time - 24 * HOUR)
    );
    assert_eq!(stored.reminder_state.entry("2h").sent_at, None);

    // The 2h job fires later, unaffected by the first delivery
    advance(&mut ctx, event_time - 2 * HOUR);
    assert_eq!(drain_and_process(&ctx).await, 1);
    assert_eq!(channel.send_count.load(Ordering::SeqCst), 2);

    let stored = ctx.repos.bookings.find(&booking.id).await.unwrap();
    assert_eq!(
        stored.reminder_state.entry("2h").sent_at,
        Some(event_time - 2 * HOUR)
    );

    let sends = channel.sends.lock().unwrap();
    assert_eq!(
        *sends,
        vec![
            (booking.id.clone(), "24h".to_string()),
            (booking.id.clone(), "2h".to_string()),
        ]
    );
}

#[tokio::test]
async fn cancelling_before_the_due_time_results_in_zero_sends() {
    let event_time = 1000 * HOUR;
    let (mut ctx, channel) = setup(event_time - 30 * HOUR);

    let mut booking = Booking::new(event_time, ID::new());
    booking.status = BookingStatus::Confirmed;
    ctx.repos.bookings.insert(&booking).await.unwrap();

    schedule_reminders(booking.clone(), &ctx).await.unwrap();
    let removed = cancel_reminders(booking.id.clone(), &ctx).await;
    assert_eq!(removed, 2);

    advance(&mut ctx, event_time);
    assert_eq!(drain_and_process(&ctx).await, 0);
    assert_eq!(channel.send_count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn sweep_recovers_a_booking_missed_by_the_event_driven_path() {
    let event_time = 1000 * HOUR;
    let (mut ctx, channel) = setup(event_time - 30 * HOUR);

    // Confirmed booking that never went through schedule(), e.g. the
    // process crashed between confirmation and enqueue
    let mut booking = Booking::new(event_time, ID::new());
    booking.status = BookingStatus::Confirmed;
    ctx.repos.bookings.insert(&booking).await.unwrap();

    let scheduled = execute(SweepRemindersUseCase, &ctx).await.unwrap();
    assert_eq!(scheduled, 1);

    advance(&mut ctx, event_time - 24 * HOUR);
    assert_eq!(drain_and_process(&ctx).await, 1);
    assert_eq!(channel.send_count.load(Ordering::SeqCst), 1);

    // A second sweep finds nothing left to repair
    let scheduled = execute(SweepRemindersUseCase, &ctx).await.unwrap();
    assert_eq!(scheduled, 0);
}
