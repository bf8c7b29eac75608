//! `bayline-sim`: a scripted afternoon at the facility.
//!
//! Runs the composed facility on a compressed clock: a booking is made
//! through the wizard for the 2 PM slot, the session manager starts and
//! finishes it as simulated time passes, and the bay board flickers with
//! mock occupancy in the background. Status is logged as it changes and a
//! JSON snapshot of the final state is printed.
//!
//! Configuration comes from the environment (see `FacilityConfig::from_env`).

use anyhow::Context;
use bayline_booking::{
    BayBoardAction, BayBoardView, BayId, BookingAction, FacilityAction, FacilityConfig,
    FacilityEnvironment, FacilityReducer, FacilityState, Membership, MembershipTier, SessionAction,
    SessionView,
};
use bayline_core::Clock;
use bayline_runtime::{Store, StoreConfig};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type FacilityStore = Store<FacilityState, FacilityAction, FacilityEnvironment, FacilityReducer>;

/// Local hour the booked session starts
const BOOKED_HOUR: u32 = 14;

/// Clock that runs `speedup` times faster than the wall clock
struct ScaledClock {
    start: DateTime<Utc>,
    origin: Instant,
    speedup: u32,
}

impl ScaledClock {
    fn new(start: DateTime<Utc>, speedup: u32) -> Self {
        Self {
            start,
            origin: Instant::now(),
            speedup: speedup.max(1),
        }
    }
}

impl Clock for ScaledClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = self.origin.elapsed().saturating_mul(self.speedup);
        self.start + TimeDelta::from_std(elapsed).unwrap_or(TimeDelta::zero())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = FacilityConfig::from_env();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let offset = config.schedule.utc_offset();
    let today = Utc::now().with_timezone(&offset).date_naive();
    // Ten minutes before the booked slot, local time
    let start = today
        .and_hms_opt(BOOKED_HOUR - 1, 50, 0)
        .and_then(|t| t.and_local_timezone(offset).single())
        .map_or_else(Utc::now, |t| t.with_timezone(&Utc));

    let speedup = config.simulator.speedup;
    let env = FacilityEnvironment::from_config(&config)
        .with_clock(Arc::new(ScaledClock::new(start, speedup)))
        .with_schedule(config.schedule.compressed(speedup));

    tracing::info!(
        bays = config.bay_count,
        speedup,
        run_seconds = config.simulator.run_seconds,
        %start,
        "Starting facility simulation"
    );

    let store: FacilityStore = Store::with_config(
        FacilityState::default(),
        FacilityReducer::new(),
        env,
        StoreConfig::default().with_shutdown_timeout(config.shutdown_timeout()),
    );

    let observer = tokio::spawn(log_events(store.subscribe_actions()));

    store
        .send(FacilityAction::Bays(BayBoardAction::Seed {
            count: config.bay_count,
        }))
        .await?;
    store
        .send(FacilityAction::Bays(BayBoardAction::StartPolling))
        .await?;
    store
        .send(FacilityAction::Session(SessionAction::StartPolling))
        .await?;

    book_afternoon(&store, &config, today).await?;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(config.simulator.run_seconds);
    let mut report = tokio::time::interval(Duration::from_secs(2));
    while tokio::time::Instant::now() < deadline {
        report.tick().await;
        let now = store.environment().now();
        let (status, remaining, available) = store
            .state(|s| {
                (
                    s.session_status(),
                    s.time_remaining_text(now),
                    BayBoardView::available_count(s),
                )
            })
            .await;
        tracing::info!(
            time = %now.with_timezone(&offset).format("%-I:%M %p"),
            status = ?status,
            remaining = remaining.as_deref().unwrap_or("-"),
            available,
            "Facility status"
        );
    }

    store
        .send(FacilityAction::Session(SessionAction::StopPolling))
        .await?;
    store
        .send(FacilityAction::Bays(BayBoardAction::StopPolling))
        .await?;

    let snapshot = store.state(serde_json::to_string_pretty::<FacilityState>).await?;
    println!("{snapshot}");

    store
        .shutdown_default()
        .await
        .context("store did not shut down cleanly")?;
    observer.abort();
    Ok(())
}

/// Walk through the wizard for today's 2 PM slot in the first free bay
///
/// Falls back to a walk-in when the slot or a free bay is not on offer.
async fn book_afternoon(
    store: &FacilityStore,
    config: &FacilityConfig,
    today: NaiveDate,
) -> anyhow::Result<()> {
    let free_bay = store
        .state(|s| s.bays.bays.iter().find(|bay| bay.is_available).map(|bay| bay.id))
        .await;
    let slot_index = config
        .schedule
        .opening_hours()
        .position(|hour| hour == BOOKED_HOUR);

    let (Some(bay_id), Some(index)) = (free_bay, slot_index) else {
        tracing::warn!("No bookable slot or bay, taking a walk-in instead");
        store
            .send(FacilityAction::Session(SessionAction::WalkIn {
                customer_name: "Jordan Reyes".to_string(),
                membership: None,
                bay_id: BayId::new(1),
                duration: TimeDelta::hours(1),
            }))
            .await?;
        return Ok(());
    };

    let joined = today - TimeDelta::days(400);
    let steps = [
        BookingAction::SelectMembership(Membership::member(MembershipTier::Premium, "M-2041", joined)),
        BookingAction::SetCustomerName("Dana Park".to_string()),
        BookingAction::Continue,
        BookingAction::SetPlayerCount(4),
        BookingAction::Continue,
        BookingAction::SelectDate(today),
        BookingAction::SelectTimeSlot { index },
        BookingAction::SelectBay(bay_id),
        BookingAction::Continue,
        BookingAction::SetHours(1),
        BookingAction::Continue,
        BookingAction::SetPhoneNumber("(555) 010-4477".to_string()),
        BookingAction::SendCode,
        BookingAction::EnterCode("2041".to_string()),
        BookingAction::Continue,
    ];
    for step in steps {
        store.send(FacilityAction::Booking(step)).await?;
    }

    let (label, total, deposit) = store
        .state(|s| {
            (
                s.booking.time_slot_label.clone(),
                s.booking.total_price(),
                s.booking.deposit_amount(),
            )
        })
        .await;
    tracing::info!(
        %bay_id,
        slot = label.as_deref().unwrap_or("-"),
        total = %total.unwrap_or_default(),
        deposit = %deposit.unwrap_or_default(),
        "Confirming booking"
    );

    store
        .send_and_wait_for(
            FacilityAction::Booking(BookingAction::Confirm),
            |action| matches!(action, FacilityAction::Session(SessionAction::Begin { .. })),
            Duration::from_secs(1),
        )
        .await
        .context("booking was not handed to the session manager")?;
    Ok(())
}

/// Log the cross-feature events the facility produces
async fn log_events(mut rx: tokio::sync::broadcast::Receiver<FacilityAction>) {
    loop {
        match rx.recv().await {
            Ok(FacilityAction::Session(SessionAction::SessionStarted {
                customer_name, bay_id, ..
            })) => tracing::info!(%bay_id, customer = %customer_name, "Session started"),
            Ok(FacilityAction::Session(SessionAction::SessionEnded { bay_id, status, .. })) => {
                tracing::info!(%bay_id, %status, "Session ended");
            },
            Ok(FacilityAction::Bays(BayBoardAction::Occupy { bay_id, .. })) => {
                tracing::info!(%bay_id, "Bay occupied");
            },
            Ok(FacilityAction::Bays(BayBoardAction::Release { bay_id })) => {
                tracing::info!(%bay_id, "Bay released");
            },
            Ok(_) => {},
            Err(RecvError::Lagged(skipped)) => tracing::warn!(skipped, "Event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
