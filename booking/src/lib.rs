//! # Bayline Booking
//!
//! The golf-bay session, booking and pricing model, written as reducers
//! over plain state and hosted by the Bayline store.
//!
//! ## Domain
//!
//! - [`pricing`]: hourly tiers and the quotes derived from them
//! - [`membership`]: tiers, discounts and benefits
//! - [`time_slot`]: bookable hours of a day
//! - [`bay`]: live bay status and the mock occupancy simulation
//! - [`session`]: a customer's time in a bay and its lifecycle
//!
//! ## Features
//!
//! - [`features::booking_wizard`]: step-by-step booking
//! - [`features::session_manager`]: the current session, advanced by poll ticks
//! - [`features::bay_board`]: occupancy of every bay
//! - [`features::facility`]: all of the above composed, with cross-feature
//!   reactions
//!
//! ## Example
//!
//! ```rust,ignore
//! use bayline_booking::*;
//! use bayline_runtime::Store;
//!
//! let env = FacilityEnvironment::from_config(&FacilityConfig::from_env());
//! let store = Store::new(FacilityState::default(), FacilityReducer::new(), env);
//!
//! store.send(FacilityAction::Bays(BayBoardAction::Seed { count: 8 })).await?;
//! store
//!     .send(FacilityAction::Session(SessionAction::WalkIn {
//!         customer_name: "Dana Park".into(),
//!         membership: Some(MembershipTier::Premium),
//!         bay_id: BayId::new(3),
//!         duration: chrono::TimeDelta::hours(1),
//!     }))
//!     .await?;
//! ```

pub mod bay;
pub mod config;
pub mod environment;
pub mod features;
pub mod membership;
pub mod pricing;
pub mod session;
pub mod time_slot;
pub mod types;
pub mod view;

pub use bay::{BayBooking, BayError, BayStatus};
pub use config::{FacilityConfig, ScheduleConfig, SimulatorConfig};
pub use environment::FacilityEnvironment;
pub use features::{
    BayBoardAction, BayBoardReducer, BayBoardState, BookingAction, BookingReducer, BookingState,
    BookingStep, FacilityAction, FacilityReducer, FacilityState, SessionAction,
    SessionManagerReducer, SessionManagerState,
};
pub use membership::{Membership, MembershipTier};
pub use pricing::{PricingTier, Quote};
pub use session::{CustomerSession, PaymentStatus, SessionError, SessionStatus, SessionType};
pub use time_slot::{SlotError, TimeSlot};
pub use types::{BayId, Money, SessionId};
pub use view::{BayBoardView, BookingSummaryView, SessionView};
