//! Facility features, each a reducer over its own slice of state.

pub mod bay_board;
pub mod booking_wizard;
pub mod facility;
pub mod session_manager;

pub use bay_board::{BayBoardAction, BayBoardReducer, BayBoardState};
pub use booking_wizard::{BookingAction, BookingReducer, BookingState, BookingStep};
pub use facility::{CoordinationReducer, FacilityAction, FacilityReducer, FacilityState};
pub use session_manager::{SessionAction, SessionManagerReducer, SessionManagerState};
