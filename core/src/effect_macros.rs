//! Declarative macros for ergonomic effect construction
//!
//! Most reducers in the facility only ever need two kinds of effect: a
//! follow-up action computed asynchronously, and a poll tick scheduled for
//! later. These macros keep both one-liners.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use bayline_core::async_effect;
///
/// async_effect! {
///     Some(FacilityAction::Session(SessionAction::Begin { session }))
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use bayline_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(30),
///     action: SessionAction::Tick { generation: 4 }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}
