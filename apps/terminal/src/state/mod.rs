//! # Screen State
//!
//! State owned by the POS screen while it is mounted.
//!
//! ## State Types
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌──────────────────────────┐     ┌──────────────────────────────────┐  │
//! │  │ CartState                │     │ NotificationCenter               │  │
//! │  │ Arc<Mutex<Cart>>         │     │ Arc<Mutex<VecDeque<..>>>         │  │
//! │  │ written by the outcome   │     │ written by dispatcher feedback,  │  │
//! │  │ consumer task            │     │ camera faults, cart refusals     │  │
//! │  └──────────────────────────┘     └──────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod cart;
pub mod notifications;

pub use cart::{Cart, CartItem, CartState, CartTotals};
pub use notifications::{Notification, NotificationCenter, NotificationLevel};
