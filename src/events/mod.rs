//! # Events Module
//!
//! Event-driven reporting for any UI layer.
//!
//! ## Design
//! Pagers and sessions emit events through channels, so a CLI, GUI or test
//! can subscribe without the core knowing who is listening.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         match event {
//!             Event::Paging(PagingEvent::LoadFailed { error, .. }) => eprintln!("{}", error),
//!             Event::Navigation(NavigationEvent::ToDetail { photo_id }) => show(photo_id),
//!             _ => {}
//!         }
//!     }
//! });
//!
//! let session = SearchSession::start(use_case, config, sender);
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
