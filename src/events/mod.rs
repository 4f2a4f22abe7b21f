//! # Events Module
//!
//! Progress reporting for whatever UI drives the core.
//!
//! The core emits [`Event`]s through an [`EventSender`]; the UI owns the
//! receiving end and all of its threading. Every operation works the same
//! with a disabled sender.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Hash(HashEvent::Progress(p)) = event {
//!             println!("Hashed {}/{}", p.completed, p.total);
//!         }
//!     }
//! });
//!
//! let result = ScanSession::new(config).with_events(sender).scan(&roots)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender};
pub use types::*;
