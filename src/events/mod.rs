//! # Events Module
//!
//! Progress events emitted by the HDR workflow.
//!
//! The core library never prints. It sends events through a channel so
//! the CLI (or a future GUI) decides how to show progress.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Bracket(BracketEvent::Completed { output, .. }) = event {
//!             println!("wrote {}", output.display());
//!         }
//!     }
//! });
//!
//! workflow.run_with_events(&sender)?;
//! ```

mod channel;
mod types;

pub use channel::{null_sender, EventChannel, EventReceiver, EventSender};
pub use types::*;
