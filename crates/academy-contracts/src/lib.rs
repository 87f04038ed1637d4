// Public contracts for the academy realtime API
// This crate defines the event DTOs shared by the server and the admin client.
// It has no internal dependencies so both sides can use it without pulling in
// the storage or transport stacks.

pub mod api;
pub mod event;

pub use api::*;
pub use event::*;
