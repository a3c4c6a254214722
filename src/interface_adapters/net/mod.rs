// Network adapter modules split by client sockets vs HTTP routes.

pub mod client;
pub mod internal;

pub use client::{room_event_serializer, ws_handler};
pub use internal::list_rooms_handler;
