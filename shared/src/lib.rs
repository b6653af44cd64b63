//! Shared types for statecast.
//!
//! - [`button`] - joypad buttons as named on the wire
//! - [`protocol`] - client/server JSON messages
//! - [`schema`] - shapes of the address and value documents

pub mod button;
pub mod protocol;
pub mod schema;

pub use button::{Button, UnknownButton};
pub use protocol::{
    ClientMessage, ProtocolError, ServerMessage, decode_command, encode_state_update,
};
pub use schema::{
    Address, AddressDocument, Endian, FieldDocument, KindName, TableDocument, ValueDocument,
};
