//! Statecast Core - schema-driven game state broadcast
//!
//! Reads a running emulator's memory through a declarative address schema,
//! turns it into a structured game-state snapshot and streams that snapshot
//! to WebSocket clients, which may send joypad presses back.
//!
//! # Architecture
//!
//! - [`schema`] - address/value documents loaded into a [`Registry`]
//! - [`decode`] - raw reads for each field kind
//! - [`translate`] - raw values to labels and text
//! - [`compose`] - per-category builders producing a [`Snapshot`]
//! - [`session`] - the tick loop, button timing and client fan-out
//! - [`net`] - the axum WebSocket transport and [`StateServer`]
//! - [`emulator`] - the capability surface an emulator core provides

pub mod compose;
pub mod config;
pub mod decode;
pub mod emulator;
pub mod net;
pub mod schema;
pub mod session;
pub mod translate;

pub use compose::{Composer, FrameContext, GameState, Snapshot, StatePriority};
pub use config::{Config, ConfigError};
pub use decode::{DecodedField, RawValue, Translated, decode};
pub use emulator::{
    CartridgeHeader, Emulator, EmulatorFault, MemoryImage, MemoryReader, ScreenHandle,
};
pub use net::StateServer;
pub use schema::{Category, FieldKind, FieldSpec, Label, Registry, RegistryDocuments, SchemaError};
pub use session::{
    ButtonTimer, ClientHub, ClientId, DropReason, SessionError, SessionInput, SessionLoop,
    SessionState, SessionStats, TickReport,
};
pub use translate::Translator;
