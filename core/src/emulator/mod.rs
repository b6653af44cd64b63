//! Emulator capability surface
//!
//! The emulator core itself (CPU, PPU, frame stepping) is a collaborator.
//! This module defines the narrow surface the rest of the crate relies on:
//!
//! - [`MemoryReader`] - bounded reads from the emulated address space
//! - [`Emulator`] - button lines, frame stepping and screen capture
//!
//! [`MemoryImage`] is a headless implementation backed by a flat byte image,
//! used by the tests and by the server when no live core is attached.

mod cartridge;
mod image;

pub use cartridge::{CartridgeHeader, TITLE_END, TITLE_START};
pub use image::MemoryImage;

use serde::Serialize;
use statecast_shared::Button;

/// Size of the Game Boy's 16-bit address space.
pub const GAME_BOY_ADDRESS_SPACE: usize = 0x10000;

/// Read access to emulated memory.
pub trait MemoryReader {
    /// Number of addressable bytes; reads must stay below this bound.
    fn memory_size(&self) -> usize;

    /// Fill `buf` with the bytes starting at `address`.
    ///
    /// Callers check bounds against [`MemoryReader::memory_size`] first; an
    /// error here means the core itself failed.
    fn read_memory(&self, address: u32, buf: &mut [u8]) -> Result<(), EmulatorFault>;
}

/// Control surface of a running emulator core.
pub trait Emulator: MemoryReader + Send {
    /// Drive a joypad line.
    fn set_button(&mut self, button: Button, pressed: bool) -> Result<(), EmulatorFault>;

    /// Advance one frame, returning the new frame index.
    fn step_frame(&mut self) -> Result<u64, EmulatorFault>;

    /// Current framebuffer as an already-encoded image, if the core renders one.
    fn capture_screen(&mut self) -> Option<ScreenHandle>;
}

/// Opaque encoded-image handle (e.g. a base64 JPEG) produced by the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ScreenHandle(pub String);

/// Failures reported by the emulator core. No safe continuation exists.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EmulatorFault {
    #[error("memory read of {len} bytes at {address:#06X} failed: {reason}")]
    Read {
        address: u32,
        len: usize,
        reason: String,
    },
    #[error("frame step failed: {0}")]
    Step(String),
    #[error("button injection failed: {0}")]
    Input(String),
    #[error("memory image load failed: {0}")]
    Load(String),
}
