//! Headless emulator backed by a flat memory image

use statecast_shared::Button;

use super::{Emulator, EmulatorFault, GAME_BOY_ADDRESS_SPACE, MemoryReader, ScreenHandle};

/// Flat, writable address space with a frame counter and button lines.
///
/// Stepping does not execute anything; memory only changes through
/// [`MemoryImage::load_at`] and [`MemoryImage::poke`]. This makes it a
/// deterministic stand-in for a live core.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    memory: Vec<u8>,
    frame: u64,
    buttons: [bool; Button::ALL.len()],
    screen: Option<ScreenHandle>,
}

impl MemoryImage {
    /// Zero-filled image of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            memory: vec![0; size],
            frame: 0,
            buttons: [false; Button::ALL.len()],
            screen: None,
        }
    }

    /// Zero-filled 64 KiB Game Boy address space
    pub fn game_boy() -> Self {
        Self::new(GAME_BOY_ADDRESS_SPACE)
    }

    /// Copy `bytes` into the image starting at `base`.
    pub fn load_at(&mut self, base: u32, bytes: &[u8]) -> Result<(), EmulatorFault> {
        let start = base as usize;
        let end = start
            .checked_add(bytes.len())
            .filter(|&end| end <= self.memory.len())
            .ok_or_else(|| {
                EmulatorFault::Load(format!(
                    "{} bytes at {:#06X} exceed the {} byte address space",
                    bytes.len(),
                    base,
                    self.memory.len()
                ))
            })?;
        self.memory[start..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Write one byte. Writes past the end are ignored.
    pub fn poke(&mut self, address: u32, value: u8) {
        if let Some(slot) = self.memory.get_mut(address as usize) {
            *slot = value;
        }
    }

    /// Write a run of bytes. Bytes past the end are ignored.
    pub fn poke_slice(&mut self, address: u32, values: &[u8]) {
        for (i, &value) in values.iter().enumerate() {
            self.poke(address + i as u32, value);
        }
    }

    /// Whether a button line is currently held
    pub fn is_pressed(&self, button: Button) -> bool {
        self.buttons[button.index()]
    }

    /// Frames stepped so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Set the handle returned by [`Emulator::capture_screen`].
    pub fn set_screen(&mut self, screen: Option<ScreenHandle>) {
        self.screen = screen;
    }
}

impl MemoryReader for MemoryImage {
    fn memory_size(&self) -> usize {
        self.memory.len()
    }

    fn read_memory(&self, address: u32, buf: &mut [u8]) -> Result<(), EmulatorFault> {
        let start = address as usize;
        let source = start
            .checked_add(buf.len())
            .and_then(|end| self.memory.get(start..end))
            .ok_or_else(|| EmulatorFault::Read {
                address,
                len: buf.len(),
                reason: "outside memory image".to_string(),
            })?;
        buf.copy_from_slice(source);
        Ok(())
    }
}

impl Emulator for MemoryImage {
    fn set_button(&mut self, button: Button, pressed: bool) -> Result<(), EmulatorFault> {
        self.buttons[button.index()] = pressed;
        Ok(())
    }

    fn step_frame(&mut self) -> Result<u64, EmulatorFault> {
        self.frame += 1;
        Ok(self.frame)
    }

    fn capture_screen(&mut self) -> Option<ScreenHandle> {
        self.screen.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_read() {
        let mut image = MemoryImage::game_boy();
        image.load_at(0xD362, &[10, 12]).unwrap();

        let mut buf = [0u8; 2];
        image.read_memory(0xD362, &mut buf).unwrap();
        assert_eq!(buf, [10, 12]);
        assert_eq!(image.memory_size(), 0x10000);
    }

    #[test]
    fn test_load_past_end_fails() {
        let mut image = MemoryImage::new(16);
        assert!(matches!(
            image.load_at(10, &[0; 8]),
            Err(EmulatorFault::Load(_))
        ));
    }

    #[test]
    fn test_read_past_end_faults() {
        let image = MemoryImage::new(16);
        let mut buf = [0u8; 4];
        assert!(image.read_memory(14, &mut buf).is_err());
    }

    #[test]
    fn test_step_and_buttons() {
        let mut image = MemoryImage::new(16);
        assert_eq!(image.step_frame().unwrap(), 1);
        assert_eq!(image.step_frame().unwrap(), 2);

        image.set_button(Button::Start, true).unwrap();
        assert!(image.is_pressed(Button::Start));
        assert!(!image.is_pressed(Button::A));
    }
}
