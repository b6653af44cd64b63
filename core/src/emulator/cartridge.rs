//! Cartridge header inspection through emulated memory

use super::{EmulatorFault, MemoryReader};

/// First byte of the title field in the cartridge header
pub const TITLE_START: u32 = 0x0134;
/// One past the last title byte (the CGB flag shares 0x0143 on newer carts)
pub const TITLE_END: u32 = 0x0143;

/// Fields read from the header mapped at 0x0100-0x014F.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub title: String,
}

impl CartridgeHeader {
    /// Read the header from bank 0 as currently mapped.
    pub fn read(memory: &impl MemoryReader) -> Result<Self, EmulatorFault> {
        let mut raw = [0u8; (TITLE_END - TITLE_START) as usize];
        if memory.memory_size() < TITLE_END as usize {
            return Err(EmulatorFault::Read {
                address: TITLE_START,
                len: raw.len(),
                reason: "address space too small for a cartridge header".to_string(),
            });
        }
        memory.read_memory(TITLE_START, &mut raw)?;

        let title = String::from_utf8_lossy(&raw)
            .trim_matches('\0')
            .trim()
            .to_string();
        Ok(Self { title })
    }

    /// Whether the title matches one of `accepted` (empty accepts everything).
    pub fn is_accepted(&self, accepted: &[String]) -> bool {
        accepted.is_empty() || accepted.iter().any(|t| t == &self.title)
    }
}
