//! Assembling the headless address space from files on disk

use std::path::Path;

use anyhow::{Context, Result, bail};
use statecast_core::config::EmulatorConfig;
use statecast_core::{CartridgeHeader, MemoryImage};

/// Bytes of the cartridge mapped into the address space (banks 0 and 1)
pub const ROM_WINDOW: usize = 0x8000;

/// Build a Game Boy address space from the configured ROM and memory dump.
///
/// The ROM's title must be one of `expected_titles` when that list is
/// non-empty. The memory dump is loaded after the ROM, so it wins where the
/// two overlap.
pub fn load(config: &EmulatorConfig) -> Result<MemoryImage> {
    let mut image = MemoryImage::game_boy();

    if let Some(rom) = &config.rom {
        let bytes = read(rom)?;
        let window = &bytes[..bytes.len().min(ROM_WINDOW)];
        image.load_at(0, window)?;

        let header = CartridgeHeader::read(&image)?;
        if !header.is_accepted(&config.expected_titles) {
            bail!(
                "{} is '{}', expected one of {:?}",
                rom.display(),
                header.title,
                config.expected_titles
            );
        }
        tracing::info!(title = %header.title, bytes = bytes.len(), "Cartridge loaded");
    }

    if let Some(dump) = &config.memory_image {
        let bytes = read(dump)?;
        image
            .load_at(config.memory_image_base, &bytes)
            .with_context(|| format!("failed to map {}", dump.display()))?;
        tracing::info!(
            base = %format!("{:#06X}", config.memory_image_base),
            bytes = bytes.len(),
            "Memory image loaded"
        );
    }

    if config.rom.is_none() && config.memory_image.is_none() {
        tracing::warn!("No ROM or memory image configured, serving zeroed memory");
    }
    Ok(image)
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use statecast_core::MemoryReader;
    use statecast_core::emulator::TITLE_START;

    fn rom(title: &str) -> Vec<u8> {
        let mut bytes = vec![0u8; 0x10000];
        let start = TITLE_START as usize;
        bytes[start..start + title.len()].copy_from_slice(title.as_bytes());
        bytes[0x4000] = 0xAB;
        bytes[0x8000] = 0xCD; // outside the mapped window
        bytes
    }

    fn peek(image: &MemoryImage, address: u32) -> u8 {
        let mut buf = [0u8];
        image.read_memory(address, &mut buf).unwrap();
        buf[0]
    }

    #[test]
    fn test_rom_and_dump_mapped() {
        let dir = tempfile::tempdir().unwrap();
        let rom_path = dir.path().join("red.gb");
        let dump_path = dir.path().join("wram.bin");
        std::fs::write(&rom_path, rom("POKEMON RED")).unwrap();
        std::fs::write(&dump_path, [1u8, 2, 3]).unwrap();

        let config = EmulatorConfig {
            rom: Some(rom_path),
            memory_image: Some(dump_path),
            ..EmulatorConfig::default()
        };
        let image = load(&config).unwrap();
        assert_eq!(peek(&image, 0x4000), 0xAB);
        assert_eq!(peek(&image, 0x8000), 0);
        assert_eq!(peek(&image, 0xC000), 1);
        assert_eq!(peek(&image, 0xC002), 3);
    }

    #[test]
    fn test_unexpected_title_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let rom_path = dir.path().join("other.gb");
        std::fs::write(&rom_path, rom("TETRIS")).unwrap();

        let config = EmulatorConfig {
            rom: Some(rom_path.clone()),
            ..EmulatorConfig::default()
        };
        let error = load(&config).unwrap_err();
        assert!(error.to_string().contains("TETRIS"));

        let any_title = EmulatorConfig {
            rom: Some(rom_path),
            expected_titles: Vec::new(),
            ..EmulatorConfig::default()
        };
        assert!(load(&any_title).is_ok());
    }

    #[test]
    fn test_oversized_dump_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let dump_path = dir.path().join("big.bin");
        std::fs::write(&dump_path, vec![0u8; 0x5000]).unwrap();

        let config = EmulatorConfig {
            memory_image: Some(dump_path),
            ..EmulatorConfig::default()
        };
        assert!(load(&config).is_err());
    }

    #[test]
    fn test_missing_file_reported() {
        let config = EmulatorConfig {
            rom: Some("/nonexistent/red.gb".into()),
            ..EmulatorConfig::default()
        };
        let error = load(&config).unwrap_err();
        assert!(error.to_string().contains("failed to read"));
    }
}
