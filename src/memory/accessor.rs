use thiserror::Error;

/// Errors raised while talking to the emulator process
#[derive(Debug, Error)]
pub enum MemoryError {
    /// No emulator process to attach to
    #[error("Emulator process not found: {reason}")]
    NotFound { reason: String },

    /// Address lies outside every mapped emulated region
    #[error("Invalid address 0x{address:08X}")]
    InvalidAddress { address: u32 },

    /// Read failed or returned bytes that don't decode
    #[error("Failed to read 0x{address:08X}: {reason}")]
    ReadError { address: u32, reason: String },

    /// The attached process went away
    #[error("Connection to emulator lost")]
    ConnectionLost,
}

pub type MemoryResult<T> = std::result::Result<T, MemoryError>;

/// A fixed-size structure that can be decoded from emulated (big-endian) memory
pub trait MemoryLayout: Sized {
    /// Size in bytes of the structure in target memory
    const SIZE: usize;

    /// Decode from exactly `SIZE` bytes read at `address`
    fn decode(address: u32, bytes: &[u8]) -> MemoryResult<Self>;
}

/// Read access to the memory of an emulated console
///
/// Implementations:
/// - [`DolphinProcess`](super::DolphinProcess): a running Dolphin emulator
/// - [`FakeMemory`](super::FakeMemory): in-memory regions (for testing)
pub trait MemoryAccessor {
    /// Attach to the target and return the game ID found at the start of MEM1
    fn connect(&mut self) -> MemoryResult<String>;

    /// Drop the current attachment, if any
    fn disconnect(&mut self);

    /// Check if currently attached
    fn is_connected(&self) -> bool;

    /// Fill `buffer` with the bytes at `address`
    fn read(&self, address: u32, buffer: &mut [u8]) -> MemoryResult<()>;

    fn read_u32(&self, address: u32) -> MemoryResult<u32> {
        let mut buffer = [0; 4];
        self.read(address, &mut buffer)?;
        Ok(u32::from_be_bytes(buffer))
    }

    /// Dereference a pointer stored at `address`. A null pointer yields `None`
    fn read_pointer(&self, address: u32) -> MemoryResult<Option<u32>> {
        match self.read_u32(address)? {
            0 => Ok(None),
            ptr => Ok(Some(ptr)),
        }
    }

    fn read_struct<L: MemoryLayout>(&self, address: u32) -> MemoryResult<L>
    where
        Self: Sized,
    {
        let mut buffer = vec![0; L::SIZE];
        self.read(address, &mut buffer)?;
        L::decode(address, &buffer)
    }

    /// Read a NUL-terminated ASCII string of at most `max_len` bytes
    fn read_c_string(&self, address: u32, max_len: usize) -> MemoryResult<String> {
        if address == 0 {
            return Err(MemoryError::InvalidAddress { address });
        }

        let mut chars = Vec::new();
        let mut byte = [0u8; 1];
        for offset in 0..max_len as u32 {
            self.read(address.wrapping_add(offset), &mut byte)?;
            if byte[0] == 0 {
                return String::from_utf8(chars).map_err(|e| MemoryError::ReadError {
                    address,
                    reason: e.to_string(),
                });
            }
            chars.push(byte[0]);
        }

        Err(MemoryError::ReadError {
            address,
            reason: format!("string longer than {} bytes", max_len),
        })
    }
}

/// Emulated address ranges of the console's main memories
pub const MEM1_START: u32 = 0x8000_0000;
pub const MEM1_SIZE: u32 = 0x0180_0000;
pub const MEM2_START: u32 = 0x9000_0000;
pub const MEM2_SIZE: u32 = 0x0400_0000;

/// Split an emulated address into (region index, offset into region).
/// Region 0 is MEM1, region 1 is MEM2.
pub fn translate(address: u32, len: usize) -> MemoryResult<(usize, usize)> {
    let end = address as u64 + len as u64;
    for (index, (start, size)) in [(MEM1_START, MEM1_SIZE), (MEM2_START, MEM2_SIZE)]
        .into_iter()
        .enumerate()
    {
        if address >= start && end <= start as u64 + size as u64 {
            return Ok((index, (address - start) as usize));
        }
    }
    Err(MemoryError::InvalidAddress { address })
}
