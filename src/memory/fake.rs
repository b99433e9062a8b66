use super::accessor::{MemoryAccessor, MemoryError, MemoryResult, MEM1_START};

/// Size of the MEM1 window backed by a [`FakeMemory`]
pub const FAKE_MEM1_LEN: usize = 0x10000;

/// In-memory stand-in for an emulator process
///
/// Backs the first `FAKE_MEM1_LEN` bytes of MEM1. The process can be made to
/// appear or vanish with [`FakeMemory::set_running`]; while it is gone,
/// `connect` fails with `NotFound` and reads fail with `ConnectionLost`.
#[derive(Debug, Clone)]
pub struct FakeMemory {
    mem1: Vec<u8>,
    running: bool,
    connected: bool,
    connect_attempts: usize,
}

impl Default for FakeMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeMemory {
    /// A running emulator with zeroed memory
    pub fn new() -> Self {
        Self {
            mem1: vec![0; FAKE_MEM1_LEN],
            running: true,
            connected: false,
            connect_attempts: 0,
        }
    }

    /// Simulate the emulator process starting or exiting
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
        if !running {
            self.connected = false;
        }
    }

    /// How often `connect` has been called
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts
    }

    fn offset(&self, address: u32, len: usize) -> MemoryResult<usize> {
        let offset = address
            .checked_sub(MEM1_START)
            .ok_or(MemoryError::InvalidAddress { address })? as usize;
        if offset + len > self.mem1.len() {
            return Err(MemoryError::InvalidAddress { address });
        }
        Ok(offset)
    }

    pub fn write_bytes(&mut self, address: u32, bytes: &[u8]) -> MemoryResult<()> {
        let offset = self.offset(address, bytes.len())?;
        self.mem1[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_u32(&mut self, address: u32, value: u32) -> MemoryResult<()> {
        self.write_bytes(address, &value.to_be_bytes())
    }

    pub fn write_f32(&mut self, address: u32, value: f32) -> MemoryResult<()> {
        self.write_bytes(address, &value.to_be_bytes())
    }

    /// Write `value` followed by a NUL terminator
    pub fn write_c_string(&mut self, address: u32, value: &str) -> MemoryResult<()> {
        let mut bytes = value.as_bytes().to_vec();
        bytes.push(0);
        self.write_bytes(address, &bytes)
    }
}

impl MemoryAccessor for FakeMemory {
    fn connect(&mut self) -> MemoryResult<String> {
        self.connect_attempts += 1;
        if !self.running {
            return Err(MemoryError::NotFound {
                reason: "fake emulator not running".to_string(),
            });
        }
        self.connected = true;
        Ok(String::from_utf8_lossy(&self.mem1[..4]).into_owned())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn read(&self, address: u32, buffer: &mut [u8]) -> MemoryResult<()> {
        if !self.running || !self.connected {
            return Err(MemoryError::ConnectionLost);
        }
        let offset = self.offset(address, buffer.len())?;
        buffer.copy_from_slice(&self.mem1[offset..offset + buffer.len()]);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_reports_game_id() {
        let mut memory = FakeMemory::new();
        memory.write_bytes(MEM1_START, b"SB4E").unwrap();
        assert_eq!(memory.connect().unwrap(), "SB4E");
        assert!(memory.is_connected());
    }

    #[test]
    fn test_connect_fails_when_not_running() {
        let mut memory = FakeMemory::new();
        memory.set_running(false);
        assert!(matches!(memory.connect(), Err(MemoryError::NotFound { .. })));
        assert_eq!(memory.connect_attempts(), 1);
    }

    #[test]
    fn test_read_pointer_and_string() {
        let mut memory = FakeMemory::new();
        memory.write_u32(0x8000_3FF8, 0x8000_4000).unwrap();
        memory.write_c_string(0x8000_4000, "IslandFleetGalaxy").unwrap();
        memory.connect().unwrap();

        assert_eq!(memory.read_pointer(0x8000_3FF8).unwrap(), Some(0x8000_4000));
        assert_eq!(memory.read_pointer(0x8000_3FF0).unwrap(), None);
        assert_eq!(
            memory.read_c_string(0x8000_4000, 64).unwrap(),
            "IslandFleetGalaxy"
        );
    }

    #[test]
    fn test_unmapped_pointer_is_invalid_address() {
        let mut memory = FakeMemory::new();
        memory.connect().unwrap();
        assert!(matches!(
            memory.read_pointer(0x0000_0010),
            Err(MemoryError::InvalidAddress { address: 0x10 })
        ));
    }

    #[test]
    fn test_read_after_exit_is_connection_lost() {
        let mut memory = FakeMemory::new();
        memory.connect().unwrap();
        memory.set_running(false);
        assert!(matches!(
            memory.read_u32(MEM1_START),
            Err(MemoryError::ConnectionLost)
        ));
        assert!(!memory.is_connected());
    }
}
