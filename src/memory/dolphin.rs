use tracing::{debug, info};

use super::accessor::{MemoryAccessor, MemoryError, MemoryResult, MEM1_START};

/// Process names used by the Dolphin builds we can attach to
const PROCESS_NAME_PREFIX: &str = "dolphin-emu";

/// Shared-memory object Dolphin backs emulated RAM with
const RAM_MAPPING_NAME: &str = "dolphin-emu";

/// Placement of MEM1 and MEM2 inside Dolphin's RAM backing file
const MEM1_FILE_OFFSET: u64 = 0;
const MEM1_MAPPING_SIZE: u64 = 0x0200_0000;
const MEM2_FILE_OFFSET: u64 = 0x0204_0000;
const MEM2_MAPPING_SIZE: u64 = 0x0400_0000;

/// Host-side location of an attached Dolphin's emulated RAM
#[derive(Debug, Clone, Copy)]
struct Attachment {
    pid: i32,
    mem1: usize,
    mem2: Option<usize>,
}

/// Memory accessor reading from a running Dolphin emulator
///
/// Only Linux is supported: the process is found through `/proc` and read
/// with `process_vm_readv`, which needs ptrace permission on the target.
#[derive(Debug, Default)]
pub struct DolphinProcess {
    attachment: Option<Attachment>,
}

impl DolphinProcess {
    pub fn new() -> Self {
        Self::default()
    }

    /// PID of the attached emulator, if any
    pub fn pid(&self) -> Option<i32> {
        self.attachment.map(|a| a.pid)
    }
}

impl MemoryAccessor for DolphinProcess {
    fn connect(&mut self) -> MemoryResult<String> {
        let attachment = platform::attach()?;
        info!(
            "Attached to Dolphin (pid {}, MEM1 at {:#x})",
            attachment.pid, attachment.mem1
        );
        self.attachment = Some(attachment);

        let mut game_id = [0u8; 4];
        if let Err(e) = self.read(MEM1_START, &mut game_id) {
            self.attachment = None;
            return Err(e);
        }
        Ok(String::from_utf8_lossy(&game_id).into_owned())
    }

    fn disconnect(&mut self) {
        if let Some(attachment) = self.attachment.take() {
            debug!("Detached from Dolphin (pid {})", attachment.pid);
        }
    }

    fn is_connected(&self) -> bool {
        self.attachment.is_some()
    }

    fn read(&self, address: u32, buffer: &mut [u8]) -> MemoryResult<()> {
        let attachment = self.attachment.ok_or(MemoryError::ConnectionLost)?;
        let (region, offset) = super::accessor::translate(address, buffer.len())?;
        let base = match region {
            0 => attachment.mem1,
            _ => attachment
                .mem2
                .ok_or(MemoryError::InvalidAddress { address })?,
        };
        platform::read_remote(attachment.pid, base + offset, address, buffer)
    }
}

/// Parse one `/proc/<pid>/maps` line into (start, file offset, length, path)
fn parse_maps_line(line: &str) -> Option<(usize, u64, u64, &str)> {
    let mut fields = line.split_whitespace();
    let range = fields.next()?;
    let _perms = fields.next()?;
    let offset = u64::from_str_radix(fields.next()?, 16).ok()?;
    let _dev = fields.next()?;
    let _inode = fields.next()?;
    let path = fields.next()?;

    let (start, end) = range.split_once('-')?;
    let start = usize::from_str_radix(start, 16).ok()?;
    let end = usize::from_str_radix(end, 16).ok()?;
    Some((start, offset, end.checked_sub(start)? as u64, path))
}

/// Locate MEM1 and MEM2 host addresses in a maps listing
fn find_ram_mappings(maps: &str) -> Option<(usize, Option<usize>)> {
    let mut mem1 = None;
    let mut mem2 = None;

    for (start, offset, len, path) in maps.lines().filter_map(parse_maps_line) {
        if !path.contains(RAM_MAPPING_NAME) {
            continue;
        }
        if offset == MEM1_FILE_OFFSET && len == MEM1_MAPPING_SIZE && mem1.is_none() {
            mem1 = Some(start);
        } else if offset == MEM2_FILE_OFFSET && len == MEM2_MAPPING_SIZE && mem2.is_none() {
            mem2 = Some(start);
        }
    }

    mem1.map(|mem1| (mem1, mem2))
}

#[cfg(target_os = "linux")]
mod platform {
    use std::fs;

    use super::{find_ram_mappings, Attachment, PROCESS_NAME_PREFIX};
    use crate::memory::accessor::{MemoryError, MemoryResult};

    pub(super) fn attach() -> MemoryResult<Attachment> {
        let entries = fs::read_dir("/proc").map_err(|e| MemoryError::NotFound {
            reason: format!("cannot list /proc: {}", e),
        })?;

        let mut found_process = false;
        for entry in entries.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|name| name.parse::<i32>().ok())
            else {
                continue;
            };

            let Ok(comm) = fs::read_to_string(entry.path().join("comm")) else {
                continue;
            };
            if !comm.trim().starts_with(PROCESS_NAME_PREFIX) {
                continue;
            }
            found_process = true;

            let Ok(maps) = fs::read_to_string(entry.path().join("maps")) else {
                continue;
            };
            if let Some((mem1, mem2)) = find_ram_mappings(&maps) {
                return Ok(Attachment { pid, mem1, mem2 });
            }
        }

        let reason = if found_process {
            "Dolphin is running but no game is emulated".to_string()
        } else {
            "no Dolphin process running".to_string()
        };
        Err(MemoryError::NotFound { reason })
    }

    pub(super) fn read_remote(
        pid: i32,
        host_address: usize,
        address: u32,
        buffer: &mut [u8],
    ) -> MemoryResult<()> {
        let local = libc::iovec {
            iov_base: buffer.as_mut_ptr().cast(),
            iov_len: buffer.len(),
        };
        let remote = libc::iovec {
            iov_base: host_address as *mut libc::c_void,
            iov_len: buffer.len(),
        };

        // SAFETY: `local` points to `buffer`, which is valid for writes of
        // `buffer.len()` bytes for the duration of the call. `remote` is only
        // interpreted in the target's address space by the kernel.
        let read = unsafe { libc::process_vm_readv(pid, &local, 1, &remote, 1, 0) };

        if read < 0 {
            let err = std::io::Error::last_os_error();
            return Err(match err.raw_os_error() {
                // Translated addresses always fall inside a RAM mapping, so
                // EFAULT means emulation stopped and the mapping is gone
                Some(libc::ESRCH) | Some(libc::EFAULT) => MemoryError::ConnectionLost,
                _ => MemoryError::ReadError {
                    address,
                    reason: err.to_string(),
                },
            });
        }
        if read as usize != buffer.len() {
            return Err(MemoryError::ReadError {
                address,
                reason: format!("short read: {} of {} bytes", read, buffer.len()),
            });
        }
        Ok(())
    }
}

#[cfg(not(target_os = "linux"))]
mod platform {
    use super::Attachment;
    use crate::memory::accessor::{MemoryError, MemoryResult};

    pub(super) fn attach() -> MemoryResult<Attachment> {
        Err(MemoryError::NotFound {
            reason: "attaching to Dolphin is only supported on Linux".to_string(),
        })
    }

    pub(super) fn read_remote(
        _pid: i32,
        _host_address: usize,
        _address: u32,
        _buffer: &mut [u8],
    ) -> MemoryResult<()> {
        Err(MemoryError::ConnectionLost)
    }
}
