use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::error::{RecorderError, Result};
use crate::gst::{FrameSample, GhostType, GstHeader};

/// One start-to-stop recording episode
///
/// Samples must arrive with strictly consecutive frame counters; anything
/// else is a sync error and leaves the buffer untouched.
#[derive(Debug)]
pub struct RecordingSession {
    id: Uuid,
    started_at: DateTime<Utc>,
    stage_name: String,
    ghost_type: GhostType,
    ghost_data_index: u32,
    samples: Vec<FrameSample>,
}

impl RecordingSession {
    pub fn new(stage_name: String, ghost_type: GhostType, ghost_data_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            stage_name,
            ghost_type,
            ghost_data_index,
            samples: Vec::new(),
        }
    }

    /// Unique session ID for log correlation
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Wall-clock time since the session started
    pub fn elapsed(&self) -> TimeDelta {
        Utc::now() - self.started_at
    }

    /// Galaxy the recording takes place in
    pub fn stage_name(&self) -> &str {
        &self.stage_name
    }

    pub fn ghost_type(&self) -> GhostType {
        self.ghost_type
    }

    pub fn ghost_data_index(&self) -> u32 {
        self.ghost_data_index
    }

    pub fn object_name(&self) -> String {
        self.ghost_type.object_name(&self.stage_name)
    }

    /// Frame counter of the newest sample
    pub fn last_frame(&self) -> Option<u32> {
        self.samples.last().map(|s| s.frame)
    }

    pub fn samples(&self) -> &[FrameSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Append the next sample, filling in its change flags
    pub fn push(&mut self, mut sample: FrameSample) -> Result<()> {
        let zero = FrameSample::default();
        let previous = match self.samples.last() {
            Some(last) => {
                let expected = last.frame.wrapping_add(1);
                if sample.frame != expected {
                    return Err(RecorderError::Sync {
                        expected,
                        actual: sample.frame,
                    });
                }
                last
            }
            None => &zero,
        };

        sample.flags = sample.diff_flags(previous, self.ghost_type);
        debug!(
            "Session {}: frame {} flags {:#06x}",
            self.id, sample.frame, sample.flags.0
        );
        self.samples.push(sample);
        Ok(())
    }

    pub fn header(&self, playback_rate: u16) -> GstHeader {
        GstHeader::for_samples(
            self.ghost_type,
            self.ghost_data_index,
            playback_rate,
            &self.samples,
        )
    }
}
