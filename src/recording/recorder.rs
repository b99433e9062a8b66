use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::config::RecorderConfig;
use super::events::{RecorderEvent, RecorderState};
use super::session::RecordingSession;
use crate::error::{RecorderError, Result};
use crate::gst::{
    write_gst_file, FrameSample, GhostType, OutputTarget, RecorderInfo, RecorderMode,
    SUPPORTED_GAME_IDS, UNINITIALIZED_GAME_ID,
};
use crate::memory::MemoryAccessor;

/// Longest stage or action name read from game memory
const NAME_MAX_LEN: usize = 64;

/// Polls emulator memory for the game's GST recorder and dumps each finished
/// recording to disk
///
/// Drive it either with [`Recorder::run`] or one [`Recorder::tick`] at a time.
pub struct Recorder<M: MemoryAccessor> {
    memory: M,
    config: RecorderConfig,
    events: mpsc::UnboundedSender<RecorderEvent>,
    state: RecorderState,
    session: Option<RecordingSession>,

    /// Set once a non-recording mode was seen since entering
    /// `WaitingForSession`. Sessions only start on a fresh start signal.
    armed: bool,
}

impl<M: MemoryAccessor> Recorder<M> {
    pub fn new(
        memory: M,
        config: RecorderConfig,
        events: mpsc::UnboundedSender<RecorderEvent>,
    ) -> Self {
        Self {
            memory,
            config,
            events,
            state: RecorderState::Disconnected,
            session: None,
            armed: false,
        }
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// The session currently being recorded, if any
    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Delay before the next tick in the current state
    pub fn poll_period(&self) -> Duration {
        match self.state {
            RecorderState::Disconnected | RecorderState::WaitingForProcess => {
                self.config.connect_interval
            }
            _ => self.config.poll_interval,
        }
    }

    /// Poll until `shutdown` resolves or a fatal error occurs.
    ///
    /// A session in progress at shutdown is written out before returning.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!(
            "Recorder started, writing to {}",
            self.config.output_dir.display()
        );

        loop {
            self.tick()?;

            tokio::select! {
                _ = &mut shutdown => {
                    self.shutdown();
                    return Ok(());
                }
                _ = tokio::time::sleep(self.poll_period()) => {}
            }
        }
    }

    /// One bounded polling step. Only fatal errors are returned; everything
    /// else is logged and the machine moves to the state it recovers in.
    pub fn tick(&mut self) -> Result<()> {
        let outcome = match self.state {
            RecorderState::Disconnected => {
                self.enter(RecorderState::WaitingForProcess);
                self.try_connect()
            }
            RecorderState::WaitingForProcess => self.try_connect(),
            RecorderState::WaitingForRecorderPointer => self.find_recorder_info(),
            RecorderState::WaitingForSession => self.wait_for_session(),
            RecorderState::Recording => self.record_frame(),
            // `flush` enters and leaves Flushing within one call, so a tick
            // never starts here. Observers still see it in `StateChanged`.
            RecorderState::Flushing => {
                self.enter(RecorderState::WaitingForSession);
                Ok(())
            }
        };

        match outcome {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.recover(e);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Save any session in progress and detach
    pub fn shutdown(&mut self) {
        if self.session.is_some() {
            info!("Saving recording in progress before exit");
        }
        self.flush(RecorderState::Disconnected);
        self.memory.disconnect();
    }

    fn emit(&self, event: RecorderEvent) {
        // Nobody listening is fine
        let _ = self.events.send(event);
    }

    fn enter(&mut self, to: RecorderState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!("Recorder state: {} -> {}", from, to);
        self.state = to;
        self.emit(RecorderEvent::StateChanged { from, to });

        match to {
            RecorderState::WaitingForProcess => self.emit(RecorderEvent::Connecting),
            RecorderState::WaitingForRecorderPointer => {
                self.emit(RecorderEvent::SearchingPointer {
                    address: self.config.recorder_info_ptr,
                })
            }
            RecorderState::WaitingForSession => {
                self.armed = false;
                self.emit(RecorderEvent::WaitingForSession);
            }
            _ => {}
        }
    }

    fn try_connect(&mut self) -> Result<()> {
        match self.memory.connect() {
            Ok(game_id) if game_id == UNINITIALIZED_GAME_ID => {
                debug!("Dolphin found, but no game booted yet");
                self.memory.disconnect();
                Ok(())
            }
            Ok(game_id) if SUPPORTED_GAME_IDS.contains(&game_id.as_str()) => {
                info!("Hooked to Dolphin, game ID: {}", game_id);
                self.emit(RecorderEvent::Hooked { game_id });
                self.enter(RecorderState::WaitingForRecorderPointer);
                Ok(())
            }
            Ok(game_id) => {
                self.memory.disconnect();
                error!("Game {:?} is not supported", game_id);
                Err(RecorderError::UnsupportedGame { game_id })
            }
            Err(e) => {
                debug!("Not connected: {}", e);
                self.memory.disconnect();
                Ok(())
            }
        }
    }

    /// Read the recorder info through the base pointer. `None` if the
    /// pointer is NULL.
    fn poll_info(&self) -> Result<Option<RecorderInfo>> {
        match self.memory.read_pointer(self.config.recorder_info_ptr)? {
            Some(ptr) => Ok(Some(self.memory.read_struct::<RecorderInfo>(ptr)?)),
            None => Ok(None),
        }
    }

    fn find_recorder_info(&mut self) -> Result<()> {
        if let Some(info) = self.poll_info()? {
            debug!("GstRecorderInfo found, mode {:?}", info.mode);
            self.enter(RecorderState::WaitingForSession);
            self.armed = info.mode != RecorderMode::Recording;
        }
        Ok(())
    }

    fn wait_for_session(&mut self) -> Result<()> {
        let Some(info) = self.poll_info()? else {
            self.enter(RecorderState::WaitingForRecorderPointer);
            return Ok(());
        };

        if info.mode != RecorderMode::Recording {
            self.armed = true;
            return Ok(());
        }
        if !self.armed {
            // Recording was already under way when we got here
            return Ok(());
        }

        self.start_session(&info)
    }

    fn start_session(&mut self, info: &RecorderInfo) -> Result<()> {
        let stage_name = self.memory.read_c_string(info.stage_name_ptr, NAME_MAX_LEN)?;
        let sample = self.capture(info)?;

        let mut session =
            RecordingSession::new(stage_name, info.ghost_type, info.ghost_data_index);
        session.push(sample)?;

        self.enter(RecorderState::Recording);
        info!(
            "Session {} started: {} in {} (slot {}, frame {})",
            session.id(),
            session.object_name(),
            session.stage_name(),
            session.ghost_data_index(),
            info.update_frame
        );
        self.emit(RecorderEvent::RecordingStarted {
            session_id: session.id(),
            object_name: session.object_name(),
            context: session.stage_name().to_string(),
        });
        self.session = Some(session);
        Ok(())
    }

    fn record_frame(&mut self) -> Result<()> {
        let Some(info) = self.poll_info()? else {
            warn!("GstRecorderInfo* became NULL while recording");
            self.flush(RecorderState::WaitingForRecorderPointer);
            return Ok(());
        };

        match info.mode {
            RecorderMode::Recording => {
                let last_frame = self.session.as_ref().and_then(|s| s.last_frame());
                if last_frame == Some(info.update_frame) {
                    return Ok(());
                }
                let sample = self.capture(&info)?;
                if let Some(session) = self.session.as_mut() {
                    session.push(sample)?;
                }
            }
            RecorderMode::Stopped => {
                info!("Recording stopped by the game");
                self.flush(RecorderState::WaitingForSession);
            }
            RecorderMode::Waiting | RecorderMode::Preparing => {
                warn!("Recorder reset while recording, saving what was captured");
                self.flush(RecorderState::WaitingForSession);
            }
        }
        Ok(())
    }

    fn capture(&self, info: &RecorderInfo) -> Result<FrameSample> {
        // Only Pichan racers encode the action name
        let action_name =
            if info.ghost_type == GhostType::PichanRacer && info.ghost.action_name_ptr != 0 {
                self.memory
                    .read_c_string(info.ghost.action_name_ptr, NAME_MAX_LEN)?
            } else {
                String::new()
            };
        Ok(FrameSample::capture(
            info.update_frame,
            &info.ghost,
            &action_name,
        ))
    }

    /// Write out the current session, if any, then move to `next`
    fn flush(&mut self, next: RecorderState) {
        let Some(session) = self.session.take() else {
            self.enter(next);
            return;
        };

        self.enter(RecorderState::Flushing);
        self.emit(RecorderEvent::RecordingStopped {
            frames: session.len(),
        });

        if session.is_empty() {
            warn!("Session {} captured no frames, nothing to save", session.id());
        } else {
            let object_name = session.object_name();
            let target = OutputTarget {
                root: &self.config.output_dir,
                context: session.stage_name(),
                object_name: &object_name,
                digits: session.ghost_type().suffix_digits(),
            };
            let header = session.header(self.config.playback_rate);

            match write_gst_file(&target, &header, session.samples(), self.config.byte_order) {
                Ok(path) => {
                    info!(
                        "Session {} saved: {} frames ({:.2}s, {:.2}s wall clock) to {}",
                        session.id(),
                        session.len(),
                        header.duration().as_secs_f64(),
                        session.elapsed().num_milliseconds() as f64 / 1000.0,
                        path.display()
                    );
                    self.emit(RecorderEvent::Dumped {
                        frames: session.len(),
                        path,
                    });
                }
                Err(e) => {
                    let e = RecorderError::from(e);
                    error!("Session {}: {}", session.id(), e);
                    self.emit(RecorderEvent::FlushFailed {
                        reason: e.to_string(),
                    });
                }
            }
        }

        self.enter(next);
    }

    fn recover(&mut self, e: RecorderError) {
        match e {
            RecorderError::ConnectionLost => {
                warn!("Lost connection to Dolphin");
                self.memory.disconnect();
                self.emit(RecorderEvent::ConnectionLost);
                self.flush(RecorderState::WaitingForProcess);
            }
            RecorderError::Sync { .. } => {
                if let Some(session) = self.session.take() {
                    error!(
                        "Session {} aborted after {} frames: {}",
                        session.id(),
                        session.len(),
                        e
                    );
                } else {
                    error!("{}", e);
                }
                self.emit(RecorderEvent::SessionAborted {
                    reason: e.to_string(),
                });
                self.enter(RecorderState::WaitingForSession);
            }
            RecorderError::Memory(err) => {
                if self.state == RecorderState::WaitingForRecorderPointer {
                    debug!("Could not read GstRecorderInfo: {}", err);
                } else {
                    warn!("Could not read GstRecorderInfo: {}", err);
                }
                self.flush(RecorderState::WaitingForRecorderPointer);
            }
            RecorderError::Io(_) | RecorderError::UnsupportedGame { .. } => {
                error!("{}", e);
                self.flush(RecorderState::WaitingForSession);
            }
        }
    }
}
