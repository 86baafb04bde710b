//! Background audio output.
//!
//! Clip playback runs on a dedicated worker thread. Commands travel over a
//! flume channel and finished buffers come back on a completion channel, so
//! the extraction thread never blocks on the device.

use asfclip_common::{Error, Result};
use asfclip_media::AudioFormat;
use bytes::Bytes;
use flume::{Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// A PCM output device driven by the audio worker.
pub trait AudioDevice: Send + 'static {
    fn open(&mut self, format: &AudioFormat) -> Result<()>;

    /// Play one buffer of PCM. Returns once the buffer has been consumed.
    fn write(&mut self, data: &[u8]) -> Result<()>;
}

/// Device that discards PCM and counts the bytes it was given.
#[derive(Debug, Default)]
pub struct NullAudioDevice {
    format: Option<AudioFormat>,
    written: Arc<AtomicU64>,
}

impl NullAudioDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared counter of bytes written, readable after the device moves to
    /// the worker thread.
    pub fn written(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.written)
    }
}

impl AudioDevice for NullAudioDevice {
    fn open(&mut self, format: &AudioFormat) -> Result<()> {
        self.format = Some(format.clone());
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let format = self.format.as_ref().ok_or(Error::NotInitialized)?;
        let align = format.block_align.max(1) as usize;
        if data.len() % align != 0 {
            return Err(Error::invalid_argument(format!(
                "buffer of {} bytes is not a multiple of block align {align}",
                data.len()
            )));
        }
        self.written.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

/// A finished playback request.
#[derive(Debug)]
pub struct Completion {
    /// The buffer that was submitted.
    pub buffer: Bytes,
    pub result: Result<()>,
}

enum Command {
    Open(AudioFormat, Sender<Result<()>>),
    Play(Bytes),
}

/// Handle to the audio worker thread.
pub struct AudioOutput {
    commands: Option<Sender<Command>>,
    completions: Receiver<Completion>,
    outstanding: usize,
    worker: Option<JoinHandle<()>>,
}

impl AudioOutput {
    /// Move `device` onto a new worker thread.
    pub fn spawn<D: AudioDevice>(device: D) -> Self {
        let (command_tx, command_rx) = flume::unbounded();
        let (done_tx, done_rx) = flume::unbounded();

        let worker = std::thread::spawn(move || {
            trace!("Audio worker started.");
            runner(device, command_rx, done_tx);
            trace!("Audio worker finished.");
        });

        Self {
            commands: Some(command_tx),
            completions: done_rx,
            outstanding: 0,
            worker: Some(worker),
        }
    }

    /// Open the device for `format`, waiting for the worker's answer.
    pub fn open(&mut self, format: &AudioFormat) -> Result<()> {
        let (reply_tx, reply_rx) = flume::bounded(1);
        self.send(Command::Open(format.clone(), reply_tx))?;
        reply_rx.recv().map_err(|_| worker_gone())?
    }

    /// Queue a clip for playback. Only one clip may be outstanding.
    pub fn play(&mut self, clip: Bytes) -> Result<()> {
        if self.is_busy() {
            return Err(Error::DeviceBusy);
        }
        debug!(bytes = clip.len(), "Submitting audio clip");
        self.send(Command::Play(clip))?;
        self.outstanding += 1;
        Ok(())
    }

    /// Whether a submitted clip has not completed yet.
    pub fn is_busy(&self) -> bool {
        self.outstanding > 0
    }

    /// Collect finished clips without blocking.
    pub fn poll_completions(&mut self) -> Vec<Completion> {
        let done: Vec<_> = self.completions.try_iter().collect();
        self.outstanding = self.outstanding.saturating_sub(done.len());
        done
    }

    /// Wait up to `timeout` for the next finished clip.
    pub fn wait_completion(&mut self, timeout: Duration) -> Option<Completion> {
        let done = self.completions.recv_timeout(timeout).ok()?;
        self.outstanding = self.outstanding.saturating_sub(1);
        Some(done)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .as_ref()
            .ok_or_else(worker_gone)?
            .send(command)
            .map_err(|_| worker_gone())
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        // Closing the command channel ends the worker loop.
        self.commands.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Audio worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for AudioOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioOutput")
            .field("outstanding", &self.outstanding)
            .finish()
    }
}

fn worker_gone() -> Error {
    Error::fail("audio worker is not running")
}

fn runner<D: AudioDevice>(mut device: D, commands: Receiver<Command>, done: Sender<Completion>) {
    while let Ok(command) = commands.recv() {
        match command {
            Command::Open(format, reply) => {
                let _ = reply.send(device.open(&format));
            }
            Command::Play(buffer) => {
                let result = device.write(&buffer);
                if let Err(e) = &result {
                    warn!(error = %e, "Audio playback failed");
                }
                if done.send(Completion { buffer, result }).is_err() {
                    break;
                }
            }
        }
    }
}
