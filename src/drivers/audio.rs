//! Non-blocking audio cue queue.
//!
//! Sits in front of a busy/idle MP3 player module.  The machine enqueues
//! symbolic cues; [`AudioQueue::tick`] hands out the next track number
//! once the player is idle and the minimum gap since the last start has
//! passed.  Nothing here blocks.
//!
//! The queue also holds the player volume; the player reads it through
//! [`AudioQueue::volume`] when it starts a track.

use heapless::Deque;
use log::{debug, warn};

use crate::app::ports::AudioPort;
use crate::config::HaloSettings;
use crate::fsm::context::AudioCue;
use crate::time::{Millis, elapsed};

pub const AUDIO_QUEUE_DEPTH: usize = 8;

pub struct AudioQueue {
    pending: Deque<AudioCue, AUDIO_QUEUE_DEPTH>,
    stop_requested: bool,
    last_start: Option<Millis>,
    gap_ms: Millis,
    volume: u8,
}

impl AudioQueue {
    pub fn new(gap_ms: Millis) -> Self {
        Self {
            pending: Deque::new(),
            stop_requested: false,
            last_start: None,
            gap_ms,
            volume: HaloSettings::default().volume,
        }
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// `true` once after [`stop_and_flush`](AudioPort::stop_and_flush);
    /// the caller must stop the player.
    pub fn take_stop_request(&mut self) -> bool {
        core::mem::take(&mut self.stop_requested)
    }

    /// Track to start now, if any.
    pub fn tick(&mut self, now: Millis, busy: bool) -> Option<u16> {
        if busy || self.pending.is_empty() {
            return None;
        }
        if self
            .last_start
            .is_some_and(|at| elapsed(now, at) < self.gap_ms)
        {
            return None;
        }
        let cue = self.pending.pop_front()?;
        self.last_start = Some(now);
        debug!("audio: starting {:?} (track {})", cue, cue.track());
        Some(cue.track())
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl AudioPort for AudioQueue {
    fn stop_and_flush(&mut self) {
        self.pending.clear();
        self.stop_requested = true;
    }

    fn enqueue(&mut self, cue: AudioCue) {
        if self.pending.push_back(cue).is_err() {
            warn!("audio queue full, dropping {:?}", cue);
        }
    }

    fn set_volume(&mut self, volume: u8) {
        if volume > HaloSettings::MAX_VOLUME {
            warn!("audio volume {} clamped to {}", volume, HaloSettings::MAX_VOLUME);
        }
        self.volume = volume.min(HaloSettings::MAX_VOLUME);
    }
}
