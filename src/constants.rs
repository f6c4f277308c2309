/// Application-wide constants for capture, transcript accumulation, and reveal timing

pub mod reveal {
    /// Default reveal tick period: one character is exposed per tick
    pub const DEFAULT_TICK_MS: u64 = 15;
}

pub mod recording {
    /// Elapsed-time counter tick (once per second)
    pub const TIMER_TICK_MS: u64 = 1000;

    /// Media type tagged onto finalized recording blobs
    pub const DEFAULT_MIME_TYPE: &str = "audio/wav";

    /// Sample rate assumed when the capture device does not report one
    pub const FALLBACK_SAMPLE_RATE: u32 = 16000;
}

pub mod demo {
    /// Default delay between scripted fragments when replaying a transcript
    /// Long enough that the reveal visibly lags fragment arrival
    pub const DEFAULT_FRAGMENT_DELAY_MS: u64 = 400;
}
