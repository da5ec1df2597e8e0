//! Frame decoding seam and the per-session read filter.

use std::time::{Duration, Instant};

use tally_core::validation::validate_symbology_payload;
use tally_core::Symbology;

use super::backend::Frame;
use crate::error::ScanResult;

/// A barcode read from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedCode {
    pub text: String,
    pub symbology: Symbology,
}

impl DecodedCode {
    pub fn new(text: impl Into<String>, symbology: Symbology) -> Self {
        DecodedCode {
            text: text.into(),
            symbology,
        }
    }
}

/// Multi-format barcode recognizer.
pub trait FrameDecoder: Send + Sync {
    /// Looks for one of `formats` in `frame`.
    ///
    /// Returns `DecodeTransientMiss` when the frame holds no readable code;
    /// any other error ends the session.
    fn decode(&self, frame: &Frame, formats: &[Symbology]) -> ScanResult<DecodedCode>;
}

/// What the decode loop should do with a frame or a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadVerdict {
    Forward,
    /// Failed the format's check digit; counts as a miss.
    BadChecksum,
    /// Same code forwarded within the repeat cooldown.
    Repeat,
}

/// Throttles decode attempts and filters reads for one session.
#[derive(Debug, Clone)]
pub struct DecodeFilter {
    decode_interval: Duration,
    repeat_cooldown: Duration,
    last_attempt: Option<Instant>,
    last_forwarded: Option<(String, Instant)>,
}

impl DecodeFilter {
    pub fn new(decode_interval: Duration, repeat_cooldown: Duration) -> Self {
        DecodeFilter {
            decode_interval,
            repeat_cooldown,
            last_attempt: None,
            last_forwarded: None,
        }
    }

    /// Returns true if a frame arriving at `now` should be decoded,
    /// recording the attempt.
    pub fn should_attempt(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_attempt {
            if now.saturating_duration_since(last) < self.decode_interval {
                return false;
            }
        }
        self.last_attempt = Some(now);
        true
    }

    /// Judges a read, recording it when forwarded.
    pub fn check(&mut self, read: &DecodedCode, now: Instant) -> ReadVerdict {
        if validate_symbology_payload(read.symbology, &read.text).is_err() {
            return ReadVerdict::BadChecksum;
        }

        if let Some((code, at)) = &self.last_forwarded {
            if *code == read.text && now.saturating_duration_since(*at) < self.repeat_cooldown {
                return ReadVerdict::Repeat;
            }
        }

        self.last_forwarded = Some((read.text.clone(), now));
        ReadVerdict::Forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_decode_interval_throttles_attempts() {
        let mut filter = DecodeFilter::new(ms(100), ms(1500));
        let t0 = Instant::now();

        assert!(filter.should_attempt(t0));
        assert!(!filter.should_attempt(t0 + ms(33)));
        assert!(!filter.should_attempt(t0 + ms(66)));
        assert!(filter.should_attempt(t0 + ms(100)));
    }

    #[test]
    fn test_zero_interval_decodes_every_frame() {
        let mut filter = DecodeFilter::new(Duration::ZERO, ms(1500));
        let t0 = Instant::now();
        assert!(filter.should_attempt(t0));
        assert!(filter.should_attempt(t0));
    }

    #[test]
    fn test_bad_check_digit_is_rejected() {
        let mut filter = DecodeFilter::new(Duration::ZERO, ms(1500));
        let t0 = Instant::now();

        let misread = DecodedCode::new("4006381333932", Symbology::Ean13);
        assert_eq!(filter.check(&misread, t0), ReadVerdict::BadChecksum);

        let good = DecodedCode::new("4006381333931", Symbology::Ean13);
        assert_eq!(filter.check(&good, t0), ReadVerdict::Forward);

        // Formats without a check digit are never rejected
        let qr = DecodedCode::new("https://example.test/p/1", Symbology::QrCode);
        assert_eq!(filter.check(&qr, t0), ReadVerdict::Forward);
    }

    #[test]
    fn test_repeat_cooldown() {
        let mut filter = DecodeFilter::new(Duration::ZERO, ms(1500));
        let t0 = Instant::now();
        let read = DecodedCode::new("96385074", Symbology::Ean8);

        assert_eq!(filter.check(&read, t0), ReadVerdict::Forward);
        assert_eq!(filter.check(&read, t0 + ms(500)), ReadVerdict::Repeat);
        assert_eq!(filter.check(&read, t0 + ms(1500)), ReadVerdict::Forward);

        let other = DecodedCode::new("4006381333931", Symbology::Ean13);
        assert_eq!(filter.check(&other, t0 + ms(1501)), ReadVerdict::Forward);
    }
}
