//! Seed session
//!
//! Holds the seed of the world currently on screen and the stream derived
//! from it. Built once per application and handed to the generator.
//!
//! Fresh seeds are 12 random bytes as zero-padded hex (`{:02x}` per byte), so
//! every generated seed is exactly 24 characters. Any string is accepted as a
//! shared seed.

use rand::RngCore;

use super::stream::SeededStream;
use crate::consts::SEED_BYTES;

/// Generate a fresh seed from cryptographically random bytes (hex encoded)
pub fn create_seed() -> String {
    let mut bytes = [0u8; SEED_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Current seed plus its stream
#[derive(Debug, Clone)]
pub struct SeedSession {
    stream: SeededStream,
}

impl SeedSession {
    /// Start with a fresh random seed
    pub fn new() -> Self {
        Self::with_seed(&create_seed())
    }

    /// Start from an externally supplied seed (e.g. a shared link)
    pub fn with_seed(seed: &str) -> Self {
        log::info!("World seed: {}", seed);
        Self {
            stream: SeededStream::new(seed),
        }
    }

    /// Start from `seed` when given, otherwise a fresh one
    pub fn from_optional(seed: Option<&str>) -> Self {
        match seed {
            Some(seed) if !seed.is_empty() => Self::with_seed(seed),
            _ => Self::new(),
        }
    }

    /// Replace the seed with a fresh one and reset the stream
    pub fn reseed(&mut self) -> &str {
        self.stream = SeededStream::new(&create_seed());
        log::info!("Reseeded world: {}", self.stream.seed());
        self.stream.seed()
    }

    /// Restart the stream of the current seed from its first draw
    pub fn rewind(&mut self) {
        self.stream = SeededStream::new(self.stream.seed());
    }

    pub fn current_seed(&self) -> &str {
        self.stream.seed()
    }

    pub fn stream_mut(&mut self) -> &mut SeededStream {
        &mut self.stream
    }
}

impl Default for SeedSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::RandomSource;

    #[test]
    fn test_create_seed_is_hex() {
        let seed = create_seed();
        assert_eq!(seed.len(), SEED_BYTES * 2);
        assert!(seed.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(seed, create_seed());
    }

    #[test]
    fn test_external_seed_is_kept() {
        let session = SeedSession::from_optional(Some("abc123"));
        assert_eq!(session.current_seed(), "abc123");

        let fresh = SeedSession::from_optional(Some(""));
        assert_eq!(fresh.current_seed().len(), SEED_BYTES * 2);
    }

    #[test]
    fn test_reseed_resets_stream() {
        let mut session = SeedSession::with_seed("abc123");
        session.stream_mut().draw();
        let old = session.current_seed().to_string();
        let new = session.reseed().to_string();
        assert_ne!(old, new);
        assert_eq!(session.stream_mut().draw_count(), 0);
    }

    #[test]
    fn test_rewind_replays() {
        let mut session = SeedSession::with_seed("rewind");
        let first = session.stream_mut().draw();
        session.rewind();
        assert_eq!(session.stream_mut().draw(), first);
    }
}
