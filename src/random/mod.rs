//! Deterministic randomness
//!
//! Every visual parameter of a world is derived from one seed string:
//! - `stream`: Seeded stream of uniform draws in [0, 1)
//! - `distributions`: Free functions that turn draws into ranges, Gaussians, Betas, colors...
//! - `session`: The current seed, fresh seed generation and reseeding
//!
//! Draw order is part of the contract. Each distribution documents how many
//! draws it consumes so a world can be replayed exactly from its seed.

pub mod distributions;
pub mod session;
pub mod stream;

pub use distributions::{
    create_random_hex, create_sign, hex_to_rgb, in_beta, in_gaussian, in_range, in_range_int,
    in_square, pick,
};
pub use session::{SeedSession, create_seed};
pub use stream::{RandomSource, SeededStream};
