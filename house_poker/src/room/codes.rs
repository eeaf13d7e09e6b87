//! Six-digit room code generation.

use rand::Rng;
use std::collections::HashMap;

use super::errors::RoomError;
use crate::game::{
    constants::{ROOM_CODE_MAX, ROOM_CODE_MIN},
    entities::RoomCode,
};

/// Draws before giving up on finding a free code.
pub const MAX_CODE_ATTEMPTS: usize = 1000;

/// Draw a code not present in `existing`.
///
/// # Errors
///
/// [`RoomError::CodeSpaceExhausted`] when every draw collided.
pub fn generate_unique_code<V>(existing: &HashMap<RoomCode, V>) -> Result<RoomCode, RoomError> {
    generate_unique_code_with(&mut rand::rng(), existing)
}

pub fn generate_unique_code_with<R: Rng + ?Sized, V>(
    rng: &mut R,
    existing: &HashMap<RoomCode, V>,
) -> Result<RoomCode, RoomError> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let candidate = RoomCode::new(rng.random_range(ROOM_CODE_MIN..=ROOM_CODE_MAX))
            .map_err(|err| RoomError::InvalidConfig(err.to_string()))?;
        if !existing.contains_key(&candidate) {
            return Ok(candidate);
        }
    }
    Err(RoomError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS))
}
