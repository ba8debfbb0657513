// tick-normalizer - venue wire format to canonical Tick normalization

mod normalizer;
mod wire;

pub use normalizer::{Normalizer, NormalizerStats};
pub use wire::{decode_message, WireError, WireMessage};
