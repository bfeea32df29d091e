//! # Stabilization
//!
//! The stages that turn a noisy per-frame candidate into a steady reading, in
//! the order the tracker applies them:
//!
//! 1. [outlier]: z-score rejection and a short median over recent candidates.
//! 2. [octave]: octave snapping and sub-harmonic rejection against the last
//!    accepted frequency.
//! 3. [attack]: median substitution over the first frames of a note.
//! 4. [confidence]: raw confidence weighted by harmonic coherence and level.
//! 5. [smoothing]: dual-rate exponential smoothing.

pub mod attack;
pub mod confidence;
pub mod octave;
pub mod outlier;
pub mod smoothing;
