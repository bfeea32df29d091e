//! # Pitch Tracker
//! *pitch_tracker* estimates the fundamental frequency of a monophonic
//! signal frame by frame and turns it into a stable note reading suitable for
//! tuning an instrument.
//!
//! Raw estimators flicker: they jump an octave, latch onto sub-harmonics as a
//! note decays, wobble during the attack and report nonsense when a string is
//! damped. The [PitchTracker] therefore wraps two detectors in a
//! stabilization pipeline and a note-locking state machine.
//!
//! # Detectors
//! Both detectors implement [PitchDetector][detector::PitchDetector] and can
//! be used on their own:
//!
//!   * [YINDetector][detector::yin] (time domain)
//!   * [McLeodDetector][detector::mcleod] (frequency domain)
//!
//! Their results are reconciled by [arbitrate][detector::arbitration::arbitrate].
//!
//! # Examples
//! ```
//! use pitch_tracker::{PitchTracker, TrackerConfig};
//!
//! fn main() {
//!     const SAMPLE_RATE: usize = 44100;
//!     const SIZE: usize = 2048;
//!
//!     // Signal coming from some source (microphone, generated, etc...)
//!     let dt = 1.0 / SAMPLE_RATE as f64;
//!     let freq = 440.0;
//!     let signal: Vec<f64> = (0..SIZE)
//!         .map(|x| (2.0 * std::f64::consts::PI * x as f64 * dt * freq).sin())
//!         .collect();
//!
//!     let mut tracker = PitchTracker::new(TrackerConfig::new(SAMPLE_RATE, SIZE)).unwrap();
//!     let estimate = tracker.estimate(&signal);
//!
//!     assert!(estimate.voiced);
//!     println!(
//!         "Note: {}, cents: {:+.1}, confidence: {:.2}",
//!         estimate.note.unwrap(),
//!         estimate.cents.unwrap(),
//!         estimate.confidence
//!     );
//! }
//! ```

pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use estimate::PitchEstimate;
pub use note::{Note, PitchClass};
pub use tracker::{PitchTracker, TrackerStats};

pub mod analysis;
pub mod config;
pub mod detector;
pub mod diagnostics;
pub mod error;
pub mod estimate;
pub mod float;
pub mod locker;
pub mod note;
pub mod profile;
pub mod stabilizer;
pub mod tracker;
pub mod utils;
