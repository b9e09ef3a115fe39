//! Real-time detection loop.
//!
//! The loop pulls frames from a `FrameSource`, runs the injected
//! `Classifier` once per tick and hands each `ClassificationEvent` to a
//! `DetectionSink`. Ticks run one at a time on a single task:
//!
//! | Tick result | Sink call | Loop |
//! |-------------|-----------|------|
//! | zero-size frame | none | continues |
//! | candidate found | `on_event` | continues |
//! | no candidate / timeout | `on_idle` | continues |
//! | classifier error | none | continues |
//! | stop requested | none | exits |

pub mod clock;
pub mod detection_loop;
pub mod stats;

pub use clock::MonotonicClock;
pub use detection_loop::{DetectionLoop, DetectionSink, LoopConfig, LoopState};
pub use stats::{FpsCounter, LoopStats, TickOutcome};
