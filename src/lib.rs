//! Steady state latency benchmarks for convolution primitives.
//!
//! A [`BenchmarkDriver`] picks a problem from a [`ProblemSet`], binds a
//! convolution engine from a [`Backend`] to one device, fills the operands
//! the chosen [`ConvMethod`] needs and times it with a warm-up call
//! followed by a synchronized batch of back to back launches.

pub mod backend;
pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod method;
pub mod problem;
pub mod rng;
pub mod tensor;
pub mod timing;

pub use backend::{cpu::CpuBackend, Backend, ConvEngine};
pub use config::BenchConfig;
pub use driver::{BenchmarkDriver, DriverBuilder};
pub use error::{Error, Result};
pub use method::ConvMethod;
pub use problem::{ProblemDescriptor, ProblemSet};
pub use rng::RandomStream;
