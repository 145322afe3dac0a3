//! Seams between the benchmark driver and a device runtime.

pub mod cpu;

use crate::{error::Result, problem::ProblemDescriptor, rng::RandomStream, tensor::Shape};

/// A convolution bound to one problem and one device.
///
/// Compute calls may be asynchronous: they only have to be complete once
/// [`Backend::synchronize`] returns.
pub trait ConvEngine {
    type Tensor;

    fn output_dims(&self) -> Shape;

    fn init_forward(&mut self) -> Result<()>;
    fn init_backward_data(&mut self) -> Result<()>;
    fn init_backward_filter(&mut self) -> Result<()>;

    fn forward(
        &mut self,
        input: &Self::Tensor,
        filter: &Self::Tensor,
        output: &mut Self::Tensor,
    ) -> Result<()>;

    fn backward_filter(
        &mut self,
        input: &Self::Tensor,
        output_grad: &Self::Tensor,
        filter_grad: &mut Self::Tensor,
    ) -> Result<()>;

    fn backward_data(
        &mut self,
        filter: &Self::Tensor,
        output_grad: &Self::Tensor,
        input_grad: &mut Self::Tensor,
    ) -> Result<()>;
}

/// Device runtime: context setup, tensor allocation, engines and barriers.
pub trait Backend {
    type Tensor;
    type Engine: ConvEngine<Tensor = Self::Tensor>;

    fn init_device(&mut self, device: u32) -> Result<()>;

    fn engine(&mut self, problem: &ProblemDescriptor, device: u32) -> Result<Self::Engine>;

    fn rand(&mut self, shape: &[usize], rng: &mut RandomStream) -> Result<Self::Tensor>;

    fn zeros(&mut self, shape: &[usize]) -> Result<Self::Tensor>;

    /// Blocks until all work enqueued on `device` has completed.
    fn synchronize(&mut self, device: u32) -> Result<()>;
}
