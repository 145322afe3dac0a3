use std::{num::NonZeroU32, sync::Arc};

use tracing::{debug, info, trace, warn};

use crate::{
    backend::{Backend, ConvEngine},
    device,
    error::{Error, Result},
    method::{ConvMethod, Fill, OperandShapes, Operands},
    problem::ProblemSet,
    rng::RandomStream,
    timing,
};

/// Times one convolution direction over the problems of a catalog.
///
/// Every [`run`](BenchmarkDriver::run) binds a fresh engine and fresh
/// tensors. The only state carried between runs is the random stream,
/// which is seeded once when the driver is built.
pub struct BenchmarkDriver<B: Backend> {
    backend: B,
    method: ConvMethod,
    problems: Arc<ProblemSet>,
    repeats: NonZeroU32,
    device: u32,
    rng: RandomStream,
}

impl<B: Backend> BenchmarkDriver<B> {
    pub fn new(
        mut backend: B,
        method: ConvMethod,
        problems: Arc<ProblemSet>,
        repeats: u32,
        devices: &[u32],
    ) -> Result<BenchmarkDriver<B>> {
        let repeats = NonZeroU32::new(repeats)
            .ok_or_else(|| Error::Config("repeat count must be at least 1".to_string()))?;
        let device = device::select_device(devices)?;

        backend.init_device(device)?;
        debug!(
            "{} driver on device {} with {} repeats over {} problems",
            method,
            device,
            repeats,
            problems.len()
        );

        Ok(BenchmarkDriver {
            backend,
            method,
            problems,
            repeats,
            device,
            rng: RandomStream::new(),
        })
    }

    /// Benchmarks problem `problem_index` and returns the mean time per
    /// call in microseconds.
    pub fn run(&mut self, problem_index: usize) -> Result<u64> {
        let problem = *self.problems.get(problem_index)?;
        trace!("problem {} resolved: {:?}", problem_index, problem);

        let mut engine = self.backend.engine(&problem, self.device)?;
        let shapes = OperandShapes {
            filter: problem.filter_shape(),
            input: problem.input_shape(),
            output: engine.output_dims(),
        };
        self.method.init(&mut engine)?;
        trace!("engine bound, output {:?}", shapes.output);

        let mut operands = self.allocate(&shapes)?;
        trace!("operands allocated");

        let (method, device, backend) = (self.method, self.device, &mut self.backend);
        let measurement = timing::measure(
            self.repeats,
            || method.launch(&mut engine, &mut operands),
            || backend.synchronize(device),
        )?;

        let average = measurement.average_micros();
        info!(
            "{} problem {}: {} us per call ({} calls in {:?})",
            method, problem_index, average, self.repeats, measurement.elapsed
        );
        Ok(average)
    }

    /// Runs every problem in order. A failing problem is reported in its
    /// slot and does not stop the sweep.
    pub fn run_all(&mut self) -> Vec<Result<u64>> {
        (0..self.problems.len())
            .map(|i| {
                let result = self.run(i);
                if let Err(e) = &result {
                    warn!("{} problem {} failed: {}", self.method, i, e);
                }
                result
            })
            .collect()
    }

    fn allocate(&mut self, shapes: &OperandShapes) -> Result<Operands<B::Tensor>> {
        let (backend, rng) = (&mut self.backend, &mut self.rng);
        self.method.allocate(shapes, |fill, shape| {
            trace!("{:?} tensor {:?}", fill, shape);
            match fill {
                Fill::Random => backend.rand(shape, rng),
                Fill::Zeros => backend.zeros(shape),
            }
        })
    }

    pub fn method(&self) -> ConvMethod {
        self.method
    }

    pub fn problems(&self) -> &Arc<ProblemSet> {
        &self.problems
    }

    pub fn repeats(&self) -> u32 {
        self.repeats.get()
    }

    pub fn device(&self) -> u32 {
        self.device
    }

    pub fn rng(&self) -> &RandomStream {
        &self.rng
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }
}

pub struct DriverBuilder {
    method: ConvMethod,
    problems: Arc<ProblemSet>,
    repeats: u32,
    devices: Vec<u32>,
}

impl DriverBuilder {
    pub fn new(method: ConvMethod, problems: Arc<ProblemSet>) -> DriverBuilder {
        DriverBuilder {
            method,
            problems,
            repeats: 100,
            devices: vec![0],
        }
    }

    pub fn repeats(mut self, repeats: u32) -> DriverBuilder {
        self.repeats = repeats;
        self
    }

    pub fn devices(mut self, devices: Vec<u32>) -> DriverBuilder {
        self.devices = devices;
        self
    }

    pub fn build<B: Backend>(self, backend: B) -> Result<BenchmarkDriver<B>> {
        BenchmarkDriver::new(
            backend,
            self.method,
            self.problems,
            self.repeats,
            &self.devices,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{
        backend::cpu::CpuBackend,
        driver::{BenchmarkDriver, DriverBuilder},
        error::Error,
        method::ConvMethod,
        problem::{ProblemDescriptor, ProblemSet},
    };

    fn problems() -> Arc<ProblemSet> {
        Arc::new(ProblemSet::new(vec![
            ProblemDescriptor::from_tuple((8, 8, 2, 1, 2, 3, 3, 1, 1, 1, 1)),
            ProblemDescriptor::from_tuple((2, 2, 1, 1, 1, 5, 5, 0, 0, 1, 1)),
        ]))
    }

    #[test]
    fn zero_repeats() {
        let result =
            BenchmarkDriver::new(CpuBackend::new(), ConvMethod::Forward, problems(), 0, &[0]);

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn no_devices() {
        let result = DriverBuilder::new(ConvMethod::Forward, problems())
            .devices(vec![])
            .build(CpuBackend::new());

        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn missing_host_device() {
        let result = DriverBuilder::new(ConvMethod::Forward, problems())
            .devices(vec![1, 0])
            .build(CpuBackend::new());

        assert!(matches!(result, Err(Error::DeviceFailure { device: 1, .. })));
    }

    #[test]
    fn extra_devices_ignored() {
        let driver = DriverBuilder::new(ConvMethod::Forward, problems())
            .devices(vec![0, 1, 2])
            .repeats(3)
            .build(CpuBackend::new())
            .unwrap();

        assert_eq!(driver.device(), 0);
        assert_eq!(driver.repeats(), 3);
    }

    #[test]
    fn run_all_reports_each_problem() {
        let mut driver = DriverBuilder::new(ConvMethod::BackwardData, problems())
            .repeats(2)
            .build(CpuBackend::new())
            .unwrap();

        let results = driver.run_all();

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(Error::UnsupportedShape(_))));
    }
}
