//! Host reference backend.
//!
//! Direct convolution on `Vec<f32>` buffers. Host execution is synchronous,
//! so barriers only check that the device context exists.

use tracing::{debug, trace};

use crate::{
    backend::{Backend, ConvEngine},
    error::{Error, Result},
    method::ConvMethod,
    problem::ProblemDescriptor,
    rng::RandomStream,
    tensor::{checked_numel, Shape, Tensor},
};

/// The host exposes a single device.
pub const HOST_DEVICE: u32 = 0;

#[derive(Debug, Default)]
pub struct CpuBackend {
    device: Option<u32>,
}

impl CpuBackend {
    pub fn new() -> CpuBackend {
        CpuBackend::default()
    }

    fn check_device(&self, device: u32) -> Result<()> {
        match self.device {
            Some(d) if d == device => Ok(()),
            Some(d) => Err(Error::device(
                device,
                format!("context was initialized for device {d}"),
            )),
            None => Err(Error::device(device, "device context not initialized")),
        }
    }
}

impl Backend for CpuBackend {
    type Tensor = Tensor;
    type Engine = CpuConv;

    fn init_device(&mut self, device: u32) -> Result<()> {
        if device != HOST_DEVICE {
            return Err(Error::device(device, "no such host device"));
        }
        debug!("host device {} initialized", device);
        self.device = Some(device);
        Ok(())
    }

    fn engine(&mut self, problem: &ProblemDescriptor, device: u32) -> Result<CpuConv> {
        self.check_device(device)?;
        CpuConv::new(*problem, device)
    }

    fn rand(&mut self, shape: &[usize], rng: &mut RandomStream) -> Result<Tensor> {
        check_numel(shape)?;
        Ok(Tensor::rand(shape, rng))
    }

    fn zeros(&mut self, shape: &[usize]) -> Result<Tensor> {
        check_numel(shape)?;
        Ok(Tensor::zeros(shape))
    }

    fn synchronize(&mut self, device: u32) -> Result<()> {
        self.check_device(device)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Plans {
    forward: bool,
    backward_data: bool,
    backward_filter: bool,
}

/// Direct convolution bound to one problem.
///
/// Layouts, fastest varying dimension first:
/// input `(w, h, c, n)`, filter `(filter_h, filter_w, c, k)`,
/// output `(out_w, out_h, k, n)`.
#[derive(Debug, Clone)]
pub struct CpuConv {
    problem: ProblemDescriptor,
    device: u32,
    out_w: usize,
    out_h: usize,
    plans: Plans,
}

fn check_numel(shape: &[usize]) -> Result<usize> {
    checked_numel(shape)
        .ok_or_else(|| Error::UnsupportedShape(format!("{shape:?} has too many elements")))
}

/// Output extent along one axis. Padded extents must stay addressable as
/// `isize` since taps are offset by the padding.
fn output_extent(input: usize, pad: usize, filter: usize, stride: usize) -> Option<usize> {
    let padded = pad.checked_mul(2)?.checked_add(input)?;
    if padded > isize::MAX as usize || stride == 0 || filter == 0 || filter > padded {
        return None;
    }
    Some((padded - filter) / stride + 1)
}

impl CpuConv {
    pub fn new(problem: ProblemDescriptor, device: u32) -> Result<CpuConv> {
        let p = &problem;
        if [p.w, p.h, p.c, p.n, p.k].contains(&0) {
            return Err(Error::UnsupportedShape(format!("zero sized dimension in {p:?}")));
        }

        let out_w = output_extent(p.w, p.pad_w, p.filter_w, p.stride_w).ok_or_else(|| {
            Error::UnsupportedShape(format!(
                "filter width {} with stride {} does not fit width {} padded by {}",
                p.filter_w, p.stride_w, p.w, p.pad_w
            ))
        })?;
        let out_h = output_extent(p.h, p.pad_h, p.filter_h, p.stride_h).ok_or_else(|| {
            Error::UnsupportedShape(format!(
                "filter height {} with stride {} does not fit height {} padded by {}",
                p.filter_h, p.stride_h, p.h, p.pad_h
            ))
        })?;

        let conv = CpuConv {
            problem,
            device,
            out_w,
            out_h,
            plans: Plans::default(),
        };
        check_numel(&problem.input_shape())?;
        check_numel(&problem.filter_shape())?;
        check_numel(&conv.output_dims())?;
        Ok(conv)
    }

    fn require_plan(&self, method: ConvMethod, planned: bool) -> Result<()> {
        if planned {
            Ok(())
        } else {
            Err(Error::device(self.device, format!("{method} launched without a plan")))
        }
    }

    fn check_shape(&self, tensor: &Tensor, expected: &[usize], what: &str) -> Result<()> {
        if tensor.shape == expected {
            Ok(())
        } else {
            Err(Error::device(
                self.device,
                format!(
                    "{what} has shape {:?}, expected {:?}",
                    tensor.shape, expected
                ),
            ))
        }
    }

    fn check_operands(&self, input: &Tensor, filter: &Tensor, output: &Tensor) -> Result<()> {
        self.check_shape(input, &self.problem.input_shape(), "input")?;
        self.check_shape(filter, &self.problem.filter_shape(), "filter")?;
        self.check_shape(output, &self.output_dims(), "output")
    }

    /// Visits every `(output, input, filter)` index triple that contributes
    /// to the convolution, skipping taps that land in the padding.
    fn for_each_tap(&self, mut f: impl FnMut(usize, usize, usize)) {
        let p = &self.problem;
        let (out_w, out_h) = (self.out_w, self.out_h);

        for n in 0..p.n {
            for k in 0..p.k {
                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let out_idx = ((n * p.k + k) * out_h + oy) * out_w + ox;
                        for c in 0..p.c {
                            for fx in 0..p.filter_w {
                                let ix = (ox * p.stride_w + fx) as isize - p.pad_w as isize;
                                if ix < 0 || ix as usize >= p.w {
                                    continue;
                                }
                                for fy in 0..p.filter_h {
                                    let iy = (oy * p.stride_h + fy) as isize - p.pad_h as isize;
                                    if iy < 0 || iy as usize >= p.h {
                                        continue;
                                    }
                                    let in_idx =
                                        ((n * p.c + c) * p.h + iy as usize) * p.w + ix as usize;
                                    let filter_idx =
                                        ((k * p.c + c) * p.filter_w + fx) * p.filter_h + fy;
                                    f(out_idx, in_idx, filter_idx);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

impl ConvEngine for CpuConv {
    type Tensor = Tensor;

    fn output_dims(&self) -> Shape {
        vec![self.out_w, self.out_h, self.problem.k, self.problem.n]
    }

    fn init_forward(&mut self) -> Result<()> {
        trace!("planning forward for {:?}", self.problem);
        self.plans.forward = true;
        Ok(())
    }

    fn init_backward_data(&mut self) -> Result<()> {
        trace!("planning backward data for {:?}", self.problem);
        self.plans.backward_data = true;
        Ok(())
    }

    fn init_backward_filter(&mut self) -> Result<()> {
        trace!("planning backward filter for {:?}", self.problem);
        self.plans.backward_filter = true;
        Ok(())
    }

    fn forward(&mut self, input: &Tensor, filter: &Tensor, output: &mut Tensor) -> Result<()> {
        self.require_plan(ConvMethod::Forward, self.plans.forward)?;
        self.check_operands(input, filter, output)?;

        let out = &mut output.data;
        out.iter_mut().for_each(|x| *x = 0.0);
        self.for_each_tap(|o, i, f| out[o] += input.data[i] * filter.data[f]);
        Ok(())
    }

    fn backward_filter(
        &mut self,
        input: &Tensor,
        output_grad: &Tensor,
        filter_grad: &mut Tensor,
    ) -> Result<()> {
        self.require_plan(ConvMethod::BackwardFilter, self.plans.backward_filter)?;
        self.check_operands(input, filter_grad, output_grad)?;

        let dw = &mut filter_grad.data;
        dw.iter_mut().for_each(|x| *x = 0.0);
        self.for_each_tap(|o, i, f| dw[f] += output_grad.data[o] * input.data[i]);
        Ok(())
    }

    fn backward_data(
        &mut self,
        filter: &Tensor,
        output_grad: &Tensor,
        input_grad: &mut Tensor,
    ) -> Result<()> {
        self.require_plan(ConvMethod::BackwardData, self.plans.backward_data)?;
        self.check_operands(input_grad, filter, output_grad)?;

        let dx = &mut input_grad.data;
        dx.iter_mut().for_each(|x| *x = 0.0);
        self.for_each_tap(|o, i, f| dx[i] += output_grad.data[o] * filter.data[f]);
        Ok(())
    }
}
