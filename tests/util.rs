#![allow(dead_code)]

use std::{cell::RefCell, rc::Rc, sync::Arc, thread, time::Duration};

use convbench::{
    backend::{Backend, ConvEngine},
    tensor::Shape,
    ConvMethod, Error, ProblemDescriptor, ProblemSet, RandomStream, Result,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    InitDevice(u32),
    Engine(ProblemDescriptor),
    Init(ConvMethod),
    Rand(Shape),
    Zeros(Shape),
    Launch { method: ConvMethod, written: Shape },
    Sync,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FakeTensor {
    pub shape: Shape,
    pub sample: Vec<f32>,
}

/// Backend that records every call instead of touching a device.
#[derive(Debug, Default)]
pub struct FakeBackend {
    pub log: Rc<RefCell<Vec<Event>>>,
    pub random_tensors: Vec<FakeTensor>,
    pub launch_delay: Duration,
    pub fail_sync: bool,
    pub reject_shapes: bool,
}

impl FakeBackend {
    pub fn new() -> FakeBackend {
        FakeBackend::default()
    }

    pub fn with_delay(delay: Duration) -> FakeBackend {
        FakeBackend {
            launch_delay: delay,
            ..FakeBackend::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.borrow().clone()
    }

    pub fn launches(&self, method: ConvMethod) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Launch { method: m, .. } if *m == method))
            .count()
    }

    pub fn written_shapes(&self) -> Vec<Shape> {
        self.log
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Launch { written, .. } => Some(written.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct FakeEngine {
    problem: ProblemDescriptor,
    log: Rc<RefCell<Vec<Event>>>,
    delay: Duration,
}

impl FakeEngine {
    fn launch(&self, method: ConvMethod, written: &FakeTensor) -> Result<()> {
        self.log.borrow_mut().push(Event::Launch {
            method,
            written: written.shape.clone(),
        });
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        Ok(())
    }
}

impl ConvEngine for FakeEngine {
    type Tensor = FakeTensor;

    fn output_dims(&self) -> Shape {
        let p = &self.problem;
        vec![
            (p.w + 2 * p.pad_w - p.filter_w) / p.stride_w + 1,
            (p.h + 2 * p.pad_h - p.filter_h) / p.stride_h + 1,
            p.k,
            p.n,
        ]
    }

    fn init_forward(&mut self) -> Result<()> {
        self.log.borrow_mut().push(Event::Init(ConvMethod::Forward));
        Ok(())
    }

    fn init_backward_data(&mut self) -> Result<()> {
        self.log
            .borrow_mut()
            .push(Event::Init(ConvMethod::BackwardData));
        Ok(())
    }

    fn init_backward_filter(&mut self) -> Result<()> {
        self.log
            .borrow_mut()
            .push(Event::Init(ConvMethod::BackwardFilter));
        Ok(())
    }

    fn forward(&mut self, _: &FakeTensor, _: &FakeTensor, output: &mut FakeTensor) -> Result<()> {
        self.launch(ConvMethod::Forward, output)
    }

    fn backward_filter(
        &mut self,
        _: &FakeTensor,
        _: &FakeTensor,
        filter_grad: &mut FakeTensor,
    ) -> Result<()> {
        self.launch(ConvMethod::BackwardFilter, filter_grad)
    }

    fn backward_data(
        &mut self,
        _: &FakeTensor,
        _: &FakeTensor,
        input_grad: &mut FakeTensor,
    ) -> Result<()> {
        self.launch(ConvMethod::BackwardData, input_grad)
    }
}

impl Backend for FakeBackend {
    type Tensor = FakeTensor;
    type Engine = FakeEngine;

    fn init_device(&mut self, device: u32) -> Result<()> {
        self.log.borrow_mut().push(Event::InitDevice(device));
        Ok(())
    }

    fn engine(&mut self, problem: &ProblemDescriptor, _device: u32) -> Result<FakeEngine> {
        if self.reject_shapes {
            return Err(Error::UnsupportedShape(format!("{problem:?}")));
        }
        self.log.borrow_mut().push(Event::Engine(*problem));
        Ok(FakeEngine {
            problem: *problem,
            log: self.log.clone(),
            delay: self.launch_delay,
        })
    }

    fn rand(&mut self, shape: &[usize], rng: &mut RandomStream) -> Result<FakeTensor> {
        self.log.borrow_mut().push(Event::Rand(shape.to_vec()));
        let tensor = FakeTensor {
            shape: shape.to_vec(),
            sample: rng.uniform(4),
        };
        self.random_tensors.push(tensor.clone());
        Ok(tensor)
    }

    fn zeros(&mut self, shape: &[usize]) -> Result<FakeTensor> {
        self.log.borrow_mut().push(Event::Zeros(shape.to_vec()));
        Ok(FakeTensor {
            shape: shape.to_vec(),
            sample: vec![0.0; 4],
        })
    }

    fn synchronize(&mut self, device: u32) -> Result<()> {
        if self.fail_sync {
            return Err(Error::device(device, "synchronize failed"));
        }
        self.log.borrow_mut().push(Event::Sync);
        Ok(())
    }
}

pub fn resnet_layer() -> ProblemDescriptor {
    ProblemDescriptor::from_tuple((56, 56, 64, 32, 64, 3, 3, 1, 1, 1, 1))
}

pub fn single_problem() -> Arc<ProblemSet> {
    Arc::new(ProblemSet::new(vec![resnet_layer()]))
}
