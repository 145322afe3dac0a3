use crate::rng::RandomStream;

/// Tensor dimensions, listed with the fastest varying dimension first.
pub type Shape = Vec<usize>;

/// Element count of `shape`, or `None` when it does not fit in `usize`.
pub fn checked_numel(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
}

/// Host resident buffer used by the reference backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    pub data: Vec<f32>,
    pub shape: Shape,
}

impl Tensor {
    pub fn new(data: Vec<f32>, shape: Shape) -> Tensor {
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "invalid shape for data length"
        );

        Tensor { data, shape }
    }

    pub fn zeros(shape: &[usize]) -> Tensor {
        Tensor::new(vec![0.0; shape.iter().product()], shape.to_vec())
    }

    pub fn rand(shape: &[usize], rng: &mut RandomStream) -> Tensor {
        let data = rng.uniform(shape.iter().product());
        Tensor::new(data, shape.to_vec())
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn dot(&self, rhs: &Tensor) -> f64 {
        self.data
            .iter()
            .zip(&rhs.data)
            .map(|(&l, &r)| l as f64 * r as f64)
            .sum()
    }
}
