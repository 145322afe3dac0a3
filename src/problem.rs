use std::{fs, path::Path, sync::Arc};

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{Error, Result},
    tensor::Shape,
};

/// `(w, h, c, n, k, filter_h, filter_w, pad_w, pad_h, stride_w, stride_h)`
pub type ProblemTuple = (
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
    usize,
);

// DeepBench style training convolutions
static DEEP_BENCH_PROBLEMS: [ProblemTuple; 18] = [
    (700, 161, 1, 4, 32, 20, 5, 0, 0, 2, 2),
    (700, 161, 1, 8, 32, 20, 5, 0, 0, 2, 2),
    (341, 79, 32, 4, 32, 10, 5, 0, 0, 2, 2),
    (341, 79, 32, 8, 32, 10, 5, 0, 0, 2, 2),
    (480, 48, 1, 16, 16, 3, 3, 1, 1, 1, 1),
    (240, 24, 16, 16, 32, 3, 3, 1, 1, 1, 1),
    (120, 12, 32, 16, 64, 3, 3, 1, 1, 1, 1),
    (60, 6, 64, 16, 128, 3, 3, 1, 1, 1, 1),
    (108, 108, 3, 8, 64, 3, 3, 1, 1, 2, 2),
    (54, 54, 64, 8, 64, 3, 3, 1, 1, 1, 1),
    (27, 27, 128, 8, 128, 3, 3, 1, 1, 1, 1),
    (14, 14, 128, 8, 256, 3, 3, 1, 1, 1, 1),
    (7, 7, 256, 8, 512, 3, 3, 1, 1, 1, 1),
    (224, 224, 3, 16, 64, 7, 7, 3, 3, 2, 2),
    (56, 56, 64, 16, 64, 3, 3, 1, 1, 1, 1),
    (28, 28, 128, 16, 128, 3, 3, 1, 1, 1, 1),
    (14, 14, 256, 16, 256, 3, 3, 1, 1, 1, 1),
    (7, 7, 512, 16, 512, 3, 3, 1, 1, 1, 1),
];

lazy_static! {
    static ref DEEP_BENCH: Arc<ProblemSet> = Arc::new(ProblemSet::new(
        DEEP_BENCH_PROBLEMS
            .iter()
            .map(|&t| ProblemDescriptor::from_tuple(t))
            .collect()
    ));
}

/// One convolution shape configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDescriptor {
    pub w: usize,
    pub h: usize,
    pub c: usize,
    pub n: usize,
    pub k: usize,
    pub filter_h: usize,
    pub filter_w: usize,
    pub pad_w: usize,
    pub pad_h: usize,
    pub stride_w: usize,
    pub stride_h: usize,
}

impl ProblemDescriptor {
    pub fn from_tuple(tuple: ProblemTuple) -> ProblemDescriptor {
        ProblemDescriptor {
            w: tuple.0,
            h: tuple.1,
            c: tuple.2,
            n: tuple.3,
            k: tuple.4,
            filter_h: tuple.5,
            filter_w: tuple.6,
            pad_w: tuple.7,
            pad_h: tuple.8,
            stride_w: tuple.9,
            stride_h: tuple.10,
        }
    }

    /// `(filter_h, filter_w, c, k)`
    pub fn filter_shape(&self) -> Shape {
        vec![self.filter_h, self.filter_w, self.c, self.k]
    }

    /// `(w, h, c, n)`
    pub fn input_shape(&self) -> Shape {
        vec![self.w, self.h, self.c, self.n]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawProblem {
    Tuple(ProblemTuple),
    Named(ProblemDescriptor),
}

impl From<RawProblem> for ProblemDescriptor {
    fn from(raw: RawProblem) -> Self {
        match raw {
            RawProblem::Tuple(t) => ProblemDescriptor::from_tuple(t),
            RawProblem::Named(p) => p,
        }
    }
}

/// Ordered catalog of convolution problems, looked up by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProblemSet {
    problems: Vec<ProblemDescriptor>,
}

impl ProblemSet {
    pub fn new(problems: Vec<ProblemDescriptor>) -> ProblemSet {
        ProblemSet { problems }
    }

    pub fn deep_bench() -> Arc<ProblemSet> {
        DEEP_BENCH.clone()
    }

    /// Parses a JSON array whose entries are either 11 element arrays in
    /// [`ProblemTuple`] order or objects with named fields.
    pub fn from_json_str(json: &str) -> Result<ProblemSet> {
        let raw: Vec<RawProblem> = serde_json::from_str(json)?;
        Ok(ProblemSet::new(raw.into_iter().map(Into::into).collect()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<ProblemSet> {
        let path = path.as_ref();
        debug!("loading problem set from {:?}", path);
        let set = ProblemSet::from_json_str(&fs::read_to_string(path)?)?;
        debug!("loaded {} problems", set.len());
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&ProblemDescriptor> {
        self.problems.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.problems.len(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProblemDescriptor> {
        self.problems.iter()
    }
}

impl FromIterator<ProblemDescriptor> for ProblemSet {
    fn from_iter<I: IntoIterator<Item = ProblemDescriptor>>(iter: I) -> Self {
        ProblemSet::new(iter.into_iter().collect())
    }
}
