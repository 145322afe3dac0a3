use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    backend::ConvEngine,
    error::{Error, Result},
    tensor::Shape,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvMethod {
    #[default]
    Forward,
    BackwardData,
    BackwardFilter,
}

/// The three tensors every convolution direction touches. For the
/// backward directions `Output` holds the output gradient and the written
/// operand holds the gradient being computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    Filter,
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    Random,
    Zeros,
}

/// Which operands are randomly filled (in draw order) and which one is
/// zero filled and written by the compute call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roles {
    pub random: [Operand; 2],
    pub written: Operand,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperandShapes {
    pub filter: Shape,
    pub input: Shape,
    pub output: Shape,
}

impl OperandShapes {
    pub fn get(&self, operand: Operand) -> &[usize] {
        match operand {
            Operand::Filter => &self.filter,
            Operand::Input => &self.input,
            Operand::Output => &self.output,
        }
    }
}

#[derive(Debug)]
pub struct Operands<T> {
    pub filter: T,
    pub input: T,
    pub output: T,
}

impl ConvMethod {
    pub const ALL: [ConvMethod; 3] = [
        ConvMethod::Forward,
        ConvMethod::BackwardData,
        ConvMethod::BackwardFilter,
    ];

    pub fn roles(self) -> Roles {
        match self {
            ConvMethod::Forward => Roles {
                random: [Operand::Filter, Operand::Input],
                written: Operand::Output,
            },
            ConvMethod::BackwardFilter => Roles {
                random: [Operand::Input, Operand::Output],
                written: Operand::Filter,
            },
            ConvMethod::BackwardData => Roles {
                random: [Operand::Filter, Operand::Output],
                written: Operand::Input,
            },
        }
    }

    pub fn init<E: ConvEngine>(self, engine: &mut E) -> Result<()> {
        match self {
            ConvMethod::Forward => engine.init_forward(),
            ConvMethod::BackwardData => engine.init_backward_data(),
            ConvMethod::BackwardFilter => engine.init_backward_filter(),
        }
    }

    pub fn launch<E: ConvEngine>(
        self,
        engine: &mut E,
        ops: &mut Operands<E::Tensor>,
    ) -> Result<()> {
        match self {
            ConvMethod::Forward => engine.forward(&ops.input, &ops.filter, &mut ops.output),
            ConvMethod::BackwardFilter => {
                engine.backward_filter(&ops.input, &ops.output, &mut ops.filter)
            }
            ConvMethod::BackwardData => {
                engine.backward_data(&ops.filter, &ops.output, &mut ops.input)
            }
        }
    }

    /// Allocates the operands in role table order: random tensors first,
    /// then the written one.
    pub fn allocate<T, A>(self, shapes: &OperandShapes, mut alloc: A) -> Result<Operands<T>>
    where
        A: FnMut(Fill, &[usize]) -> Result<T>,
    {
        match self {
            ConvMethod::Forward => {
                let filter = alloc(Fill::Random, &shapes.filter)?;
                let input = alloc(Fill::Random, &shapes.input)?;
                let output = alloc(Fill::Zeros, &shapes.output)?;
                Ok(Operands {
                    filter,
                    input,
                    output,
                })
            }
            ConvMethod::BackwardFilter => {
                let input = alloc(Fill::Random, &shapes.input)?;
                let output = alloc(Fill::Random, &shapes.output)?;
                let filter = alloc(Fill::Zeros, &shapes.filter)?;
                Ok(Operands {
                    filter,
                    input,
                    output,
                })
            }
            ConvMethod::BackwardData => {
                let filter = alloc(Fill::Random, &shapes.filter)?;
                let output = alloc(Fill::Random, &shapes.output)?;
                let input = alloc(Fill::Zeros, &shapes.input)?;
                Ok(Operands {
                    filter,
                    input,
                    output,
                })
            }
        }
    }
}

impl fmt::Display for ConvMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConvMethod::Forward => "forward",
            ConvMethod::BackwardData => "backward_data",
            ConvMethod::BackwardFilter => "backward_filter",
        };
        f.pad(name)
    }
}

impl FromStr for ConvMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "forward" | "fwd" => Ok(ConvMethod::Forward),
            "backward_data" | "bwd_data" => Ok(ConvMethod::BackwardData),
            "backward_filter" | "bwd_filter" => Ok(ConvMethod::BackwardFilter),
            _ => Err(Error::Config(format!("unknown convolution method {s:?}"))),
        }
    }
}
