use std::sync::Arc;

use anyhow::Result;
use convbench::{
    BenchConfig, ConvMethod, CpuBackend, DriverBuilder, ProblemDescriptor, ProblemSet,
};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // the built-in catalog is sized for GPUs, keep the host sweep small
    let problems = Arc::new(ProblemSet::new(vec![
        ProblemDescriptor::from_tuple((28, 28, 8, 2, 16, 3, 3, 1, 1, 1, 1)),
        ProblemDescriptor::from_tuple((32, 32, 3, 2, 8, 5, 5, 2, 2, 2, 2)),
        ProblemDescriptor::from_tuple((14, 14, 16, 2, 16, 1, 1, 0, 0, 1, 1)),
    ]));
    let config = BenchConfig::load_or_default()?;

    for method in ConvMethod::ALL {
        let mut driver = DriverBuilder::new(method, problems.clone())
            .repeats(config.repeats.min(10))
            .devices(config.devices.clone())
            .build(CpuBackend::new())?;

        for (i, result) in driver.run_all().into_iter().enumerate() {
            match result {
                Ok(micros) => println!("{method:>16} problem {i}: {micros} us"),
                Err(e) => println!("{method:>16} problem {i}: {e}"),
            }
        }
    }

    info!("sweep done");
    Ok(())
}
