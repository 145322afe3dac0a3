use std::{num::NonZeroU32, time::Duration, time::Instant};

use tracing::trace;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Measurement {
    pub elapsed: Duration,
    pub repeats: NonZeroU32,
}

impl Measurement {
    /// Mean time per call in whole microseconds, rounded down.
    pub fn average_micros(&self) -> u64 {
        (self.elapsed.as_micros() / self.repeats.get() as u128) as u64
    }
}

/// Times `launch` in steady state.
///
/// One untimed priming call is issued and drained with `barrier`. The
/// clock then covers `repeats` launches enqueued back to back and a single
/// closing `barrier`, so asynchronous devices are measured on sustained
/// throughput rather than per call round trips.
pub fn measure<L, B>(repeats: NonZeroU32, mut launch: L, mut barrier: B) -> Result<Measurement>
where
    L: FnMut() -> Result<()>,
    B: FnMut() -> Result<()>,
{
    launch()?;
    barrier()?;
    trace!("warmed up");

    let start = Instant::now();
    for _ in 0..repeats.get() {
        launch()?;
    }
    barrier()?;
    let elapsed = start.elapsed();
    trace!("timed {} launches in {:?}", repeats, elapsed);

    Ok(Measurement { elapsed, repeats })
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, num::NonZeroU32, time::Duration};

    use crate::{
        error::Error,
        timing::{measure, Measurement},
    };

    #[test]
    fn average_rounds_down() {
        let m = Measurement {
            elapsed: Duration::from_nanos(10_999_999),
            repeats: NonZeroU32::new(4).unwrap(),
        };

        assert_eq!(m.average_micros(), 2_749);
    }

    #[test]
    fn protocol_order() {
        let events = RefCell::new(Vec::new());
        let repeats = NonZeroU32::new(3).unwrap();

        measure(
            repeats,
            || {
                events.borrow_mut().push("launch");
                Ok(())
            },
            || {
                events.borrow_mut().push("barrier");
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(
            events.into_inner(),
            vec!["launch", "barrier", "launch", "launch", "launch", "barrier"]
        );
    }

    #[test]
    fn launch_failure_stops_measurement() {
        let mut launches = 0;
        let result = measure(
            NonZeroU32::new(5).unwrap(),
            || {
                launches += 1;
                if launches == 3 {
                    Err(Error::device(0, "launch failed"))
                } else {
                    Ok(())
                }
            },
            || Ok(()),
        );

        assert!(matches!(result, Err(Error::DeviceFailure { .. })));
        assert_eq!(launches, 3);
    }

    #[test]
    fn measures_elapsed_time() {
        let m = measure(
            NonZeroU32::new(2).unwrap(),
            || {
                std::thread::sleep(Duration::from_millis(1));
                Ok(())
            },
            || Ok(()),
        )
        .unwrap();

        assert!(m.elapsed >= Duration::from_millis(2));
        assert!(m.average_micros() >= 1_000);
    }
}
