//! Feeds a pipeline from a plain OS thread.
//!
//! The thread owns the producing side: it uses the non-suspending
//! `try_send` and closes the channel when it is done, which is what lets
//! the pipeline's terminal operation return.

use std::thread;
use std::time::Duration;

use chanweld::prelude::*;

fn main() -> Result<()> {
    println!("=== External Producer ===");

    let readings = Channel::buffered(Capacity::BUFFERED);
    let producer = {
        let readings = readings.clone();
        thread::spawn(move || {
            for reading in 1..=10u32 {
                let mut value = reading;
                loop {
                    match readings.try_send(value) {
                        Ok(()) => break,
                        Err(TrySendError::Full(v)) => {
                            value = v;
                            thread::sleep(Duration::from_millis(1));
                        }
                        Err(TrySendError::Closed(_)) => return,
                    }
                }
                thread::sleep(Duration::from_millis(5));
            }
            readings.close();
        })
    };

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::custom(e.to_string()))?;
    let report = runtime.block_on(async {
        Pipeline::from_channel(readings)
            .map(|r| r * 10)
            .filter(|r| r % 20 == 0)
            .collect()
            .await
    })?;

    producer
        .join()
        .map_err(|_| Error::custom("producer thread panicked"))?;
    println!("Collected: {:?}", report);

    Ok(())
}
