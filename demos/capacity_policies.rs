//! Shows when `send` suspends under each capacity policy.

use std::time::Duration;

use chanweld::channel::{Capacity, Channel};
use chanweld::core::Result;

/// Send five values without any receiver and report how far we got.
async fn fill(capacity: Capacity) -> Result<()> {
    let channel = Channel::new(capacity);
    let mut accepted = 0;
    for n in 1..=5 {
        match tokio::time::timeout(Duration::from_millis(10), channel.send(n)).await {
            Ok(sent) => {
                sent?;
                accepted += 1;
            }
            Err(_) => break,
        }
    }
    channel.close();

    let mut left = Vec::new();
    channel.consume_each(|n| left.push(n)).await;
    println!(
        "{:>12}: {} send(s) completed, receiver then saw {:?}",
        capacity.to_string(),
        accepted,
        left
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Capacity Policies ===");

    for capacity in [
        Capacity::Rendezvous,
        Capacity::buffered(3),
        Capacity::Unbounded,
        Capacity::Conflated,
    ] {
        fill(capacity).await?;
    }

    Ok(())
}
