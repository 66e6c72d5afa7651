//! Sums the squares of the odd numbers in 1..=20, once with the stage
//! functions and once with the pipeline builder.

use chanweld::channel::Capacity;
use chanweld::core::Result;
use chanweld::pipeline::{stages, Pipeline};
use chanweld::scope::Scope;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Odd Squares ===");

    let scope = Scope::new();
    let numbers = stages::produce_sequence(&scope, Capacity::Rendezvous, 20);
    let odd = stages::filter(&scope, numbers, Capacity::Rendezvous, |n| n % 2 != 0);
    let squares = stages::map(&scope, odd, Capacity::Rendezvous, |n| n * n);
    let sum = stages::reduce(squares, 0, |acc, n| acc + n).await;
    scope.join().await?;
    println!("Stage functions: {}", sum);

    let sum = Pipeline::sequence(20)
        .filter(|n| n % 2 != 0)
        .map(|n| n * n)
        .reduce(0, |acc, n| acc + n)
        .await?;
    println!("Pipeline builder: {}", sum);

    Ok(())
}
