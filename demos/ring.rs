//! Build a small ring, store a few keys, print where everything landed and
//! optionally knock nodes out to see how much data goes with them.

use std::thread;
use std::time::Duration;

use chord::{Id, Network};
use clap::Parser;
use histo::Histogram;
use tracing::Level;

#[derive(Parser)]
struct Cli {
    /// Number of nodes in the ring
    #[arg(short, long, default_value_t = 5)]
    nodes: usize,
    /// Size of the identifier space in bits
    #[arg(short, long, default_value_t = chord::DEFAULT_ID_BITS)]
    bits: u8,
    /// Stabilizer interval in milliseconds
    #[arg(short, long, default_value_t = 10)]
    interval: u64,
    /// How long to let the ring settle, in milliseconds
    #[arg(short, long, default_value_t = 2000)]
    settle: u64,
    /// Number of random lookups to measure hops with
    #[arg(short, long, default_value_t = 1000)]
    lookups: usize,
    /// Number of nodes to disconnect at the end
    #[arg(short, long, default_value_t = 0)]
    disconnect: usize,
}

const ENTRIES: [(&str, &str); 3] = [("foo", "bar"), ("baz", "qux"), ("apple", "banana")];

fn main() -> Result<(), chord::Error> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();

    let network = Network::builder()
        .id_bits(cli.bits)
        .stabilize_interval(Duration::from_millis(cli.interval))
        .build()?;

    let first = network.create_node(Id(1))?;
    first.join(None)?;

    for _ in 1..cli.nodes {
        let node = network.create_random_node()?;
        node.join(Some(&first))?;
    }

    thread::sleep(Duration::from_millis(cli.settle));

    for (key, value) in ENTRIES {
        first.put(key, value)?;
    }

    let snapshot = network.snapshot();

    println!(
        "\n{} nodes, ring {}",
        snapshot.nodes.len(),
        if snapshot.is_well_formed() {
            "well formed"
        } else {
            "still converging"
        }
    );

    for node in &snapshot.nodes {
        let fingers: Vec<String> = node
            .fingers
            .iter()
            .map(|finger| finger.map_or("-".to_string(), |id| id.to_string()))
            .collect();

        println!(
            "node {:>5}  pred {:>5}  succ {:>5}  fingers [{}]  store {:?}",
            node.id,
            node.predecessor.map_or("-".to_string(), |id| id.to_string()),
            node.successor.map_or("-".to_string(), |id| id.to_string()),
            fingers.join(" "),
            node.store
        );
    }

    let mut histogram = Histogram::with_buckets(10);
    let nodes = network.nodes();

    for i in 0..cli.lookups {
        let node = &nodes[i % nodes.len()];

        match node.lookup(network.id_space().random()) {
            Ok(lookup) => histogram.add(lookup.hops as u64),
            Err(error) => println!("lookup failed: {}", error),
        }
    }

    println!("\nLookup hops:\n{}", histogram);

    if cli.disconnect > 0 {
        let before = count_found(&first);

        let departing = nodes
            .iter()
            .filter(|node| node.id() != first.id())
            .take(cli.disconnect);

        for node in departing {
            network.disconnect_node(node.id())?;
        }

        thread::sleep(Duration::from_millis(cli.settle));

        let after = count_found(&first);

        println!(
            "Disconnected {} nodes: {} of {} keys still reachable",
            cli.disconnect.min(nodes.len().saturating_sub(1)),
            after,
            before
        );
    }

    network.stop();

    Ok(())
}

fn count_found(from: &chord::Node) -> usize {
    ENTRIES
        .iter()
        .filter(|(key, _)| matches!(from.get(key), Ok(Some(_))))
        .count()
}
