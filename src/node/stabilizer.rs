//! Background stabilization loop of a node.

use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use flume::{Receiver, RecvTimeoutError};
use tracing::{debug, trace};

use super::{Inner, Node};

/// Spawn the stabilizer thread of `node`.
///
/// The thread only keeps a weak reference, so dropping every handle to the
/// node also ends the loop.
pub(super) fn spawn(
    node: &Node,
    receiver: Receiver<()>,
    interval: Duration,
) -> std::io::Result<()> {
    let id = node.id();
    let weak = Arc::downgrade(&node.0);

    thread::Builder::new()
        .name(format!("chord node {}", id))
        .spawn(move || run(weak, receiver, interval))?;

    Ok(())
}

fn run(weak: Weak<Inner>, receiver: Receiver<()>, interval: Duration) {
    loop {
        match receiver.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) => {
                debug!("Chord stabilizer thread was stopped.");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => {
                // Node was dropped, kill this thread.
                debug!("Chord stabilizer thread was shutdown after Drop.");
                break;
            }
        }

        let node = match weak.upgrade() {
            Some(inner) => Node(inner),
            None => break,
        };

        trace!(id = %node.id(), "Stabilizer tick");

        node.stabilize();
        node.fix_fingers();
    }
}

#[cfg(test)]
mod test {
    use std::thread::JoinHandle;
    use std::time::Instant;

    use super::*;
    use crate::{Id, Network};

    fn finishes(handle: &JoinHandle<()>) -> bool {
        let start = Instant::now();

        while start.elapsed() < Duration::from_secs(5) {
            if handle.is_finished() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }

        handle.is_finished()
    }

    fn node() -> (Network, Node) {
        let network = Network::builder()
            .stabilize_interval(Duration::from_secs(3600))
            .build()
            .unwrap();
        let node = network.create_node(Id(1)).unwrap();

        (network, node)
    }

    #[test]
    fn stops_on_message() {
        let (_network, node) = node();
        let (sender, receiver) = flume::bounded(1);

        let weak = Arc::downgrade(&node.0);
        let handle = thread::spawn(move || run(weak, receiver, Duration::from_millis(1)));

        sender.send(()).unwrap();

        assert!(finishes(&handle));
    }

    #[test]
    fn stops_when_sender_is_dropped() {
        let (_network, node) = node();
        let (sender, receiver) = flume::bounded::<()>(1);

        let weak = Arc::downgrade(&node.0);
        let handle = thread::spawn(move || run(weak, receiver, Duration::from_millis(1)));

        drop(sender);

        assert!(finishes(&handle));
    }

    #[test]
    fn stops_when_node_is_gone() {
        let (sender, receiver) = flume::bounded::<()>(1);

        let handle = thread::spawn(move || run(Weak::new(), receiver, Duration::from_millis(1)));

        assert!(finishes(&handle));
        drop(sender);
    }
}
