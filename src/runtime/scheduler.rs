//! Thread-per-node execution of a streaming graph
//!
//! Every node gets its own OS thread that calls `work()` in a loop. A node
//! leaves the loop by returning `WorkError::Shutdown` once its input is
//! exhausted, by reporting `should_stop()`, or when the shared stop signal is
//! raised. Dropping a node's ports closes its channels, which cascades
//! shutdown downstream.

use super::errors::WorkError;
use super::node::ProcessNode;
use super::ports::{InputPort, OutputPort};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Executes the node threads of one built pipeline.
pub struct Scheduler {
    workers: Vec<(String, JoinHandle<()>)>,
    stop_signal: Arc<AtomicBool>,
    finished_tx: mpsc::Sender<String>,
    finished_rx: Option<mpsc::Receiver<String>>,
}

impl Scheduler {
    pub fn new() -> Self {
        let (finished_tx, finished_rx) = mpsc::channel();
        Self {
            workers: Vec::new(),
            stop_signal: Arc::new(AtomicBool::new(false)),
            finished_tx,
            finished_rx: Some(finished_rx),
        }
    }

    /// Spawn a worker thread for one node. Sources carry zero inputs, sinks
    /// zero outputs; the node itself decides what its ports mean.
    pub fn start_process(
        &mut self,
        mut node: Box<dyn ProcessNode>,
        inputs: Vec<InputPort>,
        outputs: Vec<OutputPort>,
    ) {
        let name = node.name().to_string();
        debug!("spawning worker for node '{}'", name);

        let stop_signal = Arc::clone(&self.stop_signal);
        let finished_tx = self.finished_tx.clone();
        let worker_name = name.clone();

        let handle = thread::spawn(move || {
            let mut produced = 0usize;

            while !stop_signal.load(Ordering::Relaxed) && !node.should_stop() {
                match node.work(&inputs, &outputs) {
                    Ok(n) => produced += n,
                    Err(WorkError::Shutdown) => {
                        debug!("[{}] input exhausted", worker_name);
                        break;
                    }
                    Err(e) => {
                        error!("[{}] work failed: {}", worker_name, e);
                        break;
                    }
                }
            }

            info!("[{}] worker done, {} items produced", worker_name, produced);

            // Closing the ports here is what propagates shutdown: receivers
            // downstream see a disconnect once every sender is gone
            drop(outputs);
            drop(inputs);
            drop(node);

            let _ = finished_tx.send(worker_name);
        });

        self.workers.push((name, handle));
    }

    /// Ask every worker to stop after its current `work()` call.
    pub fn stop(&self) {
        self.stop_signal.store(true, Ordering::Relaxed);
    }

    /// Block until every worker thread has finished, joining each as it
    /// reports completion.
    pub fn wait(mut self) {
        let finished_rx = match self.finished_rx.take() {
            Some(rx) => rx,
            None => return,
        };
        // With the scheduler's own sender gone, the channel closes once the
        // last worker has reported
        drop(self.finished_tx);

        let total = self.workers.len();
        info!("waiting for {} workers", total);

        let mut pending: HashMap<String, JoinHandle<()>> = self.workers.into_iter().collect();
        let mut joined = 0;

        while joined < total {
            let Ok(worker_name) = finished_rx.recv() else {
                break;
            };
            joined += 1;
            if let Some(handle) = pending.remove(&worker_name) {
                match handle.join() {
                    Ok(()) => info!("[{}] joined ({}/{})", worker_name, joined, total),
                    Err(e) => error!("[{}] panicked ({}/{}): {:?}", worker_name, joined, total, e),
                }
            }
        }

        info!("all {} workers finished", total);
    }

    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    pub fn thread_names(&self) -> Vec<String> {
        self.workers.iter().map(|(name, _)| name.clone()).collect()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::node::{ProcessNode, WorkError, WorkResult};
    use crate::runtime::sender::{ChannelMessage, Sender};
    use crossbeam_channel::bounded;
    use std::sync::Mutex;
    use std::time::Duration;

    struct CountSource {
        next: u32,
        limit: u32,
    }

    impl ProcessNode for CountSource {
        fn name(&self) -> &str {
            "count_source"
        }

        fn should_stop(&self) -> bool {
            self.next >= self.limit
        }

        fn num_inputs(&self) -> usize {
            0
        }

        fn num_outputs(&self) -> usize {
            1
        }

        fn work(&mut self, _inputs: &[InputPort], outputs: &[OutputPort]) -> WorkResult<usize> {
            let output = outputs[0]
                .get::<u32>()
                .ok_or_else(|| WorkError::NodeError("missing output".to_string()))?;

            if self.next >= self.limit {
                return Ok(0);
            }
            output.send(self.next)?;
            self.next += 1;
            if self.next == self.limit {
                output.close();
            }
            Ok(1)
        }
    }

    struct VecSink {
        values: Arc<Mutex<Vec<u32>>>,
    }

    impl ProcessNode for VecSink {
        fn name(&self) -> &str {
            "vec_sink"
        }

        fn num_inputs(&self) -> usize {
            1
        }

        fn num_outputs(&self) -> usize {
            0
        }

        fn work(&mut self, inputs: &[InputPort], _outputs: &[OutputPort]) -> WorkResult<usize> {
            let mut buffer = std::collections::VecDeque::new();
            let mut input = inputs[0]
                .get::<u32>(&mut buffer)
                .ok_or_else(|| WorkError::NodeError("missing input".to_string()))?;

            let value = input.recv()?;
            self.values.lock().unwrap().push(value);
            Ok(1)
        }
    }

    #[test]
    fn test_source_to_sink_run() {
        let mut scheduler = Scheduler::new();
        let (tx, rx) = bounded::<ChannelMessage<u32>>(16);

        let values = Arc::new(Mutex::new(Vec::new()));
        scheduler.start_process(
            Box::new(CountSource { next: 0, limit: 5 }),
            vec![],
            vec![OutputPort::new_for_test(Sender::new(vec![tx]))],
        );
        scheduler.start_process(
            Box::new(VecSink {
                values: Arc::clone(&values),
            }),
            vec![InputPort::new_for_test(rx)],
            vec![],
        );

        assert_eq!(scheduler.num_threads(), 2);
        let names = scheduler.thread_names();
        assert!(names.contains(&"count_source".to_string()));
        assert!(names.contains(&"vec_sink".to_string()));

        scheduler.wait();

        assert_eq!(*values.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_stop_signal_ends_endless_source() {
        let mut scheduler = Scheduler::new();
        let (tx, _rx) = bounded::<ChannelMessage<u32>>(1_000_000);

        scheduler.start_process(
            Box::new(CountSource {
                next: 0,
                limit: u32::MAX,
            }),
            vec![],
            vec![OutputPort::new_for_test(Sender::new(vec![tx]))],
        );

        scheduler.stop();

        let started = std::time::Instant::now();
        scheduler.wait();
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
