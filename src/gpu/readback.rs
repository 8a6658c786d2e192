use std::sync::mpsc::{self, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{ReduceError, Result};

const POLL_INTERVAL: Duration = Duration::from_micros(500);

/// Fails with [`ReduceError::Timeout`] once `timeout` has passed since
/// `submitted`.
pub(crate) fn check_deadline(submitted: Instant, timeout: Duration) -> Result<()> {
    let waited = submitted.elapsed();
    if waited >= timeout {
        return Err(ReduceError::Timeout { waited });
    }
    Ok(())
}

/// Maps `staging` for reading and copies its contents out.
///
/// `submitted` is when the work writing `staging` was handed to the queue.
/// The device is polled without blocking until the map callback fires or
/// `timeout` has elapsed since then, so a hung dispatch surfaces as
/// [`ReduceError::Timeout`] instead of blocking the caller forever.
pub(crate) fn read_buffer<T: bytemuck::Pod>(
    device: &wgpu::Device,
    staging: &wgpu::Buffer,
    submitted: Instant,
    timeout: Duration,
) -> Result<Vec<T>> {
    let slice = staging.slice(..);
    let (sender, receiver) = mpsc::channel();
    slice.map_async(wgpu::MapMode::Read, move |res| {
        let _ = sender.send(res);
    });

    let mapped = loop {
        let _ = device.poll(wgpu::PollType::Poll);
        match receiver.try_recv() {
            Ok(res) => break res,
            Err(TryRecvError::Disconnected) => {
                return Err(ReduceError::allocation(
                    "readback buffer",
                    "map callback dropped without a result",
                ));
            }
            Err(TryRecvError::Empty) => {}
        }
        check_deadline(submitted, timeout)?;
        thread::sleep(POLL_INTERVAL);
    };
    mapped.map_err(|err| ReduceError::allocation("readback buffer", err.to_string()))?;
    trace!(since_submit = ?submitted.elapsed(), bytes = staging.size(), "readback mapped");

    let data = slice.get_mapped_range();
    let out = bytemuck::cast_slice(&data).to_vec();
    drop(data);
    staging.unmap();
    Ok(out)
}
