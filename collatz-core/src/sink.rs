use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
    sync::mpsc::{sync_channel, Receiver, SyncSender},
    thread::{self, JoinHandle},
    time::Instant,
};

use common::config::SinkConfig;

use crate::utils::errors::CollatzError;

/// Append-only destination for trajectory text.
///
/// Producers send whole batches of rendered lines; a single writer thread drains the channel,
/// so lines land in the destination unbroken even though batches arrive in no particular order.
#[derive(Debug)]
pub struct TrajectoryWriter {
    sender: Option<SyncSender<String>>,
    writer_handle: Option<JoinHandle<io::Result<u64>>>,
    config: SinkConfig,
}

impl TrajectoryWriter {
    /// Creates (or truncates) `output_path` and starts the writer thread.
    ///
    /// Creation errors surface here rather than on the first write.
    pub fn create(output_path: impl AsRef<Path>, config: SinkConfig) -> Result<Self, CollatzError> {
        let file = File::create(output_path.as_ref())?;
        Self::from_writer(file, config)
    }

    pub fn stdout(config: SinkConfig) -> Result<Self, CollatzError> {
        Self::from_writer(io::stdout(), config)
    }

    /// Trajectories on stderr leave stdout to whatever else the process prints.
    pub fn stderr(config: SinkConfig) -> Result<Self, CollatzError> {
        Self::from_writer(io::stderr(), config)
    }

    pub fn from_writer<W>(writer: W, config: SinkConfig) -> Result<Self, CollatzError>
    where
        W: Write + Send + 'static,
    {
        let (sender, receiver) = sync_channel::<String>(config.channel_depth);
        let writer_handle = Self::spawn_writer_thread(writer, receiver, config.write_buffer_size)?;
        Ok(Self {
            sender: Some(sender),
            writer_handle: Some(writer_handle),
            config,
        })
    }

    /// Spawn the background writer thread
    fn spawn_writer_thread<W>(
        writer: W,
        receiver: Receiver<String>,
        buffer_size: usize,
    ) -> io::Result<JoinHandle<io::Result<u64>>>
    where
        W: Write + Send + 'static,
    {
        thread::Builder::new()
            .name("trajectory-writer".to_string())
            .spawn(move || -> io::Result<u64> {
                let mut buf = BufWriter::with_capacity(buffer_size, writer);
                let mut written = 0u64;
                while let Ok(batch) = receiver.recv() {
                    buf.write_all(batch.as_bytes())?;
                    written += batch.len() as u64;
                }
                buf.flush()?;
                Ok(written)
            })
    }

    pub fn config(&self) -> &SinkConfig {
        &self.config
    }

    /// Sends a batch of complete lines.
    ///
    /// Fails with `SinkClosed` if the writer thread has stopped, which only happens after a write
    /// error. [`TrajectoryWriter::finalize`] reports the underlying I/O error.
    pub fn send_batch(&self, batch: String) -> Result<(), CollatzError> {
        if batch.is_empty() {
            return Ok(());
        }
        let sender = self.sender.as_ref().ok_or(CollatzError::SinkClosed)?;
        sender.send(batch).map_err(|_| CollatzError::SinkClosed)
    }

    /// Closes the channel, waits for pending writes and returns the number of bytes written.
    pub fn finalize(mut self) -> Result<u64, CollatzError> {
        self.close()
    }

    fn close(&mut self) -> Result<u64, CollatzError> {
        // Drop the sender to signal the writer thread to finish
        self.sender.take();

        let start = Instant::now();
        let Some(handle) = self.writer_handle.take() else {
            return Ok(0);
        };
        let written = handle
            .join()
            .map_err(|_| io::Error::other("trajectory writer thread panicked"))??;
        tracing::debug!(
            bytes = written,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "trajectory writer drained"
        );
        Ok(written)
    }
}

impl Drop for TrajectoryWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            tracing::error!("trajectory sink failed: {e}");
        }
    }
}
