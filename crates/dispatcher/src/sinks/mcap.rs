//! McapSink - one MCAP recording per scene
//!
//! Events go to `<path>.partial`; `close` finalizes the summary and renames
//! the file into place, `discard` (or dropping an unfinished sink) deletes it.
//! A failed `close` deletes the partial file, and `discard` after a
//! successful `close` deletes the renamed recording. A recording therefore
//! exists under its final name only when complete and kept.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use contracts::{Compression, ContractError, Event, EventSink, OutputConfig, Topic};
use tracing::{debug, info, instrument, warn};

use crate::error::DispatcherError;

const PARTIAL_EXTENSION: &str = "partial";

/// Container options
#[derive(Debug, Clone, Copy, Default)]
pub struct McapOptions {
    pub compression: Compression,
    /// Writer default when `None`
    pub chunk_size: Option<u64>,
}

impl From<&OutputConfig> for McapOptions {
    fn from(output: &OutputConfig) -> Self {
        Self {
            compression: output.compression,
            chunk_size: output.chunk_size,
        }
    }
}

impl McapOptions {
    fn write_options(&self) -> mcap::WriteOptions {
        let compression = match self.compression {
            Compression::None => None,
            Compression::Lz4 => Some(mcap::Compression::Lz4),
            Compression::Zstd => Some(mcap::Compression::Zstd),
        };
        mcap::WriteOptions::new()
            .compression(compression)
            .chunk_size(self.chunk_size)
            .profile("ros2")
            .library(concat!("nuscenes2mcap/", env!("CARGO_PKG_VERSION")))
            .use_chunks(true)
            .emit_summary_records(true)
            .emit_summary_offsets(true)
            .emit_message_indexes(true)
    }
}

/// Sink writing a ROS 2 profile MCAP file
pub struct McapSink {
    name: String,
    path: PathBuf,
    partial: PathBuf,
    writer: Option<mcap::Writer<BufWriter<File>>>,
    /// Renamed into place by `close`
    committed: bool,
    schemas: HashMap<&'static str, u16>,
    channels: HashMap<Topic, u16>,
    sequence: u32,
}

impl McapSink {
    /// Open `<path>.partial` for writing
    ///
    /// # Errors
    /// The output directory or file cannot be created.
    pub fn create(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        options: McapOptions,
    ) -> Result<Self, DispatcherError> {
        let name = name.into();
        let path = path.into();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| {
                DispatcherError::sink_creation(&name, format!("{}: {e}", dir.display()))
            })?;
        }
        let partial = partial_path(&path);
        let file = File::create(&partial).map_err(|e| {
            DispatcherError::sink_creation(&name, format!("{}: {e}", partial.display()))
        })?;
        let writer = options
            .write_options()
            .create(BufWriter::new(file))
            .map_err(|e| DispatcherError::mcap(&partial, e))?;

        debug!(sink = %name, path = %partial.display(), "mcap recording opened");
        Ok(Self {
            name,
            path,
            partial,
            writer: Some(writer),
            committed: false,
            schemas: HashMap::new(),
            channels: HashMap::new(),
            sequence: 0,
        })
    }

    /// Final path of the recording
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path written while the recording is open
    pub fn partial_path(&self) -> &Path {
        &self.partial
    }

    /// Messages written so far
    pub fn message_count(&self) -> u32 {
        self.sequence
    }

    fn writer(&mut self) -> Result<&mut mcap::Writer<BufWriter<File>>, DispatcherError> {
        self.writer
            .as_mut()
            .ok_or_else(|| DispatcherError::Finished(self.name.clone()))
    }

    /// Channel of `event`'s topic, registering schema and channel on first use
    fn channel_id(&mut self, event: &Event) -> Result<u16, DispatcherError> {
        if let Some(id) = self.channels.get(event.topic.as_str()) {
            return Ok(*id);
        }
        let partial = self.partial.clone();
        let schema = event.schema;
        let known_schema = self.schemas.get(schema.name).copied();
        let writer = self.writer()?;

        let schema_id = match known_schema {
            Some(id) => id,
            None => writer
                .add_schema(schema.name, "ros2msg", schema.definition.as_bytes())
                .map_err(|e| DispatcherError::mcap(&partial, e))?,
        };
        let channel_id = writer
            .add_channel(schema_id, &event.topic, "cdr", &BTreeMap::new())
            .map_err(|e| DispatcherError::mcap(&partial, e))?;

        self.schemas.insert(schema.name, schema_id);
        self.channels.insert(event.topic.clone(), channel_id);
        debug!(
            sink = %self.name,
            topic = %event.topic,
            schema = schema.name,
            channel_id,
            "channel registered"
        );
        Ok(channel_id)
    }

    fn write_event(&mut self, event: &Event) -> Result<(), DispatcherError> {
        let channel_id = self.channel_id(event)?;
        let header = mcap::records::MessageHeader {
            channel_id,
            sequence: self.sequence,
            log_time: event.timestamp_ns,
            publish_time: event.timestamp_ns,
        };
        let partial = self.partial.clone();
        self.writer()?
            .write_to_known_channel(&header, &event.payload)
            .map_err(|e| DispatcherError::mcap(&partial, e))?;
        self.sequence += 1;
        observability::record_event_written(&self.name, &event.topic, event.payload.len());
        Ok(())
    }

    fn finalize(&mut self) -> Result<(), DispatcherError> {
        let Some(mut writer) = self.writer.take() else {
            return Err(DispatcherError::Finished(self.name.clone()));
        };
        let finished = writer
            .finish()
            .map(|_| ())
            .map_err(|e| DispatcherError::mcap(&self.partial, e));
        drop(writer);

        let renamed = finished
            .and_then(|()| fs::rename(&self.partial, &self.path).map_err(DispatcherError::from));
        match renamed {
            Ok(()) => {
                self.committed = true;
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = self.remove_output() {
                    warn!(
                        sink = %self.name,
                        error = %cleanup,
                        "failed to remove partial recording"
                    );
                }
                Err(e)
            }
        }
    }

    /// Delete whatever this sink left on disk
    fn remove_output(&mut self) -> Result<(), DispatcherError> {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.finish() {
                debug!(sink = %self.name, error = %e, "finishing discarded recording failed");
            }
        }
        if self.committed {
            remove_if_exists(&self.path)?;
            self.committed = false;
        }
        remove_if_exists(&self.partial)
    }
}

fn remove_if_exists(path: &Path) -> Result<(), DispatcherError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(PARTIAL_EXTENSION);
    PathBuf::from(name)
}

impl EventSink for McapSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn write(&mut self, event: &Event) -> Result<(), ContractError> {
        self.write_event(event)
            .map_err(|e| e.into_contract(&self.name))
    }

    #[instrument(name = "mcap_sink_flush", skip(self), fields(sink = %self.name))]
    fn flush(&mut self) -> Result<(), ContractError> {
        let name = self.name.clone();
        let partial = self.partial.clone();
        self.writer()
            .and_then(|writer| {
                writer
                    .flush()
                    .map_err(|e| DispatcherError::mcap(&partial, e))
            })
            .map_err(|e| e.into_contract(&name))
    }

    #[instrument(name = "mcap_sink_close", skip(self), fields(sink = %self.name))]
    fn close(&mut self) -> Result<(), ContractError> {
        self.finalize().map_err(|e| e.into_contract(&self.name))?;
        info!(
            sink = %self.name,
            path = %self.path.display(),
            messages = self.sequence,
            channels = self.channels.len(),
            "mcap recording written"
        );
        Ok(())
    }

    #[instrument(name = "mcap_sink_discard", skip(self), fields(sink = %self.name))]
    fn discard(&mut self) -> Result<(), ContractError> {
        self.remove_output()
            .map_err(|e| e.into_contract(&self.name))?;
        warn!(sink = %self.name, path = %self.path.display(), "recording discarded");
        Ok(())
    }
}

impl Drop for McapSink {
    fn drop(&mut self) {
        if self.writer.is_some() {
            if let Err(e) = self.remove_output() {
                warn!(sink = %self.name, error = %e, "failed to remove partial recording");
            }
        }
    }
}
