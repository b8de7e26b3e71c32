//! nuScenes CAN bus expansion reader
//!
//! One JSON array per `(scene, group)`: `<root>/can_bus/<scene>_<group>.json`.

use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};

use contracts::{BusMessage, CanBusReader, ContractError};
use tracing::{debug, warn};

/// File-backed CAN bus reader
#[derive(Debug, Clone)]
pub struct NuScenesCanBus {
    can_dir: PathBuf,
}

impl NuScenesCanBus {
    /// `root` is the dataset root; messages live under `root/can_bus`
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            can_dir: root.as_ref().join("can_bus"),
        }
    }

    fn path(&self, scene_name: &str, group: &str) -> PathBuf {
        self.can_dir.join(format!("{scene_name}_{group}.json"))
    }
}

impl CanBusReader for NuScenesCanBus {
    fn messages(&self, scene_name: &str, group: &str) -> Result<Vec<BusMessage>, ContractError> {
        let path = self.path(scene_name, group);
        let bus_error = |message: String| ContractError::BusRead {
            scene: scene_name.to_string(),
            group: group.to_string(),
            message,
        };

        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(scene = scene_name, group, path = %path.display(), "no can bus data");
                return Ok(Vec::new());
            }
            Err(e) => return Err(bus_error(e.to_string())),
        };

        let mut messages: Vec<BusMessage> = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| bus_error(format!("{}: {e}", path.display())))?;
        messages.sort_by_key(|m| m.utime);

        debug!(scene = scene_name, group, count = messages.len(), "can bus group read");
        Ok(messages)
    }
}
