//! Batch directory layout

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// Name of the per-server dependency/sequence description file
pub const DEPENDENCY_FILE_NAME: &str = "DependencyFailure.json";

/// Layout of one prepared diagnostic bundle
#[derive(Debug, Clone)]
pub struct BundleLayout {
    /// Base directory of the prepared bundle
    pub base_dir: PathBuf,
}

impl BundleLayout {
    /// Create a new bundle layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// The bundle root
    pub fn base(&self) -> Dir {
        Dir::new(&self.base_dir)
    }

    /// Appliance version file
    pub fn version_file(&self) -> File {
        File::new(self.base_dir.join("version"))
    }

    /// Appliance properties file (carries `MODEL_NUMBER`)
    pub fn properties_file(&self) -> File {
        File::new(self.base_dir.join("appliance.properties"))
    }

    /// Install-set execution log
    pub fn install_set_log(&self) -> File {
        File::new(self.base_dir.join("installSetLogs.log"))
    }

    /// Execution/status log consulted by the outcome classifier
    pub fn execution_log(&self) -> File {
        File::new(self.base_dir.join("ciDebug.log"))
    }

    /// Directory holding one subdirectory per managed server
    pub fn server_logs_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("serverlogs"))
    }

    /// Directory for one server
    pub fn server_dir(&self, uuid: &str) -> Dir {
        self.server_logs_dir().subdir(uuid)
    }

    /// Dedicated per-server firmware log, `<uuid>/<uuid>.log`
    pub fn server_log(&self, uuid: &str) -> File {
        self.server_dir(uuid).file(&format!("{}.log", uuid))
    }

    /// Identifier-scoped fallback log, `<uuid>/uuid.log`
    pub fn server_fallback_log(&self, uuid: &str) -> File {
        self.server_dir(uuid).file("uuid.log")
    }

    /// Default directory for audit side files
    pub fn analysis_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("analysis"))
    }
}
