//! Managed shader programs

use crate::backend::traits::*;
use crate::lifecycle::{ResourceKey, SharedResource, TeardownError};
use std::sync::Arc;

/// A compiled and linked shader program with managed lifetime
pub struct ShaderProgram {
    device: Arc<dyn GraphicsDevice>,
    handle: ProgramHandle,
    key: ResourceKey,
    name: String,
}

impl std::fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("handle", &self.handle)
            .field("key", &self.key)
            .field("name", &self.name)
            .finish()
    }
}

impl ShaderProgram {
    /// Compile and link a program from vertex and fragment source.
    pub fn new(
        device: &Arc<dyn GraphicsDevice>,
        name: &str,
        vertex_source: &str,
        fragment_source: &str,
    ) -> DeviceResult<Self> {
        let handle = device.create_program(vertex_source, fragment_source)?;
        log::debug!("linked shader program `{name}`");
        Ok(Self {
            device: device.clone(),
            handle,
            key: ResourceKey::next(),
            name: name.to_string(),
        })
    }

    pub fn handle(&self) -> ProgramHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release the underlying program object. Do not call directly on a
    /// program placed under shared reference counting.
    pub fn destroy(&self) -> DeviceResult<()> {
        self.device.destroy_program(self.handle)
    }
}

impl SharedResource for ShaderProgram {
    fn resource_key(&self) -> ResourceKey {
        self.key
    }

    fn release_resource(&self) -> Result<(), TeardownError> {
        self.destroy().map_err(TeardownError::new)
    }
}
