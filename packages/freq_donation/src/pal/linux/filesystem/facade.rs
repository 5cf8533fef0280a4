use std::fmt::Debug;
use std::io;
#[cfg(test)]
use std::sync::Arc;

#[cfg(test)]
use crate::pal::linux::MockFilesystem;
use crate::pal::linux::{BuildTargetFilesystem, Filesystem};

/// Enum to hide the different filesystem implementations behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum FilesystemFacade {
    Target(&'static BuildTargetFilesystem),

    #[cfg(test)]
    Mock(Arc<MockFilesystem>),
}

impl FilesystemFacade {
    pub(crate) const fn target() -> Self {
        Self::Target(&BuildTargetFilesystem)
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockFilesystem) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Filesystem for FilesystemFacade {
    fn get_scaling_available_frequencies_contents(&self, cpu_index: u32) -> io::Result<String> {
        match self {
            Self::Target(filesystem) => {
                filesystem.get_scaling_available_frequencies_contents(cpu_index)
            }
            #[cfg(test)]
            Self::Mock(mock) => mock.get_scaling_available_frequencies_contents(cpu_index),
        }
    }

    fn get_cpuinfo_cur_freq_contents(&self, cpu_index: u32) -> io::Result<String> {
        match self {
            Self::Target(filesystem) => filesystem.get_cpuinfo_cur_freq_contents(cpu_index),
            #[cfg(test)]
            Self::Mock(mock) => mock.get_cpuinfo_cur_freq_contents(cpu_index),
        }
    }
}

impl Debug for FilesystemFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
