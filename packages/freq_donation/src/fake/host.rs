//! Fake host backend and its builders.

use std::io;

use foldhash::{HashMap, HashMapExt};

use crate::ProcessorId;
use crate::pal::Platform;

/// Simulated contents of one frequency file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
enum FakeFile {
    /// The file does not exist, e.g. because there is no frequency driver.
    #[default]
    Missing,

    /// The file exists but cannot be read, e.g. because of insufficient privileges.
    Unreadable,

    Contents(String),
}

impl FakeFile {
    fn read(&self) -> io::Result<String> {
        match self {
            Self::Missing => Err(io::Error::from(io::ErrorKind::NotFound)),
            Self::Unreadable => Err(io::Error::from(io::ErrorKind::PermissionDenied)),
            Self::Contents(contents) => Ok(contents.clone()),
        }
    }
}

/// Builder for one processor of a fake host.
///
/// Frequency files that are not configured do not exist on the fake host.
///
/// # Example
///
/// ```
/// use freq_donation::fake::CoreBuilder;
///
/// let core = CoreBuilder::new(3)
///     .available_frequencies("3000000 2400000 1800000 1200000")
///     .unreadable_current_frequency();
/// ```
#[derive(Clone, Debug)]
pub struct CoreBuilder {
    id: ProcessorId,
    available_frequencies: FakeFile,
    current_frequency: FakeFile,
}

impl CoreBuilder {
    /// Creates a builder for the processor with the given ID.
    #[must_use]
    pub fn new(id: ProcessorId) -> Self {
        Self {
            id,
            available_frequencies: FakeFile::Missing,
            current_frequency: FakeFile::Missing,
        }
    }

    /// Sets the contents of the file listing the available frequencies.
    #[must_use]
    pub fn available_frequencies(mut self, contents: impl Into<String>) -> Self {
        self.available_frequencies = FakeFile::Contents(contents.into());
        self
    }

    /// Makes the file listing the available frequencies exist but fail to be read.
    #[must_use]
    pub fn unreadable_available_frequencies(mut self) -> Self {
        self.available_frequencies = FakeFile::Unreadable;
        self
    }

    /// Sets the contents of the file holding the current frequency.
    #[must_use]
    pub fn current_frequency(mut self, contents: impl Into<String>) -> Self {
        self.current_frequency = FakeFile::Contents(contents.into());
        self
    }

    /// Makes the file holding the current frequency exist but fail to be read.
    #[must_use]
    pub fn unreadable_current_frequency(mut self) -> Self {
        self.current_frequency = FakeFile::Unreadable;
        self
    }
}

/// Builder for a fake host.
///
/// If [`current_core()`][Self::current_core] is not called, the fake host cannot tell which
/// processor the current thread is executing on, as on an unsupported platform.
///
/// # Panics
///
/// [`Host::fake()`][crate::Host::fake] panics if the same processor is configured twice.
#[derive(Clone, Debug, Default)]
pub struct HostBuilder {
    current_core: Option<ProcessorId>,
    cores: Vec<CoreBuilder>,
}

impl HostBuilder {
    /// Creates a builder for a host with no processors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the processor that every thread appears to be executing on.
    ///
    /// The processor does not need to be configured via [`core()`][Self::core], in which case it
    /// has no frequency files.
    #[must_use]
    pub fn current_core(mut self, id: ProcessorId) -> Self {
        self.current_core = Some(id);
        self
    }

    /// Adds a processor.
    #[must_use]
    pub fn core(mut self, core: CoreBuilder) -> Self {
        self.cores.push(core);
        self
    }
}

#[derive(Debug)]
struct FakeCore {
    available_frequencies: FakeFile,
    current_frequency: FakeFile,
}

/// Fake host platform that serves frequency files from memory.
#[derive(Debug)]
pub(crate) struct FakePlatform {
    current_core: Option<ProcessorId>,
    cores: HashMap<ProcessorId, FakeCore>,
}

impl FakePlatform {
    pub(crate) fn from_builder(builder: &HostBuilder) -> Self {
        let mut cores = HashMap::with_capacity(builder.cores.len());

        for core in &builder.cores {
            let previous = cores.insert(
                core.id,
                FakeCore {
                    available_frequencies: core.available_frequencies.clone(),
                    current_frequency: core.current_frequency.clone(),
                },
            );

            assert!(
                previous.is_none(),
                "processor {} is configured more than once",
                core.id
            );
        }

        Self {
            current_core: builder.current_core,
            cores,
        }
    }

    fn core(&self, processor_id: ProcessorId) -> io::Result<&FakeCore> {
        self.cores
            .get(&processor_id)
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
    }
}

impl Platform for FakePlatform {
    fn current_processor_id(&self) -> io::Result<ProcessorId> {
        self.current_core.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::Unsupported,
                "fake host has no current processor",
            )
        })
    }

    fn scaling_available_frequencies(&self, processor_id: ProcessorId) -> io::Result<String> {
        self.core(processor_id)?.available_frequencies.read()
    }

    fn current_frequency(&self, processor_id: ProcessorId) -> io::Result<String> {
        self.core(processor_id)?.current_frequency.read()
    }
}
