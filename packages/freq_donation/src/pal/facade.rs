use std::fmt::Debug;
use std::io;
#[cfg(any(test, feature = "test-util"))]
use std::sync::Arc;

use crate::ProcessorId;
#[cfg(any(test, feature = "test-util"))]
use crate::fake::FakePlatform;
#[cfg(test)]
use crate::pal::MockPlatform;
#[cfg(test)]
use crate::pal::fallback::BuildTargetPlatform as FallbackPlatform;
use crate::pal::{BUILD_TARGET_PLATFORM, BuildTargetPlatform, Platform};

/// Enum to hide the different platform implementations behind a single wrapper type.
#[derive(Clone)]
pub(crate) enum PlatformFacade {
    Target(&'static BuildTargetPlatform),

    #[cfg(test)]
    Fallback(&'static FallbackPlatform),

    #[cfg(any(test, feature = "test-util"))]
    Fake(Arc<FakePlatform>),

    #[cfg(test)]
    Mock(Arc<MockPlatform>),
}

impl PlatformFacade {
    pub(crate) fn target() -> Self {
        Self::Target(&BUILD_TARGET_PLATFORM)
    }

    #[cfg(any(test, feature = "test-util"))]
    pub(crate) fn from_fake(fake: FakePlatform) -> Self {
        Self::Fake(Arc::new(fake))
    }

    #[cfg(test)]
    pub(crate) fn from_mock(mock: MockPlatform) -> Self {
        Self::Mock(Arc::new(mock))
    }
}

impl Platform for PlatformFacade {
    fn current_processor_id(&self) -> io::Result<ProcessorId> {
        match self {
            Self::Target(p) => p.current_processor_id(),
            #[cfg(test)]
            Self::Fallback(p) => p.current_processor_id(),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.current_processor_id(),
            #[cfg(test)]
            Self::Mock(p) => p.current_processor_id(),
        }
    }

    fn scaling_available_frequencies(&self, processor_id: ProcessorId) -> io::Result<String> {
        match self {
            Self::Target(p) => p.scaling_available_frequencies(processor_id),
            #[cfg(test)]
            Self::Fallback(p) => p.scaling_available_frequencies(processor_id),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.scaling_available_frequencies(processor_id),
            #[cfg(test)]
            Self::Mock(p) => p.scaling_available_frequencies(processor_id),
        }
    }

    fn current_frequency(&self, processor_id: ProcessorId) -> io::Result<String> {
        match self {
            Self::Target(p) => p.current_frequency(processor_id),
            #[cfg(test)]
            Self::Fallback(p) => p.current_frequency(processor_id),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(p) => p.current_frequency(processor_id),
            #[cfg(test)]
            Self::Mock(p) => p.current_frequency(processor_id),
        }
    }
}

impl Debug for PlatformFacade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Target(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Fallback(inner) => inner.fmt(f),
            #[cfg(any(test, feature = "test-util"))]
            Self::Fake(inner) => inner.fmt(f),
            #[cfg(test)]
            Self::Mock(inner) => inner.fmt(f),
        }
    }
}
