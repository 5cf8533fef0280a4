use tracing::{debug, warn};

use crate::pal::Platform;
use crate::{Frequency, Host, ProcessorId};

/// What the frequency driver of one processor reports about its capabilities.
///
/// The operating points are kept exactly in the order the driver listed them. They are not
/// sorted, because the donation quota refers to them by position.
///
/// Probing never fails. If a file cannot be read or parsed, a warning is logged and the affected
/// data is missing (no operating points, or no current frequency). This only degrades the quota
/// of the rank that owns the processor.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrequencyCapabilities {
    core: ProcessorId,
    operating_points: Vec<Frequency>,
    current_frequency: Option<Frequency>,
}

impl FrequencyCapabilities {
    /// Creates capabilities from already known values.
    #[must_use]
    pub fn new(
        core: ProcessorId,
        operating_points: Vec<Frequency>,
        current_frequency: Option<Frequency>,
    ) -> Self {
        Self {
            core,
            operating_points,
            current_frequency,
        }
    }

    /// Reads the operating points and the current frequency of `core` from the host.
    #[must_use]
    pub fn probe(host: &Host, core: ProcessorId) -> Self {
        let platform = host.platform();

        let operating_points = match platform.scaling_available_frequencies(core) {
            Ok(contents) => {
                let (points, malformed) = parse_operating_points(&contents);

                if let Some(token) = malformed {
                    warn!(
                        core,
                        token,
                        discovered = points.len(),
                        "ignoring available frequencies from the first malformed entry onwards"
                    );
                }

                points
            }
            Err(e) => {
                warn!(core, error = %e, "unable to read available frequencies");
                Vec::new()
            }
        };

        let current_frequency = match platform.current_frequency(core) {
            Ok(contents) => {
                let frequency = parse_current_frequency(&contents);

                if frequency.is_none() {
                    warn!(
                        core,
                        contents = contents.trim(),
                        "current frequency is not a number"
                    );
                }

                frequency
            }
            Err(e) => {
                warn!(core, error = %e, "unable to read current frequency");
                None
            }
        };

        debug!(
            core,
            ?operating_points,
            ?current_frequency,
            "probed frequency capabilities"
        );

        Self::new(core, operating_points, current_frequency)
    }

    /// The processor these capabilities describe.
    #[must_use]
    pub fn core(&self) -> ProcessorId {
        self.core
    }

    /// The frequencies the processor can run at, in the order the driver listed them.
    #[must_use]
    pub fn operating_points(&self) -> &[Frequency] {
        &self.operating_points
    }

    /// The frequency the processor was running at when probed, if it could be read.
    #[must_use]
    pub fn current_frequency(&self) -> Option<Frequency> {
        self.current_frequency
    }
}

/// Parses a list of operating points from the contents of a `scaling_available_frequencies`
/// file.
///
/// Only the first line is considered. Entries are separated by whitespace and returned in the
/// order they appear. Parsing stops at the first entry that is not a number, which is returned
/// alongside the points discovered before it, so that every returned point keeps its position.
///
/// # Example
///
/// ```
/// use freq_donation::parse_operating_points;
///
/// assert_eq!(
///     parse_operating_points("1200000 1800000 2400000 3000000\n"),
///     (vec![1_200_000, 1_800_000, 2_400_000, 3_000_000], None)
/// );
///
/// assert_eq!(
///     parse_operating_points("3000000 fast 1200000"),
///     (vec![3_000_000], Some("fast"))
/// );
/// ```
#[must_use]
pub fn parse_operating_points(contents: &str) -> (Vec<Frequency>, Option<&str>) {
    let line = contents.lines().next().unwrap_or_default();
    let mut points = Vec::new();

    for token in line.split_whitespace() {
        match token.parse::<Frequency>() {
            Ok(point) => points.push(point),
            Err(_) => return (points, Some(token)),
        }
    }

    (points, None)
}

/// Parses the contents of a `cpuinfo_cur_freq` file.
///
/// Returns `None` if the first line is not a single number.
#[must_use]
pub fn parse_current_frequency(contents: &str) -> Option<Frequency> {
    contents.lines().next()?.trim().parse().ok()
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io;

    use mockall::predicate::eq;

    use super::*;
    use crate::pal::{MockPlatform, PlatformFacade};

    fn host_with(platform: MockPlatform) -> Host {
        Host::from_platform(PlatformFacade::from_mock(platform))
    }

    #[test]
    fn keeps_discovery_order() {
        let (points, malformed) = parse_operating_points("2400000 3000000 1200000 1800000");

        assert_eq!(points, vec![2_400_000, 3_000_000, 1_200_000, 1_800_000]);
        assert_eq!(malformed, None);
    }

    #[test]
    fn tolerates_irregular_whitespace() {
        let (points, malformed) = parse_operating_points("  3000000\t\t2400000   1200000 \n");

        assert_eq!(points, vec![3_000_000, 2_400_000, 1_200_000]);
        assert_eq!(malformed, None);
    }

    #[test]
    fn only_first_line_counts() {
        let (points, _) = parse_operating_points("3000000 2400000\n1200000\n");

        assert_eq!(points, vec![3_000_000, 2_400_000]);
    }

    #[test]
    fn empty_contents_yield_no_points() {
        assert_eq!(parse_operating_points(""), (vec![], None));
        assert_eq!(parse_operating_points("\n"), (vec![], None));
    }

    #[test]
    fn stops_at_malformed_entry() {
        let (points, malformed) = parse_operating_points("3000000 2400000 -5 1200000");

        assert_eq!(points, vec![3_000_000, 2_400_000]);
        assert_eq!(malformed, Some("-5"));
    }

    #[test]
    fn parses_current_frequency() {
        assert_eq!(parse_current_frequency("2600000\n"), Some(2_600_000));
        assert_eq!(parse_current_frequency(" 2600000 "), Some(2_600_000));
        assert_eq!(parse_current_frequency(""), None);
        assert_eq!(parse_current_frequency("2600000 1\n"), None);
        assert_eq!(parse_current_frequency("<unknown>\n"), None);
    }

    #[test]
    fn probe_reads_both_files_of_requested_core() {
        let mut platform = MockPlatform::new();
        platform
            .expect_scaling_available_frequencies()
            .with(eq(3))
            .times(1)
            .returning(|_| Ok("1200000 1800000 2400000 3000000\n".to_string()));
        platform
            .expect_current_frequency()
            .with(eq(3))
            .times(1)
            .returning(|_| Ok("2600000\n".to_string()));

        let capabilities = FrequencyCapabilities::probe(&host_with(platform), 3);

        assert_eq!(capabilities.core(), 3);
        assert_eq!(
            capabilities.operating_points(),
            &[1_200_000, 1_800_000, 2_400_000, 3_000_000]
        );
        assert_eq!(capabilities.current_frequency(), Some(2_600_000));
    }

    #[test]
    fn probe_continues_after_read_failure() {
        let mut platform = MockPlatform::new();
        platform
            .expect_scaling_available_frequencies()
            .returning(|_| Err(io::Error::from(io::ErrorKind::NotFound)));
        platform
            .expect_current_frequency()
            .times(1)
            .returning(|_| Ok("2600000\n".to_string()));

        let capabilities = FrequencyCapabilities::probe(&host_with(platform), 0);

        assert!(capabilities.operating_points().is_empty());
        assert_eq!(capabilities.current_frequency(), Some(2_600_000));
    }

    #[test]
    fn probe_tolerates_unreadable_current_frequency() {
        let mut platform = MockPlatform::new();
        platform
            .expect_scaling_available_frequencies()
            .returning(|_| Ok("3000000 1200000\n".to_string()));
        platform
            .expect_current_frequency()
            .returning(|_| Err(io::Error::from(io::ErrorKind::PermissionDenied)));

        let capabilities = FrequencyCapabilities::probe(&host_with(platform), 0);

        assert_eq!(capabilities.operating_points(), &[3_000_000, 1_200_000]);
        assert_eq!(capabilities.current_frequency(), None);
    }
}
