use derive_more::Display;
use thiserror::Error;

use crate::FrequencyCapabilities;

/// How much frequency headroom a rank could give up (positive) or would need to absorb
/// (negative) relative to its peers, in the unit of the frequency driver (kHz on Linux).
///
/// The quota is the current frequency of the rank's processor minus the second-to-last operating
/// point in the order the frequency driver listed them. Drivers commonly list operating points in
/// descending order, which makes that the second-lowest frequency step, but this is not
/// guaranteed and the operating points are deliberately not sorted.
///
/// # Example
///
/// ```
/// use freq_donation::{DonationQuota, FrequencyCapabilities};
///
/// let capabilities = FrequencyCapabilities::new(
///     0,
///     vec![1_200_000, 1_800_000, 2_400_000, 3_000_000],
///     Some(2_600_000),
/// );
///
/// let quota = DonationQuota::calculate(&capabilities).unwrap();
/// assert_eq!(quota.get(), 200_000);
/// ```
#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct DonationQuota(i64);

impl DonationQuota {
    /// Calculates the quota from the capabilities of the rank's processor.
    ///
    /// # Errors
    ///
    /// Returns an error instead of a quota if there are fewer than two operating points, if the
    /// current frequency is unknown or if the values do not fit the quota's range.
    pub fn calculate(capabilities: &FrequencyCapabilities) -> Result<Self, QuotaError> {
        let points = capabilities.operating_points();

        let reference = points
            .len()
            .checked_sub(2)
            .and_then(|index| points.get(index))
            .ok_or(QuotaError::InsufficientOperatingPoints {
                count: points.len(),
            })?;

        let current = capabilities
            .current_frequency()
            .ok_or(QuotaError::CurrentFrequencyUnavailable)?;

        let (Ok(current), Ok(reference)) = (i64::try_from(current), i64::try_from(*reference))
        else {
            return Err(QuotaError::Overflow);
        };

        current
            .checked_sub(reference)
            .map(Self)
            .ok_or(QuotaError::Overflow)
    }

    /// The quota value.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl From<DonationQuota> for i64 {
    fn from(quota: DonationQuota) -> Self {
        quota.0
    }
}

/// Reasons why a [`DonationQuota`] cannot be calculated for a rank.
///
/// None of these affect other ranks. The rank simply has no quota.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
#[non_exhaustive]
pub enum QuotaError {
    /// The quota refers to the second-to-last operating point, which requires at least two.
    #[error("at least 2 operating points are required but {count} were discovered")]
    InsufficientOperatingPoints {
        /// The number of operating points that were discovered.
        count: usize,
    },

    /// The current frequency of the processor could not be determined.
    #[error("the current frequency of the processor is unknown")]
    CurrentFrequencyUnavailable,

    /// The frequencies are too large to subtract from each other.
    #[error("frequency values are out of range")]
    Overflow,
}
