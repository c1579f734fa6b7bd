use crate::error::AtError;

/// `+CSQ` style index meaning "not known or not detectable".
pub const CSQ_UNKNOWN: i16 = 99;

/// RXQUAL 0..=7 mapped to bit error rate in hundredths of a percent
/// (3GPP TS 45.008, 8.2.4), using the assumed midpoint of each class.
const RXQUAL_TO_BER: [i16; 8] = [14, 28, 57, 113, 226, 453, 905, 1810];

/// Signal quality snapshot handed to the signal-changed callback.
///
/// `None` marks a value the modem did not report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SignalInfo {
    /// Received signal strength in dBm.
    pub rssi: Option<i16>,
    /// Reference signal received power in dBm.
    pub rsrp: Option<i16>,
    /// Reference signal received quality in dB.
    pub rsrq: Option<i16>,
    /// Bit error rate in hundredths of a percent.
    pub ber: Option<i16>,
    pub bars: Option<u8>,
}

/// Convert a CSQ RSSI index to dBm.
///
/// `0` is -113 dBm or less, `31` is -51 dBm or more, `99` is unknown.
pub fn csq_rssi_to_dbm(index: i16) -> Result<Option<i16>, AtError> {
    match index {
        0..=31 => Ok(Some(-113 + 2 * index)),
        CSQ_UNKNOWN => Ok(None),
        _ => Err(AtError::Error),
    }
}

/// Convert a CSQ BER index (RXQUAL) to a bit error rate.
pub fn csq_ber_to_ber(index: i16) -> Result<Option<i16>, AtError> {
    match index {
        0..=7 => Ok(Some(RXQUAL_TO_BER[index as usize])),
        CSQ_UNKNOWN => Ok(None),
        _ => Err(AtError::Error),
    }
}

/// Narrow a parsed integer to `i16`, as the signal conversions require.
pub(crate) fn to_i16(value: i32) -> Result<i16, AtError> {
    i16::try_from(value).map_err(|_| AtError::Error)
}
