use bizops_domain::{Frequency, ObligationStatus};

/// 远端频率编码为月数：1 / 2 / 3 / 6 / 12。
/// DAILY 与 WEEKLY 没有对应编码。
pub fn frequency_code(frequency: Frequency) -> Option<u8> {
    match frequency {
        Frequency::Monthly => Some(1),
        Frequency::Quarterly => Some(3),
        Frequency::Yearly => Some(12),
        Frequency::Daily | Frequency::Weekly => None,
    }
}

/// 双月(2)与半年(6)在本地没有对应频率
pub fn frequency_from_code(code: u8) -> Option<Frequency> {
    match code {
        1 => Some(Frequency::Monthly),
        3 => Some(Frequency::Quarterly),
        12 => Some(Frequency::Yearly),
        _ => None,
    }
}

pub fn status_code(status: ObligationStatus) -> u8 {
    match status {
        ObligationStatus::Active => 0,
        ObligationStatus::Paused => 1,
        ObligationStatus::Cancelled => 2,
        ObligationStatus::Completed => 3,
    }
}

pub fn status_from_code(code: u8) -> Option<ObligationStatus> {
    match code {
        0 => Some(ObligationStatus::Active),
        1 => Some(ObligationStatus::Paused),
        2 => Some(ObligationStatus::Cancelled),
        3 => Some(ObligationStatus::Completed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_frequencies_map_both_ways() {
        for frequency in [Frequency::Monthly, Frequency::Quarterly, Frequency::Yearly] {
            let code = frequency_code(frequency).unwrap();
            assert_eq!(frequency_from_code(code), Some(frequency));
        }
    }

    #[test]
    fn test_mapping_gaps() {
        assert_eq!(frequency_code(Frequency::Daily), None);
        assert_eq!(frequency_code(Frequency::Weekly), None);
        assert_eq!(frequency_from_code(2), None);
        assert_eq!(frequency_from_code(6), None);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(ObligationStatus::Active), 0);
        assert_eq!(status_code(ObligationStatus::Completed), 3);
        for code in 0..=3 {
            let status = status_from_code(code).unwrap();
            assert_eq!(status_code(status), code);
        }
        assert_eq!(status_from_code(4), None);
    }
}
