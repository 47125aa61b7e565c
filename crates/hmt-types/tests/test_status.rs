use hmt_types::{JobStatus, TypesError};

#[test]
fn test_raw_mapping_is_offset_by_one() {
    assert_eq!(JobStatus::from_raw(0).unwrap(), JobStatus::Launched);
    assert_eq!(JobStatus::from_raw(0).unwrap().as_u8(), 1);
    assert_eq!(JobStatus::from_raw(5).unwrap(), JobStatus::Cancelled);
    assert_eq!(JobStatus::from_raw(5).unwrap().as_u8(), 6);

    for status in JobStatus::ALL {
        assert_eq!(JobStatus::from_raw(status.to_raw()).unwrap(), status);
        assert_eq!(status.to_raw() + 1, status.as_u8());
    }
}

#[test]
fn test_unknown_raw_value() {
    assert_eq!(JobStatus::from_raw(6), Err(TypesError::UnknownStatus(6)));
    assert!(JobStatus::from_raw(255).is_err());
}

#[test]
fn test_state_classes() {
    assert!(JobStatus::Complete.is_terminal());
    assert!(JobStatus::Cancelled.is_terminal());
    assert!(!JobStatus::Paid.is_terminal());

    assert!(JobStatus::Launched.is_refundable());
    assert!(JobStatus::Pending.is_refundable());
    assert!(!JobStatus::Partial.is_refundable());
    assert!(!JobStatus::Paid.is_refundable());

    assert!(JobStatus::Pending.accepts_payouts());
    assert!(JobStatus::Partial.accepts_payouts());
    assert!(!JobStatus::Launched.accepts_payouts());
}

#[test]
fn test_display() {
    assert_eq!(JobStatus::Partial.to_string(), "Partial");
}
