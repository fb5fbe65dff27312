use bucket_stream::{AggregationError, IntervalWidth, bucket_key};

const WIDTHS: [i64; 6] = [1, 2, 7, 1_000, 600_000, 86_400_000];

fn timestamps() -> Vec<i64> {
    let mut ts = vec![
        0,
        1,
        -1,
        599_999,
        600_000,
        -600_000,
        -600_001,
        1_700_000_000_000,
        -1_700_000_000_123,
        i64::MAX,
        i64::MAX - 1,
    ];
    ts.extend((-5_000..5_000).step_by(37));
    ts
}

#[test]
fn test_key_bounds_hold_for_all_samples() {
    for w in WIDTHS {
        for t in timestamps() {
            let k = bucket_key(t, w).unwrap();
            assert!(k <= t, "key {} above timestamp {} (w={})", k, t, w);
            assert!(
                (t as i128) < k as i128 + w as i128,
                "timestamp {} outside bucket {} (w={})",
                t,
                k,
                w
            );
            assert_eq!(k.rem_euclid(w), 0);
        }
    }
}

#[test]
fn test_last_unit_of_bucket_stays_in_bucket() {
    for w in WIDTHS {
        for t in timestamps().into_iter().filter(|t| t.abs() < 1_000_000_000_000) {
            let k = bucket_key(t, w).unwrap();
            assert_eq!(bucket_key(k + w - 1, w), Ok(k));
            assert_eq!(bucket_key(k + w, w), Ok(k + w));
        }
    }
}

#[test]
fn test_interval_width_matches_free_function() {
    let width = IntervalWidth::from_millis(600_000).unwrap();
    for t in timestamps() {
        assert_eq!(width.key_of(t), bucket_key(t, 600_000));
    }
}

#[test]
fn test_non_positive_width_is_invalid_configuration() {
    for w in [0, -1, i64::MIN] {
        assert!(matches!(
            bucket_key(123, w),
            Err(AggregationError::InvalidConfiguration(_))
        ));
        assert!(IntervalWidth::from_millis(w).is_err());
    }
}
